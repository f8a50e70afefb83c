use actix_web::{HttpMessage, HttpRequest};

use crate::error::{Error, Result};
use crate::models::user::UserAuthentication;

pub mod approval;
pub mod company;
pub mod project;
pub mod role;
pub mod safety;
pub mod user;
pub mod workflow;

/// The authenticated caller, from the token middleware.
pub fn issuer(req: &HttpRequest) -> Result<UserAuthentication> {
    req.extensions()
        .get::<UserAuthentication>()
        .cloned()
        .ok_or(Error::Unauthorized)
}

/// Caller with workflow/snapshot management rights.
pub fn admin_issuer(req: &HttpRequest) -> Result<UserAuthentication> {
    let issuer = issuer(req)?;
    if !issuer.default_role.is_admin() {
        return Err(Error::Unauthorized);
    }
    Ok(issuer)
}
