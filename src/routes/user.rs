use actix_web::{get, post, web, HttpRequest, HttpResponse};
use mongodb::bson::{doc, oid::ObjectId, to_bson};
use regex::Regex;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::models::user::{User, UserCredential, UserRequest};
use crate::routes::admin_issuer;

#[get("/users")]
pub async fn get_users(query: web::Query<UserListQuery>) -> Result<HttpResponse> {
    let company_id = match &query.company_id {
        Some(company_id) => {
            Some(ObjectId::from_str(company_id).map_err(|_| Error::InvalidInput("INVALID_ID"))?)
        }
        None => None,
    };

    let users = User::find_many(company_id.as_ref()).await?;
    Ok(HttpResponse::Ok().json(users))
}
#[derive(serde::Deserialize)]
pub struct UserListQuery {
    pub company_id: Option<String>,
}
#[get("/users/{user_id}")]
pub async fn get_user(user_id: web::Path<String>) -> Result<HttpResponse> {
    let user_id =
        ObjectId::from_str(&user_id).map_err(|_| Error::InvalidInput("INVALID_ID"))?;

    match User::find_by_id(&user_id).await? {
        Some(user) if !user.deleted => Ok(HttpResponse::Ok().json(user.response())),
        _ => Err(Error::NotFound("USER_NOT_FOUND")),
    }
}
#[post("/users")]
pub async fn create_user(payload: web::Json<UserRequest>, req: HttpRequest) -> Result<HttpResponse> {
    let payload: UserRequest = payload.into_inner();
    let email_regex: Regex = Regex::new(
        r"^([a-z0-9_+]([a-z0-9_+.]*[a-z0-9_+])?)@([a-z0-9]+([\-\.]{1}[a-z0-9]+)*\.[a-z]{2,6})",
    )
    .map_err(|_| Error::Database("REGEX_FAILED"))?;

    if payload.password.len() < 8 {
        return Err(Error::InvalidInput("USER_MUST_HAVE_VALID_PASSWORD"));
    }
    if !email_regex.is_match(&payload.email) {
        return Err(Error::InvalidInput("USER_MUST_HAVE_VALID_EMAIL"));
    }

    let mut user: User = User {
        _id: None,
        company_id: payload.company_id,
        name: payload.name,
        email: payload.email,
        password: payload.password,
        default_role: payload.default_role,
        deleted: false,
    };

    // The very first account bootstraps the deployment as its owner;
    // afterwards only admins create users.
    if User::any_exist().await? {
        admin_issuer(&req)?;
    } else {
        user.default_role = crate::models::user::DefaultRole::Owner;
    }

    if User::find_by_email(&user.email).await?.is_some() {
        return Err(Error::InvalidInput("USER_ALREADY_EXIST"));
    }

    let id = user.save().await?;
    Ok(HttpResponse::Created().body(id.to_string()))
}
#[post("/users/login")]
pub async fn login(payload: web::Json<UserCredential>) -> Result<HttpResponse> {
    let payload: UserCredential = payload.into_inner();

    let (atk, user) = payload.authenticate().await?;
    Ok(HttpResponse::Ok().json(doc! {
        "atk": atk,
        "user": to_bson(&user).map_err(|_| Error::Database("ENCODING_FAILED"))?,
    }))
}
