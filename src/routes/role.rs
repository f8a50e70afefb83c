use actix_web::{get, post, web, HttpRequest, HttpResponse};
use mongodb::bson::oid::ObjectId;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::models::custom_role::{
    CustomRole, CustomRoleAssignment, CustomRoleAssignmentRequest, CustomRoleRequest,
};
use crate::routes::admin_issuer;

#[get("/custom-roles/{role_id}")]
pub async fn get_custom_role(role_id: web::Path<String>) -> Result<HttpResponse> {
    let role_id = ObjectId::from_str(&role_id).map_err(|_| Error::InvalidInput("INVALID_ID"))?;

    match CustomRole::find_by_id(&role_id).await? {
        Some(role) => Ok(HttpResponse::Ok().json(role)),
        None => Err(Error::NotFound("ROLE_NOT_FOUND")),
    }
}
#[post("/custom-roles")]
pub async fn create_custom_role(
    payload: web::Json<CustomRoleRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    admin_issuer(&req)?;
    let payload: CustomRoleRequest = payload.into_inner();

    if payload.name.trim().is_empty() {
        return Err(Error::InvalidInput("ROLE_MUST_HAVE_NAME"));
    }

    let mut role: CustomRole = CustomRole {
        _id: None,
        company_id: payload.company_id,
        name: payload.name,
    };

    let id = role.save().await?;
    Ok(HttpResponse::Created().body(id.to_string()))
}
#[post("/custom-roles/{role_id}/assignments")]
pub async fn assign_custom_role(
    role_id: web::Path<String>,
    payload: web::Json<CustomRoleAssignmentRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    admin_issuer(&req)?;
    let role_id = ObjectId::from_str(&role_id).map_err(|_| Error::InvalidInput("INVALID_ID"))?;
    let payload: CustomRoleAssignmentRequest = payload.into_inner();

    let mut assignment: CustomRoleAssignment = CustomRoleAssignment {
        _id: None,
        custom_role_id: role_id,
        user_id: payload.user_id,
        project_id: payload.project_id,
    };

    let id = assignment.save().await?;
    Ok(HttpResponse::Created().body(id.to_string()))
}
