use actix_web::{get, post, web, HttpRequest, HttpResponse};
use mongodb::bson::oid::ObjectId;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::models::project::{Project, ProjectMemberRequest, ProjectRequest};
use crate::routes::issuer;

#[get("/projects/{project_id}")]
pub async fn get_project(project_id: web::Path<String>) -> Result<HttpResponse> {
    let project_id =
        ObjectId::from_str(&project_id).map_err(|_| Error::InvalidInput("INVALID_ID"))?;

    match Project::find_by_id(&project_id).await? {
        Some(project) => Ok(HttpResponse::Ok().json(project)),
        None => Err(Error::NotFound("PROJECT_NOT_FOUND")),
    }
}
#[post("/projects")]
pub async fn create_project(
    payload: web::Json<ProjectRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    issuer(&req)?;
    let payload: ProjectRequest = payload.into_inner();

    let mut project: Project = Project {
        _id: None,
        company_id: payload.company_id,
        name: payload.name,
        code: payload.code,
        member: Vec::new(),
    };

    let id = project.save().await?;
    Ok(HttpResponse::Created().body(id.to_string()))
}
#[post("/projects/{project_id}/members")]
pub async fn add_project_member(
    project_id: web::Path<String>,
    payload: web::Json<ProjectMemberRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    issuer(&req)?;
    let project_id =
        ObjectId::from_str(&project_id).map_err(|_| Error::InvalidInput("INVALID_ID"))?;

    let mut project = Project::find_by_id(&project_id)
        .await?
        .ok_or(Error::NotFound("PROJECT_NOT_FOUND"))?;

    let id = project.add_member(&payload.user_id).await?;
    Ok(HttpResponse::Ok().body(id.to_string()))
}
