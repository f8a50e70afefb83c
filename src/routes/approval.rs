use actix_web::{get, post, web, HttpRequest, HttpResponse};
use mongodb::bson::{doc, oid::ObjectId};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::models::approval_request::{
    ApprovalAction, ApprovalActionRequest, ApprovalRequest, ApprovalRequestPayload,
};
use crate::routes::issuer;

fn parse_id(raw: &str) -> Result<ObjectId> {
    ObjectId::from_str(raw).map_err(|_| Error::InvalidInput("INVALID_ID"))
}

#[post("/approvals")]
pub async fn create_request(
    payload: web::Json<ApprovalRequestPayload>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let issuer = issuer(&req)?;
    let payload: ApprovalRequestPayload = payload.into_inner();

    if payload.title.trim().is_empty() {
        return Err(Error::InvalidInput("REQUEST_MUST_HAVE_TITLE"));
    }

    let mut request = ApprovalRequest {
        _id: None,
        workflow_id: payload.workflow_id,
        project_id: payload.project_id,
        title: payload.title,
        current_step: 1,
        status: crate::approval::transition::ApprovalStatus::Pending,
        initiated_by: issuer._id,
        created_at: mongodb::bson::DateTime::now(),
    };

    let id = request.save().await?;
    Ok(HttpResponse::Created().body(id.to_string()))
}
#[get("/approvals/{request_id}")]
pub async fn get_request(request_id: web::Path<String>) -> Result<HttpResponse> {
    let request_id = parse_id(&request_id)?;

    match ApprovalRequest::find_by_id(&request_id).await? {
        Some(request) => Ok(HttpResponse::Ok().json(request)),
        None => Err(Error::NotFound("REQUEST_NOT_FOUND")),
    }
}
#[get("/approvals/{request_id}/approvers")]
pub async fn get_approvers(request_id: web::Path<String>) -> Result<HttpResponse> {
    let request_id = parse_id(&request_id)?;

    let approvers = ApprovalRequest::resolve_current_approvers(&request_id).await?;
    let approvers: Vec<String> = approvers.iter().map(|id| id.to_hex()).collect();
    Ok(HttpResponse::Ok().json(approvers))
}
#[get("/approvals/{request_id}/can-approve/{user_id}")]
pub async fn can_approve(path: web::Path<(String, String)>) -> Result<HttpResponse> {
    let (request_id, user_id) = path.into_inner();
    let request_id = parse_id(&request_id)?;
    let user_id = parse_id(&user_id)?;

    let allowed = ApprovalRequest::can_approve(&request_id, &user_id).await?;
    Ok(HttpResponse::Ok().json(doc! { "can_approve": allowed }))
}
#[post("/approvals/{request_id}/actions")]
pub async fn post_action(
    request_id: web::Path<String>,
    payload: web::Json<ApprovalActionRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let issuer = issuer(&req)?;
    let request_id = parse_id(&request_id)?;
    let payload: ApprovalActionRequest = payload.into_inner();

    let (status, step) =
        ApprovalRequest::advance(&request_id, &issuer._id, payload.decision, payload.notes).await?;
    Ok(HttpResponse::Ok().json(doc! {
        "status": status.as_str(),
        "current_step": step,
    }))
}
#[get("/approvals/{request_id}/actions")]
pub async fn get_actions(request_id: web::Path<String>) -> Result<HttpResponse> {
    let request_id = parse_id(&request_id)?;

    if ApprovalRequest::find_by_id(&request_id).await?.is_none() {
        return Err(Error::NotFound("REQUEST_NOT_FOUND"));
    }
    let actions = ApprovalAction::find_by_request(&request_id).await?;
    Ok(HttpResponse::Ok().json(actions))
}
