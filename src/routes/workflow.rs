use actix_web::{get, post, web, HttpRequest, HttpResponse};
use mongodb::bson::oid::ObjectId;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::models::approval_workflow::{ApprovalWorkflow, ApprovalWorkflowRequest};
use crate::routes::admin_issuer;

#[get("/workflows")]
pub async fn get_workflows(query: web::Query<WorkflowListQuery>) -> Result<HttpResponse> {
    let company_id =
        ObjectId::from_str(&query.company_id).map_err(|_| Error::InvalidInput("INVALID_ID"))?;

    let workflows = ApprovalWorkflow::find_many(&company_id).await?;
    Ok(HttpResponse::Ok().json(workflows))
}
#[derive(serde::Deserialize)]
pub struct WorkflowListQuery {
    pub company_id: String,
}
#[get("/workflows/{workflow_id}")]
pub async fn get_workflow(workflow_id: web::Path<String>) -> Result<HttpResponse> {
    let workflow_id =
        ObjectId::from_str(&workflow_id).map_err(|_| Error::InvalidInput("INVALID_ID"))?;

    match ApprovalWorkflow::find_by_id(&workflow_id).await? {
        Some(workflow) => Ok(HttpResponse::Ok().json(workflow)),
        None => Err(Error::NotFound("WORKFLOW_NOT_FOUND")),
    }
}
#[post("/workflows")]
pub async fn create_workflow(
    payload: web::Json<ApprovalWorkflowRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    admin_issuer(&req)?;
    let payload: ApprovalWorkflowRequest = payload.into_inner();

    let mut workflow: ApprovalWorkflow = ApprovalWorkflow {
        _id: None,
        company_id: payload.company_id,
        name: payload.name,
        steps: payload.steps,
    };

    let id = workflow.save().await?;
    Ok(HttpResponse::Created().body(id.to_string()))
}
