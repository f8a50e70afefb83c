use actix_web::{get, post, web, HttpRequest, HttpResponse};
use mongodb::bson::oid::ObjectId;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::models::company::{Company, CompanyRequest};
use crate::routes::admin_issuer;

#[get("/companies/{company_id}")]
pub async fn get_company(company_id: web::Path<String>) -> Result<HttpResponse> {
    let company_id =
        ObjectId::from_str(&company_id).map_err(|_| Error::InvalidInput("INVALID_ID"))?;

    match Company::find_by_id(&company_id).await? {
        Some(company) => Ok(HttpResponse::Ok().json(company)),
        None => Err(Error::NotFound("COMPANY_NOT_FOUND")),
    }
}
#[post("/companies")]
pub async fn create_company(
    payload: web::Json<CompanyRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    admin_issuer(&req)?;
    let payload: CompanyRequest = payload.into_inner();

    let mut company: Company = Company {
        _id: None,
        name: payload.name,
        field: payload.field,
        contact: payload.contact,
    };

    let id = company.save().await?;
    Ok(HttpResponse::Created().body(id.to_string()))
}
