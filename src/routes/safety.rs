use actix_web::{delete, get, post, put, web, HttpRequest, HttpResponse};
use chrono::{NaiveDate, Utc};
use mongodb::bson::oid::ObjectId;
use serde::Deserialize;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::models::safety_incident::{
    EmployeeHoursWorked, EmployeeHoursWorkedRequest, SafetyIncident, SafetyIncidentRequest,
};
use crate::models::safety_metrics::{MetricsRequest, SafetyMetricsSnapshot, SnapshotRequest};
use crate::routes::{admin_issuer, issuer};
use crate::safety::rates::{compute_rate, RateKind};
use crate::safety::spikes::{
    detect_frequency_spikes, detect_location_hotspots, DEFAULT_LOOKBACK_DAYS,
    DEFAULT_SPIKE_THRESHOLD,
};

fn parse_id(raw: &str) -> Result<ObjectId> {
    ObjectId::from_str(raw).map_err(|_| Error::InvalidInput("INVALID_ID"))
}

fn parse_scope(query: &ScopeQuery) -> Result<(ObjectId, Option<ObjectId>)> {
    let company_id = parse_id(&query.company_id)?;
    let project_id = match &query.project_id {
        Some(project_id) => Some(parse_id(project_id)?),
        None => None,
    };
    Ok((company_id, project_id))
}

#[derive(Deserialize)]
pub struct ScopeQuery {
    pub company_id: String,
    pub project_id: Option<String>,
}
#[derive(Deserialize)]
pub struct PeriodQuery {
    pub company_id: String,
    pub project_id: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
}
#[derive(Deserialize)]
pub struct LookbackQuery {
    pub company_id: String,
    pub project_id: Option<String>,
    pub lookback_days: Option<u32>,
    pub k: Option<f64>,
}
#[derive(Deserialize)]
pub struct RateRequest {
    pub kind: RateKind,
    pub numerator: f64,
    pub hours_worked: Option<f64>,
}

#[post("/safety/incidents")]
pub async fn create_incident(
    payload: web::Json<SafetyIncidentRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    issuer(&req)?;
    let payload: SafetyIncidentRequest = payload.into_inner();

    let mut incident = SafetyIncident {
        _id: None,
        company_id: payload.company_id,
        project_id: payload.project_id,
        severity: payload.severity,
        incident_date: mongodb::bson::DateTime::from_chrono(payload.incident_date),
        location: payload.location,
        days_away_from_work: payload.days_away_from_work,
        days_restricted_duty: payload.days_restricted_duty,
        osha_recordable: payload.osha_recordable,
        deleted: false,
    };

    let id = incident.save().await?;
    Ok(HttpResponse::Created().body(id.to_string()))
}
#[get("/safety/incidents")]
pub async fn get_incidents(query: web::Query<PeriodQuery>) -> Result<HttpResponse> {
    let company_id = parse_id(&query.company_id)?;
    let project_id = match &query.project_id {
        Some(project_id) => Some(parse_id(project_id)?),
        None => None,
    };

    let incidents =
        SafetyIncident::find_in_period(&company_id, project_id.as_ref(), query.start, query.end)
            .await?;
    Ok(HttpResponse::Ok().json(incidents))
}
#[delete("/safety/incidents/{incident_id}")]
pub async fn delete_incident(
    incident_id: web::Path<String>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    issuer(&req)?;
    let incident_id = parse_id(&incident_id)?;

    SafetyIncident::delete_by_id(&incident_id).await?;
    Ok(HttpResponse::Ok().body("DELETED"))
}
#[post("/safety/hours")]
pub async fn create_hours(
    payload: web::Json<EmployeeHoursWorkedRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    issuer(&req)?;

    let id = EmployeeHoursWorked::save(&payload).await?;
    Ok(HttpResponse::Created().body(id.to_string()))
}
/// Single rate computation; `rate` is null when the metric is undefined
/// for the given hours.
#[post("/safety/rates")]
pub async fn compute_single_rate(payload: web::Json<RateRequest>) -> Result<HttpResponse> {
    let payload: RateRequest = payload.into_inner();
    if payload.numerator < 0.0 {
        return Err(Error::InvalidInput("NUMERATOR_MUST_NOT_BE_NEGATIVE"));
    }

    let rate = compute_rate(payload.kind, payload.numerator, payload.hours_worked);
    Ok(HttpResponse::Ok().json(rate))
}
#[post("/safety/metrics")]
pub async fn aggregate_metrics(payload: web::Json<MetricsRequest>) -> Result<HttpResponse> {
    let payload: MetricsRequest = payload.into_inner();

    let bundle = SafetyMetricsSnapshot::aggregate(
        &payload.company_id,
        payload.project_id.as_ref(),
        payload.start,
        payload.end,
    )
    .await?;
    Ok(HttpResponse::Ok().json(bundle))
}
#[put("/safety/metrics/snapshots")]
pub async fn upsert_snapshot(
    payload: web::Json<SnapshotRequest>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    admin_issuer(&req)?;

    let snapshot = SafetyMetricsSnapshot::upsert(&payload).await?;
    Ok(HttpResponse::Ok().json(snapshot))
}
#[get("/safety/metrics/snapshots")]
pub async fn get_snapshots(query: web::Query<ScopeQuery>) -> Result<HttpResponse> {
    let (company_id, project_id) = parse_scope(&query)?;

    let snapshots = SafetyMetricsSnapshot::find_many(&company_id, project_id.as_ref()).await?;
    Ok(HttpResponse::Ok().json(snapshots))
}
/// Near-miss frequency spikes over a lookback window ending today.
#[get("/safety/incidents/spikes")]
pub async fn get_spikes(query: web::Query<LookbackQuery>) -> Result<HttpResponse> {
    let company_id = parse_id(&query.company_id)?;
    let project_id = match &query.project_id {
        Some(project_id) => Some(parse_id(project_id)?),
        None => None,
    };
    let lookback_days = query.lookback_days.unwrap_or(DEFAULT_LOOKBACK_DAYS);
    let k = query.k.unwrap_or(DEFAULT_SPIKE_THRESHOLD);
    if lookback_days == 0 || !k.is_finite() || k <= 0.0 {
        return Err(Error::InvalidInput("INVALID_DETECTION_PARAMETERS"));
    }

    let window_end = Utc::now().date_naive();
    let window_start = window_end - chrono::Days::new(u64::from(lookback_days - 1));
    let incidents =
        SafetyIncident::find_in_period(&company_id, project_id.as_ref(), window_start, window_end)
            .await?;
    let dates: Vec<NaiveDate> = incidents
        .iter()
        .filter(|incident| {
            incident.severity == crate::models::safety_incident::IncidentSeverity::NearMiss
        })
        .map(|incident| incident.incident_date.to_chrono().date_naive())
        .collect();

    let spikes = detect_frequency_spikes(&dates, window_end, lookback_days, k);
    Ok(HttpResponse::Ok().json(spikes))
}
/// Near-miss location hotspots over the same lookback window.
#[get("/safety/incidents/hotspots")]
pub async fn get_hotspots(query: web::Query<LookbackQuery>) -> Result<HttpResponse> {
    let company_id = parse_id(&query.company_id)?;
    let project_id = match &query.project_id {
        Some(project_id) => Some(parse_id(project_id)?),
        None => None,
    };
    let lookback_days = query.lookback_days.unwrap_or(DEFAULT_LOOKBACK_DAYS);
    let k = query.k.unwrap_or(DEFAULT_SPIKE_THRESHOLD);
    if lookback_days == 0 || !k.is_finite() || k <= 0.0 {
        return Err(Error::InvalidInput("INVALID_DETECTION_PARAMETERS"));
    }

    let window_end = Utc::now().date_naive();
    let window_start = window_end - chrono::Days::new(u64::from(lookback_days - 1));
    let incidents =
        SafetyIncident::find_in_period(&company_id, project_id.as_ref(), window_start, window_end)
            .await?;
    let locations: Vec<String> = incidents
        .iter()
        .filter(|incident| {
            incident.severity == crate::models::safety_incident::IncidentSeverity::NearMiss
        })
        .filter_map(|incident| incident.location.clone())
        .collect();

    let hotspots = detect_location_hotspots(&locations, k);
    Ok(HttpResponse::Ok().json(hotspots))
}
