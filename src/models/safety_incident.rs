use crate::database::get_db;
use crate::error::{Error, Result};
use chrono::{DateTime as ChronoDateTime, Days, NaiveDate, NaiveTime, TimeZone, Utc};
use futures::stream::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, DateTime, Document},
    Collection, Database,
};
use serde::{Deserialize, Serialize};

use super::{company::Company, project::Project};

/// Incident severity in increasing order for reporting purposes.
#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum IncidentSeverity {
    NearMiss,
    FirstAid,
    MedicalTreatment,
    LostTime,
    Fatality,
}

impl IncidentSeverity {
    pub fn is_serious(&self) -> bool {
        matches!(
            self,
            IncidentSeverity::MedicalTreatment | IncidentSeverity::LostTime | IncidentSeverity::Fatality
        )
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SafetyIncident {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub company_id: ObjectId,
    pub project_id: ObjectId,
    pub severity: IncidentSeverity,
    pub incident_date: DateTime,
    pub location: Option<String>,
    pub days_away_from_work: u32,
    pub days_restricted_duty: u32,
    pub osha_recordable: bool,
    pub deleted: bool,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct SafetyIncidentRequest {
    pub company_id: ObjectId,
    pub project_id: ObjectId,
    pub severity: IncidentSeverity,
    pub incident_date: ChronoDateTime<Utc>,
    pub location: Option<String>,
    pub days_away_from_work: u32,
    pub days_restricted_duty: u32,
    pub osha_recordable: bool,
}

/// Midnight UTC at the start of `date`, as a BSON timestamp.
pub fn day_start(date: NaiveDate) -> DateTime {
    DateTime::from_chrono(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)))
}

/// Midnight UTC after the end of `date`; use with an exclusive bound.
pub fn day_after(date: NaiveDate) -> DateTime {
    day_start(date + Days::new(1))
}

fn period_filter(
    company_id: &ObjectId,
    project_id: Option<&ObjectId>,
    start: NaiveDate,
    end: NaiveDate,
) -> Document {
    let mut filter = doc! {
        "company_id": company_id,
        "deleted": false,
        "incident_date": { "$gte": day_start(start), "$lt": day_after(end) },
    };
    if let Some(project_id) = project_id {
        filter.insert("project_id", *project_id);
    }
    filter
}

impl SafetyIncident {
    fn collection() -> Collection<SafetyIncident> {
        let db: Database = get_db();
        db.collection::<SafetyIncident>("safety-incidents")
    }

    pub async fn save(&mut self) -> Result<ObjectId> {
        if Company::find_by_id(&self.company_id).await?.is_none() {
            return Err(Error::NotFound("COMPANY_NOT_FOUND"));
        }
        if Project::find_by_id(&self.project_id).await?.is_none() {
            return Err(Error::NotFound("PROJECT_NOT_FOUND"));
        }

        let _id = ObjectId::new();
        self._id = Some(_id);
        self.deleted = false;

        Self::collection()
            .insert_one(&*self, None)
            .await
            .map_err(|_| Error::Database("INSERTING_FAILED"))
            .map(|_| _id)
    }
    pub async fn find_in_period(
        company_id: &ObjectId,
        project_id: Option<&ObjectId>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<SafetyIncident>> {
        if end < start {
            return Err(Error::InvalidInput("PERIOD_END_BEFORE_START"));
        }
        let mut cursor = Self::collection()
            .find(period_filter(company_id, project_id, start, end), None)
            .await
            .map_err(|_| Error::Database("INCIDENT_LOOKUP_FAILED"))?;

        let mut incidents: Vec<SafetyIncident> = Vec::new();
        while let Some(Ok(incident)) = cursor.next().await {
            incidents.push(incident);
        }
        Ok(incidents)
    }
    /// Soft delete; the incident drops out of every aggregate.
    pub async fn delete_by_id(_id: &ObjectId) -> Result<()> {
        let result = Self::collection()
            .update_one(doc! { "_id": _id }, doc! { "$set": { "deleted": true } }, None)
            .await
            .map_err(|_| Error::Database("UPDATE_FAILED"))?;
        if result.matched_count == 0 {
            return Err(Error::NotFound("INCIDENT_NOT_FOUND"));
        }
        Ok(())
    }
}

/// Labor hours for a period, the denominator of every OSHA rate.
#[derive(Debug, Deserialize, Serialize)]
pub struct EmployeeHoursWorked {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub company_id: ObjectId,
    pub project_id: Option<ObjectId>,
    pub period_start: DateTime,
    pub period_end: DateTime,
    pub total_hours: f64,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct EmployeeHoursWorkedRequest {
    pub company_id: ObjectId,
    pub project_id: Option<ObjectId>,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub total_hours: f64,
}

impl EmployeeHoursWorked {
    fn collection() -> Collection<EmployeeHoursWorked> {
        let db: Database = get_db();
        db.collection::<EmployeeHoursWorked>("employee-hours")
    }

    pub async fn save(request: &EmployeeHoursWorkedRequest) -> Result<ObjectId> {
        if !request.total_hours.is_finite() || request.total_hours < 0.0 {
            return Err(Error::InvalidInput("HOURS_MUST_NOT_BE_NEGATIVE"));
        }
        if request.period_end < request.period_start {
            return Err(Error::InvalidInput("PERIOD_END_BEFORE_START"));
        }
        if Company::find_by_id(&request.company_id).await?.is_none() {
            return Err(Error::NotFound("COMPANY_NOT_FOUND"));
        }
        if let Some(project_id) = &request.project_id {
            if Project::find_by_id(project_id).await?.is_none() {
                return Err(Error::NotFound("PROJECT_NOT_FOUND"));
            }
        }

        let record = EmployeeHoursWorked {
            _id: Some(ObjectId::new()),
            company_id: request.company_id,
            project_id: request.project_id,
            period_start: day_start(request.period_start),
            period_end: day_start(request.period_end),
            total_hours: request.total_hours,
        };

        Self::collection()
            .insert_one(&record, None)
            .await
            .map_err(|_| Error::Database("INSERTING_FAILED"))
            .map(|_| record._id.unwrap_or_else(ObjectId::new))
    }
    /// Sum of hours from records overlapping [start, end].
    pub async fn total_in_period(
        company_id: &ObjectId,
        project_id: Option<&ObjectId>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<f64> {
        let mut filter = doc! {
            "company_id": company_id,
            "period_start": { "$lt": day_after(end) },
            "period_end": { "$gte": day_start(start) },
        };
        if let Some(project_id) = project_id {
            filter.insert("project_id", *project_id);
        }

        let mut cursor = Self::collection()
            .find(filter, None)
            .await
            .map_err(|_| Error::Database("HOURS_LOOKUP_FAILED"))?;

        let mut total: f64 = 0.0;
        while let Some(Ok(record)) = cursor.next().await {
            total += record.total_hours;
        }
        Ok(total)
    }
}
