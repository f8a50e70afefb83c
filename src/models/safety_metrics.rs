use crate::database::get_db;
use crate::error::{Error, Result};
use crate::safety::aggregate::{IncidentCounts, MetricsBundle};
use chrono::{Days, Months, NaiveDate};
use futures::stream::StreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, to_document, Bson, DateTime},
    options::{FindOptions, UpdateOptions},
    Collection, Database,
};
use serde::{Deserialize, Serialize};

use super::safety_incident::{day_start, EmployeeHoursWorked, SafetyIncident};

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PeriodType {
    Monthly,
    Quarterly,
    Yearly,
}

impl PeriodType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodType::Monthly => "monthly",
            PeriodType::Quarterly => "quarterly",
            PeriodType::Yearly => "yearly",
        }
    }
}

/// Point-in-time rollup for a scope and period. Recomputing the same
/// key overwrites the computed fields on the same document, so snapshot
/// identity is stable across recalculation.
#[derive(Debug, Deserialize, Serialize)]
pub struct SafetyMetricsSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,
    pub company_id: ObjectId,
    pub project_id: Option<ObjectId>,
    pub period_type: PeriodType,
    pub year: i32,
    /// Month (1-12) or quarter (1-4); absent for yearly snapshots.
    pub period_index: Option<u32>,
    pub period_start: DateTime,
    pub period_end: DateTime,
    pub total_hours: f64,
    pub counts: IncidentCounts,
    pub trir: Option<f64>,
    pub dart: Option<f64>,
    pub ltir: Option<f64>,
    pub severity_rate: Option<f64>,
    pub computed_at: DateTime,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct SnapshotRequest {
    pub company_id: ObjectId,
    pub project_id: Option<ObjectId>,
    pub period_type: PeriodType,
    pub year: i32,
    pub period_index: Option<u32>,
}
#[derive(Debug, Deserialize, Serialize)]
pub struct MetricsRequest {
    pub company_id: ObjectId,
    pub project_id: Option<ObjectId>,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Inclusive calendar bounds of a snapshot period.
pub fn period_bounds(
    period_type: PeriodType,
    year: i32,
    period_index: Option<u32>,
) -> Result<(NaiveDate, NaiveDate)> {
    let (start_month, months) = match period_type {
        PeriodType::Monthly => match period_index {
            Some(month @ 1..=12) => (month, 1),
            _ => return Err(Error::InvalidInput("INVALID_PERIOD")),
        },
        PeriodType::Quarterly => match period_index {
            Some(quarter @ 1..=4) => ((quarter - 1) * 3 + 1, 3),
            _ => return Err(Error::InvalidInput("INVALID_PERIOD")),
        },
        PeriodType::Yearly => (1, 12),
    };

    let start = NaiveDate::from_ymd_opt(year, start_month, 1)
        .ok_or(Error::InvalidInput("INVALID_PERIOD"))?;
    let end = start + Months::new(months) - Days::new(1);
    Ok((start, end))
}

impl SafetyMetricsSnapshot {
    fn collection() -> Collection<SafetyMetricsSnapshot> {
        let db: Database = get_db();
        db.collection::<SafetyMetricsSnapshot>("safety-metrics-snapshots")
    }

    /// Compute the metrics bundle for an arbitrary period. Deterministic
    /// for unchanged data: same inputs, same bundle.
    pub async fn aggregate(
        company_id: &ObjectId,
        project_id: Option<&ObjectId>,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<MetricsBundle> {
        if end < start {
            return Err(Error::InvalidInput("PERIOD_END_BEFORE_START"));
        }

        let total_hours =
            EmployeeHoursWorked::total_in_period(company_id, project_id, start, end).await?;
        let incidents = SafetyIncident::find_in_period(company_id, project_id, start, end).await?;

        Ok(MetricsBundle::compute(
            IncidentCounts::tally(&incidents),
            total_hours,
        ))
    }

    /// Recompute and persist the snapshot for a scope + period key.
    /// Upsert: the same key always lands on the same document.
    pub async fn upsert(request: &SnapshotRequest) -> Result<SafetyMetricsSnapshot> {
        let (start, end) = period_bounds(request.period_type, request.year, request.period_index)?;
        let bundle =
            Self::aggregate(&request.company_id, request.project_id.as_ref(), start, end).await?;

        let snapshot = SafetyMetricsSnapshot {
            _id: None,
            company_id: request.company_id,
            project_id: request.project_id,
            period_type: request.period_type,
            year: request.year,
            period_index: request.period_index,
            period_start: day_start(start),
            period_end: day_start(end),
            total_hours: bundle.total_hours,
            counts: bundle.counts,
            trir: bundle.trir,
            dart: bundle.dart,
            ltir: bundle.ltir,
            severity_rate: bundle.severity_rate,
            computed_at: DateTime::now(),
        };

        let key = doc! {
            "company_id": request.company_id,
            "project_id": match request.project_id {
                Some(project_id) => Bson::ObjectId(project_id),
                None => Bson::Null,
            },
            "period_type": request.period_type.as_str(),
            "year": request.year,
            "period_index": match request.period_index {
                Some(index) => Bson::Int32(index as i32),
                None => Bson::Null,
            },
        };
        let update =
            to_document(&snapshot).map_err(|_| Error::Database("SNAPSHOT_ENCODING_FAILED"))?;

        Self::collection()
            .update_one(
                key.clone(),
                doc! { "$set": update },
                UpdateOptions::builder().upsert(true).build(),
            )
            .await
            .map_err(|_| Error::Database("UPDATE_FAILED"))?;

        tracing::info!(
            company = %request.company_id,
            period = request.period_type.as_str(),
            year = request.year,
            "safety metrics snapshot recomputed"
        );

        Self::collection()
            .find_one(key, None)
            .await
            .map_err(|_| Error::Database("SNAPSHOT_LOOKUP_FAILED"))?
            .ok_or(Error::Database("SNAPSHOT_LOOKUP_FAILED"))
    }

    pub async fn find_many(
        company_id: &ObjectId,
        project_id: Option<&ObjectId>,
    ) -> Result<Vec<SafetyMetricsSnapshot>> {
        let mut filter = doc! { "company_id": company_id };
        if let Some(project_id) = project_id {
            filter.insert("project_id", *project_id);
        }

        let options = FindOptions::builder()
            .sort(doc! { "year": 1, "period_index": 1 })
            .build();
        let mut cursor = Self::collection()
            .find(filter, options)
            .await
            .map_err(|_| Error::Database("SNAPSHOT_LOOKUP_FAILED"))?;

        let mut snapshots: Vec<SafetyMetricsSnapshot> = Vec::new();
        while let Some(Ok(snapshot)) = cursor.next().await {
            snapshots.push(snapshot);
        }
        Ok(snapshots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(year: i32, month: u32, dayn: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, dayn).unwrap()
    }

    #[test]
    fn monthly_bounds_cover_the_calendar_month() {
        let (start, end) = period_bounds(PeriodType::Monthly, 2026, Some(2)).unwrap();
        assert_eq!(start, day(2026, 2, 1));
        assert_eq!(end, day(2026, 2, 28));
    }

    #[test]
    fn quarterly_bounds_cover_three_months() {
        let (start, end) = period_bounds(PeriodType::Quarterly, 2026, Some(4)).unwrap();
        assert_eq!(start, day(2026, 10, 1));
        assert_eq!(end, day(2026, 12, 31));
    }

    #[test]
    fn yearly_bounds_ignore_the_index() {
        let (start, end) = period_bounds(PeriodType::Yearly, 2025, None).unwrap();
        assert_eq!(start, day(2025, 1, 1));
        assert_eq!(end, day(2025, 12, 31));
    }

    #[test]
    fn out_of_range_indexes_are_invalid() {
        assert!(period_bounds(PeriodType::Monthly, 2026, Some(13)).is_err());
        assert!(period_bounds(PeriodType::Monthly, 2026, None).is_err());
        assert!(period_bounds(PeriodType::Quarterly, 2026, Some(0)).is_err());
    }
}
