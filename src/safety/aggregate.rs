//! Period rollups: incident tallies and the computed rate bundle.

use serde::{Deserialize, Serialize};

use crate::models::safety_incident::{IncidentSeverity, SafetyIncident};
use crate::safety::rates::rate_per_200k;

/// Incident counts for a period, tallied once and reused as both the
/// rate numerators and the audit trail stored on snapshots.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct IncidentCounts {
    pub total: u32,
    pub recordable: u32,
    pub fatalities: u32,
    pub lost_time: u32,
    pub near_misses: u32,
    pub serious: u32,
    pub days_away_cases: u32,
    pub restricted_cases: u32,
    /// Incidents with days away OR restricted days. A case with both
    /// kinds of days counts once.
    pub dart_cases: u32,
    pub days_away_total: u32,
    pub days_restricted_total: u32,
}

impl IncidentCounts {
    pub fn tally<'a>(incidents: impl IntoIterator<Item = &'a SafetyIncident>) -> Self {
        let mut counts = IncidentCounts::default();
        for incident in incidents {
            counts.total += 1;
            if incident.osha_recordable {
                counts.recordable += 1;
            }
            match incident.severity {
                IncidentSeverity::Fatality => counts.fatalities += 1,
                IncidentSeverity::LostTime => counts.lost_time += 1,
                IncidentSeverity::NearMiss => counts.near_misses += 1,
                _ => {}
            }
            if incident.severity.is_serious() {
                counts.serious += 1;
            }
            if incident.days_away_from_work > 0 {
                counts.days_away_cases += 1;
            }
            if incident.days_restricted_duty > 0 {
                counts.restricted_cases += 1;
            }
            if incident.days_away_from_work > 0 || incident.days_restricted_duty > 0 {
                counts.dart_cases += 1;
            }
            counts.days_away_total += incident.days_away_from_work;
            counts.days_restricted_total += incident.days_restricted_duty;
        }
        counts
    }
}

/// A period's counts, hours and computed rates. Rates are `None` when the
/// period has no hours worked.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct MetricsBundle {
    pub total_hours: f64,
    pub counts: IncidentCounts,
    pub trir: Option<f64>,
    pub dart: Option<f64>,
    pub ltir: Option<f64>,
    pub severity_rate: Option<f64>,
}

impl MetricsBundle {
    pub fn compute(counts: IncidentCounts, total_hours: f64) -> Self {
        let hours = Some(total_hours);
        MetricsBundle {
            total_hours,
            counts,
            trir: rate_per_200k(counts.recordable as f64, hours),
            dart: rate_per_200k(counts.dart_cases as f64, hours),
            ltir: rate_per_200k(counts.lost_time as f64, hours),
            severity_rate: rate_per_200k(
                (counts.days_away_total + counts.days_restricted_total) as f64,
                hours,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{oid::ObjectId, DateTime};

    use super::*;

    fn incident(
        severity: IncidentSeverity,
        days_away: u32,
        days_restricted: u32,
        recordable: bool,
    ) -> SafetyIncident {
        SafetyIncident {
            _id: Some(ObjectId::new()),
            company_id: ObjectId::new(),
            project_id: ObjectId::new(),
            severity,
            incident_date: DateTime::now(),
            location: None,
            days_away_from_work: days_away,
            days_restricted_duty: days_restricted,
            osha_recordable: recordable,
            deleted: false,
        }
    }

    #[test]
    fn dart_cases_is_a_union_count() {
        // One case with days away only, one with restricted days only.
        let incidents = vec![
            incident(IncidentSeverity::LostTime, 5, 0, true),
            incident(IncidentSeverity::MedicalTreatment, 0, 3, true),
        ];
        let counts = IncidentCounts::tally(&incidents);
        assert_eq!(counts.days_away_cases, 1);
        assert_eq!(counts.restricted_cases, 1);
        assert_eq!(counts.dart_cases, 2);

        let bundle = MetricsBundle::compute(counts, 200_000.0);
        assert_eq!(bundle.dart, Some(2.0));
    }

    #[test]
    fn a_case_with_both_kinds_of_days_counts_once() {
        let incidents = vec![incident(IncidentSeverity::LostTime, 4, 2, true)];
        let counts = IncidentCounts::tally(&incidents);
        assert_eq!(counts.days_away_cases, 1);
        assert_eq!(counts.restricted_cases, 1);
        assert_eq!(counts.dart_cases, 1);
        assert_eq!(counts.days_away_total, 4);
        assert_eq!(counts.days_restricted_total, 2);
    }

    #[test]
    fn severity_buckets_and_serious_classification() {
        let incidents = vec![
            incident(IncidentSeverity::NearMiss, 0, 0, false),
            incident(IncidentSeverity::FirstAid, 0, 0, false),
            incident(IncidentSeverity::MedicalTreatment, 0, 0, true),
            incident(IncidentSeverity::LostTime, 10, 0, true),
            incident(IncidentSeverity::Fatality, 0, 0, true),
        ];
        let counts = IncidentCounts::tally(&incidents);
        assert_eq!(counts.total, 5);
        assert_eq!(counts.recordable, 3);
        assert_eq!(counts.near_misses, 1);
        assert_eq!(counts.lost_time, 1);
        assert_eq!(counts.fatalities, 1);
        assert_eq!(counts.serious, 3);
    }

    #[test]
    fn severity_rate_uses_total_days_not_cases() {
        let incidents = vec![
            incident(IncidentSeverity::LostTime, 5, 0, true),
            incident(IncidentSeverity::MedicalTreatment, 0, 3, true),
        ];
        let bundle = MetricsBundle::compute(IncidentCounts::tally(&incidents), 200_000.0);
        // (5 + 3) * 200000 / 200000
        assert_eq!(bundle.severity_rate, Some(8.0));
    }

    #[test]
    fn no_hours_leaves_every_rate_undefined() {
        let incidents = vec![incident(IncidentSeverity::LostTime, 5, 0, true)];
        let bundle = MetricsBundle::compute(IncidentCounts::tally(&incidents), 0.0);
        assert_eq!(bundle.trir, None);
        assert_eq!(bundle.dart, None);
        assert_eq!(bundle.ltir, None);
        assert_eq!(bundle.severity_rate, None);
    }

    #[test]
    fn tally_is_deterministic() {
        let incidents = vec![
            incident(IncidentSeverity::LostTime, 5, 2, true),
            incident(IncidentSeverity::NearMiss, 0, 0, false),
        ];
        let first = IncidentCounts::tally(&incidents);
        let second = IncidentCounts::tally(&incidents);
        assert_eq!(first, second);
        assert_eq!(
            MetricsBundle::compute(first, 120_000.0),
            MetricsBundle::compute(second, 120_000.0)
        );
    }
}
