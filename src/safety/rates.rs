//! OSHA incidence rate formulas.
//!
//! Every rate is `numerator * 200,000 / hours worked`, rounded to two
//! decimals. 200,000 hours is the OSHA base, roughly 100 full-time
//! employees for a year. A zero or missing denominator means the metric
//! is undefined for the period, which is a valid result (`None`) and not
//! an error; a safety auditor reads 0.0 and "cannot compute" as
//! different facts.

use serde::{Deserialize, Serialize};

pub const OSHA_HOURS_BASE: f64 = 200_000.0;

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RateKind {
    Trir,
    Dart,
    Ltir,
    Severity,
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn rate_per_200k(numerator: f64, hours_worked: Option<f64>) -> Option<f64> {
    match hours_worked {
        Some(hours) if hours > 0.0 => Some(round2(numerator * OSHA_HOURS_BASE / hours)),
        _ => None,
    }
}

/// All four kinds share the formula shape; the kind only names which
/// numerator the caller picked.
pub fn compute_rate(_kind: RateKind, numerator: f64, hours_worked: Option<f64>) -> Option<f64> {
    rate_per_200k(numerator, hours_worked)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trir_three_recordables_over_100k_hours_is_six() {
        assert_eq!(
            compute_rate(RateKind::Trir, 3.0, Some(100_000.0)),
            Some(6.0)
        );
    }

    #[test]
    fn zero_hours_is_undefined_for_every_kind_and_numerator() {
        for kind in [RateKind::Trir, RateKind::Dart, RateKind::Ltir, RateKind::Severity] {
            for numerator in [0.0, 1.0, 37.0] {
                assert_eq!(compute_rate(kind, numerator, Some(0.0)), None);
                assert_eq!(compute_rate(kind, numerator, None), None);
            }
        }
    }

    #[test]
    fn zero_numerator_with_real_hours_is_zero_not_undefined() {
        assert_eq!(compute_rate(RateKind::Dart, 0.0, Some(50_000.0)), Some(0.0));
    }

    #[test]
    fn rates_round_to_two_decimals() {
        // 1 * 200000 / 300000 = 0.666...
        assert_eq!(rate_per_200k(1.0, Some(300_000.0)), Some(0.67));
        // 2 * 200000 / 175000 = 2.2857...
        assert_eq!(rate_per_200k(2.0, Some(175_000.0)), Some(2.29));
    }

    #[test]
    fn negative_hours_are_undefined_too() {
        assert_eq!(rate_per_200k(1.0, Some(-8.0)), None);
    }
}
