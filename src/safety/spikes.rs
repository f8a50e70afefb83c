//! Near-miss pattern detection.
//!
//! Frequency spikes: per-day near-miss counts over a lookback window,
//! flagging days that sit more than `k` standard deviations above the
//! window mean. Location hotspots apply the same threshold across
//! per-location counts. Plain threshold anomaly detection, reproducible
//! from the formula; a window with zero variance flags nothing.

use chrono::{Days, NaiveDate};
use serde::Serialize;

pub const DEFAULT_LOOKBACK_DAYS: u32 = 30;
pub const DEFAULT_SPIKE_THRESHOLD: f64 = 2.0;

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct SpikeDay {
    pub date: NaiveDate,
    pub count: u32,
    pub z_score: f64,
}

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct Hotspot {
    pub location: String,
    pub count: u32,
    pub z_score: f64,
}

fn mean_and_std_dev(counts: &[u32]) -> (f64, f64) {
    let n = counts.len() as f64;
    let mean = counts.iter().map(|c| f64::from(*c)).sum::<f64>() / n;
    let variance = counts
        .iter()
        .map(|c| {
            let diff = f64::from(*c) - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    (mean, variance.sqrt())
}

/// Flag days in the lookback window ending at `window_end` whose
/// near-miss count exceeds `mean + k * stddev`. Days without incidents
/// count as zero, so quiet stretches weigh the baseline down.
pub fn detect_frequency_spikes(
    dates: &[NaiveDate],
    window_end: NaiveDate,
    lookback_days: u32,
    k: f64,
) -> Vec<SpikeDay> {
    if lookback_days == 0 {
        return Vec::new();
    }
    let window_start = window_end - Days::new(u64::from(lookback_days - 1));

    let days: Vec<NaiveDate> = (0..lookback_days)
        .map(|offset| window_start + Days::new(u64::from(offset)))
        .collect();
    let counts: Vec<u32> = days
        .iter()
        .map(|day| dates.iter().filter(|d| *d == day).count() as u32)
        .collect();

    let (mean, std_dev) = mean_and_std_dev(&counts);
    if std_dev <= 0.0 {
        return Vec::new();
    }
    let threshold = mean + k * std_dev;

    days.into_iter()
        .zip(counts)
        .filter(|(_, count)| f64::from(*count) > threshold)
        .map(|(date, count)| SpikeDay {
            date,
            count,
            z_score: (f64::from(count) - mean) / std_dev,
        })
        .collect()
}

/// Flag locations whose incident count exceeds `mean + k * stddev` of
/// the per-location counts. Sorted by count, highest first.
pub fn detect_location_hotspots(locations: &[String], k: f64) -> Vec<Hotspot> {
    let mut names: Vec<&str> = Vec::new();
    let mut counts: Vec<u32> = Vec::new();
    for location in locations {
        match names.iter().position(|name| *name == location.as_str()) {
            Some(index) => counts[index] += 1,
            None => {
                names.push(location);
                counts.push(1);
            }
        }
    }
    if names.is_empty() {
        return Vec::new();
    }

    let (mean, std_dev) = mean_and_std_dev(&counts);
    if std_dev <= 0.0 {
        return Vec::new();
    }
    let threshold = mean + k * std_dev;

    let mut hotspots: Vec<Hotspot> = names
        .into_iter()
        .zip(counts)
        .filter(|(_, count)| f64::from(*count) > threshold)
        .map(|(location, count)| Hotspot {
            location: location.to_string(),
            count,
            z_score: (f64::from(count) - mean) / std_dev,
        })
        .collect();
    hotspots.sort_by(|a, b| b.count.cmp(&a.count));
    hotspots
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(year: i32, month: u32, dayn: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, dayn).unwrap()
    }

    #[test]
    fn one_loud_day_in_a_quiet_month_is_flagged() {
        let window_end = day(2026, 3, 30);
        let window_start = window_end - Days::new(29);

        // 0 or 1 near miss on ordinary days, 8 on one bad day.
        let mut dates: Vec<NaiveDate> = (0..30)
            .step_by(2)
            .map(|offset| window_start + Days::new(offset))
            .collect();
        let bad_day = day(2026, 3, 15);
        for _ in 0..8 {
            dates.push(bad_day);
        }

        let spikes =
            detect_frequency_spikes(&dates, window_end, DEFAULT_LOOKBACK_DAYS, DEFAULT_SPIKE_THRESHOLD);
        assert_eq!(spikes.len(), 1);
        assert_eq!(spikes[0].date, bad_day);
        // 8 on the bad day plus the ordinary near miss that landed there.
        assert_eq!(spikes[0].count, 9);
        assert!(spikes[0].z_score > DEFAULT_SPIKE_THRESHOLD);
    }

    #[test]
    fn zero_variance_window_flags_nothing() {
        let window_end = day(2026, 3, 30);
        let window_start = window_end - Days::new(29);
        // Exactly one near miss every day: every count equals the mean.
        let dates: Vec<NaiveDate> = (0..30).map(|offset| window_start + Days::new(offset)).collect();

        let spikes = detect_frequency_spikes(&dates, window_end, 30, 2.0);
        assert!(spikes.is_empty());
    }

    #[test]
    fn empty_window_flags_nothing() {
        assert!(detect_frequency_spikes(&[], day(2026, 1, 31), 30, 2.0).is_empty());
        assert!(detect_frequency_spikes(&[day(2026, 1, 10)], day(2026, 1, 31), 0, 2.0).is_empty());
    }

    #[test]
    fn dates_outside_the_window_are_ignored() {
        let window_end = day(2026, 6, 30);
        let stale = vec![day(2025, 6, 15); 20];
        assert!(detect_frequency_spikes(&stale, window_end, 30, 2.0).is_empty());
    }

    #[test]
    fn dominant_location_is_a_hotspot() {
        let mut locations: Vec<String> = vec!["scaffold east".to_string(); 9];
        for name in ["gate", "laydown yard", "crane pad", "stair tower"] {
            locations.push(name.to_string());
        }

        let hotspots = detect_location_hotspots(&locations, 1.5);
        assert_eq!(hotspots.len(), 1);
        assert_eq!(hotspots[0].location, "scaffold east");
        assert_eq!(hotspots[0].count, 9);
    }

    #[test]
    fn uniform_locations_flag_nothing() {
        let locations: Vec<String> = ["gate", "crane pad", "stair tower"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(detect_location_hotspots(&locations, 2.0).is_empty());
    }
}
