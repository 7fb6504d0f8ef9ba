//! Summary and ranking views over a realized stroll sequence.
//!
//! Both views need the complete sequence (a total or an order statistic), so
//! they take a slice rather than an iterator. Neither mutates its input.

use std::time::Duration;

use crate::{RankedStroll, StatsSummary, Stroll};

/// Fold strolls into a [`StatsSummary`].
///
/// Returns `None` when there are no strolls at all, so callers can tell
/// "no recorded strolls" apart from a summary that happens to be small.
pub fn summarize(strolls: &[Stroll]) -> Option<StatsSummary> {
    if strolls.is_empty() {
        return None;
    }

    let total_distance_km = strolls.iter().map(|s| s.distance_km).sum();
    let total_duration = strolls.iter().map(|s| s.duration).sum();

    Some(StatsSummary {
        count: strolls.len(),
        total_distance_km,
        total_duration,
    })
}

/// The `n` longest strolls by distance, ranked from 1.
///
/// Ties keep chronological order, so repeated calls on the same input always
/// produce the same ranking.
pub fn rank_top(strolls: &[Stroll], n: usize) -> Vec<RankedStroll> {
    let mut ordered: Vec<&Stroll> = strolls.iter().collect();
    // Stable sort: equal distances stay in input order
    ordered.sort_by(|a, b| b.distance_km.total_cmp(&a.distance_km));

    ordered
        .into_iter()
        .take(n)
        .enumerate()
        .map(|(i, stroll)| RankedStroll {
            rank: i + 1,
            stroll: stroll.clone(),
        })
        .collect()
}

/// Round kilometers half-away-from-zero to 3 decimals.
#[inline]
pub fn round_km(km: f64) -> f64 {
    (km * 1000.0).round() / 1000.0
}

/// Convert a duration to minutes, rounded half-away-from-zero to a whole number.
#[inline]
pub fn round_minutes(duration: Duration) -> f64 {
    (duration.as_secs_f64() / 60.0).round()
}
