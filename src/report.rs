//! Text rendering of stroll statistics for chat replies.
//!
//! Numbers go through the rounding contract in [`stats`](crate::stats): 3
//! decimals for kilometers, whole minutes for durations. They are printed in
//! their shortest form, so `2.500` renders as `2.5` and `15.000` as `15`.

use std::fmt::Write;

use crate::{DeviceId, RankedStroll, StatsSummary};

const INDEX_TITLE: &str = " N";
const DISTANCE_TITLE: &str = "      km";
const DURATION_TITLE: &str = "     min";

/// Three-line summary block.
///
/// ```
/// use std::time::Duration;
/// use stroll_tracker::{report, StatsSummary};
///
/// let summary = StatsSummary {
///     count: 2,
///     total_distance_km: 0.33359,
///     total_duration: Duration::from_secs(900),
/// };
/// assert_eq!(
///     report::format_summary(&summary),
///     "Total strolls: 2\nTotal distance km: 0.334\nTotal duration min: 15"
/// );
/// ```
pub fn format_summary(summary: &StatsSummary) -> String {
    format!(
        "Total strolls: {}\nTotal distance km: {}\nTotal duration min: {}",
        summary.count,
        summary.rounded_distance_km(),
        summary.rounded_minutes()
    )
}

/// Fixed-width table with one row per ranked stroll, fenced as a code block.
///
/// Every cell is right-aligned to the width of its column title.
pub fn format_top(ranked: &[RankedStroll]) -> String {
    let mut out = format!("```|{INDEX_TITLE}|{DISTANCE_TITLE}|{DURATION_TITLE}|");
    for entry in ranked {
        let _ = write!(
            out,
            "\n|{:>iw$}|{:>dw$}|{:>mw$}|",
            entry.rank,
            entry.stroll.rounded_distance_km(),
            entry.stroll.rounded_minutes(),
            iw = INDEX_TITLE.len(),
            dw = DISTANCE_TITLE.len(),
            mw = DURATION_TITLE.len(),
        );
    }
    out.push_str("```");
    out
}

/// Reply for a device with no recorded strolls.
pub fn no_strolls(device: &DeviceId) -> String {
    format!("No strolls found for IMEI {}", device)
}
