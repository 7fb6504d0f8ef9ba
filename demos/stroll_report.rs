//! Segment a synthetic day of walking and print the summary and top table.
//!
//! Run with: RUST_LOG=debug cargo run --example stroll_report

use chrono::{Duration, TimeZone, Utc};
use stroll_tracker::{report, segment_points, stats, StrollConfig, TrackPoint, TrailingStroll};

fn main() {
    env_logger::init();

    // Three walks around central London, separated by long idle periods
    let day = Utc.with_ymd_and_hms(2024, 5, 1, 7, 0, 0).unwrap();
    let walks = [(0, 25, 0.0009), (180, 40, 0.0011), (420, 12, 0.0007)];

    let mut track = Vec::new();
    for (start_minute, fixes, step_deg) in walks {
        for i in 0..fixes {
            track.push(TrackPoint::new(
                day + Duration::minutes(start_minute + i),
                51.5074 + i as f64 * step_deg,
                -0.1278 + i as f64 * step_deg / 2.0,
            ));
        }
    }

    println!("Stroll Report\n");
    println!("{} fixes\n", track.len());

    for trailing in [TrailingStroll::Emit, TrailingStroll::Discard] {
        let config = StrollConfig {
            trailing,
            ..StrollConfig::default()
        };
        let strolls = segment_points(track.iter().copied().map(Ok), &config)
            .expect("in-memory track cannot fail");

        println!("Trailing stroll policy: {:?}", trailing);
        match stats::summarize(&strolls) {
            Some(summary) => println!("{}\n", report::format_summary(&summary)),
            None => println!("No strolls\n"),
        }
        println!("{}\n", report::format_top(&stats::rank_top(&strolls, config.top_n)));
    }
}
