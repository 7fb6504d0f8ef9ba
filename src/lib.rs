//! # Stroll Tracker
//!
//! Turns a time-ordered stream of GPS fixes from a tracked device into "strolls"
//! (contiguous movement sessions separated by idle gaps) and derives summary and
//! top-N statistics from them.
//!
//! This library provides:
//! - Haversine distance between GPS fixes
//! - Single-pass stroll segmentation over streaming track sources
//! - Summary (count/distance/duration) and top-N-by-distance ranking
//! - Chat command handling and text rendering of the results
//!
//! ## Features
//!
//! - **`persistence`** - SQLite-backed track source
//! - **`stream`** - Segment async `futures::Stream` track sources
//! - **`http`** - HTTP client for delivering chat replies
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use stroll_tracker::{segment_points, stats, StrollConfig, TrackPoint};
//!
//! let start = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
//! let track: Vec<TrackPoint> = (0..5)
//!     .map(|i| TrackPoint::new(start + chrono::Duration::minutes(i), 0.0, i as f64 * 0.001))
//!     .collect();
//!
//! let strolls = segment_points(track.into_iter().map(Ok), &StrollConfig::default()).unwrap();
//! assert_eq!(strolls.len(), 1);
//!
//! if let Some(summary) = stats::summarize(&strolls) {
//!     println!("{} strolls, {:.3} km", summary.count, summary.total_distance_km);
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

// Unified error handling
pub mod error;
pub use error::{Result, StrollError};

// Geographic utilities (haversine distance)
pub mod geo_utils;

// Stroll segmentation
pub mod segmenter;
#[cfg(feature = "stream")]
pub use segmenter::segment_stream;
pub use segmenter::{segment_points, Segmenter, Strolls};

// Summary and ranking
pub mod stats;
pub use stats::{rank_top, summarize};

// Device identifiers
pub mod device;
pub use device::DeviceId;

// Track sources
pub mod source;
pub use source::{collect_strolls, MemoryTrackSource, TrackSource};

// Text rendering for chat replies
pub mod report;

// Chat command handling
pub mod chat;
pub use chat::{BotReply, ChatEvent, Command, StrollBot};

// Service configuration
pub mod config;
pub use config::ServiceConfig;

// SQLite track store
#[cfg(feature = "persistence")]
pub mod persistence;
#[cfg(feature = "persistence")]
pub use persistence::SqliteTrackStore;

// HTTP client for chat delivery
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub use http::MessagingClient;

// ============================================================================
// Core Types
// ============================================================================

/// Distance at or below which an open stroll counts as "no movement", in km.
///
/// A stroll is empty when its distance is at or below this value and its
/// duration is zero. Empty strolls are never emitted.
pub const NEAR_ZERO_DISTANCE_KM: f64 = 1e-9;

/// Default idle gap that closes a stroll.
pub const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_secs(30 * 60);

/// Default number of strolls in a top-N ranking.
pub const DEFAULT_TOP_N: usize = 10;

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use stroll_tracker::GpsPoint;
/// let point = GpsPoint::new(51.5074, -0.1278); // London
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// One raw GPS fix reported by a tracked device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    /// When the fix was taken
    pub timestamp: DateTime<Utc>,
    /// Where the device was
    pub position: GpsPoint,
}

impl TrackPoint {
    /// Create a track point from a timestamp and raw coordinates.
    pub fn new(timestamp: DateTime<Utc>, latitude: f64, longitude: f64) -> Self {
        Self {
            timestamp,
            position: GpsPoint::new(latitude, longitude),
        }
    }
}

/// A contiguous movement session extracted from a device's track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroll {
    /// Distance covered in kilometers
    pub distance_km: f64,
    /// Sum of the inter-point gaps absorbed into the session
    pub duration: Duration,
    /// Timestamp of the first fix of the session
    pub started_at: DateTime<Utc>,
    /// Timestamp of the last fix of the session
    pub ended_at: DateTime<Utc>,
    /// Number of fixes in the session
    pub point_count: u64,
}

impl Stroll {
    /// Distance rounded half-away-from-zero to 3 decimals.
    pub fn rounded_distance_km(&self) -> f64 {
        stats::round_km(self.distance_km)
    }

    /// Duration in whole minutes, rounded half-away-from-zero.
    pub fn rounded_minutes(&self) -> f64 {
        stats::round_minutes(self.duration)
    }
}

/// What to do with a stroll that is still open when the track ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrailingStroll {
    /// Emit the open stroll as the final one
    #[default]
    Emit,
    /// Drop it; a stroll is only closed by a subsequent idle gap
    Discard,
}

/// Configuration for stroll segmentation and ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrollConfig {
    /// Gap between consecutive fixes at or above which a stroll is closed.
    /// Default: 30 minutes
    pub idle_threshold: Duration,

    /// Handling of the stroll still open at end of track.
    /// Default: [`TrailingStroll::Emit`]
    pub trailing: TrailingStroll,

    /// Number of strolls returned by top-N queries.
    /// Default: 10
    pub top_n: usize,
}

impl Default for StrollConfig {
    fn default() -> Self {
        Self {
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
            trailing: TrailingStroll::Emit,
            top_n: DEFAULT_TOP_N,
        }
    }
}

/// Aggregate over all strolls of a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsSummary {
    /// Number of strolls
    pub count: usize,
    /// Sum of stroll distances in kilometers
    pub total_distance_km: f64,
    /// Sum of stroll durations
    pub total_duration: Duration,
}

impl StatsSummary {
    /// Total distance rounded half-away-from-zero to 3 decimals.
    pub fn rounded_distance_km(&self) -> f64 {
        stats::round_km(self.total_distance_km)
    }

    /// Total duration in whole minutes, rounded half-away-from-zero.
    pub fn rounded_minutes(&self) -> f64 {
        stats::round_minutes(self.total_duration)
    }
}

/// A stroll annotated with its 1-based position in a top-N-by-distance ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedStroll {
    pub rank: usize,
    pub stroll: Stroll,
}

// ============================================================================
// Tests
// ============================================================================
