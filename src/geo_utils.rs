//! # Geographic Utilities
//!
//! Distance computations used by the stroll segmenter.
//!
//! ## Overview
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`haversine_km`] | Great-circle distance between two GPS points in kilometers |
//! | [`polyline_length_km`] | Total length of a GPS track in kilometers |
//!
//! ## Example
//!
//! ```rust
//! use stroll_tracker::{GpsPoint, geo_utils};
//!
//! let track = vec![
//!     GpsPoint::new(0.0, 0.000),
//!     GpsPoint::new(0.0, 0.001),
//!     GpsPoint::new(0.0, 0.002),
//! ];
//!
//! let length = geo_utils::polyline_length_km(&track);
//! println!("Track length: {:.3}km", length);
//! ```
//!
//! ## Algorithm Notes
//!
//! ### Haversine Formula
//!
//! The haversine formula calculates the great-circle distance between two points on a
//! sphere. A spherical Earth of radius 6,371 km is assumed; the result is accurate to
//! within about 0.5% of the ellipsoidal distance, which is far below GPS noise for
//! walking-scale tracks.
//!
//! Reference: [Haversine formula (Wikipedia)](https://en.wikipedia.org/wiki/Haversine_formula)
//!
//! ### Coordinate System
//!
//! All functions expect WGS84 coordinates (latitude/longitude in degrees). Coordinates
//! are not validated here; see [`GpsPoint::is_valid`](crate::GpsPoint::is_valid).

use crate::GpsPoint;

/// Mean Earth radius used for all distance computations, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Calculate the great-circle distance between two GPS points using the Haversine formula.
///
/// Returns the distance in kilometers. Identical points yield exactly `0.0`, and the
/// result is symmetric in its arguments.
///
/// # Example
///
/// ```rust
/// use stroll_tracker::{GpsPoint, geo_utils};
///
/// let london = GpsPoint::new(51.5074, -0.1278);
/// let paris = GpsPoint::new(48.8566, 2.3522);
///
/// let distance = geo_utils::haversine_km(&london, &paris);
/// assert!((distance - 343.5).abs() < 1.0);
/// ```
#[inline]
pub fn haversine_km(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let lat1 = p1.latitude.to_radians();
    let lat2 = p2.latitude.to_radians();
    let d_lat = lat2 - lat1;
    let d_lon = p2.longitude.to_radians() - p1.longitude.to_radians();

    let half_lat = (d_lat / 2.0).sin();
    let half_lon = (d_lon / 2.0).sin();
    let a = half_lat * half_lat + lat1.cos() * lat2.cos() * half_lon * half_lon;
    // Rounding can push `a` a hair past 1 for antipodal points
    let a = a.clamp(0.0, 1.0);

    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Calculate the total length of a polyline (GPS track) in kilometers.
///
/// Sums the haversine distance between consecutive points. Empty or single-point
/// tracks return 0.0.
pub fn polyline_length_km(points: &[GpsPoint]) -> f64 {
    if points.len() < 2 {
        return 0.0;
    }

    points
        .windows(2)
        .map(|w| haversine_km(&w[0], &w[1]))
        .sum()
}

// =============================================================================
// Unit Tests
// =============================================================================
