//! Stroll segmentation.
//!
//! Splits an ascending stream of [`TrackPoint`]s into [`Stroll`]s in a single
//! forward pass. Consecutive fixes closer in time than the idle threshold are
//! absorbed into the open stroll; a gap at or above the threshold closes it.
//!
//! Memory use is constant in the number of points: only the previous fix and
//! the open stroll are kept.
//!
//! Three surfaces share the same core:
//! - [`Segmenter`] - push-based, for callback-style sources
//! - [`Strolls`] - iterator adapter over fallible point iterators
//! - `segment_stream` - async consumption of a `futures::Stream` (feature `stream`)

use chrono::{DateTime, Utc};
use log::{debug, warn};
use std::time::Duration;

use crate::{
    geo_utils, Result, Stroll, StrollConfig, TrackPoint, TrailingStroll, NEAR_ZERO_DISTANCE_KM,
};

// Stroll under construction
#[derive(Debug)]
struct OpenStroll {
    distance_km: f64,
    duration: Duration,
    started_at: DateTime<Utc>,
    ended_at: DateTime<Utc>,
    point_count: u64,
}

impl OpenStroll {
    fn is_empty(&self) -> bool {
        self.distance_km <= NEAR_ZERO_DISTANCE_KM && self.duration.is_zero()
    }

    fn close(self) -> Stroll {
        Stroll {
            distance_km: self.distance_km,
            duration: self.duration,
            started_at: self.started_at,
            ended_at: self.ended_at,
            point_count: self.point_count,
        }
    }
}

/// Push-based stroll segmenter.
///
/// Feed points in ascending timestamp order with [`push`](Self::push), then call
/// [`finish`](Self::finish) once the track is exhausted. Each instance holds the
/// state of exactly one track and must not be shared between devices.
///
/// # Example
/// ```
/// use chrono::{TimeZone, Utc, Duration};
/// use stroll_tracker::{Segmenter, StrollConfig, TrackPoint};
///
/// let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
/// let mut segmenter = Segmenter::new(&StrollConfig::default());
/// assert!(segmenter.push(TrackPoint::new(t0, 0.0, 0.0)).is_none());
/// assert!(segmenter.push(TrackPoint::new(t0 + Duration::minutes(5), 0.0, 0.001)).is_none());
///
/// let last = segmenter.finish().unwrap();
/// assert_eq!(last.duration.as_secs(), 300);
/// ```
#[derive(Debug)]
pub struct Segmenter {
    idle_threshold: Duration,
    trailing: TrailingStroll,
    previous: Option<TrackPoint>,
    current: Option<OpenStroll>,
}

impl Segmenter {
    /// Create a segmenter with the threshold and trailing policy from `config`.
    pub fn new(config: &StrollConfig) -> Self {
        Self {
            idle_threshold: config.idle_threshold,
            trailing: config.trailing,
            previous: None,
            current: None,
        }
    }

    /// Consume the next point. Returns a stroll when this point's gap closed one.
    pub fn push(&mut self, point: TrackPoint) -> Option<Stroll> {
        let Some(previous) = self.previous.replace(point) else {
            // First fix only seeds `previous`
            return None;
        };

        let delta_time = match (point.timestamp - previous.timestamp).to_std() {
            Ok(delta) => delta,
            Err(_) => {
                warn!(
                    "[Segmenter] Out-of-order fix at {} (previous {}), treating gap as zero",
                    point.timestamp, previous.timestamp
                );
                Duration::ZERO
            }
        };

        if delta_time < self.idle_threshold {
            let delta_distance = geo_utils::haversine_km(&previous.position, &point.position);
            let open = self.current.get_or_insert_with(|| OpenStroll {
                distance_km: 0.0,
                duration: Duration::ZERO,
                started_at: previous.timestamp,
                ended_at: previous.timestamp,
                point_count: 1,
            });
            open.duration += delta_time;
            open.distance_km += delta_distance;
            open.ended_at = point.timestamp;
            open.point_count += 1;
            return None;
        }

        // Idle gap: close the open stroll, if it accumulated anything
        match self.current.take() {
            Some(open) if !open.is_empty() => {
                let stroll = open.close();
                debug!(
                    "[Segmenter] Closed stroll {} -> {}: {:.3}km over {:?} (gap {:?})",
                    stroll.started_at, stroll.ended_at, stroll.distance_km, stroll.duration, delta_time
                );
                Some(stroll)
            }
            _ => None,
        }
    }

    /// End of track. Returns the still-open stroll if the trailing policy emits it.
    pub fn finish(self) -> Option<Stroll> {
        let open = self.current.filter(|open| !open.is_empty())?;
        match self.trailing {
            TrailingStroll::Emit => Some(open.close()),
            TrailingStroll::Discard => {
                debug!(
                    "[Segmenter] Discarding open stroll at end of track ({:.3}km over {:?})",
                    open.distance_km, open.duration
                );
                None
            }
        }
    }
}

/// Iterator adapter yielding strolls from a fallible point iterator.
///
/// An upstream error is yielded once, after which the iterator is fused: the
/// stroll that was open at the time of failure is never reported.
pub struct Strolls<I> {
    points: I,
    segmenter: Option<Segmenter>,
}

impl<I> Strolls<I>
where
    I: Iterator<Item = Result<TrackPoint>>,
{
    pub fn new(points: I, config: &StrollConfig) -> Self {
        Self {
            points,
            segmenter: Some(Segmenter::new(config)),
        }
    }
}

impl<I> Iterator for Strolls<I>
where
    I: Iterator<Item = Result<TrackPoint>>,
{
    type Item = Result<Stroll>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.segmenter.as_ref()?;
            let point = match self.points.next() {
                Some(Ok(point)) => point,
                Some(Err(e)) => {
                    self.segmenter = None;
                    return Some(Err(e));
                }
                None => return self.segmenter.take().and_then(Segmenter::finish).map(Ok),
            };
            if let Some(stroll) = self.segmenter.as_mut()?.push(point) {
                return Some(Ok(stroll));
            }
        }
    }
}

/// Segment a fallible point sequence into strolls.
///
/// Stops at the first upstream error and returns it.
pub fn segment_points<I>(points: I, config: &StrollConfig) -> Result<Vec<Stroll>>
where
    I: IntoIterator<Item = Result<TrackPoint>>,
{
    Strolls::new(points.into_iter(), config).collect()
}

/// Segment an async stream of points into strolls.
///
/// Points are pulled one at a time; the first upstream error aborts
/// consumption and is returned unchanged.
#[cfg(feature = "stream")]
pub async fn segment_stream<S>(points: S, config: &StrollConfig) -> Result<Vec<Stroll>>
where
    S: futures::Stream<Item = Result<TrackPoint>>,
{
    use futures::StreamExt;

    futures::pin_mut!(points);
    let mut segmenter = Segmenter::new(config);
    let mut strolls = Vec::new();
    while let Some(point) = points.next().await {
        if let Some(stroll) = segmenter.push(point?) {
            strolls.push(stroll);
        }
    }
    strolls.extend(segmenter.finish());
    Ok(strolls)
}
