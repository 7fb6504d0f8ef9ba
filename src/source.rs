//! Track sources.
//!
//! A [`TrackSource`] streams one device's fixes in ascending timestamp order.
//! Sources push points into a visitor instead of returning an iterator so that
//! cursor-backed implementations (a prepared SQLite statement borrowing its
//! connection) can stream rows without buffering the whole track.

use log::debug;
use std::collections::HashMap;

use crate::{DeviceId, Result, Segmenter, Stroll, StrollConfig, TrackPoint};

/// Producer of ordered track points for a device.
pub trait TrackSource {
    /// Call `visit` once per fix of `device`, oldest first.
    ///
    /// An error returned by `visit` must abort the traversal and be returned
    /// unchanged. An unknown device is an empty track, not an error.
    fn visit_points(
        &self,
        device: &DeviceId,
        visit: &mut dyn FnMut(TrackPoint) -> Result<()>,
    ) -> Result<()>;
}

/// Stream a device's track from `source` through a fresh [`Segmenter`].
///
/// Memory use is bounded by the number of strolls, not the number of points.
/// A source failure aborts the pass and is returned; strolls already closed
/// before the failure are discarded with it.
pub fn collect_strolls<S>(source: &S, device: &DeviceId, config: &StrollConfig) -> Result<Vec<Stroll>>
where
    S: TrackSource + ?Sized,
{
    let mut segmenter = Segmenter::new(config);
    let mut strolls = Vec::new();
    let mut point_count: u64 = 0;

    source.visit_points(device, &mut |point| {
        point_count += 1;
        strolls.extend(segmenter.push(point));
        Ok(())
    })?;
    strolls.extend(segmenter.finish());

    debug!(
        "[collect_strolls] {}: {} points -> {} strolls",
        device,
        point_count,
        strolls.len()
    );
    Ok(strolls)
}

/// In-memory track source keyed by device.
#[derive(Debug, Clone, Default)]
pub struct MemoryTrackSource {
    tracks: HashMap<DeviceId, Vec<TrackPoint>>,
}

impl MemoryTrackSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append fixes for a device. The stored track is kept sorted by timestamp.
    pub fn insert(&mut self, device: DeviceId, points: impl IntoIterator<Item = TrackPoint>) {
        let track = self.tracks.entry(device).or_default();
        track.extend(points);
        track.sort_by_key(|p| p.timestamp);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_track(mut self, device: DeviceId, points: impl IntoIterator<Item = TrackPoint>) -> Self {
        self.insert(device, points);
        self
    }

    /// Number of fixes stored for a device.
    pub fn point_count(&self, device: &DeviceId) -> usize {
        self.tracks.get(device).map_or(0, Vec::len)
    }
}

impl TrackSource for MemoryTrackSource {
    fn visit_points(
        &self,
        device: &DeviceId,
        visit: &mut dyn FnMut(TrackPoint) -> Result<()>,
    ) -> Result<()> {
        for point in self.tracks.get(device).into_iter().flatten() {
            visit(*point)?;
        }
        Ok(())
    }
}
