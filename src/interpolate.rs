//! Position interpolation between recorded samples.
//!
//! A query instant is bracketed by its anchor (last fix at or before the
//! instant) and next (first fix after it). Only latitude and longitude
//! are blended; altitude, speed and direction are sensor readings, not
//! geometry, and carry forward from the anchor verbatim.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::index::{Trajectory, TrajectoryIndex};
use crate::CurrentPosition;

/// Interpolated position of one individual at instant `t`.
///
/// Returns `None` when `t` is before the individual's first sample. At or
/// after the last sample the anchor's raw values are returned unchanged,
/// with no extrapolation.
pub fn position_at(trajectory: &Trajectory, t: DateTime<Utc>) -> Option<CurrentPosition> {
    let visible = trajectory.points_up_to(t);
    let anchor = visible.last()?;

    let mut position = CurrentPosition {
        lat: anchor.latitude,
        lon: anchor.longitude,
        altitude: anchor.altitude,
        speed: anchor.speed,
        direction: anchor.direction,
        timestamp: anchor.timestamp,
    };

    if let Some(next) = trajectory.points().get(visible.len()) {
        // next is strictly after t and the anchor, so the span is positive
        // and f lands in [0, 1) by construction
        let span = (next.timestamp - anchor.timestamp).num_milliseconds() as f64;
        let f = (t - anchor.timestamp).num_milliseconds() as f64 / span;
        position.lat = anchor.latitude + f * (next.latitude - anchor.latitude);
        position.lon = anchor.longitude + f * (next.longitude - anchor.longitude);
    }

    Some(position)
}

/// Positions of every individual at instant `t`.
///
/// Individuals whose tracks have not started yet are omitted rather than
/// failing the batch.
pub fn current_positions(
    index: &TrajectoryIndex,
    t: DateTime<Utc>,
) -> BTreeMap<String, CurrentPosition> {
    index
        .iter()
        .filter_map(|(name, trajectory)| {
            position_at(trajectory, t).map(|position| (name.clone(), position))
        })
        .collect()
}

/// Mean (lat, lon) of the current positions, for camera auto-tracking.
/// `None` when no individual has a position yet.
pub fn positions_centroid(positions: &BTreeMap<String, CurrentPosition>) -> Option<(f64, f64)> {
    if positions.is_empty() {
        return None;
    }
    let n = positions.len() as f64;
    let (lat_sum, lon_sum) = positions
        .values()
        .fold((0.0, 0.0), |(lat, lon), p| (lat + p.lat, lon + p.lon));
    Some((lat_sum / n, lon_sum / n))
}
