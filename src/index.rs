//! Per-individual trajectory index.
//!
//! Grouping partitions normalized points by individual and sorts each
//! group by timestamp; every downstream query relies on that ordering.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{TimeRange, TrackPoint};

/// Map of individual name to its time-ordered trajectory.
pub type TrajectoryIndex = BTreeMap<String, Trajectory>;

/// Time-ordered sequence of one individual's recorded fixes.
///
/// Construction sorts the points by timestamp (stable, so same-instant
/// fixes keep their source order). Consumers only ever see slices, so the
/// ordering invariant cannot be broken from outside.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    points: Vec<TrackPoint>,
}

impl Trajectory {
    /// Build a trajectory from points in any order.
    pub fn new(mut points: Vec<TrackPoint>) -> Self {
        points.sort_by_key(|point| point.timestamp);
        Self { points }
    }

    /// All fixes, oldest first.
    pub fn points(&self) -> &[TrackPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.points.first().map(|point| point.timestamp)
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.points.last().map(|point| point.timestamp)
    }

    /// Ordered prefix of fixes recorded at or before `t`.
    ///
    /// Binary search over the sorted order; equivalent to filtering the
    /// whole trajectory and keeping source order.
    pub fn points_up_to(&self, t: DateTime<Utc>) -> &[TrackPoint] {
        let end = self.points.partition_point(|point| point.timestamp <= t);
        &self.points[..end]
    }
}

/// Partition points by individual name, each group sorted by timestamp.
///
/// Every input point lands in exactly one trajectory; nothing is dropped
/// or duplicated.
pub fn group_by_individual(points: Vec<TrackPoint>) -> TrajectoryIndex {
    let mut groups: BTreeMap<String, Vec<TrackPoint>> = BTreeMap::new();
    for point in points {
        groups
            .entry(point.individual.clone())
            .or_default()
            .push(point);
    }
    groups
        .into_iter()
        .map(|(name, points)| (name, Trajectory::new(points)))
        .collect()
}

/// Min/max timestamp across all points, in one linear scan.
///
/// An empty input collapses to a range of "now": degenerate but defined,
/// so downstream consumers get an empty-but-functional timeline instead
/// of an error.
pub fn time_range_of(points: &[TrackPoint]) -> TimeRange {
    let Some(first) = points.first() else {
        let now = Utc::now();
        return TimeRange { start: now, end: now };
    };

    let mut start = first.timestamp;
    let mut end = first.timestamp;
    for point in points {
        if point.timestamp < start {
            start = point.timestamp;
        }
        if point.timestamp > end {
            end = point.timestamp;
        }
    }
    TimeRange { start, end }
}
