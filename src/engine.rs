//! Stateful engine facade.
//!
//! [`MigrationEngine`] owns the trajectory index and the playback clock
//! and exposes the query/control surface the rendering layer consumes.
//! It is an ordinary owned value: callers construct one per
//! visualization mount and drop it on unmount; there is no shared static
//! behind it.
//!
//! Loading is all-or-nothing: a constructor either returns a fully built
//! index or an error, never a partially populated engine.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};

use crate::cache::TtlCache;
use crate::distance::total_distance_km;
use crate::error::{MigrationError, Result};
use crate::index::{group_by_individual, time_range_of, TrajectoryIndex};
use crate::interpolate::{current_positions, position_at, positions_centroid};
use crate::normalize::{parse_compact, parse_csv};
use crate::playback::{PlaybackClock, PlaybackConfig, PlaybackState};
use crate::render::VisualizationMode;
use crate::{CurrentPosition, TimeRange, TrackPoint};

/// Floor of the altitude gauge in meters, so the meter has a sensible
/// scale before any individual has climbed.
const ALTITUDE_GAUGE_FLOOR_M: f64 = 500.0;

/// Construction parameters for [`MigrationEngine`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Playback clock tuning.
    pub playback: PlaybackConfig,
    /// Entries kept in the per-individual summary cache.
    /// Default: 64.
    pub summary_cache_capacity: usize,
    /// How long a cached summary stays valid.
    /// Default: 60 seconds.
    pub summary_cache_ttl: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            playback: PlaybackConfig::default(),
            summary_cache_capacity: 64,
            summary_cache_ttl: Duration::from_secs(60),
        }
    }
}

/// Aggregate facts about the loaded dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub point_count: usize,
    pub individual_count: usize,
    pub days_covered: i64,
}

/// Derived per-individual stats at a query instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndividualSummary {
    /// Great-circle distance over the visible prefix, km.
    pub distance_km: f64,
    /// Last-known altitude, m.
    pub altitude: f64,
    /// Last-known speed, m/s.
    pub speed: f64,
    /// Highest altitude seen so far, floored at the gauge scale.
    pub max_altitude: f64,
    /// Banded speed level 1..=5 for the indicator dots.
    pub speed_level: u8,
    /// Altitude as a percentage of the running maximum, 0-100.
    pub altitude_percent: f64,
}

fn speed_level(speed_mps: f64) -> u8 {
    match speed_mps {
        s if s < 2.0 => 1,
        s if s < 5.0 => 2,
        s if s < 10.0 => 3,
        s if s < 15.0 => 4,
        _ => 5,
    }
}

/// Stateful facade tying the trajectory index and playback clock together.
pub struct MigrationEngine {
    trajectories: TrajectoryIndex,
    time_range: TimeRange,
    point_count: usize,
    clock: PlaybackClock,
    auto_track: bool,
    mode: VisualizationMode,
    // Keyed by (individual, visible prefix length): within one prefix the
    // anchor is fixed, so every summary field is constant
    summary_cache: TtlCache<(String, usize), IndividualSummary>,
}

impl MigrationEngine {
    /// Build an engine from the compact dataset format.
    pub fn from_compact_json(text: &str) -> Result<Self> {
        Self::from_compact_json_with(text, EngineConfig::default())
    }

    pub fn from_compact_json_with(text: &str, config: EngineConfig) -> Result<Self> {
        Self::build(parse_compact(text)?, config)
    }

    /// Build an engine from the raw CSV export.
    pub fn from_csv(text: &str) -> Result<Self> {
        Self::from_csv_with(text, EngineConfig::default())
    }

    pub fn from_csv_with(text: &str, config: EngineConfig) -> Result<Self> {
        Self::build(parse_csv(text)?, config)
    }

    /// Build an engine from already-normalized points.
    pub fn from_points(points: Vec<TrackPoint>, config: EngineConfig) -> Result<Self> {
        Self::build(points, config)
    }

    fn build(points: Vec<TrackPoint>, config: EngineConfig) -> Result<Self> {
        if config.summary_cache_capacity == 0 {
            return Err(MigrationError::Config {
                message: "summary cache capacity must be at least 1".to_string(),
            });
        }

        let time_range = time_range_of(&points);
        let point_count = points.len();
        let trajectories = group_by_individual(points);
        info!(
            "indexed {} fixes across {} individuals",
            point_count,
            trajectories.len()
        );

        Ok(Self {
            trajectories,
            time_range,
            point_count,
            clock: PlaybackClock::with_config(time_range, config.playback),
            auto_track: true,
            mode: VisualizationMode::default(),
            summary_cache: TtlCache::new(config.summary_cache_capacity, config.summary_cache_ttl),
        })
    }

    // ========================================================================
    // Query Surface
    // ========================================================================

    /// The full per-individual trajectory index.
    pub fn trajectories(&self) -> &TrajectoryIndex {
        &self.trajectories
    }

    /// Span of the loaded dataset.
    pub fn time_range(&self) -> TimeRange {
        self.time_range
    }

    /// Dataset totals for the info panel.
    pub fn stats(&self) -> DatasetStats {
        DatasetStats {
            point_count: self.point_count,
            individual_count: self.trajectories.len(),
            days_covered: self.time_range.days_covered(),
        }
    }

    /// Per-individual trail prefixes visible at instant `t`.
    pub fn visible_points(&self, t: DateTime<Utc>) -> BTreeMap<&str, &[TrackPoint]> {
        self.trajectories
            .iter()
            .map(|(name, trajectory)| (name.as_str(), trajectory.points_up_to(t)))
            .collect()
    }

    /// Interpolated positions of every individual at instant `t`;
    /// individuals whose tracks have not started are omitted.
    pub fn current_positions(&self, t: DateTime<Utc>) -> BTreeMap<String, CurrentPosition> {
        current_positions(&self.trajectories, t)
    }

    /// Mean (lat, lon) of the current positions, for camera tracking.
    pub fn centroid(&self, t: DateTime<Utc>) -> Option<(f64, f64)> {
        positions_centroid(&self.current_positions(t))
    }

    /// Total great-circle distance of one individual's full trajectory,
    /// km. Unknown individuals report 0.
    pub fn total_distance_km(&self, individual: &str) -> f64 {
        self.trajectories
            .get(individual)
            .map(|trajectory| total_distance_km(trajectory.points()))
            .unwrap_or(0.0)
    }

    /// Derived stats card for one individual at instant `t`.
    ///
    /// `None` only for unknown individuals; before a track starts the
    /// summary reports zeros, matching an empty-but-rendered card.
    pub fn summary(&mut self, individual: &str, t: DateTime<Utc>) -> Option<IndividualSummary> {
        let trajectory = self.trajectories.get(individual)?;
        let visible = trajectory.points_up_to(t);

        let key = (individual.to_string(), visible.len());
        if let Some(summary) = self.summary_cache.get(&key) {
            return Some(*summary);
        }

        let position = position_at(trajectory, t);
        let altitude = position.map(|p| p.altitude).unwrap_or(0.0);
        let speed = position.map(|p| p.speed).unwrap_or(0.0);
        let max_altitude = visible
            .iter()
            .map(|p| p.altitude)
            .fold(ALTITUDE_GAUGE_FLOOR_M, f64::max);

        let summary = IndividualSummary {
            distance_km: total_distance_km(visible),
            altitude,
            speed,
            max_altitude,
            speed_level: speed_level(speed),
            altitude_percent: (altitude / max_altitude * 100.0).min(100.0),
        };
        self.summary_cache.insert(key, summary);
        Some(summary)
    }

    // ========================================================================
    // Playback Control Surface
    // ========================================================================

    pub fn play(&mut self) {
        self.clock.play();
    }

    pub fn pause(&mut self) {
        self.clock.pause();
    }

    pub fn toggle_play(&mut self) {
        self.clock.toggle();
    }

    /// Move the cursor, clamped to the dataset's range.
    pub fn seek(&mut self, t: DateTime<Utc>) {
        self.clock.seek(t);
    }

    pub fn set_speed(&mut self, multiplier: f64) {
        self.clock.set_speed(multiplier);
    }

    pub fn set_auto_track(&mut self, enabled: bool) {
        self.auto_track = enabled;
    }

    pub fn set_visualization_mode(&mut self, mode: VisualizationMode) {
        self.mode = mode;
    }

    /// Advance the playback clock by `elapsed` wall time; returns the
    /// committed cursor when the visible time moved.
    pub fn tick(&mut self, elapsed: Duration) -> Option<DateTime<Utc>> {
        self.clock.tick(elapsed)
    }

    pub fn current_time(&self) -> DateTime<Utc> {
        self.clock.current_time()
    }

    pub fn is_playing(&self) -> bool {
        self.clock.is_playing()
    }

    /// Snapshot of the transport and view state for renderers.
    pub fn playback_state(&self) -> PlaybackState {
        PlaybackState {
            current_time: self.clock.current_time(),
            is_playing: self.clock.is_playing(),
            speed: self.clock.speed(),
            auto_track: self.auto_track,
            visualization_mode: self.mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const DATASET: &str = r#"{
        "Eric": [[1000, 100, 0.0, 0.0, 5.0], [2000, 200, 0.0, 1.0, 10.0]],
        "Nico": [[1500, 50, 10.0, 10.0, 1.0]]
    }"#;

    fn ts(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn test_load_builds_full_index() {
        let engine = MigrationEngine::from_compact_json(DATASET).unwrap();

        assert_eq!(engine.trajectories().len(), 2);
        assert_eq!(engine.time_range().start, ts(1_000));
        assert_eq!(engine.time_range().end, ts(2_000));

        let stats = engine.stats();
        assert_eq!(stats.point_count, 3);
        assert_eq!(stats.individual_count, 2);
        assert_eq!(stats.days_covered, 1);
    }

    #[test]
    fn test_load_failure_is_fatal() {
        assert!(MigrationEngine::from_compact_json("{broken").is_err());
    }

    #[test]
    fn test_zero_capacity_is_config_error() {
        let config = EngineConfig {
            summary_cache_capacity: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            MigrationEngine::from_compact_json_with(DATASET, config),
            Err(MigrationError::Config { .. })
        ));
    }

    #[test]
    fn test_queries_at_cursor() {
        let engine = MigrationEngine::from_compact_json(DATASET).unwrap();

        let visible = engine.visible_points(ts(1_500));
        assert_eq!(visible["Eric"].len(), 1);
        assert_eq!(visible["Nico"].len(), 1);

        let positions = engine.current_positions(ts(1_500));
        assert!((positions["Eric"].lon - 0.5).abs() < 1e-9);
        assert_eq!(positions["Eric"].speed, 5.0);
        assert_eq!(positions["Nico"].lat, 10.0);

        // Before anyone's first sample the batch is empty, not an error
        assert!(engine.current_positions(ts(500)).is_empty());
        assert!(engine.centroid(ts(500)).is_none());

        let (lat, lon) = engine.centroid(ts(1_500)).unwrap();
        assert!((lat - 5.0).abs() < 1e-9);
        assert!((lon - 5.25).abs() < 1e-9);
    }

    #[test]
    fn test_total_distance() {
        let engine = MigrationEngine::from_compact_json(DATASET).unwrap();

        // Eric flies one degree of longitude along the equator
        assert!((engine.total_distance_km("Eric") - 111.19).abs() < 0.5);
        assert_eq!(engine.total_distance_km("Nico"), 0.0);
        assert_eq!(engine.total_distance_km("Stranger"), 0.0);
    }

    #[test]
    fn test_summary_card_values() {
        let mut engine = MigrationEngine::from_compact_json(DATASET).unwrap();

        let summary = engine.summary("Eric", ts(2_000)).unwrap();
        assert!((summary.distance_km - 111.19).abs() < 0.5);
        assert_eq!(summary.altitude, 200.0);
        assert_eq!(summary.speed, 10.0);
        assert_eq!(summary.speed_level, 4);
        // Both fixes are below the gauge floor
        assert_eq!(summary.max_altitude, 500.0);
        assert_eq!(summary.altitude_percent, 40.0);

        // Cached result is identical
        assert_eq!(engine.summary("Eric", ts(2_000)), Some(summary));

        // Before the track starts: a zeroed card, not absence
        let early = engine.summary("Eric", ts(0)).unwrap();
        assert_eq!(early.distance_km, 0.0);
        assert_eq!(early.speed_level, 1);

        assert!(engine.summary("Stranger", ts(2_000)).is_none());
    }

    #[test]
    fn test_transport_round_trip() {
        let mut engine = MigrationEngine::from_compact_json(DATASET).unwrap();

        assert!(!engine.is_playing());
        engine.play();
        assert!(engine.is_playing());

        engine.seek(ts(0));
        assert_eq!(engine.current_time(), ts(1_000));

        engine.set_speed(5.0);
        engine.set_auto_track(false);
        engine.set_visualization_mode(VisualizationMode::Speed);

        let state = engine.playback_state();
        assert!(state.is_playing);
        assert_eq!(state.speed, 5.0);
        assert!(!state.auto_track);
        assert_eq!(state.visualization_mode, VisualizationMode::Speed);
    }

    #[test]
    fn test_empty_dataset_is_functional() {
        let engine = MigrationEngine::from_compact_json("{}").unwrap();

        assert_eq!(engine.time_range().start, engine.time_range().end);
        assert!(engine.visible_points(Utc::now()).is_empty());
        assert!(engine.current_positions(Utc::now()).is_empty());
        assert_eq!(engine.stats().point_count, 0);
        assert_eq!(engine.stats().days_covered, 0);
    }
}
