//! # Migration Replay
//!
//! Track indexing, position interpolation and timeline playback for
//! historical GPS migration datasets.
//!
//! This library provides:
//! - Normalization of raw GPS fixes (research CSV or compact JSON)
//! - A per-individual trajectory index with time-ordered queries
//! - Linear position interpolation between recorded samples
//! - Great-circle distance accumulation along trails
//! - A throttled playback clock with transport controls
//!
//! The crate is an in-process library: a rendering layer fetches the
//! dataset, hands the text to [`MigrationEngine`], and re-derives visible
//! trails and current positions from the playback cursor on every tick.
//!
//! ## Quick Start
//!
//! ```rust
//! use migration_replay::MigrationEngine;
//!
//! let dataset = r#"{"Eric": [[1370044800000, 10, 52.3, 4.9, 3.2],
//!                            [1370048400000, 12, 52.2, 4.8, 4.1]]}"#;
//! let engine = MigrationEngine::from_compact_json(dataset).unwrap();
//!
//! let range = engine.time_range();
//! let positions = engine.current_positions(range.start);
//! assert!(positions.contains_key("Eric"));
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{MigrationError, Result};

// Record normalization (CSV and compact JSON input formats)
pub mod normalize;
pub use normalize::{parse_compact, parse_csv, UNKNOWN_INDIVIDUAL};

// Per-individual trajectory index
pub mod index;
pub use index::{group_by_individual, time_range_of, Trajectory, TrajectoryIndex};

// Position interpolation between recorded samples
pub mod interpolate;
pub use interpolate::{current_positions, position_at, positions_centroid};

// Great-circle distance accumulation
pub mod distance;
pub use distance::{haversine_km, total_distance_km, EARTH_RADIUS_KM};

// Playback clock and cooperative ticker
pub mod playback;
pub use playback::{PlaybackClock, PlaybackConfig, PlaybackState, Ticker};

// Scoped TTL cache for derived per-individual stats
pub mod cache;
pub use cache::TtlCache;

// Stateful engine facade consumed by the rendering layer
pub mod engine;
pub use engine::{DatasetStats, EngineConfig, IndividualSummary, MigrationEngine};

// Render-facing helpers (colors, trail shaping)
pub mod render;
pub use render::{
    decimate_trail, individual_color, simplify_trail, speed_color, Rgb, VisualizationMode,
};

// Review score variants (blog-side scoring, kept out of the tracking core)
pub mod review;
pub use review::ReviewScores;

const MS_PER_DAY: i64 = 86_400_000;

// ============================================================================
// Core Types
// ============================================================================

/// One GPS fix for one tracked individual.
///
/// Immutable once constructed. Missing numeric source fields default to 0
/// and a missing name defaults to [`UNKNOWN_INDIVIDUAL`] rather than
/// failing the row (see [`normalize`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackPoint {
    /// Sequence number, unique within one load.
    pub id: u64,
    /// Instant the fix was recorded, millisecond precision.
    pub timestamp: DateTime<Utc>,
    /// Decimal degrees.
    pub latitude: f64,
    /// Decimal degrees.
    pub longitude: f64,
    /// Meters above sea level.
    pub altitude: f64,
    /// Meters per second.
    pub speed: f64,
    /// Degrees clockwise from north; 0 when the source format had none.
    pub direction: f64,
    /// Name of the tracked individual, e.g. "Eric".
    pub individual: String,
}

/// Span of the loaded dataset: min/max timestamp across all trajectories.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Whether `t` falls within the range, endpoints included.
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.start && t <= self.end
    }

    /// Clamp an instant into the range.
    pub fn clamp(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        t.max(self.start).min(self.end)
    }

    /// Whole span of the range.
    pub fn duration(&self) -> chrono::Duration {
        self.end - self.start
    }

    /// Days covered by the range, rounded up.
    pub fn days_covered(&self) -> i64 {
        let ms = self.duration().num_milliseconds();
        (ms + MS_PER_DAY - 1) / MS_PER_DAY
    }

    /// Position of `t` within the range as a fraction in `[0, 1]`.
    /// A collapsed range reports 0.
    pub fn progress(&self, t: DateTime<Utc>) -> f64 {
        let total = self.duration().num_milliseconds();
        if total <= 0 {
            return 0.0;
        }
        let at = (t - self.start).num_milliseconds();
        (at as f64 / total as f64).clamp(0.0, 1.0)
    }
}

/// Interpolated state of one individual at a query instant.
///
/// Latitude and longitude are blended between the bracketing samples;
/// altitude, speed and direction are the anchor's last-known readings.
/// Derived per query, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurrentPosition {
    pub lat: f64,
    pub lon: f64,
    pub altitude: f64,
    pub speed: f64,
    pub direction: f64,
    /// Timestamp of the anchor sample.
    pub timestamp: DateTime<Utc>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn test_time_range_contains_and_clamp() {
        let range = TimeRange {
            start: ts(1_000),
            end: ts(5_000),
        };

        assert!(range.contains(ts(1_000)));
        assert!(range.contains(ts(5_000)));
        assert!(!range.contains(ts(999)));

        assert_eq!(range.clamp(ts(0)), ts(1_000));
        assert_eq!(range.clamp(ts(9_000)), ts(5_000));
        assert_eq!(range.clamp(ts(3_000)), ts(3_000));
    }

    #[test]
    fn test_time_range_progress() {
        let range = TimeRange {
            start: ts(0),
            end: ts(10_000),
        };

        assert_eq!(range.progress(ts(0)), 0.0);
        assert_eq!(range.progress(ts(5_000)), 0.5);
        assert_eq!(range.progress(ts(10_000)), 1.0);
        // Out-of-range instants are clamped
        assert_eq!(range.progress(ts(20_000)), 1.0);
    }

    #[test]
    fn test_collapsed_range_progress_is_zero() {
        let range = TimeRange {
            start: ts(42),
            end: ts(42),
        };
        assert_eq!(range.progress(ts(42)), 0.0);
    }

    #[test]
    fn test_days_covered_rounds_up() {
        let range = TimeRange {
            start: ts(0),
            end: ts(MS_PER_DAY + 1),
        };
        assert_eq!(range.days_covered(), 2);
    }
}
