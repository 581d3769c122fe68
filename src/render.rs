//! Render-facing helpers: color assignment and trail shaping.
//!
//! The map renderer itself lives outside this crate; these are the parts
//! of its contract that are data rather than drawing.

use geo::algorithm::simplify::Simplify;
use geo::{Coord, LineString};
use serde::{Deserialize, Serialize};

use crate::TrackPoint;

/// How trails and markers are colored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisualizationMode {
    /// One fixed color per individual.
    #[default]
    Identity,
    /// Color by instantaneous speed.
    Speed,
}

/// An sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// CSS hex form, e.g. `#ff9f43`.
    pub fn hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Fixed identity palette for the tracked storks.
pub const IDENTITY_PALETTE: &[(&str, Rgb)] = &[
    ("Eric", Rgb(0xff, 0x9f, 0x43)),
    ("Nico", Rgb(0x00, 0xd9, 0xff)),
    ("Sanne", Rgb(0xff, 0x6b, 0x9d)),
];

const FALLBACK_COLOR: Rgb = Rgb(0xff, 0xff, 0xff);

/// Upper end of the speed color ramp, m/s; faster speeds saturate.
pub const SPEED_RAMP_MAX_MPS: f64 = 25.0;

/// Default trail decimation stride.
pub const TRAIL_STRIDE: usize = 5;

/// Identity color for an individual; names outside the palette get white.
pub fn individual_color(name: &str) -> Rgb {
    IDENTITY_PALETTE
        .iter()
        .find(|(known, _)| *known == name)
        .map(|(_, color)| *color)
        .unwrap_or(FALLBACK_COLOR)
}

/// Color for a speed on the 0–25 m/s turbo ramp.
pub fn speed_color(speed_mps: f64) -> Rgb {
    let t = (speed_mps / SPEED_RAMP_MAX_MPS).clamp(0.0, 1.0);
    let color = colorous::TURBO.eval_continuous(t);
    Rgb(color.r, color.g, color.b)
}

/// Every `stride`-th fix plus the final one, for cheaper trail drawing.
pub fn decimate_trail(points: &[TrackPoint], stride: usize) -> Vec<&TrackPoint> {
    if points.is_empty() {
        return Vec::new();
    }
    let stride = stride.max(1);
    let last = points.len() - 1;
    points
        .iter()
        .enumerate()
        .filter(|(i, _)| i % stride == 0 || *i == last)
        .map(|(_, point)| point)
        .collect()
}

/// Douglas–Peucker simplification of a trail to plain (lat, lon)
/// vertices. `tolerance` is in degrees (0.0001 ≈ 11 m).
pub fn simplify_trail(points: &[TrackPoint], tolerance: f64) -> Vec<(f64, f64)> {
    if points.len() < 2 {
        return points
            .iter()
            .map(|point| (point.latitude, point.longitude))
            .collect();
    }

    let line = LineString::new(
        points
            .iter()
            .map(|point| Coord {
                x: point.longitude,
                y: point.latitude,
            })
            .collect(),
    );

    line.simplify(&tolerance)
        .coords()
        .map(|coord| (coord.y, coord.x))
        .collect()
}
