//! Record normalization for the two migration dataset formats.
//!
//! Raw fixes arrive either as the research CSV export or as the compact
//! per-individual tuple map produced by the offline downsampling step
//! (1 of every 5 raw samples kept). Both normalize to a flat
//! `Vec<TrackPoint>`; malformed rows are dropped, not errors.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use log::{debug, info};

use crate::error::Result;
use crate::TrackPoint;

/// Name assigned when a row carries no individual name.
pub const UNKNOWN_INDIVIDUAL: &str = "Unknown";

/// Field count of a complete CSV data row:
/// `[id, altitude, datetime, device_id, direction, lat, lon, speed, name]`.
const CSV_FIELD_COUNT: usize = 9;

/// Datetime layout of the CSV export when it is not RFC 3339.
const CSV_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One compact tuple: `[epoch_ms, altitude, lat, lon, speed]`.
type CompactTuple = (i64, f64, f64, f64, f64);

/// Parse the raw CSV export into normalized track points.
///
/// The header row is skipped. A data row is dropped (never an error) when
/// it has fewer than [`CSV_FIELD_COUNT`] fields or its datetime does not
/// parse; numeric fields default to 0 when non-numeric. Source order is
/// preserved.
pub fn parse_csv(text: &str) -> Result<Vec<TrackPoint>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    // A dataset that cannot be read at all fails here, before any row
    reader.headers()?;

    let mut points = Vec::new();
    let mut dropped = 0usize;
    for (row, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(_) => {
                dropped += 1;
                continue;
            }
        };
        match parse_row(&record, row) {
            Some(point) => points.push(point),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!("dropped {dropped} malformed csv rows");
    }
    info!("normalized {} fixes from csv", points.len());
    Ok(points)
}

fn parse_row(record: &csv::StringRecord, row: usize) -> Option<TrackPoint> {
    if record.len() < CSV_FIELD_COUNT {
        return None;
    }
    let timestamp = parse_instant(record.get(2)?)?;

    let individual = match record.get(8) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => UNKNOWN_INDIVIDUAL.to_string(),
    };

    Some(TrackPoint {
        id: record
            .get(0)
            .and_then(|field| field.parse().ok())
            .unwrap_or(row as u64 + 1),
        timestamp,
        latitude: numeric(record.get(5)),
        longitude: numeric(record.get(6)),
        altitude: numeric(record.get(1)),
        speed: numeric(record.get(7)),
        direction: numeric(record.get(4)),
        individual,
    })
}

fn numeric(field: Option<&str>) -> f64 {
    field.and_then(|field| field.parse().ok()).unwrap_or(0.0)
}

/// The export carries either RFC 3339 stamps or plain
/// `YYYY-MM-DD HH:MM:SS` (taken as UTC).
fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, CSV_DATETIME_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Expand the compact dataset (individual name → tuple array) into
/// normalized track points, sorted by timestamp ascending.
///
/// The compact format has no direction channel, so `direction` is 0.
/// Tuples from different individuals interleave in time, hence the sort.
/// JSON that fails to deserialize is a fatal parse error.
pub fn parse_compact(text: &str) -> Result<Vec<TrackPoint>> {
    let tracks: BTreeMap<String, Vec<CompactTuple>> = serde_json::from_str(text)?;

    let mut points = Vec::new();
    let mut dropped = 0usize;
    let mut id = 0u64;
    for (individual, tuples) in &tracks {
        for &(epoch_ms, altitude, latitude, longitude, speed) in tuples {
            let Some(timestamp) = DateTime::from_timestamp_millis(epoch_ms) else {
                dropped += 1;
                continue;
            };
            id += 1;
            points.push(TrackPoint {
                id,
                timestamp,
                latitude,
                longitude,
                altitude,
                speed,
                direction: 0.0,
                individual: individual.clone(),
            });
        }
    }

    // Stable, so same-instant fixes keep their per-individual order
    points.sort_by_key(|point| point.timestamp);

    if dropped > 0 {
        debug!("dropped {dropped} compact tuples with out-of-range timestamps");
    }
    info!(
        "normalized {} fixes for {} individuals from compact dataset",
        points.len(),
        tracks.len()
    );
    Ok(points)
}
