//! Data models for the printing map.
//!
//! This module contains the core data structures shared by the dataset
//! loader, the aggregator, the playback loop and the report generator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One dated, geo-located count from the static dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoTemporalRecord {
    /// Calendar year the record belongs to.
    pub year: i32,
    /// Place name, the aggregation key.
    pub place: String,
    /// Number of editions attributed to `place` in `year`.
    pub count: u64,
    /// Latitude of the place.
    pub lat: f64,
    /// Longitude of the place.
    pub lng: f64,
}

impl GeoTemporalRecord {
    /// Creates a record.
    pub fn new(year: i32, place: impl Into<String>, count: u64, lat: f64, lng: f64) -> Self {
        Self {
            year,
            place: place.into(),
            count,
            lat,
            lng,
        }
    }
}

/// Per-place aggregation for a single cursor year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedLocation {
    pub place: String,
    pub lat: f64,
    pub lng: f64,
    /// Editions up to and including the cursor year.
    pub cumulative_total: u64,
    /// Editions in the cursor year only.
    pub yearly_count: u64,
    /// Share of the cursor year's output across all places, 0-100.
    pub yearly_percent: f64,
}

impl AggregatedLocation {
    /// Whether the place printed anything in the cursor year.
    pub fn is_active(&self) -> bool {
        self.yearly_count > 0
    }
}

/// Aggregation result for one cursor year plus its headline totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSnapshot {
    pub year: i32,
    pub locations: Vec<AggregatedLocation>,
    /// Sum of `yearly_count` over all places.
    pub total_this_year: u64,
    /// Sum of `cumulative_total` over all places.
    pub grand_total: u64,
    /// Places with `yearly_count > 0`.
    pub active_places: usize,
    /// Places with any history by `year`.
    pub total_places: usize,
}

impl YearSnapshot {
    /// Builds a snapshot, deriving the totals from `locations`.
    pub fn new(year: i32, locations: Vec<AggregatedLocation>) -> Self {
        let total_this_year = locations
            .iter()
            .fold(0u64, |acc, l| acc.saturating_add(l.yearly_count));
        let grand_total = locations
            .iter()
            .fold(0u64, |acc, l| acc.saturating_add(l.cumulative_total));
        let active_places = locations.iter().filter(|l| l.is_active()).count();
        let total_places = locations.len();

        Self {
            year,
            locations,
            total_this_year,
            grand_total,
            active_places,
            total_places,
        }
    }

    /// True when no place has any history by this year.
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

/// RGBA color, as consumed by map renderers.
pub type Rgba = [u8; 4];

/// Render-ready representation of one location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapPoint {
    pub place: String,
    /// `[lng, lat]`, the order map layers expect.
    pub position: [f64; 2],
    /// Radius in metres.
    pub radius: f64,
    pub fill_color: Rgba,
    pub line_color: Rgba,
}

/// One row of the timeline report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineRow {
    pub year: i32,
    pub total_this_year: u64,
    pub active_places: usize,
    pub grand_total: u64,
    pub total_places: usize,
    /// Busiest place of the year, if any place was active.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leader: Option<String>,
}

impl From<&YearSnapshot> for TimelineRow {
    fn from(snapshot: &YearSnapshot) -> Self {
        let leader = crate::analysis::top_by_yearly(&snapshot.locations, 1)
            .into_iter()
            .next()
            .map(|l| l.place.clone());

        Self {
            year: snapshot.year,
            total_this_year: snapshot.total_this_year,
            active_places: snapshot.active_places,
            grand_total: snapshot.grand_total,
            total_places: snapshot.total_places,
            leader,
        }
    }
}

/// Inclusive year range for playback and the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl YearRange {
    /// Creates a range, swapping the bounds if given in reverse.
    pub fn new(start: i32, end: i32) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    /// Clamps a year into the range.
    pub fn clamp(&self, year: i32) -> i32 {
        year.clamp(self.start, self.end)
    }

    /// Number of years covered.
    pub fn len(&self) -> u64 {
        (i64::from(self.end) - i64::from(self.start) + 1) as u64
    }

    /// Years elapsed since `start`, zero for years before it.
    pub fn offset(&self, year: i32) -> u64 {
        (i64::from(year) - i64::from(self.start)).max(0) as u64
    }

    /// Iterates the years in order.
    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.start..=self.end
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            start: 1450,
            end: 1700,
        }
    }
}

impl fmt::Display for YearRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

/// Metadata about a generated report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    /// File path or URL the dataset was loaded from.
    pub dataset_source: String,
    /// Date and time the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Records accepted from the dataset.
    pub records_loaded: usize,
    /// Records skipped as malformed.
    pub records_skipped: usize,
    /// Earliest and latest year present in the dataset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_years: Option<YearRange>,
    /// Time spent loading and aggregating, in seconds.
    pub duration_seconds: f64,
}

/// Snapshot report for a single cursor year.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotReport {
    pub metadata: ReportMetadata,
    pub snapshot: YearSnapshot,
    pub top_this_year: Vec<AggregatedLocation>,
    pub top_cumulative: Vec<AggregatedLocation>,
    pub points: Vec<MapPoint>,
}

/// Timeline report, one row per year of the range.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineReport {
    pub metadata: ReportMetadata,
    pub range: YearRange,
    pub rows: Vec<TimelineRow>,
}
