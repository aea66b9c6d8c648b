//! Geo-temporal aggregation.
//!
//! Turns the flat list of dated place counts into per-place cumulative
//! totals and current-year shares for a cursor year, and ranks the
//! result for the leaderboards.

use crate::models::{AggregatedLocation, GeoTemporalRecord, YearRange, YearSnapshot};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Aggregate `records` for `cursor_year`.
///
/// Every place with at least one record at or before `cursor_year` is
/// returned once, in order of first appearance. Duplicate `(place, year)`
/// records are summed; sums saturate at `u64::MAX`. Coordinates come from the first record seen for
/// the place.
pub fn aggregate(records: &[GeoTemporalRecord], cursor_year: i32) -> Vec<AggregatedLocation> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut locations: Vec<AggregatedLocation> = Vec::new();
    let mut total_this_year: u64 = 0;

    for record in records.iter().filter(|r| r.year <= cursor_year) {
        let slot = *index.entry(record.place.as_str()).or_insert_with(|| {
            locations.push(AggregatedLocation {
                place: record.place.clone(),
                lat: record.lat,
                lng: record.lng,
                cumulative_total: 0,
                yearly_count: 0,
                yearly_percent: 0.0,
            });
            locations.len() - 1
        });

        let location = &mut locations[slot];
        location.cumulative_total = location.cumulative_total.saturating_add(record.count);

        if record.year == cursor_year {
            location.yearly_count = location.yearly_count.saturating_add(record.count);
            total_this_year = total_this_year.saturating_add(record.count);
        }
    }

    if total_this_year > 0 {
        for location in &mut locations {
            location.yearly_percent =
                location.yearly_count as f64 / total_this_year as f64 * 100.0;
        }
    }

    locations
}

/// Aggregate and wrap the result with its headline totals.
pub fn snapshot(records: &[GeoTemporalRecord], cursor_year: i32) -> YearSnapshot {
    YearSnapshot::new(cursor_year, aggregate(records, cursor_year))
}

/// Top `n` places by cumulative total, ties broken by place name.
pub fn top_by_cumulative(locations: &[AggregatedLocation], n: usize) -> Vec<AggregatedLocation> {
    let mut ranked: Vec<AggregatedLocation> = locations.to_vec();
    ranked.sort_by(|a, b| {
        b.cumulative_total
            .cmp(&a.cumulative_total)
            .then_with(|| a.place.cmp(&b.place))
    });
    ranked.truncate(n);
    ranked
}

/// Top `n` places active this year by yearly count, ties broken by place name.
pub fn top_by_yearly(locations: &[AggregatedLocation], n: usize) -> Vec<AggregatedLocation> {
    let mut ranked: Vec<AggregatedLocation> = locations
        .iter()
        .filter(|l| l.is_active())
        .cloned()
        .collect();
    ranked.sort_by(|a, b| {
        b.yearly_count
            .cmp(&a.yearly_count)
            .then_with(|| a.place.cmp(&b.place))
    });
    ranked.truncate(n);
    ranked
}

/// Earliest and latest year in the dataset, if it is non-empty.
pub fn year_span(records: &[GeoTemporalRecord]) -> Option<YearRange> {
    let min = records.iter().map(|r| r.year).min()?;
    let max = records.iter().map(|r| r.year).max()?;
    Some(YearRange::new(min, max))
}

/// Aggregator bound to one immutable dataset.
///
/// Remembers the most recent snapshot so repeated renders of the same
/// cursor year skip the recomputation.
pub struct TemporalAggregator {
    records: Arc<[GeoTemporalRecord]>,
    last: Option<Arc<YearSnapshot>>,
}

impl TemporalAggregator {
    /// Create an aggregator over a loaded dataset.
    pub fn new(records: impl Into<Arc<[GeoTemporalRecord]>>) -> Self {
        Self {
            records: records.into(),
            last: None,
        }
    }

    /// The underlying dataset.
    pub fn records(&self) -> &[GeoTemporalRecord] {
        &self.records
    }

    /// Snapshot for `cursor_year`, reusing the previous one when the year is unchanged.
    pub fn snapshot(&mut self, cursor_year: i32) -> Arc<YearSnapshot> {
        if let Some(ref last) = self.last {
            if last.year == cursor_year {
                return Arc::clone(last);
            }
        }

        let fresh = Arc::new(snapshot(&self.records, cursor_year));
        debug!(
            "Aggregated {} places for {} ({} editions this year)",
            fresh.total_places, cursor_year, fresh.total_this_year
        );
        self.last = Some(Arc::clone(&fresh));
        fresh
    }
}
