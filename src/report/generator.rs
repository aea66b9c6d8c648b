//! Markdown, JSON and terminal rendering.
//!
//! This module turns year snapshots and timelines into reports and into
//! the one-line frames printed during playback.

use crate::analysis::{top_by_cumulative, top_by_yearly, Scale};
use crate::models::{
    AggregatedLocation, ReportMetadata, SnapshotReport, TimelineReport, TimelineRow, YearSnapshot,
};
use anyhow::Result;
use serde::Serialize;

/// Assemble a snapshot report with leaderboards and map points.
pub fn build_snapshot_report(
    metadata: ReportMetadata,
    snapshot: YearSnapshot,
    scale: &Scale,
    top_n: usize,
) -> SnapshotReport {
    let top_this_year = top_by_yearly(&snapshot.locations, top_n);
    let top_cumulative = top_by_cumulative(&snapshot.locations, top_n);
    let points = scale.points(&snapshot.locations);

    SnapshotReport {
        metadata,
        snapshot,
        top_this_year,
        top_cumulative,
        points,
    }
}

/// Generate a Markdown snapshot report.
pub fn generate_markdown_report(report: &SnapshotReport) -> String {
    let snapshot = &report.snapshot;
    let mut output = String::new();

    output.push_str(&format!("# Latin Printing in {}\n\n", snapshot.year));
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_totals_section(snapshot));

    output.push_str(&format!("## Top This Year ({})\n\n", snapshot.year));
    if report.top_this_year.is_empty() {
        output.push_str("No data for this year.\n\n");
    } else {
        output.push_str(&generate_leaderboard(&report.top_this_year, |l| {
            l.yearly_count
        }));
    }

    output.push_str("## Cumulative Leaders\n\n");
    if report.top_cumulative.is_empty() {
        output.push_str("No printing recorded yet.\n\n");
    } else {
        output.push_str(&generate_leaderboard(&report.top_cumulative, |l| {
            l.cumulative_total
        }));
    }

    output.push_str(&generate_places_section(report));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Dataset:** {}\n", metadata.dataset_source));
    section.push_str(&format!(
        "- **Generated:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Records:** {}\n",
        format_thousands(metadata.records_loaded as u64)
    ));
    if metadata.records_skipped > 0 {
        section.push_str(&format!(
            "- **Records Skipped:** {}\n",
            metadata.records_skipped
        ));
    }
    if let Some(years) = metadata.dataset_years {
        section.push_str(&format!("- **Dataset Years:** {}\n", years));
    }
    section.push_str(&format!(
        "- **Duration:** {:.2}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Headline totals for the cursor year.
fn generate_totals_section(snapshot: &YearSnapshot) -> String {
    let mut section = String::new();

    section.push_str("## Totals\n\n");
    section.push_str("| Works This Year | Active Cities | Total Works | Cities To Date |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} |\n\n",
        format_thousands(snapshot.total_this_year),
        snapshot.active_places,
        format_thousands(snapshot.grand_total),
        snapshot.total_places
    ));

    section
}

fn generate_leaderboard(
    ranked: &[AggregatedLocation],
    value: impl Fn(&AggregatedLocation) -> u64,
) -> String {
    let mut table = String::new();

    table.push_str("| # | City | Works |\n");
    table.push_str("|:---:|:---|---:|\n");
    for (i, location) in ranked.iter().enumerate() {
        table.push_str(&format!(
            "| {} | {} | {} |\n",
            i + 1,
            location.place,
            format_thousands(value(location))
        ));
    }
    table.push('\n');

    table
}

/// Every place with history, largest first, with its map encoding.
fn generate_places_section(report: &SnapshotReport) -> String {
    if report.snapshot.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## All Cities\n\n");
    section.push_str("| City | Lat | Lng | Total | This Year | Share | Radius (km) | Opacity |\n");
    section.push_str("|:---|---:|---:|---:|---:|---:|---:|---:|\n");

    let ranked = top_by_cumulative(&report.snapshot.locations, usize::MAX);
    for location in &ranked {
        let point = report.points.iter().find(|p| p.place == location.place);
        let (radius_km, opacity) = point
            .map(|p| (p.radius / 1000.0, p.fill_color[3]))
            .unwrap_or_default();

        section.push_str(&format!(
            "| {} | {:.2} | {:.2} | {} | {} | {:.1}% | {:.1} | {} |\n",
            location.place,
            location.lat,
            location.lng,
            format_thousands(location.cumulative_total),
            format_thousands(location.yearly_count),
            location.yearly_percent,
            radius_km,
            opacity
        ));
    }
    section.push('\n');

    section
}

/// Generate a Markdown timeline report.
pub fn generate_timeline_markdown(report: &TimelineReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Latin Printing, {}\n\n", report.range));
    output.push_str(&generate_metadata_section(&report.metadata));

    output.push_str("## Timeline\n\n");
    output.push_str("| Year | Works | Active Cities | Total Works | Cities | Leading City |\n");
    output.push_str("|:---:|---:|---:|---:|---:|:---|\n");
    for row in &report.rows {
        output.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            row.year,
            format_thousands(row.total_this_year),
            row.active_places,
            format_thousands(row.grand_total),
            row.total_places,
            row.leader.as_deref().unwrap_or("-")
        ));
    }
    output.push('\n');

    if let Some(peak) = peak_year(&report.rows) {
        output.push_str(&format!(
            "Peak year: **{}** with {} works.\n\n",
            peak.year,
            format_thousands(peak.total_this_year)
        ));
    }

    output.push_str(&generate_footer());
    output
}

/// Busiest year of a timeline; the earliest wins a tie.
pub fn peak_year(rows: &[TimelineRow]) -> Option<&TimelineRow> {
    rows.iter()
        .filter(|r| r.total_this_year > 0)
        .fold(None, |best: Option<&TimelineRow>, row| match best {
            Some(b) if b.total_this_year >= row.total_this_year => Some(b),
            _ => Some(row),
        })
}

/// One line of terminal output per playback frame.
pub fn frame_line(snapshot: &YearSnapshot, top_n: usize) -> String {
    let leaders: Vec<String> = top_by_yearly(&snapshot.locations, top_n)
        .iter()
        .map(|l| format!("{} {}", l.place, format_thousands(l.yearly_count)))
        .collect();

    let leaders = if leaders.is_empty() {
        "no activity".to_string()
    } else {
        leaders.join(", ")
    };

    format!(
        "{} | {} works, {} active / {} cities | {} total | {}",
        snapshot.year,
        format_thousands(snapshot.total_this_year),
        snapshot.active_places,
        snapshot.total_places,
        format_thousands(snapshot.grand_total),
        leaders
    )
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by printmap*\n".to_string()
}

/// Serialize any report as pretty JSON.
pub fn generate_json_report<T: Serialize>(report: &T) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Group digits in thousands: `32272` -> `32,272`.
pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::snapshot;
    use crate::models::{GeoTemporalRecord, YearRange};
    use chrono::Utc;

    fn metadata() -> ReportMetadata {
        ReportMetadata {
            dataset_source: "printing_map_data.json".to_string(),
            generated_at: Utc::now(),
            records_loaded: 3,
            records_skipped: 1,
            dataset_years: Some(YearRange::new(1470, 1480)),
            duration_seconds: 0.01,
        }
    }

    fn records() -> Vec<GeoTemporalRecord> {
        vec![
            GeoTemporalRecord::new(1470, "Mainz", 10, 50.0, 8.0),
            GeoTemporalRecord::new(1470, "Venice", 5, 45.0, 12.0),
            GeoTemporalRecord::new(1480, "Mainz", 20, 50.0, 8.0),
        ]
    }

    #[test]
    fn test_format_thousands() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1000), "1,000");
        assert_eq!(format_thousands(356989), "356,989");
        assert_eq!(format_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_markdown_snapshot_report() {
        let report = build_snapshot_report(
            metadata(),
            snapshot(&records(), 1480),
            &Scale::default(),
            5,
        );
        assert_eq!(report.top_this_year.len(), 1);
        assert_eq!(report.top_cumulative[0].place, "Mainz");
        assert_eq!(report.points.len(), 2);

        let markdown = generate_markdown_report(&report);
        assert!(markdown.contains("# Latin Printing in 1480"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("Records Skipped:** 1"));
        assert!(markdown.contains("## Top This Year (1480)"));
        assert!(markdown.contains("| 1 | Mainz | 20 |"));
        assert!(markdown.contains("## Cumulative Leaders"));
        assert!(markdown.contains("| 2 | Venice | 5 |"));
        assert!(markdown.contains("## All Cities"));
    }

    #[test]
    fn test_markdown_empty_year() {
        let report =
            build_snapshot_report(metadata(), snapshot(&records(), 1460), &Scale::default(), 5);
        let markdown = generate_markdown_report(&report);
        assert!(markdown.contains("No data for this year."));
        assert!(markdown.contains("No printing recorded yet."));
        assert!(!markdown.contains("## All Cities"));
    }

    #[test]
    fn test_json_snapshot_report() {
        let report =
            build_snapshot_report(metadata(), snapshot(&records(), 1470), &Scale::default(), 5);
        let json = generate_json_report(&report).unwrap();
        assert!(json.contains("\"cumulativeTotal\""));
        assert!(json.contains("\"fillColor\""));
        assert!(json.contains("\"topThisYear\""));
        assert!(json.contains("\"topCumulative\""));
        assert!(json.contains("\"recordsLoaded\""));
        assert!(json.contains("\"generatedAt\""));
        assert!(!json.contains("\"top_this_year\""));
        assert!(!json.contains("\"records_loaded\""));
    }

    #[test]
    fn test_timeline_markdown() {
        let data = records();
        let range = YearRange::new(1469, 1481);
        let rows: Vec<TimelineRow> = range
            .years()
            .map(|y| TimelineRow::from(&snapshot(&data, y)))
            .collect();

        let report = TimelineReport {
            metadata: metadata(),
            range,
            rows,
        };

        let markdown = generate_timeline_markdown(&report);
        assert!(markdown.contains("# Latin Printing, 1469-1481"));
        assert!(markdown.contains("| 1470 | 15 | 2 | 15 | 2 | Mainz |"));
        assert!(markdown.contains("| 1469 | 0 | 0 | 0 | 0 | - |"));
        assert!(markdown.contains("Peak year: **1480** with 20 works."));
    }

    #[test]
    fn test_peak_year_prefers_earliest() {
        let row = |year, total| TimelineRow {
            year,
            total_this_year: total,
            active_places: 1,
            grand_total: total,
            total_places: 1,
            leader: None,
        };
        let rows = vec![row(1500, 4), row(1501, 9), row(1502, 9), row(1503, 0)];
        assert_eq!(peak_year(&rows).map(|r| r.year), Some(1501));
        assert!(peak_year(&[row(1500, 0)]).is_none());
    }

    #[test]
    fn test_frame_line() {
        let line = frame_line(&snapshot(&records(), 1470), 2);
        assert_eq!(
            line,
            "1470 | 15 works, 2 active / 2 cities | 15 total | Mainz 10, Venice 5"
        );

        let quiet = frame_line(&snapshot(&records(), 1500), 2);
        assert!(quiet.ends_with("no activity"));
    }
}
