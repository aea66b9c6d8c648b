//! Static dataset loading.
//!
//! Reads the printing dataset from a local JSON file or an HTTP(S) URL and
//! validates each record at the boundary, so the aggregator only ever sees
//! well-formed input.

use crate::models::GeoTemporalRecord;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised while loading the dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch dataset {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("dataset is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("dataset must be a JSON array of records")]
    NotAnArray,

    #[error("record {index} is malformed: {reason}")]
    Malformed { index: usize, reason: String },
}

/// Where the dataset comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    File(PathBuf),
    Url(String),
}

impl DatasetSource {
    /// Interpret a CLI/config value: `http(s)://` means URL, anything else a path.
    pub fn parse(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            DatasetSource::Url(value.to_string())
        } else {
            DatasetSource::File(PathBuf::from(value))
        }
    }
}

impl fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetSource::File(path) => write!(f, "{}", path.display()),
            DatasetSource::Url(url) => write!(f, "{}", url),
        }
    }
}

/// Options for loading.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Fail on the first malformed record instead of skipping it.
    pub strict: bool,
    /// HTTP request timeout.
    pub timeout: Duration,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            strict: false,
            timeout: Duration::from_secs(30),
        }
    }
}

/// A loaded, validated dataset.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub source: DatasetSource,
    pub records: Vec<GeoTemporalRecord>,
    /// Records dropped as malformed (lenient mode only).
    pub skipped: usize,
}

/// Load and validate the dataset.
pub async fn load_dataset(
    source: &DatasetSource,
    options: &LoadOptions,
) -> Result<Dataset, DatasetError> {
    let body = match source {
        DatasetSource::File(path) => {
            debug!("Reading dataset file {}", path.display());
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| DatasetError::Io {
                    path: path.clone(),
                    source: e,
                })?
        }
        DatasetSource::Url(url) => fetch(url, options.timeout).await?,
    };

    let (records, skipped) = parse_records(&body, options.strict)?;
    info!(
        "Loaded {} records from {} ({} skipped)",
        records.len(),
        source,
        skipped
    );

    Ok(Dataset {
        source: source.clone(),
        records,
        skipped,
    })
}

async fn fetch(url: &str, timeout: Duration) -> Result<String, DatasetError> {
    debug!("Fetching dataset from {}", url);
    let http_error = |e: reqwest::Error| DatasetError::Http {
        url: url.to_string(),
        source: e,
    };

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(http_error)?;

    client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(http_error)?
        .text()
        .await
        .map_err(http_error)
}

/// Parse a JSON array of records.
///
/// Returns the accepted records and the number skipped. In strict mode the
/// first malformed record is an error.
pub fn parse_records(
    json: &str,
    strict: bool,
) -> Result<(Vec<GeoTemporalRecord>, usize), DatasetError> {
    let value: Value = serde_json::from_str(json)?;
    let Value::Array(items) = value else {
        return Err(DatasetError::NotAnArray);
    };

    let mut records = Vec::with_capacity(items.len());
    let mut skipped = 0;

    for (index, item) in items.iter().enumerate() {
        match validate(item) {
            Ok(record) => records.push(record),
            Err(reason) if strict => return Err(DatasetError::Malformed { index, reason }),
            Err(reason) => {
                warn!("Skipping record {}: {}", index, reason);
                skipped += 1;
            }
        }
    }

    Ok((records, skipped))
}

fn validate(item: &Value) -> Result<GeoTemporalRecord, String> {
    let year = integer_field(item, "year")?;
    let year = i32::try_from(year).map_err(|_| format!("year {} out of range", year))?;

    let place = item
        .get("place")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or("missing or empty `place`")?;

    let count = count_field(item)?;

    let lat = float_field(item, "lat")?;
    let lng = float_field(item, "lng")?;
    if !(-90.0..=90.0).contains(&lat) {
        return Err(format!("latitude {} out of range", lat));
    }
    if !(-180.0..=180.0).contains(&lng) {
        return Err(format!("longitude {} out of range", lng));
    }

    Ok(GeoTemporalRecord::new(year, place, count, lat, lng))
}

/// 2^63 and 2^64; the first floats past `i64::MAX` and `u64::MAX`.
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;
const U64_LIMIT: f64 = 18_446_744_073_709_551_616.0;

fn is_whole(f: f64) -> bool {
    f.is_finite() && f.fract() == 0.0
}

/// Integer field; whole-number floats such as `3.0` are accepted.
fn integer_field(item: &Value, name: &str) -> Result<i64, String> {
    let value = item.get(name).ok_or_else(|| format!("missing `{}`", name))?;

    value
        .as_i64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|&f| is_whole(f) && (-I64_LIMIT..I64_LIMIT).contains(&f))
                .map(|f| f as i64)
        })
        .ok_or_else(|| format!("`{}` is not an integer in range", name))
}

/// Non-negative `count`, the full `u64` range.
fn count_field(item: &Value) -> Result<u64, String> {
    let value = item.get("count").ok_or("missing `count`")?;
    if let Some(count) = value.as_u64() {
        return Ok(count);
    }

    match value.as_f64() {
        Some(f) if f < 0.0 => Err(format!("negative count {}", f)),
        Some(f) if is_whole(f) && f < U64_LIMIT => Ok(f as u64),
        _ => Err("`count` is not an integer in range".to_string()),
    }
}

fn float_field(item: &Value, name: &str) -> Result<f64, String> {
    item.get(name)
        .ok_or_else(|| format!("missing `{}`", name))?
        .as_f64()
        .filter(|f| f.is_finite())
        .ok_or_else(|| format!("`{}` is not a number", name))
}

/// Places whose records disagree on coordinates.
///
/// The aggregator keeps the first coordinates it sees, so these are only
/// reported, never corrected.
pub fn coordinate_conflicts(records: &[GeoTemporalRecord]) -> Vec<String> {
    let mut first_seen: HashMap<&str, (f64, f64)> = HashMap::new();
    let mut conflicts: Vec<String> = Vec::new();

    for record in records {
        let (lat, lng) = *first_seen
            .entry(record.place.as_str())
            .or_insert((record.lat, record.lng));

        if (lat != record.lat || lng != record.lng) && !conflicts.contains(&record.place) {
            conflicts.push(record.place.clone());
        }
    }

    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = include_str!("../../fixtures/printing_sample.json");

    #[test]
    fn test_source_parse() {
        assert_eq!(
            DatasetSource::parse("https://example.org/printing_map_data.json"),
            DatasetSource::Url("https://example.org/printing_map_data.json".to_string())
        );
        assert_eq!(
            DatasetSource::parse("data/printing_map_data.json"),
            DatasetSource::File(PathBuf::from("data/printing_map_data.json"))
        );
    }

    #[test]
    fn test_parse_fixture() {
        let (records, skipped) = parse_records(SAMPLE, true).unwrap();
        assert_eq!(skipped, 0);
        assert!(!records.is_empty());
        assert!(records.iter().any(|r| r.place == "Mainz"));
    }

    #[test]
    fn test_lenient_skips_malformed() {
        let json = r#"[
            {"year": 1470, "place": "Mainz", "count": 10, "lat": 50.0, "lng": 8.27},
            {"year": 1470, "place": "Venice", "lat": 45.44, "lng": 12.33},
            {"year": 1471, "place": "Rome", "count": -2, "lat": 41.9, "lng": 12.5},
            {"year": 1472, "place": "Paris", "count": 4.0, "lat": 48.86, "lng": 2.35}
        ]"#;

        let (records, skipped) = parse_records(json, false).unwrap();
        assert_eq!(skipped, 2);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].place, "Paris");
        assert_eq!(records[1].count, 4);
    }

    #[test]
    fn test_count_beyond_i64() {
        let json = r#"[
            {"year": 1500, "place": "Lyon", "count": 18446744073709551615, "lat": 45.8, "lng": 4.8},
            {"year": 1500, "place": "Paris", "count": 18446744073709551616, "lat": 48.9, "lng": 2.4},
            {"year": 1500, "place": "Basel", "count": 1e20, "lat": 47.6, "lng": 7.6},
            {"year": 1e19, "place": "Rome", "count": 1, "lat": 41.9, "lng": 12.5}
        ]"#;

        let (records, skipped) = parse_records(json, false).unwrap();
        assert_eq!(skipped, 3);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].count, u64::MAX);

        let oversized = r#"[{"year": 1500, "place": "Paris", "count": 18446744073709551616, "lat": 48.9, "lng": 2.4}]"#;
        match parse_records(oversized, true) {
            Err(DatasetError::Malformed { index, reason }) => {
                assert_eq!(index, 0);
                assert!(reason.contains("count"));
            }
            other => panic!("expected malformed error, got {:?}", other),
        }
    }

    #[test]
    fn test_strict_rejects_malformed() {
        let json = r#"[
            {"year": 1470, "place": "Mainz", "count": 10, "lat": 50.0, "lng": 8.27},
            {"year": 1470, "place": "", "count": 1, "lat": 45.44, "lng": 12.33}
        ]"#;

        match parse_records(json, true) {
            Err(DatasetError::Malformed { index, reason }) => {
                assert_eq!(index, 1);
                assert!(reason.contains("place"));
            }
            other => panic!("expected malformed error, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_out_of_range_coordinates() {
        let json = r#"[{"year": 1500, "place": "Nowhere", "count": 1, "lat": 123.0, "lng": 0.0}]"#;
        assert!(matches!(
            parse_records(json, true),
            Err(DatasetError::Malformed { index: 0, .. })
        ));
    }

    #[test]
    fn test_not_an_array() {
        assert!(matches!(
            parse_records(r#"{"year": 1500}"#, false),
            Err(DatasetError::NotAnArray)
        ));
        assert!(matches!(
            parse_records("not json", false),
            Err(DatasetError::Json(_))
        ));
    }

    #[test]
    fn test_coordinate_conflicts() {
        let records = vec![
            GeoTemporalRecord::new(1480, "Basel", 1, 47.5, 7.6),
            GeoTemporalRecord::new(1481, "Basel", 1, 47.6, 7.6),
            GeoTemporalRecord::new(1482, "Basel", 1, 0.0, 0.0),
            GeoTemporalRecord::new(1481, "Lyon", 1, 45.8, 4.8),
        ];
        assert_eq!(coordinate_conflicts(&records), vec!["Basel".to_string()]);
    }

    #[test]
    fn test_load_dataset_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let source = DatasetSource::File(file.path().to_path_buf());
        let dataset =
            tokio_test::block_on(load_dataset(&source, &LoadOptions::default())).unwrap();

        assert_eq!(dataset.source, source);
        assert_eq!(dataset.skipped, 0);
        assert!(!dataset.records.is_empty());
    }

    #[test]
    fn test_load_dataset_missing_file() {
        let source = DatasetSource::File(PathBuf::from("/definitely/not/here.json"));
        let result = tokio_test::block_on(load_dataset(&source, &LoadOptions::default()));
        assert!(matches!(result, Err(DatasetError::Io { .. })));
    }
}
