//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.printmap.toml` files.

use crate::models::YearRange;
use crate::playback::Speed;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".printmap.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Dataset settings.
    #[serde(default)]
    pub dataset: DatasetConfig,

    /// Playback settings.
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// Display settings.
    #[serde(default)]
    pub display: DisplayConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default report path. Derived from the format when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

/// Where and how to load the dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetConfig {
    /// File path or http(s) URL of the dataset.
    #[serde(default = "default_source")]
    pub source: String,

    /// Reject the whole dataset on the first malformed record.
    #[serde(default)]
    pub strict: bool,

    /// HTTP timeout for remote datasets, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            strict: false,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_source() -> String {
    "printing_map_data.json".to_string()
}

fn default_timeout() -> u64 {
    30
}

/// Playback range, starting year and speed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_start_year")]
    pub start_year: i32,

    #[serde(default = "default_end_year")]
    pub end_year: i32,

    /// Year shown before playback starts.
    #[serde(default = "default_initial_year")]
    pub initial_year: i32,

    #[serde(default)]
    pub speed: Speed,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            start_year: default_start_year(),
            end_year: default_end_year(),
            initial_year: default_initial_year(),
            speed: Speed::default(),
        }
    }
}

impl PlaybackConfig {
    /// The configured range.
    pub fn range(&self) -> YearRange {
        YearRange::new(self.start_year, self.end_year)
    }
}

fn default_start_year() -> i32 {
    1450
}

fn default_end_year() -> i32 {
    1700
}

fn default_initial_year() -> i32 {
    1470
}

/// Leaderboard size and map scales.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Entries in each leaderboard.
    #[serde(default = "default_top_n")]
    pub top_n: usize,

    /// Metres per square root of an edition.
    #[serde(default = "default_radius_scale")]
    pub radius_scale: f64,

    /// Opacity of a place with no output this year.
    #[serde(default = "default_min_opacity")]
    pub min_opacity: u8,

    #[serde(default = "default_max_opacity")]
    pub max_opacity: u8,

    /// Opacity added per percentage point of yearly share.
    #[serde(default = "default_opacity_gain")]
    pub opacity_gain: f64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            top_n: default_top_n(),
            radius_scale: default_radius_scale(),
            min_opacity: default_min_opacity(),
            max_opacity: default_max_opacity(),
            opacity_gain: default_opacity_gain(),
        }
    }
}

fn default_top_n() -> usize {
    5
}

fn default_radius_scale() -> f64 {
    600.0
}

fn default_min_opacity() -> u8 {
    40
}

fn default_max_opacity() -> u8 {
    255
}

fn default_opacity_gain() -> f64 {
    8.0
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence, but only when they were given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data) = args.data {
            self.dataset.source = data.clone();
        }
        if args.strict {
            self.dataset.strict = true;
        }

        if let Some(start) = args.start_year {
            self.playback.start_year = start;
        }
        if let Some(end) = args.end_year {
            self.playback.end_year = end;
        }
        if let Some(year) = args.year {
            self.playback.initial_year = year;
        }
        if let Some(speed) = args.speed {
            self.playback.speed = speed;
        }

        if let Some(top) = args.top {
            self.display.top_n = top;
        }

        if let Some(ref output) = args.output {
            self.general.output = Some(output.display().to_string());
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.dataset.source, "printing_map_data.json");
        assert_eq!(config.playback.range(), YearRange::new(1450, 1700));
        assert_eq!(config.playback.initial_year, 1470);
        assert_eq!(config.playback.speed, Speed::Normal);
        assert_eq!(config.display.top_n, 5);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
output = "map.json"

[dataset]
source = "https://example.org/printing_map_data.json"
strict = true

[playback]
start_year = 1500
end_year = 1600
speed = "very-fast"

[display]
top_n = 10
min_opacity = 20
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.output.as_deref(), Some("map.json"));
        assert!(config.dataset.strict);
        assert_eq!(config.dataset.timeout_seconds, 30);
        assert_eq!(config.playback.range(), YearRange::new(1500, 1600));
        assert_eq!(config.playback.initial_year, 1470);
        assert_eq!(config.playback.speed, Speed::VeryFast);
        assert_eq!(config.display.top_n, 10);
        assert_eq!(config.display.min_opacity, 20);
        assert_eq!(config.display.max_opacity, 255);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[playback]\ninitial_year = 1520\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.playback.initial_year, 1520);

        std::fs::write(&path, "[playback\n").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = Config::default();
        let args = crate::cli::Args {
            data: Some("other.json".to_string()),
            year: Some(1520),
            play: false,
            timeline: false,
            speed: Some(Speed::Slow),
            start_year: None,
            end_year: Some(1600),
            top: Some(3),
            format: OutputFormat::Json,
            output: Some(PathBuf::from("out.json")),
            strict: true,
            config: None,
            verbose: false,
            quiet: false,
            init_config: false,
        };

        config.merge_with_args(&args);
        assert_eq!(config.dataset.source, "other.json");
        assert!(config.dataset.strict);
        assert_eq!(config.playback.initial_year, 1520);
        assert_eq!(config.playback.start_year, 1450);
        assert_eq!(config.playback.end_year, 1600);
        assert_eq!(config.playback.speed, Speed::Slow);
        assert_eq!(config.display.top_n, 3);
        assert_eq!(config.general.output.as_deref(), Some("out.json"));
    }

    #[test]
    fn test_verbose_from_file_sets_log_level() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "[general]\nverbose = true\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert!(config.general.verbose);

        let mut args = crate::cli::Args::try_parse_from(["printmap"]).unwrap();
        assert_eq!(args.log_level(config.general.verbose), tracing::Level::DEBUG);

        args.quiet = true;
        assert_eq!(args.log_level(config.general.verbose), tracing::Level::ERROR);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[dataset]"));
        assert!(toml_str.contains("[playback]"));
        assert!(toml_str.contains("[display]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.playback.speed, Speed::Normal);
    }
}
