//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::playback::Speed;
use clap::Parser;
use std::path::PathBuf;

/// Printmap - the spread of Latin printing, year by year
///
/// Aggregates a dataset of dated, geo-located edition counts per city and
/// replays it as a timeline. Markdown/JSON reports.
///
/// Examples:
///   printmap --data printing_map_data.json --year 1520
///   printmap --data https://example.org/printing_map_data.json --play --speed fast
///   printmap --data printing_map_data.json --timeline --format json
///   printmap --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Dataset file path or http(s) URL
    ///
    /// A JSON array of {year, place, count, lat, lng} records.
    /// Falls back to the config file, then to printing_map_data.json.
    #[arg(short, long, value_name = "FILE|URL", env = "PRINTMAP_DATA")]
    pub data: Option<String>,

    /// Cursor year for the snapshot, or the year playback starts from
    #[arg(short, long, value_name = "YEAR", env = "PRINTMAP_YEAR")]
    pub year: Option<i32>,

    /// Animate year by year up to the end year, then report the final year
    #[arg(long, conflicts_with = "timeline")]
    pub play: bool,

    /// Report one row per year of the playback range
    #[arg(long, conflicts_with = "play")]
    pub timeline: bool,

    /// Playback speed
    #[arg(long, value_name = "SPEED")]
    pub speed: Option<Speed>,

    /// First year of the playback range
    #[arg(long, value_name = "YEAR")]
    pub start_year: Option<i32>,

    /// Last year of the playback range
    #[arg(long, value_name = "YEAR")]
    pub end_year: Option<i32>,

    /// Number of places in each leaderboard
    #[arg(long, value_name = "N")]
    pub top: Option<usize>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Output file path for the report
    ///
    /// Defaults to printmap_report.md or printmap_report.json.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Fail on the first malformed dataset record instead of skipping it
    #[arg(long)]
    pub strict: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .printmap.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .printmap.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// File extension for reports in this format.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.top == Some(0) {
            return Err("--top must be at least 1".to_string());
        }

        if let (Some(start), Some(end)) = (self.start_year, self.end_year) {
            if start > end {
                return Err(format!(
                    "--start-year ({}) must not be after --end-year ({})",
                    start, end
                ));
            }
        }

        if let Some(ref data) = self.data {
            if data.trim().is_empty() {
                return Err("--data must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is `general.verbose` from the config file; `--quiet`
    /// overrides it.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            data: Some("printing_map_data.json".to_string()),
            year: None,
            play: false,
            timeline: false,
            speed: None,
            start_year: None,
            end_year: None,
            top: None,
            format: OutputFormat::Markdown,
            output: None,
            strict: false,
            config: None,
            verbose: false,
            quiet: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_flags() {
        let args = Args::try_parse_from([
            "printmap",
            "--data",
            "map.json",
            "--play",
            "--speed",
            "very-fast",
            "--year",
            "1500",
        ])
        .unwrap();

        assert_eq!(args.data.as_deref(), Some("map.json"));
        assert!(args.play);
        assert_eq!(args.speed, Some(Speed::VeryFast));
        assert_eq!(args.year, Some(1500));
        assert_eq!(args.format, OutputFormat::Markdown);
    }

    #[test]
    fn test_play_conflicts_with_timeline() {
        let result = Args::try_parse_from(["printmap", "--play", "--timeline"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_year_range() {
        let mut args = make_args();
        args.start_year = Some(1600);
        args.end_year = Some(1500);
        assert!(args.validate().is_err());

        args.end_year = Some(1650);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_top() {
        let mut args = make_args();
        args.top = Some(0);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(false), tracing::Level::INFO);
        assert_eq!(args.log_level(true), tracing::Level::DEBUG);

        args.verbose = true;
        assert_eq!(args.log_level(false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(false), tracing::Level::ERROR);
        assert_eq!(args.log_level(true), tracing::Level::ERROR);
    }

    #[test]
    fn test_output_extension() {
        assert_eq!(OutputFormat::Markdown.extension(), "md");
        assert_eq!(OutputFormat::Json.extension(), "json");
    }
}
