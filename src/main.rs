//! Printmap - the spread of Latin printing across Europe
//!
//! A CLI tool that aggregates a dataset of dated, geo-located edition
//! counts per city and replays it year by year, producing snapshot and
//! timeline reports.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (dataset, config, output, etc.)

mod analysis;
mod cli;
mod config;
mod dataset;
mod models;
mod playback;
mod report;

use analysis::{Scale, TemporalAggregator};
use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::Config;
use dataset::{Dataset, DatasetSource, LoadOptions};
use indicatif::{ProgressBar, ProgressStyle};
use models::{ReportMetadata, TimelineReport, TimelineRow, YearRange, YearSnapshot};
use playback::{Command, PlaybackController, TokioScheduler};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config decides the default verbosity, so it is loaded before logging
    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(args.log_level(config.general.verbose));

    info!("Printmap v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    debug!("Config: {:?}", config);

    match run(args, config).await {
        Ok(()) => {
            // Exit explicitly: a pending stdin read would otherwise hold the runtime open.
            std::process::exit(0);
        }
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .printmap.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(config::CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  .printmap.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .printmap.toml")?;

    println!("✅ Created .printmap.toml with default settings.");
    println!("   Edit it to set the dataset, year range, speed and map scales.");
    Ok(())
}

/// Initialize logging at `level`.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load the dataset and produce the requested report.
async fn run(args: Args, config: Config) -> Result<()> {
    let start_time = Instant::now();

    let range = config.playback.range();
    let scale = Scale::from(&config.display);
    let top_n = config.display.top_n;

    // Step 1: Load the dataset
    let source = DatasetSource::parse(&config.dataset.source);
    println!("📥 Loading dataset: {}", source);

    let options = LoadOptions {
        strict: config.dataset.strict,
        timeout: Duration::from_secs(config.dataset.timeout_seconds),
    };
    let dataset = dataset::load_dataset(&source, &options)
        .await
        .with_context(|| format!("Failed to load dataset from {}", source))?;

    for place in dataset::coordinate_conflicts(&dataset.records) {
        warn!(
            "Inconsistent coordinates for {}; using the first record's",
            place
        );
    }

    let dataset_years = analysis::year_span(&dataset.records);
    match dataset_years {
        Some(years) => info!("Dataset covers {}", years),
        None => warn!("Dataset is empty"),
    }

    let records_skipped = dataset.skipped;
    let Dataset {
        source, records, ..
    } = dataset;
    let mut aggregator = TemporalAggregator::new(records);
    let records_loaded = aggregator.records().len();

    let metadata = |elapsed: f64| ReportMetadata {
        dataset_source: source.to_string(),
        generated_at: Utc::now(),
        records_loaded,
        records_skipped,
        dataset_years,
        duration_seconds: elapsed,
    };

    // Step 2: Aggregate and render
    let output = if args.timeline {
        println!("\n📈 Building timeline {}...", range);
        let rows: Vec<TimelineRow> = range
            .years()
            .map(|year| TimelineRow::from(aggregator.snapshot(year).as_ref()))
            .collect();

        let report = TimelineReport {
            metadata: metadata(start_time.elapsed().as_secs_f64()),
            range,
            rows,
        };

        match args.format {
            OutputFormat::Json => report::generate_json_report(&report)?,
            OutputFormat::Markdown => report::generate_timeline_markdown(&report),
        }
    } else {
        let year = if args.play {
            let speed = config.playback.speed;
            println!("\n▶️  Playing {} at {} speed...", range, speed);
            run_playback(
                &mut aggregator,
                range,
                config.playback.initial_year,
                speed,
                top_n,
                args.quiet,
            )
            .await
        } else {
            range.clamp(config.playback.initial_year)
        };

        let snapshot = aggregator.snapshot(year).as_ref().clone();
        if snapshot.is_empty() {
            warn!("No printing recorded up to {}", year);
        }
        let report = report::build_snapshot_report(
            metadata(start_time.elapsed().as_secs_f64()),
            snapshot,
            &scale,
            top_n,
        );

        println!("\n📊 {}:", year);
        println!(
            "   {} works this year in {} active cities",
            report.snapshot.total_this_year, report.snapshot.active_places
        );
        println!(
            "   {} works to date across {} cities",
            report.snapshot.grand_total, report.snapshot.total_places
        );

        match args.format {
            OutputFormat::Json => report::generate_json_report(&report)?,
            OutputFormat::Markdown => report::generate_markdown_report(&report),
        }
    };

    // Step 3: Save
    let output_path = config
        .general
        .output
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            PathBuf::from(format!("printmap_report.{}", args.format.extension()))
        });

    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    println!(
        "\n✅ Done in {:.1}s. Report saved to: {}",
        start_time.elapsed().as_secs_f64(),
        output_path.display()
    );

    Ok(())
}

/// Animate from `initial_year` to the end of `range`, printing one frame
/// per year. Lines on stdin control playback (see [`Command`]). Returns the
/// year playback ended at.
async fn run_playback(
    aggregator: &mut TemporalAggregator,
    range: YearRange,
    initial_year: i32,
    speed: playback::Speed,
    top_n: usize,
    quiet: bool,
) -> i32 {
    let (scheduler, mut ticks) = TokioScheduler::channel(16);
    let mut controller = PlaybackController::new(scheduler, range, initial_year, speed);
    let mut commands = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    let progress = if quiet {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(range.len().saturating_sub(1));
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.magenta} [{bar:40.magenta/blue}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    };

    if !quiet {
        println!(
            "   Enter: play/pause | s <slow|normal|fast|very-fast> | <year> | r: reset | q: quit"
        );
    }

    render_frame(
        &progress,
        &aggregator.snapshot(controller.year()),
        controller.range(),
        top_n,
    );
    controller.play();

    loop {
        tokio::select! {
            tick = ticks.recv() => {
                let Some(tick) = tick else { break };
                if let Some(year) = controller.handle_tick(tick) {
                    render_frame(&progress, &aggregator.snapshot(year), controller.range(), top_n);
                    if !controller.is_playing() {
                        break;
                    }
                }
            }
            line = commands.next_line(), if stdin_open => {
                match line {
                    Ok(Some(line)) => match Command::parse(&line) {
                        Some(Command::Quit) => break,
                        Some(command) => {
                            let before = controller.year();
                            command.apply(&mut controller);
                            debug!(
                                "Applied {:?}, now {} ({}, {})",
                                command,
                                controller.year(),
                                controller.state(),
                                controller.speed()
                            );
                            if controller.year() != before {
                                let snapshot = aggregator.snapshot(controller.year());
                                render_frame(&progress, &snapshot, controller.range(), top_n);
                            }
                        }
                        None => progress.println(format!("Unrecognised command: {}", line.trim())),
                    },
                    Ok(None) | Err(_) => stdin_open = false,
                }
            }
            _ = tokio::signal::ctrl_c() => {
                controller.pause();
                warn!("Playback interrupted at {}", controller.year());
                break;
            }
        }

        // Without stdin nobody can resume a paused playback.
        if !stdin_open && !controller.is_playing() {
            break;
        }
    }

    controller.pause();
    progress.finish_with_message(format!("stopped at {}", controller.year()));
    controller.year()
}

/// Print one playback frame above the progress bar.
fn render_frame(progress: &ProgressBar, snapshot: &YearSnapshot, range: YearRange, top_n: usize) {
    progress.set_position(range.offset(snapshot.year));
    progress.set_message(snapshot.year.to_string());
    progress.println(report::frame_line(snapshot, top_n));
}

/// Load configuration from file or use defaults.
///
/// Runs before logging is initialized, so problems go to stderr.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => Ok(config),
        Ok(None) => Ok(Config::default()),
        Err(e) => {
            eprintln!("⚠️  Failed to load {}: {:#}", config::CONFIG_FILE, e);
            Ok(Config::default())
        }
    }
}
