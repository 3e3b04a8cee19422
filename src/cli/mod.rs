//! Command-line interface for the scour toolkit.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::core::writers::LogMode;
use crate::experiment::{Experiment, ExperimentInfo, ProcessOptions};
use crate::surface::StructureFootprint;
use crate::visualization::{self, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::PipelineConfig;

#[derive(Parser)]
#[command(name = "scour-tools")]
#[command(about = "Flume scour experiment processing", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Clean, gap-fill and rebaseline instrument records
    Clean {
        /// Experiment directory (named after the test, e.g. SW-H2-A3)
        experiment: PathBuf,
        /// Raw logger export; without it the processed CSVs are refined
        /// and saved as `-filtered`
        #[arg(short, long)]
        data: Option<PathBuf>,
        /// Threshold rule table
        #[arg(short, long)]
        thresholds: Option<PathBuf>,
        /// Longest NaN run to fill (samples)
        #[arg(long)]
        gap_limit: Option<usize>,
        /// Drop pre-reach surface readings above this value
        #[arg(long)]
        pre_reach_threshold: Option<f64>,
        /// Add the scour depth curves after rebaselining
        #[arg(long)]
        correct_depth: bool,
        /// Directory of `<instrument>.txt` index files to discard when
        /// refining processed records
        #[arg(short, long)]
        indices: Option<PathBuf>,
        /// Also render a PNG per instrument
        #[arg(long)]
        plot: bool,
    },

    /// Grid the LiDAR scan and render a heat map (PNG)
    Surface {
        /// Experiment directory
        experiment: PathBuf,
        /// Output PNG (defaults to the point cloud path with .png)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Skip Gaussian smoothing
        #[arg(long)]
        no_filter: bool,
        /// Gaussian spread in grid cells
        #[arg(long)]
        sigma: Option<f64>,
    },

    /// Read the final scour depth at a point and log it
    Probe {
        /// Experiment directory
        experiment: PathBuf,
        /// Instrument the depth is recorded for
        instrument: String,
        /// x position (m)
        #[arg(allow_hyphen_values = true)]
        x: f64,
        /// y position (m)
        #[arg(allow_hyphen_values = true)]
        y: f64,
        /// Start the scour log over instead of appending
        #[arg(long)]
        new_file: bool,
    },

    /// Print the structure corners for a test name
    Footprint {
        /// Test name, e.g. SW-H2-A3
        test_name: String,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 39 {
            format!("{}...", value.chars().take(36).collect::<String>())
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

fn format_depth(depth: f64) -> String {
    if depth.is_nan() {
        "missing".to_string()
    } else {
        format!("{:.3}", depth)
    }
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    // Load config
    let config = match &cli.config {
        Some(path) => match PipelineConfig::from_yaml(path) {
            Ok(cfg) => {
                info!("Loaded config from: {}", path.display());
                cfg
            }
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}, using defaults",
                    path.display(),
                    e
                );
                PipelineConfig::default()
            }
        },
        None => PipelineConfig::default(),
    };

    let result = match cli.command {
        Commands::Clean {
            experiment,
            data,
            thresholds,
            gap_limit,
            pre_reach_threshold,
            correct_depth,
            indices,
            plot,
        } => {
            let options = ProcessOptions {
                gap_limit,
                pre_reach_threshold,
                correct_depth,
            };
            cmd_clean(
                &experiment,
                data.as_deref(),
                thresholds.as_deref(),
                indices.as_deref(),
                &options,
                plot,
                config,
            )
        }
        Commands::Surface {
            experiment,
            output,
            no_filter,
            sigma,
        } => cmd_surface(&experiment, output, no_filter, sigma, config),
        Commands::Probe {
            experiment,
            instrument,
            x,
            y,
            new_file,
        } => cmd_probe(&experiment, &instrument, x, y, new_file, config),
        Commands::Footprint { test_name } => cmd_footprint(&test_name, &config),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn cmd_clean(
    root: &Path,
    data: Option<&Path>,
    thresholds: Option<&Path>,
    indices: Option<&Path>,
    options: &ProcessOptions,
    plot: bool,
    config: PipelineConfig,
) -> Result<()> {
    let start = Instant::now();
    let mut experiment = Experiment::new(root, config)
        .with_context(|| format!("Cannot open experiment {}", root.display()))?;
    let refine = data.is_none();

    let spinner = create_spinner("Loading instrument records...");
    let loaded = match data {
        Some(data) => experiment.load_raw(data, thresholds),
        None => experiment.load_processed(false),
    };
    let loaded = match loaded {
        Ok(n) => n,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e).context("Failed to load instrument records");
        }
    };
    if let Err(e) = experiment.load_supporting() {
        spinner.finish_and_clear();
        return Err(e).context("Failed to load reach times or scour curves");
    }

    spinner.set_message("Processing instruments...");
    let summary = if refine {
        experiment.refine(indices, options.gap_limit)
    } else {
        experiment.process(options)
    };
    let summary = match summary {
        Ok(summary) => summary,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e).context("Processing failed");
        }
    };

    spinner.set_message("Writing processed data...");
    let written = experiment.save_processed(refine);
    spinner.finish_and_clear();
    let written = written.context("Failed to write processed data")?;

    if plot {
        plot_instruments(&mut experiment, &written)?;
    }

    print_summary(
        &format!("Clean Complete: {}", experiment.name()),
        &[
            ("Experiment", experiment.info().to_string()),
            ("Mode", if refine { "refine" } else { "raw" }.to_string()),
            ("Instruments loaded", loaded.to_string()),
            ("Processed", summary.processed.to_string()),
            ("Skipped", summary.skipped.to_string()),
            ("Samples removed", summary.removed.to_string()),
            ("Samples filled", summary.filled.to_string()),
            ("Depth corrected", summary.depth_corrected.to_string()),
            ("Files written", written.len().to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
    Ok(())
}

/// One PNG next to each written CSV, with the negated scour curve as bed line.
fn plot_instruments(experiment: &mut Experiment, written: &[PathBuf]) -> Result<()> {
    let table = experiment.config().units.clone();
    let names: Vec<String> = experiment.instruments().keys().cloned().collect();

    for (name, csv_path) in names.iter().zip(written) {
        let instrument = experiment.instrument_mut(name)?;
        let bed: Option<Vec<f64>> = instrument
            .aligned_depth(&table)?
            .map(|depth| depth.into_iter().map(|d| -d).collect());
        let png = csv_path.with_extension("png");
        match visualization::plot_series(
            &png,
            instrument.series(),
            bed.as_deref(),
            DEFAULT_WIDTH,
            DEFAULT_HEIGHT,
        ) {
            Ok(()) => info!("Plotted {} to {}", name, png.display()),
            Err(e) => warn!("Could not plot {}: {}", name, e),
        }
    }
    Ok(())
}

fn cmd_surface(
    root: &Path,
    output: Option<PathBuf>,
    no_filter: bool,
    sigma: Option<f64>,
    mut config: PipelineConfig,
) -> Result<()> {
    let start = Instant::now();
    if no_filter {
        config.grid.apply_filter = false;
    }
    if let Some(sigma) = sigma {
        config.grid.sigma = sigma;
    }

    let experiment = Experiment::new(root, config)
        .with_context(|| format!("Cannot open experiment {}", root.display()))?;
    let output_path = output.unwrap_or_else(|| {
        root.join(&experiment.config().experiment.point_cloud)
            .with_extension("png")
    });

    let spinner = create_spinner("Gridding point cloud...");
    let surface = experiment.build_surface();
    let surface = match surface {
        Ok(surface) => surface,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e).context("Failed to build the scour surface");
        }
    };

    spinner.set_message("Rendering heat map...");
    let rendered =
        visualization::plot_surface(&output_path, &surface, DEFAULT_WIDTH, DEFAULT_HEIGHT);
    spinner.finish_and_clear();
    rendered.with_context(|| format!("Failed to render {}", output_path.display()))?;

    let grid = surface.grid();
    let range = grid
        .value_range()
        .map(|(lo, hi)| format!("{:.2} .. {:.2}", lo, hi))
        .unwrap_or_else(|| "empty".to_string());
    print_summary(
        &format!("Surface Complete: {}", experiment.name()),
        &[
            ("Points in region", surface.point_count().to_string()),
            ("Grid", format!("{} x {}", grid.columns(), grid.rows())),
            ("Valid nodes", grid.valid_count().to_string()),
            ("Elevation range", range),
            ("Smoothed", experiment.config().grid.apply_filter.to_string()),
            ("Output PNG", output_path.display().to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
    Ok(())
}

fn cmd_probe(
    root: &Path,
    instrument: &str,
    x: f64,
    y: f64,
    new_file: bool,
    config: PipelineConfig,
) -> Result<()> {
    let start = Instant::now();
    let mut experiment = Experiment::new(root, config)
        .with_context(|| format!("Cannot open experiment {}", root.display()))?;

    let spinner = create_spinner("Gridding point cloud...");
    let surface = experiment.build_surface();
    spinner.finish_and_clear();
    let surface = surface.context("Failed to build the scour surface")?;

    let mode = if new_file {
        LogMode::Truncate
    } else {
        LogMode::Append
    };
    let depth = experiment
        .record_final_scour(&surface, instrument, x, y, mode)
        .context("Failed to record the final scour depth")?;
    if depth.is_nan() {
        warn!("No surface value at ({}, {})", x, y);
    }

    print_summary(
        "Final Scour Depth",
        &[
            ("Instrument", instrument.to_string()),
            ("Position", format!("({}, {})", x, y)),
            ("Depth", format_depth(depth)),
            ("Log mode", format!("{:?}", mode)),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
    Ok(())
}

fn cmd_footprint(test_name: &str, config: &PipelineConfig) -> Result<()> {
    let info = ExperimentInfo::parse(test_name)?;
    let footprint = StructureFootprint::from_codes(&info, &config.structure)?;

    let mut items = vec![("Test", info.to_string())];
    let labels = ["Corner 1", "Corner 2", "Corner 3", "Corner 4"];
    for (label, corner) in labels.iter().zip(footprint.corners()) {
        items.push((*label, format!("({:.4}, {:.4})", corner[0], corner[1])));
    }
    print_summary(&format!("Footprint: {}", test_name), &items);
    Ok(())
}
