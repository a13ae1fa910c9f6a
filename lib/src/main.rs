//! layerfix CLI - detect and correct adhesion-prone layers in G-code
//!
//! Usage:
//!   layerfix fix <file.gcode | dir>... [--overwrite] [--config layerfix.json]
//!   layerfix analyze <file.gcode> [--format json] [--output report.json]
//!   layerfix temp <file.gcode> --layer 42 --value 230
//!   layerfix fan <file.gcode> --layer 42 --value 20

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use layerfix::{
    CorrectionCommand, CorrectionPipeline, Injection, OutputMode, ProcessConfig, ReportFormat,
};
use log::{info, warn, LevelFilter};
use std::path::{Path, PathBuf};

/// Detect G-code layers prone to adhesion defects and inject corrective commands
#[derive(Parser, Debug)]
#[command(name = "layerfix")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output (per-layer signal values)
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Detection threshold overrides shared by `fix` and `analyze`.
#[derive(Args, Debug, Default)]
struct ThresholdArgs {
    /// Configuration file (JSON format)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Ignore layers at or below this index
    #[arg(long)]
    min_layer: Option<usize>,

    /// Percent change a layer must fall below (e.g. -50)
    #[arg(long, allow_negative_numbers = true)]
    upper_bound: Option<f64>,

    /// Percent change a layer must stay above (e.g. -95)
    #[arg(long, allow_negative_numbers = true)]
    lower_bound: Option<f64>,

    /// Minimum perimeter signal in mm
    #[arg(long)]
    min_signal: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Detect problematic layers and write corrected G-code
    Fix {
        /// G-code files or directories (searched recursively)
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,

        /// Overwrite the input instead of writing <name>_modified.gcode
        #[arg(short, long)]
        overwrite: bool,

        #[command(flatten)]
        thresholds: ThresholdArgs,
    },

    /// Report per-layer signal and problematic layers without modifying anything
    Analyze {
        /// Input G-code file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output format: text or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Output report file
        #[arg(long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        #[command(flatten)]
        thresholds: ThresholdArgs,
    },

    /// Set the hotend temperature after a given layer change
    Temp {
        /// Input G-code file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Zero-based layer change index
        #[arg(short, long)]
        layer: usize,

        /// Temperature in °C
        #[arg(long)]
        value: i64,

        /// Overwrite the input instead of writing <name>_modified.gcode
        #[arg(short, long)]
        overwrite: bool,
    },

    /// Set the part cooling fan speed after a given layer change
    Fan {
        /// Input G-code file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Zero-based layer change index
        #[arg(short, long)]
        layer: usize,

        /// Fan speed in percent (0-100)
        #[arg(long, value_parser = clap::value_parser!(i64).range(0..=100))]
        value: i64,

        /// Overwrite the input instead of writing <name>_modified.gcode
        #[arg(short, long)]
        overwrite: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.debug {
        LevelFilter::Debug
    } else if cli.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    match cli.command {
        Commands::Fix {
            paths,
            overwrite,
            thresholds,
        } => cmd_fix(paths, output_mode(overwrite), thresholds),
        Commands::Analyze {
            input,
            format,
            output,
            thresholds,
        } => cmd_analyze(input, format, output, thresholds),
        Commands::Temp {
            input,
            layer,
            value,
            overwrite,
        } => cmd_inject(
            input,
            Injection::new(layer, CorrectionCommand::Temperature { celsius: value }),
            output_mode(overwrite),
        ),
        Commands::Fan {
            input,
            layer,
            value,
            overwrite,
        } => cmd_inject(
            input,
            Injection::new(layer, CorrectionCommand::FanSpeed { percent: value }),
            output_mode(overwrite),
        ),
    }
}

fn output_mode(overwrite: bool) -> OutputMode {
    if overwrite {
        OutputMode::Overwrite
    } else {
        OutputMode::Modified
    }
}

/// Load the configuration file, if any, and apply CLI overrides on top.
fn load_config(args: &ThresholdArgs) -> Result<ProcessConfig> {
    let mut config = match &args.config {
        Some(path) => {
            info!("Loading config from: {}", path.display());
            ProcessConfig::from_file(path)
                .with_context(|| format!("Failed to load config: {}", path.display()))?
        }
        None => ProcessConfig::default(),
    };

    if let Some(layer) = args.min_layer {
        config.analysis.min_layer = layer;
    }
    if let Some(bound) = args.upper_bound {
        config.analysis.upper_bound = bound;
    }
    if let Some(bound) = args.lower_bound {
        config.analysis.lower_bound = bound;
    }
    if let Some(signal) = args.min_signal {
        config.analysis.min_signal = signal;
    }
    config.validate().context("Invalid configuration")?;

    info!("Detection: {}", config.analysis);
    Ok(config)
}

fn cmd_fix(paths: Vec<PathBuf>, mode: OutputMode, thresholds: ThresholdArgs) -> Result<()> {
    let pipeline = CorrectionPipeline::new(load_config(&thresholds)?);
    let mut failed = 0usize;
    let mut total = 0usize;

    for path in &paths {
        if path.is_dir() {
            let (done, errors) = fix_directory(&pipeline, path, mode)?;
            total += done;
            failed += errors;
        } else {
            total += 1;
            match pipeline.process_file(path, mode) {
                Ok(outcome) => {
                    println!(
                        "{}: {} layers, problematic layers {:?} -> {}",
                        path.display(),
                        outcome.report.layer_count(),
                        outcome.report.flagged_layers,
                        outcome.output.display()
                    );
                }
                Err(e) => {
                    eprintln!("Error processing {}: {}", path.display(), e);
                    failed += 1;
                }
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} files failed", failed, total);
    }
    Ok(())
}

/// Process a directory with a progress bar. Returns (files seen, failures).
fn fix_directory(
    pipeline: &CorrectionPipeline,
    dir: &Path,
    mode: OutputMode,
) -> Result<(usize, usize)> {
    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );

    let outcome = pipeline
        .process_directory_with_callback(dir, mode, |path, index, total| {
            progress.set_length(total as u64);
            progress.set_position(index as u64);
            progress.set_message(
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            );
        })
        .with_context(|| format!("Failed to scan directory: {}", dir.display()))?;

    progress.set_position(outcome.file_count() as u64);
    progress.finish_with_message("Done!");

    if outcome.file_count() == 0 {
        warn!("No .gcode files found in {}", dir.display());
    }

    for result in &outcome.processed {
        println!(
            "{}: problematic layers {:?} -> {}",
            result.input.display(),
            result.report.flagged_layers,
            result.output.display()
        );
    }
    for (path, e) in &outcome.failures {
        eprintln!("Error processing {}: {}", path.display(), e);
    }

    Ok((outcome.file_count(), outcome.failures.len()))
}

fn cmd_analyze(
    input: PathBuf,
    format: String,
    output: Option<PathBuf>,
    thresholds: ThresholdArgs,
) -> Result<()> {
    let pipeline = CorrectionPipeline::new(load_config(&thresholds)?);

    // Parse output format
    let report_format = ReportFormat::from_str(&format).unwrap_or_else(|| {
        warn!("Unknown report format '{}', using text", format);
        ReportFormat::Text
    });

    let report = pipeline
        .analyze_file(&input)
        .with_context(|| format!("Failed to analyze {}", input.display()))?;

    if let Some(output_path) = output {
        let final_path = if output_path.extension().is_none() {
            output_path.with_extension(report_format.extension())
        } else {
            output_path
        };

        report
            .write_to_file(&final_path, report_format)
            .with_context(|| format!("Failed to write report to: {}", final_path.display()))?;

        println!("Report written to: {}", final_path.display());
    } else {
        let content = report
            .render(report_format)
            .context("Failed to render report")?;
        println!("{}", content);
    }

    Ok(())
}

fn cmd_inject(input: PathBuf, injection: Injection, mode: OutputMode) -> Result<()> {
    let pipeline = CorrectionPipeline::default();
    let output = pipeline
        .inject_into_file(&input, injection, mode)
        .with_context(|| format!("Failed to modify {}", input.display()))?;

    println!(
        "Set {} at layer {}, saved as {}",
        injection.command,
        injection.layer,
        output.display()
    );
    Ok(())
}
