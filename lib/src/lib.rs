//! # layerfix
//!
//! Detects layers of a sliced print that are likely to fail adhesion and
//! rewrites the G-code to print them hotter and with less cooling.
//!
//! The library provides:
//! - G-code line classification (layer changes, moves, feature tags, metadata)
//! - Layer segmentation with support-only classification
//! - A per-layer perimeter signal and sharp-drop detection
//! - Corrective temperature/fan command injection
//! - File and directory processing with atomic output writes
//!
//! ## Example
//!
//! ```rust,ignore
//! use layerfix::{CorrectionPipeline, GCodeProgram, ProcessConfig};
//!
//! let program = GCodeProgram::from_file("model.gcode")?;
//! let pipeline = CorrectionPipeline::new(ProcessConfig::default());
//! let processed = pipeline.process(&program);
//! println!("Problematic layers: {:?}", processed.report.flagged_layers);
//! processed.program.write_to_file("model_modified.gcode")?;
//! ```

// Core modules
pub mod analysis;
pub mod config;
pub mod correction;
pub mod gcode;
pub mod pipeline;

use std::path::PathBuf;

// Re-export commonly used types
pub use analysis::{
    analyze, count_layers, AnalysisReport, AnomalyDetector, BoundaryCrossing, FileMetadata,
    LayerAssessment, LayerSegmentation, ReportFormat, SignalTracker,
};
pub use config::{AnalysisConfig, CorrectionConfig, ProcessConfig};
pub use correction::{CorrectionPlan, Injection};
pub use gcode::{
    fan_percent_to_pwm, inject_fan_speed, inject_temperature, CorrectionCommand, GCodeProgram,
};
pub use pipeline::{
    output_path_for, CorrectionPipeline, DirectoryOutcome, FileOutcome, OutputMode,
    ProcessedGCode,
};

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for layerfix operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {}: {}", .path.display(), .source)]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
