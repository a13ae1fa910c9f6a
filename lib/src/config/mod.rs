//! Configuration for layer analysis and correction.

mod process_config;

pub use process_config::{AnalysisConfig, CorrectionConfig, ProcessConfig};
