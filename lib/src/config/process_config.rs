//! Detection thresholds and correction policy.
//!
//! Both halves load from a single JSON file where every field is optional:
//!
//! ```json
//! {
//!   "analysis": { "upper_bound": -50.0, "lower_bound": -95.0, "min_signal": 80.0, "min_layer": 20 },
//!   "correction": { "fan_percent": 1, "temperature_boost": 20, "lead_layers": 3, "trail_layers": 2 }
//! }
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Thresholds for flagging a layer whose signal dropped sharply.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// A layer must drop by more than this (percent change strictly below it).
    pub upper_bound: f64,
    /// Drops reaching this far (percent change at or below it) are treated as
    /// the part ending, not a defect.
    pub lower_bound: f64,
    /// Signals at or below this (mm) are too small for percentages to mean anything.
    pub min_signal: f64,
    /// Layers at or below this index are never flagged (brim, skirt, first layers).
    pub min_layer: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            upper_bound: -50.0,
            lower_bound: -95.0,
            min_signal: 80.0,
            min_layer: 20,
        }
    }
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the upper percent-change bound.
    pub fn upper_bound(mut self, percent: f64) -> Self {
        self.upper_bound = percent;
        self
    }

    /// Builder method: set the lower percent-change bound.
    pub fn lower_bound(mut self, percent: f64) -> Self {
        self.lower_bound = percent;
        self
    }

    /// Builder method: set the minimum signal.
    pub fn min_signal(mut self, signal: f64) -> Self {
        self.min_signal = signal;
        self
    }

    /// Builder method: set the minimum layer index.
    pub fn min_layer(mut self, layer: usize) -> Self {
        self.min_layer = layer;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.upper_bound.is_finite() || !self.lower_bound.is_finite() {
            return Err(Error::Config(
                "percent-change bounds must be finite".to_string(),
            ));
        }
        if self.lower_bound >= self.upper_bound {
            return Err(Error::Config(format!(
                "lower_bound ({}) must be below upper_bound ({})",
                self.lower_bound, self.upper_bound
            )));
        }
        if self.min_signal.is_nan() || self.min_signal < 0.0 {
            return Err(Error::Config(format!(
                "min_signal must be non-negative, got {}",
                self.min_signal
            )));
        }
        Ok(())
    }
}

impl fmt::Display for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "drop between {}% and {}%, signal > {} mm, layer > {}",
            self.lower_bound, self.upper_bound, self.min_signal, self.min_layer
        )
    }
}

/// What to inject around a flagged layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    /// Fan speed (percent) set ahead of the flagged layer.
    pub fan_percent: i64,
    /// Degrees added to the default nozzle temperature ahead of the flagged layer.
    pub temperature_boost: i64,
    /// How many layers before the flagged layer the boost starts.
    pub lead_layers: usize,
    /// How many layers after the flagged layer the defaults are restored.
    pub trail_layers: usize,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            fan_percent: 1,
            temperature_boost: 20,
            lead_layers: 3,
            trail_layers: 2,
        }
    }
}

impl CorrectionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the reduced fan speed.
    pub fn fan_percent(mut self, percent: i64) -> Self {
        self.fan_percent = percent;
        self
    }

    /// Builder method: set the temperature boost.
    pub fn temperature_boost(mut self, celsius: i64) -> Self {
        self.temperature_boost = celsius;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0..=100).contains(&self.fan_percent) {
            return Err(Error::Config(format!(
                "fan_percent must be within 0-100, got {}",
                self.fan_percent
            )));
        }
        Ok(())
    }
}

/// Complete configuration for processing a file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessConfig {
    pub analysis: AnalysisConfig,
    pub correction: CorrectionConfig,
}

impl ProcessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn validate(&self) -> Result<()> {
        self.analysis.validate()?;
        self.correction.validate()
    }
}
