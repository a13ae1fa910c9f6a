//! Analysis results and their text/JSON rendering.

use super::detector::LayerAssessment;
use super::segmenter::LayerSegmentation;
use crate::gcode::{default_nozzle_temperature, max_fan_speed};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Header values read from the slicer's settings comments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    /// Default nozzle temperature (°C), 0 if missing.
    pub nozzle_temperature: i64,
    /// Maximum part cooling fan speed (percent), 0 if missing.
    pub fan_max_speed: i64,
}

impl FileMetadata {
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        Self {
            nozzle_temperature: default_nozzle_temperature(lines),
            fan_max_speed: max_fan_speed(lines),
        }
    }
}

/// Everything learned about one file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Path of the analyzed file, when it came from disk.
    pub source: Option<String>,
    pub metadata: FileMetadata,
    pub segmentation: LayerSegmentation,
    pub assessments: Vec<LayerAssessment>,
    pub flagged_layers: Vec<usize>,
}

impl AnalysisReport {
    pub fn new(
        segmentation: LayerSegmentation,
        assessments: Vec<LayerAssessment>,
        metadata: FileMetadata,
    ) -> Self {
        let flagged_layers = assessments
            .iter()
            .filter(|a| a.flagged)
            .map(|a| a.layer)
            .collect();
        Self {
            source: None,
            metadata,
            segmentation,
            assessments,
            flagged_layers,
        }
    }

    /// Builder method: record where the file came from.
    pub fn with_source<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.source = Some(path.as_ref().display().to_string());
        self
    }

    pub fn layer_count(&self) -> usize {
        self.segmentation.layer_count()
    }

    pub fn has_problems(&self) -> bool {
        !self.flagged_layers.is_empty()
    }

    /// Generate a text report.
    pub fn to_text(&self) -> String {
        let mut s = String::new();

        s.push_str("═══════════════════════════════════════════════════════════════════\n");
        s.push_str("                    LAYER ADHESION REPORT\n");
        s.push_str("═══════════════════════════════════════════════════════════════════\n\n");

        s.push_str(&format!(
            "File: {}\n",
            self.source.as_deref().unwrap_or("(unknown)")
        ));
        s.push_str(&format!("  Layers:              {}\n", self.layer_count()));
        s.push_str(&format!(
            "  Support-only layers: {}\n",
            self.segmentation.support_layer_indices().len()
        ));
        s.push_str(&format!(
            "  Nozzle temperature:  {}°C\n",
            self.metadata.nozzle_temperature
        ));
        s.push_str(&format!(
            "  Max fan speed:       {}%\n",
            self.metadata.fan_max_speed
        ));
        s.push('\n');

        s.push_str("───────────────────────────────────────────────────────────────────\n");
        s.push_str("LAYERS\n");
        s.push_str("───────────────────────────────────────────────────────────────────\n");
        s.push_str("  Layer     Start    Signal(mm)    Change\n");
        for a in &self.assessments {
            let start = self
                .segmentation
                .start_line(a.layer)
                .map(|l| l.to_string())
                .unwrap_or_else(|| "-".to_string());
            let change = a
                .percent_change
                .map(|c| format!("{:+.1}%", c))
                .unwrap_or_else(|| "n/a".to_string());
            let mut notes = String::new();
            if a.support_only {
                notes.push_str("  support-only");
            }
            if a.flagged {
                notes.push_str("  ⚠ FLAGGED");
            }
            s.push_str(&format!(
                "  {:>5}  {:>8}  {:>12.2}  {:>8}{}\n",
                a.layer, start, a.signal, change, notes
            ));
        }
        s.push('\n');

        if self.flagged_layers.is_empty() {
            s.push_str("No problematic layers detected.\n");
        } else {
            let list: Vec<String> = self.flagged_layers.iter().map(|l| l.to_string()).collect();
            s.push_str(&format!("Problematic layers: {}\n", list.join(", ")));
        }

        s
    }

    /// Generate a JSON report.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Render in `format`.
    pub fn render(&self, format: ReportFormat) -> Result<String> {
        Ok(match format {
            ReportFormat::Text => self.to_text(),
            ReportFormat::Json => self.to_json()?,
        })
    }

    /// Write the report to a file in the specified format.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P, format: ReportFormat) -> Result<()> {
        fs::write(path, self.render(format)?)?;
        Ok(())
    }
}

/// Output format for analysis reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// Plain text format
    Text,
    /// JSON format
    Json,
}

impl ReportFormat {
    /// Parse format from string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }

    /// Get file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
        }
    }
}
