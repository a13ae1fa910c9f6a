//! Layer analysis.
//!
//! This module turns a G-code line sequence into per-layer facts:
//! - [`LayerSegmentation`]: layer count, start lines, support-only layers
//! - [`SignalTracker`]: perimeter signal at every layer change
//! - [`AnomalyDetector`]: layers whose signal drops sharply
//!
//! [`analyze`] runs all three and bundles the results in an [`AnalysisReport`].

mod detector;
mod report;
mod segmenter;
mod signal;

pub use detector::{AnomalyDetector, LayerAssessment};
pub use report::{AnalysisReport, FileMetadata, ReportFormat};
pub use segmenter::{count_layers, LayerSegmentation};
pub use signal::{BoundaryCrossing, SignalTracker};

use crate::config::AnalysisConfig;
use log::info;

/// Analyze `lines` with the given thresholds.
pub fn analyze<S: AsRef<str>>(lines: &[S], config: &AnalysisConfig) -> AnalysisReport {
    let segmentation = LayerSegmentation::from_lines(lines);
    let crossings = SignalTracker::crossings(lines);
    let detector = AnomalyDetector::new(config.clone());
    let assessments = detector.assess(&crossings, &segmentation);
    let metadata = FileMetadata::from_lines(lines);

    let report = AnalysisReport::new(segmentation, assessments, metadata);
    info!(
        "{} layers, {} support-only, problematic layers: {:?}",
        report.layer_count(),
        report.segmentation.support_layer_indices().len(),
        report.flagged_layers
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 30 square layers of perimeter 250, except layer 22 with perimeter 100
    /// printed under `dip_feature`.
    fn square_layers(dip_feature: &str) -> Vec<String> {
        let mut lines = vec!["G28".to_string(), "G1 X0 Y0 F3000".to_string()];
        for n in 1..=30 {
            let (side, feature) = if n == 22 {
                (25.0, dip_feature)
            } else {
                (62.5, "Outer wall")
            };
            lines.push(format!("; layer num/total_layer_count: {}/30", n));
            lines.push(format!("; FEATURE: {}", feature));
            lines.push(format!("G1 X{} Y0 E1", side));
            lines.push(format!("G1 X{} Y{} E1", side, side));
            lines.push(format!("G1 X0 Y{} E1", side));
            lines.push("G1 X0 Y0 E1".to_string());
        }
        lines
    }

    #[test]
    fn test_analyze_flags_real_drop() {
        let report = analyze(&square_layers("Outer wall"), &AnalysisConfig::default());
        assert_eq!(report.layer_count(), 30);
        assert_eq!(report.flagged_layers, vec![22]);
    }

    #[test]
    fn test_analyze_support_only_drop_not_flagged() {
        let report = analyze(&square_layers("Support"), &AnalysisConfig::default());
        assert_eq!(report.segmentation.support_layer_indices(), vec![22]);
        assert!(report.flagged_layers.is_empty());

        // The support-only flag lines up with the crossing carrying the dip.
        let layer_22 = report.assessments.iter().find(|a| a.layer == 22).unwrap();
        assert!(layer_22.support_only);
        assert!((layer_22.signal - 100.0).abs() < 1e-9);
        assert!((layer_22.percent_change.unwrap() + 60.0).abs() < 1e-9);
        assert!(!layer_22.flagged);
    }

    #[test]
    fn test_analyze_without_layers() {
        let lines = vec!["G28", "G1 X0 Y0", "G1 X100 Y0", "; nozzle_temperature = 210"];
        let report = analyze(&lines, &AnalysisConfig::default());
        assert_eq!(report.layer_count(), 0);
        assert!(report.segmentation.start_lines().is_empty());
        assert!(report.segmentation.support_only_layers().is_empty());
        assert!(report.assessments.is_empty());
        assert!(report.flagged_layers.is_empty());
        assert_eq!(report.metadata.nozzle_temperature, 210);
    }
}
