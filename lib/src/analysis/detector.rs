//! Detection of layers prone to adhesion defects.
//!
//! A layer is flagged when its perimeter signal drops sharply from the layer
//! below, but not so far that the part simply ended, and the layer is high
//! enough, large enough and made of model geometry.

use super::segmenter::LayerSegmentation;
use super::signal::BoundaryCrossing;
use crate::config::AnalysisConfig;
use log::debug;
use serde::{Deserialize, Serialize};

/// The detector's view of one evaluated layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerAssessment {
    pub layer: usize,
    pub signal: f64,
    pub previous_signal: f64,
    /// `None` when the previous layer had no signal.
    pub percent_change: Option<f64>,
    pub support_only: bool,
    pub flagged: bool,
}

/// Applies [`AnalysisConfig`] thresholds to per-layer signal crossings.
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    config: AnalysisConfig,
}

impl AnomalyDetector {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Whether a crossing qualifies as a sharp, meaningful drop.
    ///
    /// All comparisons are strict.
    pub fn is_sharp_drop(&self, crossing: &BoundaryCrossing) -> bool {
        let Some(change) = crossing.percent_change() else {
            return false;
        };
        change < self.config.upper_bound
            && change > self.config.lower_bound
            && crossing.signal > self.config.min_signal
    }

    /// Assess every crossing past the first two layer changes.
    pub fn assess(
        &self,
        crossings: &[BoundaryCrossing],
        segmentation: &LayerSegmentation,
    ) -> Vec<LayerAssessment> {
        crossings
            .iter()
            .filter(|crossing| crossing.layer > 1)
            .map(|crossing| {
                let support_only = segmentation.is_support_only(crossing.layer);
                let flagged = self.is_sharp_drop(crossing)
                    && crossing.layer > self.config.min_layer
                    && !support_only;

                let assessment = LayerAssessment {
                    layer: crossing.layer,
                    signal: crossing.signal,
                    previous_signal: crossing.previous_signal,
                    percent_change: crossing.percent_change(),
                    support_only,
                    flagged,
                };
                log_assessment(&assessment);
                assessment
            })
            .collect()
    }

    /// Indices of flagged layers, ascending.
    pub fn detect(
        &self,
        crossings: &[BoundaryCrossing],
        segmentation: &LayerSegmentation,
    ) -> Vec<usize> {
        self.assess(crossings, segmentation)
            .into_iter()
            .filter(|a| a.flagged)
            .map(|a| a.layer)
            .collect()
    }
}

fn log_assessment(a: &LayerAssessment) {
    let change = a
        .percent_change
        .map(|c| format!("{:+.0}%", c))
        .unwrap_or_else(|| "n/a".to_string());
    debug!(
        "Layer {} has length {:.2} (chg {}){}{}",
        a.layer,
        a.signal,
        change,
        if a.support_only { " SUPPORT ONLY" } else { "" },
        if a.flagged { " FLAGGED" } else { "" },
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Crossings for a run of layer signals; `signals[k]` is the signal
    /// reported at layer change `k`.
    fn crossings_for(signals: &[f64]) -> Vec<BoundaryCrossing> {
        let mut previous = 0.0;
        signals
            .iter()
            .enumerate()
            .map(|(layer, &signal)| {
                let crossing = BoundaryCrossing {
                    layer,
                    signal,
                    previous_signal: previous,
                };
                previous = signal;
                crossing
            })
            .collect()
    }

    /// Uniform signal with a single layer replaced.
    fn dip_at(layer: usize, base: f64, dip: f64, count: usize) -> Vec<BoundaryCrossing> {
        let mut signals = vec![base; count];
        signals[layer] = dip;
        crossings_for(&signals)
    }

    fn detect(crossings: &[BoundaryCrossing]) -> Vec<usize> {
        AnomalyDetector::default().detect(crossings, &LayerSegmentation::default())
    }

    #[test]
    fn test_sharp_drop_is_flagged() {
        // 200 -> 90 is a 55% drop.
        assert_eq!(detect(&dip_at(22, 200.0, 90.0, 30)), vec![22]);
    }

    #[test]
    fn test_bounds_are_strict() {
        // Exactly -50%.
        assert!(detect(&dip_at(22, 200.0, 100.0, 30)).is_empty());
        // Exactly -95%.
        assert!(detect(&dip_at(22, 2000.0, 100.0, 30)).is_empty());
        // -96%: treated as the part ending.
        assert!(detect(&dip_at(22, 2500.0, 100.0, 30)).is_empty());
    }

    #[test]
    fn test_small_signals_ignored() {
        // 60% drop, but 40 is below the 80 floor.
        assert!(detect(&dip_at(22, 100.0, 40.0, 30)).is_empty());
        // Exactly at the floor.
        assert!(detect(&dip_at(22, 200.0, 80.0, 30)).is_empty());
        // Same drop with the floor lowered.
        let detector = AnomalyDetector::new(AnalysisConfig::new().min_signal(0.0));
        assert_eq!(
            detector.detect(&dip_at(22, 100.0, 40.0, 30), &LayerSegmentation::default()),
            vec![22]
        );
    }

    #[test]
    fn test_early_layers_ignored() {
        assert!(detect(&dip_at(20, 200.0, 90.0, 30)).is_empty());
        assert_eq!(detect(&dip_at(21, 200.0, 90.0, 30)), vec![21]);

        let detector = AnomalyDetector::new(AnalysisConfig::new().min_layer(0));
        // Layers 0 and 1 are never evaluated.
        let crossings = crossings_for(&[200.0, 90.0, 200.0, 90.0]);
        assert_eq!(
            detector.detect(&crossings, &LayerSegmentation::default()),
            vec![3]
        );
    }

    #[test]
    fn test_zero_previous_signal_not_flagged() {
        let mut crossings = dip_at(22, 200.0, 90.0, 30);
        crossings[22].previous_signal = 0.0;
        assert!(detect(&crossings).is_empty());
    }

    #[test]
    fn test_rising_signal_not_flagged() {
        // 200 -> 250 is a rise; the rebound to 200 is only -20%.
        assert!(detect(&dip_at(22, 200.0, 250.0, 30)).is_empty());

        // A spike followed by a return to a much lower base flags the return.
        let flagged = detect(&dip_at(22, 100.0, 250.0, 30));
        assert!(!flagged.contains(&22));
        assert_eq!(flagged, vec![23]);
    }

    #[test]
    fn test_support_only_layer_excluded() {
        let mut lines: Vec<String> = Vec::new();
        for n in 1..=30 {
            lines.push(format!("; layer num/total_layer_count: {}/30", n));
            if n == 22 {
                lines.push("; FEATURE: Support".to_string());
            } else {
                lines.push("; FEATURE: Outer wall".to_string());
            }
        }
        let segmentation = LayerSegmentation::from_lines(&lines);
        assert!(segmentation.is_support_only(22));

        let detector = AnomalyDetector::default();
        let crossings = dip_at(22, 200.0, 90.0, 30);
        assert!(detector.detect(&crossings, &segmentation).is_empty());

        let assessments = detector.assess(&crossings, &segmentation);
        let layer_22 = assessments.iter().find(|a| a.layer == 22).unwrap();
        assert!(layer_22.support_only);
        assert!(!layer_22.flagged);
    }

    #[test]
    fn test_multiple_flags_in_order() {
        let mut signals = vec![200.0; 40];
        signals[25] = 90.0;
        signals[32] = 90.0;
        assert_eq!(detect(&crossings_for(&signals)), vec![25, 32]);
    }

    #[test]
    fn test_assessments_skip_first_two_layers() {
        let crossings = crossings_for(&[10.0, 20.0, 30.0, 40.0]);
        let assessments =
            AnomalyDetector::default().assess(&crossings, &LayerSegmentation::default());
        let layers: Vec<usize> = assessments.iter().map(|a| a.layer).collect();
        assert_eq!(layers, vec![2, 3]);
        assert!((assessments[0].percent_change.unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_input() {
        assert!(detect(&[]).is_empty());
    }
}
