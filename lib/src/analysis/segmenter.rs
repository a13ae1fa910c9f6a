//! Layer segmentation.
//!
//! A single pass over the lines that counts layer changes, records where each
//! layer's content starts and classifies layers as support-only.
//!
//! Layer `k` (k >= 1) is the content following the k-th layer change comment.
//! Layer 0 is whatever precedes the first layer change (start G-code, purge
//! lines) and is never considered support-only.

use crate::gcode::{is_layer_boundary, is_support_tag, names_other_feature};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Count the layer change comments in `lines`.
pub fn count_layers<S: AsRef<str>>(lines: &[S]) -> usize {
    lines
        .iter()
        .filter(|line| is_layer_boundary(line.as_ref()))
        .count()
}

/// Layer structure of a G-code file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSegmentation {
    layer_count: usize,
    /// Layer index -> offset of the first line after its layer change comment.
    start_lines: BTreeMap<usize, usize>,
    /// Layer index -> support-only classification.
    support_only: BTreeMap<usize, bool>,
}

impl LayerSegmentation {
    /// Segment `lines` into layers.
    pub fn from_lines<S: AsRef<str>>(lines: &[S]) -> Self {
        let mut segmentation = Self::default();
        let mut current_layer = 0usize;
        let mut has_other_feature = false;

        for (offset, line) in lines.iter().enumerate() {
            let line = line.as_ref();

            if is_layer_boundary(line) {
                if has_other_feature {
                    segmentation.support_only.insert(current_layer, false);
                }

                current_layer += 1;
                segmentation.layer_count += 1;
                segmentation.start_lines.insert(current_layer, offset + 1);

                has_other_feature = false;
                segmentation.support_only.insert(current_layer, false);
            } else if names_other_feature(line) {
                has_other_feature = true;
            } else if is_support_tag(line) && current_layer > 0 {
                segmentation.support_only.insert(current_layer, true);
            }
        }

        // The final layer has no closing boundary to settle it.
        if has_other_feature && current_layer > 0 {
            segmentation.support_only.insert(current_layer, false);
        }

        segmentation
    }

    /// Number of layer change comments.
    pub fn layer_count(&self) -> usize {
        self.layer_count
    }

    /// Offset of the first line of `layer`, if that layer exists.
    pub fn start_line(&self, layer: usize) -> Option<usize> {
        self.start_lines.get(&layer).copied()
    }

    /// Whether `layer` contains nothing but support. Unknown layers are not.
    pub fn is_support_only(&self, layer: usize) -> bool {
        self.support_only.get(&layer).copied().unwrap_or(false)
    }

    pub fn start_lines(&self) -> &BTreeMap<usize, usize> {
        &self.start_lines
    }

    pub fn support_only_layers(&self) -> &BTreeMap<usize, bool> {
        &self.support_only
    }

    /// Indices of layers classified as support-only, ascending.
    pub fn support_layer_indices(&self) -> Vec<usize> {
        self.support_only
            .iter()
            .filter_map(|(&layer, &support)| support.then_some(layer))
            .collect()
    }
}
