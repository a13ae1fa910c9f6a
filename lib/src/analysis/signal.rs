//! Per-layer perimeter signal.
//!
//! The signal of a layer is the planar distance covered by consecutive linear
//! moves carrying both X and Y. It is a cheap proxy for how much perimeter
//! geometry the layer contains. Nothing is counted before the first complete
//! coordinate pair of the file. After that every move adds its distance from
//! the previous point, including the hop from the previous layer's last point.

use crate::gcode::{extract_planar_coordinates, is_layer_boundary, is_movement_line};
use serde::{Deserialize, Serialize};

/// The signal state observed at a layer change.
///
/// `layer` is the zero-based index of the layer change comment. `signal` is
/// the distance accumulated since the previous change (i.e. the layer that
/// just ended) and `previous_signal` is the value of the layer before that.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundaryCrossing {
    pub layer: usize,
    pub signal: f64,
    pub previous_signal: f64,
}

impl BoundaryCrossing {
    /// Percent change from the previous layer, undefined when it had no signal.
    pub fn percent_change(&self) -> Option<f64> {
        if self.previous_signal == 0.0 {
            return None;
        }
        Some((self.signal - self.previous_signal) / self.previous_signal * 100.0)
    }
}

#[inline]
fn planar_distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    (dx * dx + dy * dy).sqrt()
}

/// Streaming accumulator for the perimeter signal.
#[derive(Debug, Clone, Default)]
pub struct SignalTracker {
    boundaries_seen: usize,
    previous_signal: f64,
    current_signal: f64,
    last_point: Option<(f64, f64)>,
}

impl SignalTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line. Returns the crossing if the line is a layer change.
    pub fn observe(&mut self, line: &str) -> Option<BoundaryCrossing> {
        if is_layer_boundary(line) {
            let crossing = BoundaryCrossing {
                layer: self.boundaries_seen,
                signal: self.current_signal,
                previous_signal: self.previous_signal,
            };
            self.boundaries_seen += 1;
            self.previous_signal = self.current_signal;
            self.current_signal = 0.0;
            return Some(crossing);
        }

        if is_movement_line(line) {
            if let Some(point) = extract_planar_coordinates(line).point() {
                if let Some(last) = self.last_point {
                    self.current_signal += planar_distance(last, point);
                }
                self.last_point = Some(point);
            }
        }

        None
    }

    /// Signal accumulated so far in the current (unfinished) layer.
    pub fn current_signal(&self) -> f64 {
        self.current_signal
    }

    /// Whether a complete coordinate pair has been seen yet.
    pub fn is_extruding(&self) -> bool {
        self.last_point.is_some()
    }

    /// Run the tracker over `lines`, returning one crossing per layer change.
    ///
    /// Content after the last layer change produces no crossing.
    pub fn crossings<S: AsRef<str>>(lines: &[S]) -> Vec<BoundaryCrossing> {
        let mut tracker = Self::new();
        lines
            .iter()
            .filter_map(|line| tracker.observe(line.as_ref()))
            .collect()
    }
}
