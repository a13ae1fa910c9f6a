//! Insertion of synthesized lines after a layer change.
//!
//! Every function here rescans the whole line sequence and returns a new one.
//! The injection point for layer `L` is the line right after the layer change
//! comment with zero-based index `L`. A layer that never occurs leaves the
//! sequence unchanged.

use super::classify::is_layer_boundary;
use super::command::CorrectionCommand;

/// Insert `inserted` right after the `layer`-th (zero-based) layer change.
pub fn inject_after_layer<S: AsRef<str>>(lines: &[S], layer: usize, inserted: &str) -> Vec<String> {
    let mut out = Vec::with_capacity(lines.len() + 1);
    let mut boundaries_seen = 0usize;

    for line in lines {
        let line = line.as_ref();
        out.push(line.to_string());
        if is_layer_boundary(line) {
            if boundaries_seen == layer {
                out.push(inserted.to_string());
            }
            boundaries_seen += 1;
        }
    }

    out
}

/// Insert a correction command at `layer`.
pub fn inject_command<S: AsRef<str>>(
    lines: &[S],
    layer: usize,
    command: CorrectionCommand,
) -> Vec<String> {
    inject_after_layer(lines, layer, &command.to_gcode(layer))
}

/// Set the hotend temperature at `layer`.
pub fn inject_temperature<S: AsRef<str>>(lines: &[S], layer: usize, celsius: i64) -> Vec<String> {
    inject_command(lines, layer, CorrectionCommand::Temperature { celsius })
}

/// Set the part cooling fan speed (percent) at `layer`.
pub fn inject_fan_speed<S: AsRef<str>>(lines: &[S], layer: usize, percent: i64) -> Vec<String> {
    inject_command(lines, layer, CorrectionCommand::FanSpeed { percent })
}
