//! Line classification for slicer-generated G-code.
//!
//! Only a handful of line kinds matter to the layer analysis:
//! - layer change comments (`; layer num/total_layer_count: 12/240`)
//! - linear moves (`G1 X.. Y..`)
//! - feature tags (`; FEATURE: Outer wall`, `; FEATURE: Support`)
//! - the `; nozzle_temperature = ..` and `; fan_max_speed = ..` metadata comments
//!
//! Everything here is a stateless predicate or extractor over a single line.

use log::warn;

/// Prefix of the comment BambuStudio/OrcaSlicer emit at every layer change.
pub const LAYER_CHANGE_MARKER: &str = "; layer num/total_layer_count: ";

/// Prefix of a linear move command.
pub const LINEAR_MOVE: &str = "G1";

/// Prefix of a feature tag comment.
pub const FEATURE_TAG: &str = "; FEATURE:";

/// Feature name reserved for support material.
pub const SUPPORT_FEATURE: &str = "Support";

/// The exact feature tag line for support material.
pub const SUPPORT_FEATURE_TAG: &str = "; FEATURE: Support";

/// Metadata key carrying the default nozzle temperature (°C).
pub const NOZZLE_TEMPERATURE_KEY: &str = "; nozzle_temperature = ";

/// Metadata key carrying the maximum part cooling fan speed (percent).
pub const FAN_MAX_SPEED_KEY: &str = "; fan_max_speed = ";

/// Returns true if the line marks the start of a new layer.
#[inline]
pub fn is_layer_boundary(line: &str) -> bool {
    line.starts_with(LAYER_CHANGE_MARKER)
}

/// Returns true if the line is a linear move.
///
/// This is a plain prefix check, so `G10`/`G11` firmware retracts also match.
#[inline]
pub fn is_movement_line(line: &str) -> bool {
    line.starts_with(LINEAR_MOVE)
}

/// Returns true if the line is a feature tag comment of any kind.
#[inline]
pub fn is_feature_tag(line: &str) -> bool {
    line.starts_with(FEATURE_TAG)
}

/// Returns true if the line is exactly the support feature tag.
#[inline]
pub fn is_support_tag(line: &str) -> bool {
    line == SUPPORT_FEATURE_TAG
}

/// Returns true if the line is a feature tag naming something other than support.
///
/// Tags that merely contain the support name (e.g. `; FEATURE: Support interface`)
/// are neither "other" nor the support tag itself.
#[inline]
pub fn names_other_feature(line: &str) -> bool {
    is_feature_tag(line) && !line.contains(SUPPORT_FEATURE)
}

/// Planar coordinates found on a movement line.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlanarCoordinates {
    pub x: f64,
    pub y: f64,
    pub has_x: bool,
    pub has_y: bool,
}

impl PlanarCoordinates {
    /// Both X and Y are present.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.has_x && self.has_y
    }

    /// The point, if both coordinates are present.
    pub fn point(&self) -> Option<(f64, f64)> {
        self.is_complete().then_some((self.x, self.y))
    }
}

/// Extract X/Y from the whitespace-separated fields of a line.
///
/// A field is a coordinate iff its first character is literally `X` or `Y`.
/// Unparseable numeric text still counts as present and reads as `0.0`.
pub fn extract_planar_coordinates(line: &str) -> PlanarCoordinates {
    let mut coords = PlanarCoordinates::default();

    for field in line.split_whitespace() {
        if let Some(value) = field.strip_prefix('X') {
            coords.x = value.parse().unwrap_or(0.0);
            coords.has_x = true;
        } else if let Some(value) = field.strip_prefix('Y') {
            coords.y = value.parse().unwrap_or(0.0);
            coords.has_y = true;
        }
    }

    coords
}

/// Read an integer metadata value of the form `"; <name> = <value>"`.
///
/// Returns the value from the first line starting with `key`, or 0 if no line
/// matches or the first match does not hold a plain integer.
pub fn extract_named_scalar<S: AsRef<str>>(lines: &[S], key: &str) -> i64 {
    let Some(line) = lines
        .iter()
        .map(|line| line.as_ref())
        .find(|line| line.starts_with(key))
    else {
        return 0;
    };

    let raw = line.split(" = ").nth(1).unwrap_or("");
    match raw.parse::<i64>() {
        Ok(value) => value,
        Err(_) => {
            warn!("Could not parse metadata value {:?} in {:?}, using 0", raw, line);
            0
        }
    }
}

/// Default nozzle temperature (°C) declared in the file header.
pub fn default_nozzle_temperature<S: AsRef<str>>(lines: &[S]) -> i64 {
    extract_named_scalar(lines, NOZZLE_TEMPERATURE_KEY)
}

/// Maximum fan speed (percent) declared in the file header.
pub fn max_fan_speed<S: AsRef<str>>(lines: &[S]) -> i64 {
    extract_named_scalar(lines, FAN_MAX_SPEED_KEY)
}
