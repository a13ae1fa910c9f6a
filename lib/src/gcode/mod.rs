//! G-code line handling.
//!
//! This module provides the pieces of G-code the layer analysis needs:
//! line classification, whole-file line sequences, the corrective commands
//! that get synthesized and their insertion after layer changes.

pub mod classify;
mod command;
pub mod inject;
mod program;

pub use classify::{
    default_nozzle_temperature, extract_named_scalar, extract_planar_coordinates,
    is_feature_tag, is_layer_boundary, is_movement_line, is_support_tag, max_fan_speed,
    names_other_feature, PlanarCoordinates, FAN_MAX_SPEED_KEY, FEATURE_TAG, LAYER_CHANGE_MARKER,
    LINEAR_MOVE, NOZZLE_TEMPERATURE_KEY, SUPPORT_FEATURE, SUPPORT_FEATURE_TAG,
};
pub use command::{fan_percent_to_pwm, CorrectionCommand};
pub use inject::{inject_after_layer, inject_command, inject_fan_speed, inject_temperature};
pub use program::GCodeProgram;
