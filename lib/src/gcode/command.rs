//! Corrective commands synthesized into the G-code stream.

use std::fmt;

/// Convert a fan speed percentage to the 0-255 PWM value `M106` expects.
///
/// The scaled value is truncated toward zero, so 50% maps to 127.
#[inline]
pub fn fan_percent_to_pwm(percent: i64) -> i64 {
    (percent as f64 / 100.0 * 255.0) as i64
}

/// A corrective command inserted after a layer change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CorrectionCommand {
    /// M104 - Set hotend temperature (no wait)
    Temperature { celsius: i64 },
    /// M106 - Set part cooling fan speed, given in percent
    FanSpeed { percent: i64 },
}

impl CorrectionCommand {
    /// Render the command as a single G-code line, annotated with the layer
    /// it was injected at.
    pub fn to_gcode(&self, layer: usize) -> String {
        match self {
            CorrectionCommand::Temperature { celsius } => format!(
                "M104 S{} ; Set hotend temperature to {}°C at layer {}",
                celsius, celsius, layer
            ),
            CorrectionCommand::FanSpeed { percent } => format!(
                "M106 S{} ; Set fan speed to {}% at layer {}",
                fan_percent_to_pwm(*percent),
                percent,
                layer
            ),
        }
    }
}

impl fmt::Display for CorrectionCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrectionCommand::Temperature { celsius } => write!(f, "temperature {}°C", celsius),
            CorrectionCommand::FanSpeed { percent } => write!(f, "fan {}%", percent),
        }
    }
}
