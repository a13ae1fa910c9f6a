//! Corrective injection planning.
//!
//! For every flagged layer `L` four commands are planned, in order:
//! 1. reduced fan at `L - lead_layers`
//! 2. boosted nozzle temperature at `L - lead_layers`
//! 3. maximum fan at `L + trail_layers`
//! 4. default nozzle temperature at `L + trail_layers`
//!
//! Applying an injection inserts its line directly after the layer change, so
//! injections sharing a layer end up in reverse plan order. [`CorrectionPlan::apply`]
//! reproduces that in a single pass and matches [`CorrectionPlan::apply_sequential`]
//! line for line.

use crate::analysis::FileMetadata;
use crate::config::CorrectionConfig;
use crate::gcode::{inject_command, is_layer_boundary, CorrectionCommand};
use log::{debug, warn};
use std::collections::BTreeMap;

/// One planned insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Injection {
    /// Zero-based index of the layer change the line goes after.
    pub layer: usize,
    pub command: CorrectionCommand,
}

impl Injection {
    pub fn new(layer: usize, command: CorrectionCommand) -> Self {
        Self { layer, command }
    }

    /// The G-code line this injection inserts.
    pub fn to_gcode(&self) -> String {
        self.command.to_gcode(self.layer)
    }
}

/// An ordered list of injections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorrectionPlan {
    injections: Vec<Injection>,
}

impl CorrectionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan the corrective commands for `flagged` layers.
    ///
    /// Targets that would fall below the first layer change, or past the
    /// addressable range, are dropped. The boosted temperature saturates.
    pub fn for_flagged_layers(
        flagged: &[usize],
        metadata: &FileMetadata,
        config: &CorrectionConfig,
    ) -> Self {
        if !flagged.is_empty() && metadata.nozzle_temperature == 0 {
            warn!("No nozzle temperature found in file, corrections will use 0°C as the default");
        }

        let boosted = metadata
            .nozzle_temperature
            .saturating_add(config.temperature_boost);
        let mut plan = Self::new();

        for &layer in flagged {
            match layer.checked_sub(config.lead_layers) {
                Some(before) => {
                    plan.push(Injection::new(
                        before,
                        CorrectionCommand::FanSpeed {
                            percent: config.fan_percent,
                        },
                    ));
                    plan.push(Injection::new(
                        before,
                        CorrectionCommand::Temperature { celsius: boosted },
                    ));
                }
                None => debug!("Layer {} too low for a lead-in correction", layer),
            }

            match layer.checked_add(config.trail_layers) {
                Some(after) => {
                    plan.push(Injection::new(
                        after,
                        CorrectionCommand::FanSpeed {
                            percent: metadata.fan_max_speed,
                        },
                    ));
                    plan.push(Injection::new(
                        after,
                        CorrectionCommand::Temperature {
                            celsius: metadata.nozzle_temperature,
                        },
                    ));
                }
                None => debug!("Layer {} too high for a trailing correction", layer),
            }
        }

        plan
    }

    pub fn push(&mut self, injection: Injection) {
        self.injections.push(injection);
    }

    pub fn injections(&self) -> &[Injection] {
        &self.injections
    }

    pub fn len(&self) -> usize {
        self.injections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.injections.is_empty()
    }

    /// Apply every injection with its own rescan of the lines.
    pub fn apply_sequential<S: AsRef<str>>(&self, lines: &[S]) -> Vec<String> {
        let mut current: Vec<String> = lines.iter().map(|l| l.as_ref().to_string()).collect();
        for injection in &self.injections {
            current = inject_command(&current, injection.layer, injection.command);
        }
        current
    }

    /// Apply every injection in one pass.
    pub fn apply<S: AsRef<str>>(&self, lines: &[S]) -> Vec<String> {
        let mut by_layer: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for injection in &self.injections {
            by_layer
                .entry(injection.layer)
                .or_default()
                .push(injection.to_gcode());
        }

        let mut out = Vec::with_capacity(lines.len() + self.injections.len());
        let mut boundaries_seen = 0usize;

        for line in lines {
            let line = line.as_ref();
            out.push(line.to_string());
            if is_layer_boundary(line) {
                if let Some(inserted) = by_layer.remove(&boundaries_seen) {
                    out.extend(inserted.into_iter().rev());
                }
                boundaries_seen += 1;
            }
        }

        for layer in by_layer.keys() {
            debug!("Layer {} not present, injection skipped", layer);
        }

        out
    }
}
