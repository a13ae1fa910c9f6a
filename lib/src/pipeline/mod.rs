//! Pipeline module - orchestrates processing of whole files.
//!
//! read → analyze → plan corrections → apply → write
//!
//! Each file is handled start to finish before the next one and nothing is
//! shared between files. Output is written only after the whole in-memory
//! rewrite succeeded, through [`GCodeProgram::write_to_file`], which never
//! leaves a partial file behind.
//!
//! # Example
//!
//! ```rust,ignore
//! use layerfix::pipeline::{CorrectionPipeline, OutputMode};
//! use layerfix::ProcessConfig;
//!
//! let pipeline = CorrectionPipeline::new(ProcessConfig::default());
//! let outcome = pipeline.process_file("benchy.gcode", OutputMode::Modified)?;
//! println!("{:?} -> {}", outcome.report.flagged_layers, outcome.output.display());
//! ```

use crate::analysis::{analyze, count_layers, AnalysisReport};
use crate::config::ProcessConfig;
use crate::correction::{CorrectionPlan, Injection};
use crate::gcode::GCodeProgram;
use crate::{Error, Result};
use log::{error, info};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extension of the files the pipeline picks up.
pub const GCODE_EXTENSION: &str = ".gcode";

/// Replacement for [`GCODE_EXTENSION`] in output file names.
pub const MODIFIED_SUFFIX: &str = "_modified.gcode";

/// Where processed output goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// `part.gcode` → `part_modified.gcode`
    #[default]
    Modified,
    /// Replace the input file.
    Overwrite,
}

/// Output path for `input` under `mode`.
///
/// The first `.gcode` in the file name becomes `_modified.gcode`; a name
/// without it gets `_modified.gcode` appended.
pub fn output_path_for(input: &Path, mode: OutputMode) -> PathBuf {
    if mode == OutputMode::Overwrite {
        return input.to_path_buf();
    }

    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let renamed = if name.contains(GCODE_EXTENSION) {
        name.replacen(GCODE_EXTENSION, MODIFIED_SUFFIX, 1)
    } else {
        format!("{}{}", name, MODIFIED_SUFFIX)
    };
    input.with_file_name(renamed)
}

/// Whether the directory scan should pick up `path`.
pub fn is_processable(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.ends_with(GCODE_EXTENSION) && !n.ends_with(MODIFIED_SUFFIX))
        .unwrap_or(false)
}

/// Every processable G-code file under `dir`, recursively, in file name order.
pub fn find_gcode_files<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(Error::InvalidPath(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        if entry.file_type().is_file() && is_processable(entry.path()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Result of processing one in-memory program.
#[derive(Debug, Clone)]
pub struct ProcessedGCode {
    pub program: GCodeProgram,
    pub report: AnalysisReport,
    pub plan: CorrectionPlan,
}

/// Result of processing one file on disk.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub input: PathBuf,
    pub output: PathBuf,
    pub report: AnalysisReport,
    pub injections: usize,
}

/// Result of processing a directory.
#[derive(Debug, Default)]
pub struct DirectoryOutcome {
    pub processed: Vec<FileOutcome>,
    pub failures: Vec<(PathBuf, Error)>,
}

impl DirectoryOutcome {
    pub fn file_count(&self) -> usize {
        self.processed.len() + self.failures.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Detects problematic layers and writes corrected files.
#[derive(Debug, Clone, Default)]
pub struct CorrectionPipeline {
    config: ProcessConfig,
}

impl CorrectionPipeline {
    pub fn new(config: ProcessConfig) -> Self {
        Self { config }
    }

    /// Analyze a program and apply the planned corrections.
    pub fn process(&self, program: &GCodeProgram) -> ProcessedGCode {
        let lines = program.lines();
        let report = analyze(lines, &self.config.analysis);
        let plan = CorrectionPlan::for_flagged_layers(
            &report.flagged_layers,
            &report.metadata,
            &self.config.correction,
        );
        let program = GCodeProgram::from_lines(plan.apply(lines));

        ProcessedGCode {
            program,
            report,
            plan,
        }
    }

    /// Analyze a file without writing anything.
    pub fn analyze_file<P: AsRef<Path>>(&self, input: P) -> Result<AnalysisReport> {
        let input = input.as_ref();
        let program = GCodeProgram::from_file(input)?;
        Ok(analyze(program.lines(), &self.config.analysis).with_source(input))
    }

    /// Process one file and write the result.
    pub fn process_file<P: AsRef<Path>>(&self, input: P, mode: OutputMode) -> Result<FileOutcome> {
        let input = input.as_ref();
        info!("Processing '{}'", input.display());

        let program = GCodeProgram::from_file(input)?;
        info!(
            "File '{}' has {} layers",
            input.display(),
            count_layers(program.lines())
        );

        let processed = self.process(&program);
        let output = output_path_for(input, mode);
        processed.program.write_to_file(&output)?;

        let injections = processed.program.line_count() - program.line_count();
        info!(
            "Modification complete, {} lines injected, saved as {}",
            injections,
            output.display()
        );

        Ok(FileOutcome {
            input: input.to_path_buf(),
            output,
            report: processed.report.with_source(input),
            injections,
        })
    }

    /// Process every G-code file under `dir`.
    pub fn process_directory<P: AsRef<Path>>(
        &self,
        dir: P,
        mode: OutputMode,
    ) -> Result<DirectoryOutcome> {
        self.process_directory_with_callback(dir, mode, |_, _, _| {})
    }

    /// Process every G-code file under `dir`, reporting progress.
    ///
    /// The callback receives the file about to be processed, its index and
    /// the total file count. A failing file is recorded and skipped.
    pub fn process_directory_with_callback<P, F>(
        &self,
        dir: P,
        mode: OutputMode,
        mut callback: F,
    ) -> Result<DirectoryOutcome>
    where
        P: AsRef<Path>,
        F: FnMut(&Path, usize, usize),
    {
        let files = find_gcode_files(dir)?;
        let total = files.len();
        let mut outcome = DirectoryOutcome::default();

        for (index, path) in files.into_iter().enumerate() {
            callback(&path, index, total);
            match self.process_file(&path, mode) {
                Ok(result) => outcome.processed.push(result),
                Err(e) => {
                    error!("Failed to process '{}': {}", path.display(), e);
                    outcome.failures.push((path, e));
                }
            }
        }

        Ok(outcome)
    }

    /// Apply a single injection to a file, skipping analysis.
    pub fn inject_into_file<P: AsRef<Path>>(
        &self,
        input: P,
        injection: Injection,
        mode: OutputMode,
    ) -> Result<PathBuf> {
        let input = input.as_ref();
        let program = GCodeProgram::from_file(input)?;

        let mut plan = CorrectionPlan::new();
        plan.push(injection);
        let modified = GCodeProgram::from_lines(plan.apply(program.lines()));
        if modified.line_count() == program.line_count() {
            info!(
                "Layer {} not found in '{}', nothing injected",
                injection.layer,
                input.display()
            );
        }

        let output = output_path_for(input, mode);
        modified.write_to_file(&output)?;
        info!(
            "Set {} at layer {}, saved as {}",
            injection.command,
            injection.layer,
            output.display()
        );
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gcode::CorrectionCommand;
    use std::fs;

    /// 25 layers, each a closed square starting and ending at the origin.
    /// Layer 22 is a smaller square: 250mm → 100mm, a 60% drop.
    fn dip_gcode() -> String {
        let mut gcode = String::new();
        gcode.push_str("; HEADER_BLOCK_START\n");
        gcode.push_str("; nozzle_temperature = 200\n");
        gcode.push_str("; fan_max_speed = 100\n");
        gcode.push_str("G28\n");
        gcode.push_str("G1 X0 Y0 F3000\n");

        for n in 1..=25 {
            let side = if n == 22 { 25.0 } else { 62.5 };
            gcode.push_str(&format!("; layer num/total_layer_count: {}/25\n", n));
            gcode.push_str(&format!("G1 Z{:.2}\n", n as f64 * 0.2));
            gcode.push_str("; FEATURE: Outer wall\n");
            gcode.push_str("G1 X0 Y0\n");
            gcode.push_str(&format!("G1 X{} Y0 E1\n", side));
            gcode.push_str(&format!("G1 X{} Y{} E1\n", side, side));
            gcode.push_str(&format!("G1 X0 Y{} E1\n", side));
            gcode.push_str("G1 X0 Y0 E1\n");
        }
        gcode
    }

    #[test]
    fn test_output_path_for() {
        assert_eq!(
            output_path_for(Path::new("/tmp/part.gcode"), OutputMode::Modified),
            PathBuf::from("/tmp/part_modified.gcode")
        );
        assert_eq!(
            output_path_for(Path::new("part.gcode.gcode"), OutputMode::Modified),
            PathBuf::from("part_modified.gcode.gcode")
        );
        assert_eq!(
            output_path_for(Path::new("/tmp/part.gc"), OutputMode::Modified),
            PathBuf::from("/tmp/part.gc_modified.gcode")
        );
        assert_eq!(
            output_path_for(Path::new("/tmp/part.gcode"), OutputMode::Overwrite),
            PathBuf::from("/tmp/part.gcode")
        );
    }

    #[test]
    fn test_is_processable() {
        assert!(is_processable(Path::new("a/b/part.gcode")));
        assert!(!is_processable(Path::new("a/b/part_modified.gcode")));
        assert!(!is_processable(Path::new("a/b/part.3mf")));
    }

    #[test]
    fn test_end_to_end_dip() {
        let program = GCodeProgram::from_string(&dip_gcode());
        let processed = CorrectionPipeline::default().process(&program);

        assert_eq!(processed.report.layer_count(), 25);
        assert_eq!(processed.report.flagged_layers, vec![22]);
        let dip = processed
            .report
            .assessments
            .iter()
            .find(|a| a.layer == 22)
            .unwrap();
        assert!((dip.signal - 100.0).abs() < 1e-9);
        assert!((dip.previous_signal - 250.0).abs() < 1e-9);

        let out = processed.program.lines();
        assert_eq!(out.len(), program.line_count() + 4);

        // Boundary index 19 is the 20th layer change.
        let at = out
            .iter()
            .position(|l| l == "; layer num/total_layer_count: 20/25")
            .unwrap();
        assert_eq!(out[at + 1], "M104 S220 ; Set hotend temperature to 220°C at layer 19");
        assert_eq!(out[at + 2], "M106 S2 ; Set fan speed to 1% at layer 19");

        let at = out
            .iter()
            .position(|l| l == "; layer num/total_layer_count: 25/25")
            .unwrap();
        assert_eq!(out[at + 1], "M104 S200 ; Set hotend temperature to 200°C at layer 24");
        assert_eq!(out[at + 2], "M106 S255 ; Set fan speed to 100% at layer 24");
    }

    #[test]
    fn test_uniform_file_unchanged() {
        let gcode = dip_gcode().replace("X25 ", "X62.5 ").replace("Y25 ", "Y62.5 ");
        let program = GCodeProgram::from_string(&gcode);
        let processed = CorrectionPipeline::default().process(&program);
        assert!(processed.report.flagged_layers.is_empty());
        assert!(processed.plan.is_empty());
        assert_eq!(processed.program, program);
    }

    #[test]
    fn test_process_file_writes_modified_copy() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("part.gcode");
        fs::write(&input, dip_gcode()).unwrap();

        let outcome = CorrectionPipeline::default()
            .process_file(&input, OutputMode::Modified)
            .unwrap();

        assert_eq!(outcome.output, dir.path().join("part_modified.gcode"));
        assert_eq!(outcome.injections, 4);
        assert_eq!(fs::read_to_string(&input).unwrap(), dip_gcode());

        let written = fs::read_to_string(&outcome.output).unwrap();
        assert!(written.contains("M104 S220 ; Set hotend temperature to 220°C at layer 19\n"));
        assert!(written.ends_with('\n'));
    }

    #[test]
    fn test_process_file_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("part.gcode");
        fs::write(&input, dip_gcode()).unwrap();

        let outcome = CorrectionPipeline::default()
            .process_file(&input, OutputMode::Overwrite)
            .unwrap();
        assert_eq!(outcome.output, input);
        assert!(fs::read_to_string(&input).unwrap().contains("M106 S255"));
        assert!(!dir.path().join("part_modified.gcode").exists());
    }

    #[test]
    fn test_process_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = CorrectionPipeline::default()
            .process_file(dir.path().join("missing.gcode"), OutputMode::Modified)
            .unwrap_err();
        assert!(matches!(err, Error::Read { .. }));
    }

    #[test]
    fn test_process_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();

        fs::write(dir.path().join("a.gcode"), dip_gcode()).unwrap();
        fs::write(nested.join("b.gcode"), dip_gcode()).unwrap();
        fs::write(dir.path().join("old_modified.gcode"), dip_gcode()).unwrap();
        fs::write(dir.path().join("notes.txt"), "not gcode").unwrap();
        // Not valid UTF-8, so reading it fails.
        fs::write(dir.path().join("broken.gcode"), [0xff, 0xfe, 0x00]).unwrap();

        let mut seen = Vec::new();
        let outcome = CorrectionPipeline::default()
            .process_directory_with_callback(
                dir.path(),
                OutputMode::Modified,
                |path, index, total| {
                    seen.push((path.file_name().unwrap().to_os_string(), index, total));
                },
            )
            .unwrap();

        assert_eq!(outcome.file_count(), 3);
        assert_eq!(outcome.processed.len(), 2);
        assert_eq!(outcome.failures.len(), 1);
        assert!(!outcome.all_succeeded());
        assert!(outcome.failures[0].0.ends_with("broken.gcode"));
        assert_eq!(seen.len(), 3);
        assert!(seen.iter().all(|(_, _, total)| *total == 3));

        assert!(dir.path().join("a_modified.gcode").exists());
        assert!(nested.join("b_modified.gcode").exists());
        assert!(!dir.path().join("old_modified_modified.gcode").exists());
    }

    #[test]
    fn test_process_directory_rejects_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.gcode");
        fs::write(&file, "G28\n").unwrap();
        assert!(matches!(
            CorrectionPipeline::default().process_directory(&file, OutputMode::Modified),
            Err(Error::InvalidPath(_))
        ));
    }

    #[test]
    fn test_inject_into_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("part.gcode");
        fs::write(&input, dip_gcode()).unwrap();

        let pipeline = CorrectionPipeline::default();
        let output = pipeline
            .inject_into_file(
                &input,
                Injection::new(4, CorrectionCommand::Temperature { celsius: 230 }),
                OutputMode::Modified,
            )
            .unwrap();

        let written = fs::read_to_string(&output).unwrap();
        assert!(written.contains(
            "; layer num/total_layer_count: 5/25\nM104 S230 ; Set hotend temperature to 230°C at layer 4\n"
        ));

        // A layer past the end leaves the content unchanged.
        let output = pipeline
            .inject_into_file(
                &input,
                Injection::new(99, CorrectionCommand::FanSpeed { percent: 50 }),
                OutputMode::Modified,
            )
            .unwrap();
        assert_eq!(fs::read_to_string(&output).unwrap(), dip_gcode());
    }

    #[test]
    fn test_analyze_file() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("part.gcode");
        fs::write(&input, dip_gcode()).unwrap();

        let report = CorrectionPipeline::default().analyze_file(&input).unwrap();
        assert_eq!(report.flagged_layers, vec![22]);
        assert_eq!(report.source.as_deref(), Some(input.display().to_string().as_str()));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
