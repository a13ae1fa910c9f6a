//! Whole-file G-code line sequences.

use crate::{Error, Result};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// An ordered sequence of G-code lines as read from a file.
///
/// The sequence is never edited in place; transformations produce new
/// sequences which are wrapped again with [`GCodeProgram::from_lines`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GCodeProgram {
    lines: Vec<String>,
}

impl GCodeProgram {
    pub fn from_lines(lines: Vec<String>) -> Self {
        Self { lines }
    }

    /// Split text into lines. `\r\n` endings are accepted.
    pub fn from_string(content: &str) -> Self {
        Self {
            lines: content.lines().map(str::to_string).collect(),
        }
    }

    /// Read a whole file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::from_string(&content))
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Render the program, one line per `\n`, with a trailing newline.
    pub fn content(&self) -> String {
        let mut out = String::with_capacity(self.lines.iter().map(|l| l.len() + 1).sum());
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Write the program to `path`.
    ///
    /// The content goes to a temporary file in the destination directory first
    /// and is renamed over `path` once fully flushed, so `path` never holds a
    /// partial write.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let write_err = |source| Error::Write {
            path: path.to_path_buf(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        tmp.write_all(self.content().as_bytes()).map_err(write_err)?;
        tmp.as_file().sync_all().map_err(write_err)?;
        tmp.persist(path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}
