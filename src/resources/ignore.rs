//! The project's `.gitignore`, kept in sync with placed modules.
use anyhow::{Context as _, Result};
use std::collections::HashSet;
use std::io::Write as _;
use std::path::{Path, PathBuf};

/// Default ignore file name.
pub const IGNORE_FILE: &str = ".gitignore";

/// Entries of an ignore file, read once and appended to as modules are
/// placed.  Existing content is never rewritten.
#[derive(Debug)]
pub struct IgnoreList {
    path: PathBuf,
    entries: HashSet<String>,
}

impl IgnoreList {
    /// Read the ignore file at `path`; a missing file is an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn load(path: &Path) -> Result<Self> {
        let entries = if path.is_file() {
            std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?
                .split('\n')
                .map(|line| line.trim_end_matches('\r').to_string())
                .collect()
        } else {
            HashSet::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    /// `true` if `entry` is already listed.
    #[must_use]
    pub fn contains(&self, entry: &str) -> bool {
        self.entries.contains(entry)
    }

    /// Append `entry` on a new line unless it is already listed.
    ///
    /// Returns `true` if the file was changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the ignore file cannot be opened or written.
    pub fn track(&mut self, entry: &str) -> Result<bool> {
        if self.contains(entry) {
            return Ok(false);
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening {}", self.path.display()))?;
        write!(file, "\n{entry}").with_context(|| format!("writing {}", self.path.display()))?;
        self.entries.insert(entry.to_string());
        Ok(true)
    }
}
