//! Subject context for one pipeline run.

use std::path::{Path, PathBuf};

use crate::errors::SubjectError;

/// Name of the per-subject log directory.
pub const LOG_DIR: &str = "logs";

/// The subject being processed.
///
/// `path` is kept exactly as the user supplied it (minus surrounding whitespace and a
/// single trailing `/`) because the external pipeline scripts are run from the same
/// working directory and expect that relative form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    path: String,
    base_dir: PathBuf,
}

impl Subject {
    /// Resolve a subject from its command-line form. Fails if the directory is missing.
    pub fn resolve(raw: &str) -> Result<Self, SubjectError> {
        let path = normalize(raw);
        if path.is_empty() {
            return Err(SubjectError::Empty);
        }
        let dir = Path::new(&path);
        if !dir.is_dir() {
            return Err(SubjectError::NotADirectory {
                path: dir.to_path_buf(),
            });
        }
        let base_dir = dir.canonicalize().map_err(|source| SubjectError::Resolve {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self { path, base_dir })
    }

    /// Subject path as passed to the external scripts.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Suffix used in job names: the subject path with `/` replaced by `_`.
    pub fn subname(&self) -> String {
        self.path.replace('/', "_")
    }

    /// Absolute subject directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory receiving queue logs and the run log.
    pub fn log_dir(&self) -> PathBuf {
        self.base_dir.join(LOG_DIR)
    }

    pub fn descriptor_file(&self) -> PathBuf {
        self.log_dir().join("file_descriptor.json")
    }
}

fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    trimmed.strip_suffix('/').unwrap_or(trimmed).to_string()
}
