//! Per-subject file configuration.
//!
//! The file manager writes `logs/file_descriptor.json`, a JSON object mapping a
//! modality name (`rfMRI`, `tfMRI`, `AP`, `PA`, ...) to the input file for that
//! modality, relative to the subject directory. Missing modalities are stored as an
//! empty string. Some modalities carry several files and are stored as a list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tracing::warn;

use crate::errors::DescriptorError;

/// Resting-state functional data.
pub const RFMRI: &str = "rfMRI";
/// Task functional data.
pub const TFMRI: &str = "tfMRI";
/// Field-map acquired anterior→posterior.
pub const FIELDMAP_AP: &str = "AP";
/// Field-map acquired posterior→anterior.
pub const FIELDMAP_PA: &str = "PA";

/// One descriptor value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModalityFiles {
    Single(String),
    Many(Vec<String>),
}

impl ModalityFiles {
    pub fn is_present(&self) -> bool {
        match self {
            ModalityFiles::Single(path) => !path.is_empty(),
            ModalityFiles::Many(paths) => paths.iter().any(|p| !p.is_empty()),
        }
    }

    pub fn paths(&self) -> Vec<&str> {
        match self {
            ModalityFiles::Single(path) if path.is_empty() => Vec::new(),
            ModalityFiles::Single(path) => vec![path.as_str()],
            ModalityFiles::Many(paths) => paths
                .iter()
                .filter(|p| !p.is_empty())
                .map(String::as_str)
                .collect(),
        }
    }

    fn blank(&self) -> Self {
        match self {
            ModalityFiles::Single(_) => ModalityFiles::Single(String::new()),
            ModalityFiles::Many(_) => ModalityFiles::Many(Vec::new()),
        }
    }
}

/// Modality → files mapping for one subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileConfiguration {
    entries: BTreeMap<String, ModalityFiles>,
}

impl FileConfiguration {
    /// Load the descriptor written by the file manager.
    pub fn load(path: &Path) -> Result<Self, DescriptorError> {
        let content = std::fs::read_to_string(path).map_err(|source| DescriptorError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| DescriptorError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// True when the modality key exists and names at least one file.
    pub fn has(&self, modality: &str) -> bool {
        self.entries
            .get(modality)
            .is_some_and(ModalityFiles::is_present)
    }

    pub fn get(&self, modality: &str) -> Option<&ModalityFiles> {
        self.entries.get(modality)
    }

    /// Field-map correction needs both phase-encoding directions.
    pub fn has_top_up(&self) -> bool {
        self.has(FIELDMAP_AP) && self.has(FIELDMAP_PA)
    }

    /// Basic QC: blank every modality whose files are not all present on disk.
    ///
    /// Paths are resolved against `subject_dir`. Returns the pruned configuration
    /// together with the modalities that were blanked.
    pub fn prune_missing(&self, subject_dir: &Path) -> (Self, Vec<String>) {
        let mut pruned = Vec::new();
        let entries = self
            .entries
            .iter()
            .map(|(modality, files)| {
                let missing = files
                    .paths()
                    .into_iter()
                    .find(|p| !subject_dir.join(p).exists());
                match missing {
                    Some(path) => {
                        warn!(modality = %modality, file = %path, "Input file missing; modality disabled");
                        pruned.push(modality.clone());
                        (modality.clone(), files.blank())
                    }
                    None => (modality.clone(), files.clone()),
                }
            })
            .collect();
        (Self { entries }, pruned)
    }
}

impl fmt::Display for FileConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => f.write_str("{}"),
        }
    }
}
