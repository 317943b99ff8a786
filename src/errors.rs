//! Typed error hierarchy for bbflow.
//!
//! One enum per failure domain:
//! - `SubjectError`: resolving the subject directory
//! - `DescriptorError`: loading the per-subject file configuration
//! - `ConfigError`: pipeline configuration and run-mode selection
//! - `SubmitError`: handing a command to the batch queue

use std::path::PathBuf;
use thiserror::Error;

/// Errors from resolving a subject on the command line.
#[derive(Debug, Error)]
pub enum SubjectError {
    #[error("Subject path is empty")]
    Empty,

    #[error("{path} is not a valid directory")]
    NotADirectory { path: PathBuf },

    #[error("Failed to resolve subject directory {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from loading `logs/file_descriptor.json`.
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("{path} could not be loaded: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a valid file descriptor: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error(
        "Invalid reparcellation argument '{0}'. Check environment variable \"REPARCELLATE\" (expected true or false)"
    )]
    InvalidReparcellate(String),
}

/// Errors from handing a job to the queue.
///
/// Only failures to launch the submission are reported; whether the queue
/// accepted or ran the job is never observed.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("Failed to spawn submission for job {name}: {source}")]
    SpawnFailed {
        name: String,
        #[source]
        source: std::io::Error,
    },
}
