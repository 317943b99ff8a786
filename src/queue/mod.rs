//! Batch queue submission.
//!
//! `JobSubmitter` is the seam between the sequencer and the cluster. The real
//! implementation shells out to `fsl_sub`; `RecordingSubmitter` keeps requests in
//! memory for dry runs and tests.

pub mod fsl_sub;
pub mod recording;

use async_trait::async_trait;
use std::path::PathBuf;

use crate::errors::SubmitError;
use crate::job::JobToken;

pub use fsl_sub::FslSubSubmitter;
pub use recording::RecordingSubmitter;

/// Everything the queue needs to run one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    /// Fully rendered shell command
    pub command: String,
    /// Job display name
    pub name: String,
    /// Directory for the queue's stdout/stderr files
    pub log_dir: PathBuf,
    /// Jobs that must finish first
    pub hold: JobToken,
    /// Target queue
    pub queue: String,
}

/// Hands jobs to an external queue and returns the queue's token.
///
/// Implementations must not wait for the job itself to run.
#[async_trait]
pub trait JobSubmitter: Send + Sync {
    async fn submit(&self, request: &JobRequest) -> Result<JobToken, SubmitError>;
}
