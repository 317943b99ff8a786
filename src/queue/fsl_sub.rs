//! `fsl_sub` submitter.
//!
//! Builds `<submit_cmd> -q <queue> -N "<name>" -l "<log_dir>" [-j <hold>] <command>`
//! and runs it through `sh -c` so `$BB_BIN_DIR`, `${FSLDIR}` and friends are expanded
//! by the shell. The queue prints the job id on stdout; the last non-empty line is
//! taken as the token. The exit status is not inspected.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

use super::{JobRequest, JobSubmitter};
use crate::errors::SubmitError;
use crate::job::JobToken;

pub struct FslSubSubmitter {
    submit_cmd: String,
    working_dir: Option<PathBuf>,
}

impl FslSubSubmitter {
    pub fn new(submit_cmd: impl Into<String>) -> Self {
        Self {
            submit_cmd: submit_cmd.into(),
            working_dir: None,
        }
    }

    /// Run submissions from `dir` instead of the current directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Full shell line for a request.
    pub fn command_line(&self, request: &JobRequest) -> String {
        let mut line = format!(
            "{} -q {} -N \"{}\" -l \"{}\"",
            self.submit_cmd,
            request.queue,
            request.name,
            request.log_dir.display()
        );
        if !request.hold.is_none() {
            line.push_str(" -j ");
            line.push_str(request.hold.as_str());
        }
        line.push(' ');
        line.push_str(&request.command);
        line
    }
}

/// Last non-empty stdout line, or the sentinel when the queue printed nothing.
fn parse_token(stdout: &str) -> JobToken {
    stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(JobToken::new)
        .unwrap_or_default()
}

#[async_trait]
impl JobSubmitter for FslSubSubmitter {
    async fn submit(&self, request: &JobRequest) -> Result<JobToken, SubmitError> {
        let line = self.command_line(request);
        debug!(job = %request.name, command = %line, "Submitting");

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        let output = cmd
            .output()
            .await
            .map_err(|source| SubmitError::SpawnFailed {
                name: request.name.clone(),
                source,
            })?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!(job = %request.name, stderr = %stderr.trim(), "Submission stderr");
        }

        Ok(parse_token(&String::from_utf8_lossy(&output.stdout)))
    }
}
