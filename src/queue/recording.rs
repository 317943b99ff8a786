//! In-memory submitter used by `--dry-run` and the tests.

use async_trait::async_trait;
use console::style;
use std::sync::{Mutex, PoisonError};
use std::sync::atomic::{AtomicU64, Ordering};

use super::{JobRequest, JobSubmitter};
use crate::errors::SubmitError;
use crate::job::JobToken;

/// Records every request and answers with sequential ids starting at 1.
#[derive(Default)]
pub struct RecordingSubmitter {
    requests: Mutex<Vec<JobRequest>>,
    next_id: AtomicU64,
    echo: bool,
}

impl RecordingSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also print each request to stdout as it arrives.
    pub fn echoing() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    /// Requests received so far, in submission order.
    pub fn requests(&self) -> Vec<JobRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Job names received so far, in submission order.
    pub fn names(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.name).collect()
    }
}

#[async_trait]
impl JobSubmitter for RecordingSubmitter {
    async fn submit(&self, request: &JobRequest) -> Result<JobToken, SubmitError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let token = JobToken::new(id.to_string());

        if self.echo {
            let hold = if request.hold.is_none() {
                String::new()
            } else {
                format!(" (after {})", request.hold)
            };
            println!(
                "{} {}{}",
                style(format!("[{}]", token)).cyan(),
                style(&request.name).bold(),
                style(hold).dim()
            );
            println!("    {}", request.command);
        }

        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request.clone());
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn request(name: &str) -> JobRequest {
        JobRequest {
            command: format!("run {}", name),
            name: name.to_string(),
            log_dir: PathBuf::from("logs"),
            hold: JobToken::none(),
            queue: "standard".into(),
        }
    }

    #[tokio::test]
    async fn test_sequential_tokens() {
        let sub = RecordingSubmitter::new();
        assert_eq!(sub.submit(&request("a")).await.unwrap().as_str(), "1");
        assert_eq!(sub.submit(&request("b")).await.unwrap().as_str(), "2");
        assert_eq!(sub.names(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_records_full_request() {
        let sub = RecordingSubmitter::new();
        let mut req = request("a");
        req.hold = JobToken::new("9");
        sub.submit(&req).await.unwrap();
        assert_eq!(sub.requests(), vec![req]);
    }

    #[tokio::test]
    async fn test_poisoned_lock_keeps_recording() {
        let sub = RecordingSubmitter::new();
        sub.submit(&request("a")).await.unwrap();

        let poison = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _held = sub.requests.lock().unwrap();
            panic!("poison the request log");
        }));
        assert!(poison.is_err());
        assert!(sub.requests.is_poisoned());

        assert_eq!(sub.submit(&request("b")).await.unwrap().as_str(), "2");
        assert_eq!(sub.names(), vec!["a", "b"]);
    }
}
