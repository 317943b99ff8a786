use anyhow::{Context, Result};
use tracing::info;

use crate::job::JobToken;
use crate::pipeline_config::PipelineToml;
use crate::queue::{JobRequest, JobSubmitter};
use crate::stage::{Stage, TemplateVars};
use crate::subject::Subject;

/// Submits individual stages for one subject.
///
/// Each call renders the stage command, hands it to the submitter with the
/// dependency token, and logs before and after. The submitted job itself is never
/// waited on.
pub struct StageRunner<'a> {
    subject: &'a Subject,
    settings: &'a PipelineToml,
    submitter: &'a dyn JobSubmitter,
    vars: TemplateVars,
}

impl<'a> StageRunner<'a> {
    pub fn new(
        subject: &'a Subject,
        settings: &'a PipelineToml,
        submitter: &'a dyn JobSubmitter,
    ) -> Self {
        Self {
            subject,
            settings,
            submitter,
            vars: TemplateVars::for_subject(subject),
        }
    }

    /// Replace the template variables used for rendering.
    pub fn with_vars(mut self, vars: TemplateVars) -> Self {
        self.vars = vars;
        self
    }

    /// Build the queue request for a stage without submitting it.
    pub fn request(&self, stage: &Stage, hold: &JobToken) -> JobRequest {
        JobRequest {
            command: stage.render(&self.vars),
            name: stage.job_name(self.subject),
            log_dir: self.subject.log_dir(),
            hold: hold.clone(),
            queue: stage
                .queue
                .clone()
                .unwrap_or_else(|| self.settings.queue.queue.clone()),
        }
    }

    /// Submit the stage identified by `key`, waiting on `hold`.
    pub async fn run(&self, key: &str, hold: &JobToken) -> Result<JobToken> {
        let stage = self
            .settings
            .stage(key)
            .with_context(|| format!("Unknown stage '{}'", key))?;
        let request = self.request(&stage, hold);

        info!("Running {}...", stage.label);
        let token = self
            .submitter
            .submit(&request)
            .await
            .with_context(|| format!("Failed to submit {}", stage.label))?;
        info!(job = %request.name, token = %token, hold = %hold, "{} submitted", stage.label);

        Ok(token)
    }

    /// Submit stages in order, each waiting on the previous one.
    ///
    /// The first stage waits on `hold`. Returns the token of the last stage, or `hold`
    /// itself when `keys` is empty.
    pub async fn run_chain(&self, keys: &[&str], hold: &JobToken) -> Result<JobToken> {
        let mut previous = hold.clone();
        for key in keys {
            previous = self.run(key, &previous).await?;
        }
        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::RecordingSubmitter;
    use crate::stage::keys;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_run_builds_request() {
        let dir = tempdir().unwrap();
        let subject = Subject::resolve(dir.path().to_str().unwrap()).unwrap();
        let settings = PipelineToml::parse("[stages.fix]\nqueue = \"long\"\n").unwrap();
        let submitter = RecordingSubmitter::new();
        let runner = StageRunner::new(&subject, &settings, &submitter);

        let token = runner.run(keys::FIX, &JobToken::new("41")).await.unwrap();
        assert_eq!(token.as_str(), "1");

        let requests = submitter.requests();
        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert_eq!(req.name, format!("bb_fix_{}", subject.subname()));
        assert_eq!(req.hold.as_str(), "41");
        assert_eq!(req.queue, "long");
        assert_eq!(req.log_dir, subject.log_dir());
        assert!(req.command.ends_with(&format!("bb_fix {}", subject.path())));
    }

    #[tokio::test]
    async fn test_run_uses_default_queue() {
        let dir = tempdir().unwrap();
        let subject = Subject::resolve(dir.path().to_str().unwrap()).unwrap();
        let settings = PipelineToml::default();
        let submitter = RecordingSubmitter::new();
        let runner = StageRunner::new(&subject, &settings, &submitter);

        runner.run(keys::FC, &JobToken::none()).await.unwrap();
        assert_eq!(submitter.requests()[0].queue, "${QUEUE_STANDARD}");
    }

    #[tokio::test]
    async fn test_run_unknown_stage() {
        let dir = tempdir().unwrap();
        let subject = Subject::resolve(dir.path().to_str().unwrap()).unwrap();
        let settings = PipelineToml::default();
        let submitter = RecordingSubmitter::new();
        let runner = StageRunner::new(&subject, &settings, &submitter);

        let err = runner.run("dual_regression", &JobToken::none()).await.unwrap_err();
        assert!(err.to_string().contains("Unknown stage"));
        assert!(submitter.requests().is_empty());
    }

    #[tokio::test]
    async fn test_run_chain_threads_tokens() {
        let dir = tempdir().unwrap();
        let subject = Subject::resolve(dir.path().to_str().unwrap()).unwrap();
        let settings = PipelineToml::default();
        let submitter = RecordingSubmitter::new();
        let runner = StageRunner::new(&subject, &settings, &submitter);

        let last = runner
            .run_chain(&[keys::PREPARE_TFMRI, keys::FEAT_TFMRI], &JobToken::new("7"))
            .await
            .unwrap();
        assert_eq!(last.as_str(), "2");

        let holds: Vec<_> = submitter
            .requests()
            .into_iter()
            .map(|r| r.hold.to_string())
            .collect();
        assert_eq!(holds, vec!["7", "1"]);

        let empty = runner.run_chain(&[], &JobToken::new("9")).await.unwrap();
        assert_eq!(empty.as_str(), "9");
    }
}
