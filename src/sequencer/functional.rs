//! Functional pipeline: structural post-processing, then the resting-state and
//! task-functional branches when their data is present.

use anyhow::Result;
use tracing::{info, warn};

use super::StageRunner;
use crate::files::{FileConfiguration, RFMRI, TFMRI};
use crate::job::JobToken;
use crate::stage::keys;

/// Resting-state branch, in submission order.
pub const RFMRI_STAGES: [&str; 5] = [
    keys::PREPARE_RFMRI,
    keys::FEAT_RFMRI,
    keys::FIX,
    keys::FC,
    keys::CLEAN_RFMRI,
];

/// Task-functional branch, in submission order.
pub const TFMRI_STAGES: [&str; 2] = [keys::PREPARE_TFMRI, keys::FEAT_TFMRI];

/// Submit the functional pipeline and return the jobs later stages must wait for.
///
/// `bb_postprocess_struct` always runs and waits on `hold`. Each branch starts after
/// it and chains its own stages. The result is the resting-state cleanup token and
/// the task FEAT token, comma-joined in that order, or `-1` when neither ran.
pub async fn run_functional(
    runner: &StageRunner<'_>,
    files: &FileConfiguration,
    hold: &JobToken,
) -> Result<JobToken> {
    info!("Beginning functional pipeline");

    let postprocess = runner.run(keys::POSTPROCESS_STRUCT, hold).await?;

    let resting = if files.has(RFMRI) {
        info!("rfMRI files found. Running rfMRI subpipe");
        let token = runner.run_chain(&RFMRI_STAGES, &postprocess).await?;
        info!("rfMRI subpipe complete.");
        token
    } else {
        warn!("There is no rfMRI info. Thus, the Resting State part will not be run");
        JobToken::none()
    };

    let task = if files.has(TFMRI) {
        info!("tfMRI files found. Running tfMRI subpipe");
        let token = runner.run_chain(&TFMRI_STAGES, &postprocess).await?;
        info!("tfMRI subpipe complete.");
        token
    } else {
        warn!("There is no tfMRI info. Thus, the Task Functional part will not be run");
        JobToken::none()
    };

    let jobs = resting.merge(&task);
    info!(jobs = %jobs, "Functional pipeline complete.");
    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline_config::PipelineToml;
    use crate::queue::RecordingSubmitter;
    use crate::subject::Subject;
    use tempfile::{TempDir, tempdir};

    fn files(json: &str) -> FileConfiguration {
        serde_json::from_str(json).unwrap()
    }

    fn subject() -> (Subject, TempDir) {
        let dir = tempdir().unwrap();
        let subject = Subject::resolve(dir.path().to_str().unwrap()).unwrap();
        (subject, dir)
    }

    fn prefixes(submitter: &RecordingSubmitter, subject: &Subject) -> Vec<String> {
        let suffix = format!("_{}", subject.subname());
        submitter
            .names()
            .into_iter()
            .map(|n| n.strip_suffix(&suffix).unwrap_or(&n).to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_both_branches_join_in_order() {
        let (subject, _dir) = subject();
        let settings = PipelineToml::default();
        let submitter = RecordingSubmitter::new();
        let runner = StageRunner::new(&subject, &settings, &submitter);

        let jobs = run_functional(
            &runner,
            &files(r#"{"rfMRI": "fMRI/rfMRI.nii.gz", "tfMRI": "fMRI/tfMRI.nii.gz"}"#),
            &JobToken::none(),
        )
        .await
        .unwrap();

        // postprocess=1, rfMRI=2..6, tfMRI=7..8
        assert_eq!(jobs.as_str(), "6,8");
        assert_eq!(
            prefixes(&submitter, &subject),
            vec![
                "bb_postprocess_struct",
                "bb_prepare_rfMRI",
                "bb_feat_rfMRI_ns",
                "bb_fix",
                "tvb_FC",
                "bb_rfMRI_clean",
                "bb_prepare_tfMRI",
                "bb_feat_tfMRI",
            ]
        );
    }

    #[tokio::test]
    async fn test_neither_branch_returns_sentinel() {
        let (subject, _dir) = subject();
        let settings = PipelineToml::default();
        let submitter = RecordingSubmitter::new();
        let runner = StageRunner::new(&subject, &settings, &submitter);

        let jobs = run_functional(&runner, &files(r#"{"rfMRI": "", "AP": "x"}"#), &JobToken::none())
            .await
            .unwrap();

        assert_eq!(jobs.as_str(), "-1");
        assert_eq!(prefixes(&submitter, &subject), vec!["bb_postprocess_struct"]);
    }

    #[tokio::test]
    async fn test_task_only_has_no_leading_comma() {
        let (subject, _dir) = subject();
        let settings = PipelineToml::default();
        let submitter = RecordingSubmitter::new();
        let runner = StageRunner::new(&subject, &settings, &submitter);

        let jobs = run_functional(&runner, &files(r#"{"tfMRI": "fMRI/tfMRI.nii.gz"}"#), &JobToken::none())
            .await
            .unwrap();

        assert_eq!(jobs.as_str(), "3");
        assert_eq!(
            prefixes(&submitter, &subject),
            vec!["bb_postprocess_struct", "bb_prepare_tfMRI", "bb_feat_tfMRI"]
        );
    }

    #[tokio::test]
    async fn test_rest_only_returns_cleanup_token() {
        let (subject, _dir) = subject();
        let settings = PipelineToml::default();
        let submitter = RecordingSubmitter::new();
        let runner = StageRunner::new(&subject, &settings, &submitter);

        let jobs = run_functional(&runner, &files(r#"{"rfMRI": "fMRI/rfMRI.nii.gz", "tfMRI": ""}"#), &JobToken::none())
            .await
            .unwrap();

        assert_eq!(jobs.as_str(), "6");
        assert_eq!(submitter.names().len(), 6);
    }

    #[tokio::test]
    async fn test_dependencies_are_threaded() {
        let (subject, _dir) = subject();
        let settings = PipelineToml::default();
        let submitter = RecordingSubmitter::new();
        let runner = StageRunner::new(&subject, &settings, &submitter);

        run_functional(
            &runner,
            &files(r#"{"rfMRI": "r", "tfMRI": "t"}"#),
            &JobToken::new("100"),
        )
        .await
        .unwrap();

        let holds: Vec<String> = submitter
            .requests()
            .iter()
            .map(|r| r.hold.to_string())
            .collect();
        // postprocess waits on the caller, each branch starts after postprocess (1)
        assert_eq!(holds, vec!["100", "1", "2", "3", "4", "5", "1", "7"]);
    }

    #[tokio::test]
    async fn test_feat_commands_point_at_design_files() {
        let (subject, _dir) = subject();
        let settings = PipelineToml::default();
        let submitter = RecordingSubmitter::new();
        let runner = StageRunner::new(&subject, &settings, &submitter);

        run_functional(&runner, &files(r#"{"rfMRI": "r", "tfMRI": "t"}"#), &JobToken::none())
            .await
            .unwrap();

        let requests = submitter.requests();
        let base = subject.base_dir().display().to_string();
        assert_eq!(
            requests[2].command,
            format!("feat {}/fMRI/rfMRI.fsf {}", base, subject.path())
        );
        assert_eq!(requests[7].command, format!("feat {}/fMRI/tfMRI.fsf", base));
    }
}
