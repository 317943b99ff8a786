//! Whole-subject pipeline.
//!
//! ```text
//! reparcellate = true   reparcellation ──► done
//!
//! reparcellate = false  [clean] ► file manager ► basic QC ► top-up check
//!                       structural ─┬─► functional ─┐
//!                                   └─► diffusion ──┴─► IDP ─► QC
//! ```

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

use super::{StageRunner, run_functional, run_qc};
use crate::errors::ConfigError;
use crate::files::FileConfiguration;
use crate::job::JobToken;
use crate::pipeline_config::PipelineToml;
use crate::queue::JobSubmitter;
use crate::stage::{TemplateVars, keys};
use crate::subject::{LOG_DIR, Subject};

/// Entries of the subject directory that survive a clean.
pub const RETAINED_ENTRIES: [&str; 2] = ["rawdata", LOG_DIR];

/// What the `REPARCELLATE` switch selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Re-run parcellation only
    Reparcellate,
    /// Full processing from the raw data
    Full,
}

impl FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "true" => Ok(RunMode::Reparcellate),
            "false" => Ok(RunMode::Full),
            other => Err(ConfigError::InvalidReparcellate(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub mode: RunMode,
    pub parc_name: String,
    /// Remove intermediate data from previous runs before starting
    pub clean: bool,
    /// Report what a clean would remove without touching the subject directory
    pub dry_run: bool,
}

/// Submit the whole pipeline for `subject` and return the final job token.
pub async fn run_pipeline(
    subject: &Subject,
    settings: &PipelineToml,
    submitter: &dyn JobSubmitter,
    options: &PipelineOptions,
) -> Result<JobToken> {
    let vars = TemplateVars::for_subject(subject).with_parc_name(options.parc_name.clone());

    match options.mode {
        RunMode::Reparcellate => {
            let runner = StageRunner::new(subject, settings, submitter).with_vars(vars);
            let token = runner.run(keys::REPARCELLATE, &JobToken::none()).await?;
            info!("Reparcellation complete.");
            info!("Main reparcellation pipeline complete at: {}", timestamp());
            Ok(token)
        }
        RunMode::Full => {
            if options.clean {
                let removed = clean_subject_dir(subject.base_dir(), options.dry_run)?;
                if options.dry_run {
                    for path in &removed {
                        info!(path = %path.display(), "Would remove");
                    }
                } else {
                    info!(count = removed.len(), "Removed intermediate data from previous runs");
                }
            }

            info!("Running file manager...");
            let files = FileConfiguration::load(&subject.descriptor_file())?;
            info!("File configuration before QC: {}", files);

            let (files, _pruned) = files.prune_missing(subject.base_dir());
            info!("File configuration after running file manager: {}", files);

            let top_up = files.has_top_up();
            if !top_up {
                warn!("There is no proper AP/PA data. Thus, TOP UP will not be run");
                warn!("NO TOP UP");
            }

            let runner =
                StageRunner::new(subject, settings, submitter).with_vars(vars.with_top_up(top_up));

            let structural = runner.run(keys::STRUCTURAL, &JobToken::none()).await?;
            info!("Structural pipeline complete.");

            let functional = run_functional(&runner, &files, &structural).await?;
            let diffusion = runner.run(keys::DIFFUSION, &structural).await?;
            info!("Diffusion pipeline complete.");

            let idp = runner.run(keys::IDP, &functional.merge(&diffusion)).await?;
            info!("IDP complete");

            let qc = run_qc(&runner, &idp).await?;
            info!("Quality control complete.");

            info!("Main pipeline complete at: {}", timestamp());
            Ok(qc)
        }
    }
}

/// Remove everything in `dir` except [`RETAINED_ENTRIES`]. Returns what was removed.
///
/// With `dry_run` nothing is deleted; the entries that would go are returned.
pub fn clean_subject_dir(dir: &Path, dry_run: bool) -> Result<Vec<PathBuf>> {
    let mut removed = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read subject directory {}", dir.display()))?;

    for entry in entries {
        let entry = entry.context("Failed to read subject directory entry")?;
        let name = entry.file_name();
        if RETAINED_ENTRIES.iter().any(|keep| name == *keep) {
            continue;
        }
        let path = entry.path();
        if dry_run {
            removed.push(path);
            continue;
        }
        let result = if entry.file_type().is_ok_and(|t| t.is_dir()) {
            std::fs::remove_dir_all(&path)
        } else {
            std::fs::remove_file(&path)
        };
        result.with_context(|| format!("Failed to remove {}", path.display()))?;
        removed.push(path);
    }

    removed.sort();
    Ok(removed)
}

fn timestamp() -> String {
    chrono::Local::now().format("%a %b %e %H:%M:%S %Y").to_string()
}
