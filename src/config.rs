use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::pipeline_config::PipelineToml;
use crate::queue::{FslSubSubmitter, JobSubmitter, RecordingSubmitter};
use crate::subject::Subject;

/// Runtime configuration for one subject run.
///
/// Bridges the parsed `bbflow.toml` with the command line: the subject being
/// processed, where its logs go, and which submitter to use.
#[derive(Debug, Clone)]
pub struct Config {
    pub subject: Subject,
    pub settings: PipelineToml,
    /// File the settings came from, if any
    pub config_file: Option<PathBuf>,
    pub log_dir: PathBuf,
    pub dry_run: bool,
}

impl Config {
    /// Resolve the subject and load settings.
    ///
    /// Fails before anything is submitted when the subject directory is missing or the
    /// configuration file cannot be parsed.
    pub fn new(
        subject: &str,
        config_file: Option<&Path>,
        dry_run: bool,
    ) -> Result<Self> {
        let subject = Subject::resolve(subject)?;
        let (settings, config_file) = PipelineToml::load_or_default(config_file)?;
        let log_dir = subject.log_dir();

        Ok(Self {
            subject,
            settings,
            config_file,
            log_dir,
            dry_run,
        })
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.log_dir).context("Failed to create log directory")?;
        Ok(())
    }

    /// `fsl_sub` for real runs, an echoing recorder for dry runs.
    pub fn submitter(&self) -> Box<dyn JobSubmitter> {
        if self.dry_run {
            Box::new(RecordingSubmitter::echoing())
        } else {
            Box::new(FslSubSubmitter::new(self.settings.submit_cmd()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_config_new_resolves_subject() {
        let dir = tempdir().unwrap();
        let subject_dir = dir.path().join("sub-01");
        fs::create_dir(&subject_dir).unwrap();
        let cfg_file = dir.path().join("bbflow.toml");
        fs::write(&cfg_file, "[queue]\nqueue = \"short\"\n").unwrap();

        let config = Config::new(
            subject_dir.to_str().unwrap(),
            Some(&cfg_file),
            false,
        )
        .unwrap();
        assert!(!config.dry_run);
        assert_eq!(config.settings.queue.queue, "short");
        assert_eq!(config.config_file.as_deref(), Some(cfg_file.as_path()));
        assert_eq!(
            config.log_dir,
            subject_dir.canonicalize().unwrap().join("logs")
        );
    }

    #[test]
    fn test_config_new_missing_subject() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing");
        let result = Config::new(missing.to_str().unwrap(), None, false);
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("is not a valid directory")
        );
    }

    #[test]
    fn test_ensure_directories() {
        let dir = tempdir().unwrap();
        let cfg_file = dir.path().join("bbflow.toml");
        fs::write(&cfg_file, "").unwrap();
        let config = Config::new(dir.path().to_str().unwrap(), Some(&cfg_file), true).unwrap();
        config.ensure_directories().unwrap();
        assert!(config.log_dir.exists());
    }
}
