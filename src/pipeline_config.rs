//! Pipeline configuration read from `bbflow.toml`.
//!
//! Settings are layered: file → environment → CLI. Every field has a default, so a
//! missing file is equivalent to an empty one.
//!
//! ```toml
//! [queue]
//! submit_cmd = "${FSLDIR}/bin/fsl_sub"
//! queue = "${QUEUE_STANDARD}"
//!
//! [pipeline]
//! parc_name = "aparc"
//!
//! [stages."feat_*"]
//! queue = "${QUEUE_MORE_MEM}"
//!
//! [stages.qc]
//! command = "xvfb-run -a /opt/qc/tvb_bb_QC.sh {subject}"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::errors::ConfigError;
use crate::stage::{PLACEHOLDERS, Stage, default_stages};

/// Default config file name, looked up in the current directory.
pub const CONFIG_FILE: &str = "bbflow.toml";

/// Queue submission settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Submission command; receives `-q`, `-N`, `-l`, `-j` and the stage command
    #[serde(default = "default_submit_cmd")]
    pub submit_cmd: String,
    /// Queue used when a stage has no override
    #[serde(default = "default_queue")]
    pub queue: String,
}

fn default_submit_cmd() -> String {
    "${FSLDIR}/bin/fsl_sub".to_string()
}

fn default_queue() -> String {
    "${QUEUE_STANDARD}".to_string()
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            submit_cmd: default_submit_cmd(),
            queue: default_queue(),
        }
    }
}

/// Pipeline-wide settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Parcellation name used when neither `--parc-name` nor `PARC_NAME` is set
    #[serde(default)]
    pub parc_name: Option<String>,
}

/// Per-stage override, keyed by a glob pattern over stage keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageOverride {
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub queue: Option<String>,
}

/// Parsed `bbflow.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineToml {
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub stages: BTreeMap<String, StageOverride>,
}

impl PipelineToml {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|message| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        })
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load `explicit` if given, else `./bbflow.toml` if it exists, else defaults.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }
        let local = PathBuf::from(CONFIG_FILE);
        if local.exists() {
            Ok((Self::load(&local)?, Some(local)))
        } else {
            Ok((Self::default(), None))
        }
    }

    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Submission command (env `BB_SUBMIT_CMD` → file → default).
    pub fn submit_cmd(&self) -> String {
        std::env::var("BB_SUBMIT_CMD")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.queue.submit_cmd.clone())
    }

    /// Catalog with overrides applied. Patterns are applied in order of their lowercased
    /// form, so a more specific key such as `feat_rfmri` (sorting after `feat_*`) wins
    /// whatever its case.
    pub fn stages(&self) -> Vec<Stage> {
        default_stages()
            .into_iter()
            .map(|stage| self.apply_overrides(stage))
            .collect()
    }

    /// Look up a single stage by key with overrides applied.
    pub fn stage(&self, key: &str) -> Option<Stage> {
        default_stages()
            .into_iter()
            .find(|s| s.key == key)
            .map(|s| self.apply_overrides(s))
    }

    fn apply_overrides(&self, mut stage: Stage) -> Stage {
        let mut overrides: Vec<_> = self.stages.iter().collect();
        overrides.sort_by_key(|(pattern, _)| pattern.to_lowercase());

        for (pattern, over) in overrides {
            if pattern_matches(pattern, &stage.key) {
                if let Some(ref command) = over.command {
                    stage.command = command.clone();
                }
                if let Some(ref queue) = over.queue {
                    stage.queue = Some(queue.clone());
                }
            }
        }
        stage
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.submit_cmd().trim().is_empty() {
            warnings.push("queue.submit_cmd is empty".to_string());
        }

        let known = default_stages();
        for (pattern, over) in &self.stages {
            if !known.iter().any(|s| pattern_matches(pattern, &s.key)) {
                warnings.push(format!("Stage override '{}' matches no known stage", pattern));
            }
            if let Some(ref command) = over.command
                && !PLACEHOLDERS.iter().any(|p| command.contains(p))
            {
                warnings.push(format!(
                    "Command override for '{}' uses no placeholder; every subject gets the same command",
                    pattern
                ));
            }
        }

        for var in ["BB_BIN_DIR", "FSLDIR"] {
            if std::env::var(var).is_err() {
                warnings.push(format!("Environment variable {} is not set", var));
            }
        }

        warnings
    }
}

/// Check if a pattern matches a stage key.
/// Supports simple glob patterns:
/// - `*` matches any sequence of characters
/// - `?` matches any single character
pub fn pattern_matches(pattern: &str, key: &str) -> bool {
    glob_match(&pattern.to_lowercase(), &key.to_lowercase())
}

fn glob_match(pattern: &str, text: &str) -> bool {
    let mut pattern_chars = pattern.chars().peekable();
    let mut text_chars = text.chars();

    while let Some(p) = pattern_chars.next() {
        match p {
            '*' => {
                while pattern_chars.peek() == Some(&'*') {
                    pattern_chars.next();
                }
                if pattern_chars.peek().is_none() {
                    return true;
                }

                let remaining_pattern: String = pattern_chars.collect();
                let remaining_text: Vec<char> = text_chars.collect();
                return (0..=remaining_text.len()).any(|i| {
                    let tail: String = remaining_text[i..].iter().collect();
                    glob_match(&remaining_pattern, &tail)
                });
            }
            '?' => {
                if text_chars.next().is_none() {
                    return false;
                }
            }
            c => {
                if text_chars.next() != Some(c) {
                    return false;
                }
            }
        }
    }

    text_chars.next().is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::keys;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let cfg = PipelineToml::default();
        assert_eq!(cfg.queue.submit_cmd, "${FSLDIR}/bin/fsl_sub");
        assert_eq!(cfg.queue.queue, "${QUEUE_STANDARD}");
        assert!(cfg.pipeline.parc_name.is_none());
        assert_eq!(cfg.stages().len(), default_stages().len());
    }

    #[test]
    fn test_parse_empty_is_default() {
        let cfg = PipelineToml::parse("").unwrap();
        assert_eq!(cfg.queue.queue, "${QUEUE_STANDARD}");
        assert!(cfg.stages.is_empty());
    }

    #[test]
    fn test_parse_full() {
        let cfg = PipelineToml::parse(
            r#"
[queue]
submit_cmd = "qsub-wrapper"
queue = "short"

[pipeline]
parc_name = "aparc"

[stages."feat_*"]
queue = "long"

[stages.qc]
command = "run-qc {subject}"
"#,
        )
        .unwrap();

        assert_eq!(cfg.queue.submit_cmd, "qsub-wrapper");
        assert_eq!(cfg.pipeline.parc_name.as_deref(), Some("aparc"));

        let feat = cfg.stage(keys::FEAT_RFMRI).unwrap();
        assert_eq!(feat.queue.as_deref(), Some("long"));
        let feat_t = cfg.stage(keys::FEAT_TFMRI).unwrap();
        assert_eq!(feat_t.queue.as_deref(), Some("long"));
        let fix = cfg.stage(keys::FIX).unwrap();
        assert!(fix.queue.is_none());

        let qc = cfg.stage(keys::QC).unwrap();
        assert_eq!(qc.command, "run-qc {subject}");
    }

    #[test]
    fn test_specific_override_wins_over_pattern() {
        let cfg = PipelineToml::parse(
            r#"
[stages."feat_*"]
queue = "long"

[stages.feat_tfmri]
queue = "short"
"#,
        )
        .unwrap();
        assert_eq!(cfg.stage(keys::FEAT_TFMRI).unwrap().queue.as_deref(), Some("short"));
        assert_eq!(cfg.stage(keys::FEAT_RFMRI).unwrap().queue.as_deref(), Some("long"));
    }

    #[test]
    fn test_uppercase_specific_override_wins_over_pattern() {
        let cfg = PipelineToml::parse(
            r#"
[stages."feat_*"]
queue = "long"

[stages.FEAT_TFMRI]
queue = "short"
"#,
        )
        .unwrap();

        assert_eq!(
            cfg.stage(keys::FEAT_TFMRI).unwrap().queue.as_deref(),
            Some("short")
        );
        assert_eq!(
            cfg.stage(keys::FEAT_RFMRI).unwrap().queue.as_deref(),
            Some("long")
        );
    }

    #[test]
    fn test_parse_invalid_toml() {
        assert!(PipelineToml::parse("[queue\nsubmit_cmd = 1").is_err());
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bbflow.toml");
        fs::write(&path, "[queue]\nqueue = [").unwrap();
        let err = PipelineToml::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bbflow.toml"));
    }

    #[test]
    fn test_load_or_default_explicit_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let err = PipelineToml::load_or_default(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_validate_unknown_pattern_and_static_command() {
        let cfg = PipelineToml::parse(
            r#"
[stages.bogus]
queue = "x"

[stages.fix]
command = "/opt/fix/run"
"#,
        )
        .unwrap();
        let warnings = cfg.validate();
        assert!(warnings.iter().any(|w| w.contains("'bogus' matches no known stage")));
        assert!(warnings.iter().any(|w| w.contains("'fix' uses no placeholder")));
    }

    #[test]
    fn test_toml_round_trip_keeps_overrides() {
        let cfg = PipelineToml::parse("[stages.fc]\nqueue = \"gpu\"\n").unwrap();
        let again = PipelineToml::parse(&cfg.to_toml_string()).unwrap();
        assert_eq!(again.stages["fc"].queue.as_deref(), Some("gpu"));
    }

    #[test]
    fn test_pattern_matches() {
        assert!(pattern_matches("fix", "fix"));
        assert!(pattern_matches("FEAT_*", "feat_rfmri"));
        assert!(pattern_matches("*_rfmri", "clean_rfmri"));
        assert!(pattern_matches("prepare_?fmri", "prepare_tfmri"));
        assert!(pattern_matches("*", "qc"));
        assert!(!pattern_matches("feat_*", "fix"));
        assert!(!pattern_matches("f?", "fix"));
    }
}
