//! Stage definitions and the built-in stage catalog.
//!
//! A stage is one external command submitted to the queue. Commands are kept as
//! templates so sites can point them at their own installation; the placeholders
//! below are substituted literally, everything else (including `$BB_BIN_DIR`) is
//! left for the submitting shell.
//!
//! | Placeholder   | Value                                           |
//! |---------------|-------------------------------------------------|
//! | `{subject}`   | subject path as given on the command line       |
//! | `{subname}`   | subject path with `/` replaced by `_`           |
//! | `{base_dir}`  | absolute subject directory                      |
//! | `{top_up}`    | `true` when both field-map directions exist     |
//! | `{parc_name}` | parcellation used by reparcellation             |

use crate::subject::Subject;

/// Well-known stage keys.
pub mod keys {
    pub const POSTPROCESS_STRUCT: &str = "postprocess_struct";
    pub const PREPARE_RFMRI: &str = "prepare_rfmri";
    pub const FEAT_RFMRI: &str = "feat_rfmri";
    pub const FIX: &str = "fix";
    pub const FC: &str = "fc";
    pub const CLEAN_RFMRI: &str = "clean_rfmri";
    pub const PREPARE_TFMRI: &str = "prepare_tfmri";
    pub const FEAT_TFMRI: &str = "feat_tfmri";
    pub const STRUCTURAL: &str = "structural";
    pub const DIFFUSION: &str = "diffusion";
    pub const IDP: &str = "idp";
    pub const QC: &str = "qc";
    pub const REPARCELLATE: &str = "reparcellate";
}

/// A single submittable pipeline step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    /// Stable key used for configuration overrides
    pub key: String,
    /// Human-readable label used in log lines
    pub label: String,
    /// Job name prefix; the subject's `subname` is appended
    pub job_prefix: String,
    /// Command template
    pub command: String,
    /// Queue override; `None` uses the configured default queue
    pub queue: Option<String>,
}

impl Stage {
    pub fn new(key: &str, label: &str, job_prefix: &str, command: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            job_prefix: job_prefix.to_string(),
            command: command.to_string(),
            queue: None,
        }
    }

    /// Job name shown by the queue, e.g. `bb_fix_sub-01`.
    pub fn job_name(&self, subject: &Subject) -> String {
        format!("{}_{}", self.job_prefix, subject.subname())
    }

    /// Substitute placeholders in the command template.
    pub fn render(&self, vars: &TemplateVars) -> String {
        vars.apply(&self.command)
    }
}

/// Values available to command templates.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    pub subject: String,
    pub subname: String,
    pub base_dir: String,
    pub top_up: bool,
    pub parc_name: String,
}

impl TemplateVars {
    pub fn for_subject(subject: &Subject) -> Self {
        Self {
            subject: subject.path().to_string(),
            subname: subject.subname(),
            base_dir: subject.base_dir().display().to_string(),
            top_up: false,
            parc_name: String::new(),
        }
    }

    pub fn with_top_up(mut self, top_up: bool) -> Self {
        self.top_up = top_up;
        self
    }

    pub fn with_parc_name(mut self, parc_name: impl Into<String>) -> Self {
        self.parc_name = parc_name.into();
        self
    }

    pub fn apply(&self, template: &str) -> String {
        template
            .replace("{subject}", &self.subject)
            .replace("{subname}", &self.subname)
            .replace("{base_dir}", &self.base_dir)
            .replace("{top_up}", if self.top_up { "true" } else { "false" })
            .replace("{parc_name}", &self.parc_name)
    }
}

/// Placeholders recognised by [`TemplateVars::apply`].
pub const PLACEHOLDERS: [&str; 5] = [
    "{subject}",
    "{subname}",
    "{base_dir}",
    "{top_up}",
    "{parc_name}",
];

/// The built-in stage catalog, in pipeline order.
pub fn default_stages() -> Vec<Stage> {
    use keys::*;

    vec![
        Stage::new(
            STRUCTURAL,
            "structural pipeline",
            "bb_structural",
            "$BB_BIN_DIR/bb_structural_pipeline/bb_pipeline_struct {subject} {top_up}",
        ),
        Stage::new(
            POSTPROCESS_STRUCT,
            "bb_postprocess_struct",
            "bb_postprocess_struct",
            "$BB_BIN_DIR/bb_functional_pipeline/bb_postprocess_struct {subject}",
        ),
        Stage::new(
            PREPARE_RFMRI,
            "rfMRI prep",
            "bb_prepare_rfMRI",
            "$BB_BIN_DIR/bb_functional_pipeline/bb_prepare_rfMRI {subject}",
        ),
        Stage::new(
            FEAT_RFMRI,
            "rfMRI FEAT",
            "bb_feat_rfMRI_ns",
            "feat {base_dir}/fMRI/rfMRI.fsf {subject}",
        ),
        Stage::new(
            FIX,
            "FIX",
            "bb_fix",
            "$BB_BIN_DIR/bb_functional_pipeline/bb_fix {subject}",
        ),
        Stage::new(
            FC,
            "FC",
            "tvb_FC",
            "$BB_BIN_DIR/bb_functional_pipeline/tvb_FC {subject}",
        ),
        Stage::new(
            CLEAN_RFMRI,
            "rfMRI cleanup",
            "bb_rfMRI_clean",
            "$BB_BIN_DIR/bb_functional_pipeline/bb_clean_fix_logs {subject}",
        ),
        Stage::new(
            PREPARE_TFMRI,
            "tfMRI prep",
            "bb_prepare_tfMRI",
            "$BB_BIN_DIR/bb_functional_pipeline/bb_prepare_tfMRI {subject}",
        ),
        Stage::new(
            FEAT_TFMRI,
            "tfMRI FEAT",
            "bb_feat_tfMRI",
            "feat {base_dir}/fMRI/tfMRI.fsf",
        ),
        Stage::new(
            DIFFUSION,
            "diffusion pipeline",
            "bb_diffusion",
            "$BB_BIN_DIR/bb_diffusion_pipeline/bb_pipeline_diff {subject}",
        ),
        Stage::new(
            IDP,
            "IDP",
            "bb_IDP",
            "$BB_BIN_DIR/bb_IDP/bb_IDP {subject}",
        ),
        Stage::new(
            QC,
            "quality control",
            "tvb_bb_QC",
            "xvfb-run -a $BB_BIN_DIR/tvb_bb_QC/tvb_bb_QC.sh {subject}",
        ),
        Stage::new(
            REPARCELLATE,
            "reparcellation",
            "tvb_reparcellate",
            "$BB_BIN_DIR/tvb_reparcellate_pipeline/tvb_reparcellate_pipeline {subject} none {parc_name}",
        ),
    ]
}
