//! Job tokens returned by the batch queue.
//!
//! A token is whatever the queue printed when a job was submitted: a single job
//! id, or a comma-separated list of ids when several jobs are waited on together.
//! The value `"-1"` stands for "no dependency".

use std::fmt;

/// Sentinel token meaning "wait on nothing".
pub const NO_DEPENDENCY: &str = "-1";

/// Opaque job identifier (or comma-joined list of identifiers).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobToken(String);

impl JobToken {
    /// Wrap a raw token. Blank input becomes the sentinel.
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            Self::none()
        } else {
            Self(trimmed.to_string())
        }
    }

    /// The "no dependency" sentinel.
    pub fn none() -> Self {
        Self(NO_DEPENDENCY.to_string())
    }

    pub fn is_none(&self) -> bool {
        self.0 == NO_DEPENDENCY
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Comma-join two tokens, keeping `self` first.
    ///
    /// The sentinel is the identity: merging with it returns the other token, and
    /// merging two sentinels returns the sentinel.
    pub fn merge(&self, other: &JobToken) -> JobToken {
        match (self.is_none(), other.is_none()) {
            (true, true) => JobToken::none(),
            (true, false) => other.clone(),
            (false, true) => self.clone(),
            (false, false) => JobToken(format!("{},{}", self.0, other.0)),
        }
    }
}

impl Default for JobToken {
    fn default() -> Self {
        Self::none()
    }
}

impl fmt::Display for JobToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
