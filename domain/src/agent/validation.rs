//! Structured configuration issues.
//!
//! Config parsing never aborts on a bad value: it falls back to the default
//! and reports a [`ConfigIssue`] the caller can print.

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: a default was used instead.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// Unrecognized retrieval strategy name.
    UnknownRetrievalStrategy,
    /// A limit that must be positive was zero.
    ZeroLimit,
    /// Similarity threshold outside `[0, 1]`.
    ThresholdOutOfRange,
    /// Budget limit below -1.
    InvalidBudgetLimit,
}

/// A detected issue in the configuration.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn has_errors(issues: &[ConfigIssue]) -> bool {
        issues.iter().any(|i| i.severity == Severity::Error)
    }
}
