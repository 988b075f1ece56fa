//! Error types for the amendment engine
//!
//! Two layers:
//! - [`ProcessError`] / [`ConfigError`]: returned to the caller, only for
//!   conditions that stop a run before any mutation
//! - [`ChangeFailure`]: why one change did not apply; always captured into
//!   a [`ChangeOutcome`](crate::ChangeOutcome), never returned

use std::path::PathBuf;

use amend_document::{AccessError, DocumentId};

/// Run-level failure
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The pre-mutation backup could not be created or verified
    #[error("backup of {document} to {backup} failed: {source}")]
    Backup {
        document: DocumentId,
        backup: DocumentId,
        #[source]
        source: AccessError,
    },

    /// The instruction document could not be read
    #[error("cannot read instructions from {document}: {source}")]
    Instructions {
        document: DocumentId,
        #[source]
        source: AccessError,
    },
}

impl ProcessError {
    /// Document the failed run was about
    #[must_use]
    pub fn document(&self) -> &DocumentId {
        match self {
            Self::Backup { document, .. } | Self::Instructions { document, .. } => document,
        }
    }
}

/// Configuration loading failure
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Stable error codes reported in outcome details
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AnchorNotFound,
    InvalidChange,
    ReplacementFailed,
    AccessorFailure,
    Cancelled,
}

impl ErrorCode {
    /// Wire spelling, e.g. `ANCHOR_NOT_FOUND`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AnchorNotFound => "ANCHOR_NOT_FOUND",
            Self::InvalidChange => "INVALID_CHANGE",
            Self::ReplacementFailed => "REPLACEMENT_FAILED",
            Self::AccessorFailure => "ACCESSOR_FAILURE",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a single change was not applied
#[derive(Debug, thiserror::Error)]
pub enum ChangeFailure {
    /// The anchor text is absent from the current document
    #[error("anchor not found: '{0}'")]
    AnchorNotFound(String),

    /// The change cannot be executed as written
    #[error("invalid change: {0}")]
    InvalidChange(String),

    /// Matches exist but no substitution took effect
    #[error("{found} match(es) found but no replacement was made")]
    ReplacementFailed { found: usize },

    /// The document accessor reported an error
    #[error("document accessor failed: {0}")]
    Accessor(#[from] AccessError),

    /// The run was cancelled before or during this change
    #[error("run cancelled")]
    Cancelled,
}

impl ChangeFailure {
    /// Error code for outcome details
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::AnchorNotFound(_) => ErrorCode::AnchorNotFound,
            Self::InvalidChange(_) => ErrorCode::InvalidChange,
            Self::ReplacementFailed { .. } => ErrorCode::ReplacementFailed,
            Self::Accessor(_) => ErrorCode::AccessorFailure,
            Self::Cancelled => ErrorCode::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_serialize_as_wire_strings() {
        for code in [
            ErrorCode::AnchorNotFound,
            ErrorCode::InvalidChange,
            ErrorCode::ReplacementFailed,
            ErrorCode::AccessorFailure,
            ErrorCode::Cancelled,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code.as_str()));
        }
    }

    #[test]
    fn failures_map_to_codes() {
        assert_eq!(
            ChangeFailure::AnchorNotFound("30.".into()).code(),
            ErrorCode::AnchorNotFound
        );
        let accessor: ChangeFailure = AccessError::backend("disk full").into();
        assert_eq!(accessor.code(), ErrorCode::AccessorFailure);
        assert!(accessor.to_string().contains("disk full"));
    }
}
