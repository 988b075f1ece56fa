//! Error types for document access
//!
//! Every accessor call may fail with an [`AccessError`]. Callers in the
//! executor turn these into per-change outcomes; only a failed backup copy
//! is allowed to stop a run.

use crate::id::DocumentId;

/// Errors raised by a [`DocumentAccessor`](crate::DocumentAccessor)
#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    /// No document registered under this id
    #[error("document not found: {0}")]
    NotFound(DocumentId),

    /// Copy source and destination are the same document
    #[error("cannot copy document onto itself: {0}")]
    SelfCopy(DocumentId),

    /// Paragraph index past the end of the document
    #[error("paragraph index {index} out of range (document has {len} paragraphs)")]
    IndexOutOfRange { index: usize, len: usize },

    /// Underlying storage failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend-specific failure
    #[error("accessor error: {0}")]
    Backend(String),
}

impl AccessError {
    /// Create a backend error from any message
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

/// Errors from the plain-text document codec
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Heading marker without text
    #[error("line {line}: empty heading")]
    EmptyHeading { line: usize },

    /// Comment line with no paragraph before it
    #[error("line {line}: comment without a preceding paragraph")]
    OrphanComment { line: usize },
}
