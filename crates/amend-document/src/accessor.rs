//! Document Accessor capability
//!
//! The engine never touches files directly. It reads, searches and mutates
//! documents through this trait, which hides the storage backend (an
//! in-memory store, a document server, a word processor bridge).
//!
//! All methods address paragraphs by index in the *current* document state.
//! Implementations must apply each mutation atomically; callers serialise
//! calls for a single document.

use async_trait::async_trait;

use crate::error::AccessError;
use crate::hash::ContentHash;
use crate::id::DocumentId;
use crate::model::{Document, Paragraph, Replacement, TextMatch};

/// Read, search and mutate paragraph-addressable documents
#[async_trait]
pub trait DocumentAccessor: Send + Sync {
    /// Full visible text, one paragraph per line
    async fn get_text(&self, doc: &DocumentId) -> Result<String, AccessError>;

    /// Snapshot of every paragraph
    async fn paragraphs(&self, doc: &DocumentId) -> Result<Vec<Paragraph>, AccessError>;

    /// Every literal occurrence of `text`, ordered by paragraph then offset
    async fn find(
        &self,
        doc: &DocumentId,
        text: &str,
        match_case: bool,
    ) -> Result<Vec<TextMatch>, AccessError>;

    /// Apply a literal substitution inside one paragraph
    ///
    /// Returns the number of substitutions made (zero when nothing matched).
    async fn replace(
        &self,
        doc: &DocumentId,
        paragraph_index: usize,
        replacement: &Replacement,
    ) -> Result<usize, AccessError>;

    /// Overwrite the full text of one paragraph, keeping its kind and comments
    async fn set_paragraph_text(
        &self,
        doc: &DocumentId,
        paragraph_index: usize,
        text: &str,
    ) -> Result<(), AccessError>;

    /// Remove one paragraph
    async fn delete_paragraph(
        &self,
        doc: &DocumentId,
        paragraph_index: usize,
    ) -> Result<(), AccessError>;

    /// Insert a body paragraph right after `after_index`, returning the new index
    async fn insert_paragraph(
        &self,
        doc: &DocumentId,
        after_index: usize,
        text: &str,
    ) -> Result<usize, AccessError>;

    /// Append a heading at the end of the document, returning its index
    async fn add_heading(
        &self,
        doc: &DocumentId,
        text: &str,
        level: u8,
    ) -> Result<usize, AccessError>;

    /// Append a body paragraph at the end of the document, returning its index
    async fn add_paragraph(&self, doc: &DocumentId, text: &str) -> Result<usize, AccessError>;

    /// Attach a review comment to a paragraph
    async fn add_comment(
        &self,
        doc: &DocumentId,
        paragraph_index: usize,
        text: &str,
    ) -> Result<(), AccessError>;

    /// Copy a document to `dest`, replacing whatever `dest` held
    async fn copy(&self, doc: &DocumentId, dest: &DocumentId) -> Result<(), AccessError>;

    /// Fingerprint of the current document state
    async fn content_hash(&self, doc: &DocumentId) -> Result<ContentHash, AccessError> {
        let paragraphs = self.paragraphs(doc).await?;
        Ok(Document::from_paragraphs(paragraphs).content_hash())
    }
}
