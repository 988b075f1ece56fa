//! In-memory document store
//!
//! [`MemoryStore`] keeps every document in a concurrent map keyed by
//! [`DocumentId`]. Independent runs may share one store as long as each
//! run mutates its own document.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::accessor::DocumentAccessor;
use crate::error::AccessError;
use crate::id::DocumentId;
use crate::model::{Document, Paragraph, Replacement, TextMatch};

/// Concurrent in-memory [`DocumentAccessor`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: DashMap<DocumentId, Document>,
}

impl MemoryStore {
    /// Empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a document
    pub fn insert(&self, id: impl Into<DocumentId>, document: Document) {
        self.documents.insert(id.into(), document);
    }

    /// Clone of the stored document
    #[must_use]
    pub fn get(&self, id: &DocumentId) -> Option<Document> {
        self.documents.get(id).map(|entry| entry.value().clone())
    }

    /// Remove a document from the store
    pub fn remove(&self, id: &DocumentId) -> Option<Document> {
        self.documents.remove(id).map(|(_, doc)| doc)
    }

    /// True if a document is registered under `id`
    #[must_use]
    pub fn contains(&self, id: &DocumentId) -> bool {
        self.documents.contains_key(id)
    }

    /// Number of stored documents
    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    /// True if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn snapshot(&self, id: &DocumentId) -> Result<Document, AccessError> {
        self.get(id).ok_or_else(|| AccessError::NotFound(id.clone()))
    }

    fn with_document<T>(
        &self,
        id: &DocumentId,
        f: impl FnOnce(&mut Document) -> Result<T, AccessError>,
    ) -> Result<T, AccessError> {
        let mut entry = self
            .documents
            .get_mut(id)
            .ok_or_else(|| AccessError::NotFound(id.clone()))?;
        f(entry.value_mut())
    }
}

fn out_of_range(index: usize, doc: &Document) -> AccessError {
    AccessError::IndexOutOfRange {
        index,
        len: doc.len(),
    }
}

#[async_trait]
impl DocumentAccessor for MemoryStore {
    async fn get_text(&self, doc: &DocumentId) -> Result<String, AccessError> {
        Ok(self.snapshot(doc)?.text())
    }

    async fn paragraphs(&self, doc: &DocumentId) -> Result<Vec<Paragraph>, AccessError> {
        Ok(self.snapshot(doc)?.into_paragraphs())
    }

    async fn find(
        &self,
        doc: &DocumentId,
        text: &str,
        match_case: bool,
    ) -> Result<Vec<TextMatch>, AccessError> {
        let document = self
            .documents
            .get(doc)
            .ok_or_else(|| AccessError::NotFound(doc.clone()))?;
        Ok(document.find(text, match_case))
    }

    async fn replace(
        &self,
        doc: &DocumentId,
        paragraph_index: usize,
        replacement: &Replacement,
    ) -> Result<usize, AccessError> {
        self.with_document(doc, |document| {
            let len = document.len();
            let paragraph = document
                .get_mut(paragraph_index)
                .ok_or(AccessError::IndexOutOfRange {
                    index: paragraph_index,
                    len,
                })?;
            let (text, count) = replacement.apply(&paragraph.text);
            if count > 0 {
                paragraph.text = text;
            }
            Ok(count)
        })
    }

    async fn set_paragraph_text(
        &self,
        doc: &DocumentId,
        paragraph_index: usize,
        text: &str,
    ) -> Result<(), AccessError> {
        self.with_document(doc, |document| {
            let len = document.len();
            let paragraph = document
                .get_mut(paragraph_index)
                .ok_or(AccessError::IndexOutOfRange {
                    index: paragraph_index,
                    len,
                })?;
            paragraph.text = text.to_string();
            Ok(())
        })
    }

    async fn delete_paragraph(
        &self,
        doc: &DocumentId,
        paragraph_index: usize,
    ) -> Result<(), AccessError> {
        self.with_document(doc, |document| {
            document
                .remove(paragraph_index)
                .map(|_| ())
                .ok_or_else(|| out_of_range(paragraph_index, document))
        })
    }

    async fn insert_paragraph(
        &self,
        doc: &DocumentId,
        after_index: usize,
        text: &str,
    ) -> Result<usize, AccessError> {
        self.with_document(doc, |document| {
            if after_index >= document.len() {
                return Err(out_of_range(after_index, document));
            }
            document
                .insert(after_index + 1, Paragraph::body(text))
                .ok_or_else(|| out_of_range(after_index, document))
        })
    }

    async fn add_heading(
        &self,
        doc: &DocumentId,
        text: &str,
        level: u8,
    ) -> Result<usize, AccessError> {
        self.with_document(doc, |document| {
            Ok(document.push(Paragraph::heading(text, level)))
        })
    }

    async fn add_paragraph(&self, doc: &DocumentId, text: &str) -> Result<usize, AccessError> {
        self.with_document(doc, |document| Ok(document.push(Paragraph::body(text))))
    }

    async fn add_comment(
        &self,
        doc: &DocumentId,
        paragraph_index: usize,
        text: &str,
    ) -> Result<(), AccessError> {
        self.with_document(doc, |document| {
            let len = document.len();
            let paragraph = document
                .get_mut(paragraph_index)
                .ok_or(AccessError::IndexOutOfRange {
                    index: paragraph_index,
                    len,
                })?;
            paragraph.comments.push(text.to_string());
            Ok(())
        })
    }

    async fn copy(&self, doc: &DocumentId, dest: &DocumentId) -> Result<(), AccessError> {
        if doc == dest {
            return Err(AccessError::SelfCopy(doc.clone()));
        }
        // Clone first so no shard lock is held while inserting the copy.
        let snapshot = self.snapshot(doc)?;
        self.documents.insert(dest.clone(), snapshot);
        tracing::debug!(source = %doc, dest = %dest, "document copied");
        Ok(())
    }
}
