//! Amend Document Layer
//!
//! Paragraph-addressable documents and the capability the engine uses to
//! read and mutate them.
//!
//! # Core Concepts
//!
//! - [`DocumentAccessor`]: async capability for find / replace / delete /
//!   insert / copy, implemented by storage backends
//! - [`Document`] and [`Paragraph`]: the in-memory model (headings, body
//!   paragraphs, review comments)
//! - [`MemoryStore`]: concurrent in-memory accessor
//! - [`text`]: line-oriented codec for plain-text documents
//! - [`ContentHash`]: Blake3 fingerprint used to verify backups
//!
//! # Example
//!
//! ```rust,ignore
//! use amend_document::{DocumentAccessor, DocumentId, MemoryStore, text};
//!
//! let store = MemoryStore::new();
//! let id = DocumentId::new("contract");
//! store.insert(id.clone(), text::parse("1. Компания обязуется...")?);
//!
//! let hits = store.find(&id, "Компания", true).await?;
//! ```

#![allow(missing_docs)]

mod accessor;
mod error;
mod hash;
mod id;
mod memory;
mod model;
pub mod text;

pub use accessor::DocumentAccessor;
pub use error::{AccessError, CodecError};
pub use hash::ContentHash;
pub use id::DocumentId;
pub use memory::MemoryStore;
pub use model::{find_occurrences, Document, Paragraph, ParagraphKind, Replacement, TextMatch};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[tokio::test]
    async fn parsed_document_round_trips_through_store() {
        let source = "# Глава 1\n1. Компания\n2. Компания\n";
        let store = MemoryStore::new();
        let id = DocumentId::new("doc");
        store.insert(id.clone(), text::parse(source).unwrap());

        let backup = id.with_suffix("_backup");
        store.copy(&id, &backup).await.unwrap();
        assert_eq!(
            store.content_hash(&id).await.unwrap(),
            store.content_hash(&backup).await.unwrap()
        );

        let rendered = text::render(&store.get(&id).unwrap());
        assert_eq!(rendered, source);
    }
}
