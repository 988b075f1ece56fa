//! Amend Extraction
//!
//! Turns natural-language amendment instructions into candidate changes.
//!
//! # Core Concepts
//!
//! - [`PatternExtractor`]: deterministic first pass over well-known phrasings
//! - [`SemanticExtractor`]: language-model second pass, validated at the boundary
//! - [`CompletionClient`]: the language-model capability
//!   ([`OpenAiCompatibleClient`] for `/chat/completions` services)
//! - [`CachedCompletionClient`]: moka-backed answer cache
//! - [`PromptTemplates`]: externally configurable prompt text
//!
//! # Example
//!
//! ```rust,ignore
//! use amend_extract::{PatternExtractor, SemanticExtractor};
//!
//! let seed = PatternExtractor::new().extract(&instructions);
//! let semantic = SemanticExtractor::new(client).extract(&instructions, &seed).await?;
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod cache;
mod completion;
mod error;
pub mod pattern;
pub mod prompt;
pub mod semantic;

pub use cache::CachedCompletionClient;
pub use completion::{Completion, CompletionClient, OpenAiCompatibleClient, TokenUsage};
pub use error::{CompletionError, ExtractionError};
pub use pattern::PatternExtractor;
pub use prompt::PromptTemplates;
pub use semantic::{SemanticExtraction, SemanticExtractor};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
