//! Amend Core - change plans and their application
//!
//! The engine that:
//! - Merges pattern and language-model candidates into one change plan
//! - Applies the plan to a live document, one change at a time
//! - Annotates every applied change with its provenance
//! - Streams per-change outcomes and returns a complete report
//!
//! # Core Concepts
//!
//! - [`DocumentProcessor`]: backup, extract, merge, execute, report
//! - [`ChangeMerger`]: dedup by [`DedupKey`](amend_change::DedupKey), language model wins
//! - [`ChangeExecutor`]: per-operation handlers with failure isolation
//! - [`RunContext`]: all per-run state, nothing global
//! - [`ProgressSink`]: fire-and-forget observer of [`ProgressEvent`]s
//! - [`CancelHandle`] / [`CancelSignal`]: prompt cancellation of a run
//!
//! # Example
//!
//! ```rust,ignore
//! use amend_core::{AmendConfig, DocumentProcessor};
//!
//! # async fn example(store: std::sync::Arc<amend_document::MemoryStore>) -> Result<(), Box<dyn std::error::Error>> {
//! let processor = DocumentProcessor::new(store, AmendConfig::new());
//! let report = processor
//!     .process(&"contract".into(), "Пункт 30 исключить.")
//!     .await?;
//!
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod anchor;
pub mod annotation;
pub mod cancel;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod merge;
pub mod outcome;
pub mod processor;
pub mod progress;
pub mod report;

pub use annotation::Annotation;
pub use cancel::{CancelHandle, CancelSignal};
pub use config::{AmendConfig, SemanticConfig};
pub use context::RunContext;
pub use error::{ChangeFailure, ConfigError, ErrorCode, ProcessError};
pub use executor::ChangeExecutor;
pub use merge::ChangeMerger;
pub use outcome::{ChangeOutcome, ChangeStatus, OutcomeDetails};
pub use processor::{ChangePlan, DocumentProcessor, NO_CHANGES_WARNING};
pub use progress::{
    ChannelSink, NoopSink, ProgressEvent, ProgressSink, ProgressUpdate, RunFailure, TracingSink,
};
pub use report::ProcessingReport;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running amendments
    pub use crate::{
        AmendConfig, CancelHandle, ChangeOutcome, ChangeStatus, DocumentProcessor, ErrorCode,
        ProcessingReport, ProgressEvent, ProgressSink,
    };
    pub use amend_change::{Change, ChangeId, ChangeOperation, Edit};
    pub use amend_document::{DocumentAccessor, DocumentId, MemoryStore};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
