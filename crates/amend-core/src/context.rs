//! Per-run state
//!
//! A [`RunContext`] is created when a run starts and threaded by mutable
//! reference through extraction, merging and execution. It is the only
//! place outcomes accumulate; nothing is shared between runs.

use std::time::Instant;

use amend_document::DocumentId;
use amend_extract::TokenUsage;
use chrono::{DateTime, Utc};
use ulid::Ulid;

use crate::outcome::{ChangeOutcome, ChangeStatus};
use crate::report::ProcessingReport;

/// State of one processing run
#[derive(Debug)]
pub struct RunContext {
    run_id: Ulid,
    document: DocumentId,
    backup: DocumentId,
    outcomes: Vec<ChangeOutcome>,
    usage: TokenUsage,
    warnings: Vec<String>,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl RunContext {
    /// Start a run over `document`, backed up to `backup`
    #[must_use]
    pub fn new(document: DocumentId, backup: DocumentId) -> Self {
        Self {
            run_id: Ulid::new(),
            document,
            backup,
            outcomes: Vec::new(),
            usage: TokenUsage::default(),
            warnings: Vec::new(),
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    #[inline]
    #[must_use]
    pub fn run_id(&self) -> Ulid {
        self.run_id
    }

    /// Live document being mutated
    #[inline]
    #[must_use]
    pub fn document(&self) -> &DocumentId {
        &self.document
    }

    #[inline]
    #[must_use]
    pub fn backup(&self) -> &DocumentId {
        &self.backup
    }

    /// Outcomes recorded so far, in plan order
    #[inline]
    #[must_use]
    pub fn outcomes(&self) -> &[ChangeOutcome] {
        &self.outcomes
    }

    #[inline]
    #[must_use]
    pub fn usage(&self) -> TokenUsage {
        self.usage
    }

    #[inline]
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Append an outcome
    pub fn record(&mut self, outcome: ChangeOutcome) {
        self.outcomes.push(outcome);
    }

    /// Add tokens spent by an extraction call
    pub fn add_usage(&mut self, usage: TokenUsage) {
        self.usage += usage;
    }

    /// Note a condition the caller should see in the report
    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Close the run and build its report
    #[must_use]
    pub fn finish(self) -> ProcessingReport {
        let successful = self
            .outcomes
            .iter()
            .filter(|o| o.status == ChangeStatus::Success)
            .count();
        let total_changes = self.outcomes.len();
        let warning = if self.warnings.is_empty() {
            None
        } else {
            Some(self.warnings.join("; "))
        };

        ProcessingReport {
            run_id: self.run_id,
            total_changes,
            successful,
            failed: total_changes - successful,
            changes: self.outcomes,
            processed_document_id: self.document,
            backup_document_id: self.backup,
            token_usage: self.usage,
            warning,
            started_at: self.started_at,
            finished_at: Utc::now(),
            duration_ms: u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }
}
