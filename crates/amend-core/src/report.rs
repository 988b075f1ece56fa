//! Aggregate run report

use amend_change::ChangeId;
use amend_document::DocumentId;
use amend_extract::TokenUsage;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

use crate::outcome::{ChangeOutcome, ChangeStatus};

/// Everything a caller learns about one run
///
/// `failed` counts [`ChangeStatus::Partial`] as well as
/// [`ChangeStatus::Failed`], so `successful + failed == total_changes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingReport {
    /// Unique per run, sortable by start time
    pub run_id: Ulid,
    /// Changes in the executed plan
    pub total_changes: usize,
    /// Outcomes with status `SUCCESS`
    pub successful: usize,
    /// Outcomes with status `FAILED` or `PARTIAL`
    pub failed: usize,
    /// Outcomes in plan order
    pub changes: Vec<ChangeOutcome>,
    /// Document the changes were applied to
    pub processed_document_id: DocumentId,
    /// Untouched copy taken before the first change
    pub backup_document_id: DocumentId,
    /// Tokens spent by the semantic pass
    pub token_usage: TokenUsage,
    /// Run-level warnings joined into one line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Wall time between start and finish
    pub duration_ms: u64,
}

impl ProcessingReport {
    /// Outcome of one change
    #[must_use]
    pub fn outcome(&self, change_id: &ChangeId) -> Option<&ChangeOutcome> {
        self.changes.iter().find(|o| &o.change_id == change_id)
    }

    /// Number of outcomes with `status`
    #[must_use]
    pub fn count(&self, status: ChangeStatus) -> usize {
        self.changes.iter().filter(|o| o.status == status).count()
    }

    /// True when every change succeeded (vacuously true for an empty plan)
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failed == 0
    }

    /// One-line summary for logs
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}/{} changes applied to {} (backup {}), {} failed",
            self.successful,
            self.total_changes,
            self.processed_document_id,
            self.backup_document_id,
            self.failed
        )
    }
}
