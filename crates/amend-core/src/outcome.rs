//! Per-change execution results

use amend_change::{Change, ChangeId, ChangeOperation};
use serde::{Deserialize, Serialize};

use crate::error::{ChangeFailure, ErrorCode};

/// Final state of one change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeStatus {
    Success,
    /// Some but not all expected occurrences were modified
    Partial,
    Failed,
}

impl ChangeStatus {
    /// Wire spelling
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Partial => "PARTIAL",
            Self::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for ChangeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Measurements and diagnostics for one change
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeDetails {
    /// Occurrences of the target (or paragraphs holding the anchor)
    pub matches_found: usize,
    /// Substitutions, deletions or insertions actually made
    pub replacements_made: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Paragraph the change was applied to, in the document state it saw
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph_index: Option<usize>,
    /// Extra paragraphs created by multi-line payloads
    #[serde(default, skip_serializing_if = "is_zero")]
    pub paragraphs_added: usize,
    /// A provenance annotation was written
    #[serde(default)]
    pub annotated: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl OutcomeDetails {
    /// Details with match and modification counts
    #[must_use]
    pub fn counts(matches_found: usize, replacements_made: usize) -> Self {
        Self {
            matches_found,
            replacements_made,
            ..Self::default()
        }
    }

    /// With the index of the affected paragraph
    #[inline]
    #[must_use]
    pub fn at(mut self, paragraph_index: usize) -> Self {
        self.paragraph_index = Some(paragraph_index);
        self
    }

    /// With a human-readable note
    #[inline]
    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

/// Result of executing one change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeOutcome {
    pub change_id: ChangeId,
    pub operation: ChangeOperation,
    pub description: String,
    pub status: ChangeStatus,
    pub details: OutcomeDetails,
}

impl ChangeOutcome {
    /// Outcome of an applied change
    #[must_use]
    pub fn applied(change: &Change, status: ChangeStatus, details: OutcomeDetails) -> Self {
        Self {
            change_id: change.change_id.clone(),
            operation: change.operation(),
            description: change.description.clone(),
            status,
            details,
        }
    }

    /// Outcome of a change that did not apply
    #[must_use]
    pub fn failed(change: &Change, failure: &ChangeFailure) -> Self {
        let matches_found = match failure {
            ChangeFailure::ReplacementFailed { found } => *found,
            _ => 0,
        };
        Self {
            change_id: change.change_id.clone(),
            operation: change.operation(),
            description: change.description.clone(),
            status: ChangeStatus::Failed,
            details: OutcomeDetails {
                matches_found,
                error: Some(failure.code()),
                message: Some(failure.to_string()),
                ..OutcomeDetails::default()
            },
        }
    }

    /// Outcome of a change skipped because the run was cancelled
    #[must_use]
    pub fn cancelled(change: &Change) -> Self {
        Self::failed(change, &ChangeFailure::Cancelled)
    }

    /// True only for full success
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == ChangeStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amend_change::Edit;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn change() -> Change {
        Change::new(ChangeId::sequential(4), "Удаление пункта 30", Edit::delete("30."))
    }

    #[test]
    fn failed_outcome_carries_code_and_message() {
        let outcome = ChangeOutcome::failed(&change(), &ChangeFailure::AnchorNotFound("30.".into()));
        assert_eq!(outcome.status, ChangeStatus::Failed);
        assert_eq!(outcome.details.error, Some(ErrorCode::AnchorNotFound));
        assert_eq!(outcome.details.message.as_deref(), Some("anchor not found: '30.'"));
    }

    #[test]
    fn replacement_failure_keeps_match_count() {
        let outcome =
            ChangeOutcome::failed(&change(), &ChangeFailure::ReplacementFailed { found: 2 });
        assert_eq!(outcome.details.matches_found, 2);
        assert_eq!(outcome.details.error, Some(ErrorCode::ReplacementFailed));
    }

    #[test]
    fn serializes_in_wire_shape() {
        let outcome = ChangeOutcome::applied(
            &change(),
            ChangeStatus::Success,
            OutcomeDetails::counts(1, 1).at(45),
        );
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(
            value,
            json!({
                "change_id": "CHG-004",
                "operation": "DELETE_PARAGRAPH",
                "description": "Удаление пункта 30",
                "status": "SUCCESS",
                "details": {
                    "matches_found": 1,
                    "replacements_made": 1,
                    "paragraph_index": 45,
                    "annotated": false
                }
            })
        );
    }
}
