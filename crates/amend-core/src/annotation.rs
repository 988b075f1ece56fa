//! Provenance annotations
//!
//! Every applied change leaves a review comment on the paragraph it touched:
//! `[CHG-001] REPLACE_TEXT: Массовая замена ... | замен: 3 | 2025-01-31 12:00:00 UTC`.
//! Comments do not shift paragraph indexes, so later anchors are unaffected.

use amend_change::{Change, ChangeId, ChangeOperation};
use chrono::{DateTime, Utc};

/// One provenance record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub change_id: ChangeId,
    pub operation: ChangeOperation,
    pub summary: String,
    /// Operation-specific note, e.g. the number of replacements
    pub extra: Option<String>,
    pub at: DateTime<Utc>,
}

impl Annotation {
    /// Annotation for `change`, stamped now
    #[must_use]
    pub fn for_change(change: &Change) -> Self {
        Self {
            change_id: change.change_id.clone(),
            operation: change.operation(),
            summary: change.description.clone(),
            extra: None,
            at: Utc::now(),
        }
    }

    /// With an operation-specific note
    #[inline]
    #[must_use]
    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    /// With an explicit timestamp
    #[inline]
    #[must_use]
    pub fn at(mut self, at: DateTime<Utc>) -> Self {
        self.at = at;
        self
    }
}

impl std::fmt::Display for Annotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.change_id, self.operation)?;
        if !self.summary.is_empty() {
            write!(f, ": {}", self.summary)?;
        }
        if let Some(ref extra) = self.extra {
            write!(f, " | {extra}")?;
        }
        write!(f, " | {}", self.at.format("%Y-%m-%d %H:%M:%S UTC"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amend_change::Edit;
    use chrono::TimeZone;

    #[test]
    fn renders_all_parts() {
        let change = Change::new(
            ChangeId::sequential(1),
            "Массовая замена: 'Компания' → 'Общество'",
            Edit::replace_all("Компания", "Общество"),
        );
        let at = Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap();
        let text = Annotation::for_change(&change)
            .with_extra("замен: 3")
            .at(at)
            .to_string();
        assert_eq!(
            text,
            "[CHG-001] REPLACE_TEXT: Массовая замена: 'Компания' → 'Общество' | замен: 3 | 2025-01-31 12:00:00 UTC"
        );
    }

    #[test]
    fn empty_summary_is_omitted() {
        let change = Change::new(ChangeId::sequential(2), "", Edit::delete("3."));
        let at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            Annotation::for_change(&change).at(at).to_string(),
            "[CHG-002] DELETE_PARAGRAPH | 2025-01-01 00:00:00 UTC"
        );
    }
}
