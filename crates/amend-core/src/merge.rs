//! Change merger
//!
//! Reconciles the pattern pass and the language-model pass into one plan.
//! Candidates are keyed by [`DedupKey`]; on a collision the language-model
//! candidate is kept. The plan lists language-model candidates first, in
//! answer order, followed by pattern-only candidates in document order, and
//! is renumbered `CHG-001`, `CHG-002`, ...

use amend_change::{Change, ChangeId, DedupKey, DEFAULT_PAYLOAD_PREFIX};
use indexmap::map::Entry;
use indexmap::IndexMap;

/// Which extractor produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Semantic,
    Pattern,
}

impl Source {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Pattern => "pattern",
        }
    }
}

/// Deduplicating merger
#[derive(Debug, Clone, Copy)]
pub struct ChangeMerger {
    payload_prefix: usize,
}

impl Default for ChangeMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeMerger {
    /// Merger comparing the default payload prefix
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            payload_prefix: DEFAULT_PAYLOAD_PREFIX,
        }
    }

    /// Compare `chars` payload characters when deduplicating
    #[inline]
    #[must_use]
    pub const fn with_payload_prefix(mut self, chars: usize) -> Self {
        self.payload_prefix = chars;
        self
    }

    /// Merge both candidate lists into a renumbered plan
    ///
    /// Candidates whose anchor is empty after normalization are dropped.
    #[must_use]
    pub fn merge(&self, pattern_changes: Vec<Change>, llm_changes: Vec<Change>) -> Vec<Change> {
        let incoming = pattern_changes.len() + llm_changes.len();
        let mut plan: IndexMap<DedupKey, Change> = IndexMap::with_capacity(incoming);

        let tagged = llm_changes
            .into_iter()
            .map(|c| (Source::Semantic, c))
            .chain(pattern_changes.into_iter().map(|c| (Source::Pattern, c)));

        for (source, change) in tagged {
            if !change.has_usable_anchor() {
                tracing::warn!(
                    change_id = %change.change_id,
                    operation = %change.operation(),
                    source = source.as_str(),
                    "dropping change with empty anchor"
                );
                continue;
            }

            match plan.entry(DedupKey::of(&change, self.payload_prefix)) {
                Entry::Vacant(slot) => {
                    slot.insert(change);
                }
                Entry::Occupied(kept) => {
                    tracing::debug!(
                        dropped = %change.change_id,
                        kept = %kept.get().change_id,
                        source = source.as_str(),
                        "duplicate candidate"
                    );
                }
            }
        }

        let merged: Vec<Change> = plan
            .into_values()
            .enumerate()
            .map(|(idx, change)| change.with_id(ChangeId::sequential(idx + 1)))
            .collect();

        tracing::info!(incoming, merged = merged.len(), "change plan merged");
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amend_change::{ChangeOperation, Edit};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn change(n: usize, description: &str, edit: Edit) -> Change {
        Change::new(ChangeId::sequential(n), description, edit)
    }

    #[test]
    fn semantic_version_wins_collision() {
        let pattern = vec![change(1, "pattern", Edit::replace_all("Компания", "Общество"))];
        let llm = vec![change(1, "llm", Edit::replace_all("компания", "общество"))];

        let plan = ChangeMerger::new().merge(pattern, llm);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].description, "llm");
        assert_eq!(plan[0].change_id.as_str(), "CHG-001");
    }

    #[test]
    fn semantic_first_then_pattern_only() {
        let pattern = vec![
            change(1, "p-delete", Edit::delete("30.")),
            change(2, "p-shared", Edit::replace_point("12.", "12. Новая редакция.")),
        ];
        let llm = vec![
            change(1, "l-shared", Edit::replace_point("12.", "12. Новая  редакция.")),
            change(2, "l-insert", Edit::insert_after("59.", "60-1. Текст.")),
        ];

        let plan = ChangeMerger::new().merge(pattern, llm);
        let described: Vec<_> = plan
            .iter()
            .map(|c| (c.change_id.as_str().to_string(), c.description.as_str()))
            .collect();
        assert_eq!(
            described,
            vec![
                ("CHG-001".to_string(), "l-shared"),
                ("CHG-002".to_string(), "l-insert"),
                ("CHG-003".to_string(), "p-delete"),
            ]
        );
    }

    #[test]
    fn drops_empty_anchors() {
        let llm = vec![
            change(1, "blank", Edit::delete("   ")),
            change(2, "ok", Edit::delete("4.")),
            change(3, "section", Edit::section("", vec!["Текст".into()])),
        ];
        let plan = ChangeMerger::new().merge(Vec::new(), llm);
        let ops: Vec<_> = plan.iter().map(Change::operation).collect();
        assert_eq!(ops, vec![ChangeOperation::DeleteParagraph, ChangeOperation::InsertSection]);
    }

    #[test]
    fn payload_difference_beyond_prefix_collapses() {
        let a = change(1, "a", Edit::replace_point("5.", "abcdef"));
        let b = change(1, "b", Edit::replace_point("5.", "abcxyz"));
        assert_eq!(ChangeMerger::new().merge(vec![a.clone()], vec![b.clone()]).len(), 2);
        assert_eq!(
            ChangeMerger::new()
                .with_payload_prefix(3)
                .merge(vec![a], vec![b])
                .len(),
            1
        );
    }

    fn arb_change() -> impl Strategy<Value = Change> {
        let word = prop::sample::select(vec!["Компания", "компания", "Общество", "30.", "12.", " 5. "]);
        let payload = prop::sample::select(vec!["", "Общество", "Новый текст", "новый  текст"]);
        (0..4u8, word, payload).prop_map(|(op, anchor, payload)| {
            let edit = match op {
                0 => Edit::replace_all(anchor, payload),
                1 => Edit::delete(anchor),
                2 => Edit::replace_point(anchor, payload),
                _ => Edit::insert_after(anchor, payload),
            };
            Change::new(ChangeId::sequential(1), "generated", edit)
        })
    }

    fn keys(changes: &[Change]) -> BTreeSet<DedupKey> {
        changes
            .iter()
            .map(|c| DedupKey::of(c, DEFAULT_PAYLOAD_PREFIX))
            .collect()
    }

    proptest! {
        #[test]
        fn merging_list_with_itself_does_not_grow(list in prop::collection::vec(arb_change(), 0..12)) {
            let merger = ChangeMerger::new();
            let once = merger.merge(list.clone(), list.clone());
            let twice = merger.merge(once.clone(), once.clone());

            prop_assert_eq!(keys(&once), keys(&list));
            prop_assert_eq!(once.len(), keys(&list).len());
            prop_assert_eq!(twice.len(), once.len());
        }

        #[test]
        fn ids_are_sequential_and_unique(
            pattern in prop::collection::vec(arb_change(), 0..8),
            llm in prop::collection::vec(arb_change(), 0..8),
        ) {
            let plan = ChangeMerger::new().merge(pattern, llm);
            for (idx, change) in plan.iter().enumerate() {
                prop_assert_eq!(change.change_id.clone(), ChangeId::sequential(idx + 1));
            }
        }
    }
}
