//! Text normalization and dedup keys
//!
//! Two candidates describe the same edit when their [`DedupKey`]s are
//! equal: same operation, same normalized anchor, and the same normalized
//! payload prefix.

use crate::change::Change;
use crate::operation::ChangeOperation;

/// Default number of payload characters that take part in a dedup key
pub const DEFAULT_PAYLOAD_PREFIX: usize = 100;

/// Collapse whitespace runs to single spaces, trim, and lowercase unless
/// `match_case` is set
#[must_use]
pub fn normalize(text: &str, match_case: bool) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if match_case {
        collapsed
    } else {
        collapsed.to_lowercase()
    }
}

/// Fingerprint used to collapse equivalent candidates
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DedupKey {
    /// Operation of the change
    pub operation: ChangeOperation,
    /// Normalized anchor (heading text for sections)
    pub anchor: String,
    /// First `N` characters of the normalized payload
    pub payload_prefix: String,
}

impl DedupKey {
    /// Derive the key of a change, keeping `prefix_chars` payload characters
    #[must_use]
    pub fn of(change: &Change, prefix_chars: usize) -> Self {
        let match_case = change.edit.match_case();
        let payload = normalize(&change.edit.payload_text(), match_case);
        Self {
            operation: change.operation(),
            anchor: normalize(change.edit.anchor_text(), match_case),
            payload_prefix: payload.chars().take(prefix_chars).collect(),
        }
    }
}
