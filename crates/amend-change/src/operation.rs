//! Change operation taxonomy

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use crate::error::ChangeError;

/// Kind of edit a change performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeOperation {
    /// Literal substitution, once or everywhere
    ReplaceText,
    /// Remove the paragraph holding an anchor
    DeleteParagraph,
    /// Rewrite the whole paragraph holding a point marker
    ReplacePointText,
    /// Insert a paragraph after an anchor
    InsertParagraph,
    /// Append a heading and its paragraphs at the end
    InsertSection,
}

impl ChangeOperation {
    /// Every operation, in taxonomy order
    pub const ALL: [Self; 5] = [
        Self::ReplaceText,
        Self::DeleteParagraph,
        Self::ReplacePointText,
        Self::InsertParagraph,
        Self::InsertSection,
    ];

    /// Wire name, e.g. `REPLACE_TEXT`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReplaceText => "REPLACE_TEXT",
            Self::DeleteParagraph => "DELETE_PARAGRAPH",
            Self::ReplacePointText => "REPLACE_POINT_TEXT",
            Self::InsertParagraph => "INSERT_PARAGRAPH",
            Self::InsertSection => "INSERT_SECTION",
        }
    }

    /// True if the operation locates its position through an anchor
    #[must_use]
    pub const fn is_anchored(self) -> bool {
        !matches!(self, Self::InsertSection)
    }
}

impl Display for ChangeOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeOperation {
    type Err = ChangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| ChangeError::UnknownOperation(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_wire_names_case_insensitively() {
        for op in ChangeOperation::ALL {
            assert_eq!(op.as_str().parse::<ChangeOperation>().unwrap(), op);
        }
        assert_eq!(
            " replace_text ".parse::<ChangeOperation>().unwrap(),
            ChangeOperation::ReplaceText
        );
        assert!(matches!(
            "MOVE_PARAGRAPH".parse::<ChangeOperation>(),
            Err(ChangeError::UnknownOperation(_))
        ));
    }

    #[test]
    fn serde_matches_display() {
        let json = serde_json::to_string(&ChangeOperation::ReplacePointText).unwrap();
        assert_eq!(json, "\"REPLACE_POINT_TEXT\"");
        assert!(!ChangeOperation::InsertSection.is_anchored());
    }
}
