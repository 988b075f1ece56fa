//! The change model
//!
//! A [`Change`] is one typed, anchor-addressed edit. Its [`Edit`] variant
//! carries exactly the target and payload fields its operation needs, so a
//! change that type-checks is structurally complete. The only invariant left
//! to runtime is that anchors are non-empty after normalization (see
//! [`Change::has_usable_anchor`]).

use crate::id::ChangeId;
use crate::normalize::normalize;
use crate::operation::ChangeOperation;

/// Literal search target of a text replacement
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TextTarget {
    /// Literal to find
    pub text: String,
    /// Replace every occurrence instead of the first
    pub replace_all: bool,
    /// Case-sensitive matching
    pub match_case: bool,
}

/// Literal fragment that identifies a paragraph
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Anchor {
    /// Fragment to look for, e.g. `30.` or `3)`
    pub text: String,
    /// Case-sensitive matching
    pub match_case: bool,
}

impl Anchor {
    /// Case-insensitive anchor
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            match_case: false,
        }
    }
}

/// Operation-specific target and payload
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "operation", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Edit {
    /// Substitute literal text
    ReplaceText { target: TextTarget, new_text: String },
    /// Delete the paragraph holding the anchor
    DeleteParagraph { anchor: Anchor },
    /// Rewrite the paragraph holding the anchor
    ReplacePointText { anchor: Anchor, new_text: String },
    /// Insert a paragraph after the one holding the anchor
    InsertParagraph { after: Anchor, text: String },
    /// Append a heading and paragraphs at the end of the document
    InsertSection {
        heading_text: String,
        heading_level: u8,
        paragraphs: Vec<String>,
    },
}

impl Edit {
    /// Replace every occurrence of `old` (case-insensitive)
    #[must_use]
    pub fn replace_all(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self::ReplaceText {
            target: TextTarget {
                text: old.into(),
                replace_all: true,
                match_case: false,
            },
            new_text: new.into(),
        }
    }

    /// Replace the first occurrence of `old` (case-insensitive)
    #[must_use]
    pub fn replace_first(old: impl Into<String>, new: impl Into<String>) -> Self {
        Self::ReplaceText {
            target: TextTarget {
                text: old.into(),
                replace_all: false,
                match_case: false,
            },
            new_text: new.into(),
        }
    }

    /// Delete the paragraph holding `anchor`
    #[must_use]
    pub fn delete(anchor: impl Into<String>) -> Self {
        Self::DeleteParagraph {
            anchor: Anchor::new(anchor),
        }
    }

    /// Rewrite the paragraph holding `anchor`
    #[must_use]
    pub fn replace_point(anchor: impl Into<String>, new_text: impl Into<String>) -> Self {
        Self::ReplacePointText {
            anchor: Anchor::new(anchor),
            new_text: new_text.into(),
        }
    }

    /// Insert `text` after the paragraph holding `anchor`
    #[must_use]
    pub fn insert_after(anchor: impl Into<String>, text: impl Into<String>) -> Self {
        Self::InsertParagraph {
            after: Anchor::new(anchor),
            text: text.into(),
        }
    }

    /// Append a level-1 section
    #[must_use]
    pub fn section(heading: impl Into<String>, paragraphs: Vec<String>) -> Self {
        Self::InsertSection {
            heading_text: heading.into(),
            heading_level: 1,
            paragraphs,
        }
    }

    /// Operation this edit performs
    #[must_use]
    pub const fn operation(&self) -> ChangeOperation {
        match self {
            Self::ReplaceText { .. } => ChangeOperation::ReplaceText,
            Self::DeleteParagraph { .. } => ChangeOperation::DeleteParagraph,
            Self::ReplacePointText { .. } => ChangeOperation::ReplacePointText,
            Self::InsertParagraph { .. } => ChangeOperation::InsertParagraph,
            Self::InsertSection { .. } => ChangeOperation::InsertSection,
        }
    }

    /// Text used to locate the edit; the heading for sections
    #[must_use]
    pub fn anchor_text(&self) -> &str {
        match self {
            Self::ReplaceText { target, .. } => &target.text,
            Self::DeleteParagraph { anchor } | Self::ReplacePointText { anchor, .. } => {
                &anchor.text
            }
            Self::InsertParagraph { after, .. } => &after.text,
            Self::InsertSection { heading_text, .. } => heading_text,
        }
    }

    /// Case sensitivity of the anchor
    #[must_use]
    pub fn match_case(&self) -> bool {
        match self {
            Self::ReplaceText { target, .. } => target.match_case,
            Self::DeleteParagraph { anchor } | Self::ReplacePointText { anchor, .. } => {
                anchor.match_case
            }
            Self::InsertParagraph { after, .. } => after.match_case,
            Self::InsertSection { .. } => false,
        }
    }

    /// New content carried by the edit; empty for deletions
    #[must_use]
    pub fn payload_text(&self) -> String {
        match self {
            Self::ReplaceText { new_text, .. } | Self::ReplacePointText { new_text, .. } => {
                new_text.clone()
            }
            Self::DeleteParagraph { .. } => String::new(),
            Self::InsertParagraph { text, .. } => text.clone(),
            Self::InsertSection { paragraphs, .. } => paragraphs.join("\n"),
        }
    }
}

/// One unit of work in a change plan
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Change {
    /// Plan-unique id, `CHG-###`
    pub change_id: ChangeId,
    /// Human-readable summary fixed at extraction time
    pub description: String,
    /// What to do and where
    #[serde(flatten)]
    pub edit: Edit,
    /// Whether a provenance annotation is written after applying
    pub annotate: bool,
}

impl Change {
    /// Create an annotated change
    #[must_use]
    pub fn new(change_id: ChangeId, description: impl Into<String>, edit: Edit) -> Self {
        Self {
            change_id,
            description: description.into(),
            edit,
            annotate: true,
        }
    }

    /// Set whether the change is annotated
    #[inline]
    #[must_use]
    pub fn with_annotate(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    /// Replace the id, keeping everything else
    #[inline]
    #[must_use]
    pub fn with_id(mut self, change_id: ChangeId) -> Self {
        self.change_id = change_id;
        self
    }

    /// Operation performed
    #[inline]
    #[must_use]
    pub const fn operation(&self) -> ChangeOperation {
        self.edit.operation()
    }

    /// False when an anchored change has nothing left to search for
    ///
    /// Sections are positioned at the end of the document and never fail
    /// this check.
    #[must_use]
    pub fn has_usable_anchor(&self) -> bool {
        if !self.operation().is_anchored() {
            return true;
        }
        !normalize(self.edit.anchor_text(), self.edit.match_case()).is_empty()
    }
}
