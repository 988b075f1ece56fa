//! JSON wire schema for changes
//!
//! The external form mirrors what extractors and the language model speak:
//!
//! ```json
//! {
//!   "change_id": "CHG-001",
//!   "description": "Массовая замена",
//!   "operation": "REPLACE_TEXT",
//!   "target": {"text": "Компания", "replace_all": true, "match_case": false},
//!   "payload": {"new_text": "Общество"},
//!   "annotation": true
//! }
//! ```
//!
//! [`RawChange`] accepts that shape loosely; [`RawChange::validate`] turns it
//! into a typed [`Change`] or says why it cannot.

use crate::change::{Anchor, Change, Edit, TextTarget};
use crate::error::ChangeError;
use crate::id::ChangeId;
use crate::operation::ChangeOperation;

const fn default_true() -> bool {
    true
}

/// Target block of the wire form
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RawTarget {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replace_all: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_case: Option<bool>,
}

/// Payload block of the wire form
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RawPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_level: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraphs: Option<Vec<String>>,
}

/// Loosely-typed change as exchanged in JSON
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RawChange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_id: Option<String>,
    #[serde(default)]
    pub description: String,
    pub operation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<RawTarget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<RawPayload>,
    #[serde(default = "default_true", alias = "annotate")]
    pub annotation: bool,
}

impl RawChange {
    /// Validate into a typed change
    ///
    /// `position` (1-based) supplies a `CHG-###` id when none is given.
    ///
    /// # Errors
    /// Returns error for unknown operations and for fields the operation
    /// requires but the candidate lacks.
    pub fn validate(self, position: usize) -> Result<Change, ChangeError> {
        let operation: ChangeOperation = self.operation.parse()?;
        let target = self.target.unwrap_or_default();
        let payload = self.payload.unwrap_or_default();
        let match_case = target.match_case.unwrap_or(false);

        let anchor = |field: Option<String>, name: &'static str| {
            field
                .map(|text| Anchor { text, match_case })
                .ok_or_else(|| ChangeError::missing(operation, name))
        };

        let edit = match operation {
            ChangeOperation::ReplaceText => Edit::ReplaceText {
                target: TextTarget {
                    text: target
                        .text
                        .ok_or_else(|| ChangeError::missing(operation, "target.text"))?,
                    replace_all: target.replace_all.unwrap_or(false),
                    match_case,
                },
                new_text: payload
                    .new_text
                    .ok_or_else(|| ChangeError::missing(operation, "payload.new_text"))?,
            },
            ChangeOperation::DeleteParagraph => Edit::DeleteParagraph {
                anchor: anchor(target.text, "target.text")?,
            },
            ChangeOperation::ReplacePointText => Edit::ReplacePointText {
                anchor: anchor(target.text, "target.text")?,
                new_text: payload
                    .new_text
                    .ok_or_else(|| ChangeError::missing(operation, "payload.new_text"))?,
            },
            ChangeOperation::InsertParagraph => Edit::InsertParagraph {
                after: anchor(target.after_text.or(target.text), "target.after_text")?,
                text: payload
                    .text
                    .or(payload.new_text)
                    .ok_or_else(|| ChangeError::missing(operation, "payload.text"))?,
            },
            ChangeOperation::InsertSection => {
                let heading_text = payload
                    .heading_text
                    .ok_or_else(|| ChangeError::missing(operation, "payload.heading_text"))?;
                let heading_level = payload.heading_level.unwrap_or(1);
                if heading_level == 0 {
                    return Err(ChangeError::invalid(
                        "payload.heading_level",
                        "heading level starts at 1",
                    ));
                }
                Edit::InsertSection {
                    heading_text,
                    heading_level,
                    paragraphs: payload.paragraphs.unwrap_or_default(),
                }
            }
        };

        let change_id = self
            .change_id
            .filter(|id| !id.trim().is_empty())
            .map_or_else(|| ChangeId::sequential(position), ChangeId::new);

        Ok(Change {
            change_id,
            description: self.description,
            edit,
            annotate: self.annotation,
        })
    }
}

impl From<&Change> for RawChange {
    fn from(change: &Change) -> Self {
        let mut target = RawTarget::default();
        let mut payload = RawPayload::default();

        match &change.edit {
            Edit::ReplaceText { target: t, new_text } => {
                target.text = Some(t.text.clone());
                target.replace_all = Some(t.replace_all);
                target.match_case = Some(t.match_case);
                payload.new_text = Some(new_text.clone());
            }
            Edit::DeleteParagraph { anchor } => {
                target.text = Some(anchor.text.clone());
                target.match_case = Some(anchor.match_case);
            }
            Edit::ReplacePointText { anchor, new_text } => {
                target.text = Some(anchor.text.clone());
                target.match_case = Some(anchor.match_case);
                payload.new_text = Some(new_text.clone());
            }
            Edit::InsertParagraph { after, text } => {
                target.after_text = Some(after.text.clone());
                target.match_case = Some(after.match_case);
                payload.text = Some(text.clone());
            }
            Edit::InsertSection {
                heading_text,
                heading_level,
                paragraphs,
            } => {
                payload.heading_text = Some(heading_text.clone());
                payload.heading_level = Some(*heading_level);
                payload.paragraphs = Some(paragraphs.clone());
            }
        }

        let has_target = target != RawTarget::default();
        let has_payload = payload != RawPayload::default();
        Self {
            change_id: Some(change.change_id.to_string()),
            description: change.description.clone(),
            operation: change.operation().to_string(),
            target: has_target.then_some(target),
            payload: has_payload.then_some(payload),
            annotation: change.annotate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn raw(json: &str) -> RawChange {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn validates_replace_text() {
        let change = raw(r#"{
            "change_id": "CHG-004",
            "description": "Массовая замена",
            "operation": "REPLACE_TEXT",
            "target": {"text": "Компания", "replace_all": true, "match_case": false},
            "payload": {"new_text": "Общество"},
            "annotation": true
        }"#)
        .validate(1)
        .unwrap();

        assert_eq!(change.change_id.as_str(), "CHG-004");
        assert_eq!(change.edit, Edit::replace_all("Компания", "Общество"));
        assert!(change.annotate);
    }

    #[test]
    fn missing_id_uses_position() {
        let change = raw(r#"{"operation": "DELETE_PARAGRAPH", "target": {"text": "30."}}"#)
            .validate(3)
            .unwrap();
        assert_eq!(change.change_id.as_str(), "CHG-003");
        assert_eq!(change.edit, Edit::delete("30."));
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let err = raw(r#"{"operation": "MERGE_CELLS"}"#).validate(1).unwrap_err();
        assert_eq!(err, ChangeError::UnknownOperation("MERGE_CELLS".into()));
    }

    #[test]
    fn missing_payload_is_rejected() {
        let err = raw(r#"{"operation": "REPLACE_POINT_TEXT", "target": {"text": "5."}}"#)
            .validate(1)
            .unwrap_err();
        assert_eq!(
            err,
            ChangeError::missing(ChangeOperation::ReplacePointText, "payload.new_text")
        );
    }

    #[test]
    fn null_blocks_count_as_missing() {
        let err = raw(r#"{"operation": "DELETE_PARAGRAPH", "target": null}"#)
            .validate(1)
            .unwrap_err();
        assert!(matches!(err, ChangeError::MissingField { .. }));
    }

    #[test]
    fn section_defaults_heading_level() {
        let change = raw(r#"{
            "operation": "INSERT_SECTION",
            "payload": {"heading_text": "Приложение №3", "paragraphs": ["a", "b"]}
        }"#)
        .validate(1)
        .unwrap();
        assert_eq!(
            change.edit,
            Edit::section("Приложение №3", vec!["a".into(), "b".into()])
        );

        let err = raw(r#"{"operation": "INSERT_SECTION", "payload": {"heading_text": "x", "heading_level": 0}}"#)
            .validate(1)
            .unwrap_err();
        assert!(matches!(err, ChangeError::InvalidField { .. }));
    }

    #[test]
    fn typed_change_converts_back_to_wire_form() {
        let change = Change::new(
            ChangeId::sequential(2),
            "Добавление пункта 61",
            Edit::insert_after("60.", "61. Новый пункт"),
        )
        .with_annotate(false);
        let wire = RawChange::from(&change);
        assert_eq!(wire.target.as_ref().and_then(|t| t.after_text.as_deref()), Some("60."));
        assert!(!wire.annotation);
        assert_eq!(wire.validate(9).unwrap(), change);
    }
}
