//! Language-model instruction extraction
//!
//! Sends the instruction text (plus the pattern pass's candidates as
//! context) to a [`CompletionClient`] and turns the JSON answer into typed
//! changes. The answer is treated as untrusted:
//!
//! - code fences, trailing commas and surrounding prose are repaired away
//! - every entry is validated on its own; bad entries are logged and dropped
//! - a response with no usable structure is an [`ExtractionError`], which
//!   callers treat as "continue with pattern results only"

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use amend_change::{Change, RawChange};

use crate::completion::{CompletionClient, TokenUsage};
use crate::error::ExtractionError;
use crate::prompt::PromptTemplates;

static TRAILING_COMMA: Lazy<Regex> = Lazy::new(|| match Regex::new(r",\s*([}\]])") {
    Ok(re) => re,
    Err(err) => unreachable!("invalid built-in pattern: {err}"),
});

/// Words whose presence suggests an instruction; used to flag answers that
/// look too short for the input
const INSTRUCTION_KEYWORDS: &[&str] = &[
    "заменить",
    "исключить",
    "изложить",
    "добавить",
    "удалить",
    "изменить",
    "в редакции",
    "в новой редакции",
    "в следующей редакции",
    "пункт",
    "раздел",
    "подпункт",
];

/// Result of one semantic extraction
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SemanticExtraction {
    /// Valid changes in answer order
    pub changes: Vec<Change>,
    /// Tokens spent on the call
    pub usage: TokenUsage,
    /// Entries dropped by validation
    pub discarded: usize,
    /// The input mentions many more instruction keywords than changes returned
    pub possibly_incomplete: bool,
}

/// Extractor backed by a language-model completion capability
#[derive(Clone)]
pub struct SemanticExtractor {
    client: Arc<dyn CompletionClient>,
    prompts: PromptTemplates,
}

impl SemanticExtractor {
    /// Create with built-in prompt templates
    #[must_use]
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            prompts: PromptTemplates::default(),
        }
    }

    /// Use custom prompt templates
    #[inline]
    #[must_use]
    pub fn with_prompts(mut self, prompts: PromptTemplates) -> Self {
        self.prompts = prompts;
        self
    }

    /// Extract changes from `instruction_text`, given the pattern pass's `seed`
    ///
    /// # Errors
    /// Returns error when the completion call fails or its answer has no
    /// parseable `changes` list.
    pub async fn extract(
        &self,
        instruction_text: &str,
        seed: &[Change],
    ) -> Result<SemanticExtraction, ExtractionError> {
        let user = self.prompts.render_user(instruction_text, seed);
        tracing::info!(
            model = self.client.model(),
            instruction_chars = instruction_text.chars().count(),
            seed = seed.len(),
            "semantic extraction started"
        );

        let completion = self.client.complete(&self.prompts.system, &user).await?;
        let entries = parse_changes(&completion.content)?;
        let received = entries.len();

        let mut changes = Vec::with_capacity(received);
        let mut discarded = 0;
        for (idx, entry) in entries.into_iter().enumerate() {
            match candidate(entry, idx + 1) {
                Ok(change) => changes.push(change),
                Err(reason) => {
                    discarded += 1;
                    tracing::warn!(entry = idx + 1, %reason, "discarding malformed candidate");
                }
            }
        }

        let keywords = keyword_count(instruction_text);
        let possibly_incomplete = keywords > changes.len() * 2;
        if changes.is_empty() {
            tracing::warn!(
                instruction_chars = instruction_text.chars().count(),
                "language model returned no changes"
            );
        } else if possibly_incomplete {
            tracing::warn!(
                keywords,
                changes = changes.len(),
                "instruction text mentions many more keywords than changes returned; some instructions may be missing"
            );
        }

        tracing::info!(
            accepted = changes.len(),
            received,
            total_tokens = completion.usage.total_tokens,
            "semantic extraction finished"
        );

        Ok(SemanticExtraction {
            changes,
            usage: completion.usage,
            discarded,
            possibly_incomplete,
        })
    }
}

/// Validate one answer entry
fn candidate(entry: Value, position: usize) -> Result<Change, String> {
    if !entry.is_object() {
        return Err("entry is not an object".to_string());
    }
    let mut raw: RawChange = serde_json::from_value(entry).map_err(|e| e.to_string())?;

    if raw.operation.trim().eq_ignore_ascii_case("REPLACE_TEXT") {
        let description = raw.description.to_lowercase();
        if let Some(target) = raw.target.as_mut() {
            let global = description.contains("по всему тексту") || target.match_case == Some(false);
            if target.replace_all.is_none() && global {
                target.replace_all = Some(true);
            }
        }
    }

    raw.validate(position).map_err(|e| e.to_string())
}

/// Number of distinct instruction keywords present in the text
fn keyword_count(text: &str) -> usize {
    let lower = text.to_lowercase();
    INSTRUCTION_KEYWORDS
        .iter()
        .filter(|keyword| lower.contains(*keyword))
        .count()
}

/// Repair a model answer and return its `changes` entries
///
/// Accepts `{"changes": [...]}` or a bare array.
///
/// # Errors
/// Returns error when no JSON can be recovered or `changes` is not a list.
pub fn parse_changes(content: &str) -> Result<Vec<Value>, ExtractionError> {
    let value = repair_json(content)?;
    let changes = match value {
        Value::Array(items) => return Ok(items),
        Value::Object(mut map) => map.remove("changes").unwrap_or(Value::Null),
        other => other,
    };
    match changes {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        Value::Bool(_) => Err(ExtractionError::NotAList("bool")),
        Value::Number(_) => Err(ExtractionError::NotAList("number")),
        Value::String(_) => Err(ExtractionError::NotAList("string")),
        Value::Object(_) => Err(ExtractionError::NotAList("object")),
    }
}

/// Parse model output as JSON, repairing common defects
///
/// # Errors
/// Returns error when none of the repair strategies produce valid JSON.
pub fn repair_json(content: &str) -> Result<Value, ExtractionError> {
    let cleaned = strip_code_fence(content.trim());

    let first_error = match serde_json::from_str(cleaned) {
        Ok(value) => return Ok(value),
        Err(err) => err,
    };

    let without_commas = TRAILING_COMMA.replace_all(cleaned, "$1");
    if let Ok(value) = serde_json::from_str(&without_commas) {
        tracing::info!("model answer repaired: trailing commas removed");
        return Ok(value);
    }

    if let Some(object) = first_balanced_object(&without_commas) {
        if let Ok(value) = serde_json::from_str(object) {
            tracing::info!("model answer repaired: JSON object extracted from text");
            return Ok(value);
        }
    }

    let preview: String = cleaned.chars().take(200).collect();
    tracing::warn!(error = %first_error, %preview, "model answer is not valid JSON");
    Err(ExtractionError::Unparseable(first_error.to_string()))
}

fn strip_code_fence(content: &str) -> &str {
    let Some(rest) = content.strip_prefix("```") else {
        return content;
    };
    // Drop the language tag line, then the closing fence if present.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// First `{...}` span with balanced braces, ignoring braces inside strings
fn first_balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..=start + offset]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::{Completion, MockCompletionClient};
    use crate::error::CompletionError;
    use amend_change::{ChangeOperation, Edit};
    use pretty_assertions::assert_eq;

    fn extractor_answering(content: &'static str) -> SemanticExtractor {
        let mut mock = MockCompletionClient::new();
        mock.expect_model().return_const("gpt-4o".to_string());
        mock.expect_complete().times(1).returning(move |_, _| {
            Ok(Completion {
                content: content.to_string(),
                usage: TokenUsage::new(1200, 300),
            })
        });
        SemanticExtractor::new(Arc::new(mock))
    }

    #[test]
    fn strips_fences() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n[]\n```"), "[]");
        assert_eq!(strip_code_fence("{}"), "{}");
    }

    #[test]
    fn repairs_trailing_commas() {
        let value = repair_json(r#"{"changes": [{"operation": "X",},],}"#).unwrap();
        assert_eq!(value["changes"][0]["operation"], "X");
    }

    #[test]
    fn extracts_object_from_prose() {
        let value = repair_json(r#"Вот результат: {"changes": [], "note": "a } b"} Готово."#).unwrap();
        assert_eq!(value["note"], "a } b");
    }

    #[test]
    fn hopeless_answer_is_unparseable() {
        assert!(matches!(
            repair_json("no json here"),
            Err(ExtractionError::Unparseable(_))
        ));
    }

    #[test]
    fn changes_must_be_a_list() {
        assert!(matches!(
            parse_changes(r#"{"changes": "none"}"#),
            Err(ExtractionError::NotAList("string"))
        ));
        assert_eq!(parse_changes("[]").unwrap().len(), 0);
        assert_eq!(parse_changes("{}").unwrap().len(), 0);
    }

    #[tokio::test]
    async fn malformed_entries_are_discarded() {
        let extractor = extractor_answering(
            r#"{"changes": [
                {"operation": "DELETE_PARAGRAPH", "target": {"text": "30."}, "description": "Удаление пункта 30"},
                {"operation": "MOVE_PARAGRAPH", "target": {"text": "1."}},
                "not an object",
                {"operation": "REPLACE_POINT_TEXT", "target": {"text": "5."}}
            ]}"#,
        );
        let result = extractor.extract("Пункт 30 исключить", &[]).await.unwrap();
        assert_eq!(result.changes.len(), 1);
        assert_eq!(result.discarded, 3);
        assert_eq!(result.changes[0].edit, Edit::delete("30."));
        assert_eq!(result.usage.total_tokens, 1500);
    }

    #[tokio::test]
    async fn replace_all_inferred_from_description() {
        let extractor = extractor_answering(
            r#"```json
            {"changes": [{
                "operation": "REPLACE_TEXT",
                "description": "По всему тексту заменить Компания на Общество",
                "target": {"text": "Компания", "match_case": true},
                "payload": {"new_text": "Общество"}
            }]}
            ```"#,
        );
        let result = extractor.extract("...", &[]).await.unwrap();
        match &result.changes[0].edit {
            Edit::ReplaceText { target, .. } => assert!(target.replace_all),
            other => panic!("unexpected edit {other:?}"),
        }
    }

    #[tokio::test]
    async fn explicit_replace_all_false_is_kept() {
        let extractor = extractor_answering(
            r#"{"changes": [{
                "operation": "REPLACE_TEXT",
                "description": "по всему тексту",
                "target": {"text": "a", "replace_all": false},
                "payload": {"new_text": "b"}
            }]}"#,
        );
        let result = extractor.extract("...", &[]).await.unwrap();
        assert_eq!(result.changes[0].operation(), ChangeOperation::ReplaceText);
        assert_eq!(result.changes[0].edit, Edit::replace_first("a", "b"));
    }

    #[tokio::test]
    async fn completion_failure_propagates() {
        let mut mock = MockCompletionClient::new();
        mock.expect_model().return_const("m".to_string());
        mock.expect_complete()
            .returning(|_, _| Err(CompletionError::Unavailable("offline".into())));
        let extractor = SemanticExtractor::new(Arc::new(mock));
        assert!(matches!(
            extractor.extract("text", &[]).await,
            Err(ExtractionError::Completion(_))
        ));
    }

    #[tokio::test]
    async fn sparse_answer_is_flagged() {
        let extractor = extractor_answering(
            r#"{"changes": [{"operation": "DELETE_PARAGRAPH", "target": {"text": "3."}}]}"#,
        );
        let text = "Пункт 3 исключить. Подпункт 2) изложить в следующей редакции. \
                    Раздел 4 изменить. Слова заменить. Добавить пункт.";
        let result = extractor.extract(text, &[]).await.unwrap();
        assert!(result.possibly_incomplete);
    }
}
