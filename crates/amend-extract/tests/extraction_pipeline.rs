//! Pattern and semantic passes working together

use std::sync::Arc;

use amend_change::{ChangeOperation, Edit};
use amend_extract::{
    CachedCompletionClient, Completion, CompletionClient, CompletionError, PatternExtractor,
    SemanticExtractor, TokenUsage,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

const INSTRUCTIONS: &str = "\
По всему тексту слово «Компания» заменить словом «Общество».
Пункт 30 исключить.
Абзац второй пункта 14 после слов «в течение» дополнить словами «пяти рабочих дней».
Пункт 12 изложить в следующей редакции:
«12. Общество ведет учет.»";

/// Answers with a fixed body and records the user prompt it saw
struct Recording {
    answer: String,
    last_user: Mutex<String>,
}

impl Recording {
    fn new(answer: &str) -> Self {
        Self {
            answer: answer.to_string(),
            last_user: Mutex::new(String::new()),
        }
    }
}

#[async_trait]
impl CompletionClient for Recording {
    async fn complete(&self, _system: &str, user: &str) -> Result<Completion, CompletionError> {
        *self.last_user.lock() = user.to_string();
        Ok(Completion {
            content: self.answer.clone(),
            usage: TokenUsage::new(500, 120),
        })
    }

    fn model(&self) -> &str {
        "recording"
    }
}

#[test]
fn pattern_pass_finds_the_common_phrasings() {
    let changes = PatternExtractor::new().extract(INSTRUCTIONS);
    let ops: Vec<_> = changes.iter().map(|c| c.operation()).collect();
    assert_eq!(
        ops,
        vec![
            ChangeOperation::ReplaceText,
            ChangeOperation::DeleteParagraph,
            ChangeOperation::ReplacePointText,
        ]
    );
    assert_eq!(changes[2].edit, Edit::replace_point("12.", "12. Общество ведет учет."));
}

#[tokio::test]
async fn semantic_pass_sees_seed_and_covers_the_rest() {
    let answer = r#"{"changes": [
        {"change_id": "CHG-001", "description": "Замена по всему тексту", "operation": "REPLACE_TEXT",
         "target": {"text": "Компания", "match_case": false}, "payload": {"new_text": "Общество"}},
        {"change_id": "CHG-002", "description": "Дополнение пункта 14", "operation": "REPLACE_TEXT",
         "target": {"text": "в течение", "match_case": true, "replace_all": false},
         "payload": {"new_text": "в течение пяти рабочих дней"}}
    ]}"#;
    let client = Arc::new(Recording::new(answer));

    let seed = PatternExtractor::new().extract(INSTRUCTIONS);
    let result = SemanticExtractor::new(client.clone())
        .extract(INSTRUCTIONS, &seed)
        .await
        .unwrap();

    assert_eq!(result.changes.len(), 2);
    assert_eq!(result.changes[0].edit, Edit::replace_all("Компания", "Общество"));
    assert_eq!(result.usage.total_tokens, 620);
    assert!(client.last_user.lock().contains("CHG-002 DELETE_PARAGRAPH"));
}

#[tokio::test]
async fn cached_client_spends_tokens_once() {
    let inner = Recording::new(r#"{"changes": []}"#);
    let cached = Arc::new(CachedCompletionClient::new(inner, 4));
    let extractor = SemanticExtractor::new(cached);

    let first = extractor.extract(INSTRUCTIONS, &[]).await.unwrap();
    let second = extractor.extract(INSTRUCTIONS, &[]).await.unwrap();

    assert_eq!(first.usage.total_tokens, 620);
    assert_eq!(second.usage, TokenUsage::default());
}
