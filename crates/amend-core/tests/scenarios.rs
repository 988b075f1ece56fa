//! End-to-end scenarios: instruction text in, amended document and report out.

use std::sync::Arc;

use amend_change::{ChangeOperation, Edit};
use amend_core::{AmendConfig, ChangeStatus, DocumentProcessor, ProgressEvent};
use amend_document::Document;
use amend_extract::{PatternExtractor, SemanticExtractor, TokenUsage};
use amend_test_utils::{long_regulation, store_with, ScriptedCompletion};
use pretty_assertions::assert_eq;

const MASS_REPLACE: &str = "По всему тексту слово «Компания» заменить словом «Общество»";

const LLM_ANSWER: &str = r#"```json
{
  "changes": [
    {
      "change_id": "CHG-001",
      "operation": "REPLACE_TEXT",
      "description": "Замена слова «Компания» на «Общество» по всему тексту",
      "target": {"text": "Компания", "replace_all": true, "match_case": false},
      "payload": {"new_text": "Общество"},
    },
    {
      "change_id": "CHG-002",
      "operation": "INSERT_PARAGRAPH",
      "description": "Новый абзац после пункта 2",
      "target": {"after_text": "2."},
      "payload": {"text": "2-1. Общество ведет реестр участников."}
    }
  ]
}
```"#;

fn semantic(client: ScriptedCompletion) -> SemanticExtractor {
    SemanticExtractor::new(Arc::new(client))
}

#[tokio::test]
async fn mass_replacement_over_three_paragraphs() {
    let changes = PatternExtractor::new().extract(MASS_REPLACE);
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].edit, Edit::replace_all("Компания", "Общество"));

    let (store, id) = store_with(
        "charter",
        Document::from_lines([
            "1. Компания создается на неопределенный срок.",
            "2. Компания имеет печать.",
            "3. Компания отвечает по своим обязательствам.",
        ]),
    );
    let report = DocumentProcessor::new(store.clone(), AmendConfig::new())
        .process(&id, MASS_REPLACE)
        .await
        .unwrap();

    assert_eq!(report.total_changes, 1);
    let outcome = &report.changes[0];
    assert_eq!(outcome.status, ChangeStatus::Success);
    assert_eq!(outcome.details.matches_found, 3);
    assert_eq!(outcome.details.replacements_made, 3);
    assert!(!store.get(&id).unwrap().text().contains("Компания"));
}

#[tokio::test]
async fn point_deletion_removes_paragraph_45() {
    let (store, id) = store_with("regulation", long_regulation());
    let before = store.get(&id).unwrap();
    assert_eq!(before.paragraphs()[45].text, "30. Текст пункта.");

    let report = DocumentProcessor::new(store.clone(), AmendConfig::new())
        .process(&id, "Пункт 30 исключить")
        .await
        .unwrap();

    let outcome = &report.changes[0];
    assert_eq!(outcome.operation, ChangeOperation::DeleteParagraph);
    assert_eq!(outcome.status, ChangeStatus::Success);
    assert_eq!(outcome.details.paragraph_index, Some(45));

    let after = store.get(&id).unwrap();
    assert_eq!(after.len(), before.len() - 1);
    assert_eq!(after.paragraphs()[45].text, "31. Следующий пункт.");
    assert!(after.find("30. Текст пункта.", true).is_empty());
}

#[tokio::test]
async fn identical_candidates_keep_the_semantic_version() {
    let (store, _id) = store_with("unused", Document::new());
    let processor = DocumentProcessor::new(store, AmendConfig::new())
        .with_semantic(semantic(ScriptedCompletion::answering(LLM_ANSWER, TokenUsage::new(500, 120))));

    let plan = processor.plan(MASS_REPLACE).await;

    assert_eq!(plan.pattern_candidates, 1);
    assert_eq!(plan.semantic_candidates, 2);
    let replacements: Vec<_> = plan
        .changes
        .iter()
        .filter(|c| c.operation() == ChangeOperation::ReplaceText)
        .collect();
    assert_eq!(replacements.len(), 1);
    assert_eq!(
        replacements[0].description,
        "Замена слова «Компания» на «Общество» по всему тексту"
    );
    let ids: Vec<_> = plan.changes.iter().map(|c| c.change_id.as_str()).collect();
    assert_eq!(ids, vec!["CHG-001", "CHG-002"]);
}

#[tokio::test]
async fn semantic_changes_are_applied_and_usage_reported() {
    let (store, id) = store_with(
        "charter",
        Document::from_lines(["1. Компания создана.", "2. Компания вправе.", "3. Прочее."]),
    );
    let events = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let sink = {
        let events = Arc::clone(&events);
        move |event: ProgressEvent| events.lock().push(event)
    };

    let report = DocumentProcessor::new(store.clone(), AmendConfig::new())
        .with_semantic(semantic(ScriptedCompletion::answering(LLM_ANSWER, TokenUsage::new(500, 120))))
        .with_progress(Arc::new(sink))
        .process(&id, MASS_REPLACE)
        .await
        .unwrap();

    assert_eq!(report.successful, 2);
    assert_eq!(report.token_usage.total_tokens, 620);
    assert!(report.warning.is_none());

    let texts: Vec<String> = store
        .get(&id)
        .unwrap()
        .paragraphs()
        .iter()
        .map(|p| p.text.clone())
        .collect();
    assert_eq!(
        texts,
        vec![
            "1. Общество создана.",
            "2. Общество вправе.",
            "2-1. Общество ведет реестр участников.",
            "3. Прочее.",
        ]
    );

    let events = events.lock();
    let completed: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            ProgressEvent::OperationCompleted(outcome) => Some(outcome.change_id.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(completed, vec!["CHG-001", "CHG-002"]);
    assert!(matches!(events.last(), Some(ProgressEvent::Completed(r)) if r.run_id == report.run_id));
}

#[tokio::test]
async fn unavailable_model_degrades_to_patterns() {
    let (store, id) = store_with("regulation", long_regulation());
    let report = DocumentProcessor::new(store.clone(), AmendConfig::new())
        .with_semantic(semantic(ScriptedCompletion::unavailable()))
        .process(&id, "Пункт 31 исключить.")
        .await
        .unwrap();

    assert_eq!(report.successful, 1);
    assert_eq!(report.token_usage, TokenUsage::default());
    let warning = report.warning.unwrap();
    assert!(warning.contains("semantic extraction unavailable"), "{warning}");
}

#[tokio::test]
async fn unparseable_answer_degrades_to_patterns() {
    let (store, id) = store_with("regulation", long_regulation());
    let report = DocumentProcessor::new(store.clone(), AmendConfig::new())
        .with_semantic(semantic(ScriptedCompletion::answering(
            "Извините, не могу помочь.",
            TokenUsage::new(10, 5),
        )))
        .process(&id, "Пункт 32 исключить.")
        .await
        .unwrap();

    assert_eq!(report.total_changes, 1);
    assert_eq!(report.successful, 1);
    assert!(report.warning.is_some());
}

#[tokio::test]
async fn report_lists_failures_without_erroring() {
    let (store, id) = store_with("regulation", long_regulation());
    let report = DocumentProcessor::new(store, AmendConfig::new().with_annotate(false))
        .process(&id, "Пункт 77 исключить.\nПункт 30 исключить.")
        .await
        .unwrap();

    assert_eq!(report.total_changes, 2);
    assert_eq!(report.successful, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.changes[0].status, ChangeStatus::Failed);
    assert!(!report.changes[1].details.annotated);
}
