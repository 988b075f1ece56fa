//! Testing utilities for the amend workspace
//!
//! Shared fixtures, a scripted completion client and a fault-injecting
//! document accessor.

#![allow(missing_docs)]

use std::collections::VecDeque;
use std::sync::Arc;

use amend_document::{
    AccessError, Document, DocumentAccessor, DocumentId, MemoryStore, Paragraph, Replacement,
    TextMatch,
};
use amend_extract::{Completion, CompletionClient, CompletionError, TokenUsage};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Three paragraphs mention "Компания", one does not
pub fn charter_document() -> Document {
    Document::from_paragraphs(vec![
        Paragraph::heading("Устав", 1),
        Paragraph::body("1. Компания является юридическим лицом."),
        Paragraph::body("2. Компания имеет печать."),
        Paragraph::body("3. Участники отвечают по обязательствам, Компания не отвечает."),
        Paragraph::body("4. Срок деятельности не ограничен."),
    ])
}

/// Paragraph 45 is exactly `30. Текст пункта.`
pub fn long_regulation() -> Document {
    let mut paragraphs = vec![Paragraph::heading("Положение", 1)];
    for n in 1..=44 {
        paragraphs.push(Paragraph::body(format!("Абзац {n} общих положений")));
    }
    paragraphs.push(Paragraph::body("30. Текст пункта."));
    paragraphs.push(Paragraph::body("31. Следующий пункт."));
    paragraphs.push(Paragraph::body("32. Последний пункт."));
    Document::from_paragraphs(paragraphs)
}

/// Points `1.` through `n.`, each `N. Текст пункта N`
pub fn numbered_points(n: usize) -> Document {
    Document::from_lines((1..=n).map(|i| format!("{i}. Текст пункта {i}")))
}

/// A store holding `document` under `id`
pub fn store_with(id: &str, document: Document) -> (Arc<MemoryStore>, DocumentId) {
    let store = Arc::new(MemoryStore::new());
    let id = DocumentId::new(id);
    store.insert(id.clone(), document);
    (store, id)
}

/// Completion client answering from a script
///
/// Answers are consumed in order; once the script is empty every call
/// fails with [`CompletionError::Unavailable`].
pub struct ScriptedCompletion {
    model: String,
    script: Mutex<VecDeque<Result<Completion, CompletionError>>>,
    prompts: Mutex<Vec<(String, String)>>,
}

impl ScriptedCompletion {
    /// Empty script
    pub fn new() -> Self {
        Self {
            model: "scripted".to_string(),
            script: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Client answering once with `content`
    pub fn answering(content: &str, usage: TokenUsage) -> Self {
        Self::new().then_answer(content, usage)
    }

    /// Client whose only call fails
    pub fn unavailable() -> Self {
        Self::new().then_fail(CompletionError::Unavailable("scripted outage".to_string()))
    }

    /// Queue a successful answer
    #[must_use]
    pub fn then_answer(self, content: &str, usage: TokenUsage) -> Self {
        self.script.lock().push_back(Ok(Completion {
            content: content.to_string(),
            usage,
        }));
        self
    }

    /// Queue a failure
    #[must_use]
    pub fn then_fail(self, error: CompletionError) -> Self {
        self.script.lock().push_back(Err(error));
        self
    }

    /// `(system, user)` prompt pairs received so far
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }
}

impl Default for ScriptedCompletion {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletion {
    async fn complete(&self, system: &str, user: &str) -> Result<Completion, CompletionError> {
        self.prompts
            .lock()
            .push((system.to_string(), user.to_string()));
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(CompletionError::Unavailable("script exhausted".to_string())))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// One call made through a [`FaultyAccessor`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub method: &'static str,
    pub doc: DocumentId,
}

impl Call {
    /// True for calls that change a document
    pub fn is_mutation(&self) -> bool {
        !matches!(self.method, "get_text" | "paragraphs" | "find")
    }
}

/// [`MemoryStore`] wrapper that records calls and fails on demand
pub struct FaultyAccessor {
    inner: Arc<MemoryStore>,
    fail_marker: Option<String>,
    fail_copy: bool,
    fail_comments: bool,
    fail_replace_call: Option<usize>,
    replace_hook: Option<(usize, ReplaceHook)>,
    calls: Mutex<Vec<Call>>,
}

type ReplaceHook = Box<dyn Fn() + Send + Sync>;

impl FaultyAccessor {
    /// Pass-through wrapper around `inner`
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            fail_marker: None,
            fail_copy: false,
            fail_comments: false,
            fail_replace_call: None,
            replace_hook: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Fail any call whose text argument contains `marker`
    #[must_use]
    pub fn failing_on_text(mut self, marker: impl Into<String>) -> Self {
        self.fail_marker = Some(marker.into());
        self
    }

    /// Fail every `copy`
    #[must_use]
    pub fn failing_copy(mut self) -> Self {
        self.fail_copy = true;
        self
    }

    /// Fail every `add_comment`
    #[must_use]
    pub fn failing_comments(mut self) -> Self {
        self.fail_comments = true;
        self
    }

    /// Fail the `n`th `replace` call (1-based)
    #[must_use]
    pub fn failing_replace_call(mut self, n: usize) -> Self {
        self.fail_replace_call = Some(n);
        self
    }

    /// Run `hook` once the `n`th `replace` call (1-based) has succeeded
    #[must_use]
    pub fn after_replace_call(mut self, n: usize, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.replace_hook = Some((n, Box::new(hook)));
        self
    }

    /// Every call so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    /// Wrapped store
    pub fn store(&self) -> &MemoryStore {
        &self.inner
    }

    fn record(&self, method: &'static str, doc: &DocumentId) {
        self.calls.lock().push(Call {
            method,
            doc: doc.clone(),
        });
    }

    fn check_text(&self, text: &str) -> Result<(), AccessError> {
        match self.fail_marker {
            Some(ref marker) if text.contains(marker.as_str()) => {
                Err(AccessError::backend(format!("injected failure on '{marker}'")))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl DocumentAccessor for FaultyAccessor {
    async fn get_text(&self, doc: &DocumentId) -> Result<String, AccessError> {
        self.record("get_text", doc);
        self.inner.get_text(doc).await
    }

    async fn paragraphs(&self, doc: &DocumentId) -> Result<Vec<Paragraph>, AccessError> {
        self.record("paragraphs", doc);
        self.inner.paragraphs(doc).await
    }

    async fn find(
        &self,
        doc: &DocumentId,
        text: &str,
        match_case: bool,
    ) -> Result<Vec<TextMatch>, AccessError> {
        self.record("find", doc);
        self.check_text(text)?;
        self.inner.find(doc, text, match_case).await
    }

    async fn replace(
        &self,
        doc: &DocumentId,
        paragraph_index: usize,
        replacement: &Replacement,
    ) -> Result<usize, AccessError> {
        self.record("replace", doc);
        self.check_text(&replacement.old)?;
        let nth = self.calls.lock().iter().filter(|c| c.method == "replace").count();
        if self.fail_replace_call == Some(nth) {
            return Err(AccessError::backend(format!("injected failure on replace call {nth}")));
        }
        let count = self.inner.replace(doc, paragraph_index, replacement).await?;
        if let Some((n, ref hook)) = self.replace_hook {
            if n == nth {
                hook();
            }
        }
        Ok(count)
    }

    async fn set_paragraph_text(
        &self,
        doc: &DocumentId,
        paragraph_index: usize,
        text: &str,
    ) -> Result<(), AccessError> {
        self.record("set_paragraph_text", doc);
        self.check_text(text)?;
        self.inner.set_paragraph_text(doc, paragraph_index, text).await
    }

    async fn delete_paragraph(
        &self,
        doc: &DocumentId,
        paragraph_index: usize,
    ) -> Result<(), AccessError> {
        self.record("delete_paragraph", doc);
        self.inner.delete_paragraph(doc, paragraph_index).await
    }

    async fn insert_paragraph(
        &self,
        doc: &DocumentId,
        after_index: usize,
        text: &str,
    ) -> Result<usize, AccessError> {
        self.record("insert_paragraph", doc);
        self.check_text(text)?;
        self.inner.insert_paragraph(doc, after_index, text).await
    }

    async fn add_heading(
        &self,
        doc: &DocumentId,
        text: &str,
        level: u8,
    ) -> Result<usize, AccessError> {
        self.record("add_heading", doc);
        self.check_text(text)?;
        self.inner.add_heading(doc, text, level).await
    }

    async fn add_paragraph(&self, doc: &DocumentId, text: &str) -> Result<usize, AccessError> {
        self.record("add_paragraph", doc);
        self.check_text(text)?;
        self.inner.add_paragraph(doc, text).await
    }

    async fn add_comment(
        &self,
        doc: &DocumentId,
        paragraph_index: usize,
        text: &str,
    ) -> Result<(), AccessError> {
        self.record("add_comment", doc);
        if self.fail_comments {
            return Err(AccessError::backend("comments are read-only"));
        }
        self.inner.add_comment(doc, paragraph_index, text).await
    }

    async fn copy(&self, doc: &DocumentId, dest: &DocumentId) -> Result<(), AccessError> {
        self.record("copy", doc);
        if self.fail_copy {
            return Err(AccessError::backend("backup storage unavailable"));
        }
        self.inner.copy(doc, dest).await
    }
}
