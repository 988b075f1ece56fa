//! Change executor
//!
//! Applies a plan to a live document, strictly one change at a time and in
//! plan order, since earlier edits move the anchors of later ones. Every
//! change yields exactly one [`ChangeOutcome`]; a failing change is
//! recorded and execution moves on.
//!
//! # Operation semantics
//!
//! | operation            | locate                       | mutate                                  |
//! |----------------------|------------------------------|-----------------------------------------|
//! | `REPLACE_TEXT`       | `find`, collapsed then raw   | per-paragraph substitution, first or all |
//! | `DELETE_PARAGRAPH`   | anchor resolution            | remove the resolved paragraph           |
//! | `REPLACE_POINT_TEXT` | anchor resolution            | overwrite it; extra lines follow it     |
//! | `INSERT_PARAGRAPH`   | anchor resolution            | insert lines right after it             |
//! | `INSERT_SECTION`     | none                         | append heading and paragraphs at end    |
//!
//! Cancellation is observed between accessor calls, never inside one, so
//! the outcome of the change in flight always matches the document.

use std::sync::Arc;

use amend_change::{normalize, Anchor, Change, Edit, TextTarget};
use amend_document::{find_occurrences, DocumentAccessor, DocumentId, Replacement};
use tracing::Instrument;

use crate::anchor;
use crate::annotation::Annotation;
use crate::cancel::CancelSignal;
use crate::context::RunContext;
use crate::error::{ChangeFailure, ErrorCode};
use crate::outcome::{ChangeOutcome, ChangeStatus, OutcomeDetails};
use crate::progress::{ProgressEvent, ProgressSink, ProgressUpdate};

/// Result of a handler that mutated the document
#[derive(Debug)]
struct Applied {
    status: ChangeStatus,
    details: OutcomeDetails,
    /// Paragraph that receives the provenance annotation
    annotate_at: Option<usize>,
    /// Operation-specific note for the annotation
    note: Option<String>,
}

impl Applied {
    fn success(details: OutcomeDetails, annotate_at: Option<usize>) -> Self {
        Self {
            status: ChangeStatus::Success,
            details,
            annotate_at,
            note: None,
        }
    }

    fn with_note(mut self, note: String) -> Self {
        self.note = Some(note);
        self
    }
}

/// Sequential change executor over a [`DocumentAccessor`]
#[derive(Clone)]
pub struct ChangeExecutor {
    accessor: Arc<dyn DocumentAccessor>,
    annotate: bool,
}

impl std::fmt::Debug for ChangeExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeExecutor")
            .field("annotate", &self.annotate)
            .finish_non_exhaustive()
    }
}

impl ChangeExecutor {
    /// Executor that annotates applied changes
    #[must_use]
    pub fn new(accessor: Arc<dyn DocumentAccessor>) -> Self {
        Self {
            accessor,
            annotate: true,
        }
    }

    /// Turn provenance annotations on or off for every change
    #[inline]
    #[must_use]
    pub fn with_annotations(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    /// Apply `changes` to `doc` in order, one outcome per change
    pub async fn execute(&self, doc: &DocumentId, changes: &[Change]) -> Vec<ChangeOutcome> {
        let never = CancelSignal::never();
        let mut outcomes = Vec::with_capacity(changes.len());
        for change in changes {
            outcomes.push(self.apply_with_cancel(doc, change, &never).await);
        }
        outcomes
    }

    /// Apply `changes` to the run's document, recording outcomes in `ctx`
    /// and reporting each one to `sink`
    ///
    /// The change in flight when `cancel` fires stops at its next accessor
    /// call: `CANCELLED` if it had not mutated yet, `PARTIAL` with real
    /// counts if it had. Every remaining change is recorded as `CANCELLED`
    /// without touching the document.
    pub async fn execute_run(
        &self,
        ctx: &mut RunContext,
        changes: &[Change],
        sink: &dyn ProgressSink,
        cancel: &CancelSignal,
    ) {
        let total = changes.len();
        let doc = ctx.document().clone();

        for (done, change) in changes.iter().enumerate() {
            let outcome = if cancel.is_cancelled() {
                tracing::debug!(change_id = %change.change_id, "skipped, run cancelled");
                ChangeOutcome::cancelled(change)
            } else {
                self.apply_with_cancel(&doc, change, cancel).await
            };

            ctx.record(outcome.clone());
            sink.emit(ProgressEvent::OperationCompleted(outcome));
            sink.emit(ProgressEvent::Progress(ProgressUpdate::new(done + 1, total)));
        }
    }

    /// Apply one change; never fails, failures become the outcome
    pub async fn apply(&self, doc: &DocumentId, change: &Change) -> ChangeOutcome {
        self.apply_with_cancel(doc, change, &CancelSignal::never())
            .await
    }

    /// [`apply`](Self::apply) that stops at the next accessor call once
    /// `cancel` fires
    pub async fn apply_with_cancel(
        &self,
        doc: &DocumentId,
        change: &Change,
        cancel: &CancelSignal,
    ) -> ChangeOutcome {
        let span = tracing::info_span!(
            "change",
            change_id = %change.change_id,
            operation = %change.operation()
        );
        self.apply_inner(doc, change, cancel).instrument(span).await
    }

    async fn apply_inner(
        &self,
        doc: &DocumentId,
        change: &Change,
        cancel: &CancelSignal,
    ) -> ChangeOutcome {
        let applied = if change.has_usable_anchor() {
            self.dispatch(doc, &change.edit, cancel).await
        } else {
            Err(ChangeFailure::InvalidChange("anchor is empty".to_string()))
        };

        match applied {
            Ok(mut applied) => {
                if self.annotate && change.annotate {
                    applied.details.annotated = self.annotate_change(doc, change, &applied).await;
                }
                tracing::info!(
                    status = %applied.status,
                    matches = applied.details.matches_found,
                    replacements = applied.details.replacements_made,
                    "change applied"
                );
                ChangeOutcome::applied(change, applied.status, applied.details)
            }
            Err(failure) => {
                tracing::warn!(code = %failure.code(), "change failed: {failure}");
                ChangeOutcome::failed(change, &failure)
            }
        }
    }

    async fn dispatch(
        &self,
        doc: &DocumentId,
        edit: &Edit,
        cancel: &CancelSignal,
    ) -> Result<Applied, ChangeFailure> {
        live(cancel)?;
        match edit {
            Edit::ReplaceText { target, new_text } => {
                self.replace_text(doc, target, new_text, cancel).await
            }
            Edit::DeleteParagraph { anchor } => self.delete_paragraph(doc, anchor, cancel).await,
            Edit::ReplacePointText { anchor, new_text } => {
                self.replace_point_text(doc, anchor, new_text, cancel).await
            }
            Edit::InsertParagraph { after, text } => {
                self.insert_paragraph(doc, after, text, cancel).await
            }
            Edit::InsertSection {
                heading_text,
                heading_level,
                paragraphs,
            } => {
                self.insert_section(doc, heading_text, *heading_level, paragraphs, cancel)
                    .await
            }
        }
    }

    /// First spelling of `target` with any match: whitespace-collapsed,
    /// then as written
    async fn find_target(
        &self,
        doc: &DocumentId,
        target: &TextTarget,
    ) -> Result<Option<(String, usize)>, ChangeFailure> {
        let collapsed = normalize(&target.text, true);
        let mut spellings = vec![collapsed];
        if spellings[0] != target.text {
            spellings.push(target.text.clone());
        }

        for spelling in spellings {
            if spelling.is_empty() {
                continue;
            }
            let found = self
                .accessor
                .find(doc, &spelling, target.match_case)
                .await?
                .len();
            tracing::debug!(%spelling, found, "text search");
            if found > 0 {
                return Ok(Some((spelling, found)));
            }
        }
        Ok(None)
    }

    async fn replace_text(
        &self,
        doc: &DocumentId,
        target: &TextTarget,
        new_text: &str,
        cancel: &CancelSignal,
    ) -> Result<Applied, ChangeFailure> {
        let Some((needle, found)) = self.find_target(doc, target).await? else {
            return Err(ChangeFailure::AnchorNotFound(target.text.clone()));
        };

        let mut replacement =
            Replacement::all(needle.as_str(), new_text).with_match_case(target.match_case);
        if !target.replace_all {
            replacement = replacement.first_only();
        }

        let paragraphs = self.accessor.paragraphs(doc).await?;
        let mut made = 0;
        let mut first_changed = None;
        let mut interrupted: Option<ChangeFailure> = None;
        for (idx, paragraph) in paragraphs.iter().enumerate() {
            if find_occurrences(&paragraph.text, &needle, target.match_case).is_empty() {
                continue;
            }
            if let Err(stop) = live(cancel) {
                if made == 0 {
                    return Err(stop);
                }
                interrupted = Some(stop);
                break;
            }
            let count = match self.accessor.replace(doc, idx, &replacement).await {
                Ok(count) => count,
                Err(err) if made > 0 => {
                    interrupted = Some(err.into());
                    break;
                }
                Err(err) => return Err(err.into()),
            };
            if count > 0 {
                made += count;
                first_changed.get_or_insert(idx);
                if !target.replace_all {
                    break;
                }
            }
        }

        if made == 0 {
            return Err(ChangeFailure::ReplacementFailed { found });
        }

        let expected = if target.replace_all { found } else { 1 };
        let mut details = OutcomeDetails::counts(found, made);
        details.paragraph_index = first_changed;
        let status = if made < expected {
            let mut message = format!("{made} of {expected} occurrences replaced");
            if let Some(stop) = interrupted {
                message.push_str(&format!("; stopped by: {stop}"));
                if stop.code() == ErrorCode::Cancelled {
                    details.error = Some(ErrorCode::Cancelled);
                }
            }
            details.message = Some(message);
            ChangeStatus::Partial
        } else {
            ChangeStatus::Success
        };

        Ok(Applied {
            status,
            details,
            annotate_at: first_changed,
            note: Some(format!("замен: {made}")),
        })
    }

    async fn locate(
        &self,
        doc: &DocumentId,
        anchor: &Anchor,
    ) -> Result<anchor::AnchorHit, ChangeFailure> {
        anchor::resolve(self.accessor.as_ref(), doc, anchor)
            .await?
            .ok_or_else(|| ChangeFailure::AnchorNotFound(anchor.text.clone()))
    }

    async fn delete_paragraph(
        &self,
        doc: &DocumentId,
        anchor: &Anchor,
        cancel: &CancelSignal,
    ) -> Result<Applied, ChangeFailure> {
        let hit = self.locate(doc, anchor).await?;
        live(cancel)?;
        self.accessor
            .delete_paragraph(doc, hit.paragraph_index)
            .await?;

        let details = OutcomeDetails::counts(hit.candidates, 1)
            .at(hit.paragraph_index)
            .with_message(format!("deleted: {}", preview(&hit.paragraph_text)));
        Ok(Applied::success(details, hit.paragraph_index.checked_sub(1))
            .with_note(format!("удалён абзац: {}", preview(&hit.paragraph_text))))
    }

    async fn replace_point_text(
        &self,
        doc: &DocumentId,
        anchor: &Anchor,
        new_text: &str,
        cancel: &CancelSignal,
    ) -> Result<Applied, ChangeFailure> {
        let lines = payload_lines(new_text);
        let Some((first, rest)) = lines.split_first() else {
            return Err(ChangeFailure::InvalidChange("replacement text is empty".to_string()));
        };

        let hit = self.locate(doc, anchor).await?;
        live(cancel)?;
        self.accessor
            .set_paragraph_text(doc, hit.paragraph_index, first)
            .await?;
        let added = self.insert_lines(doc, hit.paragraph_index, rest).await?;

        let mut details = OutcomeDetails::counts(hit.candidates, 1).at(hit.paragraph_index);
        details.paragraphs_added = added;
        Ok(Applied::success(details, Some(hit.paragraph_index)))
    }

    async fn insert_paragraph(
        &self,
        doc: &DocumentId,
        after: &Anchor,
        text: &str,
        cancel: &CancelSignal,
    ) -> Result<Applied, ChangeFailure> {
        let lines = payload_lines(text);
        if lines.is_empty() {
            return Err(ChangeFailure::InvalidChange("inserted text is empty".to_string()));
        }

        let hit = self.locate(doc, after).await?;
        live(cancel)?;
        let added = self.insert_lines(doc, hit.paragraph_index, &lines).await?;

        let first = hit.paragraph_index + 1;
        let mut details = OutcomeDetails::counts(hit.candidates, added).at(first);
        details.paragraphs_added = added;
        Ok(Applied::success(details, Some(first)))
    }

    async fn insert_section(
        &self,
        doc: &DocumentId,
        heading: &str,
        level: u8,
        paragraphs: &[String],
        cancel: &CancelSignal,
    ) -> Result<Applied, ChangeFailure> {
        let heading = heading.trim();
        let body: Vec<&str> = paragraphs
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();
        if heading.is_empty() && body.is_empty() {
            return Err(ChangeFailure::InvalidChange("section has no content".to_string()));
        }

        live(cancel)?;
        let mut first = None;
        let mut written = 0;
        if !heading.is_empty() {
            first = Some(self.accessor.add_heading(doc, heading, level.max(1)).await?);
            written += 1;
        }
        for text in body {
            let idx = self.accessor.add_paragraph(doc, text).await?;
            first.get_or_insert(idx);
            written += 1;
        }

        let mut details = OutcomeDetails::counts(0, written);
        details.paragraph_index = first;
        details.paragraphs_added = written;
        Ok(Applied::success(details, first))
    }

    /// Insert `lines` one after another following `after`
    async fn insert_lines(
        &self,
        doc: &DocumentId,
        after: usize,
        lines: &[&str],
    ) -> Result<usize, ChangeFailure> {
        let mut last = after;
        for line in lines {
            last = self.accessor.insert_paragraph(doc, last, line).await?;
        }
        Ok(lines.len())
    }

    /// Best effort: a failed annotation leaves the outcome untouched
    async fn annotate_change(&self, doc: &DocumentId, change: &Change, applied: &Applied) -> bool {
        let Some(idx) = applied.annotate_at else {
            tracing::debug!("no paragraph to annotate");
            return false;
        };

        let mut annotation = Annotation::for_change(change);
        if let Some(ref note) = applied.note {
            annotation = annotation.with_extra(note.clone());
        }

        match self
            .accessor
            .add_comment(doc, idx, &annotation.to_string())
            .await
        {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(paragraph = idx, error = %err, "annotation failed");
                false
            }
        }
    }
}

/// `Err(Cancelled)` once `cancel` has fired
fn live(cancel: &CancelSignal) -> Result<(), ChangeFailure> {
    if cancel.is_cancelled() {
        return Err(ChangeFailure::Cancelled);
    }
    Ok(())
}

/// Non-blank payload lines, trimmed
fn payload_lines(text: &str) -> Vec<&str> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// First 60 characters of `text`, whitespace collapsed
fn preview(text: &str) -> String {
    let collapsed = normalize(text, true);
    if collapsed.chars().count() <= 60 {
        collapsed
    } else {
        let mut short: String = collapsed.chars().take(60).collect();
        short.push('…');
        short
    }
}
