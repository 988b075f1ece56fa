//! Document Processor
//!
//! The run orchestrator:
//! - Takes and verifies the pre-mutation backup
//! - Extracts candidates with the pattern and semantic passes
//! - Merges them into one change plan
//! - Executes the plan, streaming progress
//! - Assembles the final report

use std::sync::Arc;

use amend_change::Change;
use amend_document::{AccessError, DocumentAccessor, DocumentId};
use amend_extract::{PatternExtractor, SemanticExtractor, TokenUsage};

use crate::cancel::CancelSignal;
use crate::config::AmendConfig;
use crate::context::RunContext;
use crate::error::ProcessError;
use crate::executor::ChangeExecutor;
use crate::merge::ChangeMerger;
use crate::progress::{NoopSink, ProgressEvent, ProgressSink, RunFailure};
use crate::report::ProcessingReport;

/// Warning recorded when extraction finds nothing to apply
pub const NO_CHANGES_WARNING: &str = "no changes found in instructions";

/// A merged plan and what it cost to build
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangePlan {
    /// Changes in execution order
    pub changes: Vec<Change>,
    /// Candidates from the pattern pass, before merging
    pub pattern_candidates: usize,
    /// Candidates from the semantic pass, before merging
    pub semantic_candidates: usize,
    /// Tokens spent by the semantic pass
    pub usage: TokenUsage,
    /// Conditions the caller should know about
    pub warnings: Vec<String>,
}

impl ChangePlan {
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// End-to-end amendment runs over one document store
pub struct DocumentProcessor {
    accessor: Arc<dyn DocumentAccessor>,
    config: AmendConfig,
    pattern: PatternExtractor,
    semantic: Option<SemanticExtractor>,
    merger: ChangeMerger,
    executor: ChangeExecutor,
    sink: Arc<dyn ProgressSink>,
}

impl std::fmt::Debug for DocumentProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentProcessor")
            .field("config", &self.config)
            .field("semantic", &self.semantic.is_some())
            .finish_non_exhaustive()
    }
}

impl DocumentProcessor {
    /// Processor with pattern extraction only and no progress observer
    #[must_use]
    pub fn new(accessor: Arc<dyn DocumentAccessor>, config: AmendConfig) -> Self {
        let merger = ChangeMerger::new().with_payload_prefix(config.dedup_payload_prefix);
        let executor = ChangeExecutor::new(Arc::clone(&accessor)).with_annotations(config.annotate);
        Self {
            accessor,
            config,
            pattern: PatternExtractor::new(),
            semantic: None,
            merger,
            executor,
            sink: Arc::new(NoopSink),
        }
    }

    /// Add the language-model extraction pass
    #[inline]
    #[must_use]
    pub fn with_semantic(mut self, extractor: SemanticExtractor) -> Self {
        self.semantic = Some(extractor);
        self
    }

    /// Report progress to `sink`
    #[inline]
    #[must_use]
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &AmendConfig {
        &self.config
    }

    /// Backup id for `document`
    #[must_use]
    pub fn backup_id(&self, document: &DocumentId) -> DocumentId {
        document.with_suffix(&self.config.backup_suffix)
    }

    /// Build the change plan for `instructions` without touching any document
    ///
    /// Semantic extraction failures degrade to the pattern result and are
    /// reported in [`ChangePlan::warnings`].
    pub async fn plan(&self, instructions: &str) -> ChangePlan {
        self.plan_with_cancel(instructions, &CancelSignal::never())
            .await
    }

    /// [`plan`](Self::plan) whose semantic pass is abandoned once `cancel`
    /// fires; the plan then holds pattern results only
    pub async fn plan_with_cancel(&self, instructions: &str, cancel: &CancelSignal) -> ChangePlan {
        let pattern_changes = self.pattern.extract(instructions);

        let mut plan = ChangePlan {
            pattern_candidates: pattern_changes.len(),
            ..ChangePlan::default()
        };

        let semantic_changes = match self.semantic {
            None => Vec::new(),
            Some(_) if cancel.is_cancelled() => {
                plan.warnings
                    .push("semantic extraction skipped: run cancelled".to_string());
                Vec::new()
            }
            Some(ref extractor) => match tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                result = extractor.extract(instructions, &pattern_changes) => Some(result),
            } {
                None => {
                    tracing::warn!("run cancelled during semantic extraction, using pattern results only");
                    plan.warnings
                        .push("semantic extraction cancelled: run cancelled".to_string());
                    Vec::new()
                }
                Some(Ok(extraction)) => {
                    plan.usage += extraction.usage;
                    if extraction.possibly_incomplete {
                        plan.warnings
                            .push("language model may have missed some instructions".to_string());
                    }
                    extraction.changes
                }
                Some(Err(err)) => {
                    tracing::warn!(error = %err, "semantic extraction unavailable, using pattern results only");
                    plan.warnings.push(format!("semantic extraction unavailable: {err}"));
                    Vec::new()
                }
            },
        };
        plan.semantic_candidates = semantic_changes.len();

        plan.changes = self.merger.merge(pattern_changes, semantic_changes);
        if plan.changes.is_empty() {
            plan.warnings.push(NO_CHANGES_WARNING.to_string());
        }
        plan
    }

    /// Run `instructions` against `document`
    ///
    /// # Errors
    /// Returns [`ProcessError::Backup`] if the backup cannot be taken; the
    /// document is then left untouched. Every other failure is reported per
    /// change inside the returned report.
    pub async fn process(
        &self,
        document: &DocumentId,
        instructions: &str,
    ) -> Result<ProcessingReport, ProcessError> {
        self.process_with_cancel(document, instructions, &CancelSignal::never())
            .await
    }

    /// Run instructions stored as another document in the same store
    ///
    /// # Errors
    /// Returns [`ProcessError::Instructions`] if the instruction document
    /// cannot be read, otherwise as [`process`](Self::process)
    pub async fn process_documents(
        &self,
        document: &DocumentId,
        instructions: &DocumentId,
    ) -> Result<ProcessingReport, ProcessError> {
        let text = self
            .accessor
            .get_text(instructions)
            .await
            .map_err(|source| ProcessError::Instructions {
                document: instructions.clone(),
                source,
            })?;
        self.process(document, &text).await
    }

    /// [`process`](Self::process) that stops early when `cancel` fires
    ///
    /// # Errors
    /// As [`process`](Self::process)
    pub async fn process_with_cancel(
        &self,
        document: &DocumentId,
        instructions: &str,
        cancel: &CancelSignal,
    ) -> Result<ProcessingReport, ProcessError> {
        let mut ctx = RunContext::new(document.clone(), self.backup_id(document));
        tracing::info!(
            run_id = %ctx.run_id(),
            document = %document,
            instruction_chars = instructions.chars().count(),
            "run started"
        );

        if let Err(err) = self.backup(&ctx).await {
            tracing::error!(error = %err, "backup failed, aborting run");
            self.sink.emit(ProgressEvent::Error(RunFailure {
                document_id: document.clone(),
                message: err.to_string(),
            }));
            return Err(err);
        }

        let plan = self.plan_with_cancel(instructions, cancel).await;
        ctx.add_usage(plan.usage);
        for warning in plan.warnings {
            ctx.warn(warning);
        }

        tracing::info!(changes = plan.changes.len(), "executing change plan");
        self.executor
            .execute_run(&mut ctx, &plan.changes, self.sink.as_ref(), cancel)
            .await;

        let report = ctx.finish();
        tracing::info!(
            run_id = %report.run_id,
            successful = report.successful,
            failed = report.failed,
            duration_ms = report.duration_ms,
            "run finished"
        );
        self.sink.emit(ProgressEvent::Completed(report.clone()));
        Ok(report)
    }

    /// Copy the live document to its backup id and check the copy
    async fn backup(&self, ctx: &RunContext) -> Result<(), ProcessError> {
        let fail = |source: AccessError| ProcessError::Backup {
            document: ctx.document().clone(),
            backup: ctx.backup().clone(),
            source,
        };

        self.accessor
            .copy(ctx.document(), ctx.backup())
            .await
            .map_err(fail)?;

        let original = self.accessor.content_hash(ctx.document()).await.map_err(fail)?;
        let copy = self.accessor.content_hash(ctx.backup()).await.map_err(fail)?;
        if original != copy {
            return Err(fail(AccessError::backend(format!(
                "backup content {} does not match document {}",
                copy.short(),
                original.short()
            ))));
        }

        tracing::info!(backup = %ctx.backup(), hash = %original.short(), "backup created");
        Ok(())
    }
}
