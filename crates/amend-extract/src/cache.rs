//! Completion cache using moka
//!
//! Re-running the same instruction text produces the same prompt pair, so
//! the answer is served from memory. Cached answers report zero token usage
//! because no tokens were spent on them.

use async_trait::async_trait;
use moka::future::Cache;

use amend_document::ContentHash;

use crate::completion::{Completion, CompletionClient, TokenUsage};
use crate::error::CompletionError;

/// [`CompletionClient`] decorator with a bounded answer cache
pub struct CachedCompletionClient<C> {
    inner: C,
    cache: Cache<ContentHash, String>,
}

impl<C: CompletionClient> CachedCompletionClient<C> {
    /// Wrap `inner`, keeping at most `max_capacity` answers
    #[must_use]
    pub fn new(inner: C, max_capacity: u64) -> Self {
        Self {
            inner,
            cache: Cache::new(max_capacity),
        }
    }

    /// Drop every cached answer
    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    fn key(&self, system: &str, user: &str) -> ContentHash {
        ContentHash::compute_parts([self.inner.model(), system, user])
    }
}

#[async_trait]
impl<C: CompletionClient> CompletionClient for CachedCompletionClient<C> {
    async fn complete(&self, system: &str, user: &str) -> Result<Completion, CompletionError> {
        let key = self.key(system, user);
        if let Some(content) = self.cache.get(&key).await {
            tracing::debug!(key = %key.short(), "completion served from cache");
            return Ok(Completion {
                content,
                usage: TokenUsage::default(),
            });
        }

        let completion = self.inner.complete(system, user).await?;
        self.cache.insert(key, completion.content.clone()).await;
        Ok(completion)
    }

    fn model(&self) -> &str {
        self.inner.model()
    }
}
