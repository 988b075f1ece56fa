//! Run configuration
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! annotate = true
//! backup_suffix = "_backup"
//!
//! [semantic]
//! model = "gpt-4o"
//! prompt_dir = "prompts"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use amend_change::DEFAULT_PAYLOAD_PREFIX;
use amend_extract::{
    CachedCompletionClient, CompletionClient, CompletionError, OpenAiCompatibleClient,
    PromptTemplates, SemanticExtractor,
};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmendConfig {
    /// Write provenance annotations after applying changes
    pub annotate: bool,
    /// Payload characters compared when deduplicating changes
    pub dedup_payload_prefix: usize,
    /// Appended to the document id to name its backup
    pub backup_suffix: String,
    /// Language-model extraction settings
    pub semantic: SemanticConfig,
}

impl Default for AmendConfig {
    fn default() -> Self {
        Self {
            annotate: true,
            dedup_payload_prefix: DEFAULT_PAYLOAD_PREFIX,
            backup_suffix: "_backup".to_string(),
            semantic: SemanticConfig::default(),
        }
    }
}

impl AmendConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// Returns error if the text is not valid TOML for this schema
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// With annotations on or off
    #[inline]
    #[must_use]
    pub fn with_annotate(mut self, annotate: bool) -> Self {
        self.annotate = annotate;
        self
    }

    /// With dedup payload prefix length
    #[inline]
    #[must_use]
    pub fn with_dedup_payload_prefix(mut self, chars: usize) -> Self {
        self.dedup_payload_prefix = chars;
        self
    }

    /// With backup suffix
    #[inline]
    #[must_use]
    pub fn with_backup_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.backup_suffix = suffix.into();
        self
    }

    /// With semantic settings
    #[inline]
    #[must_use]
    pub fn with_semantic(mut self, semantic: SemanticConfig) -> Self {
        self.semantic = semantic;
        self
    }
}

/// Language-model extraction settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticConfig {
    pub enabled: bool,
    /// Base URL of an OpenAI-compatible API
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Answers kept in the completion cache; 0 disables caching
    pub cache_capacity: u64,
    /// Directory with prompt template overrides
    pub prompt_dir: Option<PathBuf>,
}

impl Default for SemanticConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            temperature: 0.0,
            max_tokens: 16_384,
            timeout_secs: OpenAiCompatibleClient::DEFAULT_TIMEOUT.as_secs(),
            cache_capacity: 64,
            prompt_dir: None,
        }
    }
}

impl SemanticConfig {
    /// With model name
    #[inline]
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// With base URL
    #[inline]
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// With extraction enabled or disabled
    #[inline]
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// With prompt directory
    #[inline]
    #[must_use]
    pub fn with_prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Prompt templates, from `prompt_dir` when set
    #[must_use]
    pub fn prompts(&self) -> PromptTemplates {
        self.prompt_dir
            .as_deref()
            .map_or_else(PromptTemplates::default, PromptTemplates::load)
    }

    /// HTTP completion client, reading the API key from `api_key_env`
    ///
    /// # Errors
    /// Returns error if the key variable is unset or the client cannot be built
    pub fn client(&self) -> Result<OpenAiCompatibleClient, CompletionError> {
        let key = std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| CompletionError::MissingApiKey(self.api_key_env.clone()))?;

        Ok(OpenAiCompatibleClient::new(
            self.base_url.clone(),
            self.model.clone(),
            Duration::from_secs(self.timeout_secs),
        )?
        .with_api_key(key)
        .with_temperature(self.temperature)
        .with_max_tokens(self.max_tokens))
    }

    /// Semantic extractor over `client`, cached and prompted per this config
    #[must_use]
    pub fn extractor_with<C: CompletionClient + 'static>(&self, client: C) -> SemanticExtractor {
        let client: Arc<dyn CompletionClient> = if self.cache_capacity > 0 {
            Arc::new(CachedCompletionClient::new(client, self.cache_capacity))
        } else {
            Arc::new(client)
        };
        SemanticExtractor::new(client).with_prompts(self.prompts())
    }

    /// Semantic extractor over the configured HTTP client
    ///
    /// Returns `Ok(None)` when extraction is disabled.
    ///
    /// # Errors
    /// Returns error if the client cannot be created
    pub fn extractor(&self) -> Result<Option<SemanticExtractor>, CompletionError> {
        if !self.enabled {
            return Ok(None);
        }
        Ok(Some(self.extractor_with(self.client()?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_toml_yields_defaults() {
        let config = AmendConfig::from_toml_str("").unwrap();
        assert_eq!(config, AmendConfig::default());
        assert!(config.annotate);
        assert_eq!(config.dedup_payload_prefix, 100);
        assert_eq!(config.semantic.model, "gpt-4o");
        assert_eq!(config.semantic.timeout_secs, 300);
    }

    #[test]
    fn partial_toml_overrides_fields() {
        let config = AmendConfig::from_toml_str(
            r#"
            annotate = false
            backup_suffix = ".orig"

            [semantic]
            enabled = false
            model = "local-llm"
            "#,
        )
        .unwrap();

        assert!(!config.annotate);
        assert_eq!(config.backup_suffix, ".orig");
        assert!(!config.semantic.enabled);
        assert_eq!(config.semantic.model, "local-llm");
        assert_eq!(config.semantic.max_tokens, 16_384);
    }

    #[test]
    fn invalid_toml_is_reported() {
        let err = AmendConfig::from_toml_str("annotate = \"yes\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = AmendConfig::load(Path::new("/nonexistent/amend.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("amend.toml");
        std::fs::write(&path, "dedup_payload_prefix = 40\n").unwrap();
        assert_eq!(AmendConfig::load(&path).unwrap().dedup_payload_prefix, 40);
    }

    #[test]
    fn disabled_semantic_builds_no_extractor() {
        let semantic = SemanticConfig::default().with_enabled(false);
        assert!(semantic.extractor().unwrap().is_none());
    }

    #[test]
    fn missing_key_is_reported() {
        let semantic = SemanticConfig {
            api_key_env: "AMEND_TEST_KEY_THAT_IS_NOT_SET".to_string(),
            ..SemanticConfig::default()
        };
        let err = semantic.client().unwrap_err();
        assert!(matches!(err, CompletionError::MissingApiKey(ref var) if var == "AMEND_TEST_KEY_THAT_IS_NOT_SET"));
    }
}
