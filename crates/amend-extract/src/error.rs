//! Error types for extraction
//!
//! - [`CompletionError`]: the language-model capability could not answer
//! - [`ExtractionError`]: an answer arrived but yielded no usable structure

/// Failures of a [`CompletionClient`](crate::CompletionClient)
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    /// No client configured or the service refused to start
    #[error("completion capability unavailable: {0}")]
    Unavailable(String),

    /// API key variable is not set
    #[error("environment variable {0} is not set")]
    MissingApiKey(String),

    /// Transport failure, including timeouts
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Response had no message content
    #[error("completion response had no content")]
    EmptyResponse,
}

/// Failures of the semantic extractor
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// The completion call failed
    #[error(transparent)]
    Completion(#[from] CompletionError),

    /// Response text could not be repaired into JSON
    #[error("response is not parseable JSON: {0}")]
    Unparseable(String),

    /// JSON parsed but `changes` is not a list
    #[error("response field 'changes' must be a list, got {0}")]
    NotAList(&'static str),
}
