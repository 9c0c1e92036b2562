//! Language-model capability consumed by the stage executor.
//!
//! The client is a dumb transport: prompt text in, raw completion text out.
//! Prompt construction and response parsing live in the executor.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from a language-model call.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("response parse error: {0}")]
    ParseError(String),

    #[error("empty completion")]
    EmptyCompletion,
}

/// A text-completion backend.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Send one prompt, get the completion text back.
    async fn query(&self, prompt: &str) -> Result<String, ModelError>;

    /// Identifier for logs.
    fn name(&self) -> &str {
        "language-model"
    }
}
