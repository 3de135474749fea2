//! Embedding provider: text in, fixed-length vector out.
//!
//! The core only depends on the [`EmbeddingProvider`] trait. Failures surface as
//! [`EmbeddingError`] and are never retried here; callers decide.

use async_trait::async_trait;
use thiserror::Error;

pub mod openai;

pub use openai::OpenAiEmbeddingClient;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Embedding response contained no vectors")]
    Empty,

    #[error("Embedding dimension changed from {expected} to {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Must return the same dimensionality on every call, or cosine scores are meaningless.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}
