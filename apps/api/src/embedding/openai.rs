use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{EmbeddingError, EmbeddingProvider};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Client for an OpenAI-compatible `/v1/embeddings` endpoint.
///
/// Remembers the dimensionality of the first vector it sees and rejects any
/// later vector of a different length.
pub struct OpenAiEmbeddingClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
    dimension: OnceLock<usize>,
}

impl OpenAiEmbeddingClient {
    pub fn new(api_url: String, api_key: String, model: String) -> Result<Self, EmbeddingError> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(30)).build()?,
            api_url,
            api_key,
            model,
            dimension: OnceLock::new(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: EmbeddingResponse = response.json().await?;
        let vector = first_vector(parsed)?;
        check_dimension(&self.dimension, vector.len())?;

        debug!("Embedded {} chars into {} dims", text.len(), vector.len());
        Ok(vector)
    }
}

fn first_vector(response: EmbeddingResponse) -> Result<Vec<f32>, EmbeddingError> {
    response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .filter(|v| !v.is_empty())
        .ok_or(EmbeddingError::Empty)
}

fn check_dimension(seen: &OnceLock<usize>, actual: usize) -> Result<(), EmbeddingError> {
    let expected = *seen.get_or_init(|| actual);
    if expected == actual {
        Ok(())
    } else {
        Err(EmbeddingError::DimensionMismatch { expected, actual })
    }
}
