//! Document Store — durable persistence of document versions.
//!
//! Backends implement [`StorageBackend`] (raw put / fetch / truncate by key).
//! [`DocumentStore`] layers the ordering guarantee and the lazy embedding repair
//! on top, so every backend gets the same read semantics.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::models::document::{DocType, DocumentKey, DocumentVersion};

pub mod fs;
pub mod postgres;

pub use fs::FsStorage;
pub use postgres::PgStorage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Read error: {0}")]
    ReadError(String),

    #[error("Write error: {0}")]
    WriteError(String),

    #[error("Corrupt record: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Raw record persistence. Each version is an independent unit: writing or
/// deleting one version never rewrites another.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Writes or overwrites the record at its (job, doc_type, version) key.
    async fn put(&self, record: &DocumentVersion) -> Result<(), StorageError>;

    /// Every stored version for the key, in no particular order.
    async fn fetch_all(&self, key: &DocumentKey) -> Result<Vec<DocumentVersion>, StorageError>;

    /// Removes every version strictly greater than `version`. Returns the count removed.
    async fn delete_after(&self, key: &DocumentKey, version: u32) -> Result<usize, StorageError>;

    /// Stores `embedding` on an existing record, only while that record is
    /// still present with `content_hash`. Returns false (and writes nothing)
    /// when it was deleted or rewritten since it was read.
    async fn set_embedding(
        &self,
        key: &DocumentKey,
        version: u32,
        content_hash: &str,
        embedding: &[f32],
    ) -> Result<bool, StorageError>;
}

/// Why a lazy embedding repair failed. Kept apart from [`StorageError`] so a
/// failed repair never turns a successful read into a failed one.
#[derive(Debug, Error)]
pub enum RepairError {
    #[error("content has no text to embed")]
    NoText,

    #[error("embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("write-back failed: {0}")]
    WriteBack(#[from] StorageError),

    #[error("record was deleted or rewritten during the repair")]
    Superseded,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepairFailure {
    pub version: u32,
    pub reason: String,
}

/// Result of a self-healing read.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    /// Ascending by version.
    pub versions: Vec<DocumentVersion>,
    /// Versions whose missing embedding could not be backfilled. They are still
    /// in `versions`, with an empty embedding.
    pub repair_failures: Vec<RepairFailure>,
}

pub struct DocumentStore {
    backend: Arc<dyn StorageBackend>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl DocumentStore {
    pub fn new(backend: Arc<dyn StorageBackend>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { backend, embedder }
    }

    /// Last write wins for the same key.
    pub async fn save(&self, record: &DocumentVersion) -> Result<(), StorageError> {
        self.backend.put(record).await?;
        info!("Saved {} v{}", record.key(), record.version);
        Ok(())
    }

    /// All versions ascending, with missing embeddings recomputed and written back.
    pub async fn list(&self, job_title: &str, doc_type: DocType) -> Result<Listing, StorageError> {
        let key = DocumentKey::new(job_title, doc_type);
        let mut fetched = self.backend.fetch_all(&key).await?;
        fetched.sort_by_key(|v| v.version);

        let mut versions = Vec::with_capacity(fetched.len());
        let mut repair_failures = Vec::new();
        for mut record in fetched {
            if record.embedding.is_empty() {
                match self.repair(&mut record).await {
                    Ok(()) => info!("Backfilled embedding for {key} v{}", record.version),
                    Err(RepairError::Superseded) => {
                        // Our copy is stale; the store no longer holds it.
                        warn!(
                            "{key} v{} changed during embedding backfill; left out of this listing",
                            record.version
                        );
                        continue;
                    }
                    Err(e) => {
                        warn!("Embedding backfill failed for {key} v{}: {e}", record.version);
                        repair_failures.push(RepairFailure {
                            version: record.version,
                            reason: e.to_string(),
                        });
                    }
                }
            }
            versions.push(record);
        }

        Ok(Listing {
            versions,
            repair_failures,
        })
    }

    pub async fn delete_after(
        &self,
        job_title: &str,
        doc_type: DocType,
        version: u32,
    ) -> Result<usize, StorageError> {
        let key = DocumentKey::new(job_title, doc_type);
        let deleted = self.backend.delete_after(&key, version).await?;
        info!("Deleted {deleted} versions of {key} after v{version}");
        Ok(deleted)
    }

    /// Only mutates `record` once the embedding has been persisted. Never
    /// recreates a record that was deleted while the embedding was computed.
    async fn repair(&self, record: &mut DocumentVersion) -> Result<(), RepairError> {
        let text = record.content.canonical_text();
        if text.is_empty() {
            return Err(RepairError::NoText);
        }
        let embedding = self.embedder.embed(&text).await?;

        let stored = self
            .backend
            .set_embedding(&record.key(), record.version, &record.content_hash, &embedding)
            .await?;
        if !stored {
            return Err(RepairError::Superseded);
        }

        record.embedding = embedding;
        Ok(())
    }
}
