//! Version Manager — submit / load / rollback for one (job, doc_type) document.
//!
//! Flow for submit: resolve job → load history (self-healing) → retrieve similar
//! prior versions → generate feedback → embed + hash → persist.
//!
//! Nothing is written unless every external call succeeded. Writes to the same
//! (job, doc_type) are serialized in-process; the store itself stays
//! last-write-wins, so a caller that reuses a version number overwrites it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{info, warn};

use crate::embedding::EmbeddingProvider;
use crate::errors::AppError;
use crate::feedback::generator::{FeedbackGenerator, FeedbackRequest};
use crate::jobs::{Job, JobCatalog};
use crate::models::document::{DocType, DocumentContent, DocumentKey, DocumentVersion};
use crate::store::{DocumentStore, RepairFailure};
use crate::versioning::retrieval::SimilarityRetriever;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VersionState {
    NoVersions,
    HasVersions { latest: u32 },
}

impl VersionState {
    /// `versions` must be ascending.
    pub fn of(versions: &[DocumentVersion]) -> Self {
        match versions.last() {
            Some(v) => VersionState::HasVersions { latest: v.version },
            None => VersionState::NoVersions,
        }
    }

    pub fn latest(&self) -> Option<u32> {
        match self {
            VersionState::NoVersions => None,
            VersionState::HasVersions { latest } => Some(*latest),
        }
    }

    /// The version a well-behaved caller submits next.
    pub fn next_version(&self) -> u32 {
        self.latest().map_or(0, |latest| latest.saturating_add(1))
    }
}

#[derive(Debug, Clone)]
pub struct SubmitRequest {
    /// Job slug or exact job title.
    pub job: String,
    pub doc_type: DocType,
    /// Caller-chosen; expected to be the next version. Reusing one overwrites it.
    pub version: u32,
    pub content: DocumentContent,
    pub feedback_reflection: Option<String>,
    pub company_name: Option<String>,
    pub company_context: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub record: DocumentVersion,
    /// Prior versions the feedback was compared against, newest first.
    pub compared_versions: Vec<u32>,
    /// True when the completion could not be parsed and placeholder feedback was stored.
    pub degraded: bool,
}

#[derive(Debug, Clone)]
pub struct LoadOutcome {
    pub job: Job,
    pub doc_type: DocType,
    pub state: VersionState,
    pub versions: Vec<DocumentVersion>,
    pub repair_failures: Vec<RepairFailure>,
}

#[derive(Debug, Clone, Copy)]
pub struct RollbackOutcome {
    pub target_version: u32,
    pub deleted: usize,
}

// ────────────────────────────────────────────────────────────────────────────
// Per-key write locks
// ────────────────────────────────────────────────────────────────────────────

/// One async mutex per document key. Entries are never evicted; the key space
/// is bounded by the job catalog times the doc types.
#[derive(Default)]
struct KeyLocks {
    locks: Mutex<HashMap<DocumentKey, Arc<AsyncMutex<()>>>>,
}

impl KeyLocks {
    async fn acquire(&self, key: &DocumentKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(key.clone()).or_default().clone()
        };
        lock.lock_owned().await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Manager
// ────────────────────────────────────────────────────────────────────────────

pub struct VersionManager {
    store: DocumentStore,
    embedder: Arc<dyn EmbeddingProvider>,
    feedback: FeedbackGenerator,
    retriever: SimilarityRetriever,
    catalog: JobCatalog,
    locks: KeyLocks,
}

impl VersionManager {
    pub fn new(
        store: DocumentStore,
        embedder: Arc<dyn EmbeddingProvider>,
        feedback: FeedbackGenerator,
        retriever: SimilarityRetriever,
        catalog: JobCatalog,
    ) -> Self {
        Self {
            store,
            embedder,
            feedback,
            retriever,
            catalog,
            locks: KeyLocks::default(),
        }
    }

    fn resolve_job(&self, job: &str) -> Result<Job, AppError> {
        self.catalog
            .find(job)
            .ok_or_else(|| AppError::Validation(format!("Unknown job '{job}'")))
    }

    /// Analyzes a new version against its most similar predecessors and stores it.
    pub async fn submit(&self, request: SubmitRequest) -> Result<SubmitOutcome, AppError> {
        let job = self.resolve_job(&request.job)?;
        let doc_type = request.doc_type;
        if request.content.doc_type() != doc_type {
            return Err(AppError::Validation(format!(
                "Content is a {} but the request is for a {doc_type}",
                request.content.doc_type()
            )));
        }

        let text = request.content.canonical_text();
        if text.is_empty() {
            return Err(AppError::Validation(
                "The document has no content to analyze".to_string(),
            ));
        }

        let key = DocumentKey::new(job.title, doc_type);
        let _guard = self.locks.acquire(&key).await;

        let history = self.store.list(job.title, doc_type).await?;
        let state = VersionState::of(&history.versions);
        match state.latest() {
            Some(latest) if request.version <= latest => warn!(
                "{key}: v{} already exists or precedes latest v{latest}; it will be overwritten",
                request.version
            ),
            _ if request.version > state.next_version() => warn!(
                "{key}: v{} leaves a gap after {:?}",
                request.version,
                state.latest()
            ),
            _ => {}
        }

        let retrieval = self
            .retriever
            .retrieve(
                self.embedder.as_ref(),
                &request.content,
                request.version,
                &history.versions,
            )
            .await?;
        let compared_versions: Vec<u32> =
            retrieval.matches.iter().map(|m| m.version.version).collect();
        if let Some(previous) = retrieval.previous() {
            info!(
                "{key}: comparing v{} against v{} (similarity {:.2}){}",
                request.version,
                previous.version.version,
                previous.similarity,
                retrieval
                    .older()
                    .map(|o| format!(" and v{} ({:.2})", o.version.version, o.similarity))
                    .unwrap_or_default()
            );
        }

        let feedback = self
            .feedback
            .generate(&FeedbackRequest {
                job: &job,
                content: &request.content,
                history: &retrieval.matches,
                feedback_reflection: request.feedback_reflection.as_deref(),
                company_name: request.company_name.as_deref(),
                company_context: request.company_context.as_deref(),
            })
            .await?;

        let embedding = match retrieval.query_embedding {
            Some(embedding) => embedding,
            None => self.embedder.embed(&text).await?,
        };

        let record = DocumentVersion {
            job_title: job.title.to_string(),
            version: request.version,
            content_hash: request.content.content_hash(),
            content: request.content,
            summary: feedback.summary,
            feedback: feedback.overall_feedback,
            individual_feedbacks: feedback.individual_feedbacks,
            embedding,
            company_name: request
                .company_name
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            created_at: Utc::now(),
        };
        self.store.save(&record).await?;

        info!(
            "{key}: stored v{} (compared against {:?}, degraded={})",
            record.version, compared_versions, feedback.degraded
        );

        Ok(SubmitOutcome {
            record,
            compared_versions,
            degraded: feedback.degraded,
        })
    }

    /// All versions ascending. Missing embeddings are repaired as a side effect,
    /// so this takes the same per-key lock as submit and rollback.
    pub async fn load(&self, job: &str, doc_type: DocType) -> Result<LoadOutcome, AppError> {
        let job = self.resolve_job(job)?;
        let key = DocumentKey::new(job.title, doc_type);
        let _guard = self.locks.acquire(&key).await;

        let listing = self.store.list(job.title, doc_type).await?;
        Ok(LoadOutcome {
            state: VersionState::of(&listing.versions),
            job,
            doc_type,
            versions: listing.versions,
            repair_failures: listing.repair_failures,
        })
    }

    /// Deletes every version above `target_version`. Remaining versions are untouched.
    pub async fn rollback(
        &self,
        job: &str,
        doc_type: DocType,
        target_version: u32,
    ) -> Result<RollbackOutcome, AppError> {
        let job = self.resolve_job(job)?;
        let key = DocumentKey::new(job.title, doc_type);
        let _guard = self.locks.acquire(&key).await;

        let deleted = self
            .store
            .delete_after(job.title, doc_type, target_version)
            .await?;
        info!("{key}: rolled back to v{target_version}, {deleted} versions removed");

        Ok(RollbackOutcome {
            target_version,
            deleted,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
