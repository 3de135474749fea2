use std::collections::BTreeMap;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;
use crate::models::document::{DocType, DocumentContent, DocumentVersion};
use crate::state::AppState;
use crate::store::RepairFailure;
use crate::versioning::manager::{SubmitRequest, VersionState};

fn parse_doc_type(raw: &str) -> Result<DocType, AppError> {
    raw.parse::<DocType>().map_err(AppError::Validation)
}

#[derive(Deserialize)]
pub struct AnalyzeRequest {
    pub version: u32,
    /// Field map for the doc type in the path, e.g. `{"reason_for_application": "..."}`.
    pub content: Value,
    #[serde(default)]
    pub feedback_reflection: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub company_context: Option<String>,
}

#[derive(Serialize)]
pub struct AnalyzeResponse {
    pub job_title: String,
    pub doc_type: DocType,
    pub version: u32,
    pub summary: String,
    pub feedback: String,
    pub individual_feedbacks: BTreeMap<String, String>,
    pub compared_versions: Vec<u32>,
    pub degraded: bool,
    pub content_hash: String,
}

/// A stored version without its embedding vector.
#[derive(Serialize)]
pub struct VersionView {
    pub version: u32,
    pub content: DocumentContent,
    pub summary: String,
    pub feedback: String,
    pub individual_feedbacks: BTreeMap<String, String>,
    pub content_hash: String,
    pub company_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub has_embedding: bool,
}

impl From<DocumentVersion> for VersionView {
    fn from(v: DocumentVersion) -> Self {
        Self {
            has_embedding: !v.embedding.is_empty(),
            version: v.version,
            content: v.content,
            summary: v.summary,
            feedback: v.feedback,
            individual_feedbacks: v.individual_feedbacks,
            content_hash: v.content_hash,
            company_name: v.company_name,
            created_at: v.created_at,
        }
    }
}

#[derive(Serialize)]
pub struct HistoryResponse {
    pub job_title: String,
    pub doc_type: DocType,
    #[serde(flatten)]
    pub state: VersionState,
    pub next_version: u32,
    pub versions: Vec<VersionView>,
    pub repair_failures: Vec<RepairFailure>,
}

#[derive(Deserialize)]
pub struct RollbackRequest {
    pub target_version: u32,
}

#[derive(Serialize)]
pub struct RollbackResponse {
    pub target_version: u32,
    pub deleted: usize,
}

/// POST /api/v1/documents/:job_slug/:doc_type/analyze
pub async fn handle_analyze(
    State(state): State<AppState>,
    Path((job_slug, doc_type)): Path<(String, String)>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, AppError> {
    let doc_type = parse_doc_type(&doc_type)?;
    let content = DocumentContent::from_fields(doc_type, req.content)
        .map_err(|e| AppError::Validation(format!("Invalid {doc_type} content: {e}")))?;

    let outcome = state
        .versions
        .submit(SubmitRequest {
            job: job_slug,
            doc_type,
            version: req.version,
            content,
            feedback_reflection: req.feedback_reflection,
            company_name: req.company_name,
            company_context: req.company_context,
        })
        .await?;

    let record = outcome.record;
    Ok(Json(AnalyzeResponse {
        job_title: record.job_title,
        doc_type,
        version: record.version,
        summary: record.summary,
        feedback: record.feedback,
        individual_feedbacks: record.individual_feedbacks,
        compared_versions: outcome.compared_versions,
        degraded: outcome.degraded,
        content_hash: record.content_hash,
    }))
}

/// GET /api/v1/documents/:job_slug/:doc_type
pub async fn handle_history(
    State(state): State<AppState>,
    Path((job_slug, doc_type)): Path<(String, String)>,
) -> Result<Json<HistoryResponse>, AppError> {
    let doc_type = parse_doc_type(&doc_type)?;
    let loaded = state.versions.load(&job_slug, doc_type).await?;

    Ok(Json(HistoryResponse {
        job_title: loaded.job.title.to_string(),
        doc_type,
        next_version: loaded.state.next_version(),
        state: loaded.state,
        versions: loaded.versions.into_iter().map(VersionView::from).collect(),
        repair_failures: loaded.repair_failures,
    }))
}

/// POST /api/v1/documents/:job_slug/:doc_type/rollback
pub async fn handle_rollback(
    State(state): State<AppState>,
    Path((job_slug, doc_type)): Path<(String, String)>,
    Json(req): Json<RollbackRequest>,
) -> Result<Json<RollbackResponse>, AppError> {
    let doc_type = parse_doc_type(&doc_type)?;
    let outcome = state
        .versions
        .rollback(&job_slug, doc_type, req.target_version)
        .await?;
    Ok(Json(RollbackResponse {
        target_version: outcome.target_version,
        deleted: outcome.deleted,
    }))
}
