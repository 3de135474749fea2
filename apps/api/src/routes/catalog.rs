use axum::{
    extract::{Path, State},
    Json,
};

use crate::errors::AppError;
use crate::jobs::{document_schema, DocumentSchema, Job, JobCategory};
use crate::models::document::DocType;
use crate::state::AppState;

/// GET /api/v1/jobs
pub async fn handle_list_jobs(State(state): State<AppState>) -> Json<Vec<JobCategory>> {
    Json(state.catalog.categories())
}

/// GET /api/v1/jobs/:job_slug
pub async fn handle_get_job(
    State(state): State<AppState>,
    Path(job_slug): Path<String>,
) -> Result<Json<Job>, AppError> {
    state
        .catalog
        .find(&job_slug)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Job '{job_slug}' not found")))
}

/// GET /api/v1/schemas/:doc_type
pub async fn handle_get_schema(
    Path(doc_type): Path<String>,
) -> Result<Json<DocumentSchema>, AppError> {
    let doc_type = doc_type.parse::<DocType>().map_err(AppError::NotFound)?;
    Ok(Json(document_schema(doc_type)))
}
