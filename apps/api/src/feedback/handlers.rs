use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use serde::Serialize;

use crate::errors::AppError;
use crate::feedback::portfolio::{summarize_portfolio, PortfolioSource};
use crate::state::AppState;

#[derive(Serialize)]
pub struct PortfolioSummaryResponse {
    pub job_title: String,
    pub summary: String,
}

/// POST /api/v1/portfolio/summary
/// Multipart fields: `job_title`, and `portfolio_pdf` or `portfolio_link`.
pub async fn handle_portfolio_summary(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<PortfolioSummaryResponse>, AppError> {
    let mut job_title: Option<String> = None;
    let mut pdf: Option<Bytes> = None;
    let mut link: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let read_err = |e: axum::extract::multipart::MultipartError| {
            AppError::Validation(format!("Could not read field '{name}': {e}"))
        };
        match name.as_str() {
            "job_title" => job_title = Some(field.text().await.map_err(read_err)?),
            "portfolio_link" => link = Some(field.text().await.map_err(read_err)?),
            "portfolio_pdf" => pdf = Some(field.bytes().await.map_err(read_err)?),
            _ => {}
        }
    }

    let job_title = job_title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("job_title is required".to_string()))?;
    let job = state
        .catalog
        .find(&job_title)
        .ok_or_else(|| AppError::Validation(format!("Unknown job '{job_title}'")))?;

    let source = PortfolioSource::from_parts(pdf, link)?;
    let summary = summarize_portfolio(&state.llm, &job, source).await?;

    Ok(Json(PortfolioSummaryResponse {
        job_title: job.title.to_string(),
        summary,
    }))
}
