//! Portfolio summaries: a recruiter-facing summary of an uploaded PDF or a link.

use std::sync::Arc;

use bytes::Bytes;
use tracing::info;

use crate::errors::AppError;
use crate::feedback::generator::render_job_context;
use crate::feedback::prompts::{
    PORTFOLIO_LINK_PROMPT_TEMPLATE, PORTFOLIO_SUMMARY_SYSTEM, PORTFOLIO_TEXT_PROMPT_TEMPLATE,
};
use crate::jobs::Job;
use crate::llm_client::prompts::signals_insufficient_content;
use crate::llm_client::CompletionProvider;

pub const MAX_PDF_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub enum PortfolioSource {
    Pdf(Bytes),
    Link(String),
}

impl PortfolioSource {
    /// Picks the PDF when one was uploaded, otherwise a non-blank link.
    pub fn from_parts(pdf: Option<Bytes>, link: Option<String>) -> Result<Self, AppError> {
        if let Some(pdf) = pdf.filter(|b| !b.is_empty()) {
            if pdf.len() > MAX_PDF_BYTES {
                return Err(AppError::Validation(
                    "PDF is larger than 10MB. Upload a smaller file.".to_string(),
                ));
            }
            return Ok(PortfolioSource::Pdf(pdf));
        }

        match link.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()) {
            Some(link) => Ok(PortfolioSource::Link(normalize_link(&link))),
            None => Err(AppError::Validation(
                "Provide either a portfolio PDF or a portfolio link.".to_string(),
            )),
        }
    }
}

/// Prefixes `http://` when the link has no scheme.
pub fn normalize_link(link: &str) -> String {
    if link.starts_with("http://") || link.starts_with("https://") {
        link.to_string()
    } else {
        format!("http://{link}")
    }
}

/// Extracts text on the blocking pool; PDF parsing is CPU-bound.
async fn extract_pdf_text(pdf: Bytes) -> Result<String, AppError> {
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&pdf))
        .await
        .map_err(|e| {
            // The extractor panics on some malformed files; that is still a bad upload.
            if e.is_panic() {
                AppError::Validation("Could not read the PDF: malformed file".to_string())
            } else {
                AppError::Internal(anyhow::anyhow!("PDF extraction task failed: {e}"))
            }
        })?
        .map_err(|e| AppError::Validation(format!("Could not read the PDF: {e}")))?;

    if text.trim().is_empty() {
        return Err(AppError::Validation(
            "No text could be extracted from the PDF. It may be a scanned image.".to_string(),
        ));
    }
    Ok(text)
}

pub async fn summarize_portfolio(
    llm: &Arc<dyn CompletionProvider>,
    job: &Job,
    source: PortfolioSource,
) -> Result<String, AppError> {
    let job_context = render_job_context(job);
    let prompt = match source {
        PortfolioSource::Pdf(pdf) => {
            let text = extract_pdf_text(pdf).await?;
            info!("Extracted {} chars of portfolio text", text.chars().count());
            PORTFOLIO_TEXT_PROMPT_TEMPLATE
                .replace("{job_title}", job.title)
                .replace("{job_context}", &job_context)
                .replace("{portfolio_text}", &text)
        }
        PortfolioSource::Link(url) => PORTFOLIO_LINK_PROMPT_TEMPLATE
            .replace("{job_title}", job.title)
            .replace("{job_context}", &job_context)
            .replace("{portfolio_url}", &url),
    };

    let summary = llm.complete(PORTFOLIO_SUMMARY_SYSTEM, &prompt).await?;
    let summary = summary.trim().to_string();

    if signals_insufficient_content(&summary) {
        return Err(AppError::InsufficientContent(summary));
    }
    Ok(summary)
}
