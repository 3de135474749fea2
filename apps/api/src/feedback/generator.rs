//! Feedback Generator — one completion call per submission.
//!
//! Flow: build prompt (role context + current content + prior versions) →
//!       complete → reject "no usable content" replies → tolerant JSON parse.
//!
//! Persistence is the caller's job; this module has no side effects beyond the call.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::feedback::prompts::{
    COMPARISON_INSTRUCTION, COVER_LETTER_RULES, FEEDBACK_PROMPT_TEMPLATE, HISTORY_HEADER,
    PARSE_ERROR_MARKER, PORTFOLIO_RULES, RESUME_RULES,
};
use crate::jobs::Job;
use crate::llm_client::prompts::{
    signals_insufficient_content, CONSULTANT_PERSONA, JSON_ONLY_SYSTEM,
};
use crate::llm_client::{strip_json_fences, CompletionProvider};
use crate::models::document::{DocType, DocumentContent};
use crate::versioning::retrieval::ScoredVersion;

/// Raw completion text kept in a degraded result, in characters.
const RAW_EXCERPT_CHARS: usize = 500;

// ────────────────────────────────────────────────────────────────────────────
// Data models
// ────────────────────────────────────────────────────────────────────────────

/// Everything the prompt is built from.
pub struct FeedbackRequest<'a> {
    pub job: &'a Job,
    pub content: &'a DocumentContent,
    /// Newest first, as returned by the retriever. At most two are rendered.
    pub history: &'a [ScoredVersion],
    /// The applicant's note on how they acted on earlier feedback.
    pub feedback_reflection: Option<&'a str>,
    pub company_name: Option<&'a str>,
    pub company_context: Option<&'a str>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackResult {
    pub summary: String,
    pub overall_feedback: String,
    pub individual_feedbacks: BTreeMap<String, String>,
    /// True when the completion was not valid JSON and this result was synthesized.
    #[serde(default)]
    pub degraded: bool,
}

/// Shape the model is asked to return. Field values are loosely typed so a
/// stray number or nested object costs one entry rather than the whole parse.
#[derive(Debug, Deserialize)]
struct RawFeedback {
    #[serde(default)]
    summary: String,
    overall_feedback: String,
    #[serde(default)]
    individual_feedbacks: BTreeMap<String, serde_json::Value>,
}

// ────────────────────────────────────────────────────────────────────────────
// Generator
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct FeedbackGenerator {
    llm: Arc<dyn CompletionProvider>,
}

impl FeedbackGenerator {
    pub fn new(llm: Arc<dyn CompletionProvider>) -> Self {
        Self { llm }
    }

    pub async fn generate(&self, request: &FeedbackRequest<'_>) -> Result<FeedbackResult, AppError> {
        let doc_type = request.content.doc_type();
        let prompt = build_feedback_prompt(request);
        let system = format!("{CONSULTANT_PERSONA} {JSON_ONLY_SYSTEM}");

        info!(
            "Requesting {doc_type} feedback for '{}' with {} prior versions",
            request.job.title,
            request.history.len()
        );
        let text = self.llm.complete(&system, &prompt).await?;

        let result = parse_feedback(doc_type, &text);
        if is_refusal(&result, &text) {
            return Err(AppError::InsufficientContent(text.trim().to_string()));
        }
        Ok(result)
    }
}

/// A marker phrase only counts when the reply carries no usable feedback:
/// plain text that did not parse, or an object with no per-field feedback
/// whose summary or overall text is the refusal. Marker phrases inside real
/// feedback (e.g. "직무와의 연관성을 찾을 수 없다") are ordinary critique.
fn is_refusal(result: &FeedbackResult, raw: &str) -> bool {
    if result.degraded {
        return signals_insufficient_content(raw);
    }
    result.individual_feedbacks.is_empty()
        && (signals_insufficient_content(&result.summary)
            || signals_insufficient_content(&result.overall_feedback))
}

/// Parses the completion. Never fails: unparseable text becomes a degraded
/// result that carries the parse error and a raw excerpt.
pub fn parse_feedback(doc_type: DocType, text: &str) -> FeedbackResult {
    match serde_json::from_str::<RawFeedback>(strip_json_fences(text)) {
        Ok(raw) => {
            let allowed = doc_type.feedback_keys();
            let individual_feedbacks = raw
                .individual_feedbacks
                .into_iter()
                .filter(|(key, _)| {
                    let keep = allowed.map_or(true, |keys| keys.contains(&key.as_str()));
                    if !keep {
                        warn!("Dropping individual feedback key '{key}' not allowed for {doc_type}");
                    }
                    keep
                })
                .map(|(key, value)| match value {
                    serde_json::Value::String(s) => (key, s),
                    other => (key, other.to_string()),
                })
                .collect();

            FeedbackResult {
                summary: raw.summary,
                overall_feedback: raw.overall_feedback,
                individual_feedbacks,
                degraded: false,
            }
        }
        Err(e) => {
            warn!("Feedback completion was not valid JSON: {e}");
            let excerpt: String = text.chars().take(RAW_EXCERPT_CHARS).collect();
            FeedbackResult {
                summary: String::new(),
                overall_feedback: format!(
                    "{PARSE_ERROR_MARKER} AI 응답을 JSON으로 해석하지 못했습니다 ({e}).\n\n원본 응답 일부:\n{excerpt}"
                ),
                individual_feedbacks: BTreeMap::new(),
                degraded: true,
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Prompt building
// ────────────────────────────────────────────────────────────────────────────

/// Builds the feedback prompt. The history block appears only when history is non-empty.
pub fn build_feedback_prompt(request: &FeedbackRequest<'_>) -> String {
    let doc_type = request.content.doc_type();

    FEEDBACK_PROMPT_TEMPLATE
        .replace("{job_title}", request.job.title)
        .replace("{job_context}", &render_job_context(request.job))
        .replace("{company_block}", &render_company_block(request))
        .replace("{doc_label}", doc_label(doc_type))
        .replace("{current_content}", &render_content(request.content))
        .replace("{history_block}", &render_history(request.history))
        .replace(
            "{reflection_block}",
            &render_reflection(request.feedback_reflection),
        )
        .replace("{format_rules}", format_rules(doc_type))
        .replace("{output_schema}", &output_schema(doc_type))
}

pub fn render_job_context(job: &Job) -> String {
    match &job.detail {
        Some(detail) => format!(
            "- Required competencies: {}\n- Relevant certifications: {}\n- Role description: {}",
            detail.competencies.join(", "),
            detail.certifications.join(", "),
            detail.description
        ),
        None => format!(
            "- Required competencies: the core competencies commonly expected of a {} ({} field)",
            job.title, job.category
        ),
    }
}

fn render_company_block(request: &FeedbackRequest<'_>) -> String {
    let name = request.company_name.map(str::trim).filter(|s| !s.is_empty());
    let context = request.company_context.map(str::trim).filter(|s| !s.is_empty());
    match (name, context) {
        (None, None) => String::new(),
        (name, context) => {
            let mut block = String::from("\nTARGET COMPANY:\n");
            if let Some(name) = name {
                block.push_str(&format!("- Name: {name}\n"));
            }
            if let Some(context) = context {
                block.push_str(&format!("- Context: {context}\n"));
            }
            block
        }
    }
}

fn doc_label(doc_type: DocType) -> &'static str {
    match doc_type {
        DocType::Resume => "résumé",
        DocType::CoverLetter => "cover letter",
        DocType::Portfolio => "portfolio",
    }
}

fn format_rules(doc_type: DocType) -> &'static str {
    match doc_type {
        DocType::Resume => RESUME_RULES,
        DocType::CoverLetter => COVER_LETTER_RULES,
        DocType::Portfolio => PORTFOLIO_RULES,
    }
}

/// `[field]` headers followed by the value, `(empty)` for blank fields.
pub fn render_content(content: &DocumentContent) -> String {
    content
        .all_fields()
        .into_iter()
        .map(|(key, value)| {
            let value = value.trim();
            let value = if value.is_empty() { "(empty)" } else { value };
            format!("[{key}]\n{value}")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_history(history: &[ScoredVersion]) -> String {
    if history.is_empty() {
        return String::new();
    }

    let mut block = format!("\n{HISTORY_HEADER}:\n");
    for (i, scored) in history.iter().take(2).enumerate() {
        let label = if i == 0 { "previous" } else { "older" };
        let feedback = scored.version.feedback.trim();
        block.push_str(&format!(
            "\n### v{} ({label}, similarity {:.2})\nCONTENT:\n{}\n\nFEEDBACK GIVEN ON v{}:\n{}\n",
            scored.version.version,
            scored.similarity,
            render_content(&scored.version.content),
            scored.version.version,
            if feedback.is_empty() { "(none)" } else { feedback },
        ));
    }
    block.push('\n');
    block.push_str(COMPARISON_INSTRUCTION);
    block.push('\n');
    block
}

fn render_reflection(reflection: Option<&str>) -> String {
    match reflection.map(str::trim).filter(|s| !s.is_empty()) {
        Some(note) => format!(
            "\nHOW THE APPLICANT SAYS THEY ACTED ON EARLIER FEEDBACK:\n{note}\n\
            Verify this claim against the actual changes.\n"
        ),
        None => String::new(),
    }
}

fn output_schema(doc_type: DocType) -> String {
    let individual = match doc_type.feedback_keys() {
        Some(keys) => keys
            .iter()
            .map(|k| format!("    \"{k}\": \"feedback for this field\""))
            .collect::<Vec<_>>()
            .join(",\n"),
        None => "    \"<field name>\": \"feedback for this field\"".to_string(),
    };
    format!(
        "{{\n  \"summary\": \"one-sentence summary\",\n  \"overall_feedback\": \"overall assessment\",\n  \"individual_feedbacks\": {{\n{individual}\n  }}\n}}"
    )
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
