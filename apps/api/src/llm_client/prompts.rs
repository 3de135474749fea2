// Shared prompt fragments.
// Each service that needs completion calls defines its own prompts.rs alongside it.
// This file contains cross-cutting fragments only.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Persona shared by every career-document prompt.
pub const CONSULTANT_PERSONA: &str = "You are a professional career consultant who reviews \
    Korean job application documents. You are candid, specific, and you never invent facts \
    the applicant did not write.";

/// Phrases the model uses when it had nothing usable to work with.
/// Any of these in a completion means the submitted content was insufficient.
pub const INSUFFICIENT_CONTENT_MARKERS: &[&str] = &[
    "찾을 수 없다",
    "유효한 포트폴리오 내용을 찾을 수 없",
    "unable to access external URLs",
    "cannot access",
    "no content found",
];

/// Returns true if the completion signals that the input had no usable content.
pub fn signals_insufficient_content(text: &str) -> bool {
    let lower = text.to_lowercase();
    INSUFFICIENT_CONTENT_MARKERS
        .iter()
        .any(|marker| lower.contains(&marker.to_lowercase()))
}
