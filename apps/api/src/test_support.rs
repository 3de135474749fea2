//! Hand-written provider doubles shared by the unit tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::llm_client::{CompletionProvider, LlmError};
use crate::models::document::{CoverLetterContent, DocumentContent, DocumentVersion};

const DIM: usize = 64;

/// Deterministic hashed bag-of-words vector. Shared tokens → higher cosine.
pub fn bag_of_words(text: &str) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    for token in text.split_whitespace() {
        // FNV-1a
        let mut h: u64 = 0xcbf29ce484222325;
        for b in token.as_bytes() {
            h ^= u64::from(*b);
            h = h.wrapping_mul(0x100000001b3);
        }
        v[(h % DIM as u64) as usize] += 1.0;
    }
    v
}

#[derive(Default)]
pub struct CountingEmbedder {
    calls: AtomicUsize,
}

impl CountingEmbedder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for CountingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(bag_of_words(text))
    }
}

/// Bag-of-words embedder that sleeps before answering, to widen race windows.
pub struct SlowEmbedder {
    delay: Duration,
}

impl SlowEmbedder {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl EmbeddingProvider for SlowEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        tokio::time::sleep(self.delay).await;
        Ok(bag_of_words(text))
    }
}

pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Err(EmbeddingError::Api {
            status: 503,
            message: "embedding service unavailable".to_string(),
        })
    }
}

/// Replays canned completions in order (repeating the last one) and records
/// every prompt it was sent.
pub struct ScriptedCompletion {
    responses: Mutex<VecDeque<Result<String, u16>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn replying(text: &str) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from([Ok(text.to_string())])),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails with an API error of the given status.
    pub fn failing(status: u16) -> Self {
        Self {
            responses: Mutex::new(VecDeque::from([Err(status)])),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn last_prompt(&self) -> String {
        self.prompts().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletion {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let mut responses = self.responses.lock().unwrap();
        let next = if responses.len() > 1 {
            responses.pop_front()
        } else {
            responses.front().cloned()
        };
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(status)) => Err(LlmError::Api {
                status,
                message: "scripted failure".to_string(),
            }),
            None => Err(LlmError::EmptyContent),
        }
    }
}

/// A well-formed completion for a cover letter.
pub fn cover_letter_feedback_json() -> String {
    serde_json::json!({
        "summary": "지원 동기가 구체화되었습니다",
        "overall_feedback": "이전 버전 대비 지원 동기가 구체적으로 개선되었습니다.",
        "individual_feedbacks": {
            "reason_for_application": "회사와 직무 연결이 명확합니다.",
            "growth_process": "사례를 추가하세요."
        }
    })
    .to_string()
}

/// A stored cover-letter version with only `reason_for_application` filled in
/// and a bag-of-words embedding.
pub fn cover_letter_version(job_title: &str, version: u32, reason: &str) -> DocumentVersion {
    let content = DocumentContent::CoverLetter(CoverLetterContent {
        reason_for_application: reason.to_string(),
        ..Default::default()
    });
    DocumentVersion {
        job_title: job_title.to_string(),
        version,
        embedding: bag_of_words(&content.canonical_text()),
        content_hash: content.content_hash(),
        content,
        summary: String::new(),
        feedback: format!("feedback for v{version}"),
        individual_feedbacks: BTreeMap::new(),
        company_name: None,
        created_at: Utc::now(),
    }
}
