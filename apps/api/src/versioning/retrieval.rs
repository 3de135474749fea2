//! Similarity Retriever — picks the prior versions most similar to an
//! in-flight submission so feedback can reference what changed.
//!
//! Brute-force cosine over the handful of versions a document accumulates;
//! candidate counts stay in the tens, so this runs inline per request.

use std::cmp::Ordering;

use serde::Serialize;

use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::models::document::{DocumentContent, DocumentVersion};

pub const DEFAULT_TOP_K: usize = 2;

/// dot(a, b) / (‖a‖·‖b‖). Returns 0.0 for mismatched lengths, empty input, or
/// a zero-magnitude vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let (mut dot, mut norm_a, mut norm_b) = (0.0f32, 0.0f32, 0.0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }
    dot / denom
}

/// A prior version paired with its similarity to the query.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredVersion {
    pub similarity: f32,
    pub version: DocumentVersion,
}

/// Outcome of a retrieval. `matches` is ordered newest first: `matches[0]` is
/// the "previous" version, `matches[1]` the "older" one.
#[derive(Debug, Clone, Default)]
pub struct Retrieval {
    /// The query embedding, when one was computed. Lets the caller reuse it
    /// instead of embedding the same text twice.
    pub query_embedding: Option<Vec<f32>>,
    pub matches: Vec<ScoredVersion>,
}

impl Retrieval {
    pub fn previous(&self) -> Option<&ScoredVersion> {
        self.matches.first()
    }

    pub fn older(&self) -> Option<&ScoredVersion> {
        self.matches.get(1)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SimilarityRetriever {
    top_k: usize,
}

impl Default for SimilarityRetriever {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_K)
    }
}

impl SimilarityRetriever {
    pub fn new(top_k: usize) -> Self {
        Self { top_k: top_k.max(1) }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Embeds `content` and ranks `history` against it.
    ///
    /// Skips the embedding call entirely when the content is blank or when no
    /// history version is eligible (older than `version` with an embedding).
    pub async fn retrieve(
        &self,
        embedder: &dyn EmbeddingProvider,
        content: &DocumentContent,
        version: u32,
        history: &[DocumentVersion],
    ) -> Result<Retrieval, EmbeddingError> {
        let text = content.canonical_text();
        if text.trim().is_empty() {
            return Ok(Retrieval::default());
        }
        if !history.iter().any(|c| is_candidate(c, version)) {
            return Ok(Retrieval::default());
        }

        let query = embedder.embed(&text).await?;
        let matches = self.rank(&query, version, history);
        Ok(Retrieval {
            query_embedding: Some(query),
            matches,
        })
    }

    /// Top-k candidates by similarity, returned newest first.
    pub fn rank(
        &self,
        query: &[f32],
        version: u32,
        history: &[DocumentVersion],
    ) -> Vec<ScoredVersion> {
        let mut scored: Vec<ScoredVersion> = history
            .iter()
            .filter(|c| is_candidate(c, version))
            .map(|c| ScoredVersion {
                similarity: cosine_similarity(query, &c.embedding),
                version: c.clone(),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.version.version.cmp(&a.version.version))
        });
        scored.truncate(self.top_k);

        scored.sort_by(|a, b| b.version.version.cmp(&a.version.version));
        scored
    }
}

/// Strictly older than the in-flight version, and embedded.
fn is_candidate(candidate: &DocumentVersion, version: u32) -> bool {
    candidate.version < version && !candidate.embedding.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::CoverLetterContent;
    use crate::test_support::{cover_letter_version, CountingEmbedder};

    const JOB: &str = "백엔드 개발자";

    fn with_embedding(version: u32, embedding: Vec<f32>) -> DocumentVersion {
        let mut v = cover_letter_version(JOB, version, &format!("v{version}"));
        v.embedding = embedding;
        v
    }

    fn reason(text: &str) -> DocumentContent {
        DocumentContent::CoverLetter(CoverLetterContent {
            reason_for_application: text.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_cosine_identical_vectors_is_one() {
        let a = [0.3, -1.2, 4.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_is_symmetric() {
        let a = [1.0, 2.0, 3.0];
        let b = [-0.5, 4.0, 0.25];
        assert_eq!(cosine_similarity(&a, &b), cosine_similarity(&b, &a));
    }

    #[test]
    fn test_cosine_orthogonal_and_opposite() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[-2.0, 0.0]) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_inputs_score_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 1.0], &[0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 1.0], &[1.0, 1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn test_rank_excludes_current_and_future_versions() {
        let history = vec![
            with_embedding(0, vec![1.0, 0.0]),
            with_embedding(1, vec![0.9, 0.1]),
            with_embedding(2, vec![1.0, 0.0]),
            with_embedding(3, vec![1.0, 0.0]),
        ];
        let ranked = SimilarityRetriever::new(5).rank(&[1.0, 0.0], 2, &history);
        let versions: Vec<u32> = ranked.iter().map(|s| s.version.version).collect();
        assert_eq!(versions, vec![1, 0]);
    }

    #[test]
    fn test_rank_takes_most_similar_then_orders_newest_first() {
        let history = vec![
            with_embedding(0, vec![1.0, 0.0]),
            with_embedding(1, vec![0.0, 1.0]),
            with_embedding(2, vec![0.9, 0.1]),
            with_embedding(3, vec![-1.0, 0.0]),
        ];
        let ranked = SimilarityRetriever::new(2).rank(&[1.0, 0.0], 4, &history);
        let versions: Vec<u32> = ranked.iter().map(|s| s.version.version).collect();
        assert_eq!(versions, vec![2, 0]);
        assert!(ranked[1].similarity > ranked[0].similarity);
    }

    #[test]
    fn test_rank_never_exceeds_top_k() {
        let history: Vec<_> = (0..10).map(|v| with_embedding(v, vec![1.0, v as f32])).collect();
        for k in 1..4 {
            assert_eq!(SimilarityRetriever::new(k).rank(&[1.0, 1.0], 10, &history).len(), k);
        }
    }

    #[test]
    fn test_rank_skips_unembedded_candidates() {
        let history = vec![with_embedding(0, vec![]), with_embedding(1, vec![1.0, 0.0])];
        let ranked = SimilarityRetriever::default().rank(&[1.0, 0.0], 2, &history);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].version.version, 1);
    }

    #[test]
    fn test_rank_ties_prefer_newer_version() {
        let history: Vec<_> = (0..4).map(|v| with_embedding(v, vec![1.0, 0.0])).collect();
        let ranked = SimilarityRetriever::new(2).rank(&[1.0, 0.0], 4, &history);
        let versions: Vec<u32> = ranked.iter().map(|s| s.version.version).collect();
        assert_eq!(versions, vec![3, 2]);
    }

    #[tokio::test]
    async fn test_retrieve_without_history_skips_embedding() {
        let embedder = CountingEmbedder::default();
        let retrieval = SimilarityRetriever::default()
            .retrieve(&embedder, &reason("지원 동기"), 0, &[])
            .await
            .unwrap();
        assert!(retrieval.matches.is_empty());
        assert!(retrieval.query_embedding.is_none());
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_retrieve_with_only_future_history_skips_embedding() {
        let embedder = CountingEmbedder::default();
        let history = vec![with_embedding(3, vec![1.0])];
        let retrieval = SimilarityRetriever::default()
            .retrieve(&embedder, &reason("지원 동기"), 1, &history)
            .await
            .unwrap();
        assert!(retrieval.matches.is_empty());
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_retrieve_blank_content_returns_empty() {
        let embedder = CountingEmbedder::default();
        let history = vec![with_embedding(0, vec![1.0])];
        let retrieval = SimilarityRetriever::default()
            .retrieve(&embedder, &reason("   "), 1, &history)
            .await
            .unwrap();
        assert!(retrieval.matches.is_empty());
        assert_eq!(embedder.calls(), 0);
    }

    #[tokio::test]
    async fn test_retrieve_finds_previous_version() {
        let embedder = CountingEmbedder::default();
        let v0 = cover_letter_version(JOB, 0, "지원 동기 없음");
        let retrieval = SimilarityRetriever::default()
            .retrieve(
                &embedder,
                &reason("백엔드 개발자로서 대규모 트래픽 처리 경험을 살리고 싶어 지원 동기 를 작성"),
                1,
                &[v0],
            )
            .await
            .unwrap();
        assert_eq!(embedder.calls(), 1);
        assert_eq!(retrieval.previous().unwrap().version.version, 0);
        assert!(retrieval.older().is_none());
        assert!(retrieval.query_embedding.is_some());
    }
}
