use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::jobs::slugify;

// ────────────────────────────────────────────────────────────────────────────
// Document types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocType {
    Resume,
    CoverLetter,
    Portfolio,
}

impl DocType {
    pub const ALL: [DocType; 3] = [DocType::Resume, DocType::CoverLetter, DocType::Portfolio];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocType::Resume => "resume",
            DocType::CoverLetter => "cover_letter",
            DocType::Portfolio => "portfolio",
        }
    }

    /// Keys the LLM may use in `individual_feedbacks`.
    /// `None` means free-form (portfolio).
    pub fn feedback_keys(&self) -> Option<&'static [&'static str]> {
        match self {
            DocType::Resume => Some(&["education", "activities", "awards", "certificates"]),
            DocType::CoverLetter => Some(&[
                "reason_for_application",
                "expertise_experience",
                "collaboration_experience",
                "challenging_goal_experience",
                "growth_process",
            ]),
            DocType::Portfolio => None,
        }
    }
}

impl fmt::Display for DocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                format!("Unknown doc_type '{s}'. Expected one of: resume, cover_letter, portfolio")
            })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Structured content per doc_type
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeContent {
    pub education: String,
    pub gpa: String,
    pub awards: String,
    pub activities: String,
    pub certificates: String,
    pub skills: String,
    pub career_experience: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverLetterContent {
    pub reason_for_application: String,
    pub expertise_experience: String,
    pub collaboration_experience: String,
    pub challenging_goal_experience: String,
    pub growth_process: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioContent {
    pub project_name: String,
    pub project_details: String,
    pub project_links: String,
}

/// Document body, tagged by doc_type so each shape is checked on the way in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "doc_type", rename_all = "snake_case")]
pub enum DocumentContent {
    Resume(ResumeContent),
    CoverLetter(CoverLetterContent),
    Portfolio(PortfolioContent),
}

impl DocumentContent {
    /// Parses an untagged field map (as posted by the editor) into the shape for `doc_type`.
    pub fn from_fields(
        doc_type: DocType,
        fields: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(match doc_type {
            DocType::Resume => DocumentContent::Resume(serde_json::from_value(fields)?),
            DocType::CoverLetter => DocumentContent::CoverLetter(serde_json::from_value(fields)?),
            DocType::Portfolio => DocumentContent::Portfolio(serde_json::from_value(fields)?),
        })
    }

    pub fn doc_type(&self) -> DocType {
        match self {
            DocumentContent::Resume(_) => DocType::Resume,
            DocumentContent::CoverLetter(_) => DocType::CoverLetter,
            DocumentContent::Portfolio(_) => DocType::Portfolio,
        }
    }

    /// Semantic fields in the fixed order used for embedding input, with their keys.
    pub fn semantic_fields(&self) -> Vec<(&'static str, &str)> {
        match self {
            DocumentContent::Resume(r) => vec![
                ("education", r.education.as_str()),
                ("activities", r.activities.as_str()),
                ("awards", r.awards.as_str()),
                ("certificates", r.certificates.as_str()),
                ("skills", r.skills.as_str()),
            ],
            DocumentContent::CoverLetter(c) => vec![
                ("reason_for_application", c.reason_for_application.as_str()),
                ("expertise_experience", c.expertise_experience.as_str()),
                ("collaboration_experience", c.collaboration_experience.as_str()),
                (
                    "challenging_goal_experience",
                    c.challenging_goal_experience.as_str(),
                ),
                ("growth_process", c.growth_process.as_str()),
            ],
            DocumentContent::Portfolio(p) => vec![
                ("project_name", p.project_name.as_str()),
                ("project_details", p.project_details.as_str()),
            ],
        }
    }

    /// Every field with its key, for prompt rendering.
    pub fn all_fields(&self) -> Vec<(&'static str, &str)> {
        match self {
            DocumentContent::Resume(r) => vec![
                ("education", r.education.as_str()),
                ("gpa", r.gpa.as_str()),
                ("awards", r.awards.as_str()),
                ("activities", r.activities.as_str()),
                ("certificates", r.certificates.as_str()),
                ("skills", r.skills.as_str()),
                ("career_experience", r.career_experience.as_str()),
            ],
            DocumentContent::Portfolio(p) => vec![
                ("project_name", p.project_name.as_str()),
                ("project_details", p.project_details.as_str()),
                ("project_links", p.project_links.as_str()),
            ],
            DocumentContent::CoverLetter(_) => self.semantic_fields(),
        }
    }

    /// Deterministic text used as embedding input. Blank fields are skipped.
    pub fn canonical_text(&self) -> String {
        self.semantic_fields()
            .into_iter()
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Lowercase hex SHA-256 of the JSON serialization.
    pub fn content_hash(&self) -> String {
        // Field order is fixed by the struct definitions, so the bytes are stable.
        let bytes = serde_json::to_vec(self).unwrap_or_default();
        Sha256::digest(&bytes)
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Stored versions
// ────────────────────────────────────────────────────────────────────────────

/// Storage key shared by every version of one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    pub job_slug: String,
    pub doc_type: DocType,
}

impl DocumentKey {
    pub fn new(job_title: &str, doc_type: DocType) -> Self {
        Self {
            job_slug: slugify(job_title),
            doc_type,
        }
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.job_slug, self.doc_type)
    }
}

/// One immutable snapshot of a document plus the feedback generated for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentVersion {
    pub job_title: String,
    pub version: u32,
    pub content: DocumentContent,
    #[serde(default)]
    pub summary: String,
    pub feedback: String,
    #[serde(default)]
    pub individual_feedbacks: BTreeMap<String, String>,
    /// Empty only for legacy records awaiting backfill.
    #[serde(default)]
    pub embedding: Vec<f32>,
    pub content_hash: String,
    #[serde(default)]
    pub company_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DocumentVersion {
    pub fn doc_type(&self) -> DocType {
        self.content.doc_type()
    }

    pub fn key(&self) -> DocumentKey {
        DocumentKey::new(&self.job_title, self.doc_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cover_letter(reason: &str) -> DocumentContent {
        DocumentContent::CoverLetter(CoverLetterContent {
            reason_for_application: reason.to_string(),
            ..Default::default()
        })
    }

    #[test]
    fn test_doc_type_parses_known_values() {
        assert_eq!("resume".parse::<DocType>().unwrap(), DocType::Resume);
        assert_eq!(
            "cover_letter".parse::<DocType>().unwrap(),
            DocType::CoverLetter
        );
        assert_eq!("portfolio".parse::<DocType>().unwrap(), DocType::Portfolio);
        assert!("career_statement".parse::<DocType>().is_err());
    }

    #[test]
    fn test_from_fields_builds_matching_variant() {
        let fields = serde_json::json!({
            "reason_for_application": "백엔드 개발에 관심",
            "growth_process": "꾸준한 학습"
        });
        let content = DocumentContent::from_fields(DocType::CoverLetter, fields).unwrap();
        assert_eq!(content.doc_type(), DocType::CoverLetter);
        match content {
            DocumentContent::CoverLetter(c) => {
                assert_eq!(c.reason_for_application, "백엔드 개발에 관심");
                assert!(c.expertise_experience.is_empty());
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_from_fields_rejects_wrong_field_types() {
        let fields = serde_json::json!({ "education": 42 });
        assert!(DocumentContent::from_fields(DocType::Resume, fields).is_err());
        assert!(DocumentContent::from_fields(DocType::Resume, serde_json::json!("text")).is_err());
    }

    #[test]
    fn test_canonical_text_uses_fixed_order_and_skips_blanks() {
        let content = DocumentContent::CoverLetter(CoverLetterContent {
            reason_for_application: "A".to_string(),
            expertise_experience: "  ".to_string(),
            collaboration_experience: "B".to_string(),
            challenging_goal_experience: String::new(),
            growth_process: "C".to_string(),
        });
        assert_eq!(content.canonical_text(), "A\n\nB\n\nC");
    }

    #[test]
    fn test_resume_canonical_text_ignores_non_semantic_fields() {
        let content = DocumentContent::Resume(ResumeContent {
            gpa: "4.0/4.5".to_string(),
            career_experience: "인턴".to_string(),
            ..Default::default()
        });
        assert!(content.canonical_text().is_empty());
    }

    #[test]
    fn test_content_hash_is_stable_and_content_sensitive() {
        let a = cover_letter("지원 동기 없음");
        let b = cover_letter("지원 동기 없음");
        let c = cover_letter("지원 동기 있음");
        assert_eq!(a.content_hash(), b.content_hash());
        assert_ne!(a.content_hash(), c.content_hash());
        assert_eq!(a.content_hash().len(), 64);
    }

    #[test]
    fn test_version_record_serializes_with_doc_type_tag() {
        let version = DocumentVersion {
            job_title: "백엔드 개발자".to_string(),
            version: 0,
            content: cover_letter("지원 동기 없음"),
            summary: String::new(),
            feedback: "더 구체적으로".to_string(),
            individual_feedbacks: BTreeMap::new(),
            embedding: vec![0.1, 0.2],
            content_hash: "abc".to_string(),
            company_name: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&version).unwrap();
        assert_eq!(json["content"]["doc_type"], "cover_letter");

        let recovered: DocumentVersion = serde_json::from_value(json).unwrap();
        assert_eq!(recovered, version);
        assert_eq!(recovered.key().job_slug, "백엔드-개발자");
    }

    #[test]
    fn test_record_without_embedding_deserializes_empty() {
        let json = serde_json::json!({
            "job_title": "백엔드 개발자",
            "version": 3,
            "content": { "doc_type": "portfolio", "project_name": "X" },
            "feedback": "ok",
            "content_hash": "h",
            "created_at": "2024-01-01T00:00:00Z"
        });
        let record: DocumentVersion = serde_json::from_value(json).unwrap();
        assert!(record.embedding.is_empty());
        assert!(record.individual_feedbacks.is_empty());
    }
}
