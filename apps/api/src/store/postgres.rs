use std::collections::BTreeMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use serde_json::Value;
use tracing::{info, warn};

use crate::models::document::{DocumentContent, DocumentKey, DocumentVersion};
use crate::store::{StorageBackend, StorageError};

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS document_versions (
    job_slug             TEXT        NOT NULL,
    doc_type             TEXT        NOT NULL,
    version              INTEGER     NOT NULL CHECK (version >= 0),
    job_title            TEXT        NOT NULL,
    content              JSONB       NOT NULL,
    summary              TEXT        NOT NULL DEFAULT '',
    feedback             TEXT        NOT NULL,
    individual_feedbacks JSONB       NOT NULL DEFAULT '{}'::jsonb,
    embedding            REAL[]      NOT NULL DEFAULT '{}',
    content_hash         TEXT        NOT NULL,
    company_name         TEXT,
    created_at           TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (job_slug, doc_type, version)
)
"#;

#[derive(Debug, FromRow)]
struct DocumentVersionRow {
    job_title: String,
    version: i32,
    // Decoded per row so one bad document costs one version, not the listing.
    content: Json<Value>,
    summary: String,
    feedback: String,
    individual_feedbacks: Json<Value>,
    embedding: Vec<f32>,
    content_hash: String,
    company_name: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<DocumentVersionRow> for DocumentVersion {
    type Error = StorageError;

    fn try_from(row: DocumentVersionRow) -> Result<Self, Self::Error> {
        let version = u32::try_from(row.version)
            .map_err(|_| StorageError::ParseError(format!("negative version {}", row.version)))?;
        let content: DocumentContent = serde_json::from_value(row.content.0)
            .map_err(|e| StorageError::ParseError(format!("v{version} content: {e}")))?;
        let individual_feedbacks: BTreeMap<String, String> =
            serde_json::from_value(row.individual_feedbacks.0).map_err(|e| {
                StorageError::ParseError(format!("v{version} individual_feedbacks: {e}"))
            })?;
        Ok(DocumentVersion {
            job_title: row.job_title,
            version,
            content,
            summary: row.summary,
            feedback: row.feedback,
            individual_feedbacks,
            embedding: row.embedding,
            content_hash: row.content_hash,
            company_name: row.company_name,
            created_at: row.created_at,
        })
    }
}

/// Converts rows, skipping (with a warning) any that no longer decode.
fn decode_rows(key: &DocumentKey, rows: Vec<DocumentVersionRow>) -> Vec<DocumentVersion> {
    rows.into_iter()
        .filter_map(|row| match DocumentVersion::try_from(row) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!("Skipping corrupt row for {key}: {e}");
                None
            }
        })
        .collect()
}

fn version_param(version: u32) -> Result<i32, StorageError> {
    i32::try_from(version)
        .map_err(|_| StorageError::InvalidKey(format!("version {version} out of range")))
}

/// PostgreSQL backend. One row per version, keyed by (job_slug, doc_type, version).
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    /// Connects and makes sure the `document_versions` table exists.
    pub async fn connect(database_url: &str) -> Result<Self> {
        info!("Connecting to PostgreSQL...");

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        sqlx::query(CREATE_TABLE).execute(&pool).await?;

        info!("PostgreSQL connection pool established");
        Ok(Self { pool })
    }
}

#[async_trait]
impl StorageBackend for PgStorage {
    async fn put(&self, record: &DocumentVersion) -> Result<(), StorageError> {
        let key = record.key();
        sqlx::query(
            r#"
            INSERT INTO document_versions
                (job_slug, doc_type, version, job_title, content, summary, feedback,
                 individual_feedbacks, embedding, content_hash, company_name, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (job_slug, doc_type, version) DO UPDATE SET
                job_title = EXCLUDED.job_title,
                content = EXCLUDED.content,
                summary = EXCLUDED.summary,
                feedback = EXCLUDED.feedback,
                individual_feedbacks = EXCLUDED.individual_feedbacks,
                embedding = EXCLUDED.embedding,
                content_hash = EXCLUDED.content_hash,
                company_name = EXCLUDED.company_name,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(&key.job_slug)
        .bind(key.doc_type.as_str())
        .bind(version_param(record.version)?)
        .bind(&record.job_title)
        .bind(Json(&record.content))
        .bind(&record.summary)
        .bind(&record.feedback)
        .bind(Json(&record.individual_feedbacks))
        .bind(&record.embedding)
        .bind(&record.content_hash)
        .bind(&record.company_name)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn fetch_all(&self, key: &DocumentKey) -> Result<Vec<DocumentVersion>, StorageError> {
        let rows = sqlx::query_as::<_, DocumentVersionRow>(
            r#"
            SELECT job_title, version, content, summary, feedback, individual_feedbacks,
                   embedding, content_hash, company_name, created_at
            FROM document_versions
            WHERE job_slug = $1 AND doc_type = $2
            ORDER BY version ASC
            "#,
        )
        .bind(&key.job_slug)
        .bind(key.doc_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(decode_rows(key, rows))
    }

    async fn delete_after(&self, key: &DocumentKey, version: u32) -> Result<usize, StorageError> {
        let result = sqlx::query(
            "DELETE FROM document_versions WHERE job_slug = $1 AND doc_type = $2 AND version > $3",
        )
        .bind(&key.job_slug)
        .bind(key.doc_type.as_str())
        .bind(version_param(version)?)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() as usize)
    }

    async fn set_embedding(
        &self,
        key: &DocumentKey,
        version: u32,
        content_hash: &str,
        embedding: &[f32],
    ) -> Result<bool, StorageError> {
        let result = sqlx::query(
            r#"
            UPDATE document_versions SET embedding = $5
            WHERE job_slug = $1 AND doc_type = $2 AND version = $3 AND content_hash = $4
            "#,
        )
        .bind(&key.job_slug)
        .bind(key.doc_type.as_str())
        .bind(version_param(version)?)
        .bind(content_hash)
        .bind(embedding)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::{CoverLetterContent, DocType};

    fn row(version: i32, content: Value) -> DocumentVersionRow {
        DocumentVersionRow {
            job_title: "백엔드 개발자".to_string(),
            version,
            content: Json(content),
            summary: String::new(),
            feedback: "f".to_string(),
            individual_feedbacks: Json(serde_json::json!({})),
            embedding: vec![1.0, 0.0],
            content_hash: "h".to_string(),
            company_name: None,
            created_at: Utc::now(),
        }
    }

    fn cover_letter_json() -> Value {
        serde_json::to_value(DocumentContent::CoverLetter(CoverLetterContent::default())).unwrap()
    }

    #[test]
    fn test_row_conversion_preserves_fields() {
        let mut r = row(2, cover_letter_json());
        r.individual_feedbacks = Json(serde_json::json!({ "growth_process": "좋음" }));
        let record = DocumentVersion::try_from(r).unwrap();
        assert_eq!(record.version, 2);
        assert_eq!(record.doc_type(), DocType::CoverLetter);
        assert_eq!(record.individual_feedbacks["growth_process"], "좋음");
    }

    #[test]
    fn test_negative_row_version_is_corrupt() {
        assert!(matches!(
            DocumentVersion::try_from(row(-1, cover_letter_json())),
            Err(StorageError::ParseError(_))
        ));
    }

    #[test]
    fn test_undecodable_row_is_skipped_not_fatal() {
        let key = DocumentKey::new("백엔드 개발자", DocType::CoverLetter);
        let rows = vec![
            row(0, cover_letter_json()),
            row(1, serde_json::json!({ "doc_type": "memo" })),
            row(2, cover_letter_json()),
        ];
        let versions: Vec<u32> = decode_rows(&key, rows).iter().map(|v| v.version).collect();
        assert_eq!(versions, vec![0, 2]);
    }

    #[test]
    fn test_version_param_rejects_overflow() {
        assert_eq!(version_param(7).unwrap(), 7);
        assert!(version_param(u32::MAX).is_err());
    }
}
