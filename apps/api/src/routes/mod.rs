pub mod catalog;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::feedback::handlers as feedback;
use crate::feedback::portfolio::MAX_PDF_BYTES;
use crate::state::AppState;
use crate::versioning::handlers as versions;

/// Room for the multipart framing around a maximum-size PDF.
const PORTFOLIO_BODY_LIMIT: usize = MAX_PDF_BYTES + 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Catalog
        .route("/api/v1/jobs", get(catalog::handle_list_jobs))
        .route("/api/v1/jobs/:job_slug", get(catalog::handle_get_job))
        .route("/api/v1/schemas/:doc_type", get(catalog::handle_get_schema))
        // Versioned documents
        .route(
            "/api/v1/documents/:job_slug/:doc_type",
            get(versions::handle_history),
        )
        .route(
            "/api/v1/documents/:job_slug/:doc_type/analyze",
            post(versions::handle_analyze),
        )
        .route(
            "/api/v1/documents/:job_slug/:doc_type/rollback",
            post(versions::handle_rollback),
        )
        // Portfolio summary
        .route(
            "/api/v1/portfolio/summary",
            post(feedback::handle_portfolio_summary)
                .layer(DefaultBodyLimit::max(PORTFOLIO_BODY_LIMIT)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::feedback::generator::FeedbackGenerator;
    use crate::jobs::JobCatalog;
    use crate::llm_client::CompletionProvider;
    use crate::store::{DocumentStore, FsStorage};
    use crate::test_support::{cover_letter_feedback_json, CountingEmbedder, ScriptedCompletion};
    use crate::versioning::manager::VersionManager;
    use crate::versioning::retrieval::SimilarityRetriever;

    // Percent-encoded "백엔드-개발자"
    const BACKEND_SLUG: &str = "%EB%B0%B1%EC%97%94%EB%93%9C-%EA%B0%9C%EB%B0%9C%EC%9E%90";

    fn test_app(dir: &tempfile::TempDir, reply: &str) -> Router {
        let embedder = Arc::new(CountingEmbedder::default());
        let llm: Arc<dyn CompletionProvider> = Arc::new(ScriptedCompletion::replying(reply));
        let store = DocumentStore::new(
            Arc::new(FsStorage::new(dir.path().to_path_buf())),
            embedder.clone(),
        );
        let versions = VersionManager::new(
            store,
            embedder,
            FeedbackGenerator::new(llm.clone()),
            SimilarityRetriever::default(),
            JobCatalog,
        );
        build_router(AppState {
            versions: Arc::new(versions),
            llm,
            catalog: JobCatalog,
        })
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, "{}");
        let (status, body) = send(&app, get_req("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "coach-api");
    }

    #[tokio::test]
    async fn test_catalog_routes() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, "{}");

        let (status, body) = send(&app, get_req("/api/v1/jobs")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.as_array().unwrap().len() > 1);

        let (status, body) = send(&app, get_req(&format!("/api/v1/jobs/{BACKEND_SLUG}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["title"], "백엔드 개발자");

        let (status, body) = send(&app, get_req("/api/v1/jobs/astronaut")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");

        let (status, body) = send(&app, get_req("/api/v1/schemas/cover_letter")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["fields"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_analyze_history_rollback_flow() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, &cover_letter_feedback_json());
        let base = format!("/api/v1/documents/{BACKEND_SLUG}/cover_letter");

        let drafts = [
            (0, "지원 동기 없음"),
            (1, "결제 시스템 경험 기반 지원 동기"),
            (2, "지원 동기 세 번째"),
        ];
        for (version, reason) in drafts {
            let (status, body) = send(
                &app,
                post_json(
                    &format!("{base}/analyze"),
                    json!({ "version": version, "content": { "reason_for_application": reason } }),
                ),
            )
            .await;
            assert_eq!(status, StatusCode::OK, "{body}");
            assert_eq!(body["version"], version);
        }

        let (status, body) = send(&app, get_req(&base)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "has_versions");
        assert_eq!(body["latest"], 2);
        assert_eq!(body["next_version"], 3);
        assert!(body["versions"][0].get("embedding").is_none());

        let (status, body) = send(
            &app,
            post_json(&format!("{base}/rollback"), json!({ "target_version": 0 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["deleted"], 2);

        let (_, body) = send(&app, get_req(&base)).await;
        assert_eq!(body["versions"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_analyze_rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, &cover_letter_feedback_json());

        let (status, body) = send(
            &app,
            post_json(
                &format!("/api/v1/documents/{BACKEND_SLUG}/memo/analyze"),
                json!({ "version": 0, "content": {} }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

        let (status, _) = send(
            &app,
            post_json(
                &format!("/api/v1/documents/{BACKEND_SLUG}/resume/analyze"),
                json!({ "version": 0, "content": { "education": 3 } }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_empty_history_is_no_versions() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, "{}");
        let (status, body) = send(
            &app,
            get_req(&format!("/api/v1/documents/{BACKEND_SLUG}/resume")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "no_versions");
        assert_eq!(body["next_version"], 0);
    }

    #[tokio::test]
    async fn test_portfolio_summary_from_link() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_app(&dir, "결제 시스템 프로젝트 중심의 포트폴리오입니다.");

        let boundary = "XBOUNDARY";
        let body = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"job_title\"\r\n\r\n백엔드 개발자\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"portfolio_link\"\r\n\r\ngithub.com/me\r\n\
             --{b}--\r\n",
            b = boundary
        );
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/portfolio/summary")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap();

        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["job_title"], "백엔드 개발자");
        assert!(body["summary"].as_str().unwrap().starts_with("결제 시스템"));
    }
}
