mod config;
mod embedding;
mod errors;
mod feedback;
mod jobs;
mod llm_client;
mod models;
mod routes;
mod state;
mod store;
#[cfg(test)]
mod test_support;
mod versioning;

use anyhow::Result;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::{Config, StorageBackendKind};
use crate::embedding::{EmbeddingProvider, OpenAiEmbeddingClient};
use crate::feedback::generator::FeedbackGenerator;
use crate::jobs::JobCatalog;
use crate::llm_client::{CompletionProvider, LlmClient};
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{DocumentStore, FsStorage, PgStorage, StorageBackend};
use crate::versioning::manager::VersionManager;
use crate::versioning::retrieval::SimilarityRetriever;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Coach API v{}", env!("CARGO_PKG_VERSION"));

    let backend = build_backend(&config).await?;

    let embedder = OpenAiEmbeddingClient::new(
        config.embedding_api_url.clone(),
        config.embedding_api_key.clone(),
        config.embedding_model.clone(),
    )?;
    info!("Embedding client initialized (model: {})", embedder.model());
    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(embedder);

    let llm: Arc<dyn CompletionProvider> =
        Arc::new(LlmClient::new(config.anthropic_api_key.clone())?);
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    let retriever = SimilarityRetriever::new(config.retrieval_top_k);
    info!("Similarity retrieval top_k = {}", retriever.top_k());

    let versions = VersionManager::new(
        DocumentStore::new(backend, embedder.clone()),
        embedder,
        FeedbackGenerator::new(llm.clone()),
        retriever,
        JobCatalog,
    );

    let state = AppState {
        versions: Arc::new(versions),
        llm,
        catalog: JobCatalog,
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the editor's deploy domain is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Filesystem by default; Postgres when STORAGE_BACKEND=postgres.
async fn build_backend(config: &Config) -> Result<Arc<dyn StorageBackend>> {
    match config.storage_backend {
        StorageBackendKind::Fs => {
            tokio::fs::create_dir_all(&config.data_dir).await?;
            info!("Storing documents under {}", config.data_dir.display());
            Ok(Arc::new(FsStorage::new(config.data_dir.clone())))
        }
        StorageBackendKind::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for the postgres backend"))?;
            let pg = PgStorage::connect(url).await?;
            info!("Storing documents in PostgreSQL");
            Ok(Arc::new(pg))
        }
    }
}
