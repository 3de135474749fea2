use std::sync::Arc;

use crate::jobs::JobCatalog;
use crate::llm_client::CompletionProvider;
use crate::versioning::manager::VersionManager;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub versions: Arc<VersionManager>,
    /// Used directly only by portfolio summaries; feedback goes through `versions`.
    pub llm: Arc<dyn CompletionProvider>,
    pub catalog: JobCatalog,
}
