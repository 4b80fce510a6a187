use std::sync::Arc;

use casework_db::template_cache::TemplateCache;

use crate::classification::DocumentClassifier;
use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
/// It is also the composition root: the template cache and the document
/// classifier are built once in `main.rs` and injected from here.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: casework_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Memoized form template structure.
    pub template_cache: Arc<TemplateCache>,
    /// External document classification service.
    pub classifier: Arc<dyn DocumentClassifier>,
}
