//! Route definitions for administrative endpoints.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// ```text
/// GET    /template-cache          -> cache_stats
/// POST   /template-cache/clear    -> clear_cache
/// POST   /template-cache/warm     -> warm_cache
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/template-cache", get(admin::cache_stats))
        .route("/template-cache/clear", post(admin::clear_cache))
        .route("/template-cache/warm", post(admin::warm_cache))
}
