//! Handlers for template cache administration.

use axum::extract::State;
use axum::Json;
use casework_db::template_cache::CacheStats;

use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/admin/template-cache
pub async fn cache_stats(State(state): State<AppState>) -> Json<DataResponse<CacheStats>> {
    Json(DataResponse {
        data: state.template_cache.stats().await,
    })
}

/// POST /api/v1/admin/template-cache/clear
pub async fn clear_cache(State(state): State<AppState>) -> Json<DataResponse<CacheStats>> {
    state.template_cache.clear().await;
    Json(DataResponse {
        data: state.template_cache.stats().await,
    })
}

/// POST /api/v1/admin/template-cache/warm
///
/// Preloads every form template.
pub async fn warm_cache(State(state): State<AppState>) -> AppResult<Json<DataResponse<CacheStats>>> {
    let mut conn = state.pool.acquire().await?;
    let stats = state.template_cache.warm(&mut *conn, None).await?;
    Ok(Json(DataResponse { data: stats }))
}
