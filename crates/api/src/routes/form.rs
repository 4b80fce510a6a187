//! Route definitions for the `/forms` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::form;
use crate::state::AppState;

/// Routes mounted at `/forms`.
///
/// ```text
/// GET    /{form_id}/sections                            -> list_sections
/// GET    /{form_id}/sections/{section_id}/fields        -> list_fields
/// POST   /{form_id}/sections/{section_id}/responses     -> submit_responses
/// GET    /{form_id}/export                              -> export
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{form_id}/sections", get(form::list_sections))
        .route(
            "/{form_id}/sections/{section_id}/fields",
            get(form::list_fields),
        )
        .route(
            "/{form_id}/sections/{section_id}/responses",
            post(form::submit_responses),
        )
        .route("/{form_id}/export", get(form::export))
}
