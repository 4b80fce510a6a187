pub mod admin;
pub mod form;
pub mod health;
pub mod project;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /project-types                                       list
/// /document-types                                      list
///
/// /projects                                            create
/// /projects/{project_id}                               get
/// /projects/{project_id}/workflow-steps                list with active step
/// /projects/{project_id}/workflow-steps/evaluate       evaluate (POST, ?step=)
/// /projects/{project_id}/workflow-steps/{step}/start   start (POST)
/// /projects/{project_id}/workflow-steps/{step}/complete  complete (POST)
/// /projects/{project_id}/forms                         list
/// /projects/{project_id}/documents                     list, upload
///
/// /forms/{form_id}/sections                            list with completion
/// /forms/{form_id}/sections/{section_id}/fields        visible fields
/// /forms/{form_id}/sections/{section_id}/responses     submit (POST)
/// /forms/{form_id}/export                              PDF field values
///
/// /admin/template-cache                                stats
/// /admin/template-cache/clear                          clear (POST)
/// /admin/template-cache/warm                           warm (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/project-types", get(handlers::project::list_types))
        .route("/document-types", get(handlers::document::list_types))
        .nest("/projects", project::router())
        .nest("/forms", form::router())
        .nest("/admin", admin::router())
}
