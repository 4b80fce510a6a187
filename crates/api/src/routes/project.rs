//! Route definitions for the `/projects` resource.
//!
//! Also nests the project-scoped workflow step, form and document routes
//! under `/projects/{project_id}/...`.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{document, form, project, workflow};
use crate::state::AppState;

/// Routes mounted at `/projects`.
///
/// ```text
/// POST   /                                          -> create
/// GET    /{project_id}                              -> get_by_id
///
/// GET    /{project_id}/workflow-steps               -> list
/// POST   /{project_id}/workflow-steps/evaluate      -> evaluate
/// POST   /{project_id}/workflow-steps/{step}/start  -> start
/// POST   /{project_id}/workflow-steps/{step}/complete -> complete
///
/// GET    /{project_id}/forms                        -> list_by_project
///
/// GET    /{project_id}/documents                    -> list_by_project
/// POST   /{project_id}/documents                    -> upload
/// ```
pub fn router() -> Router<AppState> {
    let workflow_routes = Router::new()
        .route("/", get(workflow::list))
        .route("/evaluate", post(workflow::evaluate))
        .route("/{step}/start", post(workflow::start))
        .route("/{step}/complete", post(workflow::complete));

    Router::new()
        .route("/", post(project::create))
        .route("/{project_id}", get(project::get_by_id))
        .nest("/{project_id}/workflow-steps", workflow_routes)
        .route("/{project_id}/forms", get(form::list_by_project))
        .route(
            "/{project_id}/documents",
            get(document::list_by_project).post(document::upload),
        )
}
