//! Handlers for a project's workflow steps.

use axum::extract::{Path, Query, State};
use axum::Json;
use casework_core::types::DbId;
use casework_core::workflow::{StepReference, StepSummary, WorkflowStepView};
use serde::{Deserialize, Serialize};

use crate::engine::{self, CompletedStep};
use crate::error::AppResult;
use crate::handlers::project::find_project;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `POST .../workflow-steps/evaluate`.
#[derive(Debug, Deserialize)]
pub struct EvaluateParams {
    /// Step id or key to restrict the pass to.
    pub step: Option<String>,
}

/// Response of a direct start or complete request.
#[derive(Debug, Serialize)]
pub struct StepChangeResponse {
    pub step: StepSummary,
    pub changed: bool,
    pub steps: Vec<WorkflowStepView>,
}

/// Response of an evaluation request.
#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub completed_steps: Vec<CompletedStep>,
    pub steps: Vec<WorkflowStepView>,
}

async fn step_views(state: &AppState, project_id: DbId) -> AppResult<Vec<WorkflowStepView>> {
    let mut conn = state.pool.acquire().await?;
    let tree = engine::load_tree(&mut *conn, project_id).await?;
    Ok(tree.to_views())
}

/// GET /api/v1/projects/{project_id}/workflow-steps
pub async fn list(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<WorkflowStepView>>>> {
    find_project(&state.pool, project_id).await?;
    let steps = step_views(&state, project_id).await?;
    Ok(Json(DataResponse { data: steps }))
}

/// POST /api/v1/projects/{project_id}/workflow-steps/{step}/start
pub async fn start(
    State(state): State<AppState>,
    Path((project_id, step)): Path<(DbId, String)>,
) -> AppResult<Json<StepChangeResponse>> {
    let reference: StepReference = step.parse()?;
    find_project(&state.pool, project_id).await?;

    let change = engine::start_step(&state.pool, project_id, &reference).await?;
    let steps = step_views(&state, project_id).await?;
    Ok(Json(StepChangeResponse {
        step: change.step,
        changed: change.changed,
        steps,
    }))
}

/// POST /api/v1/projects/{project_id}/workflow-steps/{step}/complete
///
/// `{step}` is a step key or a numeric step id. Completing a completed step
/// succeeds with `changed: false`.
pub async fn complete(
    State(state): State<AppState>,
    Path((project_id, step)): Path<(DbId, String)>,
) -> AppResult<Json<StepChangeResponse>> {
    let reference: StepReference = step.parse()?;
    find_project(&state.pool, project_id).await?;

    let change = engine::complete_step(&state.pool, project_id, &reference).await?;
    let steps = step_views(&state, project_id).await?;
    Ok(Json(StepChangeResponse {
        step: change.step,
        changed: change.changed,
        steps,
    }))
}

/// POST /api/v1/projects/{project_id}/workflow-steps/evaluate?step=
pub async fn evaluate(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    Query(params): Query<EvaluateParams>,
) -> AppResult<Json<EvaluateResponse>> {
    let scope = params
        .step
        .as_deref()
        .map(str::parse::<StepReference>)
        .transpose()?;
    find_project(&state.pool, project_id).await?;

    let outcome = engine::evaluate_in_transaction(
        &state.pool,
        &state.template_cache,
        project_id,
        scope.as_ref(),
    )
    .await?;
    let steps = step_views(&state, project_id).await?;

    Ok(Json(EvaluateResponse {
        completed_steps: outcome.completed_steps,
        steps,
    }))
}
