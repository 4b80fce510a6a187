//! Loading the per-project step tree and direct step transitions.

use std::collections::HashMap;

use casework_core::types::DbId;
use casework_core::workflow::{StepDefinition, StepReference, StepSummary, WorkflowTree};
use casework_db::repositories::{ProjectWorkflowStepRepo, WorkflowStepRepo};
use casework_db::DbPool;
use serde::Serialize;
use sqlx::PgConnection;

use crate::error::{AppError, AppResult};

/// Outcome of a direct start or complete request.
#[derive(Debug, Clone, Serialize)]
pub struct StepChange {
    /// The addressed step, as it is after the request.
    pub step: StepSummary,
    /// `false` when the step was already in the requested state.
    pub changed: bool,
}

/// Build the step tree of a project's type merged with the project's state.
pub async fn load_tree(conn: &mut PgConnection, project_id: DbId) -> AppResult<WorkflowTree> {
    let definitions: Vec<StepDefinition> =
        WorkflowStepRepo::list_for_project(&mut *conn, project_id)
            .await?
            .into_iter()
            .map(StepDefinition::from)
            .collect();

    let progress = ProjectWorkflowStepRepo::list_by_project(&mut *conn, project_id)
        .await?
        .into_iter()
        .map(|row| (row.workflow_step_id, row.progress()))
        .collect::<HashMap<_, _>>();

    Ok(WorkflowTree::build(definitions, &progress)?)
}

/// Find a step of the tree by id or key.
pub fn resolve_step(tree: &WorkflowTree, reference: &StepReference) -> AppResult<StepSummary> {
    tree.find(reference).ok_or_else(|| AppError::NotFound {
        entity: "WorkflowStep",
        reference: reference.to_string(),
    })
}

/// Mark one step complete.
///
/// Completing an already completed step is a no-op that keeps the original
/// timestamp and reports `changed: false`.
pub async fn complete_step(
    pool: &DbPool,
    project_id: DbId,
    reference: &StepReference,
) -> AppResult<StepChange> {
    let mut tx = pool.begin().await?;
    let tree = load_tree(&mut *tx, project_id).await?;
    let mut step = resolve_step(&tree, reference)?;

    let changed = ProjectWorkflowStepRepo::mark_completed(&mut *tx, project_id, step.id)
        .await?
        .is_some();
    tx.commit().await?;

    if changed {
        tracing::info!(project_id, step_id = step.id, key = ?step.key, "Workflow step completed");
    } else {
        tracing::debug!(project_id, step_id = step.id, "Workflow step already completed");
    }
    step.completed = true;
    Ok(StepChange { step, changed })
}

/// Record that work on a step has started. Starting twice is a no-op.
pub async fn start_step(
    pool: &DbPool,
    project_id: DbId,
    reference: &StepReference,
) -> AppResult<StepChange> {
    let mut tx = pool.begin().await?;
    let tree = load_tree(&mut *tx, project_id).await?;
    let step = resolve_step(&tree, reference)?;

    let changed = ProjectWorkflowStepRepo::mark_started(&mut *tx, project_id, step.id)
        .await?
        .is_some();
    tx.commit().await?;

    if changed {
        tracing::info!(project_id, step_id = step.id, "Workflow step started");
    }
    Ok(StepChange { step, changed })
}
