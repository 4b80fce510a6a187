//! Repository for the `project_workflow_steps` table.
//!
//! State rows are created lazily by the first start or completion and
//! updated in place afterwards. Both writes are single-statement upserts
//! against `uq_project_workflow_steps`, so concurrent writers converge on
//! one row and an existing `completed_at` is never overwritten.

use casework_core::types::DbId;
use sqlx::PgConnection;

use crate::models::workflow_step::ProjectWorkflowStep;

const COLUMNS: &str =
    "id, project_id, workflow_step_id, started_at, completed_at, created_at, updated_at";

/// Per-project step progress.
pub struct ProjectWorkflowStepRepo;

impl ProjectWorkflowStepRepo {
    /// All state rows of a project.
    pub async fn list_by_project(
        conn: &mut PgConnection,
        project_id: DbId,
    ) -> Result<Vec<ProjectWorkflowStep>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM project_workflow_steps
             WHERE project_id = $1
             ORDER BY workflow_step_id ASC"
        );
        sqlx::query_as::<_, ProjectWorkflowStep>(&query)
            .bind(project_id)
            .fetch_all(&mut *conn)
            .await
    }

    /// Mark a step completed now.
    ///
    /// Returns the row only when this call completed the step. An already
    /// completed step is left untouched and yields `None`.
    pub async fn mark_completed(
        conn: &mut PgConnection,
        project_id: DbId,
        workflow_step_id: DbId,
    ) -> Result<Option<ProjectWorkflowStep>, sqlx::Error> {
        let query = format!(
            "INSERT INTO project_workflow_steps (project_id, workflow_step_id, started_at, completed_at)
             VALUES ($1, $2, NOW(), NOW())
             ON CONFLICT ON CONSTRAINT uq_project_workflow_steps DO UPDATE SET
                started_at = COALESCE(project_workflow_steps.started_at, EXCLUDED.started_at),
                completed_at = EXCLUDED.completed_at
             WHERE project_workflow_steps.completed_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProjectWorkflowStep>(&query)
            .bind(project_id)
            .bind(workflow_step_id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Mark a step started now. Returns the row only when this call started it.
    pub async fn mark_started(
        conn: &mut PgConnection,
        project_id: DbId,
        workflow_step_id: DbId,
    ) -> Result<Option<ProjectWorkflowStep>, sqlx::Error> {
        let query = format!(
            "INSERT INTO project_workflow_steps (project_id, workflow_step_id, started_at)
             VALUES ($1, $2, NOW())
             ON CONFLICT ON CONSTRAINT uq_project_workflow_steps DO UPDATE SET
                started_at = EXCLUDED.started_at
             WHERE project_workflow_steps.started_at IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ProjectWorkflowStep>(&query)
            .bind(project_id)
            .bind(workflow_step_id)
            .fetch_optional(&mut *conn)
            .await
    }
}
