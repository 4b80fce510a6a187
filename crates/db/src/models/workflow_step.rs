//! Workflow step definitions and per-project step state.

use casework_core::types::{DbId, Timestamp};
use casework_core::workflow::{StepDefinition, StepProgress};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `workflow_steps` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct WorkflowStep {
    pub id: DbId,
    pub project_type_id: DbId,
    pub parent_step_id: Option<DbId>,
    pub key: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub sequence: i32,
    pub estimated_duration_min: Option<i32>,
    pub estimated_duration_max: Option<i32>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<WorkflowStep> for StepDefinition {
    fn from(row: WorkflowStep) -> Self {
        Self {
            id: row.id,
            name: row.name,
            key: row.key,
            description: row.description,
            sequence: row.sequence,
            parent_step_id: row.parent_step_id,
            estimated_duration_min: row.estimated_duration_min,
            estimated_duration_max: row.estimated_duration_max,
        }
    }
}

/// A row from the `project_workflow_steps` table.
///
/// At most one row exists per (project, step); a missing row means the step
/// has neither started nor completed.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ProjectWorkflowStep {
    pub id: DbId,
    pub project_id: DbId,
    pub workflow_step_id: DbId,
    pub started_at: Option<Timestamp>,
    pub completed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ProjectWorkflowStep {
    pub fn progress(&self) -> StepProgress {
        StepProgress {
            started_at: self.started_at,
            completed_at: self.completed_at,
        }
    }
}
