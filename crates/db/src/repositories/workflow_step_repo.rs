//! Repository for the `workflow_steps` table.

use casework_core::types::DbId;
use sqlx::PgConnection;

use crate::models::workflow_step::WorkflowStep;

const COLUMNS: &str = "id, project_type_id, parent_step_id, key, name, description, sequence, \
     estimated_duration_min, estimated_duration_max, created_at, updated_at";

/// Read access to step definitions.
pub struct WorkflowStepRepo;

impl WorkflowStepRepo {
    /// All steps for the type of the given project.
    pub async fn list_for_project(
        conn: &mut PgConnection,
        project_id: DbId,
    ) -> Result<Vec<WorkflowStep>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM workflow_steps
             WHERE project_type_id = (SELECT project_type_id FROM projects WHERE id = $1)
             ORDER BY sequence ASC, id ASC"
        );
        sqlx::query_as::<_, WorkflowStep>(&query)
            .bind(project_id)
            .fetch_all(&mut *conn)
            .await
    }
}
