//! Repository for the `projects` table.

use casework_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::project::{CreateProject, Project};

const COLUMNS: &str = "id, project_type_id, name, client_name, created_at, updated_at";

/// Provides create and lookup operations for projects.
pub struct ProjectRepo;

impl ProjectRepo {
    /// Insert a new project, returning the created row.
    ///
    /// Takes a connection so the caller can create the project's forms in
    /// the same transaction.
    pub async fn create(
        conn: &mut PgConnection,
        input: &CreateProject,
    ) -> Result<Project, sqlx::Error> {
        let query = format!(
            "INSERT INTO projects (project_type_id, name, client_name)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Project>(&query)
            .bind(input.project_type_id)
            .bind(&input.name)
            .bind(&input.client_name)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Project>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM projects WHERE id = $1");
        sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Name of the project's type, or `None` when the project does not exist.
    pub async fn find_type_name(
        conn: &mut PgConnection,
        project_id: DbId,
    ) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar::<_, String>(
            "SELECT pt.name FROM projects p
             JOIN project_types pt ON pt.id = p.project_type_id
             WHERE p.id = $1",
        )
        .bind(project_id)
        .fetch_optional(&mut *conn)
        .await
    }
}
