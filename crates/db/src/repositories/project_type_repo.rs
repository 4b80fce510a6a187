//! Repository for the `project_types` table.

use casework_core::types::DbId;
use sqlx::PgPool;

use crate::models::project::ProjectType;

const COLUMNS: &str = "id, name, description, created_at, updated_at";

/// Read access to the seeded project types.
pub struct ProjectTypeRepo;

impl ProjectTypeRepo {
    /// List all project types ordered by name.
    pub async fn list(pool: &PgPool) -> Result<Vec<ProjectType>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM project_types ORDER BY name ASC");
        sqlx::query_as::<_, ProjectType>(&query)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ProjectType>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM project_types WHERE id = $1");
        sqlx::query_as::<_, ProjectType>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_name(
        pool: &PgPool,
        name: &str,
    ) -> Result<Option<ProjectType>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM project_types WHERE name = $1");
        sqlx::query_as::<_, ProjectType>(&query)
            .bind(name)
            .fetch_optional(pool)
            .await
    }
}
