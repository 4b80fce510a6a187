//! Repository for the `documents` table.

use casework_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::document::{CreateDocument, Document};

const COLUMNS: &str = "id, project_id, file_name, content_type, size_bytes, inferred_type_id, \
     extracted_data, created_at, updated_at";

/// Provides create, classify and list operations for documents.
pub struct DocumentRepo;

impl DocumentRepo {
    /// Record an uploaded document. It starts unclassified.
    pub async fn create(pool: &PgPool, input: &CreateDocument) -> Result<Document, sqlx::Error> {
        let query = format!(
            "INSERT INTO documents (project_id, file_name, content_type, size_bytes)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(input.project_id)
            .bind(&input.file_name)
            .bind(&input.content_type)
            .bind(input.size_bytes)
            .fetch_one(pool)
            .await
    }

    /// Documents of a project, newest first.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<Document>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM documents
             WHERE project_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await
    }

    /// Store the classification result of a document.
    pub async fn set_classification(
        pool: &PgPool,
        id: DbId,
        inferred_type_id: DbId,
        extracted_data: Option<&serde_json::Value>,
    ) -> Result<Option<Document>, sqlx::Error> {
        let query = format!(
            "UPDATE documents SET
                inferred_type_id = $2,
                extracted_data = COALESCE($3, extracted_data)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Document>(&query)
            .bind(id)
            .bind(inferred_type_id)
            .bind(extracted_data)
            .fetch_optional(pool)
            .await
    }

    /// Distinct resolved type ids among a project's documents.
    pub async fn inferred_type_ids(
        conn: &mut PgConnection,
        project_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT DISTINCT inferred_type_id FROM documents
             WHERE project_id = $1 AND inferred_type_id IS NOT NULL
             ORDER BY inferred_type_id ASC",
        )
        .bind(project_id)
        .fetch_all(&mut *conn)
        .await
    }
}
