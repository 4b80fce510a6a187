//! Repository for the `document_types` table.

use casework_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::document::DocumentType;

const COLUMNS: &str = "id, code, name, description, required, sequence, created_at, updated_at";

/// Document type lookup and classification upserts.
pub struct DocumentTypeRepo;

impl DocumentTypeRepo {
    /// All document types in display order.
    pub async fn list(pool: &PgPool) -> Result<Vec<DocumentType>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM document_types ORDER BY sequence ASC, id ASC");
        sqlx::query_as::<_, DocumentType>(&query)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_code(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<DocumentType>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM document_types WHERE code = $1");
        sqlx::query_as::<_, DocumentType>(&query)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    /// Fetch the type with `code`, creating a non-required one if absent.
    ///
    /// Classification may report codes nobody seeded; those become new
    /// types named after the code.
    pub async fn upsert_by_code(pool: &PgPool, code: &str) -> Result<DocumentType, sqlx::Error> {
        let query = format!(
            "INSERT INTO document_types (code, name, sequence)
             VALUES ($1, $1, (SELECT COALESCE(MAX(sequence), 0) + 1 FROM document_types))
             ON CONFLICT ON CONSTRAINT uq_document_types_code DO UPDATE SET
                code = EXCLUDED.code
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, DocumentType>(&query)
            .bind(code)
            .fetch_one(pool)
            .await
    }

    /// Ids of every type flagged required.
    pub async fn required_ids(conn: &mut PgConnection) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT id FROM document_types WHERE required ORDER BY id ASC",
        )
        .fetch_all(&mut *conn)
        .await
    }
}
