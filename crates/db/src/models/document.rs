//! Document and document type models.

use casework_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `document_types` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DocumentType {
    pub id: DbId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    /// Required types gate completion of the document-gathering step.
    pub required: bool,
    pub sequence: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `documents` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Document {
    pub id: DbId,
    pub project_id: DbId,
    pub file_name: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
    /// `None` until the document has been classified.
    pub inferred_type_id: Option<DbId>,
    pub extracted_data: Option<serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for recording an uploaded document.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateDocument {
    pub project_id: DbId,
    pub file_name: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
}
