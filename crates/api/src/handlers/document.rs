//! Handlers for document types and project documents.
//!
//! An upload is recorded first and committed on its own. Classification,
//! storing its result, and the workflow evaluation that follows are
//! best-effort: when any of them fails the document still exists, just
//! without an inferred type or with the workflow left where it was.

use std::time::Duration;

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use casework_core::types::DbId;
use casework_db::models::document::{CreateDocument, Document, DocumentType};
use casework_db::repositories::{DocumentRepo, DocumentTypeRepo};
use serde::Serialize;

use crate::classification::{Classification, ClassificationError};
use crate::engine::{self, CompletedStep};
use crate::error::{AppError, AppResult};
use crate::handlers::project::find_project;
use crate::response::DataResponse;
use crate::state::AppState;

/// Response of an upload.
#[derive(Debug, Serialize)]
pub struct UploadedDocument {
    pub document: Document,
    pub completed_steps: Vec<CompletedStep>,
}

/// GET /api/v1/document-types
pub async fn list_types(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<DocumentType>>>> {
    let types = DocumentTypeRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: types }))
}

/// GET /api/v1/projects/{project_id}/documents
pub async fn list_by_project(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<Document>>>> {
    find_project(&state.pool, project_id).await?;
    let documents = DocumentRepo::list_by_project(&state.pool, project_id).await?;
    Ok(Json(DataResponse { data: documents }))
}

/// POST /api/v1/projects/{project_id}/documents
///
/// Accepts a multipart form with a required `file` field and an optional
/// `document_type` field holding a known type code. Without the hint the
/// configured classifier decides the type.
pub async fn upload(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
    mut multipart: Multipart,
) -> AppResult<(StatusCode, Json<UploadedDocument>)> {
    find_project(&state.pool, project_id).await?;

    let mut file: Option<(String, Option<String>, Vec<u8>)> = None;
    let mut type_hint: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await?;
                file = Some((file_name, content_type, data.to_vec()));
            }
            "document_type" => {
                let text = field.text().await?;
                type_hint = Some(text.trim().to_string()).filter(|t| !t.is_empty());
            }
            _ => {}
        }
    }

    let (file_name, content_type, data) =
        file.ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;

    let hinted_type = match type_hint.as_deref() {
        Some(code) => {
            let document_type = DocumentTypeRepo::find_by_code(&state.pool, code)
                .await?
                .ok_or_else(|| AppError::BadRequest(format!("Unknown document type '{code}'")))?;
            Some(document_type)
        }
        None => None,
    };

    let input = CreateDocument {
        project_id,
        file_name,
        content_type,
        size_bytes: data.len() as i64,
    };
    let mut document = DocumentRepo::create(&state.pool, &input).await?;
    tracing::info!(
        project_id,
        document_id = document.id,
        file_name = %document.file_name,
        size_bytes = document.size_bytes,
        "Document recorded",
    );

    let classified = match hinted_type {
        Some(document_type) => Some(ClassifiedAs::Known(document_type)),
        None => match classify(&state, &input, &data).await {
            Ok(Some(classification)) => Some(ClassifiedAs::Inferred(classification)),
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(
                    project_id,
                    document_id = document.id,
                    error = %e,
                    "Document classification failed, keeping document unclassified",
                );
                None
            }
        },
    };

    if let Some(classified) = classified {
        match record_classification(&state, document.id, classified).await {
            Ok(Some(updated)) => document = updated,
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(
                    project_id,
                    document_id = document.id,
                    error = %e,
                    "Failed to store document classification, keeping document unclassified",
                );
            }
        }
    }

    let completed_steps =
        engine::evaluate_after_write(&state, project_id, "document_created").await;

    Ok((
        StatusCode::CREATED,
        Json(UploadedDocument {
            document,
            completed_steps,
        }),
    ))
}

/// Where an upload's document type came from.
enum ClassifiedAs {
    /// Code supplied by the client and already validated.
    Known(DocumentType),
    /// Result of the classifier; its code may not exist yet.
    Inferred(Classification),
}

/// Store the type of an already committed document.
///
/// Runs after the upload itself is durable, so callers log a failure here
/// instead of failing the request.
async fn record_classification(
    state: &AppState,
    document_id: DbId,
    classified: ClassifiedAs,
) -> Result<Option<Document>, sqlx::Error> {
    let (document_type, extracted_data) = match classified {
        ClassifiedAs::Known(document_type) => (document_type, None),
        ClassifiedAs::Inferred(classification) => {
            let document_type =
                DocumentTypeRepo::upsert_by_code(&state.pool, &classification.type_code).await?;
            (document_type, classification.extracted_data)
        }
    };

    let updated = DocumentRepo::set_classification(
        &state.pool,
        document_id,
        document_type.id,
        extracted_data.as_ref(),
    )
    .await?;
    if let Some(document) = &updated {
        tracing::info!(
            document_id = document.id,
            document_type = %document_type.code,
            "Document classified",
        );
    }
    Ok(updated)
}

/// Ask the classifier, bounded by `CLASSIFIER_TIMEOUT_SECS`.
async fn classify(
    state: &AppState,
    input: &CreateDocument,
    data: &[u8],
) -> Result<Option<Classification>, ClassificationError> {
    let secs = state.config.classifier_timeout_secs;
    let call = state
        .classifier
        .classify(&input.file_name, input.content_type.as_deref(), data);
    match tokio::time::timeout(Duration::from_secs(secs), call).await {
        Ok(result) => result,
        Err(_) => Err(ClassificationError::Timeout(secs)),
    }
}
