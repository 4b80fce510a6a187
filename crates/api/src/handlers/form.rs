//! Handlers for form instances: sections, visible fields, response
//! submission and export of PDF field values.

use std::collections::{HashMap, HashSet};

use axum::extract::{Path, Query, State};
use axum::Json;
use casework_core::dependency::{extract_field_references, is_visible};
use casework_core::error::CoreError;
use casework_core::form_export::{
    build_field_value_pairs, filler_for_template, ExportField, ExportOption, FieldAssignment,
    FieldValuePairs, FillStrategy,
};
use casework_core::forms::{check_section_completion, ResponseRole, SectionCompletion, ROLE_USER};
use casework_core::types::DbId;
use casework_db::models::form::{
    Form, FormSummary, FormTemplateField, FormTemplateFieldOption, FormTemplateSection,
    SubmitFieldValue,
};
use casework_db::repositories::{FormRepo, FormTemplateRepo};
use casework_db::template_cache::TemplateCache;
use casework_db::DbPool;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;

use crate::engine::{self, CompletedStep};
use crate::error::{AppError, AppResult};
use crate::handlers::project::find_project;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

/// A template section with its completion against current responses.
#[derive(Debug, Serialize)]
pub struct SectionView {
    #[serde(flatten)]
    pub section: FormTemplateSection,
    pub completion: SectionCompletion,
}

/// A visible field with its current response.
#[derive(Debug, Serialize)]
pub struct FieldView {
    pub id: DbId,
    pub key: String,
    pub label: String,
    pub field_type: String,
    pub optional: bool,
    pub sequence: i32,
    pub value: Option<String>,
    pub role: Option<String>,
    pub options: Vec<FormTemplateFieldOption>,
    /// Another field of the section depends on this one, so the client
    /// should refetch after it changes.
    pub is_dependency_target: bool,
}

/// Request body for submitting a section.
#[derive(Debug, Deserialize)]
pub struct SubmitSectionResponses {
    pub responses: Vec<SubmitFieldValue>,
}

/// Result of a section submission.
#[derive(Debug, Serialize)]
pub struct SubmitSectionResult {
    pub saved: usize,
    /// Keys ignored because the value was empty or the key is unknown.
    pub skipped: Vec<String>,
    pub completion: SectionCompletion,
    pub completed_steps: Vec<CompletedStep>,
}

/// Query parameters for the export endpoint.
#[derive(Debug, Deserialize)]
pub struct ExportParams {
    /// Comma-separated PDF element names to resolve. Defaults to every
    /// field name that has a value.
    pub targets: Option<String>,
}

/// Field values ready to be written into the template's PDF.
#[derive(Debug, Serialize)]
pub struct FormExport {
    pub form_id: DbId,
    pub template_name: String,
    pub strategy: FillStrategy,
    pub values: FieldValuePairs,
    pub assignments: Vec<FieldAssignment>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn find_form(pool: &DbPool, id: DbId) -> AppResult<Form> {
    FormRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound { entity: "Form", id }))
}

/// Load a section and check it belongs to the form's template.
async fn find_section(
    conn: &mut PgConnection,
    cache: &TemplateCache,
    form: &Form,
    section_id: DbId,
) -> AppResult<FormTemplateSection> {
    cache
        .section(conn, section_id)
        .await?
        .filter(|s| s.form_template_id == form.form_template_id)
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "FormTemplateSection",
            id: section_id,
        }))
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/projects/{project_id}/forms
pub async fn list_by_project(
    State(state): State<AppState>,
    Path(project_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<FormSummary>>>> {
    find_project(&state.pool, project_id).await?;
    let forms = FormRepo::list_by_project(&state.pool, project_id).await?;
    Ok(Json(DataResponse { data: forms }))
}

/// GET /api/v1/forms/{form_id}/sections
pub async fn list_sections(
    State(state): State<AppState>,
    Path(form_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<SectionView>>>> {
    let form = find_form(&state.pool, form_id).await?;
    let mut conn = state.pool.acquire().await?;

    let responses = FormRepo::response_values(&mut *conn, form.id).await?;
    let sections = state
        .template_cache
        .template_sections(&mut *conn, form.form_template_id)
        .await?;

    let mut views = Vec::with_capacity(sections.len());
    for section in sections {
        let fields = state
            .template_cache
            .section_fields(&mut *conn, section.id)
            .await?;
        let completion =
            check_section_completion(fields.iter().map(FormTemplateField::requirement), &responses);
        views.push(SectionView {
            section,
            completion,
        });
    }

    Ok(Json(DataResponse { data: views }))
}

/// GET /api/v1/forms/{form_id}/sections/{section_id}/fields
///
/// Only fields whose dependency expression currently holds are returned.
pub async fn list_fields(
    State(state): State<AppState>,
    Path((form_id, section_id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<Vec<FieldView>>>> {
    let form = find_form(&state.pool, form_id).await?;
    let mut conn = state.pool.acquire().await?;
    let cache = &state.template_cache;

    let section = find_section(&mut *conn, cache, &form, section_id).await?;
    let fields = cache.section_fields(&mut *conn, section.id).await?;

    let values = FormRepo::response_values(&mut *conn, form.id).await?;
    let stored: HashMap<DbId, (String, String)> = FormRepo::list_responses(&mut *conn, form.id)
        .await?
        .into_iter()
        .map(|r| (r.form_template_field_id, (r.value, r.role)))
        .collect();

    let dependency_targets: HashSet<String> = fields
        .iter()
        .filter_map(|f| f.dependency_expression.as_deref())
        .flat_map(extract_field_references)
        .collect();

    let field_ids: Vec<DbId> = fields.iter().map(|f| f.id).collect();
    let mut options = cache.field_options(&mut *conn, &field_ids).await?;

    let views = fields
        .into_iter()
        .filter(|f| is_visible(f.dependency_expression.as_deref(), &values))
        .map(|f| {
            let (value, role) = match stored.get(&f.id) {
                Some((value, role)) => (Some(value.clone()), Some(role.clone())),
                None => (None, None),
            };
            FieldView {
                is_dependency_target: dependency_targets.contains(&f.key),
                options: options.remove(&f.id).unwrap_or_default(),
                id: f.id,
                key: f.key,
                label: f.label,
                field_type: f.field_type,
                optional: f.optional,
                sequence: f.sequence,
                value,
                role,
            }
        })
        .collect();

    Ok(Json(DataResponse { data: views }))
}

/// POST /api/v1/forms/{form_id}/sections/{section_id}/responses
///
/// Saves the submitted values, then runs a workflow evaluation for the
/// form's project. Evaluation failures do not undo the saved responses.
pub async fn submit_responses(
    State(state): State<AppState>,
    Path((form_id, section_id)): Path<(DbId, DbId)>,
    Json(input): Json<SubmitSectionResponses>,
) -> AppResult<Json<SubmitSectionResult>> {
    let mut roles = Vec::with_capacity(input.responses.len());
    for response in &input.responses {
        let role = ResponseRole::from_str_value(response.role.as_deref().unwrap_or(ROLE_USER))
            .map_err(AppError::BadRequest)?;
        roles.push(role);
    }

    let form = find_form(&state.pool, form_id).await?;
    let cache = &state.template_cache;

    let mut tx = state.pool.begin().await?;
    let section = find_section(&mut *tx, cache, &form, section_id).await?;
    let fields = cache.section_fields(&mut *tx, section.id).await?;
    let by_key: HashMap<&str, &FormTemplateField> =
        fields.iter().map(|f| (f.key.as_str(), f)).collect();

    let mut saved = 0;
    let mut skipped = Vec::new();
    for (response, role) in input.responses.iter().zip(roles) {
        let Some(value) = response.value.as_deref().filter(|v| !v.trim().is_empty()) else {
            skipped.push(response.key.clone());
            continue;
        };
        let Some(field) = by_key.get(response.key.as_str()) else {
            tracing::warn!(
                form_id,
                section = %section.name,
                key = %response.key,
                "Ignoring response for unknown field",
            );
            skipped.push(response.key.clone());
            continue;
        };
        FormRepo::upsert_response(&mut *tx, form.id, field.id, value, role.as_str()).await?;
        saved += 1;
    }

    let values = FormRepo::response_values(&mut *tx, form.id).await?;
    let completion =
        check_section_completion(fields.iter().map(FormTemplateField::requirement), &values);
    tx.commit().await?;

    tracing::info!(
        form_id,
        section = %section.name,
        saved,
        skipped = skipped.len(),
        complete = completion.complete,
        "Section responses saved",
    );

    let completed_steps =
        engine::evaluate_after_write(&state, form.project_id, "section_submitted").await;

    Ok(Json(SubmitSectionResult {
        saved,
        skipped,
        completion,
        completed_steps,
    }))
}

/// GET /api/v1/forms/{form_id}/export?targets=
pub async fn export(
    State(state): State<AppState>,
    Path(form_id): Path<DbId>,
    Query(params): Query<ExportParams>,
) -> AppResult<Json<FormExport>> {
    let form = find_form(&state.pool, form_id).await?;
    let mut conn = state.pool.acquire().await?;
    let cache = &state.template_cache;

    let template = FormTemplateRepo::find_by_id(&mut *conn, form.form_template_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "FormTemplate",
            id: form.form_template_id,
        }))?;
    let filler = filler_for_template(&template.name).ok_or_else(|| {
        AppError::BadRequest(format!("Form template '{}' cannot be exported", template.name))
    })?;

    let mut fields: Vec<FormTemplateField> = Vec::new();
    for section in cache.template_sections(&mut *conn, template.id).await? {
        fields.extend(cache.section_fields(&mut *conn, section.id).await?);
    }
    let field_ids: Vec<DbId> = fields.iter().map(|f| f.id).collect();
    let options = cache.field_options(&mut *conn, &field_ids).await?;

    let responses: HashMap<DbId, String> = FormRepo::list_responses(&mut *conn, form.id)
        .await?
        .into_iter()
        .map(|r| (r.form_template_field_id, r.value))
        .collect();

    let mut export_fields = Vec::with_capacity(fields.len());
    for field in &fields {
        export_fields.push(ExportField {
            id: field.id,
            field_type: field.parsed_type().map_err(AppError::InternalError)?,
            pdf_field_name: field.pdf_field_name.as_deref(),
            should_fill_on_form: field.should_fill_on_form,
        });
    }
    let export_options: HashMap<DbId, Vec<ExportOption<'_>>> = options
        .iter()
        .map(|(field_id, opts)| {
            let opts = opts
                .iter()
                .map(|o| ExportOption {
                    id: o.id,
                    pdf_field_name: o.pdf_field_name.as_deref(),
                })
                .collect();
            (*field_id, opts)
        })
        .collect();

    let values = build_field_value_pairs(&export_fields, &export_options, &responses);
    let targets: Vec<String> = match params.targets.as_deref() {
        Some(raw) => raw
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        None => values.keys().cloned().collect(),
    };
    let assignments = filler.assign(&values, &targets);

    Ok(Json(FormExport {
        form_id: form.id,
        template_name: template.name,
        strategy: filler.strategy(),
        values,
        assignments,
    }))
}
