//! Form template structure, form instances and field responses.

use casework_core::forms::{FieldRequirement, FieldType};
use casework_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `form_templates` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FormTemplate {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `form_template_sections` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FormTemplateSection {
    pub id: DbId,
    pub form_template_id: DbId,
    pub name: String,
    pub title: Option<String>,
    pub sequence: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `form_template_fields` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FormTemplateField {
    pub id: DbId,
    pub section_id: DbId,
    /// Stable identifier referenced by dependency expressions.
    pub key: String,
    pub label: String,
    pub field_type: String,
    pub optional: bool,
    pub dependency_expression: Option<String>,
    pub sequence: i32,
    pub pdf_field_name: Option<String>,
    pub should_fill_on_form: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl FormTemplateField {
    /// Parsed field type. The table constraint keeps the stored value valid.
    pub fn parsed_type(&self) -> Result<FieldType, String> {
        FieldType::from_str_value(&self.field_type)
    }

    pub fn requirement(&self) -> FieldRequirement<'_> {
        FieldRequirement {
            key: &self.key,
            optional: self.optional,
            dependency_expression: self.dependency_expression.as_deref(),
        }
    }
}

/// A row from the `form_template_field_options` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FormTemplateFieldOption {
    pub id: DbId,
    pub field_id: DbId,
    pub key: String,
    pub label: String,
    pub sequence: i32,
    pub pdf_field_name: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `forms` table: one template instance per project.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Form {
    pub id: DbId,
    pub project_id: DbId,
    pub form_template_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A form joined with its template name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FormSummary {
    pub id: DbId,
    pub project_id: DbId,
    pub form_template_id: DbId,
    pub template_name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `form_field_responses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FormFieldResponse {
    pub id: DbId,
    pub form_id: DbId,
    pub form_template_field_id: DbId,
    pub value: String,
    pub role: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for one submitted field value.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitFieldValue {
    pub key: String,
    pub value: Option<String>,
    /// Defaults to `user` when omitted.
    pub role: Option<String>,
}
