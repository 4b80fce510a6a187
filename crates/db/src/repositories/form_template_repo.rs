//! Repository for form template structure: templates, sections, fields
//! and options. All of it is immutable at runtime, which is what lets
//! [`crate::template_cache::TemplateCache`] memoize these reads.

use casework_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::form::{
    FormTemplate, FormTemplateField, FormTemplateFieldOption, FormTemplateSection,
};

const TEMPLATE_COLUMNS: &str = "id, name, description, created_at, updated_at";

const SECTION_COLUMNS: &str = "id, form_template_id, name, title, sequence, created_at, updated_at";

const FIELD_COLUMNS: &str = "id, section_id, key, label, field_type, optional, \
     dependency_expression, sequence, pdf_field_name, should_fill_on_form, created_at, updated_at";

const OPTION_COLUMNS: &str =
    "id, field_id, key, label, sequence, pdf_field_name, created_at, updated_at";

/// Read access to form template structure.
pub struct FormTemplateRepo;

impl FormTemplateRepo {
    pub async fn list(pool: &PgPool) -> Result<Vec<FormTemplate>, sqlx::Error> {
        let query = format!("SELECT {TEMPLATE_COLUMNS} FROM form_templates ORDER BY name ASC");
        sqlx::query_as::<_, FormTemplate>(&query)
            .fetch_all(pool)
            .await
    }

    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: DbId,
    ) -> Result<Option<FormTemplate>, sqlx::Error> {
        let query = format!("SELECT {TEMPLATE_COLUMNS} FROM form_templates WHERE id = $1");
        sqlx::query_as::<_, FormTemplate>(&query)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn find_by_name(
        conn: &mut PgConnection,
        name: &str,
    ) -> Result<Option<FormTemplate>, sqlx::Error> {
        let query = format!("SELECT {TEMPLATE_COLUMNS} FROM form_templates WHERE name = $1");
        sqlx::query_as::<_, FormTemplate>(&query)
            .bind(name)
            .fetch_optional(&mut *conn)
            .await
    }

    // -----------------------------------------------------------------------
    // Sections
    // -----------------------------------------------------------------------

    pub async fn find_section(
        conn: &mut PgConnection,
        section_id: DbId,
    ) -> Result<Option<FormTemplateSection>, sqlx::Error> {
        let query = format!("SELECT {SECTION_COLUMNS} FROM form_template_sections WHERE id = $1");
        sqlx::query_as::<_, FormTemplateSection>(&query)
            .bind(section_id)
            .fetch_optional(&mut *conn)
            .await
    }

    /// Sections of a template in sequence order.
    pub async fn list_sections(
        conn: &mut PgConnection,
        form_template_id: DbId,
    ) -> Result<Vec<FormTemplateSection>, sqlx::Error> {
        let query = format!(
            "SELECT {SECTION_COLUMNS} FROM form_template_sections
             WHERE form_template_id = $1
             ORDER BY sequence ASC, id ASC"
        );
        sqlx::query_as::<_, FormTemplateSection>(&query)
            .bind(form_template_id)
            .fetch_all(&mut *conn)
            .await
    }

    // -----------------------------------------------------------------------
    // Fields and options
    // -----------------------------------------------------------------------

    /// Fields of a section in sequence order.
    pub async fn list_fields(
        conn: &mut PgConnection,
        section_id: DbId,
    ) -> Result<Vec<FormTemplateField>, sqlx::Error> {
        let query = format!(
            "SELECT {FIELD_COLUMNS} FROM form_template_fields
             WHERE section_id = $1
             ORDER BY sequence ASC, id ASC"
        );
        sqlx::query_as::<_, FormTemplateField>(&query)
            .bind(section_id)
            .fetch_all(&mut *conn)
            .await
    }

    /// Options for the given fields, ordered by field then sequence.
    pub async fn list_options(
        conn: &mut PgConnection,
        field_ids: &[DbId],
    ) -> Result<Vec<FormTemplateFieldOption>, sqlx::Error> {
        let query = format!(
            "SELECT {OPTION_COLUMNS} FROM form_template_field_options
             WHERE field_id = ANY($1)
             ORDER BY field_id ASC, sequence ASC, id ASC"
        );
        sqlx::query_as::<_, FormTemplateFieldOption>(&query)
            .bind(field_ids)
            .fetch_all(&mut *conn)
            .await
    }
}
