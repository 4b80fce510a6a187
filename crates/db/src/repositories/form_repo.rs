//! Repository for the `forms` and `form_field_responses` tables.
//!
//! Responses are never cached: every read here goes to the database so the
//! evaluator always sees the latest committed write.

use std::collections::HashMap;

use casework_core::types::DbId;
use sqlx::{PgConnection, PgPool};

use crate::models::form::{Form, FormFieldResponse, FormSummary};

const COLUMNS: &str = "id, project_id, form_template_id, created_at, updated_at";

const RESPONSE_COLUMNS: &str =
    "id, form_id, form_template_field_id, value, role, created_at, updated_at";

/// Form instances and their field responses.
pub struct FormRepo;

impl FormRepo {
    /// Create the form instance of a template for a project.
    pub async fn create(
        conn: &mut PgConnection,
        project_id: DbId,
        form_template_id: DbId,
    ) -> Result<Form, sqlx::Error> {
        let query = format!(
            "INSERT INTO forms (project_id, form_template_id)
             VALUES ($1, $2)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Form>(&query)
            .bind(project_id)
            .bind(form_template_id)
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Form>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM forms WHERE id = $1");
        sqlx::query_as::<_, Form>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Forms of a project with their template names.
    pub async fn list_by_project(
        pool: &PgPool,
        project_id: DbId,
    ) -> Result<Vec<FormSummary>, sqlx::Error> {
        sqlx::query_as::<_, FormSummary>(
            "SELECT f.id, f.project_id, f.form_template_id, ft.name AS template_name,
                    f.created_at, f.updated_at
             FROM forms f
             JOIN form_templates ft ON ft.id = f.form_template_id
             WHERE f.project_id = $1
             ORDER BY f.id ASC",
        )
        .bind(project_id)
        .fetch_all(pool)
        .await
    }

    /// The project's form for the named template, if it has one.
    pub async fn find_by_project_and_template(
        conn: &mut PgConnection,
        project_id: DbId,
        template_name: &str,
    ) -> Result<Option<Form>, sqlx::Error> {
        sqlx::query_as::<_, Form>(
            "SELECT f.id, f.project_id, f.form_template_id, f.created_at, f.updated_at
             FROM forms f
             JOIN form_templates ft ON ft.id = f.form_template_id
             WHERE f.project_id = $1 AND ft.name = $2",
        )
        .bind(project_id)
        .bind(template_name)
        .fetch_optional(&mut *conn)
        .await
    }

    // -----------------------------------------------------------------------
    // Responses
    // -----------------------------------------------------------------------

    /// All responses of a form.
    pub async fn list_responses(
        conn: &mut PgConnection,
        form_id: DbId,
    ) -> Result<Vec<FormFieldResponse>, sqlx::Error> {
        let query = format!(
            "SELECT {RESPONSE_COLUMNS} FROM form_field_responses
             WHERE form_id = $1
             ORDER BY form_template_field_id ASC"
        );
        sqlx::query_as::<_, FormFieldResponse>(&query)
            .bind(form_id)
            .fetch_all(&mut *conn)
            .await
    }

    /// Current response values of a form keyed by template field key.
    ///
    /// This is the lookup dependency expressions are evaluated against.
    pub async fn response_values(
        conn: &mut PgConnection,
        form_id: DbId,
    ) -> Result<HashMap<String, String>, sqlx::Error> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            "SELECT ftf.key, r.value
             FROM form_field_responses r
             JOIN form_template_fields ftf ON ftf.id = r.form_template_field_id
             WHERE r.form_id = $1",
        )
        .bind(form_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.into_iter().collect())
    }

    /// Insert or replace the response for one field of a form.
    pub async fn upsert_response(
        conn: &mut PgConnection,
        form_id: DbId,
        form_template_field_id: DbId,
        value: &str,
        role: &str,
    ) -> Result<FormFieldResponse, sqlx::Error> {
        let query = format!(
            "INSERT INTO form_field_responses (form_id, form_template_field_id, value, role)
             VALUES ($1, $2, $3, $4)
             ON CONFLICT ON CONSTRAINT uq_form_field_responses DO UPDATE SET
                value = EXCLUDED.value,
                role = EXCLUDED.role
             RETURNING {RESPONSE_COLUMNS}"
        );
        sqlx::query_as::<_, FormFieldResponse>(&query)
            .bind(form_id)
            .bind(form_template_field_id)
            .bind(value)
            .bind(role)
            .fetch_one(&mut *conn)
            .await
    }
}
