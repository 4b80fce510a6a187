//! In-memory cache of form template structure.
//!
//! Sections, their fields and field options never change while the server
//! runs, and every evaluation pass walks them, so they are memoized here.
//! The cache is owned by the application state and handed to callers; a
//! [`tokio::sync::RwLock`] lets concurrent readers proceed while fills and
//! clears take the single writer slot.
//!
//! Only template structure is stored. Responses change on every submission
//! and are always read from the database.
//!
//! A miss is filled from the store and then inserted, so cached and uncached
//! reads return the same data.

use std::collections::HashMap;

use casework_core::types::DbId;
use serde::Serialize;
use sqlx::PgConnection;
use tokio::sync::RwLock;

use crate::models::form::{FormTemplateField, FormTemplateFieldOption, FormTemplateSection};
use crate::repositories::FormTemplateRepo;

/// Entry counts reported by the admin endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub sections: usize,
    pub templates: usize,
    pub section_fields: usize,
    pub field_options: usize,
}

#[derive(Debug, Default)]
struct CacheState {
    sections: HashMap<DbId, FormTemplateSection>,
    /// Template id -> section ids in sequence order.
    template_sections: HashMap<DbId, Vec<DbId>>,
    /// Section id -> fields in sequence order.
    section_fields: HashMap<DbId, Vec<FormTemplateField>>,
    /// Field id -> options; fields without options map to an empty list.
    field_options: HashMap<DbId, Vec<FormTemplateFieldOption>>,
}

/// Read-mostly cache of template sections, fields and options.
#[derive(Debug, Default)]
pub struct TemplateCache {
    state: RwLock<CacheState>,
}

impl TemplateCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// One section by id.
    pub async fn section(
        &self,
        conn: &mut PgConnection,
        section_id: DbId,
    ) -> Result<Option<FormTemplateSection>, sqlx::Error> {
        if let Some(section) = self.state.read().await.sections.get(&section_id) {
            return Ok(Some(section.clone()));
        }

        let Some(section) = FormTemplateRepo::find_section(conn, section_id).await? else {
            return Ok(None);
        };
        self.state
            .write()
            .await
            .sections
            .insert(section.id, section.clone());
        Ok(Some(section))
    }

    /// Sections of a template in sequence order.
    pub async fn template_sections(
        &self,
        conn: &mut PgConnection,
        form_template_id: DbId,
    ) -> Result<Vec<FormTemplateSection>, sqlx::Error> {
        {
            let state = self.state.read().await;
            if let Some(ids) = state.template_sections.get(&form_template_id) {
                let cached: Option<Vec<_>> =
                    ids.iter().map(|id| state.sections.get(id).cloned()).collect();
                if let Some(sections) = cached {
                    return Ok(sections);
                }
            }
        }

        let sections = FormTemplateRepo::list_sections(conn, form_template_id).await?;
        let mut state = self.state.write().await;
        state
            .template_sections
            .insert(form_template_id, sections.iter().map(|s| s.id).collect());
        for section in &sections {
            state.sections.insert(section.id, section.clone());
        }
        Ok(sections)
    }

    /// Fields of a section in sequence order.
    pub async fn section_fields(
        &self,
        conn: &mut PgConnection,
        section_id: DbId,
    ) -> Result<Vec<FormTemplateField>, sqlx::Error> {
        if let Some(fields) = self.state.read().await.section_fields.get(&section_id) {
            return Ok(fields.clone());
        }

        let fields = FormTemplateRepo::list_fields(conn, section_id).await?;
        self.state
            .write()
            .await
            .section_fields
            .insert(section_id, fields.clone());
        Ok(fields)
    }

    /// Options of the given fields, keyed by field id.
    ///
    /// Every requested id is present in the result, with an empty list for
    /// fields that have no options.
    pub async fn field_options(
        &self,
        conn: &mut PgConnection,
        field_ids: &[DbId],
    ) -> Result<HashMap<DbId, Vec<FormTemplateFieldOption>>, sqlx::Error> {
        let mut result = HashMap::with_capacity(field_ids.len());
        let mut missing = Vec::new();
        {
            let state = self.state.read().await;
            for id in field_ids {
                match state.field_options.get(id) {
                    Some(options) => {
                        result.insert(*id, options.clone());
                    }
                    None => missing.push(*id),
                }
            }
        }

        if missing.is_empty() {
            return Ok(result);
        }

        let rows = FormTemplateRepo::list_options(conn, &missing).await?;
        let mut fetched: HashMap<DbId, Vec<FormTemplateFieldOption>> =
            missing.iter().map(|id| (*id, Vec::new())).collect();
        for option in rows {
            fetched.entry(option.field_id).or_default().push(option);
        }

        let mut state = self.state.write().await;
        for (id, options) in fetched {
            state.field_options.insert(id, options.clone());
            result.insert(id, options);
        }
        Ok(result)
    }

    /// Drop every entry.
    pub async fn clear(&self) {
        *self.state.write().await = CacheState::default();
        tracing::info!("Template cache cleared");
    }

    /// Preload sections, fields and options of the given templates, or of
    /// every template when `form_template_ids` is `None`.
    pub async fn warm(
        &self,
        conn: &mut PgConnection,
        form_template_ids: Option<&[DbId]>,
    ) -> Result<CacheStats, sqlx::Error> {
        let template_ids: Vec<DbId> = match form_template_ids {
            Some(ids) => ids.to_vec(),
            None => sqlx::query_scalar::<_, DbId>("SELECT id FROM form_templates ORDER BY id")
                .fetch_all(&mut *conn)
                .await?,
        };

        for template_id in template_ids {
            let sections = self.template_sections(conn, template_id).await?;
            for section in sections {
                let fields = self.section_fields(conn, section.id).await?;
                let field_ids: Vec<DbId> = fields.iter().map(|f| f.id).collect();
                self.field_options(conn, &field_ids).await?;
            }
        }

        let stats = self.stats().await;
        tracing::info!(
            sections = stats.sections,
            section_fields = stats.section_fields,
            field_options = stats.field_options,
            "Template cache warmed",
        );
        Ok(stats)
    }

    /// Current entry counts.
    pub async fn stats(&self) -> CacheStats {
        let state = self.state.read().await;
        CacheStats {
            sections: state.sections.len(),
            templates: state.template_sections.len(),
            section_fields: state.section_fields.len(),
            field_options: state.field_options.len(),
        }
    }
}
