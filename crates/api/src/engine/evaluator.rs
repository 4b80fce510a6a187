//! The workflow evaluation pass.
//!
//! One pass, inside one transaction:
//!
//! 1. Pick the rule set for the project's type. Types without rules are a
//!    logged no-op.
//! 2. Check every mapped form section; a complete section completes its
//!    information-collection child step.
//! 3. Complete the document-gathering step once every required document
//!    type is represented among the project's classified documents.
//! 4. Complete every parent whose children are now all complete.
//! 5. Persist the completions and report the steps that were newly
//!    completed by this pass.
//!
//! Passes are idempotent and never un-complete a step, so callers run one
//! after every write that could move the workflow forward.

use std::collections::BTreeSet;

use casework_core::error::CoreError;
use casework_core::forms::check_section_completion;
use casework_core::rules::{check_required_documents, DocumentRequirement, RuleSet};
use casework_core::types::DbId;
use casework_core::workflow::{StepReference, StepSummary, WorkflowTree};
use casework_db::models::form::FormTemplateField;
use casework_db::repositories::{
    DocumentRepo, DocumentTypeRepo, FormRepo, ProjectRepo, ProjectWorkflowStepRepo,
};
use casework_db::template_cache::TemplateCache;
use casework_db::DbPool;
use serde::Serialize;
use sqlx::PgConnection;

use crate::engine::steps::{load_tree, resolve_step};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// A step completed by an evaluation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletedStep {
    pub id: DbId,
    pub key: Option<String>,
    pub name: String,
}

impl From<StepSummary> for CompletedStep {
    fn from(step: StepSummary) -> Self {
        Self {
            id: step.id,
            key: step.key,
            name: step.name,
        }
    }
}

/// Result of one evaluation pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationOutcome {
    /// Steps this pass completed, children before parents. Steps that were
    /// already complete are never listed.
    pub completed_steps: Vec<CompletedStep>,
}

/// Run one evaluation pass on `conn`.
///
/// With a `scope`, only the addressed step and its direct children may be
/// completed. The caller owns the transaction.
pub async fn evaluate_project(
    conn: &mut PgConnection,
    cache: &TemplateCache,
    project_id: DbId,
    scope: Option<&StepReference>,
) -> AppResult<EvaluationOutcome> {
    let type_name = ProjectRepo::find_type_name(&mut *conn, project_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id: project_id,
        }))?;

    let Some(rules) = RuleSet::for_project_type(&type_name) else {
        tracing::warn!(
            project_id,
            project_type = %type_name,
            "No workflow rules for project type, skipping evaluation",
        );
        return Ok(EvaluationOutcome::default());
    };

    let mut tree = load_tree(&mut *conn, project_id).await?;
    let scope_id = match scope {
        Some(reference) => Some(resolve_step(&tree, reference)?.id),
        None => None,
    };
    let in_scope = |step: &StepSummary| match scope_id {
        Some(id) => step.id == id || step.parent_step_id == Some(id),
        None => true,
    };

    let mut candidates =
        completed_section_steps(&mut *conn, cache, &tree, rules, project_id).await?;
    if let Some(step) = document_step_if_satisfied(&mut *conn, &tree, rules, project_id).await? {
        candidates.push(step);
    }

    let now = chrono::Utc::now();
    let mut newly_completed: Vec<StepSummary> = Vec::new();
    for step in candidates.into_iter().filter(|s| in_scope(s)) {
        if tree.mark_completed(step.id, now) {
            newly_completed.push(step);
        }
    }
    for parent in tree.parents_ready_for_completion() {
        if in_scope(&parent) && tree.mark_completed(parent.id, now) {
            newly_completed.push(parent);
        }
    }

    let mut completed_steps = Vec::with_capacity(newly_completed.len());
    for step in newly_completed {
        let row = ProjectWorkflowStepRepo::mark_completed(&mut *conn, project_id, step.id).await?;
        if row.is_some() {
            completed_steps.push(CompletedStep::from(step));
        }
    }

    if !completed_steps.is_empty() {
        tracing::info!(
            project_id,
            completed = completed_steps.len(),
            steps = ?completed_steps.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            "Workflow steps completed by evaluation",
        );
    }

    Ok(EvaluationOutcome { completed_steps })
}

/// Child steps whose form section is now complete.
async fn completed_section_steps(
    conn: &mut PgConnection,
    cache: &TemplateCache,
    tree: &WorkflowTree,
    rules: RuleSet,
    project_id: DbId,
) -> AppResult<Vec<StepSummary>> {
    let template = rules.information_template();
    let Some(form) = FormRepo::find_by_project_and_template(&mut *conn, project_id, template).await?
    else {
        tracing::debug!(project_id, template, "Project has no form for template");
        return Ok(Vec::new());
    };

    let responses = FormRepo::response_values(&mut *conn, form.id).await?;
    let sections = cache.template_sections(&mut *conn, form.form_template_id).await?;

    let mut steps = Vec::new();
    for (section_name, step_name) in rules.section_steps() {
        let Some(step) = tree.find_child_by_name(rules.information_step_key(), step_name) else {
            tracing::warn!(project_id, step = step_name, "Mapped child step not found");
            continue;
        };
        if step.completed {
            continue;
        }
        let Some(section) = sections.iter().find(|s| s.name == *section_name) else {
            tracing::warn!(
                project_id,
                section = section_name,
                template,
                "Mapped section not found",
            );
            continue;
        };

        let fields = cache.section_fields(&mut *conn, section.id).await?;
        let completion =
            check_section_completion(fields.iter().map(FormTemplateField::requirement), &responses);
        if completion.complete {
            steps.push(step);
        } else {
            tracing::debug!(
                project_id,
                section = section_name,
                missing = ?completion.missing_keys,
                "Section incomplete",
            );
        }
    }
    Ok(steps)
}

/// The document-gathering step, when it is incomplete and every required
/// document type has been uploaded and classified.
async fn document_step_if_satisfied(
    conn: &mut PgConnection,
    tree: &WorkflowTree,
    rules: RuleSet,
    project_id: DbId,
) -> AppResult<Option<StepSummary>> {
    let key = rules.document_step_key();
    let Some(step) = tree.find(&StepReference::Key(key.to_string())) else {
        tracing::warn!(project_id, key, "Document step not found");
        return Ok(None);
    };
    if step.completed {
        return Ok(None);
    }

    let required: BTreeSet<DbId> = DocumentTypeRepo::required_ids(&mut *conn)
        .await?
        .into_iter()
        .collect();
    let uploaded: BTreeSet<DbId> = DocumentRepo::inferred_type_ids(&mut *conn, project_id)
        .await?
        .into_iter()
        .collect();

    match check_required_documents(&required, &uploaded) {
        DocumentRequirement::Satisfied => Ok(Some(step)),
        DocumentRequirement::Missing(missing) => {
            tracing::debug!(project_id, missing = ?missing, "Required documents missing");
            Ok(None)
        }
        DocumentRequirement::NothingRequired => {
            tracing::warn!(
                project_id,
                "No document type is marked required, document step left incomplete",
            );
            Ok(None)
        }
    }
}

/// Run one pass in its own transaction and commit it.
pub async fn evaluate_in_transaction(
    pool: &DbPool,
    cache: &TemplateCache,
    project_id: DbId,
    scope: Option<&StepReference>,
) -> AppResult<EvaluationOutcome> {
    let mut tx = pool.begin().await?;
    let outcome = evaluate_project(&mut *tx, cache, project_id, scope).await?;
    tx.commit().await?;
    Ok(outcome)
}

/// Evaluate after a committed write.
///
/// The write has already been committed, so a failing pass is rolled back
/// and logged but never surfaced to the caller.
pub async fn evaluate_after_write(
    state: &AppState,
    project_id: DbId,
    trigger: &'static str,
) -> Vec<CompletedStep> {
    match evaluate_in_transaction(&state.pool, &state.template_cache, project_id, None).await {
        Ok(outcome) => outcome.completed_steps,
        Err(e) => {
            tracing::error!(project_id, trigger, error = %e, "Workflow evaluation failed");
            Vec::new()
        }
    }
}
