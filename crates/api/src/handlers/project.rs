//! Handlers for projects and project types.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use casework_core::error::CoreError;
use casework_core::rules::template_for_project_type;
use casework_core::types::DbId;
use casework_db::models::form::Form;
use casework_db::models::project::{CreateProject, Project, ProjectType};
use casework_db::repositories::{FormRepo, FormTemplateRepo, ProjectRepo, ProjectTypeRepo};
use casework_db::DbPool;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

/// A newly created project and the form created with it.
#[derive(Debug, Serialize)]
pub struct CreatedProject {
    #[serde(flatten)]
    pub project: Project,
    pub form: Option<Form>,
}

/// Load a project or fail with 404.
pub(crate) async fn find_project(pool: &DbPool, id: DbId) -> AppResult<Project> {
    ProjectRepo::find_by_id(pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Project",
            id,
        }))
}

/// POST /api/v1/projects
///
/// Creates the project together with the form its type works from, in one
/// transaction.
pub async fn create(
    State(state): State<AppState>,
    Json(input): Json<CreateProject>,
) -> AppResult<(StatusCode, Json<CreatedProject>)> {
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("Project name must not be empty".into()));
    }

    let project_type = ProjectTypeRepo::find_by_id(&state.pool, input.project_type_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "ProjectType",
            id: input.project_type_id,
        }))?;

    let mut tx = state.pool.begin().await?;
    let project = ProjectRepo::create(&mut *tx, &input).await?;

    let form = match template_for_project_type(&project_type.name) {
        Some(template_name) => {
            let template = FormTemplateRepo::find_by_name(&mut *tx, template_name)
                .await?
                .ok_or_else(|| AppError::NotFound {
                    entity: "FormTemplate",
                    reference: template_name.to_string(),
                })?;
            Some(FormRepo::create(&mut *tx, project.id, template.id).await?)
        }
        None => None,
    };
    tx.commit().await?;

    tracing::info!(
        project_id = project.id,
        project_type = %project_type.name,
        form_id = ?form.as_ref().map(|f| f.id),
        "Project created",
    );

    Ok((StatusCode::CREATED, Json(CreatedProject { project, form })))
}

/// GET /api/v1/projects/{project_id}
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<Project>> {
    let project = find_project(&state.pool, id).await?;
    Ok(Json(project))
}

/// GET /api/v1/project-types
pub async fn list_types(
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<ProjectType>>>> {
    let types = ProjectTypeRepo::list(&state.pool).await?;
    Ok(Json(DataResponse { data: types }))
}
