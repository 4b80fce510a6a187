//! Integration tests for per-project workflow step state.
//!
//! Exercises the upsert semantics against a real database:
//! - One state row per (project, step)
//! - Completion is reported once and never moves `completed_at`
//! - Start and completion compose in either order
//! - The depth trigger rejects grandchildren

use casework_db::models::project::CreateProject;
use casework_db::repositories::{
    ProjectRepo, ProjectTypeRepo, ProjectWorkflowStepRepo, WorkflowStepRepo,
};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn h1b_project(pool: &PgPool) -> i64 {
    let project_type = ProjectTypeRepo::find_by_name(pool, "H-1B Specialty Occupation")
        .await
        .unwrap()
        .expect("seeded project type");
    let mut conn = pool.acquire().await.unwrap();
    let project = ProjectRepo::create(
        &mut conn,
        &CreateProject {
            project_type_id: project_type.id,
            name: "State Test".to_string(),
            client_name: None,
        },
    )
    .await
    .unwrap();
    project.id
}

async fn step_id(pool: &PgPool, project_id: i64, key: &str) -> i64 {
    let mut conn = pool.acquire().await.unwrap();
    WorkflowStepRepo::list_for_project(&mut conn, project_id)
        .await
        .unwrap()
        .into_iter()
        .find(|s| s.key.as_deref() == Some(key))
        .expect("seeded step")
        .id
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_seeded_tree_has_two_levels(pool: PgPool) {
    let project_id = h1b_project(&pool).await;
    let mut conn = pool.acquire().await.unwrap();
    let steps = WorkflowStepRepo::list_for_project(&mut conn, project_id)
        .await
        .unwrap();

    let top: Vec<_> = steps.iter().filter(|s| s.parent_step_id.is_none()).collect();
    assert_eq!(top.len(), 6);
    assert_eq!(top[0].key.as_deref(), Some("H1B_DOCUMENT_GATHERING"));

    let info = top
        .iter()
        .find(|s| s.key.as_deref() == Some("H1B_INFORMATION_COLLECTION"))
        .unwrap();
    let children: Vec<_> = steps
        .iter()
        .filter(|s| s.parent_step_id == Some(info.id))
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(
        children,
        vec!["Beneficiary Information", "Employer Information", "Job Information"]
    );
}

#[sqlx::test(migrations = "./migrations")]
async fn test_mark_completed_reports_once(pool: PgPool) {
    let project_id = h1b_project(&pool).await;
    let step = step_id(&pool, project_id, "H1B_DOCUMENT_GATHERING").await;
    let mut conn = pool.acquire().await.unwrap();

    let first = ProjectWorkflowStepRepo::mark_completed(&mut conn, project_id, step)
        .await
        .unwrap()
        .expect("first completion returns the row");
    assert!(first.completed_at.is_some());
    assert!(first.started_at.is_some());

    let second = ProjectWorkflowStepRepo::mark_completed(&mut conn, project_id, step)
        .await
        .unwrap();
    assert!(second.is_none());

    let rows = ProjectWorkflowStepRepo::list_by_project(&mut conn, project_id)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].completed_at, first.completed_at);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_start_then_complete_keeps_start(pool: PgPool) {
    let project_id = h1b_project(&pool).await;
    let step = step_id(&pool, project_id, "H1B_WAGE_DETERMINATION").await;
    let mut conn = pool.acquire().await.unwrap();

    let started = ProjectWorkflowStepRepo::mark_started(&mut conn, project_id, step)
        .await
        .unwrap()
        .expect("first start returns the row");
    assert!(started.completed_at.is_none());

    assert!(ProjectWorkflowStepRepo::mark_started(&mut conn, project_id, step)
        .await
        .unwrap()
        .is_none());

    let completed = ProjectWorkflowStepRepo::mark_completed(&mut conn, project_id, step)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(completed.id, started.id);
    assert_eq!(completed.started_at, started.started_at);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_complete_then_start_is_noop(pool: PgPool) {
    let project_id = h1b_project(&pool).await;
    let step = step_id(&pool, project_id, "H1B_USCIS_SUBMISSION").await;
    let mut conn = pool.acquire().await.unwrap();

    ProjectWorkflowStepRepo::mark_completed(&mut conn, project_id, step)
        .await
        .unwrap();
    assert!(ProjectWorkflowStepRepo::mark_started(&mut conn, project_id, step)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_depth_trigger_rejects_grandchild(pool: PgPool) {
    let child_id: i64 = sqlx::query_scalar(
        "SELECT id FROM workflow_steps WHERE name = 'Beneficiary Information'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    let result = sqlx::query(
        "INSERT INTO workflow_steps (project_type_id, parent_step_id, name, sequence)
         SELECT project_type_id, id, 'Too Deep', 1 FROM workflow_steps WHERE id = $1",
    )
    .bind(child_id)
    .execute(&pool)
    .await;

    let err = result.unwrap_err();
    let db_err = err.as_database_error().expect("database error");
    assert_eq!(db_err.code().as_deref(), Some("23514"));
}
