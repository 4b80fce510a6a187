//! HTTP-level integration tests for projects and project types.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, post_json, project_type_id};
use sqlx::PgPool;

#[sqlx::test(migrations = "../db/migrations")]
async fn list_project_types(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = get(app, "/api/v1/project-types").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let names: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"H-1B Specialty Occupation"));
    assert!(names.contains(&"Family-Based Green Card"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn creating_h1b_project_creates_i129_form(pool: PgPool) {
    let type_id = project_type_id(&pool, "H-1B Specialty Occupation").await;
    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/projects",
        serde_json::json!({ "project_type_id": type_id, "name": "Acme", "client_name": "Acme Corp" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["name"], "Acme");
    assert_eq!(json["client_name"], "Acme Corp");
    assert!(json["form"]["id"].is_number());
    let project_id = json["id"].as_i64().unwrap();

    let response = get(
        common::build_test_app(pool),
        &format!("/api/v1/projects/{project_id}/forms"),
    )
    .await;
    let json = body_json(response).await;
    let forms = json["data"].as_array().unwrap();
    assert_eq!(forms.len(), 1);
    assert_eq!(forms[0]["template_name"], "I-129");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn creating_green_card_project_creates_i130_form(pool: PgPool) {
    let type_id = project_type_id(&pool, "Family-Based Green Card").await;
    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/projects",
        serde_json::json!({ "project_type_id": type_id, "name": "Smith family" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    let project_id = json["id"].as_i64().unwrap();

    let response = get(
        common::build_test_app(pool),
        &format!("/api/v1/projects/{project_id}/forms"),
    )
    .await;
    let json = body_json(response).await;
    assert_eq!(json["data"][0]["template_name"], "I-130");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn blank_project_name_is_rejected(pool: PgPool) {
    let type_id = project_type_id(&pool, "H-1B Specialty Occupation").await;
    let response = post_json(
        common::build_test_app(pool.clone()),
        "/api/v1/projects",
        serde_json::json!({ "project_type_id": type_id, "name": "   " }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["code"], "BAD_REQUEST");

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM projects")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unknown_project_type_returns_404(pool: PgPool) {
    let response = post_json(
        common::build_test_app(pool),
        "/api/v1/projects",
        serde_json::json!({ "project_type_id": 999999, "name": "Nobody" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let json = body_json(response).await;
    assert_eq!(json["code"], "NOT_FOUND");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn get_project_by_id(pool: PgPool) {
    let (project_id, _) = common::create_h1b_project(&pool).await;

    let response = get(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/projects/{project_id}"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["id"], project_id);

    let response = get(common::build_test_app(pool), "/api/v1/projects/999999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
