#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use casework_api::classification::{
    Classification, ClassificationError, DisabledClassifier, DocumentClassifier,
};
use casework_api::config::ServerConfig;
use casework_api::router::build_app_router;
use casework_api::state::AppState;
use casework_db::template_cache::TemplateCache;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        classifier_url: None,
        classifier_timeout_secs: 5,
        template_cache_warm_on_start: false,
        max_upload_bytes: 64 * 1024,
    }
}

/// Build the full application router with the classifier disabled.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_classifier(pool, Arc::new(DisabledClassifier))
}

/// Build the full application router around the given classifier.
pub fn build_test_app_with_classifier(
    pool: PgPool,
    classifier: Arc<dyn DocumentClassifier>,
) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        template_cache: Arc::new(TemplateCache::new()),
        classifier,
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Classifier stubs
// ---------------------------------------------------------------------------

/// Classifies by file name: `passport.pdf` -> `passport`, and so on.
/// Unknown names are left unclassified.
pub struct StubClassifier {
    codes: HashMap<String, String>,
}

impl StubClassifier {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        Self {
            codes: pairs
                .iter()
                .map(|(file, code)| (file.to_string(), code.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl DocumentClassifier for StubClassifier {
    async fn classify(
        &self,
        file_name: &str,
        _content_type: Option<&str>,
        _bytes: &[u8],
    ) -> Result<Option<Classification>, ClassificationError> {
        Ok(self.codes.get(file_name).map(|code| Classification {
            type_code: code.clone(),
            extracted_data: Some(serde_json::json!({ "source": file_name })),
        }))
    }
}

/// Always fails, as an unreachable service would.
pub struct FailingClassifier;

#[async_trait]
impl DocumentClassifier for FailingClassifier {
    async fn classify(
        &self,
        _file_name: &str,
        _content_type: Option<&str>,
        _bytes: &[u8],
    ) -> Result<Option<Classification>, ClassificationError> {
        Err(ClassificationError::HttpStatus(503))
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn post_json(app: Router, uri: &str, json: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn post_empty(app: Router, uri: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

/// POST a multipart form with one `file` part and optional text parts.
pub async fn post_multipart(
    app: Router,
    uri: &str,
    file_name: &str,
    content: &[u8],
    text_fields: &[(&str, &str)],
) -> Response<Body> {
    let boundary = "casework-test-boundary";
    let mut body: Vec<u8> = Vec::new();
    for (name, value) in text_fields {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub async fn project_type_id(pool: &PgPool, name: &str) -> i64 {
    sqlx::query_scalar("SELECT id FROM project_types WHERE name = $1")
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap()
}

/// Create an H-1B project through the API and return `(project_id, form_id)`.
pub async fn create_h1b_project(pool: &PgPool) -> (i64, i64) {
    let type_id = project_type_id(pool, "H-1B Specialty Occupation").await;
    let response = post_json(
        build_test_app(pool.clone()),
        "/api/v1/projects",
        serde_json::json!({ "project_type_id": type_id, "name": "Acme H-1B", "client_name": "Acme" }),
    )
    .await;
    let json = body_json(response).await;
    (
        json["id"].as_i64().unwrap(),
        json["form"]["id"].as_i64().unwrap(),
    )
}

/// Id of the I-129 section with the given name.
pub async fn section_id(pool: &PgPool, template: &str, name: &str) -> i64 {
    sqlx::query_scalar(
        "SELECT s.id FROM form_template_sections s
         JOIN form_templates t ON t.id = s.form_template_id
         WHERE t.name = $1 AND s.name = $2",
    )
    .bind(template)
    .bind(name)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Id of a workflow step by name under the H-1B project type.
pub async fn step_id(pool: &PgPool, name: &str) -> i64 {
    sqlx::query_scalar(
        "SELECT ws.id FROM workflow_steps ws
         JOIN project_types pt ON pt.id = ws.project_type_id
         WHERE pt.name = 'H-1B Specialty Occupation' AND ws.name = $1",
    )
    .bind(name)
    .fetch_one(pool)
    .await
    .unwrap()
}

/// Submit `(key, value)` pairs to a section and return the response JSON.
pub async fn submit(
    pool: &PgPool,
    form_id: i64,
    section_id: i64,
    values: &[(&str, &str)],
) -> serde_json::Value {
    let responses: Vec<serde_json::Value> = values
        .iter()
        .map(|(key, value)| serde_json::json!({ "key": key, "value": value }))
        .collect();
    let response = post_json(
        build_test_app(pool.clone()),
        &format!("/api/v1/forms/{form_id}/sections/{section_id}/responses"),
        serde_json::json!({ "responses": responses }),
    )
    .await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    body_json(response).await
}

/// Names of the steps in a `completed_steps` array.
pub fn completed_names(json: &serde_json::Value) -> Vec<String> {
    json["completed_steps"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap().to_string())
        .collect()
}
