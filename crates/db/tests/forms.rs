//! Integration tests for forms, responses and the template cache.

use casework_db::models::project::CreateProject;
use casework_db::repositories::{FormRepo, FormTemplateRepo, ProjectRepo, ProjectTypeRepo};
use casework_db::template_cache::TemplateCache;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create an H-1B project with its I-129 form; returns (project_id, form_id, template_id).
async fn project_with_form(pool: &PgPool) -> (i64, i64, i64) {
    let project_type = ProjectTypeRepo::find_by_name(pool, "H-1B Specialty Occupation")
        .await
        .unwrap()
        .unwrap();
    let mut tx = pool.begin().await.unwrap();
    let project = ProjectRepo::create(
        &mut tx,
        &CreateProject {
            project_type_id: project_type.id,
            name: "Form Test".to_string(),
            client_name: Some("Acme".to_string()),
        },
    )
    .await
    .unwrap();
    let template = FormTemplateRepo::find_by_name(&mut tx, "I-129")
        .await
        .unwrap()
        .unwrap();
    let form = FormRepo::create(&mut tx, project.id, template.id)
        .await
        .unwrap();
    tx.commit().await.unwrap();
    (project.id, form.id, template.id)
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_upsert_response_replaces_value(pool: PgPool) {
    let (_, form_id, template_id) = project_with_form(&pool).await;
    let mut conn = pool.acquire().await.unwrap();
    let sections = FormTemplateRepo::list_sections(&mut conn, template_id)
        .await
        .unwrap();
    let fields = FormTemplateRepo::list_fields(&mut conn, sections[0].id)
        .await
        .unwrap();
    let family_name = fields
        .iter()
        .find(|f| f.key == "Beneficiary.FamilyName")
        .unwrap();

    let first = FormRepo::upsert_response(&mut conn, form_id, family_name.id, "Doe", "user")
        .await
        .unwrap();
    let second =
        FormRepo::upsert_response(&mut conn, form_id, family_name.id, "Smith", "assistant")
            .await
            .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(second.value, "Smith");
    assert_eq!(second.role, "assistant");

    let values = FormRepo::response_values(&mut conn, form_id).await.unwrap();
    assert_eq!(values.len(), 1);
    assert_eq!(values["Beneficiary.FamilyName"], "Smith");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_invalid_role_is_rejected(pool: PgPool) {
    let (_, form_id, template_id) = project_with_form(&pool).await;
    let mut conn = pool.acquire().await.unwrap();
    let sections = FormTemplateRepo::list_sections(&mut conn, template_id)
        .await
        .unwrap();
    let fields = FormTemplateRepo::list_fields(&mut conn, sections[0].id)
        .await
        .unwrap();

    let result = FormRepo::upsert_response(&mut conn, form_id, fields[0].id, "x", "robot").await;
    assert!(result.is_err());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_find_form_by_template_name(pool: PgPool) {
    let (project_id, form_id, _) = project_with_form(&pool).await;
    let mut conn = pool.acquire().await.unwrap();

    let found = FormRepo::find_by_project_and_template(&mut conn, project_id, "I-129")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, form_id);

    assert!(FormRepo::find_by_project_and_template(&mut conn, project_id, "I-130")
        .await
        .unwrap()
        .is_none());

    let summaries = FormRepo::list_by_project(&pool, project_id).await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].template_name, "I-129");
}

// ---------------------------------------------------------------------------
// Template cache
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_cache_matches_store(pool: PgPool) {
    let cache = TemplateCache::new();
    let mut conn = pool.acquire().await.unwrap();
    let template = FormTemplateRepo::find_by_name(&mut conn, "I-129")
        .await
        .unwrap()
        .unwrap();

    let cached_sections = cache.template_sections(&mut conn, template.id).await.unwrap();
    let stored_sections = FormTemplateRepo::list_sections(&mut conn, template.id)
        .await
        .unwrap();
    let names = |s: &[casework_db::models::form::FormTemplateSection]| {
        s.iter().map(|x| x.name.clone()).collect::<Vec<_>>()
    };
    assert_eq!(names(&cached_sections), names(&stored_sections));

    // Second read is served from memory and returns the same data.
    let again = cache.template_sections(&mut conn, template.id).await.unwrap();
    assert_eq!(names(&again), names(&stored_sections));

    let section = cache
        .section(&mut conn, stored_sections[0].id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(section.name, "Beneficiary_Information");

    let fields = cache.section_fields(&mut conn, section.id).await.unwrap();
    let keys: Vec<_> = fields.iter().map(|f| f.key.as_str()).collect();
    assert_eq!(keys[0], "Beneficiary.FamilyName");

    let ids: Vec<i64> = fields.iter().map(|f| f.id).collect();
    let options = cache.field_options(&mut conn, &ids).await.unwrap();
    assert_eq!(options.len(), ids.len());
    let gender = fields.iter().find(|f| f.key == "Beneficiary.Gender").unwrap();
    assert_eq!(options[&gender.id].len(), 2);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_cache_warm_stats_and_clear(pool: PgPool) {
    let cache = TemplateCache::new();
    let mut conn = pool.acquire().await.unwrap();

    assert_eq!(cache.stats().await.sections, 0);

    let stats = cache.warm(&mut conn, None).await.unwrap();
    assert_eq!(stats.templates, 2);
    assert_eq!(stats.sections, 6);
    assert_eq!(stats.section_fields, 6);
    assert!(stats.field_options > 0);

    cache.clear().await;
    let cleared = cache.stats().await;
    assert_eq!(cleared.sections, 0);
    assert_eq!(cleared.field_options, 0);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_missing_section_is_none(pool: PgPool) {
    let cache = TemplateCache::new();
    let mut conn = pool.acquire().await.unwrap();
    assert!(cache.section(&mut conn, 999_999).await.unwrap().is_none());
    assert_eq!(cache.stats().await.sections, 0);
}
