//! HTTP-level tests for resource viewing events and the resource-view
//! progress source.

mod common;

use axum::http::StatusCode;
use common::{body_json, get, post_empty, post_json, seed_course};
use sqlx::PgPool;

const STUDENT: i64 = 31;

async fn upload(pool: &PgPool, section: i64, kinds: &[&str]) -> Vec<i64> {
    let resources: Vec<serde_json::Value> = kinds
        .iter()
        .enumerate()
        .map(|(i, kind)| serde_json::json!({"name": format!("R{i}"), "kind": kind}))
        .collect();
    let response = post_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/sections/{section}/resources"),
        serde_json::json!({ "resources": resources }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect()
}

async fn view(pool: &PgPool, resource: i64) -> serde_json::Value {
    let response = post_empty(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/students/{STUDENT}/resources/{resource}/views"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await["data"].clone()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_views_drive_resource_view_progress(pool: PgPool) {
    let fx = seed_course(&pool, &[2]).await;
    let first = upload(&pool, fx.section(0, 0), &["content", "content"]).await;
    upload(&pool, fx.section(0, 1), &["content", "content"]).await;

    let data = view(&pool, first[0]).await;
    assert_eq!(data["section_progress"]["percentage"], 50);
    assert_eq!(data["progress"]["unit"]["percentage"], 25);
    assert_eq!(data["progress"]["unit"]["source"], "resource_view");
    assert!(data["section_completion"].is_null());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_viewing_every_resource_completes_section(pool: PgPool) {
    let fx = seed_course(&pool, &[2]).await;
    let resources = upload(&pool, fx.section(0, 0), &["content", "mcq"]).await;

    view(&pool, resources[0]).await;
    let response = post_json(
        common::build_test_app(pool.clone()),
        &format!(
            "/api/v1/students/{STUDENT}/resources/{}/mcq-completions",
            resources[1]
        ),
        serde_json::json!({"attempts": 2}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let data = body_json(response).await["data"].clone();

    assert_eq!(data["view"]["mcq_attempts"], 2);
    assert_eq!(data["section_progress"]["percentage"], 100);
    let completion = &data["section_completion"];
    assert_eq!(completion["completion"]["section_id"], fx.section(0, 0));
    assert_eq!(completion["progress"]["unit"]["percentage"], 50);
    assert_eq!(completion["unlock"]["transition"]["section_id"], fx.section(0, 1));

    let ledger = body_json(
        get(
            common::build_test_app(pool),
            &format!(
                "/api/v1/students/{STUDENT}/courses/{}/progress/units?source=ledger",
                fx.course_id
            ),
        )
        .await,
    )
    .await;
    assert_eq!(ledger["data"]["units"][0]["completed_count"], 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_zero_attempts_is_rejected(pool: PgPool) {
    let fx = seed_course(&pool, &[1]).await;
    let resources = upload(&pool, fx.section(0, 0), &["mcq"]).await;

    let response = post_json(
        common::build_test_app(pool),
        &format!(
            "/api/v1/students/{STUDENT}/resources/{}/mcq-completions",
            resources[0]
        ),
        serde_json::json!({"attempts": 0}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_view_of_deleted_resource_is_not_found(pool: PgPool) {
    let fx = seed_course(&pool, &[1]).await;
    let resources = upload(&pool, fx.section(0, 0), &["content"]).await;
    common::delete(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/resources/{}", resources[0]),
    )
    .await;

    let response = post_empty(
        common::build_test_app(pool),
        &format!("/api/v1/students/{STUDENT}/resources/{}/views", resources[0]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
