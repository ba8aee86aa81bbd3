use std::sync::Arc;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use coursepath_api::config::ServerConfig;
use coursepath_api::router::build_app_router;
use coursepath_api::state::AppState;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        repair_interval_secs: 0,
        db_max_connections: 5,
    }
}

/// The production router over `pool`, configured with [`test_config`].
pub fn build_test_app(pool: PgPool) -> Router {
    build_app_router(AppState {
        pool,
        config: Arc::new(test_config()),
    })
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

#[allow(dead_code)]
pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

#[allow(dead_code)]
pub async fn post_empty(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

#[allow(dead_code)]
pub async fn delete(app: Router, uri: &str) -> Response {
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A course built through the API: `units[i]` holds the unit id and its
/// section ids in order.
#[allow(dead_code)]
pub struct Fixture {
    pub course_id: i64,
    pub units: Vec<(i64, Vec<i64>)>,
}

#[allow(dead_code)]
impl Fixture {
    pub fn unit(&self, i: usize) -> i64 {
        self.units[i].0
    }

    pub fn section(&self, unit: usize, i: usize) -> i64 {
        self.units[unit].1[i]
    }
}

#[allow(dead_code)]
async fn created_id(response: Response) -> i64 {
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

/// Create a course whose unit `i` has `sections_per_unit[i]` sections.
#[allow(dead_code)]
pub async fn seed_course(pool: &PgPool, sections_per_unit: &[usize]) -> Fixture {
    let course_id = created_id(
        post_json(
            build_test_app(pool.clone()),
            "/api/v1/courses",
            serde_json::json!({"name": "Course"}),
        )
        .await,
    )
    .await;

    let mut units = Vec::new();
    for (u, &count) in sections_per_unit.iter().enumerate() {
        let unit_id = created_id(
            post_json(
                build_test_app(pool.clone()),
                &format!("/api/v1/courses/{course_id}/units"),
                serde_json::json!({"name": format!("Unit {}", u + 1)}),
            )
            .await,
        )
        .await;

        let mut sections = Vec::new();
        for s in 0..count {
            let section_id = created_id(
                post_json(
                    build_test_app(pool.clone()),
                    &format!("/api/v1/units/{unit_id}/sections"),
                    serde_json::json!({"name": format!("Section {}", s + 1)}),
                )
                .await,
            )
            .await;
            sections.push(section_id);
        }
        units.push((unit_id, sections));
    }

    Fixture { course_id, units }
}

/// POST the completion of a section and return the response.
#[allow(dead_code)]
pub async fn complete(pool: &PgPool, student: i64, course: i64, section: i64) -> Response {
    post_json(
        build_test_app(pool.clone()),
        &format!("/api/v1/students/{student}/courses/{course}/sections/{section}/complete"),
        serde_json::json!({}),
    )
    .await
}
