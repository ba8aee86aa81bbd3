//! HTTP-level tests for the recalculation / repair job.

mod common;

use axum::http::StatusCode;
use common::{body_json, complete, delete, get, post_empty, seed_course};
use coursepath_api::engine::repair;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

const STUDENT: i64 = 21;

type Counters = Vec<(String, i64, i32, i32, i32, i32, i32)>;
type Progress = Vec<(i64, i64, String, i16, i32, i32)>;

async fn counters(pool: &PgPool) -> Counters {
    sqlx::query_as(
        "SELECT node_kind, node_id, total_units, total_sections, total_resources, \
                total_mcqs, total_assessments \
         FROM content_stats ORDER BY node_kind, node_id",
    )
    .fetch_all(pool)
    .await
    .unwrap()
}

async fn unit_progress(pool: &PgPool) -> Progress {
    sqlx::query_as(
        "SELECT student_id, unit_id, source, percentage, completed_count, total_count \
         FROM unit_progress ORDER BY student_id, unit_id, source",
    )
    .fetch_all(pool)
    .await
    .unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_deleted_sections_keep_finished_student_at_100(pool: PgPool) {
    let fx = seed_course(&pool, &[5]).await;
    for s in 0..5 {
        complete(&pool, STUDENT, fx.course_id, fx.section(0, s)).await;
    }

    for s in [1, 3] {
        let response = delete(
            common::build_test_app(pool.clone()),
            &format!("/api/v1/sections/{}", fx.section(0, s)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let response = post_empty(common::build_test_app(pool.clone()), "/api/v1/admin/recalculate").await;
    assert_eq!(response.status(), StatusCode::OK);
    let report = body_json(response).await;
    assert_eq!(report["data"]["completions_invalidated"], 2);
    assert_eq!(report["data"]["cancelled"], false);

    let stats = body_json(
        get(
            common::build_test_app(pool.clone()),
            &format!("/api/v1/units/{}/stats", fx.unit(0)),
        )
        .await,
    )
    .await;
    assert_eq!(stats["data"]["total_sections"], 3);

    let units = body_json(
        get(
            common::build_test_app(pool),
            &format!(
                "/api/v1/students/{STUDENT}/courses/{}/progress/units",
                fx.course_id
            ),
        )
        .await,
    )
    .await;
    assert_eq!(units["data"]["units"][0]["percentage"], 100);
    assert_eq!(units["data"]["units"][0]["completed_count"], 3);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_recalculate_all_twice_converges(pool: PgPool) {
    let fx = seed_course(&pool, &[3, 2]).await;
    complete(&pool, STUDENT, fx.course_id, fx.section(0, 0)).await;
    complete(&pool, STUDENT + 1, fx.course_id, fx.section(0, 0)).await;
    complete(&pool, STUDENT + 1, fx.course_id, fx.section(0, 1)).await;

    // Introduce drift in both caches.
    sqlx::query("UPDATE content_stats SET total_sections = 99 WHERE node_kind = 'unit'")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("UPDATE unit_progress SET percentage = 13")
        .execute(&pool)
        .await
        .unwrap();

    post_empty(common::build_test_app(pool.clone()), "/api/v1/admin/recalculate").await;
    let counters_first = counters(&pool).await;
    let progress_first = unit_progress(&pool).await;

    post_empty(common::build_test_app(pool.clone()), "/api/v1/admin/recalculate").await;
    assert_eq!(counters(&pool).await, counters_first);
    assert_eq!(unit_progress(&pool).await, progress_first);

    let ledger: Vec<i16> = progress_first
        .iter()
        .filter(|p| p.1 == fx.unit(0) && p.2 == "ledger")
        .map(|p| p.3)
        .collect();
    assert_eq!(ledger, vec![33, 67]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_recalculate_missing_course_returns_404(pool: PgPool) {
    let response = post_empty(
        common::build_test_app(pool),
        "/api/v1/admin/recalculate/courses/424242",
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_cancelled_repair_stops_between_units(pool: PgPool) {
    let fx = seed_course(&pool, &[1, 1]).await;
    complete(&pool, STUDENT, fx.course_id, fx.section(0, 0)).await;

    let cancel = CancellationToken::new();
    cancel.cancel();
    let report = repair::recalculate_course(&pool, fx.course_id, &cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.unit_progress_written, 0);
    // Counters are rebuilt before the per-unit loop.
    assert_eq!(report.counters_recomputed, 5);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_repair_clears_unit_flag_when_unit_grows(pool: PgPool) {
    let fx = seed_course(&pool, &[1]).await;
    complete(&pool, STUDENT, fx.course_id, fx.section(0, 0)).await;

    common::post_json(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/units/{}/sections", fx.unit(0)),
        serde_json::json!({"name": "New material"}),
    )
    .await;

    let response = post_empty(
        common::build_test_app(pool.clone()),
        &format!("/api/v1/admin/recalculate/courses/{}", fx.course_id),
    )
    .await;
    let report = body_json(response).await;
    assert_eq!(report["data"]["units_invalidated"], 1);

    let flag: i16 = sqlx::query_scalar(
        "SELECT status FROM completed_units WHERE student_id = $1 AND unit_id = $2",
    )
    .bind(STUDENT)
    .bind(fx.unit(0))
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(flag, 0);
}
