//! Integration tests for content tree mutations and their counters.

use coursepath_core::content::{NodeKind, ResourceKind};
use coursepath_db::models::content::{CreateNode, NewResource};
use coursepath_db::repositories::{ContentRepo, StatsRepo};
use sqlx::PgPool;

fn node(name: &str, number: Option<i32>) -> CreateNode {
    CreateNode {
        name: name.to_string(),
        number,
    }
}

fn resource(name: &str, kind: ResourceKind) -> NewResource {
    NewResource {
        name: name.to_string(),
        kind,
        number: None,
    }
}

async fn numbers(pool: &PgPool, unit_id: i64) -> Vec<(String, i32)> {
    ContentRepo::list_sections(pool, unit_id)
        .await
        .unwrap()
        .into_iter()
        .map(|s| (s.name, s.number))
        .collect()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_course_starts_with_zero_counters(pool: PgPool) {
    let course = ContentRepo::create_course(&pool, "Algebra").await.unwrap();
    let stats = StatsRepo::find(&pool, NodeKind::Course, course.id)
        .await
        .unwrap()
        .expect("counter row created with course");
    assert_eq!(stats.counts(), [0, 0, 0, 0, 0]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_inserts_increment_every_ancestor(pool: PgPool) {
    let course = ContentRepo::create_course(&pool, "Algebra").await.unwrap();
    let unit = ContentRepo::create_unit(&pool, course.id, &node("U1", None))
        .await
        .unwrap()
        .unwrap();
    let section = ContentRepo::create_section(&pool, unit.id, &node("S1", None))
        .await
        .unwrap()
        .unwrap();
    ContentRepo::create_resources(
        &pool,
        section.id,
        &[
            resource("video", ResourceKind::Content),
            resource("quiz", ResourceKind::Mcq),
            resource("exam", ResourceKind::Assessment),
        ],
    )
    .await
    .unwrap()
    .unwrap();

    let course_stats = StatsRepo::find_or_zero(&pool, NodeKind::Course, course.id)
        .await
        .unwrap();
    assert_eq!(course_stats.counts(), [1, 1, 3, 1, 1]);

    let unit_stats = StatsRepo::find_or_zero(&pool, NodeKind::Unit, unit.id)
        .await
        .unwrap();
    assert_eq!(unit_stats.counts(), [0, 1, 3, 1, 1]);

    let section_stats = StatsRepo::find_or_zero(&pool, NodeKind::Section, section.id)
        .await
        .unwrap();
    assert_eq!(section_stats.counts(), [0, 0, 3, 1, 1]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_insert_at_taken_number_shifts_later_siblings(pool: PgPool) {
    let course = ContentRepo::create_course(&pool, "Algebra").await.unwrap();
    let unit = ContentRepo::create_unit(&pool, course.id, &node("U1", None))
        .await
        .unwrap()
        .unwrap();
    for name in ["A", "B", "C"] {
        ContentRepo::create_section(&pool, unit.id, &node(name, None))
            .await
            .unwrap();
    }

    ContentRepo::create_section(&pool, unit.id, &node("X", Some(2)))
        .await
        .unwrap();

    assert_eq!(
        numbers(&pool, unit.id).await,
        vec![
            ("A".to_string(), 1),
            ("X".to_string(), 2),
            ("B".to_string(), 3),
            ("C".to_string(), 4),
        ]
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_insert_at_free_number_leaves_gap(pool: PgPool) {
    let course = ContentRepo::create_course(&pool, "Algebra").await.unwrap();
    let unit = ContentRepo::create_unit(&pool, course.id, &node("U1", None))
        .await
        .unwrap()
        .unwrap();
    ContentRepo::create_section(&pool, unit.id, &node("A", None))
        .await
        .unwrap();
    ContentRepo::create_section(&pool, unit.id, &node("D", Some(4)))
        .await
        .unwrap();
    ContentRepo::create_section(&pool, unit.id, &node("E", None))
        .await
        .unwrap();

    assert_eq!(
        numbers(&pool, unit.id).await,
        vec![
            ("A".to_string(), 1),
            ("D".to_string(), 4),
            ("E".to_string(), 5),
        ]
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_deleted_number_can_be_reused(pool: PgPool) {
    let course = ContentRepo::create_course(&pool, "Algebra").await.unwrap();
    let unit = ContentRepo::create_unit(&pool, course.id, &node("U1", None))
        .await
        .unwrap()
        .unwrap();
    let a = ContentRepo::create_section(&pool, unit.id, &node("A", None))
        .await
        .unwrap()
        .unwrap();
    assert!(ContentRepo::soft_delete_section(&pool, a.id).await.unwrap());

    ContentRepo::create_section(&pool, unit.id, &node("A2", Some(1)))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(numbers(&pool, unit.id).await, vec![("A2".to_string(), 1)]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_invalid_number_rolls_back_whole_upload(pool: PgPool) {
    let course = ContentRepo::create_course(&pool, "Algebra").await.unwrap();
    let unit = ContentRepo::create_unit(&pool, course.id, &node("U1", None))
        .await
        .unwrap()
        .unwrap();
    let section = ContentRepo::create_section(&pool, unit.id, &node("S1", None))
        .await
        .unwrap()
        .unwrap();

    let bad = NewResource {
        name: "bad".to_string(),
        kind: ResourceKind::Mcq,
        number: Some(0),
    };
    let result = ContentRepo::create_resources(
        &pool,
        section.id,
        &[resource("ok", ResourceKind::Content), bad],
    )
    .await;
    assert!(result.is_err());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM resources WHERE section_id = $1")
        .bind(section.id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0, "no partial upload may be visible");

    let stats = StatsRepo::find_or_zero(&pool, NodeKind::Section, section.id)
        .await
        .unwrap();
    assert_eq!(stats.total_resources, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_soft_delete_section_removes_subtree_from_ancestors(pool: PgPool) {
    let course = ContentRepo::create_course(&pool, "Algebra").await.unwrap();
    let unit = ContentRepo::create_unit(&pool, course.id, &node("U1", None))
        .await
        .unwrap()
        .unwrap();
    let keep = ContentRepo::create_section(&pool, unit.id, &node("keep", None))
        .await
        .unwrap()
        .unwrap();
    let drop = ContentRepo::create_section(&pool, unit.id, &node("drop", None))
        .await
        .unwrap()
        .unwrap();
    ContentRepo::create_resources(&pool, keep.id, &[resource("r", ResourceKind::Content)])
        .await
        .unwrap();
    ContentRepo::create_resources(
        &pool,
        drop.id,
        &[
            resource("q", ResourceKind::Mcq),
            resource("a", ResourceKind::Assessment),
        ],
    )
    .await
    .unwrap();

    assert!(ContentRepo::soft_delete_section(&pool, drop.id).await.unwrap());
    assert!(!ContentRepo::soft_delete_section(&pool, drop.id).await.unwrap());

    let unit_stats = StatsRepo::find_or_zero(&pool, NodeKind::Unit, unit.id)
        .await
        .unwrap();
    assert_eq!(unit_stats.counts(), [0, 1, 1, 0, 0]);
    let course_stats = StatsRepo::find_or_zero(&pool, NodeKind::Course, course.id)
        .await
        .unwrap();
    assert_eq!(course_stats.counts(), [1, 1, 1, 0, 0]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_recompute_overwrites_drifted_counters(pool: PgPool) {
    let course = ContentRepo::create_course(&pool, "Algebra").await.unwrap();
    let unit = ContentRepo::create_unit(&pool, course.id, &node("U1", None))
        .await
        .unwrap()
        .unwrap();
    ContentRepo::create_section(&pool, unit.id, &node("S1", None))
        .await
        .unwrap();

    sqlx::query(
        "UPDATE content_stats SET total_sections = 42 \
         WHERE node_kind = 'unit' AND node_id = $1",
    )
    .bind(unit.id)
    .execute(&pool)
    .await
    .unwrap();

    let first = StatsRepo::recompute(&pool, NodeKind::Unit, unit.id).await.unwrap();
    let second = StatsRepo::recompute(&pool, NodeKind::Unit, unit.id).await.unwrap();
    assert_eq!(first.total_sections, 1);
    assert_eq!(first.counts(), second.counts());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_missing_counter_row_reads_as_zero(pool: PgPool) {
    let stats = StatsRepo::find_or_zero(&pool, NodeKind::Unit, 987_654)
        .await
        .unwrap();
    assert_eq!(stats.counts(), [0, 0, 0, 0, 0]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_decrement_never_goes_negative(pool: PgPool) {
    let course = ContentRepo::create_course(&pool, "Algebra").await.unwrap();
    StatsRepo::increment(
        &pool,
        NodeKind::Course,
        course.id,
        coursepath_core::content::StatsField::TotalUnits,
        -3,
    )
    .await
    .unwrap();
    let stats = StatsRepo::find_or_zero(&pool, NodeKind::Course, course.id)
        .await
        .unwrap();
    assert_eq!(stats.total_units, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_under_deleted_unit_returns_none(pool: PgPool) {
    let course = ContentRepo::create_course(&pool, "Algebra").await.unwrap();
    let unit = ContentRepo::create_unit(&pool, course.id, &node("U1", None))
        .await
        .unwrap()
        .unwrap();
    assert!(ContentRepo::soft_delete_unit(&pool, unit.id).await.unwrap());

    let section = ContentRepo::create_section(&pool, unit.id, &node("S1", None))
        .await
        .unwrap();
    assert!(section.is_none());
}
