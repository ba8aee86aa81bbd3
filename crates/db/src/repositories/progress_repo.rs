//! Repository for the `unit_progress` and `course_progress` tables.
//!
//! Rows are only ever written by the aggregator as full overwrites of a
//! freshly derived snapshot; percentages are clamped before they get here
//! and the table CHECK rejects anything outside `[0, 100]`.

use coursepath_core::progress::{ProgressSnapshot, ProgressSource};
use coursepath_core::types::DbId;
use sqlx::PgPool;

use crate::models::progress::{CourseProgress, UnitProgress, UnitProgressView};

const UNIT_COLUMNS: &str = "id, student_id, course_id, unit_id, source, percentage, \
                            completed_count, total_count, updated_at";
const COURSE_COLUMNS: &str =
    "id, student_id, course_id, source, percentage, completed_count, total_count, updated_at";

/// Provides upserts and reads of derived progress snapshots.
pub struct ProgressRepo;

impl ProgressRepo {
    /// Overwrite a student's unit progress for one source.
    pub async fn upsert_unit(
        pool: &PgPool,
        student_id: DbId,
        course_id: DbId,
        unit_id: DbId,
        source: ProgressSource,
        snapshot: &ProgressSnapshot,
    ) -> Result<UnitProgress, sqlx::Error> {
        let query = format!(
            "INSERT INTO unit_progress \
                 (student_id, course_id, unit_id, source, percentage, completed_count, total_count) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT ON CONSTRAINT uq_unit_progress_key DO UPDATE SET \
                 percentage = EXCLUDED.percentage, \
                 completed_count = EXCLUDED.completed_count, \
                 total_count = EXCLUDED.total_count, \
                 updated_at = NOW() \
             RETURNING {UNIT_COLUMNS}"
        );
        sqlx::query_as::<_, UnitProgress>(&query)
            .bind(student_id)
            .bind(course_id)
            .bind(unit_id)
            .bind(source.as_str())
            .bind(snapshot.percentage)
            .bind(snapshot.completed_count)
            .bind(snapshot.total_count)
            .fetch_one(pool)
            .await
    }

    /// Overwrite a student's course progress for one source.
    pub async fn upsert_course(
        pool: &PgPool,
        student_id: DbId,
        course_id: DbId,
        source: ProgressSource,
        snapshot: &ProgressSnapshot,
    ) -> Result<CourseProgress, sqlx::Error> {
        let query = format!(
            "INSERT INTO course_progress \
                 (student_id, course_id, source, percentage, completed_count, total_count) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT ON CONSTRAINT uq_course_progress_key DO UPDATE SET \
                 percentage = EXCLUDED.percentage, \
                 completed_count = EXCLUDED.completed_count, \
                 total_count = EXCLUDED.total_count, \
                 updated_at = NOW() \
             RETURNING {COURSE_COLUMNS}"
        );
        sqlx::query_as::<_, CourseProgress>(&query)
            .bind(student_id)
            .bind(course_id)
            .bind(source.as_str())
            .bind(snapshot.percentage)
            .bind(snapshot.completed_count)
            .bind(snapshot.total_count)
            .fetch_one(pool)
            .await
    }

    /// Find a stored unit snapshot.
    pub async fn find_unit(
        pool: &PgPool,
        student_id: DbId,
        course_id: DbId,
        unit_id: DbId,
        source: ProgressSource,
    ) -> Result<Option<UnitProgress>, sqlx::Error> {
        let query = format!(
            "SELECT {UNIT_COLUMNS} FROM unit_progress \
             WHERE student_id = $1 AND course_id = $2 AND unit_id = $3 AND source = $4"
        );
        sqlx::query_as::<_, UnitProgress>(&query)
            .bind(student_id)
            .bind(course_id)
            .bind(unit_id)
            .bind(source.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Find a stored course snapshot.
    pub async fn find_course(
        pool: &PgPool,
        student_id: DbId,
        course_id: DbId,
        source: ProgressSource,
    ) -> Result<Option<CourseProgress>, sqlx::Error> {
        let query = format!(
            "SELECT {COURSE_COLUMNS} FROM course_progress \
             WHERE student_id = $1 AND course_id = $2 AND source = $3"
        );
        sqlx::query_as::<_, CourseProgress>(&query)
            .bind(student_id)
            .bind(course_id)
            .bind(source.as_str())
            .fetch_optional(pool)
            .await
    }

    /// Every active unit of a course with the student's stored progress,
    /// ordered by unit number. Missing rows read as zero completion against
    /// the unit's current counter.
    pub async fn list_unit_views(
        pool: &PgPool,
        student_id: DbId,
        course_id: DbId,
        source: ProgressSource,
    ) -> Result<Vec<UnitProgressView>, sqlx::Error> {
        let total_column = source.unit_denominator().column();
        let query = format!(
            "SELECT u.id AS unit_id, u.name, u.number, \
                 COALESCE(p.percentage, 0::SMALLINT) AS percentage, \
                 COALESCE(p.completed_count, 0) AS completed_count, \
                 COALESCE(p.total_count, cs.{total_column}, 0) AS total_count \
             FROM units u \
             LEFT JOIN unit_progress p \
                 ON p.unit_id = u.id AND p.student_id = $1 AND p.source = $3 \
             LEFT JOIN content_stats cs \
                 ON cs.node_kind = 'unit' AND cs.node_id = u.id \
             WHERE u.course_id = $2 AND u.status_id = 1 \
             ORDER BY u.number"
        );
        sqlx::query_as::<_, UnitProgressView>(&query)
            .bind(student_id)
            .bind(course_id)
            .bind(source.as_str())
            .fetch_all(pool)
            .await
    }

    /// Stored percentages of every active unit of a course (0 when missing).
    pub async fn unit_percentages(
        pool: &PgPool,
        student_id: DbId,
        course_id: DbId,
        source: ProgressSource,
    ) -> Result<Vec<i16>, sqlx::Error> {
        sqlx::query_scalar::<_, i16>(
            "SELECT COALESCE(p.percentage, 0::SMALLINT) FROM units u \
             LEFT JOIN unit_progress p \
                 ON p.unit_id = u.id AND p.student_id = $1 AND p.source = $3 \
             WHERE u.course_id = $2 AND u.status_id = 1 \
             ORDER BY u.number",
        )
        .bind(student_id)
        .bind(course_id)
        .bind(source.as_str())
        .fetch_all(pool)
        .await
    }
}
