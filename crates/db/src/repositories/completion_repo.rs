//! Repository for the completion ledger (`completed_sections`,
//! `completed_units`).
//!
//! Rows are marked and unmarked through `status`, never deleted. Counting
//! queries only consider `status = 1` rows whose section is still active.

use coursepath_core::types::DbId;
use sqlx::PgPool;

use crate::is_unique_violation;
use crate::models::completion::{CompletedSection, CompletedUnit};
use crate::models::status::CompletionStatus;

const SECTION_COLUMNS: &str =
    "id, student_id, course_id, unit_id, section_id, status, created_at, updated_at";
const UNIT_COLUMNS: &str = "id, student_id, course_id, unit_id, status, created_at, updated_at";

/// Provides ledger writes and read queries.
pub struct CompletionRepo;

impl CompletionRepo {
    /// Record that a student finished a section.
    ///
    /// A first call inserts. A repeat call hits the composite unique key; the
    /// duplicate is expected and swallowed, and the existing row is
    /// (re)activated instead so an invalidated completion is never duplicated.
    pub async fn mark_section_complete(
        pool: &PgPool,
        student_id: DbId,
        course_id: DbId,
        unit_id: DbId,
        section_id: DbId,
    ) -> Result<CompletedSection, sqlx::Error> {
        let insert = format!(
            "INSERT INTO completed_sections (student_id, course_id, unit_id, section_id, status) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {SECTION_COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, CompletedSection>(&insert)
            .bind(student_id)
            .bind(course_id)
            .bind(unit_id)
            .bind(section_id)
            .bind(CompletionStatus::Complete.id())
            .fetch_one(pool)
            .await;

        match inserted {
            Ok(row) => Ok(row),
            Err(e) if is_unique_violation(&e) => {
                let reactivate = format!(
                    "UPDATE completed_sections SET \
                         status = $5, \
                         updated_at = CASE WHEN status = $5 THEN updated_at ELSE NOW() END \
                     WHERE student_id = $1 AND course_id = $2 AND unit_id = $3 AND section_id = $4 \
                     RETURNING {SECTION_COLUMNS}"
                );
                sqlx::query_as::<_, CompletedSection>(&reactivate)
                    .bind(student_id)
                    .bind(course_id)
                    .bind(unit_id)
                    .bind(section_id)
                    .bind(CompletionStatus::Complete.id())
                    .fetch_one(pool)
                    .await
            }
            Err(e) => Err(e),
        }
    }

    /// Whether the student has an active completion for an active section.
    pub async fn is_section_complete(
        pool: &PgPool,
        student_id: DbId,
        course_id: DbId,
        section_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS ( \
                 SELECT 1 FROM completed_sections cs \
                 JOIN sections s ON s.id = cs.section_id AND s.status_id = 1 \
                 WHERE cs.student_id = $1 AND cs.course_id = $2 \
                   AND cs.section_id = $3 AND cs.status = 1 \
             )",
        )
        .bind(student_id)
        .bind(course_id)
        .bind(section_id)
        .fetch_one(pool)
        .await
    }

    /// Count the student's active completions over a unit's active sections.
    pub async fn count_completed_sections(
        pool: &PgPool,
        student_id: DbId,
        course_id: DbId,
        unit_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM completed_sections cs \
             JOIN sections s ON s.id = cs.section_id AND s.status_id = 1 \
             WHERE cs.student_id = $1 AND cs.course_id = $2 \
               AND cs.unit_id = $3 AND s.unit_id = $3 AND cs.status = 1",
        )
        .bind(student_id)
        .bind(course_id)
        .bind(unit_id)
        .fetch_one(pool)
        .await
    }

    /// List all ledger rows (any status) for a student in a unit.
    pub async fn list_section_rows(
        pool: &PgPool,
        student_id: DbId,
        course_id: DbId,
        unit_id: DbId,
    ) -> Result<Vec<CompletedSection>, sqlx::Error> {
        let query = format!(
            "SELECT {SECTION_COLUMNS} FROM completed_sections \
             WHERE student_id = $1 AND course_id = $2 AND unit_id = $3 \
             ORDER BY section_id"
        );
        sqlx::query_as::<_, CompletedSection>(&query)
            .bind(student_id)
            .bind(course_id)
            .bind(unit_id)
            .fetch_all(pool)
            .await
    }

    /// Flag a unit complete for a student. Returns `true` if the flag changed.
    pub async fn mark_unit_complete(
        pool: &PgPool,
        student_id: DbId,
        course_id: DbId,
        unit_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO completed_units (student_id, course_id, unit_id, status) \
             VALUES ($1, $2, $3, 1) \
             ON CONFLICT ON CONSTRAINT uq_completed_units_key DO UPDATE SET \
                 status = 1, \
                 updated_at = NOW() \
             WHERE completed_units.status <> 1",
        )
        .bind(student_id)
        .bind(course_id)
        .bind(unit_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Clear a unit's completion flag. Returns `true` if the flag changed.
    pub async fn invalidate_unit(
        pool: &PgPool,
        student_id: DbId,
        course_id: DbId,
        unit_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE completed_units SET status = 0, updated_at = NOW() \
             WHERE student_id = $1 AND course_id = $2 AND unit_id = $3 AND status = 1",
        )
        .bind(student_id)
        .bind(course_id)
        .bind(unit_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Find the unit completion row, if one was ever created.
    pub async fn find_unit(
        pool: &PgPool,
        student_id: DbId,
        course_id: DbId,
        unit_id: DbId,
    ) -> Result<Option<CompletedUnit>, sqlx::Error> {
        let query = format!(
            "SELECT {UNIT_COLUMNS} FROM completed_units \
             WHERE student_id = $1 AND course_id = $2 AND unit_id = $3"
        );
        sqlx::query_as::<_, CompletedUnit>(&query)
            .bind(student_id)
            .bind(course_id)
            .bind(unit_id)
            .fetch_optional(pool)
            .await
    }

    /// Deactivate section completions whose section or unit was deleted.
    ///
    /// Returns the number of rows flipped to inactive.
    pub async fn invalidate_deleted_sections(
        pool: &PgPool,
        course_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE completed_sections cs SET status = 0, updated_at = NOW() \
             FROM sections s, units u \
             WHERE cs.section_id = s.id AND s.unit_id = u.id \
               AND cs.course_id = $1 AND cs.status = 1 \
               AND (s.status_id <> 1 OR u.status_id <> 1)",
        )
        .bind(course_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Every student with any ledger, view, progress or unlock state in a
    /// course.
    pub async fn list_students_in_course(
        pool: &PgPool,
        course_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>(
            "SELECT student_id FROM completed_sections WHERE course_id = $1 \
             UNION SELECT student_id FROM resource_views WHERE course_id = $1 \
             UNION SELECT student_id FROM unit_progress WHERE course_id = $1 \
             UNION SELECT student_id FROM course_unlocks WHERE course_id = $1 \
             ORDER BY student_id",
        )
        .bind(course_id)
        .fetch_all(pool)
        .await
    }
}
