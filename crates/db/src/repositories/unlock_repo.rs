//! Repository for the `course_unlocks` table.
//!
//! Sets only grow: each append is guarded by a membership check in the
//! same statement, so re-unlocking an id writes nothing.

use coursepath_core::types::DbId;
use sqlx::PgPool;

use crate::models::unlock::CourseUnlock;

const COLUMNS: &str = "id, student_id, course_id, unlocked_unit_ids, unlocked_section_ids, \
                       created_at, updated_at";

/// Which unlock array to append to.
#[derive(Debug, Clone, Copy)]
enum UnlockColumn {
    Units,
    Sections,
}

impl UnlockColumn {
    fn name(self) -> &'static str {
        match self {
            Self::Units => "unlocked_unit_ids",
            Self::Sections => "unlocked_section_ids",
        }
    }
}

/// Provides reads and monotonic appends on unlock sets.
pub struct UnlockRepo;

impl UnlockRepo {
    /// Find the unlock row for a (student, course) pair.
    pub async fn find(
        pool: &PgPool,
        student_id: DbId,
        course_id: DbId,
    ) -> Result<Option<CourseUnlock>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM course_unlocks WHERE student_id = $1 AND course_id = $2"
        );
        sqlx::query_as::<_, CourseUnlock>(&query)
            .bind(student_id)
            .bind(course_id)
            .fetch_optional(pool)
            .await
    }

    /// Create the unlock row with its initial sets.
    ///
    /// If a concurrent request created it first, that row is returned
    /// unchanged.
    pub async fn create_or_get(
        pool: &PgPool,
        student_id: DbId,
        course_id: DbId,
        unit_ids: &[DbId],
        section_ids: &[DbId],
    ) -> Result<CourseUnlock, sqlx::Error> {
        let query = format!(
            "INSERT INTO course_unlocks \
                 (student_id, course_id, unlocked_unit_ids, unlocked_section_ids) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT ON CONSTRAINT uq_course_unlocks_key DO NOTHING \
             RETURNING {COLUMNS}"
        );
        let created = sqlx::query_as::<_, CourseUnlock>(&query)
            .bind(student_id)
            .bind(course_id)
            .bind(unit_ids)
            .bind(section_ids)
            .fetch_optional(pool)
            .await?;

        match created {
            Some(row) => Ok(row),
            None => Self::find(pool, student_id, course_id)
                .await?
                .ok_or(sqlx::Error::RowNotFound),
        }
    }

    /// Append a unit id if absent. Returns `true` if it was added.
    pub async fn add_unit(
        pool: &PgPool,
        student_id: DbId,
        course_id: DbId,
        unit_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        Self::append(pool, UnlockColumn::Units, student_id, course_id, unit_id).await
    }

    /// Append a section id if absent. Returns `true` if it was added.
    pub async fn add_section(
        pool: &PgPool,
        student_id: DbId,
        course_id: DbId,
        section_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        Self::append(pool, UnlockColumn::Sections, student_id, course_id, section_id).await
    }

    async fn append(
        pool: &PgPool,
        column: UnlockColumn,
        student_id: DbId,
        course_id: DbId,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let col = column.name();
        let query = format!(
            "UPDATE course_unlocks SET \
                 {col} = array_append({col}, $3), \
                 updated_at = NOW() \
             WHERE student_id = $1 AND course_id = $2 AND NOT ($3 = ANY({col}))"
        );
        let result = sqlx::query(&query)
            .bind(student_id)
            .bind(course_id)
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
