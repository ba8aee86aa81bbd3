//! Repository for the `resource_views` table.

use coursepath_core::types::DbId;
use sqlx::PgPool;

use crate::models::content::Resource;
use crate::models::resource_view::ResourceView;

const COLUMNS: &str = "id, student_id, course_id, unit_id, section_id, resource_id, \
                       mcq_attempts, completed, created_at, updated_at";

/// Records viewing events and counts completed views.
pub struct ResourceViewRepo;

impl ResourceViewRepo {
    /// Record that a student viewed a resource. Repeat views are no-ops.
    pub async fn record_view(
        pool: &PgPool,
        student_id: DbId,
        resource: &Resource,
    ) -> Result<ResourceView, sqlx::Error> {
        let query = format!(
            "INSERT INTO resource_views \
                 (student_id, course_id, unit_id, section_id, resource_id, completed) \
             VALUES ($1, $2, $3, $4, $5, TRUE) \
             ON CONFLICT ON CONSTRAINT uq_resource_views_key DO UPDATE SET \
                 completed = TRUE, \
                 updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ResourceView>(&query)
            .bind(student_id)
            .bind(resource.course_id)
            .bind(resource.unit_id)
            .bind(resource.section_id)
            .bind(resource.id)
            .fetch_one(pool)
            .await
    }

    /// Record a completed MCQ. Keeps the highest attempt count reported.
    pub async fn record_mcq_completion(
        pool: &PgPool,
        student_id: DbId,
        resource: &Resource,
        attempts: i32,
    ) -> Result<ResourceView, sqlx::Error> {
        let query = format!(
            "INSERT INTO resource_views \
                 (student_id, course_id, unit_id, section_id, resource_id, mcq_attempts, completed) \
             VALUES ($1, $2, $3, $4, $5, $6, TRUE) \
             ON CONFLICT ON CONSTRAINT uq_resource_views_key DO UPDATE SET \
                 mcq_attempts = GREATEST(resource_views.mcq_attempts, EXCLUDED.mcq_attempts), \
                 completed = TRUE, \
                 updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ResourceView>(&query)
            .bind(student_id)
            .bind(resource.course_id)
            .bind(resource.unit_id)
            .bind(resource.section_id)
            .bind(resource.id)
            .bind(attempts)
            .fetch_one(pool)
            .await
    }

    /// Count completed views of a section's active resources.
    pub async fn count_completed_in_section(
        pool: &PgPool,
        student_id: DbId,
        section_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM resource_views v \
             JOIN resources r ON r.id = v.resource_id AND r.status_id = 1 \
             WHERE v.student_id = $1 AND v.section_id = $2 AND v.completed",
        )
        .bind(student_id)
        .bind(section_id)
        .fetch_one(pool)
        .await
    }

    /// Count completed views of active resources under a unit's active
    /// sections.
    pub async fn count_completed_in_unit(
        pool: &PgPool,
        student_id: DbId,
        course_id: DbId,
        unit_id: DbId,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM resource_views v \
             JOIN resources r ON r.id = v.resource_id AND r.status_id = 1 \
             JOIN sections s ON s.id = r.section_id AND s.status_id = 1 \
             WHERE v.student_id = $1 AND v.course_id = $2 AND v.unit_id = $3 AND v.completed",
        )
        .bind(student_id)
        .bind(course_id)
        .bind(unit_id)
        .fetch_one(pool)
        .await
    }
}
