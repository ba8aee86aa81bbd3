//! Repository for the `content_stats` table.
//!
//! Counters are a cache of the content tree. Incremental writes go through
//! [`StatsRepo::increment`] inside the structural transaction that changed
//! the tree; [`StatsRepo::recompute`] rebuilds a row from ground truth.

use coursepath_core::content::{NodeKind, StatsField};
use coursepath_core::types::DbId;
use sqlx::{PgConnection, PgExecutor, PgPool};

use crate::models::stats::{ContentStats, SubtreeCounts};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "node_kind, node_id, total_units, total_sections, total_resources, \
                       total_mcqs, total_assessments, updated_at";

/// Shared `ON CONFLICT` clause that overwrites every count with the
/// freshly computed values.
const OVERWRITE: &str = "ON CONFLICT (node_kind, node_id) DO UPDATE SET \
                             total_units = EXCLUDED.total_units, \
                             total_sections = EXCLUDED.total_sections, \
                             total_resources = EXCLUDED.total_resources, \
                             total_mcqs = EXCLUDED.total_mcqs, \
                             total_assessments = EXCLUDED.total_assessments, \
                             updated_at = NOW()";

/// Provides counter reads, atomic increments and recomputation.
pub struct StatsRepo;

impl StatsRepo {
    /// Find the stored counter row for a node.
    pub async fn find(
        pool: &PgPool,
        kind: NodeKind,
        node_id: DbId,
    ) -> Result<Option<ContentStats>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM content_stats WHERE node_kind = $1 AND node_id = $2"
        );
        sqlx::query_as::<_, ContentStats>(&query)
            .bind(kind.as_str())
            .bind(node_id)
            .fetch_optional(pool)
            .await
    }

    /// Find the counter row, treating a missing row as all zeros.
    pub async fn find_or_zero(
        pool: &PgPool,
        kind: NodeKind,
        node_id: DbId,
    ) -> Result<ContentStats, sqlx::Error> {
        match Self::find(pool, kind, node_id).await? {
            Some(stats) => Ok(stats),
            None => {
                tracing::warn!(
                    node_kind = kind.as_str(),
                    node_id,
                    "Counter row missing, treating as zero",
                );
                Ok(ContentStats::zero(kind, node_id))
            }
        }
    }

    /// Create an all-zero row if none exists.
    pub async fn ensure<'e, E: PgExecutor<'e>>(
        executor: E,
        kind: NodeKind,
        node_id: DbId,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO content_stats (node_kind, node_id) VALUES ($1, $2) \
             ON CONFLICT (node_kind, node_id) DO NOTHING",
        )
        .bind(kind.as_str())
        .bind(node_id)
        .execute(executor)
        .await?;
        Ok(())
    }

    /// Atomically add `delta` to one counter, upserting a missing row.
    ///
    /// The stored value never drops below zero.
    pub async fn increment<'e, E: PgExecutor<'e>>(
        executor: E,
        kind: NodeKind,
        node_id: DbId,
        field: StatsField,
        delta: i32,
    ) -> Result<(), sqlx::Error> {
        let col = field.column();
        let query = format!(
            "INSERT INTO content_stats (node_kind, node_id, {col}) \
             VALUES ($1, $2, GREATEST($3, 0)) \
             ON CONFLICT (node_kind, node_id) DO UPDATE SET \
                 {col} = GREATEST(content_stats.{col} + $3, 0), \
                 updated_at = NOW()"
        );
        sqlx::query(&query)
            .bind(kind.as_str())
            .bind(node_id)
            .bind(delta)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Apply several deltas to one node. Zero deltas are skipped.
    pub async fn apply_deltas(
        conn: &mut PgConnection,
        kind: NodeKind,
        node_id: DbId,
        deltas: &[(StatsField, i32)],
    ) -> Result<(), sqlx::Error> {
        for &(field, delta) in deltas {
            if delta != 0 {
                Self::increment(&mut *conn, kind, node_id, field, delta).await?;
            }
        }
        Ok(())
    }

    /// Overwrite a node's counters with counts taken from the content tree.
    pub async fn recompute<'e, E: PgExecutor<'e>>(
        executor: E,
        kind: NodeKind,
        node_id: DbId,
    ) -> Result<ContentStats, sqlx::Error> {
        let source = match kind {
            NodeKind::Section => {
                "SELECT 'section', $1::BIGINT, 0, 0, \
                     COUNT(*), \
                     COUNT(*) FILTER (WHERE r.kind = 'mcq'), \
                     COUNT(*) FILTER (WHERE r.kind = 'assessment'), \
                     NOW() \
                 FROM resources r \
                 WHERE r.section_id = $1 AND r.status_id = 1"
            }
            NodeKind::Unit => {
                "SELECT 'unit', $1::BIGINT, 0, \
                     (SELECT COUNT(*) FROM sections s \
                      WHERE s.unit_id = $1 AND s.status_id = 1), \
                     COUNT(r.id), \
                     COUNT(r.id) FILTER (WHERE r.kind = 'mcq'), \
                     COUNT(r.id) FILTER (WHERE r.kind = 'assessment'), \
                     NOW() \
                 FROM resources r \
                 JOIN sections s ON s.id = r.section_id AND s.status_id = 1 \
                 WHERE r.unit_id = $1 AND r.status_id = 1"
            }
            NodeKind::Course => {
                "SELECT 'course', $1::BIGINT, \
                     (SELECT COUNT(*) FROM units u \
                      WHERE u.course_id = $1 AND u.status_id = 1), \
                     (SELECT COUNT(*) FROM sections s \
                      JOIN units u ON u.id = s.unit_id AND u.status_id = 1 \
                      WHERE s.course_id = $1 AND s.status_id = 1), \
                     COUNT(r.id), \
                     COUNT(r.id) FILTER (WHERE r.kind = 'mcq'), \
                     COUNT(r.id) FILTER (WHERE r.kind = 'assessment'), \
                     NOW() \
                 FROM resources r \
                 JOIN sections s ON s.id = r.section_id AND s.status_id = 1 \
                 JOIN units u ON u.id = r.unit_id AND u.status_id = 1 \
                 WHERE r.course_id = $1 AND r.status_id = 1"
            }
        };
        let query = format!(
            "INSERT INTO content_stats ({COLUMNS}) {source} {OVERWRITE} RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ContentStats>(&query)
            .bind(node_id)
            .fetch_one(executor)
            .await
    }

    /// Count the active sections and resources below a unit.
    pub async fn unit_subtree<'e, E: PgExecutor<'e>>(
        executor: E,
        unit_id: DbId,
    ) -> Result<SubtreeCounts, sqlx::Error> {
        sqlx::query_as::<_, SubtreeCounts>(
            "SELECT \
                 (SELECT COUNT(*) FROM sections s \
                  WHERE s.unit_id = $1 AND s.status_id = 1) AS sections, \
                 COUNT(r.id) AS resources, \
                 COUNT(r.id) FILTER (WHERE r.kind = 'mcq') AS mcqs, \
                 COUNT(r.id) FILTER (WHERE r.kind = 'assessment') AS assessments \
             FROM resources r \
             JOIN sections s ON s.id = r.section_id AND s.status_id = 1 \
             WHERE r.unit_id = $1 AND r.status_id = 1",
        )
        .bind(unit_id)
        .fetch_one(executor)
        .await
    }

    /// Count the active resources below a section (`sections` is always 1).
    pub async fn section_subtree<'e, E: PgExecutor<'e>>(
        executor: E,
        section_id: DbId,
    ) -> Result<SubtreeCounts, sqlx::Error> {
        sqlx::query_as::<_, SubtreeCounts>(
            "SELECT 1::BIGINT AS sections, \
                 COUNT(*) AS resources, \
                 COUNT(*) FILTER (WHERE kind = 'mcq') AS mcqs, \
                 COUNT(*) FILTER (WHERE kind = 'assessment') AS assessments \
             FROM resources \
             WHERE section_id = $1 AND status_id = 1",
        )
        .bind(section_id)
        .fetch_one(executor)
        .await
    }
}
