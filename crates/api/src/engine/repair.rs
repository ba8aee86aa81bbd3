//! Recalculation / repair job.
//!
//! Rebuilds every piece of derived state for a course from ground truth:
//! counters bottom-up, ledger rows of deleted sections, unit progress for
//! both sources (with `completed_units` reconciled), then course progress.
//! Work is chunked per unit and the cancellation token is checked between
//! units; a cancelled run leaves valid state, just not all of it refreshed.
//! Running it twice in a row produces identical results.

use coursepath_core::content::NodeKind;
use coursepath_core::progress::ProgressSource;
use coursepath_core::types::DbId;
use coursepath_db::repositories::{CompletionRepo, ContentRepo, StatsRepo};
use serde::Serialize;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

use crate::engine::aggregator::{self, UnitFlagChange};
use crate::error::AppResult;

/// Counts of what a repair run touched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub courses: u64,
    pub counters_recomputed: u64,
    pub completions_invalidated: u64,
    pub unit_progress_written: u64,
    pub course_progress_written: u64,
    pub units_completed: u64,
    pub units_invalidated: u64,
    /// Whether the run stopped early because of cancellation.
    pub cancelled: bool,
}

impl RepairReport {
    fn absorb(&mut self, other: &RepairReport) {
        self.courses += other.courses;
        self.counters_recomputed += other.counters_recomputed;
        self.completions_invalidated += other.completions_invalidated;
        self.unit_progress_written += other.unit_progress_written;
        self.course_progress_written += other.course_progress_written;
        self.units_completed += other.units_completed;
        self.units_invalidated += other.units_invalidated;
        self.cancelled |= other.cancelled;
    }
}

/// RecalculateAll: repair every active course.
pub async fn recalculate_all(pool: &PgPool, cancel: &CancellationToken) -> AppResult<RepairReport> {
    let mut report = RepairReport::default();
    for course_id in ContentRepo::list_course_ids(pool).await? {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }
        let course_report = recalculate_course(pool, course_id, cancel).await?;
        report.absorb(&course_report);
    }
    tracing::info!(
        courses = report.courses,
        counters = report.counters_recomputed,
        unit_progress = report.unit_progress_written,
        course_progress = report.course_progress_written,
        cancelled = report.cancelled,
        "Repair sweep finished",
    );
    Ok(report)
}

/// RecalculateCourse: repair one course.
pub async fn recalculate_course(
    pool: &PgPool,
    course_id: DbId,
    cancel: &CancellationToken,
) -> AppResult<RepairReport> {
    let mut report = RepairReport {
        courses: 1,
        ..RepairReport::default()
    };

    // Counters, leaves first so each level reads settled children.
    let units = ContentRepo::list_units(pool, course_id).await?;
    for unit in &units {
        for section in ContentRepo::list_sections(pool, unit.id).await? {
            StatsRepo::recompute(pool, NodeKind::Section, section.id).await?;
            report.counters_recomputed += 1;
        }
        StatsRepo::recompute(pool, NodeKind::Unit, unit.id).await?;
        report.counters_recomputed += 1;
    }
    StatsRepo::recompute(pool, NodeKind::Course, course_id).await?;
    report.counters_recomputed += 1;

    report.completions_invalidated =
        CompletionRepo::invalidate_deleted_sections(pool, course_id).await?;

    let students = CompletionRepo::list_students_in_course(pool, course_id).await?;

    for unit in &units {
        if cancel.is_cancelled() {
            tracing::info!(course_id, unit_id = unit.id, "Repair cancelled between units");
            report.cancelled = true;
            return Ok(report);
        }
        for &student_id in &students {
            for source in ProgressSource::ALL {
                let recalc =
                    aggregator::save_unit_progress(pool, student_id, course_id, unit.id, source)
                        .await?;
                report.unit_progress_written += 1;
                match recalc.flag {
                    UnitFlagChange::Completed => report.units_completed += 1,
                    UnitFlagChange::Invalidated => report.units_invalidated += 1,
                    UnitFlagChange::Unchanged => {}
                }
            }
        }
        tracing::debug!(course_id, unit_id = unit.id, students = students.len(), "Unit repaired");
    }

    for &student_id in &students {
        for source in ProgressSource::ALL {
            aggregator::recalculate_and_save_course_progress(pool, student_id, course_id, source)
                .await?;
            report.course_progress_written += 1;
        }
    }

    tracing::info!(
        course_id,
        students = students.len(),
        invalidated = report.completions_invalidated,
        "Course repaired",
    );
    Ok(report)
}
