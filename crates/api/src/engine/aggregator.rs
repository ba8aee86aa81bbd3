//! Progress aggregator.
//!
//! Unit progress = completed leaf work / the unit's counter for the chosen
//! [`ProgressSource`]. Course progress = units at exactly 100 / the course's
//! unit counter. Every write is an overwrite derived from ground truth, so
//! calling any of these twice is the same as calling them once.

use coursepath_core::content::{NodeKind, StatsField};
use coursepath_core::progress::{
    derive_course_snapshot, derive_snapshot, ProgressSnapshot, ProgressSource,
};
use coursepath_core::types::DbId;
use coursepath_db::models::progress::{CourseProgress, UnitProgress};
use coursepath_db::repositories::{
    CompletionRepo, ProgressRepo, ResourceViewRepo, StatsRepo,
};
use serde::Serialize;
use sqlx::PgPool;

use crate::error::AppResult;

/// How a unit recalculation changed the student's `completed_units` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitFlagChange {
    Unchanged,
    Completed,
    Invalidated,
}

/// Result of recalculating one unit without cascading.
#[derive(Debug, Clone, Serialize)]
pub struct UnitRecalc {
    pub progress: UnitProgress,
    pub flag: UnitFlagChange,
}

/// Result of recalculating a unit and the course above it.
#[derive(Debug, Clone, Serialize)]
pub struct CascadeRecalc {
    pub unit: UnitProgress,
    pub course: CourseProgress,
    pub unit_flag: UnitFlagChange,
}

/// Derive a student's unit snapshot for one source from ground truth.
pub async fn derive_unit_snapshot(
    pool: &PgPool,
    student_id: DbId,
    course_id: DbId,
    unit_id: DbId,
    source: ProgressSource,
) -> AppResult<ProgressSnapshot> {
    let completed = match source {
        ProgressSource::Ledger => {
            CompletionRepo::count_completed_sections(pool, student_id, course_id, unit_id).await?
        }
        ProgressSource::ResourceView => {
            ResourceViewRepo::count_completed_in_unit(pool, student_id, course_id, unit_id).await?
        }
    };
    let stats = StatsRepo::find_or_zero(pool, NodeKind::Unit, unit_id).await?;
    let total = i64::from(stats.get(source.unit_denominator()));
    Ok(derive_snapshot(completed, total))
}

/// Recalculate and store one unit's progress without touching the course.
///
/// For the ledger source the `completed_units` flag follows the result:
/// set at 100, cleared below it.
pub async fn save_unit_progress(
    pool: &PgPool,
    student_id: DbId,
    course_id: DbId,
    unit_id: DbId,
    source: ProgressSource,
) -> AppResult<UnitRecalc> {
    let snapshot = derive_unit_snapshot(pool, student_id, course_id, unit_id, source).await?;
    let progress =
        ProgressRepo::upsert_unit(pool, student_id, course_id, unit_id, source, &snapshot).await?;

    let flag = match source {
        ProgressSource::ResourceView => UnitFlagChange::Unchanged,
        ProgressSource::Ledger if snapshot.is_complete() => {
            if CompletionRepo::mark_unit_complete(pool, student_id, course_id, unit_id).await? {
                tracing::info!(student_id, course_id, unit_id, "Unit completed");
                UnitFlagChange::Completed
            } else {
                UnitFlagChange::Unchanged
            }
        }
        ProgressSource::Ledger => {
            if CompletionRepo::invalidate_unit(pool, student_id, course_id, unit_id).await? {
                tracing::info!(student_id, course_id, unit_id, "Unit completion invalidated");
                UnitFlagChange::Invalidated
            } else {
                UnitFlagChange::Unchanged
            }
        }
    };

    tracing::debug!(
        student_id,
        unit_id,
        source = source.as_str(),
        percentage = snapshot.percentage,
        completed = snapshot.completed_count,
        total = snapshot.total_count,
        "Unit progress saved",
    );

    Ok(UnitRecalc { progress, flag })
}

/// Recalculate and store course progress for one source.
pub async fn recalculate_and_save_course_progress(
    pool: &PgPool,
    student_id: DbId,
    course_id: DbId,
    source: ProgressSource,
) -> AppResult<CourseProgress> {
    let percentages = ProgressRepo::unit_percentages(pool, student_id, course_id, source).await?;
    let stats = StatsRepo::find_or_zero(pool, NodeKind::Course, course_id).await?;
    let total_units = i64::from(stats.get(StatsField::TotalUnits));
    let snapshot = derive_course_snapshot(&percentages, total_units);

    let progress =
        ProgressRepo::upsert_course(pool, student_id, course_id, source, &snapshot).await?;
    tracing::debug!(
        student_id,
        course_id,
        source = source.as_str(),
        percentage = snapshot.percentage,
        "Course progress saved",
    );
    Ok(progress)
}

/// Recalculate a unit and cascade into its course.
pub async fn recalculate_and_save_unit_progress(
    pool: &PgPool,
    student_id: DbId,
    course_id: DbId,
    unit_id: DbId,
    source: ProgressSource,
) -> AppResult<CascadeRecalc> {
    let unit = save_unit_progress(pool, student_id, course_id, unit_id, source).await?;
    let course = recalculate_and_save_course_progress(pool, student_id, course_id, source).await?;
    Ok(CascadeRecalc {
        unit: unit.progress,
        course,
        unit_flag: unit.flag,
    })
}

/// Stored course progress, derived and stored first if the row is missing.
pub async fn course_progress_or_derive(
    pool: &PgPool,
    student_id: DbId,
    course_id: DbId,
    source: ProgressSource,
) -> AppResult<CourseProgress> {
    if let Some(stored) = ProgressRepo::find_course(pool, student_id, course_id, source).await? {
        return Ok(stored);
    }
    tracing::warn!(
        student_id,
        course_id,
        source = source.as_str(),
        "Course progress row missing, deriving",
    );
    recalculate_and_save_course_progress(pool, student_id, course_id, source).await
}

/// Percentage of a section's active resources the student has viewed.
pub async fn section_view_snapshot(
    pool: &PgPool,
    student_id: DbId,
    section_id: DbId,
) -> AppResult<ProgressSnapshot> {
    let viewed = ResourceViewRepo::count_completed_in_section(pool, student_id, section_id).await?;
    let stats = StatsRepo::find_or_zero(pool, NodeKind::Section, section_id).await?;
    Ok(derive_snapshot(
        viewed,
        i64::from(stats.get(StatsField::TotalResources)),
    ))
}
