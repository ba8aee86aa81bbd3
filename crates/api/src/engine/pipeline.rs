//! Per-student completion pipeline.
//!
//! mark complete -> unit progress -> course progress -> unlock transition.
//! Each step awaits its write before the next one reads, so the same student
//! always sees their own updates. Nothing here spans a database transaction;
//! a failure part-way leaves state the repair job can converge.

use coursepath_core::error::CoreError;
use coursepath_core::progress::{ProgressSnapshot, ProgressSource};
use coursepath_core::types::DbId;
use coursepath_db::models::completion::CompletedSection;
use coursepath_db::models::content::{Resource, Section, Unit};
use coursepath_db::models::resource_view::ResourceView;
use coursepath_db::repositories::{CompletionRepo, ResourceViewRepo};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::engine::aggregator::{self, CascadeRecalc};
use crate::engine::tree;
use crate::engine::unlock::{self, AdvanceOutcome};
use crate::error::AppResult;

/// Request body for `POST .../sections/{section_id}/complete`.
#[derive(Debug, Default, Deserialize)]
pub struct CompleteSectionRequest {
    /// Advisory only. Re-derived from the tree.
    pub is_last_section: Option<bool>,
}

/// Request body for `POST .../mcq-completions`.
#[derive(Debug, Deserialize)]
pub struct McqCompletionRequest {
    pub attempts: i32,
}

/// Everything a section completion changed.
#[derive(Debug, Clone, Serialize)]
pub struct SectionCompletion {
    pub completion: CompletedSection,
    pub progress: CascadeRecalc,
    /// `None` when the section was completed while still locked.
    pub unlock: Option<AdvanceOutcome>,
}

/// Everything a resource view event changed.
#[derive(Debug, Clone, Serialize)]
pub struct ViewOutcome {
    pub view: ResourceView,
    pub section_progress: ProgressSnapshot,
    pub progress: CascadeRecalc,
    /// Present when this view brought the section to 100 %.
    pub section_completion: Option<SectionCompletion>,
}

/// MarkSectionComplete and everything downstream of it.
///
/// The section must be active, in an active unit, in the active
/// `course_id`; otherwise `NotFound` is returned and no ledger row is
/// written.
pub async fn complete_section(
    pool: &PgPool,
    student_id: DbId,
    course_id: DbId,
    section_id: DbId,
    is_last_hint: Option<bool>,
) -> AppResult<SectionCompletion> {
    let (section, unit) = tree::active_section_in(pool, course_id, section_id).await?;
    complete_loaded_section(pool, student_id, &section, &unit, is_last_hint).await
}

async fn complete_loaded_section(
    pool: &PgPool,
    student_id: DbId,
    section: &Section,
    unit: &Unit,
    is_last_hint: Option<bool>,
) -> AppResult<SectionCompletion> {
    let completion = CompletionRepo::mark_section_complete(
        pool,
        student_id,
        section.course_id,
        unit.id,
        section.id,
    )
    .await?;
    tracing::info!(
        student_id,
        course_id = section.course_id,
        unit_id = unit.id,
        section_id = section.id,
        "Section marked complete",
    );

    let progress = aggregator::recalculate_and_save_unit_progress(
        pool,
        student_id,
        section.course_id,
        unit.id,
        ProgressSource::Ledger,
    )
    .await?;

    let unlock = unlock::apply_forward_rule(pool, student_id, section, unit, is_last_hint).await?;

    Ok(SectionCompletion {
        completion,
        progress,
        unlock,
    })
}

/// Resource viewed event.
pub async fn record_resource_view(
    pool: &PgPool,
    student_id: DbId,
    resource_id: DbId,
) -> AppResult<ViewOutcome> {
    let resource = tree::active_resource(pool, resource_id).await?;
    let view = ResourceViewRepo::record_view(pool, student_id, &resource).await?;
    tracing::debug!(student_id, resource_id, "Resource viewed");
    after_view(pool, student_id, &resource, view).await
}

/// MCQ completed event. Attempts must be at least 1.
pub async fn record_mcq_completion(
    pool: &PgPool,
    student_id: DbId,
    resource_id: DbId,
    attempts: i32,
) -> AppResult<ViewOutcome> {
    if attempts < 1 {
        return Err(CoreError::Validation(format!(
            "attempts must be >= 1, got {attempts}"
        ))
        .into());
    }
    let resource = tree::active_resource(pool, resource_id).await?;
    let view = ResourceViewRepo::record_mcq_completion(pool, student_id, &resource, attempts).await?;
    tracing::debug!(student_id, resource_id, attempts, "MCQ completed");
    after_view(pool, student_id, &resource, view).await
}

/// Shared tail of both view events: resource-view progress, then the
/// section completion path once every resource in the section is viewed.
async fn after_view(
    pool: &PgPool,
    student_id: DbId,
    resource: &Resource,
    view: ResourceView,
) -> AppResult<ViewOutcome> {
    let progress = aggregator::recalculate_and_save_unit_progress(
        pool,
        student_id,
        resource.course_id,
        resource.unit_id,
        ProgressSource::ResourceView,
    )
    .await?;

    let section_progress =
        aggregator::section_view_snapshot(pool, student_id, resource.section_id).await?;

    let section_completion = if section_progress.is_complete() {
        let (section, unit) =
            tree::active_section_in(pool, resource.course_id, resource.section_id).await?;
        Some(complete_loaded_section(pool, student_id, &section, &unit, None).await?)
    } else {
        None
    };

    Ok(ViewOutcome {
        view,
        section_progress,
        progress,
        section_completion,
    })
}
