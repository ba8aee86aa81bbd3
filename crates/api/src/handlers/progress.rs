//! Handlers for progress reads and section completion.

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use coursepath_core::content::{NodeKind, StatsField};
use coursepath_core::progress::ProgressSource;
use coursepath_core::types::DbId;
use coursepath_db::models::progress::UnitProgressView;
use coursepath_db::repositories::{CompletionRepo, ProgressRepo, StatsRepo};
use serde::Serialize;

use crate::engine::pipeline::{self, CompleteSectionRequest};
use crate::engine::{aggregator, tree};
use crate::error::AppResult;
use crate::query::SourceParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Response for the per-unit progress listing.
#[derive(Debug, Serialize)]
pub struct UnitProgressList {
    pub source: ProgressSource,
    pub units: Vec<UnitProgressView>,
}

/// Response for `CountCompletedSections`.
#[derive(Debug, Serialize)]
pub struct CompletedSectionCount {
    pub unit_id: DbId,
    pub completed_sections: i64,
    pub total_sections: i32,
}

/// GET /api/v1/students/{student_id}/courses/{course_id}/progress/units?source=
///
/// One entry per active unit in order; units without stored progress read
/// as 0 %.
pub async fn get_unit_progress(
    State(state): State<AppState>,
    Path((student_id, course_id)): Path<(DbId, DbId)>,
    Query(params): Query<SourceParams>,
) -> AppResult<impl IntoResponse> {
    let source = params.resolve()?;
    tree::active_course(&state.pool, course_id).await?;

    let units = ProgressRepo::list_unit_views(&state.pool, student_id, course_id, source).await?;
    Ok(Json(DataResponse {
        data: UnitProgressList { source, units },
    }))
}

/// GET /api/v1/students/{student_id}/courses/{course_id}/progress?source=
pub async fn get_course_progress(
    State(state): State<AppState>,
    Path((student_id, course_id)): Path<(DbId, DbId)>,
    Query(params): Query<SourceParams>,
) -> AppResult<impl IntoResponse> {
    let source = params.resolve()?;
    tree::active_course(&state.pool, course_id).await?;

    let progress =
        aggregator::course_progress_or_derive(&state.pool, student_id, course_id, source).await?;
    Ok(Json(DataResponse { data: progress }))
}

/// POST /api/v1/students/{student_id}/courses/{course_id}/sections/{section_id}/complete
///
/// Records the completion, recalculates unit and course progress, and
/// applies the unlock transition. Repeating the call changes nothing. The
/// body is optional; without one there is no last-section hint.
pub async fn mark_section_complete(
    State(state): State<AppState>,
    Path((student_id, course_id, section_id)): Path<(DbId, DbId, DbId)>,
    input: Option<Json<CompleteSectionRequest>>,
) -> AppResult<impl IntoResponse> {
    let is_last_hint = input.and_then(|Json(body)| body.is_last_section);
    let outcome =
        pipeline::complete_section(&state.pool, student_id, course_id, section_id, is_last_hint)
            .await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// GET /api/v1/students/{student_id}/courses/{course_id}/units/{unit_id}/completed-sections
pub async fn count_completed_sections(
    State(state): State<AppState>,
    Path((student_id, course_id, unit_id)): Path<(DbId, DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    tree::active_unit_in(&state.pool, course_id, unit_id).await?;

    let completed =
        CompletionRepo::count_completed_sections(&state.pool, student_id, course_id, unit_id)
            .await?;
    let stats = StatsRepo::find_or_zero(&state.pool, NodeKind::Unit, unit_id).await?;

    Ok(Json(DataResponse {
        data: CompletedSectionCount {
            unit_id,
            completed_sections: completed,
            total_sections: stats.get(StatsField::TotalSections),
        },
    }))
}
