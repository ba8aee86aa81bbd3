//! Handlers for the unlock gate.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use coursepath_core::types::DbId;

use crate::engine::unlock::{self, AdvanceRequest};
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/students/{student_id}/courses/{course_id}/unlocks
///
/// Creates the default unlock state (first unit, first section) on first
/// touch.
pub async fn get_unlock_status(
    State(state): State<AppState>,
    Path((student_id, course_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let status = unlock::get_unlock_status(&state.pool, student_id, course_id).await?;
    Ok(Json(DataResponse { data: status }))
}

/// POST /api/v1/students/{student_id}/courses/{course_id}/unlocks/advance
///
/// 409 if the section is not complete yet.
pub async fn advance_unlock(
    State(state): State<AppState>,
    Path((student_id, course_id)): Path<(DbId, DbId)>,
    Json(input): Json<AdvanceRequest>,
) -> AppResult<impl IntoResponse> {
    let outcome = unlock::advance_unlock(&state.pool, student_id, course_id, &input).await?;
    Ok(Json(DataResponse { data: outcome }))
}
