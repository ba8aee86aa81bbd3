//! Handlers for the `/admin` recalculation endpoints.
//!
//! Each request runs the repair synchronously with its own token, so the
//! run is never interrupted part-way by another caller.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use coursepath_core::types::DbId;
use tokio_util::sync::CancellationToken;

use crate::engine::{repair, tree};
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/admin/recalculate
pub async fn recalculate_all(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let report = repair::recalculate_all(&state.pool, &CancellationToken::new()).await?;
    Ok(Json(DataResponse { data: report }))
}

/// POST /api/v1/admin/recalculate/courses/{course_id}
pub async fn recalculate_course(
    State(state): State<AppState>,
    Path(course_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    tree::active_course(&state.pool, course_id).await?;
    let report =
        repair::recalculate_course(&state.pool, course_id, &CancellationToken::new()).await?;
    tracing::info!(course_id, "Course recalculated on request");
    Ok(Json(DataResponse { data: report }))
}
