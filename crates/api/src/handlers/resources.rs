//! Handlers for resource viewing events.
//!
//! These feed the resource-view progress source; a section whose resources
//! have all been viewed is completed through the same pipeline as an
//! explicit completion.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use coursepath_core::types::DbId;

use crate::engine::pipeline::{self, McqCompletionRequest};
use crate::error::AppResult;
use crate::response::DataResponse;
use crate::state::AppState;

/// POST /api/v1/students/{student_id}/resources/{resource_id}/views
pub async fn record_view(
    State(state): State<AppState>,
    Path((student_id, resource_id)): Path<(DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    let outcome = pipeline::record_resource_view(&state.pool, student_id, resource_id).await?;
    Ok(Json(DataResponse { data: outcome }))
}

/// POST /api/v1/students/{student_id}/resources/{resource_id}/mcq-completions
pub async fn record_mcq_completion(
    State(state): State<AppState>,
    Path((student_id, resource_id)): Path<(DbId, DbId)>,
    Json(input): Json<McqCompletionRequest>,
) -> AppResult<impl IntoResponse> {
    let outcome =
        pipeline::record_mcq_completion(&state.pool, student_id, resource_id, input.attempts)
            .await?;
    Ok(Json(DataResponse { data: outcome }))
}
