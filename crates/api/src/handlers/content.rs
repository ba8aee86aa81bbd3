//! Handlers for the content tree's structural mutations and counter reads.
//!
//! Writes go through [`ContentRepo`], which runs each mutation and its
//! counter deltas in one transaction. Errors from those writes are
//! classified with [`AppError::from_structural`].

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use coursepath_core::content::{
    validate_bulk_size, validate_name, validate_number, NodeKind, ResourceKind,
};
use coursepath_core::error::CoreError;
use coursepath_core::types::DbId;
use coursepath_db::models::content::{BulkCreateResources, CreateCourse, CreateNode, NewResource};
use coursepath_db::models::stats::ContentStats;
use coursepath_db::repositories::{ContentRepo, StatsRepo};

use crate::error::{AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

/// POST /api/v1/courses
pub async fn create_course(
    State(state): State<AppState>,
    Json(input): Json<CreateCourse>,
) -> AppResult<impl IntoResponse> {
    validate_name(&input.name)?;
    let course = ContentRepo::create_course(&state.pool, input.name.trim())
        .await
        .map_err(AppError::from_structural)?;

    tracing::info!(course_id = course.id, "Course created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: course })))
}

/// POST /api/v1/courses/{course_id}/units
///
/// A taken `number` shifts that unit and every later one up by one.
pub async fn create_unit(
    State(state): State<AppState>,
    Path(course_id): Path<DbId>,
    Json(input): Json<CreateNode>,
) -> AppResult<impl IntoResponse> {
    validate_node(&input)?;
    let unit = ContentRepo::create_unit(&state.pool, course_id, &input)
        .await
        .map_err(AppError::from_structural)?
        .ok_or(CoreError::NotFound {
            entity: "Course",
            id: course_id,
        })?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: unit })))
}

/// POST /api/v1/units/{unit_id}/sections
pub async fn create_section(
    State(state): State<AppState>,
    Path(unit_id): Path<DbId>,
    Json(input): Json<CreateNode>,
) -> AppResult<impl IntoResponse> {
    validate_node(&input)?;
    let section = ContentRepo::create_section(&state.pool, unit_id, &input)
        .await
        .map_err(AppError::from_structural)?
        .ok_or(CoreError::NotFound {
            entity: "Unit",
            id: unit_id,
        })?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: section })))
}

/// POST /api/v1/sections/{section_id}/resources
///
/// Bulk upload. Either every resource is created or none is.
pub async fn upload_resources(
    State(state): State<AppState>,
    Path(section_id): Path<DbId>,
    Json(input): Json<BulkCreateResources>,
) -> AppResult<impl IntoResponse> {
    validate_bulk_size(input.resources.len())?;
    let resources = input
        .resources
        .iter()
        .map(|r| -> Result<NewResource, CoreError> {
            validate_name(&r.name)?;
            if let Some(n) = r.number {
                validate_number(n)?;
            }
            Ok(NewResource {
                name: r.name.clone(),
                kind: ResourceKind::from_str_value(&r.kind)?,
                number: r.number,
            })
        })
        .collect::<Result<Vec<_>, CoreError>>()?;

    let created = ContentRepo::create_resources(&state.pool, section_id, &resources)
        .await
        .map_err(AppError::from_structural)?
        .ok_or(CoreError::NotFound {
            entity: "Section",
            id: section_id,
        })?;

    Ok((StatusCode::CREATED, Json(DataResponse { data: created })))
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

/// DELETE /api/v1/units/{unit_id}
pub async fn delete_unit(
    State(state): State<AppState>,
    Path(unit_id): Path<DbId>,
) -> AppResult<StatusCode> {
    let deleted = ContentRepo::soft_delete_unit(&state.pool, unit_id)
        .await
        .map_err(AppError::from_structural)?;
    deleted_or_not_found(deleted, NodeKind::Unit.entity(), unit_id)
}

/// DELETE /api/v1/sections/{section_id}
pub async fn delete_section(
    State(state): State<AppState>,
    Path(section_id): Path<DbId>,
) -> AppResult<StatusCode> {
    let deleted = ContentRepo::soft_delete_section(&state.pool, section_id)
        .await
        .map_err(AppError::from_structural)?;
    deleted_or_not_found(deleted, NodeKind::Section.entity(), section_id)
}

/// DELETE /api/v1/resources/{resource_id}
pub async fn delete_resource(
    State(state): State<AppState>,
    Path(resource_id): Path<DbId>,
) -> AppResult<StatusCode> {
    let deleted = ContentRepo::soft_delete_resource(&state.pool, resource_id)
        .await
        .map_err(AppError::from_structural)?;
    deleted_or_not_found(deleted, "Resource", resource_id)
}

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// GET /api/v1/courses/{course_id}/stats
pub async fn course_stats(
    State(state): State<AppState>,
    Path(course_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let found = ContentRepo::find_course(&state.pool, course_id).await?.is_some();
    stats_response(&state, NodeKind::Course, course_id, found).await
}

/// GET /api/v1/units/{unit_id}/stats
pub async fn unit_stats(
    State(state): State<AppState>,
    Path(unit_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let found = ContentRepo::find_unit(&state.pool, unit_id).await?.is_some();
    stats_response(&state, NodeKind::Unit, unit_id, found).await
}

/// GET /api/v1/sections/{section_id}/stats
pub async fn section_stats(
    State(state): State<AppState>,
    Path(section_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    let found = ContentRepo::find_section(&state.pool, section_id).await?.is_some();
    stats_response(&state, NodeKind::Section, section_id, found).await
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn validate_node(input: &CreateNode) -> Result<(), CoreError> {
    validate_name(&input.name)?;
    if let Some(n) = input.number {
        validate_number(n)?;
    }
    Ok(())
}

fn deleted_or_not_found(deleted: bool, entity: &'static str, id: DbId) -> AppResult<StatusCode> {
    if deleted {
        tracing::info!(entity, id, "Soft-deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(CoreError::NotFound { entity, id }.into())
    }
}

async fn stats_response(
    state: &AppState,
    kind: NodeKind,
    node_id: DbId,
    found: bool,
) -> AppResult<Json<DataResponse<ContentStats>>> {
    if !found {
        return Err(CoreError::NotFound {
            entity: kind.entity(),
            id: node_id,
        }
        .into());
    }
    let stats = StatsRepo::find_or_zero(&state.pool, kind, node_id).await?;
    Ok(Json(DataResponse { data: stats }))
}
