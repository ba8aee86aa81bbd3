//! Route definitions for the content tree's structural surface.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::content;
use crate::state::AppState;

/// Routes mounted at `/courses`.
///
/// ```text
/// POST   /                  -> create_course
/// POST   /{id}/units        -> create_unit
/// GET    /{id}/stats        -> course_stats
/// ```
pub fn course_router() -> Router<AppState> {
    Router::new()
        .route("/", post(content::create_course))
        .route("/{id}/units", post(content::create_unit))
        .route("/{id}/stats", get(content::course_stats))
}

/// Routes mounted at `/units`.
///
/// ```text
/// DELETE /{id}              -> delete_unit
/// POST   /{id}/sections     -> create_section
/// GET    /{id}/stats        -> unit_stats
/// ```
pub fn unit_router() -> Router<AppState> {
    Router::new()
        .route("/{id}", delete(content::delete_unit))
        .route("/{id}/sections", post(content::create_section))
        .route("/{id}/stats", get(content::unit_stats))
}

/// Routes mounted at `/sections`.
///
/// ```text
/// DELETE /{id}              -> delete_section
/// POST   /{id}/resources    -> upload_resources
/// GET    /{id}/stats        -> section_stats
/// ```
pub fn section_router() -> Router<AppState> {
    Router::new()
        .route("/{id}", delete(content::delete_section))
        .route("/{id}/resources", post(content::upload_resources))
        .route("/{id}/stats", get(content::section_stats))
}

/// Routes mounted at `/resources`.
pub fn resource_router() -> Router<AppState> {
    Router::new().route("/{id}", delete(content::delete_resource))
}
