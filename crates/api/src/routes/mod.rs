pub mod admin;
pub mod content;
pub mod health;
pub mod students;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /courses                                   create course
/// /courses/{id}/units                        create unit
/// /courses/{id}/stats                        course counters
///
/// /units/{id}                                soft delete
/// /units/{id}/sections                       create section
/// /units/{id}/stats                          unit counters
///
/// /sections/{id}                             soft delete
/// /sections/{id}/resources                   bulk resource upload
/// /sections/{id}/stats                       section counters
///
/// /resources/{id}                            soft delete
///
/// /students/{sid}/courses/{cid}/unlocks      unlock status, advance
/// /students/{sid}/courses/{cid}/progress     course and unit progress
/// /students/{sid}/courses/{cid}/sections/{id}/complete
/// /students/{sid}/courses/{cid}/units/{id}/completed-sections
/// /students/{sid}/resources/{id}/views       resource viewed event
/// /students/{sid}/resources/{id}/mcq-completions
///
/// /admin/recalculate                         repair every course
/// /admin/recalculate/courses/{id}            repair one course
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Content tree and counters.
        .nest("/courses", content::course_router())
        .nest("/units", content::unit_router())
        .nest("/sections", content::section_router())
        .nest("/resources", content::resource_router())
        // Per-student progress, completion and unlocks.
        .nest("/students", students::router())
        // Repair job triggers.
        .nest("/admin", admin::router())
}
