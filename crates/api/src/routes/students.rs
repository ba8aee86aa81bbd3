//! Route definitions for per-student progress, completion and unlocks.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{progress, resources, unlocks};
use crate::state::AppState;

/// Routes mounted at `/students`.
///
/// ```text
/// GET    /{sid}/courses/{cid}/unlocks                     -> get_unlock_status
/// POST   /{sid}/courses/{cid}/unlocks/advance             -> advance_unlock
/// GET    /{sid}/courses/{cid}/progress                    -> get_course_progress
/// GET    /{sid}/courses/{cid}/progress/units              -> get_unit_progress
/// POST   /{sid}/courses/{cid}/sections/{id}/complete      -> mark_section_complete
/// GET    /{sid}/courses/{cid}/units/{id}/completed-sections -> count_completed_sections
/// POST   /{sid}/resources/{id}/views                      -> record_view
/// POST   /{sid}/resources/{id}/mcq-completions            -> record_mcq_completion
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{student_id}/courses/{course_id}/unlocks",
            get(unlocks::get_unlock_status),
        )
        .route(
            "/{student_id}/courses/{course_id}/unlocks/advance",
            post(unlocks::advance_unlock),
        )
        .route(
            "/{student_id}/courses/{course_id}/progress",
            get(progress::get_course_progress),
        )
        .route(
            "/{student_id}/courses/{course_id}/progress/units",
            get(progress::get_unit_progress),
        )
        .route(
            "/{student_id}/courses/{course_id}/sections/{section_id}/complete",
            post(progress::mark_section_complete),
        )
        .route(
            "/{student_id}/courses/{course_id}/units/{unit_id}/completed-sections",
            get(progress::count_completed_sections),
        )
        .route(
            "/{student_id}/resources/{resource_id}/views",
            post(resources::record_view),
        )
        .route(
            "/{student_id}/resources/{resource_id}/mcq-completions",
            post(resources::record_mcq_completion),
        )
}
