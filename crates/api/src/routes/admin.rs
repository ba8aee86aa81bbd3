//! Route definitions for administrative recalculation.

use axum::routing::post;
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// ```text
/// POST   /recalculate                       -> recalculate_all
/// POST   /recalculate/courses/{course_id}   -> recalculate_course
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/recalculate", post(admin::recalculate_all))
        .route(
            "/recalculate/courses/{course_id}",
            post(admin::recalculate_course),
        )
}
