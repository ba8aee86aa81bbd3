//! Lookups that resolve ids to ACTIVE content under a known parent.
//!
//! Every engine entry point starts here so an inactive or mismatched node
//! is rejected as `NotFound` before anything is written.

use coursepath_core::error::CoreError;
use coursepath_core::types::DbId;
use coursepath_db::models::content::{Course, Resource, Section, Unit};
use coursepath_db::repositories::ContentRepo;
use sqlx::PgPool;

use crate::error::AppResult;

/// Load an active course.
pub async fn active_course(pool: &PgPool, course_id: DbId) -> AppResult<Course> {
    ContentRepo::find_course(pool, course_id)
        .await?
        .ok_or_else(|| {
            CoreError::NotFound {
                entity: "Course",
                id: course_id,
            }
            .into()
        })
}

/// Load an active unit that belongs to the active `course_id`.
pub async fn active_unit_in(pool: &PgPool, course_id: DbId, unit_id: DbId) -> AppResult<Unit> {
    active_course(pool, course_id).await?;
    match ContentRepo::find_unit(pool, unit_id).await? {
        Some(unit) if unit.course_id == course_id => Ok(unit),
        _ => Err(CoreError::NotFound {
            entity: "Unit",
            id: unit_id,
        }
        .into()),
    }
}

/// Load an active section together with its active unit, both under the
/// active `course_id`.
pub async fn active_section_in(
    pool: &PgPool,
    course_id: DbId,
    section_id: DbId,
) -> AppResult<(Section, Unit)> {
    let not_found = || CoreError::NotFound {
        entity: "Section",
        id: section_id,
    };

    let section = ContentRepo::find_section(pool, section_id)
        .await?
        .filter(|s| s.course_id == course_id)
        .ok_or_else(not_found)?;
    let unit = ContentRepo::find_unit(pool, section.unit_id)
        .await?
        .filter(|u| u.course_id == course_id)
        .ok_or_else(not_found)?;
    active_course(pool, course_id).await?;

    Ok((section, unit))
}

/// Load an active resource under active ancestors.
pub async fn active_resource(pool: &PgPool, resource_id: DbId) -> AppResult<Resource> {
    let resource = ContentRepo::find_resource(pool, resource_id)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "Resource",
            id: resource_id,
        })?;
    active_course(pool, resource.course_id).await?;
    Ok(resource)
}
