//! Per-resource viewing events.

use coursepath_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `resource_views` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ResourceView {
    pub id: DbId,
    pub student_id: DbId,
    pub course_id: DbId,
    pub unit_id: DbId,
    pub section_id: DbId,
    pub resource_id: DbId,
    pub mcq_attempts: i32,
    pub completed: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
