//! Derived progress snapshot models.

use coursepath_core::types::{DbId, SlotNumber, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `unit_progress` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UnitProgress {
    pub id: DbId,
    pub student_id: DbId,
    pub course_id: DbId,
    pub unit_id: DbId,
    pub source: String,
    pub percentage: i16,
    pub completed_count: i32,
    pub total_count: i32,
    pub updated_at: Timestamp,
}

/// A row from the `course_progress` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CourseProgress {
    pub id: DbId,
    pub student_id: DbId,
    pub course_id: DbId,
    pub source: String,
    pub percentage: i16,
    pub completed_count: i32,
    pub total_count: i32,
    pub updated_at: Timestamp,
}

/// One active unit joined with the student's stored progress for it.
///
/// Units without a stored row report zero completion against the unit's
/// current counter.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UnitProgressView {
    pub unit_id: DbId,
    pub name: String,
    pub number: SlotNumber,
    pub percentage: i16,
    pub completed_count: i32,
    pub total_count: i32,
}
