//! Completion ledger models.

use coursepath_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `completed_sections` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CompletedSection {
    pub id: DbId,
    pub student_id: DbId,
    pub course_id: DbId,
    pub unit_id: DbId,
    pub section_id: DbId,
    pub status: StatusId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `completed_units` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CompletedUnit {
    pub id: DbId,
    pub student_id: DbId,
    pub course_id: DbId,
    pub unit_id: DbId,
    pub status: StatusId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}
