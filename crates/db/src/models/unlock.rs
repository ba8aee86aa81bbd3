//! Unlock set models.

use coursepath_core::types::{DbId, Timestamp};
use coursepath_core::unlock::UnlockSet;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `course_unlocks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CourseUnlock {
    pub id: DbId,
    pub student_id: DbId,
    pub course_id: DbId,
    pub unlocked_unit_ids: Vec<DbId>,
    pub unlocked_section_ids: Vec<DbId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl CourseUnlock {
    pub fn to_set(&self) -> UnlockSet {
        UnlockSet::new(
            self.unlocked_unit_ids.clone(),
            self.unlocked_section_ids.clone(),
        )
    }
}
