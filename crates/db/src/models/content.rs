//! Content tree models and DTOs.

use coursepath_core::content::ResourceKind;
use coursepath_core::types::{DbId, SlotNumber, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::status::StatusId;

/// A row from the `courses` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Course {
    pub id: DbId,
    pub name: String,
    pub status_id: StatusId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `units` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Unit {
    pub id: DbId,
    pub course_id: DbId,
    pub name: String,
    pub number: SlotNumber,
    pub status_id: StatusId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `sections` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Section {
    pub id: DbId,
    pub course_id: DbId,
    pub unit_id: DbId,
    pub name: String,
    pub number: SlotNumber,
    pub status_id: StatusId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `resources` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Resource {
    pub id: DbId,
    pub course_id: DbId,
    pub unit_id: DbId,
    pub section_id: DbId,
    pub name: String,
    pub kind: String,
    pub number: SlotNumber,
    pub status_id: StatusId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a course.
#[derive(Debug, Deserialize)]
pub struct CreateCourse {
    pub name: String,
}

/// DTO for creating a unit or section.
///
/// `number` of `None` appends after the last active sibling; a taken number
/// shifts that sibling and every later one up by one.
#[derive(Debug, Deserialize)]
pub struct CreateNode {
    pub name: String,
    pub number: Option<SlotNumber>,
}

/// One resource in a bulk upload.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateResource {
    pub name: String,
    pub kind: String,
    pub number: Option<SlotNumber>,
}

/// DTO for uploading several resources into one section atomically.
#[derive(Debug, Deserialize)]
pub struct BulkCreateResources {
    pub resources: Vec<CreateResource>,
}

/// A validated resource ready for insertion.
#[derive(Debug, Clone)]
pub struct NewResource {
    pub name: String,
    pub kind: ResourceKind,
    pub number: Option<SlotNumber>,
}
