//! Content tree vocabulary shared by the counter, ledger and unlock layers.
//!
//! The tree itself (Course -> Unit -> Section -> Resource) lives in the
//! database; this module only names the node kinds, resource kinds and
//! counter fields, and validates structural inputs before they reach a
//! transaction.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::SlotNumber;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const NODE_COURSE: &str = "course";
pub const NODE_UNIT: &str = "unit";
pub const NODE_SECTION: &str = "section";

pub const RESOURCE_CONTENT: &str = "content";
pub const RESOURCE_MCQ: &str = "mcq";
pub const RESOURCE_ASSESSMENT: &str = "assessment";

/// All valid resource kind strings.
pub const VALID_RESOURCE_KINDS: &[&str] = &[RESOURCE_CONTENT, RESOURCE_MCQ, RESOURCE_ASSESSMENT];

/// Maximum length for a course/unit/section/resource name.
pub const MAX_NAME_LENGTH: usize = 255;

/// Maximum number of resources accepted by a single bulk upload.
pub const MAX_BULK_RESOURCES: usize = 200;

// ---------------------------------------------------------------------------
// Node kinds
// ---------------------------------------------------------------------------

/// A tree level that owns a stats counter row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Course,
    Unit,
    Section,
}

impl NodeKind {
    /// Convert to the database string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Course => NODE_COURSE,
            Self::Unit => NODE_UNIT,
            Self::Section => NODE_SECTION,
        }
    }

    /// Entity label used in `NotFound` errors.
    pub fn entity(&self) -> &'static str {
        match self {
            Self::Course => "Course",
            Self::Unit => "Unit",
            Self::Section => "Section",
        }
    }
}

/// Kind of a leaf resource. Each kind feeds its own counter column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Content,
    Mcq,
    Assessment,
}

impl ResourceKind {
    /// Convert from a database string value.
    pub fn from_str_value(s: &str) -> Result<Self, CoreError> {
        match s {
            RESOURCE_CONTENT => Ok(Self::Content),
            RESOURCE_MCQ => Ok(Self::Mcq),
            RESOURCE_ASSESSMENT => Ok(Self::Assessment),
            _ => Err(CoreError::Validation(format!(
                "Invalid resource kind '{s}'. Must be one of: {}",
                VALID_RESOURCE_KINDS.join(", ")
            ))),
        }
    }

    /// Convert to the database string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Content => RESOURCE_CONTENT,
            Self::Mcq => RESOURCE_MCQ,
            Self::Assessment => RESOURCE_ASSESSMENT,
        }
    }

    /// The counter field incremented alongside `total_resources`, if any.
    pub fn typed_field(&self) -> Option<StatsField> {
        match self {
            Self::Content => None,
            Self::Mcq => Some(StatsField::TotalMcqs),
            Self::Assessment => Some(StatsField::TotalAssessments),
        }
    }
}

// ---------------------------------------------------------------------------
// Counter fields
// ---------------------------------------------------------------------------

/// One typed count on a `content_stats` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsField {
    TotalUnits,
    TotalSections,
    TotalResources,
    TotalMcqs,
    TotalAssessments,
}

impl StatsField {
    /// Column name in `content_stats`. Only ever interpolated from this
    /// closed set, never from user input.
    pub fn column(&self) -> &'static str {
        match self {
            Self::TotalUnits => "total_units",
            Self::TotalSections => "total_sections",
            Self::TotalResources => "total_resources",
            Self::TotalMcqs => "total_mcqs",
            Self::TotalAssessments => "total_assessments",
        }
    }
}

/// Counter deltas produced by adding or removing one resource of `kind`.
pub fn resource_deltas(kind: ResourceKind, delta: i32) -> Vec<(StatsField, i32)> {
    let mut out = vec![(StatsField::TotalResources, delta)];
    if let Some(field) = kind.typed_field() {
        out.push((field, delta));
    }
    out
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a node name: non-empty after trimming and within length limits.
pub fn validate_name(name: &str) -> Result<(), CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("name must not be empty".to_string()));
    }
    if trimmed.len() > MAX_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "name must be at most {MAX_NAME_LENGTH} characters, got {}",
            trimmed.len()
        )));
    }
    Ok(())
}

/// Validate a sibling ordering number.
pub fn validate_number(number: SlotNumber) -> Result<(), CoreError> {
    if number < 1 {
        return Err(CoreError::Validation(format!(
            "number must be >= 1, got {number}"
        )));
    }
    Ok(())
}

/// Validate the size of a bulk resource upload.
pub fn validate_bulk_size(count: usize) -> Result<(), CoreError> {
    if count == 0 {
        return Err(CoreError::Validation(
            "at least one resource is required".to_string(),
        ));
    }
    if count > MAX_BULK_RESOURCES {
        return Err(CoreError::Validation(format!(
            "at most {MAX_BULK_RESOURCES} resources per upload, got {count}"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
