//! Percentage derivation shared by every progress source.
//!
//! A unit's progress is a ratio of completed leaf work to the unit's
//! counter total. A course's progress is the ratio of fully complete units
//! (exactly 100) to the course's active unit count; partial units never
//! contribute upward. Both levels go through [`derive_snapshot`], whatever
//! backing store produced the numerator.

use serde::{Deserialize, Serialize};

use crate::content::StatsField;
use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const SOURCE_LEDGER: &str = "ledger";
pub const SOURCE_RESOURCE_VIEW: &str = "resource_view";

/// All valid progress source strings.
pub const VALID_SOURCES: &[&str] = &[SOURCE_LEDGER, SOURCE_RESOURCE_VIEW];

/// Percentage at which a unit counts as complete.
pub const COMPLETE_PCT: i16 = 100;

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Where the numerator of a progress ratio comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressSource {
    /// Completed-section ledger rows over the unit's section count.
    #[default]
    Ledger,
    /// Completed resource views over the unit's resource count.
    ResourceView,
}

impl ProgressSource {
    pub const ALL: [ProgressSource; 2] = [ProgressSource::Ledger, ProgressSource::ResourceView];

    /// Convert from a database / query string value.
    pub fn from_str_value(s: &str) -> Result<Self, CoreError> {
        match s {
            SOURCE_LEDGER => Ok(Self::Ledger),
            SOURCE_RESOURCE_VIEW => Ok(Self::ResourceView),
            _ => Err(CoreError::Validation(format!(
                "Invalid progress source '{s}'. Must be one of: {}",
                VALID_SOURCES.join(", ")
            ))),
        }
    }

    /// Convert to the database string value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ledger => SOURCE_LEDGER,
            Self::ResourceView => SOURCE_RESOURCE_VIEW,
        }
    }

    /// Counter on the unit's stats row used as the unit-level denominator.
    pub fn unit_denominator(&self) -> StatsField {
        match self {
            Self::Ledger => StatsField::TotalSections,
            Self::ResourceView => StatsField::TotalResources,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// A derived progress value plus the counts it was computed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub percentage: i16,
    pub completed_count: i32,
    pub total_count: i32,
}

impl ProgressSnapshot {
    /// Whether this snapshot counts as fully complete.
    pub fn is_complete(&self) -> bool {
        self.percentage >= COMPLETE_PCT
    }
}

/// Compute a rounded percentage, clamped to `[0, 100]`.
///
/// Returns 0 when `total` is 0 or negative (a stale counter is never a
/// division error).
pub fn compute_percentage(completed: i64, total: i64) -> i16 {
    if total <= 0 || completed <= 0 {
        return 0;
    }
    let pct = (completed as f64 / total as f64 * 100.0).round();
    pct.clamp(0.0, f64::from(COMPLETE_PCT)) as i16
}

/// Build a snapshot from raw counts.
pub fn derive_snapshot(completed: i64, total: i64) -> ProgressSnapshot {
    ProgressSnapshot {
        percentage: compute_percentage(completed, total),
        completed_count: saturate(completed),
        total_count: saturate(total),
    }
}

/// Derive course progress from the stored percentages of its active units.
///
/// `total_units` is the course counter; it is raised to the number of unit
/// percentages supplied when a stale counter under-reports, so the ratio
/// never exceeds 100 through drift.
pub fn derive_course_snapshot(unit_percentages: &[i16], total_units: i64) -> ProgressSnapshot {
    let completed = unit_percentages
        .iter()
        .filter(|pct| **pct >= COMPLETE_PCT)
        .count() as i64;
    let total = total_units.max(unit_percentages.len() as i64);
    derive_snapshot(completed, total)
}

fn saturate(value: i64) -> i32 {
    value.clamp(0, i64::from(i32::MAX)) as i32
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
