//! Denormalized counter models.

use coursepath_core::content::{NodeKind, StatsField};
use coursepath_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `content_stats` table.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize)]
pub struct ContentStats {
    pub node_kind: String,
    pub node_id: DbId,
    pub total_units: i32,
    pub total_sections: i32,
    pub total_resources: i32,
    pub total_mcqs: i32,
    pub total_assessments: i32,
    pub updated_at: Timestamp,
}

impl ContentStats {
    /// All-zero counters for a node without a stored row.
    pub fn zero(kind: NodeKind, node_id: DbId) -> Self {
        Self {
            node_kind: kind.as_str().to_string(),
            node_id,
            total_units: 0,
            total_sections: 0,
            total_resources: 0,
            total_mcqs: 0,
            total_assessments: 0,
            updated_at: chrono::Utc::now(),
        }
    }

    /// Read one typed count.
    pub fn get(&self, field: StatsField) -> i32 {
        match field {
            StatsField::TotalUnits => self.total_units,
            StatsField::TotalSections => self.total_sections,
            StatsField::TotalResources => self.total_resources,
            StatsField::TotalMcqs => self.total_mcqs,
            StatsField::TotalAssessments => self.total_assessments,
        }
    }

    /// The counts alone, for comparisons that ignore `updated_at`.
    pub fn counts(&self) -> [i32; 5] {
        [
            self.total_units,
            self.total_sections,
            self.total_resources,
            self.total_mcqs,
            self.total_assessments,
        ]
    }
}

/// Active-descendant counts for one subtree, captured before a soft delete.
#[derive(Debug, Clone, Copy, Default, FromRow)]
pub struct SubtreeCounts {
    pub sections: i64,
    pub resources: i64,
    pub mcqs: i64,
    pub assessments: i64,
}

impl SubtreeCounts {
    /// Negative deltas removing this subtree from an ancestor's counters.
    pub fn removal_deltas(&self) -> Vec<(StatsField, i32)> {
        let neg = |v: i64| -(v.clamp(0, i64::from(i32::MAX)) as i32);
        vec![
            (StatsField::TotalSections, neg(self.sections)),
            (StatsField::TotalResources, neg(self.resources)),
            (StatsField::TotalMcqs, neg(self.mcqs)),
            (StatsField::TotalAssessments, neg(self.assessments)),
        ]
    }
}
