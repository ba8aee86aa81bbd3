//! Unlock gate.
//!
//! Owns the per-(student, course) unlock row. The row is created lazily on
//! first touch with the course's first unit and first section; afterwards it
//! only grows, one guarded append per newly unlocked id.

use coursepath_core::error::CoreError;
use coursepath_core::progress::COMPLETE_PCT;
use coursepath_core::slots::SlotArena;
use coursepath_core::types::DbId;
use coursepath_core::unlock::{
    additions_for, furthest_unlocked, initial_unlocks, missing_entry_sections, plan_transition,
    verify_last_hint, Transition, UnlockAdditions,
};
use coursepath_db::models::content::{Section, Unit};
use coursepath_db::models::unlock::CourseUnlock;
use coursepath_db::repositories::{CompletionRepo, ContentRepo, UnlockRepo};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::engine::{aggregator, tree};
use crate::error::AppResult;

/// The furthest (unit, section) pair a student can reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Frontier {
    pub unit_id: DbId,
    pub section_id: Option<DbId>,
}

/// Unlock state as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct UnlockStatus {
    pub student_id: DbId,
    pub course_id: DbId,
    pub unlocked_unit_ids: Vec<DbId>,
    pub unlocked_section_ids: Vec<DbId>,
    pub frontier: Option<Frontier>,
}

/// Request body for `POST .../unlocks/advance`.
#[derive(Debug, Deserialize)]
pub struct AdvanceRequest {
    pub unit_id: DbId,
    pub section_id: DbId,
    /// Advisory only. Re-derived from the tree.
    pub is_last_section: Option<bool>,
}

/// Outcome of evaluating the forward rule.
#[derive(Debug, Clone, Serialize)]
pub struct AdvanceOutcome {
    pub transition: Transition,
    /// Ids this call actually appended; empty on a repeat.
    pub added: UnlockAdditions,
    pub status: UnlockStatus,
}

/// Load the unlock row, creating the default one on first touch.
///
/// Every load also repairs dead ends left by content edits: a row with no
/// active unlocked unit is re-seeded from the course's first unit, and every
/// unlocked unit without a reachable section gets its first active section.
/// Both only append, so the sets keep growing.
pub async fn ensure_unlock_row(
    pool: &PgPool,
    student_id: DbId,
    course_id: DbId,
) -> AppResult<CourseUnlock> {
    let row = match UnlockRepo::find(pool, student_id, course_id).await? {
        Some(row) => row,
        None => {
            let initial = initial_for(pool, course_id).await?;
            let row = UnlockRepo::create_or_get(
                pool,
                student_id,
                course_id,
                &initial.units,
                &initial.sections,
            )
            .await?;
            tracing::info!(
                student_id,
                course_id,
                units = ?row.unlocked_unit_ids,
                sections = ?row.unlocked_section_ids,
                "Unlock state initialized",
            );
            row
        }
    };

    let repairs = dead_end_repairs(pool, &row).await?;
    if repairs.is_empty() {
        return Ok(row);
    }
    for unit_id in &repairs.units {
        UnlockRepo::add_unit(pool, student_id, course_id, *unit_id).await?;
    }
    for section_id in &repairs.sections {
        UnlockRepo::add_section(pool, student_id, course_id, *section_id).await?;
    }
    tracing::info!(
        student_id,
        course_id,
        units = ?repairs.units,
        sections = ?repairs.sections,
        "Unlock dead ends repaired",
    );
    UnlockRepo::find(pool, student_id, course_id)
        .await?
        .ok_or_else(|| sqlx::Error::RowNotFound.into())
}

/// Ids a stored row needs so the student is never left without a way in.
async fn dead_end_repairs(pool: &PgPool, row: &CourseUnlock) -> AppResult<UnlockAdditions> {
    let set = row.to_set();
    let units = ContentRepo::unit_arena(pool, row.course_id).await?;

    let mut unlocked_units = Vec::new();
    for unit in units.slots().iter().filter(|u| set.is_unit_unlocked(u.id)) {
        let sections = ContentRepo::section_arena(pool, unit.id).await?;
        unlocked_units.push((unit.id, sections));
    }

    if unlocked_units.is_empty() {
        let first_sections = match units.first() {
            Some(first) => ContentRepo::section_arena(pool, first.id).await?,
            None => SlotArena::default(),
        };
        return Ok(set.missing(&initial_unlocks(&units, &first_sections)));
    }

    Ok(UnlockAdditions {
        units: Vec::new(),
        sections: missing_entry_sections(&set, &unlocked_units),
    })
}

/// First active unit of the course and its first active section.
async fn initial_for(pool: &PgPool, course_id: DbId) -> AppResult<UnlockAdditions> {
    let units = ContentRepo::unit_arena(pool, course_id).await?;
    let first_sections = match units.first() {
        Some(first) => ContentRepo::section_arena(pool, first.id).await?,
        None => SlotArena::default(),
    };
    Ok(initial_unlocks(&units, &first_sections))
}

/// GetUnlockStatus: the student's unlock sets plus the derived frontier.
pub async fn get_unlock_status(
    pool: &PgPool,
    student_id: DbId,
    course_id: DbId,
) -> AppResult<UnlockStatus> {
    tree::active_course(pool, course_id).await?;
    let row = ensure_unlock_row(pool, student_id, course_id).await?;
    build_status(pool, row).await
}

/// AdvanceUnlock: prove the section is complete, then apply the forward rule.
///
/// Fails with `NotFound` if the section or unit is inactive or does not
/// belong to the course, and with `Conflict` if the section is not complete
/// by either progress source or is not unlocked yet.
pub async fn advance_unlock(
    pool: &PgPool,
    student_id: DbId,
    course_id: DbId,
    request: &AdvanceRequest,
) -> AppResult<AdvanceOutcome> {
    let (section, unit) = tree::active_section_in(pool, course_id, request.section_id).await?;
    if unit.id != request.unit_id {
        return Err(CoreError::NotFound {
            entity: "Unit",
            id: request.unit_id,
        }
        .into());
    }

    if !is_proven_complete(pool, student_id, course_id, section.id).await? {
        return Err(CoreError::Conflict(format!(
            "Section {} is not complete for student {student_id}",
            section.id
        ))
        .into());
    }

    apply_forward_rule(pool, student_id, &section, &unit, request.is_last_section)
        .await?
        .ok_or_else(|| {
            CoreError::Conflict(format!(
                "Section {} is not unlocked for student {student_id}",
                section.id
            ))
            .into()
        })
}

/// Apply the forward rule for a section already known to be complete.
///
/// Returns `None` without touching the unlock row when the section itself is
/// still locked.
pub(crate) async fn apply_forward_rule(
    pool: &PgPool,
    student_id: DbId,
    section: &Section,
    unit: &Unit,
    is_last_hint: Option<bool>,
) -> AppResult<Option<AdvanceOutcome>> {
    let course_id = unit.course_id;
    let current = ensure_unlock_row(pool, student_id, course_id).await?.to_set();
    if !current.is_section_unlocked(section.id) {
        tracing::warn!(
            student_id,
            course_id,
            section_id = section.id,
            "Completed section is locked, unlock state unchanged",
        );
        return Ok(None);
    }

    let sections = ContentRepo::section_arena(pool, unit.id).await?;
    let units = ContentRepo::unit_arena(pool, course_id).await?;

    let (is_last, mismatch) = verify_last_hint(is_last_hint, &sections, section.id);
    if mismatch {
        tracing::warn!(
            student_id,
            section_id = section.id,
            hint = ?is_last_hint,
            actual = is_last,
            "Client last-section hint disagrees with content tree",
        );
    }

    let transition = plan_transition(section.id, &sections, unit.id, &units)?;
    let next_unit_sections = match transition {
        Transition::NextUnit { unit_id } => ContentRepo::section_arena(pool, unit_id).await?,
        _ => SlotArena::default(),
    };
    let wanted = additions_for(transition, &next_unit_sections);
    let missing = current.missing(&wanted);

    let mut added = UnlockAdditions::default();
    for unit_id in missing.units {
        if UnlockRepo::add_unit(pool, student_id, course_id, unit_id).await? {
            added.units.push(unit_id);
        }
    }
    for section_id in missing.sections {
        if UnlockRepo::add_section(pool, student_id, course_id, section_id).await? {
            added.sections.push(section_id);
        }
    }

    if added.is_empty() {
        tracing::debug!(student_id, section_id = section.id, ?transition, "Nothing new to unlock");
    } else {
        tracing::info!(
            student_id,
            course_id,
            section_id = section.id,
            ?transition,
            units = ?added.units,
            sections = ?added.sections,
            "Unlocked",
        );
    }

    let row = ensure_unlock_row(pool, student_id, course_id).await?;
    let status = build_status(pool, row).await?;
    Ok(Some(AdvanceOutcome {
        transition,
        added,
        status,
    }))
}

/// A section counts as complete when the ledger says so or every one of its
/// active resources has been viewed.
async fn is_proven_complete(
    pool: &PgPool,
    student_id: DbId,
    course_id: DbId,
    section_id: DbId,
) -> AppResult<bool> {
    if CompletionRepo::is_section_complete(pool, student_id, course_id, section_id).await? {
        return Ok(true);
    }
    let viewed = aggregator::section_view_snapshot(pool, student_id, section_id).await?;
    Ok(viewed.percentage >= COMPLETE_PCT)
}

async fn build_status(pool: &PgPool, row: CourseUnlock) -> AppResult<UnlockStatus> {
    let units = ContentRepo::unit_arena(pool, row.course_id).await?;
    let frontier = match furthest_unlocked(&row.unlocked_unit_ids, &units) {
        Some(unit) => {
            let sections = ContentRepo::section_arena(pool, unit.id).await?;
            Some(Frontier {
                unit_id: unit.id,
                section_id: furthest_unlocked(&row.unlocked_section_ids, &sections).map(|s| s.id),
            })
        }
        None => None,
    };

    Ok(UnlockStatus {
        student_id: row.student_id,
        course_id: row.course_id,
        unlocked_unit_ids: row.unlocked_unit_ids,
        unlocked_section_ids: row.unlocked_section_ids,
        frontier,
    })
}
