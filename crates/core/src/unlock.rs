//! Sequential unlock state machine.
//!
//! Per (student, course) the unlocked Units and Sections form a growing set.
//! The only transition is forward: once the current section is proven
//! complete, either the next section of the same unit is unlocked, or, when
//! the section is the last one of its unit, the next unit together with its
//! first section. Positional questions ("is this the last section?") are
//! always answered from the active siblings, never from a caller's hint.

use serde::Serialize;

use crate::error::CoreError;
use crate::slots::{Slot, SlotArena};
use crate::types::DbId;

/// Canonical unlock state: the ids unlocked so far, in unlock order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnlockSet {
    pub units: Vec<DbId>,
    pub sections: Vec<DbId>,
}

/// Ids to add to an [`UnlockSet`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnlockAdditions {
    pub units: Vec<DbId>,
    pub sections: Vec<DbId>,
}

impl UnlockAdditions {
    pub fn is_empty(&self) -> bool {
        self.units.is_empty() && self.sections.is_empty()
    }
}

impl UnlockSet {
    pub fn new(units: Vec<DbId>, sections: Vec<DbId>) -> Self {
        Self { units, sections }
    }

    pub fn is_unit_unlocked(&self, id: DbId) -> bool {
        self.units.contains(&id)
    }

    pub fn is_section_unlocked(&self, id: DbId) -> bool {
        self.sections.contains(&id)
    }

    /// Drop the additions that are already members.
    pub fn missing(&self, additions: &UnlockAdditions) -> UnlockAdditions {
        UnlockAdditions {
            units: additions
                .units
                .iter()
                .copied()
                .filter(|id| !self.is_unit_unlocked(*id))
                .collect(),
            sections: additions
                .sections
                .iter()
                .copied()
                .filter(|id| !self.is_section_unlocked(*id))
                .collect(),
        }
    }

    /// Merge additions in place. Returns `true` if anything changed.
    pub fn merge(&mut self, additions: &UnlockAdditions) -> bool {
        let missing = self.missing(additions);
        let changed = !missing.is_empty();
        self.units.extend(missing.units);
        self.sections.extend(missing.sections);
        changed
    }
}

/// Outcome of evaluating the forward rule for a completed section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transition {
    /// The section was not last in its unit; unlock the next one.
    NextSection { section_id: DbId },
    /// The section was last in its unit; unlock the next unit.
    NextUnit { unit_id: DbId },
    /// Last section of the last unit. Nothing further to unlock.
    CourseComplete,
}

/// The default frontier for a student touching a course for the first time.
///
/// `units` are the course's active units; `first_unit_sections` are the
/// active sections of the lowest-numbered one. Empty trees produce empty
/// additions.
pub fn initial_unlocks(units: &SlotArena, first_unit_sections: &SlotArena) -> UnlockAdditions {
    let Some(first_unit) = units.first() else {
        return UnlockAdditions::default();
    };
    UnlockAdditions {
        units: vec![first_unit.id],
        sections: first_unit_sections.first().map(|s| s.id).into_iter().collect(),
    }
}

/// Evaluate the forward rule for `section_id` in `unit_id`.
///
/// `sections` are the active sections of the unit and `units` the active
/// units of the course. Fails with `NotFound` when either id is no longer
/// among the active siblings.
pub fn plan_transition(
    section_id: DbId,
    sections: &SlotArena,
    unit_id: DbId,
    units: &SlotArena,
) -> Result<Transition, CoreError> {
    let section = sections.get(section_id).ok_or(CoreError::NotFound {
        entity: "Section",
        id: section_id,
    })?;
    let unit = units.get(unit_id).ok_or(CoreError::NotFound {
        entity: "Unit",
        id: unit_id,
    })?;

    if !sections.is_last(section.id) {
        if let Some(next) = sections.next_after(section.number) {
            return Ok(Transition::NextSection {
                section_id: next.id,
            });
        }
    }

    match units.next_after(unit.number) {
        Some(next) if !units.is_last(unit.id) => Ok(Transition::NextUnit { unit_id: next.id }),
        _ => Ok(Transition::CourseComplete),
    }
}

/// Additions for a transition.
///
/// For [`Transition::NextUnit`], `next_unit_sections` must hold the active
/// sections of the newly unlocked unit; its first section is unlocked in the
/// same step so the new unit is never a dead end.
pub fn additions_for(transition: Transition, next_unit_sections: &SlotArena) -> UnlockAdditions {
    match transition {
        Transition::NextSection { section_id } => UnlockAdditions {
            units: Vec::new(),
            sections: vec![section_id],
        },
        Transition::NextUnit { unit_id } => UnlockAdditions {
            units: vec![unit_id],
            sections: next_unit_sections.first().map(|s| s.id).into_iter().collect(),
        },
        Transition::CourseComplete => UnlockAdditions::default(),
    }
}

/// Compare a caller's "this is the last section" hint against the tree.
///
/// Returns the ground-truth value and whether the hint disagreed with it.
pub fn verify_last_hint(hint: Option<bool>, sections: &SlotArena, section_id: DbId) -> (bool, bool) {
    let actual = sections.is_last(section_id);
    let mismatch = hint.is_some_and(|h| h != actual);
    (actual, mismatch)
}

/// The furthest unlocked sibling, by position among the active ones.
///
/// Unlocked ids that are no longer active are ignored.
pub fn furthest_unlocked(unlocked: &[DbId], siblings: &SlotArena) -> Option<Slot> {
    siblings
        .slots()
        .iter()
        .rev()
        .find(|s| unlocked.contains(&s.id))
        .copied()
}

/// Entry sections for unlocked units that have none reachable.
///
/// `unlocked_units` pairs each unlocked, still-active unit with its active
/// sections. A unit unlocked while it had no sections, or whose unlocked
/// sections were all deleted, gets its first active section back.
pub fn missing_entry_sections(set: &UnlockSet, unlocked_units: &[(DbId, SlotArena)]) -> Vec<DbId> {
    unlocked_units
        .iter()
        .filter(|(_, sections)| !sections.slots().iter().any(|s| set.is_section_unlocked(s.id)))
        .filter_map(|(_, sections)| sections.first().map(|s| s.id))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn arena(pairs: &[(DbId, i32)]) -> SlotArena {
        SlotArena::new(
            pairs
                .iter()
                .map(|&(id, number)| Slot { id, number })
                .collect(),
        )
    }

    #[test]
    fn initial_unlocks_first_unit_and_section() {
        let units = arena(&[(2, 2), (1, 1), (3, 3)]);
        let sections = arena(&[(11, 2), (10, 1)]);
        let adds = initial_unlocks(&units, &sections);
        assert_eq!(adds.units, vec![1]);
        assert_eq!(adds.sections, vec![10]);
    }

    #[test]
    fn initial_unlocks_empty_course() {
        let adds = initial_unlocks(&SlotArena::default(), &SlotArena::default());
        assert!(adds.is_empty());
    }

    #[test]
    fn initial_unlocks_unit_without_sections() {
        let adds = initial_unlocks(&arena(&[(1, 1)]), &SlotArena::default());
        assert_eq!(adds.units, vec![1]);
        assert!(adds.sections.is_empty());
    }

    #[test]
    fn middle_section_unlocks_next_section() {
        let units = arena(&[(1, 1), (2, 2)]);
        let sections = arena(&[(10, 1), (11, 2), (12, 3)]);
        let t = plan_transition(10, &sections, 1, &units).unwrap();
        assert_eq!(t, Transition::NextSection { section_id: 11 });
    }

    #[test]
    fn next_section_skips_numbering_gap() {
        let units = arena(&[(1, 1)]);
        let sections = arena(&[(10, 1), (12, 4)]);
        let t = plan_transition(10, &sections, 1, &units).unwrap();
        assert_eq!(t, Transition::NextSection { section_id: 12 });
    }

    #[test]
    fn last_section_unlocks_next_unit_and_its_first_section() {
        let units = arena(&[(1, 1), (2, 2), (3, 3)]);
        let sections = arena(&[(10, 1), (11, 2)]);
        let t = plan_transition(11, &sections, 1, &units).unwrap();
        assert_eq!(t, Transition::NextUnit { unit_id: 2 });

        let next_sections = arena(&[(21, 2), (20, 1)]);
        let adds = additions_for(t, &next_sections);
        assert_eq!(adds.units, vec![2]);
        assert_eq!(adds.sections, vec![20]);
    }

    #[test]
    fn last_section_of_last_unit_completes_course() {
        let units = arena(&[(1, 1), (2, 2)]);
        let sections = arena(&[(20, 1)]);
        let t = plan_transition(20, &sections, 2, &units).unwrap();
        assert_eq!(t, Transition::CourseComplete);
        assert!(additions_for(t, &SlotArena::default()).is_empty());
    }

    #[test]
    fn inactive_section_is_not_found() {
        let units = arena(&[(1, 1)]);
        let sections = arena(&[(10, 1)]);
        assert_matches!(
            plan_transition(99, &sections, 1, &units),
            Err(CoreError::NotFound { entity: "Section", id: 99 })
        );
    }

    #[test]
    fn inactive_unit_is_not_found() {
        let units = arena(&[(1, 1)]);
        let sections = arena(&[(10, 1)]);
        assert_matches!(
            plan_transition(10, &sections, 7, &units),
            Err(CoreError::NotFound { entity: "Unit", id: 7 })
        );
    }

    #[test]
    fn last_hint_is_rederived() {
        let sections = arena(&[(10, 1), (11, 2)]);
        assert_eq!(verify_last_hint(Some(true), &sections, 10), (false, true));
        assert_eq!(verify_last_hint(Some(true), &sections, 11), (true, false));
        assert_eq!(verify_last_hint(None, &sections, 11), (true, false));
    }

    #[test]
    fn merge_is_idempotent_and_monotonic() {
        let mut set = UnlockSet::new(vec![1], vec![10]);
        let adds = UnlockAdditions {
            units: vec![1, 2],
            sections: vec![10, 20],
        };
        assert!(set.merge(&adds));
        let after_first = set.clone();
        assert!(!set.merge(&adds));
        assert_eq!(set, after_first);
        assert_eq!(set.units, vec![1, 2]);
        assert_eq!(set.sections, vec![10, 20]);
    }

    #[test]
    fn walking_a_course_never_shrinks_the_set() {
        let units = arena(&[(1, 1), (2, 2)]);
        let unit_sections = |unit: DbId| match unit {
            1 => arena(&[(10, 1), (11, 2)]),
            _ => arena(&[(20, 1), (21, 2)]),
        };

        let mut set = UnlockSet::default();
        set.merge(&initial_unlocks(&units, &unit_sections(1)));

        let path = [(10, 1), (11, 1), (20, 2), (21, 2)];
        let mut previous = set.sections.len();
        for (section, unit) in path {
            let t = plan_transition(section, &unit_sections(unit), unit, &units).unwrap();
            let next = match t {
                Transition::NextUnit { unit_id } => unit_sections(unit_id),
                _ => SlotArena::default(),
            };
            set.merge(&additions_for(t, &next));
            assert!(set.sections.len() >= previous);
            previous = set.sections.len();
        }
        assert_eq!(set.units, vec![1, 2]);
        assert_eq!(set.sections, vec![10, 11, 20, 21]);
    }

    #[test]
    fn furthest_ignores_inactive_ids() {
        let units = arena(&[(1, 1), (2, 2), (3, 3)]);
        assert_eq!(furthest_unlocked(&[1, 2, 99], &units).unwrap().id, 2);
        assert_eq!(furthest_unlocked(&[99], &units), None);
    }

    #[test]
    fn entry_section_added_for_unit_without_reachable_section() {
        let set = UnlockSet::new(vec![1, 2], vec![10]);
        let units = vec![
            (1, arena(&[(10, 1), (11, 2)])),
            (2, arena(&[(21, 2), (20, 1)])),
        ];
        assert_eq!(missing_entry_sections(&set, &units), vec![20]);
    }

    #[test]
    fn entry_section_skips_empty_and_covered_units() {
        let set = UnlockSet::new(vec![1, 2], vec![11]);
        let units = vec![(1, arena(&[(10, 1), (11, 2)])), (2, SlotArena::default())];
        assert!(missing_entry_sections(&set, &units).is_empty());
    }
}
