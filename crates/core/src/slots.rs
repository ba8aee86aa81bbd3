//! Ordered sibling slots.
//!
//! Every active child of a parent occupies one slot identified by its
//! `number`. Numbers are unique within a parent but may have gaps after a
//! soft delete. The arena answers the positional questions the unlock gate
//! asks (first, last, next) and plans the renumbering shift for an insert so
//! that the repository can apply it inside one transaction.

use serde::Serialize;

use crate::content::validate_number;
use crate::error::CoreError;
use crate::types::{DbId, SlotNumber};

/// One active sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub id: DbId,
    pub number: SlotNumber,
}

/// A single `number` change applied during an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shift {
    pub id: DbId,
    pub from: SlotNumber,
    pub to: SlotNumber,
}

/// Where a new sibling goes and which existing siblings move to make room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsertPlan {
    pub number: SlotNumber,
    pub shifts: Vec<Shift>,
}

/// Active siblings of one parent, sorted by `number`.
#[derive(Debug, Clone, Default)]
pub struct SlotArena {
    slots: Vec<Slot>,
}

impl SlotArena {
    pub fn new(mut slots: Vec<Slot>) -> Self {
        slots.sort_by_key(|s| (s.number, s.id));
        Self { slots }
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Lowest-numbered sibling.
    pub fn first(&self) -> Option<Slot> {
        self.slots.first().copied()
    }

    /// Highest-numbered sibling.
    pub fn last(&self) -> Option<Slot> {
        self.slots.last().copied()
    }

    pub fn get(&self, id: DbId) -> Option<Slot> {
        self.slots.iter().find(|s| s.id == id).copied()
    }

    pub fn contains(&self, id: DbId) -> bool {
        self.slots.iter().any(|s| s.id == id)
    }

    /// Whether `id` holds the highest number among the siblings.
    pub fn is_last(&self, id: DbId) -> bool {
        self.last().is_some_and(|s| s.id == id)
    }

    /// The sibling with the smallest number strictly greater than `number`.
    ///
    /// With dense numbering this is the `number + 1` slot; after deletions it
    /// skips the gap instead of dead-ending.
    pub fn next_after(&self, number: SlotNumber) -> Option<Slot> {
        self.slots.iter().find(|s| s.number > number).copied()
    }

    /// The number a sibling appended at the end would receive.
    ///
    /// Fails once the last sibling holds `SlotNumber::MAX`.
    pub fn append_number(&self) -> Result<SlotNumber, CoreError> {
        match self.last() {
            None => Ok(1),
            Some(last) => successor(last.number),
        }
    }

    /// Plan the insertion of a new sibling.
    ///
    /// `None` appends after the last slot. A free requested number is used
    /// as-is. A taken requested number pushes that slot and every later one
    /// up by one; earlier slots and gaps before the requested number are left
    /// alone.
    pub fn plan_insert(&self, requested: Option<SlotNumber>) -> Result<InsertPlan, CoreError> {
        let Some(number) = requested else {
            return Ok(InsertPlan {
                number: self.append_number()?,
                shifts: Vec::new(),
            });
        };
        validate_number(number)?;

        if !self.slots.iter().any(|s| s.number == number) {
            return Ok(InsertPlan {
                number,
                shifts: Vec::new(),
            });
        }

        let shifts = self
            .slots
            .iter()
            .filter(|s| s.number >= number)
            .map(|s| {
                Ok(Shift {
                    id: s.id,
                    from: s.number,
                    to: successor(s.number)?,
                })
            })
            .collect::<Result<Vec<_>, CoreError>>()?;

        Ok(InsertPlan { number, shifts })
    }

    /// Apply an insert plan in memory, returning the resulting arena.
    pub fn apply(&self, plan: &InsertPlan, new_id: DbId) -> SlotArena {
        let mut slots: Vec<Slot> = self
            .slots
            .iter()
            .map(|s| match plan.shifts.iter().find(|sh| sh.id == s.id) {
                Some(shift) => Slot {
                    id: s.id,
                    number: shift.to,
                },
                None => *s,
            })
            .collect();
        slots.push(Slot {
            id: new_id,
            number: plan.number,
        });
        SlotArena::new(slots)
    }

    /// Whether all numbers are positive and pairwise distinct.
    pub fn is_well_formed(&self) -> bool {
        self.slots.iter().all(|s| s.number >= 1)
            && self.slots.windows(2).all(|w| w[0].number < w[1].number)
    }
}

fn successor(number: SlotNumber) -> Result<SlotNumber, CoreError> {
    number.checked_add(1).ok_or_else(|| {
        CoreError::Validation(format!("no sibling number left after {number}"))
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn arena(pairs: &[(DbId, SlotNumber)]) -> SlotArena {
        SlotArena::new(
            pairs
                .iter()
                .map(|&(id, number)| Slot { id, number })
                .collect(),
        )
    }

    #[test]
    fn sorts_by_number() {
        let a = arena(&[(3, 7), (1, 2), (2, 5)]);
        assert_eq!(a.first().unwrap().id, 1);
        assert_eq!(a.last().unwrap().id, 3);
        assert!(a.is_last(3));
        assert!(!a.is_last(2));
    }

    #[test]
    fn next_after_skips_gaps() {
        let a = arena(&[(10, 1), (11, 2), (12, 5)]);
        assert_eq!(a.next_after(1).unwrap().id, 11);
        assert_eq!(a.next_after(2).unwrap().id, 12);
        assert_eq!(a.next_after(5), None);
    }

    #[test]
    fn empty_arena_appends_at_one() {
        let a = SlotArena::default();
        let plan = a.plan_insert(None).unwrap();
        assert_eq!(plan.number, 1);
        assert!(plan.shifts.is_empty());
        assert_eq!(a.first(), None);
    }

    #[test]
    fn append_goes_after_last_even_with_gaps() {
        let a = arena(&[(1, 1), (2, 4)]);
        assert_eq!(a.plan_insert(None).unwrap().number, 5);
    }

    #[test]
    fn free_number_needs_no_shift() {
        let a = arena(&[(1, 1), (2, 4)]);
        let plan = a.plan_insert(Some(2)).unwrap();
        assert_eq!(plan.number, 2);
        assert!(plan.shifts.is_empty());
    }

    #[test]
    fn taken_number_shifts_it_and_everything_after() {
        let a = arena(&[(1, 1), (2, 2), (3, 3)]);
        let plan = a.plan_insert(Some(2)).unwrap();
        assert_eq!(plan.number, 2);
        assert_eq!(
            plan.shifts,
            vec![
                Shift { id: 2, from: 2, to: 3 },
                Shift { id: 3, from: 3, to: 4 },
            ]
        );

        let after = a.apply(&plan, 99);
        assert!(after.is_well_formed());
        let order: Vec<DbId> = after.slots().iter().map(|s| s.id).collect();
        assert_eq!(order, vec![1, 99, 2, 3]);
    }

    #[test]
    fn insert_at_front_shifts_all() {
        let a = arena(&[(1, 1), (2, 2)]);
        let plan = a.plan_insert(Some(1)).unwrap();
        assert_eq!(plan.shifts.len(), 2);
        assert!(a.apply(&plan, 7).is_well_formed());
    }

    #[test]
    fn append_after_max_number_is_rejected() {
        let a = arena(&[(1, SlotNumber::MAX)]);
        assert_matches!(a.plan_insert(None), Err(CoreError::Validation(_)));
    }

    #[test]
    fn shift_past_max_number_is_rejected() {
        let a = arena(&[(1, SlotNumber::MAX - 1), (2, SlotNumber::MAX)]);
        assert_matches!(
            a.plan_insert(Some(SlotNumber::MAX - 1)),
            Err(CoreError::Validation(_))
        );
        assert_matches!(a.plan_insert(Some(SlotNumber::MAX)), Err(CoreError::Validation(_)));
    }

    #[test]
    fn max_number_is_usable_when_free() {
        let a = arena(&[(1, 1)]);
        assert_eq!(a.plan_insert(Some(SlotNumber::MAX)).unwrap().number, SlotNumber::MAX);
    }

    #[test]
    fn invalid_requested_number_is_rejected() {
        let a = arena(&[(1, 1)]);
        assert!(a.plan_insert(Some(0)).is_err());
    }
}
