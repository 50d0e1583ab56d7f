//! Property-based tests for next/previous group selection and history

use proptest::prelude::*;
use tabgroups_core::{GroupHistory, GroupId, Step, position_target};

fn ids(count: usize) -> Vec<GroupId> {
    (1..=count as u32).map(GroupId).collect()
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![Just(Step::Next), Just(Step::Prev)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Position stepping
    // =========================================================================

    /// Stepping from a known group lands on its neighbour, wrapping at the ends
    #[test]
    fn prop_step_wraps_around(count in 2usize..30, index in 0usize..30) {
        let groups = ids(count);
        let index = index % count;
        let current = Some(groups[index]);

        let next = position_target(Step::Next, &groups, current);
        let prev = position_target(Step::Prev, &groups, current);

        prop_assert_eq!(next, Some(groups[(index + 1) % count]));
        prop_assert_eq!(prev, Some(groups[(index + count - 1) % count]));
    }

    /// Next then previous returns to the starting group
    #[test]
    fn prop_next_then_prev_is_identity(count in 2usize..30, index in 0usize..30) {
        let groups = ids(count);
        let start = groups[index % count];

        let next = position_target(Step::Next, &groups, Some(start));
        let back = position_target(Step::Prev, &groups, next);

        prop_assert_eq!(back, Some(start));
    }

    /// Without a current group, next starts at the first and prev at the last
    #[test]
    fn prop_unknown_current_starts_at_an_end(count in 2usize..30, stranger in 100u32..200) {
        let groups = ids(count);

        for current in [None, Some(GroupId(stranger))] {
            prop_assert_eq!(position_target(Step::Next, &groups, current), groups.first().copied());
            prop_assert_eq!(position_target(Step::Prev, &groups, current), groups.last().copied());
        }
    }

    /// Fewer than two groups leave nothing to switch to
    #[test]
    fn prop_single_group_has_no_target(count in 0usize..2, step in arb_step()) {
        let groups = ids(count);
        prop_assert_eq!(position_target(step, &groups, groups.first().copied()), None);
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Walking back visits loaded groups newest first and stops at the oldest
    #[test]
    fn prop_history_walks_back_in_order(count in 1usize..15) {
        let groups = ids(count);
        let mut history = GroupHistory::new(20);
        for id in &groups {
            history.add(*id);
        }

        let mut visited = Vec::new();
        while let Some(id) = history.prev(&groups) {
            visited.push(id);
        }

        let expected: Vec<GroupId> = groups.iter().rev().skip(1).copied().collect();
        prop_assert_eq!(visited, expected);
        prop_assert_eq!(history.prev(&groups), None);

        if count > 1 {
            prop_assert_eq!(history.next(&groups), Some(groups[1]));
        }
    }

    /// History never grows beyond its capacity
    #[test]
    fn prop_history_is_bounded(capacity in 1usize..10, added in 0usize..40) {
        let mut history = GroupHistory::new(capacity);
        for id in ids(added) {
            history.add(id);
        }
        prop_assert_eq!(history.len(), added.min(capacity));
    }

    /// Traversal never yields a group that no longer exists
    #[test]
    fn prop_history_skips_removed_groups(
        mask in prop::collection::vec(any::<bool>(), 1..15),
        steps in prop::collection::vec(arb_step(), 0..20),
    ) {
        let groups = ids(mask.len());
        let existing: Vec<GroupId> = groups
            .iter()
            .zip(&mask)
            .filter_map(|(id, keep)| keep.then_some(*id))
            .collect();

        let mut history = GroupHistory::new(20);
        for id in &groups {
            history.add(*id);
        }

        let traversed = !steps.is_empty();
        for step in steps {
            let found = match step {
                Step::Next => history.next(&existing),
                Step::Prev => history.prev(&existing),
            };
            if let Some(id) = found {
                prop_assert!(existing.contains(&id));
            }
        }
        if traversed {
            prop_assert_eq!(history.len(), existing.len());
        }
    }
}
