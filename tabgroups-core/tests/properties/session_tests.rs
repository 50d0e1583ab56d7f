//! Property-based tests for the session cache and the exclude set

use std::collections::HashSet;
use std::sync::Arc;

use proptest::prelude::*;
use tabgroups_core::host::SessionValuesPort;
use tabgroups_core::{
    ExcludeSet, GroupId, InMemoryHost, SessionCache, Tab, TabId, WindowId,
};

#[derive(Debug, Clone)]
enum WindowOp {
    Load(u32, u32),
    Unload(u32),
    Close(u32),
}

fn arb_window_op() -> impl Strategy<Value = WindowOp> {
    prop_oneof![
        4 => (1u32..5, 1u32..6).prop_map(|(w, g)| WindowOp::Load(w, g)),
        1 => (1u32..5).prop_map(WindowOp::Unload),
        1 => (1u32..5).prop_map(WindowOp::Close),
    ]
}

fn cache() -> SessionCache {
    let values: Arc<dyn SessionValuesPort> = Arc::new(InMemoryHost::new());
    SessionCache::new(values)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Loaded groups
    // =========================================================================

    /// A group is loaded in at most one window, and both lookups agree
    #[test]
    fn prop_loaded_groups_are_injective(ops in prop::collection::vec(arb_window_op(), 0..40)) {
        let cache = cache();

        for op in ops {
            match op {
                WindowOp::Load(w, g) => cache.set_window_group(WindowId(w), GroupId(g)),
                WindowOp::Unload(w) => cache.remove_window_group(WindowId(w)),
                WindowOp::Close(w) => cache.remove_window(WindowId(w)),
            }

            let loaded = cache.loaded_groups();
            let groups: HashSet<GroupId> = loaded.iter().map(|(_, g)| *g).collect();
            prop_assert_eq!(groups.len(), loaded.len());

            for (window_id, group_id) in loaded {
                prop_assert_eq!(cache.get_window_group(window_id), Some(group_id));
                prop_assert_eq!(cache.get_window_id(group_id), Some(window_id));
            }
        }
    }

    /// The window a group was loaded into last is the one holding it
    #[test]
    fn prop_last_load_wins(windows in prop::collection::vec(1u32..5, 1..10)) {
        let cache = cache();
        let group = GroupId(1);
        for w in &windows {
            cache.set_window_group(WindowId(*w), group);
        }

        let last = windows.last().copied().map(WindowId);
        prop_assert_eq!(cache.get_window_id(group), last);
        prop_assert_eq!(cache.loaded_groups().len(), 1);
    }

    // =========================================================================
    // Pinned tabs
    // =========================================================================

    /// Pinned tabs never belong to a group
    #[test]
    fn prop_pinned_tabs_are_never_grouped(group in 1u32..10, pinned_first in any::<bool>()) {
        let cache = cache();
        let mut tab = Tab::new(TabId(1), WindowId(1), "https://a.test");

        if pinned_first {
            tab.pinned = true;
            cache.set_tab(&tab);
            prop_assert!(!cache.set_tab_group(tab.id, Some(GroupId(group))));
        } else {
            cache.set_tab(&tab);
            prop_assert!(cache.set_tab_group(tab.id, Some(GroupId(group))));
            tab.pinned = true;
            cache.set_tab(&tab);
        }

        prop_assert_eq!(cache.tab_group(tab.id), None);
    }

    // =========================================================================
    // Exclude set
    // =========================================================================

    /// Ids stay excluded while any guard holds them and are released on drop
    #[test]
    fn prop_exclude_guards_release_on_drop(
        sets in prop::collection::vec(prop::collection::vec(1u32..20, 0..6), 1..6),
    ) {
        let exclude = Arc::new(ExcludeSet::new());
        let mut guards: Vec<_> = sets
            .iter()
            .map(|ids| exclude.guard(ids.iter().copied().map(TabId)))
            .collect();

        for id in sets.iter().flatten() {
            prop_assert!(exclude.contains(TabId(*id)));
        }

        while !guards.is_empty() {
            drop(guards.remove(0));
            let held: HashSet<TabId> = guards.iter().flat_map(|g| g.ids().to_vec()).collect();
            for id in sets.iter().flatten().map(|id| TabId(*id)) {
                prop_assert_eq!(exclude.contains(id), held.contains(&id));
            }
        }

        prop_assert!(exclude.is_empty());
    }
}
