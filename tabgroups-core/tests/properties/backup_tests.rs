//! Property-based tests for merging backups

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;
use tabgroups_core::{
    BackupData, BackupGroup, CURRENT_VERSION, Group, GroupId, Options, StoredData, merge_backup,
};

fn incoming(ids: &[u32], last: u32) -> BackupData {
    BackupData {
        version: CURRENT_VERSION.to_string(),
        created_at: None,
        groups: ids
            .iter()
            .map(|&id| BackupGroup {
                group: Group::new(GroupId(id), None),
                tabs: Vec::new(),
            })
            .collect(),
        last_created_group_position: last,
        hotkeys: Vec::new(),
        pinned_tabs: None,
        containers: BTreeMap::new(),
        options: Options::default(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Incoming groups are numbered consecutively after every id either side
    /// has used, so no id is ever reused
    #[test]
    fn prop_merge_numbers_after_all_known_ids(
        current_ids in prop::collection::btree_set(1u32..50, 0..6),
        current_last in 0u32..60,
        backup_ids in prop::collection::btree_set(1u32..100, 0..6),
        backup_last in 0u32..60,
    ) {
        let mut current = StoredData::default();
        current.groups = current_ids
            .iter()
            .map(|&id| Group::new(GroupId(id), None))
            .collect();
        current.last_created_group_position = current_last;

        let backup_ids: Vec<u32> = backup_ids.into_iter().collect();
        let merged = merge_backup(current, incoming(&backup_ids, backup_last));

        let floor = current_ids
            .iter()
            .copied()
            .chain([current_last, backup_last])
            .max()
            .unwrap_or(0);
        let new_ids: Vec<u32> = merged.groups.iter().map(|g| g.group.id.0).collect();
        let expected: Vec<u32> = (floor + 1..=floor + backup_ids.len() as u32).collect();
        prop_assert_eq!(&new_ids, &expected);

        prop_assert_eq!(
            merged.data.last_created_group_position,
            new_ids.last().copied().unwrap_or(floor)
        );

        let all: Vec<u32> = merged.data.groups.iter().map(|g| g.id.0).collect();
        let unique: BTreeSet<u32> = all.iter().copied().collect();
        prop_assert_eq!(all.len(), unique.len());
        prop_assert_eq!(all.len(), current_ids.len() + backup_ids.len());
    }
}
