//! Property-based tests for version comparison and document upgrades

use std::cmp::Ordering;

use proptest::prelude::*;
use serde_json::{Value, json};
use tabgroups_core::{CURRENT_VERSION, MigrationError, compare_versions, migrate};

/// Strategy for dotted version strings with one to four parts
fn arb_version() -> impl Strategy<Value = String> {
    prop::collection::vec(0u16..100, 1..5).prop_map(|parts| {
        parts
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    })
}

/// Strategy for versions older than the current one
fn arb_old_version() -> impl Strategy<Value = String> {
    (2u16..=4, 0u16..8, 0u16..10)
        .prop_map(|(major, minor, patch)| format!("{major}.{minor}.{patch}"))
        .prop_filter("older than current", |v| {
            compare_versions(v, CURRENT_VERSION).is_ok_and(Ordering::is_lt)
        })
}

fn current_major() -> u16 {
    CURRENT_VERSION
        .split('.')
        .next()
        .and_then(|major| major.parse().ok())
        .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Version comparison
    // =========================================================================

    /// Every version equals itself, also with trailing zero parts
    #[test]
    fn prop_compare_is_reflexive(version in arb_version()) {
        prop_assert_eq!(compare_versions(&version, &version), Ok(Ordering::Equal));
        let padded = format!("{version}.0");
        prop_assert_eq!(compare_versions(&version, &padded), Ok(Ordering::Equal));
    }

    /// Swapping the sides reverses the ordering
    #[test]
    fn prop_compare_is_antisymmetric(a in arb_version(), b in arb_version()) {
        let forward = compare_versions(&a, &b).unwrap();
        let backward = compare_versions(&b, &a).unwrap();
        prop_assert_eq!(forward, backward.reverse());
    }

    // =========================================================================
    // Upgrades
    // =========================================================================

    /// Documents from a newer major release are refused
    #[test]
    fn prop_newer_major_is_refused(ahead in 1u16..50, minor in 0u16..10) {
        let version = format!("{}.{minor}", current_major() + ahead);
        let result = migrate(json!({"version": version, "groups": []}));
        let refused = matches!(result, Err(MigrationError::NewerVersion { .. }));
        prop_assert!(refused);
    }

    /// Older documents end up stamped with the current version, and a
    /// second pass changes nothing
    #[test]
    fn prop_upgrade_is_stamped_and_idempotent(
        version in arb_old_version(),
        group_count in 0u32..5,
    ) {
        let groups: Vec<Value> = (1..=group_count)
            .map(|id| json!({"id": id, "title": format!("G{id}"), "windowId": 7}))
            .collect();
        let doc = json!({"version": version, "groups": groups, "thumbnails": {}});

        let first = migrate(doc).unwrap();
        prop_assert_eq!(first.data["version"].as_str(), Some(CURRENT_VERSION));
        prop_assert!(first.is_upgraded());

        let second = migrate(Value::Object(first.data.clone())).unwrap();
        prop_assert!(!second.is_upgraded());
        prop_assert!(second.removed_keys.is_empty());
        prop_assert_eq!(second.data, first.data);
    }
}
