//! Property-based tests for catch rules

use proptest::prelude::*;
use serde_json::json;
use tabgroups_core::models::split_rules;
use tabgroups_core::{CatchRules, Group, GroupId, Tab, TabId, WindowId, find_catching_group};

fn group(id: u32, rules: Vec<String>) -> Group {
    let mut group = Group::new(GroupId(id), None);
    group.catch_tab_rules = rules;
    group
}

fn tab(url: &str) -> Tab {
    Tab::new(TabId(1), WindowId(1), url)
}

/// Strategy for a rule line with optional surrounding whitespace
fn arb_rule_line() -> impl Strategy<Value = String> {
    ("[ \t]{0,2}", "[a-z.]{0,8}", "[ \t]{0,2}").prop_map(|(l, r, t)| format!("{l}{r}{t}"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // =========================================================================
    // Matching order
    // =========================================================================

    /// The first group in list order whose rule matches wins
    #[test]
    fn prop_first_matching_group_wins(catches in prop::collection::vec(any::<bool>(), 1..12)) {
        let groups: Vec<Group> = catches
            .iter()
            .enumerate()
            .map(|(i, &hit)| {
                let rule = if hit { r"shared\.test" } else { r"other\.test" };
                group(i as u32 + 1, vec![rule.to_string()])
            })
            .collect();

        let expected = catches
            .iter()
            .position(|&c| c)
            .map(|i| GroupId(i as u32 + 1));

        prop_assert_eq!(
            find_catching_group(&groups, &tab("https://shared.test/page"), false),
            expected
        );
    }

    /// Invalid patterns never match and never hide later groups
    #[test]
    fn prop_invalid_rules_are_skipped(broken in 1usize..6) {
        let mut groups: Vec<Group> = (1..=broken as u32)
            .map(|id| group(id, vec!["(unclosed".to_string(), "[".to_string()]))
            .collect();
        let last = broken as u32 + 1;
        groups.push(group(last, vec!["valid".to_string()]));

        let rules = CatchRules::compile(&groups);
        prop_assert_eq!(rules.find(&tab("https://valid.test"), false), Some(GroupId(last)));
        prop_assert_eq!(rules.find(&tab("https://(unclosed"), false), None);
    }

    /// Groups without rules catch nothing
    #[test]
    fn prop_groups_without_rules_catch_nothing(count in 0usize..10, url in "https://[a-z]{1,10}\\.test") {
        let groups: Vec<Group> = (1..=count as u32).map(|id| group(id, Vec::new())).collect();
        let rules = CatchRules::compile(&groups);

        prop_assert!(rules.is_empty());
        prop_assert_eq!(rules.find(&tab(&url), true), None);
    }

    // =========================================================================
    // Legacy rule blocks
    // =========================================================================

    /// A newline separated block splits into its trimmed, non-empty lines
    #[test]
    fn prop_split_rules_trims_and_drops_blank_lines(lines in prop::collection::vec(arb_rule_line(), 0..10)) {
        let block = lines.join("\n");
        let expected: Vec<String> = lines
            .iter()
            .map(|l| l.trim().to_string())
            .filter(|l| !l.is_empty())
            .collect();

        prop_assert_eq!(split_rules(&block), expected);
    }

    /// A group stored with a rule block reads the same as one stored with a list
    #[test]
    fn prop_rule_block_and_list_deserialize_alike(lines in prop::collection::vec("[a-z]{1,8}", 0..8)) {
        let from_block: Group = serde_json::from_value(json!({
            "id": 1,
            "title": "Rules",
            "catchTabRules": lines.join("\n"),
        }))
        .unwrap();
        let from_list: Group = serde_json::from_value(json!({
            "id": 1,
            "title": "Rules",
            "catchTabRules": lines,
        }))
        .unwrap();

        prop_assert_eq!(&from_block.catch_tab_rules, &lines);
        prop_assert_eq!(from_block, from_list);
    }
}
