//! Property tests for the filtering and rule-merge primitives.

use proptest::prelude::*;

use groom::core::filter::FileFilter;
use groom::core::rules::{merge_rule_lists, wildcard_match};

/// Simple rule names: lowercase words joined by dashes, no wildcards.
fn rule_name() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-z]{1,8}", 1..3).prop_map(|parts| parts.join("-"))
}

/// Path-ish strings.
fn path_string() -> impl Strategy<Value = String> {
    proptest::collection::vec("[a-z0-9_]{1,8}", 1..4)
        .prop_map(|parts| format!("{}.cpp", parts.join("/")))
}

proptest! {
    /// A path matching any exclude pattern is rejected no matter what the
    /// include patterns say.
    #[test]
    fn exclude_always_wins(path in path_string()) {
        let exclude = regex::escape(&path);
        let filter = FileFilter::from_patterns(
            &[exclude.as_str()],
            &[".*"],
        ).unwrap();
        prop_assert!(!filter.accepts(&path));
    }

    /// With no include patterns every path is rejected.
    #[test]
    fn default_deny(path in path_string()) {
        let filter = FileFilter::from_patterns::<&str>(&[], &[]).unwrap();
        prop_assert!(!filter.accepts(&path));
    }

    /// Merging a list of distinct plain names with itself is the identity.
    #[test]
    fn self_merge_is_identity(names in proptest::collection::btree_set(rule_name(), 1..8)) {
        let list: Vec<String> = names.into_iter().collect();
        let joined = list.join(",");
        prop_assert_eq!(merge_rule_lists(Some(&joined), &joined), joined);
    }

    /// After merging, every delta entry appears in the result.
    #[test]
    fn delta_entries_survive(
        base in proptest::collection::btree_set(rule_name(), 0..6),
        delta in proptest::collection::btree_set(rule_name(), 1..6),
    ) {
        let base: Vec<String> = base.into_iter().collect();
        let delta: Vec<String> = delta.into_iter().collect();
        let merged = merge_rule_lists(Some(&base.join(",")), &delta.join(","));
        let merged: Vec<&str> = merged.split(',').collect();
        for entry in &delta {
            prop_assert!(merged.contains(&entry.as_str()));
        }
    }

    /// A negating delta entry removes what it names: the result never
    /// contains the positive form of an exactly-negated rule.
    #[test]
    fn negation_removes_positive_form(
        base in proptest::collection::btree_set(rule_name(), 1..6),
    ) {
        let base: Vec<String> = base.into_iter().collect();
        let victim = base[0].clone();
        let merged = merge_rule_lists(Some(&base.join(",")), &format!("-{victim}"));
        let entries: Vec<&str> = merged.split(',').collect();
        prop_assert!(!entries.contains(&victim.as_str()));
        let negated = format!("-{victim}");
        prop_assert!(entries.contains(&negated.as_str()));
    }

    /// Wildcard matching agrees with literal equality on wildcard-free
    /// patterns.
    #[test]
    fn wildcard_free_match_is_equality(a in rule_name(), b in rule_name()) {
        prop_assert_eq!(wildcard_match(&a, &b), a == b);
    }
}
