//! Merge and assign behavior across whole configurations.
//!
//! Worked examples for each policy, then property-based checks of the
//! invariants every merge must keep:
//! - SKIP never changes a property the destination already has
//! - OVERWRITE leaves every eligible source property visible unless final
//! - UNION on matching types keeps destination values first
//! - final properties survive UNION and OVERWRITE untouched

use std::collections::BTreeMap;
use std::sync::Arc;

use commons::{Config, MergingPolicy, Property, StackConfig};
use proptest::prelude::*;

fn ints(config: &Config, name: &str) -> Vec<i32> {
    config.get_values::<i32>(name)
}

// =============================================================================
// Worked examples
// =============================================================================

#[test]
fn test_skip_keeps_existing() {
    let dest = Config::new();
    dest.set("a", 1i32);
    let source = Config::new();
    source.set("a", 2i32);
    source.set("b", 3i32);

    let report = dest.merge(&source, "", MergingPolicy::Skip);

    assert_eq!(ints(&dest, "a"), vec![1]);
    assert_eq!(ints(&dest, "b"), vec![3]);
    assert_eq!(report.created, 1);
    assert_eq!(report.skipped, 1);
}

#[test]
fn test_overwrite_replaces_existing() {
    let dest = Config::new();
    dest.set("a", 1i32);
    let source = Config::new();
    source.set("a", 2i32);
    source.set("b", 3i32);

    dest.merge(&source, "", MergingPolicy::Overwrite);

    assert_eq!(ints(&dest, "a"), vec![2]);
    assert_eq!(ints(&dest, "b"), vec![3]);
}

#[test]
fn test_union_appends_after_existing() {
    let dest = Config::new();
    dest.set_all("a", [1i32]);
    let source = Config::new();
    source.set_all("a", [2i32]);

    let report = dest.merge(&source, "", MergingPolicy::Union);

    assert_eq!(ints(&dest, "a"), vec![1, 2]);
    assert_eq!(report.unioned, 1);
}

#[test]
fn test_union_type_mismatch_replaces() {
    let dest = Config::new();
    dest.set("a", 1i32);
    let source = Config::new();
    source.set("a", "one");

    dest.merge(&source, "", MergingPolicy::Union);

    assert_eq!(dest.get_string("a").as_deref(), Some("one"));
    assert_eq!(dest.get("a").unwrap().len(), 1);
}

#[test]
fn test_final_survives_union_and_overwrite() {
    let dest = Config::new();
    dest.set_final("a", 1i32, true);
    let source = Config::new();
    source.set("a", 2i32);

    dest.merge(&source, "", MergingPolicy::Union);
    assert_eq!(ints(&dest, "a"), vec![1]);

    dest.merge(&source, "", MergingPolicy::Overwrite);
    assert_eq!(ints(&dest, "a"), vec![1]);
}

#[test]
fn test_prefix_filters_source() {
    let dest = Config::new();
    let source = Config::new();
    source.set("x.a", 1i32);
    source.set("y.b", 2i32);

    dest.merge(&source, "x.", MergingPolicy::Overwrite);

    assert_eq!(dest.names(), vec!["x.a"]);
}

#[test]
fn test_self_assign_with_prefix_filters_in_place() {
    let config = Config::new();
    config.set("x.a", 1i32);
    config.set("y.b", 2i32);

    let report = config.assign_prefixed(&config, "x.");

    assert_eq!(config.names(), vec!["x.a"]);
    assert_eq!(report.removed, 1);
}

#[test]
fn test_self_merge_is_noop() {
    let config = Config::new();
    config.set_all("a", [1i32, 2]);

    let report = config.merge(&config, "", MergingPolicy::Union);

    assert_eq!(ints(&config, "a"), vec![1, 2]);
    assert_eq!(report.changed(), 0);
}

#[test]
fn test_assign_replaces_everything() {
    let dest = Config::new();
    dest.set("old", true);
    let source = Config::new();
    source.insert(Property::with_value("new", 5i64).finalized(true));

    dest.assign(&source);

    assert_eq!(dest, source);
    assert!(dest.get("new").unwrap().is_final());
}

#[test]
fn test_layered_defaults_merge_into_runtime_config() {
    let defaults = Arc::new(Config::new());
    defaults.set("server.port", 8080i32);
    defaults.set("server.host", "0.0.0.0");
    let site = Arc::new(Config::new());
    site.set("server.port", 9090i32);
    let stack = StackConfig::from_layers([defaults, site]);

    let runtime = Config::new();
    runtime.set_final("server.host", "127.0.0.1", true);
    runtime.merge(&stack, "server.", MergingPolicy::Overwrite);

    assert_eq!(runtime.get_int("server.port"), Some(9090));
    assert_eq!(runtime.get_string("server.host").as_deref(), Some("127.0.0.1"));
}

#[test]
fn test_policy_names_from_settings() {
    assert_eq!("UNION".parse::<MergingPolicy>().unwrap(), MergingPolicy::Union);
    assert!("merge".parse::<MergingPolicy>().is_err());
    assert_eq!(MergingPolicy::from_str_lossy("merge"), MergingPolicy::Overwrite);
}

// =============================================================================
// Property-based invariants
// =============================================================================

/// Small name space so that destination and source overlap often.
fn name_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "c", "x.a", "x.b", "y.a"]).prop_map(str::to_string)
}

#[derive(Debug, Clone)]
struct Entry {
    values: Vec<i32>,
    is_final: bool,
}

fn config_strategy() -> impl Strategy<Value = BTreeMap<String, Entry>> {
    prop::collection::btree_map(
        name_strategy(),
        (prop::collection::vec(any::<i32>(), 1..4), any::<bool>())
            .prop_map(|(values, is_final)| Entry { values, is_final }),
        0..6,
    )
}

fn build(entries: &BTreeMap<String, Entry>) -> Config {
    let config = Config::new();
    for (name, entry) in entries {
        config.insert(Property::with_values(name.as_str(), entry.values.clone()).finalized(entry.is_final));
    }
    config
}

fn policy_strategy() -> impl Strategy<Value = MergingPolicy> {
    prop_oneof![
        Just(MergingPolicy::Skip),
        Just(MergingPolicy::Union),
        Just(MergingPolicy::Overwrite),
    ]
}

fn prefix_strategy() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["", "x.", "y.", "z."])
}

proptest! {
    #[test]
    fn prop_merge_result_per_name(
        dest in config_strategy(),
        source in config_strategy(),
        policy in policy_strategy(),
        prefix in prefix_strategy(),
    ) {
        let merged = build(&dest);
        merged.merge(&build(&source), prefix, policy);

        let mut names: Vec<&String> = dest.keys().chain(source.keys()).collect();
        names.sort();
        names.dedup();

        for name in names {
            let eligible = source.get(name).filter(|_| name.starts_with(prefix));
            let expected = match (dest.get(name), eligible) {
                (None, None) => None,
                (Some(d), None) => Some(d.values.clone()),
                (None, Some(s)) => Some(s.values.clone()),
                (Some(d), Some(_)) if policy == MergingPolicy::Skip || d.is_final => {
                    Some(d.values.clone())
                }
                (Some(d), Some(s)) if policy == MergingPolicy::Union => {
                    Some(d.values.iter().chain(&s.values).copied().collect())
                }
                (Some(_), Some(s)) => Some(s.values.clone()),
            };
            let actual = merged.get(name).map(|p| p.values::<i32>());
            prop_assert_eq!(actual, expected, "name {}", name);
        }
    }

    #[test]
    fn prop_clone_equals_original(entries in config_strategy()) {
        let config = build(&entries);
        prop_assert_eq!(config.clone(), config);
    }

    #[test]
    fn prop_assign_then_equal(dest in config_strategy(), source in config_strategy()) {
        let target = build(&dest);
        let source = build(&source);
        target.assign(&source);
        prop_assert_eq!(target, source);
    }
}
