//! Merge and assign between configurations.
//!
//! Policies, applied per source property whose name matches the prefix:
//! - SKIP: an existing property is kept as is
//! - UNION: values are appended after the existing ones; an untyped side
//!   takes the other's type, and a type mismatch replaces the property
//! - OVERWRITE: the existing property is replaced
//!
//! Final properties are never replaced by UNION or OVERWRITE.

use std::fmt;
use std::str::FromStr;

use dashmap::mapref::entry::Entry;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{Config, ConfigView};
use crate::property::Property;

/// How a merge treats properties present on both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergingPolicy {
    /// Keep the destination property.
    Skip,
    /// Append source values to the destination values.
    Union,
    /// Replace the destination property.
    #[default]
    Overwrite,
}

impl MergingPolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Union => "union",
            Self::Overwrite => "overwrite",
        }
    }

    /// Parse a policy name, falling back to [`MergingPolicy::Overwrite`] for
    /// anything unrecognised.
    pub fn from_str_lossy(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl fmt::Display for MergingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised merging policy name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown merging policy '{0}' (expected skip, union or overwrite)")]
pub struct UnknownPolicy(pub String);

impl FromStr for MergingPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "union" => Ok(Self::Union),
            "overwrite" => Ok(Self::Overwrite),
            _ => Err(UnknownPolicy(s.to_string())),
        }
    }
}

/// Per-outcome property counts of a merge or assign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Properties that did not exist in the destination.
    pub created: usize,
    /// Existing properties replaced by the source property.
    pub overwritten: usize,
    /// Existing properties that received the source values.
    pub unioned: usize,
    /// Existing properties left untouched (SKIP policy or final).
    pub skipped: usize,
    /// Destination properties dropped by an assign.
    pub removed: usize,
}

impl MergeReport {
    /// Number of destination properties that changed.
    pub fn changed(&self) -> usize {
        self.created + self.overwritten + self.unioned + self.removed
    }
}

fn same_instance<S: ConfigView + ?Sized>(config: &Config, source: &S) -> bool {
    std::ptr::eq(
        config as *const Config as *const u8,
        source as *const S as *const u8,
    )
}

/// Values can be appended when the types match or either side is untyped.
fn union_compatible(mine: &Property, theirs: &Property) -> bool {
    match (mine.value_type(), theirs.value_type()) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

impl Config {
    /// Merge every property of `source` whose name starts with `prefix`.
    ///
    /// An empty prefix matches every name. Merging a config into itself is a
    /// no-op.
    pub fn merge<S: ConfigView + ?Sized>(
        &self,
        source: &S,
        prefix: &str,
        policy: MergingPolicy,
    ) -> MergeReport {
        let mut report = MergeReport::default();
        if same_instance(self, source) {
            return report;
        }

        let _guard = self.bulk.lock();
        for theirs in source.all_properties() {
            if !theirs.name().starts_with(prefix) {
                continue;
            }

            match self.properties.entry(theirs.name().to_string()) {
                Entry::Vacant(vacant) => {
                    vacant.insert(theirs);
                    report.created += 1;
                }
                Entry::Occupied(mut occupied) => {
                    let mine = occupied.get_mut();
                    match policy {
                        MergingPolicy::Skip => report.skipped += 1,
                        _ if mine.is_final() => report.skipped += 1,
                        MergingPolicy::Union if union_compatible(mine, &theirs) => {
                            match mine.union_values(&theirs) {
                                Ok(()) => report.unioned += 1,
                                Err(_) => {
                                    mine.assign(&theirs);
                                    report.overwritten += 1;
                                }
                            }
                        }
                        MergingPolicy::Union => {
                            tracing::warn!(
                                name = theirs.name(),
                                existing = ?mine.value_type(),
                                incoming = ?theirs.value_type(),
                                "union merge on mismatched types, overwriting"
                            );
                            mine.assign(&theirs);
                            report.overwritten += 1;
                        }
                        MergingPolicy::Overwrite => {
                            mine.assign(&theirs);
                            report.overwritten += 1;
                        }
                    }
                }
            }
        }

        tracing::debug!(
            prefix,
            %policy,
            created = report.created,
            overwritten = report.overwritten,
            unioned = report.unioned,
            skipped = report.skipped,
            "merged configuration"
        );
        report
    }

    /// Merge every property of `source` with [`MergingPolicy::Overwrite`].
    pub fn merge_all<S: ConfigView + ?Sized>(&self, source: &S) -> MergeReport {
        self.merge(source, "", MergingPolicy::Overwrite)
    }

    /// Replace this config's properties with copies of `source`'s.
    pub fn assign<S: ConfigView + ?Sized>(&self, source: &S) -> MergeReport {
        self.assign_filtered(source, None)
    }

    /// Replace this config's properties with copies of the `source`
    /// properties whose names start with `prefix`.
    ///
    /// Assigning a config to itself keeps only the matching properties.
    pub fn assign_prefixed<S: ConfigView + ?Sized>(&self, source: &S, prefix: &str) -> MergeReport {
        self.assign_filtered(source, Some(prefix))
    }

    fn assign_filtered<S: ConfigView + ?Sized>(
        &self,
        source: &S,
        prefix: Option<&str>,
    ) -> MergeReport {
        let mut report = MergeReport::default();
        let _guard = self.bulk.lock();

        if same_instance(self, source) {
            if let Some(prefix) = prefix {
                let before = self.properties.len();
                self.properties.retain(|name, _| name.starts_with(prefix));
                report.removed = before - self.properties.len();
            }
            return report;
        }

        let snapshot = source.all_properties();
        report.removed = self.properties.len();
        self.properties.clear();
        for property in snapshot {
            if prefix.map_or(true, |p| property.name().starts_with(p)) {
                self.properties.insert(property.name().to_string(), property);
                report.created += 1;
            }
        }

        tracing::debug!(
            prefix = prefix.unwrap_or(""),
            assigned = report.created,
            removed = report.removed,
            "assigned configuration"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::PropertyType;

    fn dest_and_source() -> (Config, Config) {
        let dest = Config::new();
        dest.set("a", 1i32);
        let source = Config::new();
        source.set("a", 2i32);
        source.set("b", 3i32);
        (dest, source)
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("SKIP".parse::<MergingPolicy>().unwrap(), MergingPolicy::Skip);
        assert_eq!(" union ".parse::<MergingPolicy>().unwrap(), MergingPolicy::Union);
        assert!("append".parse::<MergingPolicy>().is_err());
        assert_eq!(MergingPolicy::from_str_lossy("append"), MergingPolicy::Overwrite);
        assert_eq!(MergingPolicy::default(), MergingPolicy::Overwrite);
    }

    #[test]
    fn test_policy_serde() {
        let json = serde_json::to_string(&MergingPolicy::Union).unwrap();
        assert_eq!(json, "\"union\"");
        let policy: MergingPolicy = serde_json::from_str("\"skip\"").unwrap();
        assert_eq!(policy, MergingPolicy::Skip);
    }

    #[test]
    fn test_merge_skip() {
        let (dest, source) = dest_and_source();
        let report = dest.merge(&source, "", MergingPolicy::Skip);
        assert_eq!(dest.get_int("a"), Some(1));
        assert_eq!(dest.get_int("b"), Some(3));
        assert_eq!(report.created, 1);
        assert_eq!(report.skipped, 1);
    }

    #[test]
    fn test_merge_overwrite() {
        let (dest, source) = dest_and_source();
        let report = dest.merge(&source, "", MergingPolicy::Overwrite);
        assert_eq!(dest.get_int("a"), Some(2));
        assert_eq!(dest.get_int("b"), Some(3));
        assert_eq!(report.overwritten, 1);
        assert_eq!(report.changed(), 2);
    }

    #[test]
    fn test_merge_union_same_type() {
        let (dest, source) = dest_and_source();
        dest.merge(&source, "", MergingPolicy::Union);
        assert_eq!(dest.get_values::<i32>("a"), vec![1, 2]);
        assert_eq!(dest.get_values::<i32>("b"), vec![3]);
    }

    #[test]
    fn test_merge_union_type_mismatch_overwrites() {
        let dest = Config::new();
        dest.set("a", 1i32);
        let source = Config::new();
        source.set_all("a", ["x", "y"]);

        let report = dest.merge(&source, "", MergingPolicy::Union);
        let a = dest.get("a").unwrap();
        assert_eq!(a.value_type(), Some(PropertyType::String));
        assert_eq!(a.values::<String>(), vec!["x", "y"]);
        assert_eq!(report.overwritten, 1);
    }

    #[test]
    fn test_merge_union_into_untyped_appends() {
        let dest = Config::new();
        dest.insert(Property::new("a").described("declared"));
        let source = Config::new();
        source.set_all("a", [1i64, 2]);

        let report = dest.merge(&source, "", MergingPolicy::Union);
        let a = dest.get("a").unwrap();
        assert_eq!(a.value_type(), Some(PropertyType::Long));
        assert_eq!(a.values::<i64>(), vec![1, 2]);
        assert_eq!(a.description(), Some("declared"));
        assert_eq!(report.unioned, 1);
        assert_eq!(report.overwritten, 0);
    }

    #[test]
    fn test_merge_union_from_untyped_keeps_values() {
        let dest = Config::new();
        dest.set("a", 1i32);
        let source = Config::new();
        source.insert(Property::new("a"));

        let report = dest.merge(&source, "", MergingPolicy::Union);
        assert_eq!(dest.get_values::<i32>("a"), vec![1]);
        assert_eq!(report.unioned, 1);
    }

    #[test]
    fn test_merge_respects_final() {
        for policy in [MergingPolicy::Union, MergingPolicy::Overwrite] {
            let (dest, source) = dest_and_source();
            dest.mark_final("a", true);
            let report = dest.merge(&source, "", policy);
            assert_eq!(dest.get_values::<i32>("a"), vec![1], "{}", policy);
            assert_eq!(report.skipped, 1);
        }
    }

    #[test]
    fn test_merge_copies_final_flag_and_description() {
        let dest = Config::new();
        let source = Config::new();
        source.insert(Property::with_value("a", 1i32).finalized(true).described("d"));
        dest.merge(&source, "", MergingPolicy::Skip);
        assert_eq!(dest.get("a"), source.get("a"));
    }

    #[test]
    fn test_merge_prefix_filter() {
        let dest = Config::new();
        let source = Config::new();
        source.set("x.a", 1i32);
        source.set("y.b", 2i32);
        dest.merge(&source, "x.", MergingPolicy::Overwrite);
        assert_eq!(dest.names(), vec!["x.a"]);
    }

    #[test]
    fn test_merge_into_self_is_noop() {
        let config = Config::new();
        config.set("a", 1i32);
        let report = config.merge(&config, "", MergingPolicy::Union);
        assert_eq!(report, MergeReport::default());
        assert_eq!(config.get_values::<i32>("a"), vec![1]);
    }

    #[test]
    fn test_merge_leaves_source_untouched() {
        let (dest, source) = dest_and_source();
        let before = source.clone();
        dest.merge(&source, "", MergingPolicy::Union);
        dest.add("b", 9i32).unwrap();
        assert_eq!(source, before);
    }

    #[test]
    fn test_assign_replaces_everything() {
        let (dest, source) = dest_and_source();
        dest.set("only_in_dest", true);
        let report = dest.assign(&source);
        assert_eq!(dest, source);
        assert_eq!(report.created, 2);
        assert_eq!(report.removed, 2);
    }

    #[test]
    fn test_assign_prefixed() {
        let dest = Config::new();
        dest.set("z", 0i32);
        let source = Config::new();
        source.set("x.a", 1i32);
        source.set("y.b", 2i32);
        dest.assign_prefixed(&source, "x.");
        assert_eq!(dest.names(), vec!["x.a"]);
    }

    #[test]
    fn test_self_assign_with_prefix_filters_in_place() {
        let config = Config::new();
        config.set("x.a", 1i32);
        config.set("y.b", 2i32);
        let report = config.assign_prefixed(&config, "x.");
        assert_eq!(config.names(), vec!["x.a"]);
        assert_eq!(config.get_int("x.a"), Some(1));
        assert_eq!(report.removed, 1);
    }

    #[test]
    fn test_self_assign_without_prefix_keeps_everything() {
        let config = Config::new();
        config.set("a", 1i32);
        config.assign(&config);
        assert_eq!(config.get_int("a"), Some(1));
    }
}
