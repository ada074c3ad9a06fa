//! Stack of configuration layers resolved top-down.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::{Config, ConfigView};
use crate::property::Property;

/// An ordered stack of shared [`Config`] layers.
///
/// Lookups scan from the top (last pushed) to the bottom, so upper layers
/// shadow lower layers holding the same name. The layers stay shared: a
/// change made through any handle is visible through the stack.
#[derive(Debug, Clone, Default)]
pub struct StackConfig {
    layers: Vec<Arc<Config>>,
}

impl StackConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a stack from bottom to top.
    pub fn from_layers<I: IntoIterator<Item = Arc<Config>>>(layers: I) -> Self {
        Self {
            layers: layers.into_iter().collect(),
        }
    }

    /// Push a layer on top.
    pub fn push(&mut self, layer: Arc<Config>) {
        self.layers.push(layer);
    }

    /// Remove and return the top layer.
    pub fn pop(&mut self) -> Option<Arc<Config>> {
        self.layers.pop()
    }

    pub fn top(&self) -> Option<&Arc<Config>> {
        self.layers.last()
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Layers from top to bottom.
    pub fn layers(&self) -> impl Iterator<Item = &Arc<Config>> {
        self.layers.iter().rev()
    }

    pub fn get(&self, name: &str) -> Option<Property> {
        self.layers().find_map(|layer| layer.get(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.layers().any(|layer| layer.contains(name))
    }

    /// Names across all layers, sorted.
    pub fn names(&self) -> Vec<String> {
        self.properties()
            .into_iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    /// Visible properties across all layers, sorted by name; the topmost
    /// layer wins on name collision.
    pub fn properties(&self) -> Vec<Property> {
        let mut visible: BTreeMap<String, Property> = BTreeMap::new();
        for layer in self.layers() {
            for property in layer.properties() {
                visible.entry(property.name().to_string()).or_insert(property);
            }
        }
        visible.into_values().collect()
    }

    /// Copy the visible properties into a standalone config.
    pub fn flatten(&self) -> Config {
        Config::from_properties(self.properties())
    }
}

impl ConfigView for StackConfig {
    fn property(&self, name: &str) -> Option<Property> {
        self.get(name)
    }

    fn contains_name(&self, name: &str) -> bool {
        self.contains(name)
    }

    fn property_names(&self) -> Vec<String> {
        self.names()
    }

    fn all_properties(&self) -> Vec<Property> {
        self.properties()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::MergingPolicy;

    fn layered() -> (Arc<Config>, Arc<Config>, StackConfig) {
        let defaults = Arc::new(Config::new());
        defaults.set("timeout", 30i32);
        defaults.set("mode", "safe");
        let overrides = Arc::new(Config::new());
        overrides.set("timeout", 5i32);
        overrides.set("debug", true);
        let stack = StackConfig::from_layers([Arc::clone(&defaults), Arc::clone(&overrides)]);
        (defaults, overrides, stack)
    }

    #[test]
    fn test_top_shadows_bottom() {
        let (_, _, stack) = layered();
        assert_eq!(stack.get("timeout").unwrap().get_int(), Some(5));
        assert_eq!(stack.get("mode").unwrap().get_string().as_deref(), Some("safe"));
        assert!(stack.contains("debug"));
        assert!(!stack.contains("missing"));
    }

    #[test]
    fn test_names_union_across_layers() {
        let (_, _, stack) = layered();
        assert_eq!(stack.names(), vec!["debug", "mode", "timeout"]);
        let props = stack.properties();
        let timeout = props.iter().find(|p| p.name() == "timeout").unwrap();
        assert_eq!(timeout.get_int(), Some(5));
    }

    #[test]
    fn test_pop_reveals_lower_layer() {
        let (_, overrides, mut stack) = layered();
        let popped = stack.pop().unwrap();
        assert!(Arc::ptr_eq(&popped, &overrides));
        assert_eq!(stack.get("timeout").unwrap().get_int(), Some(30));
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_layers_stay_live() {
        let (defaults, _, stack) = layered();
        defaults.set("extra", 1i64);
        assert_eq!(stack.get("extra").unwrap().get_long(), Some(1));
    }

    #[test]
    fn test_merge_from_stack() {
        let (_, _, stack) = layered();
        let target = Config::new();
        target.merge(&stack, "", MergingPolicy::Overwrite);
        assert_eq!(target, stack.flatten());
        assert_eq!(target.get_int("timeout"), Some(5));
    }
}
