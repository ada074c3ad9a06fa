//! Thread-safe, name-keyed property store.

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};

use crate::error::ConfigResult;
use crate::property::Property;
use crate::value::{FromValue, IntoValue, PropertyType};

/// Read-only lookup shared by [`Config`] and [`StackConfig`].
///
/// Lookups return owned snapshots; the underlying store may keep changing.
///
/// [`StackConfig`]: crate::StackConfig
pub trait ConfigView {
    /// Snapshot of the named property.
    fn property(&self, name: &str) -> Option<Property>;

    fn contains_name(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

    /// All property names, sorted.
    fn property_names(&self) -> Vec<String>;

    /// Snapshot of all properties, sorted by name.
    fn all_properties(&self) -> Vec<Property>;
}

/// A mutable configuration: a set of uniquely named [`Property`] entries.
///
/// Every single-name operation is atomic: creating a missing property and
/// mutating it happen under the same map entry lock. No guarantee spans
/// several names, except that [`merge`](Config::merge) and
/// [`assign`](Config::assign) are serialized per instance.
#[derive(Debug, Default)]
pub struct Config {
    description: RwLock<Option<String>>,
    pub(crate) properties: DashMap<String, Property>,
    pub(crate) bulk: Mutex<()>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_description(description: impl Into<String>) -> Self {
        let config = Self::new();
        config.set_description(Some(description.into()));
        config
    }

    /// Build a config from ready-made properties; later duplicates win.
    pub fn from_properties<I: IntoIterator<Item = Property>>(properties: I) -> Self {
        let config = Self::new();
        for property in properties {
            config.insert(property);
        }
        config
    }

    pub fn description(&self) -> Option<String> {
        self.description.read().clone()
    }

    pub fn set_description(&self, description: Option<String>) {
        *self.description.write() = description;
    }

    /// Create the property if absent, then run `f` on it under the entry
    /// lock.
    pub(crate) fn upsert<R>(&self, name: &str, f: impl FnOnce(&mut Property) -> R) -> R {
        let mut entry = self
            .properties
            .entry(name.to_string())
            .or_insert_with(|| Property::new(name));
        f(entry.value_mut())
    }

    /// Replace the values of `name` with a single value.
    pub fn set<V: IntoValue>(&self, name: &str, value: V) {
        self.upsert(name, |p| p.set(value));
    }

    /// Like [`set`](Config::set), also setting the final flag.
    pub fn set_final<V: IntoValue>(&self, name: &str, value: V, is_final: bool) {
        self.upsert(name, |p| {
            p.set(value);
            p.set_final(is_final);
        });
    }

    /// Replace the values of `name` with `values`.
    pub fn set_all<V, I>(&self, name: &str, values: I)
    where
        V: IntoValue,
        I: IntoIterator<Item = V>,
    {
        self.upsert(name, |p| p.set_all(values));
    }

    /// Replace the values of `name` with a single null entry.
    pub fn set_null(&self, name: &str, ty: PropertyType) -> ConfigResult<()> {
        self.upsert(name, |p| p.set_null(ty))?;
        Ok(())
    }

    /// Append a value to `name`, creating the property if needed.
    pub fn add<V: IntoValue>(&self, name: &str, value: V) -> ConfigResult<()> {
        self.upsert(name, |p| p.add(value))?;
        Ok(())
    }

    /// Append several values to `name`, creating the property if needed.
    pub fn add_all<V, I>(&self, name: &str, values: I) -> ConfigResult<()>
    where
        V: IntoValue,
        I: IntoIterator<Item = V>,
    {
        self.upsert(name, |p| p.add_all(values))?;
        Ok(())
    }

    /// Set the final flag of an existing property.
    ///
    /// Returns `false` when no property has that name.
    pub fn mark_final(&self, name: &str, is_final: bool) -> bool {
        match self.properties.get_mut(name) {
            Some(mut p) => {
                p.set_final(is_final);
                true
            }
            None => false,
        }
    }

    /// Set the description of an existing property.
    pub fn describe(&self, name: &str, description: Option<String>) -> bool {
        match self.properties.get_mut(name) {
            Some(mut p) => {
                p.set_description(description);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<Property> {
        self.properties.get(name).map(|p| p.value().clone())
    }

    /// First value of `name` converted to `T`.
    pub fn get_value<T: FromValue>(&self, name: &str) -> Option<T> {
        self.properties.get(name).and_then(|p| p.value().get())
    }

    /// All values of `name` converted to `T`.
    pub fn get_values<T: FromValue>(&self, name: &str) -> Vec<T> {
        self.properties
            .get(name)
            .map(|p| p.value().values())
            .unwrap_or_default()
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.get_value(name)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get_value(name)
    }

    pub fn get_int(&self, name: &str) -> Option<i32> {
        self.get_value(name)
    }

    pub fn get_long(&self, name: &str) -> Option<i64> {
        self.get_value(name)
    }

    pub fn get_double(&self, name: &str) -> Option<f64> {
        self.get_value(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    pub fn remove(&self, name: &str) -> Option<Property> {
        self.properties.remove(name).map(|(_, p)| p)
    }

    /// Insert or replace a property under its own name.
    ///
    /// Returns the property previously stored under that name.
    pub fn insert(&self, property: Property) -> Option<Property> {
        self.properties.insert(property.name().to_string(), property)
    }

    /// Remove every property.
    pub fn clear(&self) {
        self.properties.clear();
    }

    /// Clear the values of one property, keeping the entry.
    ///
    /// Returns a snapshot of the cleared property, or `None` if absent.
    pub fn clear_property(&self, name: &str) -> Option<Property> {
        let mut property = self.properties.get_mut(name)?;
        property.clear();
        Some(property.value().clone())
    }

    /// Property names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.properties.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Snapshot of every property, sorted by name.
    pub fn properties(&self) -> Vec<Property> {
        let mut properties: Vec<Property> =
            self.properties.iter().map(|e| e.value().clone()).collect();
        properties.sort_by(|a, b| a.name().cmp(b.name()));
        properties
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Deep copy of every property.
impl Clone for Config {
    fn clone(&self) -> Self {
        let copy = Self::new();
        copy.set_description(self.description());
        for property in self.properties() {
            copy.insert(property);
        }
        copy
    }
}

/// Two configs are equal when they hold equal properties; the description
/// is not compared.
impl PartialEq for Config {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        self.properties() == other.properties()
    }
}

impl ConfigView for Config {
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
