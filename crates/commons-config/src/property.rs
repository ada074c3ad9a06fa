//! Named, typed, multi-valued configuration entry.

use crate::error::PropertyError;
use crate::value::{ClassName, EnumValue, FromValue, IntoValue, PropertyType, Value};

/// A named property holding zero or more values of one [`PropertyType`].
///
/// The type follows the most recent `set*` call. The final flag only
/// protects the property from being replaced by a merge; setters still
/// apply.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    name: String,
    ty: Option<PropertyType>,
    values: Vec<Value>,
    is_final: bool,
    description: Option<String>,
}

impl Property {
    /// Create an empty, untyped property.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
            values: Vec::new(),
            is_final: false,
            description: None,
        }
    }

    /// Create a property holding a single value.
    pub fn with_value<V: IntoValue>(name: impl Into<String>, value: V) -> Self {
        let mut property = Self::new(name);
        property.set(value);
        property
    }

    /// Create a property holding the given values.
    pub fn with_values<V, I>(name: impl Into<String>, values: I) -> Self
    where
        V: IntoValue,
        I: IntoIterator<Item = V>,
    {
        let mut property = Self::new(name);
        property.set_all(values);
        property
    }

    /// Builder-style final flag.
    pub fn finalized(mut self, is_final: bool) -> Self {
        self.is_final = is_final;
        self
    }

    /// Builder-style description.
    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Element type; `None` while the property is untyped.
    pub fn value_type(&self) -> Option<PropertyType> {
        self.ty
    }

    pub fn raw_values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// True when the first entry is a null.
    pub fn is_null(&self) -> bool {
        self.values.first().is_some_and(Value::is_null)
    }

    pub fn is_final(&self) -> bool {
        self.is_final
    }

    pub fn set_final(&mut self, is_final: bool) {
        self.is_final = is_final;
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: Option<String>) {
        self.description = description;
    }

    /// Replace all values with `value` and retype the property.
    pub fn set<V: IntoValue>(&mut self, value: V) {
        self.ty = Some(V::TYPE);
        self.values.clear();
        self.values.push(value.into_value());
    }

    /// Replace all values with `values` and retype the property.
    ///
    /// An empty iterator leaves the property typed with no values.
    pub fn set_all<V, I>(&mut self, values: I)
    where
        V: IntoValue,
        I: IntoIterator<Item = V>,
    {
        self.ty = Some(V::TYPE);
        self.values = values.into_iter().map(IntoValue::into_value).collect();
    }

    /// Replace all values with a single null entry of a reference type.
    pub fn set_null(&mut self, ty: PropertyType) -> Result<(), PropertyError> {
        if !ty.is_reference() {
            return Err(PropertyError::NullNotAllowed {
                name: self.name.clone(),
                ty,
            });
        }
        self.ty = Some(ty);
        self.values.clear();
        self.values.push(Value::Null);
        Ok(())
    }

    /// Append a value.
    ///
    /// A property with no values takes on the new type, as with [`set`].
    ///
    /// [`set`]: Property::set
    pub fn add<V: IntoValue>(&mut self, value: V) -> Result<(), PropertyError> {
        self.check_append(V::TYPE)?;
        self.ty = Some(V::TYPE);
        self.values.push(value.into_value());
        Ok(())
    }

    /// Append several values; nothing is appended on a type mismatch.
    pub fn add_all<V, I>(&mut self, values: I) -> Result<(), PropertyError>
    where
        V: IntoValue,
        I: IntoIterator<Item = V>,
    {
        self.check_append(V::TYPE)?;
        self.ty = Some(V::TYPE);
        self.values.extend(values.into_iter().map(IntoValue::into_value));
        Ok(())
    }

    fn check_append(&self, ty: PropertyType) -> Result<(), PropertyError> {
        match self.ty {
            Some(current) if current != ty && !self.values.is_empty() => {
                Err(PropertyError::TypeMismatch {
                    name: self.name.clone(),
                    expected: current,
                    actual: ty,
                })
            }
            _ => Ok(()),
        }
    }

    /// Remove every value and the type.
    pub fn clear(&mut self) {
        self.ty = None;
        self.values.clear();
    }

    /// Copy name, description, final flag, type and values from `other`.
    pub fn assign(&mut self, other: &Property) {
        self.clone_from(other);
    }

    /// Append `other`'s values after this property's values.
    pub fn union_values(&mut self, other: &Property) -> Result<(), PropertyError> {
        match (self.ty, other.ty) {
            (Some(mine), Some(theirs)) if mine != theirs => Err(PropertyError::TypeMismatch {
                name: self.name.clone(),
                expected: mine,
                actual: theirs,
            }),
            (None, theirs) => {
                self.ty = theirs;
                self.values.extend(other.values.iter().cloned());
                Ok(())
            }
            _ => {
                self.values.extend(other.values.iter().cloned());
                Ok(())
            }
        }
    }

    /// First value converted to `T`.
    pub fn get<T: FromValue>(&self) -> Option<T> {
        self.values.first().and_then(T::from_value)
    }

    /// All values converted to `T`; entries of another type are skipped.
    pub fn values<T: FromValue>(&self) -> Vec<T> {
        self.values.iter().filter_map(T::from_value).collect()
    }

    pub fn get_bool(&self) -> Option<bool> {
        self.get()
    }

    pub fn get_int(&self) -> Option<i32> {
        self.get()
    }

    pub fn get_long(&self) -> Option<i64> {
        self.get()
    }

    pub fn get_double(&self) -> Option<f64> {
        self.get()
    }

    pub fn get_string(&self) -> Option<String> {
        self.get()
    }

    pub fn get_enum(&self) -> Option<EnumValue> {
        self.get()
    }

    pub fn get_class(&self) -> Option<ClassName> {
        self.get()
    }

    /// Text forms of all values; null entries are skipped.
    pub fn texts(&self) -> Vec<String> {
        self.values.iter().filter_map(Value::to_text).collect()
    }

    /// Rebuild a property from decoded parts, checking that every value
    /// matches the declared type.
    pub(crate) fn from_parts(
        name: String,
        ty: Option<PropertyType>,
        values: Vec<Value>,
        is_final: bool,
        description: Option<String>,
    ) -> Result<Self, PropertyError> {
        for value in &values {
            match (ty, value.value_type()) {
                (Some(declared), Some(actual)) if declared != actual => {
                    return Err(PropertyError::TypeMismatch {
                        name,
                        expected: declared,
                        actual,
                    });
                }
                (Some(declared), None) if !declared.is_reference() => {
                    return Err(PropertyError::NullNotAllowed { name, ty: declared });
                }
                _ => {}
            }
        }
        Ok(Self {
            name,
            ty,
            values,
            is_final,
            description,
        })
    }
}
