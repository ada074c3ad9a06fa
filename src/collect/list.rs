use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use super::{
    CollectionError, Primitive, PrimitiveCollection, PrimitiveIter, PrimitiveSequence, Unmodifiable,
    UnmodifiableList,
};

/// A shared, growable list of primitives.
///
/// Clones share storage: a change through one handle is visible through
/// every clone and every view.
pub struct PrimitiveList<T> {
    pub(super) items: Arc<RwLock<Vec<T>>>,
}

impl<T: Primitive> PrimitiveList<T> {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            items: Arc::new(RwLock::new(items)),
        }
    }

    /// Read-only view over this list.
    pub fn unmodifiable(&self) -> UnmodifiableList<T> {
        Unmodifiable::new(self.clone())
    }

    /// Whether both handles share the same storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.items, &other.items)
    }
}

impl<T> Clone for PrimitiveList<T> {
    fn clone(&self) -> Self {
        Self {
            items: Arc::clone(&self.items),
        }
    }
}

impl<T: Primitive> Default for PrimitiveList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Primitive> fmt::Debug for PrimitiveList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.read().iter()).finish()
    }
}

impl<T: Primitive> From<Vec<T>> for PrimitiveList<T> {
    fn from(items: Vec<T>) -> Self {
        Self::from_vec(items)
    }
}

impl<T: Primitive> FromIterator<T> for PrimitiveList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

fn out_of_bounds(index: usize, len: usize) -> CollectionError {
    CollectionError::IndexOutOfBounds { index, len }
}

impl<T: Primitive> PrimitiveCollection<T> for PrimitiveList<T> {
    fn size(&self) -> usize {
        self.items.read().len()
    }

    fn contains(&self, value: T) -> bool {
        self.items.read().contains(&value)
    }

    fn to_vec(&self) -> Vec<T> {
        self.items.read().clone()
    }

    fn iter(&self) -> PrimitiveIter<T> {
        PrimitiveIter::new(self.clone(), true)
    }

    fn add(&self, value: T) -> Result<bool, CollectionError> {
        self.items.write().push(value);
        Ok(true)
    }

    fn remove(&self, value: T) -> Result<bool, CollectionError> {
        let mut items = self.items.write();
        match items.iter().position(|v| *v == value) {
            Some(index) => {
                items.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn clear(&self) -> Result<(), CollectionError> {
        self.items.write().clear();
        Ok(())
    }
}

impl<T: Primitive> PrimitiveSequence<T> for PrimitiveList<T> {
    fn get(&self, index: usize) -> Option<T> {
        self.items.read().get(index).copied()
    }

    fn index_of(&self, value: T) -> Option<usize> {
        self.items.read().iter().position(|v| *v == value)
    }

    fn last_index_of(&self, value: T) -> Option<usize> {
        self.items.read().iter().rposition(|v| *v == value)
    }

    fn set(&self, index: usize, value: T) -> Result<T, CollectionError> {
        let mut items = self.items.write();
        let len = items.len();
        let slot = items.get_mut(index).ok_or_else(|| out_of_bounds(index, len))?;
        Ok(std::mem::replace(slot, value))
    }

    fn insert(&self, index: usize, value: T) -> Result<(), CollectionError> {
        let mut items = self.items.write();
        if index > items.len() {
            return Err(out_of_bounds(index, items.len()));
        }
        items.insert(index, value);
        Ok(())
    }

    fn remove_at(&self, index: usize) -> Result<T, CollectionError> {
        let mut items = self.items.write();
        if index >= items.len() {
            return Err(out_of_bounds(index, items.len()));
        }
        Ok(items.remove(index))
    }

    fn sub_list(&self, from: usize, to: usize) -> Result<Vec<T>, CollectionError> {
        let items = self.items.read();
        if to > items.len() {
            return Err(out_of_bounds(to, items.len()));
        }
        if from > to {
            return Err(out_of_bounds(from, to));
        }
        Ok(items[from..to].to_vec())
    }
}
