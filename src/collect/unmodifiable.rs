use std::fmt;

use super::{CollectionError, Primitive, PrimitiveCollection, PrimitiveIter, PrimitiveList, PrimitiveSequence};

/// Read-only view over any primitive collection.
///
/// Reads go to the wrapped collection as it is at that moment, not a
/// snapshot taken at wrap time. Every mutator fails with
/// [`CollectionError::Unsupported`]; when the wrapped collection is also a
/// [`PrimitiveSequence`], so is the view. The wrapped collection is never
/// handed back out.
#[derive(Clone)]
pub struct Unmodifiable<C> {
    inner: C,
}

/// Read-only view over a [`PrimitiveList`].
pub type UnmodifiableList<T> = Unmodifiable<PrimitiveList<T>>;

/// Conversion into a read-only view; an existing view converts to itself.
pub trait IntoUnmodifiable {
    type Inner;

    fn into_unmodifiable(self) -> Unmodifiable<Self::Inner>;
}

impl<T: Primitive> IntoUnmodifiable for PrimitiveList<T> {
    type Inner = PrimitiveList<T>;

    fn into_unmodifiable(self) -> UnmodifiableList<T> {
        Unmodifiable::new(self)
    }
}

impl<T: Primitive> IntoUnmodifiable for &PrimitiveList<T> {
    type Inner = PrimitiveList<T>;

    fn into_unmodifiable(self) -> UnmodifiableList<T> {
        self.unmodifiable()
    }
}

impl<C> IntoUnmodifiable for Unmodifiable<C> {
    type Inner = C;

    fn into_unmodifiable(self) -> Unmodifiable<C> {
        self
    }
}

impl<C> Unmodifiable<C> {
    /// View over `inner`, whatever collection it is.
    pub fn new(inner: C) -> Self {
        Self { inner }
    }

    /// View over a list or an existing view; a view is returned unchanged.
    pub fn wrap(source: impl IntoUnmodifiable<Inner = C>) -> Self {
        source.into_unmodifiable()
    }
}

impl<T: Primitive> Unmodifiable<PrimitiveList<T>> {
    /// Whether this view reads `list`'s storage.
    pub fn is_view_of(&self, list: &PrimitiveList<T>) -> bool {
        self.inner.ptr_eq(list)
    }
}

impl<C: fmt::Debug> fmt::Debug for Unmodifiable<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Unmodifiable").field(&self.inner).finish()
    }
}

impl<T: Primitive, C: PrimitiveCollection<T>> PrimitiveCollection<T> for Unmodifiable<C> {
    fn size(&self) -> usize {
        self.inner.size()
    }

    fn contains(&self, value: T) -> bool {
        self.inner.contains(value)
    }

    fn to_vec(&self) -> Vec<T> {
        self.inner.to_vec()
    }

    fn iter(&self) -> PrimitiveIter<T> {
        self.inner.iter().unmodifiable()
    }

    fn add(&self, _value: T) -> Result<bool, CollectionError> {
        Err(CollectionError::Unsupported("add"))
    }

    fn remove(&self, _value: T) -> Result<bool, CollectionError> {
        Err(CollectionError::Unsupported("remove"))
    }

    fn clear(&self) -> Result<(), CollectionError> {
        Err(CollectionError::Unsupported("clear"))
    }
}

impl<T: Primitive, C: PrimitiveSequence<T>> PrimitiveSequence<T> for Unmodifiable<C> {
    fn get(&self, index: usize) -> Option<T> {
        self.inner.get(index)
    }

    fn index_of(&self, value: T) -> Option<usize> {
        self.inner.index_of(value)
    }

    fn last_index_of(&self, value: T) -> Option<usize> {
        self.inner.last_index_of(value)
    }

    fn set(&self, _index: usize, _value: T) -> Result<T, CollectionError> {
        Err(CollectionError::Unsupported("set"))
    }

    fn insert(&self, _index: usize, _value: T) -> Result<(), CollectionError> {
        Err(CollectionError::Unsupported("insert"))
    }

    fn remove_at(&self, _index: usize) -> Result<T, CollectionError> {
        Err(CollectionError::Unsupported("remove_at"))
    }

    fn sub_list(&self, from: usize, to: usize) -> Result<Vec<T>, CollectionError> {
        self.inner.sub_list(from, to)
    }
}
