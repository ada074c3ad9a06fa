use std::fmt;

use super::{CollectionError, Primitive, PrimitiveList};

/// Cursor over the live contents of a [`PrimitiveList`].
///
/// Each step reads the list as it is at that moment, so elements appended
/// during iteration are visited. Obtained from
/// [`PrimitiveCollection::iter`](super::PrimitiveCollection::iter); an
/// iterator from a read-only view rejects [`remove`](Self::remove).
pub struct PrimitiveIter<T> {
    list: PrimitiveList<T>,
    next: usize,
    last: Option<usize>,
    modifiable: bool,
}

impl<T: Primitive> PrimitiveIter<T> {
    pub(super) fn new(list: PrimitiveList<T>, modifiable: bool) -> Self {
        Self {
            list,
            next: 0,
            last: None,
            modifiable,
        }
    }

    /// The same cursor with removal disabled.
    pub fn unmodifiable(mut self) -> Self {
        self.modifiable = false;
        self
    }

    pub fn has_next(&self) -> bool {
        self.next < self.list.items.read().len()
    }

    /// Index of the element the next call to `next` returns.
    pub fn next_index(&self) -> usize {
        self.next
    }

    /// Remove the element most recently returned by `next`.
    pub fn remove(&mut self) -> Result<T, CollectionError> {
        if !self.modifiable {
            return Err(CollectionError::Unsupported("remove"));
        }
        let last = self.last.take().ok_or(CollectionError::NoCurrentElement)?;
        let mut items = self.list.items.write();
        if last >= items.len() {
            return Err(CollectionError::NoCurrentElement);
        }
        self.next = last;
        Ok(items.remove(last))
    }
}

impl<T: Primitive> Iterator for PrimitiveIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let value = self.list.items.read().get(self.next).copied()?;
        self.last = Some(self.next);
        self.next += 1;
        Some(value)
    }
}

impl<T: Primitive> fmt::Debug for PrimitiveIter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrimitiveIter")
            .field("next", &self.next)
            .field("modifiable", &self.modifiable)
            .finish_non_exhaustive()
    }
}
