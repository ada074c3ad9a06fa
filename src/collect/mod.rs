//! Shared primitive-typed lists and read-only views over them.
//!
//! One generic implementation covers every primitive element kind
//! (`bool`, `i8`, `char`, `i16`, `i32`, `i64`, `f32`, `f64`). A
//! [`PrimitiveList`] is a cheaply clonable handle to one shared, growable
//! list. An [`Unmodifiable`] view wraps any [`PrimitiveCollection`],
//! reads its live contents and rejects every mutation with
//! [`CollectionError::Unsupported`]; [`UnmodifiableList`] is the view over a
//! [`PrimitiveList`].

mod iter;
mod list;
mod unmodifiable;

use std::fmt;

use thiserror::Error;

pub use iter::PrimitiveIter;
pub use list::PrimitiveList;
pub use unmodifiable::{IntoUnmodifiable, Unmodifiable, UnmodifiableList};

mod private {
    pub trait Sealed {}
}

/// Element kinds a primitive collection can hold.
pub trait Primitive: private::Sealed + Copy + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Name of the element kind, e.g. `"int"`.
    const KIND: &'static str;
}

macro_rules! primitive_kinds {
    ($($rust:ty => $kind:literal),* $(,)?) => {
        $(
            impl private::Sealed for $rust {}

            impl Primitive for $rust {
                const KIND: &'static str = $kind;
            }
        )*
    };
}

primitive_kinds! {
    bool => "boolean",
    i8 => "byte",
    char => "char",
    i16 => "short",
    i32 => "int",
    i64 => "long",
    f32 => "float",
    f64 => "double",
}

/// Errors from collection operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectionError {
    /// Mutation attempted through a read-only view.
    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),

    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// `remove` on an iterator that has not yielded an element since the
    /// last removal.
    #[error("iterator has no current element")]
    NoCurrentElement,
}

/// Read and write access to a collection of primitives.
///
/// Mutators take `&self`: implementations are shared handles.
pub trait PrimitiveCollection<T: Primitive> {
    fn size(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    fn contains(&self, value: T) -> bool;

    /// Snapshot of the current elements.
    fn to_vec(&self) -> Vec<T>;

    /// Cursor over the live elements.
    fn iter(&self) -> PrimitiveIter<T>;

    /// Append `value`; returns whether the collection changed.
    fn add(&self, value: T) -> Result<bool, CollectionError>;

    /// Remove the first occurrence of `value`; returns whether it was found.
    fn remove(&self, value: T) -> Result<bool, CollectionError>;

    fn clear(&self) -> Result<(), CollectionError>;
}

/// Index-based access on top of [`PrimitiveCollection`].
pub trait PrimitiveSequence<T: Primitive>: PrimitiveCollection<T> {
    fn get(&self, index: usize) -> Option<T>;

    fn index_of(&self, value: T) -> Option<usize>;

    fn last_index_of(&self, value: T) -> Option<usize>;

    /// Replace the element at `index`, returning the old one.
    fn set(&self, index: usize, value: T) -> Result<T, CollectionError>;

    /// Insert at `index`, shifting later elements; `index == size()` appends.
    fn insert(&self, index: usize, value: T) -> Result<(), CollectionError>;

    fn remove_at(&self, index: usize) -> Result<T, CollectionError>;

    /// Snapshot of the elements in `from..to`.
    fn sub_list(&self, from: usize, to: usize) -> Result<Vec<T>, CollectionError>;
}
