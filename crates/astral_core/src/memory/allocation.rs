//! # Allocation Handles
//!
//! Arenas hand out offsets into their block rather than references, so
//! handles are plain `Copy` values that survive moves and clones of the
//! arena that produced them.

use std::fmt;
use std::marker::PhantomData;
use std::ops::Range;

/// A snapshot of an arena's top of stack.
///
/// Only meaningful for the arena it was taken from (or a clone of it).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Marker(pub(crate) usize);

impl Marker {
    /// Returns the marker's offset from the start of the block.
    #[inline]
    #[must_use]
    pub const fn offset(self) -> usize {
        self.0
    }
}

/// A byte range carved out of an arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StackAllocation {
    /// Offset of the first user byte from the start of the block.
    offset: usize,
    /// Size in bytes.
    size: usize,
}

impl StackAllocation {
    #[inline]
    pub(crate) const fn new(offset: usize, size: usize) -> Self {
        Self { offset, size }
    }

    /// Returns the offset of the first byte from the start of the block.
    #[inline]
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the size in bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` for a zero-sized allocation.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns the offset one past the last byte.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> usize {
        self.offset + self.size
    }

    #[inline]
    pub(crate) const fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.size
    }
}

/// A run of `count` elements of `T` carved out of a typed arena.
pub struct TypedAllocation<T> {
    raw: StackAllocation,
    count: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedAllocation<T> {
    #[inline]
    pub(crate) const fn new(raw: StackAllocation, count: usize) -> Self {
        Self {
            raw,
            count,
            _marker: PhantomData,
        }
    }

    /// Returns the number of elements.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` when no elements were requested.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the underlying byte range.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> StackAllocation {
        self.raw
    }
}

impl<T> Clone for TypedAllocation<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TypedAllocation<T> {}

impl<T> PartialEq for TypedAllocation<T> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw && self.count == other.count
    }
}

impl<T> Eq for TypedAllocation<T> {}

impl<T> fmt::Debug for TypedAllocation<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedAllocation")
            .field("type", &std::any::type_name::<T>())
            .field("offset", &self.raw.offset())
            .field("count", &self.count)
            .finish()
    }
}
