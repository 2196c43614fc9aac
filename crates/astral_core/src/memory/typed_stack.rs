//! # Typed Stack Allocator
//!
//! The header-based stack algorithm over an inline block, addressed in
//! elements of `T` instead of bytes. This is the allocator handed to
//! element-typed containers.
//!
//! Unlike [`StackAllocator`](super::stack::StackAllocator), every failure is
//! reported through [`AllocResult`], including out-of-order frees.

use std::fmt;
use std::marker::PhantomData;
use std::mem::{align_of, size_of};

use bytemuck::Pod;

use super::allocation::{Marker, StackAllocation, TypedAllocation};
use super::guard::{DefaultGuard, MemoryGuard, RegionAccess};
use super::header;
use super::utils::InlineBlock;
use crate::error::{AllocError, AllocResult};

/// An element-typed LIFO allocator over an inline `N`-byte block.
///
/// # Example
///
/// ```rust,ignore
/// let mut ids: TypedStackAllocator<u32, 1024> = TypedStackAllocator::new();
///
/// let batch = ids.allocate(16)?;
/// ids.slice_mut(batch).unwrap().fill(7);
/// ids.deallocate(batch)?;
/// ```
pub struct TypedStackAllocator<T, const N: usize, G = DefaultGuard> {
    /// Inline backing block.
    block: InlineBlock<N>,
    /// Offset of the top of the stack.
    current_marker: usize,
    /// Region guard notified of every access transition.
    guard: G,
    _element: PhantomData<fn() -> T>,
}

impl<T, const N: usize, G: MemoryGuard + Default> TypedStackAllocator<T, N, G> {
    /// Creates an empty allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::with_guard(G::default())
    }
}

impl<T, const N: usize, G: MemoryGuard> TypedStackAllocator<T, N, G> {
    const BLOCK_SIZE_CHECK: () = assert!(N > 0, "The memory block size must be greater than 0");

    /// Creates an empty allocator reporting region transitions to `guard`.
    #[must_use]
    pub fn with_guard(mut guard: G) -> Self {
        let () = Self::BLOCK_SIZE_CHECK;
        let mut block = InlineBlock::zeroed();
        guard.set_region_access(&mut block.0, 0..N, RegionAccess::AccessRestricted);
        Self {
            block,
            current_marker: 0,
            guard,
            _element: PhantomData,
        }
    }

    /// Returns the total capacity in bytes.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Returns the number of bytes between the start of the block and the top.
    #[inline]
    #[must_use]
    pub const fn used_block_size(&self) -> usize {
        self.current_marker
    }

    /// Returns a marker for the current top of the stack.
    #[inline]
    #[must_use]
    pub const fn marker(&self) -> Marker {
        Marker(self.current_marker)
    }

    /// Returns the region guard.
    #[inline]
    #[must_use]
    pub const fn guard(&self) -> &G {
        &self.guard
    }

    /// Allocates room for `count` elements of `T`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::SizeOverflow`] if the byte size overflows,
    /// [`AllocError::OutOfMemory`] if the request does not fit, and
    /// [`AllocError::UnsupportedAlignment`] if `T` is over-aligned.
    pub fn allocate(&mut self, count: usize) -> AllocResult<TypedAllocation<T>> {
        let size = count
            .checked_mul(size_of::<T>())
            .ok_or(AllocError::SizeOverflow {
                count,
                element_size: size_of::<T>(),
            })?;

        let offset = header::push(
            &mut self.block.0,
            &mut self.current_marker,
            &mut self.guard,
            size,
            align_of::<T>(),
        )?;
        Ok(TypedAllocation::new(StackAllocation::new(offset, size), count))
    }

    /// Releases the most recent allocation.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::OutOfOrderDeallocation`] if `allocation` is not
    /// the most recent live allocation. The allocator is unchanged on error.
    pub fn deallocate(&mut self, allocation: TypedAllocation<T>) -> AllocResult<()> {
        let raw = allocation.as_bytes();
        header::pop(
            &mut self.block.0,
            &mut self.current_marker,
            &mut self.guard,
            raw.offset(),
            raw.len(),
        )
    }

    /// Releases everything allocated after `marker` was taken.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::InvalidMarker`] if `marker` lies above the top.
    pub fn rollback_to_marker(&mut self, marker: Marker) -> AllocResult<()> {
        header::rollback(
            &mut self.block.0,
            &mut self.current_marker,
            &mut self.guard,
            marker.offset(),
        )
    }

    /// Releases every allocation.
    pub fn reset(&mut self) {
        let current = self.current_marker;
        self.guard
            .set_region_access(&mut self.block.0, 0..current, RegionAccess::AccessRestricted);
        self.current_marker = 0;
    }

    /// Returns an empty allocator for another element type.
    ///
    /// The new allocator has the same capacity and a copy of the guard. It
    /// does not share memory with `self`.
    #[must_use]
    pub fn rebind<U>(&self) -> TypedStackAllocator<U, N, G>
    where
        G: Clone,
    {
        TypedStackAllocator::with_guard(self.guard.clone())
    }

    /// Returns the address of the first element of `allocation`.
    #[inline]
    #[must_use]
    pub fn as_ptr(&self, allocation: TypedAllocation<T>) -> *const T {
        self.block
            .0
            .as_ptr()
            .wrapping_add(allocation.as_bytes().offset())
            .cast()
    }

    fn live_range(&self, allocation: TypedAllocation<T>) -> Option<std::ops::Range<usize>> {
        let raw = allocation.as_bytes();
        (raw.end() <= self.current_marker).then(|| raw.range())
    }
}

impl<T: Pod, const N: usize, G: MemoryGuard> TypedStackAllocator<T, N, G> {
    /// Returns the elements of a live allocation.
    ///
    /// Returns `None` if the allocation lies above the current top.
    #[must_use]
    pub fn slice(&self, allocation: TypedAllocation<T>) -> Option<&[T]> {
        let range = self.live_range(allocation)?;
        bytemuck::try_cast_slice(&self.block.0[range]).ok()
    }

    /// Returns the elements of a live allocation mutably.
    ///
    /// Returns `None` if the allocation lies above the current top.
    pub fn slice_mut(&mut self, allocation: TypedAllocation<T>) -> Option<&mut [T]> {
        let range = self.live_range(allocation)?;
        bytemuck::try_cast_slice_mut(&mut self.block.0[range]).ok()
    }
}

impl<T, const N: usize, G: Clone> Clone for TypedStackAllocator<T, N, G> {
    fn clone(&self) -> Self {
        Self {
            block: self.block,
            current_marker: self.current_marker,
            guard: self.guard.clone(),
            _element: PhantomData,
        }
    }
}

impl<T, const N: usize, G: MemoryGuard + Default> Default for TypedStackAllocator<T, N, G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, const N: usize, G> fmt::Debug for TypedStackAllocator<T, N, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedStackAllocator")
            .field("element", &std::any::type_name::<T>())
            .field("capacity", &N)
            .field("current_marker", &self.current_marker)
            .finish_non_exhaustive()
    }
}
