//! # Stack Allocator
//!
//! A heap-backed LIFO arena with per-allocation alignment, marker rollback
//! and resize-when-empty.

use super::allocation::{Marker, StackAllocation};
use super::frame::StackFrame;
use super::guard::{DefaultGuard, MemoryGuard, PatternGuard, RegionAccess};
use super::header;
use super::utils::{alloc_max_aligned_block, resize_memory_block, MemoryBlock};
use crate::config::StackConfig;
use crate::error::{AllocError, AllocResult};

/// A stack-discipline allocator over a single heap block.
///
/// Allocations are carved from the top of the block and must be released in
/// reverse order, either one by one with [`deallocate`](Self::deallocate) or
/// in bulk by rolling back to a [`Marker`].
///
/// # Memory Layout
///
/// ```text
/// [start]--[hdr|alloc1]--[pad|hdr|alloc2]--[top]------free------[end]
/// ```
///
/// # Thread Safety
///
/// This allocator is NOT thread-safe. Use one allocator per thread.
///
/// # Example
///
/// ```rust,ignore
/// let mut stack = StackAllocator::new(64 * 1024);
///
/// let bottom = stack.marker();
/// let verts = stack.allocate(1024, 16)?;
/// let indices = stack.allocate(256, 4)?;
///
/// stack.deallocate(indices);
/// stack.rollback_to_marker(bottom);
/// ```
#[derive(Clone)]
pub struct StackAllocator<G = DefaultGuard> {
    /// Owned backing block.
    block: MemoryBlock,
    /// Offset of the top of the stack.
    current_marker: usize,
    /// Region guard notified of every access transition.
    guard: G,
}

impl<G: MemoryGuard + Default> StackAllocator<G> {
    /// Creates a new allocator with a block of `capacity` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or the block cannot be allocated.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::with_guard(capacity, G::default())
    }
}

impl<G: MemoryGuard> StackAllocator<G> {
    /// Creates a new allocator reporting region transitions to `guard`.
    ///
    /// The whole block starts out restricted.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or the block cannot be allocated.
    #[must_use]
    pub fn with_guard(capacity: usize, guard: G) -> Self {
        match Self::try_with_guard(capacity, guard) {
            Ok(allocator) => allocator,
            Err(err) => panic!("{err}"),
        }
    }

    fn try_with_guard(capacity: usize, mut guard: G) -> AllocResult<Self> {
        if capacity == 0 {
            return Err(AllocError::ZeroCapacity);
        }
        let mut block = alloc_max_aligned_block(capacity).ok_or(AllocError::OutOfMemory {
            requested: capacity,
            alignment: super::utils::BLOCK_ALIGNMENT,
            available: 0,
        })?;
        guard.set_region_access(block.as_bytes_mut(), 0..capacity, RegionAccess::AccessRestricted);

        Ok(Self {
            block,
            current_marker: 0,
            guard,
        })
    }

    /// Returns the total capacity in bytes.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.block.len()
    }

    /// Returns the number of bytes between the start of the block and the top.
    ///
    /// Includes headers and alignment padding.
    #[inline]
    #[must_use]
    pub const fn used_block_size(&self) -> usize {
        self.current_marker
    }

    /// Returns the number of bytes above the top.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.block.len() - self.current_marker
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

    /// Allocates `size` bytes aligned to `alignment`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::OutOfMemory`] if the request does not fit and
    /// [`AllocError::UnsupportedAlignment`] if `alignment` exceeds
    /// [`MAX_ALLOCATION_ALIGNMENT`](super::header::MAX_ALLOCATION_ALIGNMENT).
    /// The allocator is unchanged on error.
    ///
    /// # Panics
    ///
    /// Panics if `alignment` is not a power of two.
    pub fn allocate(&mut self, size: usize, alignment: usize) -> AllocResult<StackAllocation> {
        let offset = header::push(
            self.block.as_bytes_mut(),
            &mut self.current_marker,
            &mut self.guard,
            size,
            alignment,
        )?;
        Ok(StackAllocation::new(offset, size))
    }

    /// Releases the most recent live allocation.
    ///
    /// Zero-sized allocations are ignored: their header byte is only
    /// reclaimed by a rollback or reset.
    ///
    /// # Panics
    ///
    /// Panics if `allocation` is not the most recent live allocation.
    pub fn deallocate(&mut self, allocation: StackAllocation) {
        if allocation.is_empty() {
            return;
        }
        let result = header::pop(
            self.block.as_bytes_mut(),
            &mut self.current_marker,
            &mut self.guard,
            allocation.offset(),
            allocation.len(),
        );
        if let Err(err) = result {
            panic!("{err}");
        }
    }

    /// Releases every allocation made after `marker` was taken.
    ///
    /// # Panics
    ///
    /// Panics if `marker` lies outside the block or above the current top.
    pub fn rollback_to_marker(&mut self, marker: Marker) {
        let result = header::rollback(
            self.block.as_bytes_mut(),
            &mut self.current_marker,
            &mut self.guard,
            marker.offset(),
        );
        if let Err(err) = result {
            panic!("{err}");
        }
    }

    /// Releases every allocation.
    pub fn reset(&mut self) {
        self.rollback_to_marker(Marker(0));
    }

    /// Doubles the backing block.
    ///
    /// Only an empty allocator can be resized. Returns `false` and leaves the
    /// allocator untouched if it still has live allocations or the new block
    /// cannot be allocated.
    #[must_use]
    pub fn resize_buffer(&mut self) -> bool {
        if self.current_marker != 0 {
            tracing::warn!(
                used = self.current_marker,
                "cannot resize a stack allocator with live allocations"
            );
            return false;
        }
        if !resize_memory_block(&mut self.block, &mut self.guard) {
            tracing::warn!(capacity = self.capacity(), "allocator memory block resize failed");
            return false;
        }
        self.current_marker = 0;
        true
    }

    /// Opens a scope that rolls back to the current top when dropped.
    #[must_use]
    pub fn frame(&mut self) -> StackFrame<'_, G> {
        StackFrame::new(self)
    }

    /// Returns the bytes of a live allocation.
    ///
    /// Returns `None` if the allocation lies above the current top.
    #[inline]
    #[must_use]
    pub fn bytes(&self, allocation: StackAllocation) -> Option<&[u8]> {
        if allocation.end() > self.current_marker {
            return None;
        }
        self.block.as_bytes().get(allocation.range())
    }

    /// Returns the bytes of a live allocation mutably.
    ///
    /// Returns `None` if the allocation lies above the current top.
    #[inline]
    pub fn bytes_mut(&mut self, allocation: StackAllocation) -> Option<&mut [u8]> {
        if allocation.end() > self.current_marker {
            return None;
        }
        self.block.as_bytes_mut().get_mut(allocation.range())
    }

    /// Returns the address of the first byte of `allocation`.
    #[inline]
    #[must_use]
    pub fn as_ptr(&self, allocation: StackAllocation) -> *const u8 {
        self.block.as_bytes().as_ptr().wrapping_add(allocation.offset())
    }
}

impl StackAllocator<PatternGuard> {
    /// Creates an allocator from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AllocError::ZeroCapacity`] for an empty block and
    /// [`AllocError::OutOfMemory`] if the block cannot be allocated.
    pub fn from_config(config: &StackConfig) -> AllocResult<Self> {
        config.validate()?;
        let allocator = Self::try_with_guard(config.capacity, config.guard())?;
        tracing::debug!(
            capacity = config.capacity,
            fill_patterns = config.fill_patterns,
            "stack allocator created from config"
        );
        Ok(allocator)
    }
}

/// The moved-from state: no block, nothing allocated.
impl<G: Default> Default for StackAllocator<G> {
    fn default() -> Self {
        Self {
            block: MemoryBlock::default(),
            current_marker: 0,
            guard: G::default(),
        }
    }
}

impl<G> std::fmt::Debug for StackAllocator<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackAllocator")
            .field("block", &self.block)
            .field("current_marker", &self.current_marker)
            .finish_non_exhaustive()
    }
}
