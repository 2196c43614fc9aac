//! # Stack Linear Allocator
//!
//! A scratch arena over an inline buffer. Individual frees do nothing: the
//! only way to get memory back is [`StackLinearAllocator::reset`], which
//! wipes everything at once. In exchange there is no header tax and no
//! ordering check, which suits per-frame scratch data with one collective
//! lifetime.

use super::allocation::StackAllocation;
use super::guard::{DefaultGuard, MemoryGuard, RegionAccess};
use super::utils::{
    align_forward, does_cause_overflow, is_alignment_power_of_two, InlineBlock, BLOCK_ALIGNMENT,
};
use crate::error::{AllocError, AllocResult};

/// Largest inline block a linear allocator may embed (5.28 KB).
pub const MAX_STACK_ALLOCATION_SIZE: usize = 5280;

/// A linear allocator over an inline `N`-byte block.
///
/// # Thread Safety
///
/// This allocator is NOT thread-safe. Use one allocator per thread.
///
/// # Example
///
/// ```rust,ignore
/// let mut scratch: StackLinearAllocator<1024> = StackLinearAllocator::new();
///
/// let positions = scratch.allocate(256, 16)?;
/// let flags = scratch.allocate(64, 1)?;
///
/// // End of frame
/// scratch.reset();
/// ```
#[derive(Clone)]
pub struct StackLinearAllocator<const N: usize, G = DefaultGuard> {
    /// Inline backing block.
    block: InlineBlock<N>,
    /// Offset of the top of the stack.
    current_marker: usize,
    /// Region guard notified of every access transition.
    guard: G,
}

impl<const N: usize, G: MemoryGuard + Default> StackLinearAllocator<N, G> {
    /// Creates an empty allocator.
    #[must_use]
    pub fn new() -> Self {
        Self::with_guard(G::default())
    }
}

impl<const N: usize, G: MemoryGuard> StackLinearAllocator<N, G> {
    const BLOCK_SIZE_CHECK: () = {
        assert!(N > 0, "The memory block size must be greater than 0");
        assert!(
            N <= MAX_STACK_ALLOCATION_SIZE,
            "Memory block size for stack is too big!"
        );
    };

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

    /// Returns the number of bytes above the top.
    #[inline]
    #[must_use]
    pub const fn remaining(&self) -> usize {
        N - self.current_marker
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
    /// [`AllocError::UnsupportedAlignment`] if `alignment` exceeds the block
    /// alignment. The allocator is unchanged on error.
    ///
    /// # Panics
    ///
    /// Panics if `alignment` is not a power of two.
    pub fn allocate(&mut self, size: usize, alignment: usize) -> AllocResult<StackAllocation> {
        assert!(
            is_alignment_power_of_two(alignment),
            "Given alignment is not a power of two!"
        );
        if alignment > BLOCK_ALIGNMENT {
            return Err(AllocError::UnsupportedAlignment {
                alignment,
                max: BLOCK_ALIGNMENT,
            });
        }

        let current = self.current_marker;
        let out_of_memory = AllocError::OutOfMemory {
            requested: size,
            alignment,
            available: N - current,
        };
        if does_cause_overflow(current, size, N) {
            return Err(out_of_memory);
        }
        let aligned = align_forward(current, alignment, size, N).ok_or(out_of_memory)?;

        let memory = &mut self.block.0;
        self.guard
            .set_region_access(memory, current..aligned, RegionAccess::AccessRestricted);
        self.guard
            .set_region_access(memory, aligned..aligned + size, RegionAccess::AccessGranted);

        self.current_marker = aligned + size;
        Ok(StackAllocation::new(aligned, size))
    }

    /// Does nothing. Use [`reset`](Self::reset) to reclaim memory.
    #[inline]
    #[allow(clippy::unused_self, clippy::needless_pass_by_value)]
    pub fn deallocate(&mut self, _allocation: StackAllocation) {}

    /// Releases every allocation and zeroes the block.
    pub fn reset(&mut self) {
        self.block.0.fill(0);
        self.guard
            .set_region_access(&mut self.block.0, 0..N, RegionAccess::AccessRestricted);
        self.current_marker = 0;
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
        self.block.0.get(allocation.range())
    }

    /// Returns the bytes of a live allocation mutably.
    ///
    /// Returns `None` if the allocation lies above the current top.
    #[inline]
    pub fn bytes_mut(&mut self, allocation: StackAllocation) -> Option<&mut [u8]> {
        if allocation.end() > self.current_marker {
            return None;
        }
        self.block.0.get_mut(allocation.range())
    }

    /// Returns the address of the first byte of `allocation`.
    ///
    /// The block is stored inline, so the address changes whenever the
    /// allocator moves. Offsets do not.
    #[inline]
    #[must_use]
    pub fn as_ptr(&self, allocation: StackAllocation) -> *const u8 {
        self.block.0.as_ptr().wrapping_add(allocation.offset())
    }
}

impl<const N: usize, G: MemoryGuard + Default> Default for StackLinearAllocator<N, G> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize, G> std::fmt::Debug for StackLinearAllocator<N, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StackLinearAllocator")
            .field("capacity", &N)
            .field("current_marker", &self.current_marker)
            .finish_non_exhaustive()
    }
}
