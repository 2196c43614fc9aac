//! # Allocator Utilities
//!
//! Bounds and alignment arithmetic shared by every arena, plus the
//! max-aligned backing blocks they carve allocations out of.
//!
//! All arithmetic works on offsets from the start of a block. Blocks are
//! aligned to [`BLOCK_ALIGNMENT`], so an offset that is a multiple of some
//! supported alignment is also an address with that alignment.

use bytemuck::{Pod, Zeroable};

use super::guard::{MemoryGuard, RegionAccess};

/// Alignment of every backing block, in bytes.
pub const BLOCK_ALIGNMENT: usize = 128;

/// Factor applied to the block size by [`resize_memory_block`].
pub const RESIZE_MULTIPLIER: usize = 2;

/// One aligned unit of backing storage.
#[derive(Clone, Copy, Pod, Zeroable)]
#[repr(C, align(128))]
struct AlignedChunk([u8; BLOCK_ALIGNMENT]);

/// Checks if a given alignment is a power of two.
///
/// Zero is not a power of two.
#[inline]
#[must_use]
pub const fn is_alignment_power_of_two(alignment: usize) -> bool {
    alignment != 0 && (alignment & (alignment - 1)) == 0
}

/// Checks if placing `size` bytes at `current` would run past `end`.
///
/// An addition that overflows `usize` counts as running past the end.
#[inline]
#[must_use]
pub const fn does_cause_overflow(current: usize, size: usize, end: usize) -> bool {
    match current.checked_add(size) {
        Some(next) => next > end,
        None => true,
    }
}

/// Rounds `size` up to the next multiple of `alignment`.
///
/// Returns `None` when `alignment` is zero or the result does not fit.
#[inline]
#[must_use]
pub const fn round_to_next_alignment_multiple(size: usize, alignment: usize) -> Option<usize> {
    if alignment == 0 {
        return None;
    }
    match size.checked_add(alignment - 1) {
        Some(padded) => Some((padded / alignment) * alignment),
        None => None,
    }
}

/// Finds the first offset at or after `current` that is a multiple of
/// `alignment` and still leaves room for `size` bytes before `end`.
///
/// # Arguments
///
/// * `current` - Current top of the stack
/// * `alignment` - Required alignment, a power of two
/// * `size` - Number of bytes that must fit after the aligned offset
/// * `end` - End of the block
#[inline]
#[must_use]
pub fn align_forward(current: usize, alignment: usize, size: usize, end: usize) -> Option<usize> {
    debug_assert!(is_alignment_power_of_two(alignment));
    let aligned = current.checked_add(alignment - 1)? & !(alignment - 1);
    if does_cause_overflow(aligned, size, end) {
        return None;
    }
    Some(aligned)
}

/// An owned, heap-allocated block aligned to [`BLOCK_ALIGNMENT`].
///
/// The block reports exactly the size it was requested with, even though
/// the storage underneath is rounded up to whole aligned chunks.
#[derive(Clone, Default)]
pub struct MemoryBlock {
    /// Aligned backing storage.
    chunks: Box<[AlignedChunk]>,
    /// Usable size in bytes.
    len: usize,
}

impl MemoryBlock {
    /// Returns the usable size in bytes.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` for the empty block left behind by a move.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Views the usable bytes.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice::<AlignedChunk, u8>(&self.chunks)[..self.len]
    }

    /// Views the usable bytes mutably.
    #[inline]
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut::<AlignedChunk, u8>(&mut self.chunks)[..self.len]
    }
}

impl std::fmt::Debug for MemoryBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBlock")
            .field("address", &self.as_bytes().as_ptr())
            .field("len", &self.len)
            .finish()
    }
}

/// Allocates a zeroed block of at least `size` bytes aligned to [`BLOCK_ALIGNMENT`].
///
/// Returns `None` if `size` is zero or the system allocator refuses the request.
#[must_use]
pub fn alloc_max_aligned_block(size: usize) -> Option<MemoryBlock> {
    if size == 0 {
        return None;
    }
    let chunk_count = round_to_next_alignment_multiple(size, BLOCK_ALIGNMENT)? / BLOCK_ALIGNMENT;

    let mut chunks = Vec::new();
    chunks.try_reserve_exact(chunk_count).ok()?;
    chunks.resize(chunk_count, AlignedChunk::zeroed());

    Some(MemoryBlock {
        chunks: chunks.into_boxed_slice(),
        len: size,
    })
}

/// Frees a block allocated by [`alloc_max_aligned_block`].
pub fn free_max_aligned_block(block: MemoryBlock) {
    tracing::trace!(len = block.len(), "freeing allocator memory block");
    drop(block);
}

/// Replaces `block` with a fresh one [`RESIZE_MULTIPLIER`] times larger.
///
/// The new block is marked restricted through `guard` and the old block is
/// freed. Nothing is copied: callers resize only while the block is unused.
/// Returns `false` and leaves `block` untouched if the new size overflows or
/// cannot be allocated.
pub fn resize_memory_block<G: MemoryGuard>(block: &mut MemoryBlock, guard: &mut G) -> bool {
    let old_size = block.len();
    let Some(new_size) = old_size.checked_mul(RESIZE_MULTIPLIER) else {
        return false;
    };
    let Some(mut new_block) = alloc_max_aligned_block(new_size) else {
        return false;
    };

    guard.set_region_access(
        new_block.as_bytes_mut(),
        0..new_size,
        RegionAccess::AccessRestricted,
    );
    free_max_aligned_block(std::mem::replace(block, new_block));

    tracing::warn!(old_size, new_size, "resizing allocator memory block");
    true
}

/// A fixed-size block stored inline, aligned to [`BLOCK_ALIGNMENT`].
#[derive(Clone, Copy)]
#[repr(C, align(128))]
pub(crate) struct InlineBlock<const N: usize>(pub(crate) [u8; N]);

impl<const N: usize> InlineBlock<N> {
    /// Creates a zeroed block.
    #[inline]
    pub(crate) const fn zeroed() -> Self {
        Self([0; N])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::guard::NoopGuard;

    #[test]
    fn test_power_of_two_alignment() {
        assert!(!is_alignment_power_of_two(0));
        assert!(is_alignment_power_of_two(1));
        assert!(is_alignment_power_of_two(2));
        assert!(!is_alignment_power_of_two(3));
        assert!(is_alignment_power_of_two(64));
        assert!(!is_alignment_power_of_two(96));
    }

    #[test]
    fn test_overflow_check() {
        assert!(!does_cause_overflow(0, 10, 10));
        assert!(does_cause_overflow(1, 10, 10));
        assert!(does_cause_overflow(usize::MAX, 1, usize::MAX));
    }

    #[test]
    fn test_round_to_next_multiple() {
        assert_eq!(round_to_next_alignment_multiple(10, 8), Some(16));
        assert_eq!(round_to_next_alignment_multiple(16, 8), Some(16));
        assert_eq!(round_to_next_alignment_multiple(0, 8), Some(0));
        assert_eq!(round_to_next_alignment_multiple(10, 0), None);
        assert_eq!(round_to_next_alignment_multiple(usize::MAX, 8), None);
    }

    #[test]
    fn test_align_forward() {
        assert_eq!(align_forward(0, 8, 4, 16), Some(0));
        assert_eq!(align_forward(1, 8, 4, 16), Some(8));
        assert_eq!(align_forward(9, 8, 4, 16), None);
        assert_eq!(align_forward(5, 1, 3, 8), Some(5));
    }

    #[test]
    fn test_block_is_max_aligned() {
        let block = alloc_max_aligned_block(300).unwrap();
        assert_eq!(block.len(), 300);
        assert_eq!(block.as_bytes().len(), 300);
        assert_eq!(block.as_bytes().as_ptr() as usize % BLOCK_ALIGNMENT, 0);
        free_max_aligned_block(block);
    }

    #[test]
    fn test_zero_sized_block_is_refused() {
        assert!(alloc_max_aligned_block(0).is_none());
    }

    #[test]
    fn test_resize_doubles_block() {
        let mut block = alloc_max_aligned_block(100).unwrap();
        assert!(resize_memory_block(&mut block, &mut NoopGuard));
        assert_eq!(block.len(), 200);
        assert_eq!(block.as_bytes().as_ptr() as usize % BLOCK_ALIGNMENT, 0);
    }

    #[test]
    fn test_resize_of_empty_block_fails() {
        let mut block = MemoryBlock::default();
        assert!(!resize_memory_block(&mut block, &mut NoopGuard));
        assert!(block.is_empty());
    }

    #[test]
    fn test_inline_block_alignment() {
        let block = InlineBlock::<64>::zeroed();
        assert_eq!(block.0.as_ptr() as usize % BLOCK_ALIGNMENT, 0);
    }
}
