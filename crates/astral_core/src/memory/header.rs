//! # Allocation Headers
//!
//! The push/pop/rollback bookkeeping shared by the header-using arenas.
//!
//! Every allocation is preceded by a single byte recording how far the
//! user offset sits above the top of the stack at the time of the push:
//!
//! ```text
//! [previous top]
//! [...padding for alignment...]
//! [1 byte header (alignment offset)]
//! [user accessible memory]
//! [new top]
//! ```
//!
//! When the top is already aligned there is no room for the header, so the
//! user offset is pushed forward by a whole `alignment`. The header is a
//! single byte, which caps the alignment at [`MAX_ALLOCATION_ALIGNMENT`].

use super::guard::{MemoryGuard, RegionAccess};
use super::utils::{align_forward, does_cause_overflow, is_alignment_power_of_two};
use crate::error::{AllocError, AllocResult};

/// Largest alignment the one byte header can record.
pub const MAX_ALLOCATION_ALIGNMENT: usize = 128;

/// Padding recorded in front of an allocation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct AllocationHeader {
    /// Distance between the previous top and the user offset.
    alignment_offset: u8,
}

impl AllocationHeader {
    /// Reads the header stored in front of `offset`.
    ///
    /// Offset zero has no room for a header and reads as no padding.
    #[inline]
    pub(crate) fn read(memory: &[u8], offset: usize) -> Self {
        let alignment_offset = match offset {
            0 => 0,
            _ => memory[offset - 1],
        };
        Self { alignment_offset }
    }

    /// Returns the recorded padding in bytes.
    #[inline]
    pub(crate) const fn alignment_offset(self) -> usize {
        self.alignment_offset as usize
    }
}

fn out_of_memory(memory: &[u8], top: usize, size: usize, alignment: usize) -> AllocError {
    AllocError::OutOfMemory {
        requested: size,
        alignment,
        available: memory.len().saturating_sub(top),
    }
}

/// Pushes `size` bytes aligned to `alignment` onto the stack.
///
/// Returns the user offset. `top` is left unchanged on failure.
///
/// # Panics
///
/// Panics if `alignment` is not a power of two.
pub(crate) fn push<G: MemoryGuard>(
    memory: &mut [u8],
    top: &mut usize,
    guard: &mut G,
    size: usize,
    alignment: usize,
) -> AllocResult<usize> {
    assert!(
        is_alignment_power_of_two(alignment),
        "Given alignment is not a power of two!"
    );
    if alignment > MAX_ALLOCATION_ALIGNMENT {
        return Err(AllocError::UnsupportedAlignment {
            alignment,
            max: MAX_ALLOCATION_ALIGNMENT,
        });
    }

    let current = *top;
    let end = memory.len();
    if does_cause_overflow(current, size, end) {
        return Err(out_of_memory(memory, current, size, alignment));
    }

    let mut aligned = align_forward(current, alignment, size, end)
        .ok_or_else(|| out_of_memory(memory, current, size, alignment))?;

    if aligned == current {
        // Already aligned: push forward a whole alignment to make room for the header.
        aligned += alignment;
        if does_cause_overflow(aligned, size, end) {
            return Err(out_of_memory(memory, current, size, alignment));
        }
    }

    let alignment_offset = u8::try_from(aligned - current).map_err(|_| AllocError::UnsupportedAlignment {
        alignment,
        max: MAX_ALLOCATION_ALIGNMENT,
    })?;
    let header_at = aligned - 1;

    guard.set_region_access(memory, current..header_at, RegionAccess::AccessRestricted);
    guard.set_region_access(memory, header_at..aligned, RegionAccess::AccessGranted);
    memory[header_at] = alignment_offset;
    guard.set_region_access(memory, aligned..aligned + size, RegionAccess::AccessGranted);

    *top = aligned + size;
    Ok(aligned)
}

/// Pops the allocation at `offset` off the stack.
///
/// `top` is left unchanged on failure.
pub(crate) fn pop<G: MemoryGuard>(
    memory: &mut [u8],
    top: &mut usize,
    guard: &mut G,
    offset: usize,
    size: usize,
) -> AllocResult<()> {
    let current = *top;
    if current.checked_sub(size) != Some(offset) {
        return Err(AllocError::OutOfOrderDeallocation {
            offset,
            size,
            top: current,
        });
    }

    let header = AllocationHeader::read(memory, offset);
    let new_top = offset
        .checked_sub(header.alignment_offset())
        .ok_or(AllocError::CorruptHeader { offset })?;

    guard.set_region_access(memory, new_top..current, RegionAccess::AccessRestricted);
    *top = new_top;
    Ok(())
}

/// Rolls the stack back to `marker`, releasing everything above it.
pub(crate) fn rollback<G: MemoryGuard>(
    memory: &mut [u8],
    top: &mut usize,
    guard: &mut G,
    marker: usize,
) -> AllocResult<()> {
    let current = *top;
    if marker > memory.len() || marker > current {
        return Err(AllocError::InvalidMarker {
            marker,
            top: current,
            capacity: memory.len(),
        });
    }

    guard.set_region_access(memory, marker..current, RegionAccess::AccessRestricted);
    *top = marker;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::guard::NoopGuard;

    #[test]
    fn test_push_reserves_header_when_aligned() {
        let mut memory = [0u8; 32];
        let mut top = 0;

        let offset = push(&mut memory, &mut top, &mut NoopGuard, 4, 1).unwrap();
        assert_eq!(offset, 1);
        assert_eq!(memory[0], 1);
        assert_eq!(top, 5);
    }

    #[test]
    fn test_push_uses_natural_padding_for_header() {
        let mut memory = [0u8; 64];
        let mut top = 3;

        let offset = push(&mut memory, &mut top, &mut NoopGuard, 8, 8).unwrap();
        assert_eq!(offset, 8);
        assert_eq!(AllocationHeader::read(&memory, offset).alignment_offset(), 5);
        assert_eq!(top, 16);
    }

    #[test]
    fn test_push_leaves_top_on_failure() {
        let mut memory = [0u8; 8];
        let mut top = 0;

        let err = push(&mut memory, &mut top, &mut NoopGuard, 8, 1).unwrap_err();
        assert!(err.is_out_of_memory());
        assert_eq!(top, 0);
    }

    #[test]
    fn test_push_rejects_oversized_alignment() {
        let mut memory = [0u8; 1024];
        let mut top = 0;

        let err = push(&mut memory, &mut top, &mut NoopGuard, 1, 256).unwrap_err();
        assert_eq!(
            err,
            AllocError::UnsupportedAlignment {
                alignment: 256,
                max: MAX_ALLOCATION_ALIGNMENT
            }
        );
    }

    #[test]
    fn test_push_accepts_max_alignment() {
        let mut memory = [0u8; 512];
        let mut top = 0;

        let offset = push(&mut memory, &mut top, &mut NoopGuard, 1, MAX_ALLOCATION_ALIGNMENT).unwrap();
        assert_eq!(offset, MAX_ALLOCATION_ALIGNMENT);
        assert_eq!(memory[offset - 1], 128);
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn test_push_panics_on_bad_alignment() {
        let mut memory = [0u8; 16];
        let mut top = 0;
        let _ = push(&mut memory, &mut top, &mut NoopGuard, 1, 3);
    }

    #[test]
    fn test_pop_restores_top() {
        let mut memory = [0u8; 64];
        let mut top = 0;

        let first = push(&mut memory, &mut top, &mut NoopGuard, 5, 1).unwrap();
        let second = push(&mut memory, &mut top, &mut NoopGuard, 9, 4).unwrap();

        pop(&mut memory, &mut top, &mut NoopGuard, second, 9).unwrap();
        assert_eq!(top, 6);
        pop(&mut memory, &mut top, &mut NoopGuard, first, 5).unwrap();
        assert_eq!(top, 0);
    }

    #[test]
    fn test_pop_rejects_out_of_order() {
        let mut memory = [0u8; 64];
        let mut top = 0;

        let first = push(&mut memory, &mut top, &mut NoopGuard, 5, 1).unwrap();
        let _second = push(&mut memory, &mut top, &mut NoopGuard, 5, 1).unwrap();

        let err = pop(&mut memory, &mut top, &mut NoopGuard, first, 5).unwrap_err();
        assert!(matches!(err, AllocError::OutOfOrderDeallocation { .. }));
        assert_eq!(top, 12);
    }

    #[test]
    fn test_pop_of_zero_size_releases_header() {
        let mut memory = [0u8; 16];
        let mut top = 0;

        let first = push(&mut memory, &mut top, &mut NoopGuard, 4, 1).unwrap();
        let empty = push(&mut memory, &mut top, &mut NoopGuard, 0, 1).unwrap();
        assert_eq!(top, 6);

        pop(&mut memory, &mut top, &mut NoopGuard, empty, 0).unwrap();
        assert_eq!(top, 5);
        pop(&mut memory, &mut top, &mut NoopGuard, first, 4).unwrap();
        assert_eq!(top, 0);
    }

    #[test]
    fn test_pop_at_block_start_has_no_header() {
        let mut memory = [9u8; 16];
        let mut top = 4;
        pop(&mut memory, &mut top, &mut NoopGuard, 0, 4).unwrap();
        assert_eq!(top, 0);
    }

    #[test]
    fn test_pop_detects_corrupt_header() {
        let mut memory = [0u8; 16];
        memory[1] = 200;
        let mut top = 6;

        let err = pop(&mut memory, &mut top, &mut NoopGuard, 2, 4).unwrap_err();
        assert_eq!(err, AllocError::CorruptHeader { offset: 2 });
    }

    #[test]
    fn test_rollback_validates_marker() {
        let mut memory = [0u8; 16];
        let mut top = 8;

        assert!(rollback(&mut memory, &mut top, &mut NoopGuard, 9).is_err());
        assert!(rollback(&mut memory, &mut top, &mut NoopGuard, 17).is_err());
        rollback(&mut memory, &mut top, &mut NoopGuard, 3).unwrap();
        assert_eq!(top, 3);
    }
}
