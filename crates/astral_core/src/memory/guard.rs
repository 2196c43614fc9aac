//! # Memory Region Guards
//!
//! Arenas report every byte range they hand out or take back to a
//! [`MemoryGuard`]. A guard can poison those ranges for a debugging tool,
//! fill them with recognisable patterns, or ignore them entirely.
//!
//! Guards are injected as a type parameter, so the no-op guard used in
//! release builds compiles away.

use std::ops::Range;

/// Byte pattern written into memory that was just handed out.
pub const ALLOCATED_MEMORY_PATTERN: u8 = 0xCD;

/// Byte pattern written into memory that was just reclaimed.
pub const FREED_MEMORY_PATTERN: u8 = 0xDD;

/// Access state of a byte range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegionAccess {
    /// The range belongs to a live allocation and may be touched.
    AccessGranted,
    /// The range is free or padding and must not be touched.
    AccessRestricted,
}

/// Receives access transitions for byte ranges inside an arena's block.
pub trait MemoryGuard {
    /// Marks `region` of `memory` with the given access state.
    ///
    /// `memory` is the arena's whole block and `region` is always in bounds.
    fn set_region_access(&mut self, memory: &mut [u8], region: Range<usize>, access: RegionAccess);
}

/// A guard that does nothing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NoopGuard;

impl MemoryGuard for NoopGuard {
    #[inline(always)]
    fn set_region_access(&mut self, _memory: &mut [u8], _region: Range<usize>, _access: RegionAccess) {}
}

/// A guard that paints granted and restricted ranges with byte patterns.
///
/// Reads of stale memory then show up as `0xDD` runs instead of plausible
/// leftovers, and fresh allocations read as `0xCD` until written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatternGuard {
    /// Pattern for granted ranges, `None` leaves them untouched.
    alloc_pattern: Option<u8>,
    /// Pattern for restricted ranges, `None` leaves them untouched.
    free_pattern: Option<u8>,
}

impl PatternGuard {
    /// Creates a guard with explicit patterns.
    #[must_use]
    pub const fn new(alloc_pattern: Option<u8>, free_pattern: Option<u8>) -> Self {
        Self {
            alloc_pattern,
            free_pattern,
        }
    }

    /// Creates a guard that never writes.
    #[must_use]
    pub const fn disabled() -> Self {
        Self::new(None, None)
    }

    /// Returns the pattern written into granted ranges.
    #[inline]
    #[must_use]
    pub const fn alloc_pattern(&self) -> Option<u8> {
        self.alloc_pattern
    }

    /// Returns the pattern written into restricted ranges.
    #[inline]
    #[must_use]
    pub const fn free_pattern(&self) -> Option<u8> {
        self.free_pattern
    }
}

impl Default for PatternGuard {
    fn default() -> Self {
        Self::new(Some(ALLOCATED_MEMORY_PATTERN), Some(FREED_MEMORY_PATTERN))
    }
}

impl MemoryGuard for PatternGuard {
    fn set_region_access(&mut self, memory: &mut [u8], region: Range<usize>, access: RegionAccess) {
        let pattern = match access {
            RegionAccess::AccessGranted => self.alloc_pattern,
            RegionAccess::AccessRestricted => self.free_pattern,
        };
        if let Some(pattern) = pattern {
            memory[region].fill(pattern);
        }
    }
}

/// Guard used when an arena is built without naming one.
#[cfg(debug_assertions)]
pub type DefaultGuard = PatternGuard;

/// Guard used when an arena is built without naming one.
#[cfg(not(debug_assertions))]
pub type DefaultGuard = NoopGuard;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_guard_paints_regions() {
        let mut memory = [0u8; 8];
        let mut guard = PatternGuard::default();

        guard.set_region_access(&mut memory, 0..8, RegionAccess::AccessRestricted);
        assert_eq!(memory, [FREED_MEMORY_PATTERN; 8]);

        guard.set_region_access(&mut memory, 2..5, RegionAccess::AccessGranted);
        assert_eq!(&memory[2..5], &[ALLOCATED_MEMORY_PATTERN; 3]);
        assert_eq!(memory[1], FREED_MEMORY_PATTERN);
        assert_eq!(memory[5], FREED_MEMORY_PATTERN);
    }

    #[test]
    fn test_disabled_pattern_guard_never_writes() {
        let mut memory = [7u8; 4];
        let mut guard = PatternGuard::disabled();
        guard.set_region_access(&mut memory, 0..4, RegionAccess::AccessRestricted);
        guard.set_region_access(&mut memory, 0..4, RegionAccess::AccessGranted);
        assert_eq!(memory, [7; 4]);
    }

    #[test]
    fn test_noop_guard_leaves_memory_alone() {
        let mut memory = [3u8; 4];
        NoopGuard.set_region_access(&mut memory, 0..4, RegionAccess::AccessRestricted);
        assert_eq!(memory, [3; 4]);
    }
}
