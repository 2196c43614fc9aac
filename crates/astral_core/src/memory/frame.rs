//! # Stack Frames
//!
//! RAII scopes over a [`StackAllocator`] that roll back on drop.

use std::ops::{Deref, DerefMut};

use super::allocation::Marker;
use super::guard::{DefaultGuard, MemoryGuard};
use super::stack::StackAllocator;

/// A scope that restores its allocator to the marker taken at creation.
///
/// Everything allocated through the frame is released when it is dropped,
/// which makes it the natural shape for per-call scratch memory.
///
/// # Example
///
/// ```rust,ignore
/// let mut stack = StackAllocator::new(4096);
/// {
///     let mut frame = stack.frame();
///     let scratch = frame.allocate(256, 8)?;
///     // ...
/// } // rolled back here
/// assert_eq!(stack.used_block_size(), 0);
/// ```
pub struct StackFrame<'a, G: MemoryGuard = DefaultGuard> {
    allocator: &'a mut StackAllocator<G>,
    marker: Marker,
}

impl<'a, G: MemoryGuard> StackFrame<'a, G> {
    /// Opens a frame at the allocator's current top.
    #[must_use]
    pub fn new(allocator: &'a mut StackAllocator<G>) -> Self {
        let marker = allocator.marker();
        Self { allocator, marker }
    }

    /// Returns the marker this frame restores on drop.
    #[inline]
    #[must_use]
    pub const fn marker(&self) -> Marker {
        self.marker
    }
}

impl<G: MemoryGuard> Deref for StackFrame<'_, G> {
    type Target = StackAllocator<G>;

    fn deref(&self) -> &Self::Target {
        self.allocator
    }
}

impl<G: MemoryGuard> DerefMut for StackFrame<'_, G> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.allocator
    }
}

impl<G: MemoryGuard> Drop for StackFrame<'_, G> {
    fn drop(&mut self) {
        // The frame's own allocations may already have been released below the marker.
        if self.marker <= self.allocator.marker() {
            self.allocator.rollback_to_marker(self.marker);
        }
    }
}
