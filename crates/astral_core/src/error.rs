//! # Allocator Error Types
//!
//! All errors that can occur while carving memory out of an arena.
//!
//! Only capacity exhaustion is meant to be branched on by callers. The
//! ordering and marker variants describe programmer errors: the heap-backed
//! and linear arenas turn them into panics, the typed arena hands them back.

use thiserror::Error;

/// Errors that can occur in the memory arenas.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// The arena does not have enough room left for the request.
    #[error(
        "out of memory: requested {requested} bytes with alignment {alignment}, {available} bytes available"
    )]
    OutOfMemory {
        /// Requested size in bytes.
        requested: usize,
        /// Requested alignment in bytes.
        alignment: usize,
        /// Bytes left between the top of the stack and the end of the block.
        available: usize,
    },

    /// The padding for this alignment cannot be recorded in a one byte header.
    #[error("alignment {alignment} exceeds the supported maximum of {max}")]
    UnsupportedAlignment {
        /// Requested alignment in bytes.
        alignment: usize,
        /// Largest alignment the arena can honour.
        max: usize,
    },

    /// `count * size_of::<T>()` does not fit in a `usize`.
    #[error("allocation size overflow: {count} elements of {element_size} bytes")]
    SizeOverflow {
        /// Number of elements requested.
        count: usize,
        /// Size of a single element.
        element_size: usize,
    },

    /// The released allocation is not the most recent live one.
    #[error(
        "deallocations must follow a last in first out order: allocation at offset {offset} ({size} bytes) is not on top of the stack (top: {top})"
    )]
    OutOfOrderDeallocation {
        /// Offset of the allocation being released.
        offset: usize,
        /// Size of the allocation being released.
        size: usize,
        /// Current top of the stack.
        top: usize,
    },

    /// The marker lies outside the block or above the current top.
    #[error("marker {marker} does not fall within the live region of this allocator (top: {top}, capacity: {capacity})")]
    InvalidMarker {
        /// Offending marker offset.
        marker: usize,
        /// Current top of the stack.
        top: usize,
        /// Capacity of the block.
        capacity: usize,
    },

    /// The header in front of an allocation points before the block start.
    #[error("allocation header in front of offset {offset} is corrupt")]
    CorruptHeader {
        /// Offset of the allocation whose header was read.
        offset: usize,
    },

    /// An arena was asked for an empty backing block.
    #[error("the memory block size must be greater than 0")]
    ZeroCapacity,

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AllocError {
    /// Returns `true` for the one failure a caller is expected to recover from.
    #[inline]
    #[must_use]
    pub const fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. } | Self::SizeOverflow { .. })
    }
}

/// Result type for arena operations.
pub type AllocResult<T> = Result<T, AllocError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_memory_is_recoverable() {
        let err = AllocError::OutOfMemory {
            requested: 64,
            alignment: 8,
            available: 10,
        };
        assert!(err.is_out_of_memory());
        assert!(!AllocError::ZeroCapacity.is_out_of_memory());
    }

    #[test]
    fn test_lifo_message_mentions_order() {
        let err = AllocError::OutOfOrderDeallocation {
            offset: 1,
            size: 4,
            top: 12,
        };
        assert!(err.to_string().contains("last in first out"));
    }
}
