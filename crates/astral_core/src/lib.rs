//! # ASTRAL Core Memory
//!
//! Stack-discipline arenas for frame-scoped allocation:
//! - O(1) allocate and free by moving a single cursor
//! - Checkpoints (markers) and RAII frames for bulk release
//! - Debug pattern fills to catch use of reclaimed memory
//!
//! ## Architecture Rules
//!
//! 1. **Last in, first out** - Only the most recent allocation can be freed
//! 2. **Offsets, not pointers** - Handles stay valid across moves and clones
//! 3. **No unsafe** - Byte access is bounds checked against the live region
//!
//! ## Example
//!
//! ```rust,ignore
//! use astral_core::StackAllocator;
//!
//! let mut stack = StackAllocator::new(64 * 1024);
//! let marker = stack.marker();
//! let scratch = stack.allocate(256, 16)?;
//! stack.rollback_to_marker(marker);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod memory;

pub use config::StackConfig;
pub use error::{AllocError, AllocResult};
pub use memory::{
    DefaultGuard, Marker, MemoryGuard, NoopGuard, PatternGuard, RegionAccess, StackAllocation,
    StackAllocator, StackFrame, StackLinearAllocator, TypedAllocation, TypedStackAllocator,
};
