//! # Memory Management
//!
//! LIFO arenas for scratch memory with a stack lifetime.
//!
//! ## Design Philosophy
//!
//! A block is allocated once and carved from the bottom up. During a frame:
//! - No heap allocations
//! - Frees are a cursor move
//! - Whole scopes are released at once through markers or frames
//!
//! ## Arenas
//!
//! - [`StackAllocator`]: heap-backed, resizable, one byte header per allocation
//! - [`StackLinearAllocator`]: inline, headerless, reclaimed only by reset
//! - [`TypedStackAllocator`]: inline, element-typed, reports every failure as an error
//!
//! All of them hand out offset handles instead of references, and report
//! every access transition to a [`MemoryGuard`].

mod allocation;
mod frame;
pub mod guard;
mod header;
mod stack;
mod stack_linear;
mod typed_stack;
pub mod utils;

pub use allocation::{Marker, StackAllocation, TypedAllocation};
pub use frame::StackFrame;
pub use guard::{DefaultGuard, MemoryGuard, NoopGuard, PatternGuard, RegionAccess};
pub use header::MAX_ALLOCATION_ALIGNMENT;
pub use stack::StackAllocator;
pub use stack_linear::{StackLinearAllocator, MAX_STACK_ALLOCATION_SIZE};
pub use typed_stack::TypedStackAllocator;
