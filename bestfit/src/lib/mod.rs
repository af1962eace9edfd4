//! Welcome to `bestfit`!
//!
//! A simulator of a linear memory manager. A fixed range of
//! [`ByteSteps`] is carved into [`Segment`]s, each one either
//! free or allocated. Requests are served by the *largest* free
//! segment, the leftmost one winning ties, and released memory is
//! immediately merged with any free neighbours.
//!
//! Two structures make this fast:
//!
//! 1. An [`IndexedHeap`] of free segments. It reports every element's
//!    position back to its owner, so that any segment can be pulled out
//!    of the heap in logarithmic time.
//! 2. A [`SegmentPartition`], the address-ordered, doubly linked arena of
//!    all segments, free and allocated alike.
//!
//! [`MemoryManager`] glues them together.

/// Imports, type aliases, errors ... in general
/// useful stuff that shall be needed in many places.
pub mod utils;
pub mod heap;
mod segment;
pub mod partition;
pub mod manager;

pub use utils::{ByteSteps, AllocError, FreeError, InvariantError};
pub use heap::IndexedHeap;
pub use segment::{Segment, SegmentId};
pub use partition::SegmentPartition;
pub use manager::{Allocation, MemoryManager, SegmentView, Stats};
