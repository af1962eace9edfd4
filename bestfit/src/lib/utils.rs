pub use std::{
    rc::Rc,
    cell::Cell,
    fmt,
};
pub use thiserror::Error;
pub use itertools::Itertools;
pub use log::{debug, trace};

/// The unit for measuring addresses and sizes. `bestfit` does not
/// care whether a step is a byte, a page or a slot, as long as the
/// whole range fits in a `usize`.
pub type ByteSteps = usize;

/// A request that could not be satisfied. This is an expected
/// outcome of [`allocate`](crate::MemoryManager::allocate), not a fault.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllocError {
    #[error("Cannot place {requested} steps: largest free segment holds {largest_free}")]
    Exhausted {
        requested:      ByteSteps,
        largest_free:   ByteSteps,
    },
}

/// Appears when a handle handed to [`free`](crate::MemoryManager::free)
/// does not identify a live allocation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeError {
    #[error("Slot {slot} was never issued by this manager")]
    UnknownSlot {
        slot:   usize,
    },
    /// The allocation was already freed, or its segment has since
    /// been merged away or recycled.
    #[error("Stale handle for slot {slot}: generation {generation}, current is {current}")]
    StaleHandle {
        slot:       usize,
        generation: u32,
        current:    u32,
    },
}

/// A broken structural invariant. Only ever produced by the
/// checkers, and only ever meaningful as a bug report.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvariantError {
    #[error("First segment starts at {left} instead of 0")]
    BadStart { left: ByteSteps },
    #[error("Last segment ends at {right} instead of {total}")]
    BadEnd { right: ByteSteps, total: ByteSteps },
    #[error("Segment [{left}, {right}) is inverted")]
    Inverted { left: ByteSteps, right: ByteSteps },
    #[error("Segment ending at {end} is followed by one starting at {start}")]
    Gap { end: ByteSteps, start: ByteSteps },
    #[error("Partition links {linked} segments but counts {counted}")]
    BadLength { linked: usize, counted: usize },
    #[error("Free segments meet at {at} without having been coalesced")]
    AdjacentFree { at: ByteSteps },
    #[error("Free segment at {left} points to heap position {position}, which holds another element")]
    MisplacedBackRef { left: ByteSteps, position: usize },
    #[error("Partition holds {free_segments} free segments but the heap holds {heap_len}")]
    HeapMismatch { free_segments: usize, heap_len: usize },
    #[error("Heap element at position {position} outranks its parent")]
    HeapOrder { position: usize },
}
