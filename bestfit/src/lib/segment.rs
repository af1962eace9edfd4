use crate::utils::*;

/// Names a slot of the [`SegmentPartition`](crate::SegmentPartition)
/// arena. Slots are recycled, so an id alone does not pin down a
/// segment; see [`Allocation`](crate::Allocation) for the
/// generation-checked version.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentId(pub(crate) usize);

impl SegmentId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// The half-open address interval `[left, right)`.
///
/// A segment is shared between the partition, which owns the
/// address order, and the free heap, which owns the size order.
/// Hence the interior mutability: both sides see the same record.
///
/// [`heap_position`](Segment::heap_position) doubles as the
/// free/allocated mark. A segment is free iff it sits in the heap.
#[derive(Debug)]
pub struct Segment {
    slot:           SegmentId,
    left:           Cell<ByteSteps>,
    right:          Cell<ByteSteps>,
    heap_position:  Cell<Option<usize>>,
}

impl Segment {
    pub(crate) fn new(slot: SegmentId, left: ByteSteps, right: ByteSteps) -> Self {
        Self {
            slot,
            left:           Cell::new(left),
            right:          Cell::new(right),
            heap_position:  Cell::new(None),
        }
    }

    #[inline]
    pub fn id(&self) -> SegmentId {
        self.slot
    }

    #[inline]
    pub fn left(&self) -> ByteSteps {
        self.left.get()
    }

    #[inline]
    pub fn right(&self) -> ByteSteps {
        self.right.get()
    }

    #[inline]
    pub fn size(&self) -> ByteSteps {
        self.right.get().saturating_sub(self.left.get())
    }

    #[inline]
    pub fn heap_position(&self) -> Option<usize> {
        self.heap_position.get()
    }

    #[inline]
    pub fn is_free(&self) -> bool {
        self.heap_position.get().is_some()
    }

    #[inline]
    pub(crate) fn set_left(&self, left: ByteSteps) {
        self.left.set(left);
    }

    /// Widens `self` so that it also covers `other`.
    ///
    /// The two must touch. Anything else means the partition
    /// has been corrupted, and there is no sane way forward.
    pub(crate) fn unite(&self, other: &Segment) {
        if self.left() == other.right() {
            self.left.set(other.left());
        } else if self.right() == other.left() {
            self.right.set(other.right());
        } else {
            panic!(
                "Segments [{}, {}) and [{}, {}) to unite are not adjacent!",
                self.left(), self.right(), other.left(), other.right()
            );
        }
    }

    /// The free heap's order: bigger segments first, leftmost
    /// one on ties.
    pub fn ranks_above(first: &Rc<Segment>, second: &Rc<Segment>) -> bool {
        if first.size() == second.size() {
            first.left() < second.left()
        } else {
            first.size() > second.size()
        }
    }

    /// Position observer wired into the free heap.
    pub fn track(segment: &Rc<Segment>, position: Option<usize>) {
        segment.heap_position.set(position);
    }
}
