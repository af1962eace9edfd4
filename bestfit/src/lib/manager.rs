use crate::utils::*;
use crate::{IndexedHeap, Segment, SegmentId, SegmentPartition};

pub type RankFn = fn(&Rc<Segment>, &Rc<Segment>) -> bool;
pub type TrackFn = fn(&Rc<Segment>, Option<usize>);

/// All free segments, biggest (then leftmost) on top.
pub type FreeSegmentHeap = IndexedHeap<Rc<Segment>, RankFn, TrackFn>;

/// What the caller gets back from a successful
/// [`allocate`](MemoryManager::allocate), and what it must hand
/// to [`free`](MemoryManager::free).
///
/// The handle points at a segment *record*, not at an address.
/// It stays valid until the allocation is freed. The generation
/// stamp lets the manager recognise handles that outlived their
/// segment.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Allocation {
    id:         SegmentId,
    generation: u32,
    offset:     ByteSteps,
    size:       ByteSteps,
}

impl Allocation {
    /// Start address, counting from 0.
    #[inline]
    pub fn offset(&self) -> ByteSteps {
        self.offset
    }

    #[inline]
    pub fn size(&self) -> ByteSteps {
        self.size
    }

    /// First address past the allocation.
    #[inline]
    pub fn end(&self) -> ByteSteps {
        self.offset + self.size
    }

    #[inline]
    pub fn id(&self) -> SegmentId {
        self.id
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// A snapshot of one segment, as reported by
/// [`segments`](MemoryManager::segments).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct SegmentView {
    pub left:   ByteSteps,
    pub right:  ByteSteps,
    pub free:   bool,
}

impl SegmentView {
    #[inline]
    pub fn size(&self) -> ByteSteps {
        self.right.saturating_sub(self.left)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub total:              ByteSteps,
    pub free_bytes:         ByteSteps,
    pub allocated_bytes:    ByteSteps,
    pub free_segments:      usize,
    pub allocated_segments: usize,
    pub largest_free:       ByteSteps,
}

/// Serves allocations from the largest free segment, leftmost on
/// ties, and coalesces freed memory with its free neighbours on
/// the spot.
///
/// Both [`allocate`](MemoryManager::allocate) and
/// [`free`](MemoryManager::free) run in O(log n), n being the
/// number of segments.
pub struct MemoryManager {
    free:       FreeSegmentHeap,
    segments:   SegmentPartition,
}

impl MemoryManager {
    /// Starts with one free segment covering `[0, total_size)`.
    pub fn new(total_size: ByteSteps) -> Self {
        let segments = SegmentPartition::new(total_size);
        let mut free = FreeSegmentHeap::new(
            Segment::ranks_above as RankFn,
            Segment::track as TrackFn,
        );
        free.push(Rc::clone(&segments[segments.first()]));

        Self { free, segments }
    }

    pub fn allocate(&mut self, size: ByteSteps) -> Result<Allocation, AllocError> {
        let root = match self.free.top() {
            Some(r) if r.size() >= size => Rc::clone(r),
            other   => {
                let largest_free = other.map_or(0, |r| r.size());
                debug!("Rejecting {} steps, largest free segment is {}", size, largest_free);
                return Err(AllocError::Exhausted { requested: size, largest_free });
            }
        };

        let granted = if root.size() == size {
            // Perfect fit: the free segment is simply
            // re-labeled as allocated.
            self.free.pop();
            root.id()
        } else {
            let start = root.left();
            let id = self.segments.insert_before(root.id(), start, start + size);
            root.set_left(start + size);
            // Only the root shrank: re-seat it.
            self.free.pop();
            self.free.push(root);
            id
        };
        let allocation = self.issue(granted);
        debug!("Placed {} steps at [{}, {})", size, allocation.offset(), allocation.end());

        Ok(allocation)
    }

    /// Releases `handle`, merging the segment with its free
    /// neighbours. The handle is dead afterwards, and so is any
    /// copy of it.
    pub fn free(&mut self, handle: Allocation) -> Result<(), FreeError> {
        let segment = Rc::clone(self.resolve(&handle)?);
        if let Some(prev) = self.segments.prev(handle.id) {
            self.absorb_if_free(&segment, prev);
        }
        if let Some(next) = self.segments.next(handle.id) {
            self.absorb_if_free(&segment, next);
        }
        self.segments.invalidate(handle.id);
        debug!("Freed [{}, {}), now free as [{}, {})",
            handle.offset(), handle.end(), segment.left(), segment.right());
        self.free.push(segment);

        Ok(())
    }

    /// `true` if `handle` may still be passed to [`free`](Self::free).
    pub fn is_live(&self, handle: &Allocation) -> bool {
        self.resolve(handle).is_ok()
    }

    #[inline]
    pub fn total_size(&self) -> ByteSteps {
        self.segments.total_size()
    }

    /// The biggest request that would currently succeed.
    pub fn largest_free(&self) -> ByteSteps {
        self.free.top().map_or(0, |s| s.size())
    }

    /// Segments in increasing address order.
    pub fn segments(&self) -> impl Iterator<Item = SegmentView> + '_ {
        self.segments.iter()
            .map(|s| SegmentView {
                left:   s.left(),
                right:  s.right(),
                free:   s.is_free(),
            })
    }

    pub fn stats(&self) -> Stats {
        let mut res = Stats {
            total:          self.total_size(),
            largest_free:   self.largest_free(),
            ..Stats::default()
        };
        for s in self.segments.iter() {
            if s.is_free() {
                res.free_bytes += s.size();
                res.free_segments += 1;
            } else {
                res.allocated_bytes += s.size();
                res.allocated_segments += 1;
            }
        }

        res
    }

    /// Cross-checks the partition against the free heap. Cheap
    /// enough for tests and verification runs, far too slow to
    /// call after every request in production.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        self.segments.check()?;
        if let Some((_, b)) = self.segments.iter()
            .tuple_windows()
            .find(|(a, b)| a.is_free() && b.is_free()) {
            return Err(InvariantError::AdjacentFree { at: b.left() });
        }
        let mut free_segments = 0;
        for s in self.segments.iter() {
            if let Some(position) = s.heap_position() {
                free_segments += 1;
                match self.free.get(position) {
                    Some(e) if Rc::ptr_eq(e, s) => {},
                    _   => {
                        return Err(InvariantError::MisplacedBackRef { left: s.left(), position });
                    }
                }
            }
        }
        if free_segments != self.free.len() {
            return Err(InvariantError::HeapMismatch { free_segments, heap_len: self.free.len() });
        }
        if let Some(position) = self.free.first_disorder() {
            return Err(InvariantError::HeapOrder { position });
        }

        Ok(())
    }

    fn issue(&self, id: SegmentId) -> Allocation {
        let s = &self.segments[id];
        Allocation {
            id,
            generation: self.segments.generation(id).unwrap_or_default(),
            offset:     s.left(),
            size:       s.size(),
        }
    }

    fn resolve(&self, handle: &Allocation) -> Result<&Rc<Segment>, FreeError> {
        let slot = handle.id.index();
        let current = self.segments.generation(handle.id)
            .ok_or(FreeError::UnknownSlot { slot })?;
        let stale = FreeError::StaleHandle { slot, generation: handle.generation, current };
        if current != handle.generation {
            return Err(stale);
        }
        match self.segments.get(handle.id) {
            Some(s) if !s.is_free() => Ok(s),
            _   => Err(stale),
        }
    }

    fn absorb_if_free(&mut self, segment: &Rc<Segment>, neighbour: SegmentId) {
        let other = Rc::clone(&self.segments[neighbour]);
        if let Some(position) = other.heap_position() {
            self.free.erase(position);
            self.segments.remove(neighbour);
            segment.unite(&other);
            trace!("Coalesced [{}, {}) into [{}, {})",
                other.left(), other.right(), segment.left(), segment.right());
        }
    }
}

impl fmt::Debug for MemoryManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let map = self.segments()
            .map(|s| format!("[{}, {}){}", s.left, s.right, if s.free { "" } else { "*" }))
            .join(" ");
        f.debug_struct("MemoryManager")
            .field("total", &self.total_size())
            .field("largest_free", &self.largest_free())
            .field("map", &map)
            .finish()
    }
}
