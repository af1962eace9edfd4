//! The address-ordered view of memory.
//!
//! Segments live in an arena of slots linked both ways, so that
//! splitting a segment or dropping a merged neighbour is O(1) once
//! the segment is known. Vacated slots go to a recycling list.
//! Each slot carries a generation counter that moves forward every
//! time a handle to the slot stops being valid.
use crate::utils::*;
use crate::{Segment, SegmentId};
use std::ops::Index;

struct Node {
    segment:    Option<Rc<Segment>>,
    prev:       Option<SegmentId>,
    next:       Option<SegmentId>,
    generation: u32,
}

pub struct SegmentPartition {
    nodes:      Vec<Node>,
    unused:     Vec<SegmentId>,
    head:       SegmentId,
    total_size: ByteSteps,
    len:        usize,
}

impl SegmentPartition {
    /// A partition holding exactly one segment, `[0, total_size)`.
    pub fn new(total_size: ByteSteps) -> Self {
        let head = SegmentId(0);
        Self {
            nodes: vec![Node {
                segment:    Some(Rc::new(Segment::new(head, 0, total_size))),
                prev:       None,
                next:       None,
                generation: 0,
            }],
            unused: vec![],
            head,
            total_size,
            len: 1,
        }
    }

    #[inline]
    pub fn total_size(&self) -> ByteSteps {
        self.total_size
    }

    /// Number of segments currently in the partition.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Never true: some segment always covers address 0.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The segment starting at address 0.
    #[inline]
    pub fn first(&self) -> SegmentId {
        self.head
    }

    #[inline]
    pub fn get(&self, id: SegmentId) -> Option<&Rc<Segment>> {
        self.nodes.get(id.0)?.segment.as_ref()
    }

    /// `None` if the slot has never been handed out.
    #[inline]
    pub fn generation(&self, id: SegmentId) -> Option<u32> {
        self.nodes.get(id.0).map(|n| n.generation)
    }

    #[inline]
    pub fn prev(&self, id: SegmentId) -> Option<SegmentId> {
        self.nodes.get(id.0)?.prev
    }

    #[inline]
    pub fn next(&self, id: SegmentId) -> Option<SegmentId> {
        self.nodes.get(id.0)?.next
    }

    /// Links a new segment `[left, right)` right before `at`.
    pub fn insert_before(&mut self, at: SegmentId, left: ByteSteps, right: ByteSteps) -> SegmentId {
        let id = self.vacant_slot();
        let prev = self.nodes[at.0].prev;
        {
            let node = &mut self.nodes[id.0];
            node.segment = Some(Rc::new(Segment::new(id, left, right)));
            node.prev = prev;
            node.next = Some(at);
        }
        self.nodes[at.0].prev = Some(id);
        match prev {
            Some(p) => { self.nodes[p.0].next = Some(id); },
            None    => { self.head = id; },
        }
        self.len += 1;

        id
    }

    /// Unlinks the segment at `id` and recycles its slot.
    ///
    /// Panics if the slot is vacant: the caller has lost track of
    /// the partition.
    pub fn remove(&mut self, id: SegmentId) -> Rc<Segment> {
        let node = &mut self.nodes[id.0];
        let segment = node.segment
            .take()
            .unwrap_or_else(|| panic!("Removing vacant segment slot {}!", id.0));
        let (prev, next) = (node.prev.take(), node.next.take());
        node.generation = node.generation.wrapping_add(1);
        match prev {
            Some(p) => { self.nodes[p.0].next = next; },
            None    => {
                self.head = next.unwrap_or_else(|| panic!("Removing the only segment!"));
            },
        }
        if let Some(n) = next {
            self.nodes[n.0].prev = prev;
        }
        self.unused.push(id);
        self.len -= 1;

        segment
    }

    /// Retires every handle issued so far for `id`, leaving the
    /// segment itself in place.
    #[inline]
    pub fn invalidate(&mut self, id: SegmentId) {
        let node = &mut self.nodes[id.0];
        node.generation = node.generation.wrapping_add(1);
    }

    /// Segments in increasing address order.
    pub fn iter(&self) -> Iter<'_> {
        Iter {
            partition:  self,
            cursor:     Some(self.head),
        }
    }

    /// Verifies that the linked segments tile `[0, total_size)`.
    pub fn check(&self) -> Result<(), InvariantError> {
        let first = &self[self.head];
        if first.left() != 0 {
            return Err(InvariantError::BadStart { left: first.left() });
        }
        for s in self.iter() {
            if s.left() > s.right() {
                return Err(InvariantError::Inverted { left: s.left(), right: s.right() });
            }
        }
        if let Some((a, b)) = self.iter()
            .tuple_windows()
            .find(|(a, b)| a.right() != b.left()) {
            return Err(InvariantError::Gap { end: a.right(), start: b.left() });
        }
        let linked = self.iter().count();
        if linked != self.len {
            return Err(InvariantError::BadLength { linked, counted: self.len });
        }
        // `iter` always yields at least the head.
        let last_right = self.iter()
            .last()
            .map_or(0, |s| s.right());
        if last_right != self.total_size {
            return Err(InvariantError::BadEnd { right: last_right, total: self.total_size });
        }

        Ok(())
    }

    fn vacant_slot(&mut self) -> SegmentId {
        if let Some(id) = self.unused.pop() {
            id
        } else {
            self.nodes.push(Node {
                segment:    None,
                prev:       None,
                next:       None,
                generation: 0,
            });
            SegmentId(self.nodes.len() - 1)
        }
    }
}

impl Index<SegmentId> for SegmentPartition {
    type Output = Rc<Segment>;

    fn index(&self, id: SegmentId) -> &Self::Output {
        self.get(id)
            .unwrap_or_else(|| panic!("Segment slot {} is vacant!", id.0))
    }
}

pub struct Iter<'a> {
    partition:  &'a SegmentPartition,
    cursor:     Option<SegmentId>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a Rc<Segment>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.cursor?;
        self.cursor = self.partition.next(id);

        self.partition.get(id)
    }
}
