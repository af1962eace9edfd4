//! An array-backed binary heap that keeps its elements' owners
//! informed about where each element currently lives.
//!
//! `std`'s [`BinaryHeap`](std::collections::BinaryHeap) can only give
//! up its root. We also need to pull out arbitrary elements (a free
//! segment that is about to be merged with a neighbour), and a linear
//! scan for them would ruin the manager's complexity. So every time an
//! element lands on a new array slot the heap calls
//! `on_position_changed(element, Some(slot))`, and when it leaves the
//! heap for good it calls `on_position_changed(element, None)`. An owner
//! that records those positions can later [`erase`](IndexedHeap::erase)
//! the element in O(log n).
use crate::utils::*;

pub struct IndexedHeap<T, C, N>
where
    C: Fn(&T, &T) -> bool,
    N: FnMut(&T, Option<usize>),
{
    elements:               Vec<T>,
    // `true` if the first argument belongs nearer the root.
    ranks_above:            C,
    on_position_changed:    N,
}

impl<T, C, N> IndexedHeap<T, C, N>
where
    C: Fn(&T, &T) -> bool,
    N: FnMut(&T, Option<usize>),
{
    pub fn new(ranks_above: C, on_position_changed: N) -> Self {
        Self::with_capacity(0, ranks_above, on_position_changed)
    }

    pub fn with_capacity(capacity: usize, ranks_above: C, on_position_changed: N) -> Self {
        Self {
            elements: Vec::with_capacity(capacity),
            ranks_above,
            on_position_changed,
        }
    }

    /// Inserts `value` and returns the position it settled at.
    pub fn push(&mut self, value: T) -> usize {
        let idx = self.elements.len();
        (self.on_position_changed)(&value, Some(idx));
        self.elements.push(value);

        self.sift_up(idx)
    }

    /// Removes and returns the element at `position`, or `None`
    /// if there is no such position.
    pub fn erase(&mut self, position: usize) -> Option<T> {
        if position >= self.elements.len() { return None; }
        let last = self.elements.len() - 1;
        if position != last {
            self.swap(position, last);
        }
        let removed = self.elements.pop()?;
        (self.on_position_changed)(&removed, None);
        if position < self.elements.len() {
            // The element moved in from the back may belong
            // either above or below its new slot.
            let settled = self.sift_up(position);
            self.sift_down(settled);
        }

        Some(removed)
    }

    #[inline]
    pub fn top(&self) -> Option<&T> {
        self.elements.first()
    }

    #[inline]
    pub fn pop(&mut self) -> Option<T> {
        self.erase(0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    #[inline]
    pub fn get(&self, position: usize) -> Option<&T> {
        self.elements.get(position)
    }

    /// Walks the backing array in position order (not rank order).
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.elements.iter()
    }

    /// Checks the heap property over the whole array. Returns the
    /// first position that outranks its parent, if any.
    pub fn first_disorder(&self) -> Option<usize> {
        (1..self.elements.len())
            .find(|&idx| {
                (self.ranks_above)(&self.elements[idx], &self.elements[Self::parent(idx)])
            })
    }

    #[inline]
    fn parent(idx: usize) -> usize {
        (idx - 1) / 2
    }

    // Owners are told about both moves before the values are
    // exchanged.
    fn swap(&mut self, first: usize, second: usize) {
        (self.on_position_changed)(&self.elements[first], Some(second));
        (self.on_position_changed)(&self.elements[second], Some(first));
        self.elements.swap(first, second);
    }

    fn sift_up(&mut self, mut idx: usize) -> usize {
        while idx > 0 {
            let parent = Self::parent(idx);
            if !(self.ranks_above)(&self.elements[idx], &self.elements[parent]) { break; }
            self.swap(idx, parent);
            idx = parent;
        }

        idx
    }

    fn sift_down(&mut self, mut idx: usize) {
        let len = self.elements.len();
        loop {
            let left = 2 * idx + 1;
            if left >= len { break; }
            let right = left + 1;
            let best = if right < len
                && (self.ranks_above)(&self.elements[right], &self.elements[left]) {
                right
            } else {
                left
            };
            if !(self.ranks_above)(&self.elements[best], &self.elements[idx]) { break; }
            self.swap(idx, best);
            idx = best;
        }
    }
}

impl<T, C, N> fmt::Debug for IndexedHeap<T, C, N>
where
    T: fmt::Debug,
    C: Fn(&T, &T) -> bool,
    N: FnMut(&T, Option<usize>),
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndexedHeap")
            .field("elements", &self.elements)
            .finish()
    }
}
