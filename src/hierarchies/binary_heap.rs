/*! A fixed-capacity, comparator-driven (min) binary heap

# About
The implicit binary heap is the baseline the fancier heaps in this crate get measured
against: no links, no per-node allocation, just index arithmetic over a
[fixed slab](crate::sequences::fixed_array). Whether it behaves as a min-heap or a max-heap
is entirely the [comparator's](crate::compare::Compare) business; the structure itself only
ever asks "does this slot precede that one".

Push and peek are O(log n) / O(1); extraction is O(log n); [`build`](BinaryHeap::build)
heapifies a full load in O(n) with Floyd's bottom-up pass; and
[`sort`](BinaryHeap::sort) runs an in-place heapsort over a caller-supplied slice without
ever allocating a heap at all.

# Design
A complete binary tree flattened into the slab: for slot `i`, the children live at
`2i + 1` and `2i + 2` and the parent at `(i - 1) / 2`. Capacity is fixed at creation; the
embedding contract is that the caller never pushes past it and never extracts from an
empty heap — both are bugs, not runtime conditions, and both panic.

When sift-down finds both children preceding their parent it descends toward the *left*
child on ties, which keeps extraction order deterministic for equal keys.

# Example
```rust
    use heapred::hierarchies::binary_heap::BinaryHeap;
    use heapred::compare::NaturalOrder;

    let mut heap = BinaryHeap::with_capacity(8, NaturalOrder);
    for key in [9, 2, 7, 4] {
        heap.insert(key);
    }

    assert_eq!(heap.peek(), Some(&2));
    assert_eq!(heap.extract(), 2);
    assert_eq!(heap.extract(), 4);
    assert_eq!(heap.len(), 2);

    // In-place heapsort over any mutable slice
    let mut v = [8, 6, 7, 5, 3, 0, 9];
    BinaryHeap::sort(&mut v, &NaturalOrder);
    assert_eq!(v, [0, 3, 5, 6, 7, 8, 9]);
```
*/

use crate::compare::{Compare, Reverse};
use crate::sequences::fixed_array::FixedArray;
use std::cmp::Ordering;

/// # About
///
/// See the [module-level documentation](crate::hierarchies::binary_heap) for more
/// information.
#[derive(Debug)]
pub struct BinaryHeap<T, C> {
    slots: FixedArray<T>,
    compare: C,
}

impl<T, C: Compare<T>> BinaryHeap<T, C> {
    /// Creates an empty heap holding at most `capacity` elements, ordered by
    /// `compare`.
    pub fn with_capacity(capacity: usize, compare: C) -> Self {
        BinaryHeap {
            slots: FixedArray::with_capacity(capacity),
            compare,
        }
    }

    /// Heapifies an entire buffer in O(n) time with Floyd's bottom-up pass;
    /// the buffer length becomes the heap's fixed capacity.
    pub fn build(values: Vec<T>, compare: C) -> Self {
        let mut heap = BinaryHeap {
            slots: FixedArray::from_vec(values),
            compare,
        };

        // Leaves are trivially heaps; sift every parent, last first
        for index in (0..heap.slots.len() / 2).rev() {
            heap.sift_down(index);
        }

        heap
    }

    /// Returns the number of live elements.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if the heap holds no elements.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns `true` if the heap is at capacity.
    pub fn is_full(&self) -> bool {
        self.slots.is_full()
    }

    /// Returns a reference to the first element in heap order.
    pub fn peek(&self) -> Option<&T> {
        if self.slots.is_empty() {
            None
        } else {
            Some(self.slots.slot(0))
        }
    }

    /// Adds an element in O(log n) time. Inserting into a full heap panics.
    pub fn insert(&mut self, value: T) {
        self.slots.push(value);
        self.sift_up(self.slots.len() - 1);
    }

    /// Removes and returns the first element in heap order in O(log n) time.
    /// Extracting from an empty heap panics.
    pub fn extract(&mut self) -> T {
        assert!(!self.slots.is_empty(), "extract from an empty heap");

        let value = self.slots.swap_remove(0);
        if !self.slots.is_empty() {
            self.sift_down(0);
        }
        value
    }

    /// Drops all elements, keeping capacity.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    // Bubbles the slot at `index` toward the root until its parent precedes it.
    fn sift_up(&mut self, mut index: usize) {
        while index > 0 {
            let parent = (index - 1) / 2;

            if self.compare.compare(self.slots.slot(index), self.slots.slot(parent))
                == Ordering::Less
            {
                self.slots.swap(index, parent);
                index = parent;
            } else {
                break;
            }
        }
    }

    // Sinks the slot at `index` until both children follow it. Ties descend
    // left so equal keys extract deterministically.
    fn sift_down(&mut self, index: usize) {
        let end = self.slots.len();
        Self::sift_down_region(&mut self.slots, &self.compare, index, end);
    }

    fn sift_down_region(slots: &mut FixedArray<T>, compare: &C, mut index: usize, end: usize) {
        loop {
            let left = 2 * index + 1;
            let right = 2 * index + 2;
            let mut target = index;

            if left < end
                && compare.compare(slots.slot(left), slots.slot(target)) == Ordering::Less
            {
                target = left;
            }
            if right < end
                && compare.compare(slots.slot(right), slots.slot(target)) == Ordering::Less
            {
                target = right;
            }

            if target == index {
                break;
            }

            slots.swap(index, target);
            index = target;
        }
    }
}

impl<T, C: Compare<T> + Clone> BinaryHeap<T, C> {
    /// Sorts a slice in place into comparator order in O(n log n) time.
    ///
    /// Builds a heap over the buffer with the *reversed* comparator, then
    /// repeatedly swaps the root with the last live slot and sifts down over
    /// the shrinking prefix, leaving the slice in forward order.
    pub fn sort(values: &mut [T], compare: &C) {
        let len = values.len();
        if len < 2 {
            return;
        }

        let reverse = Reverse(compare.clone());

        for index in (0..len / 2).rev() {
            Self::sift_down_slice(values, &reverse, index, len);
        }

        for end in (1..len).rev() {
            values.swap(0, end);
            Self::sift_down_slice(values, &reverse, 0, end);
        }
    }

    // Slice-level twin of sift_down_region for the in-place sort.
    fn sift_down_slice<R: Compare<T>>(values: &mut [T], compare: &R, mut index: usize, end: usize) {
        loop {
            let left = 2 * index + 1;
            let right = 2 * index + 2;
            let mut target = index;

            if left < end && compare.compare(&values[left], &values[target]) == Ordering::Less {
                target = left;
            }
            if right < end && compare.compare(&values[right], &values[target]) == Ordering::Less {
                target = right;
            }

            if target == index {
                break;
            }

            values.swap(index, target);
            index = target;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{NaturalOrder, Reverse};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn insert_then_extract_sorts() {
        let keys = [9u32, 13, 8, 6, 14, 11, 12];
        let mut heap = BinaryHeap::with_capacity(keys.len(), NaturalOrder);

        for key in keys {
            heap.insert(key);
        }
        assert_eq!(heap.len(), keys.len());
        assert_eq!(heap.peek(), Some(&6));

        let mut drained = Vec::new();
        while !heap.is_empty() {
            drained.push(heap.extract());
        }
        assert_eq!(drained, [6, 8, 9, 11, 12, 13, 14]);
    }

    #[test]
    fn build_heapifies_in_place() {
        let mut heap = BinaryHeap::build(vec![5u32, 1, 4, 2, 3], NaturalOrder);

        let mut drained = Vec::new();
        for _ in 0..5 {
            drained.push(heap.extract());
        }
        assert_eq!(drained, [1, 2, 3, 4, 5]);
    }

    #[test]
    fn reverse_comparator_makes_a_max_heap() {
        let mut heap = BinaryHeap::with_capacity(4, Reverse(NaturalOrder));
        for key in [2u32, 9, 4, 7] {
            heap.insert(key);
        }

        assert_eq!(heap.extract(), 9);
        assert_eq!(heap.extract(), 7);
        assert_eq!(heap.extract(), 4);
        assert_eq!(heap.extract(), 2);
    }

    #[test]
    fn count_tracks_every_operation() {
        let mut heap = BinaryHeap::with_capacity(3, NaturalOrder);
        assert_eq!(heap.len(), 0);

        heap.insert(1);
        assert_eq!(heap.len(), 1);
        let _ = heap.peek();
        assert_eq!(heap.len(), 1);
        heap.insert(0);
        assert_eq!(heap.len(), 2);
        heap.extract();
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn sort_matches_reference() {
        let mut rng = StdRng::seed_from_u64(7);

        for len in [0usize, 1, 2, 3, 10, 100, 1000] {
            let mut values: Vec<u32> = (0..len).map(|_| rng.random_range(0..500)).collect();
            let mut expect = values.clone();
            expect.sort();

            BinaryHeap::sort(&mut values, &NaturalOrder);
            assert_eq!(values, expect, "len {len}");
        }
    }

    #[test]
    fn random_heaps_respect_order() {
        let mut rng = StdRng::seed_from_u64(99);

        for _ in 0..20 {
            let len = rng.random_range(1..200);
            let values: Vec<u32> = (0..len).map(|_| rng.random_range(0..100)).collect();

            let mut expect = values.clone();
            expect.sort();

            let mut heap = BinaryHeap::with_capacity(len, NaturalOrder);
            for &v in &values {
                heap.insert(v);
            }

            let mut drained = Vec::with_capacity(len);
            while !heap.is_empty() {
                drained.push(heap.extract());
            }
            assert_eq!(drained, expect);
        }
    }

    #[test]
    #[should_panic(expected = "empty heap")]
    fn empty_extract_is_a_bug() {
        let mut heap: BinaryHeap<u32, NaturalOrder> = BinaryHeap::with_capacity(1, NaturalOrder);
        let _ = heap.extract();
    }
}
