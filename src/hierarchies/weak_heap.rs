/*! A weak heap over a fixed array and a reverse-bit map

# About
A weak heap relaxes the binary heap property just enough to buy cheaper restructuring:
instead of requiring every parent to precede both children, each element only has to
follow its *distinguished ancestor* (the parent of the nearest ancestor that is a right
child). The payoff is that restoring order after a mutation never rotates a subtree; a
single value swap plus one flipped *reverse bit* re-hangs a whole subtree on the other
side of its parent. Weak heaps get within a whisker of the information-theoretic lower
bound on comparisons, which also makes
[`weak_heap_sort`](crate::hierarchies::weak_heap::weak_heap_sort) a respectable sorting
algorithm, not just a party trick.

# Design
Storage is a [`FixedArray`](crate::sequences::fixed_array::FixedArray) of slots plus a
[`Bitmap`](crate::sequences::bitmap::Bitmap) of reverse bits, one per slot. The reverse
bit at `i` decides which physical child is the *logical left* child:

```text
    left(i)  = 2i + rbit(i)
    right(i) = 2i + 1 - rbit(i)
```

The root sits at slot 0 and, by the index arithmetic above, has no left child; its entire
subtree hangs off slot 1. Flipping `rbit(i)` therefore exchanges the roles of `i`'s two
subtrees in O(1), and the *join* primitive (compare a node against its distinguished
ancestor, swap values and flip the bit when out of order) is the only structural move in
the whole module.

Construction exploits a neat trick: while all reverse bits are still zero, the
distinguished ancestor of `i` is just `i >> (trailing_zeros(i) + 1)`, so the O(n)
bottom-up build never walks the ancestor chain.

Insert into a full heap and extract from an empty one are contract violations and panic.

# Example
```rust
    use heapred::hierarchies::weak_heap::{WeakHeap, weak_heap_sort};
    use heapred::compare::NaturalOrder;

    let mut heap = WeakHeap::with_capacity(8, NaturalOrder);
    for key in [5, 1, 9, 3] {
        heap.insert(key);
    }
    assert_eq!(heap.peek(), Some(&1));
    assert_eq!(heap.extract(), 1);
    assert_eq!(heap.extract(), 3);

    let mut v = [2, 12, 0, 1, 3, 10];
    weak_heap_sort(&mut v, &NaturalOrder);
    assert_eq!(v, [0, 1, 2, 3, 10, 12]);
```
*/

use crate::compare::{Compare, Reverse};
use crate::sequences::bitmap::Bitmap;
use crate::sequences::fixed_array::FixedArray;
use std::cmp::Ordering;

const ROOT: usize = 0;

fn left_index(rbits: &Bitmap, index: usize) -> usize {
    2 * index + rbits.test(index) as usize
}

fn right_index(rbits: &Bitmap, index: usize) -> usize {
    2 * index + 1 - rbits.test(index) as usize
}

fn parent_index(index: usize) -> usize {
    debug_assert!(index > 0);
    index / 2
}

fn is_left_child(rbits: &Bitmap, index: usize) -> bool {
    (index & 1 == 1) == rbits.test(parent_index(index))
}

// A leaf at an even index is its parent's only child (the odd sibling slot is
// still unoccupied).
fn is_single_leaf(index: usize) -> bool {
    index & 1 == 0
}

// Walks up while the node is a left child, then one more step: the parent of
// the nearest right-child ancestor is the distinguished ancestor.
fn dancestor_index(rbits: &Bitmap, mut index: usize) -> usize {
    debug_assert!(index > 0);

    while is_left_child(rbits, index) {
        index = parent_index(index);
    }

    parent_index(index)
}

// O(1) distinguished ancestor, valid only while reverse bits are all zero
// (i.e. during bottom-up construction).
fn fast_dancestor_index(index: usize) -> usize {
    debug_assert!(index > 0);

    index >> (index.trailing_zeros() + 1)
}

// Joins the weak sub-heaps rooted at `node` and its distinguished ancestor.
// When the node precedes its ancestor, their values swap and the node's
// reverse bit flips, re-hanging the node's former left subtree (ordered
// against the old value) as the right subtree of the new one. Returns true
// when order already held.
fn join<T, C: Compare<T>>(
    slots: &mut [T],
    rbits: &mut Bitmap,
    dancestor: usize,
    node: usize,
    compare: &C,
) -> bool {
    if compare.compare(&slots[node], &slots[dancestor]) == Ordering::Less {
        slots.swap(node, dancestor);
        rbits.toggle(node);
        return false;
    }

    true
}

// Re-establishes heap order between the root and its entire subtree: descend
// the left spine of the root's right subtree, then join every node on the way
// back up against the root.
fn sift_down<T, C: Compare<T>>(slots: &mut [T], rbits: &mut Bitmap, count: usize, compare: &C) {
    let mut index = right_index(rbits, ROOT);

    loop {
        let child = left_index(rbits, index);
        if child >= count {
            break;
        }
        index = child;
    }

    while index != ROOT {
        join(slots, rbits, ROOT, index, compare);
        index = parent_index(index);
    }
}

// Bottom-up construction: visit nodes in reverse order, joining each with its
// distinguished ancestor. Reverse bits start all-zero, so the fast ancestor
// computation applies.
fn make_heap<T, C: Compare<T>>(slots: &mut [T], rbits: &mut Bitmap, count: usize, compare: &C) {
    for node in (1..count).rev() {
        join(slots, rbits, fast_dancestor_index(node), node, compare);
    }
}

/// Sorts a slice in place into comparator order in O(n log n) time.
///
/// Builds a weak heap under the *reversed* comparator, then repeatedly swaps
/// the root with the last live slot and sifts down over the shrinking prefix.
pub fn weak_heap_sort<T, C: Compare<T> + Clone>(values: &mut [T], compare: &C) {
    let mut count = values.len();
    if count < 2 {
        return;
    }

    let reverse = Reverse(compare.clone());
    let mut rbits = Bitmap::new(count);

    make_heap(values, &mut rbits, count, &reverse);

    loop {
        values.swap(ROOT, count - 1);

        count -= 1;
        if count <= 1 {
            break;
        }

        sift_down(values, &mut rbits, count, &reverse);
    }
}

/// # About
///
/// See the [module-level documentation](crate::hierarchies::weak_heap) for
/// more information.
#[derive(Debug)]
pub struct WeakHeap<T, C> {
    slots: FixedArray<T>,
    rbits: Bitmap,
    compare: C,
}

impl<T, C: Compare<T>> WeakHeap<T, C> {
    /// Creates an empty heap holding at most `capacity` elements, ordered by
    /// `compare`.
    pub fn with_capacity(capacity: usize, compare: C) -> Self {
        WeakHeap {
            slots: FixedArray::with_capacity(capacity),
            rbits: Bitmap::new(capacity),
            compare,
        }
    }

    /// Builds a heap over an entire buffer in O(n) time; the buffer length
    /// becomes the heap's fixed capacity.
    pub fn build(values: Vec<T>, compare: C) -> Self {
        let mut heap = WeakHeap {
            slots: FixedArray::from_vec(values),
            rbits: Bitmap::new(1),
            compare,
        };

        let count = heap.slots.len();
        heap.rbits = Bitmap::new(count);
        make_heap(heap.slots.as_mut_slice(), &mut heap.rbits, count, &heap.compare);

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
            Some(self.slots.slot(ROOT))
        }
    }

    /// Adds an element in O(log n) time. Inserting into a full heap panics.
    pub fn insert(&mut self, value: T) {
        let index = self.slots.len();

        self.slots.push(value);
        self.rbits.clear(index);

        if index == ROOT {
            return;
        }

        if is_single_leaf(index) {
            // A lone child might as well be a left child: clearing the
            // parent's bit saves one comparison on the next sift through it
            self.rbits.clear(parent_index(index));
        }

        // Sift up by joining with successive distinguished ancestors
        let mut index = index;
        loop {
            let dancestor = dancestor_index(&self.rbits, index);

            if join(
                self.slots.as_mut_slice(),
                &mut self.rbits,
                dancestor,
                index,
                &self.compare,
            ) {
                break;
            }

            index = dancestor;
            if index == ROOT {
                break;
            }
        }
    }

    /// Removes and returns the first element in heap order in O(log n) time.
    /// Extracting from an empty heap panics.
    pub fn extract(&mut self) -> T {
        assert!(!self.slots.is_empty(), "extract from an empty heap");

        let value = self.slots.swap_remove(ROOT);

        let count = self.slots.len();
        if count > 1 {
            sift_down(self.slots.as_mut_slice(), &mut self.rbits, count, &self.compare);
        }

        value
    }

    /// Drops all elements and resets every reverse bit, keeping capacity.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.rbits.clear_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::NaturalOrder;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    // Every non-root element must follow its distinguished ancestor.
    fn check_weak_heap_property(heap: &WeakHeap<u32, NaturalOrder>) {
        let slots = heap.slots.as_slice();
        for index in 1..slots.len() {
            let ancestor = dancestor_index(&heap.rbits, index);
            assert!(
                slots[ancestor] <= slots[index],
                "slot {index} precedes its distinguished ancestor {ancestor}"
            );
        }
    }

    #[test]
    fn insert_then_extract_sorts() {
        let keys = [7u32, 2, 9, 4, 4, 0, 11, 5];
        let mut heap = WeakHeap::with_capacity(keys.len(), NaturalOrder);

        for key in keys {
            heap.insert(key);
            check_weak_heap_property(&heap);
        }
        assert_eq!(heap.len(), keys.len());
        assert_eq!(heap.peek(), Some(&0));

        let mut drained = Vec::new();
        while !heap.is_empty() {
            drained.push(heap.extract());
            check_weak_heap_property(&heap);
        }
        assert_eq!(drained, [0, 2, 4, 4, 5, 7, 9, 11]);
    }

    #[test]
    fn build_heapifies_in_linear_pass() {
        let mut heap = WeakHeap::build(vec![5u32, 1, 4, 2, 3, 9, 0], NaturalOrder);
        check_weak_heap_property(&heap);

        let mut drained = Vec::new();
        while !heap.is_empty() {
            drained.push(heap.extract());
        }
        assert_eq!(drained, [0, 1, 2, 3, 4, 5, 9]);
    }

    #[test]
    fn sort_matches_scenario() {
        let mut values = [2u32, 12, 12, 0, 1, 3, 10, 9, 3, 11, 4, 6, 5, 2];
        weak_heap_sort(&mut values, &NaturalOrder);
        assert_eq!(values, [0, 1, 2, 2, 3, 3, 4, 5, 6, 9, 10, 11, 12, 12]);
    }

    #[test]
    fn sort_is_a_permutation_on_random_input() {
        let mut rng = StdRng::seed_from_u64(0xF3);

        for len in [0usize, 1, 2, 3, 5, 31, 32, 33, 500] {
            let values: Vec<u32> = (0..len).map(|_| rng.random_range(0..64)).collect();
            let mut expect = values.clone();
            expect.sort();

            let mut got = values.clone();
            weak_heap_sort(&mut got, &NaturalOrder);
            assert_eq!(got, expect, "len {len}");
        }
    }

    #[test]
    fn random_interleaving_respects_order() {
        let mut rng = StdRng::seed_from_u64(0xAB);
        let mut heap = WeakHeap::with_capacity(64, NaturalOrder);
        let mut shadow: Vec<u32> = Vec::new();

        for _ in 0..500 {
            if !heap.is_full() && (shadow.is_empty() || rng.random_bool(0.6)) {
                let v = rng.random_range(0..1000);
                heap.insert(v);
                shadow.push(v);
            } else {
                let got = heap.extract();
                shadow.sort();
                assert_eq!(got, shadow.remove(0));
            }
            assert_eq!(heap.len(), shadow.len());
        }
    }

    #[test]
    #[should_panic(expected = "empty heap")]
    fn empty_extract_is_a_bug() {
        let mut heap: WeakHeap<u32, NaturalOrder> = WeakHeap::with_capacity(1, NaturalOrder);
        let _ = heap.extract();
    }
}
