/*! # About
This crate bundles two cooperating cores that grew out of the same systems-programming itch.

The first core is a family of **mergeable priority queues** that share one external contract
(insert, peek, extract, update, remove, heap-merge) but trade internal representation for
different asymptotic profiles:

- [Binary heap](crate::hierarchies::binary_heap): the classic implicit array heap over a
  fixed-capacity slab, with Floyd construction and an in-place heapsort
- [Binomial heap](crate::hierarchies::binomial_heap): a forest of binomial trees over
  singly-linked sibling lists, merged carry-style like binary addition
- [Binomial heap, doubly-linked](crate::hierarchies::doubly_binomial_heap): the same forest
  contract over doubly-linked sibling lists for O(1) arbitrary unlinking
- [Pairing heap](crate::hierarchies::pairing_heap): a multi-way forest with lazy insertion
  and the two-pass pairing combine, plus a stable *handle* per entry so callers can keep a
  reference across decrease-key sifts
- [Weak heap](crate::hierarchies::weak_heap): an array+bitmap structure where flipping a
  per-node *reverse bit* replaces subtree rotation, with a weak-heapsort to boot

The second core is a **multi-threaded word-frequency map-reduce pipeline**: a
[scheduler](crate::mapred::scheduler) partitions a flat byte buffer into delimiter-aligned
chunks, worker threads [tokenize](crate::mapred::token) chunks into per-chunk token stores
(map phase), and the stores are pairwise merged back into one (reduce phase) through a
bounded [operation queue](crate::mapred::task).

Everything else exists in support of those two cores:

- [Fixed array](crate::sequences::fixed_array) and [bitmap](crate::sequences::bitmap)
  primitives backing the array heaps
- A [singly-linked list](crate::sequences::singly_linked_list) with O(1) tail splicing and a
  family of stable list sorts (insertion, selection, bubble, and a hybrid run-building merge
  sort), used by the token store's linear merge
- An arena-backed [AVL tree](crate::hierarchies::avl_tree) used to deduplicate tokens during
  the map phase

# Design
Two conventions hold across the crate. First, ordering is a *capability*: every heap owns a
[comparator](crate::compare::Compare) rather than demanding `T: Ord`, so the same element
type can sit in a min-heap, a max-heap, or anything stranger without wrapper types. Second,
the data structures never suspend and never lock; the only blocking points in the whole
crate are the two ends of the bounded task queue, which is what keeps the concurrency story
of the scheduler small enough to reason about.

The linked heaps hand out opaque node tokens on insert. All rebalancing is performed by
swapping *structure* around the payloads (link fields for the binomial heaps, handle cells
for the pairing heap), so a token handed to the caller keeps resolving to the entry it was
minted for, no matter how many sifts happened in between.
*/

pub mod compare;

pub mod sequences {
    pub mod bitmap;
    pub mod fixed_array;
    pub mod singly_linked_list;
}

pub mod hierarchies {
    pub mod avl_tree;
    pub mod binary_heap;
    pub mod binomial_heap;
    pub mod doubly_binomial_heap;
    pub mod pairing_heap;
    pub mod weak_heap;
}

pub mod mapred {
    pub mod scheduler;
    pub mod task;
    pub mod token;
}
