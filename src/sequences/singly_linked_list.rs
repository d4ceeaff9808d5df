/*! A singly-linked list with O(1) tail splicing and a family of stable sorts

# About
Plenty of lists can push and pop. This one earns its keep with *range surgery*: any
contiguous run of nodes can be withdrawn from one list and embedded into another in O(1),
which is the primitive the token-store merge and the hybrid merge sort in this crate are
built on. Singly-linked is enough for that job as long as every operation is phrased in
terms of the position *before* the affected node, and the tail pointer is kept honest on
every mutation that can touch it.

The sorts live here too, because they are really list-splicing algorithms wearing
comparator hats:

- [`insertion_sort`](SList::insertion_sort): the classic stable prefix-growing sort
- [`counted_insertion_from`](SList::counted_insertion_from): insertion sort that stops
  after a bounded number of steps, used to carve sorted *runs* off the front of a list
- [`selection_sort`](SList::selection_sort): stable here, because the minimum is always
  moved to the position right after the sorted prefix and equal elements keep their
  relative order
- [`bubble_sort`](SList::bubble_sort): single-direction passes with a last-swap high
  watermark shrinking the next pass
- [`hybrid_merge_sort`](SList::hybrid_merge_sort): carves runs with the counted insertion
  sort, pushes them onto a small stack of sublists, merges equal-rank neighbors as it
  goes, then cascade-merges the stack; auxiliary space stays logarithmic
- [`merge_sort`](SList::merge_sort): the front door; picks a run length from the list
  size and falls back to plain insertion sort for four nodes or fewer

Every sort is stable, and every sort has a `_hooked` twin threading a [`SortEvents`]
counter handle through the compare/swap accounting, so a test or a bench can ask exactly
how much work a run performed without the plain API paying for it.

# Design
Nodes are heap allocations linked with raw pointers, the same `Option<*mut Node>` idiom as
the [doubly-linked list](crate::sequences) family. A *position* is `Option<*mut Node>`
where `None` stands for the imaginary slot before the first node (what a C implementation
would express with a head sentinel); the node *after* a position is the one an operation
acts on. The struct keeps a `head` link and a `tail` link and no length — keeping a length
would force the O(1) splice to count the nodes it moves, which is exactly the cost the
splice exists to avoid. Callers that need counts (the token store does) track them at
their own level.

The tail invariant: `tail` is `None` exactly when `head` is, and otherwise names the last
node. Every withdraw/embed/append/remove re-establishes it when the affected range touches
the end.

# Example
```rust
    use heapred::sequences::singly_linked_list::SList;
    use heapred::compare::NaturalOrder;

    let mut list: SList<u32> = SList::new();
    for v in [3, 1, 4, 1, 5, 9, 2, 6] {
        list.push_back(v);
    }

    list.merge_sort(&NaturalOrder);
    let sorted: Vec<u32> = list.iter().copied().collect();
    assert_eq!(sorted, [1, 1, 2, 3, 4, 5, 6, 9]);

    // Sorted lists merge in linear time, dedup hook included
    let mut other: SList<u32> = SList::new();
    for v in [1, 7] {
        other.push_back(v);
    }
    list.merge_dedup(&mut other, &NaturalOrder, |_kept, _dropped| {});
    assert!(other.is_empty());
    assert_eq!(list.iter().count(), 9); // one duplicate 1 was dropped
```
*/

use crate::compare::Compare;
use std::cmp::Ordering;
use std::marker::PhantomData;

/// Per-run compare/swap counters, threaded through the `_hooked` sort variants.
///
/// The plain sort entry points run with a throwaway handle; pass your own to
/// measure a specific run. Counters only ever grow, so one handle can span
/// several calls.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SortEvents {
    /// Number of comparator invocations.
    pub compare: u64,
    /// Number of node relocations.
    pub swap: u64,
}

impl SortEvents {
    /// Resets both counters to zero.
    pub fn clear(&mut self) {
        *self = SortEvents::default();
    }
}

// A raw link to a node; None marks the end of the list.
type Link<T> = Option<*mut Node<T>>;

// A cursor position; None is the imaginary slot before the first node.
type Pos<T> = Option<*mut Node<T>>;

struct Node<T> {
    data: T,
    next: Link<T>,
}

/// # About
/// All operations run in O(1) time unless noted otherwise.
///
/// See the [module-level documentation](crate::sequences::singly_linked_list) for more
/// information.
pub struct SList<T> {
    head: Link<T>,
    tail: Link<T>,
}

// SAFETY: an SList exclusively owns its nodes; nothing aliases them outside of
// &mut methods, so sending the list between threads moves sole ownership.
unsafe impl<T: Send> Send for SList<T> {}
// SAFETY: shared references only permit reads of node data.
unsafe impl<T: Sync> Sync for SList<T> {}

impl<T> Default for SList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for SList<T> {
    fn drop(&mut self) {
        while self.pop_front().is_some() {}
    }
}

impl<T> SList<T> {
    /// Creates an empty list.
    pub fn new() -> SList<T> {
        SList {
            head: None,
            tail: None,
        }
    }

    /// Returns `true` if the list holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Returns a reference to the first node's data.
    pub fn front(&self) -> Option<&T> {
        // SAFETY: head is either None or a live node owned by this list
        self.head.map(|node| unsafe { &(*node).data })
    }

    /// Returns a reference to the last node's data.
    pub fn back(&self) -> Option<&T> {
        // SAFETY: tail is either None or a live node owned by this list
        self.tail.map(|node| unsafe { &(*node).data })
    }

    /// Adds a node at the front of the list.
    pub fn push_front(&mut self, data: T) {
        let node = Box::into_raw(Box::new(Node { data, next: None }));
        self.append_after(None, node);
    }

    /// Adds a node at the back of the list (the queueing direction).
    pub fn push_back(&mut self, data: T) {
        let node = Box::into_raw(Box::new(Node { data, next: None }));
        match self.tail {
            // SAFETY: tail is the live last node; appending after it
            Some(tail) => unsafe { (*tail).next = Some(node) },
            None => self.head = Some(node),
        }
        self.tail = Some(node);
    }

    /// Removes and returns the first node's data.
    pub fn pop_front(&mut self) -> Option<T> {
        self.pop_front_node().map(|node| node.data)
    }

    /// Returns an iterator over references to the node data, front to back.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            next: self.head,
            _marker: PhantomData,
        }
    }

    // POSITIONAL PRIMITIVES
    ////////////////////////
    //
    // A Pos of None addresses the slot before the first node; the node acted
    // upon is always the successor of the given position.

    // Returns the node following a position.
    fn next_pos(&self, pos: Pos<T>) -> Link<T> {
        match pos {
            None => self.head,
            // SAFETY: positions handed around internally always name live nodes
            Some(node) => unsafe { (*node).next },
        }
    }

    // Links `node` right after `previous`, updating the tail if `previous`
    // was the last node.
    fn append_after(&mut self, previous: Pos<T>, node: *mut Node<T>) {
        let successor = self.next_pos(previous);
        // SAFETY: node is exclusively ours; successor/previous are live or None
        unsafe { (*node).next = successor };
        match previous {
            None => self.head = Some(node),
            Some(prev) => unsafe { (*prev).next = Some(node) },
        }
        if successor.is_none() {
            self.tail = Some(node);
        }
    }

    // Unlinks the node following `previous`, updating the tail if that node
    // was the last one.
    fn remove_after(&mut self, previous: Pos<T>, node: *mut Node<T>) {
        debug_assert_eq!(self.next_pos(previous), Some(node));
        // SAFETY: node is live and owned by this list
        let successor = unsafe { (*node).next };
        match previous {
            None => self.head = successor,
            Some(prev) => unsafe { (*prev).next = successor },
        }
        if successor.is_none() {
            self.tail = previous;
        }
    }

    // Relocates the node following `previous` to the slot following `at`.
    fn move_node(&mut self, at: Pos<T>, previous: Pos<T>, node: *mut Node<T>) {
        self.remove_after(previous, node);
        self.append_after(at, node);
    }

    // Detaches the range (first, last] without touching the nodes' own links.
    fn withdraw(&mut self, first: Pos<T>, last: *mut Node<T>) {
        // SAFETY: last is a live node of this list
        let successor = unsafe { (*last).next };
        match first {
            None => self.head = successor,
            Some(node) => unsafe { (*node).next = successor },
        }
        if successor.is_none() {
            self.tail = first;
        }
    }

    // Inserts the detached chain first..=last after `at`.
    fn embed(&mut self, at: Pos<T>, first: *mut Node<T>, last: *mut Node<T>) {
        let successor = self.next_pos(at);
        // SAFETY: the chain is detached and exclusively ours
        unsafe { (*last).next = successor };
        if successor.is_none() {
            self.tail = Some(last);
        }
        match at {
            None => self.head = Some(first),
            Some(node) => unsafe { (*node).next = Some(first) },
        }
    }

    // Moves the source range (first, last] to this list, right after `at`.
    fn splice(&mut self, at: Pos<T>, source: &mut SList<T>, first: Pos<T>, last: *mut Node<T>) {
        let front = source
            .next_pos(first)
            .expect("splice of an empty source range");
        source.withdraw(first, last);
        self.embed(at, front, last);
    }

    // Takes ownership of the first node.
    fn pop_front_node(&mut self) -> Option<Box<Node<T>>> {
        let node = self.head?;
        // SAFETY: head was allocated by Box::into_raw and is unaliased
        let boxed = unsafe { Box::from_raw(node) };
        self.head = boxed.next;
        if self.head.is_none() {
            self.tail = None;
        }
        Some(boxed)
    }

    // Reads node data during sorting; the pointer always comes from this list.
    fn data<'n>(node: *mut Node<T>) -> &'n T {
        // SAFETY: callers only pass live nodes, and the unbounded lifetime is
        // confined to the duration of a comparator call
        unsafe { &(*node).data }
    }

    // SORTING
    //////////

    // Inserts `node` in comparator order within the sorted prefix. The caller
    // guarantees the node belongs strictly before the current sorted tail, so
    // the scan never has to test for the end of the list.
    fn insert_inorder<C: Compare<T>>(
        &mut self,
        node: *mut Node<T>,
        compare: &C,
        events: &mut SortEvents,
    ) {
        let mut prev: Pos<T> = None;
        let mut cur = self.head;

        loop {
            let here = cur.expect("insert_inorder past the sorted tail");

            events.compare += 1;
            if compare.compare(Self::data(node), Self::data(here)) == Ordering::Less {
                break;
            }

            prev = Some(here);
            cur = self.next_pos(prev);
        }

        self.append_after(prev, node);
    }

    /// Stable insertion sort in O(n²) worst-case time, O(n) on sorted input.
    pub fn insertion_sort<C: Compare<T>>(&mut self, compare: &C) {
        self.insertion_sort_hooked(compare, &mut SortEvents::default());
    }

    /// [`insertion_sort`](Self::insertion_sort) with an event counter handle.
    pub fn insertion_sort_hooked<C: Compare<T>>(&mut self, compare: &C, events: &mut SortEvents) {
        let Some(mut prev) = self.head else { return };
        let mut cur = self.next_pos(Some(prev));

        while let Some(node) = cur {
            events.compare += 1;
            if compare.compare(Self::data(node), Self::data(prev)) == Ordering::Less {
                events.swap += 1;

                self.remove_after(Some(prev), node);
                self.insert_inorder(node, compare, events);

                cur = self.next_pos(Some(prev));
                continue;
            }

            prev = node;
            cur = self.next_pos(Some(prev));
        }
    }

    /// Insertion sort bounded to `count` steps, moving the sorted run from
    /// the front of `source` into this (empty) list.
    ///
    /// This is the run builder for [`hybrid_merge_sort`](Self::hybrid_merge_sort):
    /// it leaves `source` holding everything past the run.
    pub fn counted_insertion_from<C: Compare<T>>(
        &mut self,
        source: &mut SList<T>,
        count: usize,
        compare: &C,
    ) {
        self.counted_insertion_from_hooked(source, count, compare, &mut SortEvents::default());
    }

    /// [`counted_insertion_from`](Self::counted_insertion_from) with an event
    /// counter handle.
    pub fn counted_insertion_from_hooked<C: Compare<T>>(
        &mut self,
        source: &mut SList<T>,
        count: usize,
        compare: &C,
        events: &mut SortEvents,
    ) {
        assert!(self.is_empty(), "counted insertion into a non-empty run");
        assert!(!source.is_empty(), "counted insertion from an empty source");
        assert!(count > 0);

        let mut prev = source.head.expect("non-empty source");
        let mut cur = source.next_pos(Some(prev));
        let mut steps = count;

        loop {
            steps -= 1;
            if steps == 0 {
                break;
            }
            let Some(node) = cur else { break };

            events.compare += 1;
            if compare.compare(Self::data(node), Self::data(prev)) == Ordering::Less {
                events.swap += 1;

                source.remove_after(Some(prev), node);
                source.insert_inorder(node, compare, events);

                cur = source.next_pos(Some(prev));
                continue;
            }

            prev = node;
            cur = source.next_pos(Some(prev));
        }

        self.splice(None, source, None, prev);
    }

    /// Stable selection sort in O(n²) time.
    ///
    /// The minimum of the unsorted suffix is always relocated to the slot
    /// right after the sorted prefix, so elements comparing equal never pass
    /// one another.
    pub fn selection_sort<C: Compare<T>>(&mut self, compare: &C) {
        self.selection_sort_hooked(compare, &mut SortEvents::default());
    }

    /// [`selection_sort`](Self::selection_sort) with an event counter handle.
    pub fn selection_sort_hooked<C: Compare<T>>(&mut self, compare: &C, events: &mut SortEvents) {
        if self.is_empty() {
            return;
        }

        // Tail position of the sorted prefix
        let mut tail: Pos<T> = None;

        loop {
            let first = self.next_pos(tail).expect("unsorted suffix vanished");
            if Some(first) == self.tail {
                // A single unsorted node is already in place
                break;
            }

            let mut prev = first;
            let mut cur = self.next_pos(Some(prev));
            let mut min_prev: Pos<T> = tail;
            let mut min = first;

            while let Some(node) = cur {
                events.compare += 1;
                if compare.compare(Self::data(node), Self::data(min)) == Ordering::Less {
                    min_prev = Some(prev);
                    min = node;
                }

                prev = node;
                cur = self.next_pos(Some(prev));
            }

            if min != first {
                events.swap += 1;
                self.move_node(tail, min_prev, min);
            }

            tail = Some(min);
        }
    }

    /// Stable bubble sort with a last-swap high watermark bounding each pass.
    pub fn bubble_sort<C: Compare<T>>(&mut self, compare: &C) {
        self.bubble_sort_hooked(compare, &mut SortEvents::default());
    }

    /// [`bubble_sort`](Self::bubble_sort) with an event counter handle.
    pub fn bubble_sort_hooked<C: Compare<T>>(&mut self, compare: &C, events: &mut SortEvents) {
        if self.is_empty() {
            return;
        }

        // First node of the already-sorted tail region
        let mut boundary: Link<T> = None;

        loop {
            let mut cur: Pos<T> = None;
            let mut swapped: Link<T> = None;

            loop {
                let mut prev;
                let mut nxt;

                // Walk forward to the next out-of-order pair, or the end of
                // the unsorted region
                loop {
                    prev = cur;
                    cur = self.next_pos(cur);
                    nxt = self.next_pos(cur);
                    if nxt == boundary {
                        nxt = None;
                    }
                    if nxt.is_none() {
                        break;
                    }

                    events.compare += 1;
                    if compare.compare(Self::data(cur.unwrap()), Self::data(nxt.unwrap()))
                        == Ordering::Greater
                    {
                        break;
                    }
                }

                let Some(next_node) = nxt else {
                    // Pass ended cleanly; everything from cur onward is sorted
                    boundary = cur;
                    break;
                };

                // Extract the out-of-order node and scan forward for its slot
                let node = cur.unwrap();
                self.remove_after(prev, node);
                swapped = Some(node);
                cur = Some(next_node);

                loop {
                    prev = cur;
                    cur = self.next_pos(cur);
                    if cur == boundary {
                        cur = None;
                    }
                    if cur.is_none() {
                        break;
                    }

                    events.compare += 1;
                    if compare.compare(Self::data(node), Self::data(cur.unwrap()))
                        != Ordering::Greater
                    {
                        break;
                    }
                }

                events.swap += 1;
                self.append_after(prev, node);

                if cur.is_none() {
                    // The relocated node closed out this pass
                    boundary = Some(node);
                    break;
                }

                cur = swapped;
            }

            if swapped.is_none() {
                break;
            }
        }
    }

    // Merges one maximal source segment into the sorted region starting at
    // `at`; returns the position to resume from. Both lists are sorted.
    fn merge_sorted_segment<C: Compare<T>>(
        &mut self,
        at: Pos<T>,
        source: &mut SList<T>,
        compare: &C,
        events: &mut SortEvents,
    ) -> Pos<T> {
        debug_assert!(!self.is_empty());
        debug_assert!(!source.is_empty());

        let reference = source.head.expect("non-empty source");
        let mut res_cur = at;
        let mut res_nxt = at;

        events.compare += 1;
        if compare.compare(Self::data(reference), Self::data(self.tail.unwrap()))
            != Ordering::Less
        {
            // Fast path: the whole source comes after this list
            let src_last = source.tail.unwrap();
            events.swap += 1;
            let res_last = self.tail;
            self.splice(res_last, source, None, src_last);
            return Some(src_last);
        }

        // Find the first node of this list that must follow the source head
        loop {
            res_nxt = self.next_pos(res_nxt);
            let Some(node) = res_nxt else { break };

            events.compare += 1;
            if compare.compare(Self::data(node), Self::data(reference)) == Ordering::Greater {
                break;
            }

            res_cur = res_nxt;
        }

        let mut src_last = source.tail.unwrap();

        if let Some(res_node) = res_nxt {
            events.compare += 1;
            if compare.compare(Self::data(res_node), Self::data(src_last)) != Ordering::Greater {
                // Only a prefix of the source fits before res_node: find the
                // longest such segment
                let mut src_cur: Pos<T> = None;
                let mut src_nxt: Pos<T> = None;

                loop {
                    src_nxt = source.next_pos(src_nxt);
                    let Some(node) = src_nxt else { break };

                    events.compare += 1;
                    if compare.compare(Self::data(node), Self::data(res_node)) != Ordering::Less {
                        break;
                    }

                    src_cur = src_nxt;
                }

                src_last = src_cur.expect("source head precedes res_node");
            }
        }

        events.swap += 1;
        self.splice(res_cur, source, None, src_last);

        Some(src_last)
    }

    /// Merges the sorted `source` into this sorted list in O(n + m) time,
    /// draining the source. Stability: source elements land after equal
    /// elements already present.
    pub fn merge_presort<C: Compare<T>>(&mut self, source: &mut SList<T>, compare: &C) {
        self.merge_presort_hooked(source, compare, &mut SortEvents::default());
    }

    /// [`merge_presort`](Self::merge_presort) with an event counter handle.
    pub fn merge_presort_hooked<C: Compare<T>>(
        &mut self,
        source: &mut SList<T>,
        compare: &C,
        events: &mut SortEvents,
    ) {
        assert!(!self.is_empty(), "merge into an empty list");
        assert!(!source.is_empty(), "merge from an empty list");

        let mut at: Pos<T> = None;
        while !source.is_empty() {
            at = self.merge_sorted_segment(at, source, compare, events);
        }
    }

    // One dedup-merge step: splices the maximal source prefix preceding the
    // current result node, or folds an equal source head into the result via
    // `merge_equal`. Returns the resume position and the number of nodes moved.
    fn merge_dedup_step<C, F>(
        &mut self,
        at: Pos<T>,
        source: &mut SList<T>,
        compare: &C,
        merge_equal: &mut F,
    ) -> (Pos<T>, usize)
    where
        C: Compare<T>,
        F: FnMut(&mut T, T),
    {
        debug_assert!(!self.is_empty());
        debug_assert!(!source.is_empty());

        let reference = source.head.expect("non-empty source");
        let mut res_cur = at;
        let mut res_nxt = at;
        let mut order = Ordering::Greater;

        loop {
            res_nxt = self.next_pos(res_nxt);
            let Some(node) = res_nxt else { break };

            order = compare.compare(Self::data(node), Self::data(reference));
            if order != Ordering::Less {
                break;
            }

            res_cur = res_nxt;
        }

        if order == Ordering::Equal {
            // Fold the duplicate source head into the matching result node
            let node = res_nxt.unwrap();
            let dropped = source.pop_front_node().expect("non-empty source");
            // SAFETY: node is live and uniquely borrowed through &mut self
            merge_equal(unsafe { &mut (*node).data }, dropped.data);
            return (res_nxt, 0);
        }

        let (src_last, moved) = match res_nxt {
            None => {
                // Nothing left here: take the entire source
                (source.tail.unwrap(), source.iter().count())
            }
            Some(res_node) => {
                let mut src_cur: Pos<T> = None;
                let mut src_nxt: Pos<T> = None;
                let mut moved = 0;

                loop {
                    src_nxt = source.next_pos(src_nxt);
                    let Some(node) = src_nxt else { break };

                    if compare.compare(Self::data(node), Self::data(res_node)) != Ordering::Less {
                        break;
                    }

                    moved += 1;
                    src_cur = src_nxt;
                }

                (src_cur.expect("source head precedes res_node"), moved)
            }
        };

        self.splice(res_cur, source, None, src_last);

        (Some(src_last), moved)
    }

    /// Merges the sorted `source` into this sorted, duplicate-free list,
    /// folding equal elements through `merge_equal` instead of keeping both.
    ///
    /// Runs in O(n + m) time, drains the source, and returns the number of
    /// nodes physically moved over (folded duplicates are not counted).
    pub fn merge_dedup<C, F>(&mut self, source: &mut SList<T>, compare: &C, mut merge_equal: F) -> usize
    where
        C: Compare<T>,
        F: FnMut(&mut T, T),
    {
        assert!(!self.is_empty(), "merge into an empty list");
        assert!(!source.is_empty(), "merge from an empty list");

        let mut at: Pos<T> = None;
        let mut moved = 0;

        while !source.is_empty() {
            let (next_at, step) = self.merge_dedup_step(at, source, compare, &mut merge_equal);
            at = next_at;
            moved += step;
        }

        moved
    }

    /// Sorts with bounded-run insertion sorting plus iterative sublist
    /// merging; `nodes` is the list length (used to size the sublist stack).
    ///
    /// Auxiliary space is O(log n) sublist headers on the stack.
    pub fn hybrid_merge_sort<C: Compare<T>>(&mut self, run_len: usize, nodes: usize, compare: &C) {
        self.hybrid_merge_sort_hooked(run_len, nodes, compare, &mut SortEvents::default());
    }

    /// [`hybrid_merge_sort`](Self::hybrid_merge_sort) with an event counter
    /// handle.
    pub fn hybrid_merge_sort_hooked<C: Compare<T>>(
        &mut self,
        run_len: usize,
        nodes: usize,
        compare: &C,
        events: &mut SortEvents,
    ) {
        assert!(!self.is_empty(), "sort of an empty list");
        assert!(run_len > 0);
        assert!(nodes > 0);

        // Room for the rank cascade plus the final move-up slot
        let slots = ceil_log2((nodes / run_len).max(2)) + 2;

        let mut subs: Vec<SList<T>> = Vec::with_capacity(slots);
        subs.resize_with(slots, SList::new);

        let mut top = 0;
        loop {
            // Carve a sorted run off the front of the list
            let mut run = SList::new();
            run.counted_insertion_from_hooked(self, run_len, compare, events);
            subs[0] = run;

            // Merge same-rank neighbors upward while the next slot is occupied
            let mut rank = 1;
            while !subs[rank].is_empty() {
                let (low, high) = subs.split_at_mut(rank);
                high[0].merge_presort_hooked(&mut low[rank - 1], compare, events);
                rank += 1;
            }

            // Promote the merged chain one slot, freeing the lower ranks
            subs[rank] = std::mem::take(&mut subs[rank - 1]);
            top = top.max(rank);

            if self.is_empty() {
                break;
            }
        }

        // Cascade-merge what remains, highest slot first: the earliest runs
        // were pushed the furthest up, so this order preserves stability.
        *self = std::mem::take(&mut subs[top]);
        for rank in (0..top).rev() {
            if !subs[rank].is_empty() {
                self.merge_presort_hooked(&mut subs[rank], compare, events);
            }
        }
    }

    /// Sorts the list, picking a merge-sort run length from the list size and
    /// falling back to plain insertion sort for four nodes or fewer. Stable.
    pub fn merge_sort<C: Compare<T>>(&mut self, compare: &C) {
        self.merge_sort_hooked(compare, &mut SortEvents::default());
    }

    /// [`merge_sort`](Self::merge_sort) with an event counter handle.
    pub fn merge_sort_hooked<C: Compare<T>>(&mut self, compare: &C, events: &mut SortEvents) {
        let nodes = self.iter().count();
        if nodes == 0 {
            return;
        }

        if nodes <= 4 {
            // Trivial lists are not worth the run machinery
            return self.insertion_sort_hooked(compare, events);
        }

        let run_len = match nodes {
            ..=16 => 4,
            ..=128 => 8,
            ..=1024 => 16,
            ..=8192 => 32,
            ..=65536 => 64,
            _ => 128,
        };

        self.hybrid_merge_sort_hooked(run_len, nodes, compare, events);
    }
}

fn ceil_log2(value: usize) -> usize {
    value.next_power_of_two().trailing_zeros() as usize
}

pub struct Iter<'a, T> {
    next: Link<T>,
    _marker: PhantomData<&'a T>,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        // SAFETY: nodes stay alive for the borrow of the list
        unsafe {
            self.next = (*node).next;
            Some(&(*node).data)
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for SList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::NaturalOrder;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn from_slice<T: Clone>(values: &[T]) -> SList<T> {
        let mut list = SList::new();
        for v in values {
            list.push_back(v.clone());
        }
        list
    }

    fn collect<T: Clone>(list: &SList<T>) -> Vec<T> {
        list.iter().cloned().collect()
    }

    #[test]
    fn queue_ops_maintain_tail() {
        let mut list = SList::new();
        assert!(list.is_empty());
        assert_eq!(list.pop_front(), None);

        list.push_back('a');
        list.push_back('b');
        list.push_front('z');
        assert_eq!(list.front(), Some(&'z'));
        assert_eq!(list.back(), Some(&'b'));

        assert_eq!(list.pop_front(), Some('z'));
        assert_eq!(list.pop_front(), Some('a'));
        assert_eq!(list.pop_front(), Some('b'));
        assert!(list.is_empty());

        // The tail must have been retired along with the last node
        list.push_back('c');
        assert_eq!(list.back(), Some(&'c'));
    }

    #[test]
    fn all_sorts_agree_with_reference() {
        let mut rng = StdRng::seed_from_u64(0x51157);

        for len in [1usize, 2, 3, 4, 5, 17, 64, 257] {
            let values: Vec<u32> = (0..len).map(|_| rng.random_range(0..64)).collect();
            let mut expect = values.clone();
            expect.sort();

            let mut list = from_slice(&values);
            list.insertion_sort(&NaturalOrder);
            assert_eq!(collect(&list), expect, "insertion, len {len}");

            let mut list = from_slice(&values);
            list.selection_sort(&NaturalOrder);
            assert_eq!(collect(&list), expect, "selection, len {len}");

            let mut list = from_slice(&values);
            list.bubble_sort(&NaturalOrder);
            assert_eq!(collect(&list), expect, "bubble, len {len}");

            let mut list = from_slice(&values);
            list.merge_sort(&NaturalOrder);
            assert_eq!(collect(&list), expect, "merge, len {len}");
        }
    }

    // Stable sorts must keep the relative order of equal keys; tags make any
    // illegal crossing visible.
    fn check_stability(sort: impl Fn(&mut SList<(u32, char)>)) {
        let keys = [3, 2, 4, 3, 6, 5, 9, 9, 7, 8, 1, 0, 3];
        let tagged: Vec<(u32, char)> = keys
            .iter()
            .zip('a'..)
            .map(|(&k, tag)| (k, tag))
            .collect();

        let mut list = from_slice(&tagged);
        sort(&mut list);

        let sorted = collect(&list);
        let got_keys: Vec<u32> = sorted.iter().map(|e| e.0).collect();
        let got_tags: Vec<char> = sorted.iter().map(|e| e.1).collect();

        assert_eq!(got_keys, [0, 1, 2, 3, 3, 3, 4, 5, 6, 7, 8, 9, 9]);
        assert_eq!(
            got_tags,
            ['l', 'k', 'b', 'a', 'd', 'm', 'c', 'f', 'e', 'i', 'j', 'g', 'h']
        );
    }

    fn by_key(a: &(u32, char), b: &(u32, char)) -> Ordering {
        a.0.cmp(&b.0)
    }

    #[test]
    fn insertion_sort_is_stable() {
        check_stability(|list| list.insertion_sort(&by_key));
    }

    #[test]
    fn selection_sort_is_stable() {
        check_stability(|list| list.selection_sort(&by_key));
    }

    #[test]
    fn bubble_sort_is_stable() {
        check_stability(|list| list.bubble_sort(&by_key));
    }

    #[test]
    fn hybrid_merge_sort_is_stable() {
        check_stability(|list| list.hybrid_merge_sort(4, 13, &by_key));
    }

    #[test]
    fn merge_sort_heuristic_is_stable() {
        check_stability(|list| list.merge_sort(&by_key));
    }

    #[test]
    fn counted_insertion_builds_bounded_runs() {
        let mut source = from_slice(&[5u32, 3, 8, 1, 9, 2, 7]);
        let mut run = SList::new();

        run.counted_insertion_from(&mut source, 4, &NaturalOrder);

        // The run took four nodes off the front, sorted
        assert_eq!(collect(&run), [1, 3, 5, 8]);
        assert_eq!(collect(&source), [9, 2, 7]);

        // The remainder still splices and sorts fine
        let mut rest = SList::new();
        rest.counted_insertion_from(&mut source, 4, &NaturalOrder);
        assert_eq!(collect(&rest), [2, 7, 9]);
        assert!(source.is_empty());
    }

    #[test]
    fn sorted_input_costs_n_minus_one_compares() {
        let mut list = from_slice(&[1u32, 2, 3, 4, 5, 6, 7, 8]);
        let mut events = SortEvents::default();

        list.insertion_sort_hooked(&NaturalOrder, &mut events);

        assert_eq!(events.compare, 7);
        assert_eq!(events.swap, 0);
    }

    #[test]
    fn merge_presort_interleaves_and_drains() {
        let mut result = from_slice(&[1u32, 4, 5, 9]);
        let mut source = from_slice(&[2u32, 3, 6, 10, 11]);

        result.merge_presort(&mut source, &NaturalOrder);

        assert_eq!(collect(&result), [1, 2, 3, 4, 5, 6, 9, 10, 11]);
        assert!(source.is_empty());
        assert_eq!(result.back(), Some(&11));
    }

    #[test]
    fn merge_dedup_folds_equals() {
        let mut result = from_slice(&[(b"0", 1u32), (b"5", 1)]);
        let mut source = from_slice(&[(b"0", 1u32), (b"2", 1)]);
        let cmp = |a: &(&[u8; 1], u32), b: &(&[u8; 1], u32)| a.0.cmp(b.0);

        let moved = result.merge_dedup(&mut source, &cmp, |kept, dropped| kept.1 += dropped.1);

        let entries = collect(&result);
        assert_eq!(entries[0], (b"0", 2));
        assert_eq!(entries[1], (b"2", 1));
        assert_eq!(entries[2], (b"5", 1));
        assert_eq!(moved, 1);
        assert!(source.is_empty());
    }

    #[test]
    fn random_merges_stay_sorted() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..50 {
            let a_len = rng.random_range(1..40);
            let b_len = rng.random_range(1..40);
            let mut a: Vec<u32> = (0..a_len).map(|_| rng.random_range(0..30)).collect();
            let mut b: Vec<u32> = (0..b_len).map(|_| rng.random_range(0..30)).collect();
            a.sort();
            b.sort();

            let mut expect = a.clone();
            expect.extend_from_slice(&b);
            expect.sort();

            let mut result = from_slice(&a);
            let mut source = from_slice(&b);
            result.merge_presort(&mut source, &NaturalOrder);
            assert_eq!(collect(&result), expect);
        }
    }
}
