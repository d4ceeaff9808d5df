/*! A mergeable binomial heap over doubly-linked sibling lists

# About
Same forest, same contract as the [singly-linked binomial heap]
(crate::hierarchies::binomial_heap), different linkage: every sibling list (the root list
included) carries `prev` alongside `next`. What the extra word per node buys is the
disappearance of every predecessor *walk* — unlinking an arbitrary root, or patching the
ancestor's child list during a node swap, is O(1) pointer surgery instead of a scan from
the eldest sibling. The asymptotics of the public operations don't change (the minimum
scan still dominates), but the constant factors of `update`/`remove`-heavy workloads do.

Entry identity works exactly as in the singly-linked variant: [`insert`]
(DoublyBinomialHeap::insert) mints a [`NodeRef`] token, rebalancing swaps whole nodes
around the payloads, and the token stays good until its entry is extracted or removed.

# Design
A node holds `prev`/`next` sibling links, a `parent` back-link, a `child` link to its
eldest child and its `order`. Lists are straight chains, not rings: the original design
this follows threads its lists through a sentinel embedded in the heap struct, which a
movable Rust value cannot do (the sentinel's neighbors would dangle on every move), so
the head-pointer encoding stands in. Children hang eldest-first with descending orders;
extraction reverses the unlinked root's child list before carry-merging it back.

The carry merge builds its result by appending trees in nondecreasing order and joining
at the tail whenever two neighbors collide on order; with `prev` links, the tail join
needs no walk either. After a node swap both reshuffled child lists are re-parented, as
in the singly-linked variant.

# Example
```rust
    use heapred::hierarchies::doubly_binomial_heap::DoublyBinomialHeap;
    use heapred::compare::NaturalOrder;

    let mut heap = DoublyBinomialHeap::new(NaturalOrder);
    let _a = heap.insert(30);
    let b = heap.insert(20);
    let _c = heap.insert(10);

    assert_eq!(heap.peek(), Some(&10));
    assert_eq!(heap.extract(), 10);

    unsafe { heap.update(b, 5) };
    assert_eq!(heap.extract(), 5);
    assert_eq!(heap.extract(), 30);
    assert!(heap.is_empty());
```
*/

use crate::compare::Compare;
use std::cmp::Ordering;

type Link<T> = Option<*mut Node<T>>;

struct Node<T> {
    item: T,
    prev: Link<T>,
    next: Link<T>,
    parent: Link<T>,
    child: Link<T>,
    order: u32,
}

/// An opaque token naming one live entry of a [`DoublyBinomialHeap`].
///
/// Tokens survive every sift; they die with the entry they name. Using a dead
/// or foreign token is undefined behaviour, which is why the token-consuming
/// operations are `unsafe`.
pub struct NodeRef<T>(*mut Node<T>);

impl<T> Clone for NodeRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for NodeRef<T> {}

/// # About
///
/// See the [module-level documentation](crate::hierarchies::doubly_binomial_heap)
/// for more information.
pub struct DoublyBinomialHeap<T, C> {
    roots: Link<T>,
    count: usize,
    compare: C,
}

impl<T, C: Compare<T>> DoublyBinomialHeap<T, C> {
    /// Creates an empty heap ordered by `compare`.
    pub fn new(compare: C) -> Self {
        DoublyBinomialHeap {
            roots: None,
            count: 0,
            compare,
        }
    }

    /// Returns the number of live entries.
    pub fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if the heap holds no entries.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the orders of the root trees, in root-list order.
    pub fn root_orders(&self) -> Vec<u32> {
        let mut orders = Vec::new();
        let mut cur = self.roots;
        while let Some(node) = cur {
            // SAFETY: root-list nodes are live and owned by this heap
            unsafe {
                orders.push((*node).order);
                cur = (*node).next;
            }
        }
        orders
    }

    /// Returns a reference to the first entry in heap order, scanning the
    /// root list in O(log n) time.
    pub fn peek(&self) -> Option<&T> {
        let roots = self.roots?;
        // SAFETY: the root list is live; the scan only follows next links
        unsafe { Some(&(*self.inorder_node(roots)).item) }
    }

    /// Adds an entry in O(log n) time, carry-merging the new order-0 tree
    /// into the root list. The returned token names the entry for later
    /// [`update`](Self::update)/[`remove`](Self::remove) calls.
    pub fn insert(&mut self, item: T) -> NodeRef<T> {
        let fresh = Box::into_raw(Box::new(Node {
            item,
            prev: None,
            next: None,
            parent: None,
            child: None,
            order: 0,
        }));

        // SAFETY: fresh is unaliased; the root list is owned by this heap
        unsafe {
            let mut key = fresh;
            let mut cur = self.roots;

            while let Some(node) = cur {
                if (*key).order != (*node).order {
                    break;
                }

                let next = (*node).next;
                key = self.join_trees(key, node);
                cur = next;
            }

            (*key).prev = None;
            (*key).next = cur;
            if let Some(rest) = cur {
                (*rest).prev = Some(key);
            }
            self.roots = Some(key);
        }

        self.count += 1;

        NodeRef(fresh)
    }

    /// Removes and returns the first entry in heap order in O(log n) time.
    /// Extracting from an empty heap panics.
    pub fn extract(&mut self) -> T {
        assert!(self.count > 0, "extract from an empty heap");

        // SAFETY: the forest is live and exclusively owned by this heap
        unsafe {
            let key = self.inorder_node(self.roots.expect("non-empty heap has roots"));

            self.remove_root(key);
            self.count -= 1;

            Box::from_raw(key).item
        }
    }

    /// Reads the entry a token names.
    ///
    /// # Safety
    /// `node` must have been minted by this heap and its entry must still be
    /// live (neither extracted nor removed).
    pub unsafe fn get(&self, node: NodeRef<T>) -> &T {
        &(*node.0).item
    }

    /// Replaces the entry a token names and restores heap order, bubbling the
    /// node up by whole-node swaps or sinking it as the new key demands.
    ///
    /// # Safety
    /// `node` must have been minted by this heap and its entry must still be
    /// live.
    pub unsafe fn update(&mut self, node: NodeRef<T>, item: T) {
        let key = node.0;
        (*key).item = item;

        if let Some(parent) = (*key).parent {
            if self.compare.compare(&(*parent).item, &(*key).item) == Ordering::Greater {
                // Bubble up
                loop {
                    let parent = (*key).parent.expect("bubbling node has a parent");
                    self.swap_nodes(parent, key);

                    match (*key).parent {
                        Some(p)
                            if self.compare.compare(&(*p).item, &(*key).item)
                                == Ordering::Greater => {}
                        _ => break,
                    }
                }
                return;
            }
        }

        // Bubble down
        while let Some(child_head) = (*key).child {
            let child = self.inorder_node(child_head);
            if self.compare.compare(&(*key).item, &(*child).item) == Ordering::Less {
                break;
            }
            self.swap_nodes(key, child);
        }
    }

    /// Removes the entry a token names and returns it, forcing the node to
    /// its tree root by repeated parent swaps before unlinking it.
    ///
    /// # Safety
    /// `node` must have been minted by this heap and its entry must still be
    /// live. The token is dead afterwards.
    pub unsafe fn remove(&mut self, node: NodeRef<T>) -> T {
        let key = node.0;

        while let Some(parent) = (*key).parent {
            self.swap_nodes(parent, key);
        }

        self.remove_root(key);
        self.count -= 1;

        Box::from_raw(key).item
    }

    /// Deletes the entry a token names, discarding it.
    ///
    /// # Safety
    /// Same contract as [`remove`](Self::remove).
    pub unsafe fn delete(&mut self, node: NodeRef<T>) {
        drop(self.remove(node));
    }

    /// Absorbs every entry of `source` in O(log n) time by carry-merging the
    /// two root lists, leaving `source` empty.
    pub fn merge(&mut self, source: &mut Self) {
        let Some(other) = source.roots else { return };

        match self.roots {
            None => self.roots = Some(other),
            // SAFETY: both forests are live; merge_lists consumes both lists
            Some(mine) => unsafe {
                self.roots = Some(self.merge_lists(mine, other));
            },
        }

        self.count += source.count;
        source.roots = None;
        source.count = 0;
    }

    // Hangs the heavier of two equal-order roots under the lighter as its new
    // eldest child. Ties keep `first` on top.
    unsafe fn join_trees(&self, first: *mut Node<T>, second: *mut Node<T>) -> *mut Node<T> {
        debug_assert_eq!((*first).order, (*second).order);

        let (root, child) =
            if self.compare.compare(&(*first).item, &(*second).item) != Ordering::Greater {
                (first, second)
            } else {
                (second, first)
            };

        (*child).parent = Some(root);
        (*child).prev = None;
        (*child).next = (*root).child;
        if let Some(eldest) = (*root).child {
            (*eldest).prev = Some(child);
        }
        (*root).child = Some(child);
        (*root).order += 1;

        root
    }

    // Returns the minimum node of a sibling chain (also used on the root list).
    unsafe fn inorder_node(&self, head: *mut Node<T>) -> *mut Node<T> {
        let mut inorder = head;
        let mut cur = (*head).next;

        while let Some(node) = cur {
            if self.compare.compare(&(*node).item, &(*inorder).item) == Ordering::Less {
                inorder = node;
            }
            cur = (*node).next;
        }

        inorder
    }

    // Exchanges a parent and child node's positions. Every neighbor is
    // reachable in O(1) through the doubly-linked siblings; afterwards both
    // reshuffled child lists are re-parented.
    unsafe fn swap_nodes(&mut self, parent: *mut Node<T>, node: *mut Node<T>) {
        debug_assert_eq!((*node).parent, Some(parent));

        let ancestor = (*parent).parent;
        let p_prev = (*parent).prev;
        let p_next = (*parent).next;
        let n_prev = (*node).prev;
        let n_next = (*node).next;
        let p_child = (*parent).child;
        let n_child = (*node).child;

        // Node steps into parent's slot
        (*node).parent = ancestor;
        (*node).prev = p_prev;
        (*node).next = p_next;
        match ancestor {
            Some(anc) => {
                if (*anc).child == Some(parent) {
                    (*anc).child = Some(node);
                }
            }
            None => {
                if self.roots == Some(parent) {
                    self.roots = Some(node);
                }
            }
        }
        if let Some(prev) = p_prev {
            (*prev).next = Some(node);
        }
        if let Some(next) = p_next {
            (*next).prev = Some(node);
        }

        // Node adopts parent's former children, with parent standing in for
        // itself in that list
        (*node).child = if p_child == Some(node) {
            Some(parent)
        } else {
            p_child
        };

        // Parent steps into node's slot among node's former siblings
        (*parent).parent = Some(node);
        (*parent).prev = n_prev;
        (*parent).next = n_next;
        if let Some(prev) = n_prev {
            (*prev).next = Some(parent);
        }
        if let Some(next) = n_next {
            (*next).prev = Some(parent);
        }

        // Parent adopts node's former children
        (*parent).child = n_child;

        let order = (*node).order;
        (*node).order = (*parent).order;
        (*parent).order = order;

        self.reparent_children(node);
        self.reparent_children(parent);
    }

    unsafe fn reparent_children(&self, node: *mut Node<T>) {
        let mut cur = (*node).child;
        while let Some(child) = cur {
            (*child).parent = Some(node);
            cur = (*child).next;
        }
    }

    // Pops a root out of the root list in O(1), reverses its child list into
    // an increasing-order forest and carry-merges that back in.
    unsafe fn remove_root(&mut self, key: *mut Node<T>) {
        match (*key).prev {
            Some(prev) => (*prev).next = (*key).next,
            None => self.roots = (*key).next,
        }
        if let Some(next) = (*key).next {
            (*next).prev = (*key).prev;
        }

        let mut reversed: Link<T> = None;
        let mut cur = (*key).child;
        while let Some(child) = cur {
            let next = (*child).next;

            (*child).parent = None;
            (*child).prev = None;
            (*child).next = reversed;
            if let Some(head) = reversed {
                (*head).prev = Some(child);
            }
            reversed = Some(child);

            cur = next;
        }

        if let Some(forest) = reversed {
            self.roots = match self.roots {
                Some(mine) => Some(self.merge_lists(mine, forest)),
                None => Some(forest),
            };
        }
    }

    // Detaches and returns the head of a standalone root list.
    unsafe fn pop_head(&self, list: &mut Link<T>) -> *mut Node<T> {
        let head = list.expect("pop from an empty root list");
        *list = (*head).next;
        if let Some(next) = *list {
            (*next).prev = None;
        }
        (*head).prev = None;
        (*head).next = None;
        head
    }

    // Appends a tree to the merge result, joining with the current tail when
    // their orders collide; the result list stays strictly increasing.
    unsafe fn append_tree(&self, head: &mut Link<T>, tail: &mut Link<T>, tree: *mut Node<T>) {
        let Some(last) = *tail else {
            (*tree).prev = None;
            (*tree).next = None;
            *head = Some(tree);
            *tail = Some(tree);
            return;
        };

        debug_assert!((*last).order <= (*tree).order);

        if (*last).order == (*tree).order {
            let before = (*last).prev;
            let joined = self.join_trees(last, tree);

            (*joined).prev = before;
            (*joined).next = None;
            match before {
                Some(prev) => (*prev).next = Some(joined),
                None => *head = Some(joined),
            }
            *tail = Some(joined);
            return;
        }

        (*last).next = Some(tree);
        (*tree).prev = Some(last);
        (*tree).next = None;
        *tail = Some(tree);
    }

    // Carry-style merge of two order-sorted root lists into one.
    unsafe fn merge_lists(&self, first: *mut Node<T>, second: *mut Node<T>) -> *mut Node<T> {
        let mut first: Link<T> = Some(first);
        let mut second: Link<T> = Some(second);
        let mut head: Link<T> = None;
        let mut tail: Link<T> = None;

        while let (Some(f), Some(s)) = (first, second) {
            let tree = match (*f).order.cmp(&(*s).order) {
                Ordering::Equal => {
                    let a = self.pop_head(&mut first);
                    let b = self.pop_head(&mut second);
                    self.join_trees(a, b)
                }
                Ordering::Less => self.pop_head(&mut first),
                Ordering::Greater => self.pop_head(&mut second),
            };

            self.append_tree(&mut head, &mut tail, tree);
        }

        let mut rest = if first.is_some() { first } else { second };
        while rest.is_some() {
            let tree = self.pop_head(&mut rest);
            self.append_tree(&mut head, &mut tail, tree);
        }

        head.expect("merge produced a head")
    }
}

impl<T, C> Drop for DoublyBinomialHeap<T, C> {
    fn drop(&mut self) {
        // SAFETY: the forest is exclusively ours; recursion depth is bounded
        // by the tree order, i.e. log2 of the entry count
        unsafe fn free_list<T>(mut list: Link<T>) {
            while let Some(node) = list {
                let boxed = Box::from_raw(node);
                free_list(boxed.child);
                list = boxed.next;
            }
        }

        unsafe { free_list(self.roots) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::NaturalOrder;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn check_forest(heap: &DoublyBinomialHeap<u32, NaturalOrder>) {
        let orders = heap.root_orders();
        for pair in orders.windows(2) {
            assert!(pair[0] < pair[1], "root orders not strictly increasing");
        }
        let total: usize = orders.iter().map(|&o| 1usize << o).sum();
        assert_eq!(total, heap.len());

        unsafe fn check_chain(head: Link<u32>, parent: Link<u32>) {
            let mut prev: Link<u32> = None;
            let mut cur = head;
            while let Some(node) = cur {
                assert_eq!((*node).prev, prev, "broken prev link");
                assert_eq!((*node).parent, parent, "stale parent link");
                if let Some(p) = parent {
                    assert!((*node).item >= (*p).item, "heap order violated");
                }
                check_chain((*node).child, Some(node));
                prev = cur;
                cur = (*node).next;
            }
        }

        unsafe { check_chain(heap.roots, None) };
    }

    #[test]
    fn insert_sequence_builds_set_bit_forest() {
        let mut heap = DoublyBinomialHeap::new(NaturalOrder);
        for key in 0u32..17 {
            heap.insert(key);
            check_forest(&heap);
        }
        assert_eq!(heap.root_orders(), [0, 4]);

        for expect in 0u32..17 {
            assert_eq!(heap.extract(), expect);
            check_forest(&heap);
        }
        assert!(heap.is_empty());
    }

    #[test]
    fn decrease_key_resurfaces_entry() {
        let keys = [3u32, 23, 15, 21, 6, 18, 9, 12];
        let mut heap = DoublyBinomialHeap::new(NaturalOrder);

        let mut tokens = Vec::new();
        for key in keys {
            tokens.push(heap.insert(key));
        }

        unsafe { heap.update(tokens[1], 0) };
        check_forest(&heap);

        let mut drained = Vec::new();
        while !heap.is_empty() {
            drained.push(heap.extract());
        }
        assert_eq!(drained, [0, 3, 6, 9, 12, 15, 18, 21]);
    }

    #[test]
    fn increase_key_sinks_entry() {
        let mut heap = DoublyBinomialHeap::new(NaturalOrder);
        let mut tokens = Vec::new();
        for key in [4u32, 8, 15, 16, 23, 42, 2, 1] {
            tokens.push(heap.insert(key));
        }

        unsafe { heap.update(tokens[7], 99) };
        check_forest(&heap);

        let mut drained = Vec::new();
        while !heap.is_empty() {
            drained.push(heap.extract());
        }
        assert_eq!(drained, [2, 4, 8, 15, 16, 23, 42, 99]);
    }

    #[test]
    fn remove_unlinks_arbitrary_entries() {
        let keys = [11u32, 12, 18, 10, 14, 15, 21, 17, 13, 16, 20, 19];
        let doomed = [11u32, 12, 14, 17, 21];

        let mut heap = DoublyBinomialHeap::new(NaturalOrder);
        let mut tokens = Vec::new();
        for key in keys {
            tokens.push((key, heap.insert(key)));
        }

        for (key, token) in &tokens {
            if doomed.contains(key) {
                let got = unsafe { heap.remove(*token) };
                assert_eq!(got, *key);
                check_forest(&heap);
            }
        }

        let mut drained = Vec::new();
        while !heap.is_empty() {
            drained.push(heap.extract());
        }
        assert_eq!(drained, [10, 13, 15, 16, 18, 19, 20]);
    }

    #[test]
    fn merge_absorbs_source() {
        let mut first = DoublyBinomialHeap::new(NaturalOrder);
        for key in [41u32, 28, 33, 15, 7, 25, 12] {
            first.insert(key);
        }
        let mut second = DoublyBinomialHeap::new(NaturalOrder);
        for key in [17u32, 10, 44, 50, 31, 48, 29, 8, 6] {
            second.insert(key);
        }

        first.merge(&mut second);
        assert_eq!(first.len(), 16);
        assert_eq!(second.len(), 0);
        check_forest(&first);

        let mut drained = Vec::new();
        while !first.is_empty() {
            drained.push(first.extract());
        }
        assert_eq!(
            drained,
            [6, 7, 8, 10, 12, 15, 17, 25, 28, 29, 31, 33, 41, 44, 48, 50]
        );
    }

    #[test]
    fn random_ops_agree_with_singly_linked_variant() {
        use crate::hierarchies::binomial_heap::BinomialHeap;

        let mut rng = StdRng::seed_from_u64(0xD0);

        for _ in 0..20 {
            let len = rng.random_range(1..100);
            let values: Vec<u32> = (0..len).map(|_| rng.random_range(0..1000)).collect();

            let mut doubly = DoublyBinomialHeap::new(NaturalOrder);
            let mut singly = BinomialHeap::new(NaturalOrder);
            for &v in &values {
                doubly.insert(v);
                singly.insert(v);
            }
            check_forest(&doubly);

            while !doubly.is_empty() {
                assert_eq!(doubly.extract(), singly.extract());
            }
            assert!(singly.is_empty());
        }
    }
}
