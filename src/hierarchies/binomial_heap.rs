/*! A mergeable binomial heap over singly-linked sibling lists

# About
A binomial heap is a forest of *binomial trees* — a tree of order `k` has exactly `2^k`
nodes and a root with `k` children of orders `k-1` down to `0` — kept so that the root
list holds at most one tree per order, in strictly increasing order. That makes the forest
a binary number: inserting is incrementing (carry by joining equal-order trees), and
merging two heaps is addition. The payoff over the binary heap is `merge` in O(log n)
instead of O(n), while everything else stays logarithmic.

Node identity matters here. [`insert`](BinomialHeap::insert) hands back a [`NodeRef`]
token, and the structure promises that however many sifts happen afterwards, the token
still names the entry it was minted for: rebalancing swaps *whole nodes* (link fields and
orders) around the payloads rather than moving payloads between nodes. That is what makes
[`update`](BinomialHeap::update) (decrease- or increase-key) and
[`remove`](BinomialHeap::remove) of an arbitrary live entry possible.

# Design
Each node carries an `eldest` child link, a `sibling` link threading both the root list
and every child list, a `parent` back-link, and its `order`. Children hang eldest-first,
so a root of order `k` lists its children in orders `k-1, …, 0` — which is why extraction
*reverses* the unlinked root's child list before carry-merging it back into the forest.

The node swap is the delicate part: exchanging a parent and child's link fields while
patching the ancestor's child list (a sibling-list walk finds the predecessor, the price
of single links). After the positional exchange both affected child lists are re-parented;
the original design this port follows left non-eldest children pointing at their former
parent, which survives a single update-then-drain sequence but not repeated repositioning
of the same region.

Nodes are owned by the heap; a `NodeRef` is a raw token, so the operations that consume
one are `unsafe` — the caller vouches the token came from this heap and its entry is
still live.

# Example
```rust
    use heapred::hierarchies::binomial_heap::BinomialHeap;
    use heapred::compare::NaturalOrder;

    let mut heap = BinomialHeap::new(NaturalOrder);
    let _a = heap.insert(30);
    let b = heap.insert(20);
    let _c = heap.insert(10);

    assert_eq!(heap.peek(), Some(&10));
    assert_eq!(heap.extract(), 10);

    // Decrease 20 to 5 through its token; it surfaces first
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
    eldest: Link<T>,
    sibling: Link<T>,
    parent: Link<T>,
    order: u32,
}

/// An opaque token naming one live entry of a [`BinomialHeap`].
///
/// Tokens survive every sift; they die with the entry they name (extract or
/// remove). Using a dead or foreign token is undefined behaviour, which is why
/// the token-consuming operations are `unsafe`.
pub struct NodeRef<T>(*mut Node<T>);

impl<T> Clone for NodeRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for NodeRef<T> {}

/// # About
///
/// See the [module-level documentation](crate::hierarchies::binomial_heap) for
/// more information.
pub struct BinomialHeap<T, C> {
    trees: Link<T>,
    count: usize,
    compare: C,
}

impl<T, C: Compare<T>> BinomialHeap<T, C> {
    /// Creates an empty heap ordered by `compare`.
    pub fn new(compare: C) -> Self {
        BinomialHeap {
            trees: None,
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
    ///
    /// The list is strictly increasing after every public operation; with `n`
    /// entries it matches the set bits of `n`.
    pub fn root_orders(&self) -> Vec<u32> {
        let mut orders = Vec::new();
        let mut cur = self.trees;
        while let Some(node) = cur {
            // SAFETY: root-list nodes are live and owned by this heap
            unsafe {
                orders.push((*node).order);
                cur = (*node).sibling;
            }
        }
        orders
    }

    /// Returns a reference to the first entry in heap order, scanning the
    /// root list in O(log n) time.
    pub fn peek(&self) -> Option<&T> {
        let trees = self.trees?;
        // SAFETY: the root list is live; unorder_child only walks sibling links
        unsafe { Some(&(*self.unorder_child(trees)).item) }
    }

    /// Adds an entry in O(log n) time, carry-merging the new order-0 tree
    /// into the root list. The returned token names the entry for later
    /// [`update`](Self::update)/[`remove`](Self::remove) calls.
    pub fn insert(&mut self, item: T) -> NodeRef<T> {
        let fresh = Box::into_raw(Box::new(Node {
            item,
            eldest: None,
            sibling: None,
            parent: None,
            order: 0,
        }));

        // SAFETY: fresh is unaliased; the root list is owned by this heap
        unsafe {
            let mut key = fresh;
            let mut cur = self.trees;

            while let Some(node) = cur {
                if (*key).order != (*node).order {
                    break;
                }

                let next = (*node).sibling;
                key = self.join_trees(key, node);
                cur = next;
            }

            (*key).sibling = cur;
            self.trees = Some(key);
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
            let mut key = self.trees.expect("non-empty heap has roots");
            let mut key_prev: Link<T> = None;
            let mut node = key;
            let mut cur = (*key).sibling;

            // Locate the minimum root, remembering its predecessor
            while let Some(root) = cur {
                if self.compare.compare(&(*root).item, &(*key).item) == Ordering::Less {
                    key_prev = Some(node);
                    key = root;
                }

                node = root;
                cur = (*root).sibling;
            }

            self.unlink_root(key_prev, key);
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
    /// node up by whole-node swaps or sifting it down as the new key demands.
    ///
    /// # Safety
    /// `node` must have been minted by this heap and its entry must still be
    /// live.
    pub unsafe fn update(&mut self, node: NodeRef<T>, item: T) {
        let key = node.0;
        (*key).item = item;

        if let Some(parent) = (*key).parent {
            if self.compare.compare(&(*parent).item, &(*key).item) == Ordering::Greater {
                // Bubble up; remember the displaced tree root for the root
                // list fixup below
                let mut old_root;
                loop {
                    old_root = (*key).parent.expect("bubbling node has a parent");
                    self.swap_nodes(old_root, key);

                    match (*key).parent {
                        Some(p)
                            if self.compare.compare(&(*p).item, &(*key).item)
                                == Ordering::Greater => {}
                        _ => break,
                    }
                }

                if (*key).parent.is_some() {
                    // Settled inside the tree: the root list is untouched
                    return;
                }

                // The key took over a tree root slot: relink the root list
                let first = self.trees.expect("non-empty heap has roots");
                if first == old_root {
                    self.trees = Some(key);
                    return;
                }

                let mut prev = first;
                while (*prev).sibling != Some(old_root) {
                    prev = (*prev).sibling.expect("displaced root is in the root list");
                }
                (*prev).sibling = Some(key);

                return;
            }
        }

        self.sift_down(key);
    }

    /// Removes the entry a token names and returns it, forcing the node to
    /// its tree root by repeated parent swaps before unlinking it.
    ///
    /// # Safety
    /// `node` must have been minted by this heap and its entry must still be
    /// live. The token is dead afterwards.
    pub unsafe fn remove(&mut self, node: NodeRef<T>) -> T {
        let key = node.0;

        if (*key).parent.is_some() {
            // Promote to the root slot regardless of key order
            let mut old_root = key;
            while let Some(parent) = (*key).parent {
                old_root = parent;
                self.swap_nodes(parent, key);
            }

            // Relink the root list to the promoted node
            let first = self.trees.expect("non-empty heap has roots");
            if first == old_root {
                self.trees = Some(key);
            } else {
                let mut prev = first;
                while (*prev).sibling != Some(old_root) {
                    prev = (*prev).sibling.expect("displaced root is in the root list");
                }
                (*prev).sibling = Some(key);
            }
        }

        // Locate the predecessor in the root list and unlink
        let mut key_prev: Link<T> = None;
        let mut cur = self.trees.expect("non-empty heap has roots");
        while cur != key {
            key_prev = Some(cur);
            cur = (*cur).sibling.expect("token names a root-list member");
        }

        self.unlink_root(key_prev, key);
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
        let Some(other) = source.trees else { return };

        match self.trees {
            None => self.trees = Some(other),
            // SAFETY: both forests are live; merge_trees consumes both lists
            Some(mine) => unsafe {
                self.trees = Some(self.merge_trees(mine, other));
            },
        }

        self.count += source.count;
        source.trees = None;
        source.count = 0;
    }

    // Hangs the heavier of two equal-order roots under the lighter, which
    // becomes an order+1 root. Ties keep `first` on top.
    unsafe fn join_trees(&self, first: *mut Node<T>, second: *mut Node<T>) -> *mut Node<T> {
        debug_assert_eq!((*first).order, (*second).order);

        let (root, child) =
            if self.compare.compare(&(*first).item, &(*second).item) != Ordering::Greater {
                (first, second)
            } else {
                (second, first)
            };

        (*child).parent = Some(root);
        (*child).sibling = (*root).eldest;
        (*root).eldest = Some(child);
        (*root).order += 1;

        root
    }

    // Walks a sibling list for the node linked right before `sibling`.
    unsafe fn previous_sibling(
        &self,
        mut eldest: *mut Node<T>,
        sibling: *mut Node<T>,
    ) -> *mut Node<T> {
        while (*eldest).sibling != Some(sibling) {
            eldest = (*eldest).sibling.expect("sibling is linked after eldest");
        }
        eldest
    }

    // Returns the minimum node of a sibling list (also used on the root list).
    unsafe fn unorder_child(&self, eldest: *mut Node<T>) -> *mut Node<T> {
        let mut inorder = eldest;
        let mut cur = (*eldest).sibling;

        while let Some(node) = cur {
            if self.compare.compare(&(*node).item, &(*inorder).item) == Ordering::Less {
                inorder = node;
            }
            cur = (*node).sibling;
        }

        inorder
    }

    // Exchanges a parent and child node's positions: ancestor linkage, child
    // lists, sibling links and orders all swap; the payloads stay put. Both
    // reshuffled child lists are re-parented afterwards so later updates see
    // consistent back-links.
    unsafe fn swap_nodes(&mut self, parent: *mut Node<T>, node: *mut Node<T>) {
        debug_assert_eq!((*node).parent, Some(parent));

        // Point the ancestor's child list at the node taking parent's place
        let ancestor = (*parent).parent;
        if let Some(anc) = ancestor {
            if (*anc).eldest == Some(parent) {
                (*anc).eldest = Some(node);
            } else {
                let prev = self.previous_sibling((*anc).eldest.expect("parent is linked"), parent);
                (*prev).sibling = Some(node);
            }
        }
        (*node).parent = ancestor;

        if (*parent).eldest == Some(node) {
            // Adjacent: parent becomes node's eldest child
            let grandchildren = (*node).eldest;
            (*node).eldest = Some(parent);
            (*parent).parent = Some(node);
            (*parent).eldest = grandchildren;
        } else {
            // Replace node with parent inside parent's former child list
            let eldest = (*parent).eldest.expect("node is parent's child");
            let prev = self.previous_sibling(eldest, node);
            (*prev).sibling = Some(parent);

            (*parent).parent = Some(node);
            (*parent).eldest = (*node).eldest;
            (*node).eldest = Some(eldest);
        }

        let sibling = (*node).sibling;
        (*node).sibling = (*parent).sibling;
        (*parent).sibling = sibling;

        let order = (*node).order;
        (*node).order = (*parent).order;
        (*parent).order = order;

        self.reparent_children(node);
        self.reparent_children(parent);
    }

    unsafe fn reparent_children(&self, node: *mut Node<T>) {
        let mut cur = (*node).eldest;
        while let Some(child) = cur {
            (*child).parent = Some(node);
            cur = (*child).sibling;
        }
    }

    // Sinks an over-heavy node by swapping with its least child until order
    // holds, fixing the root list up front when the node is a tree root.
    unsafe fn sift_down(&mut self, key: *mut Node<T>) {
        let Some(eldest) = (*key).eldest else { return };

        let mut child = self.unorder_child(eldest);
        if self.compare.compare(&(*key).item, &(*child).item) == Ordering::Less {
            return;
        }

        if (*key).parent.is_none() {
            // The key will sink out of its root slot: relink the root list to
            // the child that is about to take it over
            let first = self.trees.expect("non-empty heap has roots");
            if first != key {
                let mut prev = first;
                while (*prev).sibling != Some(key) {
                    prev = (*prev).sibling.expect("key is in the root list");
                }
                (*prev).sibling = Some(child);
            } else {
                self.trees = Some(child);
            }
        }

        loop {
            self.swap_nodes(key, child);

            let Some(eldest) = (*key).eldest else { break };
            child = self.unorder_child(eldest);

            if self.compare.compare(&(*key).item, &(*child).item) != Ordering::Greater {
                break;
            }
        }
    }

    // Pops `key` out of the root list, reverses its child list into an
    // increasing-order forest and carry-merges that back in.
    unsafe fn unlink_root(&mut self, key_prev: Link<T>, key: *mut Node<T>) {
        match key_prev {
            Some(prev) => (*prev).sibling = (*key).sibling,
            None => self.trees = (*key).sibling,
        }

        let mut reversed: Link<T> = None;
        let mut cur = (*key).eldest;
        while let Some(child) = cur {
            let next = (*child).sibling;

            (*child).parent = None;
            (*child).sibling = reversed;
            reversed = Some(child);

            cur = next;
        }

        if let Some(forest) = reversed {
            match self.trees {
                Some(trees) => self.trees = Some(self.merge_trees(trees, forest)),
                None => self.trees = Some(forest),
            }
        }
    }

    // Picks the lower-order head of two root lists (joining a pair of equal
    // order), advancing the consumed list(s).
    unsafe fn merge_roots(
        &self,
        first: &mut Link<T>,
        second: &mut Link<T>,
    ) -> *mut Node<T> {
        let fst = first.expect("first root list is non-empty");
        let snd = second.expect("second root list is non-empty");

        match (*fst).order.cmp(&(*snd).order) {
            Ordering::Equal => {
                *first = (*fst).sibling;
                *second = (*snd).sibling;
                self.join_trees(fst, snd)
            }
            Ordering::Less => {
                *first = (*fst).sibling;
                fst
            }
            Ordering::Greater => {
                *second = (*snd).sibling;
                snd
            }
        }
    }

    // Carry-style merge of two order-sorted root lists into one.
    unsafe fn merge_trees(
        &self,
        first: *mut Node<T>,
        second: *mut Node<T>,
    ) -> *mut Node<T> {
        let mut first: Link<T> = Some(first);
        let mut second: Link<T> = Some(second);

        let mut head: Link<T> = Some(self.merge_roots(&mut first, &mut second));
        let mut prev: *mut Link<T> = &mut head;
        let mut tail = head.expect("merge produced a head");

        while first.is_some() && second.is_some() {
            let tree = self.merge_roots(&mut first, &mut second);
            debug_assert!((*tail).order <= (*tree).order);

            if (*tail).order == (*tree).order {
                let joined = self.join_trees(tail, tree);
                *prev = Some(joined);
                tail = joined;
            } else {
                prev = &mut (*tail).sibling;
                (*tail).sibling = Some(tree);
                tail = tree;
            }
        }

        let mut rest = if first.is_none() { second } else { first };

        while let Some(tree) = rest {
            if (*tail).order != (*tree).order {
                break;
            }

            let next = (*tree).sibling;
            let joined = self.join_trees(tail, tree);
            *prev = Some(joined);
            tail = joined;
            rest = next;
        }

        (*tail).sibling = rest;

        head.expect("merge produced a head")
    }
}

impl<T, C> Drop for BinomialHeap<T, C> {
    fn drop(&mut self) {
        // SAFETY: the forest is exclusively ours; recursion depth is bounded
        // by the tree order, i.e. log2 of the entry count
        unsafe fn free_list<T>(mut list: Link<T>) {
            while let Some(node) = list {
                let boxed = Box::from_raw(node);
                free_list(boxed.eldest);
                list = boxed.sibling;
            }
        }

        unsafe { free_list(self.trees) };
    }
}
