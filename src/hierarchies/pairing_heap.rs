/*! A pairing heap with stable entry handles

# About
The pairing heap is the lazy one of the family: [`insert`](PairingHeap::insert) just links
the new node into the root list and walks away, [`merge`](PairingHeap::merge) splices two
root lists together, and all the real work is deferred to
[`extract`](PairingHeap::extract), which runs the celebrated *two-pass pairing combine* —
pair up the loose trees left to right, then fold the pairs back right to left into a
single tree. No shape constraint, no per-operation rebalancing, amortized logarithmic
extraction; in practice it is one of the fastest decrease-key heaps known.

The decrease-key story is where the *handle* protocol comes in. Every inserted entry
lives in its own stable allocation and is paired with a tree node through a two-way
link: the entry names its current node, the node names its entry. Promotion never moves
an entry's memory and never touches tree links — it just *re-labels* nodes by swapping
two entry↔node pairings, an O(1) move that leaves every outstanding [`EntryRef`]
pointing at the right key. Callers can hold a handle across any number of heap
operations and it keeps resolving correctly until the entry itself is extracted or
removed.

# Design
A node carries `youngest` (head of its child list), `sibling`, `parent`, a `rank`
(incremented each time the node wins a join — the child count), and the back-pointer to
its entry. The forest hangs off a root list; after any extract the heap is a single
tree, and subsequent lazy inserts pile up as additional roots until the next extract
sweeps them up: the combine runs over the detached root's children concatenated with
whatever other roots accumulated.

- `promote` (decrease-key) swaps entry pairings up the parent chain while heap order is
  violated.
- `demote` (increase-key) detaches the entry's tree extract-style but keeps both
  allocations, re-linking the node as a fresh rank-0 root, so the caller's handle
  survives.
- `remove` promotes unconditionally to the tree root, then does the extract-style
  cleanup.

Entries and nodes are owned by the heap; an `EntryRef` is a raw token, so the operations
consuming one are `unsafe` — the caller vouches it came from this heap and is still
live.

# Example
```rust
    use heapred::hierarchies::pairing_heap::PairingHeap;
    use heapred::compare::NaturalOrder;

    let mut heap = PairingHeap::new(NaturalOrder);
    let _a = heap.insert(30);
    let b = heap.insert(20);
    let _c = heap.insert(10);

    assert_eq!(heap.peek(), Some(&10));
    assert_eq!(heap.extract(), 10);

    // The handle still resolves after the combine
    assert_eq!(unsafe { *heap.get(b) }, 20);
    unsafe { heap.promote(b, 5) };
    assert_eq!(heap.extract(), 5);
    assert_eq!(heap.extract(), 30);
```
*/

use crate::compare::Compare;
use std::cmp::Ordering;

type Link<T> = Option<*mut Node<T>>;

struct Node<T> {
    youngest: Link<T>,
    sibling: Link<T>,
    parent: Link<T>,
    rank: u32,
    entry: *mut Entry<T>,
}

// The stable allocation a caller's handle points at: the payload plus the
// entry's current node. swap_entries keeps `(*entry.node).entry == entry`.
struct Entry<T> {
    item: T,
    node: *mut Node<T>,
}

/// An opaque handle naming one live entry of a [`PairingHeap`].
///
/// Handles survive every sift, combine and merge; they die with the entry
/// they name (extract or remove). Using a dead or foreign handle is undefined
/// behaviour, which is why the handle-consuming operations are `unsafe`.
pub struct EntryRef<T>(*mut Entry<T>);

impl<T> Clone for EntryRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T> Copy for EntryRef<T> {}

/// # About
///
/// See the [module-level documentation](crate::hierarchies::pairing_heap) for
/// more information.
pub struct PairingHeap<T, C> {
    roots: Link<T>,
    count: usize,
    compare: C,
}

impl<T, C: Compare<T>> PairingHeap<T, C> {
    /// Creates an empty heap ordered by `compare`.
    pub fn new(compare: C) -> Self {
        PairingHeap {
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

    /// Returns a reference to the first entry in heap order, scanning the
    /// root list.
    pub fn peek(&self) -> Option<&T> {
        let roots = self.roots?;
        // SAFETY: the root list is live; the scan only follows sibling links
        unsafe { Some(&(*(*self.min_root(roots).0).entry).item) }
    }

    /// Adds an entry lazily in O(1) time: the new node simply joins the root
    /// list. The returned handle names the entry for later
    /// [`promote`](Self::promote)/[`demote`](Self::demote)/[`remove`](Self::remove)
    /// calls.
    pub fn insert(&mut self, item: T) -> EntryRef<T> {
        let entry = Box::into_raw(Box::new(Entry {
            item,
            node: std::ptr::null_mut(),
        }));
        let node = Box::into_raw(Box::new(Node {
            youngest: None,
            sibling: self.roots,
            parent: None,
            rank: 0,
            entry,
        }));

        // SAFETY: both allocations are fresh and unaliased
        unsafe { (*entry).node = node };
        self.roots = Some(node);
        self.count += 1;

        EntryRef(entry)
    }

    /// Removes and returns the first entry in heap order; amortized
    /// O(log n). Extracting from an empty heap panics.
    ///
    /// The two-pass combine runs over the detached root's child list
    /// concatenated with the remaining roots, leaving a single tree.
    pub fn extract(&mut self) -> T {
        assert!(self.count > 0, "extract from an empty heap");

        // SAFETY: the forest is live and exclusively owned by this heap
        unsafe {
            let (key, key_prev) = self.min_root(self.roots.expect("non-empty heap has roots"));

            // Unlink the minimum root
            match key_prev {
                Some(prev) => (*prev).sibling = (*key).sibling,
                None => self.roots = (*key).sibling,
            }

            // Children first, then the leftover roots, through the two-pass
            // combine
            let chain = Self::concat((*key).youngest, self.roots);
            self.roots = self.combine(chain);
            self.count -= 1;

            let node = Box::from_raw(key);
            Box::from_raw(node.entry).item
        }
    }

    /// Reads the entry a handle names.
    ///
    /// # Safety
    /// `entry` must have been minted by this heap and must still be live
    /// (neither extracted nor removed).
    pub unsafe fn get(&self, entry: EntryRef<T>) -> &T {
        &(*entry.0).item
    }

    /// Returns the rank (join wins, i.e. child count) of the node currently
    /// carrying the entry. Diagnostic accessor.
    ///
    /// # Safety
    /// Same contract as [`get`](Self::get).
    pub unsafe fn rank(&self, entry: EntryRef<T>) -> u32 {
        (*(*entry.0).node).rank
    }

    /// Decreases the entry to `item` and bubbles it toward the root by
    /// handle swaps while its parent follows it.
    ///
    /// # Safety
    /// `entry` must have been minted by this heap and must still be live.
    /// `item` must not order after the entry's current key.
    pub unsafe fn promote(&mut self, entry: EntryRef<T>, item: T) {
        (*entry.0).item = item;

        let mut node = (*entry.0).node;
        while let Some(parent) = (*node).parent {
            if self.node_order(parent, node) != Ordering::Greater {
                break;
            }

            Self::swap_entries(parent, node);
            node = parent;
        }
    }

    /// Increases the entry to `item` by detaching it extract-style and
    /// re-linking its node as a fresh root; the handle stays live.
    ///
    /// # Safety
    /// `entry` must have been minted by this heap and must still be live.
    pub unsafe fn demote(&mut self, entry: EntryRef<T>, item: T) {
        (*entry.0).item = item;

        let node = self.detach(entry);

        (*node).youngest = None;
        (*node).parent = None;
        (*node).rank = 0;
        (*node).sibling = self.roots;
        self.roots = Some(node);
    }

    /// Replaces the entry's key, promoting or demoting as the comparison
    /// demands.
    ///
    /// # Safety
    /// `entry` must have been minted by this heap and must still be live.
    pub unsafe fn update(&mut self, entry: EntryRef<T>, item: T) {
        match self.compare.compare(&item, &(*entry.0).item) {
            Ordering::Less => self.promote(entry, item),
            Ordering::Greater => self.demote(entry, item),
            Ordering::Equal => (*entry.0).item = item,
        }
    }

    /// Removes the entry a handle names and returns it: unconditional
    /// promotion to its tree root, then the extract-style cleanup.
    ///
    /// # Safety
    /// `entry` must have been minted by this heap and must still be live.
    /// The handle is dead afterwards.
    pub unsafe fn remove(&mut self, entry: EntryRef<T>) -> T {
        let node = self.detach(entry);

        self.count -= 1;

        let node = Box::from_raw(node);
        Box::from_raw(node.entry).item
    }

    /// Absorbs every entry of `source` in O(r) time (r = source root count)
    /// by splicing its root list into this one, leaving `source` empty.
    pub fn merge(&mut self, source: &mut Self) {
        let Some(other) = source.roots else { return };

        // SAFETY: both root lists are live; the walk finds source's last root
        unsafe {
            let mut last = other;
            while let Some(next) = (*last).sibling {
                last = next;
            }
            (*last).sibling = self.roots;
        }
        self.roots = Some(other);

        self.count += source.count;
        source.roots = None;
        source.count = 0;
    }

    fn node_order(&self, first: *mut Node<T>, second: *mut Node<T>) -> Ordering {
        // SAFETY: both nodes are live members of this heap
        unsafe {
            self.compare
                .compare(&(*(*first).entry).item, &(*(*second).entry).item)
        }
    }

    // Scans the root list for the minimum, returning it and its predecessor.
    unsafe fn min_root(&self, head: *mut Node<T>) -> (*mut Node<T>, Link<T>) {
        let mut min = head;
        let mut min_prev: Link<T> = None;

        let mut prev = head;
        let mut cur = (*head).sibling;
        while let Some(node) = cur {
            if self.node_order(node, min) == Ordering::Less {
                min_prev = Some(prev);
                min = node;
            }
            prev = node;
            cur = (*node).sibling;
        }

        (min, min_prev)
    }

    // Exchanges which entries two nodes carry: the entries' node cells and
    // the nodes' entry back-pointers swap, the tree structure stays put.
    unsafe fn swap_entries(first: *mut Node<T>, second: *mut Node<T>) {
        let first_entry = (*first).entry;
        let second_entry = (*second).entry;

        (*first_entry).node = second;
        (*second_entry).node = first;

        (*first).entry = second_entry;
        (*second).entry = first_entry;
    }

    // Hangs the loser of a comparison under the winner as its new youngest
    // child; the winner's rank counts the join. Ties keep `first` on top.
    unsafe fn join(&self, first: *mut Node<T>, second: *mut Node<T>) -> *mut Node<T> {
        let (root, child) = if self.node_order(first, second) != Ordering::Greater {
            (first, second)
        } else {
            (second, first)
        };

        (*child).parent = Some(root);
        (*child).sibling = (*root).youngest;
        (*root).youngest = Some(child);
        (*root).rank += 1;

        root
    }

    // Appends `rest` after the last node of `chain`.
    unsafe fn concat(chain: Link<T>, rest: Link<T>) -> Link<T> {
        let Some(head) = chain else { return rest };

        let mut last = head;
        while let Some(next) = (*last).sibling {
            last = next;
        }
        (*last).sibling = rest;

        Some(head)
    }

    // The two-pass pairing combine: pair the trees up left to right, then
    // fold the pairs back right to left into a single tree.
    unsafe fn combine(&self, mut list: Link<T>) -> Link<T> {
        // Pass one: join adjacent pairs, stacking the results so the last
        // pair surfaces first
        let mut stack: Link<T> = None;
        while let Some(first) = list {
            list = (*first).sibling;

            let tree = match list {
                Some(second) => {
                    list = (*second).sibling;
                    self.join(first, second)
                }
                None => first,
            };

            (*tree).parent = None;
            (*tree).sibling = stack;
            stack = Some(tree);
        }

        // Pass two: walking the stack front-to-back is right-to-left over
        // the original pairs
        let mut result: Link<T> = None;
        while let Some(tree) = stack {
            stack = (*tree).sibling;
            (*tree).sibling = None;

            result = Some(match result {
                None => tree,
                Some(folded) => self.join(tree, folded),
            });
        }

        result
    }

    // Shared tail of demote/remove: forces the entry's node to its tree root
    // by handle swaps, unlinks that root, and combines its children back
    // into the root list. Returns the detached, childless-by-now node.
    unsafe fn detach(&mut self, entry: EntryRef<T>) -> *mut Node<T> {
        let mut node = (*entry.0).node;

        while let Some(parent) = (*node).parent {
            Self::swap_entries(parent, node);
            node = parent;
        }

        // Unlink from the root list
        let mut prev: Link<T> = None;
        let mut cur = self.roots.expect("non-empty heap has roots");
        while cur != node {
            prev = Some(cur);
            cur = (*cur).sibling.expect("handle names a linked entry");
        }
        match prev {
            Some(p) => (*p).sibling = (*node).sibling,
            None => self.roots = (*node).sibling,
        }

        // Fold the orphaned children into a single tree and push it back
        if let Some(tree) = self.combine((*node).youngest) {
            (*tree).sibling = self.roots;
            self.roots = Some(tree);
        }
        (*node).youngest = None;

        node
    }
}

impl<T, C> Drop for PairingHeap<T, C> {
    fn drop(&mut self) {
        // Iterative teardown: pairing trees can degenerate into long chains,
        // so no recursion here
        let mut stack: Vec<*mut Node<T>> = Vec::new();

        let mut cur = self.roots;
        while let Some(node) = cur {
            stack.push(node);
            // SAFETY: the forest is exclusively ours
            cur = unsafe { (*node).sibling };
        }

        while let Some(node) = stack.pop() {
            // SAFETY: each node and entry is freed exactly once
            unsafe {
                let boxed = Box::from_raw(node);
                drop(Box::from_raw(boxed.entry));

                let mut child = boxed.youngest;
                while let Some(c) = child {
                    stack.push(c);
                    child = (*c).sibling;
                }
            }
        }
    }
}
