/*! A safe, arena-backed (indexed) AVL tree

# About
Adelson-Velsky and Landis trees are the tightly-wound end of the balanced-BST spectrum:
height is guaranteed within ~1.44*log2(n), so search, insert and remove are all honest
O(log n) with small constants. This implementation exists for two jobs in this crate: the
[tokenizer](crate::mapred::token) uses it to deduplicate tokens during the map phase
(insert-or-bump keyed on a byte slice), and it anchors a substantial chunk of the test
battery. Which is why it also carries inorder *and* preorder iteration, a bulk loader
for pre-sorted input, and deep cloning.

# Design
A flat, `Vec`-backed arena with indices for links and iterative (read: non-recursive)
navigation, trading a little memory for zero per-node allocations and no lifetime
gymnastics. All "pointers" are absolute arena positions, so removal cannot compact the
buffer; a removed node leaves a `None` hole and the arena only grows. For the insert-heavy
workloads this crate feeds it, the holes are a non-issue.

Duplicates are rejected at insertion. [`get_mut`](AvlTree::get_mut) hands out a mutable
reference so callers can update satellite data in place; mutating the part of the value
that drives the ordering is a contract violation the tree cannot detect.

Rebalancing retraces the parent chain after every insert and unlink, applying the four
textbook rotations where a node's balance factor leaves the [-1, 1] band.

# Example
```rust
    use heapred::hierarchies::avl_tree::AvlTree;

    let mut tree: AvlTree<u8> = AvlTree::new();

    // Create the following AVL tree
    //
    //           39
    //          /  \
    //        17    41
    //       /  \     \
    //     13   23     43
    //     /   /  \
    //    8   19  31
    //
    for key in [31, 13, 23, 39, 41, 43, 8, 17, 19] {
        tree.insert(key);
    }
    assert_eq!(tree.get_root(), Some(&39));

    // Remove 41; the rebalance re-roots the tree
    assert_eq!(tree.remove(&41), Some(41));
    assert!(!tree.contains(&41));

    let inorder: Vec<u8> = tree.iter().copied().collect();
    assert_eq!(inorder, [8, 13, 17, 19, 23, 31, 39, 43]);
```
*/

use std::cmp::Ordering;

// Outcome of a descent: where a key is, or where it would attach.
enum SearchResult {
    Empty,
    Exists(usize),
    Parent(usize),
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Side {
    Left,
    Right,
}

#[derive(Clone, Debug)]
struct AvlNode<T> {
    value: T,
    parent: Option<usize>,
    left: Option<usize>,
    right: Option<usize>,
    height: usize,
}

/// # About
///
/// See the [module-level documentation](crate::hierarchies::avl_tree) for more
/// information.
#[derive(Clone, Debug)]
pub struct AvlTree<T> {
    // Option slots allow O(1) removal holes without shifting indices
    arena: Vec<Option<AvlNode<T>>>,
    root: Option<usize>,
    len: usize,
}

impl<T: Ord> Default for AvlTree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Ord> AvlTree<T> {
    /// Creates a new, empty tree.
    pub fn new() -> Self {
        AvlTree {
            arena: Vec::new(),
            root: None,
            len: 0,
        }
    }

    /// Builds a perfectly balanced tree from strictly increasing input in
    /// O(n) time, without a single comparison.
    pub fn from_sorted(values: Vec<T>) -> Self {
        debug_assert!(
            values.windows(2).all(|w| w[0] < w[1]),
            "bulk load requires strictly increasing input"
        );

        let len = values.len();
        let mut slots: Vec<Option<T>> = values.into_iter().map(Some).collect();
        let mut arena = Vec::with_capacity(len);
        let root = Self::build_range(&mut arena, &mut slots, 0, len, None);

        AvlTree { arena, root, len }
    }

    fn build_range(
        arena: &mut Vec<Option<AvlNode<T>>>,
        slots: &mut [Option<T>],
        lo: usize,
        hi: usize,
        parent: Option<usize>,
    ) -> Option<usize> {
        if lo >= hi {
            return None;
        }

        let mid = lo + (hi - lo) / 2;
        let index = arena.len();
        arena.push(Some(AvlNode {
            value: slots[mid].take().expect("each slot is consumed once"),
            parent,
            left: None,
            right: None,
            height: 1,
        }));

        let left = Self::build_range(arena, slots, lo, mid, Some(index));
        let right = Self::build_range(arena, slots, mid + 1, hi, Some(index));

        let height = 1 + Self::link_height(arena, left).max(Self::link_height(arena, right));
        let node = arena[index].as_mut().expect("just pushed");
        node.left = left;
        node.right = right;
        node.height = height;

        Some(index)
    }

    fn link_height(arena: &[Option<AvlNode<T>>], link: Option<usize>) -> usize {
        link.map_or(0, |index| arena[index].as_ref().expect("live node").height)
    }

    /// Returns the number of live values.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the tree holds no values.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns a reference to the value at the root, if any.
    pub fn get_root(&self) -> Option<&T> {
        self.root.map(|index| &self.node(index).value)
    }

    /// Returns `true` if an equal value is present.
    pub fn contains(&self, key: &T) -> bool {
        matches!(self.search(key), SearchResult::Exists(_))
    }

    /// Returns a reference to the stored value equal to `key`.
    pub fn get(&self, key: &T) -> Option<&T> {
        match self.search(key) {
            SearchResult::Exists(index) => Some(&self.node(index).value),
            _ => None,
        }
    }

    /// Returns a mutable reference to the stored value equal to `key`.
    ///
    /// Mutating the ordering-relevant part of the value through this
    /// reference is a contract violation.
    pub fn get_mut(&mut self, key: &T) -> Option<&mut T> {
        match self.search(key) {
            SearchResult::Exists(index) => Some(&mut self.node_mut(index).value),
            _ => None,
        }
    }

    /// Inserts a value in O(log n) time; returns `false` (changing nothing)
    /// if an equal value is already present.
    pub fn insert(&mut self, value: T) -> bool {
        match self.search(&value) {
            SearchResult::Exists(_) => false,
            SearchResult::Empty => {
                let index = self.push_node(value, None);
                self.root = Some(index);
                self.len = 1;
                true
            }
            SearchResult::Parent(parent) => {
                let index = self.push_node(value, Some(parent));
                let side = if self.node(index).value < self.node(parent).value {
                    Side::Left
                } else {
                    Side::Right
                };
                self.set_child(parent, side, Some(index));
                self.len += 1;
                self.retrace(Some(parent));
                true
            }
        }
    }

    /// Removes the value equal to `key` in O(log n) time and returns it.
    pub fn remove(&mut self, key: &T) -> Option<T> {
        let SearchResult::Exists(index) = self.search(key) else {
            return None;
        };

        let value = self.remove_index(index);
        self.len -= 1;
        Some(value)
    }

    /// Returns an iterator yielding the values in ascending order.
    pub fn iter(&self) -> InorderIter<'_, T> {
        let mut iter = InorderIter {
            tree: self,
            stack: Vec::new(),
        };
        iter.push_left_spine(self.root);
        iter
    }

    /// Returns an iterator yielding the values in preorder (node before its
    /// subtrees), exposing the tree shape.
    pub fn preorder(&self) -> PreorderIter<'_, T> {
        PreorderIter {
            tree: self,
            stack: self.root.into_iter().collect(),
        }
    }

    // NODE PLUMBING
    ////////////////

    fn node(&self, index: usize) -> &AvlNode<T> {
        self.arena[index].as_ref().expect("live node index")
    }

    fn node_mut(&mut self, index: usize) -> &mut AvlNode<T> {
        self.arena[index].as_mut().expect("live node index")
    }

    fn push_node(&mut self, value: T, parent: Option<usize>) -> usize {
        self.arena.push(Some(AvlNode {
            value,
            parent,
            left: None,
            right: None,
            height: 1,
        }));
        self.arena.len() - 1
    }

    fn child(&self, index: usize, side: Side) -> Option<usize> {
        match side {
            Side::Left => self.node(index).left,
            Side::Right => self.node(index).right,
        }
    }

    fn set_child(&mut self, index: usize, side: Side, link: Option<usize>) {
        match side {
            Side::Left => self.node_mut(index).left = link,
            Side::Right => self.node_mut(index).right = link,
        }
    }

    fn height(&self, link: Option<usize>) -> usize {
        link.map_or(0, |index| self.node(index).height)
    }

    fn update_height(&mut self, index: usize) {
        let height = 1 + self
            .height(self.node(index).left)
            .max(self.height(self.node(index).right));
        self.node_mut(index).height = height;
    }

    fn balance(&self, index: usize) -> isize {
        self.height(self.node(index).left) as isize - self.height(self.node(index).right) as isize
    }

    fn search(&self, key: &T) -> SearchResult {
        let Some(mut index) = self.root else {
            return SearchResult::Empty;
        };

        loop {
            let side = match key.cmp(&self.node(index).value) {
                Ordering::Equal => return SearchResult::Exists(index),
                Ordering::Less => Side::Left,
                Ordering::Greater => Side::Right,
            };

            match self.child(index, side) {
                Some(next) => index = next,
                None => return SearchResult::Parent(index),
            }
        }
    }

    // Replaces `index` with `pivot` in index's parent (or at the root).
    fn replace_in_parent(&mut self, index: usize, pivot: usize) {
        let parent = self.node(index).parent;
        self.node_mut(pivot).parent = parent;

        match parent {
            None => self.root = Some(pivot),
            Some(p) => {
                let side = if self.node(p).left == Some(index) {
                    Side::Left
                } else {
                    Side::Right
                };
                self.set_child(p, side, Some(pivot));
            }
        }
    }

    // The right child rises; `index` becomes its left child.
    fn rotate_left(&mut self, index: usize) {
        let pivot = self
            .node(index)
            .right
            .expect("left rotation needs a right child");
        let inner = self.node(pivot).left;

        self.replace_in_parent(index, pivot);

        self.node_mut(index).right = inner;
        if let Some(i) = inner {
            self.node_mut(i).parent = Some(index);
        }

        self.node_mut(pivot).left = Some(index);
        self.node_mut(index).parent = Some(pivot);

        self.update_height(index);
        self.update_height(pivot);
    }

    // The left child rises; `index` becomes its right child.
    fn rotate_right(&mut self, index: usize) {
        let pivot = self
            .node(index)
            .left
            .expect("right rotation needs a left child");
        let inner = self.node(pivot).right;

        self.replace_in_parent(index, pivot);

        self.node_mut(index).left = inner;
        if let Some(i) = inner {
            self.node_mut(i).parent = Some(index);
        }

        self.node_mut(pivot).right = Some(index);
        self.node_mut(index).parent = Some(pivot);

        self.update_height(index);
        self.update_height(pivot);
    }

    // Walks from `start` to the root refreshing heights and applying the
    // four textbook rotations wherever a balance factor leaves the band.
    fn retrace(&mut self, start: Option<usize>) {
        let mut cur = start;

        while let Some(index) = cur {
            self.update_height(index);
            let parent = self.node(index).parent;

            let balance = self.balance(index);
            if balance > 1 {
                let left = self
                    .node(index)
                    .left
                    .expect("left-heavy node has a left child");
                if self.balance(left) < 0 {
                    self.rotate_left(left);
                }
                self.rotate_right(index);
            } else if balance < -1 {
                let right = self
                    .node(index)
                    .right
                    .expect("right-heavy node has a right child");
                if self.balance(right) > 0 {
                    self.rotate_right(right);
                }
                self.rotate_left(index);
            }

            cur = parent;
        }
    }

    fn remove_index(&mut self, index: usize) -> T {
        let node = self.node(index);
        let target = if node.left.is_some() && node.right.is_some() {
            // Two children: trade values with the inorder successor and
            // physically unlink that (at most one-child) node instead
            let mut successor = node.right.expect("checked above");
            while let Some(left) = self.node(successor).left {
                successor = left;
            }
            self.swap_values(index, successor);
            successor
        } else {
            index
        };

        self.unlink(target)
    }

    fn swap_values(&mut self, first: usize, second: usize) {
        debug_assert_ne!(first, second);

        let (lo, hi) = (first.min(second), first.max(second));
        let (front, back) = self.arena.split_at_mut(hi);
        let a = front[lo].as_mut().expect("live node index");
        let b = back[0].as_mut().expect("live node index");
        std::mem::swap(&mut a.value, &mut b.value);
    }

    // Detaches a node with at most one child, leaving a hole in the arena.
    fn unlink(&mut self, index: usize) -> T {
        let node = self.arena[index].take().expect("live node index");
        debug_assert!(node.left.is_none() || node.right.is_none());

        let child = node.left.or(node.right);
        if let Some(c) = child {
            self.node_mut(c).parent = node.parent;
        }

        match node.parent {
            None => self.root = child,
            Some(parent) => {
                let side = if self.node(parent).left == Some(index) {
                    Side::Left
                } else {
                    Side::Right
                };
                self.set_child(parent, side, child);
            }
        }

        self.retrace(node.parent);

        node.value
    }
}

/// Ascending-order iterator over an [`AvlTree`].
pub struct InorderIter<'a, T> {
    tree: &'a AvlTree<T>,
    stack: Vec<usize>,
}

impl<'a, T: Ord> InorderIter<'a, T> {
    fn push_left_spine(&mut self, mut link: Option<usize>) {
        while let Some(index) = link {
            self.stack.push(index);
            link = self.tree.node(index).left;
        }
    }
}

impl<'a, T: Ord> Iterator for InorderIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        let node = self.tree.node(index);
        self.push_left_spine(node.right);
        Some(&node.value)
    }
}

/// Preorder iterator over an [`AvlTree`].
pub struct PreorderIter<'a, T> {
    tree: &'a AvlTree<T>,
    stack: Vec<usize>,
}

impl<'a, T: Ord> Iterator for PreorderIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.stack.pop()?;
        let node = self.tree.node(index);

        // Right pushed first so the left subtree pops first
        if let Some(right) = node.right {
            self.stack.push(right);
        }
        if let Some(left) = node.left {
            self.stack.push(left);
        }

        Some(&node.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeSet;

    // Verifies BST order, parent links, cached heights and the AVL balance
    // bound over the whole arena.
    fn check_avl<T: Ord + std::fmt::Debug>(tree: &AvlTree<T>) {
        fn walk<T: Ord + std::fmt::Debug>(
            tree: &AvlTree<T>,
            index: usize,
            parent: Option<usize>,
        ) -> usize {
            let node = tree.node(index);
            assert_eq!(node.parent, parent, "parent link broken at {index}");

            let mut height = 0;
            for (side, link) in [(Side::Left, node.left), (Side::Right, node.right)] {
                if let Some(child) = link {
                    let value = &tree.node(child).value;
                    match side {
                        Side::Left => assert!(value < &node.value, "left child out of order"),
                        Side::Right => assert!(value > &node.value, "right child out of order"),
                    }
                    height = height.max(walk(tree, child, Some(index)));
                }
            }

            assert_eq!(node.height, height + 1, "stale height at {index}");
            let balance = tree.balance(index);
            assert!((-1..=1).contains(&balance), "unbalanced at {index}");

            height + 1
        }

        if let Some(root) = tree.root {
            walk(tree, root, None);
        } else {
            assert_eq!(tree.len(), 0);
        }

        let live = tree.arena.iter().filter(|slot| slot.is_some()).count();
        assert_eq!(live, tree.len(), "arena live count disagrees with len");
    }

    #[test]
    fn insert_search_and_shape() {
        let mut tree: AvlTree<u8> = AvlTree::new();
        for key in [31, 13, 23, 39, 41, 43, 8, 17, 19] {
            assert!(tree.insert(key));
            check_avl(&tree);
        }

        assert_eq!(tree.get_root(), Some(&39));
        assert_eq!(tree.len(), 9);
        assert!(tree.contains(&23));
        assert!(!tree.contains(&24));
        assert!(!tree.insert(23), "duplicates must be rejected");
        assert_eq!(tree.len(), 9);

        let inorder: Vec<u8> = tree.iter().copied().collect();
        assert_eq!(inorder, [8, 13, 17, 19, 23, 31, 39, 41, 43]);
    }

    #[test]
    fn preorder_exposes_shape() {
        // Ascending inserts rebalance into
        //
        //        3
        //      /   \
        //     1     4
        //    / \     \
        //   0   2     5
        //
        let mut tree: AvlTree<u8> = AvlTree::new();
        for key in 0..6 {
            tree.insert(key);
        }
        check_avl(&tree);

        let preorder: Vec<u8> = tree.preorder().copied().collect();
        assert_eq!(preorder, [3, 1, 0, 2, 4, 5]);
    }

    #[test]
    fn remove_rebalances() {
        let mut tree: AvlTree<u8> = AvlTree::new();
        for key in [31, 13, 23, 39, 41, 43, 8, 17, 19] {
            tree.insert(key);
        }

        // Leaf, one-child and two-children removals
        assert_eq!(tree.remove(&19), Some(19));
        check_avl(&tree);
        assert_eq!(tree.remove(&41), Some(41));
        check_avl(&tree);
        assert_eq!(tree.remove(&39), Some(39));
        check_avl(&tree);
        assert_eq!(tree.remove(&99), None);

        let inorder: Vec<u8> = tree.iter().copied().collect();
        assert_eq!(inorder, [8, 13, 17, 23, 31, 43]);
        assert_eq!(tree.len(), 6);
    }

    #[test]
    fn bulk_load_is_balanced() {
        let values: Vec<u32> = (0..1000).collect();
        let tree = AvlTree::from_sorted(values);
        check_avl(&tree);
        assert_eq!(tree.len(), 1000);

        let inorder: Vec<u32> = tree.iter().copied().collect();
        let expect: Vec<u32> = (0..1000).collect();
        assert_eq!(inorder, expect);

        // A 1000-node balanced tree sits at height 10
        assert_eq!(tree.height(tree.root), 10);
    }

    #[test]
    fn clone_is_independent() {
        let mut tree: AvlTree<u32> = AvlTree::new();
        for key in [5, 3, 8, 1, 4] {
            tree.insert(key);
        }

        let mut copy = tree.clone();
        copy.insert(99);
        copy.remove(&3);

        assert!(tree.contains(&3));
        assert!(!tree.contains(&99));
        assert_eq!(copy.len(), 5);
        assert_eq!(tree.len(), 5);
        check_avl(&tree);
        check_avl(&copy);
    }

    #[test]
    fn get_mut_updates_satellite_data() {
        #[derive(Debug)]
        struct Entry(u32, u32);
        impl PartialEq for Entry {
            fn eq(&self, other: &Self) -> bool {
                self.0 == other.0
            }
        }
        impl Eq for Entry {}
        impl PartialOrd for Entry {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }
        impl Ord for Entry {
            fn cmp(&self, other: &Self) -> Ordering {
                self.0.cmp(&other.0)
            }
        }

        let mut tree = AvlTree::new();
        tree.insert(Entry(7, 1));
        tree.insert(Entry(3, 1));

        tree.get_mut(&Entry(7, 0)).expect("key exists").1 += 1;
        assert_eq!(tree.get(&Entry(7, 0)).expect("key exists").1, 2);
    }

    #[test]
    fn random_ops_agree_with_reference() {
        let mut rng = StdRng::seed_from_u64(0xA71);
        let mut tree: AvlTree<u32> = AvlTree::new();
        let mut reference: BTreeSet<u32> = BTreeSet::new();

        for _ in 0..2000 {
            let key = rng.random_range(0..300);
            if rng.random_bool(0.6) {
                assert_eq!(tree.insert(key), reference.insert(key));
            } else {
                assert_eq!(tree.remove(&key), reference.take(&key));
            }
        }

        check_avl(&tree);
        let inorder: Vec<u32> = tree.iter().copied().collect();
        let expect: Vec<u32> = reference.iter().copied().collect();
        assert_eq!(inorder, expect);
    }
}
