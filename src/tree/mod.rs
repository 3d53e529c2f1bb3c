//! Wrapper module containing the range index tree itself

use crate::config::{Balance, TreeConfig};
use crate::cursor::{Path, Side};
use crate::error::TreeError;
use crate::public_traits::{Index, Slice};
use crate::rc::Handle;
use std::fmt::{self, Debug, Formatter};
use std::mem;
use std::ops::Range;

mod iter;
#[cfg(test)]
mod tests;

pub use iter::Iter;

/// Binary search tree over non-overlapping ranges, keyed by offset
///
/// Each leaf covers some `[start, end)` range of keys and is either [`Unfilled`] (the range is
/// known but its contents haven't been produced yet) or [`Filled`] with a payload. Internal nodes
/// only partition the key space: every leaf to the left of a node ends at or before its key, and
/// every leaf to the right starts at or after it. Gaps between leaves are allowed -- a tree only
/// covers the ranges that something has asked for.
///
/// Payloads implement [`Slice`], which the tree uses to split a leaf in two ([`split_leaf`]) and
/// to coalesce neighbours ([`merge_adjacent`]).
///
/// The tree never recurses over its own structure: clearing, dropping, and iterating all use an
/// explicit stack, so even a badly unbalanced tree can't overflow the call stack.
///
/// [`Unfilled`]: LeafState::Unfilled
/// [`Filled`]: LeafState::Filled
/// [`split_leaf`]: Self::split_leaf
/// [`merge_adjacent`]: Self::merge_adjacent
pub struct RangeTree<I, V> {
    root: Slot<I, V>,
    config: Handle<TreeConfig>,
    len: usize,
}

enum Slot<I, V> {
    Empty,
    Leaf(Box<Leaf<I, V>>),
    Node(Box<Node<I, V>>),
}

struct Node<I, V> {
    key: I,
    children: [Slot<I, V>; 2],
}

/// A single range in a [`RangeTree`], along with its contents (if any)
#[derive(Clone)]
pub struct Leaf<I, V> {
    range: Range<I>,
    state: LeafState<V>,
}

/// Whether a [`Leaf`] has been materialized yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafState<V> {
    Unfilled,
    Filled(V),
}

/// The result of [`RangeTree::locate`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    /// Path to the leaf that was found or -- if `kind` is [`Vacant`] -- to the slot that a leaf
    /// for the offset would be inserted next to
    ///
    /// [`Vacant`]: LocateKind::Vacant
    pub path: Path,
    pub kind: LocateKind,
}

/// How an offset relates to the leaf found by [`RangeTree::locate`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LocateKind {
    /// A leaf starts exactly at the offset
    Exact,
    /// A leaf contains the offset, but doesn't start there
    Within,
    /// No leaf contains the offset
    Vacant,
}

impl<V> LeafState<V> {
    /// Returns whether the state is `Filled`
    pub fn is_filled(&self) -> bool {
        matches!(self, LeafState::Filled(_))
    }

    /// Returns the payload, if the leaf is filled
    pub fn as_filled(&self) -> Option<&V> {
        match self {
            LeafState::Filled(v) => Some(v),
            LeafState::Unfilled => None,
        }
    }

    /// Returns the payload mutably, if the leaf is filled
    pub fn as_filled_mut(&mut self) -> Option<&mut V> {
        match self {
            LeafState::Filled(v) => Some(v),
            LeafState::Unfilled => None,
        }
    }
}

impl<I, V: Slice<I>> Slice<I> for LeafState<V> {
    fn split_at(&mut self, idx: I) -> Self {
        match self {
            LeafState::Unfilled => LeafState::Unfilled,
            LeafState::Filled(v) => LeafState::Filled(v.split_at(idx)),
        }
    }

    fn try_join(self, other: Self) -> Result<Self, (Self, Self)> {
        match (self, other) {
            (LeafState::Unfilled, LeafState::Unfilled) => Ok(LeafState::Unfilled),
            (LeafState::Filled(x), LeafState::Filled(y)) => match x.try_join(y) {
                Ok(v) => Ok(LeafState::Filled(v)),
                Err((x, y)) => Err((LeafState::Filled(x), LeafState::Filled(y))),
            },
            (x, y) => Err((x, y)),
        }
    }
}

impl<I: Index, V> Leaf<I, V> {
    /// Returns the range covered by the leaf
    pub fn range(&self) -> Range<I> {
        self.range.clone()
    }

    /// Returns the first offset covered by the leaf, which is also its key
    pub fn start(&self) -> I {
        self.range.start
    }

    /// Returns the offset just past the end of the leaf
    pub fn end(&self) -> I {
        self.range.end
    }

    /// Returns the size of the range covered by the leaf
    pub fn size(&self) -> I {
        self.range.end.sub_left(self.range.start)
    }

    pub fn state(&self) -> &LeafState<V> {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut LeafState<V> {
        &mut self.state
    }

    /// Consumes the leaf, returning its state
    pub fn into_state(self) -> LeafState<V> {
        self.state
    }
}

impl<I: Index, V> Node<I, V> {
    fn side_for(&self, offset: I) -> Side {
        match offset < self.key {
            true => Side::Left,
            false => Side::Right,
        }
    }
}

/// (*Internal*) Returns the deepest a leaf may be in a tree of `len` leaves before
/// [`Balance::Rebuild`] kicks in
fn max_depth(len: usize) -> usize {
    let log2 = (len + 1).next_power_of_two().trailing_zeros() as usize;
    2 * log2 + 2
}

impl<I, V> RangeTree<I, V> {
    /// Creates an empty tree that uses the given configuration
    pub fn new(config: Handle<TreeConfig>) -> Self {
        RangeTree {
            root: Slot::Empty,
            config,
            len: 0,
        }
    }

    /// Creates an empty tree with the default configuration
    pub fn new_empty() -> Self {
        Self::new(Handle::new(TreeConfig::default()))
    }

    /// Returns the number of leaves in the tree
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the configuration shared by this tree
    pub fn config(&self) -> &Handle<TreeConfig> {
        &self.config
    }

    /// Removes every leaf from the tree, dropping their payloads
    ///
    /// This uses an explicit worklist instead of recursion, so the depth of the tree doesn't
    /// matter.
    pub fn clear(&mut self) {
        let mut worklist = vec![mem::replace(&mut self.root, Slot::Empty)];
        while let Some(slot) = worklist.pop() {
            match slot {
                Slot::Node(node) => worklist.extend(node.children),
                Slot::Leaf(leaf) => drop(leaf),
                Slot::Empty => (),
            }
        }
        self.len = 0;
    }

    /// Returns the depth of the deepest leaf; a tree with only a root leaf has a depth of zero
    pub fn depth(&self) -> usize {
        let mut max = 0;
        let mut stack = vec![(&self.root, 0)];
        while let Some((slot, depth)) = stack.pop() {
            match slot {
                Slot::Node(n) => {
                    stack.push((&n.children[0], depth + 1));
                    stack.push((&n.children[1], depth + 1));
                }
                _ => max = max.max(depth),
            }
        }
        max
    }

    /// Removes all of the leaves, producing them in order
    fn take_leaves(&mut self) -> Vec<Box<Leaf<I, V>>> {
        let mut leaves = Vec::with_capacity(self.len);
        let mut stack = vec![mem::replace(&mut self.root, Slot::Empty)];
        while let Some(slot) = stack.pop() {
            match slot {
                Slot::Node(node) => {
                    let [left, right] = node.children;
                    stack.push(right);
                    stack.push(left);
                }
                Slot::Leaf(leaf) => leaves.push(leaf),
                Slot::Empty => (),
            }
        }
        self.len = 0;
        leaves
    }

    fn slot_at(&self, path: &[Side]) -> &Slot<I, V> {
        let mut slot = &self.root;
        for side in path {
            slot = match slot {
                Slot::Node(n) => &n.children[side.index()],
                _ => internal_error!("path {path:?} continues past a leaf"),
            };
        }
        slot
    }

    fn slot_at_mut(&mut self, path: &[Side]) -> &mut Slot<I, V> {
        let mut slot = &mut self.root;
        for side in path {
            slot = match slot {
                Slot::Node(n) => &mut n.children[side.index()],
                _ => internal_error!("path {path:?} continues past a leaf"),
            };
        }
        slot
    }

    /// Returns an iterator over all of the leaves in the tree, in order
    pub fn leaves(&self) -> Iter<'_, I, V>
    where
        I: Index,
    {
        Iter::new(&self.root, None)
    }

    /// Returns an iterator over all the leaves that overlap with `range`, in order
    ///
    /// Leaves are yielded whole, so the first and last may extend past either end of `range`.
    pub fn iter(&self, range: Range<I>) -> Iter<'_, I, V>
    where
        I: Index,
    {
        Iter::new(&self.root, Some(range))
    }
}

impl<I: Index, V> RangeTree<I, V> {
    /// Finds where `offset` lives in the tree
    ///
    /// The search descends from the root, going left at every node whose key is greater than
    /// `offset`, until it reaches a leaf (or the empty root). The returned path leads to that
    /// slot; `kind` says how `offset` relates to the leaf there.
    pub fn locate(&self, offset: I) -> Located {
        let mut path = Path::root();
        let mut slot = &self.root;
        loop {
            match slot {
                Slot::Node(n) => {
                    let side = n.side_for(offset);
                    path.push(side);
                    slot = &n.children[side.index()];
                }
                Slot::Leaf(l) => {
                    let kind = if l.range.start == offset {
                        LocateKind::Exact
                    } else if l.range.start < offset && offset < l.range.end {
                        LocateKind::Within
                    } else {
                        LocateKind::Vacant
                    };
                    return Located { path, kind };
                }
                Slot::Empty => {
                    return Located {
                        path,
                        kind: LocateKind::Vacant,
                    }
                }
            }
        }
    }

    /// Returns the leaf starting exactly at `start`, if there is one
    pub fn leaf(&self, start: I) -> Option<&Leaf<I, V>> {
        let loc = self.locate(start);
        match (loc.kind, self.slot_at(loc.path.components())) {
            (LocateKind::Exact, Slot::Leaf(l)) => Some(&**l),
            _ => None,
        }
    }

    /// Returns the leaf starting exactly at `start` mutably, if there is one
    ///
    /// Only the leaf's state can be changed through the reference; its range is fixed.
    pub fn leaf_mut(&mut self, start: I) -> Option<&mut Leaf<I, V>> {
        let loc = self.locate(start);
        if loc.kind != LocateKind::Exact {
            return None;
        }

        match self.slot_at_mut(loc.path.components()) {
            Slot::Leaf(l) => Some(&mut **l),
            _ => None,
        }
    }

    /// Returns the leaf whose range contains `offset`, if there is one
    pub fn leaf_containing(&self, offset: I) -> Option<&Leaf<I, V>> {
        let loc = self.locate(offset);
        match (loc.kind, self.slot_at(loc.path.components())) {
            (LocateKind::Exact | LocateKind::Within, Slot::Leaf(l)) => Some(&**l),
            _ => None,
        }
    }

    /// Returns the first leaf that starts strictly after `offset`
    pub fn next_leaf_after(&self, offset: I) -> Option<&Leaf<I, V>> {
        let mut candidate = None;
        let mut slot = &self.root;
        loop {
            match slot {
                Slot::Node(n) if offset < n.key => {
                    candidate = Some(&n.children[1]);
                    slot = &n.children[0];
                }
                Slot::Node(n) => slot = &n.children[1],
                Slot::Leaf(l) if l.range.start > offset => return Some(&**l),
                _ => break,
            }
        }

        let mut slot = candidate?;
        loop {
            match slot {
                Slot::Node(n) => slot = &n.children[0],
                Slot::Leaf(l) => return Some(&**l),
                Slot::Empty => internal_error!("empty slot below the root"),
            }
        }
    }

    /// Returns the last leaf that starts strictly before `offset`
    pub fn prev_leaf_before(&self, offset: I) -> Option<&Leaf<I, V>> {
        let mut candidate = None;
        let mut slot = &self.root;
        loop {
            match slot {
                Slot::Node(n) if offset < n.key => slot = &n.children[0],
                Slot::Node(n) => {
                    candidate = Some(&n.children[0]);
                    slot = &n.children[1];
                }
                Slot::Leaf(l) if l.range.start < offset => return Some(&**l),
                _ => break,
            }
        }

        let mut slot = candidate?;
        loop {
            match slot {
                Slot::Node(n) => slot = &n.children[1],
                Slot::Leaf(l) => return Some(&**l),
                Slot::Empty => internal_error!("empty slot below the root"),
            }
        }
    }

    /// Returns the first leaf (in order) that overlaps with `range`
    pub fn first_overlap(&self, range: &Range<I>) -> Option<&Leaf<I, V>> {
        if range.start >= range.end {
            return None;
        }

        if let Some(l) = self.leaf_containing(range.start) {
            return Some(l);
        }

        self.next_leaf_after(range.start)
            .filter(|l| l.range.start < range.end)
    }

    /// Adds a new leaf covering `range`, returning the path to it
    ///
    /// The range must be non-empty, must not start where another leaf starts, and must not
    /// overlap any existing leaf.
    pub fn insert_leaf(&mut self, range: Range<I>, state: LeafState<V>) -> Result<Path, TreeError<I>> {
        if range.start >= range.end {
            return Err(TreeError::EmptyRange(range));
        } else if self.leaf(range.start).is_some() {
            return Err(TreeError::DuplicateKey(range.start));
        } else if let Some(existing) = self.first_overlap(&range) {
            return Err(TreeError::Overlap {
                new: range,
                existing: existing.range(),
            });
        }

        let start = range.start;
        let path = self.insert_unchecked(Leaf { range, state });
        Ok(self.maybe_rebuild(path, start))
    }

    /// Inserts a leaf that's already known not to overlap with anything in the tree
    fn insert_unchecked(&mut self, leaf: Leaf<I, V>) -> Path {
        let mut path = self.locate(leaf.range.start).path;

        // Descend along the same path, widening keys where the new leaf extends past them. This
        // is always possible: the leaf doesn't overlap anything, so nothing to the right of the
        // key starts before the leaf ends.
        let mut slot = &mut self.root;
        for &side in path.components() {
            slot = match slot {
                Slot::Node(n) => {
                    if side == Side::Left && leaf.range.end > n.key {
                        n.key = leaf.range.end;
                    }
                    &mut n.children[side.index()]
                }
                _ => internal_error!("path from `locate` continues past a leaf"),
            };
        }

        let leaf = Box::new(leaf);
        *slot = match mem::replace(slot, Slot::Empty) {
            Slot::Empty => Slot::Leaf(leaf),
            Slot::Leaf(existing) => {
                let (side, key, children) = if leaf.range.start < existing.range.start {
                    let key = existing.range.start;
                    (Side::Left, key, [Slot::Leaf(leaf), Slot::Leaf(existing)])
                } else {
                    let key = leaf.range.start;
                    (Side::Right, key, [Slot::Leaf(existing), Slot::Leaf(leaf)])
                };
                path.push(side);
                Slot::Node(Box::new(Node { key, children }))
            }
            Slot::Node(_) => internal_error!("`locate` stopped at an internal node"),
        };

        self.len += 1;
        path
    }

    /// Rebuilds the tree if a leaf at `path` is too deep, returning the (possibly new) path to
    /// the leaf starting at `start`
    fn maybe_rebuild(&mut self, path: Path, start: I) -> Path {
        if self.config.balance == Balance::Unbalanced || path.depth() <= max_depth(self.len) {
            return path;
        }

        tracing::trace!(len = self.len, depth = path.depth(), "rebuilding range tree");
        self.rebuild();
        self.locate(start).path
    }

    /// Rearranges the tree into a perfectly balanced shape
    pub fn rebuild(&mut self) {
        let leaves = self.take_leaves();
        let len = leaves.len();
        self.root = build_balanced(leaves);
        self.len = len;
    }

    /// Removes the leaf starting at `start`, returning it
    pub fn remove_leaf(&mut self, start: I) -> Option<Leaf<I, V>> {
        let loc = self.locate(start);
        if loc.kind != LocateKind::Exact {
            return None;
        }

        let components = loc.path.components();
        let Some((&side, parent_path)) = components.split_last() else {
            return match mem::replace(&mut self.root, Slot::Empty) {
                Slot::Leaf(leaf) => {
                    self.len -= 1;
                    Some(*leaf)
                }
                _ => internal_error!("exact match on a root that isn't a leaf"),
            };
        };

        // Replace the parent with the sibling of the removed leaf. The sibling's leaves were
        // already within the parent's bounds, so every key above stays valid.
        let parent = self.slot_at_mut(parent_path);
        let [left, right] = match mem::replace(parent, Slot::Empty) {
            Slot::Node(node) => node.children,
            _ => internal_error!("parent of a leaf isn't an internal node"),
        };
        let (removed, sibling) = match side {
            Side::Left => (left, right),
            Side::Right => (right, left),
        };
        *parent = sibling;
        self.len -= 1;

        match removed {
            Slot::Leaf(leaf) => Some(*leaf),
            _ => internal_error!("`locate` found an exact match on a non-leaf"),
        }
    }

    /// Returns the starting keys of every leaf overlapping `range`
    fn overlapping_starts(&self, range: Range<I>) -> Vec<I> {
        self.iter(range).map(|l| l.range.start).collect()
    }
}

impl<I: Index, V: Slice<I>> RangeTree<I, V> {
    /// Splits the leaf containing `at` into two adjacent leaves, meeting at `at`
    ///
    /// The payload is split with [`Slice::split_at`]. Returns `false` (and does nothing) if `at`
    /// is already the boundary of a leaf, or isn't covered by one.
    pub fn split_leaf(&mut self, at: I) -> bool {
        let loc = self.locate(at);
        if loc.kind != LocateKind::Within {
            return false;
        }

        let slot = self.slot_at_mut(loc.path.components());
        let mut lhs = match mem::replace(slot, Slot::Empty) {
            Slot::Leaf(leaf) => leaf,
            _ => internal_error!("`locate` found a leaf that isn't there"),
        };

        let rhs_state = lhs.state.split_at(at.sub_left(lhs.range.start));
        let rhs = Box::new(Leaf {
            range: at..lhs.range.end,
            state: rhs_state,
        });
        lhs.range.end = at;

        *slot = Slot::Node(Box::new(Node {
            key: at,
            children: [Slot::Leaf(lhs), Slot::Leaf(rhs)],
        }));
        self.len += 1;

        let mut path = loc.path;
        path.push(Side::Right);
        self.maybe_rebuild(path, at);
        true
    }

    /// Attempts to join the leaf ending at `at` with the leaf starting at `at`
    ///
    /// Returns whether the leaves were merged. Both leaves must exist, and their states must be
    /// joinable with [`Slice::try_join`] -- two unfilled leaves always are.
    pub fn merge_adjacent(&mut self, at: I) -> bool {
        let lhs_start = match self.prev_leaf_before(at) {
            Some(l) if l.range.end == at => l.range.start,
            _ => return false,
        };
        if self.leaf(at).is_none() {
            return false;
        }

        let take_state = |this: &mut Self, start| match this.leaf_mut(start) {
            Some(l) => mem::replace(&mut l.state, LeafState::Unfilled),
            None => internal_error!("leaf at {start:?} disappeared"),
        };
        let lhs_state = take_state(self, lhs_start);
        let rhs_state = take_state(self, at);

        match lhs_state.try_join(rhs_state) {
            Err((lhs_state, rhs_state)) => {
                let put_back = |this: &mut Self, start, state| match this.leaf_mut(start) {
                    Some(l) => l.state = state,
                    None => internal_error!("leaf at {start:?} disappeared"),
                };
                put_back(self, lhs_start, lhs_state);
                put_back(self, at, rhs_state);
                false
            }
            Ok(state) => {
                let end = match self.remove_leaf(at) {
                    Some(l) => l.range.end,
                    None => internal_error!("leaf at {at:?} disappeared"),
                };
                self.remove_leaf(lhs_start);
                let path = self.insert_unchecked(Leaf {
                    range: lhs_start..end,
                    state,
                });
                self.maybe_rebuild(path, lhs_start);
                tracing::trace!(at = ?at, "merged adjacent leaves");
                true
            }
        }
    }

    /// Removes every leaf overlapping `range`, first splitting leaves that straddle either end
    /// so that nothing outside `range` is lost
    ///
    /// Returns the removed leaves in order.
    pub fn remove_range(&mut self, range: Range<I>) -> Vec<Leaf<I, V>> {
        if range.start >= range.end {
            return Vec::new();
        }

        self.split_leaf(range.start);
        self.split_leaf(range.end);

        let starts = self.overlapping_starts(range);
        let mut removed = Vec::with_capacity(starts.len());
        for start in starts {
            match self.remove_leaf(start) {
                Some(leaf) => removed.push(leaf),
                None => internal_error!("leaf at {start:?} disappeared"),
            }
        }
        removed
    }
}

impl<I: Index, V> RangeTree<I, V> {
    /// Checks the structure of the tree, panicking if anything is wrong
    ///
    /// A broken invariant here is always a bug in this crate.
    pub fn validate(&self) {
        let mut count = 0;
        let mut stack: Vec<(&Slot<I, V>, Option<I>, Option<I>, usize)> =
            vec![(&self.root, None, None, 0)];

        while let Some((slot, lo, hi, depth)) = stack.pop() {
            match slot {
                Slot::Empty if depth != 0 => internal_error!("empty slot below the root"),
                Slot::Empty => (),
                Slot::Leaf(l) => {
                    count += 1;
                    if l.range.start >= l.range.end {
                        internal_error!("leaf has empty range {:?}", l.range);
                    }
                    if matches!(lo, Some(lo) if l.range.start < lo) {
                        internal_error!("leaf {:?} starts before its bound {lo:?}", l.range);
                    }
                    if matches!(hi, Some(hi) if l.range.end > hi) {
                        internal_error!("leaf {:?} ends after its bound {hi:?}", l.range);
                    }
                }
                Slot::Node(n) => {
                    if matches!(lo, Some(lo) if n.key < lo) || matches!(hi, Some(hi) if n.key > hi) {
                        internal_error!("node key {:?} outside of bounds {lo:?}..{hi:?}", n.key);
                    }
                    stack.push((&n.children[0], lo, Some(n.key), depth + 1));
                    stack.push((&n.children[1], Some(n.key), hi, depth + 1));
                }
            }
        }

        if count != self.len {
            internal_error!("tree has {count} leaves, but recorded length {}", self.len);
        }

        let mut prev_end = None;
        for leaf in self.leaves() {
            if matches!(prev_end, Some(e) if leaf.range.start < e) {
                internal_error!("leaf {:?} overlaps its predecessor", leaf.range);
            }
            prev_end = Some(leaf.range.end);
        }
    }
}

/// (*Internal*) Builds a perfectly balanced tree from leaves that are already in order
fn build_balanced<I: Index, V>(leaves: Vec<Box<Leaf<I, V>>>) -> Slot<I, V> {
    fn build<I: Index, V>(
        leaves: &mut impl Iterator<Item = Box<Leaf<I, V>>>,
        n: usize,
    ) -> (Slot<I, V>, I) {
        if n == 1 {
            return match leaves.next() {
                Some(leaf) => {
                    let start = leaf.range.start;
                    (Slot::Leaf(leaf), start)
                }
                None => internal_error!("ran out of leaves while rebuilding"),
            };
        }

        let (left, start) = build(leaves, n / 2);
        let (right, key) = build(leaves, n - n / 2);
        let node = Node {
            key,
            children: [left, right],
        };
        (Slot::Node(Box::new(node)), start)
    }

    match leaves.len() {
        0 => Slot::Empty,
        n => build(&mut leaves.into_iter(), n).0,
    }
}

impl<I, V> Drop for RangeTree<I, V> {
    fn drop(&mut self) {
        self.clear();
    }
}

impl<I: Index, V: Clone> Clone for RangeTree<I, V> {
    /// Copies the structure of the tree, cloning each payload
    ///
    /// For [`BlockView`](crate::block::BlockView) payloads, this shares the underlying blocks
    /// rather than copying them. The clone is perfectly balanced and shares this tree's
    /// configuration.
    fn clone(&self) -> Self {
        let leaves: Vec<_> = self.leaves().map(|l| Box::new(l.clone())).collect();
        RangeTree {
            len: leaves.len(),
            root: build_balanced(leaves),
            config: self.config.acquire(),
        }
    }
}

impl<I: Index, V: Debug> Debug for Leaf<I, V> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match &self.state {
            LeafState::Unfilled => write!(f, "{:?}: <unfilled>", self.range),
            LeafState::Filled(v) => write!(f, "{:?}: {v:?}", self.range),
        }
    }
}

impl<I: Index, V: Debug> Debug for RangeTree<I, V> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_list().entries(self.leaves()).finish()
    }
}
