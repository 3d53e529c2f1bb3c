//! Wrapper module for the [`RangeTree`](crate::tree::RangeTree) iterator type

use std::ops::Range;

use super::{Leaf, Slot};
use crate::public_traits::Index;

/// An in-order iterator over the leaves of a [`RangeTree`] that overlap some range
///
/// This type is produced by the [`iter`] and [`leaves`] methods on [`RangeTree`]. It keeps an
/// explicit stack of the subtrees it has yet to visit, so only the path to the current leaf is
/// ever held at once.
///
/// [`RangeTree`]: crate::tree::RangeTree
/// [`iter`]: crate::tree::RangeTree::iter
/// [`leaves`]: crate::tree::RangeTree::leaves
pub struct Iter<'t, I, V> {
    stack: Vec<&'t Slot<I, V>>,
    range: Option<Range<I>>,
}

impl<'t, I: Index, V> Iter<'t, I, V> {
    pub(super) fn new(root: &'t Slot<I, V>, range: Option<Range<I>>) -> Self {
        let mut stack = Vec::new();

        match &range {
            None => stack.push(root),
            Some(r) if r.start >= r.end => (),
            // Skip straight to the first leaf that could overlap, remembering the right-hand
            // subtrees we pass on the way down.
            Some(r) => {
                let mut slot = root;
                loop {
                    match slot {
                        Slot::Node(n) if r.start < n.key => {
                            stack.push(&n.children[1]);
                            slot = &n.children[0];
                        }
                        Slot::Node(n) => slot = &n.children[1],
                        _ => {
                            stack.push(slot);
                            break;
                        }
                    }
                }
            }
        }

        Iter { stack, range }
    }
}

impl<'t, I: Index, V> Iterator for Iter<'t, I, V> {
    type Item = &'t Leaf<I, V>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(slot) = self.stack.pop() {
            match slot {
                Slot::Empty => (),
                Slot::Node(n) => {
                    self.stack.push(&n.children[1]);
                    self.stack.push(&n.children[0]);
                }
                Slot::Leaf(leaf) => match &self.range {
                    Some(r) if leaf.range.start >= r.end => {
                        self.stack.clear();
                        return None;
                    }
                    Some(r) if leaf.range.end <= r.start => (),
                    _ => return Some(&**leaf),
                },
            }
        }

        None
    }
}
