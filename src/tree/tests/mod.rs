//! Various collections of unit tests
//!
//! Most of the broad coverage comes from the property tests in `tests/properties.rs` and from
//! fuzzing; each interesting failure from those ends up here as a new unit test.

use super::{LeafState, RangeTree};
use crate::config::{Balance, TreeConfig};
use crate::rc::Handle;
use std::ops::Range;

/// Manually-written test cases for splitting, merging, removal, and rebalancing
mod manual;

/// Tree type used by most tests: `u8` keys with `char` payloads that join when equal
type TestTree = RangeTree<u8, Label>;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
struct Label(char);

impl<I> crate::Slice<I> for Label {
    fn split_at(&mut self, _idx: I) -> Self {
        *self
    }

    fn try_join(self, other: Self) -> Result<Self, (Self, Self)> {
        match self == other {
            true => Ok(self),
            false => Err((self, other)),
        }
    }
}

fn unbalanced() -> TestTree {
    RangeTree::new(Handle::new(TreeConfig {
        balance: Balance::Unbalanced,
    }))
}

fn filled(c: char) -> LeafState<Label> {
    LeafState::Filled(Label(c))
}

/// Collects `(range, Some(char))` for each leaf, with `None` for unfilled leaves
fn contents(tree: &TestTree) -> Vec<(Range<u8>, Option<char>)> {
    tree.leaves()
        .map(|l| (l.range(), l.state().as_filled().map(|x| x.0)))
        .collect()
}
