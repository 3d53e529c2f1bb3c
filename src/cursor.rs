//! Wrapper module for [`Path`] and related types

/// Which child of a node a search descended into
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    Left = 0,
    Right = 1,
}

/// The route taken from the root of a [`RangeTree`] to one of its slots
///
/// Each component records the child a search descended through, so a `Path` identifies the
/// current node plus the slot beneath it -- which, for a vacant location, is exactly where a new
/// leaf would go. Paths are invalidated by any change to the tree's shape.
///
/// [`RangeTree`]: crate::tree::RangeTree
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    components: Vec<Side>,
}

impl Path {
    /// Creates an empty path, referring to the root
    pub fn root() -> Self {
        Path::default()
    }

    pub(crate) fn push(&mut self, side: Side) {
        self.components.push(side);
    }

    /// Returns the number of nodes between the root and the slot
    pub fn depth(&self) -> usize {
        self.components.len()
    }

    /// Returns the side taken at each level, starting from the root
    pub fn components(&self) -> &[Side] {
        &self.components
    }

    /// Returns the side taken out of the final node on the path, if there is one
    pub fn last(&self) -> Option<Side> {
        self.components.last().copied()
    }
}

impl Side {
    pub(crate) fn index(self) -> usize {
        self as usize
    }
}
