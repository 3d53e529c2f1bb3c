use super::*;
use crate::tree::max_depth;

#[test]
fn split_and_merge() {
    let mut tree = TestTree::new_empty();
    tree.insert_leaf(0..10, filled('a')).unwrap();

    assert!(tree.split_leaf(4));
    tree.validate();
    assert_eq!(contents(&tree), [(0..4, Some('a')), (4..10, Some('a'))]);

    // boundaries and uncovered offsets aren't split
    assert!(!tree.split_leaf(4));
    assert!(!tree.split_leaf(0));
    assert!(!tree.split_leaf(10));
    assert!(!tree.split_leaf(50));

    assert!(tree.merge_adjacent(4));
    tree.validate();
    assert_eq!(contents(&tree), [(0..10, Some('a'))]);
}

#[test]
fn merge_refuses_mismatched_neighbours() {
    let mut tree = TestTree::new_empty();
    tree.insert_leaf(0..5, filled('a')).unwrap();
    tree.insert_leaf(5..8, filled('b')).unwrap();
    tree.insert_leaf(8..9, LeafState::Unfilled).unwrap();
    tree.insert_leaf(9..12, LeafState::Unfilled).unwrap();
    tree.insert_leaf(20..30, filled('b')).unwrap();

    assert!(!tree.merge_adjacent(5)); // different payloads
    assert!(!tree.merge_adjacent(8)); // filled next to unfilled
    assert!(!tree.merge_adjacent(12)); // nothing starts here
    assert!(!tree.merge_adjacent(20)); // gap before it

    // failed merges must put the payloads back where they were
    assert_eq!(
        contents(&tree),
        [
            (0..5, Some('a')),
            (5..8, Some('b')),
            (8..9, None),
            (9..12, None),
            (20..30, Some('b')),
        ]
    );

    assert!(tree.merge_adjacent(9));
    tree.validate();
    assert_eq!(tree.len(), 4);
    assert_eq!(tree.leaf(8).unwrap().range(), 8..12);
}

#[test]
fn remove_range_splits_at_edges() {
    let mut tree = TestTree::new_empty();
    tree.insert_leaf(0..10, filled('a')).unwrap();
    tree.insert_leaf(10..20, LeafState::Unfilled).unwrap();
    tree.insert_leaf(25..40, filled('c')).unwrap();

    let removed: Vec<_> = tree.remove_range(5..30).into_iter().map(|l| l.range()).collect();
    assert_eq!(removed, [5..10, 10..20, 25..30]);

    tree.validate();
    assert_eq!(contents(&tree), [(0..5, Some('a')), (30..40, Some('c'))]);
}

#[test]
fn remove_range_in_gap_is_noop() {
    let mut tree = TestTree::new_empty();
    tree.insert_leaf(0..10, filled('a')).unwrap();
    tree.insert_leaf(50..60, filled('b')).unwrap();

    assert!(tree.remove_range(10..50).is_empty());
    assert!(tree.remove_range(20..20).is_empty());
    assert_eq!(tree.len(), 2);
}

#[test]
fn remove_leaf_collapses_parent() {
    let mut tree = TestTree::new_empty();
    for s in [0, 10, 20, 30] {
        tree.insert_leaf(s..s + 5, filled('x')).unwrap();
    }

    assert!(tree.remove_leaf(12).is_none());
    assert_eq!(tree.remove_leaf(10).unwrap().range(), 10..15);
    tree.validate();
    assert_eq!(tree.remove_leaf(0).unwrap().range(), 0..5);
    assert_eq!(tree.remove_leaf(30).unwrap().range(), 30..35);
    tree.validate();
    assert_eq!(contents(&tree), [(20..25, Some('x'))]);
    assert_eq!(tree.depth(), 0);

    assert!(tree.remove_leaf(20).is_some());
    assert!(tree.is_empty());
    tree.validate();

    // an emptied tree is still usable
    tree.insert_leaf(3..4, filled('y')).unwrap();
    assert_eq!(contents(&tree), [(3..4, Some('y'))]);
}

#[test]
fn clear_resets() {
    let mut tree = TestTree::new_empty();
    for s in 0..30 {
        tree.insert_leaf(s * 3..s * 3 + 2, filled('q')).unwrap();
    }
    tree.clear();
    assert!(tree.is_empty());
    assert_eq!(tree.leaves().count(), 0);
    tree.validate();
}

#[test]
fn rebuild_keeps_depth_bounded() {
    // Ascending inserts are the worst case for a plain BST
    let mut tree = RangeTree::<u64, Label>::new_empty();
    for s in 0..1000_u64 {
        tree.insert_leaf(s * 4..s * 4 + 4, LeafState::Filled(Label('r'))).unwrap();
        assert!(tree.depth() <= max_depth(tree.len()));
    }
    tree.validate();
    assert_eq!(tree.len(), 1000);

    // Splitting every leaf adds just as many
    for s in 0..1000_u64 {
        assert!(tree.split_leaf(s * 4 + 2));
    }
    tree.validate();
    assert_eq!(tree.len(), 2000);
    assert!(tree.depth() <= max_depth(tree.len()));
}

#[test]
fn deep_unbalanced_tree_drops() {
    let mut tree = RangeTree::<u64, Label>::new(Handle::new(TreeConfig {
        balance: Balance::Unbalanced,
    }));
    for s in 0..5000_u64 {
        tree.insert_leaf(s..s + 1, LeafState::Unfilled).unwrap();
    }
    assert_eq!(tree.depth(), 4999);
    assert_eq!(tree.iter(4990..6000).count(), 10);
    drop(tree);
}
