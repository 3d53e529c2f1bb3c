//! `serde` support for [`RangeTree`]s
//!
//! A tree is written as a sequence of `(range, value)` pairs in order, where unfilled leaves
//! have a value of `None`. The tree's configuration isn't included; deserialized trees use the
//! default.

use serde::de::{self, Deserialize, Deserializer, Visitor};
use serde::{Serialize, Serializer};

use std::fmt;
use std::marker::PhantomData;
use std::ops::Range;

use crate::tree::{LeafState, RangeTree};
use crate::Index;

impl<I, V> Serialize for RangeTree<I, V>
where
    I: Serialize + Index,
    V: Serialize,
{
    fn serialize<Se: Serializer>(&self, serializer: Se) -> Result<Se::Ok, Se::Error> {
        serializer.collect_seq(self.leaves().map(|l| (l.range(), l.state().as_filled())))
    }
}

impl<'de, I, V> Deserialize<'de> for RangeTree<I, V>
where
    I: Deserialize<'de> + Index,
    V: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(RangeTreeVisitor { marker: PhantomData })
    }
}

struct RangeTreeVisitor<I, V> {
    marker: PhantomData<RangeTree<I, V>>,
}

impl<'de, I, V> Visitor<'de> for RangeTreeVisitor<I, V>
where
    I: Deserialize<'de> + Index,
    V: Deserialize<'de>,
{
    type Value = RangeTree<I, V>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a sequence of (range, value) pairs")
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut this = RangeTree::new_empty();
        while let Some((range, value)) = seq.next_element::<(Range<I>, Option<V>)>()? {
            let state = match value {
                Some(v) => LeafState::Filled(v),
                None => LeafState::Unfilled,
            };
            this.insert_leaf(range, state).map_err(de::Error::custom)?;
        }

        Ok(this)
    }
}

#[cfg(test)]
mod tests {
    use crate::tree::{LeafState, RangeTree};

    #[test]
    fn round_trip() {
        let mut tree: RangeTree<u32, String> = RangeTree::new_empty();
        tree.insert_leaf(10..20, LeafState::Filled("b".into())).unwrap();
        tree.insert_leaf(0..5, LeafState::Filled("a".into())).unwrap();
        tree.insert_leaf(20..30, LeafState::Unfilled).unwrap();

        let json = serde_json::to_string(&tree).unwrap();
        assert_eq!(
            json,
            r#"[[{"start":0,"end":5},"a"],[{"start":10,"end":20},"b"],[{"start":20,"end":30},null]]"#
        );

        let back: RangeTree<u32, String> = serde_json::from_str(&json).unwrap();
        back.validate();
        let leaves: Vec<_> = back.leaves().map(|l| (l.range(), l.state().clone())).collect();
        assert_eq!(
            leaves,
            [
                (0..5, LeafState::Filled(String::from("a"))),
                (10..20, LeafState::Filled(String::from("b"))),
                (20..30, LeafState::Unfilled),
            ]
        );
    }

    #[test]
    fn overlapping_leaves_are_rejected() {
        let json = r#"[[{"start":0,"end":5},1],[{"start":3,"end":8},2]]"#;
        let result: Result<RangeTree<u32, u8>, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
