//! Configuration for [`RangeTree`]s and [`Buffer`]s
//!
//! Both configuration types are plain data. A tree's configuration is held through a
//! [`Handle`](crate::rc::Handle), so trees that behave identically (e.g., a buffer and its forks)
//! share one copy.
//!
//! With the `serde` feature enabled, both types can be (de)serialized -- every field has a
//! default, so partial configurations are fine:
//!
//! ```
//! # #[cfg(feature = "serde")] {
//! use redwood::config::BufferConfig;
//!
//! let cfg: BufferConfig = serde_json::from_str(r#"{ "max_chunk_size": 4096 }"#).unwrap();
//! assert_eq!(cfg.max_chunk_size, 4096);
//! assert!(cfg.merge_adjacent);
//! # }
//! ```
//!
//! [`RangeTree`]: crate::tree::RangeTree
//! [`Buffer`]: crate::Buffer

#[cfg(feature = "fuzz")]
use arbitrary::Arbitrary;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The default upper bound on the size of a single lazily-filled leaf: 64 KiB
pub const DEFAULT_MAX_CHUNK_SIZE: u64 = 64 * 1024;

/// How a [`RangeTree`](crate::tree::RangeTree) keeps its depth in check
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[cfg_attr(feature = "fuzz", derive(Arbitrary))]
pub enum Balance {
    /// Rebuild the whole tree into a perfectly balanced shape whenever an insertion lands deeper
    /// than `2 * ceil(log2(n + 1)) + 2`. Amortized O(log n) per insertion.
    #[default]
    Rebuild,
    /// Never rebalance. Depth grows with the number of splits, which is fine for trees that stay
    /// small, and makes the shape of the tree predictable in tests.
    Unbalanced,
}

/// Behavior shared by all trees created with it
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "fuzz", derive(Arbitrary))]
pub struct TreeConfig {
    pub balance: Balance,
}

/// Configuration for a [`Buffer`](crate::Buffer)
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[cfg_attr(feature = "fuzz", derive(Arbitrary))]
pub struct BufferConfig {
    /// Upper bound, in bytes, on a leaf created to cover an unmaterialized gap. Larger gaps are
    /// covered by several leaves, each filled by its own call to the source. Must be non-zero;
    /// zero is treated as one.
    pub max_chunk_size: u64,
    /// Whether to merge neighbouring leaves after writes when their payloads allow it
    pub merge_adjacent: bool,
    pub tree: TreeConfig,
}

impl Default for BufferConfig {
    fn default() -> Self {
        BufferConfig {
            max_chunk_size: DEFAULT_MAX_CHUNK_SIZE,
            merge_adjacent: true,
            tree: TreeConfig::default(),
        }
    }
}

impl BufferConfig {
    pub(crate) fn chunk_size(&self) -> u64 {
        self.max_chunk_size.max(1)
    }
}
