//! # Redwood -- lazily materialized, chunked byte buffers
//!
//! A [`Buffer`] represents a contiguous range of bytes that may be enormous, sparse, or simply
//! not loaded yet. Nothing is produced until it's asked for: reading a range carves it into
//! chunks, and each chunk is filled exactly once by the buffer's [`Source`] -- copied out of
//! memory, read from a file, generated, or read through another buffer.
//!
//! ```
//! use redwood::source::ConstantFiller;
//! use redwood::{Buffer, Source};
//!
//! let mut buf = Buffer::new(Source::new(ConstantFiller::new(0x41), None).with_limit(0..100));
//! assert_eq!(buf.read_to_vec(20..30)?, [0x41; 10]);
//!
//! buf.write(25..35, &[0x42; 10])?;
//! let all = buf.read_to_vec(..)?;
//! assert_eq!(all[24..36], [0x41, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x42, 0x41]);
//! # Ok::<(), redwood::Error>(())
//! ```
//!
//! ### Moving pieces
//!
//! * [`RangeTree`] -- a binary search tree over non-overlapping ranges, keyed by offset. Each
//!     leaf is either unfilled or holds a [`BlockView`]: a window into a shared [`Block`].
//! * [`Handle`] -- an atomic reference count with an explicit destructor. Blocks, sources, and
//!     shared buffers are all handles. A block whose handle is unique may be written in place;
//!     anything else is copied first.
//! * [`Source`] and [`Filler`] -- where bytes come from, and the limit on which offsets are
//!     valid to ask for.
//! * [`registry`] -- a global table of filler factories, for building sources by name.
//!
//! ### Feature flags
//!
//! * `serde` -- (de)serialization for the [`config`] types and for [`RangeTree`]
//! * `fuzz` -- `Arbitrary` implementations, used by the fuzzing harness
//!
//! ### Naming
//!
//! Like the tree it's named after, most of a redwood is dead wood that only exists once
//! something needs it to.

#![deny(unsafe_op_in_unsafe_fn)]

#[macro_use]
mod macros;

pub mod block;
pub mod config;
pub mod error;
pub mod mock;
pub mod range;
pub mod rc;
pub mod registry;
pub mod source;
pub mod tree;

mod buffer;
mod cursor;
mod public_traits;
#[cfg(feature = "serde")]
mod serde;

pub use block::{Block, BlockRef, BlockView};
pub use buffer::{Buffer, Segment, Segments, SharedBuffer};
pub use cursor::{Path, Side};
pub use error::{Error, ErrorKind, FillError, TreeError};
pub use public_traits::{DirectionalAdd, DirectionalSub, Index, Slice, Zero};
pub use rc::{Handle, Released};
pub use source::{Filler, Source, SourceFlags, SourceRef};
pub use tree::{Leaf, LeafState, RangeTree};
