//! Error types for buffers, sources, blocks, and the range tree
//!
//! There are really only two kinds of errors that callers are expected to handle: a broken
//! precondition (which is almost always a bug on the caller's side, but one we'd rather report
//! than trip over) and a failed fill, where some [`Filler`] couldn't produce the bytes it was
//! asked for. [`Error::kind`] tells the two apart.
//!
//! Structural problems inside the tree are *not* represented here -- those are internal bugs, and
//! we panic when we find them.
//!
//! [`Filler`]: crate::source::Filler

use std::fmt::Debug;
use std::ops::Range;

/// Coarse classification of an [`Error`]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The caller asked for something that isn't allowed: a zero-sized block, a range outside
    /// the source's limit, a duplicate key, etc.
    Precondition,
    /// A filler failed to produce data. The buffer is left as it was before the attempt, so the
    /// operation can be retried.
    Fill,
}

/// The crate-wide error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot release a null handle")]
    NullHandle,

    #[error("cannot create a zero-sized memory block")]
    ZeroSize,

    #[error("an immutable span cannot be given a destructor")]
    ImmutableDestructor,

    #[error("range {requested:?} is outside of the source's limit {limit:?}")]
    OutOfLimit {
        requested: Range<u64>,
        limit: Range<u64>,
    },

    #[error("range {0:?} has no end, and the source has no limit to bound it")]
    Unbounded(Range<u64>),

    #[error("invalid range {0:?}")]
    InvalidRange(Range<u64>),

    #[error("destination has length {actual}, but the range covers {expected} bytes")]
    LengthMismatch { expected: u64, actual: u64 },

    #[error("the buffer's source is not mutable")]
    ReadOnly,

    #[error("range {0:?} was already produced by a fill-once source")]
    AlreadyConsumed(Range<u64>),

    #[error("the filler registry has not been initialized")]
    RegistryUninitialized,

    #[error("no filler registered under the name {0:?}")]
    UnknownFiller(String),

    #[error("filler {filler:?} requires the `{param}` parameter")]
    MissingParam {
        filler: String,
        param: &'static str,
    },

    #[error(transparent)]
    Tree(#[from] TreeError<u64>),

    #[error("failed to fill range {range:?}")]
    Fill {
        range: Range<u64>,
        #[source]
        source: FillError,
    },
}

impl Error {
    /// Returns the broad category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Fill { .. } => ErrorKind::Fill,
            _ => ErrorKind::Precondition,
        }
    }
}

/// Errors from the [`RangeTree`](crate::tree::RangeTree) that are the caller's fault
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TreeError<I: Debug> {
    #[error("leaf range {0:?} is empty")]
    EmptyRange(Range<I>),

    #[error("a leaf already starts at {0:?}")]
    DuplicateKey(I),

    #[error("leaf range {new:?} overlaps existing leaf {existing:?}")]
    Overlap { new: Range<I>, existing: Range<I> },
}

/// Failure reported by a [`Filler`](crate::source::Filler)
///
/// Fillers must either produce every requested byte or return one of these; there's no such
/// thing as a partial fill.
#[derive(Debug, thiserror::Error)]
pub enum FillError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("the filler only has data for {available:?}")]
    OutOfData { available: Range<u64> },

    #[error("range {range:?} moved by {offset} runs past the end of the offset space")]
    OffsetOverflow { range: Range<u64>, offset: u64 },

    #[error("the backing buffer is in use")]
    BackingBusy,

    #[error("the source has no backing buffer")]
    NoBacking,

    #[error("reading from the backing buffer failed")]
    Backing(#[source] Box<Error>),

    #[error("{0}")]
    Custom(String),
}
