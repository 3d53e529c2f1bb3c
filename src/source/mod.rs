//! Sources: where a buffer's bytes come from
//!
//! Every [`Buffer`](crate::Buffer) has exactly one [`Source`], shared through a [`SourceRef`].
//! The source wraps a [`Filler`] (the thing that actually produces bytes) along with the
//! bookkeeping around it: an optional limit on which offsets may be requested, flags, an
//! optional backing buffer for fillers that read through another buffer, and some opaque user
//! data that's handed back to its destructor when the source is torn down.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt::{self, Debug, Formatter};
use std::ops::{BitOr, Range};

use parking_lot::Mutex;

use crate::range::intersect;
use crate::rc::Handle;
use crate::{Error, SharedBuffer};

mod filler;

pub use filler::{BackingFiller, ConstantFiller, FileFiller, FillRequest, Filler, MemoryFiller};

/// Shared reference to a [`Source`]
pub type SourceRef = Handle<Source>;

/// Producer of the bytes for a buffer
///
/// The filler is only ever invoked through [`Source::fill`], which guarantees that requests lie
/// inside the source's limit and that the destination has exactly the requested length.
pub struct Source {
    filler: Box<dyn Filler>,
    backing: Option<SharedBuffer>,
    user_data: Option<UserData>,
    flags: SourceFlags,
    limit: Option<Range<u64>>,
    // Only tracked for `FILL_ONCE` sources
    consumed: Mutex<Consumed>,
}

/// The ranges a source has already produced, as disjoint, non-touching `start => end` entries
#[derive(Debug, Default)]
struct Consumed(BTreeMap<u64, u64>);

impl Consumed {
    /// Returns the lowest part of `range` that was already produced
    fn first_overlap(&self, range: &Range<u64>) -> Option<Range<u64>> {
        let before = self.0.range(..=range.start).next_back();
        let within = self.0.range(range.start..range.end).next();
        before
            .into_iter()
            .chain(within)
            .find_map(|(&start, &end)| intersect(&(start..end), range))
    }

    /// Records `range`, merging it with every entry it overlaps or touches
    fn insert(&mut self, range: Range<u64>) {
        let (mut start, mut end) = (range.start, range.end);
        if let Some((&s, &e)) = self.0.range(..=start).next_back() {
            if e >= start {
                self.0.remove(&s);
                start = s;
                end = end.max(e);
            }
        }

        let absorbed: Vec<u64> = self.0.range(start..=end).map(|(&s, _)| s).collect();
        for s in absorbed {
            if let Some(e) = self.0.remove(&s) {
                end = end.max(e);
            }
        }
        self.0.insert(start, end);
    }
}

struct UserData {
    value: Option<Box<dyn Any + Send + Sync>>,
    destructor: Box<dyn FnOnce(Box<dyn Any + Send + Sync>) + Send + Sync>,
}

/// Behavioral flags for a [`Source`]
///
/// Flags combine with `|`. The default is [`MUTABLE`](Self::MUTABLE).
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct SourceFlags(u8);

impl SourceFlags {
    pub const NONE: SourceFlags = SourceFlags(0);
    /// Buffers over the source accept writes
    pub const MUTABLE: SourceFlags = SourceFlags(1 << 0);
    /// Each byte may be produced at most once; re-filling it is an error
    pub const FILL_ONCE: SourceFlags = SourceFlags(1 << 1);

    /// Returns whether every flag in `other` is also set in `self`
    pub const fn contains(self, other: SourceFlags) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `self` without any of the flags in `other`
    pub const fn without(self, other: SourceFlags) -> SourceFlags {
        SourceFlags(self.0 & !other.0)
    }
}

impl Default for SourceFlags {
    fn default() -> Self {
        SourceFlags::MUTABLE
    }
}

impl BitOr for SourceFlags {
    type Output = SourceFlags;

    fn bitor(self, other: SourceFlags) -> SourceFlags {
        SourceFlags(self.0 | other.0)
    }
}

impl Debug for SourceFlags {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let mut set = f.debug_set();
        if self.contains(SourceFlags::MUTABLE) {
            set.entry(&"MUTABLE");
        }
        if self.contains(SourceFlags::FILL_ONCE) {
            set.entry(&"FILL_ONCE");
        }
        set.finish()
    }
}

impl Source {
    /// Creates a new source around `filler`
    ///
    /// If `backing` is given, the source holds onto it until it's destroyed; fillers can reach
    /// it through [`FillRequest::backing`]. The source starts out unlimited, with no user data and
    /// the default flags.
    pub fn new(filler: impl Filler + 'static, backing: Option<SharedBuffer>) -> Self {
        Self::from_boxed(Box::new(filler), backing)
    }

    /// Like [`new`](Self::new), for fillers that are already boxed (e.g., from the
    /// [`registry`](crate::registry))
    pub fn from_boxed(filler: Box<dyn Filler>, backing: Option<SharedBuffer>) -> Self {
        Source {
            filler,
            backing,
            user_data: None,
            flags: SourceFlags::default(),
            limit: None,
            consumed: Mutex::new(Consumed::default()),
        }
    }

    /// Restricts the source to offsets within `limit`; the filler is never asked for anything
    /// outside it
    pub fn with_limit(mut self, limit: Range<u64>) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_flags(mut self, flags: SourceFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Attaches opaque data to the source, replacing any that was there before
    ///
    /// `destructor` receives the value exactly once, when the last reference to the source is
    /// released. Data that's replaced here is passed to its own destructor immediately.
    pub fn with_user_data<T, F>(mut self, value: T, destructor: F) -> Self
    where
        T: Any + Send + Sync,
        F: 'static + FnOnce(T) + Send + Sync,
    {
        let destructor = Box::new(move |value: Box<dyn Any + Send + Sync>| {
            if let Ok(value) = value.downcast::<T>() {
                destructor(*value);
            }
        });

        if let Some(old) = self.user_data.take() {
            old.destroy();
        }
        self.user_data = Some(UserData {
            value: Some(Box::new(value)),
            destructor,
        });
        self
    }

    /// Wraps the source in a [`SourceRef`] so that it can be given to buffers
    pub fn into_ref(self) -> SourceRef {
        Handle::new(self)
    }

    pub fn limit(&self) -> Option<&Range<u64>> {
        self.limit.as_ref()
    }

    pub fn flags(&self) -> SourceFlags {
        self.flags
    }

    pub fn is_mutable(&self) -> bool {
        self.flags.contains(SourceFlags::MUTABLE)
    }

    /// Returns the user data, if there is some and it has type `T`
    pub fn user_data<T: Any>(&self) -> Option<&T> {
        self.user_data.as_ref()?.value.as_ref()?.downcast_ref()
    }

    pub fn backing(&self) -> Option<&SharedBuffer> {
        self.backing.as_ref()
    }

    /// Produces the bytes for `range` into `dest`
    ///
    /// The request is checked before the filler sees it: `range` must be well-formed and inside
    /// the limit, and `dest` must be exactly as long as `range`. A `FILL_ONCE` source also
    /// refuses any bytes it has already produced. Filler failures are returned as
    /// [`Error::Fill`]; in that case `dest` may hold garbage, and nothing is recorded as
    /// consumed.
    pub fn fill(&self, range: Range<u64>, dest: &mut [u8]) -> Result<(), Error> {
        if range.start > range.end {
            return Err(Error::InvalidRange(range));
        }

        if let Some(limit) = &self.limit {
            if range.start < limit.start || range.end > limit.end {
                return Err(Error::OutOfLimit {
                    requested: range,
                    limit: limit.clone(),
                });
            }
        }

        let expected = range.end - range.start;
        if dest.len() as u64 != expected {
            return Err(Error::LengthMismatch {
                expected,
                actual: dest.len() as u64,
            });
        } else if expected == 0 {
            return Ok(());
        }

        let fill_once = self.flags.contains(SourceFlags::FILL_ONCE);
        if fill_once {
            if let Some(overlap) = self.consumed.lock().first_overlap(&range) {
                return Err(Error::AlreadyConsumed(overlap));
            }
        }

        tracing::trace!(?range, "filling");
        let request = FillRequest {
            range: range.clone(),
            dest,
            backing: self.backing.as_ref(),
        };
        if let Err(source) = self.filler.fill(request) {
            tracing::debug!(?range, error = %source, "fill failed");
            return Err(Error::Fill { range, source });
        }

        if fill_once {
            self.consumed.lock().insert(range);
        }
        Ok(())
    }
}

impl UserData {
    fn destroy(mut self) {
        if let Some(value) = self.value.take() {
            (self.destructor)(value);
        }
    }
}

impl Drop for Source {
    fn drop(&mut self) {
        tracing::debug!(limit = ?self.limit, flags = ?self.flags, "tearing down source");

        // user data first, then the backing buffer
        if let Some(data) = self.user_data.take() {
            data.destroy();
        }
        drop(self.backing.take());
    }
}

impl Debug for Source {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Source")
            .field("flags", &self.flags)
            .field("limit", &self.limit)
            .field("has_backing", &self.backing.is_some())
            .field("has_user_data", &self.user_data.is_some())
            .finish_non_exhaustive()
    }
}
