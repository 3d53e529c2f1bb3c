//! Range types accepted by [`Buffer`] operations
//!
//! Byte ranges handed to a [`Buffer`] can be open-ended (`..`, `10..`), in which case they're
//! resolved against the limit of the buffer's source. To keep this simple we use our own
//! [`RangeBounds`] trait, which -- unlike the standard library's -- has no way of expressing an
//! excluded start bound.
//!
//! [`Buffer`]: crate::Buffer

#[cfg(feature = "fuzz")]
use arbitrary::Arbitrary;
use std::ops::{Range, RangeFrom, RangeFull, RangeInclusive, RangeTo, RangeToInclusive};

use crate::Error;

/// The starting bound of a range
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "fuzz", derive(Arbitrary))]
pub enum StartBound<T> {
    Included(T),
    Unbounded,
}

/// The ending bound of a range
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "fuzz", derive(Arbitrary))]
pub enum EndBound<T> {
    Included(T),
    Excluded(T),
    Unbounded,
}

/// A `std::ops::RangeBounds`-like trait that disallows exclusive start bounds
pub trait RangeBounds<T> {
    /// Returns the starting bound of the range
    fn start_bound(&self) -> StartBound<T>;
    /// Returns the ending bound of the range
    fn end_bound(&self) -> EndBound<T>;
}

impl<T: Copy> RangeBounds<T> for (StartBound<T>, EndBound<T>) {
    fn start_bound(&self) -> StartBound<T> {
        self.0
    }
    fn end_bound(&self) -> EndBound<T> {
        self.1
    }
}

impl<T: Copy, R: RangeBounds<T>> RangeBounds<T> for &R {
    fn start_bound(&self) -> StartBound<T> {
        (*self).start_bound()
    }
    fn end_bound(&self) -> EndBound<T> {
        (*self).end_bound()
    }
}

impl<T: Copy> RangeBounds<T> for Range<T> {
    fn start_bound(&self) -> StartBound<T> {
        StartBound::Included(self.start)
    }
    fn end_bound(&self) -> EndBound<T> {
        EndBound::Excluded(self.end)
    }
}

impl<T: Copy> RangeBounds<T> for RangeInclusive<T> {
    fn start_bound(&self) -> StartBound<T> {
        StartBound::Included(*self.start())
    }
    fn end_bound(&self) -> EndBound<T> {
        EndBound::Included(*self.end())
    }
}

impl<T: Copy> RangeBounds<T> for RangeFrom<T> {
    fn start_bound(&self) -> StartBound<T> {
        StartBound::Included(self.start)
    }
    fn end_bound(&self) -> EndBound<T> {
        EndBound::Unbounded
    }
}

impl<T: Copy> RangeBounds<T> for RangeTo<T> {
    fn start_bound(&self) -> StartBound<T> {
        StartBound::Unbounded
    }
    fn end_bound(&self) -> EndBound<T> {
        EndBound::Excluded(self.end)
    }
}

impl<T: Copy> RangeBounds<T> for RangeToInclusive<T> {
    fn start_bound(&self) -> StartBound<T> {
        StartBound::Unbounded
    }
    fn end_bound(&self) -> EndBound<T> {
        EndBound::Included(self.end)
    }
}

impl<T> RangeBounds<T> for RangeFull {
    fn start_bound(&self) -> StartBound<T> {
        StartBound::Unbounded
    }
    fn end_bound(&self) -> EndBound<T> {
        EndBound::Unbounded
    }
}

/// Turns a byte range with possibly-unbounded sides into a concrete `start..end`
///
/// Unbounded starts are zero, or the start of `limit`. Unbounded ends need a `limit` to resolve
/// against. The result is checked to be well-formed and inside `limit`, if there is one; empty
/// ranges are allowed.
pub(crate) fn resolve(
    range: impl RangeBounds<u64>,
    limit: Option<&Range<u64>>,
) -> Result<Range<u64>, Error> {
    let start = match range.start_bound() {
        StartBound::Included(s) => s,
        StartBound::Unbounded => limit.map(|l| l.start).unwrap_or(0),
    };

    let end = match range.end_bound() {
        EndBound::Excluded(e) => e,
        EndBound::Included(e) => match e.checked_add(1) {
            Some(e) => e,
            None => return Err(Error::InvalidRange(start..e)),
        },
        EndBound::Unbounded => match limit {
            Some(l) => l.end,
            None => return Err(Error::Unbounded(start..u64::MAX)),
        },
    };

    if start > end {
        return Err(Error::InvalidRange(start..end));
    }

    if let Some(l) = limit {
        if start < l.start || end > l.end {
            return Err(Error::OutOfLimit {
                requested: start..end,
                limit: l.clone(),
            });
        }
    }

    Ok(start..end)
}

/// Returns the intersection of two ranges, if it's non-empty
pub(crate) fn intersect(a: &Range<u64>, b: &Range<u64>) -> Option<Range<u64>> {
    let start = a.start.max(b.start);
    let end = a.end.min(b.end);
    (start < end).then_some(start..end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_against_limit() {
        let limit = 10..100;
        assert_eq!(resolve(.., Some(&limit)).unwrap(), 10..100);
        assert_eq!(resolve(20.., Some(&limit)).unwrap(), 20..100);
        assert_eq!(resolve(..=19, Some(&limit)).unwrap(), 10..20);
        assert!(matches!(
            resolve(150..160, Some(&limit)),
            Err(Error::OutOfLimit { .. })
        ));
    }

    #[test]
    fn unbounded_without_limit() {
        assert_eq!(resolve(5..9, None).unwrap(), 5..9);
        assert!(matches!(resolve(5.., None), Err(Error::Unbounded(_))));
        assert!(matches!(resolve(9..5, None), Err(Error::InvalidRange(_))));
    }

    #[test]
    fn intersection() {
        assert_eq!(intersect(&(0..10), &(5..20)), Some(5..10));
        assert_eq!(intersect(&(0..10), &(10..20)), None);
    }
}
