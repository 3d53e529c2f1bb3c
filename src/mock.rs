//! Mock implementation with essentially the same API as [`Buffer`], but backed by a vector
//!
//! The mock is a differential oracle for tests and fuzzing: it stores one optional byte per
//! offset in the limit, so there's no tree, no blocks, and nothing to get wrong.
//!
//! [`Buffer`]: crate::Buffer

use crate::range::{self, RangeBounds};
use crate::rc::Handle;
use crate::Error;
use std::fmt::{self, Debug, Formatter};
use std::ops::Range;

/// A mock, inefficient implementation of the [`Buffer`](crate::Buffer) interface
///
/// The mock always has a finite limit, and its "source" is a function from offset to byte.
#[derive(Clone)]
pub struct Mock {
    limit: Range<u64>,
    // `None` where the byte hasn't been materialized yet; indexed from `limit.start`
    bytes: Vec<Option<u8>>,
    fill: Handle<Box<dyn Fn(u64) -> u8 + Send + Sync>>,
    read_only: bool,
}

impl Mock {
    pub fn new(limit: Range<u64>, fill: impl 'static + Fn(u64) -> u8 + Send + Sync) -> Self {
        if limit.start > limit.end {
            panic!("invalid limit {limit:?}");
        }

        Mock {
            bytes: vec![None; (limit.end - limit.start) as usize],
            limit,
            fill: Handle::new(Box::new(fill)),
            read_only: false,
        }
    }

    /// Makes every subsequent `write` fail with [`Error::ReadOnly`]
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn limit(&self) -> Range<u64> {
        self.limit.clone()
    }

    fn resolve(&self, range: impl RangeBounds<u64>) -> Result<Range<usize>, Error> {
        let r = range::resolve(range, Some(&self.limit))?;
        let base = self.limit.start;
        Ok((r.start - base) as usize..(r.end - base) as usize)
    }

    pub fn read(&mut self, range: impl RangeBounds<u64>) -> Result<Vec<u8>, Error> {
        let r = self.resolve(range)?;
        let base = self.limit.start;

        let mut out = Vec::with_capacity(r.len());
        for i in r {
            let byte = *self.bytes[i].get_or_insert_with(|| (self.fill)(base + i as u64));
            out.push(byte);
        }
        Ok(out)
    }

    pub fn write(&mut self, range: impl RangeBounds<u64>, data: &[u8]) -> Result<(), Error> {
        if self.read_only {
            return Err(Error::ReadOnly);
        }

        let r = self.resolve(range)?;
        if r.len() != data.len() {
            return Err(Error::LengthMismatch {
                expected: r.len() as u64,
                actual: data.len() as u64,
            });
        }

        for (slot, &b) in self.bytes[r].iter_mut().zip(data) {
            *slot = Some(b);
        }
        Ok(())
    }

    pub fn invalidate(&mut self, range: impl RangeBounds<u64>) -> Result<(), Error> {
        let r = self.resolve(range)?;
        self.bytes[r].fill(None);
        Ok(())
    }

    pub fn is_materialized(&self, offset: u64) -> bool {
        offset
            .checked_sub(self.limit.start)
            .and_then(|i| self.bytes.get(i as usize))
            .map_or(false, Option::is_some)
    }

    /// Returns the maximal runs of materialized offsets, in order
    pub fn materialized(&self) -> Vec<Range<u64>> {
        let base = self.limit.start;
        let mut runs: Vec<Range<u64>> = Vec::new();
        for (i, b) in self.bytes.iter().enumerate() {
            let offset = base + i as u64;
            match (b, runs.last_mut()) {
                (None, _) => (),
                (Some(_), Some(last)) if last.end == offset => last.end += 1,
                (Some(_), _) => runs.push(offset..offset + 1),
            }
        }
        runs
    }
}

/// Joins adjacent ranges together, producing the same shape as [`Mock::materialized`]
pub fn join_adjacent(ranges: impl IntoIterator<Item = Range<u64>>) -> Vec<Range<u64>> {
    let mut joined: Vec<Range<u64>> = Vec::new();
    for r in ranges {
        match joined.last_mut() {
            Some(last) if last.end == r.start => last.end = r.end,
            _ => joined.push(r),
        }
    }
    joined
}

impl Debug for Mock {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Mock")
            .field("limit", &self.limit)
            .field("materialized", &self.materialized())
            .finish_non_exhaustive()
    }
}
