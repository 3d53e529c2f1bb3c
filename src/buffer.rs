//! The [`Buffer`] type and its segment iterator

use std::fmt::{self, Debug, Formatter};
use std::ops::Range;

use parking_lot::Mutex;

use crate::block::{Block, BlockView};
use crate::config::BufferConfig;
use crate::range::{self, RangeBounds};
use crate::rc::Handle;
use crate::source::{Source, SourceRef};
use crate::tree::{LeafState, RangeTree};
use crate::Error;

/// A [`Buffer`] shared between owners -- or threads -- behind a lock
///
/// This is how a buffer is given to a [`Source`] as its backing buffer.
pub type SharedBuffer = Handle<Mutex<Buffer>>;

/// A logically contiguous range of bytes, materialized lazily from a [`Source`]
///
/// The buffer starts out empty. Reading (or iterating over) a range that hasn't been touched yet
/// first carves it into leaves of at most [`max_chunk_size`] bytes, then asks the source to fill
/// each leaf, exactly once. Filled leaves are stored in blocks shared by reference count:
/// [`fork`]ing a buffer or holding onto a [`Segment`] keeps blocks alive, and writes never modify
/// a block that anything else can still see.
///
/// All offsets are checked against the source's limit, if it has one. An unbounded range (like
/// `..` or `10..`) ends at the end of the limit.
///
/// [`max_chunk_size`]: BufferConfig::max_chunk_size
/// [`fork`]: Self::fork
pub struct Buffer {
    tree: RangeTree<u64, BlockView>,
    source: SourceRef,
    config: BufferConfig,
}

impl Buffer {
    /// Creates a new buffer over `source`, with the default configuration
    pub fn new(source: Source) -> Self {
        Self::with_config(source.into_ref(), BufferConfig::default())
    }

    /// Creates a new buffer over a (possibly shared) source
    pub fn with_config(source: SourceRef, config: BufferConfig) -> Self {
        Buffer {
            tree: RangeTree::new(Handle::new(config.tree)),
            source,
            config,
        }
    }

    pub fn source(&self) -> &SourceRef {
        &self.source
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    /// Returns the range of valid offsets, if the source has a limit
    pub fn limit(&self) -> Option<&Range<u64>> {
        self.source.limit()
    }

    /// Returns the tree of leaves backing the buffer
    pub fn tree(&self) -> &RangeTree<u64, BlockView> {
        &self.tree
    }

    /// Returns the ranges of every filled leaf, in order
    ///
    /// Adjacent leaves produce adjacent ranges; they aren't joined together.
    pub fn materialized(&self) -> impl '_ + Iterator<Item = Range<u64>> {
        self.tree
            .leaves()
            .filter(|l| l.state().is_filled())
            .map(|l| l.range())
    }

    /// Wraps the buffer in a lock, so that it can be shared
    pub fn into_shared(self) -> SharedBuffer {
        Handle::new(Mutex::new(self))
    }

    /// Creates a copy of the buffer that shares all of its blocks and its source
    ///
    /// Nothing is copied up front. Writes to either buffer afterwards copy the blocks they touch,
    /// so neither sees the other's changes.
    pub fn fork(&self) -> Buffer {
        tracing::trace!(leaves = self.tree.len(), "forking buffer");
        Buffer {
            tree: self.tree.clone(),
            source: self.source.acquire(),
            config: self.config,
        }
    }

    /// Reads the bytes in `range` into `dest`, filling anything that isn't materialized yet
    ///
    /// `dest` must be exactly as long as `range`. If a fill fails, the failing leaf is left
    /// unfilled and the error is returned; leaves filled before it stay filled.
    pub fn read(&mut self, range: impl RangeBounds<u64>, dest: &mut [u8]) -> Result<(), Error> {
        let range = range::resolve(range, self.limit())?;
        check_len(&range, dest.len())?;

        for segment in self.iterate(range.clone())? {
            let segment = segment?;
            let start = (segment.offset - range.start) as usize;
            dest[start..start + segment.bytes().len()].copy_from_slice(segment.bytes());
        }
        Ok(())
    }

    /// Like [`read`](Self::read), but allocates the destination
    pub fn read_to_vec(&mut self, range: impl RangeBounds<u64>) -> Result<Vec<u8>, Error> {
        let range = range::resolve(range, self.limit())?;
        let mut dest = vec![0; len_of(&range)?];
        self.read(range, &mut dest)?;
        Ok(dest)
    }

    /// Overwrites `range` with `bytes`
    ///
    /// Nothing is read from the source: any unfilled part of `range` is simply replaced. If the
    /// range is entirely inside one leaf whose block nothing else refers to, the block is
    /// written in place. Otherwise, the leaves are split at the edges of `range` and the part
    /// between is swapped out for a fresh block (copy-on-write).
    pub fn write(&mut self, range: impl RangeBounds<u64>, bytes: &[u8]) -> Result<(), Error> {
        if !self.source.is_mutable() {
            return Err(Error::ReadOnly);
        }

        let range = range::resolve(range, self.limit())?;
        check_len(&range, bytes.len())?;
        if range.start == range.end {
            return Ok(());
        }

        if self.write_in_place(&range, bytes) {
            return Ok(());
        }

        let block = Block::from_vec(bytes.to_vec())?.into_ref();
        let replaced = self.tree.remove_range(range.clone());
        tracing::trace!(?range, replaced = replaced.len(), "copy-on-write");
        drop(replaced);

        self.tree
            .insert_leaf(range.clone(), LeafState::Filled(BlockView::whole(block)))?;

        if self.config.merge_adjacent {
            self.coalesce(range.start)?;
            // the leaf ending at `range.end` might have just moved
            self.coalesce(range.end)?;
        }
        Ok(())
    }

    /// Writes `bytes` directly into the block of the single leaf containing `range`, if there is
    /// one and nothing else can see the block
    fn write_in_place(&mut self, range: &Range<u64>, bytes: &[u8]) -> bool {
        let start = match self.tree.leaf_containing(range.start) {
            Some(l) if l.end() >= range.end && l.state().is_filled() => l.start(),
            _ => return false,
        };

        let Some(leaf) = self.tree.leaf_mut(start) else {
            return false;
        };
        let Some(dest) = leaf.state_mut().as_filled_mut().and_then(|v| v.bytes_mut()) else {
            return false;
        };

        let offset = (range.start - start) as usize;
        dest[offset..offset + bytes.len()].copy_from_slice(bytes);
        true
    }

    /// Joins the leaves on either side of `at`, if they can share one block
    ///
    /// Views of the same block are joined for free. Otherwise, two filled leaves are copied into
    /// a single new block, as long as the result stays within the maximum chunk size.
    fn coalesce(&mut self, at: u64) -> Result<(), Error> {
        if self.tree.merge_adjacent(at) {
            return Ok(());
        }

        let (lhs, rhs) = match (self.tree.prev_leaf_before(at), self.tree.leaf(at)) {
            (Some(l), Some(r)) if l.end() == at => (l, r),
            _ => return Ok(()),
        };
        let (Some(l), Some(r)) = (lhs.state().as_filled(), rhs.state().as_filled()) else {
            return Ok(());
        };

        let joined = lhs.start()..rhs.end();
        if joined.end - joined.start > self.config.chunk_size() {
            return Ok(());
        }

        let mut bytes = Vec::with_capacity(l.len() + r.len());
        bytes.extend_from_slice(l.bytes());
        bytes.extend_from_slice(r.bytes());
        let block = Block::from_vec(bytes)?.into_ref();

        self.tree.remove_range(joined.clone());
        self.tree
            .insert_leaf(joined.clone(), LeafState::Filled(BlockView::whole(block)))?;
        tracing::trace!(range = ?joined, "coalesced leaves");
        Ok(())
    }

    /// Returns an iterator over the bytes in `range`, one [`Segment`] per leaf
    ///
    /// Each leaf is materialized only once the iterator reaches it. The first and last segments
    /// are trimmed to `range`.
    pub fn iterate(&mut self, range: impl RangeBounds<u64>) -> Result<Segments<'_>, Error> {
        let range = range::resolve(range, self.limit())?;
        Ok(Segments {
            pos: range.start,
            range,
            buffer: self,
        })
    }

    /// Discards every leaf within `range`, so that those bytes are produced by the source again
    /// the next time they're read
    ///
    /// Leaves that straddle either end of `range` are split, keeping the parts outside it. Note
    /// that a `FILL_ONCE` source refuses to produce the same bytes twice.
    pub fn invalidate(&mut self, range: impl RangeBounds<u64>) -> Result<(), Error> {
        let range = range::resolve(range, self.limit())?;
        let removed = self.tree.remove_range(range.clone());
        tracing::debug!(?range, leaves = removed.len(), "invalidated range");
        Ok(())
    }

    /// Discards every leaf in the buffer
    pub fn invalidate_all(&mut self) {
        tracing::debug!(leaves = self.tree.len(), "invalidated buffer");
        self.tree.clear();
    }

    /// Checks the internal structure of the buffer, panicking if anything is wrong
    pub fn validate(&self) {
        self.tree.validate();

        for leaf in self.tree.leaves() {
            if let Some(limit) = self.limit() {
                if leaf.start() < limit.start || leaf.end() > limit.end {
                    internal_error!("leaf {:?} outside of limit {limit:?}", leaf.range());
                }
            }
            if let LeafState::Filled(view) = leaf.state() {
                if view.len() as u64 != leaf.size() {
                    internal_error!(
                        "leaf {:?} has a view of {} bytes",
                        leaf.range(),
                        view.len()
                    );
                }
            }
        }
    }

    /// Makes sure there's a filled leaf containing `pos`, returning its start
    ///
    /// If nothing covers `pos` yet, a new leaf is created starting there, ending at the next
    /// leaf, `end`, or the next multiple of the chunk size -- whichever comes first.
    fn materialize_at(&mut self, pos: u64, end: u64) -> Result<u64, Error> {
        let start = match self.tree.leaf_containing(pos) {
            Some(leaf) => leaf.start(),
            None => {
                let gap_end = match self.tree.next_leaf_after(pos) {
                    Some(next) => next.start().min(end),
                    None => end,
                };
                let chunk = self.config.chunk_size();
                let boundary = (pos / chunk).saturating_add(1).saturating_mul(chunk);
                self.tree
                    .insert_leaf(pos..boundary.min(gap_end), LeafState::Unfilled)?;
                pos
            }
        };

        self.fill_leaf(start)?;
        Ok(start)
    }

    /// Fills the leaf starting at `start`, if it isn't already
    fn fill_leaf(&mut self, start: u64) -> Result<(), Error> {
        let range = match self.tree.leaf(start) {
            Some(leaf) if leaf.state().is_filled() => return Ok(()),
            Some(leaf) => leaf.range(),
            None => internal_error!("no leaf to fill at {start}"),
        };

        let mut block = Block::allocate(len_of(&range)?)?;
        let Some(dest) = block.as_mut_slice() else {
            internal_error!("freshly allocated block is immutable")
        };
        self.source.fill(range.clone(), dest)?;
        tracing::trace!(?range, "materialized leaf");

        match self.tree.leaf_mut(start) {
            Some(leaf) => *leaf.state_mut() = LeafState::Filled(BlockView::whole(block.into_ref())),
            None => internal_error!("leaf at {start} disappeared while filling"),
        }
        Ok(())
    }
}

fn len_of(range: &Range<u64>) -> Result<usize, Error> {
    usize::try_from(range.end - range.start).map_err(|_| Error::InvalidRange(range.clone()))
}

fn check_len(range: &Range<u64>, actual: usize) -> Result<(), Error> {
    let expected = range.end - range.start;
    match actual as u64 == expected {
        true => Ok(()),
        false => Err(Error::LengthMismatch {
            expected,
            actual: actual as u64,
        }),
    }
}

impl Debug for Buffer {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("source", &*self.source)
            .field("config", &self.config)
            .field("leaves", &self.tree)
            .finish()
    }
}

/// Lazy iterator over the [`Segment`]s of a [`Buffer`], produced by [`Buffer::iterate`]
///
/// Each call to `next` materializes (at most) one leaf. After an error, the iterator is
/// exhausted; [`rewind`](Self::rewind) starts it over from the beginning, which retries
/// whatever failed.
pub struct Segments<'b> {
    buffer: &'b mut Buffer,
    range: Range<u64>,
    pos: u64,
}

impl Segments<'_> {
    /// Restarts iteration from the start of the range
    pub fn rewind(&mut self) {
        self.pos = self.range.start;
    }

    /// Returns the offset of the next segment to be produced
    pub fn position(&self) -> u64 {
        self.pos
    }
}

impl Iterator for Segments<'_> {
    type Item = Result<Segment, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.range.end {
            return None;
        }

        let start = match self.buffer.materialize_at(self.pos, self.range.end) {
            Ok(s) => s,
            Err(e) => {
                self.pos = self.range.end;
                return Some(Err(e));
            }
        };

        let Some(leaf) = self.buffer.tree.leaf(start) else {
            internal_error!("leaf at {start} disappeared after filling")
        };
        let Some(view) = leaf.state().as_filled() else {
            internal_error!("leaf {:?} still unfilled after filling", leaf.range())
        };

        let end = leaf.end().min(self.range.end);
        let offset = self.pos;
        let view = view.narrow((offset - start) as usize, (end - offset) as usize);
        self.pos = end;

        Some(Ok(Segment { offset, view }))
    }
}

/// A contiguous piece of a [`Buffer`], yielded by [`Segments`]
///
/// The segment holds its own reference to the underlying block, so its bytes stay the same even
/// if the buffer is written to afterwards.
#[derive(Debug, Clone)]
pub struct Segment {
    offset: u64,
    view: BlockView,
}

impl Segment {
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn len(&self) -> u64 {
        self.view.len() as u64
    }

    /// Always false: [`Segments`] never yields empty segments
    pub fn is_empty(&self) -> bool {
        self.view.len() == 0
    }

    /// Returns the offsets covered by the segment
    pub fn range(&self) -> Range<u64> {
        self.offset..self.offset + self.len()
    }

    pub fn bytes(&self) -> &[u8] {
        self.view.bytes()
    }

    pub fn into_view(self) -> BlockView {
        self.view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::ConstantFiller;

    fn counting_buffer(chunk: u64) -> Buffer {
        let config = BufferConfig {
            max_chunk_size: chunk,
            ..BufferConfig::default()
        };
        let source = Source::new(ConstantFiller::new(1), None).with_limit(0..100);
        Buffer::with_config(source.into_ref(), config)
    }

    #[test]
    fn gaps_are_chunked_on_aligned_boundaries() {
        let mut buf = counting_buffer(16);
        buf.read_to_vec(10..40).unwrap();
        buf.validate();

        let leaves: Vec<_> = buf.materialized().collect();
        assert_eq!(leaves, [10..16, 16..32, 32..40]);

        // only the gaps are filled the second time around
        buf.read_to_vec(0..50).unwrap();
        let leaves: Vec<_> = buf.materialized().collect();
        assert_eq!(leaves, [0..10, 10..16, 16..32, 32..40, 40..48, 48..50]);
    }

    #[test]
    fn in_place_write_keeps_block() {
        let mut buf = counting_buffer(64);
        buf.read_to_vec(0..64).unwrap();
        let before = buf.tree().leaf(0).unwrap().state().as_filled().unwrap().block().clone();
        // `before` holds a reference, so this write has to copy
        buf.write(4..8, &[9; 4]).unwrap();
        assert!(!Handle::ptr_eq(
            &before,
            buf.tree().leaf(0).unwrap().state().as_filled().unwrap().block()
        ));
        assert_eq!(before.as_slice()[4..8], [1; 4]);
        drop(before);

        // now nothing else refers to the block
        let ptr = buf.tree().leaf(0).unwrap().state().as_filled().unwrap().bytes().as_ptr();
        buf.write(10..12, &[7, 7]).unwrap();
        let leaf = buf.tree().leaf(0).unwrap();
        assert_eq!(leaf.range(), 0..64);
        assert_eq!(leaf.state().as_filled().unwrap().bytes().as_ptr(), ptr);
        assert_eq!(buf.read_to_vec(3..13).unwrap(), [1, 9, 9, 9, 9, 1, 1, 7, 7, 1]);
        buf.validate();
    }

    #[test]
    fn write_coalesces_small_neighbours() {
        let mut buf = counting_buffer(32);
        buf.write(0..4, b"abcd").unwrap();
        buf.write(4..6, b"ef").unwrap();
        buf.write(8..10, b"ij").unwrap();
        assert_eq!(buf.tree().len(), 2);
        assert_eq!(buf.materialized().collect::<Vec<_>>(), [0..6, 8..10]);

        buf.write(6..8, b"gh").unwrap();
        assert_eq!(buf.tree().len(), 1);
        assert_eq!(buf.read_to_vec(0..10).unwrap(), b"abcdefghij");

        let mut buf = counting_buffer(4);
        buf.write(0..4, b"abcd").unwrap();
        buf.write(4..6, b"ef").unwrap();
        assert_eq!(buf.tree().len(), 2);
    }

    #[test]
    fn write_without_merging() {
        let config = BufferConfig {
            merge_adjacent: false,
            ..BufferConfig::default()
        };
        let source = Source::new(ConstantFiller::new(0), None).with_limit(0..10);
        let mut buf = Buffer::with_config(source.into_ref(), config);
        buf.write(0..4, b"abcd").unwrap();
        buf.write(4..6, b"ef").unwrap();
        assert_eq!(buf.tree().len(), 2);
        assert_eq!(buf.read_to_vec(..).unwrap(), b"abcdef\0\0\0\0");
    }

    #[test]
    fn empty_ranges() {
        let mut buf = counting_buffer(8);
        assert!(buf.read_to_vec(5..5).unwrap().is_empty());
        buf.write(5..5, &[]).unwrap();
        assert_eq!(buf.iterate(5..5).unwrap().count(), 0);
        assert!(buf.tree().is_empty());
    }

    #[test]
    fn length_mismatch() {
        let mut buf = counting_buffer(8);
        let mut dest = [0; 3];
        assert!(matches!(
            buf.read(0..4, &mut dest),
            Err(Error::LengthMismatch {
                expected: 4,
                actual: 3
            })
        ));
        assert!(matches!(
            buf.write(0..2, &dest),
            Err(Error::LengthMismatch { .. })
        ));
        assert!(buf.tree().is_empty());
    }

    #[test]
    fn segments_rewind() {
        let mut buf = counting_buffer(10);
        let mut segments = buf.iterate(5..25).unwrap();
        let first = segments.next().unwrap().unwrap();
        assert_eq!(first.range(), 5..10);
        assert_eq!(segments.position(), 10);

        let rest: Vec<_> = segments.by_ref().map(|s| s.unwrap().range()).collect();
        assert_eq!(rest, [10..20, 20..25]);
        assert!(segments.next().is_none());

        segments.rewind();
        assert_eq!(segments.count(), 3);
    }
}
