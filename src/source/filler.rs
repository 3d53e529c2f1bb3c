//! The [`Filler`] trait and the fillers that come with the crate

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;

use parking_lot::Mutex;

use crate::block::BlockRef;
use crate::{FillError, SharedBuffer};

/// A single request made of a [`Filler`]
pub struct FillRequest<'a> {
    /// The offsets being requested; always non-empty and within the source's limit
    pub range: Range<u64>,
    /// Where the bytes go. Exactly `range.end - range.start` long
    pub dest: &'a mut [u8],
    /// The backing buffer of the source making the request, if it has one
    pub backing: Option<&'a SharedBuffer>,
}

/// Something that can produce the bytes for a range of offsets
///
/// Implementations must either write every byte of [`FillRequest::dest`] or return an error;
/// partial fills aren't a thing. Fillers may block.
///
/// Any `Fn(Range<u64>, &mut [u8]) -> Result<(), FillError>` is a filler.
pub trait Filler: Send + Sync {
    fn fill(&self, req: FillRequest<'_>) -> Result<(), FillError>;
}

impl<F> Filler for F
where
    F: Fn(Range<u64>, &mut [u8]) -> Result<(), FillError> + Send + Sync,
{
    fn fill(&self, req: FillRequest<'_>) -> Result<(), FillError> {
        self(req.range, req.dest)
    }
}

/// Fills every byte with the same value
#[derive(Debug, Copy, Clone)]
pub struct ConstantFiller {
    byte: u8,
}

impl ConstantFiller {
    pub fn new(byte: u8) -> Self {
        ConstantFiller { byte }
    }
}

impl Filler for ConstantFiller {
    fn fill(&self, req: FillRequest<'_>) -> Result<(), FillError> {
        req.dest.fill(self.byte);
        Ok(())
    }
}

/// Copies out of an in-memory block, which holds the bytes for offsets `base..base + len`
#[derive(Debug, Clone)]
pub struct MemoryFiller {
    block: BlockRef,
    base: u64,
}

impl MemoryFiller {
    /// Creates a filler serving the contents of `block`, starting at offset zero
    pub fn new(block: BlockRef) -> Self {
        MemoryFiller { block, base: 0 }
    }

    /// Sets the offset that the first byte of the block is served at
    pub fn at_offset(mut self, base: u64) -> Self {
        self.base = base;
        self
    }

    /// Returns the offsets this filler has data for
    ///
    /// Bytes that would sit past `u64::MAX` are never served.
    pub fn available(&self) -> Range<u64> {
        self.base..self.base.saturating_add(self.block.len() as u64)
    }
}

impl Filler for MemoryFiller {
    fn fill(&self, req: FillRequest<'_>) -> Result<(), FillError> {
        let available = self.available();
        if req.range.start < available.start || req.range.end > available.end {
            return Err(FillError::OutOfData { available });
        }

        let start = (req.range.start - self.base) as usize;
        let end = (req.range.end - self.base) as usize;
        req.dest.copy_from_slice(&self.block.as_slice()[start..end]);
        Ok(())
    }
}

/// Reads from an open file
///
/// Offset `o` is read from position `o + file_offset` in the file. Running off the end of the
/// file is an I/O error (`UnexpectedEof`), not a short fill.
#[derive(Debug)]
pub struct FileFiller {
    file: Mutex<File>,
    file_offset: u64,
}

impl FileFiller {
    pub fn new(file: File) -> Self {
        FileFiller {
            file: Mutex::new(file),
            file_offset: 0,
        }
    }

    /// Sets the position in the file that offset zero maps to
    pub fn with_file_offset(mut self, file_offset: u64) -> Self {
        self.file_offset = file_offset;
        self
    }
}

impl Filler for FileFiller {
    fn fill(&self, req: FillRequest<'_>) -> Result<(), FillError> {
        let pos = shift(&req.range, self.file_offset)?.start;

        // Seeking and reading have to happen together, so the file stays locked for both.
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(pos))?;
        file.read_exact(req.dest)?;
        Ok(())
    }
}

/// Reads through the source's backing buffer
///
/// Offset `o` is read from offset `o + backing_offset` in the backing buffer, materializing it
/// there if necessary. If the backing buffer is already locked (e.g., because it's the one
/// asking), the fill fails with [`FillError::BackingBusy`] instead of deadlocking.
#[derive(Debug, Copy, Clone, Default)]
pub struct BackingFiller {
    backing_offset: u64,
}

impl BackingFiller {
    pub fn new(backing_offset: u64) -> Self {
        BackingFiller { backing_offset }
    }
}

impl Filler for BackingFiller {
    fn fill(&self, req: FillRequest<'_>) -> Result<(), FillError> {
        let backing = req.backing.ok_or(FillError::NoBacking)?;
        let mut buffer = backing.try_lock().ok_or(FillError::BackingBusy)?;

        let range = shift(&req.range, self.backing_offset)?;
        buffer
            .read(range, req.dest)
            .map_err(|e| FillError::Backing(Box::new(e)))
    }
}

/// Moves `range` up by `offset`, failing if either end would overflow
fn shift(range: &Range<u64>, offset: u64) -> Result<Range<u64>, FillError> {
    match (range.start.checked_add(offset), range.end.checked_add(offset)) {
        (Some(start), Some(end)) => Ok(start..end),
        _ => Err(FillError::OffsetOverflow {
            range: range.clone(),
            offset,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::source::Source;
    use crate::Error;

    #[test]
    fn memory_filler_bounds() {
        let block = Block::from_vec(b"0123456789".to_vec()).unwrap().into_ref();
        let source = Source::new(MemoryFiller::new(block).at_offset(100), None);

        let mut buf = [0_u8; 3];
        source.fill(102..105, &mut buf).unwrap();
        assert_eq!(&buf, b"234");

        let err = source.fill(108..111, &mut buf).unwrap_err();
        assert!(matches!(
            err,
            Error::Fill {
                source: FillError::OutOfData { ref available },
                ..
            } if *available == (100..110)
        ));
    }

    #[test]
    fn backing_filler_without_backing() {
        let source = Source::new(BackingFiller::default(), None);
        let mut buf = [0_u8; 2];
        assert!(matches!(
            source.fill(0..2, &mut buf),
            Err(Error::Fill {
                source: FillError::NoBacking,
                ..
            })
        ));
    }
}
