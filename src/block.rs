//! Memory blocks -- the physical storage behind a buffer's leaves
//!
//! A [`Block`] is a fixed-size, non-empty span of bytes. It's either allocated by us, borrowed
//! for `'static`, or adopted from somewhere else entirely (with an optional destructor to run
//! once we're done with it). Blocks are shared by reference count as [`BlockRef`]s; a
//! [`BlockView`] is a window into one, which is what actually lives in a tree leaf.

use std::alloc::{handle_alloc_error, Layout};
use std::fmt::{self, Debug, Formatter};
use std::ptr::NonNull;
use std::slice;

use crate::rc::Handle;
use crate::{Error, Slice};

/// Shared reference to a [`Block`]
pub type BlockRef = Handle<Block>;

/// Function run on a foreign span once the [`Block`] wrapping it is destroyed
pub type BlockDestructor = Box<dyn FnOnce(NonNull<u8>, usize) + Send>;

/// An owned, fixed-size span of bytes
pub struct Block {
    storage: Storage,
}

enum Storage {
    Owned(Box<[u8]>),
    Static(&'static [u8]),
    Foreign {
        ptr: NonNull<u8>,
        len: usize,
        mutable: bool,
        destructor: Option<BlockDestructor>,
    },
}

// SAFETY: the only raw pointer is in `Storage::Foreign`, and `Block::wrap` requires that the
// memory behind it can be accessed from any thread.
unsafe impl Send for Block {}
// SAFETY: mutable access is only ever provided through `&mut Block`.
unsafe impl Sync for Block {}

/// Externally-owned memory to be adopted by [`Block::wrap`]
#[derive(Debug, Copy, Clone)]
pub struct ForeignSpan {
    pub ptr: NonNull<u8>,
    pub len: usize,
    /// If false, the block refuses writes and may not be given a destructor
    pub mutable: bool,
}

impl Block {
    /// Allocates a new zeroed block of `size` bytes
    ///
    /// A `size` of zero is an error. Failing to allocate is not: the process aborts, because
    /// there's nothing sensible that any caller could do about it.
    pub fn allocate(size: usize) -> Result<Block, Error> {
        if size == 0 {
            return Err(Error::ZeroSize);
        }

        let mut bytes = Vec::new();
        if bytes.try_reserve_exact(size).is_err() {
            alloc_failure(size);
        }
        bytes.resize(size, 0_u8);

        Ok(Block {
            storage: Storage::Owned(bytes.into_boxed_slice()),
        })
    }

    /// Creates a block that takes ownership of the bytes
    pub fn from_vec(bytes: Vec<u8>) -> Result<Block, Error> {
        if bytes.is_empty() {
            return Err(Error::ZeroSize);
        }

        Ok(Block {
            storage: Storage::Owned(bytes.into_boxed_slice()),
        })
    }

    /// Creates an immutable block over static data; nothing is freed when it's destroyed
    pub fn from_static(bytes: &'static [u8]) -> Result<Block, Error> {
        if bytes.is_empty() {
            return Err(Error::ZeroSize);
        }

        Ok(Block {
            storage: Storage::Static(bytes),
        })
    }

    /// Adopts memory owned by someone else
    ///
    /// If `destructor` is given, it's called with the span exactly once, when the block is
    /// destroyed. Without one, the memory is the caller's responsibility. Immutable spans may not
    /// have a destructor: their owner guarantees the data outlives the block, so freeing it here
    /// would be a double free.
    ///
    /// ## Safety
    ///
    /// `span.ptr` must be valid for reads of `span.len` bytes (and writes, if `span.mutable`)
    /// from any thread, until the destructor runs or -- without a destructor -- for as long as
    /// the block exists. Nothing else may write to the span in that time.
    pub unsafe fn wrap(
        span: ForeignSpan,
        destructor: Option<BlockDestructor>,
    ) -> Result<Block, Error> {
        if span.len == 0 {
            return Err(Error::ZeroSize);
        } else if !span.mutable && destructor.is_some() {
            return Err(Error::ImmutableDestructor);
        }

        Ok(Block {
            storage: Storage::Foreign {
                ptr: span.ptr,
                len: span.len,
                mutable: span.mutable,
                destructor,
            },
        })
    }

    /// Returns the size of the block in bytes; always non-zero
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Returns whether the block's contents may be changed
    pub fn is_mutable(&self) -> bool {
        match &self.storage {
            Storage::Owned(_) => true,
            Storage::Static(_) => false,
            Storage::Foreign { mutable, .. } => *mutable,
        }
    }

    /// Returns the contents of the block
    pub fn as_slice(&self) -> &[u8] {
        match &self.storage {
            Storage::Owned(b) => &b[..],
            Storage::Static(b) => &b[..],
            // SAFETY: guaranteed by the contract of `Block::wrap`
            Storage::Foreign { ptr, len, .. } => unsafe {
                slice::from_raw_parts(ptr.as_ptr(), *len)
            },
        }
    }

    /// Returns the contents of the block mutably, if it's mutable
    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        match &mut self.storage {
            Storage::Owned(b) => Some(&mut b[..]),
            Storage::Static(_) => None,
            Storage::Foreign { mutable: false, .. } => None,
            // SAFETY: guaranteed by the contract of `Block::wrap`; `&mut self` gives exclusivity
            Storage::Foreign { ptr, len, .. } => unsafe {
                Some(slice::from_raw_parts_mut(ptr.as_ptr(), *len))
            },
        }
    }

    /// Wraps the block in a [`BlockRef`] with a count of one
    pub fn into_ref(self) -> BlockRef {
        Handle::new(self)
    }
}

#[cold]
fn alloc_failure(size: usize) -> ! {
    tracing::error!(size, "memory block allocation failed");
    match Layout::array::<u8>(size) {
        Ok(layout) => handle_alloc_error(layout),
        Err(_) => panic!("memory block of {size} bytes exceeds the maximum allocation size"),
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        if let Storage::Foreign {
            ptr,
            len,
            destructor,
            ..
        } = &mut self.storage
        {
            if let Some(d) = destructor.take() {
                d(*ptr, *len);
            }
        }
    }
}

impl Debug for Block {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let kind = match &self.storage {
            Storage::Owned(_) => "owned",
            Storage::Static(_) => "static",
            Storage::Foreign { .. } => "foreign",
        };
        f.debug_struct("Block")
            .field("kind", &kind)
            .field("len", &self.len())
            .finish()
    }
}

/// A window `[start, start + len)` into a shared [`Block`]
///
/// Views are the payload of filled tree leaves. Splitting a view doesn't copy anything: both
/// halves hold a reference to the same block.
#[derive(Clone)]
pub struct BlockView {
    block: BlockRef,
    start: usize,
    len: usize,
}

impl BlockView {
    /// Creates a view covering the whole block
    pub fn whole(block: BlockRef) -> Self {
        let len = block.len();
        BlockView {
            block,
            start: 0,
            len,
        }
    }

    /// Returns the bytes visible through this view
    pub fn bytes(&self) -> &[u8] {
        &self.block.as_slice()[self.start..self.start + self.len]
    }

    /// Returns the bytes visible through this view mutably, but only if nothing else references
    /// the block and the block is mutable
    pub fn bytes_mut(&mut self) -> Option<&mut [u8]> {
        let range = self.start..self.start + self.len;
        let block = self.block.get_mut()?;
        Some(&mut block.as_mut_slice()?[range])
    }

    /// Returns the number of bytes in the view
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns the shared block this view looks into
    pub fn block(&self) -> &BlockRef {
        &self.block
    }

    /// Returns the offset of the view within its block
    pub fn block_offset(&self) -> usize {
        self.start
    }

    /// Narrows the view to the `len` bytes starting `offset` bytes in
    pub(crate) fn narrow(&self, offset: usize, len: usize) -> BlockView {
        debug_assert!(offset + len <= self.len);
        BlockView {
            block: self.block.acquire(),
            start: self.start + offset,
            len,
        }
    }
}

impl Slice<u64> for BlockView {
    fn split_at(&mut self, idx: u64) -> Self {
        let idx = match usize::try_from(idx) {
            Ok(i) if i > 0 && i < self.len => i,
            _ => internal_error!("cannot split a view of {} bytes at {idx}", self.len),
        };

        let rhs = BlockView {
            block: self.block.acquire(),
            start: self.start + idx,
            len: self.len - idx,
        };
        self.len = idx;
        rhs
    }

    fn try_join(self, other: Self) -> Result<Self, (Self, Self)> {
        if Handle::ptr_eq(&self.block, &other.block) && self.start + self.len == other.start {
            let len = self.len + other.len;
            // `other` is dropped here, releasing its reference to the block
            Ok(BlockView { len, ..self })
        } else {
            Err((self, other))
        }
    }
}

impl Debug for BlockView {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("BlockView")
            .field("block", &(self.block.as_slice().as_ptr()))
            .field("refs", &self.block.count())
            .field("range", &(self.start..self.start + self.len))
            .finish()
    }
}

impl PartialEq for BlockView {
    fn eq(&self, other: &Self) -> bool {
        self.bytes() == other.bytes()
    }
}
