//! Atomically reference-counted handles with an explicit destructor
//!
//! [`Handle`] is roughly an `Arc` that also carries the function to run on its payload once the
//! final reference is released. Blocks, sources, and shared buffers are all passed around as
//! `Handle`s -- and because leaves in a tree share blocks after they've been split, whether a
//! handle is *unique* ends up being what decides if a write can happen in place.

use crate::Error;
use std::fmt::{self, Debug, Formatter};
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::ops::Deref;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Function run with the payload of a [`Handle`] when the last reference is released
pub type Destructor<T> = Box<dyn FnOnce(T) + Send>;

/// Shared-ownership handle to a value of type `T`
///
/// Every [`acquire`] (or `clone`) increments the count, and every [`release`] (or drop)
/// decrements it. The destructor runs exactly once, on the transition from one to zero.
///
/// [`acquire`]: Self::acquire
/// [`release`]: Self::release
pub struct Handle<T> {
    ptr: NonNull<Inner<T>>,
    marker: PhantomData<Inner<T>>,
}

struct Inner<T> {
    count: AtomicUsize,
    value: ManuallyDrop<T>,
    destructor: Option<Destructor<T>>,
}

/// Result of releasing a [`Handle`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Released {
    /// Other references remain, so nothing was destroyed
    Alive,
    /// This was the last reference; the destructor has run
    Destroyed,
}

// SAFETY: `Handle` provides shared access to `T` from any thread holding a reference, and may
// hand the `T` to the destructor on whichever thread releases last -- the same requirements as
// `Arc<T>`.
unsafe impl<T: Send + Sync> Send for Handle<T> {}
// SAFETY: see above.
unsafe impl<T: Send + Sync> Sync for Handle<T> {}

impl<T> Handle<T> {
    /// Creates a new handle with a count of one; the value is simply dropped once released
    pub fn new(value: T) -> Self {
        Self::from_inner(value, None)
    }

    /// Creates a new handle with a count of one, running `destructor` on the value once the
    /// final reference is released
    pub fn with_destructor<F>(value: T, destructor: F) -> Self
    where
        F: 'static + FnOnce(T) + Send,
    {
        Self::from_inner(value, Some(Box::new(destructor)))
    }

    fn from_inner(value: T, destructor: Option<Destructor<T>>) -> Self {
        let inner = Box::new(Inner {
            count: AtomicUsize::new(1),
            value: ManuallyDrop::new(value),
            destructor,
        });

        Handle {
            ptr: NonNull::from(Box::leak(inner)),
            marker: PhantomData,
        }
    }

    fn inner(&self) -> &Inner<T> {
        // SAFETY: the allocation stays alive for as long as any handle (including `self`) exists
        unsafe { self.ptr.as_ref() }
    }

    /// Produces another reference to the same value, incrementing the count
    pub fn acquire(&self) -> Self {
        // A relaxed ordering is ok here: `self` guarantees the count is already at least one, and
        // the new reference can't be released before this increment happens.
        let old = self.inner().count.fetch_add(1, Ordering::Relaxed);
        if old > isize::MAX as usize {
            panic!("more than isize::MAX references to the same handle");
        }

        Handle {
            ptr: self.ptr,
            marker: PhantomData,
        }
    }

    /// Releases this reference, running the destructor if it was the last one
    pub fn release(self) -> Released {
        let this = ManuallyDrop::new(self);
        // SAFETY: `this` is never used again, and won't be dropped
        unsafe { this.release_in_place() }
    }

    /// Decrements the count and destroys the value if it reached zero
    ///
    /// ## Safety
    ///
    /// The handle must not be used (or dropped) after this call.
    unsafe fn release_in_place(&self) -> Released {
        if self.inner().count.fetch_sub(1, Ordering::Release) != 1 {
            return Released::Alive;
        }

        // Matches the `Release` of every prior decrement, so that all writes made through other
        // references are visible before the destructor runs. `Arc` does the same.
        self.inner().count.load(Ordering::Acquire);

        // SAFETY: the count just hit zero, so we're the only one with access to the allocation,
        // which was created by `Box::leak` in `from_inner`.
        let mut inner = unsafe { Box::from_raw(self.ptr.as_ptr()) };
        // SAFETY: `value` is never touched again; `inner` is dropped without dropping it.
        let value = unsafe { ManuallyDrop::take(&mut inner.value) };
        match inner.destructor.take() {
            Some(destructor) => destructor(value),
            None => drop(value),
        }

        Released::Destroyed
    }

    /// Returns the current number of references
    pub fn count(&self) -> usize {
        self.inner().count.load(Ordering::Acquire)
    }

    /// Returns whether this is the only reference to the value
    pub fn is_unique(&self) -> bool {
        // The `Acquire` here matches the `Release` in `release`, so a release in another thread
        // can't be reordered after we observe a count of one.
        self.count() == 1
    }

    /// Returns mutable access to the value, but only if this is the sole reference
    pub fn get_mut(&mut self) -> Option<&mut T> {
        if !self.is_unique() {
            return None;
        }

        // SAFETY: we're the only reference, and `&mut self` prevents new ones from being made
        // while the returned borrow is alive.
        Some(unsafe { &mut *self.ptr.as_mut().value })
    }

    /// Returns whether both handles refer to the same value
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        this.ptr == other.ptr
    }
}

/// Releases a handle that may be null
///
/// Releasing a null handle is a caller bug; it's reported as [`Error::NullHandle`] rather than
/// silently ignored.
pub fn release_nullable<T>(handle: Option<Handle<T>>) -> Result<Released, Error> {
    match handle {
        Some(h) => Ok(h.release()),
        None => Err(Error::NullHandle),
    }
}

impl<T> Deref for Handle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &*self.inner().value
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        self.acquire()
    }
}

impl<T> Drop for Handle<T> {
    fn drop(&mut self) {
        // SAFETY: we're in the destructor; `self` is not used again.
        unsafe { self.release_in_place() };
    }
}

impl<T: Debug> Debug for Handle<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("Handle")
            .field("count", &self.count())
            .field("value", &**self)
            .finish()
    }
}
