//! Public-facing traits for keys and payloads of a [`RangeTree`](crate::tree::RangeTree)

use std::fmt::Debug;
use std::ops::{Add, Sub};

/// Blanket trait for types that can be used as a key in a [`RangeTree`]
///
/// Keys are offsets: they're compared to find which leaf covers a position, and subtracted from
/// each other to find a position *within* a leaf. [`Buffer`] always uses `u64` byte offsets, but
/// the tree itself doesn't care what the domain is, so long as it's ordered.
///
/// An implementation of this trait is already provided for types that implement the component
/// supertraits.
///
/// [`RangeTree`]: crate::tree::RangeTree
/// [`Buffer`]: crate::Buffer
pub trait Index: Debug + Copy + Ord + Zero + DirectionalAdd + DirectionalSub {}

impl<I: Debug + Copy + Ord + Zero + DirectionalAdd + DirectionalSub> Index for I {}

/// Trait for payloads that can be stored in the leaves of a [`RangeTree`]
///
/// A payload implicitly covers the range of its leaf, but that range is tracked by the tree, not
/// the payload. Splitting a leaf calls [`split_at`] and merging neighbours calls [`try_join`].
///
/// [`RangeTree`]: crate::tree::RangeTree
/// [`split_at`]: Self::split_at
/// [`try_join`]: Self::try_join
pub trait Slice<Idx>: Sized {
    /// Splits the payload at the given offset, setting `self ≈ self[..idx]` and returning
    /// `self[idx..]`
    ///
    /// The index is relative to the start of the leaf, and is always strictly between zero and
    /// the leaf's size.
    fn split_at(&mut self, idx: Idx) -> Self;

    /// Attempts to join two payloads into one, returning `Ok(joined)` or `Err((self, other))`
    ///
    /// `self` is always the payload immediately before `other`. The default implementation never
    /// joins.
    fn try_join(self, other: Self) -> Result<Self, (Self, Self)> {
        Err((self, other))
    }
}

/// Types that have a "zero" value, in the mathematical sense
///
/// `x + ZERO == x == x - ZERO`, using [`DirectionalAdd`] and [`DirectionalSub`] for addition and
/// subtraction.
pub trait Zero {
    /// Constant value of zero
    const ZERO: Self;
}

/// Directional-arithmetic counterpart to [`std::ops::Add`]
///
/// Offsets only really make sense relative to the positions they were taken from, so addition
/// and subtraction take the side of the other operand explicitly:
///
/// ```text
/// |---- self ---|--- right ---|
/// |-- self.add_right(right) --|
/// ```
///
/// A blanket implementation is provided for all `T: Add<Output = Self>`.
pub trait DirectionalAdd: Sized {
    /// Adds a value to the left; the default implementation returns `left.add_right(self)`
    fn add_left(self, left: Self) -> Self {
        left.add_right(self)
    }

    /// Adds a value to the right
    fn add_right(self, right: Self) -> Self;
}

/// Directional-arithmetic counterpart to [`std::ops::Sub`]
///
/// ```text
/// |--------------- self ---------------|
/// |-- left --|-- self.sub_left(left) --|
/// ```
///
/// A blanket implementation is provided for all `T: Sub<Output = Self>`.
pub trait DirectionalSub {
    /// Subtracts a value from the left
    fn sub_left(self, left: Self) -> Self;

    /// Subtracts a value from the right
    fn sub_right(self, right: Self) -> Self;
}

impl<T: Add<Output = Self>> DirectionalAdd for T {
    fn add_right(self, right: Self) -> Self {
        self + right
    }
}

impl<T: Sub<Output = Self>> DirectionalSub for T {
    fn sub_left(self, left: Self) -> Self {
        self - left
    }

    fn sub_right(self, right: Self) -> Self {
        self - right
    }
}

macro_rules! impl_for_unsigned_primitive {
    ($ty:ident) => {
        impl Zero for $ty {
            const ZERO: $ty = 0;
        }
    };
}

impl_for_unsigned_primitive!(u8);
impl_for_unsigned_primitive!(u16);
impl_for_unsigned_primitive!(u32);
impl_for_unsigned_primitive!(u64);
impl_for_unsigned_primitive!(usize);

/// `()` can be stored in a tree that only tracks which ranges exist; adjacent units always join
impl<I> Slice<I> for () {
    fn split_at(&mut self, _idx: I) -> Self {}

    fn try_join(self, _other: Self) -> Result<Self, (Self, Self)> {
        Ok(())
    }
}
