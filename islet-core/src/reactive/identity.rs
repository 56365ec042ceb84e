//! Identity comparison for signal values.
//!
//! A signal only notifies when the new value is not *identical* to the old
//! one. For plain values (numbers, booleans, strings) identity is value
//! equality. Shared heap values wrapped in `Arc` are identical only when
//! they are the same allocation, so replacing an `Arc` with a freshly built
//! but structurally equal one still notifies.
//!
//! Floats follow identity rather than IEEE equality: `NaN` is identical to
//! `NaN`, and `0.0` is not identical to `-0.0`.

use std::sync::Arc;

/// Values that can be compared by identity.
pub trait Identical {
    fn identical(&self, other: &Self) -> bool;
}

macro_rules! identical_by_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Identical for $ty {
                #[inline]
                fn identical(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

identical_by_eq!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    String,
    &'static str,
);

impl Identical for f64 {
    #[inline]
    fn identical(&self, other: &Self) -> bool {
        if self.is_nan() {
            return other.is_nan();
        }
        self.to_bits() == other.to_bits()
    }
}

impl Identical for f32 {
    #[inline]
    fn identical(&self, other: &Self) -> bool {
        if self.is_nan() {
            return other.is_nan();
        }
        self.to_bits() == other.to_bits()
    }
}

impl<T: ?Sized> Identical for Arc<T> {
    #[inline]
    fn identical(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: Identical> Identical for Option<T> {
    fn identical(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.identical(b),
            (None, None) => true,
            _ => false,
        }
    }
}
