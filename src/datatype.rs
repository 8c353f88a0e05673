//! Datatype trait and type tag mapping.
//!
//! This module provides the [`Datatype`] trait, a sealed trait that maps Rust
//! primitive types to the tags carried on every message, and knows how to
//! combine two values under a [`ReduceOp`].
//!
//! # Supported Types
//!
//! | Rust Type | Tag Value |
//! |-----------|-----------|
//! | `f32`     | 0         |
//! | `f64`     | 1         |
//! | `i32`     | 2         |
//! | `i64`     | 3         |
//! | `u8`      | 4         |
//! | `u32`     | 5         |
//! | `u64`     | 6         |

use crate::ReduceOp;

/// Internal module to seal the trait — prevents external implementations.
mod sealed {
    pub trait Sealed {}
}

/// Tag carried by every message so a receiver can reject a payload of the
/// wrong element type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum DatatypeTag {
    /// 32-bit floating point
    F32 = 0,
    /// 64-bit floating point
    F64 = 1,
    /// 32-bit signed integer
    I32 = 2,
    /// 64-bit signed integer
    I64 = 3,
    /// 8-bit unsigned integer
    U8 = 4,
    /// 32-bit unsigned integer
    U32 = 5,
    /// 64-bit unsigned integer
    U64 = 6,
}

/// Trait for types that can be used in communication operations.
///
/// This is a **sealed trait** — it cannot be implemented outside this crate.
/// Supported types: [`f32`], [`f64`], [`i32`], [`i64`], [`u8`], [`u32`], [`u64`].
///
/// Integer `Sum` and `Prod` wrap on overflow, floating point follows IEEE 754.
///
/// # Example
///
/// ```
/// use ferropi::{Datatype, ReduceOp};
///
/// assert_eq!(2.5f64.combine(1.5, ReduceOp::Sum), 4.0);
/// assert_eq!(7i64.combine(3, ReduceOp::Min), 3);
/// ```
pub trait Datatype: sealed::Sealed + Copy + Send + 'static {
    /// The tag placed on the wire for this type.
    const TAG: DatatypeTag;

    /// Combine `self` with `other` under `op`.
    fn combine(self, other: Self, op: ReduceOp) -> Self;
}

macro_rules! impl_float_datatype {
    ($ty:ty, $tag:expr) => {
        impl sealed::Sealed for $ty {}
        impl Datatype for $ty {
            const TAG: DatatypeTag = $tag;

            #[inline]
            fn combine(self, other: Self, op: ReduceOp) -> Self {
                match op {
                    ReduceOp::Sum => self + other,
                    ReduceOp::Max => self.max(other),
                    ReduceOp::Min => self.min(other),
                    ReduceOp::Prod => self * other,
                }
            }
        }
    };
}

macro_rules! impl_int_datatype {
    ($ty:ty, $tag:expr) => {
        impl sealed::Sealed for $ty {}
        impl Datatype for $ty {
            const TAG: DatatypeTag = $tag;

            #[inline]
            fn combine(self, other: Self, op: ReduceOp) -> Self {
                match op {
                    ReduceOp::Sum => self.wrapping_add(other),
                    ReduceOp::Max => Ord::max(self, other),
                    ReduceOp::Min => Ord::min(self, other),
                    ReduceOp::Prod => self.wrapping_mul(other),
                }
            }
        }
    };
}

impl_float_datatype!(f32, DatatypeTag::F32);
impl_float_datatype!(f64, DatatypeTag::F64);
impl_int_datatype!(i32, DatatypeTag::I32);
impl_int_datatype!(i64, DatatypeTag::I64);
impl_int_datatype!(u8, DatatypeTag::U8);
impl_int_datatype!(u32, DatatypeTag::U32);
impl_int_datatype!(u64, DatatypeTag::U64);
