//! Message datatype trait and type tag mapping.
//!
//! This module provides the [`Datatype`] trait, a sealed trait that maps Rust
//! primitive types to the typed payloads carried between workers and defines
//! how each type folds under a [`ReduceOp`].
//!
//! # Supported Types
//!
//! | Rust Type | Tag Value | `Max` identity     |
//! |-----------|-----------|--------------------|
//! | `f32`     | 0         | `f32::NEG_INFINITY`|
//! | `f64`     | 1         | `f64::NEG_INFINITY`|
//! | `i32`     | 2         | `i32::MIN`         |
//! | `i64`     | 3         | `i64::MIN`         |
//! | `u8`      | 4         | `0`                |
//! | `u32`     | 5         | `0`                |
//! | `u64`     | 6         | `0`                |

use crate::ReduceOp;

/// Internal module to seal the trait, preventing external implementations.
mod sealed {
    use super::Payload;

    pub trait Sealed: Sized {
        fn pack(data: &[Self]) -> Payload;
        fn unpack(payload: &Payload) -> Option<&[Self]>;
    }
}

/// Element type tag carried with every message.
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

/// Typed message body.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I32(Vec<i32>),
    I64(Vec<i64>),
    U8(Vec<u8>),
    U32(Vec<u32>),
    U64(Vec<u64>),
}

impl Payload {
    pub(crate) fn tag(&self) -> DatatypeTag {
        match self {
            Payload::F32(_) => DatatypeTag::F32,
            Payload::F64(_) => DatatypeTag::F64,
            Payload::I32(_) => DatatypeTag::I32,
            Payload::I64(_) => DatatypeTag::I64,
            Payload::U8(_) => DatatypeTag::U8,
            Payload::U32(_) => DatatypeTag::U32,
            Payload::U64(_) => DatatypeTag::U64,
        }
    }

    #[cfg(any(test, feature = "debug"))]
    pub(crate) fn len(&self) -> usize {
        match self {
            Payload::F32(v) => v.len(),
            Payload::F64(v) => v.len(),
            Payload::I32(v) => v.len(),
            Payload::I64(v) => v.len(),
            Payload::U8(v) => v.len(),
            Payload::U32(v) => v.len(),
            Payload::U64(v) => v.len(),
        }
    }
}

/// Trait for types that can be used in worker communication operations.
///
/// This is a **sealed trait**: it cannot be implemented outside this crate.
/// Supported types: [`f32`], [`f64`], [`i32`], [`i64`], [`u8`], [`u32`], [`u64`].
///
/// # Example
///
/// ```
/// use ferrovis::{Datatype, ReduceOp};
///
/// assert_eq!(f64::identity(ReduceOp::Max), f64::NEG_INFINITY);
/// assert_eq!(i32::reduce(ReduceOp::Sum, 2, 3), 5);
/// ```
pub trait Datatype:
    sealed::Sealed + Copy + Default + PartialOrd + Send + std::fmt::Debug + 'static
{
    /// The tag stamped on every message carrying this type.
    const TAG: DatatypeTag;

    /// Neutral element of `op`: `reduce(op, identity(op), x) == x`.
    fn identity(op: ReduceOp) -> Self;

    /// Fold two values with `op`. Integer sums and products wrap.
    fn reduce(op: ReduceOp, a: Self, b: Self) -> Self;
}

macro_rules! impl_datatype {
    (float $ty:ty, $tag:expr, $variant:ident) => {
        impl_datatype!(@payload $ty, $variant);
        impl Datatype for $ty {
            const TAG: DatatypeTag = $tag;

            fn identity(op: ReduceOp) -> Self {
                match op {
                    ReduceOp::Sum => 0.0,
                    ReduceOp::Prod => 1.0,
                    ReduceOp::Max => <$ty>::NEG_INFINITY,
                    ReduceOp::Min => <$ty>::INFINITY,
                }
            }

            fn reduce(op: ReduceOp, a: Self, b: Self) -> Self {
                match op {
                    ReduceOp::Sum => a + b,
                    ReduceOp::Prod => a * b,
                    ReduceOp::Max => a.max(b),
                    ReduceOp::Min => a.min(b),
                }
            }
        }
    };
    (int $ty:ty, $tag:expr, $variant:ident) => {
        impl_datatype!(@payload $ty, $variant);
        impl Datatype for $ty {
            const TAG: DatatypeTag = $tag;

            fn identity(op: ReduceOp) -> Self {
                match op {
                    ReduceOp::Sum => 0,
                    ReduceOp::Prod => 1,
                    ReduceOp::Max => <$ty>::MIN,
                    ReduceOp::Min => <$ty>::MAX,
                }
            }

            fn reduce(op: ReduceOp, a: Self, b: Self) -> Self {
                match op {
                    ReduceOp::Sum => a.wrapping_add(b),
                    ReduceOp::Prod => a.wrapping_mul(b),
                    ReduceOp::Max => a.max(b),
                    ReduceOp::Min => a.min(b),
                }
            }
        }
    };
    (@payload $ty:ty, $variant:ident) => {
        impl sealed::Sealed for $ty {
            fn pack(data: &[Self]) -> Payload {
                Payload::$variant(data.to_vec())
            }

            fn unpack(payload: &Payload) -> Option<&[Self]> {
                match payload {
                    Payload::$variant(v) => Some(v.as_slice()),
                    _ => None,
                }
            }
        }
    };
}

impl_datatype!(float f32, DatatypeTag::F32, F32);
impl_datatype!(float f64, DatatypeTag::F64, F64);
impl_datatype!(int i32, DatatypeTag::I32, I32);
impl_datatype!(int i64, DatatypeTag::I64, I64);
impl_datatype!(int u8, DatatypeTag::U8, U8);
impl_datatype!(int u32, DatatypeTag::U32, U32);
impl_datatype!(int u64, DatatypeTag::U64, U64);

pub(crate) fn pack<T: Datatype>(data: &[T]) -> Payload {
    <T as sealed::Sealed>::pack(data)
}

pub(crate) fn unpack<T: Datatype>(payload: &Payload) -> Option<&[T]> {
    <T as sealed::Sealed>::unpack(payload)
}
