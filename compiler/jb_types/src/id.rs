//! Type identifier handle.
//!
//! `TypeId` is the only way the rest of the IR refers to a type. Types live
//! in a [`TypeDictionary`](crate::TypeDictionary) and are compared by id.
//!
//! # Design
//!
//! - 32-bit ids, assigned by a per-dictionary monotonic counter, never reused
//! - Primitive types have fixed ids (0-7) in every dictionary
//! - A linked dictionary continues its parent's counter, so ids copied from
//!   the parent keep their meaning

use std::fmt;

/// A 32-bit type identifier, unique within its owning dictionary.
#[derive(Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    // === Primitive Types (ids 0-7) ===
    // Registered by every fresh dictionary, in this order.

    /// The absence of a value (result type of `Store`, `Return`, ...).
    pub const NO_TYPE: Self = Self(0);
    /// 8-bit integer.
    pub const INT8: Self = Self(1);
    /// 16-bit integer.
    pub const INT16: Self = Self(2);
    /// 32-bit integer.
    pub const INT32: Self = Self(3);
    /// 64-bit integer.
    pub const INT64: Self = Self(4);
    /// 32-bit IEEE float.
    pub const FLOAT32: Self = Self(5);
    /// 64-bit IEEE float.
    pub const FLOAT64: Self = Self(6);
    /// Untyped machine address.
    pub const ADDRESS: Self = Self(7);

    /// First id handed out for non-primitive types.
    pub const FIRST_USER: u32 = 8;

    /// Number of pre-registered primitive types.
    pub const PRIMITIVE_COUNT: u32 = 8;

    /// Create an id from a raw value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw `u32` value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Get the id as `usize` (for indexing into `Vec`s).
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Check if this is one of the fixed primitive ids.
    #[inline]
    pub const fn is_primitive(self) -> bool {
        self.0 < Self::FIRST_USER
    }

    /// Check if this is `NO_TYPE`.
    #[inline]
    pub const fn is_no_type(self) -> bool {
        self.0 == Self::NO_TYPE.0
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}
