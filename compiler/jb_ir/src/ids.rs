//! Id newtypes for IR entities.
//!
//! Every entity (value, symbol, literal, builder, operation, context, case,
//! location, action) lives in an arena owned by a compilation or compiler and
//! is referenced everywhere else by a 32-bit id. Ids are allocated
//! sequentially from 0 and never reused.

use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Create an id from a raw index.
            #[inline]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// Get the raw `u32` value.
            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            /// Get the index as `usize` (for indexing into `Vec`s).
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// SSA-style result handle, produced by exactly one operation.
    ValueId,
    "v"
);
define_id!(
    /// Interned symbol (local, parameter or function).
    SymbolId,
    "s"
);
define_id!(
    /// Interned literal.
    LiteralId,
    "l"
);
define_id!(
    /// Node of the builder forest.
    BuilderId,
    "b"
);
define_id!(
    /// One IR instruction.
    OperationId,
    "op"
);
define_id!(
    /// Lexical scope.
    ContextId,
    "ctx"
);
define_id!(
    /// Switch case.
    CaseId,
    "case"
);
define_id!(
    /// Source location.
    LocationId,
    "loc"
);
define_id!(
    /// Operation kind. Ids below `BuiltinOp::COUNT` are built in; the rest
    /// are dynamic actions registered at run time.
    ActionId,
    "a"
);

impl ActionId {
    /// Check if this action is one of the compiled-in kinds.
    #[inline]
    pub const fn is_builtin(self) -> bool {
        self.0 < crate::BuiltinOp::COUNT
    }
}

/// Next sequential id for an arena of `len` entries.
pub(crate) fn next_raw(len: usize, what: &str) -> u32 {
    u32::try_from(len).unwrap_or_else(|_| panic!("{what} count exceeds u32::MAX"))
}
