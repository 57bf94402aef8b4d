//! Pre-computed type category flags.
//!
//! `TypeFlags` are computed once when a type is registered and never
//! recomputed, so typing-rule registration and the type replacer can
//! classify a type without matching on its kind.

use bitflags::bitflags;

use crate::{PrimitiveKind, TypeKind};

bitflags! {
    /// Category bits for a registered type.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct TypeFlags: u16 {
        /// One of the fixed primitive types.
        const IS_PRIMITIVE = 1 << 0;
        /// Integer primitive (`Int8` .. `Int64`).
        const IS_INTEGER = 1 << 1;
        /// Floating point primitive.
        const IS_FLOATING = 1 << 2;
        /// `Address` or a pointer type.
        const IS_ADDRESS = 1 << 3;
        /// Pointer to a typed base.
        const IS_POINTER = 1 << 4;
        /// Struct or union.
        const IS_COMPOSITE = 1 << 5;
        /// Union (always also `IS_COMPOSITE`).
        const IS_UNION = 1 << 6;
        /// Field of a composite.
        const IS_FIELD = 1 << 7;
        /// Function signature.
        const IS_FUNCTION = 1 << 8;
        /// Extension-defined type.
        const IS_DYNAMIC = 1 << 9;
        /// Carries a layout struct.
        const HAS_LAYOUT = 1 << 10;
        /// Values of this type can be held in a `Value`, loaded and stored.
        const IS_VALUE = 1 << 11;
    }
}

impl TypeFlags {
    /// Compute the flags for a kind.
    pub fn compute(kind: &TypeKind, has_layout: bool) -> Self {
        let mut flags = match kind {
            TypeKind::Primitive(p) => {
                let mut f = Self::IS_PRIMITIVE;
                match p {
                    PrimitiveKind::NoType => return f,
                    PrimitiveKind::Int8
                    | PrimitiveKind::Int16
                    | PrimitiveKind::Int32
                    | PrimitiveKind::Int64 => f |= Self::IS_INTEGER,
                    PrimitiveKind::Float32 | PrimitiveKind::Float64 => f |= Self::IS_FLOATING,
                    PrimitiveKind::Address => f |= Self::IS_ADDRESS,
                }
                f | Self::IS_VALUE
            }
            TypeKind::Pointer { .. } => Self::IS_POINTER | Self::IS_ADDRESS | Self::IS_VALUE,
            TypeKind::Struct { .. } => Self::IS_COMPOSITE | Self::IS_VALUE,
            TypeKind::Union { .. } => Self::IS_COMPOSITE | Self::IS_UNION | Self::IS_VALUE,
            TypeKind::Field { .. } => Self::IS_FIELD,
            TypeKind::Function { .. } => Self::IS_FUNCTION,
            TypeKind::Dynamic => Self::IS_DYNAMIC | Self::IS_VALUE,
        };
        if has_layout {
            flags |= Self::HAS_LAYOUT;
        }
        flags
    }

    /// Numeric primitive (integer or floating point).
    #[inline]
    pub fn is_numeric(self) -> bool {
        self.intersects(Self::IS_INTEGER | Self::IS_FLOATING)
    }
}
