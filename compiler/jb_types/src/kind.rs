//! Type records.
//!
//! A [`Type`] is immutable once its dictionary entry is closed. A "changed"
//! type is a brand-new registration; the old id is removed afterwards.

use std::fmt;

use crate::{TypeFlags, TypeId};

/// The fixed primitive kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    NoType,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Address,
}

impl PrimitiveKind {
    /// All primitives in id order.
    pub const ALL: [PrimitiveKind; 8] = [
        PrimitiveKind::NoType,
        PrimitiveKind::Int8,
        PrimitiveKind::Int16,
        PrimitiveKind::Int32,
        PrimitiveKind::Int64,
        PrimitiveKind::Float32,
        PrimitiveKind::Float64,
        PrimitiveKind::Address,
    ];

    /// The fixed id of this primitive.
    pub const fn id(self) -> TypeId {
        match self {
            PrimitiveKind::NoType => TypeId::NO_TYPE,
            PrimitiveKind::Int8 => TypeId::INT8,
            PrimitiveKind::Int16 => TypeId::INT16,
            PrimitiveKind::Int32 => TypeId::INT32,
            PrimitiveKind::Int64 => TypeId::INT64,
            PrimitiveKind::Float32 => TypeId::FLOAT32,
            PrimitiveKind::Float64 => TypeId::FLOAT64,
            PrimitiveKind::Address => TypeId::ADDRESS,
        }
    }

    /// Size in bits.
    pub const fn size_bits(self) -> u64 {
        match self {
            PrimitiveKind::NoType => 0,
            PrimitiveKind::Int8 => 8,
            PrimitiveKind::Int16 => 16,
            PrimitiveKind::Int32 | PrimitiveKind::Float32 => 32,
            PrimitiveKind::Int64 | PrimitiveKind::Float64 | PrimitiveKind::Address => 64,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            PrimitiveKind::NoType => "NoType",
            PrimitiveKind::Int8 => "Int8",
            PrimitiveKind::Int16 => "Int16",
            PrimitiveKind::Int32 => "Int32",
            PrimitiveKind::Int64 => "Int64",
            PrimitiveKind::Float32 => "Float32",
            PrimitiveKind::Float64 => "Float64",
            PrimitiveKind::Address => "Address",
        }
    }
}

/// Structural kind of a type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Primitive(PrimitiveKind),
    /// Pointer to values of `base`.
    Pointer { base: TypeId },
    /// Struct with fields in declaration order (each a `Field` type).
    Struct { fields: Vec<TypeId> },
    /// Union with overlapping fields (each a `Field` type).
    Union { fields: Vec<TypeId> },
    /// A named member of a composite.
    Field {
        owner: TypeId,
        field_type: TypeId,
        /// Offset in bits from the start of the owner.
        offset: u64,
    },
    /// Function signature.
    Function {
        return_type: TypeId,
        params: Vec<TypeId>,
    },
    /// Extension-defined type; always carries a layout.
    Dynamic,
}

impl TypeKind {
    /// Short category name, used in diagnostics.
    pub fn category(&self) -> &'static str {
        match self {
            TypeKind::Primitive(_) => "primitive",
            TypeKind::Pointer { .. } => "pointer",
            TypeKind::Struct { .. } => "struct",
            TypeKind::Union { .. } => "union",
            TypeKind::Field { .. } => "field",
            TypeKind::Function { .. } => "function",
            TypeKind::Dynamic => "dynamic",
        }
    }
}

/// A registered type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Type {
    pub(crate) id: TypeId,
    pub(crate) name: String,
    /// Size in bits.
    pub(crate) size: u64,
    pub(crate) kind: TypeKind,
    pub(crate) layout: Option<TypeId>,
    pub(crate) flags: TypeFlags,
}

impl Type {
    pub(crate) fn new(
        id: TypeId,
        name: String,
        size: u64,
        kind: TypeKind,
        layout: Option<TypeId>,
    ) -> Self {
        let flags = TypeFlags::compute(&kind, layout.is_some());
        Type {
            id,
            name,
            size,
            kind,
            layout,
            flags,
        }
    }

    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bits.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    /// Layout struct, if any. Always present for dynamic types.
    #[inline]
    pub fn layout(&self) -> Option<TypeId> {
        self.layout
    }

    #[inline]
    pub fn flags(&self) -> TypeFlags {
        self.flags
    }

    /// Base type of a pointer.
    pub fn pointer_base(&self) -> Option<TypeId> {
        match self.kind {
            TypeKind::Pointer { base } => Some(base),
            _ => None,
        }
    }

    /// Fields of a struct or union, empty for everything else.
    pub fn fields(&self) -> &[TypeId] {
        match &self.kind {
            TypeKind::Struct { fields } | TypeKind::Union { fields } => fields,
            _ => &[],
        }
    }

    /// `(owner, field_type, offset)` of a field.
    pub fn field_info(&self) -> Option<(TypeId, TypeId, u64)> {
        match self.kind {
            TypeKind::Field {
                owner,
                field_type,
                offset,
            } => Some((owner, field_type, offset)),
            _ => None,
        }
    }

    /// `(return_type, params)` of a function type.
    pub fn signature(&self) -> Option<(TypeId, &[TypeId])> {
        match &self.kind {
            TypeKind::Function {
                return_type,
                params,
            } => Some((*return_type, params)),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.name)
    }
}
