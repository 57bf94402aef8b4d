//! Type registration errors.

use crate::TypeId;

/// Error raised by a [`TypeDictionary`](crate::TypeDictionary) operation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    /// The id was never registered, or has been removed.
    #[error("unknown type {0}")]
    UnknownType(TypeId),

    /// A structural operation was applied to a type of the wrong kind.
    #[error("type {ty} (`{name}`) is a {found}, expected a {expected}")]
    WrongKind {
        ty: TypeId,
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// `add_field` or `close` on a composite that is already closed.
    #[error("composite {0} is already closed")]
    AlreadyClosed(TypeId),

    /// The composite is still open (fields may be missing).
    #[error("composite {0} is still open")]
    StillOpen(TypeId),

    /// Two fields of one composite share a name.
    #[error("composite {owner} already has a field named `{field}`")]
    DuplicateField { owner: TypeId, field: String },

    /// A composite would contain itself without a pointer in between.
    #[error("type {0} would contain itself without a pointer indirection")]
    SelfContaining(TypeId),

    /// A dynamic type was declared with a layout that is not a closed struct.
    #[error("layout {layout} of `{name}` must be a closed struct")]
    InvalidLayout { name: String, layout: TypeId },

    /// No field with the given name.
    #[error("type {owner} has no field named `{field}`")]
    NoSuchField { owner: TypeId, field: String },
}
