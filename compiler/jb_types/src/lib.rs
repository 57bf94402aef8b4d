//! Type registry for the jbir JIT intermediate representation.
//!
//! This crate provides:
//!
//! - **[`TypeId`]**: the 32-bit handle every IR entity uses to name a type.
//!   Primitives have fixed ids shared by all dictionaries.
//! - **[`Type`] / [`TypeKind`]**: immutable type records: primitive,
//!   pointer, struct, union, field, function and extension-defined
//!   ("dynamic") types.
//! - **[`TypeDictionary`]**: registration, structural composition
//!   (pointer-to, field-of, layout-of), linking and removal.
//!
//! Typing rules (which operation produces which type) live one level up,
//! in `jb_ir::TypeGraph`.

mod dictionary;
mod error;
mod flags;
mod id;
mod kind;

pub use dictionary::TypeDictionary;
pub use error::TypeError;
pub use flags::TypeFlags;
pub use id::TypeId;
pub use kind::{PrimitiveKind, Type, TypeKind};
