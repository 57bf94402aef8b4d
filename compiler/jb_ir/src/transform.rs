//! Graph rewriting.
//!
//! - [`Mapper`], [`OperationCloner`], [`OperationReplacer`]: re-instantiate
//!   any operation with substituted (possibly one-to-many) slots through the
//!   uniform slot surface, without per-kind code.
//! - [`Transformer`] / [`Transformation`]: the worklist driver and the
//!   per-operation rewrite hook.
//! - [`LowerStructured`]: applies operation kinds' own expanders.
//! - [`TypeReplacer`]: explodes or replaces types across a whole
//!   compilation.

mod cloner;
mod expand;
mod mapper;
mod replacer;
mod transformer;
mod type_replacer;

pub use cloner::OperationCloner;
pub use expand::LowerStructured;
pub use mapper::{Mapper, MapperEntry};
pub use replacer::OperationReplacer;
pub use transformer::{TransformStats, Transformation, Transformer};
pub use type_replacer::TypeReplacer;
