//! Extensible JIT intermediate representation.
//!
//! A client builds the IR of one function through [`Compilation`]'s append
//! methods, then hands it to [`Compiler::compile`], which runs
//! [`Transformation`](transform::Transformation)s over the graph, verifies
//! it and walks it with a lowering [`Visitor`].
//!
//! # Structure
//!
//! - **Program graph**: [`Builder`]s (a forest of operation sequences),
//!   [`Operation`]s with uniform slots, single-producer [`Value`]s, plus
//!   [`Symbol`]s, [`Literal`]s, [`Case`]s and [`Context`] scopes. Everything
//!   is referenced by a 32-bit id into an arena.
//! - **Actions**: the closed [`BuiltinOp`] set plus [`DynamicOpSpec`]s that
//!   extensions register at run time.
//! - **Typing**: a [`TypeSystem`] pairs the `jb_types` dictionary with the
//!   [`TypeGraph`] of typing rules that derive result types.
//! - **Rewriting**: [`transform`] holds the mapper/cloner/replacer surface,
//!   the worklist [`Transformer`](transform::Transformer) and the
//!   [`TypeReplacer`](transform::TypeReplacer).
//!
//! # Tracing
//!
//! Events are emitted through `tracing`: `debug` per accepted
//! transformation, `info` for transformations skipped past the configured
//! cutoff, `trace` per appended operation. Call [`init_tracing`] and set
//! `RUST_LOG=jb_ir=debug` to see them.

mod action;
mod builder;
mod case;
mod compilation;
mod compiler;
mod config;
mod context;
mod error;
mod ids;
mod literal;
mod operation;
mod stack;
mod symbol;
mod type_graph;
mod typing;
mod value;
mod verify;
mod visitor;

pub mod transform;

#[cfg(test)]
mod test_helpers;

pub use action::{
    ActionRegistry, Arity, BuilderRole, BuiltinOp, CloneFn, DynamicOpSpec, ExpandFn, OpFlags,
    PrintFn, SlotKind, SlotShape, TypingFn,
};
pub use builder::{Boundness, Builder, Location};
pub use case::Case;
pub use compilation::{Compilation, LoopBuilders};
pub use compiler::{Compiler, Extension, ExtensionFactory};
pub use config::CompilerConfig;
pub use context::Context;
pub use error::{CompilationError, ConstructionError, ReturnCode, TransformError, VerifyError};
pub use ids::{
    ActionId, BuilderId, CaseId, ContextId, LiteralId, LocationId, OperationId, SymbolId, ValueId,
};
pub use literal::{int_bytes, resize_int_bytes, Literal, LiteralBytes, LiteralDictionary};
pub use operation::{OpInput, OpSlots, Operation};
pub use stack::ensure_sufficient_stack;
pub use symbol::{Symbol, SymbolDictionary, SymbolKind};
pub use type_graph::TypeGraph;
pub use typing::TypeSystem;
pub use value::Value;
pub use verify::verify;
pub use visitor::{walk, NullVisitor, Visitor};

pub use jb_types::{PrimitiveKind, Type, TypeDictionary, TypeError, TypeFlags, TypeId, TypeKind};

use std::sync::Once;

/// Compile-time size check.
macro_rules! static_assert_size {
    ($ty:ty, $size:expr) => {
        const _: [(); $size] = [(); ::std::mem::size_of::<$ty>()];
    };
}

// Ids are stored in every slot list; keep them one word or less.
#[cfg(target_pointer_width = "64")]
mod size_asserts {
    use super::{BuilderId, OperationId, ValueId};
    static_assert_size!(ValueId, 4);
    static_assert_size!(BuilderId, 4);
    static_assert_size!(OperationId, 4);
}

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debug output.
///
/// Safe to call multiple times. Enable with `RUST_LOG=jb_ir=debug` or
/// `RUST_LOG=jb_ir=trace`.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
