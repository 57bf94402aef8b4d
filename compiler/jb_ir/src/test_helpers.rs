//! Shared fixtures for unit tests.

#![allow(clippy::unwrap_used)]

use jb_types::TypeId;

use crate::{
    BuilderId, BuiltinOp, Compilation, CompilationError, Operation, OperationId, SymbolId,
    TypeSystem, Visitor,
};

/// Handles into the `min(x, y)` fixture.
pub(crate) struct MinFunction {
    pub entry: BuilderId,
    pub then_path: BuilderId,
    pub x: SymbolId,
    pub y: SymbolId,
    pub m: SymbolId,
    pub branch: OperationId,
}

/// ```text
/// m = x
/// if (y < x) { m = y }
/// return m
/// ```
pub(crate) fn build_min(comp: &mut Compilation<'_>) -> MinFunction {
    comp.define_return_type(TypeId::INT32).unwrap();
    let x = comp.define_parameter("x", TypeId::INT32).unwrap();
    let y = comp.define_parameter("y", TypeId::INT32).unwrap();
    let entry = comp.create_root("entry");
    comp.add_entry_point(entry).unwrap();

    let vx = comp.load(entry, x).unwrap();
    comp.store_named(entry, "m", vx).unwrap();
    let m = comp.lookup_symbol(entry, "m").unwrap();

    let then_path = comp.create_child(entry).unwrap();
    let vy = comp.load(entry, y).unwrap();
    let vx = comp.load(entry, x).unwrap();
    let branch = comp.if_cmp_less_than(entry, vy, vx, then_path).unwrap();
    let vy = comp.load(then_path, y).unwrap();
    comp.store(then_path, m, vy).unwrap();

    let vm = comp.load(entry, m).unwrap();
    comp.return_value(entry, vm).unwrap();
    MinFunction {
        entry,
        then_path,
        x,
        y,
        m,
        branch,
    }
}

/// `struct Pair { a: Int32 @ 0, b: Float64 @ 64 }`.
pub(crate) fn pair_type(types: &mut TypeSystem<'_>) -> TypeId {
    types
        .define_struct(
            "Pair",
            128,
            &[("a", TypeId::INT32, 0), ("b", TypeId::FLOAT64, 64)],
        )
        .unwrap()
}

/// Operations attached to `b`, as built-in kinds.
pub(crate) fn kinds_in(comp: &Compilation<'_>, b: BuilderId) -> Vec<Option<BuiltinOp>> {
    comp.builder(b)
        .operations()
        .iter()
        .map(|&op| comp.operation(op).builtin())
        .collect()
}

/// Records every callback as a short event string.
#[derive(Default)]
pub(crate) struct RecordingVisitor {
    pub events: Vec<String>,
}

impl Visitor for RecordingVisitor {
    fn pre_compilation(&mut self, comp: &Compilation<'_>) -> Result<(), CompilationError> {
        self.events.push(format!("pre {}", comp.name()));
        Ok(())
    }

    fn builder_pre_ops(&mut self, _comp: &Compilation<'_>, builder: BuilderId) -> Result<(), CompilationError> {
        self.events.push(format!("enter {builder}"));
        Ok(())
    }

    fn operation(&mut self, comp: &Compilation<'_>, op: &Operation) -> Result<(), CompilationError> {
        self.events.push(comp.action_name(op.action()).to_owned());
        Ok(())
    }

    fn builder_post_ops(&mut self, _comp: &Compilation<'_>, builder: BuilderId) -> Result<(), CompilationError> {
        self.events.push(format!("leave {builder}"));
        Ok(())
    }

    fn post_compilation(&mut self, _comp: &Compilation<'_>) -> Result<(), CompilationError> {
        self.events.push("post".to_owned());
        Ok(())
    }
}
