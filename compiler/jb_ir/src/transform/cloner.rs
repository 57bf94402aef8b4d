//! Re-instantiating an operation with substituted slots.

use jb_types::TypeId;
use smallvec::SmallVec;

use crate::{
    ActionId, BuilderId, CaseId, Compilation, ConstructionError, LiteralId, OpInput, OperationId,
    SymbolId, ValueId,
};

/// Mutable snapshot of an operation's slots.
#[derive(Clone, Debug)]
pub struct OperationCloner {
    original: OperationId,
    action: ActionId,
    input: OpInput,
    result_types: SmallVec<[TypeId; 1]>,
    pin_results: bool,
}

impl OperationCloner {
    pub fn new(comp: &Compilation<'_>, op: OperationId) -> Result<Self, ConstructionError> {
        let operation = comp.try_operation(op)?;
        Ok(OperationCloner {
            original: op,
            action: operation.action(),
            input: OpInput::from_slots(operation.slots()),
            result_types: operation
                .results()
                .iter()
                .map(|&r| comp.value_type(r))
                .collect(),
            pin_results: false,
        })
    }

    /// The operation this snapshot was taken from.
    pub fn original(&self) -> OperationId {
        self.original
    }

    pub fn action(&self) -> ActionId {
        self.action
    }

    /// Current slot contents.
    pub fn input(&self) -> &OpInput {
        &self.input
    }

    /// Require result `i` of the clone to have type `ty`.
    pub fn change_result(&mut self, i: usize, ty: TypeId) {
        if let Some(slot) = self.result_types.get_mut(i) {
            *slot = ty;
            self.pin_results = true;
        }
    }

    pub fn change_operand(&mut self, i: usize, v: ValueId) {
        if let Some(slot) = self.input.operands.get_mut(i) {
            *slot = v;
        }
    }

    /// Replace the whole operand list (for variadic kinds).
    pub fn set_operands(&mut self, operands: impl IntoIterator<Item = ValueId>) {
        self.input.operands = operands.into_iter().collect();
    }

    pub fn change_type(&mut self, i: usize, t: TypeId) {
        if let Some(slot) = self.input.types.get_mut(i) {
            *slot = t;
        }
    }

    pub fn change_literal(&mut self, i: usize, l: LiteralId) {
        if let Some(slot) = self.input.literals.get_mut(i) {
            *slot = l;
        }
    }

    pub fn change_symbol(&mut self, i: usize, s: SymbolId) {
        if let Some(slot) = self.input.symbols.get_mut(i) {
            *slot = s;
        }
    }

    pub fn change_builder(&mut self, i: usize, b: BuilderId) {
        if let Some(slot) = self.input.builders.get_mut(i) {
            *slot = b;
        }
    }

    pub fn change_case(&mut self, i: usize, c: CaseId) {
        if let Some(slot) = self.input.cases.get_mut(i) {
            *slot = c;
        }
    }

    /// Slot input for a fresh operation, with pinned result types if any
    /// were changed.
    pub fn to_input(&self) -> OpInput {
        let mut input = self.input.clone();
        if self.pin_results {
            input.result_types = Some(self.result_types.clone());
        }
        input
    }

    /// Append a copy with the current slots to `parent`. Dynamic kinds with
    /// a clone closure build the copy themselves.
    pub fn clone_into(
        &self,
        comp: &mut Compilation<'_>,
        parent: BuilderId,
    ) -> Result<OperationId, ConstructionError> {
        let custom = comp
            .compiler()
            .actions()
            .dynamic(self.action)
            .and_then(|spec| spec.cloner());
        match custom {
            Some(clone) => clone(comp, parent, self),
            None => comp.create_operation(parent, self.action, self.to_input()),
        }
    }
}
