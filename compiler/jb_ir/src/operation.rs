//! Operations: the IR's computation nodes.
//!
//! Every operation, built-in or dynamic, has the same seven slot arrays.
//! Most kinds use only a few of them, but the uniform reflective surface
//! (`num_operands`/`operand(i)` and friends) is what lets the cloner,
//! replacer and transformer work without per-kind code.

use jb_types::TypeId;
use smallvec::SmallVec;

use crate::{
    ActionId, BuilderId, BuiltinOp, CaseId, LiteralId, LocationId, OperationId, SymbolId, ValueId,
};

/// Slot arrays of an operation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct OpSlots {
    pub results: SmallVec<[ValueId; 1]>,
    pub operands: SmallVec<[ValueId; 3]>,
    pub types: SmallVec<[TypeId; 1]>,
    pub literals: SmallVec<[LiteralId; 1]>,
    pub symbols: SmallVec<[SymbolId; 1]>,
    pub builders: SmallVec<[BuilderId; 2]>,
    pub cases: SmallVec<[CaseId; 2]>,
}

/// Inputs of a new operation: every slot except results, which are
/// created from the derived result types.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OpInput {
    pub operands: SmallVec<[ValueId; 3]>,
    pub types: SmallVec<[TypeId; 1]>,
    pub literals: SmallVec<[LiteralId; 1]>,
    pub symbols: SmallVec<[SymbolId; 1]>,
    pub builders: SmallVec<[BuilderId; 2]>,
    pub cases: SmallVec<[CaseId; 2]>,
    /// Expected result types. When set, derived types must match.
    pub result_types: Option<SmallVec<[TypeId; 1]>>,
}

impl OpInput {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn operand(mut self, v: ValueId) -> Self {
        self.operands.push(v);
        self
    }

    #[must_use]
    pub fn operands(mut self, vs: impl IntoIterator<Item = ValueId>) -> Self {
        self.operands.extend(vs);
        self
    }

    #[must_use]
    pub fn ty(mut self, t: TypeId) -> Self {
        self.types.push(t);
        self
    }

    #[must_use]
    pub fn literal(mut self, l: LiteralId) -> Self {
        self.literals.push(l);
        self
    }

    #[must_use]
    pub fn symbol(mut self, s: SymbolId) -> Self {
        self.symbols.push(s);
        self
    }

    #[must_use]
    pub fn builder(mut self, b: BuilderId) -> Self {
        self.builders.push(b);
        self
    }

    #[must_use]
    pub fn case(mut self, c: CaseId) -> Self {
        self.cases.push(c);
        self
    }

    /// Take all input slots of an existing operation.
    pub fn from_slots(slots: &OpSlots) -> Self {
        OpInput {
            operands: slots.operands.clone(),
            types: slots.types.clone(),
            literals: slots.literals.clone(),
            symbols: slots.symbols.clone(),
            builders: slots.builders.clone(),
            cases: slots.cases.clone(),
            result_types: None,
        }
    }
}

/// One IR instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operation {
    pub(crate) id: OperationId,
    pub(crate) action: ActionId,
    /// `None` once the operation was replaced and detached.
    pub(crate) parent: Option<BuilderId>,
    pub(crate) location: LocationId,
    pub(crate) slots: OpSlots,
}

impl Operation {
    #[inline]
    pub fn id(&self) -> OperationId {
        self.id
    }

    #[inline]
    pub fn action(&self) -> ActionId {
        self.action
    }

    /// The built-in kind, or `None` for a dynamic operation.
    #[inline]
    pub fn builtin(&self) -> Option<BuiltinOp> {
        BuiltinOp::from_action(self.action)
    }

    #[inline]
    pub fn is(&self, op: BuiltinOp) -> bool {
        self.action == op.action()
    }

    pub fn parent(&self) -> Option<BuilderId> {
        self.parent
    }

    pub fn location(&self) -> LocationId {
        self.location
    }

    pub fn slots(&self) -> &OpSlots {
        &self.slots
    }

    // === Reflective slot surface ===

    pub fn num_results(&self) -> usize {
        self.slots.results.len()
    }

    pub fn result(&self, i: usize) -> Option<ValueId> {
        self.slots.results.get(i).copied()
    }

    pub fn results(&self) -> &[ValueId] {
        &self.slots.results
    }

    pub fn num_operands(&self) -> usize {
        self.slots.operands.len()
    }

    pub fn operand(&self, i: usize) -> Option<ValueId> {
        self.slots.operands.get(i).copied()
    }

    pub fn operands(&self) -> &[ValueId] {
        &self.slots.operands
    }

    pub fn num_types(&self) -> usize {
        self.slots.types.len()
    }

    pub fn ty(&self, i: usize) -> Option<TypeId> {
        self.slots.types.get(i).copied()
    }

    pub fn num_literals(&self) -> usize {
        self.slots.literals.len()
    }

    pub fn literal(&self, i: usize) -> Option<LiteralId> {
        self.slots.literals.get(i).copied()
    }

    pub fn num_symbols(&self) -> usize {
        self.slots.symbols.len()
    }

    pub fn symbol(&self, i: usize) -> Option<SymbolId> {
        self.slots.symbols.get(i).copied()
    }

    pub fn num_builders(&self) -> usize {
        self.slots.builders.len()
    }

    pub fn builder(&self, i: usize) -> Option<BuilderId> {
        self.slots.builders.get(i).copied()
    }

    pub fn builders(&self) -> &[BuilderId] {
        &self.slots.builders
    }

    pub fn num_cases(&self) -> usize {
        self.slots.cases.len()
    }

    pub fn case(&self, i: usize) -> Option<CaseId> {
        self.slots.cases.get(i).copied()
    }
}
