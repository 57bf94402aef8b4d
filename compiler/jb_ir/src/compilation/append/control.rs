//! Calls, returns and structured control flow.

use crate::{
    BuilderId, BuiltinOp, CaseId, Compilation, ConstructionError, OpInput, OperationId, SymbolId,
    ValueId,
};

/// The builders a `ForLoopUp` binds, in slot order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopBuilders {
    pub body: BuilderId,
    /// Placed after the loop; `Goto` here leaves it.
    pub break_to: BuilderId,
    /// Placed after the body; `Goto` here starts the next iteration.
    pub continue_to: BuilderId,
}

macro_rules! if_cmp_ops {
    ($($method:ident => $op:ident;)*) => {
        $(
            pub fn $method(
                &mut self,
                b: BuilderId,
                left: ValueId,
                right: ValueId,
                target: BuilderId,
            ) -> Result<OperationId, ConstructionError> {
                self.append(
                    b,
                    BuiltinOp::$op,
                    OpInput::new().operands([left, right]).builder(target),
                )
            }
        )*
    };
}

impl Compilation<'_> {
    /// Call a function symbol. Returns the result value unless the function
    /// returns `NO_TYPE`.
    pub fn call(
        &mut self,
        b: BuilderId,
        function: SymbolId,
        args: &[ValueId],
    ) -> Result<Option<ValueId>, ConstructionError> {
        let op = self.append(
            b,
            BuiltinOp::Call,
            OpInput::new().symbol(function).operands(args.iter().copied()),
        )?;
        Ok(self.operation(op).result(0))
    }

    pub fn return_value(&mut self, b: BuilderId, value: ValueId) -> Result<OperationId, ConstructionError> {
        self.append(b, BuiltinOp::Return, OpInput::new().operand(value))
    }

    pub fn return_void(&mut self, b: BuilderId) -> Result<OperationId, ConstructionError> {
        self.append(b, BuiltinOp::Return, OpInput::new())
    }

    /// Enter `target` here; control continues after it.
    pub fn append_builder(&mut self, b: BuilderId, target: BuilderId) -> Result<OperationId, ConstructionError> {
        self.append(b, BuiltinOp::AppendBuilder, OpInput::new().builder(target))
    }

    /// Place `target` here as a merge point other code may `goto`.
    pub fn label(&mut self, b: BuilderId, target: BuilderId) -> Result<OperationId, ConstructionError> {
        self.append(b, BuiltinOp::Label, OpInput::new().builder(target))
    }

    pub fn goto(&mut self, b: BuilderId, target: BuilderId) -> Result<OperationId, ConstructionError> {
        self.append(b, BuiltinOp::Goto, OpInput::new().builder(target))
    }

    if_cmp_ops! {
        if_cmp_equal => IfCmpEqual;
        if_cmp_not_equal => IfCmpNotEqual;
        if_cmp_less_than => IfCmpLessThan;
        if_cmp_less_or_equal => IfCmpLessOrEqual;
        if_cmp_greater_than => IfCmpGreaterThan;
        if_cmp_greater_or_equal => IfCmpGreaterOrEqual;
    }

    pub fn if_cmp_equal_zero(
        &mut self,
        b: BuilderId,
        value: ValueId,
        target: BuilderId,
    ) -> Result<OperationId, ConstructionError> {
        self.append(b, BuiltinOp::IfCmpEqualZero, OpInput::new().operand(value).builder(target))
    }

    pub fn if_cmp_not_equal_zero(
        &mut self,
        b: BuilderId,
        value: ValueId,
        target: BuilderId,
    ) -> Result<OperationId, ConstructionError> {
        self.append(b, BuiltinOp::IfCmpNotEqualZero, OpInput::new().operand(value).builder(target))
    }

    /// `then_path` runs when `selector` is non-zero, `else_path` otherwise.
    pub fn if_then_else(
        &mut self,
        b: BuilderId,
        selector: ValueId,
        then_path: BuilderId,
        else_path: Option<BuilderId>,
    ) -> Result<OperationId, ConstructionError> {
        let mut input = OpInput::new().operand(selector).builder(then_path);
        if let Some(e) = else_path {
            input = input.builder(e);
        }
        self.append(b, BuiltinOp::IfThenElse, input)
    }

    /// Counted loop: `var` runs from `initial` while below `last`, stepping
    /// by `bump`.
    pub fn for_loop_up(
        &mut self,
        b: BuilderId,
        var: SymbolId,
        initial: ValueId,
        last: ValueId,
        bump: ValueId,
        loop_builders: LoopBuilders,
    ) -> Result<OperationId, ConstructionError> {
        let LoopBuilders {
            body,
            break_to,
            continue_to,
        } = loop_builders;
        self.append(
            b,
            BuiltinOp::ForLoopUp,
            OpInput::new()
                .symbol(var)
                .operands([initial, last, bump])
                .builder(body)
                .builder(break_to)
                .builder(continue_to),
        )
    }

    /// Three fresh children of `b` for a `ForLoopUp`.
    pub fn loop_builders(&mut self, b: BuilderId) -> Result<LoopBuilders, ConstructionError> {
        Ok(LoopBuilders {
            body: self.create_child(b)?,
            break_to: self.create_child(b)?,
            continue_to: self.create_child(b)?,
        })
    }

    pub fn switch(
        &mut self,
        b: BuilderId,
        selector: ValueId,
        default: BuilderId,
        cases: &[CaseId],
    ) -> Result<OperationId, ConstructionError> {
        let mut input = OpInput::new().operand(selector).builder(default);
        for &c in cases {
            input = input.case(c);
        }
        self.append(b, BuiltinOp::Switch, input)
    }
}
