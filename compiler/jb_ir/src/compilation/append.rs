//! Per-action construction API.
//!
//! One method per built-in action, each a thin wrapper that assembles an
//! [`OpInput`] and calls [`Compilation::create_operation`]. Value-producing
//! actions return the result value; the rest return the operation.

mod arith;
mod control;
mod dynamic;
mod memory;

use crate::{BuilderId, BuiltinOp, Compilation, ConstructionError, OpInput, OperationId, ValueId};

pub use control::LoopBuilders;

impl Compilation<'_> {
    /// Append a built-in operation.
    fn append(
        &mut self,
        b: BuilderId,
        op: BuiltinOp,
        input: OpInput,
    ) -> Result<OperationId, ConstructionError> {
        self.create_operation(b, op.action(), input)
    }

    /// Append a built-in operation with exactly one result.
    fn append_value(
        &mut self,
        b: BuilderId,
        op: BuiltinOp,
        input: OpInput,
    ) -> Result<ValueId, ConstructionError> {
        let id = self.append(b, op, input)?;
        self.first_result(id)
    }

    fn first_result(&self, op: OperationId) -> Result<ValueId, ConstructionError> {
        self.operation(op)
            .result(0)
            .ok_or_else(|| ConstructionError::SlotCount {
                action: self.action_name(self.operation(op).action()).to_owned(),
                slot: "result",
                expected: "1".to_owned(),
                actual: 0,
            })
    }
}
