//! Extension-defined operations.

use crate::{ActionId, BuilderId, Compilation, ConstructionError, OpInput, OperationId};

impl Compilation<'_> {
    /// Append an operation of a registered dynamic action. Slot counts come
    /// from the action's declared shape.
    pub fn append_dynamic(
        &mut self,
        b: BuilderId,
        action: ActionId,
        input: OpInput,
    ) -> Result<OperationId, ConstructionError> {
        if action.is_builtin() || self.compiler().actions().dynamic(action).is_none() {
            return Err(ConstructionError::UnknownAction(action));
        }
        self.create_operation(b, action, input)
    }
}
