//! Symbol and memory access.

use jb_types::TypeId;

use crate::literal::int_bytes;
use crate::{
    BuilderId, BuiltinOp, Compilation, ConstructionError, OpInput, OperationId, SymbolId, ValueId,
};

impl Compilation<'_> {
    pub fn load(&mut self, b: BuilderId, sym: SymbolId) -> Result<ValueId, ConstructionError> {
        self.append_value(b, BuiltinOp::Load, OpInput::new().symbol(sym))
    }

    /// Load the symbol `name` resolves to from `b`'s scope.
    pub fn load_named(&mut self, b: BuilderId, name: &str) -> Result<ValueId, ConstructionError> {
        let sym = self
            .lookup_symbol(b, name)
            .ok_or_else(|| ConstructionError::UnknownSymbol(name.to_owned()))?;
        self.load(b, sym)
    }

    pub fn store(
        &mut self,
        b: BuilderId,
        sym: SymbolId,
        value: ValueId,
    ) -> Result<OperationId, ConstructionError> {
        self.append(b, BuiltinOp::Store, OpInput::new().symbol(sym).operand(value))
    }

    /// Store to `name`, defining a local of the value's type in `b`'s
    /// context on first use.
    pub fn store_named(
        &mut self,
        b: BuilderId,
        name: &str,
        value: ValueId,
    ) -> Result<OperationId, ConstructionError> {
        let sym = match self.lookup_symbol(b, name) {
            Some(sym) => sym,
            None => {
                let ty = self.try_value(value)?.ty();
                let ctx = self.try_builder(b)?.context();
                self.define_local_in(ctx, name, ty)?
            }
        };
        self.store(b, sym, value)
    }

    pub fn load_at(&mut self, b: BuilderId, address: ValueId) -> Result<ValueId, ConstructionError> {
        self.append_value(b, BuiltinOp::LoadAt, OpInput::new().operand(address))
    }

    pub fn store_at(
        &mut self,
        b: BuilderId,
        address: ValueId,
        value: ValueId,
    ) -> Result<OperationId, ConstructionError> {
        self.append(b, BuiltinOp::StoreAt, OpInput::new().operands([address, value]))
    }

    /// Address of element `index` of the array starting at `base`.
    pub fn index_at(
        &mut self,
        b: BuilderId,
        base: ValueId,
        index: ValueId,
    ) -> Result<ValueId, ConstructionError> {
        self.append_value(b, BuiltinOp::IndexAt, OpInput::new().operands([base, index]))
    }

    /// Read `field` out of a struct value.
    pub fn load_field(
        &mut self,
        b: BuilderId,
        field: TypeId,
        value: ValueId,
    ) -> Result<ValueId, ConstructionError> {
        self.append_value(b, BuiltinOp::LoadField, OpInput::new().ty(field).operand(value))
    }

    pub fn load_field_at(
        &mut self,
        b: BuilderId,
        field: TypeId,
        address: ValueId,
    ) -> Result<ValueId, ConstructionError> {
        self.append_value(b, BuiltinOp::LoadFieldAt, OpInput::new().ty(field).operand(address))
    }

    pub fn store_field_at(
        &mut self,
        b: BuilderId,
        field: TypeId,
        address: ValueId,
        value: ValueId,
    ) -> Result<OperationId, ConstructionError> {
        self.append(
            b,
            BuiltinOp::StoreFieldAt,
            OpInput::new().ty(field).operands([address, value]),
        )
    }

    /// Stack array of `count` elements; yields a pointer to the first.
    pub fn create_local_array(
        &mut self,
        b: BuilderId,
        element: TypeId,
        count: i32,
    ) -> Result<ValueId, ConstructionError> {
        let lit = self.register_literal(TypeId::INT32, &int_bytes(i64::from(count), 32))?;
        self.append_value(
            b,
            BuiltinOp::CreateLocalArray,
            OpInput::new().ty(element).literal(lit),
        )
    }

    /// Stack struct; yields a pointer to it.
    pub fn create_local_struct(&mut self, b: BuilderId, ty: TypeId) -> Result<ValueId, ConstructionError> {
        self.append_value(b, BuiltinOp::CreateLocalStruct, OpInput::new().ty(ty))
    }
}
