//! Constants, arithmetic, comparisons and conversions.

use jb_types::TypeId;

use crate::literal::int_bytes;
use crate::{BuilderId, BuiltinOp, Compilation, ConstructionError, LiteralId, OpInput, ValueId};

macro_rules! binary_ops {
    ($($(#[$meta:meta])* $method:ident => $op:ident;)*) => {
        $(
            $(#[$meta])*
            pub fn $method(
                &mut self,
                b: BuilderId,
                left: ValueId,
                right: ValueId,
            ) -> Result<ValueId, ConstructionError> {
                self.append_value(b, BuiltinOp::$op, OpInput::new().operands([left, right]))
            }
        )*
    };
}

impl Compilation<'_> {
    /// Load an interned literal.
    pub fn const_literal(&mut self, b: BuilderId, lit: LiteralId) -> Result<ValueId, ConstructionError> {
        self.append_value(b, BuiltinOp::Const, OpInput::new().literal(lit))
    }

    /// An integer constant of type `ty`, truncated to its size.
    pub fn const_int(&mut self, b: BuilderId, ty: TypeId, value: i64) -> Result<ValueId, ConstructionError> {
        let size = self.types().dict().size_of(ty);
        let lit = self.register_literal(ty, &int_bytes(value, size))?;
        self.const_literal(b, lit)
    }

    pub fn const_i32(&mut self, b: BuilderId, value: i32) -> Result<ValueId, ConstructionError> {
        self.const_int(b, TypeId::INT32, i64::from(value))
    }

    pub fn const_i64(&mut self, b: BuilderId, value: i64) -> Result<ValueId, ConstructionError> {
        self.const_int(b, TypeId::INT64, value)
    }

    pub fn const_f32(&mut self, b: BuilderId, value: f32) -> Result<ValueId, ConstructionError> {
        let lit = self.register_literal(TypeId::FLOAT32, &value.to_le_bytes())?;
        self.const_literal(b, lit)
    }

    pub fn const_f64(&mut self, b: BuilderId, value: f64) -> Result<ValueId, ConstructionError> {
        let lit = self.register_literal(TypeId::FLOAT64, &value.to_le_bytes())?;
        self.const_literal(b, lit)
    }

    binary_ops! {
        add => Add;
        sub => Sub;
        mul => Mul;
        div => Div;
        /// Bitwise and; integers only.
        and => And;
        or => Or;
        xor => Xor;
        equal => Equal;
        not_equal => NotEqual;
        less_than => LessThan;
        less_or_equal => LessOrEqual;
        greater_than => GreaterThan;
        greater_or_equal => GreaterOrEqual;
    }

    pub fn negate(&mut self, b: BuilderId, value: ValueId) -> Result<ValueId, ConstructionError> {
        self.append_value(b, BuiltinOp::Negate, OpInput::new().operand(value))
    }

    /// Convert a numeric value to another numeric type.
    pub fn convert_to(
        &mut self,
        b: BuilderId,
        ty: TypeId,
        value: ValueId,
    ) -> Result<ValueId, ConstructionError> {
        self.append_value(b, BuiltinOp::ConvertTo, OpInput::new().ty(ty).operand(value))
    }
}
