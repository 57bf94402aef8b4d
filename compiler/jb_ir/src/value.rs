//! SSA-style values.

use jb_types::TypeId;

use crate::{OperationId, ValueId};

/// The result of one operation. Immutable after creation; consumers hold
/// its id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Value {
    pub(crate) id: ValueId,
    pub(crate) ty: TypeId,
    pub(crate) producer: OperationId,
}

impl Value {
    #[inline]
    pub fn id(&self) -> ValueId {
        self.id
    }

    #[inline]
    pub fn ty(&self) -> TypeId {
        self.ty
    }

    /// The operation that has this value among its results.
    #[inline]
    pub fn producer(&self) -> OperationId {
        self.producer
    }
}
