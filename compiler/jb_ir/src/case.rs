//! Switch cases.

use crate::{BuilderId, CaseId};

/// `(value, target, falls through)`. Owned by the switch that lists it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Case {
    pub(crate) id: CaseId,
    pub(crate) value: i64,
    pub(crate) target: BuilderId,
    pub(crate) falls_through: bool,
}

impl Case {
    #[inline]
    pub fn id(&self) -> CaseId {
        self.id
    }

    /// Selector value that enters this case.
    #[inline]
    pub fn value(&self) -> i64 {
        self.value
    }

    #[inline]
    pub fn target(&self) -> BuilderId {
        self.target
    }

    /// Control continues into the next case after `target` finishes.
    #[inline]
    pub fn falls_through(&self) -> bool {
        self.falls_through
    }
}
