//! Behavior records for extension-defined actions.

use std::fmt;
use std::rc::Rc;

use jb_types::TypeId;
use smallvec::SmallVec;

use crate::transform::{OperationCloner, OperationReplacer};
use crate::{
    ActionId, BuilderId, Compilation, ConstructionError, Operation, OperationId, SlotShape,
    TransformError, TypeGraph,
};

/// Result types of an operation given `types ++ operand types`; `None` when
/// the combination is invalid.
pub type TypingFn = Rc<dyn Fn(&TypeGraph<'_>, ActionId, &[TypeId]) -> Option<SmallVec<[TypeId; 1]>>>;

/// Re-create an operation in `parent` from the cloner's slots.
pub type CloneFn =
    Rc<dyn Fn(&mut Compilation<'_>, BuilderId, &OperationCloner) -> Result<OperationId, ConstructionError>>;

/// One-line rendering of an operation.
pub type PrintFn = Rc<dyn Fn(&Compilation<'_>, &Operation) -> String>;

/// Lower an operation into the scratch builder. Reads the (possibly
/// exploded) slots from the replacer and records result mappings on it.
/// Returns `false` to decline.
pub type ExpandFn = Rc<
    dyn Fn(&mut Compilation<'_>, &mut OperationReplacer, BuilderId) -> Result<bool, TransformError>,
>;

/// Slot shape plus closures of one dynamic action.
#[derive(Clone)]
pub struct DynamicOpSpec {
    name: String,
    shape: SlotShape,
    typing: Option<TypingFn>,
    clone: Option<CloneFn>,
    print: Option<PrintFn>,
    expand: Option<ExpandFn>,
}

impl DynamicOpSpec {
    pub fn new(name: impl Into<String>, shape: SlotShape) -> Self {
        DynamicOpSpec {
            name: name.into(),
            shape,
            typing: None,
            clone: None,
            print: None,
            expand: None,
        }
    }

    #[must_use]
    pub fn with_typing(
        mut self,
        f: impl Fn(&TypeGraph<'_>, ActionId, &[TypeId]) -> Option<SmallVec<[TypeId; 1]>> + 'static,
    ) -> Self {
        self.typing = Some(Rc::new(f));
        self
    }

    #[must_use]
    pub fn with_clone(
        mut self,
        f: impl Fn(&mut Compilation<'_>, BuilderId, &OperationCloner) -> Result<OperationId, ConstructionError>
            + 'static,
    ) -> Self {
        self.clone = Some(Rc::new(f));
        self
    }

    #[must_use]
    pub fn with_print(mut self, f: impl Fn(&Compilation<'_>, &Operation) -> String + 'static) -> Self {
        self.print = Some(Rc::new(f));
        self
    }

    #[must_use]
    pub fn with_expand(
        mut self,
        f: impl Fn(&mut Compilation<'_>, &mut OperationReplacer, BuilderId) -> Result<bool, TransformError>
            + 'static,
    ) -> Self {
        self.expand = Some(Rc::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> SlotShape {
        self.shape
    }

    pub fn typing(&self) -> Option<&TypingFn> {
        self.typing.as_ref()
    }

    pub fn cloner(&self) -> Option<&CloneFn> {
        self.clone.as_ref()
    }

    pub fn printer(&self) -> Option<&PrintFn> {
        self.print.as_ref()
    }

    pub fn expander(&self) -> Option<&ExpandFn> {
        self.expand.as_ref()
    }
}

impl fmt::Debug for DynamicOpSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamicOpSpec")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .field("typing", &self.typing.is_some())
            .field("clone", &self.clone.is_some())
            .field("print", &self.print.is_some())
            .field("expand", &self.expand.is_some())
            .finish()
    }
}
