//! Error types.
//!
//! - [`ConstructionError`]: a malformed append request. Returned to the
//!   caller, who chose to build invalid IR; the graph is left unchanged.
//! - [`TransformError`]: a transformation could not rewrite the graph.
//! - [`VerifyError`]: a structural invariant does not hold.
//! - [`CompilationError`]: the structured failure `compile()` turns into a
//!   [`ReturnCode`].

use std::fmt;

use jb_types::{TypeError, TypeId};

use crate::{ActionId, Boundness, BuilderId, LocationId, OperationId, SymbolId, ValueId};

/// Malformed operation or signature request.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConstructionError {
    /// No typing rule matches the operand types.
    #[error("{action}: no typing rule for {slots} of type ({})", actual.join(", "))]
    InvalidOperandTypes {
        action: String,
        slots: String,
        actual: Vec<String>,
    },

    /// A slot holds a value of the wrong type.
    #[error("{action}: {slot} has type {actual}, expected {expected}")]
    SlotTypeMismatch {
        action: String,
        slot: String,
        actual: String,
        expected: String,
    },

    /// A derived result type differs from the pinned one.
    #[error("{action}: result {index} derives type {derived}, expected {expected}")]
    ResultTypeMismatch {
        action: String,
        index: usize,
        derived: String,
        expected: String,
    },

    /// Wrong number of entries in a slot category.
    #[error("{action}: expected {expected} {slot} slot(s), got {actual}")]
    SlotCount {
        action: String,
        slot: &'static str,
        expected: String,
        actual: usize,
    },

    /// The builder is already bound by another operation.
    #[error("builder {builder} (`{name}`) is already bound by {by}")]
    AlreadyBound {
        builder: BuilderId,
        name: String,
        by: OperationId,
    },

    /// The builder's boundness forbids this binding.
    #[error("builder {builder} (`{name}`) is {boundness:?} and cannot be bound here")]
    CannotBind {
        builder: BuilderId,
        name: String,
        boundness: Boundness,
    },

    /// `Goto` to a builder that must be entered structurally.
    #[error("cannot jump to builder {builder} (`{name}`): it is bound")]
    JumpToBoundBuilder { builder: BuilderId, name: String },

    /// A builder cannot bind itself or one of its lexical ancestors.
    #[error("builder {builder} cannot bind {target}")]
    SelfBinding { builder: BuilderId, target: BuilderId },

    #[error("return of {actual}, function returns {expected}")]
    ReturnTypeMismatch { expected: String, actual: String },

    #[error("unknown symbol `{0}`")]
    UnknownSymbol(String),

    /// An id that this compilation never allocated.
    #[error("unknown {kind} id {raw}")]
    UnknownEntity { kind: &'static str, raw: u32 },

    #[error("unknown action {0}")]
    UnknownAction(ActionId),

    #[error("an action named `{0}` already exists")]
    DuplicateAction(String),

    #[error("operation {0} is not attached to a builder")]
    Detached(OperationId),

    #[error(transparent)]
    Type(#[from] TypeError),
}

impl ConstructionError {
    pub(crate) fn unknown(kind: &'static str, raw: u32) -> Self {
        ConstructionError::UnknownEntity { kind, raw }
    }

    /// Whether this error is a type mismatch rather than a structural one.
    pub fn is_type_mismatch(&self) -> bool {
        matches!(
            self,
            ConstructionError::InvalidOperandTypes { .. }
                | ConstructionError::SlotTypeMismatch { .. }
                | ConstructionError::ResultTypeMismatch { .. }
                | ConstructionError::ReturnTypeMismatch { .. }
        )
    }
}

/// A transformation could not complete.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    #[error(transparent)]
    Construction(#[from] ConstructionError),

    /// A composite contains itself without a pointer in between, or a
    /// self-referential composite would need rebuilding.
    #[error("type {0} is recursive and cannot be rewritten")]
    RecursiveType(TypeId),

    /// The explosion would need semantics the rewrite cannot express.
    #[error("{action}: {reason}")]
    UnsupportedExplosion { action: String, reason: String },

    /// Slot mappers of one operation disagree on the number of clones.
    #[error("{action}: mapper sizes {sizes:?} do not agree on {expected} clones")]
    MismatchedExplosion {
        action: String,
        sizes: Vec<usize>,
        expected: usize,
    },

    /// A value of exploded type was used before its producer was rewritten.
    #[error("value {value} used by {op} before it was rewritten")]
    UseBeforeDefinition { value: ValueId, op: OperationId },

    /// A rewrite that has to cover the whole compilation had one of its
    /// replacements rejected by the transformation cutoff.
    #[error("{transformation}: replacement of {op} was rejected by the cutoff; the rewrite is all-or-nothing")]
    IncompleteRewrite { transformation: String, op: OperationId },

    #[error("literal of type {ty} cannot be converted: {reason}")]
    LiteralConversion { ty: TypeId, reason: String },

    #[error("type {0} has no struct layout to explode into")]
    NotExplodable(TypeId),

    #[error("symbol {0} cannot be rewritten")]
    Symbol(SymbolId),

    #[error(transparent)]
    Type(#[from] TypeError),
}

/// A structural invariant that does not hold.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum VerifyError {
    #[error("builder {builder} is {boundness:?} but has {references} structural reference(s)")]
    Boundness {
        builder: BuilderId,
        boundness: Boundness,
        references: usize,
    },

    #[error("value {value} has {producers} producers")]
    Producers { value: ValueId, producers: usize },

    #[error("{op} uses {value} whose producer {producer} is detached")]
    DetachedProducer {
        op: OperationId,
        value: ValueId,
        producer: OperationId,
    },

    #[error("{op}: {reason}")]
    Typing { op: OperationId, reason: String },

    #[error("{op} lists builder {builder} as parent but is not in its operations")]
    Orphan { op: OperationId, builder: BuilderId },
}

/// Outcome of [`Compiler::compile`](crate::Compiler::compile).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReturnCode {
    Successful,
    NotStarted,
    ConstructionFailed,
    TypeMismatch,
    MissingExtension,
    TransformFailed,
    VerificationFailed,
    LoweringFailed,
}

impl ReturnCode {
    pub fn is_success(self) -> bool {
        self == ReturnCode::Successful
    }
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReturnCode::Successful => "CompileSuccessful",
            ReturnCode::NotStarted => "CompileNotStarted",
            ReturnCode::ConstructionFailed => "CompileFail_Construction",
            ReturnCode::TypeMismatch => "CompileFail_TypeMismatch",
            ReturnCode::MissingExtension => "CompileFail_MissingExtension",
            ReturnCode::TransformFailed => "CompileFail_Transformation",
            ReturnCode::VerificationFailed => "CompileFail_Verification",
            ReturnCode::LoweringFailed => "CompileFail_Lowering",
        };
        f.write_str(name)
    }
}

/// Environment-level compilation failure.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct CompilationError {
    pub code: ReturnCode,
    pub message: String,
    pub location: Option<LocationId>,
}

impl CompilationError {
    pub fn new(code: ReturnCode, message: impl Into<String>) -> Self {
        CompilationError {
            code,
            message: message.into(),
            location: None,
        }
    }

    #[must_use]
    pub fn at(mut self, location: LocationId) -> Self {
        self.location = Some(location);
        self
    }
}

impl From<ConstructionError> for CompilationError {
    fn from(err: ConstructionError) -> Self {
        let code = if err.is_type_mismatch() {
            ReturnCode::TypeMismatch
        } else {
            ReturnCode::ConstructionFailed
        };
        CompilationError::new(code, err.to_string())
    }
}

impl From<TransformError> for CompilationError {
    fn from(err: TransformError) -> Self {
        CompilationError::new(ReturnCode::TransformFailed, err.to_string())
    }
}

impl From<VerifyError> for CompilationError {
    fn from(err: VerifyError) -> Self {
        CompilationError::new(ReturnCode::VerificationFailed, err.to_string())
    }
}

impl From<TypeError> for CompilationError {
    fn from(err: TypeError) -> Self {
        ConstructionError::from(err).into()
    }
}
