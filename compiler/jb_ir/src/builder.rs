//! Builders: the control-structure nodes of the program graph.
//!
//! Builders live in the compilation's arena and form two graphs at once:
//! the lexical ownership tree (`parent`/`children`) and the control-flow
//! references held inside operations' builder slots. Only the tree owns
//! anything; control-flow edges are plain ids, so loops referencing their
//! own body need no special lifetime handling.

use std::fmt;

use crate::{BuilderId, ContextId, LocationId, OperationId};

/// How often a builder may be used as a structural target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Boundness {
    /// Entered from exactly one binding operation.
    Must,
    /// Not yet constrained.
    May,
    /// Never bound structurally: an entry point, a label or a jump target.
    Cant,
}

impl fmt::Display for Boundness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Boundness::Must => "Must",
            Boundness::May => "May",
            Boundness::Cant => "Cant",
        })
    }
}

/// A node holding an ordered sequence of operations.
#[derive(Clone, Debug)]
pub struct Builder {
    pub(crate) id: BuilderId,
    pub(crate) name: String,
    pub(crate) parent: Option<BuilderId>,
    pub(crate) children: Vec<BuilderId>,
    pub(crate) context: ContextId,
    pub(crate) operations: Vec<OperationId>,
    pub(crate) is_target: bool,
    pub(crate) boundness: Boundness,
    /// The operation that binds (`Bound`) or places (`Label`) this builder.
    pub(crate) bound_to: Option<OperationId>,
    pub(crate) control_reaches_end: bool,
    /// Location stamped on newly appended operations.
    pub(crate) location: LocationId,
}

impl Builder {
    pub(crate) fn new(
        id: BuilderId,
        name: String,
        parent: Option<BuilderId>,
        context: ContextId,
        location: LocationId,
    ) -> Self {
        Builder {
            id,
            name,
            parent,
            children: Vec::new(),
            context,
            operations: Vec::new(),
            is_target: false,
            boundness: Boundness::May,
            bound_to: None,
            control_reaches_end: true,
            location,
        }
    }

    #[inline]
    pub fn id(&self) -> BuilderId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Lexical parent.
    pub fn parent(&self) -> Option<BuilderId> {
        self.parent
    }

    /// Lexically owned children.
    pub fn children(&self) -> &[BuilderId] {
        &self.children
    }

    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Operations in program order.
    pub fn operations(&self) -> &[OperationId] {
        &self.operations
    }

    pub fn is_target(&self) -> bool {
        self.is_target
    }

    pub fn boundness(&self) -> Boundness {
        self.boundness
    }

    pub fn bound_to(&self) -> Option<OperationId> {
        self.bound_to
    }

    pub fn control_reaches_end(&self) -> bool {
        self.control_reaches_end
    }

    pub fn location(&self) -> LocationId {
        self.location
    }
}

/// Binding state of one builder, saved before an append changes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct BindingRecord {
    pub(crate) builder: BuilderId,
    pub(crate) is_target: bool,
    pub(crate) boundness: Boundness,
    pub(crate) bound_to: Option<OperationId>,
}

impl BindingRecord {
    pub(crate) fn of(b: &Builder) -> Self {
        BindingRecord {
            builder: b.id,
            is_target: b.is_target,
            boundness: b.boundness,
            bound_to: b.bound_to,
        }
    }

    pub(crate) fn restore(&self, b: &mut Builder) {
        b.is_target = self.is_target;
        b.boundness = self.boundness;
        b.bound_to = self.bound_to;
    }
}

/// Source position attached to operations.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: String,
    pub line: String,
    pub bc_index: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}@{}", self.file, self.line, self.bc_index)
    }
}
