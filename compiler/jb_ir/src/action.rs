//! Operation kinds ("actions").
//!
//! Built-in kinds form the closed [`BuiltinOp`] enum; their action ids are
//! `0..BuiltinOp::COUNT`. Extensions add kinds at run time through the
//! [`ActionRegistry`]: each dynamic action is a [`DynamicOpSpec`] record
//! (slot shape plus typing/clone/print/expand closures) stored in a side
//! table indexed by `action - BuiltinOp::COUNT`. Core code never matches on
//! dynamic kinds; it reads their shape and calls their closures.

mod dynamic;

use std::fmt;

use bitflags::bitflags;
use rustc_hash::FxHashMap;

pub use dynamic::{CloneFn, DynamicOpSpec, ExpandFn, PrintFn, TypingFn};

use crate::{ActionId, ConstructionError};

bitflags! {
    /// Static properties of a built-in action.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct OpFlags: u16 {
        /// Two-operand arithmetic or bitwise operation.
        const ARITHMETIC = 1 << 0;
        /// Produces an `Int32` truth value.
        const COMPARISON = 1 << 1;
        /// Reads or writes a symbol or memory.
        const MEMORY = 1 << 2;
        /// Calls a function symbol.
        const CALL = 1 << 3;
        /// Control never reaches the next operation in the builder.
        const TERMINATOR = 1 << 4;
        /// Conditionally enters a bound builder.
        const CONDITIONAL = 1 << 5;
        /// Has at least one builder slot.
        const BINDS_BUILDERS = 1 << 6;
        /// Can lower itself into simpler operations.
        const HAS_EXPANDER = 1 << 7;
        /// Operand (or case) count is not fixed.
        const VARIADIC = 1 << 8;
    }
}

/// Slot category of an operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotKind {
    Result,
    Operand,
    Type,
    Literal,
    Symbol,
    Builder,
    Case,
}

impl SlotKind {
    pub fn name(self) -> &'static str {
        match self {
            SlotKind::Result => "result",
            SlotKind::Operand => "operand",
            SlotKind::Type => "type",
            SlotKind::Literal => "literal",
            SlotKind::Symbol => "symbol",
            SlotKind::Builder => "builder",
            SlotKind::Case => "case",
        }
    }
}

/// Allowed number of entries in one slot category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Arity {
    Exactly(u8),
    Between(u8, u8),
    AtLeast(u8),
}

impl Arity {
    #[inline]
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exactly(k) => n == usize::from(k),
            Arity::Between(lo, hi) => (usize::from(lo)..=usize::from(hi)).contains(&n),
            Arity::AtLeast(lo) => n >= usize::from(lo),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(k) => write!(f, "{k}"),
            Arity::Between(lo, hi) => write!(f, "{lo}..={hi}"),
            Arity::AtLeast(lo) => write!(f, "{lo} or more"),
        }
    }
}

/// Slot counts of an operation kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotShape {
    pub results: Arity,
    pub operands: Arity,
    pub types: Arity,
    pub literals: Arity,
    pub symbols: Arity,
    pub builders: Arity,
    pub cases: Arity,
}

impl SlotShape {
    /// No slots at all.
    pub const EMPTY: SlotShape = SlotShape {
        results: Arity::Exactly(0),
        operands: Arity::Exactly(0),
        types: Arity::Exactly(0),
        literals: Arity::Exactly(0),
        symbols: Arity::Exactly(0),
        builders: Arity::Exactly(0),
        cases: Arity::Exactly(0),
    };

    pub const fn results(mut self, n: u8) -> Self {
        self.results = Arity::Exactly(n);
        self
    }

    pub const fn operands(mut self, n: u8) -> Self {
        self.operands = Arity::Exactly(n);
        self
    }

    pub const fn types(mut self, n: u8) -> Self {
        self.types = Arity::Exactly(n);
        self
    }

    pub const fn literals(mut self, n: u8) -> Self {
        self.literals = Arity::Exactly(n);
        self
    }

    pub const fn symbols(mut self, n: u8) -> Self {
        self.symbols = Arity::Exactly(n);
        self
    }

    pub const fn builders(mut self, n: u8) -> Self {
        self.builders = Arity::Exactly(n);
        self
    }

    pub const fn with(mut self, slot: SlotKind, arity: Arity) -> Self {
        match slot {
            SlotKind::Result => self.results = arity,
            SlotKind::Operand => self.operands = arity,
            SlotKind::Type => self.types = arity,
            SlotKind::Literal => self.literals = arity,
            SlotKind::Symbol => self.symbols = arity,
            SlotKind::Builder => self.builders = arity,
            SlotKind::Case => self.cases = arity,
        }
        self
    }

    pub fn arity(&self, slot: SlotKind) -> Arity {
        match slot {
            SlotKind::Result => self.results,
            SlotKind::Operand => self.operands,
            SlotKind::Type => self.types,
            SlotKind::Literal => self.literals,
            SlotKind::Symbol => self.symbols,
            SlotKind::Builder => self.builders,
            SlotKind::Case => self.cases,
        }
    }
}

/// How an operation uses one of its builder slots.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BuilderRole {
    /// Structural target entered from exactly one place (`May -> Must`).
    Bound,
    /// Placed inline as a merge point that `Goto` may also enter. The
    /// builder becomes `Cant`; at most one operation places it.
    Label,
    /// Unconditional branch target (`Goto`). The builder becomes `Cant`.
    Jump,
}

/// The compiled-in operation kinds. The discriminant is the action id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum BuiltinOp {
    Const,
    Add,
    Sub,
    Mul,
    Div,
    And,
    Or,
    Xor,
    Negate,
    Equal,
    NotEqual,
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    ConvertTo,
    Load,
    Store,
    LoadAt,
    StoreAt,
    IndexAt,
    LoadField,
    LoadFieldAt,
    StoreFieldAt,
    CreateLocalArray,
    CreateLocalStruct,
    Call,
    Return,
    AppendBuilder,
    Label,
    Goto,
    IfCmpEqual,
    IfCmpNotEqual,
    IfCmpLessThan,
    IfCmpLessOrEqual,
    IfCmpGreaterThan,
    IfCmpGreaterOrEqual,
    IfCmpEqualZero,
    IfCmpNotEqualZero,
    IfThenElse,
    ForLoopUp,
    Switch,
}

impl BuiltinOp {
    /// All built-in kinds in action-id order.
    pub const ALL: [BuiltinOp; 42] = [
        BuiltinOp::Const,
        BuiltinOp::Add,
        BuiltinOp::Sub,
        BuiltinOp::Mul,
        BuiltinOp::Div,
        BuiltinOp::And,
        BuiltinOp::Or,
        BuiltinOp::Xor,
        BuiltinOp::Negate,
        BuiltinOp::Equal,
        BuiltinOp::NotEqual,
        BuiltinOp::LessThan,
        BuiltinOp::LessOrEqual,
        BuiltinOp::GreaterThan,
        BuiltinOp::GreaterOrEqual,
        BuiltinOp::ConvertTo,
        BuiltinOp::Load,
        BuiltinOp::Store,
        BuiltinOp::LoadAt,
        BuiltinOp::StoreAt,
        BuiltinOp::IndexAt,
        BuiltinOp::LoadField,
        BuiltinOp::LoadFieldAt,
        BuiltinOp::StoreFieldAt,
        BuiltinOp::CreateLocalArray,
        BuiltinOp::CreateLocalStruct,
        BuiltinOp::Call,
        BuiltinOp::Return,
        BuiltinOp::AppendBuilder,
        BuiltinOp::Label,
        BuiltinOp::Goto,
        BuiltinOp::IfCmpEqual,
        BuiltinOp::IfCmpNotEqual,
        BuiltinOp::IfCmpLessThan,
        BuiltinOp::IfCmpLessOrEqual,
        BuiltinOp::IfCmpGreaterThan,
        BuiltinOp::IfCmpGreaterOrEqual,
        BuiltinOp::IfCmpEqualZero,
        BuiltinOp::IfCmpNotEqualZero,
        BuiltinOp::IfThenElse,
        BuiltinOp::ForLoopUp,
        BuiltinOp::Switch,
    ];

    /// Number of built-in kinds; the first dynamic action id.
    pub const COUNT: u32 = Self::ALL.len() as u32;

    /// Arithmetic kinds registered for every numeric primitive.
    pub const ARITHMETIC: [BuiltinOp; 7] = [
        BuiltinOp::Add,
        BuiltinOp::Sub,
        BuiltinOp::Mul,
        BuiltinOp::Div,
        BuiltinOp::And,
        BuiltinOp::Or,
        BuiltinOp::Xor,
    ];

    /// Comparisons producing `Int32`.
    pub const COMPARISONS: [BuiltinOp; 6] = [
        BuiltinOp::Equal,
        BuiltinOp::NotEqual,
        BuiltinOp::LessThan,
        BuiltinOp::LessOrEqual,
        BuiltinOp::GreaterThan,
        BuiltinOp::GreaterOrEqual,
    ];

    /// Two-operand conditional branches.
    pub const IF_CMPS: [BuiltinOp; 6] = [
        BuiltinOp::IfCmpEqual,
        BuiltinOp::IfCmpNotEqual,
        BuiltinOp::IfCmpLessThan,
        BuiltinOp::IfCmpLessOrEqual,
        BuiltinOp::IfCmpGreaterThan,
        BuiltinOp::IfCmpGreaterOrEqual,
    ];

    #[inline]
    pub const fn action(self) -> ActionId {
        ActionId::new(self as u32)
    }

    /// The built-in kind with this action id, if any.
    pub fn from_action(action: ActionId) -> Option<BuiltinOp> {
        Self::ALL.get(action.index()).copied()
    }

    pub const fn name(self) -> &'static str {
        match self {
            BuiltinOp::Const => "Const",
            BuiltinOp::Add => "Add",
            BuiltinOp::Sub => "Sub",
            BuiltinOp::Mul => "Mul",
            BuiltinOp::Div => "Div",
            BuiltinOp::And => "And",
            BuiltinOp::Or => "Or",
            BuiltinOp::Xor => "Xor",
            BuiltinOp::Negate => "Negate",
            BuiltinOp::Equal => "Equal",
            BuiltinOp::NotEqual => "NotEqual",
            BuiltinOp::LessThan => "LessThan",
            BuiltinOp::LessOrEqual => "LessOrEqual",
            BuiltinOp::GreaterThan => "GreaterThan",
            BuiltinOp::GreaterOrEqual => "GreaterOrEqual",
            BuiltinOp::ConvertTo => "ConvertTo",
            BuiltinOp::Load => "Load",
            BuiltinOp::Store => "Store",
            BuiltinOp::LoadAt => "LoadAt",
            BuiltinOp::StoreAt => "StoreAt",
            BuiltinOp::IndexAt => "IndexAt",
            BuiltinOp::LoadField => "LoadField",
            BuiltinOp::LoadFieldAt => "LoadFieldAt",
            BuiltinOp::StoreFieldAt => "StoreFieldAt",
            BuiltinOp::CreateLocalArray => "CreateLocalArray",
            BuiltinOp::CreateLocalStruct => "CreateLocalStruct",
            BuiltinOp::Call => "Call",
            BuiltinOp::Return => "Return",
            BuiltinOp::AppendBuilder => "AppendBuilder",
            BuiltinOp::Label => "Label",
            BuiltinOp::Goto => "Goto",
            BuiltinOp::IfCmpEqual => "IfCmpEqual",
            BuiltinOp::IfCmpNotEqual => "IfCmpNotEqual",
            BuiltinOp::IfCmpLessThan => "IfCmpLessThan",
            BuiltinOp::IfCmpLessOrEqual => "IfCmpLessOrEqual",
            BuiltinOp::IfCmpGreaterThan => "IfCmpGreaterThan",
            BuiltinOp::IfCmpGreaterOrEqual => "IfCmpGreaterOrEqual",
            BuiltinOp::IfCmpEqualZero => "IfCmpEqualZero",
            BuiltinOp::IfCmpNotEqualZero => "IfCmpNotEqualZero",
            BuiltinOp::IfThenElse => "IfThenElse",
            BuiltinOp::ForLoopUp => "ForLoopUp",
            BuiltinOp::Switch => "Switch",
        }
    }

    pub fn flags(self) -> OpFlags {
        match self {
            BuiltinOp::Add
            | BuiltinOp::Sub
            | BuiltinOp::Mul
            | BuiltinOp::Div
            | BuiltinOp::And
            | BuiltinOp::Or
            | BuiltinOp::Xor
            | BuiltinOp::Negate => OpFlags::ARITHMETIC,
            BuiltinOp::Equal
            | BuiltinOp::NotEqual
            | BuiltinOp::LessThan
            | BuiltinOp::LessOrEqual
            | BuiltinOp::GreaterThan
            | BuiltinOp::GreaterOrEqual => OpFlags::COMPARISON,
            BuiltinOp::Const | BuiltinOp::ConvertTo => OpFlags::empty(),
            BuiltinOp::Load
            | BuiltinOp::Store
            | BuiltinOp::LoadAt
            | BuiltinOp::StoreAt
            | BuiltinOp::IndexAt
            | BuiltinOp::LoadField
            | BuiltinOp::LoadFieldAt
            | BuiltinOp::StoreFieldAt
            | BuiltinOp::CreateLocalArray
            | BuiltinOp::CreateLocalStruct => OpFlags::MEMORY,
            BuiltinOp::Call => OpFlags::CALL | OpFlags::VARIADIC,
            BuiltinOp::Return => OpFlags::TERMINATOR,
            BuiltinOp::AppendBuilder | BuiltinOp::Label => OpFlags::BINDS_BUILDERS,
            BuiltinOp::Goto => OpFlags::TERMINATOR | OpFlags::BINDS_BUILDERS,
            BuiltinOp::IfCmpEqual
            | BuiltinOp::IfCmpNotEqual
            | BuiltinOp::IfCmpLessThan
            | BuiltinOp::IfCmpLessOrEqual
            | BuiltinOp::IfCmpGreaterThan
            | BuiltinOp::IfCmpGreaterOrEqual
            | BuiltinOp::IfCmpEqualZero
            | BuiltinOp::IfCmpNotEqualZero
            | BuiltinOp::IfThenElse => OpFlags::CONDITIONAL | OpFlags::BINDS_BUILDERS,
            BuiltinOp::ForLoopUp => OpFlags::BINDS_BUILDERS | OpFlags::HAS_EXPANDER,
            BuiltinOp::Switch => {
                OpFlags::CONDITIONAL | OpFlags::BINDS_BUILDERS | OpFlags::VARIADIC
            }
        }
    }

    pub fn shape(self) -> SlotShape {
        let s = SlotShape::EMPTY;
        match self {
            BuiltinOp::Const => s.results(1).literals(1),
            BuiltinOp::Add
            | BuiltinOp::Sub
            | BuiltinOp::Mul
            | BuiltinOp::Div
            | BuiltinOp::And
            | BuiltinOp::Or
            | BuiltinOp::Xor
            | BuiltinOp::Equal
            | BuiltinOp::NotEqual
            | BuiltinOp::LessThan
            | BuiltinOp::LessOrEqual
            | BuiltinOp::GreaterThan
            | BuiltinOp::GreaterOrEqual => s.results(1).operands(2),
            BuiltinOp::Negate | BuiltinOp::LoadAt => s.results(1).operands(1),
            BuiltinOp::ConvertTo => s.results(1).operands(1).types(1),
            BuiltinOp::Load => s.results(1).symbols(1),
            BuiltinOp::Store => s.operands(1).symbols(1),
            BuiltinOp::StoreAt => s.operands(2),
            BuiltinOp::IndexAt => s.results(1).operands(2),
            BuiltinOp::LoadField | BuiltinOp::LoadFieldAt => s.results(1).operands(1).types(1),
            BuiltinOp::StoreFieldAt => s.operands(2).types(1),
            BuiltinOp::CreateLocalArray => s.results(1).types(1).literals(1),
            BuiltinOp::CreateLocalStruct => s.results(1).types(1),
            BuiltinOp::Call => s
                .with(SlotKind::Result, Arity::Between(0, 1))
                .with(SlotKind::Operand, Arity::AtLeast(0))
                .symbols(1),
            BuiltinOp::Return => s.with(SlotKind::Operand, Arity::Between(0, 1)),
            BuiltinOp::AppendBuilder | BuiltinOp::Label | BuiltinOp::Goto => s.builders(1),
            BuiltinOp::IfCmpEqual
            | BuiltinOp::IfCmpNotEqual
            | BuiltinOp::IfCmpLessThan
            | BuiltinOp::IfCmpLessOrEqual
            | BuiltinOp::IfCmpGreaterThan
            | BuiltinOp::IfCmpGreaterOrEqual => s.operands(2).builders(1),
            BuiltinOp::IfCmpEqualZero | BuiltinOp::IfCmpNotEqualZero => {
                s.operands(1).builders(1)
            }
            BuiltinOp::IfThenElse => s
                .operands(1)
                .with(SlotKind::Builder, Arity::Between(1, 2)),
            BuiltinOp::ForLoopUp => s.operands(3).symbols(1).builders(3),
            BuiltinOp::Switch => s
                .operands(1)
                .builders(1)
                .with(SlotKind::Case, Arity::AtLeast(0)),
        }
    }

    /// Role of builder slot `index`.
    pub fn builder_role(self, index: usize) -> BuilderRole {
        match (self, index) {
            (BuiltinOp::Label, _) | (BuiltinOp::ForLoopUp, 1 | 2) => BuilderRole::Label,
            (BuiltinOp::Goto, _) => BuilderRole::Jump,
            _ => BuilderRole::Bound,
        }
    }

    /// Operand slot names, for diagnostics.
    pub fn operand_names(self) -> &'static [&'static str] {
        match self {
            BuiltinOp::Add
            | BuiltinOp::Sub
            | BuiltinOp::Mul
            | BuiltinOp::Div
            | BuiltinOp::And
            | BuiltinOp::Or
            | BuiltinOp::Xor
            | BuiltinOp::Equal
            | BuiltinOp::NotEqual
            | BuiltinOp::LessThan
            | BuiltinOp::LessOrEqual
            | BuiltinOp::GreaterThan
            | BuiltinOp::GreaterOrEqual
            | BuiltinOp::IfCmpEqual
            | BuiltinOp::IfCmpNotEqual
            | BuiltinOp::IfCmpLessThan
            | BuiltinOp::IfCmpLessOrEqual
            | BuiltinOp::IfCmpGreaterThan
            | BuiltinOp::IfCmpGreaterOrEqual => &["left", "right"],
            BuiltinOp::Negate | BuiltinOp::ConvertTo | BuiltinOp::Store | BuiltinOp::Return => {
                &["value"]
            }
            BuiltinOp::LoadAt | BuiltinOp::LoadFieldAt => &["address"],
            BuiltinOp::StoreAt | BuiltinOp::StoreFieldAt => &["address", "value"],
            BuiltinOp::IndexAt => &["base", "index"],
            BuiltinOp::LoadField => &["struct"],
            BuiltinOp::IfCmpEqualZero | BuiltinOp::IfCmpNotEqualZero => &["condition"],
            BuiltinOp::IfThenElse | BuiltinOp::Switch => &["selector"],
            BuiltinOp::ForLoopUp => &["initial", "final", "bump"],
            BuiltinOp::Call => &["arguments"],
            BuiltinOp::Const
            | BuiltinOp::Load
            | BuiltinOp::CreateLocalArray
            | BuiltinOp::CreateLocalStruct
            | BuiltinOp::AppendBuilder
            | BuiltinOp::Label
            | BuiltinOp::Goto => &[],
        }
    }
}

impl fmt::Display for BuiltinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name table for every action, built-in and dynamic. `NumActions` only
/// grows.
#[derive(Debug)]
pub struct ActionRegistry {
    dynamic: Vec<DynamicOpSpec>,
    by_name: FxHashMap<String, ActionId>,
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionRegistry {
    pub fn new() -> Self {
        let by_name = BuiltinOp::ALL
            .iter()
            .map(|op| (op.name().to_owned(), op.action()))
            .collect();
        ActionRegistry {
            dynamic: Vec::new(),
            by_name,
        }
    }

    /// Register a new dynamic action. Names must be unique.
    pub fn register(&mut self, spec: DynamicOpSpec) -> Result<ActionId, ConstructionError> {
        if self.by_name.contains_key(spec.name()) {
            return Err(ConstructionError::DuplicateAction(spec.name().to_owned()));
        }
        let raw = BuiltinOp::COUNT + crate::ids::next_raw(self.dynamic.len(), "dynamic action");
        let action = ActionId::new(raw);
        tracing::debug!(action = raw, name = spec.name(), "registered dynamic action");
        self.by_name.insert(spec.name().to_owned(), action);
        self.dynamic.push(spec);
        Ok(action)
    }

    /// Total number of actions, built-in and dynamic.
    pub fn count(&self) -> u32 {
        BuiltinOp::COUNT + crate::ids::next_raw(self.dynamic.len(), "dynamic action")
    }

    pub fn lookup(&self, name: &str) -> Option<ActionId> {
        self.by_name.get(name).copied()
    }

    pub fn contains(&self, action: ActionId) -> bool {
        action.raw() < self.count()
    }

    /// The behavior record of a dynamic action.
    pub fn dynamic(&self, action: ActionId) -> Option<&DynamicOpSpec> {
        let index = action.raw().checked_sub(BuiltinOp::COUNT)?;
        self.dynamic.get(index as usize)
    }

    pub fn name(&self, action: ActionId) -> &str {
        match BuiltinOp::from_action(action) {
            Some(op) => op.name(),
            None => self.dynamic(action).map_or("<unknown action>", DynamicOpSpec::name),
        }
    }

    pub fn shape(&self, action: ActionId) -> Option<SlotShape> {
        match BuiltinOp::from_action(action) {
            Some(op) => Some(op.shape()),
            None => self.dynamic(action).map(DynamicOpSpec::shape),
        }
    }

    /// Role of builder slot `index` of `action`. Dynamic actions bind every
    /// builder slot.
    pub fn builder_role(&self, action: ActionId, index: usize) -> BuilderRole {
        BuiltinOp::from_action(action).map_or(BuilderRole::Bound, |op| op.builder_role(index))
    }

    /// Check if `action` can lower itself.
    pub fn has_expander(&self, action: ActionId) -> bool {
        match BuiltinOp::from_action(action) {
            Some(op) => op.flags().contains(OpFlags::HAS_EXPANDER),
            None => self.dynamic(action).is_some_and(|d| d.expander().is_some()),
        }
    }
}
