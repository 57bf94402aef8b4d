//! One in-progress compilation: the arenas of the program graph.
//!
//! A `Compilation` owns every builder, operation, value, case, context and
//! location of one function, plus dictionaries linked to its compiler's
//! shared vocabulary. Everything else refers to these entities by id.
//!
//! All construction goes through [`Compilation::create_operation`], which
//! validates the request (slot shape, entity ids, typing rule, builder
//! boundness) before changing anything, so a failed append leaves the graph
//! exactly as it was. The per-action `append` methods in [`append`] are thin
//! wrappers over it.

mod append;
mod signature;

pub use append::LoopBuilders;

use jb_types::{TypeFlags, TypeId};
use smallvec::SmallVec;

use crate::builder::BindingRecord;
use crate::ids::next_raw;
use crate::{
    ActionId, Arity, Boundness, Builder, BuilderId, BuilderRole, BuiltinOp, Case, CaseId,
    Compiler, CompilerConfig, ConstructionError, Context, ContextId, Literal, LiteralDictionary,
    LiteralId, Location, LocationId, OpFlags, OpInput, OpSlots, Operation, OperationId,
    ReturnCode, SlotKind, Symbol, SymbolDictionary, SymbolId, SymbolKind, TypeSystem, Value,
    ValueId,
};

/// Type list used as a typing-rule key.
pub(crate) type TypeKey = SmallVec<[TypeId; 4]>;

/// The program graph of one function under construction.
pub struct Compilation<'c> {
    compiler: &'c Compiler,
    name: String,
    types: TypeSystem<'c>,
    symbols: SymbolDictionary,
    literals: LiteralDictionary,
    contexts: Vec<Context>,
    builders: Vec<Builder>,
    operations: Vec<Operation>,
    values: Vec<Value>,
    cases: Vec<Case>,
    locations: Vec<Location>,
    entry_points: Vec<BuilderId>,
    return_type: TypeId,
    parameters: Vec<SymbolId>,
    transformation_index: u64,
    /// Operation whose builder bindings may be taken over by new operations.
    rebind_source: Option<OperationId>,
    /// Binding changes made since the current replacement began.
    journal: Option<Vec<BindingRecord>>,
    status: ReturnCode,
}

impl<'c> Compilation<'c> {
    /// Start a compilation whose dictionaries and typing rules are linked to
    /// `compiler`'s.
    pub fn new(compiler: &'c Compiler, name: impl Into<String>) -> Self {
        let name = name.into();
        let mut root = Context::new(ContextId::new(0), "root".to_owned(), None);
        for sym in compiler.symbols().iter() {
            root.bind(sym.name().to_owned(), sym.id());
        }
        Compilation {
            compiler,
            types: TypeSystem::linked(compiler.types(), name.clone()),
            symbols: SymbolDictionary::linked(compiler.symbols(), compiler.name()),
            literals: LiteralDictionary::linked(compiler.literals(), compiler.name()),
            name,
            contexts: vec![root],
            builders: Vec::new(),
            operations: Vec::new(),
            values: Vec::new(),
            cases: Vec::new(),
            locations: vec![Location {
                file: String::new(),
                line: String::new(),
                bc_index: 0,
            }],
            entry_points: Vec::new(),
            return_type: TypeId::NO_TYPE,
            parameters: Vec::new(),
            transformation_index: 0,
            rebind_source: None,
            journal: None,
            status: ReturnCode::NotStarted,
        }
    }

    // === Accessors ===

    pub fn compiler(&self) -> &'c Compiler {
        self.compiler
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &'c CompilerConfig {
        self.compiler.config()
    }

    pub fn types(&self) -> &TypeSystem<'c> {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeSystem<'c> {
        &mut self.types
    }

    pub fn symbols(&self) -> &SymbolDictionary {
        &self.symbols
    }

    pub fn literals(&self) -> &LiteralDictionary {
        &self.literals
    }

    /// Name of a type for diagnostics.
    pub fn type_name(&self, ty: TypeId) -> &str {
        self.types.dict().name_of(ty)
    }

    pub fn symbol(&self, id: SymbolId) -> Result<&Symbol, ConstructionError> {
        self.symbols.get(id)
    }

    pub fn literal(&self, id: LiteralId) -> Result<&Literal, ConstructionError> {
        self.literals.get(id)
    }

    /// A builder of this compilation. Panics on an id from elsewhere.
    #[inline]
    pub(crate) fn builder(&self, id: BuilderId) -> &Builder {
        &self.builders[id.index()]
    }

    pub fn try_builder(&self, id: BuilderId) -> Result<&Builder, ConstructionError> {
        self.builders
            .get(id.index())
            .ok_or_else(|| ConstructionError::unknown("builder", id.raw()))
    }

    /// An operation of this compilation. Panics on an id from elsewhere.
    #[inline]
    pub(crate) fn operation(&self, id: OperationId) -> &Operation {
        &self.operations[id.index()]
    }

    pub fn try_operation(&self, id: OperationId) -> Result<&Operation, ConstructionError> {
        self.operations
            .get(id.index())
            .ok_or_else(|| ConstructionError::unknown("operation", id.raw()))
    }

    /// A value of this compilation. Panics on an id from elsewhere.
    #[inline]
    pub(crate) fn value(&self, id: ValueId) -> &Value {
        &self.values[id.index()]
    }

    pub fn try_value(&self, id: ValueId) -> Result<&Value, ConstructionError> {
        self.values
            .get(id.index())
            .ok_or_else(|| ConstructionError::unknown("value", id.raw()))
    }

    /// Type of a value. Panics on an id from elsewhere.
    #[inline]
    pub(crate) fn value_type(&self, id: ValueId) -> TypeId {
        self.value(id).ty
    }

    pub fn try_value_type(&self, id: ValueId) -> Result<TypeId, ConstructionError> {
        self.try_value(id).map(|v| v.ty)
    }

    pub fn case(&self, id: CaseId) -> Result<&Case, ConstructionError> {
        self.cases
            .get(id.index())
            .ok_or_else(|| ConstructionError::unknown("case", id.raw()))
    }

    pub fn context(&self, id: ContextId) -> Result<&Context, ConstructionError> {
        self.contexts
            .get(id.index())
            .ok_or_else(|| ConstructionError::unknown("context", id.raw()))
    }

    pub fn location_of(&self, id: LocationId) -> Option<&Location> {
        self.locations.get(id.index())
    }

    /// Number of builders ever created (live or discarded).
    pub fn num_builders(&self) -> usize {
        self.builders.len()
    }

    /// Number of operations ever created, including detached ones.
    pub fn num_operations(&self) -> usize {
        self.operations.len()
    }

    pub fn num_values(&self) -> usize {
        self.values.len()
    }

    pub fn builders(&self) -> impl Iterator<Item = &Builder> {
        self.builders.iter()
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    pub fn entry_points(&self) -> &[BuilderId] {
        &self.entry_points
    }

    pub fn return_type(&self) -> TypeId {
        self.return_type
    }

    /// Parameters in position order.
    pub fn parameters(&self) -> &[SymbolId] {
        &self.parameters
    }

    /// Outcome of the last `compile()` of this compilation.
    pub fn return_code(&self) -> ReturnCode {
        self.status
    }

    pub(crate) fn set_return_code(&mut self, code: ReturnCode) {
        self.status = code;
    }

    /// Number of transformations applied or proposed so far.
    pub fn transformation_index(&self) -> u64 {
        self.transformation_index
    }

    /// Operations attached to builders, in arena order.
    pub fn attached_operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.iter().filter(|op| op.parent.is_some())
    }

    // === Contexts, builders, locations ===

    /// The context every compilation starts with.
    pub fn root_context(&self) -> ContextId {
        ContextId::new(0)
    }

    pub fn create_context(
        &mut self,
        parent: ContextId,
        name: impl Into<String>,
    ) -> Result<ContextId, ConstructionError> {
        self.context(parent)?;
        let id = ContextId::new(next_raw(self.contexts.len(), "context"));
        self.contexts.push(Context::new(id, name.into(), Some(parent)));
        Ok(id)
    }

    /// Resolve `name` from `ctx` outward.
    pub fn resolve(&self, ctx: ContextId, name: &str) -> Option<SymbolId> {
        let mut cur = Some(ctx);
        while let Some(id) = cur {
            let scope = self.contexts.get(id.index())?;
            if let Some(sym) = scope.local(name) {
                return Some(sym);
            }
            cur = scope.parent;
        }
        None
    }

    /// Resolve `name` in the scope of `builder`.
    pub fn lookup_symbol(&self, builder: BuilderId, name: &str) -> Option<SymbolId> {
        let ctx = self.builders.get(builder.index())?.context;
        self.resolve(ctx, name)
    }

    /// A builder with no lexical parent, in the root context.
    pub fn create_root(&mut self, name: impl Into<String>) -> BuilderId {
        let ctx = self.root_context();
        self.push_builder(name.into(), None, ctx)
    }

    /// A lexical child of `parent` sharing its context.
    pub fn create_child(&mut self, parent: BuilderId) -> Result<BuilderId, ConstructionError> {
        let ctx = self.try_builder(parent)?.context;
        let name = format!("{}.{}", self.builder(parent).name, self.builder(parent).children.len());
        self.create_child_in(parent, ctx, name)
    }

    /// A lexical child of `parent` resolving names in `ctx`.
    pub fn create_child_in(
        &mut self,
        parent: BuilderId,
        ctx: ContextId,
        name: impl Into<String>,
    ) -> Result<BuilderId, ConstructionError> {
        self.try_builder(parent)?;
        self.context(ctx)?;
        let id = self.push_builder(name.into(), Some(parent), ctx);
        self.builders[parent.index()].children.push(id);
        Ok(id)
    }

    fn push_builder(&mut self, name: String, parent: Option<BuilderId>, ctx: ContextId) -> BuilderId {
        let id = BuilderId::new(next_raw(self.builders.len(), "builder"));
        let location = parent.map_or(LocationId::new(0), |p| self.builders[p.index()].location);
        self.builders.push(Builder::new(id, name, parent, ctx, location));
        id
    }

    /// Declare `builder` as an entry point. Entry builders are never bound.
    pub fn add_entry_point(&mut self, builder: BuilderId) -> Result<(), ConstructionError> {
        let b = self.try_builder(builder)?;
        if b.boundness == Boundness::Must {
            return Err(ConstructionError::CannotBind {
                builder,
                name: b.name.clone(),
                boundness: b.boundness,
            });
        }
        self.builders[builder.index()].boundness = Boundness::Cant;
        if !self.entry_points.contains(&builder) {
            self.entry_points.push(builder);
        }
        Ok(())
    }

    /// Register a source location.
    pub fn location(&mut self, file: impl Into<String>, line: impl Into<String>, bc_index: u32) -> LocationId {
        let id = LocationId::new(next_raw(self.locations.len(), "location"));
        self.locations.push(Location {
            file: file.into(),
            line: line.into(),
            bc_index,
        });
        id
    }

    /// Stamp subsequent operations appended to `builder` with `loc`.
    pub fn set_location(&mut self, builder: BuilderId, loc: LocationId) -> Result<(), ConstructionError> {
        self.try_builder(builder)?;
        if self.locations.get(loc.index()).is_none() {
            return Err(ConstructionError::unknown("location", loc.raw()));
        }
        self.builders[builder.index()].location = loc;
        Ok(())
    }

    /// A switch case entering `target` when the selector equals `value`.
    pub fn create_case(
        &mut self,
        value: i64,
        target: BuilderId,
        falls_through: bool,
    ) -> Result<CaseId, ConstructionError> {
        self.try_builder(target)?;
        let id = CaseId::new(next_raw(self.cases.len(), "case"));
        self.cases.push(Case {
            id,
            value,
            target,
            falls_through,
        });
        Ok(id)
    }

    /// Intern a literal. `bytes` must cover exactly the type's size.
    pub fn register_literal(&mut self, ty: TypeId, bytes: &[u8]) -> Result<LiteralId, ConstructionError> {
        let entry = self.types.dict().get(ty)?;
        let size = entry.size();
        let value_like = entry.flags().contains(TypeFlags::IS_VALUE);
        if !value_like || (bytes.len() as u64) * 8 != size {
            return Err(ConstructionError::SlotTypeMismatch {
                action: "Literal".to_owned(),
                slot: "bytes".to_owned(),
                actual: format!("{} bits", bytes.len() * 8),
                expected: format!("{size} bits of {}", entry.name()),
            });
        }
        Ok(self.literals.register(ty, bytes))
    }

    // === Operation construction ===

    /// Append a new operation of kind `action` to `parent`.
    ///
    /// Validates slot counts, entity ids, the typing rule and every builder
    /// binding before anything is changed. Results are created from the
    /// derived result types.
    pub fn create_operation(
        &mut self,
        parent: BuilderId,
        action: ActionId,
        input: OpInput,
    ) -> Result<OperationId, ConstructionError> {
        self.try_builder(parent)?;
        let shape = self
            .compiler
            .actions()
            .shape(action)
            .ok_or(ConstructionError::UnknownAction(action))?;
        self.check_shape(action, &shape, &input)?;
        self.check_entities(&input)?;

        let result_types = self.derive_result_types(action, &input)?;
        if !shape.results.accepts(result_types.len()) {
            return Err(ConstructionError::SlotCount {
                action: self.action_name(action).to_owned(),
                slot: SlotKind::Result.name(),
                expected: shape.results.to_string(),
                actual: result_types.len(),
            });
        }
        if let Some(expected) = &input.result_types {
            self.check_pinned_results(action, &result_types, expected)?;
        }
        let bindings = self.plan_bindings(parent, action, &input)?;

        let id = OperationId::new(next_raw(self.operations.len(), "operation"));
        let mut results = SmallVec::new();
        for ty in result_types {
            let v = ValueId::new(next_raw(self.values.len(), "value"));
            self.values.push(Value { id: v, ty, producer: id });
            results.push(v);
        }
        let location = self.builders[parent.index()].location;
        let OpInput {
            operands,
            types,
            literals,
            symbols,
            builders,
            cases,
            result_types: _,
        } = input;
        self.operations.push(Operation {
            id,
            action,
            parent: Some(parent),
            location,
            slots: OpSlots {
                results,
                operands,
                types,
                literals,
                symbols,
                builders,
                cases,
            },
        });
        self.builders[parent.index()].operations.push(id);

        for &(target, role) in &bindings {
            self.bind(target, role, id);
        }
        if let Some(reach) = self.reach_after(id) {
            self.builders[parent.index()].control_reaches_end = reach;
        }
        tracing::trace!(op = id.raw(), builder = parent.raw(), action = self.action_name(action), "appended");
        Ok(id)
    }

    pub(crate) fn action_name(&self, action: ActionId) -> &'c str {
        self.compiler.actions().name(action)
    }

    fn check_shape(
        &self,
        action: ActionId,
        shape: &crate::SlotShape,
        input: &OpInput,
    ) -> Result<(), ConstructionError> {
        let counts = [
            (SlotKind::Operand, input.operands.len()),
            (SlotKind::Type, input.types.len()),
            (SlotKind::Literal, input.literals.len()),
            (SlotKind::Symbol, input.symbols.len()),
            (SlotKind::Builder, input.builders.len()),
            (SlotKind::Case, input.cases.len()),
        ];
        for (slot, n) in counts {
            let arity = shape.arity(slot);
            if !arity.accepts(n) {
                return Err(ConstructionError::SlotCount {
                    action: self.action_name(action).to_owned(),
                    slot: slot.name(),
                    expected: arity.to_string(),
                    actual: n,
                });
            }
        }
        Ok(())
    }

    fn check_entities(&self, input: &OpInput) -> Result<(), ConstructionError> {
        for &v in &input.operands {
            let value = self.try_value(v)?;
            if self.operations[value.producer.index()].parent.is_none() {
                return Err(ConstructionError::Detached(value.producer));
            }
        }
        for &t in &input.types {
            self.types.dict().get(t)?;
        }
        for &l in &input.literals {
            self.literals.get(l)?;
        }
        for &s in &input.symbols {
            self.symbols.get(s)?;
        }
        for &b in &input.builders {
            self.try_builder(b)?;
        }
        for &c in &input.cases {
            self.case(c)?;
        }
        Ok(())
    }

    fn check_pinned_results(
        &self,
        action: ActionId,
        derived: &[TypeId],
        expected: &[TypeId],
    ) -> Result<(), ConstructionError> {
        if derived.len() != expected.len() {
            return Err(ConstructionError::SlotCount {
                action: self.action_name(action).to_owned(),
                slot: SlotKind::Result.name(),
                expected: expected.len().to_string(),
                actual: derived.len(),
            });
        }
        for (index, (&d, &e)) in derived.iter().zip(expected).enumerate() {
            if d != e {
                return Err(ConstructionError::ResultTypeMismatch {
                    action: self.action_name(action).to_owned(),
                    index,
                    derived: self.type_name(d).to_owned(),
                    expected: self.type_name(e).to_owned(),
                });
            }
        }
        Ok(())
    }

    // === Typing ===

    /// Result types of `action` applied to `input`, from the typing rules.
    pub(crate) fn derive_result_types(
        &self,
        action: ActionId,
        input: &OpInput,
    ) -> Result<SmallVec<[TypeId; 1]>, ConstructionError> {
        let mut operand_types = TypeKey::new();
        for &v in &input.operands {
            operand_types.push(self.try_value(v)?.ty);
        }
        match BuiltinOp::from_action(action) {
            Some(op) => self.derive_builtin(op, input, &operand_types),
            None => self.derive_dynamic(action, input, &operand_types),
        }
    }

    fn derive_builtin(
        &self,
        op: BuiltinOp,
        input: &OpInput,
        operand_types: &[TypeId],
    ) -> Result<SmallVec<[TypeId; 1]>, ConstructionError> {
        let mut key = TypeKey::new();
        match op {
            BuiltinOp::AppendBuilder | BuiltinOp::Label | BuiltinOp::Goto => {
                return Ok(SmallVec::new());
            }
            BuiltinOp::Return => return self.check_return(operand_types).map(|()| SmallVec::new()),
            BuiltinOp::Call => return self.derive_call(input, operand_types),
            BuiltinOp::Const | BuiltinOp::CreateLocalArray => {
                key.extend(input.types.iter().copied());
                if op == BuiltinOp::Const {
                    for &l in &input.literals {
                        key.push(self.literals.get(l)?.ty());
                    }
                }
            }
            BuiltinOp::Load | BuiltinOp::Store => {
                for &s in &input.symbols {
                    key.push(self.symbols.get(s)?.ty());
                }
                key.extend(operand_types.iter().copied());
            }
            BuiltinOp::ForLoopUp => {
                let var = self.symbols.get(input.symbols[0])?;
                if let Some(&initial) = operand_types.first() {
                    if var.ty() != initial {
                        return Err(ConstructionError::SlotTypeMismatch {
                            action: op.name().to_owned(),
                            slot: format!("loop variable `{}`", var.name()),
                            actual: self.type_name(var.ty()).to_owned(),
                            expected: self.type_name(initial).to_owned(),
                        });
                    }
                }
                key.extend(operand_types.iter().copied());
            }
            _ => {
                key.extend(input.types.iter().copied());
                key.extend(operand_types.iter().copied());
            }
        }
        let produced = self
            .types
            .graph()
            .produced_type(op.action(), &key)
            .ok_or_else(|| self.invalid_operands(op.name(), &key, op.operand_names()))?;
        match op.shape().results {
            Arity::Exactly(0) => Ok(SmallVec::new()),
            _ if produced.is_no_type() => Err(self.invalid_operands(op.name(), &key, op.operand_names())),
            _ => Ok(smallvec::smallvec![produced]),
        }
    }

    fn derive_dynamic(
        &self,
        action: ActionId,
        input: &OpInput,
        operand_types: &[TypeId],
    ) -> Result<SmallVec<[TypeId; 1]>, ConstructionError> {
        let spec = self
            .compiler
            .actions()
            .dynamic(action)
            .ok_or(ConstructionError::UnknownAction(action))?;
        let mut key: TypeKey = input.types.iter().copied().collect();
        key.extend(operand_types.iter().copied());
        if let Some(typing) = spec.typing() {
            return typing(self.types.graph(), action, &key)
                .ok_or_else(|| self.invalid_operands(spec.name(), &key, &[]));
        }
        if key.is_empty() && spec.shape().results == Arity::Exactly(0) {
            return Ok(SmallVec::new());
        }
        let produced = self
            .types
            .graph()
            .produced_type(action, &key)
            .ok_or_else(|| self.invalid_operands(spec.name(), &key, &[]))?;
        if produced.is_no_type() || spec.shape().results == Arity::Exactly(0) {
            Ok(SmallVec::new())
        } else {
            Ok(smallvec::smallvec![produced])
        }
    }

    fn derive_call(
        &self,
        input: &OpInput,
        operand_types: &[TypeId],
    ) -> Result<SmallVec<[TypeId; 1]>, ConstructionError> {
        let callee = self.symbols.get(input.symbols[0])?;
        if callee.kind() != SymbolKind::Function {
            return Err(ConstructionError::SlotTypeMismatch {
                action: BuiltinOp::Call.name().to_owned(),
                slot: format!("callee `{}`", callee.name()),
                actual: self.type_name(callee.ty()).to_owned(),
                expected: "a function".to_owned(),
            });
        }
        let produced = self
            .types
            .graph()
            .produced_call_type(BuiltinOp::Call.action(), callee.ty(), operand_types)
            .ok_or_else(|| self.invalid_operands(BuiltinOp::Call.name(), operand_types, &["arguments"]))?;
        if produced.is_no_type() {
            Ok(SmallVec::new())
        } else {
            Ok(smallvec::smallvec![produced])
        }
    }

    fn check_return(&self, operand_types: &[TypeId]) -> Result<(), ConstructionError> {
        let expected = self.return_type;
        match operand_types.first() {
            None if expected.is_no_type() => Ok(()),
            Some(&actual) if actual == expected => Ok(()),
            other => Err(ConstructionError::ReturnTypeMismatch {
                expected: self.type_name(expected).to_owned(),
                actual: other.map_or("nothing", |&t| self.type_name(t)).to_owned(),
            }),
        }
    }

    fn invalid_operands(&self, action: &str, key: &[TypeId], names: &[&str]) -> ConstructionError {
        let slots = if names.is_empty() {
            "operands".to_owned()
        } else {
            names.join(", ")
        };
        ConstructionError::InvalidOperandTypes {
            action: action.to_owned(),
            slots,
            actual: key.iter().map(|&t| self.type_name(t).to_owned()).collect(),
        }
    }

    // === Builder binding ===

    /// Validate every builder binding `input` would make, without changing
    /// anything.
    fn plan_bindings(
        &self,
        parent: BuilderId,
        action: ActionId,
        input: &OpInput,
    ) -> Result<SmallVec<[(BuilderId, BuilderRole); 2]>, ConstructionError> {
        let actions = self.compiler.actions();
        let mut plan: SmallVec<[(BuilderId, BuilderRole); 2]> = input
            .builders
            .iter()
            .enumerate()
            .map(|(i, &b)| (b, actions.builder_role(action, i)))
            .collect();
        for &c in &input.cases {
            plan.push((self.case(c)?.target, BuilderRole::Bound));
        }

        for (i, &(target, role)) in plan.iter().enumerate() {
            let b = self.try_builder(target)?;
            if role != BuilderRole::Jump {
                if target == parent || self.is_ancestor(target, parent) {
                    return Err(ConstructionError::SelfBinding {
                        builder: parent,
                        target,
                    });
                }
                if plan[..i].iter().any(|&(t, r)| t == target && r != BuilderRole::Jump) {
                    return Err(ConstructionError::AlreadyBound {
                        builder: target,
                        name: b.name.clone(),
                        by: OperationId::new(next_raw(self.operations.len(), "operation")),
                    });
                }
                if let Some(by) = b.bound_to {
                    if self.rebind_source != Some(by) {
                        return Err(ConstructionError::AlreadyBound {
                            builder: target,
                            name: b.name.clone(),
                            by,
                        });
                    }
                }
            }
            match role {
                BuilderRole::Bound if b.boundness == Boundness::Cant => {
                    return Err(ConstructionError::CannotBind {
                        builder: target,
                        name: b.name.clone(),
                        boundness: b.boundness,
                    });
                }
                BuilderRole::Label if b.boundness == Boundness::Must => {
                    return Err(ConstructionError::CannotBind {
                        builder: target,
                        name: b.name.clone(),
                        boundness: b.boundness,
                    });
                }
                BuilderRole::Jump if b.boundness == Boundness::Must => {
                    return Err(ConstructionError::JumpToBoundBuilder {
                        builder: target,
                        name: b.name.clone(),
                    });
                }
                _ => {}
            }
        }
        Ok(plan)
    }

    /// Builders `op` refers to, with the role of each reference. Case
    /// targets come last and are `Bound`.
    pub fn referenced_builders(&self, op: OperationId) -> SmallVec<[(BuilderId, BuilderRole); 4]> {
        let operation = &self.operations[op.index()];
        let actions = self.compiler.actions();
        let mut refs: SmallVec<[(BuilderId, BuilderRole); 4]> = operation
            .builders()
            .iter()
            .enumerate()
            .map(|(i, &b)| (b, actions.builder_role(operation.action, i)))
            .collect();
        for &c in &operation.slots.cases {
            if let Some(case) = self.cases.get(c.index()) {
                refs.push((case.target, BuilderRole::Bound));
            }
        }
        refs
    }

    /// Check if `ancestor` is a strict lexical ancestor of `builder`.
    fn is_ancestor(&self, ancestor: BuilderId, builder: BuilderId) -> bool {
        let mut cur = self.builders[builder.index()].parent;
        while let Some(p) = cur {
            if p == ancestor {
                return true;
            }
            cur = self.builders[p.index()].parent;
        }
        false
    }

    fn bind(&mut self, target: BuilderId, role: BuilderRole, op: OperationId) {
        if let Some(journal) = &mut self.journal {
            journal.push(BindingRecord::of(&self.builders[target.index()]));
        }
        let b = &mut self.builders[target.index()];
        b.is_target = true;
        match role {
            BuilderRole::Bound => {
                b.boundness = Boundness::Must;
                b.bound_to = Some(op);
            }
            BuilderRole::Label => {
                b.boundness = Boundness::Cant;
                b.bound_to = Some(op);
            }
            BuilderRole::Jump => b.boundness = Boundness::Cant,
        }
    }

    /// How `op` changes whether control reaches the end of its builder.
    fn reach_after(&self, op: OperationId) -> Option<bool> {
        let operation = &self.operations[op.index()];
        if let Some(kind) = operation.builtin() {
            if kind.flags().contains(OpFlags::TERMINATOR) {
                return Some(false);
            }
        }
        let actions = self.compiler.actions();
        let places = (0..operation.num_builders())
            .any(|i| actions.builder_role(operation.action, i) != BuilderRole::Jump)
            || operation.num_cases() > 0;
        places.then_some(true)
    }

    /// Recompute `control_reaches_end` of `builder` from its operations.
    pub(crate) fn recompute_reach(&mut self, builder: BuilderId) {
        let mut reach = true;
        for &op in &self.builders[builder.index()].operations {
            if let Some(r) = self.reach_after(op) {
                reach = r;
            }
        }
        self.builders[builder.index()].control_reaches_end = reach;
    }

    // === Replacement support (used by the transformer) ===

    /// A scratch builder for the replacement of `op`: a child of `op`'s
    /// builder, stamping new operations with `op`'s location.
    pub fn replacement_builder(&mut self, op: OperationId) -> Result<BuilderId, ConstructionError> {
        let operation = self.try_operation(op)?;
        let parent = operation.parent.ok_or(ConstructionError::Detached(op))?;
        let location = operation.location;
        let ctx = self.builders[parent.index()].context;
        let name = format!("{}.{op}", self.builders[parent.index()].name);
        let id = self.push_builder(name, Some(parent), ctx);
        self.builders[parent.index()].children.push(id);
        self.builders[id.index()].location = location;
        Ok(id)
    }

    /// Begin building a replacement for `op`: its bindings may be taken over
    /// and binding changes are journaled.
    pub(crate) fn begin_replacement(&mut self, op: OperationId) {
        self.rebind_source = Some(op);
        self.journal = Some(Vec::new());
    }

    /// Stop journaling; returns the binding changes made since
    /// [`begin_replacement`](Self::begin_replacement).
    pub(crate) fn end_replacement(&mut self) -> Vec<BindingRecord> {
        self.rebind_source = None;
        self.journal.take().unwrap_or_default()
    }

    /// Undo journaled binding changes, newest first.
    pub(crate) fn rollback(&mut self, journal: &[BindingRecord]) {
        for record in journal.iter().rev() {
            record.restore(&mut self.builders[record.builder.index()]);
        }
    }

    /// Next transformation sequence number (1-based).
    pub(crate) fn next_transformation_index(&mut self) -> u64 {
        self.transformation_index += 1;
        self.transformation_index
    }

    /// Replace the operation at `index` of `builder` with the operations of
    /// `replacement`. The replacement builder is discarded; its lexical
    /// children move to `builder`. Returns the number of spliced operations.
    pub(crate) fn splice(&mut self, builder: BuilderId, index: usize, replacement: BuilderId) -> usize {
        let original = self.builders[builder.index()].operations[index];
        let new_ops = std::mem::take(&mut self.builders[replacement.index()].operations);
        for &op in &new_ops {
            self.operations[op.index()].parent = Some(builder);
        }
        self.operations[original.index()].parent = None;
        let count = new_ops.len();
        self.builders[builder.index()]
            .operations
            .splice(index..=index, new_ops);

        let children = std::mem::take(&mut self.builders[replacement.index()].children);
        for &child in &children {
            self.builders[child.index()].parent = Some(builder);
        }
        self.detach_builder(replacement);
        self.builders[builder.index()].children.extend(children);
        self.recompute_reach(builder);
        count
    }

    /// Drop a scratch builder that will not be spliced.
    pub(crate) fn discard(&mut self, replacement: BuilderId) {
        let ops = std::mem::take(&mut self.builders[replacement.index()].operations);
        for op in ops {
            self.operations[op.index()].parent = None;
        }
        self.detach_builder(replacement);
    }

    fn detach_builder(&mut self, id: BuilderId) {
        if let Some(parent) = self.builders[id.index()].parent.take() {
            self.builders[parent.index()].children.retain(|&c| c != id);
        }
    }

    /// Rewrite every attached use of `old` to `new`.
    pub fn replace_uses(&mut self, old: ValueId, new: ValueId) {
        for op in &mut self.operations {
            if op.parent.is_none() {
                continue;
            }
            for v in &mut op.slots.operands {
                if *v == old {
                    *v = new;
                }
            }
        }
    }

    // === Diagnostics ===

    /// One-line rendering of an operation.
    pub fn describe_operation(&self, id: OperationId) -> String {
        let Some(op) = self.operations.get(id.index()) else {
            return format!("{id} <unknown>");
        };
        if let Some(print) = self.compiler.actions().dynamic(op.action).and_then(|d| d.printer()) {
            return print(self, op);
        }
        let mut out = format!("{id} ");
        for (i, &r) in op.results().iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&format!("{r}:{}", self.type_name(self.value_type(r))));
        }
        if op.num_results() > 0 {
            out.push_str(" = ");
        }
        out.push_str(self.action_name(op.action));
        for &t in &op.slots.types {
            out.push_str(&format!(" <{}>", self.type_name(t)));
        }
        for &l in &op.slots.literals {
            match self.literals.lookup(l) {
                Some(lit) => out.push_str(&format!(" {lit}")),
                None => out.push_str(&format!(" {l}")),
            }
        }
        for &s in &op.slots.symbols {
            match self.symbols.lookup(s) {
                Some(sym) => out.push_str(&format!(" \"{}\"", sym.name())),
                None => out.push_str(&format!(" {s}")),
            }
        }
        for &v in op.operands() {
            out.push_str(&format!(" {v}"));
        }
        for &b in op.builders() {
            out.push_str(&format!(" {b}"));
        }
        for &c in &op.slots.cases {
            if let Some(case) = self.cases.get(c.index()) {
                out.push_str(&format!(" case({} -> {})", case.value, case.target));
            }
        }
        out
    }
}
