//! A type dictionary paired with its typing rules.
//!
//! Every type registered through a [`TypeSystem`] gets the built-in typing
//! rules that apply to it ([`TypeSystem::register_rules_for`]), so a new
//! pointer can be loaded through, a new struct's fields can be read, and a
//! new function type can be called without any caller registering rules by
//! hand. Extension-specific rules (e.g. arithmetic on a dynamic type) are
//! added directly with [`TypeSystem::graph_mut`].

use jb_types::{PrimitiveKind, TypeDictionary, TypeError, TypeFlags, TypeId, TypeKind};

use crate::{BuiltinOp, TypeGraph};

/// Dictionary plus typing rules.
#[derive(Clone, Debug)]
pub struct TypeSystem<'p> {
    dict: TypeDictionary,
    graph: TypeGraph<'p>,
}

impl TypeSystem<'static> {
    /// A root system with the primitive types and their rules.
    pub fn new(name: impl Into<String>) -> Self {
        let mut system = TypeSystem {
            dict: TypeDictionary::new(name),
            graph: TypeGraph::new(),
        };
        for prim in PrimitiveKind::ALL {
            system.register_rules_for(prim.id());
        }
        system
    }
}

impl<'p> TypeSystem<'p> {
    /// A child system: dictionary copied from `parent`, rules layered over
    /// the parent's.
    pub fn linked(parent: &'p TypeSystem<'p>, name: impl Into<String>) -> Self {
        TypeSystem {
            dict: TypeDictionary::linked(&parent.dict, name),
            graph: TypeGraph::linked(&parent.graph),
        }
    }

    #[inline]
    pub fn dict(&self) -> &TypeDictionary {
        &self.dict
    }

    #[inline]
    pub fn graph(&self) -> &TypeGraph<'p> {
        &self.graph
    }

    #[inline]
    pub fn graph_mut(&mut self) -> &mut TypeGraph<'p> {
        &mut self.graph
    }

    // === Registration (rules follow automatically) ===

    pub fn pointer_to(&mut self, base: TypeId) -> Result<TypeId, TypeError> {
        if let Some(existing) = self.dict.existing_pointer_to(base) {
            return Ok(existing);
        }
        let ptr = self.dict.pointer_to(base)?;
        self.register_rules_for(ptr);
        Ok(ptr)
    }

    pub fn declare_struct(&mut self, name: impl Into<String>) -> TypeId {
        self.dict.declare_struct(name)
    }

    pub fn declare_union(&mut self, name: impl Into<String>) -> TypeId {
        self.dict.declare_union(name)
    }

    pub fn add_field(
        &mut self,
        owner: TypeId,
        name: impl Into<String>,
        field_type: TypeId,
        offset: u64,
    ) -> Result<TypeId, TypeError> {
        self.dict.add_field(owner, name, field_type, offset)
    }

    /// Close a composite and register its rules (and those of any pointer to
    /// it created while it was open).
    pub fn close(&mut self, owner: TypeId, size: u64) -> Result<(), TypeError> {
        self.dict.close(owner, size)?;
        self.register_rules_for(owner);
        if let Some(ptr) = self.dict.existing_pointer_to(owner) {
            self.register_rules_for(ptr);
        }
        Ok(())
    }

    pub fn define_struct(
        &mut self,
        name: impl Into<String>,
        size: u64,
        fields: &[(&str, TypeId, u64)],
    ) -> Result<TypeId, TypeError> {
        let id = self.dict.declare_struct(name);
        for &(fname, fty, off) in fields {
            self.dict.add_field(id, fname, fty, off)?;
        }
        self.close(id, size)?;
        Ok(id)
    }

    pub fn define_union(
        &mut self,
        name: impl Into<String>,
        size: u64,
        fields: &[(&str, TypeId)],
    ) -> Result<TypeId, TypeError> {
        let id = self.dict.declare_union(name);
        for &(fname, fty) in fields {
            self.dict.add_field(id, fname, fty, 0)?;
        }
        self.close(id, size)?;
        Ok(id)
    }

    pub fn function_type(
        &mut self,
        return_type: TypeId,
        params: &[TypeId],
    ) -> Result<TypeId, TypeError> {
        let id = self.dict.function_type(return_type, params)?;
        self.register_rules_for(id);
        Ok(id)
    }

    pub fn define_dynamic(
        &mut self,
        name: impl Into<String>,
        size: u64,
        layout: TypeId,
    ) -> Result<TypeId, TypeError> {
        let id = self.dict.define_dynamic(name, size, layout)?;
        self.register_rules_for(id);
        Ok(id)
    }

    /// Detach a type from the dictionary. Rules naming it stay in the graph
    /// but can no longer be reached by a live operand.
    pub fn remove(&mut self, id: TypeId) -> Result<(), TypeError> {
        self.dict.remove(id).map(|_| ())
    }

    // === Built-in rules ===

    /// Register the built-in typing rules for `ty`. Idempotent.
    pub fn register_rules_for(&mut self, ty: TypeId) {
        let Some(entry) = self.dict.lookup(ty) else {
            return;
        };
        let flags = entry.flags();
        let kind = entry.kind().clone();
        let fields = entry.fields().to_vec();

        if flags.contains(TypeFlags::IS_VALUE) && !self.dict.is_open(ty) {
            self.value_rules(ty);
        }
        if flags.is_numeric() {
            self.numeric_rules(ty, flags.contains(TypeFlags::IS_INTEGER));
        }
        if flags.contains(TypeFlags::IS_ADDRESS) {
            self.address_rules(ty);
        }
        match kind {
            TypeKind::Pointer { base } => self.pointer_rules(ty, base),
            TypeKind::Struct { .. } | TypeKind::Union { .. } if !self.dict.is_open(ty) => {
                for field in fields {
                    if let Some((_, field_type, _)) = self.dict.lookup(field).and_then(|f| f.field_info()) {
                        self.rule(field_type, BuiltinOp::LoadField, &[field, ty]);
                    }
                }
            }
            TypeKind::Function {
                return_type,
                params,
            } => {
                self.graph
                    .register_call(return_type, BuiltinOp::Call.action(), ty, &params);
            }
            _ => {}
        }
    }

    fn rule(&mut self, produces: TypeId, op: BuiltinOp, operands: &[TypeId]) {
        // Every call site passes one to three operands.
        let _ = self.graph.register(produces, op.action(), operands);
    }

    fn value_rules(&mut self, ty: TypeId) {
        self.rule(ty, BuiltinOp::Const, &[ty]);
        self.rule(ty, BuiltinOp::Load, &[ty]);
        self.rule(TypeId::NO_TYPE, BuiltinOp::Store, &[ty, ty]);
    }

    fn numeric_rules(&mut self, ty: TypeId, integer: bool) {
        for op in BuiltinOp::ARITHMETIC {
            let bitwise = matches!(op, BuiltinOp::And | BuiltinOp::Or | BuiltinOp::Xor);
            if integer || !bitwise {
                self.rule(ty, op, &[ty, ty]);
            }
        }
        self.rule(ty, BuiltinOp::Negate, &[ty]);
        for op in BuiltinOp::COMPARISONS {
            self.rule(TypeId::INT32, op, &[ty, ty]);
        }
        for op in BuiltinOp::IF_CMPS {
            self.rule(TypeId::NO_TYPE, op, &[ty, ty]);
        }
        self.rule(TypeId::NO_TYPE, BuiltinOp::IfCmpEqualZero, &[ty]);
        self.rule(TypeId::NO_TYPE, BuiltinOp::IfCmpNotEqualZero, &[ty]);

        let numeric: Vec<TypeId> = self
            .dict
            .iter()
            .filter(|t| t.flags().is_numeric())
            .map(jb_types::Type::id)
            .collect();
        for other in numeric {
            self.rule(ty, BuiltinOp::ConvertTo, &[ty, other]);
            self.rule(other, BuiltinOp::ConvertTo, &[other, ty]);
        }

        if integer {
            self.rule(TypeId::NO_TYPE, BuiltinOp::IfThenElse, &[ty]);
            self.rule(TypeId::NO_TYPE, BuiltinOp::Switch, &[ty]);
            self.rule(TypeId::NO_TYPE, BuiltinOp::ForLoopUp, &[ty, ty, ty]);
        }
    }

    fn address_rules(&mut self, ty: TypeId) {
        for op in [BuiltinOp::Equal, BuiltinOp::NotEqual] {
            self.rule(TypeId::INT32, op, &[ty, ty]);
        }
        for op in [BuiltinOp::IfCmpEqual, BuiltinOp::IfCmpNotEqual] {
            self.rule(TypeId::NO_TYPE, op, &[ty, ty]);
        }
        self.rule(TypeId::NO_TYPE, BuiltinOp::IfCmpEqualZero, &[ty]);
        self.rule(TypeId::NO_TYPE, BuiltinOp::IfCmpNotEqualZero, &[ty]);
    }

    fn pointer_rules(&mut self, ptr: TypeId, base: TypeId) {
        let Some(base_ty) = self.dict.lookup(base) else {
            return;
        };
        let base_flags = base_ty.flags();
        let base_open = self.dict.is_open(base);
        let fields = base_ty.fields().to_vec();

        self.rule(ptr, BuiltinOp::IndexAt, &[ptr, TypeId::INT32]);
        self.rule(ptr, BuiltinOp::IndexAt, &[ptr, TypeId::INT64]);
        if base_open {
            return;
        }
        if base_flags.contains(TypeFlags::IS_VALUE) {
            self.rule(base, BuiltinOp::LoadAt, &[ptr]);
            self.rule(TypeId::NO_TYPE, BuiltinOp::StoreAt, &[ptr, base]);
            self.rule(ptr, BuiltinOp::CreateLocalArray, &[base]);
        }
        if base_flags.contains(TypeFlags::IS_COMPOSITE) {
            self.rule(ptr, BuiltinOp::CreateLocalStruct, &[base]);
            for field in fields {
                let Some((_, field_type, _)) = self.dict.lookup(field).and_then(|f| f.field_info())
                else {
                    continue;
                };
                self.rule(field_type, BuiltinOp::LoadFieldAt, &[field, ptr]);
                self.rule(TypeId::NO_TYPE, BuiltinOp::StoreFieldAt, &[field, ptr, field_type]);
            }
        }
    }
}
