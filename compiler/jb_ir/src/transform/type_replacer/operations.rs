//! Phase B: rewriting each operation from the recorded mappings.

use jb_types::{TypeFlags, TypeId};
use smallvec::SmallVec;

use super::TypeReplacer;
use crate::transform::expand::expand_with_kind;
use crate::transform::{Mapper, OperationReplacer};
use crate::{BuilderId, BuiltinOp, Compilation, Operation, OperationId, TransformError, ValueId};

impl TypeReplacer {
    pub(super) fn rewrite_operation(
        &mut self,
        comp: &mut Compilation<'_>,
        op: OperationId,
    ) -> Result<Option<BuilderId>, TransformError> {
        let operation = comp.operation(op).clone();
        let mut replacer = self.replacer_for(comp, &operation)?;
        if !replacer.changes_anything(comp) {
            return Ok(None);
        }

        let scratch = comp.replacement_builder(op)?;
        self.lower(comp, &mut replacer, scratch, &operation)?;

        for (i, &old) in operation.results().iter().enumerate() {
            match replacer.result_mapper(i) {
                Some(m) if !m.is_empty() => {
                    self.value_map.insert(old, m.clone());
                    self.last_results.push(old);
                }
                _ => {
                    return Err(TransformError::UnsupportedExplosion {
                        action: comp.action_name(operation.action()).to_owned(),
                        reason: format!("result {i} has no replacement"),
                    });
                }
            }
        }
        Ok(Some(scratch))
    }

    /// A replacer whose mappers carry every recorded replacement for the
    /// slots of `operation`.
    fn replacer_for(
        &self,
        comp: &Compilation<'_>,
        operation: &Operation,
    ) -> Result<OperationReplacer, TransformError> {
        let mut r = OperationReplacer::new(comp, operation.id())?;
        for (i, &v) in operation.operands().iter().enumerate() {
            if let Some(m) = self.value_map.get(&v) {
                r.set_operand_mapper(i, m.clone());
            } else if self.decision_of(comp.value_type(v)).changed {
                return Err(TransformError::UseBeforeDefinition {
                    value: v,
                    op: operation.id(),
                });
            }
        }
        for (i, &t) in operation.slots().types.iter().enumerate() {
            if comp.types().dict().flags(t).contains(TypeFlags::IS_FIELD) {
                if let Some(m) = self.field_map.get(&t) {
                    if !m.is_identity_of(t) {
                        r.set_type_mapper(i, m.clone());
                    }
                }
            } else {
                let d = self.decision_of(t);
                if d.changed {
                    r.set_type_mapper(i, Mapper::identity(d.memory));
                }
            }
        }
        for (i, &l) in operation.slots().literals.iter().enumerate() {
            if let Some(m) = self.literal_map.get(&l) {
                r.set_literal_mapper(i, m.clone());
            }
        }
        for (i, &s) in operation.slots().symbols.iter().enumerate() {
            if let Some(m) = self.symbol_map.get(&s) {
                r.set_symbol_mapper(i, m.clone());
            }
        }
        for (i, &v) in operation.results().iter().enumerate() {
            let d = self.decision_of(comp.value_type(v));
            if d.changed {
                r.set_result_type_mapper(i, d.components);
            }
        }
        Ok(r)
    }

    /// Lower through, in order: a per-type expander, the built-in explosion
    /// handling, the kind's own expander, generic cloning.
    fn lower(
        &self,
        comp: &mut Compilation<'_>,
        r: &mut OperationReplacer,
        scratch: BuilderId,
        operation: &Operation,
    ) -> Result<(), TransformError> {
        let mut involved: SmallVec<[TypeId; 8]> = SmallVec::new();
        involved.extend(operation.operands().iter().map(|&v| comp.value_type(v)));
        involved.extend(operation.results().iter().map(|&v| comp.value_type(v)));
        involved.extend(operation.slots().types.iter().copied());
        let compiler = comp.compiler();
        for ty in involved {
            if let Some(expand) = compiler.type_expander(ty) {
                if crate::ensure_sufficient_stack(|| expand(comp, r, scratch))? {
                    return Ok(());
                }
            }
        }

        if let Some(kind) = operation.builtin() {
            if self.explode_builtin(comp, r, scratch, kind, operation)? {
                return Ok(());
            }
        }

        if expand_with_kind(comp, r, scratch)? {
            return Ok(());
        }

        let n = r.check_sizes(comp)?;
        if n > 1 {
            let action = || comp.action_name(operation.action()).to_owned();
            if operation.num_builders() > 0 || operation.num_cases() > 0 {
                return Err(TransformError::UnsupportedExplosion {
                    action: action(),
                    reason: format!("cannot clone an operation that binds builders {n} times"),
                });
            }
            for i in 0..operation.num_results() {
                if r.result_type_mapper(i).map_or(0, Mapper::size) != n {
                    return Err(TransformError::UnsupportedExplosion {
                        action: action(),
                        reason: format!("result {i} would need {n} values but its type is not exploded"),
                    });
                }
            }
        }
        r.clone_all(comp, scratch)?;
        Ok(())
    }

    /// Explosion semantics of the built-in memory, call and return kinds.
    /// Returns `false` to fall through to generic cloning.
    fn explode_builtin(
        &self,
        comp: &mut Compilation<'_>,
        r: &mut OperationReplacer,
        scratch: BuilderId,
        kind: BuiltinOp,
        operation: &Operation,
    ) -> Result<bool, TransformError> {
        match kind {
            BuiltinOp::LoadAt => {
                let Some(&result) = operation.results().first() else {
                    return Ok(false);
                };
                let d = self.decision_of(comp.value_type(result));
                if !d.exploded {
                    return Ok(false);
                }
                let address = single(kind, r.operand_mapper(0))?;
                let mut m = Mapper::new();
                for (&field, e) in d.fields.iter().zip(d.components.entries()) {
                    let v = comp.load_field_at(scratch, field, address)?;
                    m.add_named(v, e.name.as_str(), e.offset);
                }
                r.set_result_mapper(0, m);
                Ok(true)
            }
            BuiltinOp::StoreAt => {
                let Some(value) = operation.operand(1) else {
                    return Ok(false);
                };
                let d = self.decision_of(comp.value_type(value));
                if !d.exploded {
                    return Ok(false);
                }
                let address = single(kind, r.operand_mapper(0))?;
                let values = r.operand_mapper(1).cloned().unwrap_or_default();
                check_width(kind, &values, d.fields.len())?;
                for (&field, v) in d.fields.iter().zip(values.items()) {
                    comp.store_field_at(scratch, field, address, v)?;
                }
                Ok(true)
            }
            BuiltinOp::LoadField => {
                let (Some(base), Some(field)) = (operation.operand(0), operation.ty(0)) else {
                    return Ok(false);
                };
                if !self.decision_of(comp.value_type(base)).exploded {
                    return Ok(false);
                }
                let (prefix, base_offset) = field_path(comp, field)?;
                let fields = self.field_map.get(&field).cloned().unwrap_or_default();
                let values = r.operand_mapper(0).cloned().unwrap_or_default();
                let mut m = Mapper::new();
                for nf in fields.entries() {
                    let component = values.entries().iter().find(|e| e.name == nf.name);
                    if let Some(e) = component {
                        m.add_named(e.item, strip_path(&nf.name, &prefix), e.offset.saturating_sub(base_offset));
                    }
                }
                if m.is_empty() {
                    return Err(TransformError::UnsupportedExplosion {
                        action: kind.name().to_owned(),
                        reason: format!("no component of field `{prefix}`"),
                    });
                }
                r.set_result_mapper(0, m);
                Ok(true)
            }
            BuiltinOp::LoadFieldAt => {
                let Some(field) = operation.ty(0) else {
                    return Ok(false);
                };
                let fields = match self.field_map.get(&field) {
                    Some(m) if m.size() > 1 => m.clone(),
                    _ => return Ok(false),
                };
                let (prefix, base_offset) = field_path(comp, field)?;
                let address = single(kind, r.operand_mapper(0))?;
                let mut m = Mapper::new();
                for nf in fields.entries() {
                    let v = comp.load_field_at(scratch, nf.item, address)?;
                    m.add_named(v, strip_path(&nf.name, &prefix), nf.offset.saturating_sub(base_offset));
                }
                r.set_result_mapper(0, m);
                Ok(true)
            }
            BuiltinOp::StoreFieldAt => {
                let Some(field) = operation.ty(0) else {
                    return Ok(false);
                };
                let fields = match self.field_map.get(&field) {
                    Some(m) if m.size() > 1 => m.clone(),
                    _ => return Ok(false),
                };
                let address = single(kind, r.operand_mapper(0))?;
                let values = r.operand_mapper(1).cloned().unwrap_or_default();
                check_width(kind, &values, fields.size())?;
                for (nf, v) in fields.items().zip(values.items()) {
                    comp.store_field_at(scratch, nf, address, v)?;
                }
                Ok(true)
            }
            BuiltinOp::Call => {
                if (0..r.num_operands()).all(|i| r.operand_mapper(i).map_or(1, Mapper::size) == 1) {
                    return Ok(false);
                }
                let function = single(kind, r.symbol_mapper(0))?;
                let args: Vec<ValueId> = (0..r.num_operands())
                    .filter_map(|i| r.operand_mapper(i))
                    .flat_map(Mapper::items)
                    .collect();
                if let Some(v) = comp.call(scratch, function, &args)? {
                    r.set_result_mapper(0, Mapper::identity(v));
                }
                Ok(true)
            }
            BuiltinOp::Return => {
                if r.operand_mapper(0).is_some_and(|m| m.size() > 1) {
                    return Err(TransformError::UnsupportedExplosion {
                        action: kind.name().to_owned(),
                        reason: "returned value has an exploded type".to_owned(),
                    });
                }
                Ok(false)
            }
            _ => Ok(false),
        }
    }
}

/// The only item of a size-1 mapper.
fn single<T: Copy + PartialEq>(kind: BuiltinOp, m: Option<&Mapper<T>>) -> Result<T, TransformError> {
    match m {
        Some(m) => {
            check_width(kind, m, 1)?;
            m.item(0).ok_or_else(|| unsupported(kind, "empty mapper"))
        }
        None => Err(unsupported(kind, "missing slot")),
    }
}

fn check_width<T: Copy + PartialEq>(kind: BuiltinOp, m: &Mapper<T>, expected: usize) -> Result<(), TransformError> {
    if m.size() == expected {
        Ok(())
    } else {
        Err(TransformError::MismatchedExplosion {
            action: kind.name().to_owned(),
            sizes: vec![m.size()],
            expected,
        })
    }
}

fn unsupported(kind: BuiltinOp, reason: &str) -> TransformError {
    TransformError::UnsupportedExplosion {
        action: kind.name().to_owned(),
        reason: reason.to_owned(),
    }
}

/// Name and offset of an original field.
fn field_path(comp: &Compilation<'_>, field: TypeId) -> Result<(String, u64), TransformError> {
    let entry = comp.types().dict().get(field)?;
    let offset = entry.field_info().map_or(0, |(_, _, off)| off);
    Ok((entry.name().to_owned(), offset))
}

/// `a.x.y` relative to `a` is `x.y`; `a` relative to `a` is empty.
fn strip_path(name: &str, prefix: &str) -> String {
    match name.strip_prefix(prefix) {
        Some("") => String::new(),
        Some(rest) => rest.strip_prefix('.').unwrap_or(rest).to_owned(),
        None => name.to_owned(),
    }
}
