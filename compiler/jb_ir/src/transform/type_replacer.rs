//! Whole-compilation type replacement and explosion.
//!
//! # Algorithm
//!
//! **Phase A** ([`prepare`](Transformation::prepare)) decides, memoized per
//! type and depth-first over structural composition, what becomes of every
//! type in the dictionary:
//!
//! - *unchanged*: identity mapper;
//! - *replaced*: a user `replace(old, new)`;
//! - *exploded*: a user `explode(t)`; values of `t` become one value per
//!   field of its layout, nested exploded fields inlined with `.`-joined
//!   names;
//! - *rebuilt*: a pointer, composite, function or dynamic type containing a
//!   changed type is registered anew and the original scheduled for removal.
//!
//! Symbols, the return type and literals are then rewritten from those
//! decisions (an exploded local `p` becomes `p.a`, `p.b`, ...).
//!
//! **Phase B** ([`transform_operation`](Transformation::transform_operation))
//! builds one mapper per slot of each operation from the recorded
//! value/symbol/literal/type mappings and, when anything changes, lowers the
//! operation through (in order) a per-type expander, the built-in explosion
//! handling, the kind's own expander, or generic `num_maps` cloning. The
//! replacement's results are recorded so later consumers pick them up.
//!
//! **Cleanup** ([`finish`](Transformation::finish)) removes the superseded
//! types (skipping fields of removed composites), symbols and literals.
//!
//! Symbols and literals are swapped for the whole compilation before any
//! operation is visited, so the rewrite cannot stop halfway: once the
//! transformation cutoff rejects one replacement, the next operation (or
//! the cleanup) fails with [`TransformError::IncompleteRewrite`].

mod operations;
mod signature;
mod types;

use jb_types::{TypeFlags, TypeId};
use rustc_hash::{FxHashMap, FxHashSet};

use super::{Mapper, Transformation};
use crate::{
    BuilderId, Compilation, LiteralId, OperationId, SymbolId, TransformError, ValueId,
};

use types::Decision;

/// Explodes and replaces types across a compilation.
#[derive(Clone, Debug, Default)]
pub struct TypeReplacer {
    explode: FxHashSet<TypeId>,
    replace: FxHashMap<TypeId, TypeId>,

    decisions: FxHashMap<TypeId, Decision>,
    in_progress: FxHashSet<TypeId>,
    /// Pointers decided while their base was still being decided.
    provisional: FxHashMap<TypeId, Vec<TypeId>>,
    /// Original field -> its field(s) in the rebuilt composite.
    field_map: FxHashMap<TypeId, Mapper<TypeId>>,
    remove_types: Vec<TypeId>,

    symbol_map: FxHashMap<SymbolId, Mapper<SymbolId>>,
    literal_map: FxHashMap<LiteralId, Mapper<LiteralId>>,
    value_map: FxHashMap<ValueId, Mapper<ValueId>>,
    remove_symbols: Vec<SymbolId>,
    remove_literals: Vec<LiteralId>,
    /// Results mapped by the last replacement, forgotten if it is rejected.
    last_results: Vec<ValueId>,
    /// First operation whose replacement the cutoff rejected.
    rejected: Option<OperationId>,
}

impl TypeReplacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every use of `ty` by the fields of its layout.
    pub fn explode(&mut self, ty: TypeId) -> &mut Self {
        self.explode.insert(ty);
        self
    }

    /// Replace every use of `old` by `new`.
    pub fn replace(&mut self, old: TypeId, new: TypeId) -> &mut Self {
        self.replace.insert(old, new);
        self
    }

    /// Value-level replacement of `ty` decided in Phase A.
    pub fn components_of(&self, ty: TypeId) -> Option<&Mapper<TypeId>> {
        self.decisions.get(&ty).map(|d| &d.components)
    }

    /// Replacement symbols of `sym`, if it was rewritten.
    pub fn symbol_mapper(&self, sym: SymbolId) -> Option<&Mapper<SymbolId>> {
        self.symbol_map.get(&sym)
    }

    /// Replacement values of `value`, if its producer was rewritten.
    pub fn value_mapper(&self, value: ValueId) -> Option<&Mapper<ValueId>> {
        self.value_map.get(&value)
    }

    fn decision_of(&self, ty: TypeId) -> Decision {
        self.decisions
            .get(&ty)
            .cloned()
            .unwrap_or_else(|| Decision::identity(ty))
    }

    fn schedule_removal(&mut self, ty: TypeId) {
        if !self.remove_types.contains(&ty) {
            self.remove_types.push(ty);
        }
    }

    fn reset(&mut self) {
        self.decisions.clear();
        self.in_progress.clear();
        self.provisional.clear();
        self.field_map.clear();
        self.remove_types.clear();
        self.symbol_map.clear();
        self.literal_map.clear();
        self.value_map.clear();
        self.remove_symbols.clear();
        self.remove_literals.clear();
        self.last_results.clear();
        self.rejected = None;
    }

    fn check_complete(&self) -> Result<(), TransformError> {
        match self.rejected {
            Some(op) => Err(TransformError::IncompleteRewrite {
                transformation: self.name().to_owned(),
                op,
            }),
            None => Ok(()),
        }
    }
}

impl Transformation for TypeReplacer {
    fn name(&self) -> &str {
        "TypeReplacer"
    }

    fn prepare(&mut self, comp: &mut Compilation<'_>) -> Result<(), TransformError> {
        self.reset();
        for ty in comp.types().dict().ids() {
            self.decide(comp, ty)?;
        }
        self.rewrite_symbols(comp)?;
        self.rewrite_return_type(comp)?;
        self.rewrite_literals(comp)?;
        tracing::debug!(
            compilation = comp.name(),
            changed_types = self.decisions.values().filter(|d| d.changed).count(),
            symbols = self.symbol_map.len(),
            literals = self.literal_map.len(),
            "type decisions made"
        );
        Ok(())
    }

    fn transform_operation(
        &mut self,
        comp: &mut Compilation<'_>,
        op: OperationId,
    ) -> Result<Option<BuilderId>, TransformError> {
        self.check_complete()?;
        self.last_results.clear();
        self.rewrite_operation(comp, op)
    }

    fn rejected(&mut self, _comp: &mut Compilation<'_>, op: OperationId) {
        for v in self.last_results.drain(..) {
            self.value_map.remove(&v);
        }
        tracing::warn!(op = op.raw(), "type rewrite cut short");
        self.rejected.get_or_insert(op);
    }

    fn finish(&mut self, comp: &mut Compilation<'_>) -> Result<(), TransformError> {
        self.check_complete()?;
        let removed: FxHashSet<TypeId> = self.remove_types.iter().copied().collect();
        let mut count = 0usize;
        for &ty in &self.remove_types {
            let Some(entry) = comp.types().dict().lookup(ty) else {
                continue;
            };
            let owned_by_removed = entry.flags().contains(TypeFlags::IS_FIELD)
                && entry
                    .field_info()
                    .is_some_and(|(owner, _, _)| removed.contains(&owner));
            if owned_by_removed {
                continue;
            }
            comp.types_mut().remove(ty)?;
            count += 1;
        }
        for &sym in &self.remove_symbols {
            comp.remove_symbol(sym);
        }
        for &lit in &self.remove_literals {
            comp.remove_literal(lit);
        }
        tracing::debug!(
            compilation = comp.name(),
            types = count,
            symbols = self.remove_symbols.len(),
            literals = self.remove_literals.len(),
            "removed superseded entities"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests;
