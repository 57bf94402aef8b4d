//! One-to-many operation replacement.
//!
//! An [`OperationReplacer`] pairs a cloner with one [`Mapper`] per slot
//! entry. Each [`clone_next`](OperationReplacer::clone_next) advances every
//! mapper once and appends a clone, so `num_maps` calls produce one clone
//! per exploded component with size-1 slots repeated in each. Results of
//! every clone are collected into per-result mappers, which is how later
//! consumers of the original results find their replacements.

use jb_types::TypeId;
use smallvec::SmallVec;

use super::{Mapper, OperationCloner};
use crate::{
    ActionId, BuilderId, Compilation, ConstructionError, LiteralId, OperationId, SymbolId,
    TransformError, ValueId,
};

/// Cloner plus per-slot mappers.
#[derive(Clone, Debug)]
pub struct OperationReplacer {
    cloner: OperationCloner,
    operands: Vec<Mapper<ValueId>>,
    types: Vec<Mapper<TypeId>>,
    literals: Vec<Mapper<LiteralId>>,
    symbols: Vec<Mapper<SymbolId>>,
    builders: Vec<Mapper<BuilderId>>,
    /// Empty mapper: derive the result type of each clone.
    result_types: Vec<Mapper<TypeId>>,
    results: Vec<Mapper<ValueId>>,
}

impl OperationReplacer {
    /// Identity mappers for every slot of `op`.
    pub fn new(comp: &Compilation<'_>, op: OperationId) -> Result<Self, ConstructionError> {
        let cloner = OperationCloner::new(comp, op)?;
        let operation = comp.operation(op);
        let slots = operation.slots();
        Ok(OperationReplacer {
            cloner,
            operands: slots.operands.iter().map(|&v| Mapper::identity(v)).collect(),
            types: slots.types.iter().map(|&t| Mapper::identity(t)).collect(),
            literals: slots.literals.iter().map(|&l| Mapper::identity(l)).collect(),
            symbols: slots.symbols.iter().map(|&s| Mapper::identity(s)).collect(),
            builders: slots.builders.iter().map(|&b| Mapper::identity(b)).collect(),
            result_types: vec![Mapper::new(); operation.num_results()],
            results: vec![Mapper::new(); operation.num_results()],
        })
    }

    pub fn operation(&self) -> OperationId {
        self.cloner.original()
    }

    pub fn action(&self) -> ActionId {
        self.cloner.action()
    }

    pub fn cloner(&self) -> &OperationCloner {
        &self.cloner
    }

    // === Mapper access ===

    pub fn num_operands(&self) -> usize {
        self.operands.len()
    }

    pub fn operand_mapper(&self, i: usize) -> Option<&Mapper<ValueId>> {
        self.operands.get(i)
    }

    pub fn set_operand_mapper(&mut self, i: usize, m: Mapper<ValueId>) {
        if let Some(slot) = self.operands.get_mut(i) {
            *slot = m;
        }
    }

    pub fn type_mapper(&self, i: usize) -> Option<&Mapper<TypeId>> {
        self.types.get(i)
    }

    pub fn set_type_mapper(&mut self, i: usize, m: Mapper<TypeId>) {
        if let Some(slot) = self.types.get_mut(i) {
            *slot = m;
        }
    }

    pub fn literal_mapper(&self, i: usize) -> Option<&Mapper<LiteralId>> {
        self.literals.get(i)
    }

    pub fn set_literal_mapper(&mut self, i: usize, m: Mapper<LiteralId>) {
        if let Some(slot) = self.literals.get_mut(i) {
            *slot = m;
        }
    }

    pub fn symbol_mapper(&self, i: usize) -> Option<&Mapper<SymbolId>> {
        self.symbols.get(i)
    }

    pub fn set_symbol_mapper(&mut self, i: usize, m: Mapper<SymbolId>) {
        if let Some(slot) = self.symbols.get_mut(i) {
            *slot = m;
        }
    }

    pub fn builder_mapper(&self, i: usize) -> Option<&Mapper<BuilderId>> {
        self.builders.get(i)
    }

    pub fn set_builder_mapper(&mut self, i: usize, m: Mapper<BuilderId>) {
        if let Some(slot) = self.builders.get_mut(i) {
            *slot = m;
        }
    }

    pub fn result_type_mapper(&self, i: usize) -> Option<&Mapper<TypeId>> {
        self.result_types.get(i)
    }

    /// Pin the types results of successive clones must have.
    pub fn set_result_type_mapper(&mut self, i: usize, m: Mapper<TypeId>) {
        if let Some(slot) = self.result_types.get_mut(i) {
            *slot = m;
        }
    }

    pub fn num_results(&self) -> usize {
        self.results.len()
    }

    /// Replacement values of original result `i` collected so far.
    pub fn result_mapper(&self, i: usize) -> Option<&Mapper<ValueId>> {
        self.results.get(i)
    }

    /// Record the replacement values of original result `i` directly (for
    /// expanders that do not clone).
    pub fn set_result_mapper(&mut self, i: usize, m: Mapper<ValueId>) {
        if let Some(slot) = self.results.get_mut(i) {
            *slot = m;
        }
    }

    /// Check if any slot maps to something other than the original.
    pub fn changes_anything(&self, comp: &Compilation<'_>) -> bool {
        let op = comp.operation(self.operation());
        let slots = op.slots();
        self.operands.iter().zip(&slots.operands).any(|(m, &v)| !m.is_identity_of(v))
            || self.types.iter().zip(&slots.types).any(|(m, &t)| !m.is_identity_of(t))
            || self.literals.iter().zip(&slots.literals).any(|(m, &l)| !m.is_identity_of(l))
            || self.symbols.iter().zip(&slots.symbols).any(|(m, &s)| !m.is_identity_of(s))
            || self.builders.iter().zip(&slots.builders).any(|(m, &b)| !m.is_identity_of(b))
            || self
                .result_types
                .iter()
                .zip(op.results())
                .any(|(m, &r)| !m.is_empty() && !m.is_identity_of(comp.value_type(r)))
    }

    // === Cloning ===

    /// Number of clones: the widest mapper.
    pub fn num_maps(&self) -> usize {
        self.sizes().into_iter().max().unwrap_or(1).max(1)
    }

    fn sizes(&self) -> SmallVec<[usize; 8]> {
        let mut sizes = SmallVec::new();
        sizes.extend(self.operands.iter().map(Mapper::size));
        sizes.extend(self.types.iter().map(Mapper::size));
        sizes.extend(self.literals.iter().map(Mapper::size));
        sizes.extend(self.symbols.iter().map(Mapper::size));
        sizes.extend(self.builders.iter().map(Mapper::size));
        sizes.extend(self.result_types.iter().filter(|m| !m.is_empty()).map(Mapper::size));
        sizes
    }

    /// `num_maps`, after checking every mapper has size 1 or `num_maps`.
    pub fn check_sizes(&self, comp: &Compilation<'_>) -> Result<usize, TransformError> {
        let n = self.num_maps();
        let sizes = self.sizes();
        if sizes.iter().any(|&s| s != 1 && s != n) {
            return Err(TransformError::MismatchedExplosion {
                action: comp.action_name(self.action()).to_owned(),
                sizes: sizes.into_vec(),
                expected: n,
            });
        }
        Ok(n)
    }

    /// Rewind every mapper.
    pub fn start(&mut self) {
        self.operands.iter_mut().for_each(Mapper::start);
        self.types.iter_mut().for_each(Mapper::start);
        self.literals.iter_mut().for_each(Mapper::start);
        self.symbols.iter_mut().for_each(Mapper::start);
        self.builders.iter_mut().for_each(Mapper::start);
        self.result_types.iter_mut().for_each(Mapper::start);
    }

    /// Advance every mapper once and append the resulting clone to
    /// `parent`.
    pub fn clone_next(
        &mut self,
        comp: &mut Compilation<'_>,
        parent: BuilderId,
    ) -> Result<OperationId, TransformError> {
        for (i, m) in self.operands.iter_mut().enumerate() {
            if let Some(v) = m.next() {
                self.cloner.change_operand(i, v);
            }
        }
        for (i, m) in self.types.iter_mut().enumerate() {
            if let Some(t) = m.next() {
                self.cloner.change_type(i, t);
            }
        }
        for (i, m) in self.literals.iter_mut().enumerate() {
            if let Some(l) = m.next() {
                self.cloner.change_literal(i, l);
            }
        }
        for (i, m) in self.symbols.iter_mut().enumerate() {
            if let Some(s) = m.next() {
                self.cloner.change_symbol(i, s);
            }
        }
        for (i, m) in self.builders.iter_mut().enumerate() {
            if let Some(b) = m.next() {
                self.cloner.change_builder(i, b);
            }
        }
        let mut names: SmallVec<[(String, u64); 1]> = SmallVec::new();
        for (i, m) in self.result_types.iter_mut().enumerate() {
            let cursor = m.size().max(1);
            let index = self.results[i].size() % cursor;
            names.push(
                m.entry(index)
                    .map(|e| (e.name.clone(), e.offset))
                    .unwrap_or_default(),
            );
            if let Some(t) = m.next() {
                self.cloner.change_result(i, t);
            }
        }

        let clone = self.cloner.clone_into(comp, parent)?;
        let results: SmallVec<[ValueId; 1]> = comp.operation(clone).results().iter().copied().collect();
        for (i, r) in results.into_iter().enumerate() {
            if let Some(m) = self.results.get_mut(i) {
                let (name, offset) = names.get(i).cloned().unwrap_or_default();
                m.add_named(r, name, offset);
            }
        }
        Ok(clone)
    }

    /// Clone `num_maps` times into `parent`.
    pub fn clone_all(
        &mut self,
        comp: &mut Compilation<'_>,
        parent: BuilderId,
    ) -> Result<SmallVec<[OperationId; 2]>, TransformError> {
        let n = self.check_sizes(comp)?;
        self.start();
        (0..n).map(|_| self.clone_next(comp, parent)).collect()
    }
}

#[cfg(test)]
mod tests;
