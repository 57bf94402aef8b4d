//! Typing-rule table.
//!
//! A `TypeGraph` maps `(action, operand types)` to the type the operation
//! produces. It is a lookup table, not a derivation: a tuple that was never
//! registered is an invalid operation. Operations with no result register
//! `NO_TYPE` so that "valid, produces nothing" stays distinguishable from
//! "invalid".
//!
//! Keys come in four forms: unary, binary and ternary operand tuples, and
//! the call form `(action, function type, argument types...)`.
//!
//! A child graph created with [`TypeGraph::linked`] consults its own rules
//! first and then its parent's. The parent is borrowed and never mutated.

use jb_types::TypeId;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{ActionId, ConstructionError};

type CallKey = (ActionId, TypeId, SmallVec<[TypeId; 4]>);

/// Typing rules, optionally layered over a parent table.
#[derive(Clone, Debug, Default)]
pub struct TypeGraph<'p> {
    parent: Option<&'p TypeGraph<'p>>,
    unary: FxHashMap<(ActionId, TypeId), TypeId>,
    binary: FxHashMap<(ActionId, TypeId, TypeId), TypeId>,
    ternary: FxHashMap<(ActionId, TypeId, TypeId, TypeId), TypeId>,
    calls: FxHashMap<CallKey, TypeId>,
}

impl TypeGraph<'static> {
    /// An empty root graph.
    pub fn new() -> Self {
        TypeGraph::default()
    }
}

impl<'p> TypeGraph<'p> {
    /// An empty graph that falls back to `parent`.
    pub fn linked(parent: &'p TypeGraph<'p>) -> Self {
        TypeGraph {
            parent: Some(parent),
            ..TypeGraph::default()
        }
    }

    pub fn parent(&self) -> Option<&'p TypeGraph<'p>> {
        self.parent
    }

    /// Register `action(operands...) -> produces` for one to three operands.
    pub fn register(
        &mut self,
        produces: TypeId,
        action: ActionId,
        operands: &[TypeId],
    ) -> Result<(), ConstructionError> {
        match *operands {
            [a] => {
                self.unary.insert((action, a), produces);
            }
            [a, b] => {
                self.binary.insert((action, a, b), produces);
            }
            [a, b, c] => {
                self.ternary.insert((action, a, b, c), produces);
            }
            _ => {
                return Err(ConstructionError::SlotCount {
                    action: format!("{action}"),
                    slot: "typing operand",
                    expected: "1..=3".to_owned(),
                    actual: operands.len(),
                })
            }
        }
        Ok(())
    }

    /// Register the call form: calling a function of type `function` with
    /// arguments of types `args` produces `produces`.
    pub fn register_call(
        &mut self,
        produces: TypeId,
        action: ActionId,
        function: TypeId,
        args: &[TypeId],
    ) {
        self.calls
            .insert((action, function, args.iter().copied().collect()), produces);
    }

    /// What `action(operands...)` produces, or `None` if no rule matches.
    pub fn produced_type(&self, action: ActionId, operands: &[TypeId]) -> Option<TypeId> {
        let local = match *operands {
            [a] => self.unary.get(&(action, a)),
            [a, b] => self.binary.get(&(action, a, b)),
            [a, b, c] => self.ternary.get(&(action, a, b, c)),
            _ => None,
        };
        local
            .copied()
            .or_else(|| self.parent.and_then(|p| p.produced_type(action, operands)))
    }

    /// What calling a `function` with `args` produces.
    pub fn produced_call_type(
        &self,
        action: ActionId,
        function: TypeId,
        args: &[TypeId],
    ) -> Option<TypeId> {
        let key: CallKey = (action, function, args.iter().copied().collect());
        self.calls.get(&key).copied().or_else(|| {
            self.parent
                .and_then(|p| p.produced_call_type(action, function, args))
        })
    }

    /// Number of rules registered locally (parent excluded).
    pub fn local_rule_count(&self) -> usize {
        self.unary.len() + self.binary.len() + self.ternary.len() + self.calls.len()
    }
}

#[cfg(test)]
mod tests;
