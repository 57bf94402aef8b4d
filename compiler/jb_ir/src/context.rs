//! Lexical scopes.
//!
//! A context maps names to symbols and defers to its parent for names it
//! does not define. Builders carry the context their operations resolve
//! names in.

use rustc_hash::FxHashMap;

use crate::{ContextId, SymbolId};

/// One lexical scope.
#[derive(Clone, Debug)]
pub struct Context {
    pub(crate) id: ContextId,
    pub(crate) name: String,
    pub(crate) parent: Option<ContextId>,
    pub(crate) names: FxHashMap<String, SymbolId>,
}

impl Context {
    pub(crate) fn new(id: ContextId, name: String, parent: Option<ContextId>) -> Self {
        Context {
            id,
            name,
            parent,
            names: FxHashMap::default(),
        }
    }

    #[inline]
    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<ContextId> {
        self.parent
    }

    /// Symbol bound to `name` in this scope only.
    pub fn local(&self, name: &str) -> Option<SymbolId> {
        self.names.get(name).copied()
    }

    /// Symbols defined directly in this scope, sorted by id.
    pub fn symbols(&self) -> Vec<SymbolId> {
        let mut ids: Vec<SymbolId> = self.names.values().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub(crate) fn bind(&mut self, name: String, symbol: SymbolId) {
        self.names.insert(name, symbol);
    }

    /// Drop every name bound to `symbol`.
    pub(crate) fn unbind(&mut self, symbol: SymbolId) {
        self.names.retain(|_, s| *s != symbol);
    }
}
