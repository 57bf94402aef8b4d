//! Symbols and their dictionary.
//!
//! Symbols name locals, parameters and functions. Names need not be unique;
//! ids are. Name resolution goes through [`Context`](crate::Context).

use std::fmt;

use jb_types::TypeId;

use crate::ids::next_raw;
use crate::{ConstructionError, SymbolId};

/// What a symbol stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Local,
    /// Parameter of the compiled function; its position is its index in
    /// `Compilation::parameters`.
    Parameter,
    /// A callable function; the symbol's type is its function type.
    Function,
}

/// A named, typed entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Symbol {
    id: SymbolId,
    name: String,
    ty: TypeId,
    kind: SymbolKind,
}

impl Symbol {
    #[inline]
    pub fn id(&self) -> SymbolId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn ty(&self) -> TypeId {
        self.ty
    }

    #[inline]
    pub fn kind(&self) -> SymbolKind {
        self.kind
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \"{}\"", self.id, self.name)
    }
}

/// Append-only symbol registry.
#[derive(Clone, Debug, Default)]
pub struct SymbolDictionary {
    entries: Vec<Option<Symbol>>,
    linked_from: Option<String>,
}

impl SymbolDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with copies of `parent`'s entries; ids continue after them.
    pub fn linked(parent: &SymbolDictionary, parent_name: impl Into<String>) -> Self {
        SymbolDictionary {
            entries: parent.entries.clone(),
            linked_from: Some(parent_name.into()),
        }
    }

    pub fn linked_from(&self) -> Option<&str> {
        self.linked_from.as_deref()
    }

    pub fn register(&mut self, name: impl Into<String>, ty: TypeId, kind: SymbolKind) -> SymbolId {
        let id = SymbolId::new(next_raw(self.entries.len(), "symbol"));
        self.entries.push(Some(Symbol {
            id,
            name: name.into(),
            ty,
            kind,
        }));
        id
    }

    #[inline]
    pub fn lookup(&self, id: SymbolId) -> Option<&Symbol> {
        self.entries.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get(&self, id: SymbolId) -> Result<&Symbol, ConstructionError> {
        self.lookup(id)
            .ok_or_else(|| ConstructionError::unknown("symbol", id.raw()))
    }

    /// Detach a symbol. Its id is never reused.
    pub fn remove(&mut self, id: SymbolId) -> Option<Symbol> {
        self.entries.get_mut(id.index()).and_then(Option::take)
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.entries.iter().filter_map(Option::as_ref)
    }

    /// Snapshot of live ids in id order.
    pub fn ids(&self) -> Vec<SymbolId> {
        self.iter().map(Symbol::id).collect()
    }
}
