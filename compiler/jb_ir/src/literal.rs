//! Literals and their interning dictionary.
//!
//! A literal is a typed run of little-endian bytes. Registering an equal
//! `(type, bytes)` pair returns the existing id.

use std::fmt;

use jb_types::TypeId;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::ids::next_raw;
use crate::{ConstructionError, LiteralId};

/// Inline storage covers every primitive and small structs.
pub type LiteralBytes = SmallVec<[u8; 16]>;

/// An interned constant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Literal {
    id: LiteralId,
    ty: TypeId,
    bytes: LiteralBytes,
}

impl Literal {
    #[inline]
    pub fn id(&self) -> LiteralId {
        self.id
    }

    #[inline]
    pub fn ty(&self) -> TypeId {
        self.ty
    }

    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The bytes read as a sign-extended integer (at most 8 bytes used).
    pub fn as_i64(&self) -> i64 {
        read_signed(&self.bytes)
    }

    /// The bytes read as a float: 4 bytes as `f32`, otherwise `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self.bytes.len() {
            4 => {
                let raw: [u8; 4] = self.bytes[..4].try_into().ok()?;
                Some(f64::from(f32::from_le_bytes(raw)))
            }
            8 => {
                let raw: [u8; 8] = self.bytes[..8].try_into().ok()?;
                Some(f64::from_le_bytes(raw))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[", self.id)?;
        for (i, b) in self.bytes.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{b:02x}")?;
        }
        f.write_str("]")
    }
}

/// Little-endian encoding of `value` in `size_bits` bits (truncating).
pub fn int_bytes(value: i64, size_bits: u64) -> LiteralBytes {
    let len = usize::try_from(size_bits / 8).unwrap_or(8).min(8);
    value.to_le_bytes()[..len].iter().copied().collect()
}

/// Sign-extend or truncate little-endian integer bytes to `len` bytes.
pub fn resize_int_bytes(bytes: &[u8], len: usize) -> LiteralBytes {
    let fill = if bytes.last().is_some_and(|b| b & 0x80 != 0) {
        0xff
    } else {
        0
    };
    (0..len)
        .map(|i| bytes.get(i).copied().unwrap_or(fill))
        .collect()
}

fn read_signed(bytes: &[u8]) -> i64 {
    let mut raw = [0u8; 8];
    let wide = resize_int_bytes(bytes, 8);
    raw.copy_from_slice(&wide[..8]);
    i64::from_le_bytes(raw)
}

/// Interning registry of literals.
#[derive(Clone, Debug, Default)]
pub struct LiteralDictionary {
    entries: Vec<Option<Literal>>,
    interned: FxHashMap<(TypeId, LiteralBytes), LiteralId>,
    linked_from: Option<String>,
}

impl LiteralDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with copies of `parent`'s entries; ids continue after them.
    pub fn linked(parent: &LiteralDictionary, parent_name: impl Into<String>) -> Self {
        LiteralDictionary {
            entries: parent.entries.clone(),
            interned: parent.interned.clone(),
            linked_from: Some(parent_name.into()),
        }
    }

    pub fn linked_from(&self) -> Option<&str> {
        self.linked_from.as_deref()
    }

    /// Intern `(ty, bytes)`.
    pub fn register(&mut self, ty: TypeId, bytes: &[u8]) -> LiteralId {
        let key = (ty, LiteralBytes::from_slice(bytes));
        if let Some(&id) = self.interned.get(&key) {
            return id;
        }
        let id = LiteralId::new(next_raw(self.entries.len(), "literal"));
        self.entries.push(Some(Literal {
            id,
            ty,
            bytes: key.1.clone(),
        }));
        self.interned.insert(key, id);
        id
    }

    #[inline]
    pub fn lookup(&self, id: LiteralId) -> Option<&Literal> {
        self.entries.get(id.index()).and_then(Option::as_ref)
    }

    pub fn get(&self, id: LiteralId) -> Result<&Literal, ConstructionError> {
        self.lookup(id)
            .ok_or_else(|| ConstructionError::unknown("literal", id.raw()))
    }

    /// Detach a literal. A later registration of the same pair gets a new id.
    pub fn remove(&mut self, id: LiteralId) -> Option<Literal> {
        let lit = self.entries.get_mut(id.index()).and_then(Option::take)?;
        self.interned.remove(&(lit.ty, lit.bytes.clone()));
        Some(lit)
    }

    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = &Literal> {
        self.entries.iter().filter_map(Option::as_ref)
    }

    pub fn ids(&self) -> Vec<LiteralId> {
        self.iter().map(Literal::id).collect()
    }
}

#[cfg(test)]
mod tests;
