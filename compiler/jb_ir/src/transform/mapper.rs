//! Cyclic slot mappers.
//!
//! A [`Mapper`] holds the replacements for one original slot entry. Size 1
//! means "one replacement" (possibly the original itself); size N means the
//! operation is cloned N times and clone `k` takes entry `k`. The cursor
//! wraps, so a size-1 mapper hands out the same item to every clone.

use smallvec::SmallVec;

/// One replacement: the item plus the field path and bit offset it stands
/// for inside the original.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MapperEntry<T> {
    pub item: T,
    /// `.`-joined field path; empty for a whole-value replacement.
    pub name: String,
    /// Bit offset inside the original value.
    pub offset: u64,
}

/// Cyclic cursor over replacement items.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mapper<T> {
    entries: SmallVec<[MapperEntry<T>; 2]>,
    cursor: usize,
}

impl<T> Default for Mapper<T> {
    fn default() -> Self {
        Mapper {
            entries: SmallVec::new(),
            cursor: 0,
        }
    }
}

impl<T: Copy + PartialEq> Mapper<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size-1 mapper that keeps `item`.
    pub fn identity(item: T) -> Self {
        let mut m = Self::new();
        m.add(item);
        m
    }

    pub fn add(&mut self, item: T) {
        self.add_named(item, String::new(), 0);
    }

    pub fn add_named(&mut self, item: T, name: impl Into<String>, offset: u64) {
        self.entries.push(MapperEntry {
            item,
            name: name.into(),
            offset,
        });
    }

    /// Rewind the cursor.
    pub fn start(&mut self) {
        self.cursor = 0;
    }

    /// The item under the cursor; advances and wraps around. `None` only
    /// for an empty mapper.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<T> {
        let entry = self.entries.get(self.cursor)?;
        let item = entry.item;
        self.cursor = (self.cursor + 1) % self.entries.len();
        Some(item)
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn item(&self, i: usize) -> Option<T> {
        self.entries.get(i).map(|e| e.item)
    }

    pub fn entry(&self, i: usize) -> Option<&MapperEntry<T>> {
        self.entries.get(i)
    }

    pub fn entries(&self) -> &[MapperEntry<T>] {
        &self.entries
    }

    pub fn items(&self) -> impl Iterator<Item = T> + '_ {
        self.entries.iter().map(|e| e.item)
    }

    /// Check if this mapper keeps `original` unchanged.
    pub fn is_identity_of(&self, original: T) -> bool {
        self.entries.len() == 1 && self.entries[0].item == original
    }
}
