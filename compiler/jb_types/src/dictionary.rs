//! Type dictionary: the per-compilation registry of [`Type`]s.
//!
//! Ids are assigned from a monotonic counter (the length of the entry
//! table) and never reused. Removing a type only detaches it from
//! enumeration and lookup; references that still name it are a caller bug.
//!
//! # Linking
//!
//! [`TypeDictionary::linked`] starts a child dictionary pre-populated with
//! copies of the parent's entries. The child continues assigning ids where
//! the parent left off and never writes back to the parent.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::{PrimitiveKind, Type, TypeError, TypeFlags, TypeId, TypeKind};

/// Structural key for memoized function types.
type SignatureKey = (TypeId, SmallVec<[TypeId; 4]>);

/// Registry of types for one compiler or compilation.
#[derive(Clone, Debug)]
pub struct TypeDictionary {
    name: String,
    /// Entry per id; `None` once removed.
    entries: Vec<Option<Type>>,
    /// Composites still accepting fields.
    open: FxHashSet<TypeId>,
    /// `base -> PointerTo(base)`.
    pointers: FxHashMap<TypeId, TypeId>,
    /// `(return, params) -> function type`.
    signatures: FxHashMap<SignatureKey, TypeId>,
    /// Name of the dictionary this one was linked from.
    linked_from: Option<String>,
}

impl TypeDictionary {
    /// Create a dictionary holding only the fixed primitive types.
    pub fn new(name: impl Into<String>) -> Self {
        let mut dict = TypeDictionary {
            name: name.into(),
            entries: Vec::with_capacity(64),
            open: FxHashSet::default(),
            pointers: FxHashMap::default(),
            signatures: FxHashMap::default(),
            linked_from: None,
        };
        for prim in PrimitiveKind::ALL {
            let id = dict.push(
                prim.name().to_owned(),
                prim.size_bits(),
                TypeKind::Primitive(prim),
                None,
            );
            debug_assert_eq!(id, prim.id());
        }
        dict
    }

    /// Create a dictionary that starts with copies of `parent`'s entries.
    pub fn linked(parent: &TypeDictionary, name: impl Into<String>) -> Self {
        TypeDictionary {
            name: name.into(),
            entries: parent.entries.clone(),
            open: parent.open.clone(),
            pointers: parent.pointers.clone(),
            signatures: parent.signatures.clone(),
            linked_from: Some(parent.name.clone()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the parent this dictionary was linked from.
    pub fn linked_from(&self) -> Option<&str> {
        self.linked_from.as_deref()
    }

    // === Lookup ===

    /// Look up a live type.
    #[inline]
    pub fn lookup(&self, id: TypeId) -> Option<&Type> {
        self.entries.get(id.index()).and_then(Option::as_ref)
    }

    /// Look up a live type, failing with [`TypeError::UnknownType`].
    #[inline]
    pub fn get(&self, id: TypeId) -> Result<&Type, TypeError> {
        self.lookup(id).ok_or(TypeError::UnknownType(id))
    }

    #[inline]
    pub fn contains(&self, id: TypeId) -> bool {
        self.lookup(id).is_some()
    }

    /// Name of a type, or `"<removed>"` for unknown ids.
    pub fn name_of(&self, id: TypeId) -> &str {
        self.lookup(id).map_or("<removed>", Type::name)
    }

    /// Flags of a type (empty for unknown ids).
    pub fn flags(&self, id: TypeId) -> TypeFlags {
        self.lookup(id).map_or(TypeFlags::empty(), Type::flags)
    }

    /// Size in bits (0 for unknown ids).
    pub fn size_of(&self, id: TypeId) -> u64 {
        self.lookup(id).map_or(0, Type::size)
    }

    /// First live type with the given name.
    pub fn by_name(&self, name: &str) -> Option<TypeId> {
        self.iter().find(|t| t.name() == name).map(Type::id)
    }

    /// Number of live types.
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One past the largest id ever assigned.
    pub fn max_id(&self) -> u32 {
        u32::try_from(self.entries.len()).unwrap_or(u32::MAX)
    }

    /// Live types in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Type> {
        self.entries.iter().filter_map(Option::as_ref)
    }

    /// Snapshot of live ids in id order.
    pub fn ids(&self) -> Vec<TypeId> {
        self.iter().map(Type::id).collect()
    }

    /// Check if a composite is still open.
    pub fn is_open(&self, id: TypeId) -> bool {
        self.open.contains(&id)
    }

    /// Pointer type to `base`, if one was already registered.
    pub fn existing_pointer_to(&self, base: TypeId) -> Option<TypeId> {
        self.pointers.get(&base).copied()
    }

    /// The field of `owner` named `name`.
    pub fn field_named(&self, owner: TypeId, name: &str) -> Result<TypeId, TypeError> {
        let ty = self.expect_composite(owner)?;
        ty.fields()
            .iter()
            .copied()
            .find(|&f| self.name_of(f) == name)
            .ok_or_else(|| TypeError::NoSuchField {
                owner,
                field: name.to_owned(),
            })
    }

    // === Registration ===

    fn push(&mut self, name: String, size: u64, kind: TypeKind, layout: Option<TypeId>) -> TypeId {
        let id = TypeId::from_raw(self.max_id());
        self.entries
            .push(Some(Type::new(id, name, size, kind, layout)));
        id
    }

    /// Pointer to `base`, memoized per base.
    pub fn pointer_to(&mut self, base: TypeId) -> Result<TypeId, TypeError> {
        if let Some(existing) = self.existing_pointer_to(base) {
            return Ok(existing);
        }
        let base_ty = self.get(base)?;
        if !base_ty.flags().contains(TypeFlags::IS_VALUE) {
            return Err(self.wrong_kind(base, "value type"));
        }
        let name = format!("PointerTo({})", base_ty.name());
        let id = self.push(
            name,
            PrimitiveKind::Address.size_bits(),
            TypeKind::Pointer { base },
            None,
        );
        self.pointers.insert(base, id);
        Ok(id)
    }

    /// Declare an open struct; add fields with [`add_field`](Self::add_field)
    /// and finish with [`close`](Self::close).
    pub fn declare_struct(&mut self, name: impl Into<String>) -> TypeId {
        let id = self.push(name.into(), 0, TypeKind::Struct { fields: Vec::new() }, None);
        self.open.insert(id);
        id
    }

    /// Declare an open union.
    pub fn declare_union(&mut self, name: impl Into<String>) -> TypeId {
        let id = self.push(name.into(), 0, TypeKind::Union { fields: Vec::new() }, None);
        self.open.insert(id);
        id
    }

    /// Add a field to an open composite. Returns the new field type.
    pub fn add_field(
        &mut self,
        owner: TypeId,
        name: impl Into<String>,
        field_type: TypeId,
        offset: u64,
    ) -> Result<TypeId, TypeError> {
        let name = name.into();
        self.expect_composite(owner)?;
        if !self.is_open(owner) {
            return Err(TypeError::AlreadyClosed(owner));
        }
        if field_type == owner {
            return Err(TypeError::SelfContaining(owner));
        }
        let fty = self.get(field_type)?;
        if !fty.flags().contains(TypeFlags::IS_VALUE) {
            return Err(self.wrong_kind(field_type, "value type"));
        }
        if self.is_open(field_type) {
            return Err(TypeError::StillOpen(field_type));
        }
        if self.field_named(owner, &name).is_ok() {
            return Err(TypeError::DuplicateField { owner, field: name });
        }
        let size = fty.size();
        let field = self.push(
            name,
            size,
            TypeKind::Field {
                owner,
                field_type,
                offset,
            },
            None,
        );
        if let Some(Some(ty)) = self.entries.get_mut(owner.index()) {
            if let TypeKind::Struct { fields } | TypeKind::Union { fields } = &mut ty.kind {
                fields.push(field);
            }
        }
        Ok(field)
    }

    /// Close a composite. The recorded size is at least the extent of its
    /// fields.
    pub fn close(&mut self, owner: TypeId, size: u64) -> Result<(), TypeError> {
        let extent = {
            let ty = self.expect_composite(owner)?;
            if !self.is_open(owner) {
                return Err(TypeError::AlreadyClosed(owner));
            }
            ty.fields()
                .iter()
                .filter_map(|&f| self.lookup(f))
                .filter_map(|f| f.field_info().map(|(_, _, off)| off + f.size()))
                .max()
                .unwrap_or(0)
        };
        self.open.remove(&owner);
        if let Some(Some(ty)) = self.entries.get_mut(owner.index()) {
            ty.size = size.max(extent);
        }
        Ok(())
    }

    /// Declare, populate and close a struct in one step.
    pub fn define_struct(
        &mut self,
        name: impl Into<String>,
        size: u64,
        fields: &[(&str, TypeId, u64)],
    ) -> Result<TypeId, TypeError> {
        let id = self.declare_struct(name);
        for &(fname, fty, off) in fields {
            self.add_field(id, fname, fty, off)?;
        }
        self.close(id, size)?;
        Ok(id)
    }

    /// Declare, populate and close a union in one step.
    pub fn define_union(
        &mut self,
        name: impl Into<String>,
        size: u64,
        fields: &[(&str, TypeId)],
    ) -> Result<TypeId, TypeError> {
        let id = self.declare_union(name);
        for &(fname, fty) in fields {
            self.add_field(id, fname, fty, 0)?;
        }
        self.close(id, size)?;
        Ok(id)
    }

    /// Function type `(params) -> return_type`, memoized structurally.
    pub fn function_type(
        &mut self,
        return_type: TypeId,
        params: &[TypeId],
    ) -> Result<TypeId, TypeError> {
        let key: SignatureKey = (return_type, params.iter().copied().collect());
        if let Some(&existing) = self.signatures.get(&key) {
            return Ok(existing);
        }
        let mut name = String::from("(");
        for (i, &p) in params.iter().enumerate() {
            if i > 0 {
                name.push_str(", ");
            }
            name.push_str(self.get(p)?.name());
        }
        name.push_str(") -> ");
        name.push_str(self.get(return_type)?.name());
        let id = self.push(
            name,
            PrimitiveKind::Address.size_bits(),
            TypeKind::Function {
                return_type,
                params: params.to_vec(),
            },
            None,
        );
        self.signatures.insert(key, id);
        Ok(id)
    }

    /// Register an extension-defined type with its layout struct.
    pub fn define_dynamic(
        &mut self,
        name: impl Into<String>,
        size: u64,
        layout: TypeId,
    ) -> Result<TypeId, TypeError> {
        let name = name.into();
        let valid = self
            .lookup(layout)
            .is_some_and(|l| matches!(l.kind(), TypeKind::Struct { .. }))
            && !self.is_open(layout);
        if !valid {
            return Err(TypeError::InvalidLayout { name, layout });
        }
        let size = size.max(self.size_of(layout));
        Ok(self.push(name, size, TypeKind::Dynamic, Some(layout)))
    }

    // === Removal ===

    /// Detach a type from the dictionary. Removing a composite also removes
    /// its field types. Returns the removed record.
    pub fn remove(&mut self, id: TypeId) -> Result<Type, TypeError> {
        let ty = self
            .entries
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(TypeError::UnknownType(id))?;
        for &field in ty.fields() {
            if let Some(slot) = self.entries.get_mut(field.index()) {
                *slot = None;
            }
        }
        self.open.remove(&id);
        self.pointers.retain(|&base, &mut ptr| base != id && ptr != id);
        self.signatures.retain(|_, &mut f| f != id);
        Ok(ty)
    }

    // === Helpers ===

    fn expect_composite(&self, id: TypeId) -> Result<&Type, TypeError> {
        let ty = self.get(id)?;
        if ty.flags().contains(TypeFlags::IS_COMPOSITE) {
            Ok(ty)
        } else {
            Err(self.wrong_kind(id, "struct or union"))
        }
    }

    fn wrong_kind(&self, id: TypeId, expected: &'static str) -> TypeError {
        match self.lookup(id) {
            Some(ty) => TypeError::WrongKind {
                ty: id,
                name: ty.name().to_owned(),
                expected,
                found: ty.kind().category(),
            },
            None => TypeError::UnknownType(id),
        }
    }
}
