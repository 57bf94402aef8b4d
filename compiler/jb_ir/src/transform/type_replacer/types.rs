//! Phase A: what becomes of each type.

use jb_types::{Type, TypeFlags, TypeId, TypeKind};
use smallvec::SmallVec;

use super::TypeReplacer;
use crate::transform::Mapper;
use crate::{ensure_sufficient_stack, Compilation, TransformError};

/// The fate of one type.
#[derive(Clone, Debug)]
pub(super) struct Decision {
    /// Types a value of this type becomes (one entry unless exploded).
    pub components: Mapper<TypeId>,
    /// Type used where the value lives in memory: pointer bases and
    /// composite fields.
    pub memory: TypeId,
    pub exploded: bool,
    pub changed: bool,
    /// Fields of `memory`, aligned with `components` when exploded.
    pub fields: SmallVec<[TypeId; 4]>,
}

impl Decision {
    pub fn identity(ty: TypeId) -> Self {
        Decision {
            components: Mapper::identity(ty),
            memory: ty,
            exploded: false,
            changed: false,
            fields: SmallVec::new(),
        }
    }

    fn replaced(new: TypeId) -> Self {
        Decision {
            components: Mapper::identity(new),
            memory: new,
            exploded: false,
            changed: true,
            fields: SmallVec::new(),
        }
    }
}

/// A field of a composite being rebuilt.
struct NewField {
    name: String,
    ty: TypeId,
    offset: u64,
}

impl TypeReplacer {
    /// Decide `ty`, deciding what it is composed of first.
    pub(super) fn decide(
        &mut self,
        comp: &mut Compilation<'_>,
        ty: TypeId,
    ) -> Result<Decision, TransformError> {
        if let Some(d) = self.decisions.get(&ty) {
            return Ok(d.clone());
        }
        let d = ensure_sufficient_stack(|| self.decide_uncached(comp, ty))?;
        self.decisions.insert(ty, d.clone());
        Ok(d)
    }

    fn decide_uncached(
        &mut self,
        comp: &mut Compilation<'_>,
        ty: TypeId,
    ) -> Result<Decision, TransformError> {
        if let Some(&new) = self.replace.get(&ty) {
            return Ok(Decision::replaced(new));
        }
        let entry = comp.types().dict().get(ty)?.clone();
        let exploding = self.explode.contains(&ty);
        match entry.kind() {
            TypeKind::Primitive(_) | TypeKind::Function { .. } if exploding => {
                Err(TransformError::NotExplodable(ty))
            }
            TypeKind::Primitive(_) => Ok(Decision::identity(ty)),
            TypeKind::Field { owner, .. } => {
                self.decide(comp, *owner)?;
                Ok(Decision::identity(ty))
            }
            TypeKind::Pointer { base } => {
                if exploding {
                    return Err(TransformError::NotExplodable(ty));
                }
                self.decide_pointer(comp, ty, *base)
            }
            TypeKind::Struct { .. } | TypeKind::Union { .. } => {
                if comp.types().dict().is_open(ty) {
                    return if exploding {
                        Err(TransformError::NotExplodable(ty))
                    } else {
                        Ok(Decision::identity(ty))
                    };
                }
                self.decide_composite(comp, &entry)
            }
            TypeKind::Function {
                return_type,
                params,
            } => self.decide_function(comp, ty, *return_type, params),
            TypeKind::Dynamic => self.decide_dynamic(comp, &entry),
        }
    }

    fn decide_pointer(
        &mut self,
        comp: &mut Compilation<'_>,
        ty: TypeId,
        base: TypeId,
    ) -> Result<Decision, TransformError> {
        if self.in_progress.contains(&base) {
            self.provisional.entry(base).or_default().push(ty);
            return Ok(Decision::identity(ty));
        }
        let bd = self.decide(comp, base)?;
        if bd.memory == base {
            return Ok(Decision::identity(ty));
        }
        let ptr = comp.types_mut().pointer_to(bd.memory)?;
        self.schedule_removal(ty);
        Ok(Decision::replaced(ptr))
    }

    fn decide_composite(
        &mut self,
        comp: &mut Compilation<'_>,
        entry: &Type,
    ) -> Result<Decision, TransformError> {
        let ty = entry.id();
        let union = entry.flags().contains(TypeFlags::IS_UNION);

        self.in_progress.insert(ty);
        let mut new_fields: Vec<NewField> = Vec::new();
        let mut origins: Vec<(TypeId, std::ops::Range<usize>)> = Vec::new();
        let mut changed = false;
        for &field in entry.fields() {
            let (_, field_type, offset) = comp
                .types()
                .dict()
                .get(field)?
                .field_info()
                .ok_or(TransformError::NotExplodable(field))?;
            let field_name = comp.types().dict().name_of(field).to_owned();
            let fd = self.decide(comp, field_type)?;
            let start = new_fields.len();
            if fd.exploded {
                if union {
                    self.in_progress.remove(&ty);
                    return Err(TransformError::UnsupportedExplosion {
                        action: entry.name().to_owned(),
                        reason: format!("union field `{field_name}` has an exploded type"),
                    });
                }
                for e in fd.components.entries() {
                    new_fields.push(NewField {
                        name: format!("{field_name}.{}", e.name),
                        ty: e.item,
                        offset: offset + e.offset,
                    });
                }
                changed = true;
            } else {
                changed |= fd.memory != field_type;
                new_fields.push(NewField {
                    name: field_name,
                    ty: fd.memory,
                    offset,
                });
            }
            origins.push((field, start..new_fields.len()));
        }
        self.in_progress.remove(&ty);

        let memory = if changed {
            if self.provisional.get(&ty).is_some_and(|p| !p.is_empty()) {
                return Err(TransformError::RecursiveType(ty));
            }
            let types = comp.types_mut();
            let rebuilt = if union {
                types.declare_union(entry.name())
            } else {
                types.declare_struct(entry.name())
            };
            let mut ids = Vec::with_capacity(new_fields.len());
            for f in &new_fields {
                ids.push(types.add_field(rebuilt, f.name.as_str(), f.ty, f.offset)?);
            }
            types.close(rebuilt, entry.size())?;
            for (field, range) in origins {
                let mut m = Mapper::new();
                for i in range {
                    m.add_named(ids[i], new_fields[i].name.as_str(), new_fields[i].offset);
                }
                self.field_map.insert(field, m);
            }
            self.schedule_removal(ty);
            rebuilt
        } else {
            for (field, range) in origins {
                let mut m = Mapper::new();
                if let Some(f) = new_fields.get(range.start) {
                    m.add_named(field, f.name.as_str(), f.offset);
                }
                self.field_map.insert(field, m);
            }
            ty
        };
        self.provisional.remove(&ty);

        if !self.explode.contains(&ty) {
            return Ok(if changed {
                Decision::replaced(memory)
            } else {
                Decision::identity(ty)
            });
        }
        if union {
            return Err(TransformError::NotExplodable(ty));
        }
        let fields: SmallVec<[TypeId; 4]> =
            comp.types().dict().get(memory)?.fields().iter().copied().collect();
        Ok(Decision {
            components: components_of_fields(comp, &fields)?,
            memory,
            exploded: true,
            changed: true,
            fields,
        })
    }

    fn decide_function(
        &mut self,
        comp: &mut Compilation<'_>,
        ty: TypeId,
        return_type: TypeId,
        params: &[TypeId],
    ) -> Result<Decision, TransformError> {
        let rd = self.decide(comp, return_type)?;
        if rd.exploded {
            return Err(TransformError::UnsupportedExplosion {
                action: comp.types().dict().name_of(ty).to_owned(),
                reason: format!(
                    "return type `{}` is exploded",
                    comp.types().dict().name_of(return_type)
                ),
            });
        }
        let mut changed = rd.changed;
        let mut new_params: SmallVec<[TypeId; 4]> = SmallVec::new();
        for &p in params {
            let pd = self.decide(comp, p)?;
            changed |= pd.changed;
            new_params.extend(pd.components.items());
        }
        if !changed {
            return Ok(Decision::identity(ty));
        }
        let rebuilt = comp.types_mut().function_type(rd.memory, &new_params)?;
        self.schedule_removal(ty);
        Ok(Decision::replaced(rebuilt))
    }

    fn decide_dynamic(
        &mut self,
        comp: &mut Compilation<'_>,
        entry: &Type,
    ) -> Result<Decision, TransformError> {
        let ty = entry.id();
        let layout = entry.layout().ok_or(TransformError::NotExplodable(ty))?;
        let ld = self.decide(comp, layout)?;
        if self.explode.contains(&ty) {
            let fields: SmallVec<[TypeId; 4]> =
                comp.types().dict().get(ld.memory)?.fields().iter().copied().collect();
            self.schedule_removal(ty);
            return Ok(Decision {
                components: components_of_fields(comp, &fields)?,
                memory: ld.memory,
                exploded: true,
                changed: true,
                fields,
            });
        }
        if ld.memory == layout {
            return Ok(Decision::identity(ty));
        }
        let rebuilt = comp
            .types_mut()
            .define_dynamic(entry.name(), entry.size(), ld.memory)?;
        self.schedule_removal(ty);
        Ok(Decision::replaced(rebuilt))
    }
}

/// One named component per field, in field order.
fn components_of_fields(
    comp: &Compilation<'_>,
    fields: &[TypeId],
) -> Result<Mapper<TypeId>, TransformError> {
    let mut m = Mapper::new();
    for &f in fields {
        let field = comp.types().dict().get(f)?;
        if let Some((_, field_type, offset)) = field.field_info() {
            m.add_named(field_type, field.name(), offset);
        }
    }
    Ok(m)
}
