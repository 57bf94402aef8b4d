//! Rewriting symbols, the return type and literals from the type decisions.

use jb_types::{TypeFlags, TypeId};

use super::TypeReplacer;
use crate::transform::Mapper;
use crate::{resize_int_bytes, BuiltinOp, Compilation, LiteralBytes, TransformError};

impl TypeReplacer {
    /// An exploded symbol `p` becomes one symbol per component, named
    /// `p.<field path>`; a replaced one keeps its name.
    pub(super) fn rewrite_symbols(&mut self, comp: &mut Compilation<'_>) -> Result<(), TransformError> {
        for sym in comp.symbols().ids() {
            let symbol = comp.symbol(sym)?.clone();
            let d = self.decision_of(symbol.ty());
            if !d.changed {
                continue;
            }
            let mut m = Mapper::new();
            let mut replacements = Vec::with_capacity(d.components.size());
            if d.exploded {
                for e in d.components.entries() {
                    let name = format!("{}.{}", symbol.name(), e.name);
                    let new = comp.register_symbol(name, e.item, symbol.kind());
                    m.add_named(new, e.name.as_str(), e.offset);
                    replacements.push(new);
                }
            } else {
                let new = comp.register_symbol(symbol.name().to_owned(), d.memory, symbol.kind());
                m.add(new);
                replacements.push(new);
            }
            comp.replace_symbol(sym, &replacements);
            tracing::trace!(symbol = %symbol, replacements = replacements.len(), "symbol rewritten");
            self.symbol_map.insert(sym, m);
            self.remove_symbols.push(sym);
        }
        Ok(())
    }

    pub(super) fn rewrite_return_type(&mut self, comp: &mut Compilation<'_>) -> Result<(), TransformError> {
        let ty = comp.return_type();
        let d = self.decision_of(ty);
        if d.exploded {
            return Err(TransformError::UnsupportedExplosion {
                action: BuiltinOp::Return.name().to_owned(),
                reason: format!("return type `{}` is exploded", comp.type_name(ty)),
            });
        }
        if d.changed {
            comp.set_return_type(d.memory);
        }
        Ok(())
    }

    /// An exploded literal is split at its components' offsets; a replaced
    /// one keeps its bytes when the sizes agree or is sign-extended or
    /// truncated between integer types.
    pub(super) fn rewrite_literals(&mut self, comp: &mut Compilation<'_>) -> Result<(), TransformError> {
        for lit in comp.literals().ids() {
            let literal = comp.literal(lit)?.clone();
            let ty = literal.ty();
            let d = self.decision_of(ty);
            if !d.changed {
                continue;
            }
            let mut m = Mapper::new();
            if d.exploded {
                for e in d.components.entries() {
                    let start = byte_len(e.offset);
                    let len = byte_len(comp.types().dict().size_of(e.item));
                    let bytes = literal
                        .bytes()
                        .get(start..start.saturating_add(len))
                        .ok_or_else(|| TransformError::LiteralConversion {
                            ty,
                            reason: format!("component `{}` lies outside the literal", e.name),
                        })?;
                    let new = comp.register_literal(e.item, bytes)?;
                    m.add_named(new, e.name.as_str(), e.offset);
                }
            } else {
                let bytes = convert_bytes(comp, literal.bytes(), ty, d.memory)?;
                m.add(comp.register_literal(d.memory, &bytes)?);
            }
            self.literal_map.insert(lit, m);
            self.remove_literals.push(lit);
        }
        Ok(())
    }
}

fn byte_len(bits: u64) -> usize {
    usize::try_from(bits / 8).unwrap_or(usize::MAX)
}

fn convert_bytes(
    comp: &Compilation<'_>,
    bytes: &[u8],
    from: TypeId,
    to: TypeId,
) -> Result<LiteralBytes, TransformError> {
    let dict = comp.types().dict();
    let len = byte_len(dict.size_of(to));
    if bytes.len() == len {
        return Ok(bytes.iter().copied().collect());
    }
    let integers =
        dict.flags(from).contains(TypeFlags::IS_INTEGER) && dict.flags(to).contains(TypeFlags::IS_INTEGER);
    if integers {
        return Ok(resize_int_bytes(bytes, len));
    }
    Err(TransformError::LiteralConversion {
        ty: from,
        reason: format!(
            "{} bytes do not fit `{}` ({len} bytes)",
            bytes.len(),
            dict.name_of(to)
        ),
    })
}
