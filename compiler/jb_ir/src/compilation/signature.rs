//! Function signature: return type, parameters, locals and callees.

use jb_types::{TypeFlags, TypeId};

use crate::{Compilation, ConstructionError, ContextId, SymbolId, SymbolKind};

impl Compilation<'_> {
    /// Set the type `Return` must produce. `NO_TYPE` for no value.
    pub fn define_return_type(&mut self, ty: TypeId) -> Result<(), ConstructionError> {
        if !ty.is_no_type() {
            self.check_value_type(ty, "return type")?;
        }
        self.return_type = ty;
        Ok(())
    }

    /// Append a parameter; its position is the number of parameters defined
    /// before it.
    pub fn define_parameter(&mut self, name: &str, ty: TypeId) -> Result<SymbolId, ConstructionError> {
        self.check_value_type(ty, name)?;
        let sym = self.declare(self.root_context(), name, ty, SymbolKind::Parameter);
        self.parameters.push(sym);
        Ok(sym)
    }

    /// A local in the root context.
    pub fn define_local(&mut self, name: &str, ty: TypeId) -> Result<SymbolId, ConstructionError> {
        self.define_local_in(self.root_context(), name, ty)
    }

    /// A local visible from `ctx` and its descendants.
    pub fn define_local_in(
        &mut self,
        ctx: ContextId,
        name: &str,
        ty: TypeId,
    ) -> Result<SymbolId, ConstructionError> {
        self.context(ctx)?;
        self.check_value_type(ty, name)?;
        Ok(self.declare(ctx, name, ty, SymbolKind::Local))
    }

    /// A callable function symbol with a structurally interned signature.
    pub fn define_function(
        &mut self,
        name: &str,
        return_type: TypeId,
        params: &[TypeId],
    ) -> Result<SymbolId, ConstructionError> {
        let ty = self.types.function_type(return_type, params)?;
        Ok(self.declare(self.root_context(), name, ty, SymbolKind::Function))
    }

    fn declare(&mut self, ctx: ContextId, name: &str, ty: TypeId, kind: SymbolKind) -> SymbolId {
        let sym = self.symbols.register(name, ty, kind);
        self.contexts[ctx.index()].bind(name.to_owned(), sym);
        sym
    }

    fn check_value_type(&self, ty: TypeId, what: &str) -> Result<(), ConstructionError> {
        let entry = self.types.dict().get(ty)?;
        if entry.flags().contains(TypeFlags::IS_VALUE) {
            Ok(())
        } else {
            Err(ConstructionError::SlotTypeMismatch {
                action: "Signature".to_owned(),
                slot: what.to_owned(),
                actual: entry.name().to_owned(),
                expected: "a value type".to_owned(),
            })
        }
    }

    // === Rewriting (type replacement) ===

    /// Register a symbol without binding it to a name.
    pub(crate) fn register_symbol(&mut self, name: String, ty: TypeId, kind: SymbolKind) -> SymbolId {
        self.symbols.register(name, ty, kind)
    }

    /// Swap `old` for `new` in every scope that names it and in the
    /// parameter list (where `new` keeps `old`'s position, in order).
    pub(crate) fn replace_symbol(&mut self, old: SymbolId, new: &[SymbolId]) {
        for ctx in &mut self.contexts {
            if ctx.names.values().any(|&s| s == old) {
                ctx.unbind(old);
                for &s in new {
                    if let Some(sym) = self.symbols.lookup(s) {
                        ctx.bind(sym.name().to_owned(), s);
                    }
                }
            }
        }
        if let Some(pos) = self.parameters.iter().position(|&p| p == old) {
            self.parameters.splice(pos..=pos, new.iter().copied());
        }
    }

    /// Drop a superseded symbol from the dictionary.
    pub(crate) fn remove_symbol(&mut self, sym: SymbolId) {
        self.symbols.remove(sym);
    }

    pub(crate) fn remove_literal(&mut self, lit: crate::LiteralId) {
        self.literals.remove(lit);
    }

    pub(crate) fn set_return_type(&mut self, ty: TypeId) {
        self.return_type = ty;
    }
}
