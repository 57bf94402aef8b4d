//! The compiler: shared vocabulary, extensions and the compile pipeline.
//!
//! A `Compiler` holds everything compilations share: the base type system
//! (primitives plus whatever extensions register), base symbols and
//! literals, the action registry, per-type expanders and the loaded
//! extensions. Each [`Compilation`] links its own dictionaries to these and
//! never mutates them.
//!
//! # Pipeline
//!
//! [`Compiler::compile`] runs the caller's transformations in order, then
//! the structural verifier (when enabled), then the lowering visitor. The
//! first failure becomes the returned [`ReturnCode`]; later stages never see
//! a graph an earlier stage rejected.

use jb_types::TypeId;
use rustc_hash::FxHashMap;

use crate::transform::{Transformation, Transformer};
use crate::{
    verify, walk, ActionId, ActionRegistry, Compilation, CompilationError, CompilerConfig,
    ConstructionError, DynamicOpSpec, ExpandFn, LiteralDictionary, ReturnCode, SymbolDictionary,
    SymbolId, SymbolKind, TypeSystem, Visitor,
};

/// A loadable bundle of types, rules and actions.
pub trait Extension {
    fn name(&self) -> &str;

    /// Names of extensions that must be loaded first.
    fn requires(&self) -> &[&str] {
        &[]
    }

    /// Add this extension's vocabulary to `compiler`.
    fn register(&mut self, compiler: &mut Compiler) -> Result<(), CompilationError>;
}

/// The single entry point a loadable extension exposes.
pub type ExtensionFactory = fn(&Compiler) -> Box<dyn Extension>;

/// Shared state for a family of compilations.
pub struct Compiler {
    name: String,
    config: CompilerConfig,
    types: TypeSystem<'static>,
    actions: ActionRegistry,
    symbols: SymbolDictionary,
    literals: LiteralDictionary,
    extensions: Vec<Box<dyn Extension>>,
    type_expanders: FxHashMap<TypeId, ExpandFn>,
}

impl Compiler {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, CompilerConfig::default())
    }

    pub fn with_config(name: impl Into<String>, config: CompilerConfig) -> Self {
        let name = name.into();
        Compiler {
            types: TypeSystem::new(name.clone()),
            name,
            config,
            actions: ActionRegistry::new(),
            symbols: SymbolDictionary::new(),
            literals: LiteralDictionary::new(),
            extensions: Vec::new(),
            type_expanders: FxHashMap::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    pub fn types(&self) -> &TypeSystem<'static> {
        &self.types
    }

    /// Base type system; extensions register their types and rules here.
    pub fn types_mut(&mut self) -> &mut TypeSystem<'static> {
        &mut self.types
    }

    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    pub fn symbols(&self) -> &SymbolDictionary {
        &self.symbols
    }

    pub fn literals(&self) -> &LiteralDictionary {
        &self.literals
    }

    pub fn register_dynamic_action(&mut self, spec: DynamicOpSpec) -> Result<ActionId, ConstructionError> {
        self.actions.register(spec)
    }

    /// Expander the type replacer consults for operations touching `ty`.
    pub fn register_type_expander(&mut self, ty: TypeId, expander: ExpandFn) {
        self.type_expanders.insert(ty, expander);
    }

    pub fn type_expander(&self, ty: TypeId) -> Option<&ExpandFn> {
        self.type_expanders.get(&ty)
    }

    /// A function every compilation of this compiler can call.
    pub fn define_function(
        &mut self,
        name: &str,
        return_type: TypeId,
        params: &[TypeId],
    ) -> Result<SymbolId, ConstructionError> {
        let ty = self.types.function_type(return_type, params)?;
        Ok(self.symbols.register(name, ty, SymbolKind::Function))
    }

    // === Extensions ===

    /// Create an extension through its factory and register it. Every
    /// extension it requires must already be loaded.
    pub fn load_extension(&mut self, factory: ExtensionFactory) -> Result<(), CompilationError> {
        let mut ext = factory(self);
        if let Some(missing) = ext.requires().iter().find(|r| !self.has_extension(r)) {
            return Err(CompilationError::new(
                ReturnCode::MissingExtension,
                format!("extension `{}` requires `{missing}`", ext.name()),
            ));
        }
        if self.has_extension(ext.name()) {
            return Ok(());
        }
        ext.register(self)?;
        tracing::debug!(extension = ext.name(), "loaded extension");
        self.extensions.push(ext);
        Ok(())
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.iter().any(|e| e.name() == name)
    }

    pub fn extension(&self, name: &str) -> Option<&dyn Extension> {
        self.extensions
            .iter()
            .find(|e| e.name() == name)
            .map(|e| &**e)
    }

    // === Compile ===

    /// Transform, verify and lower `comp`. The outcome is also recorded on
    /// the compilation.
    pub fn compile(
        &self,
        comp: &mut Compilation<'_>,
        transformations: &mut [&mut dyn Transformation],
        visitor: &mut dyn Visitor,
    ) -> ReturnCode {
        let code = match self.run_pipeline(comp, transformations, visitor) {
            Ok(()) => ReturnCode::Successful,
            Err(err) => {
                tracing::warn!(compilation = comp.name(), code = %err.code, "{}", err.message);
                err.code
            }
        };
        comp.set_return_code(code);
        code
    }

    fn run_pipeline(
        &self,
        comp: &mut Compilation<'_>,
        transformations: &mut [&mut dyn Transformation],
        visitor: &mut dyn Visitor,
    ) -> Result<(), CompilationError> {
        if !std::ptr::eq(comp.compiler(), self) {
            return Err(CompilationError::new(
                ReturnCode::ConstructionFailed,
                format!("compilation `{}` belongs to another compiler", comp.name()),
            ));
        }
        let transformer = Transformer::new(&self.config);
        for t in transformations.iter_mut() {
            let stats = transformer.run(comp, &mut **t)?;
            tracing::debug!(
                transformation = t.name(),
                visited = stats.visited_builders,
                transformed = stats.transformed,
                skipped = stats.skipped,
                "transformation finished"
            );
        }
        if self.config.verify {
            verify(comp)?;
        }
        walk(comp, visitor)
    }
}
