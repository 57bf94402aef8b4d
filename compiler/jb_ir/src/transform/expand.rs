//! Built-in expanders and the structured-lowering pass.

use super::{OperationReplacer, Transformation};
use crate::{
    BuilderId, BuiltinOp, Compilation, ConstructionError, OperationId, TransformError, ValueId,
};

/// Run the expander of `replacer`'s operation kind, if it has one.
/// Returns `false` when there is none or it declined.
pub(crate) fn expand_with_kind(
    comp: &mut Compilation<'_>,
    replacer: &mut OperationReplacer,
    scratch: BuilderId,
) -> Result<bool, TransformError> {
    let action = replacer.action();
    if BuiltinOp::from_action(action) == Some(BuiltinOp::ForLoopUp) {
        return crate::ensure_sufficient_stack(|| expand_for_loop_up(comp, replacer, scratch));
    }
    let expander = comp
        .compiler()
        .actions()
        .dynamic(action)
        .and_then(|spec| spec.expander());
    match expander {
        Some(expand) => crate::ensure_sufficient_stack(|| expand(comp, replacer, scratch)),
        None => Ok(false),
    }
}

/// Lower `ForLoopUp` into a labelled test-and-branch loop:
///
/// ```text
/// Store var, initial
/// Label top {
///     v = Load var
///     IfCmpGreaterOrEqual v, last { Goto break }
///     AppendBuilder body
///     Label continue
///     v' = Load var
///     Store var, Add v', bump
///     Goto top
/// }
/// Label break
/// ```
fn expand_for_loop_up(
    comp: &mut Compilation<'_>,
    replacer: &mut OperationReplacer,
    scratch: BuilderId,
) -> Result<bool, TransformError> {
    let single = |i: usize, m: Option<usize>| -> Result<(), TransformError> {
        match m {
            Some(1) => Ok(()),
            _ => Err(TransformError::UnsupportedExplosion {
                action: BuiltinOp::ForLoopUp.name().to_owned(),
                reason: format!("slot {i} maps to several values"),
            }),
        }
    };
    for i in 0..3 {
        single(i, replacer.operand_mapper(i).map(|m| m.size()))?;
    }
    single(3, replacer.symbol_mapper(0).map(|m| m.size()))?;

    let missing = || TransformError::from(ConstructionError::unknown("operation slot", 0));
    let operand = |i: usize| replacer.operand_mapper(i).and_then(|m| m.item(0)).ok_or_else(missing);
    let (initial, last, bump) = (operand(0)?, operand(1)?, operand(2)?);
    let var = replacer.symbol_mapper(0).and_then(|m| m.item(0)).ok_or_else(missing)?;
    let builder = |i: usize| replacer.builder_mapper(i).and_then(|m| m.item(0)).ok_or_else(missing);
    let (body, break_to, continue_to) = (builder(0)?, builder(1)?, builder(2)?);

    comp.store(scratch, var, initial)?;
    let top = comp.create_child(scratch)?;
    comp.label(scratch, top)?;

    let v = comp.load(top, var)?;
    let exit = comp.create_child(top)?;
    comp.if_cmp_greater_or_equal(top, v, last, exit)?;
    comp.goto(exit, break_to)?;
    comp.append_builder(top, body)?;
    comp.label(top, continue_to)?;
    let current = comp.load(top, var)?;
    let next = comp.add(top, current, bump)?;
    comp.store(top, var, next)?;
    comp.goto(top, top)?;

    comp.label(scratch, break_to)?;
    Ok(true)
}

/// Applies every operation kind's own expander (built-in and dynamic).
#[derive(Clone, Debug, Default)]
pub struct LowerStructured {
    /// Uses rewritten for the last replacement, undone if it is rejected.
    rewired: Vec<(ValueId, ValueId)>,
}

impl LowerStructured {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transformation for LowerStructured {
    fn name(&self) -> &str {
        "LowerStructured"
    }

    fn transform_operation(
        &mut self,
        comp: &mut Compilation<'_>,
        op: OperationId,
    ) -> Result<Option<BuilderId>, TransformError> {
        self.rewired.clear();
        let action = comp.operation(op).action();
        if !comp.compiler().actions().has_expander(action) {
            return Ok(None);
        }
        let mut replacer = OperationReplacer::new(comp, op)?;
        let scratch = comp.replacement_builder(op)?;
        if !expand_with_kind(comp, &mut replacer, scratch)? {
            comp.discard(scratch);
            return Ok(None);
        }
        let results: Vec<ValueId> = comp.operation(op).results().to_vec();
        for (i, old) in results.into_iter().enumerate() {
            if let Some(new) = replacer.result_mapper(i).and_then(|m| m.item(0)) {
                comp.replace_uses(old, new);
                self.rewired.push((old, new));
            }
        }
        Ok(Some(scratch))
    }

    fn rejected(&mut self, comp: &mut Compilation<'_>, _op: OperationId) {
        for (old, new) in self.rewired.drain(..) {
            comp.replace_uses(new, old);
        }
    }
}
