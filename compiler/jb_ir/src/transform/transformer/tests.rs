use pretty_assertions::assert_eq;

use super::{TransformStats, Transformation, Transformer};
use crate::test_helpers::{build_min, kinds_in};
use crate::{
    BuilderId, BuiltinOp, Compilation, Compiler, CompilerConfig, OperationId, TransformError,
};

/// Records the order operations are offered in; never rewrites.
#[derive(Default)]
struct Recorder {
    seen: Vec<OperationId>,
}

impl Transformation for Recorder {
    fn name(&self) -> &str {
        "Recorder"
    }

    fn transform_operation(
        &mut self,
        _comp: &mut Compilation<'_>,
        op: OperationId,
    ) -> Result<Option<BuilderId>, TransformError> {
        self.seen.push(op);
        Ok(None)
    }
}

/// Replaces every `Const` with nothing.
#[derive(Default)]
struct DropConsts {
    seen: Vec<OperationId>,
    rejected: Vec<OperationId>,
}

impl Transformation for DropConsts {
    fn name(&self) -> &str {
        "DropConsts"
    }

    fn transform_operation(
        &mut self,
        comp: &mut Compilation<'_>,
        op: OperationId,
    ) -> Result<Option<BuilderId>, TransformError> {
        self.seen.push(op);
        if comp.operation(op).is(BuiltinOp::Const) {
            return Ok(Some(comp.replacement_builder(op)?));
        }
        Ok(None)
    }

    fn rejected(&mut self, _comp: &mut Compilation<'_>, op: OperationId) {
        self.rejected.push(op);
    }
}

fn unused_consts(comp: &mut Compilation<'_>) -> (BuilderId, Vec<OperationId>) {
    let entry = comp.create_root("entry");
    comp.add_entry_point(entry).unwrap();
    comp.const_i32(entry, 1).unwrap();
    comp.const_i32(entry, 2).unwrap();
    comp.return_void(entry).unwrap();
    let ops = comp.builder(entry).operations().to_vec();
    (entry, ops)
}

#[test]
fn no_op_transformation_changes_nothing() {
    let compiler = Compiler::new("test");
    let mut comp = Compilation::new(&compiler, "min");
    let min = build_min(&mut comp);
    let entry_ops = comp.builder(min.entry).operations().to_vec();
    let (ops, values, builders) = (comp.num_operations(), comp.num_values(), comp.num_builders());

    let mut t = Recorder::default();
    let stats = Transformer::new(compiler.config()).run(&mut comp, &mut t).unwrap();
    assert_eq!(
        stats,
        TransformStats {
            visited_builders: 2,
            transformed: 0,
            skipped: 0,
        }
    );
    assert_eq!(t.seen.len(), ops);
    assert_eq!(comp.builder(min.entry).operations(), entry_ops.as_slice());
    assert_eq!(
        (comp.num_operations(), comp.num_values(), comp.num_builders()),
        (ops, values, builders)
    );
    assert_eq!(comp.transformation_index(), 0);
}

#[test]
fn bound_targets_are_visited_before_the_rest_and_jumps_last() {
    let compiler = Compiler::new("test");
    let mut comp = Compilation::new(&compiler, "order");
    let entry = comp.create_root("entry");
    comp.add_entry_point(entry).unwrap();
    let join = comp.create_root("join");
    let then_path = comp.create_child(entry).unwrap();

    let ret = comp.return_void(join).unwrap();
    let v = comp.const_i32(entry, 0).unwrap();
    let c = comp.value(v).producer();
    let branch = comp.if_cmp_equal_zero(entry, v, then_path).unwrap();
    let five = comp.const_i32(then_path, 5).unwrap();
    let inner = comp.value(five).producer();
    let jump = comp.goto(entry, join).unwrap();

    let mut t = Recorder::default();
    let stats = Transformer::new(compiler.config()).run(&mut comp, &mut t).unwrap();
    assert_eq!(t.seen, vec![c, branch, inner, jump, ret]);
    assert_eq!(stats.visited_builders, 3);
}

#[test]
fn empty_replacements_do_not_skip_the_next_operation() {
    let compiler = Compiler::new("test");
    let mut comp = Compilation::new(&compiler, "drop");
    let (entry, ops) = unused_consts(&mut comp);

    let mut t = DropConsts::default();
    let stats = Transformer::new(compiler.config()).run(&mut comp, &mut t).unwrap();
    assert_eq!(t.seen, ops);
    assert_eq!(stats.transformed, 2);
    assert_eq!(kinds_in(&comp, entry), vec![Some(BuiltinOp::Return)]);
    assert_eq!(comp.operation(ops[0]).parent(), None);
    assert_eq!(comp.builder(entry).children(), &[] as &[BuilderId]);
}

#[test]
fn transformations_past_the_cutoff_are_rejected() {
    let config = CompilerConfig {
        last_transformation_index: Some(1),
        ..CompilerConfig::default()
    };
    let compiler = Compiler::with_config("test", config);
    let mut comp = Compilation::new(&compiler, "cutoff");
    let (entry, ops) = unused_consts(&mut comp);

    let mut t = DropConsts::default();
    let stats = Transformer::new(compiler.config()).run(&mut comp, &mut t).unwrap();
    assert_eq!(stats.transformed, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(t.rejected, vec![ops[1]]);
    assert_eq!(comp.builder(entry).operations(), &ops[1..]);
    assert_eq!(comp.transformation_index(), 2);
}

#[test]
fn failed_transformation_rolls_back_bindings() {
    struct Rebind;

    impl Transformation for Rebind {
        fn name(&self) -> &str {
            "Rebind"
        }

        fn transform_operation(
            &mut self,
            comp: &mut Compilation<'_>,
            op: OperationId,
        ) -> Result<Option<BuilderId>, TransformError> {
            let operation = comp.operation(op).clone();
            if !operation.is(BuiltinOp::IfCmpLessThan) {
                return Ok(None);
            }
            let scratch = comp.replacement_builder(op)?;
            let (l, r) = (operation.operands()[0], operation.operands()[1]);
            let Some(target) = operation.builder(0) else {
                return Ok(None);
            };
            comp.if_cmp_greater_than(scratch, r, l, target)?;
            Err(TransformError::UnsupportedExplosion {
                action: "IfCmpLessThan".to_owned(),
                reason: "refused".to_owned(),
            })
        }
    }

    let compiler = Compiler::new("test");
    let mut comp = Compilation::new(&compiler, "min");
    let min = build_min(&mut comp);
    let err = Transformer::new(compiler.config()).run(&mut comp, &mut Rebind).unwrap_err();
    assert!(matches!(err, TransformError::UnsupportedExplosion { .. }));
    assert_eq!(comp.builder(min.then_path).bound_to(), Some(min.branch));
}
