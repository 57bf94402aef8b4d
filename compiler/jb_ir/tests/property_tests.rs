//! Property-based tests for graph rewriting.
//!
//! Random straight-line integer programs are widened from `Int32` to
//! `Int64` and checked to still verify, keep their shape and keep the
//! values of their constants.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use jb_ir::transform::{Transformer, TypeReplacer};
use jb_ir::{verify, BuiltinOp, Compilation, Compiler, TypeId, ValueId};
use proptest::prelude::*;

#[derive(Clone, Copy, Debug)]
enum Step {
    Const(i32),
    Add,
    Sub,
    Mul,
    Xor,
    Negate,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        any::<i32>().prop_map(Step::Const),
        Just(Step::Add),
        Just(Step::Sub),
        Just(Step::Mul),
        Just(Step::Xor),
        Just(Step::Negate),
    ]
}

/// Build `steps` over a value stack seeded with two constants; returns the
/// constants in program order.
fn build(comp: &mut Compilation<'_>, steps: &[Step]) -> Vec<i64> {
    comp.define_return_type(TypeId::INT32).unwrap();
    let entry = comp.create_root("entry");
    comp.add_entry_point(entry).unwrap();
    let mut consts = vec![1, 2];
    let mut stack: Vec<ValueId> = vec![
        comp.const_i32(entry, 1).unwrap(),
        comp.const_i32(entry, 2).unwrap(),
    ];
    for &step in steps {
        let top = stack[stack.len() - 1];
        let below = stack[stack.len() - 2];
        let v = match step {
            Step::Const(n) => {
                consts.push(i64::from(n));
                comp.const_i32(entry, n).unwrap()
            }
            Step::Add => comp.add(entry, below, top).unwrap(),
            Step::Sub => comp.sub(entry, below, top).unwrap(),
            Step::Mul => comp.mul(entry, below, top).unwrap(),
            Step::Xor => comp.xor(entry, below, top).unwrap(),
            Step::Negate => comp.negate(entry, top).unwrap(),
        };
        stack.push(v);
    }
    comp.return_value(entry, stack[stack.len() - 1]).unwrap();
    consts
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn widening_preserves_programs(steps in prop::collection::vec(step_strategy(), 0..24)) {
        let compiler = Compiler::new("prop");
        let mut comp = Compilation::new(&compiler, "widen");
        let consts = build(&mut comp, &steps);
        let before: Vec<Option<BuiltinOp>> = comp.attached_operations().map(|op| op.builtin()).collect();

        let mut tr = TypeReplacer::new();
        tr.replace(TypeId::INT32, TypeId::INT64);
        let stats = Transformer::new(compiler.config()).run(&mut comp, &mut tr).unwrap();
        prop_assert_eq!(stats.transformed, before.len());
        prop_assert!(verify(&comp).is_ok());
        prop_assert_eq!(comp.return_type(), TypeId::INT64);

        let after: Vec<Option<BuiltinOp>> = comp.attached_operations().map(|op| op.builtin()).collect();
        prop_assert_eq!(&after, &before);

        let mut widened = Vec::new();
        for op in comp.attached_operations() {
            for &r in op.results() {
                prop_assert_eq!(comp.try_value_type(r).unwrap(), TypeId::INT64);
            }
            if let Some(lit) = op.literal(0) {
                widened.push(comp.literal(lit).unwrap().as_i64());
            }
        }
        prop_assert_eq!(widened, consts);
    }

    #[test]
    fn rewriting_nothing_is_stable(steps in prop::collection::vec(step_strategy(), 0..24)) {
        let compiler = Compiler::new("prop");
        let mut comp = Compilation::new(&compiler, "same");
        build(&mut comp, &steps);
        let before: Vec<String> = comp.attached_operations().map(|op| comp.describe_operation(op.id())).collect();

        let stats = Transformer::new(compiler.config())
            .run(&mut comp, &mut TypeReplacer::new())
            .unwrap();
        prop_assert_eq!(stats.transformed, 0);
        let after: Vec<String> = comp.attached_operations().map(|op| comp.describe_operation(op.id())).collect();
        prop_assert_eq!(after, before);
    }
}
