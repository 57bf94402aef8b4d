use std::cell::Cell;
use std::rc::Rc;

use jb_types::TypeId;
use pretty_assertions::assert_eq;
use smallvec::smallvec;

use super::OperationReplacer;
use crate::test_helpers::kinds_in;
use crate::transform::{Mapper, Transformer, TypeReplacer};
use crate::{
    verify, ActionId, BuiltinOp, Compilation, Compiler, DynamicOpSpec, OpInput, SlotShape,
    TransformError, ValueId,
};

fn mapper_of(items: &[ValueId]) -> Mapper<ValueId> {
    let mut m = Mapper::new();
    for &v in items {
        m.add(v);
    }
    m
}

#[test]
fn identity_replacer_changes_nothing() {
    let compiler = Compiler::new("test");
    let mut comp = Compilation::new(&compiler, "r");
    let b = comp.create_root("entry");
    let x = comp.const_i32(b, 1).unwrap();
    let y = comp.const_i32(b, 2).unwrap();
    let sum = comp.add(b, x, y).unwrap();
    let add = comp.value(sum).producer();

    let mut r = OperationReplacer::new(&comp, add).unwrap();
    assert!(!r.changes_anything(&comp));
    assert_eq!(r.num_maps(), 1);
    r.set_operand_mapper(1, Mapper::identity(x));
    assert!(r.changes_anything(&comp));
}

#[test]
fn clones_once_per_component() {
    let compiler = Compiler::new("test");
    let mut comp = Compilation::new(&compiler, "r");
    let b = comp.create_root("entry");
    let x = comp.const_i32(b, 1).unwrap();
    let y = comp.const_i32(b, 2).unwrap();
    let sum = comp.add(b, x, y).unwrap();
    let add = comp.value(sum).producer();
    let a1 = comp.const_i32(b, 10).unwrap();
    let a2 = comp.const_i32(b, 20).unwrap();
    let out = comp.create_root("out");

    let mut r = OperationReplacer::new(&comp, add).unwrap();
    r.set_operand_mapper(0, mapper_of(&[a1, a2]));
    let clones = r.clone_all(&mut comp, out).unwrap();
    assert_eq!(clones.len(), 2);
    assert_eq!(kinds_in(&comp, out), vec![Some(BuiltinOp::Add); 2]);
    assert_eq!(comp.operation(clones[0]).operands(), &[a1, y]);
    assert_eq!(comp.operation(clones[1]).operands(), &[a2, y]);

    let results: Vec<ValueId> = r.result_mapper(0).unwrap().items().collect();
    assert_eq!(
        results,
        vec![
            comp.operation(clones[0]).results()[0],
            comp.operation(clones[1]).results()[0],
        ]
    );
}

#[test]
fn result_types_carry_component_names() {
    let compiler = Compiler::new("test");
    let mut comp = Compilation::new(&compiler, "r");
    let b = comp.create_root("entry");
    let x = comp.const_i32(b, 1).unwrap();
    let neg = comp.negate(b, x).unwrap();
    let op = comp.value(neg).producer();
    let lo = comp.const_i32(b, 3).unwrap();
    let hi = comp.const_i64(b, 4).unwrap();
    let out = comp.create_root("out");

    let mut types = Mapper::new();
    types.add_named(TypeId::INT32, "lo", 0);
    types.add_named(TypeId::INT64, "hi", 32);
    let mut r = OperationReplacer::new(&comp, op).unwrap();
    r.set_operand_mapper(0, mapper_of(&[lo, hi]));
    r.set_result_type_mapper(0, types);
    r.clone_all(&mut comp, out).unwrap();

    let m = r.result_mapper(0).unwrap();
    let shape: Vec<(&str, u64, TypeId)> = m
        .entries()
        .iter()
        .map(|e| (e.name.as_str(), e.offset, comp.value_type(e.item)))
        .collect();
    assert_eq!(
        shape,
        vec![("lo", 0, TypeId::INT32), ("hi", 32, TypeId::INT64)]
    );
}

#[test]
fn pinned_result_type_must_match() {
    let compiler = Compiler::new("test");
    let mut comp = Compilation::new(&compiler, "r");
    let b = comp.create_root("entry");
    let x = comp.const_i32(b, 1).unwrap();
    let neg = comp.negate(b, x).unwrap();
    let op = comp.value(neg).producer();
    let out = comp.create_root("out");

    let mut r = OperationReplacer::new(&comp, op).unwrap();
    r.set_result_type_mapper(0, Mapper::identity(TypeId::INT64));
    let err = r.clone_all(&mut comp, out).unwrap_err();
    assert!(matches!(
        err,
        TransformError::Construction(crate::ConstructionError::ResultTypeMismatch { .. })
    ));
    assert!(comp.builder(out).operations().is_empty());
}

#[test]
fn mismatched_mapper_sizes_are_rejected() {
    let compiler = Compiler::new("test");
    let mut comp = Compilation::new(&compiler, "r");
    let b = comp.create_root("entry");
    let vs: Vec<ValueId> = (0..5).map(|i| comp.const_i32(b, i).unwrap()).collect();
    let sum = comp.add(b, vs[0], vs[1]).unwrap();
    let add = comp.value(sum).producer();

    let mut r = OperationReplacer::new(&comp, add).unwrap();
    r.set_operand_mapper(0, mapper_of(&vs[..2]));
    r.set_operand_mapper(1, mapper_of(&vs[..3]));
    assert_eq!(
        r.check_sizes(&comp),
        Err(TransformError::MismatchedExplosion {
            action: "Add".to_owned(),
            sizes: vec![2, 3],
            expected: 3,
        })
    );
}

#[test]
fn cloning_is_deterministic() {
    let compiler = Compiler::new("test");
    let run = || {
        let mut comp = Compilation::new(&compiler, "r");
        let b = comp.create_root("entry");
        let x = comp.const_i32(b, 1).unwrap();
        let y = comp.const_i32(b, 2).unwrap();
        let sum = comp.mul(b, x, y).unwrap();
        let op = comp.value(sum).producer();
        let parts: Vec<ValueId> = (0..3).map(|i| comp.const_i32(b, i).unwrap()).collect();
        let out = comp.create_root("out");
        let mut r = OperationReplacer::new(&comp, op).unwrap();
        r.set_operand_mapper(1, mapper_of(&parts));
        r.clone_all(&mut comp, out).unwrap();
        comp.builder(out)
            .operations()
            .iter()
            .map(|&op| comp.describe_operation(op))
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}

/// `Twice x`: a one-operand dynamic action that counts its clones and
/// prints itself as `TWICE <op>`.
fn register_twice(compiler: &mut Compiler, clones: &Rc<Cell<usize>>) -> ActionId {
    let hits = Rc::clone(clones);
    compiler
        .register_dynamic_action(
            DynamicOpSpec::new("Twice", SlotShape::EMPTY.results(1).operands(1))
                .with_typing(|_, _, key| key.first().map(|&t| smallvec![t]))
                .with_clone(move |comp, parent, cloner| {
                    hits.set(hits.get() + 1);
                    comp.append_dynamic(parent, cloner.action(), cloner.to_input())
                })
                .with_print(|_, op| format!("TWICE {}", op.id())),
        )
        .unwrap()
}

#[test]
fn dynamic_clone_and_print_closures_are_used() {
    let clones = Rc::new(Cell::new(0));
    let mut compiler = Compiler::new("test");
    let twice = register_twice(&mut compiler, &clones);
    let mut comp = Compilation::new(&compiler, "r");
    let b = comp.create_root("entry");
    let x = comp.const_i32(b, 1).unwrap();
    let op = comp.append_dynamic(b, twice, OpInput::new().operand(x)).unwrap();
    assert_eq!(comp.describe_operation(op), format!("TWICE {op}"));

    let lo = comp.const_i32(b, 2).unwrap();
    let hi = comp.const_i32(b, 3).unwrap();
    let out = comp.create_root("out");
    let mut r = OperationReplacer::new(&comp, op).unwrap();
    r.set_operand_mapper(0, mapper_of(&[lo, hi]));
    let made = r.clone_all(&mut comp, out).unwrap();

    assert_eq!(clones.get(), 2);
    assert_eq!(comp.operation(made[0]).operands(), &[lo]);
    assert_eq!(comp.operation(made[1]).operands(), &[hi]);
    assert_eq!(comp.describe_operation(made[1]), format!("TWICE {}", made[1]));
}

#[test]
fn widening_clones_dynamic_operations_through_their_closure() {
    let clones = Rc::new(Cell::new(0));
    let mut compiler = Compiler::new("test");
    let twice = register_twice(&mut compiler, &clones);
    let mut comp = Compilation::new(&compiler, "widen");
    comp.define_return_type(TypeId::INT32).unwrap();
    let entry = comp.create_root("entry");
    comp.add_entry_point(entry).unwrap();
    let x = comp.const_i32(entry, 7).unwrap();
    let op = comp.append_dynamic(entry, twice, OpInput::new().operand(x)).unwrap();
    let r = comp.operation(op).result(0).unwrap();
    comp.return_value(entry, r).unwrap();

    let mut tr = TypeReplacer::new();
    tr.replace(TypeId::INT32, TypeId::INT64);
    let stats = Transformer::new(compiler.config()).run(&mut comp, &mut tr).unwrap();
    assert_eq!(stats.transformed, 3);
    assert_eq!(clones.get(), 1);

    let widened = comp.builder(entry).operations()[1];
    assert_eq!(comp.operation(widened).action(), twice);
    let result = comp.operation(widened).result(0).unwrap();
    assert_eq!(comp.value_type(result), TypeId::INT64);
    assert_eq!(comp.describe_operation(widened), format!("TWICE {widened}"));
    verify(&comp).unwrap();
}
