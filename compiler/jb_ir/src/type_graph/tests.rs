use jb_types::TypeId;

use super::TypeGraph;
use crate::BuiltinOp;

#[test]
fn unregistered_tuple_has_no_match() {
    let graph = TypeGraph::new();
    assert_eq!(
        graph.produced_type(BuiltinOp::Add.action(), &[TypeId::INT32, TypeId::INT32]),
        None
    );
}

#[test]
fn arities_are_distinct_keys() {
    let mut graph = TypeGraph::new();
    let add = BuiltinOp::Add.action();
    graph
        .register(TypeId::INT32, add, &[TypeId::INT32, TypeId::INT32])
        .unwrap();
    graph.register(TypeId::INT64, add, &[TypeId::INT32]).unwrap();
    graph
        .register(TypeId::FLOAT64, add, &[TypeId::INT32, TypeId::INT32, TypeId::INT32])
        .unwrap();

    assert_eq!(graph.produced_type(add, &[TypeId::INT32, TypeId::INT32]), Some(TypeId::INT32));
    assert_eq!(graph.produced_type(add, &[TypeId::INT32]), Some(TypeId::INT64));
    assert_eq!(
        graph.produced_type(add, &[TypeId::INT32, TypeId::INT32, TypeId::INT32]),
        Some(TypeId::FLOAT64)
    );
    assert_eq!(graph.produced_type(add, &[TypeId::INT32, TypeId::INT64]), None);
    assert_eq!(graph.local_rule_count(), 3);
}

#[test]
fn register_rejects_bad_arity() {
    let mut graph = TypeGraph::new();
    assert!(graph.register(TypeId::INT32, BuiltinOp::Add.action(), &[]).is_err());
    let four = [TypeId::INT32; 4];
    assert!(graph.register(TypeId::INT32, BuiltinOp::Add.action(), &four).is_err());
}

#[test]
fn call_form() {
    let mut graph = TypeGraph::new();
    let call = BuiltinOp::Call.action();
    let fn_type = TypeId::from_raw(40);
    graph.register_call(TypeId::INT64, call, fn_type, &[TypeId::INT32, TypeId::FLOAT64]);
    assert_eq!(
        graph.produced_call_type(call, fn_type, &[TypeId::INT32, TypeId::FLOAT64]),
        Some(TypeId::INT64)
    );
    assert_eq!(graph.produced_call_type(call, fn_type, &[TypeId::INT32]), None);
}

#[test]
fn child_delegates_without_mutating_parent() {
    let mut parent = TypeGraph::new();
    let neg = BuiltinOp::Negate.action();
    parent.register(TypeId::INT32, neg, &[TypeId::INT32]).unwrap();

    let mut child = TypeGraph::linked(&parent);
    child.register(TypeId::FLOAT32, neg, &[TypeId::FLOAT32]).unwrap();

    assert_eq!(child.produced_type(neg, &[TypeId::INT32]), Some(TypeId::INT32));
    assert_eq!(child.produced_type(neg, &[TypeId::FLOAT32]), Some(TypeId::FLOAT32));
    assert_eq!(parent.produced_type(neg, &[TypeId::FLOAT32]), None);
}

#[test]
fn child_rule_shadows_parent() {
    let mut parent = TypeGraph::new();
    let neg = BuiltinOp::Negate.action();
    parent.register(TypeId::INT32, neg, &[TypeId::INT32]).unwrap();
    let mut child = TypeGraph::linked(&parent);
    child.register(TypeId::INT64, neg, &[TypeId::INT32]).unwrap();
    assert_eq!(child.produced_type(neg, &[TypeId::INT32]), Some(TypeId::INT64));
    assert_eq!(parent.produced_type(neg, &[TypeId::INT32]), Some(TypeId::INT32));
}
