use jb_types::TypeId;
use pretty_assertions::assert_eq;

use super::TypeReplacer;
use crate::test_helpers::{build_min, kinds_in, pair_type};
use crate::transform::{TransformStats, Transformer};
use crate::{
    verify, BuiltinOp, Compilation, Compiler, CompilerConfig, NullVisitor, ReturnCode,
    TransformError,
};

fn run(comp: &mut Compilation<'_>, tr: &mut TypeReplacer) -> Result<TransformStats, TransformError> {
    Transformer::new(comp.config()).run(comp, tr)
}

fn field_names(comp: &Compilation<'_>, ty: TypeId) -> Vec<(String, u64)> {
    let dict = comp.types().dict();
    dict.get(ty)
        .unwrap()
        .fields()
        .iter()
        .map(|&f| {
            let entry = dict.get(f).unwrap();
            let (_, _, offset) = entry.field_info().unwrap();
            (entry.name().to_owned(), offset)
        })
        .collect()
}

#[test]
fn no_requests_leave_the_graph_alone() {
    let compiler = Compiler::new("test");
    let mut comp = Compilation::new(&compiler, "min");
    let min = build_min(&mut comp);
    let before = kinds_in(&comp, min.entry);
    let ops = comp.num_operations();

    let stats = run(&mut comp, &mut TypeReplacer::new()).unwrap();
    assert_eq!(stats.transformed, 0);
    assert_eq!(kinds_in(&comp, min.entry), before);
    assert_eq!(comp.num_operations(), ops);
    assert_eq!(comp.symbol(min.x).unwrap().ty(), TypeId::INT32);
}

#[test]
fn exploded_local_struct_round_trips_through_memory() {
    let compiler = Compiler::new("test");
    let mut comp = Compilation::new(&compiler, "pair");
    let pair = pair_type(comp.types_mut());
    comp.types_mut().pointer_to(pair).unwrap();
    let field_a = comp.types().dict().field_named(pair, "a").unwrap();
    comp.define_return_type(TypeId::INT32).unwrap();
    let p = comp.define_local("p", pair).unwrap();

    let entry = comp.create_root("entry");
    comp.add_entry_point(entry).unwrap();
    let addr = comp.create_local_struct(entry, pair).unwrap();
    let whole = comp.load_at(entry, addr).unwrap();
    comp.store(entry, p, whole).unwrap();
    let v = comp.load(entry, p).unwrap();
    let a = comp.load_field(entry, field_a, v).unwrap();
    comp.return_value(entry, a).unwrap();

    let mut tr = TypeReplacer::new();
    tr.explode(pair);
    run(&mut comp, &mut tr).unwrap();

    use BuiltinOp::*;
    assert_eq!(
        kinds_in(&comp, entry),
        vec![
            Some(CreateLocalStruct),
            Some(LoadFieldAt),
            Some(LoadFieldAt),
            Some(Store),
            Some(Store),
            Some(Load),
            Some(Load),
            Some(Return),
        ]
    );

    let parts = tr.symbol_mapper(p).unwrap();
    let names: Vec<(&str, TypeId)> = parts
        .items()
        .map(|s| {
            let sym = comp.symbol(s).unwrap();
            (sym.name(), sym.ty())
        })
        .collect();
    assert_eq!(names, vec![("p.a", TypeId::INT32), ("p.b", TypeId::FLOAT64)]);
    assert_eq!(comp.lookup_symbol(entry, "p.a"), parts.item(0));
    assert_eq!(comp.lookup_symbol(entry, "p"), None);
    assert!(comp.symbol(p).is_err());

    let loaded = tr.value_mapper(v).unwrap();
    assert_eq!(loaded.entries()[1].name, "b");
    assert_eq!(loaded.entries()[1].offset, 64);
    assert_eq!(tr.value_mapper(a).unwrap().item(0), loaded.item(0));

    let ops = comp.builder(entry).operations().to_vec();
    let ret = comp.operation(ops[7]);
    assert_eq!(ret.operands(), &[loaded.item(0).unwrap()]);
    verify(&comp).unwrap();
}

#[test]
fn exploded_constants_split_their_bytes() {
    let compiler = Compiler::new("test");
    let mut comp = Compilation::new(&compiler, "lit");
    let pair = pair_type(comp.types_mut());
    let field_b = comp.types().dict().field_named(pair, "b").unwrap();
    comp.define_return_type(TypeId::FLOAT64).unwrap();

    let mut bytes = vec![7, 0, 0, 0, 0, 0, 0, 0];
    bytes.extend_from_slice(&0.5f64.to_le_bytes());
    let lit = comp.register_literal(pair, &bytes).unwrap();
    let entry = comp.create_root("entry");
    comp.add_entry_point(entry).unwrap();
    let v = comp.const_literal(entry, lit).unwrap();
    let b = comp.load_field(entry, field_b, v).unwrap();
    comp.return_value(entry, b).unwrap();

    let mut tr = TypeReplacer::new();
    tr.explode(pair);
    run(&mut comp, &mut tr).unwrap();

    assert_eq!(
        kinds_in(&comp, entry),
        vec![Some(BuiltinOp::Const), Some(BuiltinOp::Const), Some(BuiltinOp::Return)]
    );
    let ops = comp.builder(entry).operations().to_vec();
    let lit_of = |op| {
        let l = comp.operation(op).literal(0).unwrap();
        comp.literal(l).unwrap().clone()
    };
    assert_eq!(lit_of(ops[0]).as_i64(), 7);
    assert_eq!(lit_of(ops[0]).ty(), TypeId::INT32);
    assert_eq!(lit_of(ops[1]).as_f64(), Some(0.5));
    assert!(comp.literal(lit).is_err());

    let returned = comp.operation(ops[2]).operand(0).unwrap();
    assert_eq!(comp.value(returned).producer(), ops[1]);
    verify(&comp).unwrap();
}

#[test]
fn replacing_int32_widens_the_function() {
    let compiler = Compiler::new("test");
    let mut comp = Compilation::new(&compiler, "widen");
    comp.define_return_type(TypeId::INT32).unwrap();
    let entry = comp.create_root("entry");
    comp.add_entry_point(entry).unwrap();
    let x = comp.const_i32(entry, -5).unwrap();
    let y = comp.const_i32(entry, 7).unwrap();
    let sum = comp.add(entry, x, y).unwrap();
    comp.return_value(entry, sum).unwrap();

    let mut tr = TypeReplacer::new();
    tr.replace(TypeId::INT32, TypeId::INT64);
    let stats = run(&mut comp, &mut tr).unwrap();
    assert_eq!(stats.transformed, 4);

    assert_eq!(comp.return_type(), TypeId::INT64);
    let ops = comp.builder(entry).operations().to_vec();
    let types: Vec<TypeId> = ops[..3]
        .iter()
        .map(|&op| comp.value_type(comp.operation(op).results()[0]))
        .collect();
    assert_eq!(types, vec![TypeId::INT64; 3]);
    let first = comp.operation(ops[0]).literal(0).unwrap();
    let widened = comp.literal(first).unwrap();
    assert_eq!(widened.bytes().len(), 8);
    assert_eq!(widened.as_i64(), -5);
    verify(&comp).unwrap();
}

#[test]
fn nested_explosion_inlines_field_paths() {
    let compiler = Compiler::new("test");
    let mut comp = Compilation::new(&compiler, "nested");
    let pair = pair_type(comp.types_mut());
    let outer = comp
        .types_mut()
        .define_struct("Outer", 160, &[("inner", pair, 0), ("tag", TypeId::INT32, 128)])
        .unwrap();
    let outer_ptr = comp.types_mut().pointer_to(outer).unwrap();

    let mut tr = TypeReplacer::new();
    tr.explode(pair);
    run(&mut comp, &mut tr).unwrap();

    let rebuilt = tr.components_of(outer).unwrap().item(0).unwrap();
    assert_ne!(rebuilt, outer);
    assert_eq!(
        field_names(&comp, rebuilt),
        vec![
            ("inner.a".to_owned(), 0),
            ("inner.b".to_owned(), 64),
            ("tag".to_owned(), 128),
        ]
    );
    assert_eq!(comp.types().dict().size_of(rebuilt), 160);
    assert!(!comp.types().dict().contains(outer));
    assert!(!comp.types().dict().contains(outer_ptr));
    let new_ptr = tr.components_of(outer_ptr).unwrap().item(0).unwrap();
    assert_eq!(comp.types().dict().existing_pointer_to(rebuilt), Some(new_ptr));
    assert!(comp.types().dict().contains(pair));
}

#[test]
fn exploding_both_levels_flattens_components() {
    let compiler = Compiler::new("test");
    let mut comp = Compilation::new(&compiler, "flat");
    let pair = pair_type(comp.types_mut());
    let outer = comp
        .types_mut()
        .define_struct("Outer", 160, &[("inner", pair, 0), ("tag", TypeId::INT32, 128)])
        .unwrap();

    let mut tr = TypeReplacer::new();
    tr.explode(pair).explode(outer);
    run(&mut comp, &mut tr).unwrap();

    let components: Vec<(&str, u64, TypeId)> = tr
        .components_of(outer)
        .unwrap()
        .entries()
        .iter()
        .map(|e| (e.name.as_str(), e.offset, e.item))
        .collect();
    assert_eq!(
        components,
        vec![
            ("inner.a", 0, TypeId::INT32),
            ("inner.b", 64, TypeId::FLOAT64),
            ("tag", 128, TypeId::INT32),
        ]
    );
}

#[test]
fn explosion_passes_flattened_arguments() {
    let compiler = Compiler::new("test");
    let mut comp = Compilation::new(&compiler, "call");
    let pair = pair_type(comp.types_mut());
    let consume = comp.define_function("consume", TypeId::INT32, &[pair]).unwrap();
    comp.define_return_type(TypeId::INT32).unwrap();
    let p = comp.define_local("p", pair).unwrap();
    let entry = comp.create_root("entry");
    comp.add_entry_point(entry).unwrap();
    let v = comp.load(entry, p).unwrap();
    let r = comp.call(entry, consume, &[v]).unwrap().unwrap();
    comp.return_value(entry, r).unwrap();

    let mut tr = TypeReplacer::new();
    tr.explode(pair);
    run(&mut comp, &mut tr).unwrap();

    let callee = tr.symbol_mapper(consume).unwrap().item(0).unwrap();
    let sym = comp.symbol(callee).unwrap().clone();
    assert_eq!(sym.name(), "consume");
    assert_eq!(comp.type_name(sym.ty()), "(Int32, Float64) -> Int32");

    let ops = comp.builder(entry).operations().to_vec();
    let call = comp.operation(ops[2]);
    assert!(call.is(BuiltinOp::Call));
    assert_eq!(call.symbol(0), Some(callee));
    assert_eq!(call.num_operands(), 2);
    verify(&comp).unwrap();
}

#[test]
fn primitives_cannot_be_exploded() {
    let compiler = Compiler::new("test");
    let mut comp = Compilation::new(&compiler, "min");
    build_min(&mut comp);
    let mut tr = TypeReplacer::new();
    tr.explode(TypeId::INT32);
    assert_eq!(
        run(&mut comp, &mut tr).unwrap_err(),
        TransformError::NotExplodable(TypeId::INT32)
    );
}

#[test]
fn unions_reject_explosion() {
    let compiler = Compiler::new("test");
    let mut comp = Compilation::new(&compiler, "union");
    let pair = pair_type(comp.types_mut());
    let u = comp
        .types_mut()
        .define_union("U", 128, &[("p", pair), ("i", TypeId::INT32)])
        .unwrap();

    let mut tr = TypeReplacer::new();
    tr.explode(pair);
    assert!(matches!(
        run(&mut comp, &mut tr),
        Err(TransformError::UnsupportedExplosion { .. })
    ));

    let mut tr = TypeReplacer::new();
    tr.explode(u);
    assert_eq!(run(&mut comp, &mut tr).unwrap_err(), TransformError::NotExplodable(u));
}

#[test]
fn exploded_return_type_is_rejected() {
    let compiler = Compiler::new("test");
    let mut comp = Compilation::new(&compiler, "ret");
    let pair = pair_type(comp.types_mut());
    comp.define_return_type(pair).unwrap();
    let mut tr = TypeReplacer::new();
    tr.explode(pair);
    assert!(matches!(
        run(&mut comp, &mut tr),
        Err(TransformError::UnsupportedExplosion { .. })
    ));
}

fn cutoff_compiler(last: u64) -> Compiler {
    let config = CompilerConfig {
        last_transformation_index: Some(last),
        ..CompilerConfig::default()
    };
    Compiler::with_config("test", config)
}

#[test]
fn cutoff_inside_a_widening_stops_at_the_next_operation() {
    let compiler = cutoff_compiler(1);
    let mut comp = Compilation::new(&compiler, "widen");
    comp.define_return_type(TypeId::INT32).unwrap();
    let entry = comp.create_root("entry");
    comp.add_entry_point(entry).unwrap();
    let one = comp.const_i32(entry, 1).unwrap();
    let two = comp.const_i32(entry, 2).unwrap();
    let sum = comp.add(entry, one, two).unwrap();
    comp.return_value(entry, sum).unwrap();
    let ops = comp.builder(entry).operations().to_vec();

    let mut tr = TypeReplacer::new();
    tr.replace(TypeId::INT32, TypeId::INT64);
    assert_eq!(
        run(&mut comp, &mut tr).unwrap_err(),
        TransformError::IncompleteRewrite {
            transformation: "TypeReplacer".to_owned(),
            op: ops[1],
        }
    );
}

#[test]
fn cutoff_on_the_last_operation_fails_the_cleanup() {
    let compiler = cutoff_compiler(1);
    let mut comp = Compilation::new(&compiler, "widen");
    comp.define_return_type(TypeId::INT32).unwrap();
    let entry = comp.create_root("entry");
    comp.add_entry_point(entry).unwrap();
    let one = comp.const_i32(entry, 1).unwrap();
    comp.return_value(entry, one).unwrap();
    let ret = comp.builder(entry).operations()[1];

    let mut tr = TypeReplacer::new();
    tr.replace(TypeId::INT32, TypeId::INT64);
    assert!(matches!(
        run(&mut comp, &mut tr),
        Err(TransformError::IncompleteRewrite { op, .. }) if op == ret
    ));
}

#[test]
fn cut_short_explosion_never_reaches_lowering() {
    let compiler = cutoff_compiler(1);
    let mut comp = Compilation::new(&compiler, "pair");
    let pair = pair_type(comp.types_mut());
    comp.types_mut().pointer_to(pair).unwrap();
    let field_a = comp.types().dict().field_named(pair, "a").unwrap();
    comp.define_return_type(TypeId::INT32).unwrap();
    let p = comp.define_local("p", pair).unwrap();

    let entry = comp.create_root("entry");
    comp.add_entry_point(entry).unwrap();
    let addr = comp.create_local_struct(entry, pair).unwrap();
    let whole = comp.load_at(entry, addr).unwrap();
    comp.store(entry, p, whole).unwrap();
    let v = comp.load(entry, p).unwrap();
    let a = comp.load_field(entry, field_a, v).unwrap();
    comp.return_value(entry, a).unwrap();

    let mut tr = TypeReplacer::new();
    tr.explode(pair);
    let code = compiler.compile(&mut comp, &mut [&mut tr], &mut NullVisitor);
    assert_eq!(code, ReturnCode::TransformFailed);
    assert_eq!(comp.return_code(), ReturnCode::TransformFailed);
}
