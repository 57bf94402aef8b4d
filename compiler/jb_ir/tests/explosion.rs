//! End-to-end compilations through the public API: an extension-defined
//! complex number type exploded into its parts, structured control flow
//! lowered to labels, and the return codes of failing pipelines.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::rc::Rc;

use jb_ir::transform::{LowerStructured, Mapper, OperationReplacer, TypeReplacer};
use jb_ir::{
    BuilderId, BuiltinOp, Compilation, CompilationError, Compiler, Extension, NullVisitor,
    Operation, ReturnCode, TransformError, TypeId, Visitor,
};
use pretty_assertions::assert_eq;

/// `Complex`: a dynamic type laid out as `{ re: Float64, im: Float64 }`
/// with a `Mul` rule and an expander that lowers it component-wise.
struct ComplexExtension;

impl Extension for ComplexExtension {
    fn name(&self) -> &str {
        "complex"
    }

    fn register(&mut self, compiler: &mut Compiler) -> Result<(), CompilationError> {
        let types = compiler.types_mut();
        let layout = types.define_struct(
            "ComplexLayout",
            128,
            &[("re", TypeId::FLOAT64, 0), ("im", TypeId::FLOAT64, 64)],
        )?;
        let complex = types.define_dynamic("Complex", 128, layout)?;
        types
            .graph_mut()
            .register(complex, BuiltinOp::Mul.action(), &[complex, complex])?;
        compiler.register_type_expander(complex, Rc::new(expand_complex_mul));
        Ok(())
    }
}

fn complex_extension(_: &Compiler) -> Box<dyn Extension> {
    Box::new(ComplexExtension)
}

fn complex_type(compiler: &Compiler) -> TypeId {
    compiler.types().dict().by_name("Complex").unwrap()
}

/// `(a + bi)(c + di) = (ac - bd) + (ad + bc)i`
fn expand_complex_mul(
    comp: &mut Compilation<'_>,
    r: &mut OperationReplacer,
    scratch: BuilderId,
) -> Result<bool, TransformError> {
    if r.action() != BuiltinOp::Mul.action() {
        return Ok(false);
    }
    let (Some(x), Some(y)) = (r.operand_mapper(0).cloned(), r.operand_mapper(1).cloned()) else {
        return Ok(false);
    };
    let (Some(a), Some(b), Some(c), Some(d)) = (x.item(0), x.item(1), y.item(0), y.item(1)) else {
        return Ok(false);
    };
    let ac = comp.mul(scratch, a, c)?;
    let bd = comp.mul(scratch, b, d)?;
    let re = comp.sub(scratch, ac, bd)?;
    let ad = comp.mul(scratch, a, d)?;
    let bc = comp.mul(scratch, b, c)?;
    let im = comp.add(scratch, ad, bc)?;

    let mut result = Mapper::new();
    result.add_named(re, "re", 0);
    result.add_named(im, "im", 64);
    r.set_result_mapper(0, result);
    Ok(true)
}

/// Collects the built-in kind of every lowered operation.
#[derive(Default)]
struct KindRecorder {
    kinds: Vec<Option<BuiltinOp>>,
}

impl Visitor for KindRecorder {
    fn operation(&mut self, _comp: &Compilation<'_>, op: &Operation) -> Result<(), CompilationError> {
        self.kinds.push(op.builtin());
        Ok(())
    }
}

/// `out = a * b` over complex parameters.
fn build_product(comp: &mut Compilation<'_>, complex: TypeId) -> BuilderId {
    let a = comp.define_parameter("a", complex).unwrap();
    let b = comp.define_parameter("b", complex).unwrap();
    let out = comp.define_local("out", complex).unwrap();
    let entry = comp.create_root("entry");
    comp.add_entry_point(entry).unwrap();
    let va = comp.load(entry, a).unwrap();
    let vb = comp.load(entry, b).unwrap();
    let product = comp.mul(entry, va, vb).unwrap();
    comp.store(entry, out, product).unwrap();
    comp.return_void(entry).unwrap();
    entry
}

#[test]
fn complex_values_explode_into_float_pairs() {
    let mut compiler = Compiler::new("complex");
    compiler.load_extension(complex_extension).unwrap();
    let complex = complex_type(&compiler);

    let mut comp = Compilation::new(&compiler, "product");
    build_product(&mut comp, complex);

    let mut explode = TypeReplacer::new();
    explode.explode(complex);
    let mut backend = KindRecorder::default();
    let code = compiler.compile(&mut comp, &mut [&mut explode], &mut backend);
    assert_eq!(code, ReturnCode::Successful);
    assert_eq!(comp.return_code(), ReturnCode::Successful);

    use BuiltinOp::*;
    assert_eq!(
        backend.kinds,
        [Load, Load, Load, Load, Mul, Mul, Sub, Mul, Mul, Add, Store, Store, Return]
            .into_iter()
            .map(Some)
            .collect::<Vec<_>>()
    );

    let params: Vec<(String, TypeId)> = comp
        .parameters()
        .iter()
        .map(|&p| {
            let sym = comp.symbol(p).unwrap();
            (sym.name().to_owned(), sym.ty())
        })
        .collect();
    assert_eq!(
        params,
        vec![
            ("a.re".to_owned(), TypeId::FLOAT64),
            ("a.im".to_owned(), TypeId::FLOAT64),
            ("b.re".to_owned(), TypeId::FLOAT64),
            ("b.im".to_owned(), TypeId::FLOAT64),
        ]
    );
    assert!(!comp.types().dict().contains(complex));
    assert!(compiler.types().dict().contains(complex));
}

#[test]
fn unexploded_complex_values_pass_through() {
    let mut compiler = Compiler::new("complex");
    compiler.load_extension(complex_extension).unwrap();
    let complex = complex_type(&compiler);

    let mut comp = Compilation::new(&compiler, "product");
    build_product(&mut comp, complex);
    let ops = comp.num_operations();

    let mut nothing = TypeReplacer::new();
    let code = compiler.compile(&mut comp, &mut [&mut nothing], &mut NullVisitor);
    assert_eq!(code, ReturnCode::Successful);
    assert_eq!(comp.num_operations(), ops);
    assert_eq!(comp.parameters().len(), 2);
}

#[test]
fn counted_loop_compiles_after_lowering() {
    let compiler = Compiler::new("loops");
    let mut comp = Compilation::new(&compiler, "count");
    comp.define_return_type(TypeId::INT32).unwrap();
    let n = comp.define_parameter("n", TypeId::INT32).unwrap();
    let i = comp.define_local("i", TypeId::INT32).unwrap();
    let total = comp.define_local("total", TypeId::INT32).unwrap();
    let entry = comp.create_root("entry");
    comp.add_entry_point(entry).unwrap();

    let zero = comp.const_i32(entry, 0).unwrap();
    comp.store(entry, total, zero).unwrap();
    let lo = comp.const_i32(entry, 0).unwrap();
    let hi = comp.load(entry, n).unwrap();
    let step = comp.const_i32(entry, 1).unwrap();
    let lb = comp.loop_builders(entry).unwrap();
    comp.for_loop_up(entry, i, lo, hi, step, lb).unwrap();
    let t = comp.load(lb.body, total).unwrap();
    let vi = comp.load(lb.body, i).unwrap();
    let sum = comp.add(lb.body, t, vi).unwrap();
    comp.store(lb.body, total, sum).unwrap();
    let result = comp.load(entry, total).unwrap();
    comp.return_value(entry, result).unwrap();

    let mut lower = LowerStructured::new();
    let mut backend = KindRecorder::default();
    let code = compiler.compile(&mut comp, &mut [&mut lower], &mut backend);
    assert_eq!(code, ReturnCode::Successful);
    assert!(!backend.kinds.contains(&Some(BuiltinOp::ForLoopUp)));
    assert!(backend.kinds.contains(&Some(BuiltinOp::IfCmpGreaterOrEqual)));
    assert!(backend.kinds.contains(&Some(BuiltinOp::Goto)));
    assert_eq!(
        backend.kinds.iter().filter(|&&k| k == Some(BuiltinOp::Return)).count(),
        1
    );
}

#[test]
fn exploding_a_primitive_fails_the_compilation() {
    let compiler = Compiler::new("bad");
    let mut comp = Compilation::new(&compiler, "f");
    comp.define_return_type(TypeId::INT32).unwrap();
    let entry = comp.create_root("entry");
    comp.add_entry_point(entry).unwrap();
    let one = comp.const_i32(entry, 1).unwrap();
    comp.return_value(entry, one).unwrap();

    let mut explode = TypeReplacer::new();
    explode.explode(TypeId::INT32);
    let mut backend = KindRecorder::default();
    let code = compiler.compile(&mut comp, &mut [&mut explode], &mut backend);
    assert_eq!(code, ReturnCode::TransformFailed);
    assert_eq!(comp.return_code(), ReturnCode::TransformFailed);
    assert!(backend.kinds.is_empty());
}

#[test]
fn missing_extension_is_reported() {
    struct NeedsComplex;

    impl Extension for NeedsComplex {
        fn name(&self) -> &str {
            "quaternion"
        }

        fn requires(&self) -> &[&str] {
            &["complex"]
        }

        fn register(&mut self, _compiler: &mut Compiler) -> Result<(), CompilationError> {
            Ok(())
        }
    }

    fn quaternion(_: &Compiler) -> Box<dyn Extension> {
        Box::new(NeedsComplex)
    }

    let mut compiler = Compiler::new("ext");
    assert_eq!(
        compiler.load_extension(quaternion).unwrap_err().code,
        ReturnCode::MissingExtension
    );
    compiler.load_extension(complex_extension).unwrap();
    compiler.load_extension(quaternion).unwrap();
    assert!(compiler.has_extension("quaternion"));
}
