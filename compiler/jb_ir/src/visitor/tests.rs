use pretty_assertions::assert_eq;

use crate::test_helpers::{build_min, RecordingVisitor};
use crate::{walk, Compilation, CompilationError, Compiler, Operation, ReturnCode, Visitor};

#[test]
fn min_is_walked_breadth_first() {
    let compiler = Compiler::new("test");
    let mut comp = Compilation::new(&compiler, "min");
    let min = build_min(&mut comp);
    let mut visitor = RecordingVisitor::default();
    walk(&comp, &mut visitor).unwrap();

    let (entry, then_path) = (min.entry, min.then_path);
    let expected: Vec<String> = [
        "pre min".to_owned(),
        format!("enter {entry}"),
        "Load".to_owned(),
        "Store".to_owned(),
        "Load".to_owned(),
        "Load".to_owned(),
        "IfCmpLessThan".to_owned(),
        "Load".to_owned(),
        "Return".to_owned(),
        format!("leave {entry}"),
        format!("enter {then_path}"),
        "Load".to_owned(),
        "Store".to_owned(),
        format!("leave {then_path}"),
        "post".to_owned(),
    ]
    .into();
    assert_eq!(visitor.events, expected);
}

#[test]
fn shared_targets_are_visited_once() {
    let compiler = Compiler::new("test");
    let mut comp = Compilation::new(&compiler, "merge");
    let entry = comp.create_root("entry");
    comp.add_entry_point(entry).unwrap();
    let left = comp.create_child(entry).unwrap();
    let join = comp.create_root("join");
    let unreachable = comp.create_root("dead");
    let v = comp.const_i32(entry, 0).unwrap();
    comp.if_cmp_equal_zero(entry, v, left).unwrap();
    comp.goto(left, join).unwrap();
    comp.goto(entry, join).unwrap();
    comp.return_void(join).unwrap();
    comp.return_void(unreachable).unwrap();

    let mut visitor = RecordingVisitor::default();
    walk(&comp, &mut visitor).unwrap();
    let entered: Vec<&str> = visitor
        .events
        .iter()
        .filter_map(|e| e.strip_prefix("enter "))
        .collect();
    assert_eq!(entered, vec!["b0", "b1", "b2"]);
}

#[test]
fn visitor_errors_abort_the_walk() {
    struct StopAtFirst(usize);

    impl Visitor for StopAtFirst {
        fn operation(&mut self, _comp: &Compilation<'_>, _op: &Operation) -> Result<(), CompilationError> {
            self.0 += 1;
            Err(CompilationError::new(ReturnCode::LoweringFailed, "unsupported"))
        }
    }

    let compiler = Compiler::new("test");
    let mut comp = Compilation::new(&compiler, "min");
    build_min(&mut comp);
    let mut visitor = StopAtFirst(0);
    let err = walk(&comp, &mut visitor).unwrap_err();
    assert_eq!(err.code, ReturnCode::LoweringFailed);
    assert_eq!(visitor.0, 1);
}
