use std::process::Command;

use test_log::test;
use weld_verifier::builder::{ClassBuilder, MethodBuilder};
use weld_verifier::catalog::Catalog;
use weld_verifier::condition::CmpOp;
use weld_verifier::config::{AnalysisConfig, ErrorPolicy};
use weld_verifier::error::AnalysisError;
use weld_verifier::interval::Interval;
use weld_verifier::ir::{AllocSite, BinOp, Class, ProgramProvider, Type, Value};
use weld_verifier::verifier::{verify_class, Check, ClassReport};

fn robot() -> Type {
    Type::Ref("Robot".to_string())
}

fn verify<F: FnOnce(&mut MethodBuilder)>(name: &str, body: F) -> ClassReport {
    verify_with(name, &AnalysisConfig::default(), body)
}

fn verify_with<F: FnOnce(&mut MethodBuilder)>(name: &str, config: &AnalysisConfig, body: F) -> ClassReport {
    let mut class = ClassBuilder::new(name);
    class.method("run", body);
    verify_class(&class.build(), config)
}

#[test]
fn test_point_inside_recorded_bounds() {
    let report = verify("A", |m| {
        m.local("r1", robot());
        m.new_object("r1", "Robot", vec![Value::Const(0), Value::Const(10)]);
        m.invoke("r1", "weldAt", vec![Value::Const(5)]);
        m.ret();
    });
    assert!(report.point_in_range);
    assert!(report.range_contained);
    assert!(report.violations.is_empty());
    assert_eq!(report.to_string(), "A WELD_AT_OK\nA WELD_BETWEEN_OK");
}

#[test]
fn test_point_outside_recorded_bounds() {
    let report = verify("B", |m| {
        m.local("r1", robot());
        m.new_object("r1", "Robot", vec![Value::Const(0), Value::Const(10)]);
        m.invoke("r1", "weldAt", vec![Value::Const(20)]);
        m.ret();
    });
    assert!(!report.point_in_range);
    assert!(report.range_contained);
    assert_eq!(report.to_string(), "B WELD_AT_NOT_OK\nB WELD_BETWEEN_OK");

    let violation = &report.violations[0];
    assert_eq!(violation.check, Check::PointInRange);
    assert_eq!(violation.value, Interval::constant(20));
    assert_eq!(violation.range, Interval::finite(0, 10));
    assert_eq!(violation.site, AllocSite(0));
}

#[test]
fn test_range_containment() {
    let segment = |left: i64, right: i64| {
        verify("C", move |m| {
            m.local("r1", robot());
            m.new_object("r1", "Robot", vec![Value::Const(left), Value::Const(right)]);
            m.invoke("r1", "weldBetween", vec![Value::Const(2), Value::Const(8)]);
            m.ret();
        })
    };
    assert!(segment(0, 10).range_contained);

    let report = segment(0, 5);
    assert!(!report.range_contained);
    assert!(report.point_in_range);
    assert_eq!(report.violations[0].value, Interval::finite(2, 8));
}

#[test]
fn test_endpoints_are_inclusive() {
    let report = verify("Edges", |m| {
        m.local("r1", robot());
        m.new_object("r1", "Robot", vec![Value::Const(0), Value::Const(10)]);
        m.invoke("r1", "weldAt", vec![Value::Const(0)]);
        m.invoke("r1", "weldAt", vec![Value::Const(10)]);
        m.invoke("r1", "weldBetween", vec![Value::Const(0), Value::Const(10)]);
        m.ret();
    });
    assert!(report.point_in_range);
    assert!(report.range_contained);
}

#[test]
fn test_computed_weld_point() {
    // i0 = 3; i1 = i0 * 4 - 1;  weldAt(i1) = weldAt(11)
    let report = verify("Computed", |m| {
        m.local("r1", robot());
        m.local("i0", Type::Int);
        m.local("i1", Type::Int);
        m.new_object("r1", "Robot", vec![Value::Const(0), Value::Const(10)]);
        m.assign("i0", 3);
        m.binary("i1", BinOp::Mul, Value::local("i0"), 4);
        m.binary("i1", BinOp::Sub, Value::local("i1"), 1);
        m.invoke("r1", "weldAt", vec![Value::local("i1")]);
        m.ret();
    });
    assert!(!report.point_in_range);
    assert_eq!(report.violations[0].value, Interval::constant(11));
}

#[test]
fn test_unknown_parameter_overlaps() {
    // An unknown point may hit the range, so weldAt passes; a segment from it cannot be contained.
    let report = verify("Param", |m| {
        m.local("r1", robot());
        m.local("i0", Type::Int);
        m.param("i0", 0);
        m.new_object("r1", "Robot", vec![Value::Const(0), Value::Const(10)]);
        m.invoke("r1", "weldAt", vec![Value::local("i0")]);
        m.invoke("r1", "weldBetween", vec![Value::local("i0"), Value::Const(5)]);
        m.ret();
    });
    assert!(report.point_in_range);
    assert!(!report.range_contained);
}

#[test]
fn test_loop_bound_refines_weld_point() {
    let report = verify("Loop", |m| {
        m.local("r1", robot());
        m.local("i0", Type::Int);
        let head = m.label();
        let exit = m.label();
        m.new_object("r1", "Robot", vec![Value::Const(0), Value::Const(10)]);
        m.assign("i0", 0);
        m.bind(head);
        m.branch(CmpOp::Gt, Value::local("i0"), 10, exit);
        m.invoke("r1", "weldBetween", vec![Value::Const(0), Value::local("i0")]);
        m.binary("i0", BinOp::Add, Value::local("i0"), 1);
        m.goto(head);
        m.bind(exit);
        m.invoke("r1", "weldAt", vec![Value::local("i0")]);
        m.ret();
    });
    // Inside the loop i0 ∈ [0, 10]; after it i0 ∈ [11, +∞).
    assert!(report.range_contained);
    assert!(!report.point_in_range);
    assert_eq!(report.violations.len(), 1);
    assert_eq!(report.violations[0].check, Check::PointInRange);
}

#[test]
fn test_unreachable_weld_passes() {
    let report = verify("Dead", |m| {
        m.local("r1", robot());
        m.local("i0", Type::Int);
        let skip = m.label();
        m.new_object("r1", "Robot", vec![Value::Const(0), Value::Const(10)]);
        m.assign("i0", 5);
        m.branch(CmpOp::Lt, Value::local("i0"), 10, skip);
        m.invoke("r1", "weldAt", vec![Value::local("i0")]);
        m.invoke("r1", "weldBetween", vec![Value::local("i0"), Value::Const(100)]);
        m.bind(skip);
        m.ret();
    });
    assert!(report.point_in_range);
    assert!(report.range_contained);
}

#[test]
fn test_every_aliased_site_must_pass() {
    let report = verify("Alias", |m| {
        m.local("i0", Type::Int);
        m.local("r1", robot());
        m.local("r2", robot());
        m.local("r3", robot());
        let other = m.label();
        let join = m.label();
        m.param("i0", 0);
        m.new_object("r1", "Robot", vec![Value::Const(0), Value::Const(10)]);
        m.new_object("r2", "Robot", vec![Value::Const(5), Value::Const(20)]);
        m.branch(CmpOp::Eq, Value::local("i0"), 0, other);
        m.assign("r3", Value::local("r1"));
        m.goto(join);
        m.bind(other);
        m.assign("r3", Value::local("r2"));
        m.bind(join);
        m.invoke("r3", "weldAt", vec![Value::Const(7)]);
        m.invoke("r3", "weldBetween", vec![Value::Const(6), Value::Const(12)]);
        m.ret();
    });
    // 7 is inside both; [6, 12] only fits the second robot.
    assert!(report.point_in_range);
    assert!(!report.range_contained);
    assert_eq!(report.violations[0].site, AllocSite(0));
}

#[test]
fn test_receiver_without_allocation_imposes_nothing() {
    let report = verify("NoAlloc", |m| {
        m.local("r1", robot());
        m.param("r1", 0);
        m.invoke("r1", "weldAt", vec![Value::Const(1000)]);
        m.ret();
    });
    assert!(report.point_in_range);
    assert!(report.diagnostics.is_empty());
}

#[test]
fn test_custom_operation_names() {
    let config = AnalysisConfig::default().with_operations("spotWeld", "seamWeld");
    let report = verify_with("Custom", &config, |m| {
        m.local("r1", robot());
        m.new_object("r1", "Robot", vec![Value::Const(0), Value::Const(10)]);
        m.invoke("r1", "weldAt", vec![Value::Const(50)]);
        m.invoke("r1", "spotWeld", vec![Value::Const(50)]);
        m.ret();
    });
    assert!(!report.point_in_range);
    assert_eq!(report.violations.len(), 1);
}

fn unsupported_bounds(config: &AnalysisConfig) -> ClassReport {
    verify_with("Bounds", config, |m| {
        m.local("r1", robot());
        m.local("i0", Type::Int);
        m.param("i0", 0);
        m.new_object("r1", "Robot", vec![Value::local("i0"), Value::Const(10)]);
        m.invoke("r1", "weldAt", vec![Value::Const(5)]);
        m.ret();
    })
}

#[test]
fn test_lenient_policy_keeps_verdicts() {
    let report = unsupported_bounds(&AnalysisConfig::default());
    assert!(report.point_in_range);
    assert!(report.range_contained);
    assert_eq!(report.diagnostics.len(), 1);
    let diagnostic = &report.diagnostics[0];
    assert_eq!(diagnostic.check, Some(Check::PointInRange));
    assert!(matches!(diagnostic.error, AnalysisError::UnsupportedConstruct(_)));
}

#[test]
fn test_strict_policy_fails_affected_verdict() {
    let config = AnalysisConfig::default().with_error_policy(ErrorPolicy::Strict);
    let report = unsupported_bounds(&config);
    assert!(!report.point_in_range);
    assert!(report.range_contained);
}

#[test]
fn test_iteration_cap_is_reported() {
    let config = AnalysisConfig::default()
        .with_max_iterations(3)
        .with_error_policy(ErrorPolicy::Strict);
    let report = verify_with("Capped", &config, |m| {
        m.local("r1", robot());
        m.local("i0", Type::Int);
        let head = m.label();
        let exit = m.label();
        m.new_object("r1", "Robot", vec![Value::Const(0), Value::Const(10)]);
        m.assign("i0", 0);
        m.bind(head);
        m.branch(CmpOp::Ge, Value::local("i0"), 5, exit);
        m.binary("i0", BinOp::Add, Value::local("i0"), 1);
        m.goto(head);
        m.bind(exit);
        m.invoke("r1", "weldAt", vec![Value::local("i0")]);
        m.ret();
    });
    assert!(!report.point_in_range);
    assert!(!report.range_contained);
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.error == AnalysisError::IterationLimit(3)));
}

#[test]
fn test_methods_are_verified_independently() {
    let mut class = ClassBuilder::new("Pair");
    class.method("first", |m| {
        m.local("r1", robot());
        m.new_object("r1", "Robot", vec![Value::Const(0), Value::Const(10)]);
        m.invoke("r1", "weldAt", vec![Value::Const(3)]);
        m.ret();
    });
    class.method("second", |m| {
        m.local("r1", robot());
        m.new_object("r1", "Robot", vec![Value::Const(100), Value::Const(110)]);
        m.invoke("r1", "weldAt", vec![Value::Const(105)]);
        m.ret();
    });
    let report = verify_class(&class.build(), &AnalysisConfig::default());
    assert!(report.point_in_range);
    assert!(report.violations.is_empty());
}

fn builtin(name: &str) -> Class {
    Catalog::builtin().load_class(name).unwrap()
}

#[test]
fn test_catalog_classes() {
    let config = AnalysisConfig::default();
    let report = verify_class(&builtin("LoopOverrun"), &config);
    assert_eq!(report.to_string(), "LoopOverrun WELD_AT_OK\nLoopOverrun WELD_BETWEEN_NOT_OK");

    let report = verify_class(&builtin("TwoMethods"), &config);
    assert!(!report.point_in_range);
    assert!(report.violations.iter().all(|v| v.method == "unsafe"));
}

#[test]
fn test_cli_prints_two_lines() {
    let output = Command::new(env!("CARGO_BIN_EXE_weld-verifier"))
        .arg("WeldOutOfRange")
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "WeldOutOfRange WELD_AT_NOT_OK\nWeldOutOfRange WELD_BETWEEN_OK\n"
    );
}

#[test]
fn test_cli_strict_flag() {
    let output = Command::new(env!("CARGO_BIN_EXE_weld-verifier"))
        .args(["--strict", "UnsupportedDivision"])
        .output()
        .unwrap();
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8(output.stdout).unwrap(),
        "UnsupportedDivision WELD_AT_NOT_OK\nUnsupportedDivision WELD_BETWEEN_NOT_OK\n"
    );
}

#[test]
fn test_cli_rejects_bad_arguments() {
    let missing = Command::new(env!("CARGO_BIN_EXE_weld-verifier")).output().unwrap();
    assert!(!missing.status.success());
    assert!(!missing.stderr.is_empty());

    let extra = Command::new(env!("CARGO_BIN_EXE_weld-verifier"))
        .args(["WeldInRange", "LoopWeld"])
        .output()
        .unwrap();
    assert!(!extra.status.success());

    let unknown = Command::new(env!("CARGO_BIN_EXE_weld-verifier"))
        .arg("NoSuchClass")
        .output()
        .unwrap();
    assert!(!unknown.status.success());
    assert!(unknown.stdout.is_empty());
}
