mod common;

use ajfront::aspect::{AdvicePayload, InterTypePayload};
use ajfront::flow::{analyze_unit, is_unchecked};
use ajfront::parser::ProblemReporter;
use ajfront::{check_source, Config, ProblemId, Severity};
use common::{parse_aspect, parse_plain};

fn ids(diagnostics: &[ajfront::Diagnostic]) -> Vec<ProblemId> {
    diagnostics.iter().map(|d| d.id).collect()
}

#[test]
fn test_clean_unit_has_no_flow_problems() {
    let compiled = check_source(
        "class Counter {\n  int total;\n  int add(int n) {\n    int sum = total;\n    for (int i = 0; i < n; i++) { sum += i; }\n    total = sum;\n    return sum;\n  }\n}",
        &Config::default(),
    )
    .expect("compile");
    assert!(compiled.diagnostics.is_empty(), "{:?}", compiled.diagnostics);
    assert_eq!(compiled.flow.bodies, 1);
}

#[test]
fn test_flow_problems_through_the_driver() {
    let compiled = check_source(
        "class A {\n  int m(boolean b) {\n    int x;\n    if (b) { x = 1; }\n    return x;\n  }\n  void n() {\n    return;\n    n();\n  }\n}",
        &Config::default(),
    )
    .expect("compile");
    assert_eq!(
        ids(&compiled.diagnostics),
        vec![ProblemId::UninitializedLocal, ProblemId::UnreachableCode]
    );
    assert_eq!(compiled.flow.uninitialized, 1);
    assert_eq!(compiled.flow.unreachable, 1);
    assert!(compiled.has_errors());
}

#[test]
fn test_uninitialized_reported_once_per_local() {
    let mut unit = parse_plain("class A { int m() { int x; int y = x; int z = x; return x; } }").unit;
    let mut reporter = ProblemReporter::new(100);
    let stats = analyze_unit(&mut unit, &mut reporter);
    assert_eq!(ids(reporter.diagnostics()), vec![ProblemId::UninitializedLocal]);
    assert_eq!(stats.uninitialized, 1);
}

#[test]
fn test_conditional_operands_do_not_assign() {
    let mut unit = parse_plain(
        "class A { boolean m(boolean a) { boolean x; if (a && (x = true)) { return x; } return x; } }",
    )
    .unit;
    let mut reporter = ProblemReporter::new(100);
    analyze_unit(&mut unit, &mut reporter);
    let uninitialized = reporter
        .diagnostics()
        .iter()
        .filter(|d| d.id == ProblemId::UninitializedLocal)
        .count();
    assert_eq!(uninitialized, 1);
}

#[test]
fn test_finally_assignment_counts() {
    let mut unit = parse_plain(
        "class A { int m() { int x; try { foo(); } finally { x = 1; } return x; } }",
    )
    .unit;
    let mut reporter = ProblemReporter::new(100);
    analyze_unit(&mut unit, &mut reporter);
    assert!(reporter.diagnostics().is_empty(), "{:?}", reporter.diagnostics());
}

#[test]
fn test_undeclared_exception_is_a_warning() {
    let compiled = check_source(
        "class A { void m() { throw new java.sql.SQLException(); } }",
        &Config::default().without_dialect(),
    )
    .expect("compile");
    assert_eq!(ids(&compiled.diagnostics), vec![ProblemId::UndeclaredException]);
    assert_eq!(compiled.diagnostics[0].severity, Severity::Warning);
    assert!(!compiled.has_errors());
}

#[test]
fn test_catch_all_throws_clause_covers_everything() {
    let compiled = check_source(
        "class A { void m() throws Exception { throw new java.io.IOException(); } }",
        &Config::default(),
    )
    .expect("compile");
    assert!(compiled.diagnostics.is_empty(), "{:?}", compiled.diagnostics);
}

#[test]
fn test_dialect_bodies_record_inferred_exceptions() {
    let mut unit = parse_aspect(
        "aspect A {\n  after(): call(* *(..)) { throw new java.io.IOException(); }\n  void Foo.run() { throw new InterruptedException(); }\n}",
    )
    .unit;
    let mut reporter = ProblemReporter::new(100);
    let stats = analyze_unit(&mut unit, &mut reporter);
    assert!(reporter.diagnostics().is_empty(), "{:?}", reporter.diagnostics());
    assert_eq!(stats.inferred, 2);

    let aspect = &unit.types[0];
    let advice = aspect.methods().find_map(|m| m.payload::<AdvicePayload>()).expect("advice");
    assert_eq!(advice.inferred_exceptions, vec!["IOException".to_string()]);
    let inter_type = aspect.methods().find_map(|m| m.payload::<InterTypePayload>()).expect("inter-type method");
    assert_eq!(inter_type.inferred_exceptions, vec!["InterruptedException".to_string()]);
}

#[test]
fn test_abandoned_unit_skips_flow() {
    let compiled = check_source("aspect A { pointcut p(): call(* *(..));", &Config::default()).expect("compile");
    assert!(compiled.is_abandoned());
    assert_eq!(compiled.flow.bodies, 0);
    assert!(!compiled.diagnostics.iter().any(|d| d.id == ProblemId::UninitializedLocal));
}

#[test]
fn test_unchecked_names() {
    assert!(is_unchecked("RuntimeException"));
    assert!(is_unchecked("Error"));
    assert!(is_unchecked("NullPointerException"));
    assert!(!is_unchecked("IOException"));
}
