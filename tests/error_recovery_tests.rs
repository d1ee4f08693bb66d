mod common;

use ajfront::aspect::PointcutPayload;
use ajfront::parser::{LineMap, RecoveryState};
use ajfront::{Config, Dialect, ProblemId, Severity};
use common::{init_logger, parse_aspect, parse_plain, parse_with};

#[test]
fn test_unclosed_aspect_terminates_with_partial_tree() {
    init_logger();
    let outcome = parse_aspect("aspect A { pointcut p(): call(* *(..));");
    assert!(!outcome.diagnostics.is_empty());
    assert_eq!(outcome.state, RecoveryState::Abandoned);
    let aspect = &outcome.unit.types[0];
    assert_eq!(aspect.name, "A");
    let pointcut = aspect.method("p").expect("pointcut survives");
    assert!(pointcut.payload::<PointcutPayload>().is_some());
}

#[test]
fn test_missing_semicolon_is_repaired() {
    let outcome = parse_plain("class A {\n  void m() {\n    int x = 1\n    x = 2;\n  }\n}");
    assert_eq!(outcome.state, RecoveryState::Parsing);
    assert_eq!(outcome.repairs, 1);
    let inserted = outcome
        .diagnostics
        .iter()
        .find(|d| d.id == ProblemId::InsertToComplete)
        .expect("insertion");
    assert_eq!(inserted.arguments[0], ";");
    assert_eq!(inserted.severity, Severity::Error);

    let lines = LineMap::new("class A {\n  void m() {\n    int x = 1\n    x = 2;\n  }\n}");
    assert_eq!(lines.location(inserted.span().start).line, 3);

    let method = outcome.unit.types[0].method("m").expect("method");
    assert_eq!(method.statements.as_ref().map(Vec::len), Some(2));
}

#[test]
fn test_missing_parenthesis_in_condition() {
    let outcome = parse_plain("class A { void m(boolean b) { if (b { return; } } }");
    assert!(outcome.has_errors());
    assert!(!outcome.is_abandoned());
    assert!(outcome.unit.types[0].method("m").is_some());
}

#[test]
fn test_error_budget_abandons_unit() {
    let config = Config {
        max_errors: 2,
        ..Config::default()
    };
    let mut parser = ajfront::Parser::new(config, Dialect::Disabled).expect("parser");
    let outcome = parser
        .parse_source("class A { void m() { ) ) ) ) ) ) ) ) } }")
        .expect("parse");
    assert!(outcome.is_abandoned());
    assert!(outcome.has(ProblemId::UnitAbandoned));
    assert!(outcome.errors().count() <= 3, "{:?}", outcome.diagnostics);
}

#[test]
fn test_garbage_input_terminates() {
    let outcome = parse_plain(") ) ( } { ; ; class");
    assert!(outcome.has_errors());
    assert!(outcome.unit.types.len() <= 1);
}

#[test]
fn test_empty_input_is_an_empty_unit() {
    let outcome = parse_plain("");
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    assert!(outcome.unit.types.is_empty());
    assert_eq!(outcome.state, RecoveryState::Parsing);
}

#[test]
fn test_lexical_error_is_reported() {
    let outcome = parse_plain("class A { int x = 1 # 2; }");
    assert!(outcome.has(ProblemId::LexicalError));
    assert_eq!(outcome.unit.types[0].name, "A");
}

#[test]
fn test_parser_recovers_between_units() {
    let mut parser = ajfront::Parser::new(Config::default(), Dialect::by_name("aspectj")).expect("parser");
    let broken = parser.parse_source("aspect A { pointcut p(): call(* *(..));").expect("parse");
    assert!(broken.is_abandoned());
    assert!(parser.stack_depths().is_zero());

    let clean = parser.parse_source("class B { int y; }").expect("parse");
    assert!(clean.diagnostics.is_empty(), "{:?}", clean.diagnostics);
    assert_eq!(clean.state, RecoveryState::Parsing);
    assert_eq!(clean.unit.types[0].name, "B");
}

#[test]
fn test_rendered_diagnostics_carry_positions() {
    let source = "class A {\n  int x = 1\n}";
    let outcome = parse_with(Dialect::Disabled, source);
    let lines = LineMap::new(source);
    let rendered: Vec<String> = outcome.diagnostics.iter().map(|d| d.render(&lines)).collect();
    assert!(!rendered.is_empty());
    assert!(rendered.iter().any(|r| r.contains("insert")), "{:?}", rendered);
}
