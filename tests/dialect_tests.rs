mod common;

use std::sync::Arc;

use ajfront::aspect::{
    AdviceKind, AdvicePayload, AspectFactory, AspectPayload, Declare, DeclarePayload, InterTypeKind, InterTypePayload,
    PerClauseKind, Pointcut, PointcutPayload,
};
use ajfront::factory::{lookup, register, registered_names};
use ajfront::{DeclarationFactory, Dialect, ProblemId};
use common::{aspectj, init_logger, parse_aspect, parse_plain, parse_with};

fn aspect_payload(outcome: &ajfront::ParseOutcome) -> &AspectPayload {
    outcome.unit.types[0]
        .dialect
        .as_ref()
        .and_then(|d| d.as_any().downcast_ref::<AspectPayload>())
        .expect("aspect payload")
}

#[test]
fn test_pointcut_tree_shape() {
    init_logger();
    let outcome = parse_aspect(
        "aspect A {\n  pointcut p(): call(* Foo.*(..)) && !within(A);\n  before(): p() || cflow(p()) { }\n}",
    );
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    let aspect = &outcome.unit.types[0];

    let pointcut = aspect
        .method("p")
        .and_then(|m| m.payload::<PointcutPayload>())
        .and_then(|p| p.designator.as_ref())
        .and_then(|d| d.pointcut.as_ref())
        .expect("pointcut tree");
    match pointcut {
        Pointcut::And(left, right) => {
            assert!(matches!(**left, Pointcut::Kinded { ref designator, .. } if designator == "call"));
            assert!(matches!(**right, Pointcut::Not(_)));
        }
        other => panic!("expected a conjunction, got {}", other),
    }

    let advice = aspect
        .methods()
        .find_map(|m| m.payload::<AdvicePayload>())
        .expect("advice");
    assert_eq!(advice.kind, AdviceKind::Before);
    let designator = advice.designator.as_ref().and_then(|d| d.pointcut.as_ref()).expect("designator");
    assert_eq!(designator.references(), vec!["p", "p"]);
}

#[test]
fn test_per_clauses() {
    let cases = [
        ("aspect A percflow(call(* *(..))) { }", PerClauseKind::PerCflow),
        ("aspect A percflowbelow(call(* *(..))) { }", PerClauseKind::PerCflowBelow),
        ("aspect A pertarget(call(* *(..))) { }", PerClauseKind::PerTarget),
        ("aspect A issingleton() { }", PerClauseKind::Singleton),
    ];
    for (source, kind) in cases {
        let outcome = parse_aspect(source);
        assert!(outcome.diagnostics.is_empty(), "{}: {:?}", source, outcome.diagnostics);
        let payload = aspect_payload(&outcome);
        assert_eq!(payload.per_clause.as_ref().map(|p| p.kind), Some(kind), "{}", source);
    }
}

#[test]
fn test_declare_kinds() {
    let outcome = parse_aspect(
        "aspect A {\n  declare parents: Foo extends Bar;\n  declare soft: java.io.IOException: call(* *(..));\n  declare precedence: A, B*;\n  declare error: call(* *(..)): \"never\";\n}",
    );
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    let declares: Vec<&Declare> = outcome.unit.types[0]
        .methods()
        .filter_map(|m| m.payload::<DeclarePayload>())
        .map(|p| &p.declare)
        .collect();
    assert_eq!(declares.len(), 4);
    assert_eq!(
        declares[0],
        &Declare::Parents {
            child: "Foo".to_string(),
            is_extends: true,
            parents: vec!["Bar".to_string()],
        }
    );
    assert!(matches!(declares[1], Declare::Soft { exception, .. } if exception == "java.io.IOException"));
    assert_eq!(
        declares[2],
        &Declare::Precedence {
            patterns: vec!["A".to_string(), "B*".to_string()],
        }
    );
    assert!(matches!(declares[3], Declare::Message { is_error: true, message, .. } if message == "never"));
}

#[test]
fn test_malformed_declare_keeps_a_node() {
    let outcome = parse_aspect("aspect A { declare sometimes: Foo; }");
    assert!(outcome.has(ProblemId::DeclareSyntax));
    let declare = outcome.unit.types[0]
        .methods()
        .find_map(|m| m.payload::<DeclarePayload>())
        .expect("declare node");
    assert!(matches!(declare.declare, Declare::Invalid { ref kind, .. } if kind == "sometimes"));
}

#[test]
fn test_inter_type_declarations() {
    let outcome = parse_aspect("aspect A {\n  private int Foo.count;\n  String Foo.name() { return null; }\n}");
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    let payloads: Vec<&InterTypePayload> = outcome.unit.types[0]
        .methods()
        .filter_map(|m| m.payload::<InterTypePayload>())
        .collect();
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[0].kind, InterTypeKind::Field);
    assert_eq!(payloads[1].kind, InterTypeKind::Method);
    for payload in payloads {
        assert_eq!(payload.on_type.as_ref().map(|t| t.simple_name()), Some("Foo"));
    }
}

#[test]
fn test_invalid_extra_parameter() {
    let outcome = parse_aspect("aspect A { after() thrown: call(* *(..)) { } }");
    let problem = outcome
        .diagnostics
        .iter()
        .find(|d| d.id == ProblemId::InvalidExtraParameter)
        .expect("extra parameter problem");
    assert_eq!(problem.arguments, vec!["thrown", "throwing", "returning", ":"]);
    assert_eq!(outcome.unit.types[0].methods().count(), 1);
}

#[test]
fn test_after_throwing_binds_extra_argument() {
    let outcome = parse_aspect("aspect A { after() throwing (Exception e): call(* *(..)) { } }");
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    let advice = outcome.unit.types[0]
        .methods()
        .find_map(|m| m.payload::<AdvicePayload>())
        .expect("advice");
    assert_eq!(advice.kind, AdviceKind::AfterThrowing);
    assert_eq!(advice.extra_argument.as_ref().map(|a| a.name.as_str()), Some("e"));
}

#[test]
fn test_disabled_dialect_reports_unavailable_once() {
    let outcome = parse_plain("aspect A { before(): execution(* *(..)) { } }");
    let unavailable: Vec<_> = outcome
        .diagnostics
        .iter()
        .filter(|d| d.id == ProblemId::FeatureUnavailable)
        .collect();
    assert_eq!(unavailable.len(), 1);
    assert!(!outcome.is_abandoned());
    assert_eq!(outcome.unit.types.len(), 1);
}

#[test]
fn test_disabled_dialect_with_many_constructs() {
    let outcome = parse_plain(
        "aspect A {\n  pointcut p(): call(* *(..));\n  before(): p() { }\n  after(): p() { }\n  int Foo.x;\n}",
    );
    let unavailable = outcome
        .diagnostics
        .iter()
        .filter(|d| d.id == ProblemId::FeatureUnavailable)
        .count();
    assert_eq!(unavailable, 1);
    assert_eq!(outcome.unit.types[0].dialect_kind(), Some("unavailable"));
}

#[test]
fn test_plain_java_needs_no_dialect() {
    let source = "class A { int f(int x) { return x + 1; } }";
    let plain = parse_plain(source);
    let aspect = parse_aspect(source);
    assert!(plain.diagnostics.is_empty(), "{:?}", plain.diagnostics);
    assert!(aspect.diagnostics.is_empty(), "{:?}", aspect.diagnostics);
    assert_eq!(plain.unit.types[0].methods().count(), aspect.unit.types[0].methods().count());
}

#[test]
fn test_designator_names_are_plain_identifiers() {
    let outcome = parse_aspect("class A { int within; void call(int execution) { within = execution; } }");
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    let ty = &outcome.unit.types[0];
    assert_eq!(ty.fields().next().map(|f| f.name.as_str()), Some("within"));
    assert!(ty.method("call").is_some());
}

#[test]
fn test_wildcard_inter_type_name_is_repaired() {
    let outcome = parse_aspect("aspect A { int Foo.*; }");
    let deleted = outcome
        .diagnostics
        .iter()
        .find(|d| d.id == ProblemId::DeleteToken)
        .expect("delete token");
    assert_eq!(deleted.arguments, vec!["*"]);
    let methods: Vec<_> = outcome.unit.types[0].methods().collect();
    assert_eq!(methods.len(), 1);
    assert!(methods[0].payload::<InterTypePayload>().is_some());
}

#[test]
fn test_registry() {
    assert!(registered_names().iter().any(|name| name == "aspectj"));
    assert!(lookup("aspectj").is_some());
    assert!(lookup("no-such-dialect").is_none());
    assert!(!Dialect::by_name("no-such-dialect").is_enabled());

    let factory: Arc<dyn DeclarationFactory> = Arc::new(AspectFactory::new());
    assert!(register("aspectj-copy", factory.clone()));
    assert!(!register("aspectj-copy", factory));
    assert!(registered_names().iter().any(|name| name == "aspectj-copy"));

    let dialect = Dialect::by_name("aspectj-copy");
    assert!(dialect.is_enabled());
    let outcome = parse_with(dialect, "aspect B { before(): call(* *(..)) { } }");
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
}

#[test]
fn test_dialect_names() {
    assert_eq!(aspectj().name(), "aspectj");
    assert_eq!(Dialect::Disabled.name(), "none");
    assert!(Dialect::Disabled.factory().is_none());
}
