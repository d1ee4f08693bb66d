mod common;

use ajfront::ast::{Expression, Member, Statement, TypeKind};
use ajfront::parser::{parse, parse_tokens, Lexer, VecTokenStream};
use ajfront::{Config, Dialect, Parser, ProblemId};
use common::{parse_aspect, parse_plain, PositionChecker};

const DIALECT_SNIPPETS: &[&str] = &[
    "public aspect Tracing { }",
    "privileged aspect P percflow(execution(* main(..))) { int n; }",
    "aspect A { pointcut p(): call(* *(..)); }",
    "aspect A { abstract pointcut q(); }",
    "aspect A { before(): execution(* *(..)) { } }",
    "aspect A { after() returning (String s): call(* *(..)) { } }",
    "aspect A { after() throwing (Exception e): call(* *(..)) { } }",
    "aspect A { Object around(int x): call(* *(..)) && args(x) { return proceed(x); } }",
    "aspect A { declare parents: Foo extends Bar; }",
    "aspect A { declare error: call(* *(..)): \"no\"; }",
    "aspect A { declare soft: Exception: execution(* *(..)); }",
    "aspect A { declare precedence: A, B; }",
    "aspect A { declare @type: Foo: @Marker; }",
    "aspect A { private int Foo.count = 1; }",
    "aspect A { public void Foo.m(int i) throws Exception { } }",
    "aspect A { public Foo.new(String s) { this(); } }",
    "aspect A { class Foo.Helper { } }",
];

#[test]
fn test_compilation_unit_shape() {
    let source = r#"
package com.example.app;

import java.util.List;
import java.util.*;

public abstract class Shape<T extends Comparable<T>> extends Base implements Drawable, java.io.Serializable {
    protected static final int SIDES = 4;
    private List<List<T>> nested;

    public Shape(int sides) { super(); }

    abstract double area();

    static { init(); }

    interface Visitor { void visit(Shape<?> shape); }
}
"#;
    let outcome = parse_plain(source);
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    let unit = &outcome.unit;
    assert_eq!(unit.package.as_ref().map(|p| p.name.to_string()), Some("com.example.app".to_string()));
    assert_eq!(unit.imports.len(), 2);
    let shape = &unit.types[0];
    assert_eq!(shape.kind, TypeKind::Class);
    assert_eq!(shape.type_parameters.len(), 1);
    assert_eq!(shape.super_interfaces.len(), 2);
    assert_eq!(shape.fields().count(), 2);
    assert!(shape.methods().any(|m| m.is_constructor()));
    assert!(shape.members.iter().any(|m| matches!(m, Member::Initializer(_))));
    let visitor = shape.member_types().next().expect("member interface");
    assert_eq!(visitor.kind, TypeKind::Interface);
}

#[test]
fn test_statements_and_expressions() {
    let source = r#"
class Flow {
    int run(int[] values, boolean strict) {
        int total = 0;
        outer:
        for (int i = 0; i < values.length; i++) {
            if (values.length > 10 && !strict) continue outer;
            total += values.length * 2 + 1;
        }
        for (String s : names()) { total++; }
        do { total--; } while (total > 100);
        try {
            total = compute(total) ? 1 : 0;
        } catch (IllegalStateException e) {
            throw new RuntimeException("bad");
        } finally {
            done();
        }
        assert total >= 0 : "negative";
        return total instanceof Integer ? total : -1;
    }
}
"#;
    let outcome = parse_plain(source);
    assert!(!outcome.has_errors(), "{:?}", outcome.diagnostics);
    let method = outcome.unit.types[0].method("run").expect("run");
    let statements = method.statements.as_ref().expect("body");
    assert!(matches!(statements[0], Statement::LocalDeclaration(_)));
    assert!(matches!(statements[1], Statement::Labeled { .. }));
    assert!(statements.iter().any(|s| matches!(s, Statement::ForEach { .. })));
    assert!(statements.iter().any(|s| matches!(s, Statement::Try { finally: Some(_), .. })));
    match statements.last() {
        Some(Statement::Return {
            expression: Some(Expression::Conditional { .. }),
            ..
        }) => {}
        other => panic!("unexpected last statement {:?}", other),
    }
}

#[test]
fn test_position_containment_over_dialect_snippets() {
    for snippet in DIALECT_SNIPPETS {
        let outcome = parse_aspect(snippet);
        assert!(!outcome.has_errors(), "{}: {:?}", snippet, outcome.diagnostics);
        let checker = PositionChecker::check(&outcome.unit);
        assert!(checker.checked >= 1, "{}", snippet);
        assert!(checker.violations.is_empty(), "{}: {:?}", snippet, checker.violations);
    }
}

#[test]
fn test_idempotent_reparse_with_fresh_parsers() {
    for snippet in DIALECT_SNIPPETS {
        let first = parse_aspect(snippet);
        let second = parse_aspect(snippet);
        assert_eq!(first.unit, second.unit, "{}", snippet);
        assert_eq!(first.diagnostics, second.diagnostics, "{}", snippet);
    }
}

#[test]
fn test_reused_parser_leaves_stacks_empty() {
    let mut parser = Parser::new(Config::default(), Dialect::by_name("aspectj")).expect("parser");
    for snippet in DIALECT_SNIPPETS {
        let outcome = parser.parse_source(snippet).expect("parse");
        assert!(!outcome.has_errors(), "{}: {:?}", snippet, outcome.diagnostics);
        assert!(parser.stack_depths().is_zero(), "{}: {}", snippet, parser.stack_depths());
    }
}

#[test]
fn test_token_stream_and_text_agree() {
    let source = "aspect A { before(): execution(* *(..)) { } }";
    let tokens = Lexer::new(source).tokenize().expect("tokens");
    let mut stream = VecTokenStream::new(tokens);
    let from_tokens = parse_tokens(&mut stream, Config::default(), Dialect::by_name("aspectj")).expect("parse");
    let from_text = parse(source, Config::default(), Dialect::by_name("aspectj")).expect("parse");
    assert_eq!(from_tokens.unit, from_text.unit);
}

#[test]
fn test_nested_generic_closers() {
    let outcome = parse_plain("class A { java.util.Map<String, java.util.List<java.util.List<Integer>>> m; }");
    assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
    let field = outcome.unit.types[0].fields().next().expect("field");
    assert_eq!(field.type_ref.to_string(), "java.util.Map<String, java.util.List<java.util.List<Integer>>>");
}

#[test]
fn test_duplicate_modifier() {
    let outcome = parse_plain("class A { public public int x; }");
    assert!(outcome.has(ProblemId::DuplicateModifier));
    assert_eq!(outcome.unit.types[0].fields().count(), 1);
}
