// Common test utilities
#![allow(dead_code)]

use ajfront::ast::{CompilationUnit, Declaration, FieldDeclaration, MethodDeclaration, TypeDeclaration, Visitor};
use ajfront::{Config, Dialect, ParseOutcome, Parser};

pub fn init_logger() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(log::LevelFilter::Debug)
        .try_init();
}

pub fn aspectj() -> Dialect {
    Dialect::by_name("aspectj")
}

/// Parse with the aspect dialect wired in.
pub fn parse_aspect(source: &str) -> ParseOutcome {
    parse_with(aspectj(), source)
}

/// Parse with the dialect disabled.
pub fn parse_plain(source: &str) -> ParseOutcome {
    parse_with(Dialect::Disabled, source)
}

pub fn parse_with(dialect: Dialect, source: &str) -> ParseOutcome {
    let mut parser = Parser::new(Config::default(), dialect).expect("parser");
    parser.parse_source(source).expect("parse")
}

/// Collects every declaration whose name range is not nested in its
/// declaration range.
#[derive(Default)]
pub struct PositionChecker {
    pub checked: usize,
    pub violations: Vec<String>,
}

impl PositionChecker {
    pub fn check(unit: &CompilationUnit) -> Self {
        let mut checker = Self::default();
        checker.visit_unit(unit);
        checker
    }

    fn record(&mut self, what: &str, name: &str, declaration: &dyn Declaration) {
        self.checked += 1;
        if !declaration.positions_nested() {
            self.violations.push(format!(
                "{} {}: name {}..={} in declaration {}..={}",
                what,
                name,
                declaration.source_start(),
                declaration.source_end(),
                declaration.declaration_source_start(),
                declaration.declaration_source_end()
            ));
        }
    }
}

impl Visitor for PositionChecker {
    fn visit_type(&mut self, ty: &TypeDeclaration) {
        self.record("type", &ty.name, ty);
        ajfront::ast::walk_type(self, ty);
    }

    fn visit_method(&mut self, method: &MethodDeclaration) {
        self.record("method", &method.selector, method);
        ajfront::ast::walk_method(self, method);
    }

    fn visit_field(&mut self, field: &FieldDeclaration) {
        self.record("field", &field.name, field);
    }
}
