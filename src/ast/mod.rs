//! Abstract syntax tree
//!
//! Declarations, statements and expressions of the base language. Dialect
//! constructs reuse the base declaration shapes (an advice is a method, an
//! aspect is a type) and hang their extra state off an opaque
//! [`DialectPayload`], so nothing in here knows what an aspect is.

use std::any::Any;
use std::fmt;

pub mod nodes;
pub mod printer;
pub mod visitor;

pub use nodes::*;
pub use printer::AstPrinter;
pub use visitor::{walk_expression, walk_method, walk_statement, walk_type, walk_unit, Visitor};

use crate::parser::span::Span;

/// State a dialect attaches to the nodes it creates.
pub trait DialectPayload: fmt::Debug + Send + Sync + Any {
    /// Short construct name: `"aspect"`, `"before advice"`, `"pseudo token"`...
    fn kind(&self) -> &'static str;

    /// One-line rendering for tree dumps.
    fn describe(&self) -> String {
        self.kind().to_string()
    }

    /// Whether flow analysis records the escaping exceptions on the payload
    /// instead of reporting undeclared ones.
    fn infers_exceptions(&self) -> bool {
        false
    }

    fn record_inferred_exceptions(&mut self, _names: Vec<String>) {}

    fn box_clone(&self) -> Box<dyn DialectPayload>;
    fn dyn_eq(&self, other: &dyn DialectPayload) -> bool;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl Clone for Box<dyn DialectPayload> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

impl PartialEq for dyn DialectPayload {
    fn eq(&self, other: &Self) -> bool {
        self.dyn_eq(other)
    }
}

/// Implements the plumbing methods of [`DialectPayload`] for a
/// `Clone + PartialEq` type.
#[macro_export]
macro_rules! dialect_payload_plumbing {
    () => {
        fn box_clone(&self) -> Box<dyn $crate::ast::DialectPayload> {
            Box::new(self.clone())
        }

        fn dyn_eq(&self, other: &dyn $crate::ast::DialectPayload) -> bool {
            other.as_any().downcast_ref::<Self>().map_or(false, |other| self == other)
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    };
}

/// A dialect-only node: a pseudo token, a pseudo token run or a parsed
/// pointcut designator. Never part of a finished tree except inside a payload.
#[derive(Debug, Clone)]
pub struct DialectNode {
    pub source_start: usize,
    pub source_end: usize,
    pub payload: Box<dyn DialectPayload>,
}

impl PartialEq for DialectNode {
    fn eq(&self, other: &Self) -> bool {
        self.source_start == other.source_start
            && self.source_end == other.source_end
            && self.payload.dyn_eq(other.payload.as_ref())
    }
}

impl DialectNode {
    pub fn new(span: Span, payload: Box<dyn DialectPayload>) -> Self {
        Self {
            source_start: span.start,
            source_end: span.end,
            payload,
        }
    }

    pub fn span(&self) -> Span {
        Span::new(self.source_start, self.source_end)
    }

    pub fn downcast<T: DialectPayload>(&self) -> Option<&T> {
        self.payload.as_any().downcast_ref::<T>()
    }
}

/// One variable declarator, before it is split into fields or locals.
#[derive(Debug, Clone, PartialEq)]
pub struct Declarator {
    pub name: String,
    pub name_span: Span,
    pub dims: usize,
    pub initializer: Option<Expression>,
    pub span: Span,
}

/// The `returning`/`throwing` clause of after advice.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtraParameter {
    pub name: String,
    pub name_span: Span,
    pub argument: Option<Argument>,
}

/// Entries of the parser's AST stack.
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode {
    Package(PackageDeclaration),
    Import(ImportReference),
    Type(TypeDeclaration),
    Method(MethodDeclaration),
    Field(FieldDeclaration),
    Initializer(Initializer),
    Argument(Argument),
    Statement(Statement),
    Catch(CatchClause),
    Declarator(Declarator),
    ExtraParam(ExtraParameter),
    Dialect(DialectNode),
}

impl AstNode {
    pub fn kind_name(&self) -> &'static str {
        match self {
            AstNode::Package(_) => "package",
            AstNode::Import(_) => "import",
            AstNode::Type(_) => "type",
            AstNode::Method(_) => "method",
            AstNode::Field(_) => "field",
            AstNode::Initializer(_) => "initializer",
            AstNode::Argument(_) => "argument",
            AstNode::Statement(_) => "statement",
            AstNode::Catch(_) => "catch",
            AstNode::Declarator(_) => "declarator",
            AstNode::ExtraParam(_) => "extra parameter",
            AstNode::Dialect(_) => "dialect node",
        }
    }

    /// Payload of a dialect-built declaration or dialect node, if any.
    pub fn dialect(&self) -> Option<&dyn DialectPayload> {
        match self {
            AstNode::Type(ty) => ty.dialect.as_deref(),
            AstNode::Method(method) => method.dialect.as_deref(),
            AstNode::Dialect(node) => Some(node.payload.as_ref()),
            _ => None,
        }
    }

    pub fn into_member(self) -> Option<Member> {
        match self {
            AstNode::Type(ty) => Some(Member::Type(ty)),
            AstNode::Method(method) => Some(Member::Method(method)),
            AstNode::Field(field) => Some(Member::Field(field)),
            AstNode::Initializer(init) => Some(Member::Initializer(init)),
            _ => None,
        }
    }
}
