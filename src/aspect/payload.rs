//! Dialect state carried by aspect-built nodes.

use crate::ast::{Argument, DialectPayload, Expression, TypeReference};
use crate::parser::span::Span;

use super::declare::Declare;
use super::pointcut::{PerClause, Pointcut};

/// One raw token captured inside a pointcut, per-clause or declare body.
#[derive(Debug, Clone, PartialEq)]
pub struct PseudoToken {
    pub value: String,
    pub is_identifier: bool,
    /// `"string"`, `"int"`, ... when the token is a literal.
    pub literal_kind: Option<String>,
    /// The guard of an `if(..)` token.
    pub condition: Option<Expression>,
    pub span: Span,
}

impl PseudoToken {
    pub fn new(value: impl Into<String>, is_identifier: bool, span: Span) -> Self {
        Self {
            value: value.into(),
            is_identifier,
            literal_kind: None,
            condition: None,
            span,
        }
    }

    pub fn is(&self, value: &str) -> bool {
        self.condition.is_none() && self.value == value
    }

    /// Literal text with its quotes removed.
    pub fn unquoted(&self) -> &str {
        let value = self.value.as_str();
        if self.literal_kind.as_deref() == Some("string") && value.len() >= 2 {
            &value[1..value.len() - 1]
        } else {
            value
        }
    }
}

impl DialectPayload for PseudoToken {
    fn kind(&self) -> &'static str {
        "pseudo token"
    }

    fn describe(&self) -> String {
        match &self.condition {
            Some(condition) => format!("if({})", condition),
            None => self.value.clone(),
        }
    }

    crate::dialect_payload_plumbing!();
}

/// A run of pseudo tokens, closed by its terminator.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PseudoTokens {
    pub tokens: Vec<PseudoToken>,
}

impl PseudoTokens {
    /// Source text of `tokens[from..to]`, with a space wherever the source had a gap.
    pub fn text(&self, from: usize, to: usize) -> String {
        let end = to.min(self.tokens.len());
        render(&self.tokens[from.min(end)..end])
    }

    pub fn span(&self) -> Span {
        match (self.tokens.first(), self.tokens.last()) {
            (Some(first), Some(last)) => first.span.to(last.span),
            _ => Span::default(),
        }
    }
}

pub(crate) fn render(tokens: &[PseudoToken]) -> String {
    let mut out = String::new();
    let mut previous_end: Option<usize> = None;
    for token in tokens {
        if let Some(end) = previous_end {
            if token.span.start > end + 1 {
                out.push(' ');
            }
        }
        match &token.condition {
            Some(condition) => out.push_str(&format!("if({})", condition)),
            None => out.push_str(&token.value),
        }
        previous_end = Some(token.span.end);
    }
    out
}

impl DialectPayload for PseudoTokens {
    fn kind(&self) -> &'static str {
        "pseudo tokens"
    }

    fn describe(&self) -> String {
        render(&self.tokens)
    }

    crate::dialect_payload_plumbing!();
}

/// A parsed pointcut expression, as a node of its own before it is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct Designator {
    /// `None` when the tokens did not form a pointcut.
    pub pointcut: Option<Pointcut>,
    pub source: String,
}

impl DialectPayload for Designator {
    fn kind(&self) -> &'static str {
        "pointcut designator"
    }

    fn describe(&self) -> String {
        self.source.clone()
    }

    crate::dialect_payload_plumbing!();
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AspectPayload {
    pub privileged: bool,
    pub per_clause: Option<PerClause>,
    /// Type pattern of an old-style `dominates` clause.
    pub dominates: Option<String>,
}

impl DialectPayload for AspectPayload {
    fn kind(&self) -> &'static str {
        "aspect"
    }

    fn describe(&self) -> String {
        let mut text = if self.privileged {
            "privileged aspect".to_string()
        } else {
            "aspect".to_string()
        };
        if let Some(per_clause) = &self.per_clause {
            text.push_str(&format!(" {}", per_clause));
        }
        if let Some(dominates) = &self.dominates {
            text.push_str(&format!(" dominates {}", dominates));
        }
        text
    }

    crate::dialect_payload_plumbing!();
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PointcutPayload {
    pub designator: Option<Designator>,
}

impl DialectPayload for PointcutPayload {
    fn kind(&self) -> &'static str {
        "pointcut"
    }

    fn describe(&self) -> String {
        match &self.designator {
            Some(designator) => format!("pointcut [{}]", designator.source),
            None => "pointcut".to_string(),
        }
    }

    crate::dialect_payload_plumbing!();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdviceKind {
    Before,
    After,
    AfterReturning,
    AfterThrowing,
    Around,
}

impl AdviceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AdviceKind::Before => "before",
            AdviceKind::After => "after",
            AdviceKind::AfterReturning => "after returning",
            AdviceKind::AfterThrowing => "after throwing",
            AdviceKind::Around => "around",
        }
    }

    pub fn is_after(self) -> bool {
        matches!(self, AdviceKind::After | AdviceKind::AfterReturning | AdviceKind::AfterThrowing)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdvicePayload {
    pub kind: AdviceKind,
    pub designator: Option<Designator>,
    /// The formal of `returning(..)` / `throwing(..)`.
    pub extra_argument: Option<Argument>,
    /// Checked exceptions the body may throw, filled in by flow analysis.
    pub inferred_exceptions: Vec<String>,
}

impl AdvicePayload {
    pub fn new(kind: AdviceKind) -> Self {
        Self {
            kind,
            designator: None,
            extra_argument: None,
            inferred_exceptions: Vec::new(),
        }
    }
}

impl DialectPayload for AdvicePayload {
    fn kind(&self) -> &'static str {
        match self.kind {
            AdviceKind::Before => "before advice",
            AdviceKind::Around => "around advice",
            _ => "after advice",
        }
    }

    fn describe(&self) -> String {
        let mut text = self.kind.as_str().to_string();
        if let Some(extra) = &self.extra_argument {
            text.push_str(&format!("({})", extra));
        }
        if let Some(designator) = &self.designator {
            text.push_str(&format!(" [{}]", designator.source));
        }
        text
    }

    fn infers_exceptions(&self) -> bool {
        true
    }

    fn record_inferred_exceptions(&mut self, names: Vec<String>) {
        self.inferred_exceptions = names;
    }

    crate::dialect_payload_plumbing!();
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeclarePayload {
    pub declare: Declare,
}

impl DialectPayload for DeclarePayload {
    fn kind(&self) -> &'static str {
        "declare"
    }

    fn describe(&self) -> String {
        self.declare.to_string()
    }

    crate::dialect_payload_plumbing!();
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterTypeKind {
    Field,
    Method,
    Constructor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterTypePayload {
    pub kind: InterTypeKind,
    pub on_type: Option<TypeReference>,
    /// Modifiers as written; the member itself may be rewritten later.
    pub declared_modifiers: u32,
    pub initialization: Option<Expression>,
    pub inferred_exceptions: Vec<String>,
}

impl InterTypePayload {
    pub fn new(kind: InterTypeKind) -> Self {
        Self {
            kind,
            on_type: None,
            declared_modifiers: 0,
            initialization: None,
            inferred_exceptions: Vec::new(),
        }
    }
}

impl DialectPayload for InterTypePayload {
    fn kind(&self) -> &'static str {
        match self.kind {
            InterTypeKind::Field => "inter-type field",
            InterTypeKind::Method => "inter-type method",
            InterTypeKind::Constructor => "inter-type constructor",
        }
    }

    fn describe(&self) -> String {
        match &self.on_type {
            Some(on_type) => format!("{} on {}", self.kind(), on_type),
            None => self.kind().to_string(),
        }
    }

    fn infers_exceptions(&self) -> bool {
        self.kind != InterTypeKind::Field
    }

    fn record_inferred_exceptions(&mut self, names: Vec<String>) {
        self.inferred_exceptions = names;
    }

    crate::dialect_payload_plumbing!();
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct InterTypeClassPayload {
    pub on_type: Option<TypeReference>,
}

impl DialectPayload for InterTypeClassPayload {
    fn kind(&self) -> &'static str {
        "inter-type member class"
    }

    fn describe(&self) -> String {
        match &self.on_type {
            Some(on_type) => format!("class on {}", on_type),
            None => "class".to_string(),
        }
    }

    crate::dialect_payload_plumbing!();
}
