//! Pointcut designators and per-clauses, re-read from pseudo tokens.
//!
//! The main grammar only collects the tokens of a pointcut. This module turns
//! that flat run into a tree with a small recursive descent parser:
//!
//! ```text
//! or      := and ('||' and)*
//! and     := unary ('&&' unary)*
//! unary   := '!' unary | primary
//! primary := '(' or ')' | if(..) | name '(' tokens ')'
//! ```

use std::fmt;

use crate::ast::Expression;
use crate::parser::span::Span;

use super::payload::{render, PseudoToken};

/// Designators whose argument is a pattern, not a nested pointcut.
const KINDED: &[&str] = &[
    "call",
    "execution",
    "get",
    "set",
    "handler",
    "initialization",
    "preinitialization",
    "staticinitialization",
    "adviceexecution",
    "within",
    "withincode",
    "this",
    "target",
    "args",
    "@annotation",
    "@within",
    "@withincode",
    "@this",
    "@target",
    "@args",
];

#[derive(Debug, Clone, PartialEq)]
pub enum Pointcut {
    And(Box<Pointcut>, Box<Pointcut>),
    Or(Box<Pointcut>, Box<Pointcut>),
    Not(Box<Pointcut>),
    /// `call(..)`, `within(..)`, `args(..)` and the other pattern designators
    Kinded {
        designator: String,
        pattern: String,
        span: Span,
    },
    Cflow {
        below: bool,
        inner: Box<Pointcut>,
        span: Span,
    },
    If {
        condition: Expression,
        span: Span,
    },
    /// Use of a named pointcut
    Reference {
        name: String,
        arguments: Vec<String>,
        span: Span,
    },
}

impl Pointcut {
    fn precedence(&self) -> u8 {
        match self {
            Pointcut::Or(..) => 1,
            Pointcut::And(..) => 2,
            _ => 3,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, parent: u8) -> fmt::Result {
        if self.precedence() < parent {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }

    /// Names of the pointcuts this one refers to, in source order.
    pub fn references(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_references(&mut names);
        names
    }

    fn collect_references<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Pointcut::And(left, right) | Pointcut::Or(left, right) => {
                left.collect_references(names);
                right.collect_references(names);
            }
            Pointcut::Not(inner) | Pointcut::Cflow { inner, .. } => inner.collect_references(names),
            Pointcut::Reference { name, .. } => names.push(name.as_str()),
            Pointcut::Kinded { .. } | Pointcut::If { .. } => {}
        }
    }
}

impl fmt::Display for Pointcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pointcut::And(left, right) => {
                left.fmt_operand(f, 2)?;
                write!(f, " && ")?;
                right.fmt_operand(f, 2)
            }
            Pointcut::Or(left, right) => {
                left.fmt_operand(f, 1)?;
                write!(f, " || ")?;
                right.fmt_operand(f, 1)
            }
            Pointcut::Not(inner) => {
                write!(f, "!")?;
                inner.fmt_operand(f, 3)
            }
            Pointcut::Kinded { designator, pattern, .. } => write!(f, "{}({})", designator, pattern),
            Pointcut::Cflow { below, inner, .. } => {
                write!(f, "{}({})", if *below { "cflowbelow" } else { "cflow" }, inner)
            }
            Pointcut::If { condition, .. } => write!(f, "if({})", condition),
            Pointcut::Reference { name, arguments, .. } => write!(f, "{}({})", name, arguments.join(", ")),
        }
    }
}

/// A problem found while re-reading pseudo tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxProblem {
    pub message: String,
    pub span: Span,
}

impl SyntaxProblem {
    fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

pub type SyntaxResult<T> = Result<T, SyntaxProblem>;

/// Cursor over a token slice; `end` is where a missing token is reported.
pub(crate) struct TokenCursor<'a> {
    tokens: &'a [PseudoToken],
    pos: usize,
    end: Span,
}

impl<'a> TokenCursor<'a> {
    pub(crate) fn new(tokens: &'a [PseudoToken], end: Span) -> Self {
        Self { tokens, pos: 0, end }
    }

    pub(crate) fn peek(&self) -> Option<&'a PseudoToken> {
        self.tokens.get(self.pos)
    }

    fn peek_is(&self, value: &str) -> bool {
        self.peek().map_or(false, |t| t.is(value))
    }

    pub(crate) fn advance(&mut self) -> Option<&'a PseudoToken> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(crate) fn current_span(&self) -> Span {
        self.peek().map_or(self.end, |t| t.span)
    }

    pub(crate) fn expect(&mut self, value: &str) -> SyntaxResult<&'a PseudoToken> {
        match self.peek() {
            Some(token) if token.is(value) => {
                self.pos += 1;
                Ok(token)
            }
            Some(token) => Err(SyntaxProblem::new(
                format!("expected \"{}\" but found \"{}\"", value, token.value),
                token.span,
            )),
            None => Err(SyntaxProblem::new(format!("expected \"{}\"", value), self.end)),
        }
    }

    /// Tokens up to the `)` matching an already consumed `(`; the `)` is consumed.
    pub(crate) fn balanced(&mut self) -> SyntaxResult<&'a [PseudoToken]> {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            if token.is("(") {
                depth += 1;
            } else if token.is(")") {
                if depth == 0 {
                    let inner = &self.tokens[start..self.pos];
                    self.pos += 1;
                    return Ok(inner);
                }
                depth -= 1;
            }
            self.pos += 1;
        }
        Err(SyntaxProblem::new("unbalanced parentheses", self.end))
    }

    pub(crate) fn rest(&self) -> &'a [PseudoToken] {
        &self.tokens[self.pos.min(self.tokens.len())..]
    }

    pub(crate) fn expect_end(&self) -> SyntaxResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(token) => Err(SyntaxProblem::new(format!("unexpected \"{}\"", token.value), token.span)),
        }
    }
}

/// Split a token slice on top-level commas.
pub(crate) fn split_top_level<'a>(tokens: &'a [PseudoToken], separator: &str) -> Vec<&'a [PseudoToken]> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, token) in tokens.iter().enumerate() {
        if token.is("(") || token.is("<") {
            depth += 1;
        } else if (token.is(")") || token.is(">")) && depth > 0 {
            depth -= 1;
        } else if depth == 0 && token.is(separator) {
            parts.push(&tokens[start..i]);
            start = i + 1;
        }
    }
    if start < tokens.len() || !parts.is_empty() {
        parts.push(&tokens[start..]);
    }
    parts
}

fn span_of(tokens: &[PseudoToken], fallback: Span) -> Span {
    match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => first.span.to(last.span),
        _ => fallback,
    }
}

/// Parse a complete pointcut; every token must be used.
pub fn parse_pointcut(tokens: &[PseudoToken], end: Span) -> SyntaxResult<Pointcut> {
    let mut cursor = TokenCursor::new(tokens, end);
    if cursor.at_end() {
        return Err(SyntaxProblem::new("missing pointcut", end));
    }
    let pointcut = parse_or(&mut cursor)?;
    cursor.expect_end()?;
    Ok(pointcut)
}

fn parse_or(cursor: &mut TokenCursor<'_>) -> SyntaxResult<Pointcut> {
    let mut left = parse_and(cursor)?;
    while cursor.peek_is("||") {
        cursor.advance();
        let right = parse_and(cursor)?;
        left = Pointcut::Or(Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn parse_and(cursor: &mut TokenCursor<'_>) -> SyntaxResult<Pointcut> {
    let mut left = parse_unary(cursor)?;
    while cursor.peek_is("&&") {
        cursor.advance();
        let right = parse_unary(cursor)?;
        left = Pointcut::And(Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn parse_unary(cursor: &mut TokenCursor<'_>) -> SyntaxResult<Pointcut> {
    if cursor.peek_is("!") {
        cursor.advance();
        let inner = parse_unary(cursor)?;
        return Ok(Pointcut::Not(Box::new(inner)));
    }
    parse_primary(cursor)
}

fn parse_primary(cursor: &mut TokenCursor<'_>) -> SyntaxResult<Pointcut> {
    let span = cursor.current_span();
    let token = cursor
        .advance()
        .ok_or_else(|| SyntaxProblem::new("missing pointcut", span))?;

    if let Some(condition) = &token.condition {
        return Ok(Pointcut::If {
            condition: condition.clone(),
            span: token.span,
        });
    }
    if token.is("(") {
        let inner = parse_or(cursor)?;
        cursor.expect(")")?;
        return Ok(inner);
    }

    let (name, name_span) = if token.is("@") {
        let next = cursor
            .expect_identifier()
            .map_err(|_| SyntaxProblem::new("expected an annotation designator after \"@\"", token.span))?;
        (format!("@{}", next.value), token.span.to(next.span))
    } else {
        (token.value.clone(), token.span)
    };
    if !token.is_identifier && !KINDED.contains(&name.as_str()) {
        return Err(SyntaxProblem::new(format!("unexpected \"{}\"", token.value), token.span));
    }

    cursor.expect("(")?;
    let inner = cursor.balanced()?;
    let span = name_span.to(cursor.tokens[cursor.pos - 1].span);

    if name == "cflow" || name == "cflowbelow" {
        let inner = parse_pointcut(inner, span)?;
        return Ok(Pointcut::Cflow {
            below: name == "cflowbelow",
            inner: Box::new(inner),
            span,
        });
    }
    if KINDED.contains(&name.as_str()) {
        return Ok(Pointcut::Kinded {
            designator: name,
            pattern: render(inner),
            span,
        });
    }
    Ok(Pointcut::Reference {
        name,
        arguments: split_top_level(inner, ",").into_iter().map(render).collect(),
        span,
    })
}

impl<'a> TokenCursor<'a> {
    fn expect_identifier(&mut self) -> SyntaxResult<&'a PseudoToken> {
        match self.peek() {
            Some(token) if token.is_identifier => {
                self.pos += 1;
                Ok(token)
            }
            _ => Err(SyntaxProblem::new("expected an identifier", self.current_span())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PerClauseKind {
    Singleton,
    PerThis,
    PerTarget,
    PerCflow,
    PerCflowBelow,
    PerTypeWithin,
}

impl PerClauseKind {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "issingleton" => Some(PerClauseKind::Singleton),
            "perthis" => Some(PerClauseKind::PerThis),
            "pertarget" => Some(PerClauseKind::PerTarget),
            "percflow" => Some(PerClauseKind::PerCflow),
            "percflowbelow" => Some(PerClauseKind::PerCflowBelow),
            "pertypewithin" => Some(PerClauseKind::PerTypeWithin),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PerClauseKind::Singleton => "issingleton",
            PerClauseKind::PerThis => "perthis",
            PerClauseKind::PerTarget => "pertarget",
            PerClauseKind::PerCflow => "percflow",
            PerClauseKind::PerCflowBelow => "percflowbelow",
            PerClauseKind::PerTypeWithin => "pertypewithin",
        }
    }
}

/// How an aspect is instantiated.
#[derive(Debug, Clone, PartialEq)]
pub struct PerClause {
    pub kind: PerClauseKind,
    pub pointcut: Option<Pointcut>,
    pub type_pattern: Option<String>,
    pub span: Span,
}

impl fmt::Display for PerClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.pointcut, &self.type_pattern) {
            (Some(pointcut), _) => write!(f, "{}({})", self.kind.as_str(), pointcut),
            (None, Some(pattern)) => write!(f, "{}({})", self.kind.as_str(), pattern),
            (None, None) => write!(f, "{}()", self.kind.as_str()),
        }
    }
}

/// Parse the tokens after an aspect's name. `Ok(None)` when they hold a
/// `dominates` clause instead of a per-clause.
pub fn parse_per_clause(tokens: &[PseudoToken], end: Span) -> SyntaxResult<Option<PerClause>> {
    let mut cursor = TokenCursor::new(tokens, end);
    let head = match cursor.advance() {
        Some(head) => head,
        None => return Ok(None),
    };
    if head.is("dominates") {
        return Ok(None);
    }
    let kind = PerClauseKind::from_name(&head.value).ok_or_else(|| {
        SyntaxProblem::new(format!("\"{}\" is not a per-clause", head.value), head.span)
    })?;
    cursor.expect("(")?;
    let inner = cursor.balanced()?;
    let span = head.span.to(cursor.tokens[cursor.pos - 1].span);
    cursor.expect_end()?;

    let (pointcut, type_pattern) = match kind {
        PerClauseKind::Singleton => {
            if !inner.is_empty() {
                return Err(SyntaxProblem::new("issingleton takes no arguments", span_of(inner, span)));
            }
            (None, None)
        }
        PerClauseKind::PerTypeWithin => {
            if inner.is_empty() {
                return Err(SyntaxProblem::new("missing type pattern", span));
            }
            (None, Some(render(inner)))
        }
        _ => (Some(parse_pointcut(inner, span)?), None),
    };
    Ok(Some(PerClause {
        kind,
        pointcut,
        type_pattern,
        span,
    }))
}

/// Type pattern of a `dominates` clause, if the tokens start with one.
pub fn parse_dominates(tokens: &[PseudoToken], end: Span) -> SyntaxResult<Option<String>> {
    let mut cursor = TokenCursor::new(tokens, end);
    match cursor.peek() {
        Some(head) if head.is("dominates") => {
            cursor.advance();
            if cursor.at_end() {
                return Err(SyntaxProblem::new("missing type pattern after dominates", head.span));
            }
            Ok(Some(render(cursor.rest())))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Tokens laid out one space apart, so rendering keeps their spacing.
    fn tokens(words: &[&str]) -> Vec<PseudoToken> {
        let mut offset = 0;
        words
            .iter()
            .map(|word| {
                let is_identifier = word.chars().all(|c| c.is_alphanumeric() || c == '_');
                let token = PseudoToken::new(*word, is_identifier, Span::of_len(offset, word.len()));
                offset += word.len() + 1;
                token
            })
            .collect()
    }

    #[test]
    fn test_kinded_designator() {
        let pc = parse_pointcut(&tokens(&["call", "(", "void", "Foo.bar", "(", ")", ")"]), Span::at(99)).unwrap();
        match pc {
            Pointcut::Kinded { designator, pattern, .. } => {
                assert_eq!(designator, "call");
                assert_eq!(pattern, "void Foo.bar ( )");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_operator_precedence() {
        let pc = parse_pointcut(
            &tokens(&["p", "(", ")", "||", "q", "(", ")", "&&", "!", "r", "(", ")"]),
            Span::at(99),
        )
        .unwrap();
        assert!(matches!(pc, Pointcut::Or(_, ref right) if matches!(**right, Pointcut::And(..))));
        assert_eq!(pc.to_string(), "p() || q() && !r()");
        assert_eq!(pc.references(), vec!["p", "q", "r"]);
    }

    #[test]
    fn test_cflow_nests_a_pointcut() {
        let pc = parse_pointcut(&tokens(&["cflowbelow", "(", "p", "(", ")", ")"]), Span::at(99)).unwrap();
        assert!(matches!(pc, Pointcut::Cflow { below: true, .. }));
    }

    #[test]
    fn test_reference_arguments() {
        let pc = parse_pointcut(&tokens(&["traced", "(", "a", ",", "b", ")"]), Span::at(99)).unwrap();
        match pc {
            Pointcut::Reference { name, arguments, .. } => {
                assert_eq!(name, "traced");
                assert_eq!(arguments, vec!["a", "b"]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_malformed_pointcuts() {
        assert!(parse_pointcut(&tokens(&["call", "(", "*"]), Span::at(99)).is_err());
        assert!(parse_pointcut(&tokens(&["p", "(", ")", "q"]), Span::at(99)).is_err());
        assert!(parse_pointcut(&[], Span::at(99)).is_err());
        assert!(parse_pointcut(&tokens(&["&&"]), Span::at(99)).is_err());
    }

    #[test]
    fn test_per_clauses() {
        let per = parse_per_clause(&tokens(&["perthis", "(", "p", "(", ")", ")"]), Span::at(99))
            .unwrap()
            .unwrap();
        assert_eq!(per.kind, PerClauseKind::PerThis);
        assert_eq!(per.to_string(), "perthis(p())");

        let single = parse_per_clause(&tokens(&["issingleton", "(", ")"]), Span::at(99)).unwrap().unwrap();
        assert_eq!(single.kind, PerClauseKind::Singleton);

        assert!(parse_per_clause(&tokens(&["perfoo", "(", ")"]), Span::at(99)).is_err());
        assert_eq!(parse_per_clause(&tokens(&["dominates", "B"]), Span::at(99)), Ok(None));
        assert_eq!(parse_dominates(&tokens(&["dominates", "B"]), Span::at(99)), Ok(Some("B".to_string())));
    }
}
