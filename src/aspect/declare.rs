//! `declare` statements, re-read from pseudo tokens.

use std::fmt;

use crate::ast::Annotation;
use crate::parser::span::Span;

use super::payload::{render, PseudoToken};
use super::pointcut::{parse_pointcut, split_top_level, Pointcut, SyntaxProblem, SyntaxResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnnotationTarget {
    Type,
    Method,
    Field,
    Constructor,
}

impl AnnotationTarget {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "type" => Some(AnnotationTarget::Type),
            "method" => Some(AnnotationTarget::Method),
            "field" => Some(AnnotationTarget::Field),
            "constructor" => Some(AnnotationTarget::Constructor),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnnotationTarget::Type => "type",
            AnnotationTarget::Method => "method",
            AnnotationTarget::Field => "field",
            AnnotationTarget::Constructor => "constructor",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Declare {
    Parents {
        child: String,
        is_extends: bool,
        parents: Vec<String>,
    },
    /// `declare warning` / `declare error`
    Message {
        is_error: bool,
        pointcut: Pointcut,
        message: String,
    },
    Soft {
        exception: String,
        pointcut: Pointcut,
    },
    Precedence {
        patterns: Vec<String>,
    },
    Annotation {
        target: AnnotationTarget,
        pattern: String,
        annotation: Annotation,
        /// `' '` to add, `'+'` / `'-'` for the explicit forms
        sign: char,
    },
    /// Kept so the declaration still has a node after a reported problem.
    Invalid {
        kind: String,
        source: String,
    },
}

impl fmt::Display for Declare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Declare::Parents {
                child,
                is_extends,
                parents,
            } => write!(
                f,
                "declare parents: {} {} {}",
                child,
                if *is_extends { "extends" } else { "implements" },
                parents.join(", ")
            ),
            Declare::Message {
                is_error,
                pointcut,
                message,
            } => write!(
                f,
                "declare {}: {} : \"{}\"",
                if *is_error { "error" } else { "warning" },
                pointcut,
                message
            ),
            Declare::Soft { exception, pointcut } => write!(f, "declare soft: {} : {}", exception, pointcut),
            Declare::Precedence { patterns } => write!(f, "declare precedence: {}", patterns.join(", ")),
            Declare::Annotation {
                target,
                pattern,
                annotation,
                sign,
            } => {
                let sign = if *sign == ' ' { String::new() } else { sign.to_string() };
                write!(f, "declare @{}: {} : {}{}", target.as_str(), pattern, sign, annotation)
            }
            Declare::Invalid { kind, source } => write!(f, "declare {} (invalid): {}", kind, source),
        }
    }
}

fn split_once_top_level<'a>(tokens: &'a [PseudoToken], separator: &str) -> Option<(&'a [PseudoToken], &'a [PseudoToken])> {
    let parts = split_top_level(tokens, separator);
    if parts.len() < 2 {
        return None;
    }
    let first = parts[0].len();
    Some((&tokens[..first], &tokens[first + 1..]))
}

fn span_of(tokens: &[PseudoToken], fallback: Span) -> Span {
    match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => first.span.to(last.span),
        _ => fallback,
    }
}

/// Body tokens of a run `declare kind : body... ;`.
fn body(tokens: &[PseudoToken], header: usize) -> &[PseudoToken] {
    let end = match tokens.last() {
        Some(last) if last.is(";") => tokens.len() - 1,
        _ => tokens.len(),
    };
    &tokens[header.min(end)..end]
}

/// Parse `declare <kind> : ... ;`.
pub fn parse_declare(tokens: &[PseudoToken]) -> SyntaxResult<Declare> {
    let span = span_of(tokens, Span::default());
    let kind = tokens
        .get(1)
        .ok_or_else(|| SyntaxProblem::new_at("missing declare kind", span))?;
    let body = body(tokens, 3);
    let end = tokens.last().map_or(span, |t| t.span);
    if body.is_empty() {
        return Err(SyntaxProblem::new_at(format!("empty declare {}", kind.value), kind.span));
    }

    match kind.value.as_str() {
        "parents" => {
            let at = body
                .iter()
                .position(|t| t.is("extends") || t.is("implements"))
                .ok_or_else(|| SyntaxProblem::new_at("expected \"extends\" or \"implements\"", span_of(body, end)))?;
            if at == 0 || at + 1 == body.len() {
                return Err(SyntaxProblem::new_at("incomplete declare parents", span_of(body, end)));
            }
            Ok(Declare::Parents {
                child: render(&body[..at]),
                is_extends: body[at].is("extends"),
                parents: split_top_level(&body[at + 1..], ",").into_iter().map(render).collect(),
            })
        }
        "warning" | "error" => {
            let (pointcut, message) = split_once_top_level(body, ":")
                .ok_or_else(|| SyntaxProblem::new_at("expected \":\" before the message", end))?;
            let literal = match message {
                [literal] if literal.literal_kind.as_deref() == Some("string") => literal,
                _ => return Err(SyntaxProblem::new_at("expected a string message", span_of(message, end))),
            };
            Ok(Declare::Message {
                is_error: kind.value == "error",
                pointcut: parse_pointcut(pointcut, literal.span)?,
                message: literal.unquoted().to_string(),
            })
        }
        "soft" => {
            let (exception, pointcut) = split_once_top_level(body, ":")
                .ok_or_else(|| SyntaxProblem::new_at("expected \":\" after the exception type", end))?;
            if exception.is_empty() {
                return Err(SyntaxProblem::new_at("missing exception type", kind.span));
            }
            Ok(Declare::Soft {
                exception: render(exception),
                pointcut: parse_pointcut(pointcut, end)?,
            })
        }
        "precedence" => {
            let patterns: Vec<String> = split_top_level(body, ",").into_iter().map(render).collect();
            if patterns.iter().any(String::is_empty) {
                return Err(SyntaxProblem::new_at("empty type pattern in precedence list", span_of(body, end)));
            }
            Ok(Declare::Precedence { patterns })
        }
        other => Err(SyntaxProblem::new_at(
            format!("\"{}\" is not a kind of declare", other),
            kind.span,
        )),
    }
}

/// Parse the `declare @kind : pattern` part of a declare annotation.
pub fn parse_declare_annotation(tokens: &[PseudoToken], annotation: Annotation, sign: char) -> SyntaxResult<Declare> {
    let span = span_of(tokens, Span::default());
    let kind = tokens
        .get(2)
        .ok_or_else(|| SyntaxProblem::new_at("missing declare annotation kind", span))?;
    let target = AnnotationTarget::from_name(&kind.value).ok_or_else(|| {
        SyntaxProblem::new_at(format!("\"@{}\" is not a kind of declare", kind.value), kind.span)
    })?;
    let pattern = body(tokens, 4);
    if pattern.is_empty() {
        return Err(SyntaxProblem::new_at("missing pattern", kind.span));
    }
    Ok(Declare::Annotation {
        target,
        pattern: render(pattern),
        annotation,
        sign,
    })
}

impl SyntaxProblem {
    pub(crate) fn new_at(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}
