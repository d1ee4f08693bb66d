//! Table-driven shift-reduce parser.
//!
//! The automaton lives in [`tables`](super::tables); this module interprets
//! it. Every shift pushes the token on the state stack and, for identifiers
//! and literals, on the matching value stack. Every reduction runs the
//! production's semantic action against the typed stacks, then pops the
//! right-hand side states and follows the goto edge.

use std::sync::Arc;

use super::diagnostics::{Diagnostic, ProblemId, ProblemReporter};
use super::error::{ParseError, ParseResult};
use super::grammar::{grammar, Grammar};
use super::lexer::{Lexer, Token, TokenKind, TokenStream};
use super::recovery::{RecoveryState, RecoveryTracker};
use super::span::Span;
use super::stacks::{Identifier, ParseStacks, StackDepths};
use super::tables::{tables, Action, ParseTables};
use crate::ast::{CompilationUnit, Expression, Literal, LiteralKind};
use crate::common::config::Config;
use crate::common::consts::PARSER_MAX_GAS;
use crate::factory::{DeclarationFactory, Dialect, UnavailableFactory};

/// Result of parsing one compilation unit.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    /// Complete tree, or the best-effort tree of an abandoned unit.
    pub unit: CompilationUnit,
    pub diagnostics: Vec<Diagnostic>,
    /// `Parsing` when the unit was read to the end, `Abandoned` otherwise.
    pub state: RecoveryState,
    /// Token insertions and deletions applied along the way.
    pub repairs: usize,
}

impl ParseOutcome {
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn is_abandoned(&self) -> bool {
        self.state == RecoveryState::Abandoned
    }

    pub fn has(&self, id: ProblemId) -> bool {
        self.diagnostics.iter().any(|d| d.id == id)
    }
}

/// Right-hand side positions of the production being reduced.
#[derive(Debug, Clone)]
pub(super) struct ReduceContext {
    pub production: usize,
    spans: Vec<Option<Span>>,
    pub lookahead: Span,
}

impl ReduceContext {
    /// Span of right-hand side symbol `index`; empty symbols sit at the lookahead.
    pub fn span(&self, index: usize) -> Span {
        self.spans
            .get(index)
            .copied()
            .flatten()
            .unwrap_or_else(|| Span::at(self.lookahead.start))
    }

    /// Span covering every non-empty right-hand side symbol.
    pub fn whole(&self) -> Option<Span> {
        let first = self.spans.iter().flatten().next()?;
        let last = self.spans.iter().rev().flatten().next()?;
        Some(first.to(*last))
    }

    pub fn whole_or_lookahead(&self) -> Span {
        self.whole().unwrap_or_else(|| Span::at(self.lookahead.start))
    }

    /// Number of right-hand side symbols.
    pub fn arity(&self) -> usize {
        self.spans.len()
    }
}

/// One parser instance. Reusable across units, never shared between threads
/// while a unit is in progress.
pub struct Parser {
    pub(super) config: Config,
    pub(super) dialect: Dialect,
    pub(super) placeholder: Arc<dyn DeclarationFactory>,
    pub(super) tables: &'static ParseTables,
    pub(super) grammar: &'static Grammar,
    pub(super) stacks: ParseStacks,
    pub(super) states: Vec<usize>,
    pub(super) spans: Vec<Option<Span>>,
    pub(super) reporter: ProblemReporter,
    pub(super) recovery: RecoveryTracker,
    pub(super) unit: Option<CompilationUnit>,
    pub(super) production: usize,
    unavailable_reported: bool,
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("dialect", &self.dialect.name())
            .field("depths", &self.stacks.depths())
            .field("state", &self.recovery.state())
            .finish()
    }
}

impl Parser {
    pub fn new(config: Config, dialect: Dialect) -> ParseResult<Self> {
        let reporter = ProblemReporter::new(config.max_errors);
        Ok(Self {
            placeholder: Arc::new(UnavailableFactory),
            tables: tables()?,
            grammar: grammar()?,
            stacks: ParseStacks::new(),
            states: Vec::with_capacity(256),
            spans: Vec::with_capacity(256),
            reporter,
            recovery: RecoveryTracker::new(),
            unit: None,
            production: 0,
            unavailable_reported: false,
            config,
            dialect,
        })
    }

    /// Parser whose dialect is resolved from the configuration.
    pub fn from_config(config: Config) -> ParseResult<Self> {
        let dialect = Dialect::resolve(&config);
        Self::new(config, dialect)
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn stack_depths(&self) -> StackDepths {
        self.stacks.depths()
    }

    /// Clear every per-unit structure, keeping allocations.
    pub fn reset(&mut self) {
        self.stacks.reset();
        self.states.clear();
        self.spans.clear();
        self.states.push(0);
        self.spans.push(None);
        self.reporter = ProblemReporter::new(self.config.max_errors);
        self.recovery = RecoveryTracker::new();
        self.unit = None;
        self.production = 0;
        self.unavailable_reported = false;
    }

    pub fn parse_source(&mut self, source: &str) -> ParseResult<ParseOutcome> {
        let mut lexer = Lexer::new(source);
        self.parse_tokens(&mut lexer)
    }

    /// Parse one compilation unit from `stream`.
    pub fn parse_tokens(&mut self, stream: &mut dyn TokenStream) -> ParseResult<ParseOutcome> {
        self.reset();
        let mut tokens = self.collect_tokens(stream);
        let end = stream.end_offset();
        let mut pos = 0;
        let mut steps = 0;

        loop {
            steps += 1;
            if steps > PARSER_MAX_GAS {
                return Err(ParseError::OutOfGas { limit: PARSER_MAX_GAS });
            }
            let state = self.top_state()?;
            let kind = tokens
                .get(pos)
                .map(|t| t.kind)
                .ok_or_else(|| ParseError::CorruptTable { detail: "read past end of input".to_string() })?;
            let action = self.tables.action(state, kind);
            if action == Action::Error && self.tables.action(state, TokenKind::Gt) != Action::Error {
                if split_angle_brackets(&mut tokens, pos) {
                    continue;
                }
            }

            match action {
                Action::Shift(target) => {
                    let token = tokens[pos].clone();
                    self.shift(&token, target);
                    pos += 1;
                    self.recovery.on_shift(self.config.recovery_window);
                }
                Action::Reduce(production) => {
                    let lookahead = tokens[pos].span;
                    self.reduce(production, lookahead)?;
                }
                Action::Accept => break,
                Action::Error => {
                    if !self.recover(&mut tokens, &mut pos)? {
                        let unit = self.salvage(end);
                        return Ok(self.finish(unit));
                    }
                }
            }
        }

        let mut unit = self.unit.take().ok_or_else(|| ParseError::CorruptTable {
            detail: "accepted without a compilation unit".to_string(),
        })?;
        unit.span = unit_span(end);
        let depths = self.stacks.depths();
        if !depths.is_zero() {
            return Err(ParseError::Unbalanced { detail: depths.to_string() });
        }
        Ok(self.finish(unit))
    }

    fn finish(&mut self, unit: CompilationUnit) -> ParseOutcome {
        let reporter = std::mem::replace(&mut self.reporter, ProblemReporter::new(self.config.max_errors));
        self.stacks.reset();
        let state = match self.recovery.state() {
            RecoveryState::Abandoned => RecoveryState::Abandoned,
            _ => RecoveryState::Parsing,
        };
        ParseOutcome {
            unit,
            diagnostics: reporter.into_diagnostics(),
            state,
            repairs: self.recovery.repairs(),
        }
    }

    fn collect_tokens(&mut self, stream: &mut dyn TokenStream) -> Vec<Token> {
        let mut tokens = Vec::new();
        while let Some(next) = stream.next_token() {
            match next {
                Ok(token) => tokens.push(token),
                Err(err) => self.reporter.error(ProblemId::LexicalError, err.span, &[&err.text]),
            }
        }
        tokens.push(Token::eof(stream.end_offset()));
        tokens
    }

    pub(super) fn top_state(&self) -> ParseResult<usize> {
        self.states
            .last()
            .copied()
            .ok_or_else(|| ParseError::underflow("state", self.production))
    }

    fn shift(&mut self, token: &Token, target: usize) {
        if token.kind == TokenKind::Identifier || token.kind.is_pseudo_keyword() {
            self.stacks.identifiers.push(Identifier {
                name: token.text.clone(),
                span: token.span,
            });
        } else if let Some(kind) = literal_kind(token.kind) {
            self.stacks.expressions.push(Expression::Literal(Literal {
                kind,
                text: token.text.clone(),
                span: token.span,
            }));
        }
        self.states.push(target);
        self.spans.push(Some(token.span));
    }

    pub(super) fn reduce(&mut self, production: usize, lookahead: Span) -> ParseResult<()> {
        let rule = self.grammar.production(production)?;
        let arity = rule.rhs.len();
        if self.states.len() <= arity {
            return Err(ParseError::underflow("state", production));
        }
        let at = self.spans.len() - arity;
        let spans = self.spans.split_off(at);
        self.states.truncate(self.states.len() - arity);

        self.production = production;
        self.stacks.begin(production);
        let context = ReduceContext {
            production,
            spans,
            lookahead,
        };
        self.act(rule.act, &context)?;
        if self.config.debug {
            log::debug!("reduce {:>3} {:<70} {}", production, rule.text, self.stacks.depths());
        }

        let target = self.tables.goto(self.top_state()?, rule.lhs)?;
        self.states.push(target);
        self.spans.push(context.whole());
        Ok(())
    }

    /// Factory for a dialect construct. Without a dialect the first such
    /// construct of the unit is reported and a placeholder factory answers.
    pub(super) fn dialect_factory(&mut self, construct: &str, span: Span) -> Arc<dyn DeclarationFactory> {
        match &self.dialect {
            Dialect::Enabled(factory) => Arc::clone(factory),
            Dialect::Disabled => {
                if !self.unavailable_reported {
                    self.unavailable_reported = true;
                    self.reporter.error(ProblemId::FeatureUnavailable, span, &[construct]);
                }
                Arc::clone(&self.placeholder)
            }
        }
    }

    /// The dialect's factory for base constructs, if one is wired in.
    pub(super) fn base_factory(&self) -> Option<Arc<dyn DeclarationFactory>> {
        self.dialect.factory().cloned()
    }
}

pub(super) fn unit_span(end: usize) -> Span {
    Span::new(0, end.saturating_sub(1))
}

fn literal_kind(kind: TokenKind) -> Option<LiteralKind> {
    let literal = match kind {
        TokenKind::IntegerLiteral => LiteralKind::Int,
        TokenKind::LongLiteral => LiteralKind::Long,
        TokenKind::FloatingPointLiteral => LiteralKind::Float,
        TokenKind::DoubleLiteral => LiteralKind::Double,
        TokenKind::CharacterLiteral => LiteralKind::Char,
        TokenKind::StringLiteral => LiteralKind::String,
        TokenKind::True => LiteralKind::True,
        TokenKind::False => LiteralKind::False,
        TokenKind::Null => LiteralKind::Null,
        _ => return None,
    };
    Some(literal)
}

/// Halves of a shift operator read as closing angle brackets.
pub(super) fn split_kind(kind: TokenKind) -> Option<(TokenKind, TokenKind)> {
    match kind {
        TokenKind::RShift => Some((TokenKind::Gt, TokenKind::Gt)),
        TokenKind::URShift => Some((TokenKind::Gt, TokenKind::RShift)),
        _ => None,
    }
}

/// Split `>>` / `>>>` at `pos` into `>` plus the rest.
fn split_angle_brackets(tokens: &mut Vec<Token>, pos: usize) -> bool {
    let token = match tokens.get(pos) {
        Some(token) => token.clone(),
        None => return false,
    };
    let (first, rest) = match split_kind(token.kind) {
        Some(halves) => halves,
        None => return false,
    };
    let start = token.span.start;
    tokens[pos] = Token::new(first, Span::at(start), ">");
    let rest_text = &token.text[1.min(token.text.len())..];
    tokens.insert(pos + 1, Token::new(rest, Span::new(start + 1, token.span.end), rest_text));
    true
}
