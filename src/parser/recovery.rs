//! Error recovery.
//!
//! On an unexpected token the parser tries, in order, a single-token
//! insertion, a deletion of the offending token, and at end of input a short
//! completion. A repair only counts when a dry run of the automaton consumes
//! the next `recovery_window` tokens after it. Dialect nodes on the AST stack
//! veto repairs altogether: the unit is abandoned and the completed parts are
//! salvaged into a best-effort tree.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use log::debug;

use super::diagnostics::ProblemId;
use super::error::ParseResult;
use super::grammar::Grammar;
use super::lexer::{Token, TokenKind};
use super::parser::{split_kind, unit_span, Parser};
use super::span::Span;
use super::tables::{Action, ParseTables};
use crate::ast::{AstNode, CompilationUnit, Member, MethodDeclaration, TypeDeclaration};
use crate::common::consts::{PARSER_MAX_GAS, RECOVERY_MAX_COMPLETION_STATES};

/// Phase of the recovery state machine for one compilation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecoveryState {
    Parsing,
    Recovering,
    /// A repair was applied; the next few shifts confirm it.
    Resynchronized,
    Abandoned,
}

impl fmt::Display for RecoveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RecoveryState::Parsing => "parsing",
            RecoveryState::Recovering => "recovering",
            RecoveryState::Resynchronized => "resynchronized",
            RecoveryState::Abandoned => "abandoned",
        };
        f.write_str(name)
    }
}

/// Per-unit recovery bookkeeping.
#[derive(Debug, Clone)]
pub(super) struct RecoveryTracker {
    state: RecoveryState,
    failed_attempts: usize,
    shifts_since_repair: usize,
    repairs: usize,
}

impl RecoveryTracker {
    pub fn new() -> Self {
        Self {
            state: RecoveryState::Parsing,
            failed_attempts: 0,
            shifts_since_repair: 0,
            repairs: 0,
        }
    }

    pub fn state(&self) -> RecoveryState {
        self.state
    }

    pub fn repairs(&self) -> usize {
        self.repairs
    }

    fn transition(&mut self, next: RecoveryState) {
        if self.state != next {
            debug!("recovery: {} -> {}", self.state, next);
            self.state = next;
        }
        if next == RecoveryState::Resynchronized {
            self.shifts_since_repair = 0;
        }
    }

    /// Count a shift; after `window` of them a repair is confirmed.
    pub fn on_shift(&mut self, window: usize) {
        if self.state != RecoveryState::Resynchronized {
            return;
        }
        self.shifts_since_repair += 1;
        if self.shifts_since_repair >= window {
            self.failed_attempts = 0;
            self.transition(RecoveryState::Parsing);
        }
    }
}

impl Default for RecoveryTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fed {
    Shifted,
    Accepted,
    Rejected,
}

/// Dry-run automaton over a copy of the state stack. Semantic actions are
/// not run, only states move.
struct Simulator<'t> {
    tables: &'t ParseTables,
    grammar: &'t Grammar,
}

/// Reductions one token may trigger before it is shifted.
const SIMULATION_GAS: usize = 10_000;

impl<'t> Simulator<'t> {
    fn feed(&self, stack: &mut Vec<usize>, kind: TokenKind, mut trace: Option<&mut Vec<usize>>) -> Fed {
        for _ in 0..SIMULATION_GAS {
            let state = match stack.last() {
                Some(&state) => state,
                None => return Fed::Rejected,
            };
            match self.tables.action(state, kind) {
                Action::Shift(target) => {
                    stack.push(target);
                    return Fed::Shifted;
                }
                Action::Accept => return Fed::Accepted,
                Action::Error => return Fed::Rejected,
                Action::Reduce(production) => {
                    let rule = match self.grammar.production(production) {
                        Ok(rule) => rule,
                        Err(_) => return Fed::Rejected,
                    };
                    if stack.len() <= rule.rhs.len() {
                        return Fed::Rejected;
                    }
                    stack.truncate(stack.len() - rule.rhs.len());
                    let top = stack[stack.len() - 1];
                    match self.tables.goto(top, rule.lhs) {
                        Ok(target) => stack.push(target),
                        Err(_) => return Fed::Rejected,
                    }
                    if let Some(trace) = trace.as_deref_mut() {
                        trace.push(rule.lhs);
                    }
                }
            }
        }
        Fed::Rejected
    }

    /// Feed `kind`, splitting `>>` and `>>>` the way the parser does.
    fn feed_split(&self, stack: &mut Vec<usize>, kind: TokenKind) -> Fed {
        let before = stack.clone();
        match self.feed(stack, kind, None) {
            Fed::Rejected => {}
            fed => return fed,
        }
        *stack = before;
        let (first, rest) = match split_kind(kind) {
            Some(halves) => halves,
            None => return Fed::Rejected,
        };
        match self.feed(stack, first, None) {
            Fed::Shifted => self.feed_split(stack, rest),
            fed => fed,
        }
    }

    /// Whether every kind in `kinds` is consumed, or the input is accepted
    /// on the way.
    fn accepts(&self, states: &[usize], kinds: &[TokenKind]) -> bool {
        let mut stack = states.to_vec();
        for &kind in kinds {
            match self.feed_split(&mut stack, kind) {
                Fed::Shifted => {}
                Fed::Accepted => return true,
                Fed::Rejected => return false,
            }
        }
        true
    }

    /// Left-hand side of the first reduction `next` triggers once `inserted`
    /// has been shifted.
    fn completed_construct(&self, states: &[usize], inserted: &[TokenKind], next: TokenKind) -> Option<usize> {
        let mut stack = states.to_vec();
        for &kind in inserted {
            if self.feed_split(&mut stack, kind) != Fed::Shifted {
                return None;
            }
        }
        let mut trace = Vec::new();
        self.feed(&mut stack, next, Some(&mut trace));
        trace.first().copied()
    }

    /// Shortest run of closing tokens that lets the unit be accepted at end
    /// of input. The search is breadth first and bounded.
    fn completion(&self, states: &[usize]) -> Option<Vec<TokenKind>> {
        let mut queue = VecDeque::new();
        let mut seen: HashSet<Vec<usize>> = HashSet::new();
        queue.push_back((states.to_vec(), Vec::new()));
        seen.insert(states.to_vec());
        while let Some((stack, inserted)) = queue.pop_front() {
            if seen.len() > RECOVERY_MAX_COMPLETION_STATES {
                break;
            }
            let mut at_end = stack.clone();
            if self.feed(&mut at_end, TokenKind::Eof, None) == Fed::Accepted {
                return Some(inserted);
            }
            for &kind in COMPLETION_CANDIDATES {
                let mut next = stack.clone();
                if self.feed(&mut next, kind, None) != Fed::Shifted || !seen.insert(next.clone()) {
                    continue;
                }
                let mut path = inserted.clone();
                path.push(kind);
                queue.push_back((next, path));
            }
        }
        None
    }
}

/// Tokens tried, in order, as single insertions.
const INSERTION_CANDIDATES: &[TokenKind] = &[
    TokenKind::Semicolon,
    TokenKind::RParen,
    TokenKind::RBracket,
    TokenKind::RBrace,
    TokenKind::LBrace,
    TokenKind::LParen,
    TokenKind::Identifier,
];

/// Tokens a completion at end of input may be built from.
const COMPLETION_CANDIDATES: &[TokenKind] = &[
    TokenKind::RBrace,
    TokenKind::Semicolon,
    TokenKind::RParen,
    TokenKind::RBracket,
    TokenKind::Gt,
    TokenKind::Identifier,
];

/// Suggestions listed in a syntax error.
const MAX_EXPECTED: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Repair {
    Insert(Vec<TokenKind>),
    Delete,
}

fn display_text(kind: TokenKind) -> &'static str {
    kind.lexeme().unwrap_or_else(|| kind.grammar_name())
}

fn found_text(token: &Token) -> String {
    if token.text.is_empty() {
        token.kind.grammar_name().to_string()
    } else {
        token.text.clone()
    }
}

impl Parser {
    /// Try to get past the token at `pos`. `Ok(false)` means the unit is
    /// abandoned and the caller should salvage what it has.
    pub(super) fn recover(&mut self, tokens: &mut Vec<Token>, pos: &mut usize) -> ParseResult<bool> {
        let token = match tokens.get(*pos) {
            Some(token) => token.clone(),
            None => return Ok(false),
        };
        if self.recovery.state() == RecoveryState::Abandoned {
            return Ok(false);
        }
        if self.reporter.budget_exhausted() {
            self.abandon(token.span, "too many errors");
            return Ok(false);
        }
        if !self.should_try_to_recover() {
            self.report_unexpected(&token)?;
            self.abandon(token.span, "a declaration in progress cannot be repaired");
            return Ok(false);
        }
        self.recovery.transition(RecoveryState::Recovering);

        match self.find_repair(tokens, *pos) {
            Some(Repair::Insert(kinds)) => {
                let construct = self.inserted_construct(tokens, *pos, &kinds);
                let text: Vec<&str> = kinds.iter().map(|kind| display_text(*kind)).collect();
                let text = text.join(" ");
                let at = match pos.checked_sub(1).and_then(|prev| tokens.get(prev)) {
                    Some(prev) => Span::at(prev.span.end),
                    None => Span::at(token.span.start),
                };
                self.reporter.error(ProblemId::InsertToComplete, at, &[&text, construct]);
                for (offset, kind) in kinds.iter().enumerate() {
                    tokens.insert(*pos + offset, Token::new(*kind, at, kind.lexeme().unwrap_or("")));
                }
                debug!("recovery: inserted {:?} before offset {}", text, token.span.start);
            }
            Some(Repair::Delete) => {
                self.reporter.error(ProblemId::DeleteToken, token.span, &[&found_text(&token)]);
                tokens.remove(*pos);
                debug!("recovery: deleted {:?} at offset {}", token.text, token.span.start);
            }
            None => {
                self.report_unexpected(&token)?;
                self.recovery.failed_attempts += 1;
                if token.kind == TokenKind::Eof {
                    self.abandon(token.span, "unexpected end of input");
                    return Ok(false);
                }
                if self.recovery.failed_attempts >= self.config.max_recovery_attempts {
                    self.abandon(token.span, "too many consecutive syntax errors");
                    return Ok(false);
                }
                tokens.remove(*pos);
                self.recovery.transition(RecoveryState::Resynchronized);
                return Ok(true);
            }
        }
        self.recovery.repairs += 1;
        self.recovery.transition(RecoveryState::Resynchronized);
        Ok(true)
    }

    /// Every node on the AST stack must allow repairs.
    fn should_try_to_recover(&self) -> bool {
        match self.dialect.factory() {
            Some(factory) => self.stacks.ast.iter().all(|node| factory.should_try_to_recover(node)),
            None => true,
        }
    }

    fn simulator(&self) -> Simulator<'static> {
        Simulator {
            tables: self.tables,
            grammar: self.grammar,
        }
    }

    fn find_repair(&self, tokens: &[Token], pos: usize) -> Option<Repair> {
        let simulator = self.simulator();
        let window = self.config.recovery_window.max(1);
        let upcoming: Vec<TokenKind> = tokens[pos..].iter().take(window).map(|t| t.kind).collect();

        for &candidate in INSERTION_CANDIDATES {
            let mut trial = Vec::with_capacity(upcoming.len() + 1);
            trial.push(candidate);
            trial.extend_from_slice(&upcoming);
            if simulator.accepts(&self.states, &trial) {
                return Some(Repair::Insert(vec![candidate]));
            }
        }

        if tokens[pos].kind != TokenKind::Eof {
            let after: Vec<TokenKind> = tokens[pos + 1..].iter().take(window).map(|t| t.kind).collect();
            if simulator.accepts(&self.states, &after) {
                return Some(Repair::Delete);
            }
            return None;
        }

        simulator
            .completion(&self.states)
            .filter(|kinds| !kinds.is_empty())
            .map(Repair::Insert)
    }

    fn inserted_construct(&self, tokens: &[Token], pos: usize, kinds: &[TokenKind]) -> &'static str {
        let next = tokens.get(pos).map_or(TokenKind::Eof, |t| t.kind);
        let (first, rest) = kinds.split_at(1.min(kinds.len()));
        let follow = rest.first().copied().unwrap_or(next);
        self.simulator()
            .completed_construct(&self.states, first, follow)
            .map(|lhs| self.grammar.nonterminal_name(lhs))
            .unwrap_or("CompilationUnit")
    }

    fn report_unexpected(&mut self, token: &Token) -> ParseResult<()> {
        let state = self.top_state()?;
        let found = found_text(token);
        let mut arguments: Vec<&str> = vec![found.as_str()];
        arguments.extend(
            self.tables
                .expected(state)
                .into_iter()
                .take(MAX_EXPECTED)
                .map(|kind| display_text(kind)),
        );
        self.reporter.error(ProblemId::ParsingError, token.span, &arguments);
        Ok(())
    }

    fn abandon(&mut self, span: Span, reason: &str) {
        self.reporter.error(ProblemId::UnitAbandoned, span, &[reason]);
        self.recovery.transition(RecoveryState::Abandoned);
    }

    /// Best-effort tree of an abandoned unit.
    ///
    /// Completed declarations are kept; a type or method whose closing brace
    /// was never reduced is kept too, with what it collected so far. Anything
    /// else left on the stacks is dropped.
    pub(super) fn salvage(&mut self, end: usize) -> CompilationUnit {
        self.settle_pending(end);
        let mut unit = CompilationUnit {
            span: unit_span(end),
            ..CompilationUnit::default()
        };
        let mut open_types: Vec<TypeDeclaration> = Vec::new();
        let mut open_method: Option<MethodDeclaration> = None;

        for node in self.stacks.ast.drain_all() {
            match node {
                AstNode::Package(package) => unit.package = Some(package),
                AstNode::Import(import) => unit.imports.push(import),
                AstNode::Type(ty) if ty.is_open() => {
                    close_method(&mut open_method, &mut open_types);
                    open_types.push(ty);
                }
                AstNode::Method(method) if method.is_open() => {
                    close_method(&mut open_method, &mut open_types);
                    open_method = Some(method);
                }
                AstNode::Statement(statement) => {
                    if let Some(method) = open_method.as_mut() {
                        method.statements.get_or_insert_with(Vec::new).push(statement);
                    }
                }
                other => match (other.into_member(), open_types.last_mut()) {
                    (Some(member), Some(owner)) => owner.members.push(member),
                    (Some(Member::Type(ty)), None) => unit.types.push(ty),
                    _ => {}
                },
            }
        }

        close_method(&mut open_method, &mut open_types);
        while let Some(ty) = open_types.pop() {
            match open_types.last_mut() {
                Some(owner) => owner.members.push(Member::Type(ty)),
                None => unit.types.push(ty),
            }
        }
        debug!("salvaged {} type(s) from an abandoned unit", unit.types.len());
        self.stacks.reset();
        self.states.clear();
        self.spans.clear();
        unit
    }
}

impl Parser {
    /// Finish reductions that were only waiting for a lookahead, as if a
    /// closing brace followed. Nothing is shifted.
    fn settle_pending(&mut self, end: usize) {
        let lookahead = Span::at(end);
        for _ in 0..PARSER_MAX_GAS {
            let state = match self.states.last() {
                Some(&state) => state,
                None => return,
            };
            match self.tables.action(state, TokenKind::RBrace) {
                Action::Reduce(production) => {
                    if let Err(err) = self.reduce(production, lookahead) {
                        debug!("salvage: stopped settling at production {}: {}", production, err);
                        return;
                    }
                }
                _ => return,
            }
        }
    }
}

fn close_method(open_method: &mut Option<MethodDeclaration>, open_types: &mut [TypeDeclaration]) {
    if let Some(method) = open_method.take() {
        if let Some(owner) = open_types.last_mut() {
            owner.members.push(Member::Method(method));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aspect::PointcutPayload;
    use crate::common::config::Config;
    use crate::factory::Dialect;
    use crate::parser::parser::ParseOutcome;

    fn parse_with(dialect: Dialect, source: &str) -> ParseOutcome {
        let mut parser = Parser::new(Config::default(), dialect).expect("parser");
        parser.parse_source(source).expect("parse")
    }

    #[test]
    fn test_tracker_confirms_after_window() {
        let mut tracker = RecoveryTracker::new();
        tracker.transition(RecoveryState::Resynchronized);
        tracker.on_shift(2);
        assert_eq!(tracker.state(), RecoveryState::Resynchronized);
        tracker.on_shift(2);
        assert_eq!(tracker.state(), RecoveryState::Parsing);
    }

    #[test]
    fn test_missing_semicolon_is_inserted() {
        let outcome = parse_with(Dialect::Disabled, "class A { int x = 1 int y; }");
        assert!(!outcome.is_abandoned());
        assert!(outcome.has(ProblemId::InsertToComplete));
        assert_eq!(outcome.repairs, 1);
        assert_eq!(outcome.unit.types[0].fields().count(), 2);
    }

    #[test]
    fn test_stray_token_is_deleted() {
        let outcome = parse_with(Dialect::Disabled, "class A { void m() { x = 1;; ) } }");
        assert!(!outcome.is_abandoned());
        assert!(outcome.has(ProblemId::DeleteToken));
        assert!(outcome.unit.types[0].method("m").is_some());
    }

    #[test]
    fn test_unclosed_class_is_completed() {
        let outcome = parse_with(Dialect::Disabled, "class A { void m() { int x = 1; }");
        assert!(!outcome.is_abandoned());
        let inserted = outcome
            .diagnostics
            .iter()
            .find(|d| d.id == ProblemId::InsertToComplete)
            .expect("completion");
        assert_eq!(inserted.arguments[0], "}");
        assert_eq!(outcome.unit.types[0].methods().count(), 1);
    }

    #[test]
    fn test_dialect_node_vetoes_repair() {
        let outcome = parse_with(Dialect::by_name("aspectj"), "aspect A { pointcut p(): call(* *(..));");
        assert!(outcome.is_abandoned());
        assert!(outcome.has(ProblemId::ParsingError));
        assert!(outcome.has(ProblemId::UnitAbandoned));
        let aspect = &outcome.unit.types[0];
        assert_eq!(aspect.name, "A");
        let pointcut = aspect.method("p").expect("pointcut kept");
        assert!(pointcut.payload::<PointcutPayload>().is_some());
    }

    #[test]
    fn test_salvage_keeps_open_method_statements() {
        let outcome = parse_with(
            Dialect::Disabled,
            "class A { void m() { int a = 1; a = 2; ) ) ) ) ) ) ) ) ) ) ) )",
        );
        assert!(outcome.is_abandoned());
        let method = outcome.unit.types[0].method("m").expect("open method kept");
        let statements = method.statements.as_deref().unwrap_or_default();
        assert_eq!(statements.len(), 2);
        assert!(matches!(statements[0], crate::ast::Statement::LocalDeclaration(_)));
        assert!(matches!(statements[1], crate::ast::Statement::Expression(..)));
    }

    #[test]
    fn test_abandons_after_configured_failures() {
        let source = "class A { void m() { int a = 1; a = 2; ) ) ) ) ) ) ) ) ) ) ) )";
        for attempts in [3, Config::default().max_recovery_attempts] {
            let config = Config {
                max_recovery_attempts: attempts,
                ..Config::default()
            };
            let mut parser = Parser::new(config, Dialect::Disabled).expect("parser");
            let outcome = parser.parse_source(source).expect("parse");
            assert!(outcome.is_abandoned());
            let failures = outcome.diagnostics.iter().filter(|d| d.id == ProblemId::ParsingError).count();
            assert_eq!(failures, attempts);
            let last = outcome.diagnostics.last().expect("abandon diagnostic");
            assert_eq!(last.id, ProblemId::UnitAbandoned);
            assert_eq!(last.arguments, vec!["too many consecutive syntax errors".to_string()]);
        }
    }
}
