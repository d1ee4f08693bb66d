//! Flow phase
//!
//! Light data flow analysis over a parsed unit, one method body at a time:
//! - liveness (statements after `return`, `throw`, `break`, `continue`)
//! - definite assignment of local variables
//! - exception inference for `throw` statements escaping a body
//!
//! Escaping checked exceptions that an ordinary method does not declare are
//! reported. Bodies whose dialect payload infers its exceptions (advice,
//! inter-type methods) get the escaping set recorded on the payload instead.

use std::collections::{BTreeSet, HashMap, HashSet};

use log::debug;

use crate::ast::{
    BinaryOperator, Block, CatchClause, CompilationUnit, Expression, Member, MethodDeclaration, Statement,
    TypeDeclaration,
};
use crate::common::consts::{UNCHECKED_BASE_EXCEPTIONS, UNCHECKED_COMMON_SUBCLASSES};
use crate::parser::diagnostics::{ProblemId, ProblemReporter};
use crate::parser::span::Span;

/// Catch types that handle every checked exception.
const CATCH_ALL: &[&str] = &["Exception", "Throwable"];

/// Counters of one flow run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlowStats {
    pub bodies: usize,
    pub uninitialized: usize,
    pub unreachable: usize,
    pub undeclared: usize,
    pub inferred: usize,
}

/// Flow phase processor
pub struct Flow<'r> {
    reporter: &'r mut ProblemReporter,
    stats: FlowStats,
}

impl<'r> Flow<'r> {
    pub fn new(reporter: &'r mut ProblemReporter) -> Self {
        Self {
            reporter,
            stats: FlowStats::default(),
        }
    }

    /// Analyze every body of `unit`. Diagnostics go to the reporter;
    /// inferred exception sets are written into dialect payloads.
    pub fn process(mut self, unit: &mut CompilationUnit) -> FlowStats {
        for ty in &mut unit.types {
            self.analyze_type(ty);
        }
        debug!(
            "flow: {} bodies, {} uninitialized, {} unreachable, {} undeclared, {} inferred",
            self.stats.bodies,
            self.stats.uninitialized,
            self.stats.unreachable,
            self.stats.undeclared,
            self.stats.inferred
        );
        self.stats
    }

    fn analyze_type(&mut self, ty: &mut TypeDeclaration) {
        for member in &mut ty.members {
            match member {
                Member::Method(method) => self.analyze_method(method),
                Member::Type(inner) => self.analyze_type(inner),
                Member::Initializer(initializer) => {
                    let mut body = BodyFlow::new(self.reporter);
                    body.block(&initializer.block);
                    absorb(&mut self.stats, &body);
                }
                Member::Field(_) => {}
            }
        }
    }

    fn analyze_method(&mut self, method: &mut MethodDeclaration) {
        let statements = match &method.statements {
            Some(statements) => statements,
            None => return,
        };
        let mut body = BodyFlow::new(self.reporter);
        for argument in &method.arguments {
            body.declare(&argument.name, argument.type_ref.simple_name(), true);
        }
        body.statements(statements);
        absorb(&mut self.stats, &body);
        let escaping = body.escaping;

        let infers = method.dialect.as_ref().map_or(false, |d| d.infers_exceptions());
        if infers {
            let names: Vec<String> = escaping
                .iter()
                .map(|(name, _)| name.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            debug!("flow: {} infers {:?}", method.selector, names);
            self.stats.inferred += names.len();
            if let Some(payload) = method.dialect.as_mut() {
                payload.record_inferred_exceptions(names);
            }
            return;
        }

        for (name, span) in escaping {
            let declared = method
                .thrown_exceptions
                .iter()
                .any(|t| t.simple_name() == name || CATCH_ALL.contains(&t.simple_name()));
            if !declared {
                self.reporter.warning(ProblemId::UndeclaredException, span, &[name.as_str()]);
                self.stats.undeclared += 1;
            }
        }
    }
}

fn absorb(stats: &mut FlowStats, body: &BodyFlow<'_>) {
    stats.bodies += 1;
    stats.uninitialized += body.uninitialized;
    stats.unreachable += body.unreachable;
}

pub fn is_unchecked(name: &str) -> bool {
    UNCHECKED_BASE_EXCEPTIONS.contains(&name) || UNCHECKED_COMMON_SUBCLASSES.contains(&name)
}

/// Assignment and liveness state at one program point.
#[derive(Debug, Clone)]
struct FlowState {
    assigned: HashSet<String>,
    alive: bool,
}

impl FlowState {
    /// Join of two paths: a dead path does not constrain the other.
    fn join(self, other: FlowState) -> FlowState {
        match (self.alive, other.alive) {
            (true, false) => self,
            (false, true) => other,
            (alive, _) => FlowState {
                assigned: self.assigned.intersection(&other.assigned).cloned().collect(),
                alive,
            },
        }
    }
}

/// Walks one body.
struct BodyFlow<'r> {
    reporter: &'r mut ProblemReporter,
    /// Locals in scope with their declared simple type name.
    scopes: Vec<HashMap<String, String>>,
    state: FlowState,
    /// Catch types of the enclosing `try` statements, innermost last.
    handlers: Vec<Vec<String>>,
    /// Checked exceptions escaping the body.
    escaping: Vec<(String, Span)>,
    reported: HashSet<String>,
    uninitialized: usize,
    unreachable: usize,
}

impl<'r> BodyFlow<'r> {
    fn new(reporter: &'r mut ProblemReporter) -> Self {
        Self {
            reporter,
            scopes: vec![HashMap::new()],
            state: FlowState {
                assigned: HashSet::new(),
                alive: true,
            },
            handlers: Vec::new(),
            escaping: Vec::new(),
            reported: HashSet::new(),
            uninitialized: 0,
            unreachable: 0,
        }
    }

    fn declare(&mut self, name: &str, type_name: &str, assigned: bool) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), type_name.to_string());
        }
        if assigned {
            self.state.assigned.insert(name.to_string());
        } else {
            self.state.assigned.remove(name);
        }
    }

    fn local_type(&self, name: &str) -> Option<&str> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name)).map(String::as_str)
    }

    fn block(&mut self, block: &Block) {
        self.scopes.push(HashMap::new());
        self.statements(&block.statements);
        self.scopes.pop();
    }

    /// Statements in sequence; the first unreachable one is reported and
    /// analysis resumes as if it were reachable.
    fn statements(&mut self, statements: &[Statement]) {
        for statement in statements {
            if !self.state.alive {
                self.reporter.warning(ProblemId::UnreachableCode, statement.span(), &[]);
                self.unreachable += 1;
                self.state.alive = true;
            }
            self.statement(statement);
        }
    }

    /// Analyze `statement` from `state`, returning the state after it.
    fn branch(&mut self, state: FlowState, statement: &Statement) -> FlowState {
        self.state = state;
        self.statement(statement);
        self.state.clone()
    }

    fn statement(&mut self, statement: &Statement) {
        match statement {
            Statement::Block(block) => self.block(block),
            Statement::LocalDeclaration(local) => {
                if let Some(initializer) = &local.initializer {
                    self.expression(initializer);
                }
                self.declare(&local.name, local.type_ref.simple_name(), local.initializer.is_some());
            }
            Statement::Expression(expression, _) => self.expression(expression),
            Statement::If {
                condition,
                then_statement,
                else_statement,
                ..
            } => {
                self.expression(condition);
                let before = self.state.clone();
                let after_then = self.branch(before.clone(), then_statement);
                let after_else = match else_statement {
                    Some(else_statement) => self.branch(before, else_statement),
                    None => before,
                };
                self.state = after_then.join(after_else);
            }
            Statement::While { condition, body, .. } => {
                self.expression(condition);
                self.loop_body(body);
            }
            Statement::Do { body, condition, .. } => {
                self.statement(body);
                self.state.alive = true;
                self.expression(condition);
            }
            Statement::For {
                initializations,
                condition,
                increments,
                body,
                ..
            } => {
                self.scopes.push(HashMap::new());
                for initialization in initializations {
                    self.statement(initialization);
                }
                if let Some(condition) = condition {
                    self.expression(condition);
                }
                let before = self.state.clone();
                self.statement(body);
                self.state.alive = true;
                for increment in increments {
                    self.expression(increment);
                }
                self.state = before;
                self.scopes.pop();
            }
            Statement::ForEach {
                variable,
                collection,
                body,
                ..
            } => {
                self.expression(collection);
                self.scopes.push(HashMap::new());
                self.declare(&variable.name, variable.type_ref.simple_name(), true);
                self.loop_body(body);
                self.scopes.pop();
            }
            Statement::Return { expression, .. } => {
                if let Some(expression) = expression {
                    self.expression(expression);
                }
                self.state.alive = false;
            }
            Statement::Throw { expression, span } => {
                self.expression(expression);
                if let Some(name) = self.thrown_type(expression) {
                    self.throws(name, *span);
                }
                self.state.alive = false;
            }
            Statement::Break { .. } | Statement::Continue { .. } => self.state.alive = false,
            Statement::Labeled { statement, .. } => {
                self.statement(statement);
                self.state.alive = true;
            }
            Statement::Try {
                block,
                catches,
                finally,
                ..
            } => self.try_statement(block, catches, finally.as_ref()),
            Statement::Assert { condition, message, .. } => {
                let before = self.state.clone();
                self.expression(condition);
                if let Some(message) = message {
                    self.expression(message);
                }
                self.state = before;
            }
            Statement::ExplicitConstructorCall { arguments, .. } => {
                for argument in arguments {
                    self.expression(argument);
                }
            }
            Statement::Empty(_) => {}
        }
    }

    /// A loop body may run zero times: nothing it assigns survives it.
    fn loop_body(&mut self, body: &Statement) {
        let before = self.state.clone();
        self.statement(body);
        self.state = before;
        self.state.alive = true;
    }

    fn try_statement(&mut self, block: &Block, catches: &[CatchClause], finally: Option<&Block>) {
        let before = self.state.clone();
        self.handlers.push(
            catches
                .iter()
                .map(|c| c.argument.type_ref.simple_name().to_string())
                .collect(),
        );
        self.block(block);
        self.handlers.pop();
        let mut after = self.state.clone();

        for catch in catches {
            self.state = FlowState {
                assigned: before.assigned.clone(),
                alive: true,
            };
            self.scopes.push(HashMap::new());
            self.declare(&catch.argument.name, catch.argument.type_ref.simple_name(), true);
            self.block(&catch.block);
            self.scopes.pop();
            after = after.join(self.state.clone());
        }

        if let Some(finally) = finally {
            self.state = FlowState {
                assigned: before.assigned.clone(),
                alive: true,
            };
            self.block(finally);
            let finally_state = self.state.clone();
            after.assigned.extend(finally_state.assigned);
            after.alive &= finally_state.alive;
        }
        self.state = after;
    }

    /// Simple name of the type a `throw` operand throws, when known.
    fn thrown_type(&self, expression: &Expression) -> Option<String> {
        match expression {
            Expression::Allocation { type_ref, .. } => Some(type_ref.simple_name().to_string()),
            Expression::Name(name) if name.tokens.len() == 1 => self.local_type(&name.tokens[0]).map(str::to_string),
            Expression::Parenthesized(inner, _) => self.thrown_type(inner),
            _ => None,
        }
    }

    fn throws(&mut self, name: String, span: Span) {
        if is_unchecked(&name) {
            return;
        }
        let caught = self
            .handlers
            .iter()
            .any(|handler| handler.iter().any(|c| *c == name || CATCH_ALL.contains(&c.as_str())));
        if !caught {
            self.escaping.push((name, span));
        }
    }

    fn use_local(&mut self, name: &str, span: Span) {
        if self.local_type(name).is_none() || self.state.assigned.contains(name) {
            return;
        }
        if self.reported.insert(name.to_string()) {
            self.reporter.error(ProblemId::UninitializedLocal, span, &[name]);
            self.uninitialized += 1;
        }
    }

    fn expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Name(name) => {
                if let (Some(first), Some(span)) = (name.tokens.first(), name.positions.first()) {
                    self.use_local(first, *span);
                }
            }
            Expression::Assignment {
                target,
                operator,
                value,
                ..
            } => {
                let local = match target.as_ref() {
                    Expression::Name(name) if name.tokens.len() == 1 => Some(name),
                    _ => None,
                };
                match local {
                    Some(name) => {
                        if operator.is_some() {
                            self.expression(target);
                        }
                        self.expression(value);
                        if self.local_type(&name.tokens[0]).is_some() {
                            self.state.assigned.insert(name.tokens[0].clone());
                        }
                    }
                    None => {
                        self.expression(target);
                        self.expression(value);
                    }
                }
            }
            Expression::Binary {
                left, operator, right, ..
            } => {
                self.expression(left);
                if matches!(operator, BinaryOperator::AndAnd | BinaryOperator::OrOr) {
                    let assigned = self.state.assigned.clone();
                    self.expression(right);
                    self.state.assigned = assigned;
                } else {
                    self.expression(right);
                }
            }
            Expression::Conditional {
                condition,
                value_if_true,
                value_if_false,
                ..
            } => {
                self.expression(condition);
                let before = self.state.assigned.clone();
                self.expression(value_if_true);
                let after_true = std::mem::replace(&mut self.state.assigned, before);
                self.expression(value_if_false);
                self.state.assigned = self.state.assigned.intersection(&after_true).cloned().collect();
            }
            Expression::Unary { operand, .. } => self.expression(operand),
            Expression::FieldAccess { receiver, .. } => self.expression(receiver),
            Expression::MessageSend(send) => {
                if let Some(receiver) = &send.receiver {
                    self.expression(receiver);
                }
                for argument in &send.arguments {
                    self.expression(argument);
                }
            }
            Expression::Allocation { arguments, .. } => {
                for argument in arguments {
                    self.expression(argument);
                }
            }
            Expression::InstanceOf { expression, .. } => self.expression(expression),
            Expression::Parenthesized(inner, _) => self.expression(inner),
            Expression::Literal(_)
            | Expression::This(_)
            | Expression::Super(_)
            | Expression::Annotation(_) => {}
        }
    }
}

/// Run the flow phase over `unit`, reporting into `reporter`.
pub fn analyze_unit(unit: &mut CompilationUnit, reporter: &mut ProblemReporter) -> FlowStats {
    Flow::new(reporter).process(unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aspect::payload::AdvicePayload;
    use crate::common::config::Config;
    use crate::factory::Dialect;
    use crate::parser::parse;

    fn analyze(dialect: Dialect, source: &str) -> (CompilationUnit, ProblemReporter, FlowStats) {
        let outcome = parse(source, Config::default(), dialect).expect("parse");
        assert!(!outcome.has_errors(), "{:?}", outcome.diagnostics);
        let mut unit = outcome.unit;
        let mut reporter = ProblemReporter::new(100);
        let stats = analyze_unit(&mut unit, &mut reporter);
        (unit, reporter, stats)
    }

    fn ids(reporter: &ProblemReporter) -> Vec<ProblemId> {
        reporter.diagnostics().iter().map(|d| d.id).collect()
    }

    #[test]
    fn test_use_before_assignment() {
        let (_, reporter, stats) = analyze(
            Dialect::Disabled,
            "class A { int m(boolean b) { int x; if (b) { x = 1; } return x; } }",
        );
        assert_eq!(ids(&reporter), vec![ProblemId::UninitializedLocal]);
        assert_eq!(reporter.diagnostics()[0].arguments, vec!["x".to_string()]);
        assert_eq!(stats.uninitialized, 1);
    }

    #[test]
    fn test_both_branches_assign() {
        let (_, reporter, _) = analyze(
            Dialect::Disabled,
            "class A { int m(boolean b) { int x; if (b) { x = 1; } else { x = 2; } return x; } }",
        );
        assert!(reporter.diagnostics().is_empty(), "{:?}", reporter.diagnostics());
    }

    #[test]
    fn test_throwing_branch_does_not_constrain() {
        let (_, reporter, _) = analyze(
            Dialect::Disabled,
            "class A { int m(boolean b) { int x; if (b) { x = 1; } else { throw new IllegalStateException(); } return x; } }",
        );
        assert!(reporter.diagnostics().is_empty(), "{:?}", reporter.diagnostics());
    }

    #[test]
    fn test_loop_assignment_does_not_count() {
        let (_, reporter, _) = analyze(
            Dialect::Disabled,
            "class A { int m(int n) { int x; while (n > 0) { x = n; n--; } return x; } }",
        );
        assert_eq!(ids(&reporter), vec![ProblemId::UninitializedLocal]);
    }

    #[test]
    fn test_unreachable_after_return() {
        let (_, reporter, stats) = analyze(Dialect::Disabled, "class A { void m() { return; int y = 1; } }");
        assert_eq!(ids(&reporter), vec![ProblemId::UnreachableCode]);
        assert_eq!(stats.unreachable, 1);
    }

    #[test]
    fn test_undeclared_checked_exception_warns() {
        let (_, reporter, _) = analyze(
            Dialect::Disabled,
            "class A { void m() { throw new java.io.IOException(); } void n() throws IOException { throw new IOException(); } }",
        );
        assert_eq!(ids(&reporter), vec![ProblemId::UndeclaredException]);
        assert_eq!(reporter.diagnostics()[0].arguments, vec!["IOException".to_string()]);
        assert!(!reporter.diagnostics()[0].is_error());
    }

    #[test]
    fn test_caught_and_unchecked_exceptions_are_quiet() {
        let (_, reporter, _) = analyze(
            Dialect::Disabled,
            "class A { void m() { try { throw new IOException(); } catch (IOException e) { } throw new RuntimeException(); } }",
        );
        assert!(reporter.diagnostics().is_empty(), "{:?}", reporter.diagnostics());
    }

    #[test]
    fn test_rethrown_catch_parameter_escapes() {
        let (_, reporter, _) = analyze(
            Dialect::Disabled,
            "class A { void m() { try { } catch (SQLException e) { throw e; } } }",
        );
        assert_eq!(ids(&reporter), vec![ProblemId::UndeclaredException]);
        assert_eq!(reporter.diagnostics()[0].arguments, vec!["SQLException".to_string()]);
    }

    #[test]
    fn test_advice_records_inferred_exceptions() {
        let (unit, reporter, stats) = analyze(
            Dialect::by_name("aspectj"),
            "aspect A { before(): execution(* *(..)) { throw new java.io.IOException(); } }",
        );
        assert!(reporter.diagnostics().is_empty(), "{:?}", reporter.diagnostics());
        assert_eq!(stats.inferred, 1);
        let advice = unit.types[0]
            .methods()
            .find_map(|m| m.payload::<AdvicePayload>())
            .expect("advice payload");
        assert_eq!(advice.inferred_exceptions, vec!["IOException".to_string()]);
    }
}
