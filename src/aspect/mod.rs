//! The aspect dialect
//!
//! [`AspectFactory`] is the declaration factory registered as `aspectj`. It
//! builds aspects, pointcuts, advice, declare statements and inter-type
//! members as base declarations with an aspect payload, and re-reads the
//! pseudo token runs the grammar collected into pointcut trees, per-clauses
//! and declare statements.

pub mod declare;
pub mod payload;
pub mod pointcut;

pub use declare::{AnnotationTarget, Declare};
pub use payload::{
    AdviceKind, AdvicePayload, AspectPayload, DeclarePayload, Designator, InterTypeClassPayload, InterTypeKind,
    InterTypePayload, PointcutPayload, PseudoToken, PseudoTokens,
};
pub use pointcut::{PerClause, PerClauseKind, Pointcut, SyntaxProblem};

use crate::ast::{
    Annotation, Argument, AstNode, DialectNode, Expression, MessageSend, MethodDeclaration, MethodKind,
    TypeDeclaration, TypeReference,
};
use crate::common::consts::ADVICE_SELECTOR;
use crate::factory::{base_class, base_method, DeclarationFactory};
use crate::parser::diagnostics::{ProblemId, ProblemReporter};
use crate::parser::span::Span;

/// Marks a `proceed(..)` call inside around advice.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProceedPayload;

impl crate::ast::DialectPayload for ProceedPayload {
    fn kind(&self) -> &'static str {
        "proceed"
    }

    crate::dialect_payload_plumbing!();
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AspectFactory;

impl AspectFactory {
    pub fn new() -> Self {
        AspectFactory
    }

    fn dialect_method(payload: Box<dyn crate::ast::DialectPayload>, selector: &str) -> MethodDeclaration {
        let mut method = base_method(MethodKind::Dialect);
        method.selector = selector.to_string();
        method.dialect = Some(payload);
        method
    }

    fn advice(kind: AdviceKind) -> MethodDeclaration {
        Self::dialect_method(Box::new(AdvicePayload::new(kind)), ADVICE_SELECTOR)
    }

    fn tokens_of(node: &DialectNode) -> &[PseudoToken] {
        match node.downcast::<PseudoTokens>() {
            Some(run) => &run.tokens,
            None => &[],
        }
    }

    /// Tokens of a run without its trailing terminator.
    fn without_terminator(tokens: &[PseudoToken]) -> (&[PseudoToken], Span) {
        match tokens.split_last() {
            Some((last, rest)) if last.is(";") || last.is("{") => (rest, last.span),
            Some((last, _)) => (tokens, Span::at(last.span.end + 1)),
            None => (tokens, Span::default()),
        }
    }

    fn report(reporter: &mut ProblemReporter, id: ProblemId, problem: &SyntaxProblem) {
        reporter.error(id, problem.span, &[problem.message.as_str()]);
    }

    fn set_designator(method: &mut MethodDeclaration, designator: DialectNode) {
        let designator = designator.downcast::<Designator>().cloned();
        if let Some(advice) = method.payload_mut::<AdvicePayload>() {
            advice.designator = designator;
        } else if let Some(pointcut) = method.payload_mut::<PointcutPayload>() {
            pointcut.designator = designator;
        }
    }

    fn set_advice_kind(advice: &mut MethodDeclaration, kind: AdviceKind) {
        if let Some(payload) = advice.payload_mut::<AdvicePayload>() {
            if payload.kind.is_after() {
                payload.kind = kind;
            }
        }
    }
}

impl DeclarationFactory for AspectFactory {
    fn name(&self) -> &'static str {
        "aspectj"
    }

    fn create_proceed(&self, mut send: MessageSend) -> MessageSend {
        send.dialect = Some(Box::new(ProceedPayload));
        send
    }

    fn create_aspect(&self) -> TypeDeclaration {
        let mut ty = base_class();
        ty.dialect = Some(Box::new(AspectPayload::default()));
        ty
    }

    fn set_privileged(&self, aspect: &mut TypeDeclaration, privileged: bool) {
        if let Some(payload) = aspect
            .dialect
            .as_mut()
            .and_then(|d| d.as_any_mut().downcast_mut::<AspectPayload>())
        {
            payload.privileged = privileged;
        }
    }

    fn set_per_clause_from(&self, aspect: &mut TypeDeclaration, tokens: &DialectNode, reporter: &mut ProblemReporter) {
        let (tokens, end) = Self::without_terminator(Self::tokens_of(tokens));
        match pointcut::parse_per_clause(tokens, end) {
            Ok(per_clause) => {
                if let Some(payload) = aspect
                    .dialect
                    .as_mut()
                    .and_then(|d| d.as_any_mut().downcast_mut::<AspectPayload>())
                {
                    payload.per_clause = per_clause;
                }
            }
            Err(problem) => Self::report(reporter, ProblemId::PerClauseSyntax, &problem),
        }
    }

    fn set_dominates_pattern_from(
        &self,
        aspect: &mut TypeDeclaration,
        tokens: &DialectNode,
        reporter: &mut ProblemReporter,
    ) {
        let (tokens, end) = Self::without_terminator(Self::tokens_of(tokens));
        match pointcut::parse_dominates(tokens, end) {
            Ok(Some(pattern)) => {
                if let Some(payload) = aspect
                    .dialect
                    .as_mut()
                    .and_then(|d| d.as_any_mut().downcast_mut::<AspectPayload>())
                {
                    payload.dominates = Some(pattern);
                }
            }
            Ok(None) => {}
            Err(problem) => Self::report(reporter, ProblemId::PerClauseSyntax, &problem),
        }
    }

    fn create_pseudo_tokens_from(&self, tokens: Vec<DialectNode>) -> DialectNode {
        let mut run = PseudoTokens::default();
        for node in &tokens {
            if let Some(token) = node.downcast::<PseudoToken>() {
                run.tokens.push(token.clone());
            } else if let Some(nested) = node.downcast::<PseudoTokens>() {
                run.tokens.extend(nested.tokens.iter().cloned());
            }
        }
        let span = run.span();
        DialectNode::new(span, Box::new(run))
    }

    fn create_method_declaration(&self) -> MethodDeclaration {
        base_method(MethodKind::Method)
    }

    fn create_constructor_declaration(&self) -> MethodDeclaration {
        base_method(MethodKind::Constructor)
    }

    fn create_pointcut_declaration(&self) -> MethodDeclaration {
        Self::dialect_method(Box::new(PointcutPayload::default()), "")
    }

    fn create_around_advice_declaration(&self) -> MethodDeclaration {
        Self::advice(AdviceKind::Around)
    }

    fn create_after_advice_declaration(&self) -> MethodDeclaration {
        Self::advice(AdviceKind::After)
    }

    fn create_before_advice_declaration(&self) -> MethodDeclaration {
        Self::advice(AdviceKind::Before)
    }

    fn create_pointcut_designator(&self, tokens: DialectNode, reporter: &mut ProblemReporter) -> DialectNode {
        let run = Self::tokens_of(&tokens);
        let (body, end) = Self::without_terminator(run);
        let source = payload::render(body);
        let pointcut = match pointcut::parse_pointcut(body, end) {
            Ok(pointcut) => Some(pointcut),
            Err(problem) => {
                Self::report(reporter, ProblemId::PointcutSyntax, &problem);
                None
            }
        };
        DialectNode::new(tokens.span(), Box::new(Designator { pointcut, source }))
    }

    fn set_pointcut_designator_on_advice(&self, advice: &mut MethodDeclaration, designator: DialectNode) {
        Self::set_designator(advice, designator);
    }

    fn set_pointcut_designator_on_pointcut(&self, pointcut: &mut MethodDeclaration, designator: DialectNode) {
        Self::set_designator(pointcut, designator);
    }

    fn set_extra_argument(&self, advice: &mut MethodDeclaration, argument: Argument) {
        if let Some(payload) = advice.payload_mut::<AdvicePayload>() {
            payload.extra_argument = Some(argument);
        }
    }

    fn is_after_advice(&self, method: &MethodDeclaration) -> bool {
        method.payload::<AdvicePayload>().map_or(false, |p| p.kind.is_after())
    }

    fn set_after_throwing_advice_kind(&self, advice: &mut MethodDeclaration) {
        Self::set_advice_kind(advice, AdviceKind::AfterThrowing);
    }

    fn set_after_returning_advice_kind(&self, advice: &mut MethodDeclaration) {
        Self::set_advice_kind(advice, AdviceKind::AfterReturning);
    }

    fn create_declare_declaration(&self, tokens: DialectNode, reporter: &mut ProblemReporter) -> MethodDeclaration {
        let run = Self::tokens_of(&tokens);
        let declare = match declare::parse_declare(run) {
            Ok(declare) => declare,
            Err(problem) => {
                Self::report(reporter, ProblemId::DeclareSyntax, &problem);
                Declare::Invalid {
                    kind: run.get(1).map(|t| t.value.clone()).unwrap_or_default(),
                    source: payload::render(run),
                }
            }
        };
        Self::dialect_method(Box::new(DeclarePayload { declare }), "ajc$declare")
    }

    fn create_declare_annotation_declaration(
        &self,
        tokens: DialectNode,
        annotation: Annotation,
        kind: char,
        reporter: &mut ProblemReporter,
    ) -> MethodDeclaration {
        let run = Self::tokens_of(&tokens);
        let declare = match declare::parse_declare_annotation(run, annotation, kind) {
            Ok(declare) => declare,
            Err(problem) => {
                Self::report(reporter, ProblemId::DeclareSyntax, &problem);
                Declare::Invalid {
                    kind: run.get(2).map(|t| format!("@{}", t.value)).unwrap_or_default(),
                    source: payload::render(run),
                }
            }
        };
        Self::dialect_method(Box::new(DeclarePayload { declare }), "ajc$declare_at")
    }

    fn create_inter_type_field_declaration(&self, on_type: TypeReference) -> MethodDeclaration {
        let mut payload = InterTypePayload::new(InterTypeKind::Field);
        payload.on_type = Some(on_type);
        Self::dialect_method(Box::new(payload), "")
    }

    fn create_inter_type_method_declaration(&self) -> MethodDeclaration {
        Self::dialect_method(Box::new(InterTypePayload::new(InterTypeKind::Method)), "")
    }

    fn create_inter_type_constructor_declaration(&self) -> MethodDeclaration {
        Self::dialect_method(Box::new(InterTypePayload::new(InterTypeKind::Constructor)), "")
    }

    fn set_selector(&self, declaration: &mut MethodDeclaration, selector: &str) {
        declaration.selector = selector.to_string();
    }

    fn set_declared_modifiers(&self, declaration: &mut MethodDeclaration, modifiers: u32) {
        if let Some(payload) = declaration.payload_mut::<InterTypePayload>() {
            payload.declared_modifiers = modifiers;
        }
    }

    fn set_initialization(&self, declaration: &mut MethodDeclaration, initialization: Expression) {
        if let Some(payload) = declaration.payload_mut::<InterTypePayload>() {
            payload.initialization = Some(initialization);
        }
    }

    fn set_on_type(&self, declaration: &mut MethodDeclaration, on_type: TypeReference) {
        if let Some(payload) = declaration.payload_mut::<InterTypePayload>() {
            payload.on_type = Some(on_type);
        }
    }

    fn create_pseudo_token(&self, value: &str, is_identifier: bool, span: Span) -> DialectNode {
        DialectNode::new(span, Box::new(PseudoToken::new(value, is_identifier, span)))
    }

    fn create_if_pseudo_token(&self, condition: Expression, span: Span) -> DialectNode {
        let mut token = PseudoToken::new("if", false, span);
        token.condition = Some(condition);
        DialectNode::new(span, Box::new(token))
    }

    fn set_literal_kind(&self, token: &mut DialectNode, kind: &str) {
        if let Some(token) = token.payload.as_any_mut().downcast_mut::<PseudoToken>() {
            token.literal_kind = Some(kind.to_string());
        }
    }

    /// Aspect constructs are never guess-repaired.
    fn should_try_to_recover(&self, node: &AstNode) -> bool {
        node.dialect().is_none()
    }

    fn create_intertype_member_class_declaration(&self) -> TypeDeclaration {
        let mut ty = base_class();
        ty.dialect = Some(Box::new(InterTypeClassPayload::default()));
        ty
    }

    fn set_on_type_of_member_class(&self, declaration: &mut TypeDeclaration, on_type: TypeReference) {
        if let Some(payload) = declaration
            .dialect
            .as_mut()
            .and_then(|d| d.as_any_mut().downcast_mut::<InterTypeClassPayload>())
        {
            payload.on_type = Some(on_type);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(factory: &AspectFactory, words: &[&str]) -> DialectNode {
        let mut offset = 0;
        let nodes = words
            .iter()
            .map(|word| {
                let node = factory.create_pseudo_token(word, word.chars().all(char::is_alphanumeric), Span::of_len(offset, word.len()));
                offset += word.len() + 1;
                node
            })
            .collect();
        factory.create_pseudo_tokens_from(nodes)
    }

    #[test]
    fn test_designator_on_advice() {
        let factory = AspectFactory::new();
        let mut reporter = ProblemReporter::new(10);
        let mut advice = factory.create_before_advice_declaration();
        let designator = factory.create_pointcut_designator(run(&factory, &["p", "(", ")", "{"]), &mut reporter);
        factory.set_pointcut_designator_on_advice(&mut advice, designator);
        let payload = advice.payload::<AdvicePayload>().unwrap();
        assert_eq!(payload.designator.as_ref().map(|d| d.source.as_str()), Some("p ( )"));
        assert!(reporter.diagnostics().is_empty());
    }

    #[test]
    fn test_bad_designator_is_reported() {
        let factory = AspectFactory::new();
        let mut reporter = ProblemReporter::new(10);
        let designator = factory.create_pointcut_designator(run(&factory, &["&&", ";"]), &mut reporter);
        assert!(reporter.has(ProblemId::PointcutSyntax));
        assert_eq!(designator.downcast::<Designator>().and_then(|d| d.pointcut.clone()), None);
    }

    #[test]
    fn test_after_advice_kinds() {
        let factory = AspectFactory::new();
        let mut after = factory.create_after_advice_declaration();
        assert!(factory.is_after_advice(&after));
        factory.set_after_returning_advice_kind(&mut after);
        assert_eq!(after.payload::<AdvicePayload>().map(|p| p.kind), Some(AdviceKind::AfterReturning));

        let mut before = factory.create_before_advice_declaration();
        factory.set_after_throwing_advice_kind(&mut before);
        assert_eq!(before.payload::<AdvicePayload>().map(|p| p.kind), Some(AdviceKind::Before));
    }

    #[test]
    fn test_dialect_nodes_are_not_recovered() {
        let factory = AspectFactory::new();
        assert!(!factory.should_try_to_recover(&AstNode::Type(factory.create_aspect())));
        assert!(!factory.should_try_to_recover(&AstNode::Dialect(factory.create_pseudo_token("x", true, Span::at(0)))));
        assert!(factory.should_try_to_recover(&AstNode::Method(factory.create_method_declaration())));
    }

    #[test]
    fn test_per_clause_from_tokens() {
        let factory = AspectFactory::new();
        let mut reporter = ProblemReporter::new(10);
        let mut aspect = factory.create_aspect();
        let tokens = run(&factory, &["percflow", "(", "p", "(", ")", ")", "{"]);
        factory.set_per_clause_from(&mut aspect, &tokens, &mut reporter);
        factory.set_dominates_pattern_from(&mut aspect, &tokens, &mut reporter);
        let payload = aspect.dialect.as_ref().and_then(|d| d.as_any().downcast_ref::<AspectPayload>());
        assert_eq!(
            payload.and_then(|p| p.per_clause.as_ref()).map(|p| p.kind),
            Some(PerClauseKind::PerCflow)
        );
        assert!(reporter.diagnostics().is_empty());
    }
}
