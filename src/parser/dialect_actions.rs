//! Consume actions of the aspect dialect.
//!
//! None of these build a dialect node directly: every aspect, pointcut,
//! advice, declare and inter-type member comes from the parser's
//! [`DeclarationFactory`]. Without a dialect the placeholder factory answers
//! and the first construct of the unit is reported as unavailable.

use super::actions::{fill_method_header, fill_type_header, ModifierRun};
use super::diagnostics::{ProblemId, ProblemReporter};
use super::error::{ParseError, ParseResult};
use super::grammar::{Act, TypePatternUse};
use super::parser::{Parser, ReduceContext};
use super::span::Span;
use crate::ast::*;
use crate::common::consts::{modifiers_to_string, ACC_PRIVILEGED};
use crate::factory::DeclarationFactory;

/// Construct named in the "feature unavailable" diagnostic.
fn construct_name(act: Act) -> &'static str {
    match act {
        Act::AspectHeaderName { .. } | Act::AspectHeaderRest => "aspect declaration",
        Act::PointcutHeader | Act::PointcutDeclaration { .. } => "pointcut declaration",
        Act::AroundHeaderName { .. } => "around advice",
        Act::BasicAdviceHeaderName { after: true } => "after advice",
        Act::BasicAdviceHeaderName { after: false } => "before advice",
        Act::AdviceHeader { .. } | Act::ExtraParameter { .. } => "advice declaration",
        Act::DeclareHeader | Act::DeclareDeclaration => "declare statement",
        Act::DeclareAnnotationHeader | Act::DeclareAnnotation(_) => "declare annotation statement",
        Act::InterTypeFieldHeader(_) | Act::InterTypeFieldBody { .. } | Act::InterTypeFieldDeclaration => {
            "inter-type field"
        }
        Act::InterTypeMethodHeaderName(_) => "inter-type method",
        Act::InterTypeConstructorHeaderName { .. } => "inter-type constructor",
        Act::InterTypeClassHeaderName => "inter-type member class",
        _ => "pointcut designator",
    }
}

fn literal_kind_name(kind: LiteralKind) -> &'static str {
    match kind {
        LiteralKind::Int => "int",
        LiteralKind::Long => "long",
        LiteralKind::Float => "float",
        LiteralKind::Double => "double",
        LiteralKind::Char => "char",
        LiteralKind::String => "string",
        LiteralKind::True | LiteralKind::False => "boolean",
        LiteralKind::Null => "null",
    }
}

/// Apply the `returning`/`throwing` clause of after advice.
fn apply_extra_parameter(
    factory: &dyn DeclarationFactory,
    advice: &mut MethodDeclaration,
    extra: ExtraParameter,
    reporter: &mut ProblemReporter,
) {
    if !factory.is_after_advice(advice) {
        reporter.error(ProblemId::InvalidExtraParameter, extra.name_span, &[&extra.name, ":"]);
        return;
    }
    match extra.name.as_str() {
        "throwing" => factory.set_after_throwing_advice_kind(advice),
        "returning" => factory.set_after_returning_advice_kind(advice),
        _ => {
            reporter.error(
                ProblemId::InvalidExtraParameter,
                extra.name_span,
                &[&extra.name, "throwing", "returning", ":"],
            );
            return;
        }
    }
    if let Some(argument) = extra.argument {
        factory.set_extra_argument(advice, argument);
    }
}

impl Parser {
    pub(super) fn dialect_act(&mut self, act: Act, ctx: &ReduceContext) -> ParseResult<()> {
        let factory = self.dialect_factory(construct_name(act), ctx.whole_or_lookahead());
        let factory = factory.as_ref();
        match act {
            Act::AspectHeaderName {
                privileged,
                type_parameters,
            } => {
                let parameters = if type_parameters { self.pop_type_parameters()? } else { Vec::new() };
                let name = self.stacks.identifiers.pop()?;
                let _aspect = self.stacks.identifiers.pop()?;
                let mut modifiers = self.pop_modifiers()?;
                if privileged {
                    let _privileged = self.stacks.identifiers.pop()?;
                    let outer = self.pop_modifiers()?;
                    modifiers = self.merge_modifiers(outer, modifiers, ctx.span(2));
                }
                let mut aspect = factory.create_aspect();
                factory.set_privileged(&mut aspect, privileged);
                if privileged {
                    aspect.modifiers |= ACC_PRIVILEGED;
                }
                aspect.type_parameters = parameters;
                fill_type_header(&mut aspect, name, modifiers);
                self.stacks.ast.push(AstNode::Type(aspect));
            }
            Act::AspectHeaderRest => {
                let mut tokens = if ctx.arity() == 2 { self.pop_dialect_nodes()? } else { Vec::new() };
                tokens.insert(0, self.pop_dialect_node()?);
                tokens.push(factory.create_pseudo_token("{", false, ctx.lookahead));
                let run = factory.create_pseudo_tokens_from(tokens);
                let production = self.production;
                let aspect = match self.stacks.ast.peek_mut()? {
                    AstNode::Type(ty) => ty,
                    _ => return Err(ParseError::wrong_node("ast", "aspect", production)),
                };
                factory.set_dominates_pattern_from(aspect, &run, &mut self.reporter);
                factory.set_per_clause_from(aspect, &run, &mut self.reporter);
                aspect.declaration_source_end = aspect.declaration_source_end.max(run.source_end);
            }

            Act::PointcutHeader => {
                let name = self.stacks.identifiers.pop()?;
                let keyword = self.stacks.identifiers.pop()?;
                let modifiers = self.pop_modifiers()?;
                let mut pointcut = factory.create_pointcut_declaration();
                factory.set_selector(&mut pointcut, &name.name);
                pointcut.return_type = Some(TypeReference::primitive("void", keyword.span));
                fill_method_header(&mut pointcut, name.span, modifiers);
                self.stacks.ast.push(AstNode::Method(pointcut));
            }
            Act::PointcutDeclaration { designator } => {
                let semicolon = ctx.span(ctx.arity() - 1);
                let designator = if designator {
                    let mut tokens = self.pop_dialect_nodes()?;
                    tokens.push(factory.create_pseudo_token(";", false, semicolon));
                    let run = factory.create_pseudo_tokens_from(tokens);
                    Some(factory.create_pointcut_designator(run, &mut self.reporter))
                } else {
                    None
                };
                let arguments = self.pop_arguments()?;
                let pointcut = self.top_method()?;
                pointcut.arguments = arguments;
                if let Some(designator) = designator {
                    factory.set_pointcut_designator_on_pointcut(pointcut, designator);
                }
                pointcut.body_end = Some(semicolon.end);
                pointcut.declaration_source_end = semicolon.end;
            }

            Act::AroundHeaderName { return_type } => {
                let keyword = self.stacks.identifiers.pop()?;
                let return_type = if return_type {
                    self.pop_type()?
                } else {
                    self.reporter.error(
                        ProblemId::InsertToComplete,
                        keyword.span,
                        &["return type", "around advice declaration"],
                    );
                    TypeReference::primitive("void", keyword.span)
                };
                let modifiers = self.pop_modifiers()?;
                let mut advice = factory.create_around_advice_declaration();
                advice.return_type = Some(return_type);
                fill_method_header(&mut advice, keyword.span, modifiers);
                self.stacks.ast.push(AstNode::Method(advice));
            }
            Act::BasicAdviceHeaderName { after } => {
                let keyword = self.stacks.identifiers.pop()?;
                let modifiers = self.pop_modifiers()?;
                let mut advice = if after {
                    factory.create_after_advice_declaration()
                } else {
                    factory.create_before_advice_declaration()
                };
                advice.return_type = Some(TypeReference::primitive("void", keyword.span));
                fill_method_header(&mut advice, keyword.span, modifiers);
                self.stacks.ast.push(AstNode::Method(advice));
            }
            Act::AdviceHeader { extra_parameter } => {
                let mut tokens = self.pop_dialect_nodes()?;
                let thrown = self.pop_types()?;
                let extra = if extra_parameter {
                    match self.stacks.ast.pop_optional()? {
                        None => None,
                        Some(AstNode::ExtraParam(extra)) => Some(extra),
                        Some(_) => return Err(ParseError::wrong_node("ast", "extra parameter", ctx.production)),
                    }
                } else {
                    None
                };
                let arguments = self.pop_arguments()?;
                tokens.push(factory.create_pseudo_token("{", false, ctx.lookahead));
                let run = factory.create_pseudo_tokens_from(tokens);
                let designator = factory.create_pointcut_designator(run, &mut self.reporter);
                let end = ctx.whole_or_lookahead().end;
                let production = self.production;
                let advice = match self.stacks.ast.peek_mut()? {
                    AstNode::Method(method) => method,
                    _ => return Err(ParseError::wrong_node("ast", "advice", production)),
                };
                advice.arguments = arguments;
                advice.thrown_exceptions = thrown;
                advice.declaration_source_end = end;
                factory.set_pointcut_designator_on_advice(advice, designator);
                if let Some(extra) = extra {
                    apply_extra_parameter(factory, advice, extra, &mut self.reporter);
                }
            }
            Act::ExtraParameter { formal } => {
                let argument = if formal {
                    match self.stacks.ast.pop()? {
                        AstNode::Argument(argument) => Some(argument),
                        _ => return Err(ParseError::wrong_node("ast", "argument", ctx.production)),
                    }
                } else {
                    None
                };
                let name = self.stacks.identifiers.pop()?;
                self.stacks.ast.push(AstNode::ExtraParam(ExtraParameter {
                    name: name.name,
                    name_span: name.span,
                    argument,
                }));
            }

            Act::DeclareHeader => {
                let kind = self.stacks.identifiers.pop()?;
                let keyword = self.stacks.identifiers.pop()?;
                self.stacks.ast.push_group(vec![
                    AstNode::Dialect(factory.create_pseudo_token(&keyword.name, true, keyword.span)),
                    AstNode::Dialect(factory.create_pseudo_token(&kind.name, true, kind.span)),
                    AstNode::Dialect(factory.create_pseudo_token(":", false, ctx.span(2))),
                ]);
            }
            Act::DeclareDeclaration => {
                let body = self.pop_dialect_nodes()?;
                let mut tokens = self.pop_dialect_nodes()?;
                let semicolon = ctx.span(2);
                let keyword = tokens.first().map_or(ctx.span(0), DialectNode::span);
                let kind = tokens.get(1).map_or(keyword, DialectNode::span);
                tokens.extend(body);
                tokens.push(factory.create_pseudo_token(";", false, semicolon));
                let run = factory.create_pseudo_tokens_from(tokens);
                let mut declaration = factory.create_declare_declaration(run, &mut self.reporter);
                place_bodiless(&mut declaration, kind, keyword.start, semicolon);
                self.stacks.ast.push(AstNode::Method(declaration));
            }
            Act::DeclareAnnotationHeader => {
                let kind = self.stacks.identifiers.pop()?;
                let keyword = self.stacks.identifiers.pop()?;
                self.stacks.ast.push_group(vec![
                    AstNode::Dialect(factory.create_pseudo_token(&keyword.name, true, keyword.span)),
                    AstNode::Dialect(factory.create_pseudo_token("@", false, ctx.span(1))),
                    AstNode::Dialect(factory.create_pseudo_token(&kind.name, true, kind.span)),
                    AstNode::Dialect(factory.create_pseudo_token(":", false, ctx.span(3))),
                ]);
            }
            Act::DeclareAnnotation(sign) => {
                let annotation = match self.stacks.expressions.pop()? {
                    Expression::Annotation(annotation) => annotation,
                    _ => return Err(ParseError::wrong_node("expression", "annotation", ctx.production)),
                };
                let pattern = self.pop_dialect_nodes()?;
                let mut tokens = self.pop_dialect_nodes()?;
                let semicolon = ctx.span(ctx.arity() - 1);
                let keyword = tokens.first().map_or(ctx.span(0), DialectNode::span);
                let kind = tokens.get(2).map_or(keyword, DialectNode::span);
                tokens.extend(pattern);
                tokens.push(factory.create_pseudo_token(";", false, semicolon));
                let run = factory.create_pseudo_tokens_from(tokens);
                let mut declaration =
                    factory.create_declare_annotation_declaration(run, annotation, sign, &mut self.reporter);
                place_bodiless(&mut declaration, kind, keyword.start, semicolon);
                self.stacks.ast.push(AstNode::Method(declaration));
            }

            Act::InterTypeFieldHeader(pattern) => {
                let (name, name_span) = match pattern {
                    TypePatternUse::StarOnly => ("*".to_string(), ctx.span(4)),
                    _ => {
                        let name = self.stacks.identifiers.pop()?;
                        (name.name, name.span)
                    }
                };
                self.report_pattern_misuse(pattern, ctx);
                let on_type = self.pop_name()?;
                let field_type = self.pop_type()?;
                let modifiers = self.pop_modifiers()?;
                let mut field = factory.create_inter_type_field_declaration(TypeReference::from_name(&on_type));
                factory.set_selector(&mut field, &name);
                factory.set_declared_modifiers(&mut field, modifiers.flags);
                field.return_type = Some(field_type);
                fill_method_header(&mut field, name_span, modifiers);
                self.stacks.ast.push(AstNode::Method(field));
            }
            Act::InterTypeFieldBody { initializer } => {
                if initializer {
                    let initialization = self.stacks.expressions.pop()?;
                    let field = self.top_method()?;
                    factory.set_initialization(field, initialization);
                }
            }
            Act::InterTypeFieldDeclaration => {
                let semicolon = ctx.span(2);
                let field = self.top_method()?;
                field.body_end = Some(semicolon.end);
                field.declaration_source_end = semicolon.end;
            }
            Act::InterTypeMethodHeaderName(pattern) => {
                let name = self.stacks.identifiers.pop()?;
                self.report_pattern_misuse(pattern, ctx);
                let on_type = self.pop_name()?;
                let return_type = self.pop_type()?;
                let modifiers = self.pop_modifiers()?;
                let mut method = factory.create_inter_type_method_declaration();
                factory.set_on_type(&mut method, TypeReference::from_name(&on_type));
                factory.set_selector(&mut method, &name.name);
                factory.set_declared_modifiers(&mut method, modifiers.flags);
                method.return_type = Some(return_type);
                fill_method_header(&mut method, name.span, modifiers);
                self.stacks.ast.push(AstNode::Method(method));
            }
            Act::InterTypeConstructorHeaderName { plus } => {
                if plus {
                    self.reporter.error(ProblemId::DeleteToken, ctx.span(2), &["+"]);
                }
                let on_type = self.pop_name()?;
                let modifiers = self.pop_modifiers()?;
                let new_keyword = ctx.span(if plus { 4 } else { 3 });
                let selector = format!("{}_new", on_type.join("_"));
                let mut constructor = factory.create_inter_type_constructor_declaration();
                factory.set_on_type(&mut constructor, TypeReference::from_name(&on_type));
                factory.set_selector(&mut constructor, &selector);
                factory.set_declared_modifiers(&mut constructor, modifiers.flags);
                fill_method_header(&mut constructor, new_keyword, modifiers);
                self.stacks.ast.push(AstNode::Method(constructor));
            }
            Act::InterTypeClassHeaderName => {
                let name = self.stacks.identifiers.pop()?;
                let on_type = self.pop_name()?;
                let modifiers = self.pop_modifiers()?;
                let mut member_class = factory.create_intertype_member_class_declaration();
                factory.set_on_type_of_member_class(&mut member_class, TypeReference::from_name(&on_type));
                fill_type_header(&mut member_class, name, modifiers);
                self.stacks.ast.push(AstNode::Type(member_class));
            }

            Act::PseudoToken(text, is_identifier) => {
                let token = factory.create_pseudo_token(text, is_identifier, ctx.span(0));
                self.stacks.ast.push(AstNode::Dialect(token));
            }
            Act::PseudoTokenIdentifier => {
                let identifier = self.stacks.identifiers.pop()?;
                let token = factory.create_pseudo_token(&identifier.name, true, identifier.span);
                self.stacks.ast.push(AstNode::Dialect(token));
            }
            Act::PseudoTokenLiteral => {
                let literal = match self.stacks.expressions.pop()? {
                    Expression::Literal(literal) => literal,
                    _ => return Err(ParseError::wrong_node("expression", "literal", ctx.production)),
                };
                let mut token = factory.create_pseudo_token(&literal.text, false, literal.span);
                factory.set_literal_kind(&mut token, literal_kind_name(literal.kind));
                self.stacks.ast.push(AstNode::Dialect(token));
            }
            Act::PseudoTokenModifier => {
                let run = self.pop_modifiers()?;
                let text = modifiers_to_string(run.flags);
                let token = factory.create_pseudo_token(&text, false, ctx.span(0));
                self.stacks.ast.push(AstNode::Dialect(token));
            }
            Act::PseudoTokenPrimitiveType => {
                let primitive = self.pop_type()?;
                let token = factory.create_pseudo_token(primitive.simple_name(), false, ctx.span(0));
                self.stacks.ast.push(AstNode::Dialect(token));
            }
            Act::PseudoTokenIf => {
                let condition = self.stacks.expressions.pop()?;
                let token = factory.create_if_pseudo_token(condition, ctx.whole_or_lookahead());
                self.stacks.ast.push(AstNode::Dialect(token));
            }

            other => {
                return Err(ParseError::CorruptTable {
                    detail: format!("{:?} is not a dialect action", other),
                })
            }
        }
        Ok(())
    }

    /// Join the two modifier runs around `privileged`.
    fn merge_modifiers(&mut self, outer: ModifierRun, inner: ModifierRun, inner_span: Span) -> ModifierRun {
        if outer.flags & inner.flags != 0 {
            let duplicate = modifiers_to_string(outer.flags & inner.flags);
            self.reporter.error(ProblemId::DuplicateModifier, inner_span, &[&duplicate]);
        }
        let mut annotations = outer.annotations;
        annotations.extend(inner.annotations);
        ModifierRun {
            flags: outer.flags | inner.flags,
            start: outer.start.min(inner.start),
            annotations,
        }
    }

    /// Inter-type names are plain names: a `*` or `+` there is dropped.
    fn report_pattern_misuse(&mut self, pattern: TypePatternUse, ctx: &ReduceContext) {
        match pattern {
            TypePatternUse::Plain => {}
            TypePatternUse::StarSegment | TypePatternUse::StarOnly => {
                self.reporter.error(ProblemId::DeleteToken, ctx.span(4), &["*"]);
            }
            TypePatternUse::Plus => {
                self.reporter.error(ProblemId::DeleteToken, ctx.span(3), &["+"]);
            }
        }
    }

    fn pop_dialect_node(&mut self) -> ParseResult<DialectNode> {
        match self.stacks.ast.pop()? {
            AstNode::Dialect(node) => Ok(node),
            _ => Err(ParseError::wrong_node("ast", "pseudo token", self.production)),
        }
    }

    fn pop_dialect_nodes(&mut self) -> ParseResult<Vec<DialectNode>> {
        let production = self.production;
        self.stacks
            .ast
            .pop_group()?
            .into_iter()
            .map(|node| match node {
                AstNode::Dialect(node) => Ok(node),
                _ => Err(ParseError::wrong_node("ast", "pseudo token", production)),
            })
            .collect()
    }
}

/// Positions of a declaration that ends at its `;`.
fn place_bodiless(declaration: &mut MethodDeclaration, name: Span, start: usize, semicolon: Span) {
    declaration.source_start = name.start;
    declaration.source_end = name.end;
    declaration.declaration_source_start = start.min(name.start);
    declaration.declaration_source_end = semicolon.end;
    declaration.body_end = Some(semicolon.end);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aspect::{AdviceKind, AdvicePayload, AspectPayload, DeclarePayload, InterTypePayload, PointcutPayload};
    use crate::common::config::Config;
    use crate::factory::Dialect;
    use crate::parser::parser::ParseOutcome;

    fn parse_with(dialect: Dialect, source: &str) -> ParseOutcome {
        let mut parser = Parser::new(Config::default(), dialect).expect("parser");
        parser.parse_source(source).expect("parse")
    }

    fn parse(source: &str) -> ParseOutcome {
        parse_with(Dialect::by_name("aspectj"), source)
    }

    #[test]
    fn test_aspect_with_per_clause() {
        let outcome = parse("privileged public aspect Tracer perthis(call(* *(..))) { }");
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
        let aspect = &outcome.unit.types[0];
        assert_eq!(aspect.name, "Tracer");
        assert_ne!(aspect.modifiers & ACC_PRIVILEGED, 0);
        let payload = aspect
            .dialect
            .as_ref()
            .and_then(|d| d.as_any().downcast_ref::<AspectPayload>())
            .expect("aspect payload");
        assert!(payload.privileged);
        assert!(payload.per_clause.is_some());
    }

    #[test]
    fn test_pointcut_and_advice() {
        let outcome = parse(
            "aspect A {\n  pointcut calls(): call(* Foo.*(..));\n  before(): calls() { }\n  after() returning (Object o): calls() { }\n  Object around(): calls() { return proceed(); }\n}",
        );
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
        let aspect = &outcome.unit.types[0];
        let methods: Vec<_> = aspect.methods().collect();
        assert_eq!(methods.len(), 4);
        let pointcut = methods[0].payload::<PointcutPayload>().expect("pointcut");
        assert!(pointcut.designator.as_ref().and_then(|d| d.pointcut.as_ref()).is_some());
        assert_eq!(methods[1].payload::<AdvicePayload>().map(|a| a.kind), Some(AdviceKind::Before));
        let after = methods[2].payload::<AdvicePayload>().expect("after");
        assert_eq!(after.kind, AdviceKind::AfterReturning);
        assert_eq!(after.extra_argument.as_ref().map(|a| a.name.as_str()), Some("o"));
        assert_eq!(methods[3].payload::<AdvicePayload>().map(|a| a.kind), Some(AdviceKind::Around));
    }

    #[test]
    fn test_bad_extra_parameter() {
        let outcome = parse("aspect A { after() thrown: call(* *(..)) { } }");
        let problem = outcome
            .diagnostics
            .iter()
            .find(|d| d.id == ProblemId::InvalidExtraParameter)
            .expect("extra parameter problem");
        assert_eq!(problem.arguments, vec!["thrown", "throwing", "returning", ":"]);
    }

    #[test]
    fn test_around_without_return_type() {
        let outcome = parse("aspect A { around(): call(* *(..)) { } }");
        assert!(outcome.has(ProblemId::InsertToComplete));
        assert_eq!(outcome.unit.types[0].methods().count(), 1);
    }

    #[test]
    fn test_declare_statements() {
        let outcome = parse(
            "aspect A {\n  declare parents: Foo implements java.io.Serializable;\n  declare warning: call(* *(..)): \"careful\";\n  declare @method: * Foo.*(..): @Traced;\n}",
        );
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
        let declares: Vec<_> = outcome.unit.types[0]
            .methods()
            .filter_map(|m| m.payload::<DeclarePayload>())
            .collect();
        assert_eq!(declares.len(), 3);
        assert!(declares[0].declare.to_string().starts_with("declare parents"));
    }

    #[test]
    fn test_inter_type_members() {
        let outcome = parse(
            "aspect A {\n  int Foo.count = 0;\n  void Foo.bump(int by) { count += by; }\n  public Foo.new(int x) { }\n}",
        );
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
        let methods: Vec<_> = outcome.unit.types[0].methods().collect();
        assert_eq!(methods[0].selector, "count");
        assert!(methods[0].payload::<InterTypePayload>().and_then(|p| p.initialization.as_ref()).is_some());
        assert_eq!(methods[1].selector, "bump");
        assert_eq!(methods[2].selector, "Foo_new");
    }

    #[test]
    fn test_wildcard_in_inter_type_name() {
        let outcome = parse("aspect A { int Foo.*; }");
        let problem = outcome
            .diagnostics
            .iter()
            .find(|d| d.id == ProblemId::DeleteToken)
            .expect("delete token");
        assert_eq!(problem.arguments, vec!["*"]);
        assert_eq!(outcome.unit.types[0].methods().count(), 1);
    }

    #[test]
    fn test_disabled_dialect_reports_once() {
        let outcome = parse_with(Dialect::Disabled, "aspect A { before(): execution(* *(..)) { } }");
        let unavailable = outcome
            .diagnostics
            .iter()
            .filter(|d| d.id == ProblemId::FeatureUnavailable)
            .count();
        assert_eq!(unavailable, 1);
        assert_eq!(outcome.unit.types[0].dialect_kind(), Some("unavailable"));
    }
}
