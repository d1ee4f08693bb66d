//! Semantic actions of the base language.
//!
//! An action runs right before the automaton pops a production's states. It
//! takes the production's values off the typed stacks in reverse order and
//! pushes the node for the left-hand side. Dialect productions are forwarded
//! to [`dialect_actions`](super::dialect_actions).

use super::diagnostics::ProblemId;
use super::error::{ParseError, ParseResult};
use super::grammar::Act;
use super::parser::{Parser, ReduceContext};
use super::span::Span;
use super::stacks::{GenericsNode, Identifier};
use crate::ast::*;
use crate::common::consts::modifiers_to_string;
use crate::factory::base_method;

/// A modifier run taken off the int and expression stacks.
#[derive(Debug, Clone, Default)]
pub(super) struct ModifierRun {
    pub flags: u32,
    /// Start of the first modifier, or of the token after an empty run.
    pub start: usize,
    pub annotations: Vec<Annotation>,
}

impl ModifierRun {
    pub fn is_empty(&self) -> bool {
        self.flags == 0 && self.annotations.is_empty()
    }
}

const COMPOUND_ASSIGNMENTS: [BinaryOperator; 11] = [
    BinaryOperator::Mul,
    BinaryOperator::Div,
    BinaryOperator::Rem,
    BinaryOperator::Add,
    BinaryOperator::Sub,
    BinaryOperator::LShift,
    BinaryOperator::RShift,
    BinaryOperator::URShift,
    BinaryOperator::And,
    BinaryOperator::Xor,
    BinaryOperator::Or,
];

fn encode_assignment(operator: Option<BinaryOperator>) -> usize {
    operator
        .and_then(|op| COMPOUND_ASSIGNMENTS.iter().position(|candidate| *candidate == op))
        .map_or(0, |index| index + 1)
}

fn decode_assignment(code: usize) -> Option<BinaryOperator> {
    code.checked_sub(1).and_then(|index| COMPOUND_ASSIGNMENTS.get(index).copied())
}

pub(super) fn qualified_name(identifiers: Vec<Identifier>) -> QualifiedName {
    let (tokens, positions) = identifiers.into_iter().map(|id| (id.name, id.span)).unzip();
    QualifiedName::new(tokens, positions)
}

impl Parser {
    pub(super) fn act(&mut self, act: Act, ctx: &ReduceContext) -> ParseResult<()> {
        if act.is_dialect() {
            return self.dialect_act(act, ctx);
        }
        match act {
            Act::NoAction => {}

            Act::EmptyAstList => self.stacks.ast.push_group_len(0),
            Act::EmptyExpressionList => self.stacks.expressions.push_group_len(0),
            Act::EmptyGenericsList => self.stacks.generics.push_group_len(0),
            Act::ConcatAst => self.stacks.ast.concat()?,
            Act::ConcatExpressions => self.stacks.expressions.concat()?,
            Act::ConcatGenerics => self.stacks.generics.concat()?,
            Act::ConcatIdentifiers => self.stacks.identifiers.concat()?,

            Act::CompilationUnit => self.consume_compilation_unit(ctx)?,
            Act::PackageDeclaration => {
                let name = self.pop_name()?;
                self.stacks.ast.push(AstNode::Package(PackageDeclaration {
                    name,
                    span: ctx.whole_or_lookahead(),
                }));
            }
            Act::Import { is_static, on_demand } => {
                let name = self.pop_name()?;
                self.stacks.ast.push(AstNode::Import(ImportReference {
                    name,
                    is_static,
                    on_demand,
                    span: ctx.whole_or_lookahead(),
                }));
            }

            Act::PrimitiveType(name) => {
                self.stacks
                    .generics
                    .push(GenericsNode::Type(TypeReference::primitive(name, ctx.span(0))));
            }
            Act::ClassOrInterfaceName => {
                let name = self.pop_name()?;
                self.stacks.generics.push(GenericsNode::Type(TypeReference::from_name(&name)));
            }
            Act::QualifiedGenericType => {
                let name = self.pop_name()?;
                let mut type_ref = self.pop_type()?;
                let tail = TypeReference::from_name(&name);
                type_ref.segments.extend(tail.segments);
                type_ref.span = ctx.whole_or_lookahead();
                self.stacks.generics.push(GenericsNode::Type(type_ref));
            }
            Act::GenericType => {
                let arguments = self.pop_type_arguments()?;
                let mut type_ref = self.pop_type()?;
                if let Some(last) = type_ref.segments.last_mut() {
                    last.arguments = arguments;
                    last.span = last.span.to(ctx.span(1));
                }
                type_ref.span = ctx.whole_or_lookahead();
                self.stacks.generics.push(GenericsNode::Type(type_ref));
            }
            Act::ArrayType => {
                let dims = self.stacks.ints.pop()?;
                let mut type_ref = self.pop_type()?;
                type_ref.dims += dims;
                type_ref.span = ctx.whole_or_lookahead();
                self.stacks.generics.push(GenericsNode::Type(type_ref));
            }
            Act::DimsOne => self.stacks.ints.push(1),
            Act::DimsMore => *self.stacks.ints.peek_mut()? += 1,
            Act::DimsZero => self.stacks.ints.push(0),
            Act::Wildcard(kind) => {
                let bound = match kind {
                    WildcardKind::Unbound => None,
                    WildcardKind::Extends | WildcardKind::Super => Some(Box::new(self.pop_type()?)),
                };
                self.stacks.generics.push(GenericsNode::Wildcard(Wildcard {
                    kind,
                    bound,
                    span: ctx.whole_or_lookahead(),
                }));
            }
            Act::TypeParameter { bounded, additional } => {
                let mut bounds = Vec::new();
                if additional {
                    bounds = self.pop_types()?;
                }
                if bounded {
                    bounds.insert(0, self.pop_type()?);
                }
                let name = self.stacks.identifiers.pop()?;
                self.stacks.generics.push(GenericsNode::Parameter(TypeParameter {
                    name: name.name,
                    bounds,
                    span: ctx.whole_or_lookahead(),
                }));
            }

            Act::EmptyModifiers => {
                self.stacks.ints.push(0);
                self.stacks.ints.push(ctx.lookahead.start);
                self.stacks.expressions.push_group_len(0);
            }
            Act::ModifierKeyword(flag) => {
                self.stacks.ints.push(flag as usize);
                self.stacks.ints.push(ctx.span(0).start);
                self.stacks.expressions.push_group_len(0);
            }
            Act::AnnotationModifier => {
                self.stacks.ints.push(0);
                self.stacks.ints.push(ctx.span(0).start);
            }
            Act::ConcatModifiers => {
                let _start = self.stacks.ints.pop()?;
                let flags = self.stacks.ints.pop()? as u32;
                let start = self.stacks.ints.pop()?;
                let existing = self.stacks.ints.pop()? as u32;
                if existing & flags != 0 {
                    let duplicate = modifiers_to_string(existing & flags);
                    self.reporter.error(ProblemId::DuplicateModifier, ctx.span(1), &[&duplicate]);
                }
                self.stacks.ints.push((existing | flags) as usize);
                self.stacks.ints.push(start);
                self.stacks.expressions.concat()?;
            }
            Act::MarkerAnnotation => {
                let type_name = self.pop_name()?;
                self.stacks.expressions.push(Expression::Annotation(Annotation {
                    type_name,
                    values: Vec::new(),
                    span: ctx.whole_or_lookahead(),
                }));
            }
            Act::SingleMemberAnnotation => {
                let value = self.stacks.expressions.pop()?;
                let type_name = self.pop_name()?;
                let span = value.span();
                self.stacks.expressions.push(Expression::Annotation(Annotation {
                    type_name,
                    values: vec![MemberValuePair {
                        name: "value".to_string(),
                        value,
                        span,
                    }],
                    span: ctx.whole_or_lookahead(),
                }));
            }

            Act::TypeHeaderName { kind, type_parameters } => {
                let parameters = if type_parameters { self.pop_type_parameters()? } else { Vec::new() };
                let name = self.stacks.identifiers.pop()?;
                let modifiers = self.pop_modifiers()?;
                let mut ty = TypeDeclaration::new(kind);
                ty.type_parameters = parameters;
                fill_type_header(&mut ty, name, modifiers);
                self.stacks.ast.push(AstNode::Type(ty));
            }
            Act::SuperClass => {
                let superclass = self.pop_type()?;
                let ty = self.top_type()?;
                ty.declaration_source_end = ty.declaration_source_end.max(superclass.span.end);
                ty.superclass = Some(superclass);
            }
            Act::SuperInterfaces => {
                let interfaces = self.pop_types()?;
                let ty = self.top_type()?;
                if let Some(last) = interfaces.last() {
                    ty.declaration_source_end = ty.declaration_source_end.max(last.span.end);
                }
                ty.super_interfaces = interfaces;
            }
            Act::ClassBody => {
                let members = self
                    .stacks
                    .ast
                    .pop_group()?
                    .into_iter()
                    .map(|node| node.into_member())
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| ParseError::wrong_node("ast", "member", ctx.production))?;
                let open = ctx.span(0);
                let close = ctx.span(2);
                let ty = self.top_type()?;
                ty.members = members;
                ty.body_start = Some(open.start);
                ty.body_end = Some(close.start);
                ty.declaration_source_end = close.end;
            }
            Act::FieldDeclaration => self.consume_field_declaration(ctx)?,
            Act::VariableDeclaratorId => {
                let dims = self.stacks.ints.pop()?;
                let name = self.stacks.identifiers.pop()?;
                self.stacks.ast.push(AstNode::Declarator(Declarator {
                    name: name.name,
                    name_span: name.span,
                    dims,
                    initializer: None,
                    span: ctx.whole_or_lookahead(),
                }));
            }
            Act::DeclaratorInitializer => {
                let initializer = self.stacks.expressions.pop()?;
                match self.stacks.ast.peek_mut()? {
                    AstNode::Declarator(declarator) => {
                        declarator.span = declarator.span.to(initializer.span());
                        declarator.initializer = Some(initializer);
                    }
                    _ => return Err(ParseError::wrong_node("ast", "declarator", ctx.production)),
                }
            }
            Act::MethodHeaderName { type_parameters } => {
                let name = self.stacks.identifiers.pop()?;
                let return_type = self.pop_type()?;
                let parameters = if type_parameters { self.pop_type_parameters()? } else { Vec::new() };
                let modifiers = self.pop_modifiers()?;
                let mut method = match self.base_factory() {
                    Some(factory) => factory.create_method_declaration(),
                    None => base_method(MethodKind::Method),
                };
                method.selector = name.name;
                method.return_type = Some(return_type);
                method.type_parameters = parameters;
                fill_method_header(&mut method, name.span, modifiers);
                self.stacks.ast.push(AstNode::Method(method));
            }
            Act::ConstructorHeaderName => {
                let name = self.stacks.identifiers.pop()?;
                let modifiers = self.pop_modifiers()?;
                let mut method = match self.base_factory() {
                    Some(factory) => factory.create_constructor_declaration(),
                    None => base_method(MethodKind::Constructor),
                };
                method.selector = name.name;
                fill_method_header(&mut method, name.span, modifiers);
                self.stacks.ast.push(AstNode::Method(method));
            }
            Act::MethodHeader => {
                let thrown = self.pop_types()?;
                let arguments = self.pop_arguments()?;
                let end = ctx.whole_or_lookahead().end;
                let method = self.top_method()?;
                method.arguments = arguments;
                method.thrown_exceptions = thrown;
                method.declaration_source_end = end;
            }
            Act::MethodDeclaration => {
                let body = self.pop_statement()?;
                let method = self.top_method()?;
                let span = body.span();
                method.statements = match body {
                    Statement::Block(block) => Some(block.statements),
                    _ => None,
                };
                method.body_start = Some(span.start);
                method.body_end = Some(span.end);
                method.declaration_source_end = span.end;
            }
            Act::EmptyMethodBody => self.push_statement(Statement::Empty(ctx.span(0))),
            Act::FormalParameter { modifiers, varargs } => {
                let declarator = self.pop_declarator()?;
                let mut type_ref = self.pop_type()?;
                let run = if modifiers { self.pop_modifiers()? } else { ModifierRun::default() };
                type_ref.dims += declarator.dims;
                self.stacks.ast.push(AstNode::Argument(Argument {
                    name: declarator.name,
                    type_ref,
                    modifiers: run.flags,
                    annotations: run.annotations,
                    is_varargs: varargs,
                    name_span: declarator.name_span,
                    span: ctx.whole_or_lookahead(),
                }));
            }
            Act::Initializer => {
                let block = self.pop_block()?;
                let modifiers = self.pop_modifiers()?;
                let start = if modifiers.is_empty() { block.span.start } else { modifiers.start };
                self.stacks.ast.push(AstNode::Initializer(crate::ast::Initializer {
                    modifiers: modifiers.flags,
                    source_start: block.span.start,
                    source_end: block.span.end,
                    declaration_source_start: start,
                    declaration_source_end: block.span.end,
                    block,
                }));
            }

            Act::Block => {
                let statements = self.pop_statements()?;
                self.push_statement(Statement::Block(Block {
                    statements,
                    span: ctx.whole_or_lookahead(),
                }));
            }
            Act::LocalVariableDeclaration { modifiers } => {
                let locals = self.consume_locals(modifiers, ctx)?;
                self.stacks
                    .ast
                    .push_group(locals.into_iter().map(|local| AstNode::Statement(Statement::LocalDeclaration(local))).collect());
            }
            Act::LocalVariableDeclarationStatement => {
                let end = ctx.span(1).end;
                let mut group = self.stacks.ast.pop_group()?;
                for node in group.iter_mut() {
                    if let AstNode::Statement(statement) = node {
                        let span = statement.span();
                        statement.set_span(Span::new(span.start, end));
                    }
                }
                self.stacks.ast.push_group(group);
            }
            Act::EmptyStatement => self.push_statement(Statement::Empty(ctx.span(0))),
            Act::ExpressionStatement => {
                let expression = self.stacks.expressions.pop()?;
                self.push_statement(Statement::Expression(expression, ctx.whole_or_lookahead()));
            }
            Act::LabeledStatement => {
                let statement = self.pop_statement()?;
                let label = self.stacks.identifiers.pop()?;
                self.push_statement(Statement::Labeled {
                    label: label.name,
                    statement: Box::new(statement),
                    span: ctx.whole_or_lookahead(),
                });
            }
            Act::IfThen | Act::IfThenElse => {
                let else_statement = if act == Act::IfThenElse { Some(Box::new(self.pop_statement()?)) } else { None };
                let then_statement = self.pop_statement()?;
                let condition = self.stacks.expressions.pop()?;
                self.push_statement(Statement::If {
                    condition,
                    then_statement: Box::new(then_statement),
                    else_statement,
                    span: ctx.whole_or_lookahead(),
                });
            }
            Act::While => {
                let body = self.pop_statement()?;
                let condition = self.stacks.expressions.pop()?;
                self.push_statement(Statement::While {
                    condition,
                    body: Box::new(body),
                    span: ctx.whole_or_lookahead(),
                });
            }
            Act::Do => {
                let condition = self.stacks.expressions.pop()?;
                let body = self.pop_statement()?;
                self.push_statement(Statement::Do {
                    body: Box::new(body),
                    condition,
                    span: ctx.whole_or_lookahead(),
                });
            }
            Act::For => {
                let body = self.pop_statement()?;
                let increments = self.stacks.expressions.pop_group()?;
                let condition = self.stacks.expressions.pop_optional()?;
                let initializations = self.pop_statements()?;
                self.push_statement(Statement::For {
                    initializations,
                    condition,
                    increments,
                    body: Box::new(body),
                    span: ctx.whole_or_lookahead(),
                });
            }
            Act::ForInitExpressions => {
                let expressions = self.stacks.expressions.pop_group()?;
                self.stacks.ast.push_group(
                    expressions
                        .into_iter()
                        .map(|e| {
                            let span = e.span();
                            AstNode::Statement(Statement::Expression(e, span))
                        })
                        .collect(),
                );
            }
            Act::ForEach { modifiers } => {
                let body = self.pop_statement()?;
                let collection = self.stacks.expressions.pop()?;
                let name = self.stacks.identifiers.pop()?;
                let type_ref = self.pop_type()?;
                let run = if modifiers { self.pop_modifiers()? } else { ModifierRun::default() };
                let variable = LocalDeclaration {
                    name: name.name,
                    modifiers: run.flags,
                    annotations: run.annotations,
                    type_ref,
                    initializer: None,
                    name_span: name.span,
                    span: ctx.span(2).to(name.span),
                };
                self.push_statement(Statement::ForEach {
                    variable,
                    collection,
                    body: Box::new(body),
                    span: ctx.whole_or_lookahead(),
                });
            }
            Act::Return => {
                let expression = self.stacks.expressions.pop_optional()?;
                self.push_statement(Statement::Return {
                    expression,
                    span: ctx.whole_or_lookahead(),
                });
            }
            Act::Throw => {
                let expression = self.stacks.expressions.pop()?;
                self.push_statement(Statement::Throw {
                    expression,
                    span: ctx.whole_or_lookahead(),
                });
            }
            Act::Break { label } | Act::Continue { label } => {
                let label = if label { Some(self.stacks.identifiers.pop()?.name) } else { None };
                let span = ctx.whole_or_lookahead();
                let statement = if matches!(act, Act::Break { .. }) {
                    Statement::Break { label, span }
                } else {
                    Statement::Continue { label, span }
                };
                self.push_statement(statement);
            }
            Act::Try { finally } => {
                let finally = if finally { Some(self.pop_block()?) } else { None };
                let catches = self
                    .stacks
                    .ast
                    .pop_group()?
                    .into_iter()
                    .map(|node| match node {
                        AstNode::Catch(clause) => Ok(clause),
                        _ => Err(ParseError::wrong_node("ast", "catch clause", ctx.production)),
                    })
                    .collect::<ParseResult<Vec<_>>>()?;
                let block = self.pop_block()?;
                self.push_statement(Statement::Try {
                    block,
                    catches,
                    finally,
                    span: ctx.whole_or_lookahead(),
                });
            }
            Act::CatchClause => {
                let block = self.pop_block()?;
                let argument = match self.stacks.ast.pop()? {
                    AstNode::Argument(argument) => argument,
                    _ => return Err(ParseError::wrong_node("ast", "argument", ctx.production)),
                };
                self.stacks.ast.push(AstNode::Catch(CatchClause {
                    argument,
                    block,
                    span: ctx.whole_or_lookahead(),
                }));
            }
            Act::Assert { message } => {
                let message = if message { Some(self.stacks.expressions.pop()?) } else { None };
                let condition = self.stacks.expressions.pop()?;
                self.push_statement(Statement::Assert {
                    condition,
                    message,
                    span: ctx.whole_or_lookahead(),
                });
            }
            Act::ExplicitConstructorCall { is_super } => {
                let arguments = self.stacks.expressions.pop_group()?;
                self.push_statement(Statement::ExplicitConstructorCall {
                    is_super,
                    arguments,
                    span: ctx.whole_or_lookahead(),
                });
            }

            Act::This => self.stacks.expressions.push(Expression::This(ctx.span(0))),
            Act::Parenthesized => {
                let inner = self.stacks.expressions.pop()?;
                self.stacks
                    .expressions
                    .push(Expression::Parenthesized(Box::new(inner), ctx.whole_or_lookahead()));
            }
            Act::Allocation => {
                let arguments = self.stacks.expressions.pop_group()?;
                let type_ref = self.pop_type()?;
                self.stacks.expressions.push(Expression::Allocation {
                    type_ref,
                    arguments,
                    span: ctx.whole_or_lookahead(),
                });
            }
            Act::FieldAccess { is_super } => {
                let name = self.stacks.identifiers.pop()?;
                let receiver = if is_super { Expression::Super(ctx.span(0)) } else { self.stacks.expressions.pop()? };
                self.stacks.expressions.push(Expression::FieldAccess {
                    receiver: Box::new(receiver),
                    name: name.name,
                    span: ctx.whole_or_lookahead(),
                });
            }
            Act::MethodInvocationName => {
                let arguments = self.stacks.expressions.pop_group()?;
                let mut name = self.stacks.identifiers.pop_group()?;
                let selector = name
                    .pop()
                    .ok_or_else(|| ParseError::underflow("identifier", ctx.production))?;
                let receiver = if name.is_empty() {
                    None
                } else {
                    Some(Box::new(Expression::Name(qualified_name(name))))
                };
                let bare = receiver.is_none();
                let mut send = MessageSend {
                    receiver,
                    selector: selector.name,
                    arguments,
                    selector_span: selector.span,
                    span: ctx.whole_or_lookahead(),
                    dialect: None,
                };
                if bare && send.selector == "proceed" {
                    if let Some(factory) = self.base_factory() {
                        send = factory.create_proceed(send);
                    }
                }
                self.stacks.expressions.push(Expression::MessageSend(send));
            }
            Act::MethodInvocationPrimary | Act::MethodInvocationSuper => {
                let arguments = self.stacks.expressions.pop_group()?;
                let selector = self.stacks.identifiers.pop()?;
                let receiver = if act == Act::MethodInvocationSuper {
                    Expression::Super(ctx.span(0))
                } else {
                    self.stacks.expressions.pop()?
                };
                self.stacks.expressions.push(Expression::MessageSend(MessageSend {
                    receiver: Some(Box::new(receiver)),
                    selector: selector.name,
                    arguments,
                    selector_span: selector.span,
                    span: ctx.whole_or_lookahead(),
                    dialect: None,
                }));
            }
            Act::NameExpression => {
                let name = self.pop_name()?;
                self.stacks.expressions.push(Expression::Name(name));
            }
            Act::Postfix(operator) | Act::Unary(operator) => {
                let operand = self.stacks.expressions.pop()?;
                self.stacks.expressions.push(Expression::Unary {
                    operator,
                    operand: Box::new(operand),
                    span: ctx.whole_or_lookahead(),
                });
            }
            Act::Binary(operator) => {
                let right = self.stacks.expressions.pop()?;
                let left = self.stacks.expressions.pop()?;
                self.stacks.expressions.push(Expression::Binary {
                    left: Box::new(left),
                    operator,
                    right: Box::new(right),
                    span: ctx.whole_or_lookahead(),
                });
            }
            Act::InstanceOf => {
                let type_ref = self.pop_type()?;
                let expression = self.stacks.expressions.pop()?;
                self.stacks.expressions.push(Expression::InstanceOf {
                    expression: Box::new(expression),
                    type_ref,
                    span: ctx.whole_or_lookahead(),
                });
            }
            Act::Conditional => {
                let value_if_false = self.stacks.expressions.pop()?;
                let value_if_true = self.stacks.expressions.pop()?;
                let condition = self.stacks.expressions.pop()?;
                self.stacks.expressions.push(Expression::Conditional {
                    condition: Box::new(condition),
                    value_if_true: Box::new(value_if_true),
                    value_if_false: Box::new(value_if_false),
                    span: ctx.whole_or_lookahead(),
                });
            }
            Act::AssignmentOperator(operator) => self.stacks.ints.push(encode_assignment(operator)),
            Act::Assignment => {
                let value = self.stacks.expressions.pop()?;
                let operator = decode_assignment(self.stacks.ints.pop()?);
                let target = self.stacks.expressions.pop()?;
                self.stacks.expressions.push(Expression::Assignment {
                    target: Box::new(target),
                    operator,
                    value: Box::new(value),
                    span: ctx.whole_or_lookahead(),
                });
            }

            dialect => return self.dialect_act(dialect, ctx),
        }
        Ok(())
    }

    fn consume_compilation_unit(&mut self, ctx: &ReduceContext) -> ParseResult<()> {
        let types = self
            .stacks
            .ast
            .pop_group()?
            .into_iter()
            .map(|node| match node {
                AstNode::Type(ty) => Ok(ty),
                _ => Err(ParseError::wrong_node("ast", "type", ctx.production)),
            })
            .collect::<ParseResult<Vec<_>>>()?;
        let imports = self
            .stacks
            .ast
            .pop_group()?
            .into_iter()
            .map(|node| match node {
                AstNode::Import(import) => Ok(import),
                _ => Err(ParseError::wrong_node("ast", "import", ctx.production)),
            })
            .collect::<ParseResult<Vec<_>>>()?;
        let package = match self.stacks.ast.pop_optional()? {
            None => None,
            Some(AstNode::Package(package)) => Some(package),
            Some(_) => return Err(ParseError::wrong_node("ast", "package", ctx.production)),
        };
        self.unit = Some(CompilationUnit {
            package,
            imports,
            types,
            span: ctx.whole_or_lookahead(),
        });
        Ok(())
    }

    fn consume_field_declaration(&mut self, ctx: &ReduceContext) -> ParseResult<()> {
        let declarators = self.pop_declarators()?;
        let type_ref = self.pop_type()?;
        let modifiers = self.pop_modifiers()?;
        let end = ctx.span(3).end;
        let start = if modifiers.is_empty() { type_ref.span.start } else { modifiers.start };
        let mut fields = Vec::with_capacity(declarators.len());
        for declarator in declarators {
            if type_ref.is_void() {
                self.reporter.error(ProblemId::VoidVariable, declarator.name_span, &[&declarator.name]);
            }
            let mut field_type = type_ref.clone();
            field_type.dims += declarator.dims;
            fields.push(AstNode::Field(FieldDeclaration {
                name: declarator.name,
                modifiers: modifiers.flags,
                annotations: modifiers.annotations.clone(),
                type_ref: field_type,
                initializer: declarator.initializer,
                source_start: declarator.name_span.start,
                source_end: declarator.name_span.end,
                declaration_source_start: start,
                declaration_source_end: end,
            }));
        }
        self.stacks.ast.push_group(fields);
        Ok(())
    }

    fn consume_locals(&mut self, modifiers: bool, ctx: &ReduceContext) -> ParseResult<Vec<LocalDeclaration>> {
        let declarators = self.pop_declarators()?;
        let type_ref = self.pop_type()?;
        let run = if modifiers { self.pop_modifiers()? } else { ModifierRun::default() };
        let start = ctx.whole_or_lookahead().start;
        let mut locals = Vec::with_capacity(declarators.len());
        for declarator in declarators {
            if type_ref.is_void() {
                self.reporter.error(ProblemId::VoidVariable, declarator.name_span, &[&declarator.name]);
            }
            let mut local_type = type_ref.clone();
            local_type.dims += declarator.dims;
            locals.push(LocalDeclaration {
                name: declarator.name,
                modifiers: run.flags,
                annotations: run.annotations.clone(),
                type_ref: local_type,
                initializer: declarator.initializer,
                name_span: declarator.name_span,
                span: Span::new(start, declarator.span.end),
            });
        }
        Ok(locals)
    }

    // Stack helpers

    pub(super) fn pop_name(&mut self) -> ParseResult<QualifiedName> {
        let identifiers = self.stacks.identifiers.pop_group()?;
        if identifiers.is_empty() {
            return Err(ParseError::underflow("identifier", self.production));
        }
        Ok(qualified_name(identifiers))
    }

    pub(super) fn pop_type(&mut self) -> ParseResult<TypeReference> {
        match self.stacks.generics.pop()? {
            GenericsNode::Type(type_ref) => Ok(type_ref),
            _ => Err(ParseError::wrong_node("generics", "type", self.production)),
        }
    }

    pub(super) fn pop_types(&mut self) -> ParseResult<Vec<TypeReference>> {
        let production = self.production;
        self.stacks
            .generics
            .pop_group()?
            .into_iter()
            .map(|node| match node {
                GenericsNode::Type(type_ref) => Ok(type_ref),
                _ => Err(ParseError::wrong_node("generics", "type", production)),
            })
            .collect()
    }

    fn pop_type_arguments(&mut self) -> ParseResult<Vec<TypeArgument>> {
        let production = self.production;
        self.stacks
            .generics
            .pop_group()?
            .into_iter()
            .map(|node| match node {
                GenericsNode::Type(type_ref) => Ok(TypeArgument::Type(type_ref)),
                GenericsNode::Wildcard(wildcard) => Ok(TypeArgument::Wildcard(wildcard)),
                GenericsNode::Parameter(_) => Err(ParseError::wrong_node("generics", "type argument", production)),
            })
            .collect()
    }

    pub(super) fn pop_type_parameters(&mut self) -> ParseResult<Vec<TypeParameter>> {
        let production = self.production;
        self.stacks
            .generics
            .pop_group()?
            .into_iter()
            .map(|node| match node {
                GenericsNode::Parameter(parameter) => Ok(parameter),
                _ => Err(ParseError::wrong_node("generics", "type parameter", production)),
            })
            .collect()
    }

    pub(super) fn pop_modifiers(&mut self) -> ParseResult<ModifierRun> {
        let start = self.stacks.ints.pop()?;
        let flags = self.stacks.ints.pop()? as u32;
        let annotations = self
            .stacks
            .expressions
            .pop_group()?
            .into_iter()
            .filter_map(|e| match e {
                Expression::Annotation(annotation) => Some(annotation),
                _ => None,
            })
            .collect();
        Ok(ModifierRun {
            flags,
            start,
            annotations,
        })
    }

    pub(super) fn pop_arguments(&mut self) -> ParseResult<Vec<Argument>> {
        let production = self.production;
        self.stacks
            .ast
            .pop_group()?
            .into_iter()
            .map(|node| match node {
                AstNode::Argument(argument) => Ok(argument),
                _ => Err(ParseError::wrong_node("ast", "argument", production)),
            })
            .collect()
    }

    fn pop_declarator(&mut self) -> ParseResult<Declarator> {
        match self.stacks.ast.pop()? {
            AstNode::Declarator(declarator) => Ok(declarator),
            _ => Err(ParseError::wrong_node("ast", "declarator", self.production)),
        }
    }

    fn pop_declarators(&mut self) -> ParseResult<Vec<Declarator>> {
        let production = self.production;
        self.stacks
            .ast
            .pop_group()?
            .into_iter()
            .map(|node| match node {
                AstNode::Declarator(declarator) => Ok(declarator),
                _ => Err(ParseError::wrong_node("ast", "declarator", production)),
            })
            .collect()
    }

    fn push_statement(&mut self, statement: Statement) {
        self.stacks.ast.push(AstNode::Statement(statement));
    }

    fn pop_statement(&mut self) -> ParseResult<Statement> {
        match self.stacks.ast.pop()? {
            AstNode::Statement(statement) => Ok(statement),
            _ => Err(ParseError::wrong_node("ast", "statement", self.production)),
        }
    }

    fn pop_statements(&mut self) -> ParseResult<Vec<Statement>> {
        let production = self.production;
        self.stacks
            .ast
            .pop_group()?
            .into_iter()
            .map(|node| match node {
                AstNode::Statement(statement) => Ok(statement),
                _ => Err(ParseError::wrong_node("ast", "statement", production)),
            })
            .collect()
    }

    fn pop_block(&mut self) -> ParseResult<Block> {
        match self.pop_statement()? {
            Statement::Block(block) => Ok(block),
            _ => Err(ParseError::wrong_node("ast", "block", self.production)),
        }
    }

    pub(super) fn top_type(&mut self) -> ParseResult<&mut TypeDeclaration> {
        let production = self.production;
        match self.stacks.ast.peek_mut()? {
            AstNode::Type(ty) => Ok(ty),
            _ => Err(ParseError::wrong_node("ast", "type", production)),
        }
    }

    pub(super) fn top_method(&mut self) -> ParseResult<&mut MethodDeclaration> {
        let production = self.production;
        match self.stacks.ast.peek_mut()? {
            AstNode::Method(method) => Ok(method),
            _ => Err(ParseError::wrong_node("ast", "method", production)),
        }
    }
}

/// Name, modifiers and positions shared by every type header.
pub(super) fn fill_type_header(ty: &mut TypeDeclaration, name: Identifier, modifiers: ModifierRun) {
    ty.name = name.name;
    ty.modifiers |= modifiers.flags;
    ty.annotations = modifiers.annotations;
    ty.source_start = name.span.start;
    ty.source_end = name.span.end;
    ty.declaration_source_start = modifiers.start.min(name.span.start);
    ty.declaration_source_end = name.span.end;
}

/// Modifiers and positions shared by every method-shaped header.
pub(super) fn fill_method_header(method: &mut MethodDeclaration, name_span: Span, modifiers: ModifierRun) {
    method.modifiers |= modifiers.flags;
    method.annotations = modifiers.annotations;
    method.source_start = name_span.start;
    method.source_end = name_span.end;
    method.declaration_source_start = modifiers.start.min(name_span.start);
    method.declaration_source_end = name_span.end;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::config::Config;
    use crate::factory::Dialect;

    fn parse(source: &str) -> CompilationUnit {
        let mut parser = Parser::new(Config::default(), Dialect::Disabled).expect("parser");
        let outcome = parser.parse_source(source).expect("parse");
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
        outcome.unit
    }

    fn body(unit: &CompilationUnit, method: &str) -> Vec<Statement> {
        unit.types[0]
            .method(method)
            .and_then(|m| m.statements.clone())
            .unwrap_or_default()
    }

    #[test]
    fn test_assignment_operator_codes() {
        assert_eq!(decode_assignment(encode_assignment(None)), None);
        for op in COMPOUND_ASSIGNMENTS {
            assert_eq!(decode_assignment(encode_assignment(Some(op))), Some(op));
        }
    }

    #[test]
    fn test_modifiers_and_annotations() {
        let unit = parse("@Deprecated public final class A { @Inject private static int x; }");
        let class = &unit.types[0];
        assert_eq!(class.modifiers, crate::common::consts::ACC_PUBLIC | crate::common::consts::ACC_FINAL);
        assert_eq!(class.annotations.len(), 1);
        assert_eq!(class.declaration_source_start, 0);
        let field = class.fields().next().expect("field");
        assert_eq!(field.annotations[0].type_name.to_string(), "Inject");
        assert!(field.declaration_source_start <= field.source_start);
    }

    #[test]
    fn test_duplicate_modifier_is_reported() {
        let mut parser = Parser::new(Config::default(), Dialect::Disabled).expect("parser");
        let outcome = parser.parse_source("class A { public public int x; }").expect("parse");
        assert!(outcome.has(ProblemId::DuplicateModifier));
        assert_eq!(outcome.unit.types[0].fields().count(), 1);
    }

    #[test]
    fn test_void_field_is_reported() {
        let mut parser = Parser::new(Config::default(), Dialect::Disabled).expect("parser");
        let outcome = parser.parse_source("class A { void x; }").expect("parse");
        assert!(outcome.has(ProblemId::VoidVariable));
    }

    #[test]
    fn test_statements() {
        let unit = parse(
            "class A { int m(int n) {\n  int total = 0;\n  for (int i = 0; i < n; i++) { total += i; }\n  if (total > 10) return total; else total = -1;\n  while (n > 0) n--;\n  try { m(1); } catch (Exception e) { } finally { total = 0; }\n  return total;\n} }",
        );
        let statements = body(&unit, "m");
        assert_eq!(statements.len(), 6);
        assert!(matches!(statements[0], Statement::LocalDeclaration(_)));
        assert!(matches!(statements[1], Statement::For { .. }));
        assert!(matches!(statements[2], Statement::If { else_statement: Some(_), .. }));
        assert!(matches!(statements[4], Statement::Try { finally: Some(_), .. }));
    }

    #[test]
    fn test_expression_precedence() {
        let unit = parse("class A { void m() { x = a + b * c; } }");
        match &body(&unit, "m")[0] {
            Statement::Expression(Expression::Assignment { value, .. }, _) => match value.as_ref() {
                Expression::Binary { operator, right, .. } => {
                    assert_eq!(*operator, BinaryOperator::Add);
                    assert!(matches!(right.as_ref(), Expression::Binary { operator: BinaryOperator::Mul, .. }));
                }
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_qualified_invocation_splits_receiver() {
        let unit = parse("class A { void m() { System.out.println(\"hi\"); } }");
        match &body(&unit, "m")[0] {
            Statement::Expression(Expression::MessageSend(send), _) => {
                assert_eq!(send.selector, "println");
                assert_eq!(send.receiver.as_ref().map(|r| r.to_string()), Some("System.out".to_string()));
                assert_eq!(send.arguments.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_constructor_and_varargs() {
        let unit = parse("class A { A(String... names) { this(1); } A(int x) { super(); } }");
        let ctors: Vec<_> = unit.types[0].methods().filter(|m| m.is_constructor()).collect();
        assert_eq!(ctors.len(), 2);
        assert!(ctors[0].arguments[0].is_varargs);
    }
}
