use std::fmt;

use super::DialectPayload;
use crate::common::consts::modifiers_to_string;
use crate::parser::span::Span;

/// A dotted name with the position of every segment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QualifiedName {
    pub tokens: Vec<String>,
    pub positions: Vec<Span>,
}

impl QualifiedName {
    pub fn new(tokens: Vec<String>, positions: Vec<Span>) -> Self {
        Self { tokens, positions }
    }

    pub fn simple(name: impl Into<String>, span: Span) -> Self {
        Self {
            tokens: vec![name.into()],
            positions: vec![span],
        }
    }

    pub fn span(&self) -> Span {
        match (self.positions.first(), self.positions.last()) {
            (Some(first), Some(last)) => first.to(*last),
            _ => Span::default(),
        }
    }

    pub fn last(&self) -> &str {
        self.tokens.last().map(String::as_str).unwrap_or("")
    }

    /// Segments joined with `separator`
    pub fn join(&self, separator: &str) -> String {
        self.tokens.join(separator)
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens.join("."))
    }
}

// Compilation unit

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompilationUnit {
    pub package: Option<PackageDeclaration>,
    pub imports: Vec<ImportReference>,
    pub types: Vec<TypeDeclaration>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackageDeclaration {
    pub name: QualifiedName,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportReference {
    pub name: QualifiedName,
    pub is_static: bool,
    pub on_demand: bool,
    pub span: Span,
}

impl fmt::Display for ImportReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "import ")?;
        if self.is_static {
            write!(f, "static ")?;
        }
        write!(f, "{}", self.name)?;
        if self.on_demand {
            write!(f, ".*")?;
        }
        write!(f, ";")
    }
}

// Types

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSegment {
    pub name: String,
    pub arguments: Vec<TypeArgument>,
    pub span: Span,
}

/// A type as written in source: `int`, `java.util.List<String>[]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeReference {
    pub segments: Vec<TypeSegment>,
    pub dims: usize,
    pub primitive: bool,
    pub span: Span,
}

impl TypeReference {
    pub fn primitive(name: &str, span: Span) -> Self {
        Self {
            segments: vec![TypeSegment {
                name: name.to_string(),
                arguments: Vec::new(),
                span,
            }],
            dims: 0,
            primitive: true,
            span,
        }
    }

    pub fn from_name(name: &QualifiedName) -> Self {
        let segments = name
            .tokens
            .iter()
            .zip(name.positions.iter())
            .map(|(token, span)| TypeSegment {
                name: token.clone(),
                arguments: Vec::new(),
                span: *span,
            })
            .collect();
        Self {
            segments,
            dims: 0,
            primitive: false,
            span: name.span(),
        }
    }

    pub fn is_void(&self) -> bool {
        self.primitive && self.dims == 0 && self.simple_name() == "void"
    }

    pub fn simple_name(&self) -> &str {
        self.segments.last().map(|s| s.name.as_str()).unwrap_or("")
    }

    /// Segment names without type arguments
    pub fn type_name(&self) -> Vec<String> {
        self.segments.iter().map(|s| s.name.clone()).collect()
    }

    pub fn is_parameterized(&self) -> bool {
        self.segments.iter().any(|s| !s.arguments.is_empty())
    }
}

impl fmt::Display for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", segment.name)?;
            if !segment.arguments.is_empty() {
                let args: Vec<String> = segment.arguments.iter().map(|a| a.to_string()).collect();
                write!(f, "<{}>", args.join(", "))?;
            }
        }
        for _ in 0..self.dims {
            write!(f, "[]")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WildcardKind {
    Unbound,
    Extends,
    Super,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wildcard {
    pub kind: WildcardKind,
    pub bound: Option<Box<TypeReference>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeArgument {
    Type(TypeReference),
    Wildcard(Wildcard),
}

impl TypeArgument {
    pub fn span(&self) -> Span {
        match self {
            TypeArgument::Type(t) => t.span,
            TypeArgument::Wildcard(w) => w.span,
        }
    }
}

impl fmt::Display for TypeArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeArgument::Type(t) => write!(f, "{}", t),
            TypeArgument::Wildcard(w) => match (&w.kind, &w.bound) {
                (WildcardKind::Extends, Some(bound)) => write!(f, "? extends {}", bound),
                (WildcardKind::Super, Some(bound)) => write!(f, "? super {}", bound),
                _ => write!(f, "?"),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParameter {
    pub name: String,
    pub bounds: Vec<TypeReference>,
    pub span: Span,
}

impl fmt::Display for TypeParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.bounds.is_empty() {
            let bounds: Vec<String> = self.bounds.iter().map(|b| b.to_string()).collect();
            write!(f, " extends {}", bounds.join(" & "))?;
        }
        Ok(())
    }
}

// Annotations

#[derive(Debug, Clone, PartialEq)]
pub struct MemberValuePair {
    pub name: String,
    pub value: Expression,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub type_name: QualifiedName,
    pub values: Vec<MemberValuePair>,
    pub span: Span,
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.type_name)?;
        if !self.values.is_empty() {
            let values: Vec<String> = self
                .values
                .iter()
                .map(|pair| format!("{}={}", pair.name, pair.value))
                .collect();
            write!(f, "({})", values.join(", "))?;
        }
        Ok(())
    }
}

// Declarations

/// Source ranges every declaration carries.
///
/// `source_*` bracket the name token, `declaration_source_*` the whole
/// declaration from its first modifier to its closing token.
pub trait Declaration {
    fn source_start(&self) -> usize;
    fn source_end(&self) -> usize;
    fn declaration_source_start(&self) -> usize;
    fn declaration_source_end(&self) -> usize;

    /// True when the name range sits inside the declaration range.
    fn positions_nested(&self) -> bool {
        self.source_start() <= self.source_end()
            && self.declaration_source_start() <= self.source_start()
            && self.source_end() <= self.declaration_source_end()
    }
}

macro_rules! impl_declaration {
    ($($ty:ty),*) => {
        $(impl Declaration for $ty {
            fn source_start(&self) -> usize { self.source_start }
            fn source_end(&self) -> usize { self.source_end }
            fn declaration_source_start(&self) -> usize { self.declaration_source_start }
            fn declaration_source_end(&self) -> usize { self.declaration_source_end }
        })*
    };
}

impl_declaration!(TypeDeclaration, MethodDeclaration, FieldDeclaration, Initializer);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Interface,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDeclaration {
    pub kind: TypeKind,
    pub name: String,
    pub modifiers: u32,
    pub annotations: Vec<Annotation>,
    pub type_parameters: Vec<TypeParameter>,
    pub superclass: Option<TypeReference>,
    pub super_interfaces: Vec<TypeReference>,
    pub members: Vec<Member>,
    pub source_start: usize,
    pub source_end: usize,
    pub declaration_source_start: usize,
    pub declaration_source_end: usize,
    pub body_start: Option<usize>,
    /// `None` while the closing brace has not been reduced.
    pub body_end: Option<usize>,
    /// Extra state owned by a dialect (aspect, inter-type member class).
    pub dialect: Option<Box<dyn DialectPayload>>,
}

impl TypeDeclaration {
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            name: String::new(),
            modifiers: 0,
            annotations: Vec::new(),
            type_parameters: Vec::new(),
            superclass: None,
            super_interfaces: Vec::new(),
            members: Vec::new(),
            source_start: 0,
            source_end: 0,
            declaration_source_start: 0,
            declaration_source_end: 0,
            body_start: None,
            body_end: None,
            dialect: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.body_end.is_none()
    }

    pub fn dialect_kind(&self) -> Option<&'static str> {
        self.dialect.as_ref().map(|d| d.kind())
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDeclaration> {
        self.members.iter().filter_map(|m| match m {
            Member::Method(method) => Some(method),
            _ => None,
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDeclaration> {
        self.members.iter().filter_map(|m| match m {
            Member::Field(field) => Some(field),
            _ => None,
        })
    }

    pub fn member_types(&self) -> impl Iterator<Item = &TypeDeclaration> {
        self.members.iter().filter_map(|m| match m {
            Member::Type(ty) => Some(ty),
            _ => None,
        })
    }

    /// First method (of any kind) whose selector matches.
    pub fn method(&self, selector: &str) -> Option<&MethodDeclaration> {
        self.methods().find(|m| m.selector == selector)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Field(FieldDeclaration),
    Method(MethodDeclaration),
    Type(TypeDeclaration),
    Initializer(Initializer),
}

impl Member {
    pub fn declaration(&self) -> &dyn Declaration {
        match self {
            Member::Field(d) => d,
            Member::Method(d) => d,
            Member::Type(d) => d,
            Member::Initializer(d) => d,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDeclaration {
    pub name: String,
    pub modifiers: u32,
    pub annotations: Vec<Annotation>,
    pub type_ref: TypeReference,
    pub initializer: Option<Expression>,
    pub source_start: usize,
    pub source_end: usize,
    pub declaration_source_start: usize,
    pub declaration_source_end: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Initializer {
    pub modifiers: u32,
    pub block: Block,
    pub source_start: usize,
    pub source_end: usize,
    pub declaration_source_start: usize,
    pub declaration_source_end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    Method,
    Constructor,
    /// Built by a dialect; the payload says what it is.
    Dialect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: String,
    pub type_ref: TypeReference,
    pub modifiers: u32,
    pub annotations: Vec<Annotation>,
    pub is_varargs: bool,
    pub name_span: Span,
    pub span: Span,
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers != 0 {
            write!(f, "{} ", modifiers_to_string(self.modifiers))?;
        }
        write!(f, "{}{} {}", self.type_ref, if self.is_varargs { "..." } else { "" }, self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDeclaration {
    pub kind: MethodKind,
    pub selector: String,
    pub modifiers: u32,
    pub annotations: Vec<Annotation>,
    pub type_parameters: Vec<TypeParameter>,
    pub return_type: Option<TypeReference>,
    pub arguments: Vec<Argument>,
    pub thrown_exceptions: Vec<TypeReference>,
    /// `None` for a body-less declaration (`;`) or one still being parsed.
    pub statements: Option<Vec<Statement>>,
    pub source_start: usize,
    pub source_end: usize,
    pub declaration_source_start: usize,
    pub declaration_source_end: usize,
    pub body_start: Option<usize>,
    pub body_end: Option<usize>,
    pub dialect: Option<Box<dyn DialectPayload>>,
}

impl MethodDeclaration {
    pub fn new(kind: MethodKind) -> Self {
        Self {
            kind,
            selector: String::new(),
            modifiers: 0,
            annotations: Vec::new(),
            type_parameters: Vec::new(),
            return_type: None,
            arguments: Vec::new(),
            thrown_exceptions: Vec::new(),
            statements: None,
            source_start: 0,
            source_end: 0,
            declaration_source_start: 0,
            declaration_source_end: 0,
            body_start: None,
            body_end: None,
            dialect: None,
        }
    }

    pub fn is_constructor(&self) -> bool {
        self.kind == MethodKind::Constructor
    }

    pub fn is_dialect(&self) -> bool {
        self.kind == MethodKind::Dialect
    }

    pub fn dialect_kind(&self) -> Option<&'static str> {
        self.dialect.as_ref().map(|d| d.kind())
    }

    pub fn is_open(&self) -> bool {
        self.body_end.is_none()
    }

    /// Payload downcast to the dialect's concrete type.
    pub fn payload<T: DialectPayload>(&self) -> Option<&T> {
        self.dialect.as_ref().and_then(|d| d.as_any().downcast_ref::<T>())
    }

    pub fn payload_mut<T: DialectPayload>(&mut self) -> Option<&mut T> {
        self.dialect.as_mut().and_then(|d| d.as_any_mut().downcast_mut::<T>())
    }
}

// Statements

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Statement>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalDeclaration {
    pub name: String,
    pub modifiers: u32,
    pub annotations: Vec<Annotation>,
    pub type_ref: TypeReference,
    pub initializer: Option<Expression>,
    pub name_span: Span,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchClause {
    pub argument: Argument,
    pub block: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Block(Block),
    LocalDeclaration(LocalDeclaration),
    Expression(Expression, Span),
    If {
        condition: Expression,
        then_statement: Box<Statement>,
        else_statement: Option<Box<Statement>>,
        span: Span,
    },
    While {
        condition: Expression,
        body: Box<Statement>,
        span: Span,
    },
    Do {
        body: Box<Statement>,
        condition: Expression,
        span: Span,
    },
    For {
        initializations: Vec<Statement>,
        condition: Option<Expression>,
        increments: Vec<Expression>,
        body: Box<Statement>,
        span: Span,
    },
    ForEach {
        variable: LocalDeclaration,
        collection: Expression,
        body: Box<Statement>,
        span: Span,
    },
    Return {
        expression: Option<Expression>,
        span: Span,
    },
    Throw {
        expression: Expression,
        span: Span,
    },
    Break {
        label: Option<String>,
        span: Span,
    },
    Continue {
        label: Option<String>,
        span: Span,
    },
    Labeled {
        label: String,
        statement: Box<Statement>,
        span: Span,
    },
    Try {
        block: Block,
        catches: Vec<CatchClause>,
        finally: Option<Block>,
        span: Span,
    },
    Assert {
        condition: Expression,
        message: Option<Expression>,
        span: Span,
    },
    /// `this(...)` or `super(...)` at the start of a constructor body
    ExplicitConstructorCall {
        is_super: bool,
        arguments: Vec<Expression>,
        span: Span,
    },
    Empty(Span),
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Block(block) => block.span,
            Statement::LocalDeclaration(local) => local.span,
            Statement::Expression(_, span)
            | Statement::If { span, .. }
            | Statement::While { span, .. }
            | Statement::Do { span, .. }
            | Statement::For { span, .. }
            | Statement::ForEach { span, .. }
            | Statement::Return { span, .. }
            | Statement::Throw { span, .. }
            | Statement::Break { span, .. }
            | Statement::Continue { span, .. }
            | Statement::Labeled { span, .. }
            | Statement::Try { span, .. }
            | Statement::Assert { span, .. }
            | Statement::ExplicitConstructorCall { span, .. }
            | Statement::Empty(span) => *span,
        }
    }

    pub fn set_span(&mut self, new_span: Span) {
        match self {
            Statement::Block(block) => block.span = new_span,
            Statement::LocalDeclaration(local) => local.span = new_span,
            Statement::Expression(_, span)
            | Statement::If { span, .. }
            | Statement::While { span, .. }
            | Statement::Do { span, .. }
            | Statement::For { span, .. }
            | Statement::ForEach { span, .. }
            | Statement::Return { span, .. }
            | Statement::Throw { span, .. }
            | Statement::Break { span, .. }
            | Statement::Continue { span, .. }
            | Statement::Labeled { span, .. }
            | Statement::Try { span, .. }
            | Statement::Assert { span, .. }
            | Statement::ExplicitConstructorCall { span, .. }
            | Statement::Empty(span) => *span = new_span,
        }
    }
}

// Expressions

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Int,
    Long,
    Float,
    Double,
    Char,
    String,
    True,
    False,
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    pub kind: LiteralKind,
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOperator {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    LShift,
    RShift,
    URShift,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Xor,
    Or,
    AndAnd,
    OrOr,
}

impl BinaryOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Rem => "%",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::LShift => "<<",
            BinaryOperator::RShift => ">>",
            BinaryOperator::URShift => ">>>",
            BinaryOperator::Lt => "<",
            BinaryOperator::Gt => ">",
            BinaryOperator::Le => "<=",
            BinaryOperator::Ge => ">=",
            BinaryOperator::Eq => "==",
            BinaryOperator::Ne => "!=",
            BinaryOperator::And => "&",
            BinaryOperator::Xor => "^",
            BinaryOperator::Or => "|",
            BinaryOperator::AndAnd => "&&",
            BinaryOperator::OrOr => "||",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Plus,
    Minus,
    Not,
    Complement,
    PreIncrement,
    PreDecrement,
    PostIncrement,
    PostDecrement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageSend {
    pub receiver: Option<Box<Expression>>,
    pub selector: String,
    pub arguments: Vec<Expression>,
    pub selector_span: Span,
    pub span: Span,
    /// Set when a dialect re-created the call (`proceed(..)`)
    pub dialect: Option<Box<dyn DialectPayload>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    Name(QualifiedName),
    This(Span),
    Super(Span),
    FieldAccess {
        receiver: Box<Expression>,
        name: String,
        span: Span,
    },
    MessageSend(MessageSend),
    Allocation {
        type_ref: TypeReference,
        arguments: Vec<Expression>,
        span: Span,
    },
    /// `operator` is `None` for plain `=`
    Assignment {
        target: Box<Expression>,
        operator: Option<BinaryOperator>,
        value: Box<Expression>,
        span: Span,
    },
    Binary {
        left: Box<Expression>,
        operator: BinaryOperator,
        right: Box<Expression>,
        span: Span,
    },
    Unary {
        operator: UnaryOperator,
        operand: Box<Expression>,
        span: Span,
    },
    Conditional {
        condition: Box<Expression>,
        value_if_true: Box<Expression>,
        value_if_false: Box<Expression>,
        span: Span,
    },
    InstanceOf {
        expression: Box<Expression>,
        type_ref: TypeReference,
        span: Span,
    },
    Parenthesized(Box<Expression>, Span),
    Annotation(Annotation),
}

impl Expression {
    pub fn span(&self) -> Span {
        match self {
            Expression::Literal(literal) => literal.span,
            Expression::Name(name) => name.span(),
            Expression::MessageSend(send) => send.span,
            Expression::Annotation(annotation) => annotation.span,
            Expression::This(span)
            | Expression::Super(span)
            | Expression::Parenthesized(_, span)
            | Expression::FieldAccess { span, .. }
            | Expression::Allocation { span, .. }
            | Expression::Assignment { span, .. }
            | Expression::Binary { span, .. }
            | Expression::Unary { span, .. }
            | Expression::Conditional { span, .. }
            | Expression::InstanceOf { span, .. } => *span,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(literal) => write!(f, "{}", literal.text),
            Expression::Name(name) => write!(f, "{}", name),
            Expression::This(_) => write!(f, "this"),
            Expression::Super(_) => write!(f, "super"),
            Expression::FieldAccess { receiver, name, .. } => write!(f, "{}.{}", receiver, name),
            Expression::MessageSend(send) => {
                if let Some(receiver) = &send.receiver {
                    write!(f, "{}.", receiver)?;
                }
                let args: Vec<String> = send.arguments.iter().map(|a| a.to_string()).collect();
                write!(f, "{}({})", send.selector, args.join(", "))
            }
            Expression::Allocation { type_ref, arguments, .. } => {
                let args: Vec<String> = arguments.iter().map(|a| a.to_string()).collect();
                write!(f, "new {}({})", type_ref, args.join(", "))
            }
            Expression::Assignment { target, operator, value, .. } => match operator {
                Some(op) => write!(f, "{} {}= {}", target, op.as_str(), value),
                None => write!(f, "{} = {}", target, value),
            },
            Expression::Binary { left, operator, right, .. } => {
                write!(f, "{} {} {}", left, operator.as_str(), right)
            }
            Expression::Unary { operator, operand, .. } => match operator {
                UnaryOperator::Plus => write!(f, "+{}", operand),
                UnaryOperator::Minus => write!(f, "-{}", operand),
                UnaryOperator::Not => write!(f, "!{}", operand),
                UnaryOperator::Complement => write!(f, "~{}", operand),
                UnaryOperator::PreIncrement => write!(f, "++{}", operand),
                UnaryOperator::PreDecrement => write!(f, "--{}", operand),
                UnaryOperator::PostIncrement => write!(f, "{}++", operand),
                UnaryOperator::PostDecrement => write!(f, "{}--", operand),
            },
            Expression::Conditional {
                condition,
                value_if_true,
                value_if_false,
                ..
            } => write!(f, "{} ? {} : {}", condition, value_if_true, value_if_false),
            Expression::InstanceOf { expression, type_ref, .. } => {
                write!(f, "{} instanceof {}", expression, type_ref)
            }
            Expression::Parenthesized(inner, _) => write!(f, "({})", inner),
            Expression::Annotation(annotation) => write!(f, "{}", annotation),
        }
    }
}
