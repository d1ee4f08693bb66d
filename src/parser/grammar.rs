//! The grammar, as text rules with one semantic action each.
//!
//! A rule reads `Lhs ::= sym sym ...`; a symbol that appears on the left of
//! some rule is a nonterminal, anything else must be a terminal's grammar
//! name (see [`TokenKind::grammar_name`]). Production numbers are positions
//! in [`RULES`]; production 0 is the start rule.

use std::collections::HashMap;

use once_cell::sync::OnceCell;

use super::error::{ParseError, ParseResult};
use super::lexer::TokenKind;
use crate::ast::{BinaryOperator, TypeKind, UnaryOperator, WildcardKind};
use crate::common::consts::*;

/// How an inter-type header misuses a type pattern where a name belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypePatternUse {
    /// `OnType.name`
    Plain,
    /// `OnType.*.name`
    StarSegment,
    /// `OnType.*`
    StarOnly,
    /// `OnType+.name`
    Plus,
}

/// Semantic action attached to a production.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Act {
    NoAction,

    // Lists
    EmptyAstList,
    EmptyExpressionList,
    EmptyGenericsList,
    ConcatAst,
    ConcatExpressions,
    ConcatGenerics,
    ConcatIdentifiers,

    // Compilation unit
    CompilationUnit,
    PackageDeclaration,
    Import { is_static: bool, on_demand: bool },

    // Types
    PrimitiveType(&'static str),
    ClassOrInterfaceName,
    QualifiedGenericType,
    GenericType,
    ArrayType,
    DimsOne,
    DimsMore,
    DimsZero,
    Wildcard(WildcardKind),
    TypeParameter { bounded: bool, additional: bool },

    // Modifiers and annotations
    EmptyModifiers,
    ModifierKeyword(u32),
    AnnotationModifier,
    ConcatModifiers,
    MarkerAnnotation,
    SingleMemberAnnotation,

    // Declarations
    TypeHeaderName { kind: TypeKind, type_parameters: bool },
    SuperClass,
    SuperInterfaces,
    ClassBody,
    FieldDeclaration,
    VariableDeclaratorId,
    DeclaratorInitializer,
    MethodHeaderName { type_parameters: bool },
    ConstructorHeaderName,
    MethodHeader,
    MethodDeclaration,
    EmptyMethodBody,
    FormalParameter { modifiers: bool, varargs: bool },
    Initializer,

    // Statements
    Block,
    LocalVariableDeclaration { modifiers: bool },
    LocalVariableDeclarationStatement,
    EmptyStatement,
    ExpressionStatement,
    LabeledStatement,
    IfThen,
    IfThenElse,
    While,
    Do,
    For,
    ForInitExpressions,
    ForEach { modifiers: bool },
    Return,
    Throw,
    Break { label: bool },
    Continue { label: bool },
    Try { finally: bool },
    CatchClause,
    Assert { message: bool },
    ExplicitConstructorCall { is_super: bool },

    // Expressions
    This,
    Parenthesized,
    Allocation,
    FieldAccess { is_super: bool },
    MethodInvocationName,
    MethodInvocationPrimary,
    MethodInvocationSuper,
    NameExpression,
    Postfix(UnaryOperator),
    Unary(UnaryOperator),
    Binary(BinaryOperator),
    InstanceOf,
    Conditional,
    AssignmentOperator(Option<BinaryOperator>),
    Assignment,

    // Dialect
    AspectHeaderName { privileged: bool, type_parameters: bool },
    AspectHeaderRest,
    PointcutHeader,
    PointcutDeclaration { designator: bool },
    AroundHeaderName { return_type: bool },
    BasicAdviceHeaderName { after: bool },
    AdviceHeader { extra_parameter: bool },
    ExtraParameter { formal: bool },
    DeclareHeader,
    DeclareDeclaration,
    DeclareAnnotationHeader,
    DeclareAnnotation(char),
    InterTypeFieldHeader(TypePatternUse),
    InterTypeFieldBody { initializer: bool },
    InterTypeFieldDeclaration,
    InterTypeMethodHeaderName(TypePatternUse),
    InterTypeConstructorHeaderName { plus: bool },
    InterTypeClassHeaderName,
    PseudoToken(&'static str, bool),
    PseudoTokenIdentifier,
    PseudoTokenLiteral,
    PseudoTokenModifier,
    PseudoTokenPrimitiveType,
    PseudoTokenIf,
}

impl Act {
    /// Whether the action builds through the dialect factory.
    pub fn is_dialect(self) -> bool {
        matches!(
            self,
            Act::AspectHeaderName { .. }
                | Act::AspectHeaderRest
                | Act::PointcutHeader
                | Act::PointcutDeclaration { .. }
                | Act::AroundHeaderName { .. }
                | Act::BasicAdviceHeaderName { .. }
                | Act::AdviceHeader { .. }
                | Act::ExtraParameter { .. }
                | Act::DeclareHeader
                | Act::DeclareDeclaration
                | Act::DeclareAnnotationHeader
                | Act::DeclareAnnotation(_)
                | Act::InterTypeFieldHeader(_)
                | Act::InterTypeFieldBody { .. }
                | Act::InterTypeFieldDeclaration
                | Act::InterTypeMethodHeaderName(_)
                | Act::InterTypeConstructorHeaderName { .. }
                | Act::InterTypeClassHeaderName
                | Act::PseudoToken(..)
                | Act::PseudoTokenIdentifier
                | Act::PseudoTokenLiteral
                | Act::PseudoTokenModifier
                | Act::PseudoTokenPrimitiveType
                | Act::PseudoTokenIf
        )
    }
}

use Act::*;

/// Every production of the language, base grammar first, dialect last.
pub const RULES: &[(&str, Act)] = &[
    ("Goal ::= CompilationUnit", NoAction),
    // Compilation unit
    ("CompilationUnit ::= PackageDeclarationopt ImportDeclarationsopt TypeDeclarationsopt", CompilationUnit),
    ("PackageDeclarationopt ::=", EmptyAstList),
    ("PackageDeclarationopt ::= PackageDeclaration", NoAction),
    ("PackageDeclaration ::= package Name ;", PackageDeclaration),
    ("ImportDeclarationsopt ::=", EmptyAstList),
    ("ImportDeclarationsopt ::= ImportDeclarations", NoAction),
    ("ImportDeclarations ::= ImportDeclaration", NoAction),
    ("ImportDeclarations ::= ImportDeclarations ImportDeclaration", ConcatAst),
    ("ImportDeclaration ::= import Name ;", Import { is_static: false, on_demand: false }),
    ("ImportDeclaration ::= import Name . * ;", Import { is_static: false, on_demand: true }),
    ("ImportDeclaration ::= import static Name ;", Import { is_static: true, on_demand: false }),
    ("ImportDeclaration ::= import static Name . * ;", Import { is_static: true, on_demand: true }),
    ("TypeDeclarationsopt ::=", EmptyAstList),
    ("TypeDeclarationsopt ::= TypeDeclarations", NoAction),
    ("TypeDeclarations ::= TypeDeclaration", NoAction),
    ("TypeDeclarations ::= TypeDeclarations TypeDeclaration", ConcatAst),
    ("TypeDeclaration ::= ClassDeclaration", NoAction),
    ("TypeDeclaration ::= InterfaceDeclaration", NoAction),
    ("TypeDeclaration ::= AspectDeclaration", NoAction),
    ("TypeDeclaration ::= ;", EmptyAstList),
    // Names and types
    ("Name ::= Identifier", NoAction),
    ("Name ::= Name . Identifier", ConcatIdentifiers),
    ("Type ::= PrimitiveType", NoAction),
    ("Type ::= ReferenceType", NoAction),
    ("PrimitiveType ::= boolean", PrimitiveType("boolean")),
    ("PrimitiveType ::= byte", PrimitiveType("byte")),
    ("PrimitiveType ::= short", PrimitiveType("short")),
    ("PrimitiveType ::= int", PrimitiveType("int")),
    ("PrimitiveType ::= long", PrimitiveType("long")),
    ("PrimitiveType ::= char", PrimitiveType("char")),
    ("PrimitiveType ::= float", PrimitiveType("float")),
    ("PrimitiveType ::= double", PrimitiveType("double")),
    ("PrimitiveType ::= void", PrimitiveType("void")),
    ("ReferenceType ::= ClassOrInterfaceType", NoAction),
    ("ReferenceType ::= ArrayType", NoAction),
    ("ClassOrInterfaceType ::= ClassOrInterface", NoAction),
    ("ClassOrInterfaceType ::= GenericType", NoAction),
    ("ClassOrInterface ::= Name", ClassOrInterfaceName),
    ("ClassOrInterface ::= GenericType . Name", QualifiedGenericType),
    ("GenericType ::= ClassOrInterface TypeArguments", GenericType),
    ("ArrayType ::= PrimitiveType Dims", ArrayType),
    ("ArrayType ::= ClassOrInterfaceType Dims", ArrayType),
    ("ClassType ::= ClassOrInterfaceType", NoAction),
    ("ClassTypeList ::= ClassType", NoAction),
    ("ClassTypeList ::= ClassTypeList , ClassType", ConcatGenerics),
    ("Dims ::= [ ]", DimsOne),
    ("Dims ::= Dims [ ]", DimsMore),
    ("Dimsopt ::=", DimsZero),
    ("Dimsopt ::= Dims", NoAction),
    ("TypeArguments ::= < TypeArgumentList >", NoAction),
    ("TypeArgumentList ::= TypeArgument", NoAction),
    ("TypeArgumentList ::= TypeArgumentList , TypeArgument", ConcatGenerics),
    ("TypeArgument ::= ReferenceType", NoAction),
    ("TypeArgument ::= ?", Wildcard(WildcardKind::Unbound)),
    ("TypeArgument ::= ? extends ReferenceType", Wildcard(WildcardKind::Extends)),
    ("TypeArgument ::= ? super ReferenceType", Wildcard(WildcardKind::Super)),
    ("TypeParameters ::= < TypeParameterList >", NoAction),
    ("TypeParameterList ::= TypeParameter", NoAction),
    ("TypeParameterList ::= TypeParameterList , TypeParameter", ConcatGenerics),
    ("TypeParameter ::= Identifier", TypeParameter { bounded: false, additional: false }),
    ("TypeParameter ::= Identifier extends ReferenceType", TypeParameter { bounded: true, additional: false }),
    (
        "TypeParameter ::= Identifier extends ReferenceType AdditionalBoundList",
        TypeParameter { bounded: true, additional: true },
    ),
    ("AdditionalBoundList ::= AdditionalBound", NoAction),
    ("AdditionalBoundList ::= AdditionalBoundList AdditionalBound", ConcatGenerics),
    ("AdditionalBound ::= & ReferenceType", NoAction),
    // Modifiers and annotations
    ("Modifiersopt ::=", EmptyModifiers),
    ("Modifiersopt ::= Modifiers", NoAction),
    ("Modifiers ::= Modifier", NoAction),
    ("Modifiers ::= Modifiers Modifier", ConcatModifiers),
    ("Modifier ::= ModifierKeyword", NoAction),
    ("Modifier ::= Annotation", AnnotationModifier),
    ("ModifierKeyword ::= public", ModifierKeyword(ACC_PUBLIC)),
    ("ModifierKeyword ::= protected", ModifierKeyword(ACC_PROTECTED)),
    ("ModifierKeyword ::= private", ModifierKeyword(ACC_PRIVATE)),
    ("ModifierKeyword ::= static", ModifierKeyword(ACC_STATIC)),
    ("ModifierKeyword ::= abstract", ModifierKeyword(ACC_ABSTRACT)),
    ("ModifierKeyword ::= final", ModifierKeyword(ACC_FINAL)),
    ("ModifierKeyword ::= native", ModifierKeyword(ACC_NATIVE)),
    ("ModifierKeyword ::= synchronized", ModifierKeyword(ACC_SYNCHRONIZED)),
    ("ModifierKeyword ::= transient", ModifierKeyword(ACC_TRANSIENT)),
    ("ModifierKeyword ::= volatile", ModifierKeyword(ACC_VOLATILE)),
    ("ModifierKeyword ::= strictfp", ModifierKeyword(ACC_STRICTFP)),
    ("ModifierKeyword ::= default", ModifierKeyword(ACC_DEFAULT_METHOD)),
    ("Annotation ::= @ Name", MarkerAnnotation),
    ("Annotation ::= @ Name ( ConditionalExpression )", SingleMemberAnnotation),
    // Class, interface and member declarations
    ("ClassDeclaration ::= ClassHeader ClassBody", NoAction),
    ("ClassHeader ::= ClassHeaderName ClassHeaderExtendsopt ClassHeaderImplementsopt", NoAction),
    ("ClassHeaderName ::= Modifiersopt class Identifier", TypeHeaderName { kind: TypeKind::Class, type_parameters: false }),
    (
        "ClassHeaderName ::= Modifiersopt class Identifier TypeParameters",
        TypeHeaderName { kind: TypeKind::Class, type_parameters: true },
    ),
    ("ClassHeaderExtendsopt ::=", NoAction),
    ("ClassHeaderExtendsopt ::= extends ClassType", SuperClass),
    ("ClassHeaderImplementsopt ::=", NoAction),
    ("ClassHeaderImplementsopt ::= implements ClassTypeList", SuperInterfaces),
    ("InterfaceDeclaration ::= InterfaceHeader ClassBody", NoAction),
    ("InterfaceHeader ::= InterfaceHeaderName InterfaceHeaderExtendsopt", NoAction),
    (
        "InterfaceHeaderName ::= Modifiersopt interface Identifier",
        TypeHeaderName { kind: TypeKind::Interface, type_parameters: false },
    ),
    (
        "InterfaceHeaderName ::= Modifiersopt interface Identifier TypeParameters",
        TypeHeaderName { kind: TypeKind::Interface, type_parameters: true },
    ),
    ("InterfaceHeaderExtendsopt ::=", NoAction),
    ("InterfaceHeaderExtendsopt ::= extends ClassTypeList", SuperInterfaces),
    ("ClassBody ::= { ClassBodyDeclarationsopt }", ClassBody),
    ("ClassBodyDeclarationsopt ::=", EmptyAstList),
    ("ClassBodyDeclarationsopt ::= ClassBodyDeclarations", NoAction),
    ("ClassBodyDeclarations ::= ClassBodyDeclaration", NoAction),
    ("ClassBodyDeclarations ::= ClassBodyDeclarations ClassBodyDeclaration", ConcatAst),
    ("ClassBodyDeclaration ::= ClassMemberDeclaration", NoAction),
    ("ClassBodyDeclaration ::= ;", EmptyAstList),
    ("ClassMemberDeclaration ::= FieldDeclaration", NoAction),
    ("ClassMemberDeclaration ::= MethodDeclaration", NoAction),
    ("ClassMemberDeclaration ::= ConstructorDeclaration", NoAction),
    ("ClassMemberDeclaration ::= Initializer", NoAction),
    ("ClassMemberDeclaration ::= ClassDeclaration", NoAction),
    ("ClassMemberDeclaration ::= InterfaceDeclaration", NoAction),
    ("ClassMemberDeclaration ::= AspectDeclaration", NoAction),
    ("ClassMemberDeclaration ::= PointcutDeclaration", NoAction),
    ("ClassMemberDeclaration ::= AdviceDeclaration", NoAction),
    ("ClassMemberDeclaration ::= DeclareDeclaration", NoAction),
    ("ClassMemberDeclaration ::= DeclareAnnotationDeclaration", NoAction),
    ("ClassMemberDeclaration ::= InterTypeFieldDeclaration", NoAction),
    ("ClassMemberDeclaration ::= InterTypeMethodDeclaration", NoAction),
    ("ClassMemberDeclaration ::= InterTypeConstructorDeclaration", NoAction),
    ("ClassMemberDeclaration ::= InterTypeClassDeclaration", NoAction),
    ("FieldDeclaration ::= Modifiersopt Type VariableDeclarators ;", FieldDeclaration),
    ("VariableDeclarators ::= VariableDeclarator", NoAction),
    ("VariableDeclarators ::= VariableDeclarators , VariableDeclarator", ConcatAst),
    ("VariableDeclarator ::= VariableDeclaratorId", NoAction),
    ("VariableDeclarator ::= VariableDeclaratorId = VariableInitializer", DeclaratorInitializer),
    ("VariableDeclaratorId ::= Identifier Dimsopt", VariableDeclaratorId),
    ("VariableInitializer ::= Expression", NoAction),
    ("MethodDeclaration ::= MethodHeader MethodBody", MethodDeclaration),
    ("MethodHeader ::= MethodHeaderName FormalParameterListopt ) MethodHeaderThrowsClauseopt", MethodHeader),
    ("MethodHeaderName ::= Modifiersopt Type Identifier (", MethodHeaderName { type_parameters: false }),
    ("MethodHeaderName ::= Modifiersopt TypeParameters Type Identifier (", MethodHeaderName { type_parameters: true }),
    ("MethodHeaderThrowsClauseopt ::=", EmptyGenericsList),
    ("MethodHeaderThrowsClauseopt ::= throws ClassTypeList", NoAction),
    ("MethodBody ::= Block", NoAction),
    ("MethodBody ::= ;", EmptyMethodBody),
    ("ConstructorDeclaration ::= ConstructorHeader MethodBody", MethodDeclaration),
    (
        "ConstructorHeader ::= ConstructorHeaderName FormalParameterListopt ) MethodHeaderThrowsClauseopt",
        MethodHeader,
    ),
    ("ConstructorHeaderName ::= Modifiersopt Identifier (", ConstructorHeaderName),
    ("FormalParameterListopt ::=", EmptyAstList),
    ("FormalParameterListopt ::= FormalParameterList", NoAction),
    ("FormalParameterList ::= FormalParameter", NoAction),
    ("FormalParameterList ::= FormalParameterList , FormalParameter", ConcatAst),
    ("FormalParameter ::= Type VariableDeclaratorId", FormalParameter { modifiers: false, varargs: false }),
    ("FormalParameter ::= Modifiers Type VariableDeclaratorId", FormalParameter { modifiers: true, varargs: false }),
    ("FormalParameter ::= Type ... VariableDeclaratorId", FormalParameter { modifiers: false, varargs: true }),
    ("FormalParameter ::= Modifiers Type ... VariableDeclaratorId", FormalParameter { modifiers: true, varargs: true }),
    ("Initializer ::= Modifiersopt Block", Initializer),
    // Statements
    ("Block ::= { BlockStatementsopt }", Block),
    ("BlockStatementsopt ::=", EmptyAstList),
    ("BlockStatementsopt ::= BlockStatements", NoAction),
    ("BlockStatements ::= BlockStatement", NoAction),
    ("BlockStatements ::= BlockStatements BlockStatement", ConcatAst),
    ("BlockStatement ::= LocalVariableDeclarationStatement", NoAction),
    ("BlockStatement ::= Statement", NoAction),
    ("BlockStatement ::= ExplicitConstructorInvocation", NoAction),
    ("LocalVariableDeclarationStatement ::= LocalVariableDeclaration ;", LocalVariableDeclarationStatement),
    ("LocalVariableDeclaration ::= Type VariableDeclarators", LocalVariableDeclaration { modifiers: false }),
    ("LocalVariableDeclaration ::= Modifiers Type VariableDeclarators", LocalVariableDeclaration { modifiers: true }),
    ("Statement ::= Block", NoAction),
    ("Statement ::= ;", EmptyStatement),
    ("Statement ::= StatementExpression ;", ExpressionStatement),
    ("Statement ::= Identifier : Statement", LabeledStatement),
    ("Statement ::= if ( Expression ) Statement", IfThen),
    ("Statement ::= if ( Expression ) Statement else Statement", IfThenElse),
    ("Statement ::= while ( Expression ) Statement", While),
    ("Statement ::= do Statement while ( Expression ) ;", Do),
    ("Statement ::= for ( ForInitopt ; Expressionopt ; ForUpdateopt ) Statement", For),
    ("Statement ::= for ( Type Identifier : Expression ) Statement", ForEach { modifiers: false }),
    ("Statement ::= for ( Modifiers Type Identifier : Expression ) Statement", ForEach { modifiers: true }),
    ("Statement ::= return Expressionopt ;", Return),
    ("Statement ::= throw Expression ;", Throw),
    ("Statement ::= break ;", Break { label: false }),
    ("Statement ::= break Identifier ;", Break { label: true }),
    ("Statement ::= continue ;", Continue { label: false }),
    ("Statement ::= continue Identifier ;", Continue { label: true }),
    ("Statement ::= try Block Catches", Try { finally: false }),
    ("Statement ::= try Block Catchesopt Finally", Try { finally: true }),
    ("Statement ::= assert Expression ;", Assert { message: false }),
    ("Statement ::= assert Expression : Expression ;", Assert { message: true }),
    ("Catchesopt ::=", EmptyAstList),
    ("Catchesopt ::= Catches", NoAction),
    ("Catches ::= CatchClause", NoAction),
    ("Catches ::= Catches CatchClause", ConcatAst),
    ("CatchClause ::= catch ( FormalParameter ) Block", CatchClause),
    ("Finally ::= finally Block", NoAction),
    ("ForInitopt ::=", EmptyAstList),
    ("ForInitopt ::= LocalVariableDeclaration", NoAction),
    ("ForInitopt ::= StatementExpressionList", ForInitExpressions),
    ("ForUpdateopt ::=", EmptyExpressionList),
    ("ForUpdateopt ::= StatementExpressionList", NoAction),
    ("StatementExpressionList ::= StatementExpression", NoAction),
    ("StatementExpressionList ::= StatementExpressionList , StatementExpression", ConcatExpressions),
    ("Expressionopt ::=", EmptyExpressionList),
    ("Expressionopt ::= Expression", NoAction),
    ("StatementExpression ::= Assignment", NoAction),
    ("StatementExpression ::= PreIncrementExpression", NoAction),
    ("StatementExpression ::= PreDecrementExpression", NoAction),
    ("StatementExpression ::= PostIncrementExpression", NoAction),
    ("StatementExpression ::= PostDecrementExpression", NoAction),
    ("StatementExpression ::= MethodInvocation", NoAction),
    ("StatementExpression ::= ClassInstanceCreationExpression", NoAction),
    ("ExplicitConstructorInvocation ::= this ( ArgumentListopt ) ;", ExplicitConstructorCall { is_super: false }),
    ("ExplicitConstructorInvocation ::= super ( ArgumentListopt ) ;", ExplicitConstructorCall { is_super: true }),
    // Expressions
    ("Primary ::= Literal", NoAction),
    ("Primary ::= this", This),
    ("Primary ::= ( Expression )", Parenthesized),
    ("Primary ::= ClassInstanceCreationExpression", NoAction),
    ("Primary ::= FieldAccess", NoAction),
    ("Primary ::= MethodInvocation", NoAction),
    ("Literal ::= IntegerLiteral", NoAction),
    ("Literal ::= LongLiteral", NoAction),
    ("Literal ::= FloatingPointLiteral", NoAction),
    ("Literal ::= DoubleLiteral", NoAction),
    ("Literal ::= CharacterLiteral", NoAction),
    ("Literal ::= StringLiteral", NoAction),
    ("Literal ::= true", NoAction),
    ("Literal ::= false", NoAction),
    ("Literal ::= null", NoAction),
    ("ClassInstanceCreationExpression ::= new ClassType ( ArgumentListopt )", Allocation),
    ("ArgumentListopt ::=", EmptyExpressionList),
    ("ArgumentListopt ::= ArgumentList", NoAction),
    ("ArgumentList ::= Expression", NoAction),
    ("ArgumentList ::= ArgumentList , Expression", ConcatExpressions),
    ("FieldAccess ::= Primary . Identifier", FieldAccess { is_super: false }),
    ("FieldAccess ::= super . Identifier", FieldAccess { is_super: true }),
    ("MethodInvocation ::= Name ( ArgumentListopt )", MethodInvocationName),
    ("MethodInvocation ::= Primary . Identifier ( ArgumentListopt )", MethodInvocationPrimary),
    ("MethodInvocation ::= super . Identifier ( ArgumentListopt )", MethodInvocationSuper),
    ("PostfixExpression ::= Primary", NoAction),
    ("PostfixExpression ::= Name", NameExpression),
    ("PostfixExpression ::= PostIncrementExpression", NoAction),
    ("PostfixExpression ::= PostDecrementExpression", NoAction),
    ("PostIncrementExpression ::= PostfixExpression ++", Postfix(UnaryOperator::PostIncrement)),
    ("PostDecrementExpression ::= PostfixExpression --", Postfix(UnaryOperator::PostDecrement)),
    ("UnaryExpression ::= PreIncrementExpression", NoAction),
    ("UnaryExpression ::= PreDecrementExpression", NoAction),
    ("UnaryExpression ::= + UnaryExpression", Unary(UnaryOperator::Plus)),
    ("UnaryExpression ::= - UnaryExpression", Unary(UnaryOperator::Minus)),
    ("UnaryExpression ::= UnaryExpressionNotPlusMinus", NoAction),
    ("PreIncrementExpression ::= ++ UnaryExpression", Unary(UnaryOperator::PreIncrement)),
    ("PreDecrementExpression ::= -- UnaryExpression", Unary(UnaryOperator::PreDecrement)),
    ("UnaryExpressionNotPlusMinus ::= PostfixExpression", NoAction),
    ("UnaryExpressionNotPlusMinus ::= ~ UnaryExpression", Unary(UnaryOperator::Complement)),
    ("UnaryExpressionNotPlusMinus ::= ! UnaryExpression", Unary(UnaryOperator::Not)),
    ("MultiplicativeExpression ::= UnaryExpression", NoAction),
    ("MultiplicativeExpression ::= MultiplicativeExpression * UnaryExpression", Binary(BinaryOperator::Mul)),
    ("MultiplicativeExpression ::= MultiplicativeExpression / UnaryExpression", Binary(BinaryOperator::Div)),
    ("MultiplicativeExpression ::= MultiplicativeExpression % UnaryExpression", Binary(BinaryOperator::Rem)),
    ("AdditiveExpression ::= MultiplicativeExpression", NoAction),
    ("AdditiveExpression ::= AdditiveExpression + MultiplicativeExpression", Binary(BinaryOperator::Add)),
    ("AdditiveExpression ::= AdditiveExpression - MultiplicativeExpression", Binary(BinaryOperator::Sub)),
    ("ShiftExpression ::= AdditiveExpression", NoAction),
    ("ShiftExpression ::= ShiftExpression << AdditiveExpression", Binary(BinaryOperator::LShift)),
    ("ShiftExpression ::= ShiftExpression >> AdditiveExpression", Binary(BinaryOperator::RShift)),
    ("ShiftExpression ::= ShiftExpression >>> AdditiveExpression", Binary(BinaryOperator::URShift)),
    ("RelationalExpression ::= ShiftExpression", NoAction),
    ("RelationalExpression ::= RelationalExpression < ShiftExpression", Binary(BinaryOperator::Lt)),
    ("RelationalExpression ::= RelationalExpression > ShiftExpression", Binary(BinaryOperator::Gt)),
    ("RelationalExpression ::= RelationalExpression <= ShiftExpression", Binary(BinaryOperator::Le)),
    ("RelationalExpression ::= RelationalExpression >= ShiftExpression", Binary(BinaryOperator::Ge)),
    ("RelationalExpression ::= RelationalExpression instanceof ReferenceType", InstanceOf),
    ("EqualityExpression ::= RelationalExpression", NoAction),
    ("EqualityExpression ::= EqualityExpression == RelationalExpression", Binary(BinaryOperator::Eq)),
    ("EqualityExpression ::= EqualityExpression != RelationalExpression", Binary(BinaryOperator::Ne)),
    ("AndExpression ::= EqualityExpression", NoAction),
    ("AndExpression ::= AndExpression & EqualityExpression", Binary(BinaryOperator::And)),
    ("ExclusiveOrExpression ::= AndExpression", NoAction),
    ("ExclusiveOrExpression ::= ExclusiveOrExpression ^ AndExpression", Binary(BinaryOperator::Xor)),
    ("InclusiveOrExpression ::= ExclusiveOrExpression", NoAction),
    ("InclusiveOrExpression ::= InclusiveOrExpression | ExclusiveOrExpression", Binary(BinaryOperator::Or)),
    ("ConditionalAndExpression ::= InclusiveOrExpression", NoAction),
    (
        "ConditionalAndExpression ::= ConditionalAndExpression && InclusiveOrExpression",
        Binary(BinaryOperator::AndAnd),
    ),
    ("ConditionalOrExpression ::= ConditionalAndExpression", NoAction),
    (
        "ConditionalOrExpression ::= ConditionalOrExpression || ConditionalAndExpression",
        Binary(BinaryOperator::OrOr),
    ),
    ("ConditionalExpression ::= ConditionalOrExpression", NoAction),
    ("ConditionalExpression ::= ConditionalOrExpression ? Expression : ConditionalExpression", Conditional),
    ("AssignmentExpression ::= ConditionalExpression", NoAction),
    ("AssignmentExpression ::= Assignment", NoAction),
    ("Assignment ::= LeftHandSide AssignmentOperator AssignmentExpression", Assignment),
    ("LeftHandSide ::= Name", NameExpression),
    ("LeftHandSide ::= FieldAccess", NoAction),
    ("AssignmentOperator ::= =", AssignmentOperator(None)),
    ("AssignmentOperator ::= *=", AssignmentOperator(Some(BinaryOperator::Mul))),
    ("AssignmentOperator ::= /=", AssignmentOperator(Some(BinaryOperator::Div))),
    ("AssignmentOperator ::= %=", AssignmentOperator(Some(BinaryOperator::Rem))),
    ("AssignmentOperator ::= +=", AssignmentOperator(Some(BinaryOperator::Add))),
    ("AssignmentOperator ::= -=", AssignmentOperator(Some(BinaryOperator::Sub))),
    ("AssignmentOperator ::= <<=", AssignmentOperator(Some(BinaryOperator::LShift))),
    ("AssignmentOperator ::= >>=", AssignmentOperator(Some(BinaryOperator::RShift))),
    ("AssignmentOperator ::= >>>=", AssignmentOperator(Some(BinaryOperator::URShift))),
    ("AssignmentOperator ::= &=", AssignmentOperator(Some(BinaryOperator::And))),
    ("AssignmentOperator ::= ^=", AssignmentOperator(Some(BinaryOperator::Xor))),
    ("AssignmentOperator ::= |=", AssignmentOperator(Some(BinaryOperator::Or))),
    ("Expression ::= AssignmentExpression", NoAction),
    // Aspects
    ("AspectDeclaration ::= AspectHeader ClassBody", NoAction),
    (
        "AspectHeader ::= AspectHeaderName ClassHeaderExtendsopt ClassHeaderImplementsopt AspectHeaderRestopt",
        NoAction,
    ),
    ("AspectHeaderName ::= Modifiersopt aspect Identifier", AspectHeaderName { privileged: false, type_parameters: false }),
    (
        "AspectHeaderName ::= Modifiersopt aspect Identifier TypeParameters",
        AspectHeaderName { privileged: false, type_parameters: true },
    ),
    (
        "AspectHeaderName ::= Modifiersopt privileged Modifiersopt aspect Identifier",
        AspectHeaderName { privileged: true, type_parameters: false },
    ),
    (
        "AspectHeaderName ::= Modifiersopt privileged Modifiersopt aspect Identifier TypeParameters",
        AspectHeaderName { privileged: true, type_parameters: true },
    ),
    ("AspectHeaderRestopt ::=", NoAction),
    ("AspectHeaderRestopt ::= AspectHeaderRest", NoAction),
    ("AspectHeaderRest ::= AspectHeaderRestStart", AspectHeaderRest),
    ("AspectHeaderRest ::= AspectHeaderRestStart PseudoTokens", AspectHeaderRest),
    ("AspectHeaderRestStart ::= Identifier", PseudoTokenIdentifier),
    // Pointcuts
    ("PointcutDeclaration ::= PointcutHeader FormalParameterListopt ) ;", PointcutDeclaration { designator: false }),
    (
        "PointcutDeclaration ::= PointcutHeader FormalParameterListopt ) : PseudoTokens ;",
        PointcutDeclaration { designator: true },
    ),
    ("PointcutHeader ::= Modifiersopt pointcut Identifier (", PointcutHeader),
    // Advice
    ("AdviceDeclaration ::= AroundHeader MethodBody", MethodDeclaration),
    ("AdviceDeclaration ::= BasicAdviceHeader MethodBody", MethodDeclaration),
    (
        "AroundHeader ::= AroundHeaderName FormalParameterListopt ) MethodHeaderThrowsClauseopt : PseudoTokens",
        AdviceHeader { extra_parameter: false },
    ),
    ("AroundHeaderName ::= Modifiersopt Type around (", AroundHeaderName { return_type: true }),
    ("AroundHeaderName ::= Modifiersopt around (", AroundHeaderName { return_type: false }),
    (
        "BasicAdviceHeader ::= BasicAdviceHeaderName FormalParameterListopt ) ExtraParamopt MethodHeaderThrowsClauseopt : PseudoTokens",
        AdviceHeader { extra_parameter: true },
    ),
    ("BasicAdviceHeaderName ::= Modifiersopt before (", BasicAdviceHeaderName { after: false }),
    ("BasicAdviceHeaderName ::= Modifiersopt after (", BasicAdviceHeaderName { after: true }),
    ("ExtraParamopt ::=", EmptyAstList),
    ("ExtraParamopt ::= Identifier", ExtraParameter { formal: false }),
    ("ExtraParamopt ::= Identifier ( )", ExtraParameter { formal: false }),
    ("ExtraParamopt ::= Identifier ( FormalParameter )", ExtraParameter { formal: true }),
    // Declare
    ("DeclareDeclaration ::= DeclareHeader PseudoTokens ;", DeclareDeclaration),
    ("DeclareHeader ::= declare Identifier :", DeclareHeader),
    (
        "DeclareAnnotationDeclaration ::= DeclareAnnotationHeader PseudoTokensNoColon : Annotation ;",
        DeclareAnnotation(' '),
    ),
    (
        "DeclareAnnotationDeclaration ::= DeclareAnnotationHeader PseudoTokensNoColon : + Annotation ;",
        DeclareAnnotation('+'),
    ),
    (
        "DeclareAnnotationDeclaration ::= DeclareAnnotationHeader PseudoTokensNoColon : - Annotation ;",
        DeclareAnnotation('-'),
    ),
    ("DeclareAnnotationHeader ::= declare @ Identifier :", DeclareAnnotationHeader),
    // Inter-type declarations
    ("InterTypeFieldDeclaration ::= InterTypeFieldHeader InterTypeFieldBody ;", InterTypeFieldDeclaration),
    ("InterTypeFieldHeader ::= Modifiersopt Type OnType . Identifier", InterTypeFieldHeader(TypePatternUse::Plain)),
    (
        "InterTypeFieldHeader ::= Modifiersopt Type OnType . * . Identifier",
        InterTypeFieldHeader(TypePatternUse::StarSegment),
    ),
    ("InterTypeFieldHeader ::= Modifiersopt Type OnType . *", InterTypeFieldHeader(TypePatternUse::StarOnly)),
    ("InterTypeFieldHeader ::= Modifiersopt Type OnType + . Identifier", InterTypeFieldHeader(TypePatternUse::Plus)),
    ("InterTypeFieldBody ::=", InterTypeFieldBody { initializer: false }),
    ("InterTypeFieldBody ::= = VariableInitializer", InterTypeFieldBody { initializer: true }),
    ("InterTypeMethodDeclaration ::= InterTypeMethodHeader MethodBody", MethodDeclaration),
    (
        "InterTypeMethodHeader ::= InterTypeMethodHeaderName FormalParameterListopt ) MethodHeaderThrowsClauseopt",
        MethodHeader,
    ),
    (
        "InterTypeMethodHeaderName ::= Modifiersopt Type OnType . Identifier (",
        InterTypeMethodHeaderName(TypePatternUse::Plain),
    ),
    (
        "InterTypeMethodHeaderName ::= Modifiersopt Type OnType . * . Identifier (",
        InterTypeMethodHeaderName(TypePatternUse::StarSegment),
    ),
    (
        "InterTypeMethodHeaderName ::= Modifiersopt Type OnType + . Identifier (",
        InterTypeMethodHeaderName(TypePatternUse::Plus),
    ),
    ("InterTypeConstructorDeclaration ::= InterTypeConstructorHeader MethodBody", MethodDeclaration),
    (
        "InterTypeConstructorHeader ::= InterTypeConstructorHeaderName FormalParameterListopt ) MethodHeaderThrowsClauseopt",
        MethodHeader,
    ),
    ("InterTypeConstructorHeaderName ::= Modifiersopt Name . new (", InterTypeConstructorHeaderName { plus: false }),
    ("InterTypeConstructorHeaderName ::= Modifiersopt Name + . new (", InterTypeConstructorHeaderName { plus: true }),
    ("InterTypeClassDeclaration ::= InterTypeClassHeader ClassBody", NoAction),
    ("InterTypeClassHeader ::= InterTypeClassHeaderName ClassHeaderExtendsopt ClassHeaderImplementsopt", NoAction),
    ("InterTypeClassHeaderName ::= Modifiersopt class OnType . Identifier", InterTypeClassHeaderName),
    ("OnType ::= Identifier", NoAction),
    ("OnType ::= OnType . Identifier", ConcatIdentifiers),
    // Pseudo tokens
    ("PseudoTokens ::= PseudoToken", NoAction),
    ("PseudoTokens ::= PseudoTokens PseudoToken", ConcatAst),
    ("PseudoTokensNoColon ::= PseudoTokenNoColon", NoAction),
    ("PseudoTokensNoColon ::= PseudoTokensNoColon PseudoTokenNoColon", ConcatAst),
    ("PseudoToken ::= PseudoTokenNoColon", NoAction),
    ("PseudoToken ::= :", PseudoToken(":", false)),
    ("PseudoTokenNoColon ::= JavaIdentifier", PseudoTokenIdentifier),
    ("PseudoTokenNoColon ::= (", PseudoToken("(", false)),
    ("PseudoTokenNoColon ::= )", PseudoToken(")", false)),
    ("PseudoTokenNoColon ::= .", PseudoToken(".", false)),
    ("PseudoTokenNoColon ::= *", PseudoToken("*", false)),
    ("PseudoTokenNoColon ::= +", PseudoToken("+", false)),
    ("PseudoTokenNoColon ::= =", PseudoToken("=", false)),
    ("PseudoTokenNoColon ::= &&", PseudoToken("&&", false)),
    ("PseudoTokenNoColon ::= ||", PseudoToken("||", false)),
    ("PseudoTokenNoColon ::= !", PseudoToken("!", false)),
    ("PseudoTokenNoColon ::= ,", PseudoToken(",", false)),
    ("PseudoTokenNoColon ::= [", PseudoToken("[", false)),
    ("PseudoTokenNoColon ::= ]", PseudoToken("]", false)),
    ("PseudoTokenNoColon ::= @", PseudoToken("@", false)),
    ("PseudoTokenNoColon ::= ...", PseudoToken("...", false)),
    ("PseudoTokenNoColon ::= ?", PseudoToken("?", false)),
    ("PseudoTokenNoColon ::= <", PseudoToken("<", false)),
    ("PseudoTokenNoColon ::= >", PseudoToken(">", false)),
    ("PseudoTokenNoColon ::= >>", PseudoToken(">>", false)),
    ("PseudoTokenNoColon ::= >>>", PseudoToken(">>>", false)),
    ("PseudoTokenNoColon ::= &", PseudoToken("&", false)),
    ("PseudoTokenNoColon ::= !=", PseudoToken("!=", false)),
    ("PseudoTokenNoColon ::= PrimitiveType", PseudoTokenPrimitiveType),
    ("PseudoTokenNoColon ::= ModifierKeyword", PseudoTokenModifier),
    ("PseudoTokenNoColon ::= Literal", PseudoTokenLiteral),
    ("PseudoTokenNoColon ::= this", PseudoToken("this", false)),
    ("PseudoTokenNoColon ::= super", PseudoToken("super", false)),
    ("PseudoTokenNoColon ::= class", PseudoToken("class", false)),
    ("PseudoTokenNoColon ::= interface", PseudoToken("interface", false)),
    ("PseudoTokenNoColon ::= new", PseudoToken("new", false)),
    ("PseudoTokenNoColon ::= extends", PseudoToken("extends", false)),
    ("PseudoTokenNoColon ::= implements", PseudoToken("implements", false)),
    ("PseudoTokenNoColon ::= throws", PseudoToken("throws", false)),
    ("PseudoTokenNoColon ::= instanceof", PseudoToken("instanceof", false)),
    ("PseudoTokenNoColon ::= import", PseudoToken("import", false)),
    ("PseudoTokenNoColon ::= package", PseudoToken("package", false)),
    ("PseudoTokenNoColon ::= assert", PseudoToken("assert", false)),
    ("PseudoTokenNoColon ::= throw", PseudoToken("throw", false)),
    ("PseudoTokenNoColon ::= do", PseudoToken("do", false)),
    ("PseudoTokenNoColon ::= for", PseudoToken("for", false)),
    ("PseudoTokenNoColon ::= switch", PseudoToken("switch", false)),
    ("PseudoTokenNoColon ::= try", PseudoToken("try", false)),
    ("PseudoTokenNoColon ::= while", PseudoToken("while", false)),
    ("PseudoTokenNoColon ::= break", PseudoToken("break", false)),
    ("PseudoTokenNoColon ::= continue", PseudoToken("continue", false)),
    ("PseudoTokenNoColon ::= return", PseudoToken("return", false)),
    ("PseudoTokenNoColon ::= case", PseudoToken("case", false)),
    ("PseudoTokenNoColon ::= catch", PseudoToken("catch", false)),
    ("PseudoTokenNoColon ::= else", PseudoToken("else", false)),
    ("PseudoTokenNoColon ::= finally", PseudoToken("finally", false)),
    ("PseudoTokenNoColon ::= if ( Expression )", PseudoTokenIf),
    ("JavaIdentifier ::= Identifier", NoAction),
    ("JavaIdentifier ::= aspect", NoAction),
    ("JavaIdentifier ::= privileged", NoAction),
    ("JavaIdentifier ::= pointcut", NoAction),
    ("JavaIdentifier ::= before", NoAction),
    ("JavaIdentifier ::= after", NoAction),
    ("JavaIdentifier ::= around", NoAction),
    ("JavaIdentifier ::= declare", NoAction),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    Terminal(TokenKind),
    NonTerminal(usize),
}

#[derive(Debug, Clone)]
pub struct Production {
    pub lhs: usize,
    pub rhs: Vec<Symbol>,
    pub act: Act,
    pub text: &'static str,
}

/// The parsed rule set.
#[derive(Debug)]
pub struct Grammar {
    pub productions: Vec<Production>,
    pub nonterminals: Vec<&'static str>,
    ids: HashMap<&'static str, usize>,
}

impl Grammar {
    /// Parse rule texts into productions.
    pub fn from_rules(rules: &[(&'static str, Act)]) -> ParseResult<Grammar> {
        let mut split = Vec::with_capacity(rules.len());
        let mut nonterminals = Vec::new();
        let mut ids = HashMap::new();
        for (text, act) in rules {
            let (lhs, rhs) = text
                .split_once("::=")
                .ok_or_else(|| ParseError::Grammar(format!("rule without \"::=\": {}", text)))?;
            let lhs = lhs.trim();
            if lhs.is_empty() {
                return Err(ParseError::Grammar(format!("rule without left-hand side: {}", text)));
            }
            if !ids.contains_key(lhs) {
                ids.insert(lhs, nonterminals.len());
                nonterminals.push(lhs);
            }
            split.push((lhs, rhs, *act, *text));
        }

        let mut productions = Vec::with_capacity(split.len());
        for (lhs, rhs, act, text) in split {
            let mut symbols = Vec::new();
            for name in rhs.split_whitespace() {
                let symbol = if let Some(&id) = ids.get(name) {
                    Symbol::NonTerminal(id)
                } else if let Some(kind) = TokenKind::from_grammar_name(name) {
                    Symbol::Terminal(kind)
                } else {
                    return Err(ParseError::Grammar(format!("unknown symbol {:?} in rule: {}", name, text)));
                };
                symbols.push(symbol);
            }
            productions.push(Production {
                lhs: ids[lhs],
                rhs: symbols,
                act,
                text,
            });
        }

        Ok(Grammar {
            productions,
            nonterminals,
            ids,
        })
    }

    pub fn nonterminal(&self, name: &str) -> Option<usize> {
        self.ids.get(name).copied()
    }

    pub fn nonterminal_name(&self, id: usize) -> &'static str {
        self.nonterminals.get(id).copied().unwrap_or("?")
    }

    pub fn production(&self, index: usize) -> ParseResult<&Production> {
        self.productions
            .get(index)
            .ok_or_else(|| ParseError::CorruptTable { detail: format!("no production {}", index) })
    }

    pub fn symbol_name(&self, symbol: Symbol) -> &'static str {
        match symbol {
            Symbol::Terminal(kind) => kind.grammar_name(),
            Symbol::NonTerminal(id) => self.nonterminal_name(id),
        }
    }
}

static GRAMMAR: OnceCell<Result<Grammar, ParseError>> = OnceCell::new();

/// The process-wide grammar, parsed on first use.
pub fn grammar() -> ParseResult<&'static Grammar> {
    GRAMMAR
        .get_or_init(|| Grammar::from_rules(RULES))
        .as_ref()
        .map_err(Clone::clone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_rules_parse() {
        let grammar = grammar().expect("grammar");
        assert_eq!(grammar.productions.len(), RULES.len());
        assert_eq!(grammar.nonterminal_name(grammar.productions[0].lhs), "Goal");
    }

    #[test]
    fn test_every_nonterminal_is_reachable() {
        let grammar = grammar().expect("grammar");
        let mut reached = HashSet::new();
        let mut work = vec![0usize];
        while let Some(nt) = work.pop() {
            if !reached.insert(nt) {
                continue;
            }
            for production in grammar.productions.iter().filter(|p| p.lhs == nt) {
                for symbol in &production.rhs {
                    if let Symbol::NonTerminal(id) = symbol {
                        work.push(*id);
                    }
                }
            }
        }
        let unreached: Vec<_> = (0..grammar.nonterminals.len())
            .filter(|id| !reached.contains(id))
            .map(|id| grammar.nonterminal_name(id))
            .collect();
        assert!(unreached.is_empty(), "unreachable: {:?}", unreached);
    }

    #[test]
    fn test_unknown_symbol_is_rejected() {
        let err = Grammar::from_rules(&[("Goal ::= Nope", NoAction)]).unwrap_err();
        assert!(matches!(err, ParseError::Grammar(_)));
    }

    #[test]
    fn test_dialect_actions_are_flagged() {
        assert!(PointcutHeader.is_dialect());
        assert!(!MethodHeader.is_dialect());
    }
}
