use logos::Logos;
use std::fmt;

use super::span::Span;

/// Terminal symbols of the language, including the dialect pseudo keywords.
///
/// Pseudo keywords (`aspect`, `pointcut`, `before`, ...) are always lexed as
/// their own kinds, whether or not a dialect is wired in, so the base grammar
/// never desynchronizes on them.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TokenKind {
    // Keywords
    #[token("abstract")]
    Abstract,
    #[token("assert")]
    Assert,
    #[token("boolean")]
    Boolean,
    #[token("break")]
    Break,
    #[token("byte")]
    Byte,
    #[token("case")]
    Case,
    #[token("catch")]
    Catch,
    #[token("char")]
    Char,
    #[token("class")]
    Class,
    #[token("continue")]
    Continue,
    #[token("default")]
    Default,
    #[token("do")]
    Do,
    #[token("double")]
    Double,
    #[token("else")]
    Else,
    #[token("extends")]
    Extends,
    #[token("final")]
    Final,
    #[token("finally")]
    Finally,
    #[token("float")]
    Float,
    #[token("for")]
    For,
    #[token("if")]
    If,
    #[token("implements")]
    Implements,
    #[token("import")]
    Import,
    #[token("instanceof")]
    InstanceOf,
    #[token("int")]
    Int,
    #[token("interface")]
    Interface,
    #[token("long")]
    Long,
    #[token("native")]
    Native,
    #[token("new")]
    New,
    #[token("package")]
    Package,
    #[token("private")]
    Private,
    #[token("protected")]
    Protected,
    #[token("public")]
    Public,
    #[token("return")]
    Return,
    #[token("short")]
    Short,
    #[token("static")]
    Static,
    #[token("strictfp")]
    Strictfp,
    #[token("super")]
    Super,
    #[token("switch")]
    Switch,
    #[token("synchronized")]
    Synchronized,
    #[token("this")]
    This,
    #[token("throw")]
    Throw,
    #[token("throws")]
    Throws,
    #[token("transient")]
    Transient,
    #[token("try")]
    Try,
    #[token("void")]
    Void,
    #[token("volatile")]
    Volatile,
    #[token("while")]
    While,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Dialect pseudo keywords
    #[token("aspect")]
    Aspect,
    #[token("privileged")]
    Privileged,
    #[token("pointcut")]
    Pointcut,
    #[token("before")]
    Before,
    #[token("after")]
    After,
    #[token("around")]
    Around,
    #[token("declare")]
    Declare,

    // Operators
    #[token("=")]
    Assign,
    #[token("+=")]
    AddAssign,
    #[token("-=")]
    SubAssign,
    #[token("*=")]
    MulAssign,
    #[token("/=")]
    DivAssign,
    #[token("%=")]
    ModAssign,
    #[token("&=")]
    AndAssign,
    #[token("|=")]
    OrAssign,
    #[token("^=")]
    XorAssign,
    #[token("<<=")]
    LShiftAssign,
    #[token(">>=")]
    RShiftAssign,
    #[token(">>>=")]
    URShiftAssign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("++")]
    Inc,
    #[token("--")]
    Dec,
    #[token("!")]
    Bang,
    #[token("~")]
    Tilde,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("<<")]
    LShift,
    #[token(">>")]
    RShift,
    #[token(">>>")]
    URShift,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    PipePipe,
    #[token("==")]
    Eq,
    #[token("!=")]
    Ne,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,

    // Separators
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("@")]
    At,
    #[token("...")]
    Ellipsis,

    // Literals
    #[regex(r"[0-9][0-9_]*")]
    #[regex(r"0[xX][0-9a-fA-F_]+")]
    #[regex(r"0[bB][01_]+")]
    IntegerLiteral,
    #[regex(r"[0-9][0-9_]*[lL]")]
    #[regex(r"0[xX][0-9a-fA-F_]+[lL]")]
    #[regex(r"0[bB][01_]+[lL]")]
    LongLiteral,
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?[fF]")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?[fF]")]
    #[regex(r"[0-9]+([eE][+-]?[0-9]+)?[fF]")]
    FloatingPointLiteral,
    #[regex(r"[0-9]+\.[0-9]*([eE][+-]?[0-9]+)?[dD]?")]
    #[regex(r"\.[0-9]+([eE][+-]?[0-9]+)?[dD]?")]
    #[regex(r"[0-9]+[eE][+-]?[0-9]+[dD]?")]
    #[regex(r"[0-9]+[dD]")]
    DoubleLiteral,
    #[regex(r"'([^'\\]|\\u[0-9a-fA-F]{4}|\\.)'")]
    CharacterLiteral,
    #[regex(r#""([^"\\]|\\u[0-9a-fA-F]{4}|\\.)*""#)]
    StringLiteral,

    // Identifiers
    #[regex(r"[a-zA-Z_$][a-zA-Z0-9_$]*")]
    Identifier,

    // Comments and whitespace
    #[regex(r"//[^\n]*")]
    LineComment,
    #[regex(r"/\*[^*]*\*+([^/*][^*]*\*+)*/", priority = 2)]
    BlockComment,
    #[regex(r"[ \t\n\r\x0C]+", priority = 2)]
    Whitespace,
    #[token("\u{FEFF}")]
    Bom,

    /// End of input. Never produced by the scanner itself.
    Eof,
}

impl TokenKind {
    /// Every terminal the grammar may mention, in table column order.
    pub const ALL: &'static [TokenKind] = &[
        TokenKind::Abstract, TokenKind::Assert, TokenKind::Boolean, TokenKind::Break,
        TokenKind::Byte, TokenKind::Case, TokenKind::Catch, TokenKind::Char, TokenKind::Class,
        TokenKind::Continue, TokenKind::Default, TokenKind::Do, TokenKind::Double,
        TokenKind::Else, TokenKind::Extends, TokenKind::Final, TokenKind::Finally,
        TokenKind::Float, TokenKind::For, TokenKind::If, TokenKind::Implements,
        TokenKind::Import, TokenKind::InstanceOf, TokenKind::Int, TokenKind::Interface,
        TokenKind::Long, TokenKind::Native, TokenKind::New, TokenKind::Package,
        TokenKind::Private, TokenKind::Protected, TokenKind::Public, TokenKind::Return,
        TokenKind::Short, TokenKind::Static, TokenKind::Strictfp, TokenKind::Super,
        TokenKind::Switch, TokenKind::Synchronized, TokenKind::This, TokenKind::Throw,
        TokenKind::Throws, TokenKind::Transient, TokenKind::Try, TokenKind::Void,
        TokenKind::Volatile, TokenKind::While, TokenKind::True, TokenKind::False,
        TokenKind::Null,
        TokenKind::Aspect, TokenKind::Privileged, TokenKind::Pointcut, TokenKind::Before,
        TokenKind::After, TokenKind::Around, TokenKind::Declare,
        TokenKind::Assign, TokenKind::AddAssign, TokenKind::SubAssign, TokenKind::MulAssign,
        TokenKind::DivAssign, TokenKind::ModAssign, TokenKind::AndAssign, TokenKind::OrAssign,
        TokenKind::XorAssign, TokenKind::LShiftAssign, TokenKind::RShiftAssign,
        TokenKind::URShiftAssign, TokenKind::Plus, TokenKind::Minus, TokenKind::Star,
        TokenKind::Slash, TokenKind::Percent, TokenKind::Inc, TokenKind::Dec, TokenKind::Bang,
        TokenKind::Tilde, TokenKind::Amp, TokenKind::Pipe, TokenKind::Caret, TokenKind::LShift,
        TokenKind::RShift, TokenKind::URShift, TokenKind::AndAnd, TokenKind::PipePipe,
        TokenKind::Eq, TokenKind::Ne, TokenKind::Lt, TokenKind::Le, TokenKind::Gt, TokenKind::Ge,
        TokenKind::Question, TokenKind::Colon,
        TokenKind::LParen, TokenKind::RParen, TokenKind::LBracket, TokenKind::RBracket,
        TokenKind::LBrace, TokenKind::RBrace, TokenKind::Semicolon, TokenKind::Comma,
        TokenKind::Dot, TokenKind::At, TokenKind::Ellipsis,
        TokenKind::IntegerLiteral, TokenKind::LongLiteral, TokenKind::FloatingPointLiteral,
        TokenKind::DoubleLiteral, TokenKind::CharacterLiteral, TokenKind::StringLiteral,
        TokenKind::Identifier,
        TokenKind::Eof,
    ];

    /// Fixed source text of keyword, operator and separator kinds.
    pub fn lexeme(self) -> Option<&'static str> {
        use TokenKind::*;
        let text = match self {
            Abstract => "abstract", Assert => "assert", Boolean => "boolean", Break => "break",
            Byte => "byte", Case => "case", Catch => "catch", Char => "char", Class => "class",
            Continue => "continue", Default => "default", Do => "do", Double => "double",
            Else => "else", Extends => "extends", Final => "final", Finally => "finally",
            Float => "float", For => "for", If => "if", Implements => "implements",
            Import => "import", InstanceOf => "instanceof", Int => "int",
            Interface => "interface", Long => "long", Native => "native", New => "new",
            Package => "package", Private => "private", Protected => "protected",
            Public => "public", Return => "return", Short => "short", Static => "static",
            Strictfp => "strictfp", Super => "super", Switch => "switch",
            Synchronized => "synchronized", This => "this", Throw => "throw",
            Throws => "throws", Transient => "transient", Try => "try", Void => "void",
            Volatile => "volatile", While => "while", True => "true", False => "false",
            Null => "null",
            Aspect => "aspect", Privileged => "privileged", Pointcut => "pointcut",
            Before => "before", After => "after", Around => "around", Declare => "declare",
            Assign => "=", AddAssign => "+=", SubAssign => "-=", MulAssign => "*=",
            DivAssign => "/=", ModAssign => "%=", AndAssign => "&=", OrAssign => "|=",
            XorAssign => "^=", LShiftAssign => "<<=", RShiftAssign => ">>=",
            URShiftAssign => ">>>=", Plus => "+", Minus => "-", Star => "*", Slash => "/",
            Percent => "%", Inc => "++", Dec => "--", Bang => "!", Tilde => "~", Amp => "&",
            Pipe => "|", Caret => "^", LShift => "<<", RShift => ">>", URShift => ">>>",
            AndAnd => "&&", PipePipe => "||", Eq => "==", Ne => "!=", Lt => "<", Le => "<=",
            Gt => ">", Ge => ">=", Question => "?", Colon => ":",
            LParen => "(", RParen => ")", LBracket => "[", RBracket => "]", LBrace => "{",
            RBrace => "}", Semicolon => ";", Comma => ",", Dot => ".", At => "@",
            Ellipsis => "...",
            _ => return None,
        };
        Some(text)
    }

    /// Name used for this terminal in grammar rules.
    pub fn grammar_name(self) -> &'static str {
        if let Some(text) = self.lexeme() {
            return text;
        }
        match self {
            TokenKind::IntegerLiteral => "IntegerLiteral",
            TokenKind::LongLiteral => "LongLiteral",
            TokenKind::FloatingPointLiteral => "FloatingPointLiteral",
            TokenKind::DoubleLiteral => "DoubleLiteral",
            TokenKind::CharacterLiteral => "CharacterLiteral",
            TokenKind::StringLiteral => "StringLiteral",
            TokenKind::Identifier => "Identifier",
            TokenKind::LineComment => "LineComment",
            TokenKind::BlockComment => "BlockComment",
            TokenKind::Whitespace => "Whitespace",
            TokenKind::Bom => "Bom",
            _ => "EOF",
        }
    }

    /// Look a terminal up by its grammar name.
    pub fn from_grammar_name(name: &str) -> Option<TokenKind> {
        TokenKind::ALL.iter().copied().find(|kind| kind.grammar_name() == name)
    }

    /// Check if this token is trivia the parser never sees
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Bom | TokenKind::LineComment | TokenKind::BlockComment)
    }

    /// Check if this token is one of the dialect pseudo keywords
    pub fn is_pseudo_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::Aspect
                | TokenKind::Privileged
                | TokenKind::Pointcut
                | TokenKind::Before
                | TokenKind::After
                | TokenKind::Around
                | TokenKind::Declare
        )
    }

    /// Check if this token is a literal
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::IntegerLiteral
                | TokenKind::LongLiteral
                | TokenKind::FloatingPointLiteral
                | TokenKind::DoubleLiteral
                | TokenKind::CharacterLiteral
                | TokenKind::StringLiteral
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
        )
    }

    /// Check if this token is a modifier keyword
    pub fn is_modifier(self) -> bool {
        matches!(
            self,
            TokenKind::Public
                | TokenKind::Private
                | TokenKind::Protected
                | TokenKind::Static
                | TokenKind::Final
                | TokenKind::Abstract
                | TokenKind::Native
                | TokenKind::Synchronized
                | TokenKind::Transient
                | TokenKind::Volatile
                | TokenKind::Strictfp
                | TokenKind::Default
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.grammar_name())
    }
}

/// A classified token with its source span and text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub text: String,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span, text: impl Into<String>) -> Self {
        Self { kind, span, text: text.into() }
    }

    /// End-of-input marker placed just past the last byte.
    pub fn eof(offset: usize) -> Self {
        Self::new(TokenKind::Eof, Span::at(offset), "")
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

/// A character sequence the scanner could not classify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub span: Span,
    pub text: String,
}

/// The parser's only view of its input: classified tokens with positions.
pub trait TokenStream {
    /// Next significant token, `None` at end of input.
    fn next_token(&mut self) -> Option<Result<Token, LexError>>;

    /// Offset used for the end-of-input token.
    fn end_offset(&self) -> usize;
}

/// Scanner over source text, backed by `logos`.
pub struct Lexer<'a> {
    lexer: logos::Lexer<'a, TokenKind>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            lexer: TokenKind::lexer(source),
        }
    }

    /// Get the next token, trivia included
    pub fn next_raw(&mut self) -> Option<Result<Token, LexError>> {
        let kind = self.lexer.next()?;
        let range = self.lexer.span();
        let text = self.lexer.slice();
        let span = Span::of_len(range.start, range.end - range.start);
        match kind {
            Ok(kind) => Some(Ok(Token::new(kind, span, text))),
            Err(_) => Some(Err(LexError { span, text: text.to_string() })),
        }
    }

    /// Get all significant tokens from the source, stopping at the first error
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        while let Some(result) = self.next_token() {
            tokens.push(result?);
        }
        Ok(tokens)
    }
}

impl<'a> TokenStream for Lexer<'a> {
    fn next_token(&mut self) -> Option<Result<Token, LexError>> {
        loop {
            match self.next_raw()? {
                Ok(token) if token.kind.is_trivia() => continue,
                other => return Some(other),
            }
        }
    }

    fn end_offset(&self) -> usize {
        self.lexer.source().len()
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// Tokens classified elsewhere, replayed in order.
#[derive(Debug, Clone)]
pub struct VecTokenStream {
    tokens: std::vec::IntoIter<Token>,
    end: usize,
}

impl VecTokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        let end = tokens.last().map(|t| t.span.end + 1).unwrap_or(0);
        Self { tokens: tokens.into_iter(), end }
    }
}

impl TokenStream for VecTokenStream {
    fn next_token(&mut self) -> Option<Result<Token, LexError>> {
        self.tokens.by_ref().find(|t| !t.kind.is_trivia() && t.kind != TokenKind::Eof).map(Ok)
    }

    fn end_offset(&self) -> usize {
        self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .expect("Failed to tokenize")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_lexer_keywords() {
        assert_eq!(
            kinds("public class Test extends Object implements Interface"),
            vec![
                TokenKind::Public,
                TokenKind::Class,
                TokenKind::Identifier,
                TokenKind::Extends,
                TokenKind::Identifier,
                TokenKind::Implements,
                TokenKind::Identifier,
            ]
        );
    }

    #[test]
    fn test_lexer_pseudo_keywords() {
        let tokens = kinds("privileged aspect A { pointcut p(); before(): p() {} declare around after }");
        assert!(tokens.contains(&TokenKind::Privileged));
        assert!(tokens.contains(&TokenKind::Aspect));
        assert!(tokens.contains(&TokenKind::Pointcut));
        assert!(tokens.contains(&TokenKind::Before));
        assert!(tokens.contains(&TokenKind::Declare));
        assert!(tokens.contains(&TokenKind::Around));
        assert!(tokens.contains(&TokenKind::After));
        // an identifier that merely starts like a keyword
        assert_eq!(kinds("aspects"), vec![TokenKind::Identifier]);
    }

    #[test]
    fn test_lexer_literals() {
        assert_eq!(
            kinds(r#"42 42L 1.5 1.5f 'a' "hello" true null"#),
            vec![
                TokenKind::IntegerLiteral,
                TokenKind::LongLiteral,
                TokenKind::DoubleLiteral,
                TokenKind::FloatingPointLiteral,
                TokenKind::CharacterLiteral,
                TokenKind::StringLiteral,
                TokenKind::True,
                TokenKind::Null,
            ]
        );
    }

    #[test]
    fn test_lexer_pointcut_dots() {
        assert_eq!(
            kinds("call(* *(..))"),
            vec![
                TokenKind::Identifier,
                TokenKind::LParen,
                TokenKind::Star,
                TokenKind::Star,
                TokenKind::LParen,
                TokenKind::Dot,
                TokenKind::Dot,
                TokenKind::RParen,
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn test_lexer_spans_are_inclusive() {
        let tokens = Lexer::new("int  foo;").tokenize().expect("Failed to tokenize");
        assert_eq!(tokens[0].span, Span::new(0, 2));
        assert_eq!(tokens[1].span, Span::new(5, 7));
        assert_eq!(tokens[1].text, "foo");
        assert_eq!(tokens[2].span, Span::new(8, 8));
    }

    #[test]
    fn test_lexer_comments() {
        assert!(kinds("// This is a comment\n/* This is a block comment */").is_empty());
    }

    #[test]
    fn test_grammar_names_round_trip() {
        for kind in TokenKind::ALL {
            assert_eq!(TokenKind::from_grammar_name(kind.grammar_name()), Some(*kind));
        }
    }

    #[test]
    fn test_invalid_character() {
        let mut lexer = Lexer::new("int # x");
        assert!(matches!(lexer.next_token(), Some(Ok(_))));
        let err = lexer.next_token().expect("token").expect_err("lex error");
        assert_eq!(err.span, Span::at(4));
    }
}
