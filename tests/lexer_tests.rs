use ajfront::parser::{Lexer, LineMap, Token, TokenKind, TokenStream, VecTokenStream};

fn kinds(source: &str) -> Vec<TokenKind> {
    Lexer::new(source)
        .tokenize()
        .expect("tokenize")
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

#[test]
fn test_dialect_keywords_are_tokens() {
    assert_eq!(
        kinds("aspect privileged pointcut before after around declare"),
        vec![
            TokenKind::Aspect,
            TokenKind::Privileged,
            TokenKind::Pointcut,
            TokenKind::Before,
            TokenKind::After,
            TokenKind::Around,
            TokenKind::Declare,
        ]
    );
}

#[test]
fn test_comments_and_whitespace_are_skipped() {
    assert_eq!(
        kinds("int /* block */ x; // line\n"),
        vec![TokenKind::Int, TokenKind::Identifier, TokenKind::Semicolon]
    );
}

#[test]
fn test_literals() {
    assert_eq!(
        kinds("1 2L 1.5f 2.0 'c' \"s\" true null"),
        vec![
            TokenKind::IntegerLiteral,
            TokenKind::LongLiteral,
            TokenKind::FloatingPointLiteral,
            TokenKind::DoubleLiteral,
            TokenKind::CharacterLiteral,
            TokenKind::StringLiteral,
            TokenKind::True,
            TokenKind::Null,
        ]
    );
}

#[test]
fn test_spans_are_inclusive() {
    let tokens = Lexer::new("class Foo").tokenize().expect("tokenize");
    assert_eq!((tokens[0].span.start, tokens[0].span.end), (0, 4));
    assert_eq!((tokens[1].span.start, tokens[1].span.end), (6, 8));
    assert_eq!(tokens[1].text, "Foo");
}

#[test]
fn test_invalid_character_is_an_error_not_an_abort() {
    let mut lexer = Lexer::new("a # b");
    let mut seen = Vec::new();
    while let Some(result) = lexer.next_token() {
        seen.push(result.map(|t| t.kind).map_err(|e| e.text));
    }
    assert_eq!(
        seen,
        vec![Ok(TokenKind::Identifier), Err("#".to_string()), Ok(TokenKind::Identifier)]
    );
}

#[test]
fn test_vec_stream_replays_tokens() {
    let tokens = vec![
        Token::new(TokenKind::Class, ajfront::parser::Span::new(0, 4), "class"),
        Token::new(TokenKind::Identifier, ajfront::parser::Span::new(6, 6), "A"),
    ];
    let mut stream = VecTokenStream::new(tokens);
    assert_eq!(stream.next_token().map(|t| t.map(|t| t.kind)), Some(Ok(TokenKind::Class)));
    assert_eq!(stream.next_token().map(|t| t.map(|t| t.kind)), Some(Ok(TokenKind::Identifier)));
    assert!(stream.next_token().is_none());
    assert_eq!(stream.end_offset(), 7);
}

#[test]
fn test_line_map() {
    let lines = LineMap::new("a\nbb\nccc");
    let location = lines.location(5);
    assert_eq!((location.line, location.column), (3, 1));
}
