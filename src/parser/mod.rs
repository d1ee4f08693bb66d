//! Parser module
//!
//! Lexing, the generated LALR automaton, the typed value stacks, the
//! semantic actions for the base language and its aspect dialect, and error
//! recovery. [`parse`] is the one-call entry point; hold on to a [`Parser`]
//! to reuse its stacks across units.

pub mod diagnostics;
pub mod error;
pub mod grammar;
pub mod lexer;
pub mod parser;
pub mod recovery;
pub mod span;
pub mod stacks;
pub mod tables;

mod actions;
mod dialect_actions;

pub use diagnostics::{Diagnostic, ProblemId, ProblemReporter, Severity};
pub use error::{ParseError, ParseResult};
pub use lexer::{Lexer, Token, TokenKind, TokenStream, VecTokenStream};
pub use parser::{ParseOutcome, Parser};
pub use recovery::RecoveryState;
pub use span::{LineMap, Location, Span};
pub use stacks::StackDepths;

use crate::common::config::Config;
use crate::factory::Dialect;

/// Parse one compilation unit from source text with a fresh parser.
pub fn parse(source: &str, config: Config, dialect: Dialect) -> ParseResult<ParseOutcome> {
    let mut parser = Parser::new(config, dialect)?;
    parser.parse_source(source)
}

/// Parse one compilation unit from an already classified token stream.
pub fn parse_tokens(stream: &mut dyn TokenStream, config: Config, dialect: Dialect) -> ParseResult<ParseOutcome> {
    let mut parser = Parser::new(config, dialect)?;
    parser.parse_tokens(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_class() {
        let source = r#"
package com.example;

public class HelloWorld {
    public static void main(String[] args) {
        System.out.println("Hello, World!");
    }
}
"#;
        let outcome = parse(source, Config::default(), Dialect::Disabled).expect("Failed to parse");
        assert!(outcome.diagnostics.is_empty(), "{:?}", outcome.diagnostics);
        assert_eq!(outcome.unit.types.len(), 1);
        assert_eq!(outcome.unit.types[0].name, "HelloWorld");
    }

    #[test]
    fn test_parse_with_imports() {
        let source = r#"
package com.example;

import java.util.List;
import java.util.ArrayList;
import static java.util.Collections.*;

public class TestClass {
    private List<String> items = new ArrayList<String>();
}
"#;
        let outcome = parse(source, Config::default(), Dialect::Disabled).expect("Failed to parse");
        assert_eq!(outcome.unit.imports.len(), 3);
        assert!(outcome.unit.imports[2].is_static);
        assert!(outcome.unit.imports[2].on_demand);
    }

    #[test]
    fn test_parse_from_token_stream() {
        let tokens = Lexer::new("class A { }").tokenize().expect("tokens");
        let mut stream = VecTokenStream::new(tokens);
        let outcome = parse_tokens(&mut stream, Config::default(), Dialect::Disabled).expect("parse");
        assert_eq!(outcome.unit.types[0].name, "A");
    }
}
