//! ajfront
//!
//! Compiler front end for a Java-like language extended with aspects,
//! pointcuts, advice and inter-type declarations.
//!
//! ## Architecture
//!
//! - **parser**: token stream, generated LALR(1) tables, typed value stacks,
//!   semantic actions and error recovery
//! - **factory**: the injected declaration factory dialect constructs are built through
//! - **aspect**: the aspect dialect's factory, payloads and pointcut parsing
//! - **ast**: the tree every phase works on
//! - **flow**: definite assignment, reachability and exception inference
//! - **binding**: resolved bindings and their structural equality
//! - **driver**: batch compilation with adapter hooks
//!
//! ## Compilation Flow
//!
//! ```text
//! Source → Lexer → Parser (+ DeclarationFactory) → AST → Flow → Bindings
//!                     ↓
//!               Recovery / diagnostics
//! ```

pub mod aspect;
pub mod ast;
pub mod binding;
pub mod common;
pub mod driver;
pub mod factory;
pub mod flow;
pub mod parser;

pub use common::{Config, Error, Result};
pub use driver::{CompiledUnit, Compiler, CompilerAdapter, SourceUnit, UnitReport};
pub use factory::{DeclarationFactory, Dialect};
pub use parser::{parse, Diagnostic, ParseOutcome, Parser, ProblemId, Severity};

/// Parse and flow-analyze one source text with the configured dialect.
pub fn check_source(source: &str, config: &Config) -> Result<CompiledUnit> {
    let compiler = Compiler::from_config(config.clone());
    let mut compilation = compiler.compile(&[SourceUnit::new("<source>", source)]);
    match compilation.units.pop() {
        Some(report) => report.result,
        None => Err(Error::internal("driver returned no unit")),
    }
}
