//! Typed value stacks of the shift-reduce parser.
//!
//! Each grouped stack pairs its items with a length companion: every push
//! records how many items the grammar symbol contributed, so a reduction can
//! take back exactly its own entries with [`GroupedStack::pop_group`]. The
//! stacks are cleared, not reallocated, between compilation units.

use std::fmt;

use super::error::{ParseError, ParseResult};
use super::span::Span;
use crate::ast::{AstNode, Expression, TypeParameter, TypeReference, Wildcard};

/// Items plus grouping lengths.
pub struct GroupedStack<T> {
    name: &'static str,
    items: Vec<T>,
    lengths: Vec<usize>,
    production: usize,
}

impl<T> GroupedStack<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            items: Vec::with_capacity(64),
            lengths: Vec::with_capacity(64),
            production: 0,
        }
    }

    fn underflow(&self) -> ParseError {
        ParseError::underflow(self.name, self.production)
    }

    /// Push one item as its own group.
    pub fn push(&mut self, item: T) {
        self.items.push(item);
        self.lengths.push(1);
    }

    /// Push several items as one group.
    pub fn push_group(&mut self, items: Vec<T>) {
        self.lengths.push(items.len());
        self.items.extend(items);
    }

    /// Push a group length without items; `0` marks an empty list.
    pub fn push_group_len(&mut self, len: usize) {
        self.lengths.push(len);
    }

    /// Merge the two topmost groups into one.
    pub fn concat(&mut self) -> ParseResult<()> {
        let top = self.lengths.pop().ok_or_else(|| self.underflow())?;
        let below = self.lengths.last_mut().ok_or_else(|| ParseError::underflow(self.name, self.production))?;
        *below += top;
        Ok(())
    }

    /// Pop a group that must hold exactly one item.
    pub fn pop(&mut self) -> ParseResult<T> {
        let len = self.lengths.pop().ok_or_else(|| self.underflow())?;
        if len != 1 {
            return Err(ParseError::ArityMismatch {
                production: self.production,
                expected: 1,
                found: len,
            });
        }
        self.items.pop().ok_or_else(|| self.underflow())
    }

    /// Pop the topmost group, in push order.
    pub fn pop_group(&mut self) -> ParseResult<Vec<T>> {
        let len = self.lengths.pop().ok_or_else(|| self.underflow())?;
        if len > self.items.len() {
            return Err(self.underflow());
        }
        let at = self.items.len() - len;
        Ok(self.items.split_off(at))
    }

    /// Pop the topmost group if it holds one item, `None` if it is empty.
    pub fn pop_optional(&mut self) -> ParseResult<Option<T>> {
        let mut group = self.pop_group()?;
        match group.len() {
            0 => Ok(None),
            1 => Ok(group.pop()),
            found => Err(ParseError::ArityMismatch {
                production: self.production,
                expected: 1,
                found,
            }),
        }
    }

    pub fn peek(&self) -> ParseResult<&T> {
        self.items.last().ok_or_else(|| self.underflow())
    }

    pub fn peek_mut(&mut self) -> ParseResult<&mut T> {
        let production = self.production;
        let name = self.name;
        self.items.last_mut().ok_or(ParseError::StackUnderflow { stack: name, production })
    }

    pub fn top_group_len(&self) -> Option<usize> {
        self.lengths.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Take every item, leaving the stack empty.
    pub fn drain_all(&mut self) -> Vec<T> {
        self.lengths.clear();
        std::mem::take(&mut self.items)
    }

    pub fn depth(&self) -> usize {
        self.items.len()
    }

    pub fn group_depth(&self) -> usize {
        self.lengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.lengths.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.lengths.clear();
    }

    pub(crate) fn set_production(&mut self, production: usize) {
        self.production = production;
    }
}

impl<T: fmt::Debug> fmt::Debug for GroupedStack<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct(self.name)
            .field("items", &self.items.len())
            .field("lengths", &self.lengths)
            .finish()
    }
}

/// Scratch integers: modifier flags, start offsets, dimension counts.
#[derive(Debug)]
pub struct IntStack {
    items: Vec<usize>,
    production: usize,
}

impl IntStack {
    pub fn new() -> Self {
        Self {
            items: Vec::with_capacity(64),
            production: 0,
        }
    }

    pub fn push(&mut self, value: usize) {
        self.items.push(value);
    }

    pub fn pop(&mut self) -> ParseResult<usize> {
        self.items.pop().ok_or(ParseError::StackUnderflow {
            stack: "int",
            production: self.production,
        })
    }

    pub fn peek_mut(&mut self) -> ParseResult<&mut usize> {
        let production = self.production;
        self.items.last_mut().ok_or(ParseError::StackUnderflow { stack: "int", production })
    }

    pub fn depth(&self) -> usize {
        self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl Default for IntStack {
    fn default() -> Self {
        Self::new()
    }
}

/// A pending identifier token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    pub name: String,
    pub span: Span,
}

/// Entries of the generics stack: types are materialised here as soon as
/// they are reduced, type parameters and wildcards wait here for their list.
#[derive(Debug, Clone, PartialEq)]
pub enum GenericsNode {
    Type(TypeReference),
    Wildcard(Wildcard),
    Parameter(TypeParameter),
}

/// Depth of every stack, for balance checks and debug traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StackDepths {
    pub ast: usize,
    pub ast_groups: usize,
    pub expressions: usize,
    pub expression_groups: usize,
    pub identifiers: usize,
    pub identifier_groups: usize,
    pub ints: usize,
    pub generics: usize,
    pub generics_groups: usize,
}

impl StackDepths {
    pub fn is_zero(&self) -> bool {
        *self == StackDepths::default()
    }
}

impl fmt::Display for StackDepths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ast {}/{} expr {}/{} ident {}/{} int {} generics {}/{}",
            self.ast,
            self.ast_groups,
            self.expressions,
            self.expression_groups,
            self.identifiers,
            self.identifier_groups,
            self.ints,
            self.generics,
            self.generics_groups
        )
    }
}

/// Every value stack the parser keeps in lock-step with its state stack.
#[derive(Debug)]
pub struct ParseStacks {
    pub ast: GroupedStack<AstNode>,
    pub expressions: GroupedStack<Expression>,
    pub identifiers: GroupedStack<Identifier>,
    pub ints: IntStack,
    pub generics: GroupedStack<GenericsNode>,
}

impl ParseStacks {
    pub fn new() -> Self {
        Self {
            ast: GroupedStack::new("ast"),
            expressions: GroupedStack::new("expression"),
            identifiers: GroupedStack::new("identifier"),
            ints: IntStack::new(),
            generics: GroupedStack::new("generics"),
        }
    }

    /// Tag underflow errors with the production being reduced.
    pub fn begin(&mut self, production: usize) {
        self.ast.set_production(production);
        self.expressions.set_production(production);
        self.identifiers.set_production(production);
        self.ints.production = production;
        self.generics.set_production(production);
    }

    pub fn reset(&mut self) {
        self.ast.clear();
        self.expressions.clear();
        self.identifiers.clear();
        self.ints.clear();
        self.generics.clear();
    }

    pub fn depths(&self) -> StackDepths {
        StackDepths {
            ast: self.ast.depth(),
            ast_groups: self.ast.group_depth(),
            expressions: self.expressions.depth(),
            expression_groups: self.expressions.group_depth(),
            identifiers: self.identifiers.depth(),
            identifier_groups: self.identifiers.group_depth(),
            ints: self.ints.depth(),
            generics: self.generics.depth(),
            generics_groups: self.generics.group_depth(),
        }
    }
}

impl Default for ParseStacks {
    fn default() -> Self {
        Self::new()
    }
}
