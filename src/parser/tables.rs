//! LALR(1) action and goto tables.
//!
//! Built once per process from [`grammar()`]: LR(0) item sets first, then
//! lookaheads by spontaneous generation and propagation. Conflicts are
//! resolved in favour of shifting, and between two reductions in favour of
//! the lower production number.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use once_cell::sync::OnceCell;

use super::error::{ParseError, ParseResult};
use super::grammar::{grammar, Grammar, Symbol};
use super::lexer::TokenKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Error,
    Shift(usize),
    Reduce(usize),
    Accept,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TableStats {
    pub states: usize,
    pub productions: usize,
    pub terminals: usize,
    pub nonterminals: usize,
    pub shift_reduce: usize,
    pub reduce_reduce: usize,
}

impl fmt::Display for TableStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} states, {} productions, {} terminals, {} nonterminals, {} shift/reduce and {} reduce/reduce conflicts resolved",
            self.states, self.productions, self.terminals, self.nonterminals, self.shift_reduce, self.reduce_reduce
        )
    }
}

/// Fixed-width set of terminal columns plus one extra bit for the
/// propagation marker.
#[derive(Clone, PartialEq, Eq)]
struct TermSet(Vec<u64>);

impl TermSet {
    fn new(width: usize) -> Self {
        TermSet(vec![0; (width + 63) / 64])
    }

    fn insert(&mut self, bit: usize) -> bool {
        let (word, mask) = (bit / 64, 1u64 << (bit % 64));
        let fresh = self.0[word] & mask == 0;
        self.0[word] |= mask;
        fresh
    }

    fn union_with(&mut self, other: &TermSet) -> bool {
        let mut changed = false;
        for (mine, theirs) in self.0.iter_mut().zip(other.0.iter()) {
            let merged = *mine | *theirs;
            changed |= merged != *mine;
            *mine = merged;
        }
        changed
    }

    fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().enumerate().flat_map(|(word, &bits)| {
            (0..64usize)
                .filter(move |bit| bits & (1u64 << *bit) != 0)
                .map(move |bit| word * 64 + bit)
        })
    }
}

type Item = (usize, usize);

/// The automaton the parser interprets.
pub struct ParseTables {
    terminals: Vec<TokenKind>,
    columns: Vec<Option<usize>>,
    nonterminals: usize,
    actions: Vec<Action>,
    gotos: Vec<Option<usize>>,
    stats: TableStats,
}

impl fmt::Debug for ParseTables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseTables").field("stats", &self.stats).finish()
    }
}

impl ParseTables {
    pub fn stats(&self) -> TableStats {
        self.stats
    }

    pub fn state_count(&self) -> usize {
        self.stats.states
    }

    fn column(&self, kind: TokenKind) -> Option<usize> {
        self.columns.get(kind as usize).copied().flatten()
    }

    /// Action for `state` on lookahead `kind`; unknown kinds are errors.
    pub fn action(&self, state: usize, kind: TokenKind) -> Action {
        match self.column(kind) {
            Some(column) => self
                .actions
                .get(state * self.terminals.len() + column)
                .copied()
                .unwrap_or(Action::Error),
            None => Action::Error,
        }
    }

    pub fn goto(&self, state: usize, nonterminal: usize) -> ParseResult<usize> {
        self.gotos
            .get(state * self.nonterminals + nonterminal)
            .copied()
            .flatten()
            .ok_or_else(|| ParseError::CorruptTable {
                detail: format!("no goto from state {} on nonterminal {}", state, nonterminal),
            })
    }

    /// Terminals with a non-error action in `state`, in column order.
    pub fn expected(&self, state: usize) -> Vec<TokenKind> {
        self.terminals
            .iter()
            .copied()
            .filter(|kind| self.action(state, *kind) != Action::Error)
            .collect()
    }
}

struct Builder<'g> {
    grammar: &'g Grammar,
    terminals: Vec<TokenKind>,
    columns: Vec<Option<usize>>,
    by_lhs: Vec<Vec<usize>>,
    nullable: Vec<bool>,
    first: Vec<TermSet>,
    /// Column of the propagation marker in lookahead sets.
    marker: usize,
}

impl<'g> Builder<'g> {
    fn new(grammar: &'g Grammar) -> Self {
        let terminals: Vec<TokenKind> = TokenKind::ALL.to_vec();
        let mut columns = vec![None; TokenKind::Eof as usize + 1];
        for (column, kind) in terminals.iter().enumerate() {
            columns[*kind as usize] = Some(column);
        }
        let mut by_lhs = vec![Vec::new(); grammar.nonterminals.len()];
        for (index, production) in grammar.productions.iter().enumerate() {
            by_lhs[production.lhs].push(index);
        }
        let marker = terminals.len();
        let mut builder = Self {
            grammar,
            terminals,
            columns,
            by_lhs,
            nullable: Vec::new(),
            first: Vec::new(),
            marker,
        };
        builder.compute_first();
        builder
    }

    fn width(&self) -> usize {
        self.terminals.len() + 1
    }

    fn column(&self, kind: TokenKind) -> usize {
        self.columns[kind as usize].unwrap_or(self.marker)
    }

    fn compute_first(&mut self) {
        let grammar = self.grammar;
        let count = grammar.nonterminals.len();
        self.nullable = vec![false; count];
        self.first = vec![TermSet::new(self.width()); count];
        let mut changed = true;
        while changed {
            changed = false;
            for production in &grammar.productions {
                let mut all_nullable = true;
                for symbol in &production.rhs {
                    match *symbol {
                        Symbol::Terminal(kind) => {
                            let column = self.column(kind);
                            changed |= self.first[production.lhs].insert(column);
                            all_nullable = false;
                        }
                        Symbol::NonTerminal(id) => {
                            if id != production.lhs {
                                let other = self.first[id].clone();
                                changed |= self.first[production.lhs].union_with(&other);
                            }
                            if !self.nullable[id] {
                                all_nullable = false;
                            }
                        }
                    }
                    if !all_nullable {
                        break;
                    }
                }
                if all_nullable && !self.nullable[production.lhs] {
                    self.nullable[production.lhs] = true;
                    changed = true;
                }
            }
        }
    }

    /// FIRST of `symbols` followed by `tail`.
    fn first_of(&self, symbols: &[Symbol], tail: &TermSet) -> TermSet {
        let mut set = TermSet::new(self.width());
        for symbol in symbols {
            match *symbol {
                Symbol::Terminal(kind) => {
                    set.insert(self.column(kind));
                    return set;
                }
                Symbol::NonTerminal(id) => {
                    set.union_with(&self.first[id]);
                    if !self.nullable[id] {
                        return set;
                    }
                }
            }
        }
        set.union_with(tail);
        set
    }

    fn next_symbol(&self, (production, dot): Item) -> Option<Symbol> {
        self.grammar.productions[production].rhs.get(dot).copied()
    }

    fn symbol_key(&self, symbol: Symbol) -> usize {
        match symbol {
            Symbol::Terminal(kind) => self.column(kind),
            Symbol::NonTerminal(id) => self.width() + id,
        }
    }

    fn lr0_closure(&self, kernel: &[Item]) -> Vec<Item> {
        let mut items = kernel.to_vec();
        let mut added = vec![false; self.grammar.nonterminals.len()];
        let mut i = 0;
        while i < items.len() {
            if let Some(Symbol::NonTerminal(id)) = self.next_symbol(items[i]) {
                if !added[id] {
                    added[id] = true;
                    items.extend(self.by_lhs[id].iter().map(|p| (*p, 0)));
                }
            }
            i += 1;
        }
        items
    }

    fn lr1_closure(&self, seed: Vec<(Item, TermSet)>) -> Vec<(Item, TermSet)> {
        let mut index: HashMap<Item, usize> = HashMap::new();
        let mut items: Vec<(Item, TermSet)> = Vec::new();
        let mut work = Vec::new();
        for (item, set) in seed {
            match index.get(&item) {
                Some(&at) => {
                    items[at].1.union_with(&set);
                }
                None => {
                    index.insert(item, items.len());
                    work.push(items.len());
                    items.push((item, set));
                }
            }
        }
        while let Some(at) = work.pop() {
            let (production, dot) = items[at].0;
            let rhs = &self.grammar.productions[production].rhs;
            let id = match rhs.get(dot) {
                Some(Symbol::NonTerminal(id)) => *id,
                _ => continue,
            };
            let lookahead = self.first_of(&rhs[dot + 1..], &items[at].1);
            for &p in &self.by_lhs[id] {
                let item = (p, 0);
                match index.get(&item) {
                    Some(&existing) => {
                        if items[existing].1.union_with(&lookahead) {
                            work.push(existing);
                        }
                    }
                    None => {
                        index.insert(item, items.len());
                        work.push(items.len());
                        items.push((item, lookahead.clone()));
                    }
                }
            }
        }
        items
    }

    fn build(self) -> ParseResult<ParseTables> {
        if self.grammar.productions.is_empty() {
            return Err(ParseError::Grammar("no productions".to_string()));
        }

        // LR(0) item sets
        let mut kernels: Vec<Vec<Item>> = vec![vec![(0, 0)]];
        let mut state_of: HashMap<Vec<Item>, usize> = HashMap::new();
        state_of.insert(kernels[0].clone(), 0);
        let mut transitions: Vec<BTreeMap<usize, (Symbol, usize)>> = Vec::new();
        let mut s = 0;
        while s < kernels.len() {
            let closure = self.lr0_closure(&kernels[s]);
            let mut moves: BTreeMap<usize, (Symbol, Vec<Item>)> = BTreeMap::new();
            for item in closure {
                if let Some(symbol) = self.next_symbol(item) {
                    moves
                        .entry(self.symbol_key(symbol))
                        .or_insert_with(|| (symbol, Vec::new()))
                        .1
                        .push((item.0, item.1 + 1));
                }
            }
            let mut edges = BTreeMap::new();
            for (key, (symbol, mut kernel)) in moves {
                kernel.sort_unstable();
                kernel.dedup();
                let target = match state_of.get(&kernel) {
                    Some(&target) => target,
                    None => {
                        let target = kernels.len();
                        state_of.insert(kernel.clone(), target);
                        kernels.push(kernel);
                        target
                    }
                };
                edges.insert(key, (symbol, target));
            }
            transitions.push(edges);
            s += 1;
        }

        // Lookaheads
        let width = self.width();
        let mut lookaheads: Vec<Vec<TermSet>> =
            kernels.iter().map(|k| vec![TermSet::new(width); k.len()]).collect();
        lookaheads[0][0].insert(self.column(TokenKind::Eof));
        let mut propagate: Vec<Vec<Vec<(usize, usize)>>> =
            kernels.iter().map(|k| vec![Vec::new(); k.len()]).collect();

        for state in 0..kernels.len() {
            for (position, item) in kernels[state].iter().enumerate() {
                let mut probe = TermSet::new(width);
                probe.insert(self.marker);
                for ((production, dot), set) in self.lr1_closure(vec![(*item, probe)]) {
                    let symbol = match self.next_symbol((production, dot)) {
                        Some(symbol) => symbol,
                        None => continue,
                    };
                    let (_, target) = transitions[state][&self.symbol_key(symbol)];
                    let target_position = kernels[target]
                        .binary_search(&(production, dot + 1))
                        .map_err(|_| ParseError::Grammar(format!("lost kernel item in state {}", target)))?;
                    for bit in set.iter() {
                        if bit == self.marker {
                            propagate[state][position].push((target, target_position));
                        } else {
                            lookaheads[target][target_position].insert(bit);
                        }
                    }
                }
            }
        }

        let mut changed = true;
        while changed {
            changed = false;
            for state in 0..kernels.len() {
                for position in 0..kernels[state].len() {
                    if propagate[state][position].is_empty() {
                        continue;
                    }
                    let source = lookaheads[state][position].clone();
                    for &(target, target_position) in &propagate[state][position] {
                        changed |= lookaheads[target][target_position].union_with(&source);
                    }
                }
            }
        }

        // Tables
        let columns = self.terminals.len();
        let nonterminals = self.grammar.nonterminals.len();
        let eof = self.column(TokenKind::Eof);
        let mut actions = vec![Action::Error; kernels.len() * columns];
        let mut gotos = vec![None; kernels.len() * nonterminals];
        let mut stats = TableStats {
            states: kernels.len(),
            productions: self.grammar.productions.len(),
            terminals: columns,
            nonterminals,
            ..TableStats::default()
        };

        for state in 0..kernels.len() {
            for (symbol, target) in transitions[state].values() {
                match *symbol {
                    Symbol::Terminal(kind) => actions[state * columns + self.column(kind)] = Action::Shift(*target),
                    Symbol::NonTerminal(id) => gotos[state * nonterminals + id] = Some(*target),
                }
            }

            let seed = kernels[state]
                .iter()
                .copied()
                .zip(lookaheads[state].iter().cloned())
                .collect();
            for ((production, dot), set) in self.lr1_closure(seed) {
                if dot < self.grammar.productions[production].rhs.len() {
                    continue;
                }
                for column in set.iter().filter(|c| *c < columns) {
                    let slot = &mut actions[state * columns + column];
                    let proposed = if production == 0 && column == eof {
                        Action::Accept
                    } else {
                        Action::Reduce(production)
                    };
                    match *slot {
                        Action::Error => *slot = proposed,
                        Action::Shift(_) => {
                            stats.shift_reduce += 1;
                            log::debug!(
                                "state {}: shift/reduce conflict on {:?}, shifting over {:?}",
                                state,
                                self.terminals[column].grammar_name(),
                                self.grammar.productions[production].text
                            );
                        }
                        Action::Reduce(existing) if existing != production => {
                            stats.reduce_reduce += 1;
                            let keep = existing.min(production);
                            log::debug!(
                                "state {}: reduce/reduce conflict on {:?} between {:?} and {:?}, keeping {:?}",
                                state,
                                self.terminals[column].grammar_name(),
                                self.grammar.productions[existing].text,
                                self.grammar.productions[production].text,
                                self.grammar.productions[keep].text
                            );
                            *slot = Action::Reduce(keep);
                        }
                        Action::Reduce(_) | Action::Accept => {}
                    }
                }
            }
        }

        log::debug!("built LALR tables: {}", stats);
        Ok(ParseTables {
            terminals: self.terminals,
            columns: self.columns,
            nonterminals,
            actions,
            gotos,
            stats,
        })
    }
}

impl ParseTables {
    pub fn from_grammar(grammar: &Grammar) -> ParseResult<ParseTables> {
        Builder::new(grammar).build()
    }
}

static TABLES: OnceCell<Result<ParseTables, ParseError>> = OnceCell::new();

/// The process-wide tables, built on first use and read-only afterwards.
pub fn tables() -> ParseResult<&'static ParseTables> {
    TABLES
        .get_or_init(|| grammar().and_then(ParseTables::from_grammar))
        .as_ref()
        .map_err(Clone::clone)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::grammar::Act;

    fn toy() -> Grammar {
        Grammar::from_rules(&[
            ("Goal ::= E", Act::NoAction),
            ("E ::= E + T", Act::NoAction),
            ("E ::= T", Act::NoAction),
            ("T ::= ( E )", Act::NoAction),
            ("T ::= Identifier", Act::NoAction),
        ])
        .expect("toy grammar")
    }

    #[test]
    fn test_toy_grammar_has_no_conflicts() {
        let tables = ParseTables::from_grammar(&toy()).unwrap();
        let stats = tables.stats();
        assert_eq!(stats.shift_reduce, 0);
        assert_eq!(stats.reduce_reduce, 0);
        assert!(matches!(tables.action(0, TokenKind::Identifier), Action::Shift(_)));
        assert_eq!(tables.action(0, TokenKind::Plus), Action::Error);
    }

    #[test]
    fn test_dangling_else_prefers_shift() {
        let grammar = Grammar::from_rules(&[
            ("Goal ::= S", Act::NoAction),
            ("S ::= if S", Act::NoAction),
            ("S ::= if S else S", Act::NoAction),
            ("S ::= ;", Act::NoAction),
        ])
        .unwrap();
        let tables = ParseTables::from_grammar(&grammar).unwrap();
        assert_eq!(tables.stats().shift_reduce, 1);
    }

    #[test]
    fn test_language_tables_build() {
        let tables = tables().expect("tables");
        let stats = tables.stats();
        assert!(stats.states > 100);
        assert_eq!(stats.productions, crate::parser::grammar::RULES.len());
        assert!(tables.expected(0).contains(&TokenKind::Class));
        assert!(tables.expected(0).contains(&TokenKind::Aspect));
    }
}
