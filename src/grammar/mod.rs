/*
    This module is for storing grammars
*/

use std::collections::HashMap;

use thiserror::Error;

// Marks an alternative that derives the empty string
pub const EPSILON: char = 'ε';

pub const DEFAULT_MAX_NONTERMINALS: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonterminalId(usize);

impl NonterminalId {
    pub fn index(self) -> usize {
        self.0
    }
}

// The base unit in a grammar rule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    Terminal(char),
    Nonterminal(NonterminalId),
}

// The symbols in a single alternative. May be empty.
pub type Production = Vec<Symbol>;

#[derive(Debug, PartialEq)]
pub struct Nonterminal {
    name: String,
    productions: Vec<Production>,
}

impl Nonterminal {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    // A nonterminal that was only ever referenced has no rules and never matches
    pub fn is_defined(&self) -> bool {
        !self.productions.is_empty()
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum GrammarError {
    #[error("Too many nonterminals (the limit is {0})")]
    TooManyNonterminals(usize),
    #[error("No start symbol was given")]
    MissingStartSymbol,
    #[error("Start symbol `{0}` has no rules")]
    UndefinedStartSymbol(String),
}

/// An immutable context-free grammar.
///
/// Nonterminals are stored in the order they were first mentioned, either
/// on the left of a rule or inside an alternative.
#[derive(Debug, PartialEq)]
pub struct Grammar {
    nonterminals: Vec<Nonterminal>,
    index: HashMap<String, NonterminalId>,
    start: NonterminalId,
}

impl Grammar {
    pub fn start(&self) -> NonterminalId {
        self.start
    }

    pub fn nonterminal(&self, id: NonterminalId) -> &Nonterminal {
        &self.nonterminals[id.0]
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = (NonterminalId, &Nonterminal)> {
        self.nonterminals
            .iter()
            .enumerate()
            .map(|(i, nonterminal)| (NonterminalId(i), nonterminal))
    }

    pub fn len(&self) -> usize {
        self.nonterminals.len()
    }

    pub fn lookup(&self, name: &str) -> Option<NonterminalId> {
        self.index.get(name).copied()
    }

    // Finds a nonterminal that can start a derivation
    pub fn defined(&self, name: &str) -> Result<NonterminalId, GrammarError> {
        self.lookup(name)
            .filter(|&id| self.nonterminal(id).is_defined())
            .ok_or_else(|| GrammarError::UndefinedStartSymbol(name.to_string()))
    }
}

pub struct GrammarBuilder {
    nonterminals: Vec<Nonterminal>,
    index: HashMap<String, NonterminalId>,
    start: Option<String>,
    max_nonterminals: usize,
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_NONTERMINALS)
    }
}

impl GrammarBuilder {
    pub fn new(max_nonterminals: usize) -> Self {
        GrammarBuilder {
            nonterminals: Vec::new(),
            index: HashMap::new(),
            start: None,
            max_nonterminals,
        }
    }

    /// Returns the id of `name`, creating a nonterminal without rules if it
    /// is new.
    pub fn define_nonterminal(&mut self, name: &str) -> Result<NonterminalId, GrammarError> {
        if let Some(&id) = self.index.get(name) {
            return Ok(id);
        }
        if self.nonterminals.len() >= self.max_nonterminals {
            return Err(GrammarError::TooManyNonterminals(self.max_nonterminals));
        }

        let id = NonterminalId(self.nonterminals.len());
        self.nonterminals.push(Nonterminal {
            name: name.to_string(),
            productions: Vec::new(),
        });
        self.index.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn add_production(&mut self, lhs: &str, symbols: Production) -> Result<NonterminalId, GrammarError> {
        let id = self.define_nonterminal(lhs)?;
        self.nonterminals[id.0].productions.push(symbols);
        Ok(id)
    }

    pub fn set_start_symbol(&mut self, name: &str) {
        self.start = Some(name.to_string());
    }

    pub fn build(self) -> Result<Grammar, GrammarError> {
        let name = self.start.ok_or(GrammarError::MissingStartSymbol)?;
        let grammar = Grammar {
            nonterminals: self.nonterminals,
            index: self.index,
            start: NonterminalId(0),
        };
        let start = grammar.defined(&name)?;

        Ok(Grammar { start, ..grammar })
    }
}
