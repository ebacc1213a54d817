/*
    This module generates sentences
*/

use std::path::Path;

use rand::prelude::*;
use thiserror::Error;

use crate::grammar::*;
use crate::error_handling::*;

pub const DEFAULT_MAX_DEPTH: usize = 16;

#[derive(Error, Debug, PartialEq)]
pub enum GenerateErrorType {
    // A nonterminal without rules was used
    #[error("No definition for nonterminal `{0}`")]
    UndefinedNonterminal(String),
    // Every derivation of the nonterminal is infinite
    #[error("Nonterminal `{0}` never derives a finite sentence")]
    Unproductive(String),
}

impl ErrorType for GenerateErrorType {}

pub type GenerateError = Error<GenerateErrorType>;
pub type GenResult = Result<String, GenerateError>;

// Smallest derivation tree height of each nonterminal, `None` when it has no
// finite derivation at all
fn minimum_heights(grammar: &Grammar) -> Vec<Option<usize>> {
    let mut heights = vec![None; grammar.len()];

    let mut changed = true;
    while changed {
        changed = false;
        for (id, nonterminal) in grammar.nonterminals() {
            let best = nonterminal.productions()
                .iter()
                .filter_map(|production| production_height(production, &heights))
                .min();
            if let Some(best) = best {
                if heights[id.index()].map_or(true, |current| best < current) {
                    heights[id.index()] = Some(best);
                    changed = true;
                }
            }
        }
    }

    heights
}

fn production_height(production: &Production, heights: &[Option<usize>]) -> Option<usize> {
    production.iter().try_fold(1, |height, symbol| match symbol {
        Symbol::Terminal(_) => Some(height),
        Symbol::Nonterminal(id) => heights[id.index()].map(|child| height.max(child + 1)),
    })
}

struct Generator<'a, R: Rng> {
    grammar: &'a Grammar,
    heights: Vec<Option<usize>>,
    max_depth: usize,
    rng: &'a mut R,
    location: Location,
}

impl<R: Rng> Generator<'_, R> {
    fn error(&self, error: GenerateErrorType) -> GenerateError {
        GenerateError {
            location: self.location.clone(),
            error
        }
    }

    // Explains why no alternative of `nonterminal` can finish, preferring a
    // missing definition it refers to
    fn stuck(&self, nonterminal: &Nonterminal) -> GenerateErrorType {
        nonterminal.productions()
            .iter()
            .flatten()
            .find_map(|symbol| match *symbol {
                Symbol::Nonterminal(id) if !self.grammar.nonterminal(id).is_defined() => {
                    Some(GenerateErrorType::UndefinedNonterminal(self.grammar.nonterminal(id).name().to_string()))
                }
                _ => None
            })
            .unwrap_or_else(|| GenerateErrorType::Unproductive(nonterminal.name().to_string()))
    }

    fn generate_nonterminal(&mut self, id: NonterminalId, depth: usize, result: &mut String) -> Result<(), GenerateError> {
        let grammar = self.grammar;
        let nonterminal = grammar.nonterminal(id);
        if !nonterminal.is_defined() {
            return Err(self.error(GenerateErrorType::UndefinedNonterminal(nonterminal.name().to_string())));
        }

        // Alternatives that can finish at all, with their heights
        let productive = nonterminal.productions()
            .iter()
            .filter_map(|production| production_height(production, &self.heights).map(|height| (production, height)))
            .collect::<Vec<_>>();

        // Past the depth limit only the shallowest alternatives are allowed,
        // which strictly lowers the height still needed
        let candidates = if depth < self.max_depth {
            productive
        } else {
            let lowest = productive.iter().map(|&(_, height)| height).min();
            productive.into_iter().filter(|&(_, height)| Some(height) == lowest).collect()
        };

        let Some(&(production, _)) = candidates.choose(&mut *self.rng) else {
            return Err(self.error(self.stuck(nonterminal)));
        };

        for symbol in production {
            match *symbol {
                Symbol::Terminal(c) => result.push(c),
                Symbol::Nonterminal(child) => self.generate_nonterminal(child, depth + 1, result)?,
            }
        }

        Ok(())
    }
}

// Generates a sentence in the given grammar starting with the given symbol
pub fn generate(grammar: &Grammar, start: NonterminalId, max_depth: usize, rng: &mut impl Rng, file: &Path) -> GenResult {
    let mut generator = Generator {
        grammar,
        heights: minimum_heights(grammar),
        max_depth,
        rng,
        location: Location::file(file),
    };

    let mut result = String::new();
    generator.generate_nonterminal(start, 0, &mut result)?;
    Ok(result)
}
