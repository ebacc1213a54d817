/*
    This module parses grammar files
*/

mod lexer;
mod verifier;

use std::fs::File;
use std::io::BufRead;
use std::path::Path;

use crate::grammar::*;
use crate::error_handling::*;
use itertools::Itertools;
use lexer::*;
use thiserror::Error;
use verifier::verify_rules;

#[derive(Error, Debug)]
pub enum CompileErrorType {
    // The file has no significant lines at all
    #[error("Grammar is empty (expected the start symbol on the first line)")]
    EmptyGrammar,
    // The first significant line should name the start symbol
    #[error("Expected the start symbol, found a rule")]
    StartLineIsRule,
    // A rule line has nothing to the left of `->`
    #[error("Expected a nonterminal before `->`")]
    MissingNonterminal,
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    // There was an issue with reading a file
    #[error("File error: {0}")]
    FileError(std::io::Error),
}

impl ErrorType for CompileErrorType {}

impl PartialEq for CompileErrorType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (CompileErrorType::FileError(a), CompileErrorType::FileError(b)) => a.kind() == b.kind(),
            (CompileErrorType::Grammar(a), CompileErrorType::Grammar(b)) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

pub type CompileError = Error<CompileErrorType>;
pub type CompileErrors = Errors<CompileErrorType>;

pub fn io_error(error: std::io::Error, file: &Path) -> CompileError {
    CompileError {
        location: Location::file(file),
        error: CompileErrorType::FileError(error)
    }
}

pub type Result<T> = std::result::Result<T, CompileErrorType>;
pub type LineResult<T> = std::result::Result<T, CompileError>;
pub type FileResult<T> = std::result::Result<T, CompileErrors>;

#[derive(Debug, Clone)]
pub struct ParseOptions {
    pub max_nonterminals: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            max_nonterminals: DEFAULT_MAX_NONTERMINALS,
        }
    }
}

// A symbol before its nonterminal name is resolved against the grammar
#[derive(PartialEq, Debug, Clone)]
enum RuleSymbol {
    Terminal(char),
    Nonterminal(String),
}

type Alternative = Vec<RuleSymbol>;
type Rewrite = Vec<Alternative>;

#[derive(PartialEq, Debug)]
struct Rule {
    symbol: String,
    rewrite: Rewrite,
    location: Location
}

fn parse_alternative(tokens: &[Token]) -> Alternative {
    // A lone epsilon marker is the empty alternative, anywhere else it is a
    // plain terminal
    if let [Token::Terminal(EPSILON)] = tokens {
        return Vec::new();
    }

    tokens.iter().filter_map(|t| match t {
        Token::Or => None,
        Token::Nonterminal(s) => Some(RuleSymbol::Nonterminal(s.clone())),
        Token::Terminal(c) => Some(RuleSymbol::Terminal(*c))
    }).collect()
}

fn parse_rewrite(tokens: &[Token]) -> Rewrite {
    tokens.split(|t| *t == Token::Or).map(parse_alternative).collect()
}

// Lines without an arrow are not rules and give `None`
fn parse_line(line: &str, location: Location) -> Result<Option<Rule>> {
    let Some((lhs, rhs)) = line.split_once("->") else {
        return Ok(None);
    };

    let symbol = lhs.trim();
    if symbol.is_empty() {
        return Err(CompileErrorType::MissingNonterminal);
    }

    let rewrite = parse_rewrite(&lex_rewrite(rhs));

    Ok(Some(Rule {
        symbol: symbol.to_string(),
        rewrite,
        location
    }))
}

fn parse_rule_line(line: &str, location: Location) -> Option<LineResult<Rule>> {
    let parsed = parse_line(line, location.clone())
        .map_err(|error| CompileError { location: location.clone(), error })
        .transpose();

    if parsed.is_none() {
        log::warn!("{}: ignoring line without `->`: {}", location, line);
    }
    parsed
}

fn is_rule_line(line: &str) -> bool {
    !line.is_empty() && !line.starts_with('#')
}

// Returns an iterator over the trimmed significant lines of a reader, with
// the io errors wrapped in CompileError and numbered from 1
fn significant_lines(reader: impl BufRead, path: &Path) -> impl Iterator<Item = (usize, LineResult<String>)> {
    let path = path.to_path_buf();
    reader
        .lines()
        .map(move |line| line.map(|l| l.trim().to_string()).map_err(|e| io_error(e, &path)))
        .enumerate()
        .filter(|(_, line)| line.as_ref().map_or(true, |l| is_rule_line(l)))
        .map(|(num, line)| (num + 1, line))
}

fn add_rule(builder: &mut GrammarBuilder, rule: &Rule) -> std::result::Result<(), GrammarError> {
    // The left side gets its id before anything it references
    builder.define_nonterminal(&rule.symbol)?;

    for alternative in &rule.rewrite {
        let symbols = alternative.iter().map(|symbol| match symbol {
            RuleSymbol::Terminal(c) => Ok(Symbol::Terminal(*c)),
            RuleSymbol::Nonterminal(name) => builder.define_nonterminal(name).map(Symbol::Nonterminal)
        }).collect::<std::result::Result<Production, _>>()?;

        builder.add_production(&rule.symbol, symbols)?;
    }

    Ok(())
}

fn grammar_from_rules(start_symbol: &str, start_location: Location, rules: Vec<Rule>, options: &ParseOptions) -> FileResult<Grammar> {
    verify_rules(start_symbol, &start_location, &rules)?;

    let mut builder = GrammarBuilder::new(options.max_nonterminals);
    builder.set_start_symbol(start_symbol);

    for rule in &rules {
        // Running out of room is reported once, for the rule that overflowed
        add_rule(&mut builder, rule).map_err(|error| vec![CompileError {
            location: rule.location.clone(),
            error: error.into()
        }])?;
    }

    let grammar = builder.build().map_err(|error| vec![CompileError {
        location: start_location,
        error: error.into()
    }])?;

    log::debug!(
        "loaded {} rules over {} nonterminals, starting at `{}`",
        rules.len(),
        grammar.len(),
        start_symbol
    );
    Ok(grammar)
}

/// Reads a grammar: the first significant line names the start symbol, every
/// following one is a rule `Lhs -> alt | alt ...`.
///
/// All malformed rule lines are reported together.
pub fn parse_reader(reader: impl BufRead, path: &Path, options: &ParseOptions) -> FileResult<Grammar> {
    let mut lines = significant_lines(reader, path);

    let (start_line, start_symbol) = match lines.next() {
        Some((num, Ok(line))) => (num, line),
        Some((_, Err(error))) => return Err(vec![error]),
        None => return Err(vec![CompileError {
            location: Location::file(path),
            error: CompileErrorType::EmptyGrammar
        }])
    };

    let start_location = Location::line(path, start_line);
    if start_symbol.contains("->") {
        return Err(vec![CompileError {
            location: start_location,
            error: CompileErrorType::StartLineIsRule
        }]);
    }

    let (rules, errors): (Vec<_>, Vec<_>) = lines
        .take_while_inclusive(|(_, line)| line.is_ok())
        .filter_map(|(num, line)| match line {
            Ok(text) => parse_rule_line(&text, Location::line(path, num)),
            Err(error) => Some(Err(error))
        })
        .partition_result();

    if !errors.is_empty() {
        return Err(errors);
    }

    grammar_from_rules(&start_symbol, start_location, rules, options)
}

pub fn parse_str(text: &str, options: &ParseOptions) -> FileResult<Grammar> {
    parse_reader(text.as_bytes(), Path::new("<string>"), options)
}

pub fn parse_file(path: &Path, options: &ParseOptions) -> FileResult<Grammar> {
    let file = File::open(path).map_err(|e| vec![io_error(e, path)])?;
    parse_reader(std::io::BufReader::new(file), path, options)
}
