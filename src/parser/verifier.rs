use std::collections::HashSet;

use crate::grammar::GrammarError;
use super::RuleSymbol::Nonterminal;
use super::{Alternative, CompileError, FileResult, Location, Rewrite, Rule};

type DefinedSymbols<'a> = HashSet<&'a str>;

fn get_alternative_undefined_symbols<'a>(alternative: &'a Alternative, defined: &DefinedSymbols) -> Vec<&'a str> {
    // Filter out everything but nonterminals and unwrap the text from the
    // nonterminals. Then filter out all the defined nonterminals.
    alternative.iter()
        .filter_map(|symbol| match symbol {
            Nonterminal(symbol) => Some(symbol.as_str()),
            _ => None
        })
        .filter(|symbol| !defined.contains(symbol))
        .collect()
}

fn get_rewrite_undefined_symbols<'a>(rewrite: &'a Rewrite, defined: &DefinedSymbols) -> Vec<&'a str> {
    rewrite.iter()
        .flat_map(|alternative| get_alternative_undefined_symbols(alternative, defined))
        .collect()
}

fn get_undefined_symbols<'a>(rules: &'a [Rule], defined: &DefinedSymbols) -> Vec<(&'a str, &'a Location)> {
    rules.iter()
        .flat_map(|rule| {
            get_rewrite_undefined_symbols(&rule.rewrite, defined)
                .into_iter()
                .map(move |symbol| (symbol, &rule.location))
        })
        .collect()
}

/// Rejects a start symbol without rules. Other nonterminals without rules
/// are legal (they never match) and only produce a warning.
pub(super) fn verify_rules(start_symbol: &str, start_location: &Location, rules: &[Rule]) -> FileResult<()> {
    let defined: DefinedSymbols = rules.iter().map(|rule| rule.symbol.as_str()).collect();

    for (symbol, location) in get_undefined_symbols(rules, &defined) {
        log::warn!("{}: `{}` has no rules and will never match", location, symbol);
    }

    if defined.contains(start_symbol) {
        Ok(())
    } else {
        Err(vec![CompileError {
            location: start_location.clone(),
            error: GrammarError::UndefinedStartSymbol(start_symbol.to_string()).into()
        }])
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use super::super::parse_line;

    fn rules(lines: &[&str]) -> Vec<Rule> {
        lines.iter()
            .enumerate()
            .map(|(num, line)| parse_line(line, Location::line(Path::new("test"), num + 1)).unwrap().unwrap())
            .collect()
    }

    #[test]
    fn undefined_symbols_are_found() {
        let rules = rules(&["S -> A b | C", "A -> a | D S"]);
        let defined: DefinedSymbols = rules.iter().map(|rule| rule.symbol.as_str()).collect();
        let undefined = get_undefined_symbols(&rules, &defined);

        assert_eq!(undefined, vec![
            ("C", &Location::line(Path::new("test"), 1)),
            ("D", &Location::line(Path::new("test"), 2))
        ]);
    }

    #[test]
    fn undefined_symbols_are_not_errors() {
        let rules = rules(&["S -> C"]);
        let location = Location::line(Path::new("test"), 1);
        assert_eq!(verify_rules("S", &location, &rules), Ok(()));
    }

    #[test]
    fn undefined_start_is_an_error() {
        let rules = rules(&["S -> a"]);
        let location = Location::line(Path::new("test"), 1);
        let errors = verify_rules("Start", &location, &rules).unwrap_err();

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].location, location);
    }
}
