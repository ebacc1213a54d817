/*
    This module decides whether a grammar derives a string
*/

mod engine;
mod memo;
mod reach_set;

use std::fmt::Display;

use crate::grammar::{Grammar, NonterminalId};

pub use engine::Engine;
pub use reach_set::ReachSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Reject,
}

impl From<bool> for Verdict {
    fn from(accepted: bool) -> Self {
        if accepted {
            Verdict::Accept
        } else {
            Verdict::Reject
        }
    }
}

impl Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Accept => write!(f, "ACCEPT"),
            Verdict::Reject => write!(f, "REJECT"),
        }
    }
}

pub fn recognize(grammar: &Grammar, input: &str) -> Verdict {
    recognize_from(grammar, grammar.start(), input)
}

// Every call gets its own cache, dropped with the engine on return
pub fn recognize_from(grammar: &Grammar, start: NonterminalId, input: &str) -> Verdict {
    let chars: Vec<char> = input.chars().collect();
    let mut engine = Engine::new(grammar, &chars);

    let verdict = Verdict::from(engine.reachable(start, 0).contains(chars.len()));
    log::debug!(
        "{:?} from `{}`: {} ({} cached entries, {} expansions)",
        input,
        grammar.nonterminal(start).name(),
        verdict,
        engine.settled_entries(),
        engine.expansions()
    );
    verdict
}
