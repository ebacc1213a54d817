use crate::grammar::{Grammar, NonterminalId, Symbol};

use super::memo::{Entry, MemoCache};
use super::reach_set::ReachSet;

fn lowest(a: Option<usize>, b: Option<usize>) -> Option<usize> {
    a.into_iter().chain(b).min()
}

#[derive(Debug, Clone, Copy)]
enum Purpose {
    // First evaluation of a pair, pushed at `member` on the component stack
    Visit { index: usize, member: usize },
    // Another round for a member of an unfinished component
    Revisit,
}

// One pass over every production of a nonterminal, suspended whenever it
// needs a pair that has not been visited yet
struct Expansion {
    nonterminal: NonterminalId,
    position: usize,
    purpose: Purpose,
    production: usize,
    symbol: usize,
    frontier: ReachSet,
    todo: Vec<usize>,
    next: ReachSet,
    reached: ReachSet,
    low: Option<usize>,
}

impl Expansion {
    fn new(nonterminal: NonterminalId, position: usize, purpose: Purpose) -> Self {
        let mut expansion = Expansion {
            nonterminal,
            position,
            purpose,
            production: 0,
            symbol: 0,
            frontier: ReachSet::new(),
            todo: Vec::new(),
            next: ReachSet::new(),
            reached: ReachSet::new(),
            low: None,
        };
        expansion.start_production(0);
        expansion
    }

    fn start_production(&mut self, production: usize) {
        self.production = production;
        self.symbol = 0;
        self.frontier = ReachSet::singleton(self.position);
        self.todo = vec![self.position];
        self.next = ReachSet::new();
    }
}

// Re-evaluates the members of a strongly connected component, from the
// newest down to its root, until a whole round adds nothing
struct Sweep {
    root: usize,
    index: usize,
    cursor: usize,
    members: usize,
    changed: bool,
    low: Option<usize>,
}

enum Frame {
    Expand(Expansion),
    Sweep(Sweep),
}

/// Computes `reach(X, p)`, the end positions of every derivation of `X`
/// that starts at input position `p`.
///
/// Pairs are visited depth first on an explicit frame stack, so the input
/// length never bounds the call stack. A pair asked for while it is still
/// open (left recursion) yields its current approximation. Pairs that
/// depend on each other that way form a component in the sense of Tarjan's
/// algorithm. Once its root is evaluated, every member is re-evaluated in
/// rounds until nothing grows, and then the whole component settles at
/// once. Sets only grow and hold at most `n + 1` positions, so this ends
/// with the least fixpoint for any grammar.
pub struct Engine<'a> {
    grammar: &'a Grammar,
    input: &'a [char],
    memo: MemoCache,
    component: Vec<(NonterminalId, usize)>,
    visits: usize,
    expansions: usize,
}

impl<'a> Engine<'a> {
    pub fn new(grammar: &'a Grammar, input: &'a [char]) -> Self {
        Engine {
            grammar,
            input,
            memo: MemoCache::new(grammar.len(), input.len()),
            component: Vec::new(),
            visits: 0,
            expansions: 0,
        }
    }

    pub fn reachable(&mut self, nonterminal: NonterminalId, position: usize) -> ReachSet {
        if position > self.input.len() {
            return ReachSet::new();
        }
        if self.memo.get(nonterminal, position).is_none() {
            self.run(nonterminal, position);
        }

        match self.memo.get(nonterminal, position) {
            Some(Entry::Settled(positions)) => positions.clone(),
            Some(Entry::Open { approximation, .. }) => approximation.clone(),
            None => ReachSet::new(),
        }
    }

    pub fn settled_entries(&self) -> usize {
        self.memo.settled()
    }

    /// Passes over a nonterminal's productions so far.
    pub fn expansions(&self) -> usize {
        self.expansions
    }

    fn run(&mut self, nonterminal: NonterminalId, position: usize) {
        let mut frames = vec![self.visit(nonterminal, position)];

        while let Some(frame) = frames.pop() {
            match frame {
                Frame::Expand(mut expansion) => match self.advance(&mut expansion) {
                    Some((child, at)) => {
                        frames.push(Frame::Expand(expansion));
                        frames.push(self.visit(child, at));
                    }
                    None => {
                        let purpose = expansion.purpose;
                        match purpose {
                            Purpose::Visit { index, member } => {
                                frames.extend(self.finish_visit(expansion, index, member).map(Frame::Sweep));
                            }
                            Purpose::Revisit => {
                                let (grew, low) = self.finish_revisit(expansion);
                                if let Some(Frame::Sweep(sweep)) = frames.last_mut() {
                                    sweep.changed |= grew;
                                    sweep.low = lowest(sweep.low, low);
                                }
                            }
                        }
                    }
                },
                Frame::Sweep(mut sweep) => {
                    if let Some(member) = self.next_member(&mut sweep) {
                        frames.push(Frame::Sweep(sweep));
                        frames.push(Frame::Expand(member));
                    }
                }
            }
        }
    }

    fn visit(&mut self, nonterminal: NonterminalId, position: usize) -> Frame {
        let index = self.visits;
        self.visits += 1;
        self.memo.open(nonterminal, position, index);

        let member = self.component.len();
        self.component.push((nonterminal, position));
        Frame::Expand(self.expansion(nonterminal, position, Purpose::Visit { index, member }))
    }

    fn expansion(&mut self, nonterminal: NonterminalId, position: usize, purpose: Purpose) -> Expansion {
        self.expansions += 1;
        Expansion::new(nonterminal, position, purpose)
    }

    // Threads the frontier through the symbols of each production. Returns
    // the pair that has to be visited before this expansion can go on.
    fn advance(&self, expansion: &mut Expansion) -> Option<(NonterminalId, usize)> {
        let productions = self.grammar.nonterminal(expansion.nonterminal).productions();

        while let Some(production) = productions.get(expansion.production) {
            let Some(symbol) = production.get(expansion.symbol) else {
                expansion.reached.union_with(&expansion.frontier);
                expansion.start_production(expansion.production + 1);
                continue;
            };

            if let Some(at) = expansion.todo.pop() {
                match *symbol {
                    Symbol::Terminal(c) => {
                        if self.input.get(at) == Some(&c) {
                            expansion.next.insert(at + 1);
                        }
                    }
                    Symbol::Nonterminal(child) => match self.memo.get(child, at) {
                        Some(Entry::Settled(positions)) => {
                            expansion.next.union_with(positions);
                        }
                        Some(Entry::Open { low, approximation, .. }) => {
                            expansion.next.union_with(approximation);
                            expansion.low = lowest(expansion.low, Some(*low));
                        }
                        None => {
                            expansion.todo.push(at);
                            return Some((child, at));
                        }
                    },
                }
                continue;
            }

            expansion.frontier = std::mem::take(&mut expansion.next);
            if expansion.frontier.is_empty() {
                expansion.start_production(expansion.production + 1);
            } else {
                expansion.symbol += 1;
                expansion.todo = expansion.frontier.iter().collect();
            }
        }

        None
    }

    fn finish_visit(&mut self, expansion: Expansion, index: usize, member: usize) -> Option<Sweep> {
        let Expansion { nonterminal, position, reached, low, .. } = expansion;

        match low {
            None => {
                self.memo.settle(nonterminal, position, reached);
                self.component.truncate(member);
                None
            }
            Some(low) if low >= index => {
                self.memo.finish(nonterminal, position, reached, index);
                Some(Sweep {
                    root: member,
                    index,
                    cursor: self.component.len(),
                    members: self.component.len(),
                    changed: false,
                    low: None,
                })
            }
            Some(low) => {
                self.memo.finish(nonterminal, position, reached, low);
                None
            }
        }
    }

    fn finish_revisit(&mut self, expansion: Expansion) -> (bool, Option<usize>) {
        let Expansion { nonterminal, position, reached, low, .. } = expansion;

        let grew = self.memo.widen(nonterminal, position, &reached);
        if grew {
            log::trace!(
                "`{}` at {} grew to include {:?}",
                self.grammar.nonterminal(nonterminal).name(),
                position,
                reached
            );
        }
        (grew, low)
    }

    fn next_member(&mut self, sweep: &mut Sweep) -> Option<Expansion> {
        if let Some(low) = sweep.low.filter(|&low| low < sweep.index) {
            // Reached an older open pair, whose component takes these members over
            let (root, root_position) = self.component[sweep.root];
            self.memo.relink(root, root_position, low);
            return None;
        }

        if sweep.cursor == sweep.root {
            if !sweep.changed && sweep.members == self.component.len() {
                for (nonterminal, position) in self.component.drain(sweep.root..) {
                    self.memo.close(nonterminal, position);
                }
                return None;
            }

            sweep.changed = false;
            sweep.members = self.component.len();
            sweep.cursor = sweep.members;
        }

        sweep.cursor -= 1;
        let (nonterminal, position) = self.component[sweep.cursor];
        Some(self.expansion(nonterminal, position, Purpose::Revisit))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::grammar::GrammarBuilder;
    use crate::parser::{parse_str, ParseOptions};

    fn grammar(text: &str) -> Grammar {
        parse_str(text, &ParseOptions::default()).unwrap()
    }

    fn positions(set: &ReachSet) -> Vec<usize> {
        set.iter().collect()
    }

    #[test]
    fn epsilon_reaches_its_own_position() {
        let grammar = grammar("S\nS -> a S | ε\n");
        let input: Vec<char> = "abaa".chars().collect();
        let mut engine = Engine::new(&grammar, &input);

        for p in 0..=input.len() {
            assert!(engine.reachable(grammar.start(), p).contains(p));
        }
    }

    #[test]
    fn reach_collects_every_end() {
        let grammar = grammar("S\nS -> a S | ε\n");
        let input: Vec<char> = "aab".chars().collect();
        let mut engine = Engine::new(&grammar, &input);

        assert_eq!(positions(&engine.reachable(grammar.start(), 0)), vec![0, 1, 2]);
        assert_eq!(positions(&engine.reachable(grammar.start(), 2)), vec![2]);
        assert_eq!(positions(&engine.reachable(grammar.start(), 3)), vec![3]);
    }

    #[test]
    fn out_of_range_position_is_empty() {
        let grammar = grammar("S\nS -> ε\n");
        let input: Vec<char> = "ab".chars().collect();
        let mut engine = Engine::new(&grammar, &input);

        assert!(engine.reachable(grammar.start(), 3).is_empty());
    }

    #[test]
    fn undefined_nonterminal_reaches_nothing() {
        let grammar = grammar("S\nS -> C | a C\n");
        let input: Vec<char> = "ac".chars().collect();
        let mut engine = Engine::new(&grammar, &input);
        let c = grammar.lookup("C").unwrap();

        assert!(engine.reachable(grammar.start(), 0).is_empty());
        assert!(engine.reachable(c, 1).is_empty());
    }

    #[test]
    fn left_recursion_reaches_fixpoint() {
        let grammar = grammar("S\nS -> S a | a\n");
        let input: Vec<char> = "aaab".chars().collect();
        let mut engine = Engine::new(&grammar, &input);

        assert_eq!(positions(&engine.reachable(grammar.start(), 0)), vec![1, 2, 3]);
        assert_eq!(positions(&engine.reachable(grammar.start(), 3)), Vec::<usize>::new());
    }

    #[test]
    fn mutual_left_recursion_is_settled_once() {
        let grammar = grammar("A\nA -> B a | a\nB -> A b | b\n");
        let input: Vec<char> = "ababa".chars().collect();
        let mut engine = Engine::new(&grammar, &input);

        assert_eq!(positions(&engine.reachable(grammar.start(), 0)), vec![1, 3, 5]);

        // B at 0 is in A's component and settles with it
        assert_eq!(engine.settled_entries(), 2);
        let expansions = engine.expansions();
        let b = grammar.lookup("B").unwrap();
        assert_eq!(positions(&engine.reachable(b, 0)), vec![2, 4]);
        assert_eq!(engine.expansions(), expansions);
    }

    #[test]
    fn inner_component_joins_older_one() {
        // A at 0 first looks like a component of its own, until its second
        // round reaches S at 0
        let grammar = grammar("S\nS -> A b | a\nA -> A S | ε\n");
        let input: Vec<char> = "abab".chars().collect();
        let mut engine = Engine::new(&grammar, &input);
        let a = grammar.lookup("A").unwrap();

        assert_eq!(positions(&engine.reachable(grammar.start(), 0)), vec![1, 2, 4]);
        assert_eq!(positions(&engine.reachable(a, 0)), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn component_members_are_not_recomputed() {
        // S -> S a | X0 | b, Xi -> X(i+1) | X(i+1) d, X20 -> S
        let chain = 20;
        let mut text = String::from("S\nS -> S a | X0 | b\n");
        for i in 0..chain {
            text.push_str(&format!("X{} -> X{} | X{} d\n", i, i + 1, i + 1));
        }
        text.push_str(&format!("X{} -> S\n", chain));

        let grammar = grammar(&text);
        let input: Vec<char> = "baaa".chars().collect();
        let mut engine = Engine::new(&grammar, &input);

        assert!(engine.reachable(grammar.start(), 0).contains(input.len()));

        // Every pair sits at position 0, and each round revisits each once
        let pairs = chain + 2;
        assert!(engine.expansions() <= 4 * pairs * (input.len() + 1), "{} expansions", engine.expansions());
    }

    #[test]
    fn long_input_does_not_grow_the_call_stack() {
        let grammar = grammar("S\nS -> a S | ε\n");
        let input = vec!['a'; 20_000];
        let mut engine = Engine::new(&grammar, &input);

        let reach = engine.reachable(grammar.start(), 0);
        assert!(reach.contains(input.len()));
        assert_eq!(reach.iter().count(), input.len() + 1);
        assert_eq!(engine.expansions(), input.len() + 1);
    }

    #[test]
    fn settled_entries_are_reused() {
        let grammar = grammar("S\nS -> A A\nA -> a\n");
        let input: Vec<char> = "aa".chars().collect();
        let mut engine = Engine::new(&grammar, &input);

        engine.reachable(grammar.start(), 0);
        let settled = engine.settled_entries();
        engine.reachable(grammar.start(), 0);

        // (S, 0), (A, 0), (A, 1)
        assert_eq!(settled, 3);
        assert_eq!(engine.settled_entries(), settled);
    }

    // Symbol codes 0 and 1 are the terminals `a` and `b`, the rest pick a
    // nonterminal
    fn build_grammar(rules: &[Vec<Vec<usize>>]) -> Grammar {
        let mut builder = GrammarBuilder::default();
        let names: Vec<String> = (0..rules.len()).map(|i| format!("N{}", i)).collect();
        let ids: Vec<NonterminalId> = names.iter().map(|name| builder.define_nonterminal(name).unwrap()).collect();

        for (name, productions) in names.iter().zip(rules) {
            for production in productions {
                let symbols = production.iter().map(|&code| match code {
                    0 => Symbol::Terminal('a'),
                    1 => Symbol::Terminal('b'),
                    _ => Symbol::Nonterminal(ids[(code - 2) % ids.len()]),
                }).collect();
                builder.add_production(name, symbols).unwrap();
            }
        }
        builder.set_start_symbol("N0");
        builder.build().unwrap()
    }

    // Iterates every pair at once until nothing changes
    fn whole_table_fixpoint(grammar: &Grammar, input: &[char]) -> Vec<Vec<ReachSet>> {
        let mut table = vec![vec![ReachSet::new(); input.len() + 1]; grammar.len()];

        let mut changed = true;
        while changed {
            changed = false;
            for (id, nonterminal) in grammar.nonterminals() {
                for p in 0..=input.len() {
                    for production in nonterminal.productions() {
                        let mut frontier = ReachSet::singleton(p);
                        for symbol in production {
                            frontier = frontier.iter().flat_map(|r| match *symbol {
                                Symbol::Terminal(c) if input.get(r) == Some(&c) => vec![r + 1],
                                Symbol::Terminal(_) => vec![],
                                Symbol::Nonterminal(child) => table[child.index()][r].iter().collect(),
                            }).collect();
                        }
                        changed |= table[id.index()][p].union_with(&frontier);
                    }
                }
            }
        }

        table
    }

    proptest! {
        #[test]
        fn matches_whole_table_fixpoint(
            rules in prop::collection::vec(
                prop::collection::vec(prop::collection::vec(0usize..6, 0..4), 1..4),
                1..5
            ),
            input in "[ab]{0,6}"
        ) {
            let grammar = build_grammar(&rules);
            let input: Vec<char> = input.chars().collect();
            let expected = whole_table_fixpoint(&grammar, &input);
            let mut engine = Engine::new(&grammar, &input);

            for (id, _) in grammar.nonterminals() {
                for p in 0..=input.len() {
                    prop_assert_eq!(&engine.reachable(id, p), &expected[id.index()][p]);
                }
            }
        }
    }
}
