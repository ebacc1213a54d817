use crate::grammar::NonterminalId;

use super::reach_set::ReachSet;

#[derive(Debug, Clone)]
pub enum Entry {
    // Visited but not final. `low` is the visit index of the earliest open
    // entry this one depends on, at first its own
    Open {
        low: usize,
        approximation: ReachSet,
    },
    Settled(ReachSet),
}

/// Reach sets of one recognition call, one slot per nonterminal and start
/// position.
pub struct MemoCache {
    positions: usize,
    entries: Vec<Option<Entry>>,
}

impl MemoCache {
    pub fn new(nonterminals: usize, input_len: usize) -> Self {
        let positions = input_len + 1;
        MemoCache {
            positions,
            entries: vec![None; nonterminals * positions],
        }
    }

    fn slot(&self, nonterminal: NonterminalId, position: usize) -> usize {
        nonterminal.index() * self.positions + position
    }

    pub fn get(&self, nonterminal: NonterminalId, position: usize) -> Option<&Entry> {
        self.entries[self.slot(nonterminal, position)].as_ref()
    }

    pub fn open(&mut self, nonterminal: NonterminalId, position: usize, index: usize) {
        let slot = self.slot(nonterminal, position);
        self.entries[slot] = Some(Entry::Open {
            low: index,
            approximation: ReachSet::new(),
        });
    }

    // Records the first full evaluation of an open entry
    pub fn finish(&mut self, nonterminal: NonterminalId, position: usize, positions: ReachSet, depends_on: usize) {
        let slot = self.slot(nonterminal, position);
        if let Some(Entry::Open { low, approximation, .. }) = &mut self.entries[slot] {
            *low = depends_on;
            *approximation = positions;
        }
    }

    pub fn relink(&mut self, nonterminal: NonterminalId, position: usize, depends_on: usize) {
        let slot = self.slot(nonterminal, position);
        if let Some(Entry::Open { low, .. }) = &mut self.entries[slot] {
            *low = depends_on;
        }
    }

    // Adds newly found positions to an open entry, returning whether it grew
    pub fn widen(&mut self, nonterminal: NonterminalId, position: usize, positions: &ReachSet) -> bool {
        let slot = self.slot(nonterminal, position);
        match &mut self.entries[slot] {
            Some(Entry::Open { approximation, .. }) => approximation.union_with(positions),
            _ => false,
        }
    }

    pub fn settle(&mut self, nonterminal: NonterminalId, position: usize, positions: ReachSet) {
        let slot = self.slot(nonterminal, position);
        self.entries[slot] = Some(Entry::Settled(positions));
    }

    // An open entry's approximation becomes its final value
    pub fn close(&mut self, nonterminal: NonterminalId, position: usize) {
        let slot = self.slot(nonterminal, position);
        self.entries[slot] = match self.entries[slot].take() {
            Some(Entry::Open { approximation, .. }) => Some(Entry::Settled(approximation)),
            entry => entry,
        };
    }

    pub fn settled(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry, Some(Entry::Settled(_))))
            .count()
    }
}
