use std::fmt;

const WORD_BITS: usize = 64;

/// End positions a derivation can reach, as a bitset over input positions.
///
/// The last word is never zero, so sets with equal members compare equal.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ReachSet(Vec<u64>);

impl ReachSet {
    pub fn new() -> Self {
        ReachSet(Vec::new())
    }

    pub fn singleton(position: usize) -> Self {
        let mut set = ReachSet::new();
        set.insert(position);
        set
    }

    pub fn insert(&mut self, position: usize) {
        let word = position / WORD_BITS;
        if word >= self.0.len() {
            self.0.resize(word + 1, 0);
        }
        self.0[word] |= 1 << (position % WORD_BITS);
    }

    pub fn contains(&self, position: usize) -> bool {
        self.0
            .get(position / WORD_BITS)
            .is_some_and(|word| (word >> (position % WORD_BITS)) & 1 != 0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Positions in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().enumerate().flat_map(|(index, &word)| {
            std::iter::successors(Some(word).filter(|&bits| bits != 0), |&bits| {
                Some(bits & (bits - 1)).filter(|&rest| rest != 0)
            })
            .map(move |bits| index * WORD_BITS + bits.trailing_zeros() as usize)
        })
    }

    // Adds every position of `other`, returning whether any of them was new
    pub fn union_with(&mut self, other: &ReachSet) -> bool {
        if other.0.len() > self.0.len() {
            self.0.resize(other.0.len(), 0);
        }

        let mut grew = false;
        for (word, &bits) in self.0.iter_mut().zip(&other.0) {
            grew |= bits & !*word != 0;
            *word |= bits;
        }
        grew
    }
}

impl FromIterator<usize> for ReachSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = ReachSet::new();
        for position in iter {
            set.insert(position);
        }
        set
    }
}

impl fmt::Debug for ReachSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
