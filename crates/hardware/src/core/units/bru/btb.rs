//! Branch Target Buffer (BTB).
//!
//! The BTB is a set-associative cache that stores target addresses for control
//! flow instructions, keyed by the full source address. Each set keeps its ways
//! ordered by LRU counters: the most recently used way holds `assoc - 1`, the
//! least recently used holds `0`, and the counters of a set always form a
//! permutation of `0..assoc`.

/// An entry in the Branch Target Buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BtbEntry {
    /// Source address of the control instruction; zero marks an unused way.
    pub source: u64,
    /// Predicted target address.
    pub target: u64,
    /// LRU counter; higher is more recent.
    pub counter: usize,
}

/// Branch Target Buffer structure.
#[derive(Clone, Debug)]
pub struct Btb {
    /// Entries, `assoc` consecutive ways per set.
    table: Vec<BtbEntry>,
    /// Number of sets. Must be a power of 2.
    sets: usize,
    /// Ways per set.
    assoc: usize,
}

impl Btb {
    /// Creates a new Branch Target Buffer.
    ///
    /// # Arguments
    ///
    /// * `sets` - Number of sets. Must be a power of 2.
    /// * `assoc` - Ways per set.
    pub fn new(sets: usize, assoc: usize) -> Self {
        let mut table = vec![BtbEntry::default(); sets * assoc];
        for set in table.chunks_mut(assoc) {
            for (way, entry) in set.iter_mut().enumerate() {
                entry.counter = way;
            }
        }
        Self { table, sets, assoc }
    }

    /// Index of the first way of the set holding `pc`.
    #[inline]
    fn set_base(&self, pc: u64) -> usize {
        (pc as usize & (self.sets - 1)) * self.assoc
    }

    /// Ways of the set `pc` maps to.
    pub fn set(&self, pc: u64) -> &[BtbEntry] {
        let base = self.set_base(pc);
        &self.table[base..base + self.assoc]
    }

    /// Looks up the target address recorded for `pc`.
    ///
    /// # Returns
    ///
    /// The stored target if `pc` hits in its set, otherwise `None`.
    pub fn lookup(&self, pc: u64) -> Option<u64> {
        self.set(pc)
            .iter()
            .find(|e| e.source == pc && pc != 0)
            .map(|e| e.target)
    }

    /// Records `target` for `pc` and makes its way the most recently used.
    ///
    /// On a miss the least recently used way of the set is replaced: every
    /// counter in the set is decremented and the way that drops below zero
    /// receives the new entry with counter `assoc - 1`.
    pub fn update(&mut self, pc: u64, target: u64) {
        let base = self.set_base(pc);
        let assoc = self.assoc;
        let set = &mut self.table[base..base + assoc];

        let found = set.iter().position(|e| e.source == pc);
        let way = match found {
            Some(way) => {
                let counter = set[way].counter;
                for entry in set.iter_mut() {
                    if entry.counter > counter {
                        entry.counter -= 1;
                    }
                }
                way
            }
            None => {
                let mut victim = 0;
                for (way, entry) in set.iter_mut().enumerate() {
                    if entry.counter == 0 {
                        victim = way;
                    } else {
                        entry.counter -= 1;
                    }
                }
                set[victim].source = pc;
                victim
            }
        };
        set[way].target = target;
        set[way].counter = assoc - 1;
    }
}
