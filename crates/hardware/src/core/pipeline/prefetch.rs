//! Prefetch history.
//!
//! Each core remembers the memory blocks its last few prefetches touched. A
//! prefetch to a block still in the history is redundant: it completes
//! without reaching the memory system.

/// Ring of recently prefetched block addresses.
#[derive(Clone, Debug)]
pub struct PrefetchHistory {
    blocks: Vec<Option<u64>>,
    next: usize,
    block_size: u64,
}

impl PrefetchHistory {
    /// Creates a history of `size` entries over blocks of `block_size` bytes.
    pub fn new(size: usize, block_size: u64) -> Self {
        Self {
            blocks: vec![None; size],
            next: 0,
            block_size: block_size.max(1),
        }
    }

    fn block(&self, addr: u64) -> u64 {
        addr - addr % self.block_size
    }

    /// Returns true if the block holding `addr` was prefetched recently.
    pub fn is_redundant(&self, addr: u64) -> bool {
        let block = self.block(addr);
        self.blocks.contains(&Some(block))
    }

    /// Records a prefetch of the block holding `addr`, evicting the oldest entry.
    pub fn record(&mut self, addr: u64) {
        if self.blocks.is_empty() {
            return;
        }
        self.blocks[self.next] = Some(self.block(addr));
        self.next = (self.next + 1) % self.blocks.len();
    }
}
