//! Issue-side queues.
//!
//! Every hardware thread owns an instruction queue (IQ) and the three parts
//! of its load/store queue: load (LQ), store (SQ) and prefetch (PQ). They are
//! unordered pools; insertion order is only the scan order used by issue and
//! recovery. Entries that cannot leave stay in place and the scan continues.
//!
//! Capacity is checked by [`Capacity::admits`], which compares either the
//! thread's or the whole core's occupancy depending on the sharing kind. The
//! same arithmetic serves the register-file rename admission.

use crate::config::Sharing;
use crate::core::uop::UopHandle;

/// Private-or-shared capacity of a per-thread structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Capacity {
    kind: Sharing,
    limit: usize,
}

impl Capacity {
    /// Capacity for a configured per-thread `size` on a core with `threads` threads.
    pub const fn new(kind: Sharing, size: usize, threads: usize) -> Self {
        Self {
            kind,
            limit: kind.capacity(size, threads),
        }
    }

    /// Entries one admission check compares against.
    pub const fn limit(&self) -> usize {
        self.limit
    }

    /// Returns true if `demand` more entries fit.
    ///
    /// `thread_used` is the requesting thread's occupancy and `core_used` the
    /// sum over all threads of the core.
    #[inline]
    pub const fn admits(&self, thread_used: usize, core_used: usize, demand: usize) -> bool {
        let used = match self.kind {
            Sharing::Private => thread_used,
            Sharing::Shared => core_used,
        };
        used + demand <= self.limit
    }
}

/// Pool of micro-ops waiting to issue, scanned in insertion order.
#[derive(Clone, Debug, Default)]
pub struct IssuePool {
    entries: Vec<UopHandle>,
}

impl IssuePool {
    /// Creates an empty pool.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Appends a micro-op.
    pub fn push(&mut self, uop: UopHandle) {
        self.entries.push(uop);
    }

    /// Number of waiting micro-ops.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at scan position `idx`.
    pub fn get(&self, idx: usize) -> Option<UopHandle> {
        self.entries.get(idx).copied()
    }

    /// Removes the entry at `idx`, keeping the order of the others.
    pub fn remove(&mut self, idx: usize) -> UopHandle {
        self.entries.remove(idx)
    }

    /// Keeps only the entries for which `keep` returns true.
    pub fn retain(&mut self, keep: impl FnMut(&UopHandle) -> bool) {
        self.entries.retain(keep);
    }

    /// Returns true if `uop` is waiting here.
    pub fn contains(&self, uop: UopHandle) -> bool {
        self.entries.contains(&uop)
    }

    /// Waiting micro-ops in scan order.
    pub fn iter(&self) -> impl Iterator<Item = UopHandle> + '_ {
        self.entries.iter().copied()
    }
}

/// Issue-side queues of one hardware thread.
#[derive(Clone, Debug, Default)]
pub struct ThreadQueues {
    /// Register-only micro-ops.
    pub iq: IssuePool,
    /// Loads.
    pub lq: IssuePool,
    /// Stores, issued in order once committed.
    pub sq: IssuePool,
    /// Prefetches.
    pub pq: IssuePool,
}

impl ThreadQueues {
    /// Occupancy of the load/store queue (loads, stores and prefetches).
    pub fn lsq_len(&self) -> usize {
        self.lq.len() + self.sq.len() + self.pq.len()
    }

    /// Returns true if every queue is empty.
    pub fn is_empty(&self) -> bool {
        self.iq.is_empty() && self.lsq_len() == 0
    }
}
