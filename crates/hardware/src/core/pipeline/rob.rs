//! Reorder Buffer (ROB) for in-order retirement.
//!
//! The ROB records in-flight micro-ops in program order from dispatch until
//! commit or squash. It provides:
//! 1. **Admission:** `can_enqueue` against a private or shared capacity.
//! 2. **Retirement:** `head` / `remove_head` for the commit stage.
//! 3. **Squash:** `tail` / `remove_tail` for recovery, youngest first.
//! 4. **Arbitration:** `can_dequeue`, which in shared mode only lets the
//!    thread owning the true head retire.
//!
//! With private sizing every thread owns a partition of `rob_size` entries.
//! With shared sizing the threads of a core interleave in one partition of
//! `rob_size * threads` entries, and head/tail operations act on the oldest
//! or youngest entry of the requesting thread.

use std::collections::VecDeque;

use crate::config::Sharing;
use crate::core::uop::UopHandle;

/// A single entry in the Reorder Buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RobEntry {
    /// Micro-op occupying the entry.
    pub uop: UopHandle,
    /// Hardware thread that dispatched it.
    pub thread: usize,
    /// Program-order id of the micro-op.
    pub id: u64,
}

/// Reorder Buffer of one core.
#[derive(Clone, Debug)]
pub struct Rob {
    kind: Sharing,
    partitions: Vec<VecDeque<RobEntry>>,
    capacity: usize,
}

impl Rob {
    /// Creates a ROB for `threads` hardware threads.
    pub fn new(kind: Sharing, rob_size: usize, threads: usize) -> Self {
        let count = match kind {
            Sharing::Private => threads,
            Sharing::Shared => 1,
        };
        let capacity = kind.capacity(rob_size, threads);
        Self {
            kind,
            partitions: (0..count)
                .map(|_| VecDeque::with_capacity(capacity))
                .collect(),
            capacity,
        }
    }

    #[inline]
    fn partition(&self, thread: usize) -> &VecDeque<RobEntry> {
        match self.kind {
            Sharing::Private => &self.partitions[thread],
            Sharing::Shared => &self.partitions[0],
        }
    }

    #[inline]
    fn partition_mut(&mut self, thread: usize) -> &mut VecDeque<RobEntry> {
        match self.kind {
            Sharing::Private => &mut self.partitions[thread],
            Sharing::Shared => &mut self.partitions[0],
        }
    }

    /// Entries the partition serving `thread` can hold.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entries held by `thread`.
    pub fn len(&self, thread: usize) -> usize {
        match self.kind {
            Sharing::Private => self.partitions[thread].len(),
            Sharing::Shared => self.partitions[0]
                .iter()
                .filter(|e| e.thread == thread)
                .count(),
        }
    }

    /// Entries in the partition serving `thread`, across all its threads.
    pub fn occupancy(&self, thread: usize) -> usize {
        self.partition(thread).len()
    }

    /// Entries held by all threads of the core.
    pub fn total_len(&self) -> usize {
        self.partitions.iter().map(VecDeque::len).sum()
    }

    /// Returns true if `thread` holds no entry.
    pub fn is_empty(&self, thread: usize) -> bool {
        self.partition(thread).iter().all(|e| e.thread != thread)
    }

    /// Returns true if a new entry of `thread` fits.
    #[inline]
    pub fn can_enqueue(&self, thread: usize) -> bool {
        self.partition(thread).len() < self.capacity
    }

    /// Appends an entry at the tail.
    ///
    /// # Panics
    ///
    /// Panics if the partition is full or if `entry` is not younger than the
    /// thread's current tail.
    pub fn enqueue(&mut self, entry: RobEntry) {
        assert!(
            self.can_enqueue(entry.thread),
            "ROB enqueue without admission (thread {})",
            entry.thread
        );
        if let Some(tail) = self.tail(entry.thread) {
            assert!(
                tail.id < entry.id,
                "ROB order violated: uop {} after {}",
                entry.id,
                tail.id
            );
        }
        self.partition_mut(entry.thread).push_back(entry);
    }

    /// Returns true if `thread` may retire its head this cycle.
    pub fn can_dequeue(&self, thread: usize) -> bool {
        match self.kind {
            Sharing::Private => !self.partitions[thread].is_empty(),
            Sharing::Shared => self.partitions[0]
                .front()
                .is_some_and(|e| e.thread == thread),
        }
    }

    /// Oldest entry of `thread`.
    pub fn head(&self, thread: usize) -> Option<RobEntry> {
        self.partition(thread)
            .iter()
            .find(|e| e.thread == thread)
            .copied()
    }

    /// Youngest entry of `thread`.
    pub fn tail(&self, thread: usize) -> Option<RobEntry> {
        self.partition(thread)
            .iter()
            .rev()
            .find(|e| e.thread == thread)
            .copied()
    }

    /// Removes and returns the oldest entry of `thread`; `None` if it holds none.
    pub fn remove_head(&mut self, thread: usize) -> Option<RobEntry> {
        let partition = self.partition_mut(thread);
        let idx = partition.iter().position(|e| e.thread == thread)?;
        partition.remove(idx)
    }

    /// Removes and returns the youngest entry of `thread`; `None` if it holds none.
    pub fn remove_tail(&mut self, thread: usize) -> Option<RobEntry> {
        let partition = self.partition_mut(thread);
        let idx = partition.iter().rposition(|e| e.thread == thread)?;
        partition.remove(idx)
    }

    /// Entries of `thread` from head to tail.
    pub fn iter(&self, thread: usize) -> impl Iterator<Item = &RobEntry> {
        self.partition(thread)
            .iter()
            .filter(move |e| e.thread == thread)
    }
}
