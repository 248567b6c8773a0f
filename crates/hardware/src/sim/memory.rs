//! Fixed-latency memory port.
//!
//! A minimal memory system for driving the timing core without a cache
//! hierarchy: every access completes a fixed number of cycles after it was
//! submitted, according to its kind, and each core may submit a limited
//! number of accesses per cycle.

use std::cell::Cell;
use std::collections::HashMap;

use crate::common::{AccessId, AccessKind};
use crate::config::MemoryConfig;
use crate::sim::traits::MemoryPort;

/// Counters of a [`FixedLatencyMemory`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemoryStats {
    /// Instruction fetch accesses.
    pub fetches: u64,
    /// Load accesses.
    pub loads: u64,
    /// Store accesses.
    pub stores: u64,
    /// Prefetch accesses.
    pub prefetches: u64,
    /// Admission checks refused because the core's ports were exhausted.
    pub refused: u64,
}

/// Memory port with per-kind latency and a per-core port limit.
#[derive(Debug)]
pub struct FixedLatencyMemory {
    config: MemoryConfig,
    ports_used: Vec<usize>,
    pending: HashMap<AccessId, u64>,
    next_id: u64,
    stats: MemoryStats,
    refused: Cell<u64>,
}

impl FixedLatencyMemory {
    /// Creates a port for `cores` cores.
    pub fn new(config: MemoryConfig, cores: usize) -> Self {
        Self {
            config,
            ports_used: vec![0; cores],
            pending: HashMap::new(),
            next_id: 0,
            stats: MemoryStats::default(),
            refused: Cell::new(0),
        }
    }

    /// Latency of an access of `kind`.
    pub const fn latency(&self, kind: AccessKind) -> u64 {
        match kind {
            AccessKind::Fetch => self.config.fetch_latency,
            AccessKind::Load => self.config.load_latency,
            AccessKind::Store => self.config.store_latency,
            AccessKind::Prefetch => self.config.prefetch_latency,
        }
    }

    /// Accesses submitted and not yet retired by [`MemoryPort::tick`].
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Access counters.
    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            refused: self.refused.get(),
            ..self.stats
        }
    }
}

impl MemoryPort for FixedLatencyMemory {
    fn block_size(&self) -> u64 {
        self.config.block_size
    }

    fn can_access(&self, core: usize, _thread: usize, _kind: AccessKind, _addr: u64) -> bool {
        let free = self
            .ports_used
            .get(core)
            .is_some_and(|&used| used < self.config.ports);
        if !free {
            self.refused.set(self.refused.get() + 1);
        }
        free
    }

    fn access(
        &mut self,
        core: usize,
        thread: usize,
        kind: AccessKind,
        addr: u64,
        now: u64,
    ) -> AccessId {
        if let Some(used) = self.ports_used.get_mut(core) {
            *used += 1;
        }
        match kind {
            AccessKind::Fetch => self.stats.fetches += 1,
            AccessKind::Load => self.stats.loads += 1,
            AccessKind::Store => self.stats.stores += 1,
            AccessKind::Prefetch => self.stats.prefetches += 1,
        }

        let id = AccessId(self.next_id);
        self.next_id += 1;
        let done = now + self.latency(kind);
        let _ = self.pending.insert(id, done);
        tracing::trace!(core, thread, ?kind, addr = format_args!("{addr:#x}"), done, "memory access");
        id
    }

    fn in_flight(&self, id: AccessId, now: u64) -> bool {
        self.pending.get(&id).is_some_and(|&done| done > now)
    }

    fn tick(&mut self, now: u64) {
        self.ports_used.fill(0);
        self.pending.retain(|_, done| *done > now);
    }
}
