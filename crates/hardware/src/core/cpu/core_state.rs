//! Core state and per-cycle orchestration.
//!
//! A core owns the structures its hardware threads share (functional units,
//! completion event queue, in-flight memory accesses, prefetch history, the
//! micro-op arena) and, depending on configuration, the ROB and the capacity
//! budgets of the IQ, LSQ, and register files.

use std::sync::Arc;

use crate::common::{AccessId, RegClass};
use crate::config::{Config, Sharing};
use crate::core::cpu::thread::Thread;
use crate::core::pipeline::event_queue::EventQueue;
use crate::core::pipeline::prefetch::PrefetchHistory;
use crate::core::pipeline::queues::Capacity;
use crate::core::pipeline::rob::Rob;
use crate::core::pipeline::stages::{self, CycleEnv};
use crate::core::units::fu::FunctionalUnitPool;
use crate::core::uop::{Uop, UopArena, UopHandle};
use crate::stats::CoreStats;

/// Capacity budgets of the per-thread structures of a core.
#[derive(Clone, Copy, Debug)]
pub struct CoreCapacity {
    /// Instruction queue.
    pub iq: Capacity,
    /// Load/store queue.
    pub lsq: Capacity,
    /// Register files, indexed by [`RegClass::index`].
    pub rf: [Capacity; 3],
}

/// Last thread serviced by each stage.
#[derive(Clone, Copy, Debug, Default)]
pub struct StageCursors {
    /// Fetch.
    pub fetch: usize,
    /// Decode.
    pub decode: usize,
    /// Dispatch.
    pub dispatch: usize,
    /// Issue.
    pub issue: usize,
    /// Commit.
    pub commit: usize,
}

/// One processor core.
#[derive(Debug)]
pub struct Core {
    /// Core index.
    pub id: usize,
    /// Shared configuration.
    pub config: Arc<Config>,
    /// Hardware threads.
    pub threads: Vec<Thread>,
    /// Reorder buffer, private partitions or one shared partition.
    pub rob: Rob,
    /// Scheduled completions of issued register micro-ops.
    pub event_queue: EventQueue,
    /// Issued memory micro-ops waiting for their access to complete.
    pub mem_inflight: Vec<(AccessId, UopHandle)>,
    /// Functional units.
    pub fu: FunctionalUnitPool,
    /// Recently prefetched blocks.
    pub prefetch_history: PrefetchHistory,
    /// Storage of every live micro-op of the core.
    pub uops: UopArena,
    /// Admission budgets.
    pub capacity: CoreCapacity,
    /// Round-robin positions.
    pub cursors: StageCursors,
    /// Cycle of the last switch-on-event thread switch.
    pub fetch_switch_when: u64,
    /// Core-level counters.
    pub stats: CoreStats,
}

impl Core {
    /// Creates core `id` with idle threads.
    pub fn new(id: usize, config: Arc<Config>, block_size: u64) -> Self {
        let threads = config.general.threads;
        let queues = &config.queues;
        let rf = &config.reg_file;
        let capacity = CoreCapacity {
            iq: Capacity::new(queues.iq_kind, queues.iq_size, threads),
            lsq: Capacity::new(queues.lsq_kind, queues.lsq_size, threads),
            rf: RegClass::ALL.map(|class| Capacity::new(rf.kind, rf.size(class), threads)),
        };
        Self {
            id,
            threads: (0..threads).map(|t| Thread::new(t, &config)).collect(),
            rob: Rob::new(queues.rob_kind, queues.rob_size, threads),
            event_queue: EventQueue::new(),
            mem_inflight: Vec::new(),
            fu: FunctionalUnitPool::new(&config.functional_units),
            prefetch_history: PrefetchHistory::new(
                config.general.prefetch_history_size,
                block_size,
            ),
            uops: UopArena::new(),
            capacity,
            // The first round-robin step lands on thread 0.
            cursors: StageCursors {
                fetch: threads - 1,
                decode: threads - 1,
                dispatch: threads - 1,
                issue: threads - 1,
                commit: threads - 1,
            },
            fetch_switch_when: 0,
            stats: CoreStats::default(),
            config,
        }
    }

    /// Runs one cycle: commit, writeback, issue, dispatch, decode, fetch.
    ///
    /// Returns the first thread found livelocked by commit, if any.
    pub fn cycle(&mut self, env: &mut CycleEnv<'_>) -> Option<usize> {
        let stalled = stages::commit::commit_stage(self, env);
        stages::writeback::writeback_stage(self, env);
        stages::issue::issue_stage(self, env);
        stages::dispatch::dispatch_stage(self, env);
        stages::decode::decode_stage(self, env);
        stages::fetch::fetch_stage(self, env);
        stalled
    }

    /// Returns true if `thread` has nothing left anywhere in the pipeline.
    pub fn pipeline_empty(&self, thread: usize) -> bool {
        let t = &self.threads[thread];
        t.fetch_queue.is_empty()
            && t.uop_queue.is_empty()
            && t.queues.is_empty()
            && self.rob.is_empty(thread)
            && self.event_queue.iter().all(|h| self.uops[h].thread != thread)
            && self.mem_inflight.iter().all(|&(_, h)| self.uops[h].thread != thread)
    }

    /// Instruction queue entries held by `thread` and by the whole core.
    pub fn iq_occupancy(&self, thread: usize) -> (usize, usize) {
        let core = self.threads.iter().map(|t| t.queues.iq.len()).sum();
        (self.threads[thread].queues.iq.len(), core)
    }

    /// Load/store queue entries held by `thread` and by the whole core.
    pub fn lsq_occupancy(&self, thread: usize) -> (usize, usize) {
        let core = self.threads.iter().map(|t| t.queues.lsq_len()).sum();
        (self.threads[thread].queues.lsq_len(), core)
    }

    /// Returns true if the register files can rename `uop` for `thread`.
    ///
    /// Private files compare the thread's allocated registers, shared files
    /// the sum over all threads of the core.
    pub fn can_rename(&self, thread: usize, uop: &Uop) -> bool {
        RegClass::ALL.iter().all(|&class| {
            let used = self.threads[thread].reg_file.allocated(class);
            let core_used = self
                .threads
                .iter()
                .map(|t| t.reg_file.allocated(class))
                .sum();
            self.capacity.rf[class.index()].admits(used, core_used, uop.demand.get(class))
        })
    }

    /// Frees the arena slot of `handle` if no container holds it any more.
    pub fn release(&mut self, handle: UopHandle) {
        let _ = self.uops.release_if_unqueued(handle);
    }

    /// Samples structure occupancy for the statistics.
    pub fn sample_occupancy(&mut self) {
        let config = Arc::clone(&self.config);
        let queues = &config.queues;
        let threads = self.threads.len();

        let rob_cap = self.rob.capacity();
        let iq_thread: Vec<usize> = self.threads.iter().map(|t| t.queues.iq.len()).collect();
        let iq_core: usize = iq_thread.iter().sum();
        let lsq_thread: Vec<usize> = self.threads.iter().map(|t| t.queues.lsq_len()).collect();
        let lsq_core: usize = lsq_thread.iter().sum();

        let shared = |kind: Sharing| kind == Sharing::Shared;
        if shared(queues.rob_kind) {
            self.stats.rob.sample(self.rob.occupancy(0), rob_cap);
        }
        if shared(queues.iq_kind) {
            self.stats.iq.sample(iq_core, self.capacity.iq.limit());
        }
        if shared(queues.lsq_kind) {
            self.stats.lsq.sample(lsq_core, self.capacity.lsq.limit());
        }
        if shared(config.reg_file.kind) {
            for class in RegClass::ALL {
                let used = self.threads.iter().map(|t| t.reg_file.allocated(class)).sum();
                self.stats.rf[class.index()].sample(used, self.capacity.rf[class.index()].limit());
            }
        }

        for t in 0..threads {
            let rob_len = self.rob.len(t);
            let thread = &mut self.threads[t];
            if !shared(queues.rob_kind) {
                thread.stats.rob.sample(rob_len, rob_cap);
            }
            if !shared(queues.iq_kind) {
                thread.stats.iq.sample(iq_thread[t], self.capacity.iq.limit());
            }
            if !shared(queues.lsq_kind) {
                thread.stats.lsq.sample(lsq_thread[t], self.capacity.lsq.limit());
            }
            if !shared(config.reg_file.kind) {
                for class in RegClass::ALL {
                    let used = thread.reg_file.allocated(class);
                    thread.stats.rf[class.index()].sample(used, thread.reg_file.size(class));
                }
            }
        }
    }

    /// Checks register-file integrity of every thread against its ROB entries.
    ///
    /// # Panics
    ///
    /// Panics on the first violated register-file invariant.
    pub fn check_integrity(&self) {
        for thread in &self.threads {
            let in_flight = self
                .uops
                .iter()
                .map(|(_, uop)| uop)
                .filter(|uop| uop.thread == thread.id && uop.membership.rob);
            thread.reg_file.check_integrity(in_flight);
        }
    }
}
