//! Hardware thread state.
//!
//! A thread owns everything in the pipeline that is never shared with the
//! other threads of its core: the fetch and uop queues, its issue-side
//! queues, its register file and rename tables, its branch predictor, and
//! its fetch cursor.

use std::collections::VecDeque;

use crate::common::{AccessId, RegClass};
use crate::config::Config;
use crate::core::pipeline::queues::ThreadQueues;
use crate::core::pipeline::reg_file::RegFile;
use crate::core::units::bru::BranchUnit;
use crate::core::uop::UopHandle;
use crate::stats::ThreadStats;

/// One hardware thread of a core.
#[derive(Clone, Debug)]
pub struct Thread {
    /// Index within the core.
    pub id: usize,
    /// Context allocated to this thread.
    pub ctx: Option<usize>,
    /// The context must leave once the pipeline drains.
    pub evict_signal: bool,

    /// Fetched micro-ops awaiting decode, in program order.
    pub fetch_queue: VecDeque<UopHandle>,
    /// Bytes of macro-instructions held by the fetch queue.
    pub fetch_queue_bytes: usize,
    /// Decoded micro-ops awaiting dispatch, in program order.
    pub uop_queue: VecDeque<UopHandle>,
    /// Issue-side queues.
    pub queues: ThreadQueues,
    /// Physical register file and RAT.
    pub reg_file: RegFile,
    /// Branch predictor, BTB, and RAS.
    pub bpred: BranchUnit,

    /// Address of the next instruction to fetch.
    pub fetch_neip: u64,
    /// Memory block most recently requested by fetch.
    pub fetch_block: Option<u64>,
    /// Instruction fetch access of `fetch_block`.
    pub fetch_access: Option<AccessId>,
    /// First cycle at which fetch may resume.
    pub fetch_resume_at: u64,

    /// Cycle of the last commit, or of the last cycle the context was not running.
    pub last_commit_cycle: u64,
    /// Counters.
    pub stats: ThreadStats,
}

impl Thread {
    /// Creates an idle thread with a fresh register file and predictor.
    pub fn new(id: usize, config: &Config) -> Self {
        let local = |class: RegClass| {
            config
                .reg_file
                .kind
                .capacity(config.reg_file.size(class), config.general.threads)
        };
        Self {
            id,
            ctx: None,
            evict_signal: false,
            fetch_queue: VecDeque::new(),
            fetch_queue_bytes: 0,
            uop_queue: VecDeque::with_capacity(config.queues.uop_queue_size),
            queues: ThreadQueues::default(),
            reg_file: RegFile::new(config.arch, RegClass::ALL.map(local)),
            bpred: BranchUnit::new(&config.branch_predictor),
            fetch_neip: 0,
            fetch_block: None,
            fetch_access: None,
            fetch_resume_at: 0,
            last_commit_cycle: 0,
            stats: ThreadStats::default(),
        }
    }

    /// Points fetch at a newly allocated context.
    pub fn allocate(&mut self, ctx: usize, fetch_neip: u64, now: u64) {
        assert!(
            self.ctx.is_none(),
            "thread {} already hosts context {:?}",
            self.id,
            self.ctx
        );
        self.ctx = Some(ctx);
        self.evict_signal = false;
        self.fetch_neip = fetch_neip;
        self.fetch_block = None;
        self.fetch_access = None;
        self.last_commit_cycle = now;
    }

    /// Detaches the allocated context. The pipeline must be empty.
    pub fn evict(&mut self) -> Option<usize> {
        self.evict_signal = false;
        self.fetch_block = None;
        self.fetch_access = None;
        self.ctx.take()
    }
}
