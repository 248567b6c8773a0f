//! Simulator: owns the CPU and its collaborators side by side.
//!
//! Each cycle the context scheduler runs first, then every core advances one
//! cycle against the functional model and the memory port. The run ends when
//! every context finished and left the CPU, when a configured limit is hit,
//! or when a thread stops committing for longer than the stall limit.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::common::SimError;
use crate::config::Config;
use crate::core::Cpu;
use crate::sim::scheduler::ContextScheduler;
use crate::sim::traits::{ContextStatus, FunctionalModel, MemoryPort};
use crate::stats::SimReport;

/// Why a run stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FinishReason {
    /// Every context finished and was evicted.
    ContextsFinished,
    /// `general.max_instructions` macro-instructions committed.
    MaxInstructions,
    /// `general.max_cycles` cycles simulated.
    MaxCycles,
    /// A running thread committed nothing for `general.commit_stall_limit` cycles.
    CommitStall {
        /// Core index.
        core: usize,
        /// Thread index within the core.
        thread: usize,
    },
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ContextsFinished => f.write_str("ContextsFinished"),
            Self::MaxInstructions => f.write_str("MaxInstructions"),
            Self::MaxCycles => f.write_str("MaxCycles"),
            Self::CommitStall { core, thread } => {
                write!(f, "CommitStall(core {core}, thread {thread})")
            }
        }
    }
}

/// Top-level simulator: CPU timing state plus functional model and memory.
#[derive(Debug)]
pub struct Simulator<M, P> {
    cpu: Cpu,
    model: M,
    memory: P,
    scheduler: ContextScheduler,
    finished: Option<FinishReason>,
}

impl<M: FunctionalModel, P: MemoryPort> Simulator<M, P> {
    /// Validates `config` and builds an idle CPU around `model` and `memory`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Config`] if the configuration is inconsistent.
    pub fn new(config: Config, model: M, memory: P) -> Result<Self, SimError> {
        config.validate()?;
        let cpu = Cpu::new(Arc::new(config), memory.block_size());
        let scheduler = ContextScheduler::new(&cpu);
        Ok(Self {
            cpu,
            model,
            memory,
            scheduler,
            finished: None,
        })
    }

    /// The simulated CPU.
    pub const fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    /// The functional model.
    pub const fn model(&self) -> &M {
        &self.model
    }

    /// The memory port.
    pub const fn memory(&self) -> &P {
        &self.memory
    }

    /// The context scheduler.
    pub const fn scheduler(&self) -> &ContextScheduler {
        &self.scheduler
    }

    /// Reason the run stopped, once it has.
    pub const fn finished(&self) -> Option<FinishReason> {
        self.finished
    }

    fn contexts_done(&self) -> bool {
        self.model
            .contexts()
            .iter()
            .all(|&ctx| self.model.status(ctx) == ContextStatus::Finished)
            && self.scheduler.is_empty()
            && self.cpu.idle()
    }

    /// Advances the simulation by one cycle.
    ///
    /// Returns the finish reason on the cycle the run ends; ticking a
    /// finished simulator does nothing.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::NoFreeNode`] if a runnable context cannot be placed
    /// without context switching.
    pub fn tick(&mut self) -> Result<Option<FinishReason>, SimError> {
        if self.finished.is_some() {
            return Ok(self.finished);
        }
        let now = self.cpu.cycle();
        self.scheduler.schedule(&mut self.cpu, &self.model, now)?;

        let stall = self.cpu.tick(&mut self.model, &mut self.memory);

        #[cfg(feature = "integrity-checks")]
        for core in self.cpu.cores() {
            core.check_integrity();
        }

        let general = &self.cpu.config().general;
        let reason = if let Some(stall) = stall {
            Some(FinishReason::CommitStall {
                core: stall.core,
                thread: stall.thread,
            })
        } else if general
            .max_instructions
            .is_some_and(|max| self.cpu.committed_macros() >= max)
        {
            Some(FinishReason::MaxInstructions)
        } else if general
            .max_cycles
            .is_some_and(|max| self.cpu.cycle() >= max)
        {
            Some(FinishReason::MaxCycles)
        } else if self.contexts_done() {
            Some(FinishReason::ContextsFinished)
        } else {
            None
        };
        self.finished = reason;
        Ok(reason)
    }

    /// Runs until a finish condition holds and returns the report.
    ///
    /// # Errors
    ///
    /// Propagates the errors of [`Simulator::tick`].
    pub fn run(&mut self) -> Result<SimReport, SimError> {
        let start = Instant::now();
        tracing::info!(
            cores = self.cpu.config().general.cores,
            threads = self.cpu.config().general.threads,
            contexts = self.model.contexts().len(),
            "simulation started"
        );
        let reason = loop {
            if let Some(reason) = self.tick()? {
                break reason;
            }
        };
        let host_seconds = start.elapsed().as_secs_f64();
        tracing::info!(
            %reason,
            cycles = self.cpu.cycle(),
            committed = self.cpu.committed_macros(),
            host_seconds,
            "simulation finished"
        );
        Ok(SimReport::collect(&self.cpu, reason.to_string(), host_seconds))
    }
}
