//! CPU Definition and Cycle Driver.
//!
//! The `Cpu` owns the cores of the simulated processor and the cycle
//! counter. Each cycle it advances every core through its stages, handing
//! the stages the functional model and the memory system through a
//! [`CycleEnv`].

/// Per-core state and stage orchestration.
pub mod core_state;

/// Hardware thread state.
pub mod thread;

pub use core_state::Core;

use std::sync::Arc;

use crate::config::Config;
use crate::core::pipeline::stages::CycleEnv;
use crate::sim::traits::{FunctionalModel, MemoryPort};

/// A core and thread found livelocked by the commit stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitStall {
    /// Core index.
    pub core: usize,
    /// Thread index within the core.
    pub thread: usize,
}

/// The simulated processor.
#[derive(Debug)]
pub struct Cpu {
    config: Arc<Config>,
    cores: Vec<Core>,
    cycle: u64,
    next_uop_id: u64,
}

impl Cpu {
    /// Creates a CPU with `config.general.cores` idle cores.
    ///
    /// `block_size` is the memory block size instruction fetch and the
    /// prefetch history operate on.
    pub fn new(config: Arc<Config>, block_size: u64) -> Self {
        let cores = (0..config.general.cores)
            .map(|id| Core::new(id, Arc::clone(&config), block_size))
            .collect();
        Self {
            config,
            cores,
            cycle: 0,
            next_uop_id: 0,
        }
    }

    /// Configuration the CPU was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Cores of the CPU.
    pub fn cores(&self) -> &[Core] {
        &self.cores
    }

    /// Mutable access to the cores, for context allocation.
    pub fn cores_mut(&mut self) -> &mut [Core] {
        &mut self.cores
    }

    /// Number of cycles simulated so far.
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Macro-instructions committed by every thread so far.
    pub fn committed_macros(&self) -> u64 {
        self.cores
            .iter()
            .flat_map(|core| &core.threads)
            .map(|thread| thread.stats.committed_macros)
            .sum()
    }

    /// Returns true if no hardware thread hosts a context.
    pub fn idle(&self) -> bool {
        self.cores
            .iter()
            .flat_map(|core| &core.threads)
            .all(|thread| thread.ctx.is_none())
    }

    /// Runs one cycle on every core.
    ///
    /// Returns the first livelocked thread reported by a commit stage.
    pub fn tick(
        &mut self,
        model: &mut dyn FunctionalModel,
        memory: &mut dyn MemoryPort,
    ) -> Option<CommitStall> {
        let now = self.cycle;
        let occupancy = self.config.general.occupancy_stats;
        let mut stall = None;
        memory.tick(now);
        for core in &mut self.cores {
            let mut env = CycleEnv {
                now,
                model: &mut *model,
                memory: &mut *memory,
                next_uop_id: &mut self.next_uop_id,
            };
            if let Some(thread) = core.cycle(&mut env) {
                let _ = stall.get_or_insert(CommitStall {
                    core: core.id,
                    thread,
                });
            }
            if occupancy {
                core.sample_occupancy();
            }
        }
        self.cycle += 1;
        stall
    }
}
