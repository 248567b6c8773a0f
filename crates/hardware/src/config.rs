//! Configuration system for the timing simulator.
//!
//! This module defines all configuration structures and enums used to parameterize
//! the simulator. It provides:
//! 1. **Defaults:** Baseline sizes, widths, latencies, and predictor geometry.
//! 2. **Structures:** Hierarchical config for general, pipeline, queues, register
//!    files, functional units, branch predictor, and architectural layout.
//! 3. **Enums:** Sharing kinds, per-stage thread-selection policies, recovery
//!    point, and branch predictor types.
//! 4. **Validation:** `Config::validate`, run once before the first cycle.
//!
//! The configuration is immutable once the simulator is built; every component
//! reads it through a shared reference.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::common::{ArchLayout, ConfigError, RegClass};
use crate::common::constants::FU_RES_MAX;
use crate::core::units::fu::{FuClass, FuParams};

/// Default configuration constants for the simulator.
///
/// These values define the baseline machine when a field is not explicitly
/// overridden in the JSON configuration.
mod defaults {
    /// Number of cores.
    pub const CORES: usize = 1;

    /// Hardware threads per core.
    pub const THREADS: usize = 1;

    /// Cycles a context may stay allocated before it can be evicted.
    pub const CONTEXT_QUANTUM: u64 = 100_000;

    /// Cycles a thread keeps fetch under the switch-on-event policy.
    pub const THREAD_QUANTUM: u64 = 1000;

    /// Cycles fetch stays idle after a thread switch.
    pub const THREAD_SWITCH_PENALTY: u64 = 0;

    /// Extra cycles fetch stays stalled after a misprediction recovery.
    pub const RECOVER_PENALTY: u64 = 0;

    /// Number of recently prefetched blocks remembered per core.
    pub const PREFETCH_HISTORY_SIZE: usize = 10;

    /// Cycles without a commit after which a running thread counts as livelocked.
    pub const COMMIT_STALL_LIMIT: u64 = 1_000_000;

    /// Micro-ops decoded, dispatched, issued, or committed per cycle.
    pub const STAGE_WIDTH: usize = 4;

    /// Fetch queue capacity in bytes of macro-instructions.
    pub const FETCH_QUEUE_SIZE: usize = 64;

    /// Decoded micro-op queue capacity.
    pub const UOP_QUEUE_SIZE: usize = 32;

    /// Reorder buffer entries per thread.
    pub const ROB_SIZE: usize = 64;

    /// Instruction queue entries per thread.
    pub const IQ_SIZE: usize = 40;

    /// Load/store/prefetch queue entries per thread.
    pub const LSQ_SIZE: usize = 20;

    /// Integer physical registers per thread.
    pub const RF_INT_SIZE: usize = 80;

    /// Floating-point physical registers per thread.
    pub const RF_FP_SIZE: usize = 40;

    /// XMM physical registers per thread.
    pub const RF_XMM_SIZE: usize = 40;

    /// BTB sets.
    pub const BTB_SETS: usize = 256;

    /// BTB ways per set.
    pub const BTB_ASSOC: usize = 4;

    /// Return address stack entries.
    pub const RAS_SIZE: usize = 32;

    /// Bimodal counter table entries.
    pub const BIMOD_SIZE: usize = 1024;

    /// Choice counter table entries.
    pub const CHOICE_SIZE: usize = 1024;

    /// Two-level predictor BHT entries.
    pub const TWOLEVEL_L1_SIZE: usize = 1;

    /// Two-level predictor PHT columns.
    pub const TWOLEVEL_L2_SIZE: usize = 1024;

    /// Two-level predictor history bits.
    pub const TWOLEVEL_HISTORY_SIZE: u32 = 8;

    /// Fetch block size of the reference memory port, in bytes.
    pub const MEM_BLOCK_SIZE: u64 = 64;

    /// Instruction fetch latency of the reference memory port.
    pub const MEM_FETCH_LATENCY: u64 = 1;

    /// Load and prefetch latency of the reference memory port.
    pub const MEM_LOAD_LATENCY: u64 = 3;

    /// Store latency of the reference memory port.
    pub const MEM_STORE_LATENCY: u64 = 1;

    /// Accesses the reference memory port accepts per core and cycle.
    pub const MEM_PORTS: usize = 2;
}

/// Whether a resource pool is partitioned per thread or shared by a core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Sharing {
    /// Each thread owns a pool of the configured size.
    #[default]
    Private,
    /// All threads of a core draw from one pool of size × threads.
    Shared,
}

impl Sharing {
    /// Capacity a single admission check compares against.
    ///
    /// Private pools hold `size` entries per thread; shared pools hold
    /// `size * threads` entries for the whole core.
    #[inline]
    pub const fn capacity(self, size: usize, threads: usize) -> usize {
        match self {
            Self::Private => size,
            Self::Shared => size * threads,
        }
    }
}

/// How a pipeline stage divides its width among the threads of a core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum SharingPolicy {
    /// Width is pulled from all threads round-robin within one cycle.
    Shared,
    /// One thread receives the whole width each cycle.
    #[default]
    TimeSlice,
}

/// Thread selection policy of the fetch stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum FetchKind {
    /// Every eligible thread fetches each cycle.
    Shared,
    /// One eligible thread fetches per cycle, round-robin.
    #[default]
    TimeSlice,
    /// One thread fetches until its quantum expires or it stalls on a long-latency event.
    SwitchOnEvent,
}

/// Pipeline point at which a mispredicted branch triggers recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum RecoverKind {
    /// As soon as the branch writes back.
    #[default]
    Writeback,
    /// When the branch commits.
    Commit,
}

/// Branch prediction algorithm types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum BranchPredictorKind {
    /// Oracle: direction and target always correct.
    Perfect,
    /// Every branch predicted taken.
    Taken,
    /// Every conditional branch predicted not taken.
    NotTaken,
    /// Table of 2-bit counters indexed by address.
    Bimodal,
    /// Two-level adaptive predictor.
    #[default]
    TwoLevel,
    /// Bimodal and two-level combined through a choice table.
    Combined,
}

/// Root configuration structure containing all simulator settings.
///
/// # Examples
///
/// Creating a default configuration:
///
/// ```
/// use o3sim_core::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.queues.rob_size, 64);
/// assert!(config.validate().is_ok());
/// ```
///
/// Deserializing from JSON; omitted fields keep their defaults:
///
/// ```
/// use o3sim_core::config::{Config, FetchKind, Sharing};
///
/// let json = r#"{
///     "general": { "cores": 2, "threads": 2 },
///     "pipeline": { "fetch_kind": "SwitchOnEvent" },
///     "queues": { "rob_kind": "Shared", "rob_size": 32 },
///     "functional_units": { "IntDiv": { "count": 2, "op_lat": 16, "issue_lat": 8 } }
/// }"#;
///
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.general.threads, 2);
/// assert_eq!(config.pipeline.fetch_kind, FetchKind::SwitchOnEvent);
/// assert_eq!(config.queues.rob_kind, Sharing::Shared);
/// assert_eq!(config.pipeline.decode_width, 4);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Machine size, context scheduling, recovery, and run limits.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Stage widths and thread-selection policies.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Queue capacities and sharing.
    #[serde(default)]
    pub queues: QueueConfig,
    /// Physical register file sizes and sharing.
    #[serde(default)]
    pub reg_file: RegFileConfig,
    /// Functional unit overrides.
    #[serde(default)]
    pub functional_units: FunctionalUnitsConfig,
    /// Branch predictor type and geometry.
    #[serde(default)]
    pub branch_predictor: BranchPredictorConfig,
    /// Architectural register layout of the decoder.
    #[serde(default)]
    pub arch: ArchLayout,
    /// Reference memory port used by the command-line driver.
    #[serde(default)]
    pub memory: MemoryConfig,
}

impl Config {
    /// Parses and validates a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for malformed documents and any error of
    /// [`Config::validate`] for inconsistent values.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every parameter before the simulator is built.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint: zero sizes or widths, table sizes
    /// that are not powers of two, out-of-range functional unit or history
    /// parameters, or register files smaller than the logical register count
    /// plus the outputs of one micro-op.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let g = &self.general;
        let p = &self.pipeline;
        let q = &self.queues;
        let b = &self.branch_predictor;

        for (field, value) in [
            ("general.cores", g.cores),
            ("general.threads", g.threads),
            ("pipeline.decode_width", p.decode_width),
            ("pipeline.dispatch_width", p.dispatch_width),
            ("pipeline.issue_width", p.issue_width),
            ("pipeline.commit_width", p.commit_width),
            ("queues.fetch_queue_size", q.fetch_queue_size),
            ("queues.uop_queue_size", q.uop_queue_size),
            ("queues.rob_size", q.rob_size),
            ("queues.iq_size", q.iq_size),
            ("queues.lsq_size", q.lsq_size),
            ("general.prefetch_history_size", g.prefetch_history_size),
            ("branch_predictor.btb_assoc", b.btb_assoc),
            ("branch_predictor.ras_size", b.ras_size),
            ("memory.ports", self.memory.ports),
        ] {
            if value == 0 {
                return Err(ConfigError::Zero { field });
            }
        }
        if g.context_quantum == 0 {
            return Err(ConfigError::Zero {
                field: "general.context_quantum",
            });
        }
        if g.thread_quantum == 0 {
            return Err(ConfigError::Zero {
                field: "general.thread_quantum",
            });
        }

        for (field, value) in [
            ("branch_predictor.btb_sets", b.btb_sets),
            ("branch_predictor.bimod_size", b.bimod_size),
            ("branch_predictor.choice_size", b.choice_size),
            ("branch_predictor.twolevel_l1_size", b.twolevel_l1_size),
            ("branch_predictor.twolevel_l2_size", b.twolevel_l2_size),
        ] {
            if !value.is_power_of_two() {
                return Err(ConfigError::NotPowerOfTwo { field, value });
            }
        }
        if !self.memory.block_size.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo {
                field: "memory.block_size",
                value: self.memory.block_size as usize,
            });
        }
        if !(1..=30).contains(&b.twolevel_history_size) {
            return Err(ConfigError::OutOfRange {
                field: "branch_predictor.twolevel_history_size",
                value: u64::from(b.twolevel_history_size),
                min: 1,
                max: 30,
            });
        }

        for class in RegClass::ALL {
            let size = self.reg_file.size(class);
            let min = self.arch.min_phys_size(class);
            if size < min {
                return Err(ConfigError::RegisterFileTooSmall { class, size, min });
            }
        }
        if self.arch.flag_regs > 0 && self.arch.int_regs == 0 {
            return Err(ConfigError::Zero {
                field: "arch.int_regs",
            });
        }

        for class in FuClass::ALL {
            let params = self.functional_units.params(class);
            if !(1..=FU_RES_MAX).contains(&params.count) {
                return Err(ConfigError::OutOfRange {
                    field: "functional_units.count",
                    value: params.count as u64,
                    min: 1,
                    max: FU_RES_MAX as u64,
                });
            }
            if params.op_lat == 0 {
                return Err(ConfigError::Zero {
                    field: "functional_units.op_lat",
                });
            }
            if params.issue_lat == 0 {
                return Err(ConfigError::Zero {
                    field: "functional_units.issue_lat",
                });
            }
        }
        Ok(())
    }
}

/// General simulation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Number of cores.
    #[serde(default = "GeneralConfig::default_cores")]
    pub cores: usize,

    /// Hardware threads per core.
    #[serde(default = "GeneralConfig::default_threads")]
    pub threads: usize,

    /// Enables the dynamic (quantum-based) context scheduler.
    ///
    /// When disabled, contexts are allocated once and it is an error to have
    /// more runnable contexts than hardware threads.
    #[serde(default = "GeneralConfig::default_context_switch")]
    pub context_switch: bool,

    /// Cycles after which the oldest allocated context may be evicted.
    #[serde(default = "GeneralConfig::default_context_quantum")]
    pub context_quantum: u64,

    /// Cycles a thread keeps fetch under the switch-on-event policy.
    #[serde(default = "GeneralConfig::default_thread_quantum")]
    pub thread_quantum: u64,

    /// Cycles fetch stays idle after a switch-on-event thread switch.
    #[serde(default)]
    pub thread_switch_penalty: u64,

    /// Pipeline point where mispredictions are recovered.
    #[serde(default)]
    pub recover_kind: RecoverKind,

    /// Cycles fetch stays stalled after a recovery.
    #[serde(default)]
    pub recover_penalty: u64,

    /// Recently prefetched blocks remembered to drop redundant prefetches.
    #[serde(default = "GeneralConfig::default_prefetch_history_size")]
    pub prefetch_history_size: usize,

    /// Keeps prefetch micro-ops produced by decode; they are dropped otherwise.
    #[serde(default = "GeneralConfig::default_process_prefetch_hints")]
    pub process_prefetch_hints: bool,

    /// Cycles without a commit before a running thread ends the run as livelocked.
    #[serde(default = "GeneralConfig::default_commit_stall_limit")]
    pub commit_stall_limit: u64,

    /// Stop after this many committed macro-instructions.
    #[serde(default)]
    pub max_instructions: Option<u64>,

    /// Stop after this many cycles.
    #[serde(default)]
    pub max_cycles: Option<u64>,

    /// Sample structure occupancy every cycle.
    #[serde(default)]
    pub occupancy_stats: bool,
}

impl GeneralConfig {
    const fn default_cores() -> usize {
        defaults::CORES
    }

    const fn default_threads() -> usize {
        defaults::THREADS
    }

    const fn default_context_switch() -> bool {
        true
    }

    const fn default_context_quantum() -> u64 {
        defaults::CONTEXT_QUANTUM
    }

    const fn default_thread_quantum() -> u64 {
        defaults::THREAD_QUANTUM
    }

    const fn default_prefetch_history_size() -> usize {
        defaults::PREFETCH_HISTORY_SIZE
    }

    const fn default_process_prefetch_hints() -> bool {
        true
    }

    const fn default_commit_stall_limit() -> u64 {
        defaults::COMMIT_STALL_LIMIT
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cores: defaults::CORES,
            threads: defaults::THREADS,
            context_switch: true,
            context_quantum: defaults::CONTEXT_QUANTUM,
            thread_quantum: defaults::THREAD_QUANTUM,
            thread_switch_penalty: defaults::THREAD_SWITCH_PENALTY,
            recover_kind: RecoverKind::default(),
            recover_penalty: defaults::RECOVER_PENALTY,
            prefetch_history_size: defaults::PREFETCH_HISTORY_SIZE,
            process_prefetch_hints: true,
            commit_stall_limit: defaults::COMMIT_STALL_LIMIT,
            max_instructions: None,
            max_cycles: None,
            occupancy_stats: false,
        }
    }
}

/// Stage widths and thread-selection policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Fetch thread-selection policy.
    #[serde(default)]
    pub fetch_kind: FetchKind,
    /// Macro-instructions decoded per cycle.
    #[serde(default = "PipelineConfig::default_width")]
    pub decode_width: usize,
    /// Dispatch thread-selection policy.
    #[serde(default)]
    pub dispatch_kind: SharingPolicy,
    /// Micro-ops dispatched per cycle.
    #[serde(default = "PipelineConfig::default_width")]
    pub dispatch_width: usize,
    /// Issue thread-selection policy.
    #[serde(default)]
    pub issue_kind: SharingPolicy,
    /// Micro-ops issued per cycle.
    #[serde(default = "PipelineConfig::default_width")]
    pub issue_width: usize,
    /// Commit thread-selection policy.
    #[serde(default = "PipelineConfig::default_commit_kind")]
    pub commit_kind: SharingPolicy,
    /// Micro-ops committed per cycle.
    #[serde(default = "PipelineConfig::default_width")]
    pub commit_width: usize,
}

impl PipelineConfig {
    const fn default_width() -> usize {
        defaults::STAGE_WIDTH
    }

    const fn default_commit_kind() -> SharingPolicy {
        SharingPolicy::Shared
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch_kind: FetchKind::default(),
            decode_width: defaults::STAGE_WIDTH,
            dispatch_kind: SharingPolicy::default(),
            dispatch_width: defaults::STAGE_WIDTH,
            issue_kind: SharingPolicy::default(),
            issue_width: defaults::STAGE_WIDTH,
            commit_kind: SharingPolicy::Shared,
            commit_width: defaults::STAGE_WIDTH,
        }
    }
}

/// Queue capacities and sharing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Fetch queue capacity in bytes.
    #[serde(default = "QueueConfig::default_fetch_queue_size")]
    pub fetch_queue_size: usize,
    /// Decoded micro-op queue capacity.
    #[serde(default = "QueueConfig::default_uop_queue_size")]
    pub uop_queue_size: usize,
    /// Reorder buffer sharing.
    #[serde(default)]
    pub rob_kind: Sharing,
    /// Reorder buffer entries per thread.
    #[serde(default = "QueueConfig::default_rob_size")]
    pub rob_size: usize,
    /// Instruction queue sharing.
    #[serde(default)]
    pub iq_kind: Sharing,
    /// Instruction queue entries per thread.
    #[serde(default = "QueueConfig::default_iq_size")]
    pub iq_size: usize,
    /// Load/store queue sharing.
    #[serde(default)]
    pub lsq_kind: Sharing,
    /// Load/store/prefetch queue entries per thread.
    #[serde(default = "QueueConfig::default_lsq_size")]
    pub lsq_size: usize,
}

impl QueueConfig {
    const fn default_fetch_queue_size() -> usize {
        defaults::FETCH_QUEUE_SIZE
    }

    const fn default_uop_queue_size() -> usize {
        defaults::UOP_QUEUE_SIZE
    }

    const fn default_rob_size() -> usize {
        defaults::ROB_SIZE
    }

    const fn default_iq_size() -> usize {
        defaults::IQ_SIZE
    }

    const fn default_lsq_size() -> usize {
        defaults::LSQ_SIZE
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            fetch_queue_size: defaults::FETCH_QUEUE_SIZE,
            uop_queue_size: defaults::UOP_QUEUE_SIZE,
            rob_kind: Sharing::Private,
            rob_size: defaults::ROB_SIZE,
            iq_kind: Sharing::Private,
            iq_size: defaults::IQ_SIZE,
            lsq_kind: Sharing::Private,
            lsq_size: defaults::LSQ_SIZE,
        }
    }
}

/// Physical register file sizes and sharing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegFileConfig {
    /// Register file sharing.
    #[serde(default)]
    pub kind: Sharing,
    /// Integer physical registers per thread.
    #[serde(default = "RegFileConfig::default_int_size")]
    pub int_size: usize,
    /// Floating-point physical registers per thread.
    #[serde(default = "RegFileConfig::default_fp_size")]
    pub fp_size: usize,
    /// XMM physical registers per thread.
    #[serde(default = "RegFileConfig::default_xmm_size")]
    pub xmm_size: usize,
}

impl RegFileConfig {
    const fn default_int_size() -> usize {
        defaults::RF_INT_SIZE
    }

    const fn default_fp_size() -> usize {
        defaults::RF_FP_SIZE
    }

    const fn default_xmm_size() -> usize {
        defaults::RF_XMM_SIZE
    }

    /// Configured per-thread size of a class.
    pub const fn size(&self, class: RegClass) -> usize {
        match class {
            RegClass::Int => self.int_size,
            RegClass::Fp => self.fp_size,
            RegClass::Xmm => self.xmm_size,
        }
    }
}

impl Default for RegFileConfig {
    fn default() -> Self {
        Self {
            kind: Sharing::Private,
            int_size: defaults::RF_INT_SIZE,
            fp_size: defaults::RF_FP_SIZE,
            xmm_size: defaults::RF_XMM_SIZE,
        }
    }
}

/// Functional unit overrides keyed by class.
///
/// Classes without an entry use [`FuClass::default_params`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunctionalUnitsConfig(pub BTreeMap<FuClass, FuParams>);

impl FunctionalUnitsConfig {
    /// Parameters in effect for a class.
    pub fn params(&self, class: FuClass) -> FuParams {
        self.0
            .get(&class)
            .copied()
            .unwrap_or_else(|| class.default_params())
    }
}

/// Branch predictor type and geometry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchPredictorConfig {
    /// Prediction algorithm.
    #[serde(default)]
    pub kind: BranchPredictorKind,
    /// BTB sets (power of two).
    #[serde(default = "BranchPredictorConfig::default_btb_sets")]
    pub btb_sets: usize,
    /// BTB ways per set.
    #[serde(default = "BranchPredictorConfig::default_btb_assoc")]
    pub btb_assoc: usize,
    /// Return address stack entries.
    #[serde(default = "BranchPredictorConfig::default_ras_size")]
    pub ras_size: usize,
    /// Bimodal counters (power of two).
    #[serde(default = "BranchPredictorConfig::default_bimod_size")]
    pub bimod_size: usize,
    /// Choice counters (power of two).
    #[serde(default = "BranchPredictorConfig::default_choice_size")]
    pub choice_size: usize,
    /// Two-level BHT entries (power of two).
    #[serde(default = "BranchPredictorConfig::default_twolevel_l1_size")]
    pub twolevel_l1_size: usize,
    /// Two-level PHT columns (power of two).
    #[serde(default = "BranchPredictorConfig::default_twolevel_l2_size")]
    pub twolevel_l2_size: usize,
    /// Two-level history bits, 1 to 30.
    #[serde(default = "BranchPredictorConfig::default_twolevel_history_size")]
    pub twolevel_history_size: u32,
}

impl BranchPredictorConfig {
    const fn default_btb_sets() -> usize {
        defaults::BTB_SETS
    }

    const fn default_btb_assoc() -> usize {
        defaults::BTB_ASSOC
    }

    const fn default_ras_size() -> usize {
        defaults::RAS_SIZE
    }

    const fn default_bimod_size() -> usize {
        defaults::BIMOD_SIZE
    }

    const fn default_choice_size() -> usize {
        defaults::CHOICE_SIZE
    }

    const fn default_twolevel_l1_size() -> usize {
        defaults::TWOLEVEL_L1_SIZE
    }

    const fn default_twolevel_l2_size() -> usize {
        defaults::TWOLEVEL_L2_SIZE
    }

    const fn default_twolevel_history_size() -> u32 {
        defaults::TWOLEVEL_HISTORY_SIZE
    }
}

impl Default for BranchPredictorConfig {
    fn default() -> Self {
        Self {
            kind: BranchPredictorKind::default(),
            btb_sets: defaults::BTB_SETS,
            btb_assoc: defaults::BTB_ASSOC,
            ras_size: defaults::RAS_SIZE,
            bimod_size: defaults::BIMOD_SIZE,
            choice_size: defaults::CHOICE_SIZE,
            twolevel_l1_size: defaults::TWOLEVEL_L1_SIZE,
            twolevel_l2_size: defaults::TWOLEVEL_L2_SIZE,
            twolevel_history_size: defaults::TWOLEVEL_HISTORY_SIZE,
        }
    }
}

/// Fixed-latency memory port parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Fetch block size in bytes (power of two).
    #[serde(default = "MemoryConfig::default_block_size")]
    pub block_size: u64,
    /// Instruction fetch latency in cycles.
    #[serde(default = "MemoryConfig::default_fetch_latency")]
    pub fetch_latency: u64,
    /// Load latency in cycles.
    #[serde(default = "MemoryConfig::default_load_latency")]
    pub load_latency: u64,
    /// Store latency in cycles.
    #[serde(default = "MemoryConfig::default_store_latency")]
    pub store_latency: u64,
    /// Prefetch latency in cycles.
    #[serde(default = "MemoryConfig::default_load_latency")]
    pub prefetch_latency: u64,
    /// Accesses accepted per core and cycle.
    #[serde(default = "MemoryConfig::default_ports")]
    pub ports: usize,
}

impl MemoryConfig {
    const fn default_block_size() -> u64 {
        defaults::MEM_BLOCK_SIZE
    }

    const fn default_fetch_latency() -> u64 {
        defaults::MEM_FETCH_LATENCY
    }

    const fn default_load_latency() -> u64 {
        defaults::MEM_LOAD_LATENCY
    }

    const fn default_store_latency() -> u64 {
        defaults::MEM_STORE_LATENCY
    }

    const fn default_ports() -> usize {
        defaults::MEM_PORTS
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            block_size: defaults::MEM_BLOCK_SIZE,
            fetch_latency: defaults::MEM_FETCH_LATENCY,
            load_latency: defaults::MEM_LOAD_LATENCY,
            store_latency: defaults::MEM_STORE_LATENCY,
            prefetch_latency: defaults::MEM_LOAD_LATENCY,
            ports: defaults::MEM_PORTS,
        }
    }
}
