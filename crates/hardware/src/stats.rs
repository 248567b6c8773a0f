//! Simulation statistics collection and reporting.
//!
//! This module tracks the counters the pipeline exposes to reporting. It provides:
//! 1. **Micro-op counts:** Dispatched, issued, and committed micro-ops by opcode
//!    and by category (integer, floating point, XMM, memory, control).
//! 2. **Dispatch slots:** Every dispatch slot of every cycle, attributed to
//!    useful work, speculative work, or the reason it stayed empty.
//! 3. **Branch prediction:** Committed branches, mispredictions, BTB accesses.
//! 4. **Structures:** Accumulated occupancy, full cycles, reads and writes of
//!    the ROB, IQ, LSQ, and register files.
//! 5. **Report:** [`SimReport`], serializable with serde and printable as a
//!    sectioned text report.
//!
//! Counters are written by the stages and never read back by them.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::common::RegClass;
use crate::config::Sharing;
use crate::core::Cpu;
use crate::core::pipeline::reg_file::RegClassStats;
use crate::core::units::fu::{FuClass, FuClassStats};
use crate::core::uop::Opcode;

/// Section names for selective stats output.
///
/// Valid section identifiers: `"summary"`, `"stages"`, `"dispatch"`, `"branch"`,
/// `"structures"`, `"functional_units"`. Pass an empty slice to
/// [`SimReport::print_sections`] to print all sections.
pub const STATS_SECTIONS: &[&str] = &[
    "summary",
    "stages",
    "dispatch",
    "branch",
    "structures",
    "functional_units",
];

/// Micro-op counts of one pipeline stage.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UopCounts {
    /// All micro-ops.
    pub total: u64,
    /// Integer, logic, and move micro-ops.
    pub integer: u64,
    /// Floating-point stack micro-ops.
    pub fp: u64,
    /// XMM micro-ops.
    pub xmm: u64,
    /// Loads, stores, and prefetches.
    pub memory: u64,
    /// Calls, returns, jumps, and branches.
    pub ctrl: u64,
    /// Per-opcode breakdown.
    pub by_opcode: BTreeMap<Opcode, u64>,
}

impl UopCounts {
    /// Counts one micro-op.
    pub fn record(&mut self, opcode: Opcode) {
        self.total += 1;
        *self.by_opcode.entry(opcode).or_default() += 1;
        let category = if opcode.is_mem() {
            &mut self.memory
        } else if opcode.is_ctrl() {
            &mut self.ctrl
        } else {
            match opcode.fu_class() {
                Some(class) if class >= FuClass::XmmIntAdd => &mut self.xmm,
                Some(class) if class >= FuClass::FpSimple => &mut self.fp,
                _ if matches!(opcode, Opcode::FpPush | Opcode::FpPop) => &mut self.fp,
                _ => &mut self.integer,
            }
        };
        *category += 1;
    }

    /// Adds another set of counts into this one.
    pub fn merge(&mut self, other: &Self) {
        self.total += other.total;
        self.integer += other.integer;
        self.fp += other.fp;
        self.xmm += other.xmm;
        self.memory += other.memory;
        self.ctrl += other.ctrl;
        for (opcode, count) in &other.by_opcode {
            *self.by_opcode.entry(*opcode).or_default() += count;
        }
    }
}

/// Fate of one dispatch slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStall {
    /// A correct-path micro-op was dispatched.
    Used,
    /// A wrong-path micro-op was dispatched.
    Spec,
    /// The uop queue was empty.
    UopQueue,
    /// The ROB was full.
    Rob,
    /// The instruction queue was full.
    Iq,
    /// The load/store queue was full.
    Lsq,
    /// Not enough free physical registers.
    Rename,
    /// No context allocated to the thread.
    Ctx,
}

impl DispatchStall {
    /// All slot fates in report order.
    pub const ALL: [Self; 8] = [
        Self::Used,
        Self::Spec,
        Self::UopQueue,
        Self::Rob,
        Self::Iq,
        Self::Lsq,
        Self::Rename,
        Self::Ctx,
    ];

    /// Short name used in the text report.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Used => "used",
            Self::Spec => "spec",
            Self::UopQueue => "uop_queue",
            Self::Rob => "rob",
            Self::Iq => "iq",
            Self::Lsq => "lsq",
            Self::Rename => "rename",
            Self::Ctx => "ctx",
        }
    }
}

/// Dispatch slots per fate. Over a run they sum to `cycles * dispatch_width`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DispatchStats(BTreeMap<DispatchStall, u64>);

impl DispatchStats {
    /// Attributes `slots` dispatch slots to `fate`.
    pub fn record(&mut self, fate: DispatchStall, slots: u64) {
        if slots > 0 {
            *self.0.entry(fate).or_default() += slots;
        }
    }

    /// Slots attributed to `fate`.
    pub fn get(&self, fate: DispatchStall) -> u64 {
        self.0.get(&fate).copied().unwrap_or(0)
    }

    /// All slots accounted so far.
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }
}

/// Branch prediction counters of one thread.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BranchStats {
    /// Committed control micro-ops.
    pub branches: u64,
    /// Committed control micro-ops whose predicted next address was wrong.
    pub mispredicted: u64,
    /// BTB lookups at fetch.
    pub btb_reads: u64,
    /// BTB updates at commit.
    pub btb_writes: u64,
}

impl BranchStats {
    /// Fraction of committed branches predicted correctly, in percent.
    pub fn accuracy(&self) -> f64 {
        if self.branches == 0 {
            return 0.0;
        }
        100.0 * (self.branches - self.mispredicted) as f64 / self.branches as f64
    }
}

/// Occupancy and access counters of one bounded structure.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StructStats {
    /// Capacity the occupancy is measured against.
    pub size: usize,
    /// Occupancy summed over sampled cycles.
    pub occupancy: u64,
    /// Sampled cycles in which the structure was full.
    pub full: u64,
    /// Entries read out of the structure.
    pub reads: u64,
    /// Entries written into the structure.
    pub writes: u64,
}

impl StructStats {
    /// Adds one cycle sample.
    pub fn sample(&mut self, occupied: usize, size: usize) {
        self.size = size;
        self.occupancy += occupied as u64;
        if occupied >= size {
            self.full += 1;
        }
    }

    /// Mean occupancy over `cycles`.
    pub fn average(&self, cycles: u64) -> f64 {
        if cycles == 0 {
            0.0
        } else {
            self.occupancy as f64 / cycles as f64
        }
    }

    fn merge_accesses(&mut self, other: &Self) {
        self.reads += other.reads;
        self.writes += other.writes;
    }
}

/// Counters of one hardware thread.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ThreadStats {
    /// Micro-ops created by fetch.
    pub fetched: u64,
    /// Micro-ops dispatched.
    pub dispatched: UopCounts,
    /// Micro-ops issued.
    pub issued: UopCounts,
    /// Micro-ops committed.
    pub committed: UopCounts,
    /// Macro-instructions committed.
    pub committed_macros: u64,
    /// Micro-ops squashed by recovery.
    pub squashed: u64,
    /// Recoveries performed.
    pub recoveries: u64,
    /// Branch prediction counters.
    pub branch: BranchStats,
    /// Reorder buffer.
    pub rob: StructStats,
    /// Instruction queue.
    pub iq: StructStats,
    /// Load/store queue.
    pub lsq: StructStats,
    /// Register files, indexed by [`RegClass::index`].
    pub rf: [StructStats; 3],
}

/// Counters of one core that are not attributable to a single thread.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CoreStats {
    /// Dispatch slot accounting.
    pub dispatch: DispatchStats,
    /// Shared ROB occupancy.
    pub rob: StructStats,
    /// Shared instruction queue occupancy.
    pub iq: StructStats,
    /// Shared load/store queue occupancy.
    pub lsq: StructStats,
    /// Shared register file occupancy, indexed by [`RegClass::index`].
    pub rf: [StructStats; 3],
}

/// Report of one hardware thread.
#[derive(Clone, Debug, Serialize)]
pub struct ThreadReport {
    /// Thread index within its core.
    pub thread: usize,
    /// Thread counters.
    pub stats: ThreadStats,
    /// Register file access counters per class name.
    pub reg_file: BTreeMap<&'static str, RegClassStats>,
}

/// Report of one core.
#[derive(Clone, Debug, Serialize)]
pub struct CoreReport {
    /// Core index.
    pub core: usize,
    /// Dispatch slot accounting.
    pub dispatch: DispatchStats,
    /// Committed micro-ops of all threads.
    pub committed: UopCounts,
    /// ROB counters, core-wide.
    pub rob: StructStats,
    /// IQ counters, core-wide.
    pub iq: StructStats,
    /// LSQ counters, core-wide.
    pub lsq: StructStats,
    /// Register file counters, core-wide, per class name.
    pub rf: BTreeMap<&'static str, StructStats>,
    /// Functional unit usage per class.
    pub functional_units: BTreeMap<FuClass, FuClassStats>,
    /// Per-thread reports.
    pub threads: Vec<ThreadReport>,
}

/// Statistics of a whole run.
#[derive(Clone, Debug, Serialize)]
pub struct SimReport {
    /// Why the run ended.
    pub finish_reason: String,
    /// Wall-clock time spent simulating.
    pub host_seconds: f64,
    /// Simulated cycles.
    pub cycles: u64,
    /// Committed micro-ops.
    pub committed_uops: u64,
    /// Committed macro-instructions.
    pub committed_macros: u64,
    /// Committed micro-ops per cycle.
    pub uop_ipc: f64,
    /// Committed macro-instructions per cycle.
    pub ipc: f64,
    /// Branch prediction counters of all threads.
    pub branch: BranchStats,
    /// Per-core reports.
    pub cores: Vec<CoreReport>,
}

fn sum_structs(
    kind: Sharing,
    core: &StructStats,
    threads: impl Iterator<Item = StructStats>,
) -> StructStats {
    let mut total = match kind {
        Sharing::Shared => StructStats {
            reads: 0,
            writes: 0,
            ..*core
        },
        Sharing::Private => StructStats::default(),
    };
    for stats in threads {
        if kind == Sharing::Private {
            total.size += stats.size;
            total.occupancy += stats.occupancy;
            total.full += stats.full;
        }
        total.merge_accesses(&stats);
    }
    total
}

impl SimReport {
    /// Collects the counters of every core and thread of `cpu`.
    pub fn collect(cpu: &Cpu, finish_reason: String, host_seconds: f64) -> Self {
        let config = cpu.config();
        let mut branch = BranchStats::default();
        let mut committed_uops = 0;
        let mut committed_macros = 0;

        let cores = cpu
            .cores()
            .iter()
            .map(|core| {
                let threads: Vec<ThreadReport> = core
                    .threads
                    .iter()
                    .map(|thread| ThreadReport {
                        thread: thread.id,
                        stats: thread.stats.clone(),
                        reg_file: RegClass::ALL
                            .iter()
                            .map(|&class| (class.name(), thread.reg_file.stats(class)))
                            .collect(),
                    })
                    .collect();

                let mut committed = UopCounts::default();
                for t in &threads {
                    committed.merge(&t.stats.committed);
                    committed_macros += t.stats.committed_macros;
                    branch.branches += t.stats.branch.branches;
                    branch.mispredicted += t.stats.branch.mispredicted;
                    branch.btb_reads += t.stats.branch.btb_reads;
                    branch.btb_writes += t.stats.branch.btb_writes;
                }
                committed_uops += committed.total;

                let queues = &config.queues;
                let rf = RegClass::ALL
                    .iter()
                    .map(|&class| {
                        let i = class.index();
                        let stats = sum_structs(
                            config.reg_file.kind,
                            &core.stats.rf[i],
                            threads.iter().map(|t| t.stats.rf[i]),
                        );
                        (class.name(), stats)
                    })
                    .collect();

                CoreReport {
                    core: core.id,
                    dispatch: core.stats.dispatch.clone(),
                    committed,
                    rob: sum_structs(
                        queues.rob_kind,
                        &core.stats.rob,
                        threads.iter().map(|t| t.stats.rob),
                    ),
                    iq: sum_structs(
                        queues.iq_kind,
                        &core.stats.iq,
                        threads.iter().map(|t| t.stats.iq),
                    ),
                    lsq: sum_structs(
                        queues.lsq_kind,
                        &core.stats.lsq,
                        threads.iter().map(|t| t.stats.lsq),
                    ),
                    rf,
                    functional_units: FuClass::ALL
                        .iter()
                        .map(|&class| (class, core.fu.stats(class)))
                        .collect(),
                    threads,
                }
            })
            .collect();

        let cycles = cpu.cycle();
        let per_cycle = |n: u64| {
            if cycles == 0 {
                0.0
            } else {
                n as f64 / cycles as f64
            }
        };
        Self {
            finish_reason,
            host_seconds,
            cycles,
            committed_uops,
            committed_macros,
            uop_ipc: per_cycle(committed_uops),
            ipc: per_cycle(committed_macros),
            branch,
            cores,
        }
    }

    /// Prints only the requested statistics sections to stdout.
    ///
    /// Each element of `sections` should be one of [`STATS_SECTIONS`]. Pass an
    /// empty slice to print all sections.
    pub fn print_sections(&self, sections: &[String]) {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);
        let cycles = self.cycles;

        if want("summary") {
            let khz = if self.host_seconds > 0.0 {
                cycles as f64 / self.host_seconds / 1000.0
            } else {
                0.0
            };
            println!("\n==========================================================");
            println!("OUT-OF-ORDER CORE SIMULATION STATISTICS");
            println!("==========================================================");
            println!("finish_reason            {}", self.finish_reason);
            println!("host_seconds             {:.4} s", self.host_seconds);
            println!("sim_cycles               {cycles}");
            println!("sim_freq                 {khz:.2} kHz");
            println!("sim_insts                {}", self.committed_macros);
            println!("sim_uops                 {}", self.committed_uops);
            println!("sim_ipc                  {:.4}", self.ipc);
            println!("sim_uop_ipc              {:.4}", self.uop_ipc);
            println!("----------------------------------------------------------");
        }
        for core in &self.cores {
            if want("stages") {
                println!("CORE {} STAGES", core.core);
                for t in &core.threads {
                    let s = &t.stats;
                    println!(
                        "  t{}  fetched {:<10} dispatched {:<10} issued {:<10} committed {:<10} squashed {}",
                        t.thread,
                        s.fetched,
                        s.dispatched.total,
                        s.issued.total,
                        s.committed.total,
                        s.squashed
                    );
                }
                let c = &core.committed;
                let total = c.total.max(1) as f64;
                for (name, count) in [
                    ("integer", c.integer),
                    ("fp", c.fp),
                    ("xmm", c.xmm),
                    ("memory", c.memory),
                    ("ctrl", c.ctrl),
                ] {
                    println!(
                        "  commit.{name:<16} {count} ({:.2}%)",
                        count as f64 / total * 100.0
                    );
                }
                println!("----------------------------------------------------------");
            }
            if want("dispatch") {
                let slots = core.dispatch.total().max(1) as f64;
                println!("CORE {} DISPATCH SLOTS", core.core);
                for fate in DispatchStall::ALL {
                    let n = core.dispatch.get(fate);
                    println!(
                        "  dispatch.{:<15} {n} ({:.2}%)",
                        fate.name(),
                        n as f64 / slots * 100.0
                    );
                }
                println!("----------------------------------------------------------");
            }
            if want("branch") {
                println!("CORE {} BRANCH PREDICTION", core.core);
                for t in &core.threads {
                    let b = &t.stats.branch;
                    println!(
                        "  t{}  branches {:<10} mispred {:<10} accuracy {:.2}%  btb r/w {}/{}",
                        t.thread,
                        b.branches,
                        b.mispredicted,
                        b.accuracy(),
                        b.btb_reads,
                        b.btb_writes
                    );
                }
                println!("----------------------------------------------------------");
            }
            if want("structures") {
                println!("CORE {} STRUCTURES", core.core);
                let rows = [("rob", &core.rob), ("iq", &core.iq), ("lsq", &core.lsq)]
                    .into_iter()
                    .chain(core.rf.iter().map(|(name, s)| (*name, s)));
                for (name, s) in rows {
                    println!(
                        "  {name:<6} size {:<6} avg_occ {:<10.2} full {:<10} reads {:<10} writes {}",
                        s.size,
                        s.average(cycles),
                        s.full,
                        s.reads,
                        s.writes
                    );
                }
                println!("----------------------------------------------------------");
            }
            if want("functional_units") {
                println!("CORE {} FUNCTIONAL UNITS", core.core);
                for (class, s) in &core.functional_units {
                    if s.accesses == 0 && s.denied == 0 {
                        continue;
                    }
                    let wait = if s.accesses > 0 {
                        s.waiting_time as f64 / s.accesses as f64
                    } else {
                        0.0
                    };
                    println!(
                        "  {:<14} accesses {:<10} denied {:<10} avg_wait {wait:.2}",
                        format!("{class:?}"),
                        s.accesses,
                        s.denied
                    );
                }
                println!("----------------------------------------------------------");
            }
        }
        println!("==========================================================");
    }

    /// Prints all statistics sections to stdout.
    pub fn print(&self) {
        self.print_sections(&[]);
    }
}
