//! Global Simulator Constants.
//!
//! This module defines limits shared by the decoder contract and the pipeline:
//! 1. **Operand Limits:** Maximum logical inputs and outputs per micro-instruction.
//! 2. **Unit Limits:** Maximum instances of one functional unit class.
//! 3. **Scheduling Thresholds:** Cycle spans used by thread-switch heuristics.

/// Maximum number of logical input operands of a micro-instruction.
pub const MAX_IDEPS: usize = 3;

/// Maximum number of logical output operands of a micro-instruction.
///
/// Register files must hold at least this many registers beyond the
/// architectural ones so that any single micro-op can always be renamed.
pub const MAX_ODEPS: usize = 4;

/// Maximum number of instances of a single functional unit class.
pub const FU_RES_MAX: usize = 10;

/// Cycles after which an in-flight operation counts as long latency.
///
/// Used by the switch-on-event fetch policy.
pub const LONG_LATENCY_THRESHOLD: u64 = 20;

/// Committed-instruction lead beyond which a thread is skipped by the
/// switch-on-event policy in favour of lagging threads.
pub const FETCH_FAIRNESS_WINDOW: u64 = 100_000;
