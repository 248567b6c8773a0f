//! Pipeline stage implementations.
//!
//! Every core runs its stages once per cycle in reverse pipeline order, so
//! that later stages consume state earlier stages produced in the same cycle:
//! 1. **Commit:** Retires completed micro-ops from the ROB head.
//! 2. **Writeback:** Completes micro-ops whose latency or memory access ended.
//! 3. **Issue:** Sends ready micro-ops to functional units or memory.
//! 4. **Dispatch:** Renames micro-ops into the ROB and the issue queues.
//! 5. **Decode:** Moves fetched macro-instructions into the uop queue.
//! 6. **Fetch:** Runs the functional model and predicts the next address.

/// Commit stage implementation.
pub mod commit;

/// Decode stage implementation.
pub mod decode;

/// Dispatch stage implementation.
pub mod dispatch;

/// Fetch stage implementation.
pub mod fetch;

/// Issue stage implementation.
pub mod issue;

/// Writeback stage implementation.
pub mod writeback;

pub use commit::commit_stage;
pub use decode::decode_stage;
pub use dispatch::dispatch_stage;
pub use fetch::fetch_stage;
pub use issue::issue_stage;
pub use writeback::writeback_stage;

use crate::sim::traits::{FunctionalModel, MemoryPort};

/// Collaborators and cycle-wide values a stage needs besides the core.
pub struct CycleEnv<'a> {
    /// Current cycle.
    pub now: u64,
    /// Functional simulator of the contexts.
    pub model: &'a mut dyn FunctionalModel,
    /// Memory system.
    pub memory: &'a mut dyn MemoryPort,
    /// Next program-order micro-op id, unique across the CPU.
    pub next_uop_id: &'a mut u64,
}
