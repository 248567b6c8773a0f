//! Out-of-order pipeline structures and stages.
//!
//! This module contains the per-core and per-thread structures micro-ops
//! flow through, and the stages that move them:
//! 1. **Reorder Buffer:** In-order retirement and youngest-first squash.
//! 2. **Register File:** Renaming, readiness, and physical register reuse.
//! 3. **Queues:** Instruction, load, store, and prefetch queues with their budgets.
//! 4. **Event Queue:** Scheduled completions of issued register operations.
//! 5. **Recovery:** Squash of the speculative path after a misprediction.
//! 6. **Stages:** Fetch, decode, dispatch, issue, writeback, and commit.

/// Completion event queue ordered by cycle and program order.
pub mod event_queue;

/// Thread arbitration policies of the dispatch, issue, and commit stages.
pub mod policy;

/// History of recently prefetched memory blocks.
pub mod prefetch;

/// Issue-side queues and capacity budgets.
pub mod queues;

/// Misprediction recovery.
pub mod recovery;

/// Physical register file and register alias table.
pub mod reg_file;

/// Reorder buffer.
pub mod rob;

/// Pipeline stage implementations.
pub mod stages;
