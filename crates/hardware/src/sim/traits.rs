//! Collaborator interfaces of the timing core.
//!
//! The pipeline models timing only. Instruction semantics and the memory
//! hierarchy live behind two traits:
//! 1. **`FunctionalModel`:** Fetch/decode plus functional execution of software
//!    contexts, including speculative (wrong-path) execution and its rollback.
//! 2. **`MemoryPort`:** Admission and completion polling of memory accesses.
//!
//! Reference implementations are [`TraceWorkload`](crate::sim::trace::TraceWorkload)
//! and [`FixedLatencyMemory`](crate::sim::memory::FixedLatencyMemory).

use crate::common::{AccessId, AccessKind};
use crate::core::uop::MacroInst;

/// Run state of a software context as seen by the timing core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContextStatus {
    /// The context has instructions to execute.
    Running,
    /// The context is blocked and must not fetch.
    Suspended,
    /// The context will never run again.
    Finished,
}

/// Functional simulator of the software contexts.
///
/// Contexts are identified by small integers. Executing at an address other
/// than the context's correct next address puts it in speculative mode until
/// [`recover`](Self::recover) is called.
pub trait FunctionalModel {
    /// Ids of every context that has not been destroyed.
    fn contexts(&self) -> Vec<usize>;

    /// Current run state of `ctx`.
    fn status(&self, ctx: usize) -> ContextStatus;

    /// Flat `(core, thread)` node indices `ctx` may run on; `None` means any.
    fn affinity(&self, _ctx: usize) -> Option<Vec<usize>> {
        None
    }

    /// Decodes and functionally executes the instruction of `ctx` at `addr`.
    ///
    /// Returns `None` when there is nothing to execute (the context finished).
    fn execute(&mut self, ctx: usize, addr: u64) -> Option<MacroInst>;

    /// Returns true if `ctx` is executing down a mispredicted path.
    fn in_spec_mode(&self, ctx: usize) -> bool;

    /// Discards the speculative state of `ctx`.
    fn recover(&mut self, ctx: usize);

    /// Architecturally correct address of the next instruction of `ctx`.
    fn next_addr(&self, ctx: usize) -> u64;
}

/// Memory system seen by fetch and the load/store queue.
pub trait MemoryPort {
    /// Size in bytes of a fetch block.
    fn block_size(&self) -> u64;

    /// Returns true if an access of `kind` to `addr` can be submitted now.
    fn can_access(&self, core: usize, thread: usize, kind: AccessKind, addr: u64) -> bool;

    /// Submits an access and returns its id.
    fn access(&mut self, core: usize, thread: usize, kind: AccessKind, addr: u64, now: u64)
    -> AccessId;

    /// Returns true while the access `id` has not completed at cycle `now`.
    fn in_flight(&self, id: AccessId, now: u64) -> bool;

    /// Called once at the start of every cycle.
    fn tick(&mut self, _now: u64) {}
}
