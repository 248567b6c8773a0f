//! Memory Access Types.
//!
//! This module defines the classification of accesses the pipeline submits to the
//! memory port. These types are used for the following:
//! 1. **Admission:** The port may apply different limits to fetches and data accesses.
//! 2. **Latency:** Reference ports model a per-kind latency.
//! 3. **Statistics Tracking:** Categorizing memory operations for reporting.

use serde::{Deserialize, Serialize};

/// Type of memory access operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessKind {
    /// Instruction fetch of a whole memory block.
    Fetch,

    /// Data read issued by a load micro-op.
    Load,

    /// Data write issued by a store micro-op after it left the ROB.
    Store,

    /// Non-binding read issued by a prefetch micro-op.
    Prefetch,
}

/// Handle of an access submitted to a memory port.
///
/// Ids are chosen by the port and only need to be unique among the accesses
/// it still reports as in flight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccessId(pub u64);
