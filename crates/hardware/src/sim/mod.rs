//! Simulation driver and collaborators.
//!
//! Provides the traits the timing core is driven through, reference
//! implementations of both, the context scheduler, and the top-level
//! simulator loop.

/// Fixed-latency reference memory port.
pub mod memory;

/// Placement of software contexts on hardware threads.
pub mod scheduler;

/// Top-level simulator and finish reasons.
pub mod simulator;

/// Trace-driven reference functional model.
pub mod trace;

/// Functional model and memory port interfaces.
pub mod traits;

pub use simulator::{FinishReason, Simulator};
