//! Timing model of the processor.
//!
//! The CPU is a set of cores, each running one or more hardware threads
//! through a shared out-of-order pipeline.

/// Cores, hardware threads, and the CPU container.
pub mod cpu;

/// Pipeline structures and stages.
pub mod pipeline;

/// Functional units and branch prediction.
pub mod units;

/// Micro-instruction descriptors and dynamic micro-ops.
pub mod uop;

pub use cpu::Cpu;
