//! Out-of-order superscalar timing core library.
//!
//! This crate implements a cycle-level timing model of a multi-core,
//! multi-threaded out-of-order processor with the following:
//! 1. **Core:** Fetch, decode, dispatch, issue, writeback, and commit stages over
//!    a ROB, instruction and load/store queues, and renamed register files.
//! 2. **Prediction:** Per-thread BTB, return address stack, and direction predictors
//!    with recovery at writeback or commit.
//! 3. **Scheduling:** Per-stage thread-sharing policies and a context scheduler
//!    mapping software contexts onto hardware threads.
//! 4. **Simulation:** Collaborator traits, trace-driven and fixed-latency
//!    reference implementations, configuration, and statistics.

/// Common types and constants (register naming, memory access kinds, errors).
pub mod common;
/// Simulator configuration (defaults, enums, hierarchical config structures).
pub mod config;
/// Timing model (CPU, cores, threads, pipeline, units, micro-ops).
pub mod core;
/// Simulation driver, context scheduler, and reference collaborators.
pub mod sim;
/// Simulation statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or `Config::from_json`.
pub use crate::config::Config;
/// Simulated processor; holds cores, threads, and the cycle counter.
pub use crate::core::Cpu;
/// Top-level simulator loop.
pub use crate::sim::Simulator;
