//! # Component Tests
//!
//! Tests grouped by the component they exercise, from the rename tables up
//! to complete trace-driven runs.

/// Branch target buffer replacement.
pub mod btb;

/// Configuration parsing and validation.
pub mod config;

/// Stage thread-selection policies.
pub mod policy;

/// Physical register file laws and scenarios.
pub mod reg_file;

/// Squash of speculative work through the ROB tail.
pub mod rob_recovery;

/// Context placement on hardware threads.
pub mod scheduler;

/// End-to-end trace runs.
pub mod simulator;

/// Dispatch admission and issue rules of a single core.
pub mod stages;
