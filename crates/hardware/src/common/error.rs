//! Error definitions.
//!
//! This module defines the failures the simulator reports to its caller. It provides:
//! 1. **Configuration Errors:** Invalid or inconsistent sizing and policy parameters,
//!    detected once before the first cycle.
//! 2. **Simulation Errors:** Failures that prevent a run from starting or continuing,
//!    such as an unreadable workload or a context that can never be placed.
//!
//! Broken admission-check protocol (allocating from an empty free list,
//! enqueueing into a full ROB) is not represented here: those are assertions.
//! Pipeline stalls are statistics, and a commit livelock is a finish reason.

use thiserror::Error;

use super::reg::RegClass;

/// Invalid configuration, reported by [`Config::validate`](crate::config::Config::validate).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A count, width, or size that must be positive is zero.
    #[error("{field} must be greater than zero")]
    Zero {
        /// Dotted path of the offending field.
        field: &'static str,
    },

    /// A table size that is used as an index mask is not a power of two.
    #[error("{field} = {value} must be a power of two")]
    NotPowerOfTwo {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Configured value.
        value: usize,
    },

    /// A value outside its permitted range.
    #[error("{field} = {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Configured value.
        value: u64,
        /// Smallest permitted value.
        min: u64,
        /// Largest permitted value.
        max: u64,
    },

    /// A register file too small to rename the architectural state plus one micro-op.
    #[error("{class} register file size {size} is below the minimum of {min}")]
    RegisterFileTooSmall {
        /// Register class of the undersized pool.
        class: RegClass,
        /// Configured per-thread size.
        size: usize,
        /// Logical register count plus the maximum outputs of one micro-op.
        min: usize,
    },

    /// The configuration document could not be parsed.
    #[error("invalid configuration document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure that prevents the simulation from running.
#[derive(Debug, Error)]
pub enum SimError {
    /// The configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The workload description could not be parsed.
    #[error("invalid trace document: {0}")]
    TraceParse(#[source] serde_json::Error),

    /// The workload is well formed but inconsistent with the configuration.
    #[error("invalid trace: {0}")]
    Trace(String),

    /// A runnable context has no hardware thread to run on.
    #[error(
        "context {context} cannot be allocated: all hardware threads are busy \
         and context switching is disabled"
    )]
    NoFreeNode {
        /// Id of the context left unallocated.
        context: usize,
    },

    /// Reading a workload or configuration file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
