//! Common types shared by every part of the timing core.
//!
//! This module provides the small vocabulary the pipeline is written in:
//! 1. **Constants:** Per-micro-op operand limits and timing thresholds.
//! 2. **Memory Access:** Classification of accesses submitted to the memory port.
//! 3. **Error Handling:** Configuration and simulation error types.
//! 4. **Register Naming:** Logical register operands, classes, and the architectural layout.

/// Common constants used throughout the simulator.
pub mod constants;

/// Memory access type definitions.
pub mod data;

/// Error types for configuration and simulation failures.
pub mod error;

/// Logical register operands and the architectural register layout.
pub mod reg;

pub use constants::{MAX_IDEPS, MAX_ODEPS};
pub use data::{AccessId, AccessKind};
pub use error::{ConfigError, SimError};
pub use reg::{ArchLayout, Dep, RegClass};
