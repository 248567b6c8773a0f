//! Hardware execution units.

/// Branch prediction: direction predictors, BTB, and return address stack.
pub mod bru;

/// Functional unit pool.
pub mod fu;
