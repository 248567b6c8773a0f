/// Fluent trace construction.
pub mod builder;

/// Simulator setup helpers.
pub mod harness;

/// Mock collaborators.
pub mod mocks;
