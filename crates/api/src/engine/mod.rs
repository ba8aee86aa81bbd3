//! Progress and unlock engine.
//!
//! Handlers and the repair job never touch derived state directly; they go
//! through these modules, which load ground truth from the repositories,
//! run the pure derivations from `coursepath_core` and persist the result.

pub mod aggregator;
pub mod pipeline;
pub mod repair;
pub mod tree;
pub mod unlock;
