//! Shared test fixtures and utilities for Clankers crates.
//!
//! Provides mock robot models (single and batched) and deterministic RNG
//! setup.

pub mod mocks;
pub mod rng;

// ---------------------------------------------------------------------------
// Re-exports for convenience
// ---------------------------------------------------------------------------

pub use mocks::{MockBatchRobot, MockLink, MockRobot};
pub use rng::{deterministic_vec, seeded_rng};
