//! Online machine-learning primitives for a streaming dataflow engine:
//! approximate nearest-neighbor indexes, an incremental local-outlier-factor
//! anomaly scorer, a confidence-weighted classifier (AROW), and a
//! Passive-Aggressive regressor.
//!
//! Every engine here is meant to be owned by a long-lived host process and
//! mutated from many short-lived calls; training takes a writer lock,
//! scoring takes a reader lock, and nothing here spawns a background task
//! or performs I/O on the hot path. See `DESIGN.md` for how each module
//! traces back to its reference implementation.

pub mod ann;
pub mod arow;
pub mod bits;
pub mod error;
pub mod flatten;
pub mod hash;
pub mod interner;
pub mod lof;
pub mod pa;
pub mod snapshot;
pub mod sort;

pub use arow::Arow;
pub use error::{Error, Result};
pub use flatten::Value;
pub use lof::LightLof;
pub use pa::PassiveAggressive;
