//! churnserve core: feature records, validation, scorers, and the error surface.
//!
//! This crate defines the scoring contract and error taxonomy shared by the
//! HTTP service and tooling. It carries no transport, storage, or runtime
//! dependencies so scorers can be exercised in isolation.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here
//! (`#![deny(clippy::panic, clippy::unwrap_used, clippy::expect_used)]`).
//! Bad input surfaces as `ChurnError::Validation`, never as a crash.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod model;
pub mod scoring;

/// Shared result type.
pub use error::{ChurnError, Result};
pub use model::{FeatureRecord, PredictRequest, PredictResponse, MAX_CUSTOMER_ID_LEN};
pub use scoring::{LinearScorer, LinearWeights, LogisticScorer, Scorer, MAX_PROB, MIN_PROB};
