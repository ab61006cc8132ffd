//! churnserve API library entry.
//!
//! This crate wires configuration, the prediction store, the metrics recorder
//! and the scoring handlers into one HTTP service. It is consumed by the
//! binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod config;
pub mod error;
pub mod obs;
pub mod ops;
pub mod predict;
pub mod router;
pub mod store;
