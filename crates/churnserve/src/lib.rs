//! Top-level facade crate for churnserve.
//!
//! Re-exports the core scoring types and the HTTP service so users can depend on a single crate.

pub mod core {
    pub use churnserve_core::*;
}

pub mod api {
    pub use churnserve_api::*;
}
