//! Top-level facade crate for matrix-verify.
//!
//! Re-exports the core primitives and the verification engine so users can
//! depend on a single crate.

pub mod core {
    pub use matrix_verify_core::*;
}

pub mod engine {
    pub use matrix_verify_engine::*;
}
