//! matrix-verify core: transport-free primitives for program ABI verification.
//!
//! This crate defines the input documents (program, policy), the ABI
//! compatibility relation, the violation/report model and the error surface
//! shared by the engine and any embedding layer. It carries no runtime or
//! transport dependencies.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. Malformed input
//! always surfaces as `VerifyError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod abi;
pub mod digest;
pub mod error;
pub mod policy;
pub mod program;
pub mod report;

/// Shared result type.
pub use error::{Result, VerifyError};
