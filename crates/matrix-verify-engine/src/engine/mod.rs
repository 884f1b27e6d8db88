//! Verification engine.
//!
//! Runs ABI comparison, global policy rules and plugins, in that order, and
//! folds every finding into a single `VerificationReport`.

pub mod rules;
pub mod verifier;

pub use verifier::Verifier;
