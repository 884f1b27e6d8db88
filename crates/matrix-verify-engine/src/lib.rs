//! matrix-verify engine library entry.
//!
//! This crate wires the plugin registry, the verification engine, the
//! diagnostic reporter and the policy cache into a verifier that can be
//! driven from the command line (`main.rs`), embedded behind the HTTP gate,
//! or called directly from tests.

pub mod app_state;
pub mod cache;
pub mod config;
pub mod engine;
pub mod gate;
pub mod plugins;
pub mod report;
