//! Plugin contract, registry and built-in validators.
//!
//! A plugin is an opaque capability-set check over a loaded [`Program`],
//! parameterized by its sub-policy. Plugins are registered once at startup
//! and shared read-only across verification calls, so implementations must
//! be stateless or internally synchronized.

pub mod idb;
pub mod kql;
pub mod registry;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use matrix_verify_core::program::{Block, Program};
use matrix_verify_core::report::PluginResult;

pub use idb::IdbPlugin;
pub use kql::KqlPlugin;
pub use registry::PluginRegistry;

/// Internal plugin failure. The engine records it as a `PLUGIN_ERROR`
/// violation; it never turns into a pass.
#[derive(Debug, Error)]
pub enum PluginFailure {
    #[error("invalid sub-policy: {0}")]
    SubPolicy(String),
    #[error("{0}")]
    Internal(String),
}

#[async_trait]
pub trait Plugin: Send + Sync {
    /// Registry key; must be a well-formed plugin name.
    fn name(&self) -> &'static str;

    async fn validate(
        &self,
        program: &Program,
        sub_policy: &Value,
    ) -> Result<PluginResult, PluginFailure>;
}

/// Decode a sub-policy, treating an absent one as `T::default()`.
pub fn parse_sub_policy<T>(value: &Value) -> Result<T, PluginFailure>
where
    T: DeserializeOwned + Default,
{
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value.clone()).map_err(|e| PluginFailure::SubPolicy(e.to_string()))
}

fn location(index: usize) -> String {
    format!("blocks[{index}]")
}

fn blocks_with<'a>(
    program: &'a Program,
    pred: impl Fn(&str) -> bool + 'a,
) -> impl Iterator<Item = (usize, &'a Block)> + 'a {
    program
        .blocks()
        .iter()
        .enumerate()
        .filter(move |(_, b)| pred(b.op.as_str()))
}
