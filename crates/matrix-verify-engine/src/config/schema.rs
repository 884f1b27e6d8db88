use serde::Deserialize;

use matrix_verify_core::abi::AbiCompat;
use matrix_verify_core::error::{Result, VerifyError};
use matrix_verify_core::policy::is_valid_plugin_name;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifierConfig {
    pub version: u32,

    #[serde(default)]
    pub engine: EngineSection,

    #[serde(default)]
    pub plugins: PluginsSection,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            version: 1,
            engine: EngineSection::default(),
            plugins: PluginsSection::default(),
        }
    }
}

impl VerifierConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(VerifyError::Config(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.engine.validate()?;
        self.plugins.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineSection {
    #[serde(default)]
    pub abi_compat: AbiCompat,

    #[serde(default = "default_plugin_timeout_ms")]
    pub plugin_timeout_ms: u64,

    #[serde(default)]
    pub concurrent_plugins: bool,

    #[serde(default = "default_policy_cache")]
    pub policy_cache: bool,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            abi_compat: AbiCompat::default(),
            plugin_timeout_ms: default_plugin_timeout_ms(),
            concurrent_plugins: false,
            policy_cache: default_policy_cache(),
        }
    }
}

impl EngineSection {
    pub fn validate(&self) -> Result<()> {
        if !(10..=60000).contains(&self.plugin_timeout_ms) {
            return Err(VerifyError::Config(
                "engine.plugin_timeout_ms must be between 10 and 60000".into(),
            ));
        }
        Ok(())
    }
}

fn default_plugin_timeout_ms() -> u64 {
    5000
}
fn default_policy_cache() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginsSection {
    /// Used when a caller names no plugins.
    #[serde(default = "default_plugins")]
    pub default: Vec<String>,
}

impl Default for PluginsSection {
    fn default() -> Self {
        Self {
            default: default_plugins(),
        }
    }
}

impl PluginsSection {
    pub fn validate(&self) -> Result<()> {
        for name in &self.default {
            if !is_valid_plugin_name(name) {
                return Err(VerifyError::Config(format!(
                    "plugins.default contains malformed name: {name:?}"
                )));
            }
        }
        Ok(())
    }
}

fn default_plugins() -> Vec<String> {
    vec!["idb".into(), "kql".into()]
}
