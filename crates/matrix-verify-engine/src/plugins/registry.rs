use std::collections::BTreeMap;
use std::sync::Arc;

use matrix_verify_core::error::{Result, VerifyError};
use matrix_verify_core::policy::is_valid_plugin_name;

use super::{IdbPlugin, KqlPlugin, Plugin};

/// Startup-populated plugin set. Built mutably, then frozen behind an `Arc`
/// and only read during request handling.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: BTreeMap<&'static str, Arc<dyn Plugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: BTreeMap::new(),
        }
    }

    /// Registry holding the built-in `idb` and `kql` validators.
    pub fn with_builtins() -> Result<Self> {
        let mut reg = Self::new();
        reg.register(Arc::new(IdbPlugin::new()))?;
        reg.register(Arc::new(KqlPlugin::new()))?;
        Ok(reg)
    }

    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<()> {
        let name = plugin.name();
        if !is_valid_plugin_name(name) {
            return Err(VerifyError::Config(format!("malformed plugin name: {name:?}")));
        }
        if self.plugins.contains_key(name) {
            return Err(VerifyError::Config(format!("plugin registered twice: {name}")));
        }
        self.plugins.insert(name, plugin);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.plugins.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.plugins.keys().copied().collect()
    }

    /// Resolve names to handles in the requested order.
    pub fn resolve(&self, requested: &[String]) -> Result<Vec<Arc<dyn Plugin>>> {
        requested
            .iter()
            .map(|name| {
                self.plugins
                    .get(name.as_str())
                    .cloned()
                    .ok_or_else(|| VerifyError::UnknownPlugin(name.clone()))
            })
            .collect()
    }
}

/// Normalize a requested plugin list into an ordered set: empty names are
/// dropped and repeats collapse to the first occurrence.
pub fn ordered_set<S: AsRef<str>>(requested: &[S]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(requested.len());
    for name in requested {
        let name = name.as_ref().trim();
        if name.is_empty() || out.iter().any(|n| n == name) {
            continue;
        }
        out.push(name.to_string());
    }
    out
}
