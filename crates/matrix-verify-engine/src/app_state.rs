//! Shared verifier state.
//!
//! Wires config, the plugin registry, the policy cache and the verifier
//! together. Built once at startup and cloned cheaply into request handlers.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;

use matrix_verify_core::error::{Result, VerifyError};
use matrix_verify_core::policy::Policy;
use matrix_verify_core::program::Program;
use matrix_verify_core::report::VerificationReport;

use crate::cache::{load_uncached, PolicyCache};
use crate::config::VerifierConfig;
use crate::engine::Verifier;
use crate::plugins::PluginRegistry;

/// Where a request's policy comes from.
#[derive(Debug, Clone)]
pub enum PolicySource {
    Path(PathBuf),
    Inline(Bytes),
    Loaded(Arc<Policy>),
}

/// One verification request as handed over by a boundary layer.
#[derive(Debug, Clone)]
pub struct VerifyRequest {
    pub program: Bytes,
    pub policy: PolicySource,
    pub expected_abi: String,
    /// Empty means `plugins.default` from config.
    pub plugins: Vec<String>,
}

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: VerifierConfig,
    verifier: Verifier,
    policies: PolicyCache,
}

impl AppState {
    /// State with the built-in plugins registered.
    pub fn new(cfg: VerifierConfig) -> Result<Self> {
        Self::with_registry(cfg, PluginRegistry::with_builtins()?)
    }

    pub fn with_registry(cfg: VerifierConfig, registry: PluginRegistry) -> Result<Self> {
        cfg.validate()?;

        // default plugin list <-> registry sanity check
        for name in &cfg.plugins.default {
            if !registry.contains(name) {
                return Err(VerifyError::Config(format!(
                    "plugins.default references unregistered plugin: {name}"
                )));
            }
        }

        tracing::info!(plugins = ?registry.names(), "plugin registry ready");

        let verifier = Verifier::new(Arc::new(registry), cfg.engine.clone());
        Ok(Self {
            inner: Arc::new(AppStateInner {
                cfg,
                verifier,
                policies: PolicyCache::new(),
            }),
        })
    }

    pub fn cfg(&self) -> &VerifierConfig {
        &self.inner.cfg
    }

    pub fn verifier(&self) -> &Verifier {
        &self.inner.verifier
    }

    pub fn policy_cache(&self) -> &PolicyCache {
        &self.inner.policies
    }

    pub fn load_policy(&self, source: &PolicySource) -> Result<Arc<Policy>> {
        match source {
            PolicySource::Path(path) if self.cfg().engine.policy_cache => {
                self.inner.policies.load(path)
            }
            PolicySource::Path(path) => load_uncached(path),
            PolicySource::Inline(bytes) => Ok(Arc::new(Policy::load_from_slice(bytes)?)),
            PolicySource::Loaded(policy) => Ok(Arc::clone(policy)),
        }
    }

    /// Load both documents and verify. An empty or whitespace-only program is
    /// rejected with `ProgramRequired` before anything is parsed.
    pub async fn verify_request(&self, req: &VerifyRequest) -> Result<VerificationReport> {
        if req.program.iter().all(u8::is_ascii_whitespace) {
            return Err(VerifyError::ProgramRequired);
        }

        let program = Program::load(&req.program)?;
        let policy = self.load_policy(&req.policy)?;

        let plugins: &[String] = if req.plugins.is_empty() {
            &self.cfg().plugins.default
        } else {
            &req.plugins
        };

        self.verifier()
            .verify(program, policy, &req.expected_abi, plugins)
            .await
    }
}
