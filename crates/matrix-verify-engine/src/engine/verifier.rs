use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use serde_json::Value;

use matrix_verify_core::abi::AbiEnvelope;
use matrix_verify_core::error::{Result, VerifyError};
use matrix_verify_core::policy::Policy;
use matrix_verify_core::program::Program;
use matrix_verify_core::report::{
    PluginResult, PluginViolation, ReportMeta, VerificationReport, Violation,
};

use super::rules;
use crate::config::EngineSection;
use crate::plugins::registry::ordered_set;
use crate::plugins::{Plugin, PluginRegistry};

/// Stateless between calls; holds only the shared registry and settings.
pub struct Verifier {
    registry: Arc<PluginRegistry>,
    settings: EngineSection,
}

impl Verifier {
    pub fn new(registry: Arc<PluginRegistry>, settings: EngineSection) -> Self {
        Self { registry, settings }
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn settings(&self) -> &EngineSection {
        &self.settings
    }

    /// Verify `program` against `policy` and `expected_abi`, running the
    /// requested plugins in order.
    ///
    /// Unknown plugin names, whether requested or referenced by a policy
    /// sub-policy, abort the call before any evaluation.
    pub async fn verify<S: AsRef<str>>(
        &self,
        program: Program,
        policy: Arc<Policy>,
        expected_abi: &str,
        requested: &[S],
    ) -> Result<VerificationReport> {
        let started = Instant::now();

        for name in policy.plugin_names() {
            if !self.registry.contains(name) {
                tracing::warn!(plugin = %name, "policy references unregistered plugin");
                return Err(VerifyError::UnknownPlugin(name.to_string()));
            }
        }
        let requested = ordered_set(requested);
        let plugins = self.registry.resolve(&requested).map_err(|e| {
            tracing::warn!(error = %e, "plugin resolution failed");
            e
        })?;

        let program = Arc::new(program);
        let mut violations = Vec::new();

        // 1) ABI
        let declared = program.abi_version();
        if !self.settings.abi_compat.is_compatible(declared, expected_abi) {
            violations.push(Violation::abi_mismatch(expected_abi, declared));
        }

        // 2) global rules
        violations.extend(rules::evaluate(policy.rules(), &program, &requested));

        // 3) plugins
        violations.extend(self.run_plugins(&plugins, &program, &policy).await);

        let envelope = AbiEnvelope::new(&program, &policy, requested.as_slice());
        let meta = ReportMeta {
            declared_abi: declared.to_string(),
            expected_abi: expected_abi.to_string(),
            abi_compat: self.settings.abi_compat.as_str(),
            plugins: requested,
            abi_hash: envelope.abi_hash(),
            envelope,
            elapsed: started.elapsed(),
        };
        let report = VerificationReport::new(violations, meta);

        tracing::info!(
            verdict = report.verdict().as_str(),
            violations = report.violations().len(),
            abi_hash = %report.meta().abi_hash,
            elapsed_ms = report.meta().elapsed.as_millis() as u64,
            "verification finished"
        );

        Ok(report)
    }

    async fn run_plugins(
        &self,
        plugins: &[Arc<dyn Plugin>],
        program: &Arc<Program>,
        policy: &Policy,
    ) -> Vec<Violation> {
        let limit = Duration::from_millis(self.settings.plugin_timeout_ms);
        let runs = plugins.iter().map(|p| {
            run_one(
                Arc::clone(p),
                Arc::clone(program),
                policy.sub_policy(p.name()),
                limit,
            )
        });

        // join_all yields results in input order, so the canonical order holds.
        let per_plugin = if self.settings.concurrent_plugins {
            join_all(runs).await
        } else {
            let mut out = Vec::with_capacity(plugins.len());
            for run in runs {
                out.push(run.await);
            }
            out
        };

        per_plugin.into_iter().flatten().collect()
    }
}

/// Run one plugin as its own task, bounded by `limit`. Errors, panics and
/// timeouts are all reported as `PLUGIN_ERROR`.
async fn run_one(
    plugin: Arc<dyn Plugin>,
    program: Arc<Program>,
    sub_policy: Value,
    limit: Duration,
) -> Vec<Violation> {
    let name = plugin.name();
    tracing::debug!(plugin = name, "plugin start");

    let mut task = tokio::spawn(async move { plugin.validate(&program, &sub_policy).await });

    let outcome = tokio::time::timeout(limit, &mut task).await;
    let failure = match outcome {
        Ok(Ok(Ok(result))) => return tag(name, result),
        Ok(Ok(Err(e))) => format!("plugin {name} failed: {e}"),
        Ok(Err(join)) if join.is_panic() => format!("plugin {name} panicked"),
        Ok(Err(join)) => format!("plugin {name} did not complete: {join}"),
        Err(_) => {
            task.abort();
            format!("plugin {name} timed out after {}ms", limit.as_millis())
        }
    };

    tracing::warn!(plugin = name, detail = %failure, "plugin error");
    vec![Violation::plugin_error(name, failure)]
}

/// Tag plugin findings with the registry name.
fn tag(name: &str, result: PluginResult) -> Vec<Violation> {
    if !result.passed && result.violations.is_empty() {
        return vec![Violation::plugin(
            name,
            PluginViolation::new("unspecified", "plugin reported failure without detail"),
        )];
    }
    result
        .violations
        .into_iter()
        .map(|v| Violation::plugin(name, v))
        .collect()
}
