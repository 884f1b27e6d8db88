//! Shared helpers: program builders and stub plugins.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use matrix_verify_core::policy::Policy;
use matrix_verify_core::program::Program;
use matrix_verify_core::report::{PluginResult, PluginViolation};
use matrix_verify_engine::config::EngineSection;
use matrix_verify_engine::engine::Verifier;
use matrix_verify_engine::plugins::{Plugin, PluginFailure, PluginRegistry};

pub const NO_PLUGINS: &[&str] = &[];

pub fn program_from(doc: Value) -> Program {
    Program::load(doc.to_string().as_bytes()).unwrap()
}

pub fn program(abi: &str) -> Program {
    program_from(json!({ "format": "matrix.program.v1", "abi_version": abi, "symbols": [] }))
}

pub fn policy(yaml: &str) -> Arc<Policy> {
    Arc::new(Policy::load_from_str(yaml).unwrap())
}

pub fn empty_policy() -> Arc<Policy> {
    Arc::new(Policy::empty())
}

pub fn settings() -> EngineSection {
    EngineSection {
        plugin_timeout_ms: 200,
        ..EngineSection::default()
    }
}

pub fn verifier_with(plugins: Vec<StubPlugin>, settings: EngineSection) -> Verifier {
    let mut reg = PluginRegistry::with_builtins().unwrap();
    for p in plugins {
        reg.register(Arc::new(p)).unwrap();
    }
    Verifier::new(Arc::new(reg), settings)
}

pub enum Behavior {
    Pass,
    Fail(Vec<(&'static str, &'static str)>),
    FailWithoutDetail,
    Error,
    Panic,
    Sleep(Duration),
}

pub struct StubPlugin {
    name: &'static str,
    behavior: Behavior,
}

impl StubPlugin {
    pub fn new(name: &'static str, behavior: Behavior) -> Self {
        Self { name, behavior }
    }
}

#[async_trait]
impl Plugin for StubPlugin {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn validate(
        &self,
        _program: &Program,
        _sub_policy: &Value,
    ) -> Result<PluginResult, PluginFailure> {
        match &self.behavior {
            Behavior::Pass => Ok(PluginResult::from_violations(self.name, vec![])),
            Behavior::Fail(items) => Ok(PluginResult::from_violations(
                self.name,
                items
                    .iter()
                    .map(|(code, detail)| PluginViolation::new(*code, *detail))
                    .collect(),
            )),
            Behavior::FailWithoutDetail => Ok(PluginResult {
                plugin: self.name.to_string(),
                passed: false,
                violations: vec![],
            }),
            Behavior::Error => Err(PluginFailure::Internal("backend unavailable".into())),
            Behavior::Panic => panic!("stub plugin panicked"),
            Behavior::Sleep(d) => {
                tokio::time::sleep(*d).await;
                Ok(PluginResult::from_violations(self.name, vec![]))
            }
        }
    }
}
