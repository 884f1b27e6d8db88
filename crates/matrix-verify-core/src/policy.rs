//! Policy loader (`matrix.policy.v1`).
//!
//! The document is read with `serde_yaml`, which also accepts JSON. Raw
//! rules are compiled into [`RuleCheck`] values here so that evaluation
//! never has to deal with missing parameters.
//!
//! Each policy carries a fingerprint over its canonical compiled form. Rule
//! order is significant; value lists inside a rule are sets and are sorted.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::digest::sha256_hex_canonical;
use crate::error::{Result, VerifyError};

pub const POLICY_FORMAT_V1: &str = "matrix.policy.v1";

const MAX_DEPTH_LIMIT: usize = 4096;
const MAX_PLUGIN_NAME_LEN: usize = 64;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPolicy {
    format: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    rules: Vec<RawRule>,
    #[serde(default)]
    plugins: BTreeMap<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRule {
    id: String,
    kind: RuleKind,
    #[serde(default)]
    values: Option<Vec<String>>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    depth: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RuleKind {
    AllowedAbi,
    RequireCapability,
    ForbidCapability,
    AllowedOps,
    MaxDepth,
    RequireMetadata,
    AllowedPlugins,
}

/// Compiled global rule check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleCheck {
    /// Declared ABI must be one of these.
    AllowedAbi(Vec<String>),
    /// Symbol must be exported.
    RequireCapability(String),
    /// Symbol must not be exported.
    ForbidCapability(String),
    /// Every block op must be one of these.
    AllowedOps(Vec<String>),
    /// Block args nesting bound.
    MaxDepth(usize),
    /// Metadata key must be present.
    RequireMetadata(String),
    /// Every requested plugin must be one of these.
    AllowedPlugins(Vec<String>),
}

impl RuleCheck {
    pub fn kind(&self) -> &'static str {
        match self {
            RuleCheck::AllowedAbi(_) => "allowed_abi",
            RuleCheck::RequireCapability(_) => "require_capability",
            RuleCheck::ForbidCapability(_) => "forbid_capability",
            RuleCheck::AllowedOps(_) => "allowed_ops",
            RuleCheck::MaxDepth(_) => "max_depth",
            RuleCheck::RequireMetadata(_) => "require_metadata",
            RuleCheck::AllowedPlugins(_) => "allowed_plugins",
        }
    }

    fn canonical(&self) -> Value {
        fn sorted(values: &[String]) -> Vec<String> {
            let mut v = values.to_vec();
            v.sort();
            v.dedup();
            v
        }
        match self {
            RuleCheck::AllowedAbi(v) | RuleCheck::AllowedOps(v) | RuleCheck::AllowedPlugins(v) => {
                json!({ "kind": self.kind(), "values": sorted(v) })
            }
            RuleCheck::RequireCapability(name)
            | RuleCheck::ForbidCapability(name)
            | RuleCheck::RequireMetadata(name) => json!({ "kind": self.kind(), "name": name }),
            RuleCheck::MaxDepth(depth) => json!({ "kind": self.kind(), "depth": depth }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Stable rule identifier, reported as the violation source.
    pub id: String,
    pub check: RuleCheck,
}

/// Validated, read-only policy.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    name: Option<String>,
    rules: Vec<Rule>,
    plugins: BTreeMap<String, Value>,
    fingerprint: String,
}

impl Policy {
    pub fn load_from_str(s: &str) -> Result<Self> {
        let raw: RawPolicy = serde_yaml::from_str(s)
            .map_err(|e| VerifyError::policy(format!("invalid document: {e}")))?;
        Self::compile(raw)
    }

    pub fn load_from_slice(bytes: &[u8]) -> Result<Self> {
        let s = std::str::from_utf8(bytes)
            .map_err(|e| VerifyError::policy(format!("not utf-8: {e}")))?;
        Self::load_from_str(s)
    }

    /// A policy with no rules and no plugin sub-policies.
    pub fn empty() -> Self {
        Self::assemble(None, Vec::new(), BTreeMap::new())
    }

    fn assemble(name: Option<String>, rules: Vec<Rule>, plugins: BTreeMap<String, Value>) -> Self {
        let canonical_rules: Vec<Value> = rules
            .iter()
            .map(|r| {
                let mut v = r.check.canonical();
                if let Value::Object(map) = &mut v {
                    map.insert("id".into(), Value::String(r.id.clone()));
                }
                v
            })
            .collect();
        let fingerprint = sha256_hex_canonical(&json!({
            "policy": {
                "format": POLICY_FORMAT_V1,
                "name": name,
                "rules": canonical_rules,
                "plugins": plugins,
            }
        }));
        Self {
            name,
            rules,
            plugins,
            fingerprint,
        }
    }

    fn compile(raw: RawPolicy) -> Result<Self> {
        if raw.format != POLICY_FORMAT_V1 {
            return Err(VerifyError::policy(format!(
                "format must be {POLICY_FORMAT_V1}, got {:?}",
                raw.format
            )));
        }

        let mut rules: Vec<Rule> = Vec::with_capacity(raw.rules.len());
        for r in raw.rules {
            if r.id.is_empty() {
                return Err(VerifyError::policy("rule id must not be empty"));
            }
            if rules.iter().any(|x| x.id == r.id) {
                return Err(VerifyError::policy(format!("duplicate rule id: {}", r.id)));
            }
            let check = compile_rule(&r)?;
            rules.push(Rule { id: r.id, check });
        }

        for name in raw.plugins.keys() {
            if !is_valid_plugin_name(name) {
                return Err(VerifyError::Config(format!(
                    "malformed plugin name in policy: {name:?}"
                )));
            }
        }

        Ok(Self::assemble(raw.name, rules, raw.plugins))
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Global rules in declaration order.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Plugin names that carry a sub-policy.
    pub fn plugin_names(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }

    /// SHA-256 (hex) of the canonical compiled policy.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Sub-policy for `plugin`, `Value::Null` when the policy has none.
    pub fn sub_policy(&self, plugin: &str) -> Value {
        self.plugins.get(plugin).cloned().unwrap_or(Value::Null)
    }
}

fn compile_rule(r: &RawRule) -> Result<RuleCheck> {
    let missing = |field: &str| {
        VerifyError::policy(format!("rule {}: `{field}` is required for this kind", r.id))
    };

    let check = match r.kind {
        RuleKind::AllowedAbi => {
            RuleCheck::AllowedAbi(r.values.clone().ok_or_else(|| missing("values"))?)
        }
        RuleKind::AllowedOps => {
            RuleCheck::AllowedOps(r.values.clone().ok_or_else(|| missing("values"))?)
        }
        RuleKind::AllowedPlugins => {
            let values = r.values.clone().ok_or_else(|| missing("values"))?;
            if let Some(bad) = values.iter().find(|v| !is_valid_plugin_name(v)) {
                return Err(VerifyError::Config(format!(
                    "rule {}: malformed plugin name {bad:?}",
                    r.id
                )));
            }
            RuleCheck::AllowedPlugins(values)
        }
        RuleKind::RequireCapability => {
            RuleCheck::RequireCapability(r.name.clone().ok_or_else(|| missing("name"))?)
        }
        RuleKind::ForbidCapability => {
            RuleCheck::ForbidCapability(r.name.clone().ok_or_else(|| missing("name"))?)
        }
        RuleKind::RequireMetadata => {
            RuleCheck::RequireMetadata(r.name.clone().ok_or_else(|| missing("name"))?)
        }
        RuleKind::MaxDepth => {
            let depth = r.depth.ok_or_else(|| missing("depth"))?;
            if !(1..=MAX_DEPTH_LIMIT).contains(&depth) {
                return Err(VerifyError::policy(format!(
                    "rule {}: depth must be between 1 and {MAX_DEPTH_LIMIT}",
                    r.id
                )));
            }
            RuleCheck::MaxDepth(depth)
        }
    };
    Ok(check)
}

/// `[a-z][a-z0-9_-]*`, at most 64 bytes.
pub fn is_valid_plugin_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= MAX_PLUGIN_NAME_LEN
        && first.is_ascii_lowercase()
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}
