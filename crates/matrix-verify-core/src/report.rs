//! Violations, plugin results and the verification report.

use std::time::Duration;

use serde::Serialize;

use crate::abi::AbiEnvelope;

/// Verdict-level finding categories (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationKind {
    AbiMismatch,
    PolicyViolation,
    PluginViolation,
    PluginError,
}

impl ViolationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ViolationKind::AbiMismatch => "ABI_MISMATCH",
            ViolationKind::PolicyViolation => "POLICY_VIOLATION",
            ViolationKind::PluginViolation => "PLUGIN_VIOLATION",
            ViolationKind::PluginError => "PLUGIN_ERROR",
        }
    }
}

/// One recorded reason for a REJECT verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub detail: String,
    /// Plugin name or rule id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Plugin-specific violation code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Reference into the program, e.g. `blocks[3]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Violation {
    pub fn abi_mismatch(expected: &str, got: &str) -> Self {
        Self {
            kind: ViolationKind::AbiMismatch,
            detail: format!("expected {expected}, got {got}"),
            source: None,
            code: None,
            location: None,
        }
    }

    pub fn policy(rule_id: &str, detail: impl Into<String>) -> Self {
        Self {
            kind: ViolationKind::PolicyViolation,
            detail: detail.into(),
            source: Some(rule_id.to_string()),
            code: None,
            location: None,
        }
    }

    pub fn plugin(plugin: &str, v: PluginViolation) -> Self {
        Self {
            kind: ViolationKind::PluginViolation,
            detail: v.detail,
            source: Some(plugin.to_string()),
            code: Some(v.code),
            location: v.location,
        }
    }

    pub fn plugin_error(plugin: &str, detail: impl Into<String>) -> Self {
        Self {
            kind: ViolationKind::PluginError,
            detail: detail.into(),
            source: Some(plugin.to_string()),
            code: None,
            location: None,
        }
    }
}

/// Violation record as returned by a plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginViolation {
    pub code: String,
    pub detail: String,
    pub location: Option<String>,
}

impl PluginViolation {
    pub fn new(code: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            detail: detail.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

/// Outcome of one plugin invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginResult {
    pub plugin: String,
    pub passed: bool,
    pub violations: Vec<PluginViolation>,
}

impl PluginResult {
    /// Pass iff no violations were found.
    pub fn from_violations(plugin: impl Into<String>, violations: Vec<PluginViolation>) -> Self {
        Self {
            plugin: plugin.into(),
            passed: violations.is_empty(),
            violations,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Accept,
    Reject,
}

impl Verdict {
    pub fn as_str(self) -> &'static str {
        match self {
            Verdict::Accept => "ACCEPT",
            Verdict::Reject => "REJECT",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportMeta {
    pub declared_abi: String,
    pub expected_abi: String,
    pub abi_compat: &'static str,
    pub plugins: Vec<String>,
    pub envelope: AbiEnvelope,
    pub abi_hash: String,
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Final engine output. The verdict is derived from the violation list and
/// cannot be set independently.
#[derive(Debug, Clone)]
pub struct VerificationReport {
    verdict: Verdict,
    violations: Vec<Violation>,
    meta: ReportMeta,
}

impl VerificationReport {
    pub fn new(violations: Vec<Violation>, meta: ReportMeta) -> Self {
        let verdict = if violations.is_empty() {
            Verdict::Accept
        } else {
            Verdict::Reject
        };
        Self {
            verdict,
            violations,
            meta,
        }
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn is_accept(&self) -> bool {
        self.verdict == Verdict::Accept
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn meta(&self) -> &ReportMeta {
        &self.meta
    }
}

/// Structural equality: verdict, violations and metadata, ignoring timing.
impl PartialEq for VerificationReport {
    fn eq(&self, other: &Self) -> bool {
        self.verdict == other.verdict
            && self.violations == other.violations
            && self.meta.declared_abi == other.meta.declared_abi
            && self.meta.expected_abi == other.meta.expected_abi
            && self.meta.abi_compat == other.meta.abi_compat
            && self.meta.plugins == other.meta.plugins
            && self.meta.envelope == other.meta.envelope
            && self.meta.abi_hash == other.meta.abi_hash
    }
}
