//! ABI compatibility relation and the ABI identity envelope.
//!
//! `Exact` is the default. `SameMajor` accepts `v2.3` against `v2` but
//! falls back to exact comparison when either side has no numeric major
//! component, so an unparsable identifier can never widen acceptance.
//!
//! [`AbiEnvelope`] binds everything a verification depended on (exported
//! symbols, program, policy, document schemas, invoked plugin set) into one
//! `abi_hash`.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::digest::sha256_hex_canonical;
use crate::policy::{Policy, POLICY_FORMAT_V1};
use crate::program::{Program, PROGRAM_FORMAT_V1};

pub const ABI_NAME: &str = "matrix";
pub const ABI_SURFACE_V1: &str = "matrix.v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbiCompat {
    #[default]
    Exact,
    SameMajor,
}

impl AbiCompat {
    pub fn as_str(self) -> &'static str {
        match self {
            AbiCompat::Exact => "exact",
            AbiCompat::SameMajor => "same_major",
        }
    }

    /// Whether a program declaring `declared` satisfies `expected`.
    pub fn is_compatible(self, declared: &str, expected: &str) -> bool {
        match self {
            AbiCompat::Exact => declared == expected,
            AbiCompat::SameMajor => match (major(declared), major(expected)) {
                (Some(a), Some(b)) => a == b,
                _ => declared == expected,
            },
        }
    }
}

/// Leading numeric component of `v2`, `v2.1`, `2.1.0`.
fn major(s: &str) -> Option<u64> {
    let s = s.strip_prefix(['v', 'V']).unwrap_or(s);
    let head = s.split('.').next()?;
    if head.is_empty() || !head.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    head.parse().ok()
}

/// Component hashes of one verification, all SHA-256 hex over canonical JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbiEnvelope {
    pub abi: &'static str,
    pub surface: &'static str,
    pub symbols_hash: String,
    pub program_hash: String,
    pub policy_hash: String,
    pub io_schema_hash: String,
    pub capabilities_hash: String,
}

impl AbiEnvelope {
    pub fn new<S: AsRef<str>>(program: &Program, policy: &Policy, plugins: &[S]) -> Self {
        Self {
            abi: ABI_NAME,
            surface: ABI_SURFACE_V1,
            symbols_hash: sha256_hex_canonical(&json!({ "symbols": program.symbols() })),
            program_hash: program.fingerprint().to_string(),
            policy_hash: policy.fingerprint().to_string(),
            io_schema_hash: io_schema_hash(),
            capabilities_hash: capabilities_hash(plugins),
        }
    }

    /// Hash of the whole envelope.
    pub fn abi_hash(&self) -> String {
        sha256_hex_canonical(&json!({
            "abi": self.abi,
            "surface": self.surface,
            "symbols_hash": self.symbols_hash,
            "program_hash": self.program_hash,
            "policy_hash": self.policy_hash,
            "io_schema_hash": self.io_schema_hash,
            "capabilities_hash": self.capabilities_hash,
        }))
    }
}

/// Document schema identities bound into every envelope.
pub fn io_schema_hash() -> String {
    sha256_hex_canonical(&json!({
        "io": {
            "abi": ABI_SURFACE_V1,
            "policy": POLICY_FORMAT_V1,
            "program": PROGRAM_FORMAT_V1,
        }
    }))
}

/// Order-insensitive hash of a plugin set.
pub fn capabilities_hash<S: AsRef<str>>(plugins: &[S]) -> String {
    let mut names: Vec<&str> = plugins.iter().map(AsRef::as_ref).collect();
    names.sort_unstable();
    names.dedup();
    sha256_hex_canonical(&json!({ "plugins": names }))
}
