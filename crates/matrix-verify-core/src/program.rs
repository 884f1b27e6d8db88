//! Program loader (`matrix.program.v1`).
//!
//! Parsing is fail-fast: the first structural defect is reported as a
//! program `SchemaError` and nothing is partially recovered.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::digest::sha256_hex_canonical;
use crate::error::{Result, VerifyError};

pub const PROGRAM_FORMAT_V1: &str = "matrix.program.v1";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawProgram {
    format: String,
    abi_version: String,
    #[serde(default)]
    name: Option<String>,
    symbols: Vec<RawSymbol>,
    #[serde(default)]
    blocks: Vec<RawBlock>,
    #[serde(default)]
    metadata: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSymbol {
    name: String,
    signature: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawBlock {
    op: String,
    args: Value,
}

/// One instruction of the program body.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub op: String,
    /// Always a JSON object.
    pub args: Map<String, Value>,
}

impl Block {
    /// Nesting depth of `args` (the args object itself is depth 1).
    pub fn args_depth(&self) -> usize {
        1 + self.args.values().map(value_depth).max().unwrap_or(0)
    }

    pub fn arg_str(&self, key: &str) -> Option<&str> {
        self.args.get(key).and_then(Value::as_str)
    }
}

fn value_depth(v: &Value) -> usize {
    match v {
        Value::Array(items) => 1 + items.iter().map(value_depth).max().unwrap_or(0),
        Value::Object(map) => 1 + map.values().map(value_depth).max().unwrap_or(0),
        _ => 0,
    }
}

/// Immutable, validated program under verification.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    name: Option<String>,
    abi_version: String,
    symbols: BTreeMap<String, String>,
    blocks: Vec<Block>,
    metadata: Map<String, Value>,
    fingerprint: String,
}

impl Program {
    /// Parse and validate a program document.
    ///
    /// Callers reject empty bodies before reaching this point; an empty
    /// input here is still reported as a schema error.
    pub fn load(raw: &[u8]) -> Result<Self> {
        let raw: RawProgram = serde_json::from_slice(raw)
            .map_err(|e| VerifyError::program(format!("invalid json: {e}")))?;

        if raw.format != PROGRAM_FORMAT_V1 {
            return Err(VerifyError::program(format!(
                "format must be {PROGRAM_FORMAT_V1}, got {:?}",
                raw.format
            )));
        }
        if raw.abi_version.trim().is_empty() {
            return Err(VerifyError::program("abi_version must not be empty"));
        }

        let mut symbols = BTreeMap::new();
        for (i, s) in raw.symbols.into_iter().enumerate() {
            if s.name.is_empty() {
                return Err(VerifyError::program(format!(
                    "symbols[{i}].name must not be empty"
                )));
            }
            if symbols.contains_key(&s.name) {
                return Err(VerifyError::program(format!("duplicate symbol: {}", s.name)));
            }
            symbols.insert(s.name, s.signature);
        }

        let mut blocks = Vec::with_capacity(raw.blocks.len());
        for (i, b) in raw.blocks.into_iter().enumerate() {
            if b.op.is_empty() {
                return Err(VerifyError::program(format!("blocks[{i}].op must not be empty")));
            }
            let Value::Object(args) = b.args else {
                return Err(VerifyError::program(format!(
                    "blocks[{i}].args must be an object"
                )));
            };
            blocks.push(Block { op: b.op, args });
        }

        let canonical_blocks: Vec<Value> = blocks
            .iter()
            .map(|b| json!({ "op": b.op, "args": b.args }))
            .collect();
        let fingerprint = sha256_hex_canonical(&json!({
            "format": PROGRAM_FORMAT_V1,
            "abi_version": raw.abi_version,
            "name": raw.name,
            "symbols": symbols,
            "blocks": canonical_blocks,
            "metadata": raw.metadata,
        }));

        tracing::debug!(
            abi = %raw.abi_version,
            symbols = symbols.len(),
            blocks = blocks.len(),
            "program loaded"
        );

        Ok(Self {
            name: raw.name,
            abi_version: raw.abi_version,
            symbols,
            blocks,
            metadata: raw.metadata,
            fingerprint,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Declared ABI identity.
    pub fn abi_version(&self) -> &str {
        &self.abi_version
    }

    /// Exported symbols / capabilities, name -> signature.
    pub fn symbols(&self) -> &BTreeMap<String, String> {
        &self.symbols
    }

    pub fn has_symbol(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// SHA-256 (hex) of the canonical program form.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}
