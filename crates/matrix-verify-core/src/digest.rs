//! Canonical content hashing.
//!
//! `serde_json::Map` is ordered by key, so serializing a `Value` yields the
//! same bytes for equal documents regardless of source key order.

use serde_json::Value;
use sha2::{Digest, Sha256};

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// SHA-256 (hex) over the canonical JSON form of `value`.
pub fn sha256_hex_canonical(value: &Value) -> String {
    sha256_hex(value.to_string().as_bytes())
}
