//! Policy cache keyed by file content.
//!
//! The file is read on every lookup and its SHA-256 compared with the cached
//! entry; only the parse and compile step is skipped on a hit. Length and
//! mtime are not part of the identity.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;

use matrix_verify_core::digest::sha256_hex;
use matrix_verify_core::error::{Result, VerifyError};
use matrix_verify_core::policy::Policy;

struct CachedPolicy {
    digest: String,
    policy: Arc<Policy>,
}

#[derive(Default)]
pub struct PolicyCache {
    map: DashMap<PathBuf, CachedPolicy>,
}

impl PolicyCache {
    pub fn new() -> Self {
        Self {
            map: DashMap::new(),
        }
    }

    pub fn load(&self, path: &Path) -> Result<Arc<Policy>> {
        let bytes = read_policy(path)?;
        let digest = sha256_hex(&bytes);

        if let Some(hit) = self.map.get(path) {
            if hit.digest == digest {
                tracing::debug!(path = %path.display(), "policy cache hit");
                return Ok(Arc::clone(&hit.policy));
            }
        }

        let policy = Arc::new(Policy::load_from_slice(&bytes)?);
        self.map.insert(
            path.to_path_buf(),
            CachedPolicy {
                digest,
                policy: Arc::clone(&policy),
            },
        );
        Ok(policy)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

pub fn load_uncached(path: &Path) -> Result<Arc<Policy>> {
    let bytes = read_policy(path)?;
    Ok(Arc::new(Policy::load_from_slice(&bytes)?))
}

fn read_policy(path: &Path) -> Result<Vec<u8>> {
    fs::read(path)
        .map_err(|e| VerifyError::Io(format!("read policy {} failed: {e}", path.display())))
}
