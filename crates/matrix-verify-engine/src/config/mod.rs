//! Engine config loader (strict parsing).

pub mod schema;

use std::fs;
use std::path::Path;

use matrix_verify_core::error::{Result, VerifyError};

pub use schema::{EngineSection, PluginsSection, VerifierConfig};

pub fn load_from_file(path: impl AsRef<Path>) -> Result<VerifierConfig> {
    let path = path.as_ref();
    let s = fs::read_to_string(path)
        .map_err(|e| VerifyError::Io(format!("read config {} failed: {e}", path.display())))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<VerifierConfig> {
    let cfg: VerifierConfig = serde_yaml::from_str(s)
        .map_err(|e| VerifyError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
