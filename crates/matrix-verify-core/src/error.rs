//! Shared error type across matrix-verify crates.
//!
//! Only conditions that abort a verification call live here. Verdict-level
//! findings (ABI mismatch, policy and plugin violations) are values in
//! [`crate::report`], never errors.

use thiserror::Error;

/// Caller-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Empty or missing program body.
    ProgramRequired,
    /// Malformed program or policy document.
    SchemaError,
    /// Requested or referenced plugin is not registered.
    UnknownPlugin,
    /// Any other operational misconfiguration.
    ConfigError,
    /// I/O or other internal failure.
    Internal,
}

impl ErrorCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ProgramRequired => "PROGRAM_REQUIRED",
            ErrorCode::SchemaError => "SCHEMA_ERROR",
            ErrorCode::UnknownPlugin => "UNKNOWN_PLUGIN",
            ErrorCode::ConfigError => "CONFIG_ERROR",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Which input document a schema error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Document {
    Program,
    Policy,
}

impl Document {
    pub fn as_str(self) -> &'static str {
        match self {
            Document::Program => "program",
            Document::Policy => "policy",
        }
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, VerifyError>;

/// Unified error type used by core and engine.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("program required")]
    ProgramRequired,
    #[error("invalid {document}: {msg}")]
    Schema { document: Document, msg: String },
    #[error("unknown plugin: {0}")]
    UnknownPlugin(String),
    #[error("config: {0}")]
    Config(String),
    #[error("io: {0}")]
    Io(String),
}

impl VerifyError {
    pub fn program(msg: impl Into<String>) -> Self {
        VerifyError::Schema {
            document: Document::Program,
            msg: msg.into(),
        }
    }

    pub fn policy(msg: impl Into<String>) -> Self {
        VerifyError::Schema {
            document: Document::Policy,
            msg: msg.into(),
        }
    }

    /// Map internal error to a stable caller-facing code.
    pub fn code(&self) -> ErrorCode {
        match self {
            VerifyError::ProgramRequired => ErrorCode::ProgramRequired,
            VerifyError::Schema { .. } => ErrorCode::SchemaError,
            VerifyError::UnknownPlugin(_) => ErrorCode::UnknownPlugin,
            VerifyError::Config(_) => ErrorCode::ConfigError,
            VerifyError::Io(_) => ErrorCode::Internal,
        }
    }

    /// Operational misconfiguration, alerted on separately from rejections.
    pub fn is_config(&self) -> bool {
        matches!(self, VerifyError::UnknownPlugin(_) | VerifyError::Config(_))
    }
}
