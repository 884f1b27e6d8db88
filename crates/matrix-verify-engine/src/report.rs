//! Diagnostic reporter.
//!
//! Pure rendering of a finished `VerificationReport` or an aborting
//! `VerifyError`. JSON output goes through `serde_json`, which escapes
//! backslashes, quotes and control characters in detail strings.

use std::fmt::Write;

use serde_json::{json, Value};

use matrix_verify_core::error::VerifyError;
use matrix_verify_core::report::VerificationReport;

/// `{ ok, verdict, violations: [...], meta }`, violations in report order.
/// `meta.program_hash` repeats `meta.envelope.program_hash`.
pub fn render_json(report: &VerificationReport) -> Value {
    let meta = report.meta();
    json!({
        "ok": report.is_accept(),
        "verdict": report.verdict().as_str(),
        "violations": report.violations(),
        "meta": {
            "declared_abi": meta.declared_abi,
            "expected_abi": meta.expected_abi,
            "abi_compat": meta.abi_compat,
            "program_hash": meta.envelope.program_hash,
            "plugins": meta.plugins,
            "abi_hash": meta.abi_hash,
            "envelope": meta.envelope,
            "elapsed_ms": meta.elapsed.as_millis() as u64,
        },
    })
}

/// Gate body for a REJECT: `{ error, detail, report }`.
///
/// `error` is the kind of the first violation, `detail` lists every
/// violation on one line.
pub fn render_reject(report: &VerificationReport) -> Value {
    let error = report
        .violations()
        .first()
        .map_or("REJECT", |v| v.kind.as_str());
    let detail = report
        .violations()
        .iter()
        .map(|v| match &v.source {
            Some(src) => format!("{} [{src}]: {}", v.kind.as_str(), v.detail),
            None => format!("{}: {}", v.kind.as_str(), v.detail),
        })
        .collect::<Vec<_>>()
        .join("; ");
    json!({
        "error": error,
        "detail": detail,
        "report": render_json(report),
    })
}

/// Boundary error body: `{ "error": <code>, "detail": <message> }`.
pub fn render_error(err: &VerifyError) -> Value {
    json!({
        "error": err.code().as_str(),
        "detail": err.to_string(),
    })
}

pub fn to_pretty(v: &Value) -> String {
    serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
}

/// Human-readable summary, one line per violation.
pub fn render_text(report: &VerificationReport) -> String {
    let meta = report.meta();
    let mut out = String::new();

    if report.is_accept() {
        let _ = writeln!(out, "ACCEPT abi={} ({})", meta.declared_abi, meta.abi_compat);
        let _ = writeln!(out, "program: {}", meta.envelope.program_hash);
        let _ = writeln!(out, "abi_hash: {}", meta.abi_hash);
        if !meta.plugins.is_empty() {
            let _ = writeln!(out, "plugins: {}", meta.plugins.join(","));
        }
        return out;
    }

    let _ = writeln!(out, "REJECT ({} violation(s))", report.violations().len());
    for v in report.violations() {
        let _ = write!(out, "  {}", v.kind.as_str());
        if let Some(src) = &v.source {
            let _ = write!(out, " [{src}]");
        }
        if let Some(loc) = &v.location {
            let _ = write!(out, " {loc}");
        }
        let _ = write!(out, ": {}", v.detail);
        if let Some(code) = &v.code {
            let _ = write!(out, " ({code})");
        }
        out.push('\n');
    }
    out
}
