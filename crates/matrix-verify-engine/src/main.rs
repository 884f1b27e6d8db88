//! matrix-verify command-line verifier.
//!
//! Exit codes: 0 ACCEPT, 1 REJECT, 2 schema/config/io error.
//! Diagnostics go to stdout; logs go to stderr (`RUST_LOG`).

use std::path::PathBuf;
use std::process::ExitCode;

use bytes::Bytes;
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use matrix_verify_core::error::{Result, VerifyError};
use matrix_verify_core::report::VerificationReport;
use matrix_verify_engine::app_state::{AppState, PolicySource, VerifyRequest};
use matrix_verify_engine::config::{self, VerifierConfig};
use matrix_verify_engine::report::{render_error, render_json, render_text, to_pretty};

#[derive(Parser, Debug)]
#[command(name = "matrix-verify", version, about = "Verify a program against an ABI policy")]
struct Cli {
    /// Program document (matrix.program.v1)
    #[arg(long)]
    program: PathBuf,
    /// Policy document (matrix.policy.v1, YAML or JSON)
    #[arg(long)]
    policy: PathBuf,
    /// Expected ABI identifier
    #[arg(long = "expect")]
    expect: String,
    /// Plugins to run, in order (default: plugins.default from config)
    #[arg(long, value_delimiter = ',')]
    plugins: Vec<String>,
    /// Engine config (YAML)
    #[arg(long)]
    config: Option<PathBuf>,
    /// JSON output
    #[arg(long)]
    json: bool,
    /// Minimal output
    #[arg(long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli).await {
        Ok(report) => {
            if cli.json {
                println!("{}", to_pretty(&render_json(&report)));
            } else if !cli.quiet || !report.is_accept() {
                print!("{}", render_text(&report));
            }
            if report.is_accept() {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            if cli.json {
                println!("{}", to_pretty(&render_error(&e)));
            } else {
                eprintln!("{}: {e}", e.code().as_str());
            }
            ExitCode::from(2)
        }
    }
}

async fn run(cli: &Cli) -> Result<VerificationReport> {
    let cfg = match &cli.config {
        Some(path) => config::load_from_file(path)?,
        None => VerifierConfig::default(),
    };
    let state = AppState::new(cfg)?;

    let program = std::fs::read(&cli.program).map_err(|e| {
        VerifyError::Io(format!("read program {} failed: {e}", cli.program.display()))
    })?;

    let req = VerifyRequest {
        program: Bytes::from(program),
        policy: PolicySource::Path(cli.policy.clone()),
        expected_abi: cli.expect.clone(),
        plugins: cli.plugins.clone(),
    };
    state.verify_request(&req).await
}
