//! HTTP verification gate.
//!
//! An axum middleware that buffers the request body, verifies it as a
//! program and forwards the untouched request only on ACCEPT.
//!
//! Every non-forwarded response carries a JSON `{ error, detail }` body:
//!
//! - body over limit  -> 413 `PAYLOAD_TOO_LARGE`
//! - unreadable body  -> 400 `BODY_READ_FAILED`
//! - empty body       -> 400 `PROGRAM_REQUIRED`
//! - REJECT           -> 403, first violation kind, full report under `report`
//! - schema error     -> 403 `SCHEMA_ERROR`
//! - config / io      -> 500

use std::error::Error as StdError;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::Router;
use http_body_util::LengthLimitError;
use serde_json::{json, Value};

use matrix_verify_core::error::VerifyError;

use crate::app_state::{AppState, PolicySource, VerifyRequest};
use crate::report::{render_error, render_reject};

/// Per-route gate settings.
#[derive(Debug, Clone)]
pub struct GateSettings {
    pub policy: PolicySource,
    pub expected_abi: String,
    /// Empty means `plugins.default` from config.
    pub plugins: Vec<String>,
    pub max_body_bytes: usize,
}

#[derive(Clone)]
pub struct GateState {
    app: AppState,
    settings: Arc<GateSettings>,
}

impl GateState {
    pub fn new(app: AppState, settings: GateSettings) -> Self {
        Self {
            app,
            settings: Arc::new(settings),
        }
    }
}

/// Put every route of `router` behind the gate.
pub fn protect<S>(router: Router<S>, gate: GateState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(gate, verify_gate))
}

pub async fn verify_gate(State(gate): State<GateState>, req: Request, next: Next) -> Response {
    let (parts, body) = req.into_parts();
    let program = match to_bytes(body, gate.settings.max_body_bytes).await {
        Ok(b) => b,
        Err(e) if is_length_limit(&e) => {
            return json_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                json!({
                    "error": "PAYLOAD_TOO_LARGE",
                    "detail": format!("body exceeds {} bytes", gate.settings.max_body_bytes),
                }),
            );
        }
        Err(e) => {
            tracing::warn!(error = %e, "gate failed to read request body");
            return json_response(
                StatusCode::BAD_REQUEST,
                json!({ "error": "BODY_READ_FAILED", "detail": e.to_string() }),
            );
        }
    };

    let vreq = VerifyRequest {
        program: program.clone(),
        policy: gate.settings.policy.clone(),
        expected_abi: gate.settings.expected_abi.clone(),
        plugins: gate.settings.plugins.clone(),
    };

    match gate.app.verify_request(&vreq).await {
        Ok(report) if report.is_accept() => {
            next.run(Request::from_parts(parts, Body::from(program))).await
        }
        Ok(report) => json_response(StatusCode::FORBIDDEN, render_reject(&report)),
        Err(e) => {
            let status = match &e {
                VerifyError::ProgramRequired => StatusCode::BAD_REQUEST,
                VerifyError::Schema { .. } => StatusCode::FORBIDDEN,
                VerifyError::UnknownPlugin(_) | VerifyError::Config(_) | VerifyError::Io(_) => {
                    tracing::error!(error = %e, "verification gate misconfigured");
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            json_response(status, render_error(&e))
        }
    }
}

fn is_length_limit(err: &(dyn StdError + 'static)) -> bool {
    let mut cur = Some(err);
    while let Some(e) = cur {
        if e.is::<LengthLimitError>() {
            return true;
        }
        cur = e.source();
    }
    false
}

fn json_response(status: StatusCode, body: Value) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "application/json")],
        body.to_string(),
    )
        .into_response()
}
