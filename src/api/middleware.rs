use std::any::Any;
use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::{header, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::api::routes::AppState;
use crate::error::{AppError, ErrorDetail};

/// Origin check, preflight, then token check. Anything that gets past the
/// origin check leaves with `Access-Control-Allow-Origin` set.
pub async fn access_gate(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let gate = &state.gate;

    if let Err(e) = gate.check_origin(request.headers()) {
        return e.into_response();
    }

    let mut response = if request.method() == Method::OPTIONS {
        gate.preflight()
    } else {
        match gate.check_token(request.headers()) {
            Ok(()) => next.run(request).await,
            Err(e) => e.into_response(),
        }
    };

    response
        .headers_mut()
        .insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, gate.allowed_origin().clone());
    response
}

/// One structured line per request, failures included.
pub async fn log_request(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let status = response.status();
    let duration_ms = start.elapsed().as_millis() as u64;
    let error = response
        .extensions()
        .get::<ErrorDetail>()
        .map(|d| d.0.as_str());

    if status.is_server_error() {
        tracing::error!(%method, %path, status = status.as_u16(), duration_ms, error, "request");
    } else if error.is_some() {
        tracing::warn!(%method, %path, status = status.as_u16(), duration_ms, error, "request");
    } else {
        tracing::info!(%method, %path, status = status.as_u16(), duration_ms, "request");
    }

    response
}

/// Turns a handler panic into the generic 500.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .cloned()
        .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
        .unwrap_or_else(|| "unknown panic".to_string());

    AppError::Internal(format!("handler panicked: {}", detail)).into_response()
}
