use axum::{
    body::Bytes,
    extract::State,
    http::Method,
    response::Response,
};
use std::sync::Arc;

use crate::api::routes::AppState;
use crate::error::AppError;
use crate::relay::SpeechRequest;

pub async fn tts(
    State(state): State<Arc<AppState>>,
    method: Method,
    body: Bytes,
) -> Result<Response, AppError> {
    if method != Method::POST {
        return Err(AppError::MethodNotAllowed(method.to_string()));
    }

    let request = SpeechRequest::from_slice(&body)?;

    state.relay.synthesize(&request).await
}

pub async fn not_found() -> AppError {
    AppError::NotFound
}
