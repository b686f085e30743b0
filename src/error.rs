use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

/// Failure detail kept on a response for the request logger.
///
/// It never reaches the caller: bodies are always the generic message.
#[derive(Debug, Clone)]
pub struct ErrorDetail(pub String);

#[derive(thiserror::Error, Debug)]
pub enum AppError {
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found")]
    NotFound,

    #[error("method {0} not allowed")]
    MethodNotAllowed(String),

    #[error("upstream failure: {0}")]
    Upstream(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The caller-facing body. Deliberately carries nothing from the detail.
    pub fn public_message(&self) -> &'static str {
        match self {
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::NotFound => "Not Found",
            AppError::MethodNotAllowed(_) => "Method not allowed",
            AppError::Upstream(_) => "TTS service error",
            AppError::Internal(_) => "Internal server error",
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Internal(format!("invalid JSON: {}", e))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();

        let mut response = (
            status,
            [
                (header::CONTENT_TYPE, HeaderValue::from_static("text/plain")),
                (header::CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            ],
            self.public_message(),
        )
            .into_response();

        response.extensions_mut().insert(ErrorDetail(detail));
        response
    }
}
