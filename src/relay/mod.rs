pub mod classify;
pub mod client;
pub mod payload;

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use futures_util::TryStreamExt;
use reqwest::Client;
use secrecy::ExposeSecret;

use crate::config::UpstreamConfig;
use crate::error::AppError;

pub use classify::{classify_content_type, classify_json, decode_hex_audio, ContentKind, JsonShape};
pub use payload::{SpeechRequest, UpstreamPayload};

const AUDIO_CACHE_CONTROL: &str = "no-cache, no-store, must-revalidate";
const PASSTHROUGH_CACHE_CONTROL: &str = "no-cache";
const DEFAULT_AUDIO_TYPE: &str = "audio/mpeg";
const DEFAULT_BINARY_TYPE: &str = "application/octet-stream";

/// Calls the provider and turns whatever it answers with into audio.
pub struct TtsRelay {
    client: Client,
    upstream: Arc<UpstreamConfig>,
}

impl TtsRelay {
    pub fn new(client: Client, upstream: Arc<UpstreamConfig>) -> Self {
        Self { client, upstream }
    }

    pub async fn synthesize(&self, request: &SpeechRequest) -> Result<Response, AppError> {
        let payload = UpstreamPayload::from_request(request);

        tracing::debug!(
            "Upstream TTS request: voice={}, format={}, text_len={}",
            payload.voice_setting.voice_id,
            payload.audio_setting.format,
            request.text.as_ref().and_then(|t| t.as_str()).map(str::len).unwrap_or(0),
        );

        let response = self
            .client
            .post(self.upstream.endpoint.clone())
            .bearer_auth(self.upstream.api_key.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("request to provider failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(AppError::Upstream(format!(
                "provider returned {}: {}",
                status, error_text
            )));
        }

        let content_type = header_str(response.headers(), header::CONTENT_TYPE);

        match classify_content_type(content_type.as_deref()) {
            ContentKind::Audio => Ok(stream_response(
                response,
                content_type.as_deref().unwrap_or(DEFAULT_AUDIO_TYPE),
                AUDIO_CACHE_CONTROL,
            )),
            ContentKind::Json => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| AppError::Internal(format!("reading provider body: {}", e)))?;
                self.resolve_json(body, content_type.as_deref()).await
            }
            ContentKind::Other => Ok(stream_response(
                response,
                content_type.as_deref().unwrap_or(DEFAULT_BINARY_TYPE),
                PASSTHROUGH_CACHE_CONTROL,
            )),
        }
    }

    async fn resolve_json(
        &self,
        body: Bytes,
        content_type: Option<&str>,
    ) -> Result<Response, AppError> {
        let value: serde_json::Value = match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("Provider sent unparsable JSON, passing it through: {}", e);
                return Ok(buffered_response(
                    body,
                    content_type.unwrap_or(DEFAULT_BINARY_TYPE),
                    PASSTHROUGH_CACHE_CONTROL,
                ));
            }
        };

        match classify_json(&value) {
            JsonShape::BusinessError { code, message } => Err(AppError::Upstream(format!(
                "provider business error {}: {}",
                code,
                message.unwrap_or("<no message>")
            ))),
            JsonShape::AudioUrl(url) => self.fetch_audio(url).await,
            JsonShape::HexAudio(hex) => {
                let audio = decode_hex_audio(hex)
                    .map_err(|e| AppError::Upstream(format!("malformed hex audio: {}", e)))?;

                tracing::debug!("Decoded {} bytes of hex audio", audio.len());

                Ok(buffered_response(
                    Bytes::from(audio),
                    DEFAULT_AUDIO_TYPE,
                    AUDIO_CACHE_CONTROL,
                ))
            }
            JsonShape::Unrecognized(keys) => Err(AppError::Upstream(format!(
                "unrecognized provider JSON, keys: [{}]",
                keys.join(", ")
            ))),
        }
    }

    async fn fetch_audio(&self, url: &str) -> Result<Response, AppError> {
        tracing::debug!("Fetching audio from provider URL");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("audio URL fetch failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Upstream(format!(
                "audio URL returned {}",
                response.status()
            )));
        }

        let content_type = header_str(response.headers(), header::CONTENT_TYPE);
        Ok(stream_response(
            response,
            content_type.as_deref().unwrap_or(DEFAULT_AUDIO_TYPE),
            AUDIO_CACHE_CONTROL,
        ))
    }
}

fn header_str(headers: &reqwest::header::HeaderMap, name: header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn content_headers(content_type: &str, cache_control: &'static str) -> [(header::HeaderName, HeaderValue); 2] {
    let content_type = HeaderValue::from_str(content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_BINARY_TYPE));

    [
        (header::CONTENT_TYPE, content_type),
        (header::CACHE_CONTROL, HeaderValue::from_static(cache_control)),
    ]
}

/// Forwards the upstream body chunk by chunk without buffering it.
fn stream_response(
    upstream: reqwest::Response,
    content_type: &str,
    cache_control: &'static str,
) -> Response {
    let stream = upstream
        .bytes_stream()
        .inspect_err(|e| tracing::warn!("Upstream body stream broke off: {}", e));

    (
        StatusCode::OK,
        content_headers(content_type, cache_control),
        Body::from_stream(stream),
    )
        .into_response()
}

fn buffered_response(body: Bytes, content_type: &str, cache_control: &'static str) -> Response {
    (
        StatusCode::OK,
        content_headers(content_type, cache_control),
        body,
    )
        .into_response()
}
