//! Pure inspection of provider responses.
//!
//! The JSON checks form a strict priority chain: the first match wins.

use serde_json::Value;

/// Accepted field names for a downloadable audio URL, highest priority first.
pub const AUDIO_URL_FIELDS: [&str; 3] = ["audio_url", "file_url", "download_url"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Audio,
    Json,
    Other,
}

pub fn classify_content_type(content_type: Option<&str>) -> ContentKind {
    match content_type {
        Some(ct) if ct.starts_with("audio/") => ContentKind::Audio,
        Some(ct) if ct.contains("application/json") => ContentKind::Json,
        _ => ContentKind::Other,
    }
}

#[derive(Debug, PartialEq)]
pub enum JsonShape<'a> {
    /// `base_resp.status_code` present and nonzero.
    BusinessError { code: String, message: Option<&'a str> },
    AudioUrl(&'a str),
    /// `data.audio` as a hex string.
    HexAudio(&'a str),
    /// None of the above; carries the top-level keys for diagnostics.
    Unrecognized(Vec<String>),
}

pub fn classify_json(value: &Value) -> JsonShape<'_> {
    let base_resp = value.get("base_resp");
    if let Some(code) = base_resp
        .and_then(|b| b.get("status_code"))
        .and_then(business_error_code)
    {
        return JsonShape::BusinessError {
            code,
            message: base_resp
                .and_then(|b| b.get("status_msg"))
                .and_then(Value::as_str),
        };
    }

    if let Some(url) = AUDIO_URL_FIELDS
        .iter()
        .find_map(|field| non_empty_str(value.get(*field)))
    {
        return JsonShape::AudioUrl(url);
    }

    if let Some(hex) = non_empty_str(value.get("data").and_then(|d| d.get("audio"))) {
        return JsonShape::HexAudio(hex);
    }

    let keys = value
        .as_object()
        .map(|o| o.keys().cloned().collect())
        .unwrap_or_default();
    JsonShape::Unrecognized(keys)
}

/// Any nonzero number, or a string other than `"0"`, is an error code.
fn business_error_code(code: &Value) -> Option<String> {
    match code {
        Value::Number(n) if n.as_f64().is_some_and(|f| f != 0.0) => Some(n.to_string()),
        Value::String(s) if !s.trim().is_empty() && s.trim() != "0" => Some(s.clone()),
        _ => None,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Every pair of hex digits becomes one byte. The whole string must decode:
/// odd lengths, stray whitespace and non-hex digits are rejected.
pub fn decode_hex_audio(hex: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(hex)
}
