//! Origin and proxy-token checks guarding the relay.
//!
//! The origin is checked first so browser preflights never need a token.
//! Every rejection looks the same to the caller; the reason is only logged.

use axum::{
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use secrecy::{ExposeSecret, SecretString};

use crate::error::AppError;

pub const PROXY_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-proxy-token");

const PREFLIGHT_METHODS: &str = "POST, OPTIONS";
const PREFLIGHT_HEADERS: &str = "Content-Type, X-Proxy-Token";
const PREFLIGHT_MAX_AGE: &str = "86400";

/// The set of tokens a caller may present in `X-Proxy-Token`.
#[derive(Debug)]
pub enum TokenSet {
    Single(SecretString),
    Many(Vec<SecretString>),
    /// Configured value could not be parsed; nothing is accepted.
    Unusable,
}

impl TokenSet {
    /// A value starting with `[` is read as a JSON list of strings,
    /// anything else as one token.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();

        if !trimmed.starts_with('[') {
            return TokenSet::Single(SecretString::from(trimmed.to_string()));
        }

        match serde_json::from_str::<Vec<String>>(trimmed) {
            Ok(tokens) => TokenSet::Many(
                tokens
                    .into_iter()
                    .filter(|t| !t.is_empty())
                    .map(SecretString::from)
                    .collect(),
            ),
            Err(e) => {
                tracing::error!("PROXY_TOKEN looks like a list but failed to parse: {}", e);
                TokenSet::Unusable
            }
        }
    }

    pub fn accepts(&self, presented: &str) -> bool {
        if presented.is_empty() {
            return false;
        }

        match self {
            TokenSet::Single(token) => token.expose_secret() == presented,
            TokenSet::Many(tokens) => tokens.iter().any(|t| t.expose_secret() == presented),
            TokenSet::Unusable => false,
        }
    }

    pub fn count(&self) -> usize {
        match self {
            TokenSet::Single(_) => 1,
            TokenSet::Many(tokens) => tokens.len(),
            TokenSet::Unusable => 0,
        }
    }
}

pub struct AccessGate {
    allowed_origin: HeaderValue,
    tokens: TokenSet,
}

impl AccessGate {
    pub fn new(allowed_origin: HeaderValue, tokens: TokenSet) -> Self {
        Self {
            allowed_origin,
            tokens,
        }
    }

    pub fn allowed_origin(&self) -> &HeaderValue {
        &self.allowed_origin
    }

    pub fn check_origin(&self, headers: &HeaderMap) -> Result<(), AppError> {
        match headers.get(header::ORIGIN) {
            None => Err(AppError::Unauthorized("origin header required".into())),
            Some(origin) if *origin != self.allowed_origin => Err(AppError::Unauthorized(
                format!("origin {:?} not allowed", origin),
            )),
            Some(_) => Ok(()),
        }
    }

    pub fn check_token(&self, headers: &HeaderMap) -> Result<(), AppError> {
        let presented = headers
            .get(PROXY_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("proxy token missing".into()))?;

        if let TokenSet::Unusable = self.tokens {
            return Err(AppError::Unauthorized(
                "proxy token list is misconfigured".into(),
            ));
        }

        if self.tokens.accepts(presented) {
            Ok(())
        } else {
            Err(AppError::Unauthorized("proxy token rejected".into()))
        }
    }

    pub fn preflight(&self) -> Response {
        (
            StatusCode::OK,
            [
                (header::ACCESS_CONTROL_ALLOW_ORIGIN, self.allowed_origin.clone()),
                (
                    header::ACCESS_CONTROL_ALLOW_METHODS,
                    HeaderValue::from_static(PREFLIGHT_METHODS),
                ),
                (
                    header::ACCESS_CONTROL_ALLOW_HEADERS,
                    HeaderValue::from_static(PREFLIGHT_HEADERS),
                ),
                (
                    header::ACCESS_CONTROL_MAX_AGE,
                    HeaderValue::from_static(PREFLIGHT_MAX_AGE),
                ),
            ],
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://app.example.com";

    fn gate(tokens: &str) -> AccessGate {
        AccessGate::new(HeaderValue::from_static(ORIGIN), TokenSet::parse(tokens))
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for &(k, v) in pairs {
            map.insert(HeaderName::from_static(k), HeaderValue::from_static(v));
        }
        map
    }

    #[test]
    fn test_single_token() {
        let set = TokenSet::parse("secret");
        assert_eq!(set.count(), 1);
        assert!(set.accepts("secret"));
        assert!(!set.accepts("Secret"));
        assert!(!set.accepts(""));
    }

    #[test]
    fn test_token_list() {
        let set = TokenSet::parse(r#"["alpha", "beta", ""]"#);
        assert_eq!(set.count(), 2);
        assert!(set.accepts("alpha"));
        assert!(set.accepts("beta"));
        assert!(!set.accepts("gamma"));
        assert!(!set.accepts(""));
    }

    #[test]
    fn test_broken_list_accepts_nothing() {
        let set = TokenSet::parse(r#"["alpha", "#);
        assert!(matches!(set, TokenSet::Unusable));
        assert!(!set.accepts("alpha"));
        assert!(!set.accepts(r#"["alpha", "#));
    }

    #[test]
    fn test_origin_missing_or_wrong() {
        let gate = gate("tok");
        assert!(gate.check_origin(&HeaderMap::new()).is_err());
        assert!(gate
            .check_origin(&headers(&[("origin", "https://evil.example.com")]))
            .is_err());
        assert!(gate.check_origin(&headers(&[("origin", ORIGIN)])).is_ok());
    }

    #[test]
    fn test_token_check() {
        let gate = gate(r#"["a1", "b2"]"#);
        assert!(gate.check_token(&HeaderMap::new()).is_err());
        assert!(gate.check_token(&headers(&[("x-proxy-token", "zz")])).is_err());
        assert!(gate.check_token(&headers(&[("x-proxy-token", "b2")])).is_ok());
    }

    #[test]
    fn test_rejections_share_public_message() {
        let gate = gate("tok");
        let missing = gate.check_token(&HeaderMap::new()).unwrap_err();
        let wrong = gate
            .check_token(&headers(&[("x-proxy-token", "nope")]))
            .unwrap_err();
        let origin = gate.check_origin(&HeaderMap::new()).unwrap_err();

        assert_eq!(missing.public_message(), wrong.public_message());
        assert_eq!(missing.public_message(), origin.public_message());
    }

    #[test]
    fn test_preflight_headers() {
        let response = gate("tok").preflight();
        let h = response.headers();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(h[header::ACCESS_CONTROL_ALLOW_ORIGIN], ORIGIN);
        assert_eq!(h[header::ACCESS_CONTROL_ALLOW_METHODS], "POST, OPTIONS");
        assert_eq!(
            h[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "Content-Type, X-Proxy-Token"
        );
        assert_eq!(h[header::ACCESS_CONTROL_MAX_AGE], "86400");
    }
}
