use std::net::SocketAddr;

use axum::http::HeaderValue;
use reqwest::Url;
use secrecy::SecretString;

use crate::gate::TokenSet;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Where and how to reach the TTS provider.
#[derive(Debug)]
pub struct UpstreamConfig {
    /// Endpoint with the `GroupId` query parameter already applied.
    pub endpoint: Url,
    pub api_key: SecretString,
}

#[derive(Debug)]
pub struct ProxyConfig {
    pub listen_addr: SocketAddr,
    pub allowed_origin: HeaderValue,
    pub tokens: TokenSet,
    pub upstream: UpstreamConfig,
}

impl ProxyConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let raw_url = required("THIRD_PARTY_TTS_URL")?;
        let group_id = required("THIRD_PARTY_GROUP_ID")?;
        let api_key = required("THIRD_PARTY_TTS_KEY")?;
        let origin = required("CORS_ORIGIN")?;
        let tokens = required("PROXY_TOKEN")?;

        let url = Url::parse(raw_url.trim()).map_err(|e| ConfigError::Invalid {
            name: "THIRD_PARTY_TTS_URL",
            reason: e.to_string(),
        })?;

        let allowed_origin =
            HeaderValue::from_str(origin.trim()).map_err(|e| ConfigError::Invalid {
                name: "CORS_ORIGIN",
                reason: e.to_string(),
            })?;

        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match lookup("PORT") {
            Some(p) => p.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: "PORT",
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };
        let listen_addr: SocketAddr =
            format!("{}:{}", host, port)
                .parse()
                .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                    name: "HOST",
                    reason: e.to_string(),
                })?;

        Ok(Self {
            listen_addr,
            allowed_origin,
            tokens: TokenSet::parse(&tokens),
            upstream: UpstreamConfig {
                endpoint: with_group_id(url, group_id.trim()),
                api_key: SecretString::from(api_key),
            },
        })
    }
}

/// Sets `GroupId` on the endpoint, replacing any value already present.
/// Other query pairs are kept byte-for-byte.
fn with_group_id(mut url: Url, group_id: &str) -> Url {
    let kept = url.query().map(|q| {
        q.split('&')
            .filter(|pair| !pair.is_empty() && pair.split('=').next() != Some("GroupId"))
            .collect::<Vec<_>>()
            .join("&")
    });

    url.set_query(kept.as_deref().filter(|q| !q.is_empty()));
    url.query_pairs_mut().append_pair("GroupId", group_id);
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn base() -> Vec<(&'static str, &'static str)> {
        vec![
            ("THIRD_PARTY_TTS_URL", "https://tts.example.com/v1/t2a_v2"),
            ("THIRD_PARTY_GROUP_ID", "group-42"),
            ("THIRD_PARTY_TTS_KEY", "upstream-key"),
            ("CORS_ORIGIN", "https://app.example.com"),
            ("PROXY_TOKEN", "tok"),
        ]
    }

    #[test]
    fn test_loads_with_defaults() {
        let config = ProxyConfig::from_lookup(env(&base())).unwrap();

        assert_eq!(config.listen_addr, "0.0.0.0:3000".parse().unwrap());
        assert_eq!(config.allowed_origin, "https://app.example.com");
        assert_eq!(
            config.upstream.endpoint.as_str(),
            "https://tts.example.com/v1/t2a_v2?GroupId=group-42"
        );
        assert_eq!(config.upstream.api_key.expose_secret(), "upstream-key");
        assert!(config.tokens.accepts("tok"));
    }

    #[test]
    fn test_missing_variable_is_named() {
        let pairs: Vec<_> = base()
            .into_iter()
            .filter(|(k, _)| *k != "CORS_ORIGIN")
            .collect();

        match ProxyConfig::from_lookup(env(&pairs)) {
            Err(ConfigError::Missing(name)) => assert_eq!(name, "CORS_ORIGIN"),
            other => panic!("expected missing CORS_ORIGIN, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_port() {
        let mut pairs = base();
        pairs.push(("PORT", "http"));

        assert!(matches!(
            ProxyConfig::from_lookup(env(&pairs)),
            Err(ConfigError::Invalid { name: "PORT", .. })
        ));
    }

    #[test]
    fn test_invalid_upstream_url() {
        let mut pairs = base();
        pairs[0] = ("THIRD_PARTY_TTS_URL", "not a url");

        assert!(matches!(
            ProxyConfig::from_lookup(env(&pairs)),
            Err(ConfigError::Invalid {
                name: "THIRD_PARTY_TTS_URL",
                ..
            })
        ));
    }

    #[test]
    fn test_group_id_replaces_existing() {
        let url = Url::parse("https://tts.example.com/x?GroupId=old&a=1").unwrap();
        let url = with_group_id(url, "new");
        assert_eq!(url.as_str(), "https://tts.example.com/x?a=1&GroupId=new");
    }

    #[test]
    fn test_group_id_leaves_other_pairs_untouched() {
        let url = Url::parse("https://tts.example.com/x?q=a+b&GroupId=old&r=%2F").unwrap();
        let url = with_group_id(url, "g 1");
        assert_eq!(
            url.as_str(),
            "https://tts.example.com/x?q=a+b&r=%2F&GroupId=g+1"
        );

        let url = with_group_id(Url::parse("https://tts.example.com/x?").unwrap(), "g");
        assert_eq!(url.as_str(), "https://tts.example.com/x?GroupId=g");
    }
}
