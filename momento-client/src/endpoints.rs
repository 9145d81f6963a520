//! Service endpoint resolution.
//!
//! An auth token is a JWT whose payload names the two hosts the client talks
//! to: `cp` for the control plane and `c` for the data plane.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

use crate::{Result, SdkError};

/// Port dialed when an endpoint carries none.
pub const DEFAULT_PORT: u16 = 443;

/// The control-plane and data-plane hosts for one client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Host serving cache lifecycle and signing-key calls.
    pub control_endpoint: String,
    /// Host serving item calls.
    pub cache_endpoint: String,
}

#[derive(Deserialize)]
struct Claims {
    #[serde(rename = "cp")]
    control: Option<String>,
    #[serde(rename = "c")]
    cache: Option<String>,
}

impl Endpoints {
    /// Read both endpoints from the token's claims.
    pub fn resolve(auth_token: &str) -> Result<Self> {
        Self::resolve_with_overrides(auth_token, None, None)
    }

    /// Read the endpoints from the token, preferring explicit overrides.
    ///
    /// The token is only decoded when at least one endpoint is missing.
    pub fn resolve_with_overrides(
        auth_token: &str,
        control_endpoint: Option<&str>,
        cache_endpoint: Option<&str>,
    ) -> Result<Self> {
        if let (Some(control), Some(cache)) = (control_endpoint, cache_endpoint) {
            return Ok(Self {
                control_endpoint: control.to_string(),
                cache_endpoint: cache.to_string(),
            });
        }

        let claims = decode_claims(auth_token)?;

        let control_endpoint = control_endpoint
            .map(str::to_string)
            .or(claims.control)
            .ok_or_else(|| SdkError::invalid_argument("Auth token is missing the `cp` claim"))?;
        let cache_endpoint = cache_endpoint
            .map(str::to_string)
            .or(claims.cache)
            .ok_or_else(|| SdkError::invalid_argument("Auth token is missing the `c` claim"))?;

        Ok(Self {
            control_endpoint,
            cache_endpoint,
        })
    }

    /// URI for the control plane.
    pub fn control_uri(&self) -> String {
        to_uri(&self.control_endpoint)
    }

    /// URI for the data plane.
    pub fn cache_uri(&self) -> String {
        to_uri(&self.cache_endpoint)
    }
}

fn decode_claims(auth_token: &str) -> Result<Claims> {
    let payload = auth_token
        .split('.')
        .nth(1)
        .filter(|segment| !segment.is_empty())
        .ok_or_else(|| SdkError::invalid_argument("Auth token is not a valid JWT"))?;

    let json = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| SdkError::invalid_argument(format!("Auth token payload is not base64: {}", e)))?;

    serde_json::from_slice(&json)
        .map_err(|e| SdkError::invalid_argument(format!("Auth token payload is not valid JSON: {}", e)))
}

/// Turn a bare host into a dialable URI.
///
/// Hosts without a scheme are dialed over TLS; hosts without a port use
/// [`DEFAULT_PORT`].
pub fn to_uri(endpoint: &str) -> String {
    if endpoint.contains("://") {
        return endpoint.to_string();
    }
    if has_port(endpoint) {
        format!("https://{}", endpoint)
    } else {
        format!("https://{}:{}", endpoint, DEFAULT_PORT)
    }
}

fn has_port(host: &str) -> bool {
    match host.rsplit_once(':') {
        Some((_, port)) => !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()),
        None => false,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ErrorKind;

    /// Build an unsigned token carrying the given claims.
    pub(crate) fn token_for(control: &str, cache: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256"}"#);
        let payload = URL_SAFE_NO_PAD.encode(
            serde_json::json!({ "sub": "tests", "cp": control, "c": cache }).to_string(),
        );
        format!("{}.{}.signature", header, payload)
    }

    #[test]
    fn test_resolve_from_claims() {
        let token = token_for("control.example.com", "cache.example.com");
        let endpoints = Endpoints::resolve(&token).unwrap();

        assert_eq!(endpoints.control_endpoint, "control.example.com");
        assert_eq!(endpoints.cache_endpoint, "cache.example.com");
        assert_eq!(endpoints.cache_uri(), "https://cache.example.com:443");
    }

    #[test]
    fn test_overrides_win() {
        let token = token_for("control.example.com", "cache.example.com");
        let endpoints =
            Endpoints::resolve_with_overrides(&token, None, Some("http://localhost:9000")).unwrap();

        assert_eq!(endpoints.control_endpoint, "control.example.com");
        assert_eq!(endpoints.cache_uri(), "http://localhost:9000");
    }

    #[test]
    fn test_full_overrides_skip_decoding() {
        let endpoints =
            Endpoints::resolve_with_overrides("opaque", Some("a:1"), Some("b:2")).unwrap();
        assert_eq!(endpoints.control_uri(), "https://a:1");
        assert_eq!(endpoints.cache_uri(), "https://b:2");
    }

    #[test]
    fn test_malformed_tokens() {
        for token in ["", "no-dots", "a..c", "a.!!!.c", "a.bm90IGpzb24.c"] {
            let err = Endpoints::resolve(token).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{:?}", token);
        }
    }

    #[test]
    fn test_missing_claim() {
        let payload = URL_SAFE_NO_PAD.encode(br#"{"c":"cache.example.com"}"#);
        let err = Endpoints::resolve(&format!("h.{}.s", payload)).unwrap_err();
        assert!(err.message().contains("cp"));
    }
}
