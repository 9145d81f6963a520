//! Client configuration types.

use momento_grpc::ChannelConfig;
use std::time::Duration;
use tracing::warn;

use crate::endpoints::Endpoints;
use crate::validation::{validate_request_timeout, validate_ttl};
use crate::{Result, SdkError};

/// Deadline applied to every request unless configured otherwise.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

/// Client configuration.
#[derive(Clone)]
pub struct ClientConfig {
    /// Auth token; also names the service endpoints.
    pub auth_token: String,
    /// TTL applied to items stored without an explicit TTL.
    pub default_ttl_seconds: u64,
    /// Deadline for every request. Fixed for the client's lifetime.
    pub request_timeout: Duration,
    /// Control-plane host, overriding the token's claim.
    pub control_endpoint: Option<String>,
    /// Data-plane host, overriding the token's claim.
    pub cache_endpoint: Option<String>,
    /// Connect timeout for both channels.
    pub connect_timeout: Duration,
    /// Establish both channels at construction instead of on first use.
    pub eager_connection: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            auth_token: String::new(),
            default_ttl_seconds: 0,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            control_endpoint: None,
            cache_endpoint: None,
            connect_timeout: Duration::from_secs(10),
            eager_connection: false,
        }
    }
}

// The token is a credential; keep it out of debug output.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("auth_token", &"<redacted>")
            .field("default_ttl_seconds", &self.default_ttl_seconds)
            .field("request_timeout", &self.request_timeout)
            .field("control_endpoint", &self.control_endpoint)
            .field("cache_endpoint", &self.cache_endpoint)
            .field("connect_timeout", &self.connect_timeout)
            .field("eager_connection", &self.eager_connection)
            .finish()
    }
}

impl ClientConfig {
    /// Create a configuration with the required settings.
    pub fn new(auth_token: impl Into<String>, default_ttl_seconds: u64) -> Self {
        Self {
            auth_token: auth_token.into(),
            default_ttl_seconds,
            ..Default::default()
        }
    }

    /// Create a builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Load configuration from environment variables.
    ///
    /// Reads `MOMENTO_AUTH_TOKEN`, `MOMENTO_DEFAULT_TTL_SECONDS`,
    /// `MOMENTO_REQUEST_TIMEOUT_MS`, `MOMENTO_CONTROL_ENDPOINT` and
    /// `MOMENTO_CACHE_ENDPOINT`.
    pub fn from_env() -> ClientConfigBuilder {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> ClientConfigBuilder {
        let mut builder = ClientConfigBuilder::new();

        if let Some(token) = lookup("MOMENTO_AUTH_TOKEN") {
            builder = builder.auth_token(token);
        }

        if let Some(ttl) = lookup("MOMENTO_DEFAULT_TTL_SECONDS") {
            match ttl.parse() {
                Ok(ttl) => builder = builder.default_ttl_seconds(ttl),
                Err(_) => warn!(value = %ttl, "Ignoring unparsable MOMENTO_DEFAULT_TTL_SECONDS"),
            }
        }

        if let Some(timeout) = lookup("MOMENTO_REQUEST_TIMEOUT_MS") {
            match timeout.parse() {
                Ok(ms) => builder = builder.request_timeout(Duration::from_millis(ms)),
                Err(_) => warn!(value = %timeout, "Ignoring unparsable MOMENTO_REQUEST_TIMEOUT_MS"),
            }
        }

        if let Some(endpoint) = lookup("MOMENTO_CONTROL_ENDPOINT") {
            builder = builder.control_endpoint(endpoint);
        }

        if let Some(endpoint) = lookup("MOMENTO_CACHE_ENDPOINT") {
            builder = builder.cache_endpoint(endpoint);
        }

        builder
    }

    /// Check every setting that can be checked without the network.
    pub fn validate(&self) -> Result<()> {
        if self.auth_token.trim().is_empty() {
            return Err(SdkError::invalid_argument("Auth token must not be empty"));
        }
        validate_ttl(self.default_ttl_seconds)?;
        validate_request_timeout(self.request_timeout)
    }

    /// Resolve the service endpoints.
    pub fn endpoints(&self) -> Result<Endpoints> {
        Endpoints::resolve_with_overrides(
            &self.auth_token,
            self.control_endpoint.as_deref(),
            self.cache_endpoint.as_deref(),
        )
    }

    /// Channel settings for one endpoint URI.
    pub fn channel_config(&self, uri: impl Into<String>) -> ChannelConfig {
        ChannelConfig::builder()
            .endpoint(uri)
            .connect_timeout(self.connect_timeout)
            .build()
    }
}

/// Builder for client configuration.
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the auth token.
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.config.auth_token = token.into();
        self
    }

    /// Set the default item TTL.
    pub fn default_ttl_seconds(mut self, ttl: u64) -> Self {
        self.config.default_ttl_seconds = ttl;
        self
    }

    /// Set the request deadline.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    /// Override the control-plane host.
    pub fn control_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.control_endpoint = Some(endpoint.into());
        self
    }

    /// Override the data-plane host.
    pub fn cache_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.cache_endpoint = Some(endpoint.into());
        self
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Connect eagerly at construction.
    pub fn eager_connection(mut self, eager: bool) -> Self {
        self.config.eager_connection = eager;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::new("token", 60);

        assert_eq!(config.request_timeout, Duration::from_millis(5000));
        assert!(!config.eager_connection);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_validates() {
        let err = ClientConfig::builder()
            .auth_token("token")
            .default_ttl_seconds(0)
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = ClientConfig::builder()
            .auth_token("token")
            .default_ttl_seconds(60)
            .request_timeout(Duration::ZERO)
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);

        let err = ClientConfig::builder()
            .default_ttl_seconds(60)
            .build()
            .unwrap_err();
        assert!(err.message().contains("token"));
    }

    #[test]
    fn test_from_vars() {
        let vars: HashMap<&str, &str> = [
            ("MOMENTO_AUTH_TOKEN", "token"),
            ("MOMENTO_DEFAULT_TTL_SECONDS", "120"),
            ("MOMENTO_REQUEST_TIMEOUT_MS", "250"),
            ("MOMENTO_CACHE_ENDPOINT", "localhost:9000"),
        ]
        .into_iter()
        .collect();

        let config = ClientConfig::from_vars(|name| vars.get(name).map(|v| v.to_string()))
            .build()
            .unwrap();

        assert_eq!(config.auth_token, "token");
        assert_eq!(config.default_ttl_seconds, 120);
        assert_eq!(config.request_timeout, Duration::from_millis(250));
        assert_eq!(config.cache_endpoint.as_deref(), Some("localhost:9000"));
        assert!(config.control_endpoint.is_none());
    }

    #[test]
    fn test_from_vars_ignores_unparsable() {
        let config = ClientConfig::from_vars(|name| match name {
            "MOMENTO_AUTH_TOKEN" => Some("token".to_string()),
            "MOMENTO_DEFAULT_TTL_SECONDS" => Some("sixty".to_string()),
            _ => None,
        })
        .default_ttl_seconds(30)
        .build()
        .unwrap();

        assert_eq!(config.default_ttl_seconds, 30);
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = ClientConfig::new("super-secret", 60);
        assert!(!format!("{:?}", config).contains("super-secret"));
    }

    #[test]
    fn test_channel_config() {
        let config = ClientConfig::builder()
            .auth_token("token")
            .default_ttl_seconds(60)
            .connect_timeout(Duration::from_secs(3))
            .build()
            .unwrap();

        let channel = config.channel_config("https://cache.example.com:443");
        assert_eq!(channel.endpoint, "https://cache.example.com:443");
        assert_eq!(channel.connect_timeout, Duration::from_secs(3));
    }
}
