//! Channel configuration types.

use std::time::Duration;
use tonic::transport::{ClientTlsConfig, Endpoint};

use crate::{GrpcError, Result};

/// Configuration for one managed channel.
///
/// Carries no request timeout; the caller applies its deadline to each
/// request.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// URI dialed by the channel; `https://` selects TLS.
    pub endpoint: String,
    /// Upper bound on establishing the TCP and TLS session.
    pub connect_timeout: Duration,
    /// Ping interval on an idle connection.
    pub http2_keepalive_interval: Option<Duration>,
    /// How long to wait for a ping acknowledgement.
    pub http2_keepalive_timeout: Option<Duration>,
    pub tcp_keepalive: Option<Duration>,
    pub tcp_nodelay: bool,
    /// Maximum in-flight requests on the channel.
    pub concurrency_limit: Option<usize>,
    pub initial_connection_window_size: Option<u32>,
    pub initial_stream_window_size: Option<u32>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://localhost:443".to_string(),
            connect_timeout: Duration::from_secs(10),
            http2_keepalive_interval: Some(Duration::from_secs(60)),
            http2_keepalive_timeout: Some(Duration::from_secs(20)),
            tcp_keepalive: Some(Duration::from_secs(60)),
            tcp_nodelay: true,
            concurrency_limit: None,
            initial_connection_window_size: None,
            initial_stream_window_size: None,
        }
    }
}

impl ChannelConfig {
    pub fn builder() -> ChannelConfigBuilder {
        ChannelConfigBuilder::default()
    }

    /// Whether the endpoint is dialed over TLS.
    pub fn uses_tls(&self) -> bool {
        self.endpoint.starts_with("https://")
    }

    /// Build the tonic endpoint for this configuration.
    pub fn to_endpoint(&self) -> Result<Endpoint> {
        let mut endpoint = Endpoint::from_shared(self.endpoint.clone())
            .map_err(|e| GrpcError::Config(format!("invalid endpoint `{}`: {}", self.endpoint, e)))?
            .connect_timeout(self.connect_timeout)
            .tcp_nodelay(self.tcp_nodelay)
            .tcp_keepalive(self.tcp_keepalive);

        if let Some(interval) = self.http2_keepalive_interval {
            endpoint = endpoint.http2_keep_alive_interval(interval);
        }
        if let Some(timeout) = self.http2_keepalive_timeout {
            endpoint = endpoint.keep_alive_timeout(timeout);
        }
        if let Some(window) = self.initial_connection_window_size {
            endpoint = endpoint.initial_connection_window_size(window);
        }
        if let Some(window) = self.initial_stream_window_size {
            endpoint = endpoint.initial_stream_window_size(window);
        }
        if let Some(limit) = self.concurrency_limit {
            endpoint = endpoint.concurrency_limit(limit);
        }

        if self.uses_tls() {
            endpoint = endpoint
                .tls_config(ClientTlsConfig::new().with_enabled_roots())
                .map_err(GrpcError::Transport)?;
        }

        Ok(endpoint)
    }
}

/// Builder for channel configuration.
#[derive(Debug, Default)]
pub struct ChannelConfigBuilder {
    config: ChannelConfig,
}

impl ChannelConfigBuilder {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = endpoint.into();
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Ping idle connections every `interval`, dropping them after `timeout`
    /// without an answer.
    pub fn http2_keepalive(mut self, interval: Duration, timeout: Duration) -> Self {
        self.config.http2_keepalive_interval = Some(interval);
        self.config.http2_keepalive_timeout = Some(timeout);
        self
    }

    pub fn tcp_keepalive(mut self, duration: Duration) -> Self {
        self.config.tcp_keepalive = Some(duration);
        self
    }

    pub fn tcp_nodelay(mut self, enable: bool) -> Self {
        self.config.tcp_nodelay = enable;
        self
    }

    /// Cap the number of requests in flight on the channel.
    pub fn concurrency_limit(mut self, limit: usize) -> Self {
        self.config.concurrency_limit = Some(limit);
        self
    }

    /// Set the initial HTTP/2 window sizes.
    pub fn window_sizes(mut self, connection: u32, stream: u32) -> Self {
        self.config.initial_connection_window_size = Some(connection);
        self.config.initial_stream_window_size = Some(stream);
        self
    }

    pub fn build(self) -> ChannelConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_config_builder() {
        let config = ChannelConfig::builder()
            .endpoint("http://localhost:9000")
            .connect_timeout(Duration::from_secs(2))
            .concurrency_limit(8)
            .build();

        assert_eq!(config.endpoint, "http://localhost:9000");
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.concurrency_limit, Some(8));
        assert!(config.tcp_nodelay);
        assert!(!config.uses_tls());
    }

    #[test]
    fn test_tls_detection() {
        let config = ChannelConfig::builder()
            .endpoint("https://cache.cell-1.example.com:443")
            .build();
        assert!(config.uses_tls());
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        let config = ChannelConfig::builder().endpoint("not a uri").build();
        assert!(matches!(config.to_endpoint(), Err(GrpcError::Config(_))));
    }

    #[test]
    fn test_plaintext_endpoint_builds() {
        let config = ChannelConfig::builder()
            .endpoint("http://127.0.0.1:50051")
            .build();
        let endpoint = config.to_endpoint().unwrap();
        assert_eq!(endpoint.uri().port_u16(), Some(50051));
    }
}
