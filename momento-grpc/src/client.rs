//! Managed gRPC connections.

use parking_lot::RwLock;
use tonic::transport::Channel;
use tower::Layer;
use tracing::{debug, info};

use crate::{ChannelConfig, GrpcError, Header, HeaderLayer, HeaderService, Result};

/// One long-lived channel to an endpoint, wrapped in a [`HeaderLayer`] and
/// bound to a client stub `S`.
///
/// The stub is handed out by cloning, which shares the underlying channel, so
/// any number of concurrent calls can be multiplexed over one connection.
/// After [`close`](Self::close) no further stubs are handed out. There is no
/// retry or reconnection logic at this level.
pub struct GrpcConnection<S> {
    endpoint: String,
    headers: HeaderLayer,
    stub: RwLock<Option<S>>,
}

impl<S: Clone> GrpcConnection<S> {
    /// Create a connection whose channel connects on first use.
    ///
    /// Must be called from within a tokio runtime.
    pub fn lazy<F>(config: &ChannelConfig, headers: Vec<Header>, make_stub: F) -> Result<Self>
    where
        F: FnOnce(HeaderService<Channel>) -> S,
    {
        info!(endpoint = %config.endpoint, "Creating lazy gRPC connection");

        let layer = HeaderLayer::new(headers)?;
        let channel = config.to_endpoint()?.connect_lazy();

        Ok(Self::bind(config.endpoint.clone(), layer, channel, make_stub))
    }

    /// Create a connection and wait for the channel to be established.
    pub async fn connect<F>(config: &ChannelConfig, headers: Vec<Header>, make_stub: F) -> Result<Self>
    where
        F: FnOnce(HeaderService<Channel>) -> S,
    {
        info!(endpoint = %config.endpoint, "Connecting to gRPC server");

        let layer = HeaderLayer::new(headers)?;
        let channel = config
            .to_endpoint()?
            .connect()
            .await
            .map_err(GrpcError::Transport)?;

        debug!(endpoint = %config.endpoint, "gRPC connection established");

        Ok(Self::bind(config.endpoint.clone(), layer, channel, make_stub))
    }

    /// Create a connection over an arbitrary transport service.
    pub fn from_service<T, F>(
        endpoint: impl Into<String>,
        service: T,
        headers: Vec<Header>,
        make_stub: F,
    ) -> Result<Self>
    where
        F: FnOnce(HeaderService<T>) -> S,
    {
        let endpoint = endpoint.into();
        debug!(endpoint = %endpoint, "Creating gRPC connection over custom transport");

        let layer = HeaderLayer::new(headers)?;
        Ok(Self::bind(endpoint, layer, service, make_stub))
    }

    fn bind<T, F>(endpoint: String, layer: HeaderLayer, service: T, make_stub: F) -> Self
    where
        F: FnOnce(HeaderService<T>) -> S,
    {
        let stub = make_stub(layer.layer(service));
        Self {
            endpoint,
            headers: layer,
            stub: RwLock::new(Some(stub)),
        }
    }

    /// Get a ready-to-use stub handle.
    pub fn stub(&self) -> Result<S> {
        self.stub
            .read()
            .as_ref()
            .cloned()
            .ok_or_else(|| GrpcError::Closed(self.endpoint.clone()))
    }

    /// Release the stub and its channel.
    ///
    /// Returns `true` if this call closed the connection, `false` if it was
    /// already closed. Calls already holding a stub clone run to completion.
    pub fn close(&self) -> bool {
        let closed = self.stub.write().take().is_some();
        if closed {
            info!(endpoint = %self.endpoint, "Closed gRPC connection");
        }
        closed
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.stub.read().is_none()
    }
}

impl<S> GrpcConnection<S> {
    /// The endpoint this connection dials.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The header layer installed on this connection.
    pub fn headers(&self) -> &HeaderLayer {
        &self.headers
    }
}

impl<S> std::fmt::Debug for GrpcConnection<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrpcConnection")
            .field("endpoint", &self.endpoint)
            .field("closed", &self.stub.read().is_none())
            .finish()
    }
}
