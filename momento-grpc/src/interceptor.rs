//! Header injection for outbound gRPC calls.
//!
//! [`HeaderLayer`] wraps a connection's transport service so every call made
//! through it carries the configured metadata. Headers scoped
//! [`HeaderScope::Always`] are attached to every call; headers scoped
//! [`HeaderScope::Once`] are attached only to the first call made through the
//! layer. The "sent once" flag lives inside the layer and is shared by every
//! service it produces, so each connection tracks its own first call.

use futures::future::BoxFuture;
use http::{HeaderMap, HeaderName, HeaderValue};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};
use thiserror::Error;
use tower::{Layer, Service};
use tracing::{debug, trace};

use crate::{GrpcError, Result};

/// Boxed error returned by [`HeaderService`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Header name for the authentication token.
pub const AUTHORIZATION_HEADER: &str = "authorization";

/// Header name for client identification.
pub const AGENT_HEADER: &str = "agent";

/// How often a header is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderScope {
    /// Only on the first call made through the connection.
    Once,
    /// On every call.
    Always,
}

/// A metadata header to attach to outbound calls.
#[derive(Clone, PartialEq, Eq)]
pub struct Header {
    name: String,
    value: String,
    scope: HeaderScope,
}

impl Header {
    /// Create a header with an explicit scope.
    pub fn new(name: impl Into<String>, value: impl Into<String>, scope: HeaderScope) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            scope,
        }
    }

    /// Create a header sent on every call.
    pub fn always(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, HeaderScope::Always)
    }

    /// Create a header sent on the first call only.
    pub fn once(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, value, HeaderScope::Once)
    }

    /// Header name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Header value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Header scope.
    pub fn scope(&self) -> HeaderScope {
        self.scope
    }
}

// Header values carry credentials; keep them out of debug output.
impl std::fmt::Debug for Header {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Header")
            .field("name", &self.name)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// A call whose existing metadata cannot be combined with the injected headers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    /// Another layer already set a header this layer owns.
    #[error("metadata header `{0}` was already set on the outbound call")]
    Conflict(String),
}

struct HeaderSet {
    always: Vec<(HeaderName, HeaderValue)>,
    once: Vec<(HeaderName, HeaderValue)>,
    once_sent: AtomicBool,
}

impl HeaderSet {
    fn apply(&self, headers: &mut HeaderMap) -> std::result::Result<(), HeaderError> {
        for (name, _) in self.always.iter().chain(self.once.iter()) {
            if headers.contains_key(name) {
                return Err(HeaderError::Conflict(name.to_string()));
            }
        }

        for (name, value) in &self.always {
            headers.append(name.clone(), value.clone());
        }

        // Test-and-set: exactly one caller observes `false`.
        if !self.once.is_empty() && !self.once_sent.swap(true, Ordering::AcqRel) {
            trace!("Attaching once-only headers");
            for (name, value) in &self.once {
                headers.append(name.clone(), value.clone());
            }
        }

        Ok(())
    }
}

/// Tower layer that injects headers into every request sent through it.
#[derive(Clone)]
pub struct HeaderLayer {
    headers: Arc<HeaderSet>,
}

impl HeaderLayer {
    /// Build a layer from an ordered list of headers.
    ///
    /// Fails if a header name or value cannot be represented as gRPC
    /// metadata, or if the same name appears twice.
    pub fn new(headers: impl IntoIterator<Item = Header>) -> Result<Self> {
        let mut always = Vec::new();
        let mut once = Vec::new();

        for header in headers {
            let name = HeaderName::from_bytes(header.name.as_bytes())
                .map_err(|_| GrpcError::Metadata(format!("invalid header name `{}`", header.name)))?;
            let value = HeaderValue::from_str(&header.value).map_err(|_| {
                GrpcError::Metadata(format!("invalid value for header `{}`", header.name))
            })?;

            if always
                .iter()
                .chain(once.iter())
                .any(|(existing, _): &(HeaderName, HeaderValue)| *existing == name)
            {
                return Err(GrpcError::Metadata(format!(
                    "header `{}` configured more than once",
                    header.name
                )));
            }

            match header.scope {
                HeaderScope::Always => always.push((name, value)),
                HeaderScope::Once => once.push((name, value)),
            }
        }

        debug!(
            always = always.len(),
            once = once.len(),
            "Header layer configured"
        );

        Ok(Self {
            headers: Arc::new(HeaderSet {
                always,
                once,
                once_sent: AtomicBool::new(false),
            }),
        })
    }

    /// Whether the once-only headers have already been attached to a call.
    pub fn once_headers_sent(&self) -> bool {
        self.headers.once_sent.load(Ordering::Acquire)
    }
}

impl std::fmt::Debug for HeaderLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeaderLayer")
            .field("always", &self.headers.always.len())
            .field("once", &self.headers.once.len())
            .field("once_sent", &self.once_headers_sent())
            .finish()
    }
}

impl<S> Layer<S> for HeaderLayer {
    type Service = HeaderService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        HeaderService {
            inner,
            headers: Arc::clone(&self.headers),
        }
    }
}

/// Service produced by [`HeaderLayer`].
#[derive(Clone)]
pub struct HeaderService<S> {
    inner: S,
    headers: Arc<HeaderSet>,
}

impl<S, B> Service<http::Request<B>> for HeaderService<S>
where
    S: Service<http::Request<B>>,
    S::Error: Into<BoxError>,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = BoxError;
    type Future = BoxFuture<'static, std::result::Result<S::Response, BoxError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, mut request: http::Request<B>) -> Self::Future {
        if let Err(err) = self.headers.apply(request.headers_mut()) {
            return Box::pin(async move { Err(Box::new(err) as BoxError) });
        }

        let future = self.inner.call(request);
        Box::pin(async move { future.await.map_err(Into::into) })
    }
}
