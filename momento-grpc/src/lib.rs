// Status from tonic is inherently large; this is acceptable for error handling
#![allow(clippy::result_large_err)]

//! # Momento gRPC
//!
//! Connection management and metadata injection for the Momento client.
//!
//! ## Features
//!
//! - **Connections**: one long-lived, multiplexed channel per endpoint with a
//!   bound client stub, created lazily or eagerly, closed explicitly
//! - **Header injection**: a tower layer attaching metadata to every call, or
//!   only to the first call over a connection
//! - **TLS**: `https` endpoints are dialed with the bundled web PKI roots
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use momento_grpc::{ChannelConfig, GrpcConnection, Header};
//! use momento_wire::ScsClient;
//!
//! let config = ChannelConfig::builder()
//!     .endpoint("https://cache.cell-us-east-1-1.prod.a.momentohq.com:443")
//!     .build();
//!
//! let connection = GrpcConnection::lazy(
//!     &config,
//!     vec![
//!         Header::always("authorization", token),
//!         Header::once("agent", "rust:0.1.1"),
//!     ],
//!     ScsClient::new,
//! )?;
//!
//! let mut stub = connection.stub()?;
//! ```

mod client;
mod config;
mod error;
mod interceptor;

pub use client::GrpcConnection;
pub use config::{ChannelConfig, ChannelConfigBuilder};
pub use error::{GrpcError, Result};
pub use interceptor::{
    AGENT_HEADER, AUTHORIZATION_HEADER, BoxError, Header, HeaderError, HeaderLayer, HeaderScope,
    HeaderService,
};

// Re-export tonic types
pub use tonic::{
    Code, Request, Response, Status,
    metadata::{MetadataMap, MetadataValue},
    transport::Channel,
};

/// Prelude for common imports.
///
/// ```
/// use momento_grpc::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::GrpcConnection;
    pub use crate::config::ChannelConfig;
    pub use crate::error::{GrpcError, Result};
    pub use crate::interceptor::{Header, HeaderError, HeaderLayer, HeaderScope, HeaderService};
    pub use tonic::{Code, Request, Response, Status, transport::Channel};
}
