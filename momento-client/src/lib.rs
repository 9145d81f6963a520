//! Clients for the Momento Simple Cache Service.
//!
//! Two facades share one request pipeline:
//!
//! - [`SimpleCacheClient`] - async, for use inside a tokio runtime
//! - [`blocking::SimpleCacheClient`] - blocking, drives its own runtime
//!
//! Every operation validates its inputs locally, sends exactly one request
//! under the client's fixed deadline, and reports failures as [`SdkError`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use momento_client::prelude::*;
//!
//! let config = ClientConfig::from_env().default_ttl_seconds(60).build()?;
//! let client = SimpleCacheClient::connect(config).await?;
//!
//! client.create_cache("my-cache").await?;
//! client.set("my-cache", "greeting", "hello", None).await?;
//!
//! match client.get("my-cache", "greeting").await? {
//!     CacheGetResponse::Hit(value) => println!("hit: {:?}", value),
//!     CacheGetResponse::Miss => println!("miss"),
//! }
//! ```

#![allow(clippy::result_large_err)]

pub mod blocking;
pub mod client;
pub mod config;
pub mod convert;
pub mod endpoints;
pub mod error;
pub mod executor;
pub mod ops;
pub mod responses;
pub mod tools;
pub mod transport;
pub mod validation;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use client::SimpleCacheClient;
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_REQUEST_TIMEOUT};
pub use endpoints::Endpoints;
pub use error::{ErrorKind, Result, SdkError};
pub use executor::Executor;
pub use ops::IntoBytes;
pub use responses::*;
pub use tools::{Codec, JsonCodec, ReadThrough};
pub use transport::{ControlPlane, DataPlane, GrpcControlPlane, GrpcDataPlane};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::blocking;
    pub use crate::client::SimpleCacheClient;
    pub use crate::config::{ClientConfig, ClientConfigBuilder};
    pub use crate::error::{ErrorKind, Result, SdkError};
    pub use crate::ops::IntoBytes;
    pub use crate::responses::{CacheGetResponse, CacheGetStatus};
    pub use crate::tools::ReadThrough;
}
