//! Blocking cache client.
//!
//! [`SimpleCacheClient`] owns a private tokio runtime and drives each call on
//! it to completion. It offers the same operations as the async client with
//! identical validation, translation and results.
//!
//! The blocking client must not be created, used or dropped from within an
//! async context; tokio panics when a runtime is blocked on or shut down
//! from inside another.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tonic::Status;
use tracing::info;

use crate::client::{open_transports, resolve, validate_client};
use crate::config::ClientConfig;
use crate::convert::{Failure, translate};
use crate::endpoints::Endpoints;
use crate::executor::{Executor, with_deadline};
use crate::ops::{self, IntoBytes};
use crate::responses::{
    CacheDeleteResponse, CacheGetResponse, CacheMultiGetResponse, CacheMultiSetResponse,
    CacheSetResponse, CreateCacheResponse, CreateSigningKeyResponse, DeleteCacheResponse,
    ListCachesResponse, ListSigningKeysResponse, RevokeSigningKeyResponse,
};
use crate::transport::{ControlPlane, DataPlane};
use crate::validation::validate_cache_name;
use crate::{Result, SdkError};

fn runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .thread_name("momento-blocking")
        .enable_all()
        .build()
        .map_err(|e| {
            translate(
                "Connect",
                SdkError::client_sdk(format!("failed to start runtime: {}", e)).into(),
            )
        })
}

/// Blocking client for the Simple Cache Service.
///
/// ```rust,ignore
/// use momento_client::{ClientConfig, blocking::SimpleCacheClient};
///
/// let client = SimpleCacheClient::connect(ClientConfig::new(token, 60))?;
/// client.set("my-cache", "key", "value", None)?;
/// assert!(client.get("my-cache", "key")?.is_hit());
/// ```
pub struct SimpleCacheClient {
    control: Arc<dyn ControlPlane>,
    data: Arc<dyn DataPlane>,
    endpoints: Endpoints,
    executor: Executor,
    default_ttl_seconds: u64,
    // Dropped last so the channels shut down on their own runtime.
    runtime: Runtime,
}

impl SimpleCacheClient {
    /// Validate the configuration and open both connections.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let endpoints = resolve(&config)?;
        let runtime = runtime()?;
        let (control, data) = runtime.block_on(open_transports(&config, &endpoints))?;

        info!(
            control = %endpoints.control_endpoint,
            cache = %endpoints.cache_endpoint,
            eager = config.eager_connection,
            "Blocking simple cache client created"
        );

        Ok(Self {
            control,
            data,
            endpoints,
            executor: Executor::new(config.request_timeout),
            default_ttl_seconds: config.default_ttl_seconds,
            runtime,
        })
    }

    /// Build a client over caller-supplied transports.
    pub fn with_transports(
        config: ClientConfig,
        control: Arc<dyn ControlPlane>,
        data: Arc<dyn DataPlane>,
    ) -> Result<Self> {
        validate_client(&config)?;
        let endpoints = Endpoints {
            control_endpoint: control.endpoint().to_string(),
            cache_endpoint: data.endpoint().to_string(),
        };
        Ok(Self {
            control,
            data,
            endpoints,
            executor: Executor::new(config.request_timeout),
            default_ttl_seconds: config.default_ttl_seconds,
            runtime: runtime()?,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn default_ttl_seconds(&self) -> u64 {
        self.default_ttl_seconds
    }

    pub fn request_timeout(&self) -> Duration {
        self.executor.deadline()
    }

    /// Block on one dispatched call under the deadline.
    fn wait<Resp, F>(&self, deadline: Duration, call: F) -> std::result::Result<Resp, Failure>
    where
        F: Future<Output = std::result::Result<Resp, Status>>,
    {
        self.runtime.block_on(with_deadline(deadline, call))
    }

    pub fn create_cache(&self, cache_name: &str) -> Result<CreateCacheResponse> {
        self.executor.execute_blocking(
            cache_name,
            "CreateCache",
            || Ok(ops::prepare_create_cache_request(cache_name)),
            |request, deadline| self.wait(deadline, self.control.create_cache(request, deadline)),
            ops::construct_create_cache_response,
        )
    }

    pub fn delete_cache(&self, cache_name: &str) -> Result<DeleteCacheResponse> {
        self.executor.execute_blocking(
            cache_name,
            "DeleteCache",
            || Ok(ops::prepare_delete_cache_request(cache_name)),
            |request, deadline| self.wait(deadline, self.control.delete_cache(request, deadline)),
            ops::construct_delete_cache_response,
        )
    }

    pub fn list_caches(&self, next_token: Option<&str>) -> Result<ListCachesResponse> {
        self.executor.execute_blocking_unscoped(
            "ListCaches",
            || Ok(ops::prepare_list_caches_request(next_token)),
            |request, deadline| self.wait(deadline, self.control.list_caches(request, deadline)),
            ops::construct_list_caches_response,
        )
    }

    pub fn create_signing_key(&self, ttl_minutes: u32) -> Result<CreateSigningKeyResponse> {
        self.executor.execute_blocking_unscoped(
            "CreateSigningKey",
            || ops::prepare_create_signing_key_request(ttl_minutes),
            |request, deadline| {
                self.wait(deadline, self.control.create_signing_key(request, deadline))
            },
            |_, response| {
                ops::construct_create_signing_key_response(response, &self.endpoints.cache_endpoint)
            },
        )
    }

    pub fn revoke_signing_key(&self, key_id: &str) -> Result<RevokeSigningKeyResponse> {
        self.executor.execute_blocking_unscoped(
            "RevokeSigningKey",
            || ops::prepare_revoke_signing_key_request(key_id),
            |request, deadline| {
                self.wait(deadline, self.control.revoke_signing_key(request, deadline))
            },
            ops::construct_revoke_signing_key_response,
        )
    }

    pub fn list_signing_keys(&self, next_token: Option<&str>) -> Result<ListSigningKeysResponse> {
        self.executor.execute_blocking_unscoped(
            "ListSigningKeys",
            || Ok(ops::prepare_list_signing_keys_request(next_token)),
            |request, deadline| {
                self.wait(deadline, self.control.list_signing_keys(request, deadline))
            },
            |_, response| {
                ops::construct_list_signing_keys_response(response, &self.endpoints.cache_endpoint)
            },
        )
    }

    /// Store an item. `ttl_seconds` overrides the client's default TTL.
    pub fn set(
        &self,
        cache_name: &str,
        key: impl IntoBytes,
        value: impl IntoBytes,
        ttl_seconds: Option<u64>,
    ) -> Result<CacheSetResponse> {
        let (key, value) = (key.into_wire_bytes(), value.into_wire_bytes());
        self.executor.execute_blocking(
            cache_name,
            "Set",
            || ops::prepare_set_request(key, value, ttl_seconds, self.default_ttl_seconds),
            |request, deadline| self.wait(deadline, self.data.set(cache_name, request, deadline)),
            ops::construct_set_response,
        )
    }

    pub fn get(&self, cache_name: &str, key: impl IntoBytes) -> Result<CacheGetResponse> {
        let key = key.into_wire_bytes();
        self.executor.execute_blocking(
            cache_name,
            "Get",
            || Ok(ops::prepare_get_request(key)),
            |request, deadline| self.wait(deadline, self.data.get(cache_name, request, deadline)),
            ops::construct_get_response,
        )
    }

    pub fn delete(&self, cache_name: &str, key: impl IntoBytes) -> Result<CacheDeleteResponse> {
        let key = key.into_wire_bytes();
        self.executor.execute_blocking(
            cache_name,
            "Delete",
            || Ok(ops::prepare_delete_request(key)),
            |request, deadline| {
                self.wait(deadline, self.data.delete(cache_name, request, deadline))
            },
            ops::construct_delete_response,
        )
    }

    /// Store several items, one request each, in item order.
    ///
    /// Every request is issued; the first failure is returned and logged
    /// once under `MultiSet`.
    pub fn multi_set<K, V, I>(
        &self,
        cache_name: &str,
        items: I,
        ttl_seconds: Option<u64>,
    ) -> Result<CacheMultiSetResponse>
    where
        K: IntoBytes,
        V: IntoBytes,
        I: IntoIterator<Item = (K, V)>,
    {
        validate_cache_name(cache_name).map_err(|e| translate("MultiSet", e.into()))?;

        let results: Vec<_> = items
            .into_iter()
            .map(|(key, value)| {
                let (key, value) = (key.into_wire_bytes(), value.into_wire_bytes());
                self.executor.attempt_blocking(
                    "MultiSet",
                    || ops::prepare_set_request(key, value, ttl_seconds, self.default_ttl_seconds),
                    |request, deadline| {
                        self.wait(deadline, self.data.set(cache_name, request, deadline))
                    },
                    ops::construct_set_response,
                )
            })
            .collect();

        let items = results
            .into_iter()
            .map(|result| result.map(|set| (set.key, set.value)))
            .collect::<std::result::Result<Vec<_>, Failure>>()
            .map_err(|failure| translate("MultiSet", failure))?;
        Ok(CacheMultiSetResponse { items })
    }

    /// Look several items up, one request each, in key order.
    pub fn multi_get<K, I>(&self, cache_name: &str, keys: I) -> Result<CacheMultiGetResponse>
    where
        K: IntoBytes,
        I: IntoIterator<Item = K>,
    {
        validate_cache_name(cache_name).map_err(|e| translate("MultiGet", e.into()))?;

        let results: Vec<_> = keys
            .into_iter()
            .map(|key| {
                let key = key.into_wire_bytes();
                self.executor.attempt_blocking(
                    "MultiGet",
                    || Ok(ops::prepare_get_request(key)),
                    |request, deadline| {
                        self.wait(deadline, self.data.get(cache_name, request, deadline))
                    },
                    ops::construct_get_response,
                )
            })
            .collect();

        let responses = results
            .into_iter()
            .collect::<std::result::Result<Vec<_>, Failure>>()
            .map_err(|failure| translate("MultiGet", failure))?;
        Ok(CacheMultiGetResponse { responses })
    }

    /// Release both connections; `true` if this call released anything.
    pub fn close(&self) -> bool {
        let control = self.control.close();
        let data = self.data.close();
        if control || data {
            info!(cache = %self.endpoints.cache_endpoint, "Blocking simple cache client closed");
        }
        control || data
    }
}

impl Drop for SimpleCacheClient {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SimpleCacheClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("blocking::SimpleCacheClient")
            .field("endpoints", &self.endpoints)
            .field("request_timeout", &self.executor.deadline())
            .field("default_ttl_seconds", &self.default_ttl_seconds)
            .finish()
    }
}
