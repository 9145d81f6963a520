//! Async cache client.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::ClientConfig;
use crate::convert::{Failure, convert_grpc_error, translate};
use crate::endpoints::Endpoints;
use crate::executor::Executor;
use crate::ops::{self, IntoBytes};
use crate::responses::{
    CacheDeleteResponse, CacheGetResponse, CacheMultiGetResponse, CacheMultiSetResponse,
    CacheSetResponse, CreateCacheResponse, CreateSigningKeyResponse, DeleteCacheResponse,
    ListCachesResponse, ListSigningKeysResponse, RevokeSigningKeyResponse,
};
use crate::transport::{ControlPlane, DataPlane, GrpcControlPlane, GrpcDataPlane};
use crate::validation::validate_cache_name;
use crate::Result;

/// Open both transports described by a validated configuration.
///
/// Lazy transports are created in the caller's runtime context.
pub(crate) async fn open_transports(
    config: &ClientConfig,
    endpoints: &Endpoints,
) -> Result<(Arc<dyn ControlPlane>, Arc<dyn DataPlane>)> {
    let control_config = config.channel_config(endpoints.control_uri());
    let data_config = config.channel_config(endpoints.cache_uri());

    // A data-plane failure drops the already opened control plane.
    let (control, data) = if config.eager_connection {
        let control = GrpcControlPlane::connect(&control_config, &config.auth_token)
            .await
            .map_err(|e| translate("Connect", convert_grpc_error(e).into()))?;
        let data = GrpcDataPlane::connect(&data_config, &config.auth_token)
            .await
            .map_err(|e| translate("Connect", convert_grpc_error(e).into()))?;
        (Arc::new(control) as Arc<dyn ControlPlane>, Arc::new(data) as Arc<dyn DataPlane>)
    } else {
        let control = GrpcControlPlane::lazy(&control_config, &config.auth_token)
            .map_err(|e| translate("Connect", convert_grpc_error(e).into()))?;
        let data = GrpcDataPlane::lazy(&data_config, &config.auth_token)
            .map_err(|e| translate("Connect", convert_grpc_error(e).into()))?;
        (Arc::new(control) as Arc<dyn ControlPlane>, Arc::new(data) as Arc<dyn DataPlane>)
    };

    Ok((control, data))
}

/// Async client for the Simple Cache Service.
///
/// Owns one control-plane and one data-plane connection. Both are released
/// by [`close`](Self::close) or when the client is dropped. Methods take
/// `&self`; wrap the client in an `Arc` to share it between tasks.
///
/// ```rust,ignore
/// use momento_client::{ClientConfig, SimpleCacheClient};
///
/// let config = ClientConfig::builder()
///     .auth_token(token)
///     .default_ttl_seconds(60)
///     .build()?;
/// let client = SimpleCacheClient::connect(config).await?;
///
/// client.create_cache("my-cache").await?;
/// client.set("my-cache", "key", "value", None).await?;
/// let value = client.get("my-cache", "key").await?;
/// ```
pub struct SimpleCacheClient {
    control: Arc<dyn ControlPlane>,
    data: Arc<dyn DataPlane>,
    endpoints: Endpoints,
    executor: Executor,
    default_ttl_seconds: u64,
}

impl SimpleCacheClient {
    /// Validate the configuration and open both connections.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let endpoints = resolve(&config)?;
        let (control, data) = open_transports(&config, &endpoints).await?;

        info!(
            control = %endpoints.control_endpoint,
            cache = %endpoints.cache_endpoint,
            eager = config.eager_connection,
            "Simple cache client created"
        );

        Ok(Self::build(&config, endpoints, control, data))
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
        Ok(Self::build(&config, endpoints, control, data))
    }

    fn build(
        config: &ClientConfig,
        endpoints: Endpoints,
        control: Arc<dyn ControlPlane>,
        data: Arc<dyn DataPlane>,
    ) -> Self {
        Self {
            control,
            data,
            endpoints,
            executor: Executor::new(config.request_timeout),
            default_ttl_seconds: config.default_ttl_seconds,
        }
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

    /// Create a cache.
    ///
    /// Fails with [`AlreadyExists`](crate::SdkError::AlreadyExists) if the
    /// cache exists.
    pub async fn create_cache(&self, cache_name: &str) -> Result<CreateCacheResponse> {
        self.executor
            .execute(
                cache_name,
                "CreateCache",
                || Ok(ops::prepare_create_cache_request(cache_name)),
                |request, deadline| self.control.create_cache(request, deadline),
                ops::construct_create_cache_response,
            )
            .await
    }

    /// Delete a cache and every item in it.
    pub async fn delete_cache(&self, cache_name: &str) -> Result<DeleteCacheResponse> {
        self.executor
            .execute(
                cache_name,
                "DeleteCache",
                || Ok(ops::prepare_delete_cache_request(cache_name)),
                |request, deadline| self.control.delete_cache(request, deadline),
                ops::construct_delete_cache_response,
            )
            .await
    }

    /// List one page of caches.
    pub async fn list_caches(&self, next_token: Option<&str>) -> Result<ListCachesResponse> {
        self.executor
            .execute_unscoped(
                "ListCaches",
                || Ok(ops::prepare_list_caches_request(next_token)),
                |request, deadline| self.control.list_caches(request, deadline),
                ops::construct_list_caches_response,
            )
            .await
    }

    /// Create a signing key valid for `ttl_minutes`.
    pub async fn create_signing_key(&self, ttl_minutes: u32) -> Result<CreateSigningKeyResponse> {
        self.executor
            .execute_unscoped(
                "CreateSigningKey",
                || ops::prepare_create_signing_key_request(ttl_minutes),
                |request, deadline| self.control.create_signing_key(request, deadline),
                |_, response| {
                    ops::construct_create_signing_key_response(
                        response,
                        &self.endpoints.cache_endpoint,
                    )
                },
            )
            .await
    }

    /// Revoke a signing key.
    pub async fn revoke_signing_key(&self, key_id: &str) -> Result<RevokeSigningKeyResponse> {
        self.executor
            .execute_unscoped(
                "RevokeSigningKey",
                || ops::prepare_revoke_signing_key_request(key_id),
                |request, deadline| self.control.revoke_signing_key(request, deadline),
                ops::construct_revoke_signing_key_response,
            )
            .await
    }

    /// List one page of signing keys.
    pub async fn list_signing_keys(
        &self,
        next_token: Option<&str>,
    ) -> Result<ListSigningKeysResponse> {
        self.executor
            .execute_unscoped(
                "ListSigningKeys",
                || Ok(ops::prepare_list_signing_keys_request(next_token)),
                |request, deadline| self.control.list_signing_keys(request, deadline),
                |_, response| {
                    ops::construct_list_signing_keys_response(
                        response,
                        &self.endpoints.cache_endpoint,
                    )
                },
            )
            .await
    }

    /// Store an item. `ttl_seconds` overrides the client's default TTL.
    pub async fn set(
        &self,
        cache_name: &str,
        key: impl IntoBytes,
        value: impl IntoBytes,
        ttl_seconds: Option<u64>,
    ) -> Result<CacheSetResponse> {
        let (key, value) = (key.into_wire_bytes(), value.into_wire_bytes());
        self.executor
            .execute(
                cache_name,
                "Set",
                || ops::prepare_set_request(key, value, ttl_seconds, self.default_ttl_seconds),
                |request, deadline| self.data.set(cache_name, request, deadline),
                ops::construct_set_response,
            )
            .await
    }

    /// Look an item up.
    pub async fn get(&self, cache_name: &str, key: impl IntoBytes) -> Result<CacheGetResponse> {
        let key = key.into_wire_bytes();
        self.executor
            .execute(
                cache_name,
                "Get",
                || Ok(ops::prepare_get_request(key)),
                |request, deadline| self.data.get(cache_name, request, deadline),
                ops::construct_get_response,
            )
            .await
    }

    /// Remove an item. Removing a missing item succeeds.
    pub async fn delete(&self, cache_name: &str, key: impl IntoBytes) -> Result<CacheDeleteResponse> {
        let key = key.into_wire_bytes();
        self.executor
            .execute(
                cache_name,
                "Delete",
                || Ok(ops::prepare_delete_request(key)),
                |request, deadline| self.data.delete(cache_name, request, deadline),
                ops::construct_delete_response,
            )
            .await
    }

    /// Store several items concurrently, one request each.
    ///
    /// Every request is issued; the first failure in item order is returned
    /// and logged once under `MultiSet`.
    pub async fn multi_set<K, V, I>(
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

        let results = join_all(items.into_iter().map(move |(key, value)| {
            let (key, value) = (key.into_wire_bytes(), value.into_wire_bytes());
            self.executor.attempt(
                "MultiSet",
                move || ops::prepare_set_request(key, value, ttl_seconds, self.default_ttl_seconds),
                move |request, deadline| self.data.set(cache_name, request, deadline),
                ops::construct_set_response,
            )
        }))
        .await;

        let items = results
            .into_iter()
            .map(|result| result.map(|set| (set.key, set.value)))
            .collect::<std::result::Result<Vec<_>, Failure>>()
            .map_err(|failure| translate("MultiSet", failure))?;
        Ok(CacheMultiSetResponse { items })
    }

    /// Look several items up concurrently, one request each.
    ///
    /// Results are in key order; the first failure in key order is returned
    /// and logged once under `MultiGet`.
    pub async fn multi_get<K, I>(&self, cache_name: &str, keys: I) -> Result<CacheMultiGetResponse>
    where
        K: IntoBytes,
        I: IntoIterator<Item = K>,
    {
        validate_cache_name(cache_name).map_err(|e| translate("MultiGet", e.into()))?;

        let results = join_all(keys.into_iter().map(move |key| {
            let key = key.into_wire_bytes();
            self.executor.attempt(
                "MultiGet",
                move || Ok(ops::prepare_get_request(key)),
                move |request, deadline| self.data.get(cache_name, request, deadline),
                ops::construct_get_response,
            )
        }))
        .await;

        let responses = results
            .into_iter()
            .collect::<std::result::Result<Vec<_>, Failure>>()
            .map_err(|failure| translate("MultiGet", failure))?;
        Ok(CacheMultiGetResponse { responses })
    }

    /// Release both connections.
    ///
    /// Returns `true` if this call released anything. Calls made afterwards
    /// fail with [`ClientSdk`](crate::SdkError::ClientSdk).
    pub fn close(&self) -> bool {
        let control = self.control.close();
        let data = self.data.close();
        if control || data {
            info!(cache = %self.endpoints.cache_endpoint, "Simple cache client closed");
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
        f.debug_struct("SimpleCacheClient")
            .field("endpoints", &self.endpoints)
            .field("request_timeout", &self.executor.deadline())
            .field("default_ttl_seconds", &self.default_ttl_seconds)
            .finish()
    }
}

/// Validate a configuration and resolve its endpoints.
pub(crate) fn resolve(config: &ClientConfig) -> Result<Endpoints> {
    config
        .validate()
        .and_then(|()| config.endpoints())
        .map_err(|e| translate("Connect", e.into()))
}

/// Checks shared by every constructor that do not need the token's claims.
pub(crate) fn validate_client(config: &ClientConfig) -> Result<()> {
    crate::validation::validate_ttl(config.default_ttl_seconds)
        .and_then(|()| crate::validation::validate_request_timeout(config.request_timeout))
        .map_err(|e| translate("Connect", e.into()))
}
