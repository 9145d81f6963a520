//! Read-through caching over the async client.
//!
//! [`ReadThrough`] looks a value up by its JSON-encoded arguments and runs a
//! loader on a miss, storing the loader's encoded result for next time.
//! Values are encoded with a [`Codec`], JSON unless configured otherwise.
//!
//! ```rust,ignore
//! use momento_client::tools::ReadThrough;
//!
//! let users = ReadThrough::new(client.clone(), "users")
//!     .key_prefix("load_user")
//!     .ttl_seconds(90);
//!
//! let user: User = users
//!     .get_or_load(&("alice", "email"), || database.load_user("alice"))
//!     .await?;
//! ```

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::client::SimpleCacheClient;
use crate::SdkError;

/// Prefix applied to keys when none is configured and the loader is not a
/// named function.
pub const DEFAULT_KEY_PREFIX: &str = "read-through";

type HitCallback = Arc<dyn Fn(Duration) + Send + Sync>;
type MissCallback = Arc<dyn Fn(Duration, Duration, Duration) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&SdkError) + Send + Sync>;

/// Turns cached values into bytes and back.
pub trait Codec: Send + Sync {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, SdkError>;

    /// Decode a stored value. Failures count as lookup errors.
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, SdkError>;
}

/// Stores values as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, SdkError> {
        serde_json::to_vec(value)
            .map_err(|e| SdkError::invalid_argument(format!("value is not serializable: {}", e)))
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, SdkError> {
        serde_json::from_slice(bytes)
            .map_err(|e| SdkError::internal_server(format!("cached value is not decodable: {}", e)))
    }
}

/// Read-through cache for one family of computed values.
#[derive(Clone)]
pub struct ReadThrough<C = JsonCodec> {
    client: Arc<SimpleCacheClient>,
    cache_name: String,
    key_prefix: Option<String>,
    ttl_seconds: Option<u64>,
    fail_open: bool,
    codec: C,
    on_hit: Option<HitCallback>,
    on_miss: Option<MissCallback>,
    on_load_error: Option<ErrorCallback>,
    on_store_error: Option<ErrorCallback>,
}

impl ReadThrough {
    pub fn new(client: Arc<SimpleCacheClient>, cache_name: impl Into<String>) -> Self {
        Self {
            client,
            cache_name: cache_name.into(),
            key_prefix: None,
            ttl_seconds: None,
            fail_open: true,
            codec: JsonCodec,
            on_hit: None,
            on_miss: None,
            on_load_error: None,
            on_store_error: None,
        }
    }
}

impl<C: Codec> ReadThrough<C> {
    /// Encode values with `codec` instead.
    pub fn codec<D: Codec>(self, codec: D) -> ReadThrough<D> {
        ReadThrough {
            client: self.client,
            cache_name: self.cache_name,
            key_prefix: self.key_prefix,
            ttl_seconds: self.ttl_seconds,
            fail_open: self.fail_open,
            codec,
            on_hit: self.on_hit,
            on_miss: self.on_miss,
            on_load_error: self.on_load_error,
            on_store_error: self.on_store_error,
        }
    }

    /// Separate these keys from others stored in the same cache.
    ///
    /// Without a prefix, keys start with the loader's name when the loader
    /// is a named function, and [`DEFAULT_KEY_PREFIX`] otherwise.
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// TTL for stored values; the client's default when unset.
    pub fn ttl_seconds(mut self, ttl: u64) -> Self {
        self.ttl_seconds = Some(ttl);
        self
    }

    /// Run the loader when the lookup fails (default), or return the error.
    pub fn fail_open(mut self, fail_open: bool) -> Self {
        self.fail_open = fail_open;
        self
    }

    /// Called with the lookup latency on a hit.
    pub fn on_hit(mut self, callback: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.on_hit = Some(Arc::new(callback));
        self
    }

    /// Called with the lookup, store and loader latencies on a miss.
    pub fn on_miss(
        mut self,
        callback: impl Fn(Duration, Duration, Duration) + Send + Sync + 'static,
    ) -> Self {
        self.on_miss = Some(Arc::new(callback));
        self
    }

    pub fn on_load_error(mut self, callback: impl Fn(&SdkError) + Send + Sync + 'static) -> Self {
        self.on_load_error = Some(Arc::new(callback));
        self
    }

    pub fn on_store_error(mut self, callback: impl Fn(&SdkError) + Send + Sync + 'static) -> Self {
        self.on_store_error = Some(Arc::new(callback));
        self
    }

    /// The cache key for a set of arguments under the configured prefix.
    pub fn key_for<K: Serialize + ?Sized>(&self, key_args: &K) -> Result<String, SdkError> {
        let prefix = self.key_prefix.as_deref().unwrap_or(DEFAULT_KEY_PREFIX);
        format_key(prefix, key_args)
    }

    /// Return the cached value for `key_args`, computing it with `loader` on
    /// a miss.
    ///
    /// Failures storing the computed value are reported to the store-error
    /// callback and never returned.
    pub async fn get_or_load<K, T, E, F, Fut>(&self, key_args: &K, loader: F) -> Result<T, E>
    where
        K: Serialize + ?Sized,
        T: Serialize + DeserializeOwned,
        E: From<SdkError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let prefix = match &self.key_prefix {
            Some(prefix) => prefix.as_str(),
            None => loader_name::<F>().unwrap_or(DEFAULT_KEY_PREFIX),
        };
        let key = format_key(prefix, key_args)?;

        let started = Instant::now();
        let cached = match self.lookup::<T>(&key).await {
            Ok(cached) => cached,
            Err(err) => {
                if let Some(callback) = &self.on_load_error {
                    callback(&err);
                }
                if self.fail_open {
                    return loader().await;
                }
                return Err(err.into());
            }
        };
        let load_latency = started.elapsed();

        if let Some(value) = cached {
            debug!(cache = %self.cache_name, key = %key, "Read-through hit");
            if let Some(callback) = &self.on_hit {
                callback(load_latency);
            }
            return Ok(value);
        }

        let started = Instant::now();
        let value = loader().await?;
        let compute_latency = started.elapsed();

        let started = Instant::now();
        if let Err(err) = self.store(&key, &value).await {
            if let Some(callback) = &self.on_store_error {
                callback(&err);
            }
        }
        let store_latency = started.elapsed();

        debug!(cache = %self.cache_name, key = %key, "Read-through miss");
        if let Some(callback) = &self.on_miss {
            callback(load_latency, store_latency, compute_latency);
        }
        Ok(value)
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, SdkError> {
        let response = self.client.get(&self.cache_name, key).await?;
        response
            .value_as_bytes()
            .map(|bytes| self.codec.decode(bytes))
            .transpose()
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T) -> Result<(), SdkError> {
        let encoded = self.codec.encode(value)?;
        self.client
            .set(&self.cache_name, key, encoded, self.ttl_seconds)
            .await?;
        Ok(())
    }
}

fn format_key<K: Serialize + ?Sized>(prefix: &str, key_args: &K) -> Result<String, SdkError> {
    let encoded = serde_json::to_string(key_args)
        .map_err(|e| SdkError::invalid_argument(format!("key is not serializable: {}", e)))?;
    Ok(format!("{}-{}", prefix, encoded))
}

/// Name of a function item, `None` for closures.
fn loader_name<F>() -> Option<&'static str> {
    let path = std::any::type_name::<F>();
    let path = path.split('<').next().unwrap_or(path).trim_end_matches("::");
    let name = path.rsplit("::").next().unwrap_or(path);
    (!name.is_empty() && !name.contains('{')).then_some(name)
}

impl<C> std::fmt::Debug for ReadThrough<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadThrough")
            .field("cache_name", &self.cache_name)
            .field("key_prefix", &self.key_prefix)
            .field("ttl_seconds", &self.ttl_seconds)
            .field("fail_open", &self.fail_open)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::InMemoryCacheService;
    use crate::{ClientConfig, ErrorKind};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tonic::Status;

    fn read_through(service: &Arc<InMemoryCacheService>) -> ReadThrough {
        let client = SimpleCacheClient::with_transports(
            ClientConfig::new("token", 60),
            service.clone(),
            service.clone(),
        )
        .unwrap();
        ReadThrough::new(Arc::new(client), "cache").key_prefix("square")
    }

    #[test]
    fn test_key_format() {
        let service = Arc::new(InMemoryCacheService::new());
        let tool = read_through(&service);

        assert_eq!(tool.key_for(&(3, "x")).unwrap(), r#"square-[3,"x"]"#);
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let service = Arc::new(InMemoryCacheService::new().with_caches(["cache"]));
        let hits = Arc::new(AtomicUsize::new(0));
        let misses = Arc::new(AtomicUsize::new(0));
        let (h, m) = (hits.clone(), misses.clone());
        let tool = read_through(&service)
            .ttl_seconds(90)
            .on_hit(move |_| {
                h.fetch_add(1, Ordering::SeqCst);
            })
            .on_miss(move |_, _, _| {
                m.fetch_add(1, Ordering::SeqCst);
            });
        let loads = AtomicUsize::new(0);

        for _ in 0..3 {
            let loads = &loads;
            let value: u64 = tool
                .get_or_load(&[7], || async move {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, SdkError>(49)
                })
                .await
                .unwrap();
            assert_eq!(value, 49);
        }

        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert_eq!(misses.load(Ordering::SeqCst), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
        assert_eq!(service.recorded_ttls(), vec![90_000]);
    }

    #[tokio::test]
    async fn test_fail_open_runs_loader() {
        let service = Arc::new(InMemoryCacheService::new().with_caches(["cache"]));
        service.fail_next(Status::unavailable("down"));
        let errors = Arc::new(Mutex::new(Vec::new()));
        let recorded = errors.clone();
        let tool = read_through(&service).on_load_error(move |err| recorded.lock().push(err.kind()));

        let value: String = tool
            .get_or_load("k", || async { Ok::<_, SdkError>("fresh".to_string()) })
            .await
            .unwrap();

        assert_eq!(value, "fresh");
        assert_eq!(*errors.lock(), vec![ErrorKind::InternalServer]);
    }

    #[tokio::test]
    async fn test_fail_closed_returns_error() {
        let service = Arc::new(InMemoryCacheService::new().with_caches(["cache"]));
        service.fail_next(Status::permission_denied("nope"));
        let tool = read_through(&service).fail_open(false);

        let err = tool
            .get_or_load("k", || async { Ok::<u32, SdkError>(1) })
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[tokio::test]
    async fn test_store_error_is_reported_not_returned() {
        let service = Arc::new(InMemoryCacheService::new().with_caches(["cache"]));
        let store_errors = Arc::new(AtomicUsize::new(0));
        let counter = store_errors.clone();
        let tool = read_through(&service).on_store_error(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let failing = &service;
        let value: u32 = tool
            .get_or_load("k", || async move {
                failing.fail_next(Status::internal("disk full"));
                Ok::<_, SdkError>(5)
            })
            .await
            .unwrap();

        assert_eq!(value, 5);
        assert_eq!(store_errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_undecodable_value_is_a_load_error() {
        let service = Arc::new(InMemoryCacheService::new().with_caches(["cache"]));
        let tool = read_through(&service);
        let key = tool.key_for("k").unwrap();
        tool.client.set("cache", key, "not json", None).await.unwrap();

        let value: u32 = tool
            .get_or_load("k", || async { Ok::<_, SdkError>(8) })
            .await
            .unwrap();
        assert_eq!(value, 8);
    }

    struct Versioned;

    impl Codec for Versioned {
        fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, SdkError> {
            let mut bytes = b"v1:".to_vec();
            bytes.extend(JsonCodec.encode(value)?);
            Ok(bytes)
        }

        fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, SdkError> {
            let body = bytes
                .strip_prefix(b"v1:")
                .ok_or_else(|| SdkError::internal_server("unversioned value"))?;
            JsonCodec.decode(body)
        }
    }

    #[tokio::test]
    async fn test_custom_codec_round_trips() {
        let service = Arc::new(InMemoryCacheService::new().with_caches(["cache"]));
        let tool = read_through(&service).codec(Versioned);
        let loads = AtomicUsize::new(0);

        for _ in 0..2 {
            let loads = &loads;
            let value: Vec<u32> = tool
                .get_or_load("k", || async move {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, SdkError>(vec![1, 2])
                })
                .await
                .unwrap();
            assert_eq!(value, vec![1, 2]);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        let stored = tool.client.get("cache", tool.key_for("k").unwrap()).await.unwrap();
        assert_eq!(stored.value_as_str(), Some("v1:[1,2]"));
    }

    #[tokio::test]
    async fn test_prefixes_keep_families_apart() {
        let service = Arc::new(InMemoryCacheService::new().with_caches(["cache"]));
        let squares = read_through(&service);
        let cubes = read_through(&service).key_prefix("cube");

        let square: u32 = squares
            .get_or_load(&[3], || async { Ok::<_, SdkError>(9) })
            .await
            .unwrap();
        let cube: u32 = cubes
            .get_or_load(&[3], || async { Ok::<_, SdkError>(27) })
            .await
            .unwrap();
        assert_eq!((square, cube), (9, 27));

        let square: u32 = squares
            .get_or_load(&[3], || async { Ok::<_, SdkError>(0) })
            .await
            .unwrap();
        let cube: u32 = cubes
            .get_or_load(&[3], || async { Ok::<_, SdkError>(0) })
            .await
            .unwrap();
        assert_eq!((square, cube), (9, 27));
    }

    async fn load_settings() -> Result<u32, SdkError> {
        Ok(12)
    }

    #[tokio::test]
    async fn test_loader_name_is_default_prefix() {
        let service = Arc::new(InMemoryCacheService::new().with_caches(["cache"]));
        let client = Arc::new(
            SimpleCacheClient::with_transports(
                ClientConfig::new("token", 60),
                service.clone(),
                service.clone(),
            )
            .unwrap(),
        );
        let tool = ReadThrough::new(client.clone(), "cache");

        let value = tool.get_or_load("k", load_settings).await.unwrap();
        assert_eq!(value, 12);
        assert!(client.get("cache", r#"load_settings-"k""#).await.unwrap().is_hit());

        let value: u32 = tool
            .get_or_load("k", || async { Ok::<_, SdkError>(13) })
            .await
            .unwrap();
        assert_eq!(value, 13);
        assert!(client.get("cache", r#"read-through-"k""#).await.unwrap().is_hit());
    }

    #[test]
    fn test_loader_name() {
        fn plain() {}
        fn generic<T>() {}

        assert_eq!(loader_name_of(&plain), Some("plain"));
        assert_eq!(loader_name_of(&generic::<u8>), Some("generic"));
        assert_eq!(loader_name_of(&|| ()), None);
    }

    fn loader_name_of<F>(_: &F) -> Option<&'static str> {
        loader_name::<F>()
    }

    #[tokio::test]
    async fn test_loader_error_propagates() {
        let service = Arc::new(InMemoryCacheService::new().with_caches(["cache"]));
        let tool = read_through(&service);

        let err = tool
            .get_or_load("k", || async {
                Err::<u32, _>(SdkError::client_sdk("loader failed"))
            })
            .await
            .unwrap_err();
        assert_eq!(err.message(), "loader failed");
    }
}
