//! In-memory transports for exercising clients without a network.
//!
//! [`InMemoryCacheService`] implements both [`DataPlane`] and [`ControlPlane`]
//! with the service's observable semantics: caches must exist before items
//! are stored, listings are paginated, and items expire after their TTL.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use momento_grpc::GrpcError;
use momento_wire::{
    Cache, CreateCacheRequest, CreateCacheResponse, CreateSigningKeyRequest,
    CreateSigningKeyResponse, DeleteCacheRequest, DeleteCacheResponse, DeleteRequest,
    DeleteResponse, ECacheResult, GetRequest, GetResponse, ListCachesRequest, ListCachesResponse,
    ListSigningKeysRequest, ListSigningKeysResponse, RevokeSigningKeyRequest,
    RevokeSigningKeyResponse, SetRequest, SetResponse, SigningKey,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tonic::Status;

use crate::transport::{ControlPlane, DataPlane};

struct Item {
    value: Bytes,
    /// `None` when the TTL is too long to represent.
    expires_at: Option<Instant>,
}

#[derive(Default)]
struct State {
    caches: BTreeMap<String, HashMap<Bytes, Item>>,
    signing_keys: BTreeMap<String, u64>,
    failures: VecDeque<Status>,
    ttls: Vec<u64>,
    keys_issued: u64,
}

/// A cache service held entirely in memory.
pub struct InMemoryCacheService {
    endpoint: String,
    page_size: usize,
    latency: Option<Duration>,
    state: Mutex<State>,
    dispatches: AtomicUsize,
    data_closed: AtomicBool,
    control_closed: AtomicBool,
}

impl Default for InMemoryCacheService {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCacheService {
    pub fn new() -> Self {
        Self {
            endpoint: "cache.in-memory".to_string(),
            page_size: 100,
            latency: None,
            state: Mutex::new(State::default()),
            dispatches: AtomicUsize::new(0),
            data_closed: AtomicBool::new(false),
            control_closed: AtomicBool::new(false),
        }
    }

    /// Set the endpoint reported by both planes.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the number of entries per listing page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Delay every answer by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Create caches up front.
    pub fn with_caches<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        {
            let mut state = self.state.lock();
            for name in names {
                state.caches.entry(name.into()).or_default();
            }
        }
        self
    }

    /// Answer the next call with `status` instead of serving it.
    pub fn fail_next(&self, status: Status) {
        self.state.lock().failures.push_back(status);
    }

    /// Number of calls that reached this service.
    pub fn dispatch_count(&self) -> usize {
        self.dispatches.load(Ordering::SeqCst)
    }

    /// TTLs, in milliseconds, of every item stored so far.
    pub fn recorded_ttls(&self) -> Vec<u64> {
        self.state.lock().ttls.clone()
    }

    pub fn cache_names(&self) -> Vec<String> {
        self.state.lock().caches.keys().cloned().collect()
    }

    pub fn is_data_closed(&self) -> bool {
        self.data_closed.load(Ordering::SeqCst)
    }

    pub fn is_control_closed(&self) -> bool {
        self.control_closed.load(Ordering::SeqCst)
    }

    async fn begin(&self, closed: &AtomicBool) -> Result<(), Status> {
        if closed.load(Ordering::SeqCst) {
            return Err(GrpcError::Closed(self.endpoint.clone()).into_status());
        }
        self.dispatches.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match self.state.lock().failures.pop_front() {
            Some(status) => Err(status),
            None => Ok(()),
        }
    }
}

/// Slice one listing page; the token is the index of the page's first entry.
fn page<T>(entries: Vec<T>, next_token: &str, page_size: usize) -> Result<(Vec<T>, String), Status> {
    let start = if next_token.is_empty() {
        0
    } else {
        next_token
            .parse::<usize>()
            .map_err(|_| Status::invalid_argument("invalid next token"))?
    };
    let total = entries.len();
    let page: Vec<T> = entries.into_iter().skip(start).take(page_size).collect();
    let end = start.saturating_add(page_size);
    let token = if end < total {
        end.to_string()
    } else {
        String::new()
    };
    Ok((page, token))
}

fn cache_not_found(cache_name: &str) -> Status {
    Status::not_found(format!("Cache `{}` does not exist", cache_name))
}

#[async_trait]
impl DataPlane for InMemoryCacheService {
    async fn get(
        &self,
        cache_name: &str,
        request: GetRequest,
        _deadline: Duration,
    ) -> Result<GetResponse, Status> {
        self.begin(&self.data_closed).await?;
        let mut state = self.state.lock();
        let cache = state
            .caches
            .get_mut(cache_name)
            .ok_or_else(|| cache_not_found(cache_name))?;

        let now = Instant::now();
        cache.retain(|_, item| item.expires_at.is_none_or(|at| at > now));

        Ok(match cache.get(&request.cache_key) {
            Some(item) => GetResponse {
                result: ECacheResult::Hit as i32,
                cache_body: item.value.clone(),
                message: String::new(),
            },
            None => GetResponse {
                result: ECacheResult::Miss as i32,
                ..Default::default()
            },
        })
    }

    async fn set(
        &self,
        cache_name: &str,
        request: SetRequest,
        _deadline: Duration,
    ) -> Result<SetResponse, Status> {
        self.begin(&self.data_closed).await?;
        let mut state = self.state.lock();
        state.ttls.push(request.ttl_milliseconds);
        let cache = state
            .caches
            .get_mut(cache_name)
            .ok_or_else(|| cache_not_found(cache_name))?;

        cache.insert(
            request.cache_key,
            Item {
                value: request.cache_body,
                expires_at: Instant::now().checked_add(Duration::from_millis(request.ttl_milliseconds)),
            },
        );
        Ok(SetResponse {
            result: ECacheResult::Ok as i32,
            message: String::new(),
        })
    }

    async fn delete(
        &self,
        cache_name: &str,
        request: DeleteRequest,
        _deadline: Duration,
    ) -> Result<DeleteResponse, Status> {
        self.begin(&self.data_closed).await?;
        let mut state = self.state.lock();
        let cache = state
            .caches
            .get_mut(cache_name)
            .ok_or_else(|| cache_not_found(cache_name))?;
        cache.remove(&request.cache_key);
        Ok(DeleteResponse {})
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn close(&self) -> bool {
        !self.data_closed.swap(true, Ordering::SeqCst)
    }
}

#[async_trait]
impl ControlPlane for InMemoryCacheService {
    async fn create_cache(
        &self,
        request: CreateCacheRequest,
        _deadline: Duration,
    ) -> Result<CreateCacheResponse, Status> {
        self.begin(&self.control_closed).await?;
        let mut state = self.state.lock();
        if state.caches.contains_key(&request.cache_name) {
            return Err(Status::already_exists(format!(
                "Cache `{}` already exists",
                request.cache_name
            )));
        }
        state.caches.insert(request.cache_name, HashMap::new());
        Ok(CreateCacheResponse {})
    }

    async fn delete_cache(
        &self,
        request: DeleteCacheRequest,
        _deadline: Duration,
    ) -> Result<DeleteCacheResponse, Status> {
        self.begin(&self.control_closed).await?;
        self.state
            .lock()
            .caches
            .remove(&request.cache_name)
            .map(|_| DeleteCacheResponse {})
            .ok_or_else(|| cache_not_found(&request.cache_name))
    }

    async fn list_caches(
        &self,
        request: ListCachesRequest,
        _deadline: Duration,
    ) -> Result<ListCachesResponse, Status> {
        self.begin(&self.control_closed).await?;
        let caches: Vec<Cache> = self
            .state
            .lock()
            .caches
            .keys()
            .map(|name| Cache {
                cache_name: name.clone(),
            })
            .collect();

        let (cache, next_token) = page(caches, &request.next_token, self.page_size)?;
        Ok(ListCachesResponse { cache, next_token })
    }

    async fn create_signing_key(
        &self,
        request: CreateSigningKeyRequest,
        _deadline: Duration,
    ) -> Result<CreateSigningKeyResponse, Status> {
        self.begin(&self.control_closed).await?;
        let mut state = self.state.lock();
        state.keys_issued += 1;
        let key_id = format!("key-{}", state.keys_issued);
        let expires_at =
            Utc::now().timestamp().max(0) as u64 + u64::from(request.ttl_minutes) * 60;
        state.signing_keys.insert(key_id.clone(), expires_at);

        Ok(CreateSigningKeyResponse {
            key: serde_json::json!({ "kid": key_id, "kty": "RSA", "alg": "RS256" }).to_string(),
            expires_at,
        })
    }

    async fn revoke_signing_key(
        &self,
        request: RevokeSigningKeyRequest,
        _deadline: Duration,
    ) -> Result<RevokeSigningKeyResponse, Status> {
        self.begin(&self.control_closed).await?;
        self.state.lock().signing_keys.remove(&request.key_id);
        Ok(RevokeSigningKeyResponse {})
    }

    async fn list_signing_keys(
        &self,
        request: ListSigningKeysRequest,
        _deadline: Duration,
    ) -> Result<ListSigningKeysResponse, Status> {
        self.begin(&self.control_closed).await?;
        let keys: Vec<SigningKey> = self
            .state
            .lock()
            .signing_keys
            .iter()
            .map(|(key_id, expires_at)| SigningKey {
                key_id: key_id.clone(),
                expires_at: *expires_at,
            })
            .collect();

        let (signing_key, next_token) = page(keys, &request.next_token, self.page_size)?;
        Ok(ListSigningKeysResponse {
            signing_key,
            next_token,
        })
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn close(&self) -> bool {
        !self.control_closed.swap(true, Ordering::SeqCst)
    }
}

/// Collects formatted warnings emitted while it is installed.
#[cfg(test)]
#[derive(Clone, Default)]
pub(crate) struct LogCapture {
    buffer: std::sync::Arc<Mutex<Vec<u8>>>,
}

#[cfg(test)]
impl LogCapture {
    /// Install on the current thread until the guard is dropped.
    pub(crate) fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    /// Captured lines containing `needle`.
    pub(crate) fn lines_with(&self, needle: &str) -> Vec<String> {
        String::from_utf8_lossy(&self.buffer.lock())
            .lines()
            .filter(|line| line.contains(needle))
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
