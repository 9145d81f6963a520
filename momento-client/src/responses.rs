//! Typed results of cache client operations.

use bytes::Bytes;
use chrono::{DateTime, Utc};

/// Outcome of a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheGetStatus {
    Hit,
    Miss,
}

/// Result of a get.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheGetResponse {
    /// The item exists; carries its value.
    Hit(Bytes),
    /// The item does not exist.
    Miss,
}

impl CacheGetResponse {
    pub fn status(&self) -> CacheGetStatus {
        match self {
            Self::Hit(_) => CacheGetStatus::Hit,
            Self::Miss => CacheGetStatus::Miss,
        }
    }

    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit(_))
    }

    /// The raw value, on a hit.
    pub fn value_as_bytes(&self) -> Option<&Bytes> {
        match self {
            Self::Hit(value) => Some(value),
            Self::Miss => None,
        }
    }

    /// The value as UTF-8 text, on a hit with a valid UTF-8 value.
    pub fn value_as_str(&self) -> Option<&str> {
        self.value_as_bytes()
            .and_then(|value| std::str::from_utf8(value).ok())
    }

    /// Take the raw value, on a hit.
    pub fn into_value(self) -> Option<Bytes> {
        match self {
            Self::Hit(value) => Some(value),
            Self::Miss => None,
        }
    }
}

/// Result of a set; echoes what was stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSetResponse {
    pub key: Bytes,
    pub value: Bytes,
}

impl CacheSetResponse {
    pub fn key_as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.key).ok()
    }

    pub fn value_as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }
}

/// Result of a delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheDeleteResponse;

/// Result of a multi-set; echoes every stored item in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheMultiSetResponse {
    pub items: Vec<(Bytes, Bytes)>,
}

/// Result of a multi-get; one result per requested key, in request order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheMultiGetResponse {
    pub responses: Vec<CacheGetResponse>,
}

impl CacheMultiGetResponse {
    pub fn statuses(&self) -> Vec<CacheGetStatus> {
        self.responses.iter().map(CacheGetResponse::status).collect()
    }

    pub fn values_as_bytes(&self) -> Vec<Option<&Bytes>> {
        self.responses
            .iter()
            .map(CacheGetResponse::value_as_bytes)
            .collect()
    }
}

/// Result of creating a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateCacheResponse;

/// Result of deleting a cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteCacheResponse;

/// A cache returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheInfo {
    pub name: String,
}

/// One page of caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListCachesResponse {
    pub caches: Vec<CacheInfo>,
    /// Token for the next page; `None` on the last page.
    pub next_token: Option<String>,
}

/// A newly created signing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateSigningKeyResponse {
    pub key_id: String,
    /// Data-plane host the key is valid for.
    pub endpoint: String,
    /// The key itself, as a JSON web key.
    pub key: String,
    pub expires_at: DateTime<Utc>,
}

/// Result of revoking a signing key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RevokeSigningKeyResponse;

/// A signing key returned by a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningKey {
    pub key_id: String,
    pub endpoint: String,
    pub expires_at: DateTime<Utc>,
}

/// One page of signing keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListSigningKeysResponse {
    pub signing_keys: Vec<SigningKey>,
    pub next_token: Option<String>,
}
