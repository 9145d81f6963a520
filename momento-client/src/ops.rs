//! Translation between logical operations and wire messages.
//!
//! Every operation has a `prepare_*` function building its wire request and a
//! `construct_*` function mapping the wire response to a typed result. None of
//! them perform I/O.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use momento_wire::{
    CreateCacheRequest, CreateCacheResponse as WireCreateCacheResponse, CreateSigningKeyRequest,
    CreateSigningKeyResponse as WireCreateSigningKeyResponse, DeleteCacheRequest,
    DeleteCacheResponse as WireDeleteCacheResponse, DeleteRequest, DeleteResponse, ECacheResult,
    GetRequest, GetResponse, ListCachesRequest, ListCachesResponse as WireListCachesResponse,
    ListSigningKeysRequest, ListSigningKeysResponse as WireListSigningKeysResponse,
    RevokeSigningKeyRequest, RevokeSigningKeyResponse as WireRevokeSigningKeyResponse, SetRequest,
    SetResponse,
};
use serde::Deserialize;
use tracing::trace;

use crate::responses::{
    CacheDeleteResponse, CacheGetResponse, CacheInfo, CacheSetResponse, CreateCacheResponse,
    CreateSigningKeyResponse, DeleteCacheResponse, ListCachesResponse, ListSigningKeysResponse,
    RevokeSigningKeyResponse, SigningKey,
};
use crate::validation::{validate_signing_key_ttl, validate_ttl};
use crate::{Result, SdkError};

/// Conversion of keys and values into their wire bytes.
///
/// Text is encoded as UTF-8, so `"abc"` and `b"abc"` name the same item.
pub trait IntoBytes {
    fn into_wire_bytes(self) -> Bytes;
}

impl IntoBytes for &str {
    fn into_wire_bytes(self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl IntoBytes for String {
    fn into_wire_bytes(self) -> Bytes {
        Bytes::from(self)
    }
}

impl IntoBytes for &String {
    fn into_wire_bytes(self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }
}

impl IntoBytes for &[u8] {
    fn into_wire_bytes(self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl<const N: usize> IntoBytes for &[u8; N] {
    fn into_wire_bytes(self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl IntoBytes for Vec<u8> {
    fn into_wire_bytes(self) -> Bytes {
        Bytes::from(self)
    }
}

impl IntoBytes for &Vec<u8> {
    fn into_wire_bytes(self) -> Bytes {
        Bytes::copy_from_slice(self)
    }
}

impl IntoBytes for Bytes {
    fn into_wire_bytes(self) -> Bytes {
        self
    }
}

impl IntoBytes for &Bytes {
    fn into_wire_bytes(self) -> Bytes {
        self.clone()
    }
}

// Data plane

pub fn prepare_set_request(
    key: Bytes,
    value: Bytes,
    ttl_seconds: Option<u64>,
    default_ttl_seconds: u64,
) -> Result<SetRequest> {
    let ttl_seconds = ttl_seconds.unwrap_or(default_ttl_seconds);
    validate_ttl(ttl_seconds)?;
    trace!(key = ?key, ttl_seconds, "Issuing a set request");

    Ok(SetRequest {
        cache_key: key,
        cache_body: value,
        ttl_milliseconds: ttl_seconds * 1000,
    })
}

pub fn construct_set_response(request: SetRequest, _response: SetResponse) -> Result<CacheSetResponse> {
    trace!(key = ?request.cache_key, "Set succeeded");
    Ok(CacheSetResponse {
        key: request.cache_key,
        value: request.cache_body,
    })
}

pub fn prepare_get_request(key: Bytes) -> GetRequest {
    trace!(key = ?key, "Issuing a get request");
    GetRequest { cache_key: key }
}

pub fn construct_get_response(request: GetRequest, response: GetResponse) -> Result<CacheGetResponse> {
    trace!(key = ?request.cache_key, result = response.result, "Received a get response");
    match ECacheResult::try_from(response.result) {
        Ok(ECacheResult::Hit) => Ok(CacheGetResponse::Hit(response.cache_body)),
        Ok(ECacheResult::Miss) => Ok(CacheGetResponse::Miss),
        _ => Err(SdkError::internal_server(format!(
            "Get received unsupported result code {}: {}",
            response.result, response.message
        ))),
    }
}

pub fn prepare_delete_request(key: Bytes) -> DeleteRequest {
    trace!(key = ?key, "Issuing a delete request");
    DeleteRequest { cache_key: key }
}

pub fn construct_delete_response(
    _request: DeleteRequest,
    _response: DeleteResponse,
) -> Result<CacheDeleteResponse> {
    Ok(CacheDeleteResponse)
}

// Control plane

pub fn prepare_create_cache_request(cache_name: &str) -> CreateCacheRequest {
    CreateCacheRequest {
        cache_name: cache_name.to_string(),
    }
}

pub fn construct_create_cache_response(
    _request: CreateCacheRequest,
    _response: WireCreateCacheResponse,
) -> Result<CreateCacheResponse> {
    Ok(CreateCacheResponse)
}

pub fn prepare_delete_cache_request(cache_name: &str) -> DeleteCacheRequest {
    DeleteCacheRequest {
        cache_name: cache_name.to_string(),
    }
}

pub fn construct_delete_cache_response(
    _request: DeleteCacheRequest,
    _response: WireDeleteCacheResponse,
) -> Result<DeleteCacheResponse> {
    Ok(DeleteCacheResponse)
}

pub fn prepare_list_caches_request(next_token: Option<&str>) -> ListCachesRequest {
    ListCachesRequest {
        next_token: next_token.unwrap_or_default().to_string(),
    }
}

pub fn construct_list_caches_response(
    _request: ListCachesRequest,
    response: WireListCachesResponse,
) -> Result<ListCachesResponse> {
    Ok(ListCachesResponse {
        caches: response
            .cache
            .into_iter()
            .map(|cache| CacheInfo {
                name: cache.cache_name,
            })
            .collect(),
        next_token: non_empty(response.next_token),
    })
}

pub fn prepare_create_signing_key_request(ttl_minutes: u32) -> Result<CreateSigningKeyRequest> {
    validate_signing_key_ttl(ttl_minutes)?;
    Ok(CreateSigningKeyRequest { ttl_minutes })
}

#[derive(Deserialize)]
struct KeyId {
    kid: String,
}

pub fn construct_create_signing_key_response(
    response: WireCreateSigningKeyResponse,
    endpoint: &str,
) -> Result<CreateSigningKeyResponse> {
    let KeyId { kid } = serde_json::from_str(&response.key).map_err(|e| {
        SdkError::internal_server(format!("Signing key is missing its key id: {}", e))
    })?;

    Ok(CreateSigningKeyResponse {
        key_id: kid,
        endpoint: endpoint.to_string(),
        key: response.key,
        expires_at: timestamp(response.expires_at)?,
    })
}

pub fn prepare_revoke_signing_key_request(key_id: &str) -> Result<RevokeSigningKeyRequest> {
    if key_id.is_empty() {
        return Err(SdkError::invalid_argument("Signing key id must not be empty"));
    }
    Ok(RevokeSigningKeyRequest {
        key_id: key_id.to_string(),
    })
}

pub fn construct_revoke_signing_key_response(
    _request: RevokeSigningKeyRequest,
    _response: WireRevokeSigningKeyResponse,
) -> Result<RevokeSigningKeyResponse> {
    Ok(RevokeSigningKeyResponse)
}

pub fn prepare_list_signing_keys_request(next_token: Option<&str>) -> ListSigningKeysRequest {
    ListSigningKeysRequest {
        next_token: next_token.unwrap_or_default().to_string(),
    }
}

pub fn construct_list_signing_keys_response(
    response: WireListSigningKeysResponse,
    endpoint: &str,
) -> Result<ListSigningKeysResponse> {
    let signing_keys = response
        .signing_key
        .into_iter()
        .map(|key| {
            Ok(SigningKey {
                key_id: key.key_id,
                endpoint: endpoint.to_string(),
                expires_at: timestamp(key.expires_at)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ListSigningKeysResponse {
        signing_keys,
        next_token: non_empty(response.next_token),
    })
}

fn non_empty(token: String) -> Option<String> {
    if token.is_empty() { None } else { Some(token) }
}

fn timestamp(epoch_seconds: u64) -> Result<DateTime<Utc>> {
    i64::try_from(epoch_seconds)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .ok_or_else(|| {
            SdkError::internal_server(format!("Expiry {} is out of range", epoch_seconds))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;
    use crate::validation::MAX_TTL_SECONDS;
    use momento_wire::{Cache, SigningKey as WireSigningKey};

    #[test]
    fn test_text_and_bytes_keys_match() {
        assert_eq!("key".into_wire_bytes(), b"key".into_wire_bytes());
        assert_eq!(String::from("key").into_wire_bytes(), vec![b'k', b'e', b'y'].into_wire_bytes());
        assert_eq!("ключ".into_wire_bytes(), "ключ".as_bytes().into_wire_bytes());
    }

    #[test]
    fn test_set_request_uses_default_ttl() {
        let request = prepare_set_request("k".into_wire_bytes(), "v".into_wire_bytes(), None, 60).unwrap();
        assert_eq!(request.ttl_milliseconds, 60_000);
    }

    #[test]
    fn test_set_request_ttl_override() {
        let request =
            prepare_set_request("k".into_wire_bytes(), "v".into_wire_bytes(), Some(5), 60).unwrap();
        assert_eq!(request.ttl_milliseconds, 5_000);
    }

    #[test]
    fn test_set_request_rejects_bad_ttl() {
        for ttl in [0, MAX_TTL_SECONDS + 1] {
            let err = prepare_set_request(Bytes::new(), Bytes::new(), Some(ttl), 60).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
        assert!(prepare_set_request(Bytes::new(), Bytes::new(), Some(MAX_TTL_SECONDS), 60).is_ok());
    }

    #[test]
    fn test_set_response_echoes_request() {
        let request = prepare_set_request("k".into_wire_bytes(), "v".into_wire_bytes(), None, 60).unwrap();
        let response = construct_set_response(request, SetResponse::default()).unwrap();

        assert_eq!(response.key_as_str(), Some("k"));
        assert_eq!(response.value_as_str(), Some("v"));
    }

    #[test]
    fn test_get_response_hit_and_miss() {
        let hit = GetResponse {
            result: ECacheResult::Hit as i32,
            cache_body: Bytes::from_static(b"v"),
            message: String::new(),
        };
        let miss = GetResponse {
            result: ECacheResult::Miss as i32,
            ..Default::default()
        };

        assert_eq!(
            construct_get_response(prepare_get_request(Bytes::new()), hit).unwrap(),
            CacheGetResponse::Hit(Bytes::from_static(b"v"))
        );
        assert_eq!(
            construct_get_response(prepare_get_request(Bytes::new()), miss).unwrap(),
            CacheGetResponse::Miss
        );
    }

    #[test]
    fn test_get_response_unrecognized_result() {
        for result in [ECacheResult::Invalid as i32, ECacheResult::Ok as i32, 42] {
            let response = GetResponse {
                result,
                message: "odd".to_string(),
                ..Default::default()
            };
            let err = construct_get_response(prepare_get_request(Bytes::new()), response).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InternalServer);
        }
    }

    #[test]
    fn test_list_caches_token() {
        let last_page = WireListCachesResponse {
            cache: vec![Cache {
                cache_name: "a".to_string(),
            }],
            next_token: String::new(),
        };
        let response =
            construct_list_caches_response(prepare_list_caches_request(None), last_page).unwrap();

        assert_eq!(response.caches, vec![CacheInfo { name: "a".to_string() }]);
        assert_eq!(response.next_token, None);

        let request = prepare_list_caches_request(Some("2"));
        assert_eq!(request.next_token, "2");
    }

    #[test]
    fn test_create_signing_key_response() {
        let response = WireCreateSigningKeyResponse {
            key: r#"{"kid":"key-1","kty":"RSA"}"#.to_string(),
            expires_at: 1_700_000_000,
        };

        let key = construct_create_signing_key_response(response, "cache.example.com").unwrap();

        assert_eq!(key.key_id, "key-1");
        assert_eq!(key.endpoint, "cache.example.com");
        assert_eq!(key.expires_at.timestamp(), 1_700_000_000);
    }

    #[test]
    fn test_create_signing_key_response_without_kid() {
        let response = WireCreateSigningKeyResponse {
            key: r#"{"kty":"RSA"}"#.to_string(),
            expires_at: 0,
        };
        let err = construct_create_signing_key_response(response, "e").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InternalServer);
    }

    #[test]
    fn test_signing_key_inputs() {
        assert!(prepare_create_signing_key_request(0).is_err());
        assert_eq!(prepare_create_signing_key_request(30).unwrap().ttl_minutes, 30);
        assert!(prepare_revoke_signing_key_request("").is_err());
    }

    #[test]
    fn test_list_signing_keys_response() {
        let response = WireListSigningKeysResponse {
            signing_key: vec![WireSigningKey {
                key_id: "k".to_string(),
                expires_at: 60,
            }],
            next_token: "next".to_string(),
        };

        let page = construct_list_signing_keys_response(response, "cache.example.com").unwrap();

        assert_eq!(page.signing_keys[0].key_id, "k");
        assert_eq!(page.signing_keys[0].expires_at.timestamp(), 60);
        assert_eq!(page.next_token.as_deref(), Some("next"));
    }

    #[test]
    fn test_expiry_out_of_range() {
        let response = WireListSigningKeysResponse {
            signing_key: vec![WireSigningKey {
                key_id: "k".to_string(),
                expires_at: u64::MAX,
            }],
            next_token: String::new(),
        };
        let err = construct_list_signing_keys_response(response, "e").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InternalServer);
    }
}
