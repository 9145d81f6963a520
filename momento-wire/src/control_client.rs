//! Control-plane schema (`control_client.ScsControl`).

use prost::bytes::Bytes;
use tonic::codegen::{Body, StdError, http};

/// `_CreateCacheRequest`
#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateCacheRequest {
    #[prost(string, tag = "1")]
    pub cache_name: String,
}

/// `_CreateCacheResponse`
#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateCacheResponse {}

/// `_DeleteCacheRequest`
#[derive(Clone, PartialEq, prost::Message)]
pub struct DeleteCacheRequest {
    #[prost(string, tag = "1")]
    pub cache_name: String,
}

/// `_DeleteCacheResponse`
#[derive(Clone, PartialEq, prost::Message)]
pub struct DeleteCacheResponse {}

/// `_ListCachesRequest`
#[derive(Clone, PartialEq, prost::Message)]
pub struct ListCachesRequest {
    #[prost(string, tag = "1")]
    pub next_token: String,
}

/// `_Cache`
#[derive(Clone, PartialEq, prost::Message)]
pub struct Cache {
    #[prost(string, tag = "1")]
    pub cache_name: String,
}

/// `_ListCachesResponse`
#[derive(Clone, PartialEq, prost::Message)]
pub struct ListCachesResponse {
    #[prost(message, repeated, tag = "1")]
    pub cache: Vec<Cache>,
    #[prost(string, tag = "2")]
    pub next_token: String,
}

/// `_CreateSigningKeyRequest`
#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateSigningKeyRequest {
    #[prost(uint32, tag = "1")]
    pub ttl_minutes: u32,
}

/// `_CreateSigningKeyResponse`
///
/// `key` is the JSON web key; `expires_at` is in epoch seconds.
#[derive(Clone, PartialEq, prost::Message)]
pub struct CreateSigningKeyResponse {
    #[prost(string, tag = "1")]
    pub key: String,
    #[prost(uint64, tag = "2")]
    pub expires_at: u64,
}

/// `_RevokeSigningKeyRequest`
#[derive(Clone, PartialEq, prost::Message)]
pub struct RevokeSigningKeyRequest {
    #[prost(string, tag = "1")]
    pub key_id: String,
}

/// `_RevokeSigningKeyResponse`
#[derive(Clone, PartialEq, prost::Message)]
pub struct RevokeSigningKeyResponse {}

/// `_ListSigningKeysRequest`
#[derive(Clone, PartialEq, prost::Message)]
pub struct ListSigningKeysRequest {
    #[prost(string, tag = "1")]
    pub next_token: String,
}

/// `_SigningKey`
#[derive(Clone, PartialEq, prost::Message)]
pub struct SigningKey {
    #[prost(string, tag = "1")]
    pub key_id: String,
    #[prost(uint64, tag = "2")]
    pub expires_at: u64,
}

/// `_ListSigningKeysResponse`
#[derive(Clone, PartialEq, prost::Message)]
pub struct ListSigningKeysResponse {
    #[prost(message, repeated, tag = "1")]
    pub signing_key: Vec<SigningKey>,
    #[prost(string, tag = "2")]
    pub next_token: String,
}

const SERVICE: &str = "control_client.ScsControl";

/// Client stub for the control-plane service.
#[derive(Debug, Clone)]
pub struct ScsControlClient<T> {
    inner: tonic::client::Grpc<T>,
}

impl<T> ScsControlClient<T>
where
    T: tonic::client::GrpcService<tonic::body::Body>,
    T::Error: Into<StdError>,
    T::ResponseBody: Body<Data = Bytes> + Send + 'static,
    <T::ResponseBody as Body>::Error: Into<StdError> + Send,
{
    pub fn new(inner: T) -> Self {
        Self {
            inner: tonic::client::Grpc::new(inner),
        }
    }

    pub async fn create_cache(
        &mut self,
        request: impl tonic::IntoRequest<CreateCacheRequest>,
    ) -> Result<tonic::Response<CreateCacheResponse>, tonic::Status> {
        self.unary(request, "CreateCache", "/control_client.ScsControl/CreateCache")
            .await
    }

    pub async fn delete_cache(
        &mut self,
        request: impl tonic::IntoRequest<DeleteCacheRequest>,
    ) -> Result<tonic::Response<DeleteCacheResponse>, tonic::Status> {
        self.unary(request, "DeleteCache", "/control_client.ScsControl/DeleteCache")
            .await
    }

    pub async fn list_caches(
        &mut self,
        request: impl tonic::IntoRequest<ListCachesRequest>,
    ) -> Result<tonic::Response<ListCachesResponse>, tonic::Status> {
        self.unary(request, "ListCaches", "/control_client.ScsControl/ListCaches")
            .await
    }

    pub async fn create_signing_key(
        &mut self,
        request: impl tonic::IntoRequest<CreateSigningKeyRequest>,
    ) -> Result<tonic::Response<CreateSigningKeyResponse>, tonic::Status> {
        self.unary(
            request,
            "CreateSigningKey",
            "/control_client.ScsControl/CreateSigningKey",
        )
        .await
    }

    pub async fn revoke_signing_key(
        &mut self,
        request: impl tonic::IntoRequest<RevokeSigningKeyRequest>,
    ) -> Result<tonic::Response<RevokeSigningKeyResponse>, tonic::Status> {
        self.unary(
            request,
            "RevokeSigningKey",
            "/control_client.ScsControl/RevokeSigningKey",
        )
        .await
    }

    pub async fn list_signing_keys(
        &mut self,
        request: impl tonic::IntoRequest<ListSigningKeysRequest>,
    ) -> Result<tonic::Response<ListSigningKeysResponse>, tonic::Status> {
        self.unary(
            request,
            "ListSigningKeys",
            "/control_client.ScsControl/ListSigningKeys",
        )
        .await
    }

    async fn unary<Req, Resp>(
        &mut self,
        request: impl tonic::IntoRequest<Req>,
        method: &'static str,
        path: &'static str,
    ) -> Result<tonic::Response<Resp>, tonic::Status>
    where
        Req: prost::Message + Send + Sync + 'static,
        Resp: prost::Message + Default + Send + Sync + 'static,
    {
        self.inner.ready().await.map_err(|e| {
            tonic::Status::unknown(format!("Service was not ready: {}", e.into()))
        })?;
        let codec = tonic::codec::ProstCodec::<Req, Resp>::default();
        let path = http::uri::PathAndQuery::from_static(path);
        let mut request = request.into_request();
        request
            .extensions_mut()
            .insert(tonic::GrpcMethod::new(SERVICE, method));
        self.inner.unary(request, path, codec).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_list_caches_response_decode() {
        let response = ListCachesResponse {
            cache: vec![
                Cache {
                    cache_name: "a".to_string(),
                },
                Cache {
                    cache_name: "b".to_string(),
                },
            ],
            next_token: "2".to_string(),
        };
        let bytes = response.encode_to_vec();

        // first repeated entry: field 1, len 3, nested field 1 "a"
        assert_eq!(&bytes[..5], &[0x0a, 0x03, 0x0a, 0x01, b'a']);
        assert_eq!(ListCachesResponse::decode(&bytes[..]).unwrap(), response);
    }

    #[test]
    fn test_empty_requests_encode_to_nothing() {
        assert!(ListCachesRequest::default().encode_to_vec().is_empty());
        assert!(DeleteCacheResponse::default().encode_to_vec().is_empty());
    }
}
