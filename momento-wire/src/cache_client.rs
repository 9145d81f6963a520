//! Data-plane schema (`cache_client.Scs`).

use prost::bytes::Bytes;
use tonic::codegen::{Body, StdError, http};

/// Result code carried by data-plane responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ECacheResult {
    Invalid = 0,
    Ok = 1,
    Hit = 2,
    Miss = 3,
}

/// `_GetRequest`
#[derive(Clone, PartialEq, prost::Message)]
pub struct GetRequest {
    #[prost(bytes = "bytes", tag = "1")]
    pub cache_key: Bytes,
}

/// `_GetResponse`
#[derive(Clone, PartialEq, prost::Message)]
pub struct GetResponse {
    #[prost(enumeration = "ECacheResult", tag = "1")]
    pub result: i32,
    #[prost(bytes = "bytes", tag = "2")]
    pub cache_body: Bytes,
    #[prost(string, tag = "3")]
    pub message: String,
}

/// `_SetRequest`
#[derive(Clone, PartialEq, prost::Message)]
pub struct SetRequest {
    #[prost(bytes = "bytes", tag = "1")]
    pub cache_key: Bytes,
    #[prost(bytes = "bytes", tag = "2")]
    pub cache_body: Bytes,
    #[prost(uint64, tag = "3")]
    pub ttl_milliseconds: u64,
}

/// `_SetResponse`
#[derive(Clone, PartialEq, prost::Message)]
pub struct SetResponse {
    #[prost(enumeration = "ECacheResult", tag = "1")]
    pub result: i32,
    #[prost(string, tag = "2")]
    pub message: String,
}

/// `_DeleteRequest`
#[derive(Clone, PartialEq, prost::Message)]
pub struct DeleteRequest {
    #[prost(bytes = "bytes", tag = "1")]
    pub cache_key: Bytes,
}

/// `_DeleteResponse`
#[derive(Clone, PartialEq, prost::Message)]
pub struct DeleteResponse {}

const SERVICE: &str = "cache_client.Scs";

/// Client stub for the data-plane service.
///
/// Cloning is cheap and clones share the underlying transport, which is how
/// concurrent calls are issued over one connection.
#[derive(Debug, Clone)]
pub struct ScsClient<T> {
    inner: tonic::client::Grpc<T>,
}

impl<T> ScsClient<T>
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

    pub async fn get(
        &mut self,
        request: impl tonic::IntoRequest<GetRequest>,
    ) -> Result<tonic::Response<GetResponse>, tonic::Status> {
        self.unary(request, "Get", "/cache_client.Scs/Get").await
    }

    pub async fn set(
        &mut self,
        request: impl tonic::IntoRequest<SetRequest>,
    ) -> Result<tonic::Response<SetResponse>, tonic::Status> {
        self.unary(request, "Set", "/cache_client.Scs/Set").await
    }

    pub async fn delete(
        &mut self,
        request: impl tonic::IntoRequest<DeleteRequest>,
    ) -> Result<tonic::Response<DeleteResponse>, tonic::Status> {
        self.unary(request, "Delete", "/cache_client.Scs/Delete").await
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
