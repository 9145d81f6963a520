//! Transport seams between the client facades and the network.
//!
//! [`DataPlane`] and [`ControlPlane`] issue exactly one call each and report
//! raw [`Status`] failures; translation happens in the executor. The gRPC
//! implementations own one [`GrpcConnection`] apiece.

use async_trait::async_trait;
use bytes::Bytes;
use momento_grpc::{
    AGENT_HEADER, AUTHORIZATION_HEADER, BoxError, ChannelConfig, GrpcConnection, GrpcError, Header,
    HeaderService,
};
use momento_wire::{
    CACHE_HEADER, CreateCacheRequest, CreateCacheResponse, CreateSigningKeyRequest,
    CreateSigningKeyResponse, DeleteCacheRequest, DeleteCacheResponse, DeleteRequest,
    DeleteResponse, GetRequest, GetResponse, ListCachesRequest, ListCachesResponse,
    ListSigningKeysRequest, ListSigningKeysResponse, RevokeSigningKeyRequest,
    RevokeSigningKeyResponse, ScsClient, ScsControlClient, SetRequest, SetResponse,
};
use std::time::Duration;
use tonic::codegen::{Body, Service, StdError, http};
use tonic::metadata::MetadataValue;
use tonic::transport::Channel;
use tonic::{Request, Status};

/// Value of the client identification header.
pub fn agent() -> String {
    format!("rust:{}", env!("CARGO_PKG_VERSION"))
}

/// Headers every connection carries: the token on every call, the client
/// identification on the first call only.
pub fn default_headers(auth_token: &str) -> Vec<Header> {
    vec![
        Header::always(AUTHORIZATION_HEADER, auth_token),
        Header::once(AGENT_HEADER, agent()),
    ]
}

/// Item calls against the data plane.
#[async_trait]
pub trait DataPlane: Send + Sync {
    async fn get(
        &self,
        cache_name: &str,
        request: GetRequest,
        deadline: Duration,
    ) -> Result<GetResponse, Status>;

    async fn set(
        &self,
        cache_name: &str,
        request: SetRequest,
        deadline: Duration,
    ) -> Result<SetResponse, Status>;

    async fn delete(
        &self,
        cache_name: &str,
        request: DeleteRequest,
        deadline: Duration,
    ) -> Result<DeleteResponse, Status>;

    /// The endpoint calls are sent to.
    fn endpoint(&self) -> &str;

    /// Release the connection; `true` if this call released it.
    fn close(&self) -> bool;
}

/// Cache lifecycle and signing-key calls against the control plane.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    async fn create_cache(
        &self,
        request: CreateCacheRequest,
        deadline: Duration,
    ) -> Result<CreateCacheResponse, Status>;

    async fn delete_cache(
        &self,
        request: DeleteCacheRequest,
        deadline: Duration,
    ) -> Result<DeleteCacheResponse, Status>;

    async fn list_caches(
        &self,
        request: ListCachesRequest,
        deadline: Duration,
    ) -> Result<ListCachesResponse, Status>;

    async fn create_signing_key(
        &self,
        request: CreateSigningKeyRequest,
        deadline: Duration,
    ) -> Result<CreateSigningKeyResponse, Status>;

    async fn revoke_signing_key(
        &self,
        request: RevokeSigningKeyRequest,
        deadline: Duration,
    ) -> Result<RevokeSigningKeyResponse, Status>;

    async fn list_signing_keys(
        &self,
        request: ListSigningKeysRequest,
        deadline: Duration,
    ) -> Result<ListSigningKeysResponse, Status>;

    fn endpoint(&self) -> &str;

    fn close(&self) -> bool;
}

fn timed<M>(message: M, deadline: Duration) -> Request<M> {
    let mut request = Request::new(message);
    request.set_timeout(deadline);
    request
}

fn scoped<M>(cache_name: &str, message: M, deadline: Duration) -> Result<Request<M>, Status> {
    let value = MetadataValue::try_from(cache_name).map_err(|_| {
        GrpcError::Metadata(format!("cache name `{}` is not valid metadata", cache_name))
            .into_status()
    })?;
    let mut request = timed(message, deadline);
    request.metadata_mut().insert(CACHE_HEADER, value);
    Ok(request)
}

/// [`DataPlane`] over a managed gRPC connection.
pub struct GrpcDataPlane<T = Channel> {
    connection: GrpcConnection<ScsClient<HeaderService<T>>>,
}

impl GrpcDataPlane<Channel> {
    /// Build over a channel that connects on first use.
    ///
    /// Must be called from within a tokio runtime.
    pub fn lazy(config: &ChannelConfig, auth_token: &str) -> Result<Self, GrpcError> {
        let connection = GrpcConnection::lazy(config, default_headers(auth_token), ScsClient::new)?;
        Ok(Self { connection })
    }

    /// Build over an established channel.
    pub async fn connect(config: &ChannelConfig, auth_token: &str) -> Result<Self, GrpcError> {
        let connection =
            GrpcConnection::connect(config, default_headers(auth_token), ScsClient::new).await?;
        Ok(Self { connection })
    }
}

impl<T, B> GrpcDataPlane<T>
where
    T: Service<http::Request<tonic::body::Body>, Response = http::Response<B>> + Clone,
    T::Error: Into<BoxError>,
    T::Future: Send + 'static,
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<StdError> + Send,
{
    /// Build over an arbitrary HTTP/2 transport service.
    pub fn from_service(
        endpoint: impl Into<String>,
        service: T,
        headers: Vec<Header>,
    ) -> Result<Self, GrpcError> {
        let connection = GrpcConnection::from_service(endpoint, service, headers, ScsClient::new)?;
        Ok(Self { connection })
    }

    /// The managed connection.
    pub fn connection(&self) -> &GrpcConnection<ScsClient<HeaderService<T>>> {
        &self.connection
    }
}

#[async_trait]
impl<T, B> DataPlane for GrpcDataPlane<T>
where
    T: Service<http::Request<tonic::body::Body>, Response = http::Response<B>>
        + Clone
        + Send
        + Sync
        + 'static,
    T::Error: Into<BoxError>,
    T::Future: Send + 'static,
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<StdError> + Send,
{
    async fn get(
        &self,
        cache_name: &str,
        request: GetRequest,
        deadline: Duration,
    ) -> Result<GetResponse, Status> {
        let request = scoped(cache_name, request, deadline)?;
        let mut stub = self.connection.stub()?;
        Ok(stub.get(request).await?.into_inner())
    }

    async fn set(
        &self,
        cache_name: &str,
        request: SetRequest,
        deadline: Duration,
    ) -> Result<SetResponse, Status> {
        let request = scoped(cache_name, request, deadline)?;
        let mut stub = self.connection.stub()?;
        Ok(stub.set(request).await?.into_inner())
    }

    async fn delete(
        &self,
        cache_name: &str,
        request: DeleteRequest,
        deadline: Duration,
    ) -> Result<DeleteResponse, Status> {
        let request = scoped(cache_name, request, deadline)?;
        let mut stub = self.connection.stub()?;
        Ok(stub.delete(request).await?.into_inner())
    }

    fn endpoint(&self) -> &str {
        self.connection.endpoint()
    }

    fn close(&self) -> bool {
        self.connection.close()
    }
}

/// [`ControlPlane`] over a managed gRPC connection.
pub struct GrpcControlPlane<T = Channel> {
    connection: GrpcConnection<ScsControlClient<HeaderService<T>>>,
}

impl GrpcControlPlane<Channel> {
    /// Build over a channel that connects on first use.
    ///
    /// Must be called from within a tokio runtime.
    pub fn lazy(config: &ChannelConfig, auth_token: &str) -> Result<Self, GrpcError> {
        let connection =
            GrpcConnection::lazy(config, default_headers(auth_token), ScsControlClient::new)?;
        Ok(Self { connection })
    }

    /// Build over an established channel.
    pub async fn connect(config: &ChannelConfig, auth_token: &str) -> Result<Self, GrpcError> {
        let connection =
            GrpcConnection::connect(config, default_headers(auth_token), ScsControlClient::new)
                .await?;
        Ok(Self { connection })
    }
}

impl<T, B> GrpcControlPlane<T>
where
    T: Service<http::Request<tonic::body::Body>, Response = http::Response<B>> + Clone,
    T::Error: Into<BoxError>,
    T::Future: Send + 'static,
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<StdError> + Send,
{
    /// Build over an arbitrary HTTP/2 transport service.
    pub fn from_service(
        endpoint: impl Into<String>,
        service: T,
        headers: Vec<Header>,
    ) -> Result<Self, GrpcError> {
        let connection =
            GrpcConnection::from_service(endpoint, service, headers, ScsControlClient::new)?;
        Ok(Self { connection })
    }

    /// The managed connection.
    pub fn connection(&self) -> &GrpcConnection<ScsControlClient<HeaderService<T>>> {
        &self.connection
    }
}

#[async_trait]
impl<T, B> ControlPlane for GrpcControlPlane<T>
where
    T: Service<http::Request<tonic::body::Body>, Response = http::Response<B>>
        + Clone
        + Send
        + Sync
        + 'static,
    T::Error: Into<BoxError>,
    T::Future: Send + 'static,
    B: Body<Data = Bytes> + Send + 'static,
    B::Error: Into<StdError> + Send,
{
    async fn create_cache(
        &self,
        request: CreateCacheRequest,
        deadline: Duration,
    ) -> Result<CreateCacheResponse, Status> {
        let mut stub = self.connection.stub()?;
        Ok(stub.create_cache(timed(request, deadline)).await?.into_inner())
    }

    async fn delete_cache(
        &self,
        request: DeleteCacheRequest,
        deadline: Duration,
    ) -> Result<DeleteCacheResponse, Status> {
        let mut stub = self.connection.stub()?;
        Ok(stub.delete_cache(timed(request, deadline)).await?.into_inner())
    }

    async fn list_caches(
        &self,
        request: ListCachesRequest,
        deadline: Duration,
    ) -> Result<ListCachesResponse, Status> {
        let mut stub = self.connection.stub()?;
        Ok(stub.list_caches(timed(request, deadline)).await?.into_inner())
    }

    async fn create_signing_key(
        &self,
        request: CreateSigningKeyRequest,
        deadline: Duration,
    ) -> Result<CreateSigningKeyResponse, Status> {
        let mut stub = self.connection.stub()?;
        Ok(stub
            .create_signing_key(timed(request, deadline))
            .await?
            .into_inner())
    }

    async fn revoke_signing_key(
        &self,
        request: RevokeSigningKeyRequest,
        deadline: Duration,
    ) -> Result<RevokeSigningKeyResponse, Status> {
        let mut stub = self.connection.stub()?;
        Ok(stub
            .revoke_signing_key(timed(request, deadline))
            .await?
            .into_inner())
    }

    async fn list_signing_keys(
        &self,
        request: ListSigningKeysRequest,
        deadline: Duration,
    ) -> Result<ListSigningKeysResponse, Status> {
        let mut stub = self.connection.stub()?;
        Ok(stub
            .list_signing_keys(timed(request, deadline))
            .await?
            .into_inner())
    }

    fn endpoint(&self) -> &str {
        self.connection.endpoint()
    }

    fn close(&self) -> bool {
        self.connection.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use momento_grpc::HeaderScope;

    #[test]
    fn test_default_headers() {
        let headers = default_headers("token");

        assert_eq!(headers[0].name(), AUTHORIZATION_HEADER);
        assert_eq!(headers[0].value(), "token");
        assert_eq!(headers[0].scope(), HeaderScope::Always);

        assert_eq!(headers[1].name(), AGENT_HEADER);
        assert!(headers[1].value().starts_with("rust:"));
        assert_eq!(headers[1].scope(), HeaderScope::Once);
    }

    #[test]
    fn test_scoped_request_carries_cache_and_deadline() {
        let request = scoped("my-cache", (), Duration::from_millis(1500)).unwrap();

        assert_eq!(request.metadata().get(CACHE_HEADER).unwrap(), "my-cache");
        assert_eq!(request.metadata().get("grpc-timeout").unwrap(), "1500000u");
    }

    #[test]
    fn test_scoped_request_rejects_bad_metadata() {
        let status = scoped("bad\nname", (), Duration::from_secs(1)).unwrap_err();
        assert!(std::error::Error::source(&status).is_some());
    }
}
