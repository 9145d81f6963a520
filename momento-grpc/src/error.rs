//! gRPC error types.

use thiserror::Error;
use tonic::Status;

/// Result type for connection operations.
pub type Result<T> = std::result::Result<T, GrpcError>;

/// Errors raised while building or using a managed connection.
#[derive(Debug, Error)]
pub enum GrpcError {
    /// Transport error.
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A header name or value cannot be sent as gRPC metadata.
    #[error("Invalid metadata: {0}")]
    Metadata(String),

    /// The connection was closed before the call was issued.
    #[error("Connection to {0} is closed")]
    Closed(String),
}

impl GrpcError {
    /// Whether this error comes from the client's own state rather than from
    /// the network or the server.
    pub fn is_client_fault(&self) -> bool {
        matches!(self, Self::Closed(_) | Self::Metadata(_))
    }

    /// Convert into a tonic Status, keeping this error as the status source.
    pub fn into_status(self) -> Status {
        Status::from_error(Box::new(self))
    }
}

impl From<GrpcError> for Status {
    fn from(err: GrpcError) -> Self {
        err.into_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as StdError;

    #[test]
    fn test_client_fault() {
        assert!(GrpcError::Closed("cache.example.com".into()).is_client_fault());
        assert!(GrpcError::Metadata("bad".into()).is_client_fault());
        assert!(!GrpcError::Config("bad".into()).is_client_fault());
    }

    #[test]
    fn test_into_status_keeps_source() {
        let status = GrpcError::Closed("cache.example.com".into()).into_status();
        let source = StdError::source(&status).expect("status source");

        let err = source.downcast_ref::<GrpcError>().expect("grpc error source");
        assert!(matches!(err, GrpcError::Closed(_)));
    }

    #[test]
    fn test_display() {
        let err = GrpcError::Closed("cache.example.com".into());
        assert_eq!(err.to_string(), "Connection to cache.example.com is closed");
    }
}
