// Momento - Rust clients for the Momento Simple Cache Service
//
// This library bundles the wire schema, the managed gRPC connection layer and
// the blocking and async cache clients behind one import.

// Re-export the clients
pub use momento_client::*;

// Re-export the lower layers
pub use momento_grpc;
pub use momento_wire;

/// Prelude for common imports.
///
/// ```rust,ignore
/// use momento::prelude::*;
///
/// let client = SimpleCacheClient::connect(ClientConfig::new(token, 60)).await?;
/// ```
pub mod prelude {
    pub use momento_client::prelude::*;
}
