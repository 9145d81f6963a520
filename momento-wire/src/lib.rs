// Status from tonic is inherently large; this is acceptable for error handling
#![allow(clippy::result_large_err)]

//! # Momento Wire
//!
//! Protobuf messages and gRPC client stubs for the two Momento services:
//!
//! - **`cache_client.Scs`** (data plane): `Get`, `Set`, `Delete`
//! - **`control_client.ScsControl`** (control plane): cache lifecycle and
//!   signing keys
//!
//! The messages are written by hand with `prost` derives instead of being
//! generated at build time, so building this crate does not need `protoc`.
//! Field numbers match the service's published schema.
//!
//! Data-plane requests do not carry the cache name in the message body; it
//! travels as the `cache` metadata header.

pub mod cache_client;
pub mod control_client;

pub use cache_client::{
    DeleteRequest, DeleteResponse, ECacheResult, GetRequest, GetResponse, ScsClient, SetRequest,
    SetResponse,
};
pub use control_client::{
    Cache, CreateCacheRequest, CreateCacheResponse, CreateSigningKeyRequest,
    CreateSigningKeyResponse, DeleteCacheRequest, DeleteCacheResponse, ListCachesRequest,
    ListCachesResponse, ListSigningKeysRequest, ListSigningKeysResponse, RevokeSigningKeyRequest,
    RevokeSigningKeyResponse, ScsControlClient, SigningKey,
};

/// Metadata header carrying the target cache name on data-plane calls.
pub const CACHE_HEADER: &str = "cache";

/// Length of the gRPC message frame prefix (compression flag + u32 length).
pub const FRAME_HEADER_LEN: usize = 5;

/// Wrap an encoded message in a gRPC length-prefixed frame.
///
/// Only needed by code that speaks HTTP/2 directly, such as fake transports.
pub fn encode_frame<M: prost::Message>(message: &M) -> Vec<u8> {
    let body = message.encode_to_vec();
    let mut frame = Vec::with_capacity(FRAME_HEADER_LEN + body.len());
    frame.push(0);
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    frame
}

/// Decode a single uncompressed gRPC frame into a message.
pub fn decode_frame<M: prost::Message + Default>(frame: &[u8]) -> Result<M, prost::DecodeError> {
    if frame.len() < FRAME_HEADER_LEN {
        return Err(prost::DecodeError::new("frame shorter than its header"));
    }
    let len = u32::from_be_bytes([frame[1], frame[2], frame[3], frame[4]]) as usize;
    let body = frame
        .get(FRAME_HEADER_LEN..FRAME_HEADER_LEN + len)
        .ok_or_else(|| prost::DecodeError::new("frame truncated"))?;
    M::decode(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn test_frame_layout() {
        let request = GetRequest {
            cache_key: prost::bytes::Bytes::from_static(b"key"),
        };
        let frame = encode_frame(&request);

        assert_eq!(frame[0], 0);
        assert_eq!(&frame[1..5], &(request.encoded_len() as u32).to_be_bytes());

        let decoded: GetRequest = decode_frame(&frame).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn test_decode_frame_truncated() {
        assert!(decode_frame::<GetRequest>(&[0, 0, 0]).is_err());
        assert!(decode_frame::<GetRequest>(&[0, 0, 0, 0, 9, 1]).is_err());
    }
}
