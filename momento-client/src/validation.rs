//! Input validation performed before any request is built.

use std::time::Duration;

use crate::{Result, SdkError};

/// Maximum length of a cache name, in bytes.
pub const MAX_CACHE_NAME_LENGTH: usize = 255;

/// Largest item TTL whose millisecond value fits the wire field.
pub const MAX_TTL_SECONDS: u64 = u64::MAX / 1000;

/// Validate a cache name.
///
/// A valid name is non-empty, at most [`MAX_CACHE_NAME_LENGTH`] bytes of
/// printable ASCII, and has no leading or trailing whitespace.
pub fn validate_cache_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(SdkError::invalid_argument("Cache name must not be empty"));
    }
    if name.len() > MAX_CACHE_NAME_LENGTH {
        return Err(SdkError::invalid_argument(format!(
            "Cache name must be at most {} bytes, got {}",
            MAX_CACHE_NAME_LENGTH,
            name.len()
        )));
    }
    if !name.bytes().all(|b| b.is_ascii_graphic() || b == b' ') {
        return Err(SdkError::invalid_argument(
            "Cache name must contain only printable ASCII characters",
        ));
    }
    if name.starts_with(' ') || name.ends_with(' ') {
        return Err(SdkError::invalid_argument(
            "Cache name must not start or end with whitespace",
        ));
    }
    Ok(())
}

/// Validate an item TTL in seconds.
pub fn validate_ttl(ttl_seconds: u64) -> Result<()> {
    if ttl_seconds == 0 {
        return Err(SdkError::invalid_argument("TTL seconds must be positive"));
    }
    if ttl_seconds > MAX_TTL_SECONDS {
        return Err(SdkError::invalid_argument(format!(
            "TTL seconds must be at most {}, got {}",
            MAX_TTL_SECONDS, ttl_seconds
        )));
    }
    Ok(())
}

/// Validate the per-request deadline.
pub fn validate_request_timeout(timeout: Duration) -> Result<()> {
    if timeout.is_zero() {
        return Err(SdkError::invalid_argument("Request timeout must be positive"));
    }
    Ok(())
}

/// Validate the lifetime of a new signing key.
pub fn validate_signing_key_ttl(ttl_minutes: u32) -> Result<()> {
    if ttl_minutes == 0 {
        return Err(SdkError::invalid_argument(
            "Signing key TTL minutes must be positive",
        ));
    }
    Ok(())
}
