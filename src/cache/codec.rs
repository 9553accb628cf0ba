//! Value encoding for cache entries.
//!
//! Values are stored as JSON bytes. Payloads at or above the configured
//! threshold are zstd-compressed; decompression happens before decoding.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CacheError, Result};

/// Default compression level (3 is a good balance of speed/ratio)
const COMPRESSION_LEVEL: i32 = 3;

/// An encoded value ready to be stored.
#[derive(Debug)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub compressed: bool,
    /// Serialized size before compression
    pub original_len: usize,
}

/// Serializes `value` and compresses it when `threshold` is set and reached.
pub fn encode<T: Serialize + ?Sized>(value: &T, threshold: Option<usize>) -> Result<Encoded> {
    let json = serde_json::to_vec(value)?;
    let original_len = json.len();

    match threshold {
        Some(limit) if original_len >= limit => {
            let bytes = zstd::encode_all(json.as_slice(), COMPRESSION_LEVEL)
                .map_err(|e| CacheError::Compression(e.to_string()))?;
            Ok(Encoded {
                bytes,
                compressed: true,
                original_len,
            })
        }
        _ => Ok(Encoded {
            bytes: json,
            compressed: false,
            original_len,
        }),
    }
}

/// Decompresses (if needed) and deserializes a stored payload.
pub fn decode<T: DeserializeOwned>(bytes: &[u8], compressed: bool) -> Result<T> {
    if compressed {
        let json = zstd::decode_all(bytes).map_err(|e| CacheError::Compression(e.to_string()))?;
        Ok(serde_json::from_slice(&json)?)
    } else {
        Ok(serde_json::from_slice(bytes)?)
    }
}
