//! Serialization helpers: base64 for binary values that cross the
//! administrative boundary (salts, encoded credential material).

use crate::error::Result;
use base64::Engine;

/// Encode bytes as url-safe base64 (no padding).
pub fn base64_encode<T: AsRef<[u8]>>(bytes: T) -> String {
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes.as_ref())
}

/// Decode url-safe base64 (no padding) into bytes.
pub fn base64_decode<T: AsRef<[u8]>>(bytes: T) -> Result<Vec<u8>> {
    Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(bytes.as_ref())?)
}

/// Serde adapter that writes a byte vector as a base64 string instead of a
/// sequence of integers.
pub(crate) mod base64_bytes {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::base64_encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let string = String::deserialize(deserializer)?;
        super::base64_decode(string.as_bytes()).map_err(D::Error::custom)
    }
}
