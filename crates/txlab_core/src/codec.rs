//! CBOR payload codec.

use crate::error::{CoreError, CoreResult};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Encodes a serializable value to CBOR payload bytes.
pub fn to_cbor<T: Serialize>(value: &T) -> CoreResult<Bytes> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf).map_err(|e| CoreError::codec(e.to_string()))?;
    Ok(Bytes::from(buf))
}

/// Decodes a value from CBOR payload bytes.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> CoreResult<T> {
    ciborium::de::from_reader(bytes).map_err(|e| CoreError::codec(e.to_string()))
}

/// Conversion between an entity and its stored payload.
///
/// The store holds opaque bytes; this trait is the seam where typed
/// entities become payloads and back.
pub trait RecordCodec: Sized {
    /// Encodes the entity to payload bytes.
    fn encode(&self) -> CoreResult<Bytes>;

    /// Decodes an entity from payload bytes.
    fn decode(bytes: &[u8]) -> CoreResult<Self>;
}
