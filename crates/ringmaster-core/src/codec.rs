//! Codec trait and implementations for persisted records.
//!
//! Storage backends don't care how a record becomes bytes, only that
//! something implements [`Codec`]. [`JsonCodec`] is the default because
//! score files are meant to be readable and hand-editable by operators.

use serde::{Serialize, de::DeserializeOwned};

use crate::CodecError;

/// Encodes values to bytes and decodes them back.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`CodecError::Encode`] if the value can't be represented.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`CodecError::Decode`] if the bytes are malformed or don't
    /// match the expected shape.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`, writing pretty-printed output.
///
/// ```rust
/// use ringmaster_core::{Codec, JsonCodec, PlayerId};
///
/// let codec = JsonCodec;
/// let bytes = codec.encode(&vec![PlayerId(1), PlayerId(2)]).unwrap();
/// let back: Vec<PlayerId> = codec.decode(&bytes).unwrap();
/// assert_eq!(back, vec![PlayerId(1), PlayerId(2)]);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec_pretty(value).map_err(CodecError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(data).map_err(CodecError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::Location;

    #[test]
    fn test_decode_truncated_input_returns_decode_error() {
        let codec = JsonCodec;
        let bytes = codec.encode(&Location::new("arena", 1.0, 2.0, 3.0)).unwrap();

        let result: Result<Location, _> = codec.decode(&bytes[..bytes.len() / 2]);

        assert!(matches!(result, Err(CodecError::Decode(_))));
    }

    #[test]
    fn test_decode_wrong_shape_returns_decode_error() {
        let result: Result<Location, _> = JsonCodec.decode(br#"{"world":"x"}"#);
        assert!(matches!(result, Err(CodecError::Decode(_))));
    }
}
