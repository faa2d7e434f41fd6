//! JSON characteristic values
//!
//! Wraps any serde type so it can be carried over a characteristic as a JSON document. Useful
//! for configuration characteristics whose layout changes more often than firmware ships.

use super::value::{ValueError, ValueFormat};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A characteristic value serialized as JSON
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Serialize + DeserializeOwned> ValueFormat for Json<T> {
    fn encoded_len(&self) -> usize {
        // serde_json only fails on non-string map keys and such, which a value that reached a
        // characteristic cannot have; treat a failure as an empty document
        serde_json::to_vec(&self.0).map(|raw| raw.len()).unwrap_or(0)
    }

    fn encode_into(&self, buffer: &mut [u8]) {
        if let Ok(raw) = serde_json::to_vec(&self.0) {
            buffer.copy_from_slice(&raw);
        }
    }

    fn try_decode(raw: &[u8]) -> Result<Self, ValueError> {
        serde_json::from_slice(raw)
            .map(Json)
            .map_err(|e| ValueError::Codec(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Calibration {
        offset: i16,
        scale: f32,
    }

    #[test]
    fn json_round_trip() {
        let value = Json(Calibration {
            offset: -3,
            scale: 1.25,
        });

        let raw = value.encode();

        assert_eq!(Ok(value.clone()), Json::try_decode(&raw));
    }

    #[test]
    fn malformed_document_is_a_codec_error() {
        let result = Json::<Calibration>::try_decode(b"{\"offset\":");

        assert!(matches!(result, Err(ValueError::Codec(_))));
    }
}
