//! Decoding of the Workers AI response envelope.
//!
//! ```json
//! {"result": [...], "success": true, "errors": [], "messages": []}
//! ```
//!
//! Missing lists default to empty and a missing `success` to `false`. Each
//! entry of `errors`/`messages` is either a bare string or an object with a
//! `message` field.

use crate::error::Swift2MdError;
use crate::output::ConversionResult;
use serde::{Deserialize, Deserializer};

const UNKNOWN_API_ERROR: &str = "Unknown API error";

#[derive(Debug, Deserialize)]
pub(crate) struct ApiEnvelope {
    #[serde(default, deserialize_with = "null_as_default")]
    pub result: Vec<ConversionResult>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub success: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: Vec<ApiMessage>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub messages: Vec<ApiMessage>,
}

impl ApiEnvelope {
    /// Decode a 2xx body; structural failures become `InvalidResponse`.
    pub fn decode(body: &[u8]) -> Result<Self, Swift2MdError> {
        serde_json::from_slice(body).map_err(|e| {
            tracing::debug!("Envelope decode failed: {}", e);
            Swift2MdError::InvalidResponse
        })
    }

    /// Turn the envelope into the conversion results or an `Api` error.
    pub fn into_result(self) -> Result<Vec<ConversionResult>, Swift2MdError> {
        if self.success {
            return Ok(self.result);
        }
        let messages = self
            .errors
            .into_iter()
            .chain(self.messages)
            .map(|m| m.0)
            .collect();
        Err(Swift2MdError::Api { messages })
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// An error or info message; bare string or `{"message": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ApiMessage(pub String);

impl<'de> Deserialize<'de> for ApiMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let text = match value {
            serde_json::Value::String(s) => s,
            serde_json::Value::Object(map) => match map.get("message") {
                Some(serde_json::Value::String(s)) => s.clone(),
                _ => UNKNOWN_API_ERROR.to_string(),
            },
            _ => UNKNOWN_API_ERROR.to_string(),
        };
        Ok(ApiMessage(text))
    }
}
