//! Normalised response bodies.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::GatewayError;

/// A response body: JSON when it parses, otherwise the raw text.
///
/// Callers must handle both shapes. A body of `"\"hi\""` is `Json`, a body of
/// `hi` is `Text`; an empty body is `Text("")`.
#[derive(Debug, Clone, PartialEq)]
pub enum Envelope {
    Json(Value),
    Text(String),
}

impl Envelope {
    /// Parse `text` as JSON, keeping it unchanged when it is not JSON.
    pub fn parse(text: String) -> Self {
        match serde_json::from_str(&text) {
            Ok(value) => Envelope::Json(value),
            Err(_) => Envelope::Text(text),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Envelope::Json(value) => Some(value),
            Envelope::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Envelope::Json(_) => None,
            Envelope::Text(text) => Some(text),
        }
    }

    /// Field lookup on a JSON object body.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_json()?.get(key)
    }

    /// Deserialize a JSON body into `T`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, GatewayError> {
        match self {
            Envelope::Json(value) => {
                serde_json::from_value(value).map_err(|e| GatewayError::Decode(e.to_string()))
            }
            Envelope::Text(text) => Err(GatewayError::Decode(format!(
                "expected a JSON body, got text: {text}"
            ))),
        }
    }
}

impl From<Value> for Envelope {
    fn from(value: Value) -> Self {
        Envelope::Json(value)
    }
}
