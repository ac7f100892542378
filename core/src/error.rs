//! Error types for the request gateway.
//!
//! # Design
//! A non-success status is not a transport failure: the server answered, and
//! its body is often the most useful thing a caller can show. `RequestError`
//! keeps the status and the parsed body together so callers can inspect
//! either. Transport failures are surfaced as-is; nothing here retries.

use thiserror::Error;

use crate::envelope::Envelope;

/// The server answered with a status outside 2xx.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("request failed with status {status}")]
pub struct RequestError {
    pub status: u16,
    /// Parsed JSON body, or the raw text when it did not parse.
    pub body: Envelope,
}

impl RequestError {
    /// The `error` or `message` string of a JSON body, when present.
    pub fn message(&self) -> Option<&str> {
        let json = self.body.as_json()?;
        json.get("error")
            .or_else(|| json.get("message"))
            .and_then(|v| v.as_str())
    }
}

/// The request never produced a response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Other(String),
}

/// A header name or value that HTTP cannot carry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid header {name:?}")]
pub struct InvalidHeader {
    pub name: String,
}

/// Client storage could not be read or written.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage file is not a JSON object: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Errors returned by `Gateway::send` and the typed API built on it.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Status(#[from] RequestError),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The response envelope did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Header(#[from] InvalidHeader),

    /// Input rejected before any request was made.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl GatewayError {
    /// The HTTP status, for errors that came back from the server.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Status(err) => Some(err.status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn message_reads_error_field() {
        let err = RequestError {
            status: 400,
            body: Envelope::Json(json!({"error": "No image provided"})),
        };
        assert_eq!(err.message(), Some("No image provided"));
    }

    #[test]
    fn message_falls_back_to_message_field() {
        let err = RequestError {
            status: 409,
            body: Envelope::Json(json!({"message": "Attendance already marked for today"})),
        };
        assert_eq!(err.message(), Some("Attendance already marked for today"));
    }

    #[test]
    fn text_body_has_no_message() {
        let err = RequestError {
            status: 502,
            body: Envelope::Text("Bad Gateway".to_string()),
        };
        assert_eq!(err.message(), None);
        assert_eq!(err.to_string(), "request failed with status 502");
    }

    #[test]
    fn status_only_for_server_errors() {
        let err = GatewayError::from(RequestError {
            status: 404,
            body: Envelope::Text(String::new()),
        });
        assert_eq!(err.status(), Some(404));
        assert_eq!(GatewayError::Decode("x".into()).status(), None);
        let header = GatewayError::from(InvalidHeader { name: "bad name".into() });
        assert_eq!(header.status(), None);
        assert_eq!(header.to_string(), r#"invalid header "bad name""#);
    }
}
