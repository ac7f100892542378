//! Request gateway for the face-recognition attendance backend.
//!
//! # Overview
//! Every call to the backend goes through `Gateway::send`: the path is
//! resolved against the configured base URL, JSON and bearer-token headers are
//! defaulted, the request runs on a `Transport`, and the body comes back as an
//! `Envelope` (JSON if it parses, raw text otherwise). Non-2xx statuses become
//! a `RequestError` carrying the status and the parsed body.
//!
//! # Design
//! - `Gateway` holds no mutable state. The base URL and the session token are
//!   read per call from injected sources.
//! - Request preparation and response interpretation are pure; only the
//!   `Transport` does I/O, so the header rules are testable without a server.
//! - `AttendanceClient` layers the backend's routes on top and owns the
//!   session lifecycle (login writes the token, logout clears it).
//! - DTOs are defined independently from the mock-server crate; integration
//!   tests catch schema drift.

pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod form;
pub mod gateway;
pub mod http;
pub mod storage;
pub mod transport;
pub mod types;

pub use client::{AttendanceClient, EnrollmentSummary, FaceImage, MIN_ENROLLMENT_IMAGES};
pub use config::GatewayConfig;
pub use envelope::Envelope;
pub use error::{GatewayError, InvalidHeader, RequestError, StorageError, TransportError};
pub use form::FormData;
pub use gateway::{resolve_url, Gateway, RequestOptions};
pub use http::{Body, Headers, HttpMethod, HttpRequest, HttpResponse};
pub use storage::{
    FileStorage, MemoryStorage, NoToken, StaticToken, Storage, StorageTokenSource, TokenSource,
    AUTH_TOKEN_KEY,
};
pub use transport::{ReqwestTransport, Transport};
