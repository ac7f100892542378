//! The request gateway: one helper every backend call goes through.
//!
//! # Design
//! `Gateway::send` is split the same way the rest of the crate is:
//! `prepare` turns a path and `RequestOptions` into an `HttpRequest` with the
//! defaults applied, the `Transport` executes it, and `interpret` turns the
//! `HttpResponse` into an `Envelope` or a `RequestError`. `prepare` and
//! `interpret` do no I/O.
//!
//! Defaults never override the caller: a `content-type` or `authorization`
//! header passed in `RequestOptions` is sent exactly as given.
//!
//! There are no retries, timeouts, or cancellation. Each call makes one
//! attempt and reports whatever happened.

use std::sync::Arc;

use reqwest::header::{HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use secrecy::ExposeSecret;

use crate::config::GatewayConfig;
use crate::envelope::Envelope;
use crate::error::{GatewayError, InvalidHeader, RequestError};
use crate::http::{Body, Headers, HttpMethod, HttpRequest, HttpResponse};
use crate::storage::{FileStorage, NoToken, Storage, StorageTokenSource, TokenSource};
use crate::transport::{ReqwestTransport, Transport};

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Per-call options: method, extra headers, and body.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub method: HttpMethod,
    pub headers: Headers,
    pub body: Option<Body>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::default()
    }

    pub fn method(method: HttpMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn post() -> Self {
        Self::method(HttpMethod::Post)
    }

    pub fn put() -> Self {
        Self::method(HttpMethod::Put)
    }

    pub fn delete() -> Self {
        Self::method(HttpMethod::Delete)
    }

    pub fn header(mut self, name: &str, value: impl AsRef<str>) -> Result<Self, GatewayError> {
        self.headers.set(name, value)?;
        Ok(self)
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serialize `value` as the JSON body.
    pub fn json<T: serde::Serialize + ?Sized>(self, value: &T) -> Result<Self, GatewayError> {
        Ok(self.body(Body::json(value)?))
    }
}

/// Variable lookup consulted for the base URL on every call.
type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Where the base URL comes from.
#[derive(Clone)]
enum BaseUrl {
    Fixed(String),
    Configured(Lookup),
}

impl BaseUrl {
    fn resolve(&self) -> String {
        match self {
            BaseUrl::Fixed(base) => base.clone(),
            BaseUrl::Configured(lookup) => GatewayConfig::from_lookup(|key| lookup(key)).base_url,
        }
    }
}

impl std::fmt::Debug for BaseUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BaseUrl::Fixed(base) => f.debug_tuple("Fixed").field(base).finish(),
            BaseUrl::Configured(_) => f.write_str("Configured"),
        }
    }
}

/// Resolve `path` against `base`.
///
/// Anything starting with `http` is taken as an absolute URL and used
/// verbatim. Everything else is appended to `base` as-is, with no slash
/// normalisation.
pub fn resolve_url(base: &str, path: &str) -> String {
    if path.starts_with("http") {
        path.to_string()
    } else {
        format!("{base}{path}")
    }
}

/// Stateless request helper for the attendance backend.
///
/// Holds a base-URL source, a read-only token source, and a transport.
/// Cloning is cheap and clones share the transport (and its cookie jar).
#[derive(Clone)]
pub struct Gateway {
    base_url: BaseUrl,
    tokens: Arc<dyn TokenSource>,
    transport: Arc<dyn Transport>,
}

impl Gateway {
    /// Gateway against a fixed base URL, with no session token and the
    /// default reqwest transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, GatewayError> {
        Ok(Self {
            base_url: BaseUrl::Fixed(base_url.into()),
            tokens: Arc::new(NoToken),
            transport: Arc::new(ReqwestTransport::new()?),
        })
    }

    /// Gateway configured from the process environment. See `from_lookup`.
    pub fn from_env() -> Result<Self, GatewayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Gateway configured from `lookup`: the base URL is re-read through it
    /// on every call and the token comes from the configured storage file.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Result<Self, GatewayError> {
        let config = GatewayConfig::from_lookup(&lookup);
        let storage: Arc<dyn Storage> = Arc::new(FileStorage::new(config.storage_path));
        Ok(Self {
            base_url: BaseUrl::Configured(Arc::new(lookup)),
            tokens: Arc::new(StorageTokenSource::new(storage)),
            transport: Arc::new(ReqwestTransport::new()?),
        })
    }

    pub fn with_token_source(mut self, tokens: Arc<dyn TokenSource>) -> Self {
        self.tokens = tokens;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// The base URL a call made now would use.
    pub fn base_url(&self) -> String {
        self.base_url.resolve()
    }

    /// Build the outgoing request for `path` with every default applied.
    ///
    /// An empty text body counts as no body for the content-type default.
    pub fn prepare(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<HttpRequest, GatewayError> {
        let RequestOptions {
            method,
            mut headers,
            body,
        } = options;

        let url = resolve_url(&self.base_url.resolve(), path);

        if let Some(Body::Text(text)) = &body {
            if !text.is_empty() && !headers.has("content-type") {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
            }
        }

        if !headers.has("authorization") {
            if let Some(token) = self.tokens.token() {
                let bearer = format!("Bearer {}", token.expose_secret());
                let mut value = HeaderValue::from_str(&bearer).map_err(|_| InvalidHeader {
                    name: AUTHORIZATION.to_string(),
                })?;
                value.set_sensitive(true);
                headers.insert(AUTHORIZATION, value);
            }
        }

        Ok(HttpRequest {
            method,
            url,
            headers,
            body,
        })
    }

    /// Turn a response into the success envelope or a `RequestError`.
    pub fn interpret(response: HttpResponse) -> Result<Envelope, RequestError> {
        let success = response.is_success();
        let status = response.status;
        let body = Envelope::parse(response.body);
        if success {
            Ok(body)
        } else {
            Err(RequestError { status, body })
        }
    }

    /// Send one request and return the parsed body.
    pub fn send(&self, path: &str, options: RequestOptions) -> Result<Envelope, GatewayError> {
        let request = self.prepare(path, options)?;
        let method = request.method;
        let url = request.url.clone();
        log::debug!("-> {method} {url}");

        let response = self.transport.execute(request)?;
        log::debug!("<- {} {method} {url}", response.status);

        Self::interpret(response).map_err(|err| {
            log::warn!("{method} {url} failed with status {}", err.status);
            GatewayError::Status(err)
        })
    }

    pub fn get(&self, path: &str) -> Result<Envelope, GatewayError> {
        self.send(path, RequestOptions::get())
    }

    pub fn post_json<T: serde::Serialize + ?Sized>(
        &self,
        path: &str,
        value: &T,
    ) -> Result<Envelope, GatewayError> {
        self.send(path, RequestOptions::post().json(value)?)
    }
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
