//! Executing prepared requests.
//!
//! # Design
//! `Transport` is the only seam that does I/O. The gateway builds an
//! `HttpRequest` with every default applied and hands it over; tests swap in
//! a recording transport, production uses `ReqwestTransport`.
//!
//! Form bodies are encoded here rather than in the gateway because the
//! boundary is part of the content type. The gateway therefore never sets a
//! content type for a form, and a caller-supplied one replaces the multipart
//! type reqwest generates.

use reqwest::blocking::{multipart, Client, Request};
use reqwest::Method;

use crate::error::TransportError;
use crate::form::{FormData, FormPart};
use crate::http::{Body, Headers, HttpMethod, HttpRequest, HttpResponse};

/// Executes one HTTP round-trip.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Blocking transport backed by a shared `reqwest` client.
///
/// The client keeps a cookie store, so cookies set by the backend travel
/// with every later request made through the same transport. Non-2xx
/// statuses are returned as responses, not errors, and response bodies are
/// read in full regardless of size.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client fails to build.
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder().cookie_store(true).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    fn build(&self, request: HttpRequest) -> Result<Request, TransportError> {
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let builder = self.client.request(method_for(method), url.as_str());
        let builder = match body {
            None => builder,
            Some(Body::Text(text)) => builder.body(text),
            Some(Body::Form(form)) => builder.multipart(to_multipart(form)?),
        };

        let mut built = builder.build()?;
        for (name, value) in headers.as_map() {
            built.headers_mut().insert(name.clone(), value.clone());
        }
        Ok(built)
    }
}

fn method_for(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Patch => Method::PATCH,
        HttpMethod::Delete => Method::DELETE,
    }
}

fn to_multipart(form: FormData) -> Result<multipart::Form, TransportError> {
    let mut out = multipart::Form::new();
    for part in form.into_parts() {
        out = match part {
            FormPart::Text { name, value } => out.text(name, value),
            FormPart::File {
                name,
                filename,
                content_type,
                data,
            } => {
                let file = multipart::Part::bytes(data)
                    .file_name(filename)
                    .mime_str(&content_type)?;
                out.part(name, file)
            }
        };
    }
    Ok(out)
}

impl Transport for ReqwestTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let request = self.build(request)?;
        let response = self.client.execute(request)?;

        let status = response.status().as_u16();
        let headers = Headers::from(response.headers().clone());
        let raw = response.bytes()?;

        Ok(HttpResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&raw).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::CONTENT_TYPE;

    fn transport() -> ReqwestTransport {
        ReqwestTransport::new().unwrap()
    }

    fn request(method: HttpMethod, headers: Headers, body: Option<Body>) -> HttpRequest {
        HttpRequest {
            method,
            url: "http://localhost:8000/api/x".to_string(),
            headers,
            body,
        }
    }

    #[test]
    fn text_body_has_no_implied_content_type() {
        let built = transport()
            .build(request(HttpMethod::Post, Headers::new(), Some(Body::Text("{}".into()))))
            .unwrap();
        assert_eq!(built.method(), &Method::POST);
        assert_eq!(built.url().as_str(), "http://localhost:8000/api/x");
        assert!(built.headers().get(CONTENT_TYPE).is_none());
        assert_eq!(built.body().and_then(|b| b.as_bytes()), Some(&b"{}"[..]));
    }

    #[test]
    fn form_body_gets_multipart_content_type() {
        let form = FormData::new()
            .text("note", "hi")
            .file("image", "a.jpg", "image/jpeg", vec![0xff, 0xd8]);
        let built = transport()
            .build(request(HttpMethod::Post, Headers::new(), Some(Body::Form(form))))
            .unwrap();
        let content_type = built.headers()[CONTENT_TYPE].to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
    }

    #[test]
    fn caller_content_type_replaces_multipart_type() {
        let headers = Headers::from_pairs([("Content-Type", "multipart/mixed")]).unwrap();
        let built = transport()
            .build(request(
                HttpMethod::Post,
                headers,
                Some(Body::Form(FormData::new().text("a", "b"))),
            ))
            .unwrap();
        let values: Vec<&str> = built
            .headers()
            .get_all(CONTENT_TYPE)
            .iter()
            .map(|v| v.to_str().unwrap())
            .collect();
        assert_eq!(values, ["multipart/mixed"]);
    }

    #[test]
    fn bad_file_content_type_is_a_transport_error() {
        let form = FormData::new().file("image", "a.jpg", "not a mime", vec![1]);
        let err = transport()
            .build(request(HttpMethod::Post, Headers::new(), Some(Body::Form(form))))
            .unwrap_err();
        assert!(matches!(err, TransportError::Http(_)));
    }

    #[test]
    fn methods_map_one_to_one() {
        assert_eq!(method_for(HttpMethod::Get), Method::GET);
        assert_eq!(method_for(HttpMethod::Put), Method::PUT);
        assert_eq!(method_for(HttpMethod::Patch), Method::PATCH);
        assert_eq!(method_for(HttpMethod::Delete), Method::DELETE);
    }

    #[test]
    fn delete_may_carry_a_body() {
        let built = transport()
            .build(request(HttpMethod::Delete, Headers::new(), Some(Body::Text("x".into()))))
            .unwrap();
        assert_eq!(built.method(), &Method::DELETE);
        assert!(built.body().is_some());
    }
}
