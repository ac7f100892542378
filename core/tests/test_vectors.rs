//! Verify the gateway against JSON test vectors stored in `test-vectors/`.
//!
//! Each case describes a call, the request the gateway must hand to the
//! transport, a simulated response, and the expected envelope or error.
//! Bodies are compared as parsed JSON, not raw strings.

use std::sync::{Arc, Mutex};

use faceattend_core::{
    Body, Envelope, FormData, Gateway, GatewayError, Headers, HttpMethod, HttpRequest,
    HttpResponse, NoToken, RequestOptions, StaticToken, TokenSource, Transport, TransportError,
};
use serde_json::Value;

/// Hands back one simulated response and keeps the request it was given.
struct Simulated {
    response: HttpResponse,
    seen: Mutex<Option<HttpRequest>>,
}

impl Transport for Simulated {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        *self.seen.lock().unwrap() = Some(request);
        Ok(self.response.clone())
    }
}

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "PATCH" => HttpMethod::Patch,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn pairs(value: &Value) -> Vec<(String, String)> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|h| {
                    let arr = h.as_array().unwrap();
                    (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
                })
                .collect()
        })
        .unwrap_or_default()
}

fn parse_options(value: &Value) -> RequestOptions {
    let mut options = RequestOptions::method(parse_method(value["method"].as_str().unwrap()));
    options.headers = Headers::from_pairs(pairs(&value["headers"])).unwrap();
    let body = &value["body"];
    if let Some(text) = body["text"].as_str() {
        options = options.body(text);
    } else if body.get("form").is_some() {
        let form = pairs(&body["form"])
            .into_iter()
            .fold(FormData::new(), |form, (name, filename)| {
                form.file(name, filename, "image/jpeg", vec![0xff, 0xd8])
            });
        options = options.body(form);
    }
    options
}

fn parse_envelope(value: &Value) -> Envelope {
    if let Some(json) = value.get("json") {
        Envelope::Json(json.clone())
    } else {
        Envelope::Text(value["text"].as_str().unwrap().to_string())
    }
}

#[test]
fn gateway_test_vectors() {
    let raw = include_str!("../../test-vectors/gateway.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();
    let base_url = vectors["base_url"].as_str().unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();

        let sim = &case["simulated_response"];
        let transport = Arc::new(Simulated {
            response: HttpResponse {
                status: sim["status"].as_u64().unwrap() as u16,
                headers: Headers::new(),
                body: sim["body"].as_str().unwrap().to_string(),
            },
            seen: Mutex::new(None),
        });
        let tokens: Arc<dyn TokenSource> = match case["token"].as_str() {
            Some(token) => Arc::new(StaticToken::new(token)),
            None => Arc::new(NoToken),
        };
        let gateway = Gateway::new(base_url)
            .unwrap()
            .with_token_source(tokens)
            .with_transport(transport.clone());

        let options = parse_options(&case["options"]);
        let expected_method = options.method;
        let expected_form = options.body.as_ref().is_some_and(Body::is_form);
        let result = gateway.send(case["path"].as_str().unwrap(), options);

        // Verify the request handed to the transport
        let req = transport.seen.lock().unwrap().take().unwrap();
        let expected_req = &case["expected_request"];
        assert_eq!(req.method, expected_method, "{name}: method");
        assert_eq!(req.url, expected_req["url"].as_str().unwrap(), "{name}: url");
        let mut headers: Vec<(String, String)> = req
            .headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        headers.sort();
        let mut expected_headers = pairs(&expected_req["headers"]);
        expected_headers.sort();
        assert_eq!(headers, expected_headers, "{name}: headers");
        assert_eq!(
            req.body.as_ref().is_some_and(Body::is_form),
            expected_form,
            "{name}: body kind"
        );

        // Verify the outcome
        if let Some(expected_error) = case.get("expected_error") {
            match result {
                Err(GatewayError::Status(err)) => {
                    assert_eq!(
                        u64::from(err.status),
                        expected_error["status"].as_u64().unwrap(),
                        "{name}: status"
                    );
                    assert_eq!(err.body, parse_envelope(&expected_error["body"]), "{name}: body");
                }
                other => panic!("{name}: expected status error, got {other:?}"),
            }
        } else {
            let envelope = result.unwrap_or_else(|e| panic!("{name}: unexpected error {e}"));
            assert_eq!(envelope, parse_envelope(&case["expected_result"]), "{name}: result");
        }
    }
}
