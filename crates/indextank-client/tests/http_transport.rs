//! `HttpTransport` against a local wiremock server.
//!
//! The blocking client must not run inside an async context, so each test
//! drives wiremock from its own runtime and calls the transport outside it.

use std::time::Duration;

use serde_json::json;
use tokio::runtime::Runtime;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use indextank_client::http::USER_AGENT;
use indextank_client::{ApiRequest, Error, HttpTransport, Method, Transport};

fn start(rt: &Runtime) -> MockServer { rt.block_on(MockServer::start()) }

fn transport() -> HttpTransport { HttpTransport::new(Duration::from_secs(5)).expect("http client") }

#[test]
fn read_call_sends_query_and_basic_auth() {
    let rt = Runtime::new().unwrap();
    let server = start(&rt);
    rt.block_on(
        Mock::given(method("GET"))
            .and(path("/v1/indexes/idx/search"))
            .and(query_param("q", "hello world"))
            .and(query_param("function", "1"))
            .and(header("authorization", "Basic OnNlY3JldA=="))
            .and(header("user-agent", USER_AGENT))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"results":[]}"#))
            .expect(1)
            .mount(&server),
    );

    let request = ApiRequest {
        method: Method::Get,
        url: format!("{}/v1/indexes/idx/search", server.uri()),
        password: "secret".into(),
        query: vec![("q".into(), "hello world".into()), ("function".into(), "1".into())],
        body: None,
    };
    let response = transport().execute(&request).unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body, r#"{"results":[]}"#);

    rt.block_on(server.verify());
}

#[test]
fn write_call_sends_json_body() {
    let rt = Runtime::new().unwrap();
    let server = start(&rt);
    let docs = json!([{ "docid": "1", "fields": { "text": "a" } }]);
    rt.block_on(
        Mock::given(method("PUT"))
            .and(path("/v1/indexes/idx/docs"))
            .and(header("content-type", "application/json"))
            .and(body_json(docs.clone()))
            .respond_with(ResponseTemplate::new(200).set_body_string("[{\"added\":true}]"))
            .expect(1)
            .mount(&server),
    );

    let request = ApiRequest {
        method: Method::Put,
        url: format!("{}/v1/indexes/idx/docs", server.uri()),
        password: "secret".into(),
        query: Vec::new(),
        body: Some(docs),
    };
    let response = transport().execute(&request).unwrap();
    assert!(response.is_success());

    rt.block_on(server.verify());
}

#[test]
fn error_status_is_returned_untouched() {
    let rt = Runtime::new().unwrap();
    let server = start(&rt);
    rt.block_on(
        Mock::given(method("DELETE"))
            .and(path("/v1/indexes/gone"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance\n"))
            .mount(&server),
    );

    let request = ApiRequest {
        method: Method::Delete,
        url: format!("{}/v1/indexes/gone", server.uri()),
        password: String::new(),
        query: Vec::new(),
        body: Some(json!({})),
    };
    let response = transport().execute(&request).unwrap();
    assert_eq!(response.status, 503);
    assert_eq!(response.reason, "Service Unavailable");
    assert_eq!(response.body, "maintenance\n");
    assert!(!response.is_success());
}

#[test]
fn unreachable_host_is_a_transport_error() {
    let request = ApiRequest {
        method: Method::Get,
        url: "http://127.0.0.1:1/v1/indexes/".into(),
        password: String::new(),
        query: Vec::new(),
        body: None,
    };
    let err = transport().execute(&request).unwrap_err();
    assert!(matches!(err, Error::Transport(_)));
}
