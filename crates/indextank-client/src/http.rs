//! Blocking `reqwest` implementation of [`Transport`].

use std::fmt;
use std::time::Duration;

use reqwest::blocking::{Client as HttpClient, RequestBuilder};

use indextank_core::error::{Error, Result};
use indextank_core::traits::{ApiRequest, ApiResponse, Method, Transport};

pub const USER_AGENT: &str = concat!("indextank-rs/", env!("CARGO_PKG_VERSION"));

#[derive(Clone)]
pub struct HttpTransport {
    http: HttpClient,
    timeout: Duration,
}

impl fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransport").field("timeout", &self.timeout).finish()
    }
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { http, timeout })
    }

    fn builder(&self, request: &ApiRequest) -> RequestBuilder {
        let builder = match request.method {
            Method::Get => self.http.get(&request.url),
            Method::Put => self.http.put(&request.url),
            Method::Delete => self.http.delete(&request.url),
        };
        let builder = builder.basic_auth("", Some(&request.password));
        if request.method.is_read() {
            builder.query(&request.query)
        } else {
            match &request.body {
                Some(body) => builder.json(body),
                None => builder,
            }
        }
    }

    fn map_network_error(e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Transport(format!("request timed out: {e}"))
        } else if e.is_connect() {
            Error::Transport(format!("connection failed: {e}"))
        } else {
            Error::Transport(e.to_string())
        }
    }
}

impl Transport for HttpTransport {
    fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let resp = self.builder(request).send().map_err(Self::map_network_error)?;
        let status = resp.status();
        let reason = status.canonical_reason().unwrap_or_default().to_string();
        let body = resp.text().map_err(Self::map_network_error)?;
        Ok(ApiResponse { status: status.as_u16(), reason, body })
    }
}
