use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde_json::Value;

use indextank_core::config::ClientConfig;
use indextank_core::credentials::Credentials;
use indextank_core::error::{Error, Result};
use indextank_core::traits::{ApiRequest, Method, Transport};
use indextank_core::wait::{CancelToken, WaitPolicy};

use crate::http::HttpTransport;
use crate::index::Index;

const INDEXES_URI: &str = "/v1/indexes/";

/// Parameters for calls that take none; written calls send them as `[]`.
fn no_params() -> Value { Value::Array(Vec::new()) }

/// Characters left as-is in an index name path segment.
const NAME_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Account-scoped client for the IndexTank API.
///
/// Holds one set of credentials and is otherwise stateless; share it freely
/// and hand out [`Index`] handles that borrow it.
pub struct Client {
    credentials: Credentials,
    service_host: String,
    wait: WaitPolicy,
    transport: Box<dyn Transport>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("credentials", &self.credentials)
            .field("service_host", &self.service_host)
            .field("wait", &self.wait)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Builds a client that talks HTTP through `reqwest`.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.timeout)?;
        Ok(Self::with_transport(config, transport))
    }

    pub fn from_private_url(url: &str) -> Result<Self> {
        Self::new(ClientConfig::from_private_url(url))
    }

    pub fn with_transport(config: ClientConfig, transport: impl Transport + 'static) -> Self {
        Self {
            credentials: config.credentials,
            service_host: config.service_host,
            wait: config.wait,
            transport: Box::new(transport),
        }
    }

    pub fn credentials(&self) -> &Credentials { &self.credentials }

    pub fn wait_policy(&self) -> &WaitPolicy { &self.wait }

    /// `<scheme>://<api key>.<service host>`
    pub fn base_url(&self) -> String {
        format!("{}://{}.{}", self.credentials.scheme(), self.credentials.api_key(), self.service_host)
    }

    /// All indexes on the account, keyed by name.
    pub fn list_indexes(&self) -> Result<BTreeMap<String, Index<'_>>> {
        let data = self.call(INDEXES_URI, &no_params(), Method::Get)?;
        let entries = match data {
            Value::Object(entries) => entries,
            other => return Err(Error::InvalidResponse(format!("index listing is not an object: {other}"))),
        };
        let mut indexes = BTreeMap::new();
        for (name, meta) in entries {
            let index = Index::from_payload(self, &name, &meta)?;
            indexes.insert(name, index);
        }
        Ok(indexes)
    }

    pub fn get_index(&self, name: &str) -> Result<Index<'_>> {
        let data = self.call(&index_uri(name), &no_params(), Method::Get)?;
        Index::from_payload(self, name, &data)
    }

    /// Creates `name` on the server and fetches it back.
    ///
    /// With `wait_until_started` the call blocks, polling per the client's
    /// [`WaitPolicy`], until the index reports started.
    pub fn create_index(&self, name: &str, wait_until_started: bool) -> Result<Index<'_>> {
        let mut index = self.put_and_fetch(name)?;
        if wait_until_started {
            self.wait_until_started(&mut index, None)?;
        }
        Ok(index)
    }

    /// Waiting create that gives up as soon as `cancel` fires.
    pub fn create_index_until(&self, name: &str, cancel: &CancelToken) -> Result<Index<'_>> {
        let mut index = self.put_and_fetch(name)?;
        self.wait_until_started(&mut index, Some(cancel))?;
        Ok(index)
    }

    pub fn delete_index(&self, name: &str) -> Result<()> {
        self.call(&index_uri(name), &no_params(), Method::Delete)?;
        tracing::info!(index = name, "deleted index");
        Ok(())
    }

    /// Runs `operation` against one index: `/v1/indexes/<name>/<operation>`.
    pub fn call_for_index(&self, index: &Index<'_>, operation: &str, params: &Value, method: Method) -> Result<Value> {
        let uri = format!("{}/{}", index_uri(index.name()), operation);
        self.call(&uri, params, method)
    }

    fn put_and_fetch(&self, name: &str) -> Result<Index<'_>> {
        self.call(&index_uri(name), &no_params(), Method::Put)?;
        tracing::info!(index = name, "created index");
        self.get_index(name)
    }

    fn wait_until_started(&self, index: &mut Index<'_>, cancel: Option<&CancelToken>) -> Result<()> {
        let started_at = Instant::now();
        let mut attempt = 0u32;
        while !index.is_started()? {
            let waited = started_at.elapsed();
            if cancel.is_some_and(CancelToken::is_cancelled) {
                return Err(Error::Cancelled(index.name().to_string()));
            }
            let mut delay = self.wait.delay_for(attempt);
            if let Some(timeout) = self.wait.timeout {
                if waited >= timeout {
                    return Err(Error::WaitTimeout { name: index.name().to_string(), waited });
                }
                delay = delay.min(timeout - waited);
            }
            tracing::debug!(index = index.name(), attempt, ?delay, "index not started yet");
            sleep_unless_cancelled(delay, cancel);
            attempt = attempt.saturating_add(1);
        }
        Ok(())
    }

    fn call(&self, uri: &str, params: &Value, method: Method) -> Result<Value> {
        if !self.credentials.is_configured() {
            return Err(Error::Configuration("no API key".to_string()));
        }

        let url = format!("{}{}", self.base_url(), uri);
        let request = if method.is_read() {
            ApiRequest { method, url, password: self.credentials.password().to_string(), query: query_pairs(params), body: None }
        } else {
            ApiRequest { method, url, password: self.credentials.password().to_string(), query: Vec::new(), body: Some(params.clone()) }
        };

        tracing::debug!(%method, uri, "calling IndexTank");
        let response = self.transport.execute(&request)?;
        tracing::debug!(%method, uri, status = response.status, "IndexTank answered");

        if !response.is_success() {
            return Err(Error::Request { status: response.status, message: response.reason, body: response.body });
        }
        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body)
            .map_err(|e| Error::InvalidResponse(format!("{method} {uri} returned malformed JSON: {e}")))
    }
}

/// `/v1/indexes/<name>` with slashes dropped and the rest percent-encoded.
pub fn index_uri(name: &str) -> String {
    let cleaned: String = name.chars().filter(|c| *c != '/').collect();
    format!("{INDEXES_URI}{}", utf8_percent_encode(&cleaned, NAME_SEGMENT))
}

// Read calls carry their parameters in the query string.
fn query_pairs(params: &Value) -> Vec<(String, String)> {
    let Value::Object(map) = params else { return Vec::new() };
    map.iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let text = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), text)
        })
        .collect()
}

fn sleep_unless_cancelled(delay: Duration, cancel: Option<&CancelToken>) {
    const SLICE: Duration = Duration::from_millis(50);
    let Some(cancel) = cancel else {
        std::thread::sleep(delay);
        return;
    };
    let deadline = Instant::now() + delay;
    while !cancel.is_cancelled() {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        std::thread::sleep(SLICE.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn index_uri_strips_slashes_and_encodes() {
        assert_eq!(index_uri("products"), "/v1/indexes/products");
        assert_eq!(index_uri("a/b"), "/v1/indexes/ab");
        assert_eq!(index_uri("my index"), "/v1/indexes/my%20index");
        assert_eq!(index_uri("v1.0_test-x"), "/v1/indexes/v1.0_test-x");
        assert_eq!(index_uri("q?&"), "/v1/indexes/q%3F%26");
    }

    #[test]
    fn query_pairs_stringify_scalars() {
        let mut pairs = query_pairs(&json!({ "q": "hello world", "function": 1, "skip": null }));
        pairs.sort();
        assert_eq!(
            pairs,
            vec![("function".to_string(), "1".to_string()), ("q".to_string(), "hello world".to_string())]
        );
        assert!(query_pairs(&json!([1, 2])).is_empty());
    }

    #[test]
    fn base_url_follows_encryption_flag() {
        struct Never;
        impl Transport for Never {
            fn execute(&self, _: &ApiRequest) -> Result<indextank_core::traits::ApiResponse> {
                Err(Error::Transport("unused".into()))
            }
        }
        let plain = Client::with_transport(ClientConfig::new(Credentials::new("k", "p", false)), Never);
        assert_eq!(plain.base_url(), "http://k.api.indextank.com");
        let tls = Client::with_transport(ClientConfig::new(Credentials::new("k", "p", true)), Never);
        assert_eq!(tls.base_url(), "https://k.api.indextank.com");
    }
}
