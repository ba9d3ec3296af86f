use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{json, Value};

use indextank_core::coerce::{as_count, as_text, present, truthy, Options};
use indextank_core::error::{Error, Result};
use indextank_core::traits::Method;
use indextank_core::types::{Document, Fields, IndexMeta, SearchOptions, SearchResults};

use crate::client::Client;
use crate::search;

/// Handle on one remote index.
///
/// The metadata is whatever the server last reported and goes stale; only
/// [`Index::refresh_meta`] and [`Index::is_started`] talk to the server about
/// it. Document and query operations all go through
/// [`Client::call_for_index`].
#[derive(Debug, Clone)]
pub struct Index<'c> {
    client: &'c Client,
    meta: IndexMeta,
}

impl<'c> Index<'c> {
    /// A handle with no cached metadata. Nothing is fetched.
    pub fn new(client: &'c Client, name: impl Into<String>) -> Self {
        Self { client, meta: IndexMeta::named(name) }
    }

    pub(crate) fn from_payload(client: &'c Client, name: &str, payload: &Value) -> Result<Self> {
        let mut index = Self::new(client, name);
        match payload {
            Value::Object(options) => {
                index.set_options(options)?;
            }
            Value::Null => {}
            other => {
                return Err(Error::InvalidResponse(format!("metadata for index '{name}' is not an object: {other}")));
            }
        }
        Ok(index)
    }

    pub fn client(&self) -> &'c Client { self.client }

    pub fn name(&self) -> &str { &self.meta.name }

    pub fn meta(&self) -> &IndexMeta { &self.meta }

    pub fn code(&self) -> Option<&str> { self.meta.code.as_deref() }

    pub fn creation_time(&self) -> Option<DateTime<Utc>> { self.meta.creation_time }

    /// Document count as of the last refresh.
    pub fn size(&self) -> Option<u64> { self.meta.size }

    /// Started flag as of the last refresh, without a round trip.
    pub fn cached_started(&self) -> bool { self.meta.is_started.unwrap_or(false) }

    /// Indexes one document. `facets` is accepted but not sent.
    pub fn add_document(&self, docid: &str, fields: &Fields, facets: Option<&Fields>) -> Result<Value> {
        if facets.is_some_and(|f| !f.is_empty()) {
            tracing::debug!(index = self.name(), docid, "facets are not sent with single documents");
        }
        let params = json!({ "docid": docid, "fields": fields });
        self.client.call_for_index(self, "docs", &params, Method::Put)
    }

    /// Bulk upload; the documents array is the whole request body.
    pub fn add_documents(&self, documents: &[Document]) -> Result<Value> {
        let params = serde_json::to_value(documents)
            .map_err(|e| Error::InvalidResponse(format!("documents could not be encoded: {e}")))?;
        self.client.call_for_index(self, "docs", &params, Method::Put)
    }

    /// Suggestions for `text`, in the order the service returned them.
    pub fn autocomplete(&self, text: &str) -> Result<Vec<String>> {
        let data = self.client.call_for_index(self, "autocomplete", &json!({ "query": text }), Method::Get)?;
        let suggestions = data
            .get("suggestions")
            .and_then(Value::as_array)
            .ok_or_else(|| Error::InvalidResponse("autocomplete response has no 'suggestions' array".to_string()))?;
        suggestions
            .iter()
            .map(|s| {
                s.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| Error::InvalidResponse(format!("autocomplete suggestion is not text: {s}")))
            })
            .collect()
    }

    /// Searches with the default options: fetch `text`, with snippets.
    pub fn search(&self, query: &str) -> Result<SearchResults> {
        self.search_with(query, &SearchOptions::default())
    }

    pub fn search_with(&self, query: &str, options: &SearchOptions) -> Result<SearchResults> {
        let data = self.client.call_for_index(self, "search", &search::search_params(query, options), Method::Get)?;
        search::normalize(&data)
    }

    pub fn refresh_meta(&mut self) -> Result<&mut Self> {
        let fresh = self.client.get_index(self.name())?;
        self.merge_meta(fresh.meta());
        Ok(self)
    }

    /// Refreshes from the server, then reports the started flag.
    pub fn is_started(&mut self) -> Result<bool> {
        self.refresh_meta()?;
        Ok(self.cached_started())
    }

    /// Merges recognized keys into the cached metadata.
    ///
    /// Recognized: `name`, `started`/`isStarted`, `code`,
    /// `creation_time`/`creationTime`, `size`. The camel case spelling wins
    /// when both are present. Absent or null keys leave fields untouched,
    /// but a present `name` is stored even when empty; other keys are
    /// ignored. Nothing changes if a creation time fails to parse.
    pub fn set_options(&mut self, options: &Options) -> Result<&mut Self> {
        let incoming = parse_meta(options)?;
        self.merge_meta(&incoming);
        if present(options, "name").and_then(as_text).is_some() {
            self.meta.name = incoming.name;
        }
        Ok(self)
    }

    pub fn merge_meta(&mut self, other: &IndexMeta) -> &mut Self {
        self.meta.merge(other);
        self
    }

    /// Metadata snapshot as `{name, isStarted, code, creationTime, size}`.
    pub fn to_array(&self) -> Value {
        json!({
            "name": self.meta.name,
            "isStarted": self.meta.is_started,
            "code": self.meta.code,
            "creationTime": self.meta.creation_time.map(|t| t.to_rfc3339()),
            "size": self.meta.size,
        })
    }
}

fn parse_meta(options: &Options) -> Result<IndexMeta> {
    let mut meta = IndexMeta::default();
    if let Some(name) = present(options, "name").and_then(as_text) {
        meta.name = name;
    }
    for key in ["started", "isStarted"] {
        if let Some(flag) = present(options, key) {
            meta.is_started = Some(truthy(flag));
        }
    }
    if let Some(code) = present(options, "code").and_then(as_text) {
        meta.code = Some(code);
    }
    for key in ["creation_time", "creationTime"] {
        if let Some(raw) = present(options, key) {
            meta.creation_time = Some(parse_timestamp(raw)?);
        }
    }
    if let Some(size) = present(options, "size").and_then(as_count) {
        meta.size = Some(size);
    }
    Ok(meta)
}

/// ISO-8601: RFC 3339 with offset, or a naive timestamp read as UTC.
fn parse_timestamp(raw: &Value) -> Result<DateTime<Utc>> {
    let text = raw
        .as_str()
        .ok_or_else(|| Error::InvalidResponse(format!("creation time is not text: {raw}")))?
        .trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(text) {
        return Ok(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| Error::InvalidResponse(format!("creation time '{text}' is not ISO-8601: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_with_and_without_offset() {
        let expected = Utc.with_ymd_and_hms(2011, 5, 23, 21, 21, 36).unwrap();
        assert_eq!(parse_timestamp(&json!("2011-05-23T21:21:36")).unwrap(), expected);
        assert_eq!(parse_timestamp(&json!("2011-05-23T21:21:36Z")).unwrap(), expected);
        assert_eq!(parse_timestamp(&json!("2011-05-23T23:21:36+02:00")).unwrap(), expected);
        assert!(parse_timestamp(&json!("23/05/2011")).is_err());
        assert!(parse_timestamp(&json!(1_306_185_696)).is_err());
    }

    #[test]
    fn camel_case_wins_in_metadata() {
        let options = json!({
            "started": false,
            "isStarted": true,
            "creation_time": "2011-01-01T00:00:00",
            "creationTime": "2012-02-02T00:00:00",
        });
        let meta = parse_meta(options.as_object().unwrap()).unwrap();
        assert_eq!(meta.is_started, Some(true));
        assert_eq!(meta.creation_time, Some(Utc.with_ymd_and_hms(2012, 2, 2, 0, 0, 0).unwrap()));
    }

    #[test]
    fn unknown_and_null_keys_are_ignored() {
        let options = json!({ "code": null, "public_search": true, "size": "12" });
        let meta = parse_meta(options.as_object().unwrap()).unwrap();
        assert_eq!(meta.code, None);
        assert_eq!(meta.size, Some(12));
        assert_eq!(meta.is_started, None);
    }
}
