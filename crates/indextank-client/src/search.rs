//! Normalization of raw `search` responses.
//!
//! Each raw result row is a flat object. The `docid` key identifies the
//! document, keys starting with [`SNIPPET_PREFIX`] are highlighted snippets,
//! and every other key is a stored field.

use serde_json::Value;

use indextank_core::coerce::{as_count, as_text};
use indextank_core::error::{Error, Result};
use indextank_core::types::{SearchDocument, SearchOptions, SearchResults};

pub const DOCID_KEY: &str = "docid";
pub const SNIPPET_PREFIX: &str = "snippet_";

/// Query parameters for a `search` call.
pub fn search_params(query: &str, options: &SearchOptions) -> Value {
    let fields = options.fetch_fields.join(",");
    let snippet = if options.fetch_snippets { fields.clone() } else { String::new() };
    serde_json::json!({
        "q": query,
        "fetch": fields,
        "snippet": snippet,
        "function": "1",
    })
}

pub fn normalize(data: &Value) -> Result<SearchResults> {
    let rows = data
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::InvalidResponse("search response has no 'results' array".to_string()))?;

    let mut out = SearchResults {
        matches: data.get("matches").and_then(as_count),
        search_time: data.get("search_time").and_then(as_text),
        ..SearchResults::default()
    };

    for row in rows {
        let Value::Object(row) = row else {
            return Err(Error::InvalidResponse(format!("search result is not an object: {row}")));
        };
        let docid = row
            .get(DOCID_KEY)
            .and_then(as_text)
            .ok_or_else(|| Error::InvalidResponse("search result without docid".to_string()))?;

        let mut doc = SearchDocument::default();
        for (key, value) in row {
            if key == DOCID_KEY {
                continue;
            }
            match key.strip_prefix(SNIPPET_PREFIX) {
                Some(field) => doc.snippets.insert(field.to_string(), value.clone()),
                None => doc.fields.insert(key.clone(), value.clone()),
            };
        }

        if !out.documents.contains_key(&docid) {
            out.ranking.push(docid.clone());
        }
        out.documents.insert(docid, doc);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_is_split_into_fields_and_snippets() {
        let data = json!({
            "matches": 1,
            "search_time": "0.004",
            "results": [{ "docid": "d1", "text": "hello", "snippet_text": "<b>hi</b>" }],
        });
        let results = normalize(&data).unwrap();
        let doc = results.get("d1").unwrap();
        assert_eq!(doc.fields, json!({ "text": "hello" }).as_object().unwrap().clone());
        assert_eq!(doc.snippets, json!({ "text": "<b>hi</b>" }).as_object().unwrap().clone());
        assert_eq!(results.matches, Some(1));
        assert_eq!(results.search_time.as_deref(), Some("0.004"));
    }

    #[test]
    fn rank_order_is_kept_beside_the_map() {
        let data = json!({ "results": [
            { "docid": "b", "title": "second letter" },
            { "docid": "a", "title": "first letter" },
            { "docid": 7, "title": "numeric id" },
        ]});
        let results = normalize(&data).unwrap();
        let order: Vec<&str> = results.ranked().map(|(id, _)| id).collect();
        assert_eq!(order, vec!["b", "a", "7"]);
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn key_named_snippet_without_suffix_stays_a_field() {
        let data = json!({ "results": [{ "docid": "x", "snippet": "plain", "snippet_": "empty name" }]});
        let results = normalize(&data).unwrap();
        let doc = results.get("x").unwrap();
        assert_eq!(doc.fields.get("snippet"), Some(&json!("plain")));
        assert_eq!(doc.snippets.get(""), Some(&json!("empty name")));
    }

    #[test]
    fn missing_results_or_docid_is_rejected() {
        assert!(matches!(normalize(&json!({ "matches": 0 })), Err(Error::InvalidResponse(_))));
        assert!(matches!(
            normalize(&json!({ "results": [{ "text": "orphan" }] })),
            Err(Error::InvalidResponse(_))
        ));
    }

    #[test]
    fn params_join_fetch_fields() {
        let params = search_params("rust", &SearchOptions::fields(["title", "text"]));
        assert_eq!(params, json!({ "q": "rust", "fetch": "title,text", "snippet": "title,text", "function": "1" }));
        let params = search_params("rust", &SearchOptions::default().without_snippets());
        assert_eq!(params["fetch"], json!("text"));
        assert_eq!(params["snippet"], json!(""));
    }
}
