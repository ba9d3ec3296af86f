//! Domain types shared by the client and its callers.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type DocId = String;
pub type Fields = Map<String, Value>;

/// Last-known server state of one index.
///
/// Every field except `name` is optional: a merge only overwrites what the
/// incoming payload actually carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexMeta {
    pub name: String,
    pub is_started: Option<bool>,
    pub code: Option<String>,
    pub creation_time: Option<DateTime<Utc>>,
    pub size: Option<u64>,
}

impl IndexMeta {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    /// Overwrites each field that `other` carries; the rest stay as they are.
    pub fn merge(&mut self, other: &Self) {
        if !other.name.is_empty() {
            self.name.clone_from(&other.name);
        }
        if other.is_started.is_some() {
            self.is_started = other.is_started;
        }
        if other.code.is_some() {
            self.code.clone_from(&other.code);
        }
        if other.creation_time.is_some() {
            self.creation_time = other.creation_time;
        }
        if other.size.is_some() {
            self.size = other.size;
        }
    }
}

/// One element of a bulk `docs` upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub docid: DocId,
    pub fields: Fields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Fields>,
}

impl Document {
    pub fn new(docid: impl Into<DocId>, fields: Fields) -> Self {
        Self { docid: docid.into(), fields, categories: None }
    }

    pub fn with_categories(mut self, categories: Fields) -> Self {
        self.categories = Some(categories);
        self
    }
}

/// A search hit with its stored fields and highlighted snippets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub fields: Fields,
    pub snippets: Fields,
}

/// Normalized search response.
///
/// `documents` is keyed by docid and carries no order; `ranking` lists the
/// same docids in the order the service ranked them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub documents: HashMap<DocId, SearchDocument>,
    pub ranking: Vec<DocId>,
    pub matches: Option<u64>,
    pub search_time: Option<String>,
}

impl SearchResults {
    pub fn get(&self, docid: &str) -> Option<&SearchDocument> {
        self.documents.get(docid)
    }

    pub fn len(&self) -> usize { self.documents.len() }

    pub fn is_empty(&self) -> bool { self.documents.is_empty() }

    /// Documents in the service's rank order.
    pub fn ranked(&self) -> impl Iterator<Item = (&str, &SearchDocument)> {
        self.ranking
            .iter()
            .filter_map(|id| self.documents.get(id).map(|doc| (id.as_str(), doc)))
    }
}

/// What to fetch alongside each hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub fetch_fields: Vec<String>,
    pub fetch_snippets: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self { fetch_fields: vec!["text".to_string()], fetch_snippets: true }
    }
}

impl SearchOptions {
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { fetch_fields: fields.into_iter().map(Into::into).collect(), ..Self::default() }
    }

    pub fn without_snippets(mut self) -> Self {
        self.fetch_snippets = false;
        self
    }
}
