//! indextank-client
//!
//! Blocking client for the IndexTank hosted search API. [`Client`] owns the
//! account credentials and index lifecycle; [`Index`] handles borrow it to
//! add documents, search and autocomplete.
pub mod client;
pub mod http;
pub mod index;
pub mod search;

pub use client::Client;
pub use http::HttpTransport;
pub use index::Index;

pub use indextank_core::traits::{ApiRequest, ApiResponse, Method, Transport};
pub use indextank_core::types::{Document, Fields, IndexMeta, SearchDocument, SearchOptions, SearchResults};
pub use indextank_core::wait::{CancelToken, WaitPolicy};
pub use indextank_core::{ClientConfig, Credentials, Error, Result};
