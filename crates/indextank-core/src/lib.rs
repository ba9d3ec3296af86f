//! indextank-core
//!
//! Shared pieces of the IndexTank client: credentials, configuration, the
//! error taxonomy, domain types and the `Transport` seam that the HTTP
//! client implements.
pub mod coerce;
pub mod config;
pub mod credentials;
pub mod error;
pub mod traits;
pub mod types;
pub mod wait;

pub use config::{ClientConfig, Config};
pub use credentials::Credentials;
pub use error::{Error, Result};
