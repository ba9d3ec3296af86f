//! Credential resolution from a private URL or a configuration bag.
//!
//! Resolution never fails and never performs I/O. A value with an empty API
//! key is legal; the client rejects it when a call is attempted.

use std::fmt;

use serde_json::Value;
use url::Url;

use crate::coerce::{as_text, present, truthy, Options};

#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    password: String,
    use_encryption: bool,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("has_password", &!self.password.is_empty())
            .field("use_encryption", &self.use_encryption)
            .finish()
    }
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, password: impl Into<String>, use_encryption: bool) -> Self {
        Self { api_key: api_key.into(), password: password.into(), use_encryption }
    }

    /// Parses `scheme://:password@apikey.host/...`.
    pub fn from_private_url(url: &str) -> Self {
        let mut credentials = Self::default();
        credentials.apply_private_url(url);
        credentials
    }

    /// Applies a configuration bag in a fixed order; later keys win.
    ///
    /// Order: `privateUrl`, `private_url`, `apiKey`, `api_key`, `password`,
    /// `useSsl`, `use_ssl`. Snake case therefore overrides camel case, and
    /// explicit key/password override whatever a private URL supplied.
    pub fn from_options(options: &Options) -> Self {
        let mut credentials = Self::default();
        for key in ["privateUrl", "private_url"] {
            if let Some(url) = present(options, key).and_then(as_text) {
                credentials.apply_private_url(&url);
            }
        }
        for key in ["apiKey", "api_key"] {
            if let Some(api_key) = present(options, key).and_then(as_text) {
                credentials.api_key = api_key;
            }
        }
        if let Some(password) = present(options, "password").and_then(as_text) {
            credentials.password = password;
        }
        for key in ["useSsl", "use_ssl"] {
            if let Some(flag) = present(options, key) {
                credentials.use_encryption = truthy(flag);
            }
        }
        credentials
    }

    /// Resolves either a bare private URL string or an options object.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::String(url) => Self::from_private_url(url),
            Value::Object(options) => Self::from_options(options),
            _ => Self::default(),
        }
    }

    // A private URL always rewrites all three fields, even when it is broken.
    fn apply_private_url(&mut self, raw: &str) {
        match Url::parse(raw) {
            Ok(url) => {
                self.password = url.password().unwrap_or_default().to_string();
                self.api_key = url
                    .host_str()
                    .and_then(|host| host.split('.').next())
                    .unwrap_or_default()
                    .to_string();
                self.use_encryption = url.scheme() == "https";
            }
            Err(e) => {
                tracing::warn!(error = %e, "private URL could not be parsed; credentials left empty");
                *self = Self::default();
            }
        }
    }

    pub fn api_key(&self) -> &str { &self.api_key }

    pub fn password(&self) -> &str { &self.password }

    pub fn use_encryption(&self) -> bool { self.use_encryption }

    pub fn is_configured(&self) -> bool { !self.api_key.is_empty() }

    pub fn scheme(&self) -> &'static str {
        if self.use_encryption { "https" } else { "http" }
    }
}
