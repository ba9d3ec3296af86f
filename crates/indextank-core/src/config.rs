use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::coerce::Options;
use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::wait::{WaitPolicy, WaitSettings};

pub const DEFAULT_SERVICE_HOST: &str = "api.indextank.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Table that holds the client settings in every config source.
const SECTION: &str = "indextank";

const ENV_PREFIX: &str = "INDEXTANK_";

/// Credential keys whose environment values must reach the client verbatim.
const RAW_ENV_KEYS: [&str; 3] = ["private_url", "api_key", "password"];

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("indextank.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("indextank.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("indextank.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("indextank.test.toml")),
            _ => {}
        }
        Ok(Self { figment: merge_env(figment) })
    }

    /// Loads a single TOML file, still letting `INDEXTANK_*` variables override it.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::Configuration(format!("config file not found: {}", path.display())));
        }
        Ok(Self { figment: merge_env(Figment::new().merge(Toml::file(path))) })
    }

    pub fn from_figment(figment: Figment) -> Self { Self { figment } }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::Configuration(format!("Failed to get '{key}': {e}")))
    }

    /// Builds a [`ClientConfig`] from the `indextank` table.
    ///
    /// A missing table is not an error: the result simply has no API key and
    /// every call made with it fails as unconfigured.
    pub fn client_config(&self) -> Result<ClientConfig> {
        if self.figment.find_value(SECTION).is_err() {
            return Ok(ClientConfig::default());
        }
        let options: Options = self.get(SECTION)?;
        let settings: ClientSettings = self.get(SECTION)?;
        Ok(ClientConfig {
            credentials: Credentials::from_options(&options),
            service_host: settings.service_host.unwrap_or_else(|| DEFAULT_SERVICE_HOST.to_string()),
            timeout: settings.timeout_secs.map_or(DEFAULT_TIMEOUT, Duration::from_secs),
            wait: settings.wait.unwrap_or_default().into(),
        })
    }
}

// INDEXTANK_USE_SSL -> indextank.use_ssl, INDEXTANK_WAIT__TIMEOUT_SECS -> indextank.wait.timeout_secs.
// Credentials skip figment's value parsing, which would turn a password of
// `007` into the integer 7.
fn merge_env(figment: Figment) -> Figment {
    let typed = Env::prefixed(ENV_PREFIX)
        .ignore(&RAW_ENV_KEYS)
        .map(|key| format!("{SECTION}.{}", key.as_str().replace("__", ".")).into());
    let raw: BTreeMap<String, String> = Env::prefixed(ENV_PREFIX)
        .only(&RAW_ENV_KEYS)
        .iter()
        .map(|(key, value)| (key.as_str().to_string(), value))
        .collect();

    let figment = figment.merge(typed);
    if raw.is_empty() {
        figment
    } else {
        figment.merge(Serialized::default(SECTION, raw))
    }
}

/// Non-credential keys of the `indextank` table.
#[derive(Debug, Default, Deserialize)]
struct ClientSettings {
    service_host: Option<String>,
    timeout_secs: Option<u64>,
    wait: Option<WaitSettings>,
}

/// Everything a client needs, passed explicitly at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub credentials: Credentials,
    pub service_host: String,
    pub timeout: Duration,
    pub wait: WaitPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            credentials: Credentials::default(),
            service_host: DEFAULT_SERVICE_HOST.to_string(),
            timeout: DEFAULT_TIMEOUT,
            wait: WaitPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials, ..Self::default() }
    }

    pub fn from_private_url(url: &str) -> Self { Self::new(Credentials::from_private_url(url)) }

    pub fn from_options(options: &Options) -> Self { Self::new(Credentials::from_options(options)) }

    pub fn with_service_host(mut self, host: impl Into<String>) -> Self {
        self.service_host = host.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_wait(mut self, wait: WaitPolicy) -> Self {
        self.wait = wait;
        self
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_client_config_targets_public_host() {
        let config = ClientConfig::default();
        assert_eq!(config.service_host, DEFAULT_SERVICE_HOST);
        assert!(!config.credentials.is_configured());
        assert_eq!(config.wait, WaitPolicy::default());
    }
}
