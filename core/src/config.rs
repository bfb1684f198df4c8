//! Environment-driven configuration.

use crate::registry::{DEFAULT_DOWNLOADS_URL, DEFAULT_FETCH_TIMEOUT, DEFAULT_REGISTRY_URL};
use crate::snapshot::DEFAULT_TTL;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DECLARATIONS_PATH: &str = "plugins.json";

#[derive(Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    pub declarations_path: PathBuf,
    pub port: u16,
    pub registry_url: String,
    pub downloads_url: String,
    pub ttl: Duration,
    pub fetch_timeout: Duration,
    /// Bearer token for administrative endpoints. Unset disables them.
    pub admin_token: Option<String>,
}

impl fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("declarations_path", &self.declarations_path)
            .field("port", &self.port)
            .field("registry_url", &self.registry_url)
            .field("downloads_url", &self.downloads_url)
            .field("ttl", &self.ttl)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            declarations_path: PathBuf::from(DEFAULT_DECLARATIONS_PATH),
            port: DEFAULT_PORT,
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            downloads_url: DEFAULT_DOWNLOADS_URL.to_string(),
            ttl: DEFAULT_TTL,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            admin_token: None,
        }
    }
}

impl CatalogConfig {
    /// Read from the first CLI argument and the process environment.
    pub fn from_env() -> Self {
        Self::from_sources(std::env::args().nth(1), |key| std::env::var(key).ok())
    }

    /// `path_arg` takes precedence over `CATALOG_DECLARATIONS`. Unparsable
    /// numbers fall back to defaults, and so do zero durations.
    pub fn from_sources(path_arg: Option<String>, var: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let declarations_path = path_arg
            .or_else(|| var("CATALOG_DECLARATIONS"))
            .map(PathBuf::from)
            .unwrap_or(defaults.declarations_path);

        let port = var("PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let ttl = positive_duration(&var, "CATALOG_TTL_SECS", Duration::from_secs)
            .unwrap_or(defaults.ttl);

        let fetch_timeout = positive_duration(&var, "FETCH_TIMEOUT_MS", Duration::from_millis)
            .unwrap_or(defaults.fetch_timeout);

        let admin_token = var("CATALOG_ADMIN_TOKEN").filter(|t| !t.trim().is_empty());

        Self {
            declarations_path,
            port,
            registry_url: var("NPM_REGISTRY_URL").unwrap_or(defaults.registry_url),
            downloads_url: var("NPM_DOWNLOADS_URL").unwrap_or(defaults.downloads_url),
            ttl,
            fetch_timeout,
            admin_token,
        }
    }
}

fn positive_duration(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    unit: fn(u64) -> Duration,
) -> Option<Duration> {
    match var(key)?.parse::<u64>() {
        Ok(0) => {
            warn!(key, "Zero duration is not allowed, using default");
            None
        }
        Ok(n) => Some(unit(n)),
        Err(e) => {
            warn!(key, error = %e, "Invalid duration, using default");
            None
        }
    }
}
