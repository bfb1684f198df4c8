//! Registry info fetcher.
//!
//! [`RegistryClient`] is the raw transport and may fail. [`RegistryFetcher`]
//! wraps a client with a per-call timeout and turns every failure into
//! defaulted metadata, so a single bad package never aborts a catalog pass.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_REGISTRY_URL: &str = "https://registry.npmjs.org";
pub const DEFAULT_DOWNLOADS_URL: &str = "https://api.npmjs.org";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Package metadata as reported by the registry.
///
/// Timestamps are kept as the registry's ISO-8601 strings and parsed by the
/// ranking engine. An empty string means the registry did not provide one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryMetadata {
    pub readme: String,
    pub created_at: String,
    pub updated_at: String,
    pub description: String,
    pub weekly_downloads: u64,
}

#[async_trait]
pub trait RegistryClient: Send + Sync + 'static {
    async fn fetch_info(&self, package: &str) -> Result<RegistryMetadata>;
}

/// npm registry client.
///
/// Reads the package document for readme, description and timestamps, and
/// the downloads API for the last-week download count.
#[derive(Debug, Clone)]
pub struct NpmRegistryClient {
    client: reqwest::Client,
    registry_url: String,
    downloads_url: String,
}

#[derive(Debug, Default, Deserialize)]
struct PackageDocument {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    readme: Option<String>,
    #[serde(default)]
    time: PackageTimes,
}

#[derive(Debug, Default, Deserialize)]
struct PackageTimes {
    #[serde(default)]
    created: Option<String>,
    #[serde(default)]
    modified: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DownloadsPoint {
    downloads: u64,
}

impl NpmRegistryClient {
    pub fn new(registry_url: impl Into<String>, downloads_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            registry_url: registry_url.into().trim_end_matches('/').to_string(),
            downloads_url: downloads_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Scoped names are requested as `@scope%2Fname`.
    pub fn document_url(&self, package: &str) -> String {
        format!("{}/{}", self.registry_url, package.replace('/', "%2F"))
    }

    pub fn downloads_url(&self, package: &str) -> String {
        format!("{}/downloads/point/last-week/{}", self.downloads_url, package)
    }

    async fn fetch_document(&self, package: &str) -> Result<PackageDocument> {
        self.client
            .get(self.document_url(package))
            .send()
            .await
            .context("Registry request failed")?
            .error_for_status()
            .context("Registry returned an error status")?
            .json::<PackageDocument>()
            .await
            .context("Failed to parse package document")
    }

    async fn fetch_weekly_downloads(&self, package: &str) -> Result<u64> {
        let point = self
            .client
            .get(self.downloads_url(package))
            .send()
            .await
            .context("Downloads request failed")?
            .error_for_status()
            .context("Downloads API returned an error status")?
            .json::<DownloadsPoint>()
            .await
            .context("Failed to parse downloads response")?;
        Ok(point.downloads)
    }
}

#[async_trait]
impl RegistryClient for NpmRegistryClient {
    async fn fetch_info(&self, package: &str) -> Result<RegistryMetadata> {
        let (document, downloads) = futures::future::join(
            self.fetch_document(package),
            self.fetch_weekly_downloads(package),
        )
        .await;

        let document = document?;
        // Brand-new packages have no downloads record yet.
        let weekly_downloads = downloads.unwrap_or_else(|e| {
            debug!(package, error = %format!("{:#}", e), "No weekly downloads, using 0");
            0
        });

        Ok(RegistryMetadata {
            readme: document.readme.unwrap_or_default(),
            created_at: document.time.created.unwrap_or_default(),
            updated_at: document.time.modified.unwrap_or_default(),
            description: document.description.unwrap_or_default(),
            weekly_downloads,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    Fetched,
    /// Metadata was defaulted; carries the reason.
    Degraded(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedInfo {
    pub metadata: RegistryMetadata,
    pub status: FetchStatus,
}

impl FetchedInfo {
    pub fn is_degraded(&self) -> bool {
        matches!(self.status, FetchStatus::Degraded(_))
    }
}

/// Best-effort fetcher with a bounded timeout per call.
#[derive(Clone)]
pub struct RegistryFetcher {
    client: Arc<dyn RegistryClient>,
    timeout: Duration,
}

impl RegistryFetcher {
    pub fn new(client: Arc<dyn RegistryClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch metadata for `package`. Never fails.
    pub async fn fetch_info(&self, package: &str) -> FetchedInfo {
        match tokio::time::timeout(self.timeout, self.client.fetch_info(package)).await {
            Ok(Ok(metadata)) => FetchedInfo {
                metadata,
                status: FetchStatus::Fetched,
            },
            Ok(Err(e)) => {
                let reason = format!("{:#}", e);
                warn!(package, error = %reason, "Registry fetch failed, using defaults");
                degraded(reason)
            }
            Err(_) => {
                warn!(
                    package,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Registry fetch timed out, using defaults"
                );
                degraded(format!("timed out after {}ms", self.timeout.as_millis()))
            }
        }
    }
}

fn degraded(reason: String) -> FetchedInfo {
    FetchedInfo {
        metadata: RegistryMetadata::default(),
        status: FetchStatus::Degraded(reason),
    }
}
