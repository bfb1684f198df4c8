//! Catalog aggregation: declarations joined with registry metadata.

use crate::declaration::{CatalogDeclarations, PluginDeclaration};
use crate::registry::{FetchedInfo, RegistryFetcher, RegistryMetadata};
use futures::future::join_all;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// The canonical, merged representation of one plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub identifier: String,
    pub category: Option<String>,
    pub title: String,
    pub readme: String,
    pub created_at: String,
    pub updated_at: String,
    pub description: String,
    pub link_href: String,
    pub weekly_downloads: u64,
    pub icon: String,
    pub tags: Vec<String>,
}

impl CatalogEntry {
    /// Declaration wins for title, icon and tags; the registry for everything else.
    pub fn merge(
        declaration: &PluginDeclaration,
        category: Option<&str>,
        metadata: RegistryMetadata,
    ) -> Self {
        Self {
            identifier: declaration.identifier.clone(),
            category: category.map(str::to_string),
            title: declaration.title.clone(),
            readme: metadata.readme,
            created_at: metadata.created_at,
            updated_at: metadata.updated_at,
            description: metadata.description,
            link_href: plugin_link(category, &declaration.identifier),
            weekly_downloads: metadata.weekly_downloads,
            icon: declaration.icon.clone(),
            tags: declaration.tags.clone(),
        }
    }
}

/// `/plugins/{category}/{identifier}`, with an empty segment for an
/// unresolved category.
pub fn plugin_link(category: Option<&str>, identifier: &str) -> String {
    format!("/plugins/{}/{}", category.unwrap_or(""), identifier)
}

/// Result of one aggregation pass.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    /// One entry per declaration, in declaration order.
    pub entries: Vec<Arc<CatalogEntry>>,
    /// Identifiers whose registry metadata was defaulted.
    pub degraded: Vec<String>,
}

impl Aggregation {
    /// Every fetch degraded, which points at a registry outage rather than
    /// individual bad packages.
    pub fn is_total_outage(&self) -> bool {
        !self.entries.is_empty() && self.degraded.len() == self.entries.len()
    }
}

/// Fetch registry metadata for every declaration concurrently and merge.
///
/// The fetches are joined before any merging happens; each result stays in
/// its declaration's slot so output order never depends on completion order.
pub async fn aggregate(declarations: &CatalogDeclarations, fetcher: &RegistryFetcher) -> Aggregation {
    let plugins = declarations.plugins();
    let fetched: Vec<FetchedInfo> =
        join_all(plugins.iter().map(|p| fetcher.fetch_info(&p.npm_package))).await;

    let mut aggregation = Aggregation {
        entries: Vec::with_capacity(plugins.len()),
        degraded: Vec::new(),
    };

    for (declaration, info) in plugins.iter().zip(fetched) {
        if info.is_degraded() {
            aggregation.degraded.push(declaration.identifier.clone());
        }

        let category = declarations.categories().resolve(&declaration.identifier);
        if category.is_none() {
            warn!(
                identifier = %declaration.identifier,
                "No category for plugin, link has an empty category segment"
            );
        }

        aggregation
            .entries
            .push(Arc::new(CatalogEntry::merge(declaration, category, info.metadata)));
    }

    debug!(
        entries = aggregation.entries.len(),
        degraded = aggregation.degraded.len(),
        "Catalog aggregated"
    );
    aggregation
}
