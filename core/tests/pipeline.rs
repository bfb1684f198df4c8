use anyhow::Result;
use async_trait::async_trait;
use plugin_catalog_core::snapshot::DEFAULT_TTL;
use plugin_catalog_core::{
    aggregate, marketplace_page, rank, CatalogDeclarations, CatalogPipeline, CategoryMap,
    PluginDeclaration, RegistryClient, RegistryFetcher, RegistryMetadata, SnapshotCache,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

enum Behavior {
    Ok(RegistryMetadata),
    Hang,
}

/// Fake registry keyed by package name. Unknown packages fail.
struct FakeRegistry {
    packages: HashMap<String, Behavior>,
    calls: AtomicUsize,
}

impl FakeRegistry {
    fn new(packages: Vec<(&str, Behavior)>) -> Arc<Self> {
        Arc::new(Self {
            packages: packages
                .into_iter()
                .map(|(name, behavior)| (name.to_string(), behavior))
                .collect(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegistryClient for FakeRegistry {
    async fn fetch_info(&self, package: &str) -> Result<RegistryMetadata> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.packages.get(package) {
            Some(Behavior::Ok(metadata)) => Ok(metadata.clone()),
            Some(Behavior::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600 * 24)).await;
                anyhow::bail!("unreachable")
            }
            None => anyhow::bail!("package {} not found", package),
        }
    }
}

fn published(downloads: u64, updated_at: &str) -> Behavior {
    Behavior::Ok(RegistryMetadata {
        readme: "# readme".to_string(),
        created_at: "2020-01-01T00:00:00Z".to_string(),
        updated_at: updated_at.to_string(),
        description: "published".to_string(),
        weekly_downloads: downloads,
    })
}

fn declaration(identifier: &str) -> PluginDeclaration {
    PluginDeclaration {
        identifier: identifier.to_string(),
        npm_package: identifier.to_string(),
        title: format!("Plugin {}", identifier),
        icon: identifier.to_lowercase(),
        tags: vec!["envelop".to_string()],
    }
}

fn declarations(identifiers: &[&str], categories: Vec<(&str, Vec<&str>)>) -> CatalogDeclarations {
    CatalogDeclarations::new(
        identifiers.iter().map(|id| declaration(id)).collect(),
        CategoryMap::new(
            categories
                .into_iter()
                .map(|(key, members)| {
                    (key.to_string(), members.into_iter().map(str::to_string).collect())
                })
                .collect(),
        ),
    )
    .unwrap()
}

fn fetcher(registry: Arc<FakeRegistry>) -> RegistryFetcher {
    RegistryFetcher::new(registry, Duration::from_secs(2))
}

fn ids(view: &[Arc<plugin_catalog_core::CatalogEntry>]) -> Vec<&str> {
    view.iter().map(|e| e.identifier.as_str()).collect()
}

#[tokio::test]
async fn ranks_trending_recent_and_all() {
    let registry = FakeRegistry::new(vec![
        ("A", published(100, "2024-01-01")),
        ("B", published(0, "2024-06-01")),
    ]);
    let decls = declarations(&["A", "B"], vec![("core", vec!["A", "B"])]);

    let aggregation = aggregate(&decls, &fetcher(registry)).await;
    let views = rank(&aggregation.entries);

    assert_eq!(ids(&views.trending), ["A"]);
    assert_eq!(ids(&views.recently_updated), ["B", "A"]);
    assert_eq!(ids(&views.all), ["A", "B"]);
}

#[tokio::test(start_paused = true)]
async fn timed_out_fetch_degrades_entry() {
    let registry = FakeRegistry::new(vec![
        ("A", published(100, "2024-01-01")),
        ("B", Behavior::Hang),
    ]);
    let decls = declarations(&["A", "B"], vec![("core", vec!["A", "B"])]);

    let aggregation = aggregate(&decls, &fetcher(registry)).await;
    let views = rank(&aggregation.entries);

    assert_eq!(aggregation.degraded, ["B"]);
    let b = views.all.iter().find(|e| e.identifier == "B").unwrap();
    assert_eq!(b.weekly_downloads, 0);
    assert_eq!(b.description, "");
    assert!(ids(&views.recently_updated).contains(&"B"));
    assert!(!ids(&views.trending).contains(&"B"));
}

#[tokio::test]
async fn uncategorised_plugin_gets_empty_segment() {
    let registry = FakeRegistry::new(vec![("C", published(5, "2024-01-01"))]);
    let decls = declarations(&["C"], vec![("core", vec!["A"])]);

    let aggregation = aggregate(&decls, &fetcher(registry)).await;

    assert_eq!(aggregation.entries[0].link_href, "/plugins//C");
    assert_eq!(aggregation.entries[0].category, None);
}

#[tokio::test]
async fn aggregation_is_total_under_failures() {
    let registry = FakeRegistry::new(vec![("A", published(1, "2024-01-01"))]);
    let decls = declarations(&["A", "missing-1", "missing-2"], vec![]);

    let aggregation = aggregate(&decls, &fetcher(registry)).await;

    assert_eq!(aggregation.entries.len(), decls.len());
    assert_eq!(aggregation.degraded, ["missing-1", "missing-2"]);
}

#[tokio::test]
async fn ranking_is_idempotent() {
    let registry = FakeRegistry::new(vec![
        ("A", published(30, "2024-03-01")),
        ("B", published(30, "2024-03-01")),
        ("C", published(90, "2023-12-31")),
        ("D", published(0, "")),
    ]);
    let decls = declarations(&["A", "B", "C", "D"], vec![("core", vec!["A", "B", "C", "D"])]);
    let fetcher = fetcher(registry);

    let first = rank(&aggregate(&decls, &fetcher).await.entries);
    let second = rank(&aggregate(&decls, &fetcher).await.entries);

    assert_eq!(ids(&first.trending), ["C", "A", "B"]);
    assert_eq!(ids(&first.recently_updated), ["A", "B", "C", "D"]);
    assert_eq!(ids(&first.trending), ids(&second.trending));
    assert_eq!(ids(&first.recently_updated), ids(&second.recently_updated));
    assert_eq!(ids(&first.all), ids(&second.all));
    for (a, b) in first.all.iter().zip(&second.all) {
        assert_eq!(**a, **b);
    }
}

#[tokio::test(start_paused = true)]
async fn snapshot_ttl_controls_fetch_rounds() {
    let registry = FakeRegistry::new(vec![
        ("A", published(100, "2024-01-01")),
        ("B", published(0, "2024-06-01")),
    ]);
    let decls = Arc::new(declarations(&["A", "B"], vec![("core", vec!["A", "B"])]));
    let cache = SnapshotCache::new(
        CatalogPipeline::new(decls, fetcher(registry.clone())),
        DEFAULT_TTL,
    );

    cache.get_snapshot().await.unwrap();
    assert_eq!(registry.calls(), 2);

    tokio::time::advance(DEFAULT_TTL - Duration::from_secs(1)).await;
    cache.get_snapshot().await.unwrap();
    assert_eq!(registry.calls(), 2);

    tokio::time::advance(Duration::from_secs(1)).await;
    cache.get_snapshot().await.unwrap();
    cache.get_snapshot().await.unwrap();
    assert_eq!(registry.calls(), 4);
}

#[tokio::test]
async fn marketplace_page_projects_snapshot() {
    let registry = FakeRegistry::new(vec![
        ("A", published(100, "2024-01-01")),
        ("B", published(0, "2024-06-01")),
    ]);
    let decls = Arc::new(declarations(&["A", "B"], vec![("core", vec!["A", "B"])]));
    let cache = SnapshotCache::new(
        CatalogPipeline::new(decls.clone(), fetcher(registry)),
        DEFAULT_TTL,
    );

    let snapshot = cache.get_snapshot().await.unwrap();
    let page = marketplace_page(&snapshot, &decls);

    assert_eq!(page.title, "Explore Plugins");
    assert_eq!(page.placeholder, "Find plugins...");
    assert_eq!(page.tags_filter, ["envelop"]);

    assert_eq!(page.primary_list.title, "Trending");
    assert_eq!(page.primary_list.pagination, 10);
    let trending: Vec<_> = page.primary_list.items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(trending, ["Plugin A"]);

    assert_eq!(page.secondary_list.title, "Recently Updated");
    assert_eq!(page.secondary_list.items[0].title, "Plugin B");

    assert_eq!(page.query_list.title, "Search Results");
    assert_eq!(page.query_list.placeholder, "No results for {query}");
    assert_eq!(page.query_list.items.len(), 2);
    assert_eq!(page.query_list.items[1].link.href, "/plugins/core/B");
    assert_eq!(page.query_list.items[1].image.src, "b");
}
