//! Plugin catalog core.
//!
//! Joins static plugin declarations with npm registry metadata, ranks the
//! result into trending, recently-updated and full views, and keeps the
//! ranked catalog in a time-bounded snapshot cache.

pub mod aggregate;
pub mod config;
pub mod declaration;
pub mod present;
pub mod rank;
pub mod registry;
pub mod snapshot;

pub use aggregate::{aggregate, plugin_link, Aggregation, CatalogEntry};
pub use config::CatalogConfig;
pub use declaration::{CatalogDeclarations, CategoryMap, IconSet, ImageAsset, PluginDeclaration};
pub use present::{marketplace_items, marketplace_page, MarketplaceItem, MarketplaceList, MarketplacePage};
pub use rank::{rank, RankedViews};
pub use registry::{
    FetchStatus, FetchedInfo, NpmRegistryClient, RegistryClient, RegistryFetcher, RegistryMetadata,
};
pub use snapshot::{CatalogPipeline, Generation, Snapshot, SnapshotCache};
