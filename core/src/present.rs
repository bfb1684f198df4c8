//! Projection of a snapshot into the marketplace search widget's props.

use crate::aggregate::CatalogEntry;
use crate::declaration::{CatalogDeclarations, IconSet};
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const PAGE_TITLE: &str = "Explore Plugins";
pub const SEARCH_PLACEHOLDER: &str = "Find plugins...";
pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemLink {
    pub href: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemImage {
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub placeholder: String,
    pub loading: String,
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceItem {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
    pub link: ItemLink,
    pub update: String,
    pub image: ItemImage,
    #[serde(rename = "weeklyNPMDownloads")]
    pub weekly_npm_downloads: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplaceList {
    pub title: String,
    pub items: Vec<MarketplaceItem>,
    pub placeholder: String,
    pub pagination: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketplacePage {
    pub title: String,
    pub tags_filter: Vec<String>,
    pub placeholder: String,
    pub primary_list: MarketplaceList,
    pub secondary_list: MarketplaceList,
    pub query_list: MarketplaceList,
}

pub fn marketplace_item(entry: &CatalogEntry, icons: &IconSet) -> MarketplaceItem {
    let (src, width, height) = match icons.get(&entry.icon) {
        Some(asset) => (asset.src.clone(), asset.width, asset.height),
        None => (entry.icon.clone(), None, None),
    };

    MarketplaceItem {
        title: entry.title.clone(),
        description: entry.description.clone(),
        tags: entry.tags.clone(),
        link: ItemLink {
            href: entry.link_href.clone(),
            title: format!("{} plugin details", entry.title),
        },
        update: entry.updated_at.clone(),
        image: ItemImage {
            src,
            width,
            height,
            placeholder: "empty".to_string(),
            loading: "eager".to_string(),
            alt: entry.title.clone(),
        },
        weekly_npm_downloads: entry.weekly_downloads,
    }
}

pub fn marketplace_items(view: &[Arc<CatalogEntry>], icons: &IconSet) -> Vec<MarketplaceItem> {
    view.iter().map(|entry| marketplace_item(entry, icons)).collect()
}

fn list(title: &str, items: Vec<MarketplaceItem>, placeholder: &str) -> MarketplaceList {
    MarketplaceList {
        title: title.to_string(),
        items,
        placeholder: placeholder.to_string(),
        pagination: PAGE_SIZE,
    }
}

pub fn marketplace_page(snapshot: &Snapshot, declarations: &CatalogDeclarations) -> MarketplacePage {
    let icons = declarations.icons();

    MarketplacePage {
        title: PAGE_TITLE.to_string(),
        tags_filter: declarations.tags_filter(),
        placeholder: SEARCH_PLACEHOLDER.to_string(),
        primary_list: list(
            "Trending",
            marketplace_items(snapshot.trending(), icons),
            "0 items",
        ),
        secondary_list: list(
            "Recently Updated",
            marketplace_items(snapshot.recently_updated(), icons),
            "0 items",
        ),
        query_list: list(
            "Search Results",
            marketplace_items(snapshot.all(), icons),
            "No results for {query}",
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declaration::ImageAsset;
    use std::collections::HashMap;

    fn entry(icon: &str) -> CatalogEntry {
        CatalogEntry {
            identifier: "use-sentry".to_string(),
            category: Some("monitoring".to_string()),
            title: "Sentry".to_string(),
            readme: "# Sentry".to_string(),
            created_at: "2021-01-01T00:00:00Z".to_string(),
            updated_at: "2024-05-12T08:30:00.000Z".to_string(),
            description: "Track errors".to_string(),
            link_href: "/plugins/monitoring/use-sentry".to_string(),
            weekly_downloads: 912,
            icon: icon.to_string(),
            tags: vec!["monitoring".to_string()],
        }
    }

    fn icons() -> IconSet {
        IconSet::new(HashMap::from([(
            "sentry".to_string(),
            ImageAsset {
                src: "/assets/sentry.svg".to_string(),
                width: Some(64),
                height: Some(64),
            },
        )]))
    }

    #[test]
    fn resolves_icon_from_set() {
        let item = marketplace_item(&entry("sentry"), &icons());

        assert_eq!(item.image.src, "/assets/sentry.svg");
        assert_eq!(item.image.width, Some(64));
        assert_eq!(item.image.alt, "Sentry");
        assert_eq!(item.image.placeholder, "empty");
        assert_eq!(item.image.loading, "eager");
    }

    #[test]
    fn unknown_icon_is_used_as_url() {
        let item = marketplace_item(&entry("https://cdn.example/logo.png"), &icons());

        assert_eq!(item.image.src, "https://cdn.example/logo.png");
        assert_eq!(item.image.width, None);
    }

    #[test]
    fn item_carries_display_fields() {
        let item = marketplace_item(&entry("sentry"), &icons());

        assert_eq!(item.link.href, "/plugins/monitoring/use-sentry");
        assert_eq!(item.link.title, "Sentry plugin details");
        assert_eq!(item.update, "2024-05-12T08:30:00.000Z");
        assert_eq!(item.weekly_npm_downloads, 912);
        assert_eq!(item.tags, ["monitoring"]);
    }

    #[test]
    fn serializes_widget_field_names() {
        let item = marketplace_item(&entry("https://cdn.example/logo.png"), &icons());
        let json = serde_json::to_value(&item).unwrap();

        assert_eq!(json["weeklyNPMDownloads"], 912);
        assert_eq!(json["link"]["href"], "/plugins/monitoring/use-sentry");
        assert!(json["image"].get("width").is_none());
    }
}
