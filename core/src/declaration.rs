//! Static plugin declarations: the authored half of the catalog.
//!
//! Declarations are loaded from a JSON file of the form
//!
//! ```json
//! {
//!   "plugins": { "<identifier>": { "npmPackage": "...", "title": "...", "icon": "...", "tags": [] } },
//!   "categories": { "<category>": ["<identifier>", "..."] },
//!   "icons": { "<icon>": { "src": "...", "width": 64, "height": 64 } },
//!   "allTags": ["..."]
//! }
//! ```
//!
//! Object key order is significant: it is the order plugins appear in the
//! unranked view and the order categories are scanned during resolution.

use anyhow::{bail, Context, Result};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;
use tokio::fs;
use tracing::warn;

/// One authored plugin entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginDeclaration {
    pub identifier: String,
    /// Package queried on the registry.
    pub npm_package: String,
    pub title: String,
    /// Key into the [`IconSet`], or a raw image URL.
    pub icon: String,
    pub tags: Vec<String>,
}

/// A static image from the fixed icon set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAsset {
    pub src: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

/// Fixed mapping from icon key to image asset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IconSet {
    icons: HashMap<String, ImageAsset>,
}

impl IconSet {
    pub fn new(icons: HashMap<String, ImageAsset>) -> Self {
        Self { icons }
    }

    pub fn get(&self, key: &str) -> Option<&ImageAsset> {
        self.icons.get(key)
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}

/// Ordered mapping from category key to the identifiers it contains.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryMap {
    categories: Vec<(String, Vec<String>)>,
}

impl CategoryMap {
    pub fn new(categories: Vec<(String, Vec<String>)>) -> Self {
        Self { categories }
    }

    /// First category whose member list contains `identifier`.
    pub fn resolve(&self, identifier: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|(_, members)| members.iter().any(|m| m == identifier))
            .map(|(category, _)| category.as_str())
    }

    /// Every category containing `identifier`, in scan order.
    pub fn memberships<'a>(&'a self, identifier: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.categories
            .iter()
            .filter(move |(_, members)| members.iter().any(|m| m == identifier))
            .map(|(category, _)| category.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.categories
            .iter()
            .map(|(category, members)| (category.as_str(), members.as_slice()))
    }
}

/// The full static input to a regeneration pass.
#[derive(Debug, Clone, Default)]
pub struct CatalogDeclarations {
    plugins: Vec<PluginDeclaration>,
    categories: CategoryMap,
    icons: IconSet,
    all_tags: Option<Vec<String>>,
}

impl CatalogDeclarations {
    /// Build and validate a declaration set.
    ///
    /// Fails on empty identifiers or packages and on duplicate identifiers.
    /// Category data-quality problems are only logged.
    pub fn new(plugins: Vec<PluginDeclaration>, categories: CategoryMap) -> Result<Self> {
        let mut seen = HashSet::new();
        for plugin in &plugins {
            if plugin.identifier.trim().is_empty() {
                bail!("Plugin declaration with empty identifier");
            }
            if plugin.npm_package.trim().is_empty() {
                bail!("Plugin '{}' has no npm package", plugin.identifier);
            }
            if !seen.insert(plugin.identifier.as_str()) {
                bail!("Duplicate plugin identifier '{}'", plugin.identifier);
            }
        }

        let declarations = Self {
            plugins,
            categories,
            icons: IconSet::default(),
            all_tags: None,
        };
        declarations.report_category_issues();
        Ok(declarations)
    }

    pub fn with_icons(mut self, icons: IconSet) -> Self {
        self.icons = icons;
        self
    }

    pub fn with_all_tags(mut self, tags: Vec<String>) -> Self {
        self.all_tags = Some(tags);
        self
    }

    /// Load declarations from a JSON file.
    pub async fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json_str(&data).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_json_str(data: &str) -> Result<Self> {
        let file: DeclarationFile = serde_json::from_str(data)?;

        let plugins = file
            .plugins
            .0
            .into_iter()
            .map(|(identifier, body)| PluginDeclaration {
                identifier,
                npm_package: body.npm_package,
                title: body.title,
                icon: body.icon,
                tags: body.tags,
            })
            .collect();

        let mut declarations = Self::new(plugins, CategoryMap::new(file.categories.0))?
            .with_icons(IconSet::new(file.icons));
        declarations.all_tags = file.all_tags;
        Ok(declarations)
    }

    pub fn plugins(&self) -> &[PluginDeclaration] {
        &self.plugins
    }

    pub fn categories(&self) -> &CategoryMap {
        &self.categories
    }

    pub fn icons(&self) -> &IconSet {
        &self.icons
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Tags offered by the search widget's filter.
    ///
    /// The explicit `allTags` list when declared, otherwise the union of
    /// plugin tags in first-seen order.
    pub fn tags_filter(&self) -> Vec<String> {
        if let Some(tags) = &self.all_tags {
            return tags.clone();
        }

        let mut seen = HashSet::new();
        self.plugins
            .iter()
            .flat_map(|p| p.tags.iter())
            .filter(|tag| seen.insert(tag.as_str()))
            .cloned()
            .collect()
    }

    fn report_category_issues(&self) {
        let known: HashSet<&str> = self.plugins.iter().map(|p| p.identifier.as_str()).collect();

        for (category, members) in self.categories.iter() {
            for member in members {
                if !known.contains(member.as_str()) {
                    warn!(category, identifier = %member, "Category references an undeclared plugin");
                }
            }
        }

        for plugin in &self.plugins {
            let found: Vec<&str> = self.categories.memberships(&plugin.identifier).collect();
            match found.as_slice() {
                [] => warn!(
                    identifier = %plugin.identifier,
                    "Plugin belongs to no category, its link will have an empty category segment"
                ),
                [_] => {}
                [first, ..] => warn!(
                    identifier = %plugin.identifier,
                    categories = ?found,
                    "Plugin belongs to several categories, using '{}'",
                    first
                ),
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeclarationFile {
    plugins: Ordered<DeclarationBody>,
    #[serde(default)]
    categories: Ordered<Vec<String>>,
    #[serde(default)]
    icons: HashMap<String, ImageAsset>,
    #[serde(default)]
    all_tags: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeclarationBody {
    npm_package: String,
    title: String,
    icon: String,
    #[serde(default)]
    tags: Vec<String>,
}

/// A JSON object read as key/value pairs in document order.
///
/// Duplicate keys are rejected instead of silently overwritten.
struct Ordered<T>(Vec<(String, T)>);

impl<T> Default for Ordered<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Ordered<T> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderedVisitor<T>(PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedVisitor<T> {
            type Value = Ordered<T>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object with unique keys")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries: Vec<(String, T)> = Vec::with_capacity(map.size_hint().unwrap_or(0));
                let mut seen = HashSet::new();
                while let Some((key, value)) = map.next_entry::<String, T>()? {
                    if !seen.insert(key.clone()) {
                        return Err(de::Error::custom(format!("duplicate key '{}'", key)));
                    }
                    entries.push((key, value));
                }
                Ok(Ordered(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }
}
