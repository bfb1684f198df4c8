//! Ranked views over an aggregated catalog.
//!
//! All views hold `Arc`s into the same entries; ranking never copies or
//! mutates entry data.

use crate::aggregate::CatalogEntry;
use chrono::{DateTime, NaiveDate, Utc};
use std::cmp::Reverse;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct RankedViews {
    /// Entries with downloads, most downloaded first.
    pub trending: Vec<Arc<CatalogEntry>>,
    /// All entries, most recently updated first.
    pub recently_updated: Vec<Arc<CatalogEntry>>,
    /// All entries in aggregation order.
    pub all: Vec<Arc<CatalogEntry>>,
}

pub fn rank(entries: &[Arc<CatalogEntry>]) -> RankedViews {
    RankedViews {
        trending: trending(entries),
        recently_updated: recently_updated(entries),
        all: entries.to_vec(),
    }
}

/// Stable sort by `updated_at`, newest first. Missing or unparsable
/// timestamps sort last.
pub fn recently_updated(entries: &[Arc<CatalogEntry>]) -> Vec<Arc<CatalogEntry>> {
    let mut view = entries.to_vec();
    view.sort_by_cached_key(|entry| Reverse(parse_timestamp(&entry.updated_at)));
    view
}

/// Entries with `weekly_downloads > 0`, stable sort by downloads descending.
pub fn trending(entries: &[Arc<CatalogEntry>]) -> Vec<Arc<CatalogEntry>> {
    let mut view: Vec<_> = entries
        .iter()
        .filter(|entry| entry.weekly_downloads > 0)
        .cloned()
        .collect();
    view.sort_by_key(|entry| Reverse(entry.weekly_downloads));
    view
}

/// Parse a registry timestamp. Accepts RFC 3339 and bare `YYYY-MM-DD` dates.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
