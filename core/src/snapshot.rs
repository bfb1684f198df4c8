//! Snapshot cache and regeneration policy.
//!
//! A snapshot is Fresh while younger than its TTL and built in the current
//! invalidation epoch, and Stale otherwise. The first `get_snapshot` call
//! that sees a stale (or missing) snapshot runs a full regeneration; other
//! callers wait on the same lock and pick up the result, including a failed
//! one. Installation is a single pointer swap, so readers see either the old
//! or the new snapshot.

use crate::aggregate::{aggregate, CatalogEntry};
use crate::declaration::CatalogDeclarations;
use crate::rank::{rank, RankedViews};
use crate::registry::RegistryFetcher;
use anyhow::{anyhow, bail, Result};
use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Default snapshot lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Output of a successful regeneration pass.
#[derive(Debug, Clone, Default)]
pub struct Generation {
    pub views: RankedViews,
    /// Identifiers served with defaulted registry metadata.
    pub degraded: Vec<String>,
}

/// Fetch, aggregate and rank.
pub struct CatalogPipeline {
    declarations: Arc<CatalogDeclarations>,
    fetcher: RegistryFetcher,
}

impl CatalogPipeline {
    pub fn new(declarations: Arc<CatalogDeclarations>, fetcher: RegistryFetcher) -> Self {
        Self {
            declarations,
            fetcher,
        }
    }

    pub fn declarations(&self) -> &CatalogDeclarations {
        &self.declarations
    }

    /// Run one full pass. Fails only when every registry fetch degraded.
    pub async fn regenerate(&self) -> Result<Generation> {
        let aggregation = aggregate(&self.declarations, &self.fetcher).await;
        if aggregation.is_total_outage() {
            bail!(
                "Registry unavailable: all {} fetches degraded",
                aggregation.entries.len()
            );
        }

        Ok(Generation {
            views: rank(&aggregation.entries),
            degraded: aggregation.degraded,
        })
    }
}

/// An immutable, ranked catalog valid for a bounded time window.
#[derive(Debug)]
pub struct Snapshot {
    views: RankedViews,
    degraded: Vec<String>,
    created_at: DateTime<Utc>,
    built_at: Instant,
    ttl: Duration,
    epoch: u64,
}

impl Snapshot {
    fn new(generation: Generation, ttl: Duration, epoch: u64) -> Self {
        Self {
            views: generation.views,
            degraded: generation.degraded,
            created_at: Utc::now(),
            built_at: Instant::now(),
            ttl,
            epoch,
        }
    }

    pub fn views(&self) -> &RankedViews {
        &self.views
    }

    pub fn trending(&self) -> &[Arc<CatalogEntry>] {
        &self.views.trending
    }

    pub fn recently_updated(&self) -> &[Arc<CatalogEntry>] {
        &self.views.recently_updated
    }

    pub fn all(&self) -> &[Arc<CatalogEntry>] {
        &self.views.all
    }

    pub fn degraded(&self) -> &[String] {
        &self.degraded
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn age(&self) -> Duration {
        self.built_at.elapsed()
    }

    /// Time left before the snapshot goes stale.
    pub fn remaining(&self) -> Duration {
        self.ttl.saturating_sub(self.age())
    }

    pub fn is_expired(&self) -> bool {
        self.age() >= self.ttl
    }
}

/// Holds the current snapshot and regenerates it on demand.
///
/// The cache owns no timer: staleness is checked when a snapshot is
/// requested, and external schedulers can force a rebuild through
/// [`SnapshotCache::invalidate`].
pub struct SnapshotCache {
    pipeline: CatalogPipeline,
    ttl: Duration,
    current: ArcSwapOption<Snapshot>,
    epoch: AtomicU64,
    /// Count of failed regenerations, bumped before the lock is released.
    failures: AtomicU64,
    regenerating: Mutex<()>,
}

impl SnapshotCache {
    pub fn new(pipeline: CatalogPipeline, ttl: Duration) -> Self {
        Self {
            pipeline,
            ttl,
            current: ArcSwapOption::empty(),
            epoch: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            regenerating: Mutex::new(()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn declarations(&self) -> &CatalogDeclarations {
        self.pipeline.declarations()
    }

    /// The installed snapshot, fresh or not, without triggering regeneration.
    pub fn peek(&self) -> Option<Arc<Snapshot>> {
        self.current.load_full()
    }

    /// Return a fresh snapshot, regenerating if the current one is stale.
    ///
    /// When regeneration fails the previous snapshot is served instead. Only
    /// a failure with nothing installed yet is returned as an error.
    pub async fn get_snapshot(&self) -> Result<Arc<Snapshot>> {
        if let Some(snapshot) = self.fresh() {
            debug!(age_secs = snapshot.age().as_secs(), "Serving cached catalog snapshot");
            return Ok(snapshot);
        }

        let failures_seen = self.failures.load(Ordering::Acquire);
        let _guard = self.regenerating.lock().await;
        if let Some(snapshot) = self.fresh() {
            return Ok(snapshot);
        }

        // A regeneration failed while this caller was queued; share its outcome.
        if self.failures.load(Ordering::Acquire) != failures_seen {
            return self
                .current
                .load_full()
                .ok_or_else(|| anyhow!("No catalog snapshot available: regeneration failed"));
        }

        let epoch = self.epoch.load(Ordering::Acquire);
        info!(plugins = self.pipeline.declarations().len(), "Regenerating catalog snapshot");

        match self.pipeline.regenerate().await {
            Ok(generation) => {
                let snapshot = Arc::new(Snapshot::new(generation, self.ttl, epoch));
                self.current.store(Some(Arc::clone(&snapshot)));
                info!(
                    trending = snapshot.trending().len(),
                    all = snapshot.all().len(),
                    degraded = snapshot.degraded().len(),
                    "Catalog snapshot installed"
                );
                Ok(snapshot)
            }
            Err(e) => {
                self.failures.fetch_add(1, Ordering::AcqRel);
                match self.current.load_full() {
                    Some(previous) => {
                        warn!(
                            error = %format!("{:#}", e),
                            age_secs = previous.age().as_secs(),
                            "Catalog regeneration failed, serving previous snapshot"
                        );
                        Ok(previous)
                    }
                    None => Err(e.context("No catalog snapshot available")),
                }
            }
        }
    }

    /// Mark the current snapshot stale. The next `get_snapshot` regenerates.
    pub fn invalidate(&self) {
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        info!(epoch, "Catalog snapshot invalidated");
    }

    fn fresh(&self) -> Option<Arc<Snapshot>> {
        let snapshot = self.current.load_full()?;
        let current_epoch = self.epoch.load(Ordering::Acquire);
        (snapshot.epoch == current_epoch && !snapshot.is_expired()).then_some(snapshot)
    }
}
