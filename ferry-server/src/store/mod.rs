//! Cache-aside schedule store.
//!
//! Lookup order: memory cache → durable backend → network download (parse +
//! persist + populate memory). Download and parse failures are logged with
//! route, date, and URL, then downgraded to absence — "no timetable today"
//! is an expected outcome, not an error. A background cycle keeps a rolling
//! look-ahead window of schedules warm.

mod backend;
mod file;
mod sqlite;

pub use backend::{BackendError, MemoryBackend, ScheduleBackend};
pub use file::FileBackend;
pub use sqlite::SqliteBackend;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use futures::future::join_all;
use moka::future::Cache as MokaCache;

use crate::domain::{FerrySchedule, LocationId};
use crate::planner::ScheduleSource;
use crate::schedule::{HttpFetcher, PageFetcher, ScheduleClient};

/// Memory cache key: (origin, destination, date).
type ScheduleKey = (LocationId, LocationId, NaiveDate);

/// Configuration for the schedule store.
#[derive(Debug, Clone)]
pub struct ScheduleStoreConfig {
    /// Days ahead of today kept warm by the refresh cycle.
    pub cache_ahead_days: u32,

    /// Wall-clock interval between refresh cycles.
    pub refresh_interval: Duration,

    /// TTL for memory-cached entries.
    pub cache_ttl: Duration,

    /// Maximum number of memory-cached entries.
    pub cache_capacity: u64,

    /// The network's home time zone; anchors the look-ahead window.
    pub home_zone: Tz,
}

impl Default for ScheduleStoreConfig {
    fn default() -> Self {
        Self {
            cache_ahead_days: 3,
            refresh_interval: Duration::from_secs(24 * 60 * 60),
            cache_ttl: Duration::from_secs(24 * 60 * 60),
            cache_capacity: 4096,
            home_zone: chrono_tz::America::Vancouver,
        }
    }
}

/// Cache-aside store for ferry schedules.
pub struct ScheduleStore<B, F = HttpFetcher> {
    /// Every ferry (origin, destination) pair in the network, the refresh
    /// cycle's work list.
    ferry_routes: Vec<(LocationId, LocationId)>,
    client: ScheduleClient<F>,
    backend: B,
    cache: MokaCache<ScheduleKey, Arc<FerrySchedule>>,
    config: ScheduleStoreConfig,
}

impl<B: ScheduleBackend, F: PageFetcher> ScheduleStore<B, F> {
    pub fn new(
        ferry_routes: Vec<(LocationId, LocationId)>,
        client: ScheduleClient<F>,
        backend: B,
        config: ScheduleStoreConfig,
    ) -> Self {
        let cache = MokaCache::builder()
            .time_to_live(config.cache_ttl)
            .max_capacity(config.cache_capacity)
            .build();
        Self {
            ferry_routes,
            client,
            backend,
            cache,
            config,
        }
    }

    /// The schedule for one route and date, or absent.
    ///
    /// Never fails: download and parse errors are logged and downgraded so
    /// the planner simply skips the ferry leg.
    pub async fn get(
        &self,
        origin: &LocationId,
        destination: &LocationId,
        date: NaiveDate,
    ) -> Option<Arc<FerrySchedule>> {
        let key = (origin.clone(), destination.clone(), date);
        if let Some(schedule) = self.cache.get(&key).await {
            return Some(schedule);
        }
        if let Some(schedule) = self.backend.load(origin, destination, date) {
            let schedule = Arc::new(schedule);
            self.cache.insert(key, schedule.clone()).await;
            return Some(schedule);
        }
        let schedule = Arc::new(self.download_schedule(origin, destination, date).await?);
        self.put(schedule.clone()).await;
        Some(schedule)
    }

    /// Caches and persists a schedule. Persistence faults are logged; the
    /// entry still serves from memory.
    pub async fn put(&self, schedule: Arc<FerrySchedule>) {
        let key = (
            schedule.origin.clone(),
            schedule.destination.clone(),
            schedule.date,
        );
        self.cache.insert(key, schedule.clone()).await;
        if let Err(error) = self.backend.store(&schedule) {
            tracing::warn!(
                origin = %schedule.origin,
                destination = %schedule.destination,
                date = %schedule.date,
                %error,
                "failed to persist schedule"
            );
        }
    }

    async fn download_schedule(
        &self,
        origin: &LocationId,
        destination: &LocationId,
        date: NaiveDate,
    ) -> Option<FerrySchedule> {
        match self.client.fetch_schedule(origin, destination, date).await {
            Ok(schedule) => Some(schedule),
            Err(error) => {
                tracing::error!(
                    origin = %origin,
                    destination = %destination,
                    date = %date,
                    url = error.url(),
                    %error,
                    "failed to download schedule"
                );
                None
            }
        }
    }

    /// Runs one refresh cycle against today in the home time zone.
    pub async fn refresh(&self) {
        let today = Utc::now()
            .with_timezone(&self.config.home_zone)
            .date_naive();
        self.refresh_window(today).await;
    }

    /// Refreshes the look-ahead window `[today, today + cache_ahead_days)`:
    /// prunes durable entries outside it, drops the memory cache, and
    /// re-downloads every ferry route × date not already durably present.
    ///
    /// A single (route, date) failure is logged inside the download path and
    /// never aborts the rest of the batch. Readers are not blocked: the
    /// memory cache invalidation is atomic from their point of view, and
    /// subsequent `get` calls repopulate lazily.
    pub async fn refresh_window(&self, today: NaiveDate) {
        let window: Vec<NaiveDate> = (0..self.config.cache_ahead_days)
            .map(|offset| today + chrono::Duration::days(i64::from(offset)))
            .collect();

        match self.backend.prune(&window) {
            Ok(removed) if removed > 0 => {
                tracing::info!(removed, "pruned schedules outside the look-ahead window");
            }
            Ok(_) => {}
            Err(error) => tracing::warn!(%error, "failed to prune stored schedules"),
        }
        self.cache.invalidate_all();

        let mut downloads = Vec::new();
        for (origin, destination) in &self.ferry_routes {
            for date in &window {
                if !self.backend.contains(origin, destination, *date) {
                    downloads.push(self.download_and_store(origin, destination, *date));
                }
            }
        }
        let downloaded = join_all(downloads)
            .await
            .into_iter()
            .filter(|stored| *stored)
            .count();
        tracing::info!(downloaded, "finished refreshing schedule cache");
    }

    async fn download_and_store(
        &self,
        origin: &LocationId,
        destination: &LocationId,
        date: NaiveDate,
    ) -> bool {
        match self.download_schedule(origin, destination, date).await {
            Some(schedule) => {
                self.put(Arc::new(schedule)).await;
                true
            }
            None => false,
        }
    }
}

impl<B, F> ScheduleStore<B, F>
where
    B: ScheduleBackend + 'static,
    F: PageFetcher + 'static,
{
    /// Spawns the background refresh loop: one cycle immediately, then one
    /// per configured interval, independent of request handling.
    pub fn spawn_refresh_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(store.config.refresh_interval);
            loop {
                interval.tick().await;
                store.refresh().await;
            }
        })
    }
}

impl<B: ScheduleBackend, F: PageFetcher> ScheduleSource for ScheduleStore<B, F> {
    fn schedule(
        &self,
        origin: &LocationId,
        destination: &LocationId,
        date: NaiveDate,
    ) -> impl Future<Output = Option<Arc<FerrySchedule>>> + Send {
        self.get(origin, destination, date)
    }
}
