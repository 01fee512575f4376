use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::utils::clock::Clock;

use super::{
    entities::{DailyStats, DailyStatsCollection, Settings, WatchTimeStats},
    key_value::{KeyValueStore, Scope, DAILY_STATS_KEY, SETTINGS_KEY, WATCH_TIME_STATS_KEY},
};

/// Typed access to the persisted statistics and settings.
///
/// Every mutation loads the whole document, changes it and writes it back. Mutations of the same
/// document are serialized inside the process, so concurrent attributions don't overwrite each
/// other. Failures are logged and swallowed: readers get zero-valued defaults and writers proceed
/// as if the write went through.
pub struct StatisticsStore {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    stats_lock: Mutex<()>,
    daily_lock: Mutex<()>,
}

impl StatisticsStore {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            stats_lock: Mutex::new(()),
            daily_lock: Mutex::new(()),
        }
    }

    /// Adds `elapsed` to the domain and to the grand total, appending a session that ends now.
    pub async fn record_time(&self, domain: &str, elapsed: Duration) {
        let _guard = self.stats_lock.lock().await;
        let result = async {
            let now = self.clock.time();
            let mut stats = self.load_stats().await?;
            stats.attribute(domain, elapsed, now);
            self.save(Scope::Local, WATCH_TIME_STATS_KEY, &stats).await
        }
        .await;
        if let Err(e) = result {
            error!("Failed to record {elapsed} for {domain}: {e:?}");
        }
    }

    /// Adds `elapsed` to the day total and to the domain inside that day.
    pub async fn record_daily(&self, date: NaiveDate, domain: &str, elapsed: Duration) {
        let _guard = self.daily_lock.lock().await;
        let result = async {
            let mut collection = self.load_daily_collection().await?;
            collection
                .entry(date)
                .or_insert_with(|| DailyStats::empty(date))
                .attribute(domain, elapsed);
            self.save(Scope::Local, DAILY_STATS_KEY, &collection).await
        }
        .await;
        if let Err(e) = result {
            error!("Failed to record daily {elapsed} for {domain} on {date}: {e:?}");
        }
    }

    pub async fn get_stats(&self) -> WatchTimeStats {
        self.load_stats().await.unwrap_or_else(|e| {
            error!("Failed to read statistics: {e:?}");
            WatchTimeStats::empty(self.clock.time())
        })
    }

    pub async fn get_daily(&self, date: NaiveDate) -> DailyStats {
        match self.load_daily_collection().await {
            Ok(mut collection) => collection
                .remove(&date)
                .unwrap_or_else(|| DailyStats::empty(date)),
            Err(e) => {
                error!("Failed to read daily statistics for {date}: {e:?}");
                DailyStats::empty(date)
            }
        }
    }

    /// Every recorded day.
    pub async fn get_all_daily(&self) -> DailyStatsCollection {
        self.load_daily_collection().await.unwrap_or_else(|e| {
            error!("Failed to read daily statistics: {e:?}");
            DailyStatsCollection::new()
        })
    }

    pub async fn get_settings(&self) -> Settings {
        match self.load::<Settings>(Scope::Synced, SETTINGS_KEY).await {
            Ok(settings) => settings.unwrap_or_default(),
            Err(e) => {
                error!("Failed to read settings: {e:?}");
                Settings::default()
            }
        }
    }

    pub async fn save_settings(&self, settings: &Settings) {
        if let Err(e) = self.save(Scope::Synced, SETTINGS_KEY, settings).await {
            error!("Failed to save settings {settings:?}: {e:?}");
        }
    }

    /// Erases statistics and settings.
    pub async fn clear_all(&self) {
        let _stats = self.stats_lock.lock().await;
        let _daily = self.daily_lock.lock().await;
        for scope in [Scope::Local, Scope::Synced] {
            if let Err(e) = self.store.clear(scope).await {
                error!("Failed to clear {scope} storage: {e:?}");
            }
        }
        info!("Cleared all data");
    }

    /// Drops sessions that started `max_age` ago or earlier. Totals are not adjusted, so a domain
    /// may keep a total without any backing sessions. An age reaching before the earliest
    /// representable time purges nothing.
    pub async fn purge_old_sessions(&self, max_age: Duration) -> usize {
        let _guard = self.stats_lock.lock().await;
        let result = async {
            let cutoff = self
                .clock
                .time()
                .checked_sub_signed(max_age)
                .unwrap_or(DateTime::<Utc>::MIN_UTC);
            let mut stats = self.load_stats().await?;
            let removed = stats
                .sites
                .values_mut()
                .map(|site| site.retain_sessions_after(cutoff))
                .sum::<usize>();
            self.save(Scope::Local, WATCH_TIME_STATS_KEY, &stats).await?;
            Ok::<_, anyhow::Error>(removed)
        }
        .await;
        match result {
            Ok(removed) => {
                info!("Purged {removed} sessions older than {max_age}");
                removed
            }
            Err(e) => {
                error!("Failed to purge old sessions: {e:?}");
                0
            }
        }
    }

    async fn load_stats(&self) -> Result<WatchTimeStats> {
        Ok(self
            .load(Scope::Local, WATCH_TIME_STATS_KEY)
            .await?
            .unwrap_or_else(|| WatchTimeStats::empty(self.clock.time())))
    }

    async fn load_daily_collection(&self) -> Result<DailyStatsCollection> {
        Ok(self
            .load(Scope::Local, DAILY_STATS_KEY)
            .await?
            .unwrap_or_default())
    }

    async fn load<T: DeserializeOwned>(&self, scope: Scope, key: &str) -> Result<Option<T>> {
        match self.store.get(scope, key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => {
                debug!("No value under {scope}/{key}");
                Ok(None)
            }
        }
    }

    async fn save<T: Serialize>(&self, scope: Scope, key: &str, value: &T) -> Result<()> {
        self.store
            .set(scope, key, serde_json::to_value(value)?)
            .await
    }
}
