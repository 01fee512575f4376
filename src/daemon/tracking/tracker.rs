use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::{daemon::storage::statistics::StatisticsStore, utils::clock::Clock};

use super::{auto_pause::AutoPause, domain::extract_domain};

pub type TabId = i64;

/// A tab that currently accrues time. Lives only in memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
    pub domain: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    pub is_active: bool,
}

/// What a single tick did. Mostly useful for logging and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Tracking is off or no tab is active.
    Idle,
    /// Less than one period passed since the last attribution.
    TooSoon,
    /// The gap is larger than the auto-pause threshold. Nothing was attributed and the reference
    /// instant was kept, so the next tick sees an even larger gap.
    Away { gap: Duration },
    Attributed { elapsed: Duration, tabs: usize },
}

struct TrackerState {
    active_tabs: HashMap<TabId, TabInfo>,
    last_attribution: DateTime<Utc>,
    /// Present iff tracking is enabled.
    timer: Option<CancellationToken>,
}

/// Converts "which tab is focused" into time attributed to domains.
///
/// The tracker keeps the set of active tabs. While it is enabled a timer calls [TimeTracker::tick]
/// once per period, which attributes the wall time elapsed since the previous attribution to the
/// domain of every active tab.
pub struct TimeTracker {
    state: Mutex<TrackerState>,
    statistics: Arc<StatisticsStore>,
    clock: Arc<dyn Clock>,
    tick_period: std::time::Duration,
}

impl TimeTracker {
    pub fn new(
        statistics: Arc<StatisticsStore>,
        clock: Arc<dyn Clock>,
        tick_period: std::time::Duration,
    ) -> Arc<Self> {
        let now = clock.time();
        Arc::new(Self {
            state: Mutex::new(TrackerState {
                active_tabs: HashMap::new(),
                last_attribution: now,
                timer: None,
            }),
            statistics,
            clock,
            tick_period,
        })
    }

    /// Starts the timer if the persisted settings say tracking is enabled.
    pub async fn initialize(self: &Arc<Self>) {
        let settings = self.statistics.get_settings().await;
        if settings.tracking_enabled {
            self.start().await;
        } else {
            info!("Tracking is disabled in settings");
        }
    }

    /// Marks the tab as active with a fresh start time or removes it from the active set.
    pub async fn set_tab_active(&self, tab_id: TabId, url: &str, active: bool) {
        let mut state = self.state.lock().await;
        if active {
            let now = self.clock.time();
            let tab = TabInfo {
                id: tab_id,
                url: url.to_string(),
                domain: extract_domain(url),
                start_time: now,
                is_active: true,
            };
            debug!("Tab {tab_id} is active on {}", tab.domain);
            state.active_tabs.insert(tab_id, tab);
            state.last_attribution = now;
        } else if state.active_tabs.remove(&tab_id).is_some() {
            debug!("Tab {tab_id} is no longer active");
        }
    }

    pub async fn remove_tab(&self, tab_id: TabId) {
        self.state.lock().await.active_tabs.remove(&tab_id);
    }

    pub async fn active_tabs(&self) -> Vec<TabInfo> {
        let state = self.state.lock().await;
        let mut tabs = state.active_tabs.values().cloned().collect::<Vec<_>>();
        tabs.sort_by_key(|tab| tab.id);
        tabs
    }

    pub async fn is_tracking(&self) -> bool {
        self.state.lock().await.timer.is_some()
    }

    /// Enables tracking and starts the timer. Does nothing when already running.
    pub async fn start(self: &Arc<Self>) {
        let mut state = self.state.lock().await;
        if state.timer.is_some() {
            return;
        }
        state.last_attribution = self.clock.time();
        let cancel = CancellationToken::new();
        state.timer = Some(cancel.clone());
        drop(state);

        tokio::spawn(Arc::clone(self).run_timer(cancel));
        info!("Tracking started");
    }

    /// Disables tracking and stops the timer. Does nothing when already stopped.
    pub async fn stop(&self) {
        if let Some(timer) = self.state.lock().await.timer.take() {
            timer.cancel();
            info!("Tracking stopped");
        }
    }

    /// Flips tracking and persists the new state. Returns whether tracking is now enabled.
    pub async fn toggle(self: &Arc<Self>) -> bool {
        if self.is_tracking().await {
            self.stop().await;
        } else {
            self.start().await;
        }
        let tracking = self.is_tracking().await;
        let mut settings = self.statistics.get_settings().await;
        settings.tracking_enabled = tracking;
        self.statistics.save_settings(&settings).await;
        tracking
    }

    /// Attributes the time elapsed since the previous attribution to every active tab.
    ///
    /// Every active tab receives the whole gap. Normally the browser focuses a single tab, so
    /// there is nothing to split.
    pub async fn tick(&self) -> TickOutcome {
        let now = self.clock.time();
        let (gap, domains) = {
            let state = self.state.lock().await;
            if state.timer.is_none() || state.active_tabs.is_empty() {
                return TickOutcome::Idle;
            }
            let gap = now - state.last_attribution;
            if gap < self.min_gap() {
                return TickOutcome::TooSoon;
            }
            let domains = state
                .active_tabs
                .values()
                .filter(|tab| tab.is_active)
                .map(|tab| tab.domain.clone())
                .collect::<Vec<_>>();
            (gap, domains)
        };

        let settings = self.statistics.get_settings().await;
        if AutoPause::from_settings(&settings).is_away(gap) {
            debug!("Skipping attribution, {gap} since the last one");
            return TickOutcome::Away { gap };
        }

        let today = self.clock.today();
        for domain in &domains {
            tokio::join!(
                self.statistics.record_time(domain, gap),
                self.statistics.record_daily(today, domain, gap),
            );
        }
        self.state.lock().await.last_attribution = now;

        TickOutcome::Attributed {
            elapsed: gap,
            tabs: domains.len(),
        }
    }

    fn min_gap(&self) -> Duration {
        Duration::milliseconds(self.tick_period.as_millis() as i64)
    }

    async fn run_timer(self: Arc<Self>, cancel: CancellationToken) {
        let mut tick_point = self.clock.instant();
        loop {
            tick_point += self.tick_period;

            tokio::select! {
                _ = cancel.cancelled() => {
                    return
                }
                _ = self.clock.sleep_until(tick_point) => ()
            }

            let outcome = self.tick().await;
            trace!("Tick finished {outcome:?}");
        }
    }
}
