use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::daemon::{
    storage::statistics::StatisticsStore,
    tracking::{
        domain::is_trackable,
        tracker::{TabId, TimeTracker},
    },
};

pub type WindowId = i64;

/// Tab reported as focused in a newly focused window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusedTab {
    pub tab_id: TabId,
    #[serde(default)]
    pub url: Option<String>,
}

/// Tab and window notifications forwarded by the extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BrowserEvent {
    #[serde(rename_all = "camelCase")]
    TabActivated {
        tab_id: TabId,
        window_id: WindowId,
        #[serde(default)]
        url: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    TabUpdated {
        tab_id: TabId,
        #[serde(default)]
        url: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    TabRemoved { tab_id: TabId },
    /// `window_id` is absent when every browser window lost focus.
    #[serde(rename_all = "camelCase")]
    WindowFocusChanged {
        #[serde(default)]
        window_id: Option<WindowId>,
        #[serde(default)]
        active_tab: Option<FocusedTab>,
    },
}

/// Remembers which tab the browser focuses and keeps the tracker's active set in line with it.
pub struct BrowserEventRouter {
    tracker: Arc<TimeTracker>,
    statistics: Arc<StatisticsStore>,
    active_tab: Option<TabId>,
}

impl BrowserEventRouter {
    pub fn new(tracker: Arc<TimeTracker>, statistics: Arc<StatisticsStore>) -> Self {
        Self {
            tracker,
            statistics,
            active_tab: None,
        }
    }

    pub fn active_tab(&self) -> Option<TabId> {
        self.active_tab
    }

    pub async fn handle(&mut self, event: BrowserEvent) {
        debug!("Handling browser event {event:?}");
        match event {
            BrowserEvent::TabActivated { tab_id, url, .. } => {
                if let Some(previous) = self.active_tab {
                    self.tracker.set_tab_active(previous, "", false).await;
                }
                self.active_tab = Some(tab_id);
                self.activate_if_trackable(tab_id, url.as_deref()).await;
            }
            BrowserEvent::TabUpdated { tab_id, url } => {
                if self.active_tab == Some(tab_id) {
                    self.activate_if_trackable(tab_id, url.as_deref()).await;
                }
            }
            BrowserEvent::TabRemoved { tab_id } => {
                self.tracker.remove_tab(tab_id).await;
                if self.active_tab == Some(tab_id) {
                    self.active_tab = None;
                }
            }
            BrowserEvent::WindowFocusChanged {
                window_id: None, ..
            } => {
                info!("Browser lost focus");
                self.tracker.stop().await;
            }
            BrowserEvent::WindowFocusChanged {
                window_id: Some(window_id),
                active_tab,
            } => {
                let Some(FocusedTab { tab_id, url }) = active_tab else {
                    debug!("Window {window_id} has no active tab");
                    return;
                };
                if let Some(previous) = self.active_tab.filter(|previous| *previous != tab_id) {
                    self.tracker.set_tab_active(previous, "", false).await;
                }
                debug!("Window {window_id} focused tab {tab_id}");
                self.active_tab = Some(tab_id);
                self.activate_if_trackable(tab_id, url.as_deref()).await;

                // Losing focus only pauses the timer, a user who turned tracking off stays off.
                if self.statistics.get_settings().await.tracking_enabled {
                    self.tracker.start().await;
                }
            }
        }
    }

    async fn activate_if_trackable(&self, tab_id: TabId, url: Option<&str>) {
        if let Some(url) = url.filter(|url| is_trackable(url)) {
            self.tracker.set_tab_active(tab_id, url, true).await;
        }
    }
}
