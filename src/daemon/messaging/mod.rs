//! Request/response surface used by the popup and the detail view.

pub mod server;
pub mod transport;

use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    daemon::{
        browser::BrowserEvent,
        storage::{
            entities::{DailyStats, Settings, WatchTimeStats},
            statistics::StatisticsStore,
        },
        tracking::tracker::{TabInfo, TimeTracker},
    },
    utils::clock::Clock,
};

pub const UNKNOWN_ACTION: &str = "Unknown action";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Request {
    GetStats,
    /// Absent date means today.
    GetDailyStats {
        #[serde(default)]
        date: Option<NaiveDate>,
    },
    ToggleTracking,
    GetSettings,
    UpdateSettings {
        settings: Settings,
    },
    ClearData,
    GetActiveTabs,
    GetTrackingStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Response {
    Stats(WatchTimeStats),
    Daily(DailyStats),
    #[serde(rename_all = "camelCase")]
    Toggled {
        success: bool,
        is_tracking: bool,
    },
    Settings(Settings),
    Success {
        success: bool,
    },
    ActiveTabs(Vec<TabInfo>),
    #[serde(rename_all = "camelCase")]
    TrackingStatus {
        is_tracking: bool,
    },
    Error {
        error: String,
    },
}

impl Response {
    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            error: message.into(),
        }
    }
}

/// A single frame received from the extension.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Incoming {
    /// Fire and forget notification, no reply is sent.
    Event { event: BrowserEvent },
    Request(RequestEnvelope),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RequestEnvelope {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(flatten)]
    pub request: Request,
}

/// A reply to a [RequestEnvelope]. `id` repeats the request id if it had one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub response: Response,
}

/// Dispatches requests to the tracker and the statistics store.
pub struct MessageHandler {
    statistics: Arc<StatisticsStore>,
    tracker: Arc<TimeTracker>,
    clock: Arc<dyn Clock>,
}

impl MessageHandler {
    pub fn new(
        statistics: Arc<StatisticsStore>,
        tracker: Arc<TimeTracker>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            statistics,
            tracker,
            clock,
        }
    }

    pub async fn handle(&self, request: Request) -> Response {
        debug!("Handling request {request:?}");
        match request {
            Request::GetStats => Response::Stats(self.statistics.get_stats().await),
            Request::GetDailyStats { date } => {
                let date = date.unwrap_or_else(|| self.clock.today());
                Response::Daily(self.statistics.get_daily(date).await)
            }
            Request::ToggleTracking => {
                let is_tracking = self.tracker.toggle().await;
                Response::Toggled {
                    success: true,
                    is_tracking,
                }
            }
            Request::GetSettings => Response::Settings(self.statistics.get_settings().await),
            Request::UpdateSettings { settings } => {
                self.statistics.save_settings(&settings).await;
                Response::Success { success: true }
            }
            Request::ClearData => {
                self.statistics.clear_all().await;
                Response::Success { success: true }
            }
            Request::GetActiveTabs => Response::ActiveTabs(self.tracker.active_tabs().await),
            Request::GetTrackingStatus => Response::TrackingStatus {
                is_tracking: self.tracker.is_tracking().await,
            },
        }
    }
}
