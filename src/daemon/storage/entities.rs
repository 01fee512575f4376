use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Most recent sessions kept per domain. Older ones are dropped first.
pub const MAX_SESSIONS_PER_SITE: usize = 100;

/// One contiguous piece of attributed time.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub end_time: DateTime<Utc>,
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

impl Session {
    /// Session that ends at `end` and lasted `duration`.
    pub fn ending_at(end: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            start_time: end - duration,
            end_time: end,
            duration,
        }
    }
}

/// Aggregate for a single domain.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SiteData {
    pub domain: String,
    #[serde(with = "duration_ms")]
    pub total_time: Duration,
    pub sessions: Vec<Session>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_visit: DateTime<Utc>,
    pub visit_count: u64,
}

impl SiteData {
    pub fn new(domain: String, now: DateTime<Utc>) -> Self {
        Self {
            domain,
            total_time: Duration::zero(),
            sessions: vec![],
            last_visit: now,
            visit_count: 0,
        }
    }

    /// Adds one attribution. Only the latest [MAX_SESSIONS_PER_SITE] sessions survive.
    pub fn attribute(&mut self, elapsed: Duration, now: DateTime<Utc>) {
        self.total_time += elapsed;
        self.last_visit = now;
        self.visit_count += 1;
        self.sessions.push(Session::ending_at(now, elapsed));
        if self.sessions.len() > MAX_SESSIONS_PER_SITE {
            let overflow = self.sessions.len() - MAX_SESSIONS_PER_SITE;
            self.sessions.drain(..overflow);
        }
    }

    /// Keeps only sessions that started after `cutoff`. Totals are left as they are.
    pub fn retain_sessions_after(&mut self, cutoff: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|session| session.start_time > cutoff);
        before - self.sessions.len()
    }
}

/// Lifetime statistics for every domain ever seen.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WatchTimeStats {
    pub sites: BTreeMap<String, SiteData>,
    #[serde(with = "duration_ms")]
    pub total_watch_time: Duration,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_updated: DateTime<Utc>,
}

impl WatchTimeStats {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            sites: BTreeMap::new(),
            total_watch_time: Duration::zero(),
            last_updated: now,
        }
    }

    pub fn attribute(&mut self, domain: &str, elapsed: Duration, now: DateTime<Utc>) {
        self.sites
            .entry(domain.to_string())
            .or_insert_with(|| SiteData::new(domain.to_string(), now))
            .attribute(elapsed, now);
        self.total_watch_time += elapsed;
        self.last_updated = now;
    }
}

/// Time spent during a single calendar day.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub date: NaiveDate,
    #[serde(with = "duration_ms")]
    pub total_time: Duration,
    #[serde(with = "duration_map_ms")]
    pub sites: BTreeMap<String, Duration>,
}

impl DailyStats {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total_time: Duration::zero(),
            sites: BTreeMap::new(),
        }
    }

    pub fn attribute(&mut self, domain: &str, elapsed: Duration) {
        self.total_time += elapsed;
        *self
            .sites
            .entry(domain.to_string())
            .or_insert_with(Duration::zero) += elapsed;
    }
}

/// Every day ever recorded, keyed by date. Days are never pruned.
pub type DailyStatsCollection = BTreeMap<NaiveDate, DailyStats>;

/// User preferences. Stored in the synced scope.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub tracking_enabled: bool,
    pub auto_pause: bool,
    /// Largest gap between ticks that is still counted as watching.
    #[serde(with = "duration_ms")]
    pub pause_threshold: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tracking_enabled: true,
            auto_pause: true,
            pause_threshold: Duration::minutes(5),
        }
    }
}

pub mod duration_ms {
    use chrono::Duration;
    use serde::{self, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i64(duration.num_milliseconds())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = i64::deserialize(deserializer)?;
        Ok(Duration::milliseconds(ms))
    }
}

mod duration_map_ms {
    use std::collections::BTreeMap;

    use chrono::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(map: &BTreeMap<String, Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_map(map.iter().map(|(k, v)| (k, v.num_milliseconds())))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<BTreeMap<String, Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = BTreeMap::<String, i64>::deserialize(deserializer)?;
        Ok(raw
            .into_iter()
            .map(|(domain, ms)| (domain, Duration::milliseconds(ms)))
            .collect())
    }
}
