use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::{
    daemon::storage::entities::{DailyStatsCollection, WatchTimeStats},
    utils::{
        percentage::{duration_percentage, Percentage},
        time::days_between,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub struct SiteUsage {
    pub domain: String,
    pub total_time: Duration,
    pub share: Percentage,
    pub visit_count: u64,
    pub last_visit: DateTime<Utc>,
    pub average_session: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    pub total_time: Duration,
    pub sites: usize,
    pub visits: u64,
    pub average_session: Duration,
}

fn average(total: Duration, visits: u64) -> Duration {
    match i32::try_from(visits) {
        Ok(visits) if visits > 0 => total / visits,
        _ => Duration::zero(),
    }
}

pub fn summarize(stats: &WatchTimeStats) -> Summary {
    let visits = stats.sites.values().map(|site| site.visit_count).sum();
    Summary {
        total_time: stats.total_watch_time,
        sites: stats.sites.len(),
        visits,
        average_session: average(stats.total_watch_time, visits),
    }
}

/// Returns sites sorted by time, longest first. Sites below `min_percentage` of the whole are
/// dropped.
pub fn rank_sites(stats: &WatchTimeStats, min_percentage: Percentage) -> Vec<SiteUsage> {
    let mut usages = stats
        .sites
        .values()
        .map(|site| SiteUsage {
            domain: site.domain.clone(),
            total_time: site.total_time,
            share: duration_percentage(site.total_time, stats.total_watch_time),
            visit_count: site.visit_count,
            last_visit: site.last_visit,
            average_session: average(site.total_time, site.visit_count),
        })
        .filter(|usage| usage.share >= min_percentage)
        .collect::<Vec<_>>();
    usages.sort_by(|a, b| {
        b.total_time
            .cmp(&a.total_time)
            .then_with(|| a.domain.cmp(&b.domain))
    });
    usages
}

/// Total time of every day from `start` to `end`. Days without records are zero.
pub fn daily_series(
    collection: &DailyStatsCollection,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<(NaiveDate, Duration)> {
    days_between(start, end)
        .into_iter()
        .map(|day| {
            let total = collection
                .get(&day)
                .map_or_else(Duration::zero, |daily| daily.total_time);
            (day, total)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    use crate::{
        daemon::storage::entities::{DailyStats, DailyStatsCollection, WatchTimeStats},
        utils::percentage::Percentage,
    };

    use super::{daily_series, rank_sites, summarize};

    fn test_stats() -> WatchTimeStats {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut stats = WatchTimeStats::empty(now);
        stats.attribute("a.com", Duration::minutes(30), now);
        stats.attribute("a.com", Duration::minutes(30), now);
        stats.attribute("b.com", Duration::minutes(25), now);
        stats.attribute("c.com", Duration::minutes(5), now);
        stats
    }

    #[test]
    fn test_summary_averages_over_visits() {
        let summary = summarize(&test_stats());
        assert_eq!(summary.total_time, Duration::minutes(90));
        assert_eq!(summary.sites, 3);
        assert_eq!(summary.visits, 4);
        assert_eq!(summary.average_session, Duration::seconds(90 * 60 / 4));
    }

    #[test]
    fn test_empty_summary_has_no_average() {
        let summary = summarize(&WatchTimeStats::empty(Utc::now()));
        assert_eq!(summary.visits, 0);
        assert_eq!(summary.average_session, Duration::zero());
    }

    #[test]
    fn test_sites_are_ranked_by_time() {
        let ranked = rank_sites(&test_stats(), Percentage::ZERO);
        let domains = ranked.iter().map(|v| v.domain.as_str()).collect::<Vec<_>>();
        assert_eq!(domains, vec!["a.com", "b.com", "c.com"]);
        assert_eq!(ranked[0].average_session, Duration::minutes(30));
        assert!((*ranked[0].share - 66.666).abs() < 0.01);
    }

    #[test]
    fn test_small_sites_are_filtered() {
        let ranked = rank_sites(&test_stats(), Percentage::new_opt(10.).unwrap());
        assert_eq!(ranked.len(), 2);
        assert!(ranked.iter().all(|v| v.domain != "c.com"));
    }

    #[test]
    fn test_missing_days_are_zero() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 5, d).unwrap();
        let mut collection = DailyStatsCollection::new();
        let mut daily = DailyStats::empty(day(2));
        daily.attribute("a.com", Duration::minutes(3));
        collection.insert(day(2), daily);

        let series = daily_series(&collection, day(1), day(3));
        assert_eq!(
            series,
            vec![
                (day(1), Duration::zero()),
                (day(2), Duration::minutes(3)),
                (day(3), Duration::zero()),
            ]
        );
    }
}
