use std::fmt::{Display, Write};

use ansi_term::Style;
use anyhow::Result;
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use chrono_english::parse_date_string;
use clap::{CommandFactory, Parser, ValueEnum};
use now::DateTimeNow;

use crate::{
    daemon::storage::{
        entities::{DailyStats, DailyStatsCollection, WatchTimeStats},
        statistics::StatisticsStore,
    },
    utils::{percentage::Percentage, time::days_before},
};

use super::{
    output::{
        analysis::{daily_series, rank_sites, summarize},
        format_duration,
    },
    Args,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DateStyle {
    Uk,
    Us,
}

impl From<DateStyle> for chrono_english::Dialect {
    fn from(value: DateStyle) -> Self {
        match value {
            DateStyle::Uk => Self::Uk,
            DateStyle::Us => Self::Us,
        }
    }
}

impl Display for DateStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateStyle::Uk => write!(f, "uk"),
            DateStyle::Us => write!(f, "us"),
        }
    }
}

/// Longest daily series a report prints.
const MAX_REPORT_DAYS: i64 = 3660;

#[derive(Debug, Parser)]
pub struct ReportCommand {
    #[arg(long, default_value_t = 10, help = "Number of sites in the table")]
    top: usize,
    #[arg(
        long,
        default_value_t = 7,
        value_parser = clap::value_parser!(u32).range(1..=MAX_REPORT_DAYS),
        help = "Number of days in the daily series, today included"
    )]
    days: u32,
    #[arg(long, help = "Show the daily series since the beginning of the week")]
    week: bool,
    #[arg(short = 'p', long = "percentage", help = "Filter sites to have at least specified share", default_value_t = Percentage::ZERO)]
    min_percentage: Percentage,
}

#[derive(Debug, Parser)]
pub struct DailyCommand {
    #[arg(
        long,
        help = "Day to show. Examples are \"today\", \"yesterday\", \"15/03/2025\". Defaults to today"
    )]
    date: Option<String>,
    #[arg(long, default_value_t = DateStyle::Uk, help = "Style of dates used during parsing. For Uk it's day/month/year. For Us it's month/day/year")]
    date_style: DateStyle,
}

/// Prints the overview of everything recorded: summary, top sites and recent days.
pub async fn process_report_command(
    command: ReportCommand,
    statistics: &StatisticsStore,
) -> Result<()> {
    let stats = statistics.get_stats().await;
    let daily = statistics.get_all_daily().await;
    print!("{}", render_report(&command, &stats, &daily, Utc::now()));
    Ok(())
}

/// Prints the breakdown of a single day.
pub async fn process_daily_command(
    DailyCommand { date, date_style }: DailyCommand,
    statistics: &StatisticsStore,
) -> Result<()> {
    let date = parse_day(date, date_style, Utc::now())?;
    let daily = statistics.get_daily(date).await;
    print!("{}", render_daily(&daily));
    Ok(())
}

/// Days are resolved in UTC, the same calendar the host keys daily statistics by.
fn parse_day<Tz: TimeZone>(
    date: Option<String>,
    date_style: DateStyle,
    now: DateTime<Tz>,
) -> Result<NaiveDate> {
    let now = now.with_timezone(&Utc);
    let Some(date) = date else {
        return Ok(now.date_naive());
    };
    match parse_date_string(&date, now, date_style.into()) {
        Ok(v) => Ok(v.date_naive()),
        Err(e) => Err(Args::command()
            .error(
                clap::error::ErrorKind::ValueValidation,
                format!("Failed to validate date {e}"),
            )
            .into()),
    }
}

fn header(text: &str) -> String {
    Style::new().bold().paint(text).to_string()
}

fn render_report<Tz: TimeZone>(
    command: &ReportCommand,
    stats: &WatchTimeStats,
    daily: &DailyStatsCollection,
    now: DateTime<Tz>,
) -> String {
    let now = now.with_timezone(&Utc);
    let mut out = String::new();
    let summary = summarize(stats);

    let _ = writeln!(out, "{}", header("Summary"));
    let _ = writeln!(out, "Total time\t{}", format_duration(summary.total_time));
    let _ = writeln!(out, "Sites\t\t{}", summary.sites);
    let _ = writeln!(out, "Visits\t\t{}", summary.visits);
    let _ = writeln!(
        out,
        "Avg session\t{}",
        format_duration(summary.average_session)
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "{}", header("Top sites"));
    for site in rank_sites(stats, command.min_percentage)
        .into_iter()
        .take(command.top)
    {
        let _ = writeln!(
            out,
            "{}\t{}%\t{}\t{}\t{}\t{}",
            format_duration(site.total_time),
            *site.share as i32,
            site.visit_count,
            site.last_visit.with_timezone(&Local).format("%x"),
            format_duration(site.average_session),
            site.domain,
        );
    }
    let _ = writeln!(out);

    let end = now.date_naive();
    let start = if command.week {
        now.clone().beginning_of_week().date_naive()
    } else {
        days_before(now, command.days.saturating_sub(1))
    };
    let _ = writeln!(out, "{}", header("Daily activity"));
    for (day, total) in daily_series(daily, start, end) {
        let _ = writeln!(out, "{}\t{}", day.format("%a %x"), format_duration(total));
    }
    out
}

fn render_daily(daily: &DailyStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", header(&daily.date.format("%A %x").to_string()));
    let _ = writeln!(out, "Total time\t{}", format_duration(daily.total_time));
    let _ = writeln!(out, "Sites\t\t{}", daily.sites.len());

    let mut sites = daily.sites.iter().collect::<Vec<_>>();
    sites.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (domain, time) in sites {
        let _ = writeln!(out, "{}\t{}", format_duration(*time), domain);
    }
    out
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, FixedOffset, NaiveDate, TimeZone, Utc};
    use clap::Parser;

    use crate::daemon::storage::entities::{DailyStats, DailyStatsCollection, WatchTimeStats};

    use super::{parse_day, render_daily, render_report, DateStyle, ReportCommand};

    fn report_command(args: &[&str]) -> ReportCommand {
        ReportCommand::parse_from(std::iter::once("report").chain(args.iter().copied()))
    }

    #[test]
    fn test_parses_natural_days() {
        let now = Utc.with_ymd_and_hms(2025, 3, 16, 12, 0, 0).unwrap();
        assert_eq!(
            parse_day(None, DateStyle::Uk, now).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 16).unwrap()
        );
        assert_eq!(
            parse_day(Some("yesterday".into()), DateStyle::Uk, now).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()
        );
        assert_eq!(
            parse_day(Some("02/03/2025".into()), DateStyle::Uk, now).unwrap(),
            NaiveDate::from_ymd_opt(2025, 3, 2).unwrap()
        );
        assert_eq!(
            parse_day(Some("02/03/2025".into()), DateStyle::Us, now).unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 3).unwrap()
        );
        assert!(parse_day(Some("not a date".into()), DateStyle::Uk, now).is_err());
    }

    #[test]
    fn test_report_lists_top_sites_and_zero_days() {
        let now = Utc.with_ymd_and_hms(2025, 3, 16, 12, 0, 0).unwrap();
        let mut stats = WatchTimeStats::empty(now);
        stats.attribute("a.com", Duration::minutes(90), now);
        stats.attribute("b.com", Duration::minutes(30), now);
        stats.attribute("c.com", Duration::minutes(1), now);

        let today = now.date_naive();
        let mut daily = DailyStatsCollection::new();
        let mut today_stats = DailyStats::empty(today);
        today_stats.attribute("a.com", Duration::minutes(90));
        daily.insert(today, today_stats);

        let report = render_report(&report_command(&["--top", "2", "--days", "3"]), &stats, &daily, now);

        assert!(report.contains("2h 1m"));
        assert!(report.contains("1h 30m\t74%\t1\t"));
        assert!(report.contains("b.com"));
        assert!(!report.contains("c.com"));
        let daily_lines = report
            .lines()
            .skip_while(|line| !line.contains("Daily activity"))
            .skip(1)
            .collect::<Vec<_>>();
        assert_eq!(daily_lines.len(), 3);
        assert!(daily_lines[0].ends_with("\t0m"));
        assert!(daily_lines[2].ends_with("\t1h 30m"));
    }

    #[test]
    fn test_days_follow_utc_calendar() {
        // 21:00 on the 16th at UTC-5 is already the 17th in UTC.
        let recorded_at = Utc.with_ymd_and_hms(2025, 3, 17, 2, 0, 0).unwrap();
        let now = recorded_at.with_timezone(&FixedOffset::west_opt(5 * 3600).unwrap());
        let today = recorded_at.date_naive();

        let mut daily = DailyStatsCollection::new();
        let mut today_stats = DailyStats::empty(today);
        today_stats.attribute("a.com", Duration::minutes(45));
        daily.insert(today, today_stats);

        let report = render_report(
            &report_command(&["--days", "1"]),
            &WatchTimeStats::empty(recorded_at),
            &daily,
            now,
        );
        let daily_lines = report
            .lines()
            .skip_while(|line| !line.contains("Daily activity"))
            .skip(1)
            .collect::<Vec<_>>();
        assert_eq!(daily_lines.len(), 1);
        assert!(daily_lines[0].ends_with("\t45m"));

        assert_eq!(parse_day(None, DateStyle::Uk, now).unwrap(), today);
    }

    #[test]
    fn test_days_are_bounded() {
        assert!(ReportCommand::try_parse_from(["report", "--days", "4000000000"]).is_err());
        assert!(ReportCommand::try_parse_from(["report", "--days", "0"]).is_err());
        assert!(ReportCommand::try_parse_from(["report", "--days", "365"]).is_ok());
    }

    #[test]
    fn test_week_report_starts_on_monday() {
        // 2025-03-19 is a wednesday.
        let now = Utc.with_ymd_and_hms(2025, 3, 19, 12, 0, 0).unwrap();
        let report = render_report(
            &report_command(&["--week"]),
            &WatchTimeStats::empty(now),
            &DailyStatsCollection::new(),
            now,
        );
        let daily_lines = report
            .lines()
            .skip_while(|line| !line.contains("Daily activity"))
            .skip(1)
            .collect::<Vec<_>>();
        assert_eq!(daily_lines.len(), 3);
        assert!(daily_lines[0].starts_with("Mon"));
    }

    #[test]
    fn test_daily_breakdown_is_sorted() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 16).unwrap();
        let mut daily = DailyStats::empty(date);
        daily.attribute("small.com", Duration::minutes(2));
        daily.attribute("big.com", Duration::minutes(70));

        let rendered = render_daily(&daily);
        let lines = rendered.lines().collect::<Vec<_>>();
        assert_eq!(lines[1], "Total time\t1h 12m");
        assert_eq!(lines[2], "Sites\t\t2");
        assert_eq!(lines[3], "1h 10m\tbig.com");
        assert_eq!(lines[4], "2m\tsmall.com");
    }
}
