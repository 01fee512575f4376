use chrono::{DateTime, Duration, NaiveDate, TimeZone};

/// Returns every day from `start` to `end`, both inclusive.
pub fn days_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|day| *day <= end).collect()
}

/// Returns the day `days` before `date`'s day, or [NaiveDate::MIN] when that is out of range.
pub fn days_before<Tz: TimeZone>(date: DateTime<Tz>, days: u32) -> NaiveDate {
    date.checked_sub_signed(Duration::days(days as i64))
        .map_or(NaiveDate::MIN, |v| v.date_naive())
}
