pub mod analysis;

use chrono::Duration;

/// Formats whole minutes, `Xh Ym` once there is at least an hour.
pub fn format_duration(v: Duration) -> String {
    let minutes = v.num_minutes();
    let hours = minutes / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else {
        format!("{}m", minutes % 60)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::format_duration;

    #[test]
    fn test_durations_are_rounded_down_to_minutes() {
        assert_eq!(format_duration(Duration::zero()), "0m");
        assert_eq!(format_duration(Duration::seconds(59)), "0m");
        assert_eq!(format_duration(Duration::minutes(59)), "59m");
        assert_eq!(format_duration(Duration::minutes(60)), "1h 0m");
        assert_eq!(
            format_duration(Duration::hours(26) + Duration::minutes(5) + Duration::seconds(30)),
            "26h 5m"
        );
    }
}
