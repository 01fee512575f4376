use chrono::Duration;

use crate::daemon::storage::entities::Settings;

/// Decides whether the gap since the previous attribution means the user was away.
pub struct AutoPause {
    threshold: Option<Duration>,
}

impl AutoPause {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            threshold: settings.auto_pause.then_some(settings.pause_threshold),
        }
    }

    pub fn is_away(&self, gap: Duration) -> bool {
        matches!(self.threshold, Some(threshold) if gap > threshold)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use crate::daemon::storage::entities::Settings;

    use super::AutoPause;

    #[test]
    fn test_gap_above_threshold_is_away() {
        let pause = AutoPause::from_settings(&Settings::default());
        assert!(!pause.is_away(Duration::minutes(5)));
        assert!(pause.is_away(Duration::minutes(5) + Duration::milliseconds(1)));
    }

    #[test]
    fn test_disabled_auto_pause_never_pauses() {
        let pause = AutoPause::from_settings(&Settings {
            auto_pause: false,
            ..Settings::default()
        });
        assert!(!pause.is_away(Duration::days(3)));
    }
}
