use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, Instrument};

use crate::{daemon::storage::statistics::StatisticsStore, utils::clock::Clock};

/// Periodically drops sessions older than `max_age`. The first sweep happens one interval after
/// start.
pub struct CleanupModule {
    statistics: Arc<StatisticsStore>,
    shutdown: CancellationToken,
    interval: Duration,
    max_age: chrono::Duration,
    time_provider: Arc<dyn Clock>,
}

impl CleanupModule {
    pub fn new(
        statistics: Arc<StatisticsStore>,
        shutdown: CancellationToken,
        interval: Duration,
        max_age: chrono::Duration,
        time_provider: Arc<dyn Clock>,
    ) -> Self {
        Self {
            statistics,
            shutdown,
            interval,
            max_age,
            time_provider,
        }
    }

    /// Executes the cleanup loop until shutdown.
    pub async fn run(self) -> Result<()> {
        let mut sweep_point = self.time_provider.instant();
        loop {
            sweep_point += self.interval;

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                _ = self.time_provider.sleep_until(sweep_point) => ()
            }

            let removed = self
                .statistics
                .purge_old_sessions(self.max_age)
                .instrument(info_span!("Session cleanup"))
                .await;
            info!("Cleanup removed {removed} sessions");
        }
    }
}
