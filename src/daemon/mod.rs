use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Result;
use browser::BrowserEventRouter;
use cleanup::CleanupModule;
use messaging::{server::MessageServer, transport::Framing, MessageHandler};
use storage::{
    key_value::{FileStore, KeyValueStore},
    statistics::StatisticsStore,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracking::tracker::TimeTracker;

use crate::utils::clock::{Clock, DefaultClock};

pub mod args;
pub mod browser;
pub mod cleanup;
pub mod messaging;
pub mod shutdown;
pub mod storage;
pub mod tracking;

pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(1);
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);
pub const SESSION_MAX_AGE_DAYS: i64 = 30;
pub const STORAGE_DIR: &str = "storage";

/// Represents the starting point for the host. Serves the browser over stdin/stdout until it
/// disconnects or the process is interrupted.
pub async fn start_daemon(dir: PathBuf, framing: Framing) -> Result<()> {
    let store = FileStore::new(dir.join(STORAGE_DIR))?;
    info!("Using storage at {:?}", store.root());

    run_host(
        Arc::new(store),
        Arc::new(DefaultClock),
        framing,
        CancellationToken::new(),
        tokio::io::stdin(),
        tokio::io::stdout(),
    )
    .await
}

async fn run_host(
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    framing: Framing,
    shutdown_token: CancellationToken,
    reader: impl AsyncRead + Send + Unpin,
    writer: impl AsyncWrite + Unpin,
) -> Result<()> {
    let statistics = Arc::new(StatisticsStore::new(store, clock.clone()));
    let tracker = TimeTracker::new(statistics.clone(), clock.clone(), DEFAULT_TICK_PERIOD);
    tracker.initialize().await;

    let server = create_server(&tracker, &statistics, &clock, framing, &shutdown_token);
    let cleanup = create_cleanup(&statistics, &clock, &shutdown_token);

    let (_, cleanup_result, serve_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        cleanup.run(),
        async {
            let result = server.run(reader, writer).await;
            // Without the browser there is nothing left to track.
            shutdown_token.cancel();
            result
        },
    );

    if let Err(cleanup_result) = cleanup_result {
        error!("Cleanup module got an error {:?}", cleanup_result);
    }

    if let Err(serve_result) = serve_result {
        error!("Message server got an error {:?}", serve_result);
    }

    tracker.stop().await;
    Ok(())
}

fn create_server(
    tracker: &Arc<TimeTracker>,
    statistics: &Arc<StatisticsStore>,
    clock: &Arc<dyn Clock>,
    framing: Framing,
    shutdown_token: &CancellationToken,
) -> MessageServer {
    MessageServer::new(
        BrowserEventRouter::new(tracker.clone(), statistics.clone()),
        MessageHandler::new(statistics.clone(), tracker.clone(), clock.clone()),
        framing,
        shutdown_token.clone(),
    )
}

fn create_cleanup(
    statistics: &Arc<StatisticsStore>,
    clock: &Arc<dyn Clock>,
    shutdown_token: &CancellationToken,
) -> CleanupModule {
    CleanupModule::new(
        statistics.clone(),
        shutdown_token.clone(),
        CLEANUP_INTERVAL,
        chrono::Duration::days(SESSION_MAX_AGE_DAYS),
        clock.clone(),
    )
}

#[cfg(test)]
mod daemon_tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use futures::StreamExt;
    use serde_json::{json, Value};
    use tempfile::tempdir;
    use tokio_util::sync::CancellationToken;

    use crate::{
        daemon::{
            messaging::transport::{frame_reader, FrameWriter, Framing},
            run_host,
            storage::key_value::FileStore,
        },
        utils::{clock::test_clock::TokioClock, logging::TEST_LOGGING},
    };

    /// Drives the whole host like the extension would: a tab gets focused, time passes, the
    /// popup asks for statistics and finally the browser disconnects.
    #[tokio::test(start_paused = true)]
    async fn smoke_test_host() -> Result<()> {
        *TEST_LOGGING;
        let dir = tempdir()?;
        let store = Arc::new(FileStore::new(dir.path().join("storage"))?);

        let (host_side, browser_side) = tokio::io::duplex(64 * 1024);
        let (host_read, host_write) = tokio::io::split(host_side);
        let (browser_read, browser_write) = tokio::io::split(browser_side);

        let browser = async move {
            let mut writer = FrameWriter::new(browser_write, Framing::Native);
            let event = json!({"event": {
                "type": "tabActivated",
                "tabId": 3,
                "windowId": 1,
                "url": "https://www.example.com/watch"
            }});
            writer.write_frame(&serde_json::to_vec(&event)?).await?;

            tokio::time::sleep(Duration::from_millis(3500)).await;

            let request = json!({"id": 1, "action": "getStats"});
            writer.write_frame(&serde_json::to_vec(&request)?).await?;
            writer.shutdown().await?;

            frame_reader(browser_read, Framing::Native)
                .map(|frame| Ok(serde_json::from_slice::<Value>(&frame?)?))
                .collect::<Vec<Result<Value>>>()
                .await
                .into_iter()
                .collect::<Result<Vec<_>>>()
        };

        let (hosted, replies) = tokio::join!(
            run_host(
                store,
                Arc::new(TokioClock::new()),
                Framing::Native,
                CancellationToken::new(),
                host_read,
                host_write,
            ),
            browser
        );
        hosted?;
        let replies = replies?;

        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["id"], json!(1));
        let site = &replies[0]["response"]["sites"]["example.com"];
        assert_eq!(site["totalTime"], json!(3000));
        assert_eq!(site["visitCount"], json!(3));

        let persisted = std::fs::read_to_string(
            dir.path().join("storage").join("local").join("watchTimeStats.json"),
        )?;
        assert!(persisted.contains("example.com"));
        Ok(())
    }
}
