use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Resolves when the process receives ctrl-c or when another module requested shutdown, for
/// example because the browser closed the connection. Either way every module gets cancelled.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => (),
    };
}
