use anyhow::Result;
use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use crate::daemon::browser::BrowserEventRouter;

use super::{
    transport::{frame_reader, FrameWriter, Framing},
    Incoming, MessageHandler, Reply, Response, UNKNOWN_ACTION,
};

/// Serves one connection to the extension: browser events go to the router, requests to the
/// handler. Runs until the browser closes the stream or shutdown is requested.
pub struct MessageServer {
    router: BrowserEventRouter,
    handler: MessageHandler,
    framing: Framing,
    shutdown: CancellationToken,
}

impl MessageServer {
    pub fn new(
        router: BrowserEventRouter,
        handler: MessageHandler,
        framing: Framing,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            router,
            handler,
            framing,
            shutdown,
        }
    }

    pub async fn run(
        mut self,
        reader: impl AsyncRead + Send + Unpin,
        writer: impl AsyncWrite + Unpin,
    ) -> Result<()> {
        let mut frames = frame_reader(reader, self.framing);
        let mut writer = FrameWriter::new(writer, self.framing);
        info!("Serving messages using {} framing", self.framing);

        loop {
            let frame = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    return Ok(())
                }
                frame = frames.next() => frame
            };
            let Some(frame) = frame else {
                info!("Browser closed the connection");
                return Ok(());
            };

            if let Some(reply) = self.process_frame(&frame?).await {
                let payload = serde_json::to_vec(&reply)?;
                writer.write_frame(&payload).await?;
            }
        }
    }

    async fn process_frame(&mut self, frame: &[u8]) -> Option<Reply> {
        match serde_json::from_slice::<Incoming>(frame) {
            Ok(Incoming::Event { event }) => {
                self.router
                    .handle(event)
                    .instrument(info_span!("Browser event"))
                    .await;
                None
            }
            Ok(Incoming::Request(envelope)) => {
                let response = self
                    .handler
                    .handle(envelope.request)
                    .instrument(info_span!("Request", id = ?envelope.id))
                    .await;
                debug!("Replying {response:?}");
                Some(Reply {
                    id: envelope.id,
                    response,
                })
            }
            Err(e) => {
                warn!(
                    "Received unknown message {}: {e}",
                    String::from_utf8_lossy(frame)
                );
                Some(Reply {
                    id: request_id(frame),
                    response: Response::error(UNKNOWN_ACTION),
                })
            }
        }
    }
}

/// Best effort extraction of the id of a message that couldn't be parsed.
fn request_id(frame: &[u8]) -> Option<u64> {
    serde_json::from_slice::<serde_json::Value>(frame)
        .ok()?
        .get("id")?
        .as_u64()
}
