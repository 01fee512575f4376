use std::fmt::Display;

use anyhow::{anyhow, Result};
use clap::ValueEnum;
use futures::{stream::BoxStream, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{FramedRead, LengthDelimitedCodec, LinesCodec};

/// Largest frame accepted from the browser. The browser itself refuses larger ones.
const MAX_FRAME_LENGTH: usize = 4 * 1024 * 1024;

/// How json documents are delimited on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Framing {
    /// Native messaging: 32 bit little endian length followed by the json document.
    Native,
    /// One json document per line. Handy for driving the host by hand.
    Lines,
}

impl Display for Framing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Framing::Native => write!(f, "native"),
            Framing::Lines => write!(f, "lines"),
        }
    }
}

/// Splits the incoming byte stream into frames.
pub fn frame_reader<'a>(
    reader: impl AsyncRead + Send + Unpin + 'a,
    framing: Framing,
) -> BoxStream<'a, Result<Vec<u8>>> {
    match framing {
        Framing::Native => {
            let codec = LengthDelimitedCodec::builder()
                .length_field_length(4)
                .little_endian()
                .max_frame_length(MAX_FRAME_LENGTH)
                .new_codec();
            FramedRead::new(reader, codec)
                .map(|frame| {
                    frame
                        .map(|bytes| bytes.to_vec())
                        .map_err(|e| anyhow!("Failed to read frame: {e}"))
                })
                .boxed()
        }
        Framing::Lines => FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_FRAME_LENGTH))
            .filter_map(|line| {
                futures::future::ready(match line {
                    Ok(line) if line.trim().is_empty() => None,
                    Ok(line) => Some(Ok(line.into_bytes())),
                    Err(e) => Some(Err(anyhow!("Failed to read line: {e}"))),
                })
            })
            .boxed(),
    }
}

/// Writes frames in the same framing the reader expects.
pub struct FrameWriter<W> {
    writer: W,
    framing: Framing,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W, framing: Framing) -> Self {
        Self { writer, framing }
    }

    pub async fn write_frame(&mut self, payload: &[u8]) -> Result<()> {
        match self.framing {
            Framing::Native => {
                let length = u32::try_from(payload.len())
                    .map_err(|_| anyhow!("Frame of {} bytes is too large", payload.len()))?;
                self.writer.write_u32_le(length).await?;
                self.writer.write_all(payload).await?;
            }
            Framing::Lines => {
                self.writer.write_all(payload).await?;
                self.writer.write_all(b"\n").await?;
            }
        }
        self.writer.flush().await?;
        Ok(())
    }

    /// Signals the other side that no more frames will come.
    pub async fn shutdown(&mut self) -> Result<()> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use futures::StreamExt;
    use tokio::io::AsyncReadExt;

    use super::{frame_reader, FrameWriter, Framing};

    #[tokio::test]
    async fn test_native_frames_round_trip() -> Result<()> {
        let (client, server) = tokio::io::duplex(1024);
        let mut writer = FrameWriter::new(client, Framing::Native);
        writer.write_frame(br#"{"action":"getStats"}"#).await?;
        writer.write_frame(b"{}").await?;
        drop(writer);

        let frames = frame_reader(server, Framing::Native)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(frames, vec![br#"{"action":"getStats"}"#.to_vec(), b"{}".to_vec()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_native_length_prefix_is_little_endian() -> Result<()> {
        let (client, mut server) = tokio::io::duplex(1024);
        let mut writer = FrameWriter::new(client, Framing::Native);
        writer.write_frame(b"abc").await?;
        drop(writer);

        let mut raw = vec![];
        server.read_to_end(&mut raw).await?;
        assert_eq!(raw, vec![3, 0, 0, 0, b'a', b'b', b'c']);
        Ok(())
    }

    #[tokio::test]
    async fn test_lines_skip_blank_lines() -> Result<()> {
        let input: &[u8] = b"{\"a\":1}\n\n   \n{\"b\":2}\n";
        let frames = frame_reader(input, Framing::Lines)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(frames, vec![b"{\"a\":1}".to_vec(), b"{\"b\":2}".to_vec()]);
        Ok(())
    }

    #[tokio::test]
    async fn test_truncated_native_frame_is_an_error() {
        let input: &[u8] = &[10, 0, 0, 0, b'{'];
        let frames = frame_reader(input, Framing::Native).collect::<Vec<_>>().await;
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_err());
    }
}
