//! Splits a byte source into outbound data frames.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;

use super::CHUNK_SIZE;
use crate::{Result, StowageError};

/// Destination for outbound frames.
#[async_trait]
pub trait FrameSink: Send {
    /// Deliver one frame. An error means the peer is gone.
    async fn send(&mut self, frame: Bytes) -> Result<()>;
}

/// Feeds a streaming response body.
#[async_trait]
impl FrameSink for mpsc::Sender<std::io::Result<Bytes>> {
    async fn send(&mut self, frame: Bytes) -> Result<()> {
        mpsc::Sender::send(self, Ok(frame))
            .await
            .map_err(|_| StowageError::Transfer("receiver closed".to_string()))
    }
}

/// Collects frames in memory.
#[async_trait]
impl FrameSink for Vec<Bytes> {
    async fn send(&mut self, frame: Bytes) -> Result<()> {
        self.push(frame);
        Ok(())
    }
}

/// Send everything in `source` to `sink` as frames of at most [`CHUNK_SIZE`] bytes.
///
/// Returns the number of bytes sent. An empty source sends no frames. The
/// first read or send failure stops the transfer; frames already sent stay sent.
pub async fn emit<R, S>(mut source: R, sink: &mut S) -> Result<u64>
where
    R: AsyncRead + Unpin + Send,
    S: FrameSink + ?Sized,
{
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut sent = 0u64;

    loop {
        let n = source
            .read(&mut buf)
            .await
            .map_err(|e| StowageError::Transfer(format!("read failed: {e}")))?;
        if n == 0 {
            break;
        }
        sink.send(Bytes::copy_from_slice(&buf[..n])).await?;
        sent += n as u64;
    }

    Ok(sent)
}
