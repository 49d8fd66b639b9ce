//! Transport abstraction over the inbound message feed.
//!
//! The broker client is external to this core; the daemon only needs
//! something that yields raw payloads one at a time. Transports are injected
//! (no process-wide connection singleton) so tests run against an in-memory
//! channel and the binary runs against a newline-delimited JSON reader.

use crate::error::{Result, ToposyncError};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;

/// Source of raw event payloads.
#[async_trait]
pub trait EventTransport: Send {
    /// Pulls the next raw payload. `Ok(None)` means the feed ended.
    ///
    /// A transport error is fatal to the *message*, not the daemon: the
    /// consumer loop logs it and keeps pulling.
    async fn next_message(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Newline-delimited JSON transport over any async reader (stdin, a file, a
/// pipe from a broker bridge).
pub struct LineTransport<R> {
    lines: Lines<BufReader<R>>,
}

impl<R: tokio::io::AsyncRead + Unpin + Send> LineTransport<R> {
    /// Wraps a reader; each line is one payload.
    pub fn new(reader: R) -> Self {
        LineTransport {
            lines: BufReader::new(reader).lines(),
        }
    }
}

#[async_trait]
impl<R> EventTransport for LineTransport<R>
where
    R: tokio::io::AsyncRead + Unpin + Send,
{
    async fn next_message(&mut self) -> Result<Option<Vec<u8>>> {
        loop {
            match self.lines.next_line().await {
                Ok(Some(line)) => {
                    // Blank lines between records are tolerated.
                    if line.trim().is_empty() {
                        continue;
                    }
                    return Ok(Some(line.into_bytes()));
                }
                Ok(None) => return Ok(None),
                Err(e) => return Err(ToposyncError::Transport(e.to_string())),
            }
        }
    }
}

/// In-memory transport backed by a channel, for tests and embedding.
pub struct ChannelTransport {
    receiver: mpsc::Receiver<Vec<u8>>,
}

impl ChannelTransport {
    /// Creates the transport plus the sender used to feed it.
    pub fn new(capacity: usize) -> (mpsc::Sender<Vec<u8>>, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        (sender, ChannelTransport { receiver })
    }
}

#[async_trait]
impl EventTransport for ChannelTransport {
    async fn next_message(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.receiver.recv().await)
    }
}
