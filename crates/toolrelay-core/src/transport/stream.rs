//! Newline-delimited JSON over a byte stream

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use super::{CloseSignal, Transport, TransportError, TransportResult};
use crate::logging::SharedLogger;
use crate::protocol::Frame;
use crate::{log_debug, log_error, log_warn};

/// Frames encoded as one JSON document per line.
///
/// Works over stdio, sockets or pipes. End of input or a read error closes
/// the transport; the two are told apart in the log. Lines that do not parse
/// as a frame are skipped.
pub struct StreamTransport<R, W> {
    reader: tokio::sync::Mutex<BufReader<R>>,
    writer: tokio::sync::Mutex<W>,
    signal: CloseSignal,
    logger: SharedLogger,
}

impl<R, W> StreamTransport<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(reader: R, writer: W, logger: SharedLogger) -> Self {
        Self {
            reader: tokio::sync::Mutex::new(BufReader::new(reader)),
            writer: tokio::sync::Mutex::new(writer),
            signal: CloseSignal::new(),
            logger,
        }
    }
}

#[async_trait]
impl<R, W> Transport for StreamTransport<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&self, frame: Frame) -> TransportResult<()> {
        if self.signal.is_closed() {
            return Err(TransportError::Closed);
        }

        let mut line =
            serde_json::to_string(&frame).map_err(|e| TransportError::Codec(e.to_string()))?;
        line.push('\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn recv(&self) -> Option<Frame> {
        let mut reader = self.reader.lock().await;
        let mut line = String::new();

        loop {
            line.clear();
            let read = tokio::select! {
                biased;
                _ = self.signal.closed() => return None,
                read = reader.read_line(&mut line) => read,
            };

            match read {
                Ok(0) => {
                    log_debug!(self.logger, "[StreamTransport] End of input, closing");
                    self.signal.close();
                    return None;
                }
                Err(e) => {
                    let error = TransportError::from(e);
                    log_error!(self.logger, "[StreamTransport] Read failed, closing: {}", error);
                    self.signal.close();
                    return None;
                }
                Ok(_) => {}
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<Frame>(trimmed) {
                Ok(frame) => return Some(frame),
                Err(e) => log_warn!(self.logger, "[StreamTransport] Skipping malformed line: {}", e),
            }
        }
    }

    async fn close(&self) {
        if self.signal.close() {
            let mut writer = self.writer.lock().await;
            if let Err(e) = writer.shutdown().await {
                log_debug!(self.logger, "[StreamTransport] Shutdown of writer failed: {}", e);
            }
        }
    }

    async fn closed(&self) {
        self.signal.closed().await;
    }

    fn is_closed(&self) -> bool {
        self.signal.is_closed()
    }
}
