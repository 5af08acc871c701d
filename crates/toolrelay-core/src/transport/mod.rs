//! Frame transports
//!
//! A [`Transport`] moves [`Frame`]s between a tool provider and its consumer.
//! Two implementations ship with the crate:
//!
//! - [`TransportPair`]: an in-process duplex channel. One side is bound by the
//!   provider, the other is connected by the consumer. Frames sent on one side
//!   arrive at the other in the order sent.
//! - [`StreamTransport`]: newline-delimited JSON over any async byte stream,
//!   used to reach providers living in another process.

mod error;
mod pair;
mod signal;
mod stream;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinHandle;

use crate::protocol::Frame;

pub use error::{TransportError, TransportResult};
pub use pair::{PairEndpoint, Side, TransportPair};
pub use signal::CloseSignal;
pub use stream::StreamTransport;

/// One end of a bidirectional frame channel
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver a frame to the peer. Fails with [`TransportError::Closed`]
    /// once either side has closed.
    async fn send(&self, frame: Frame) -> TransportResult<()>;

    /// Next frame from the peer, or `None` once the channel is closed
    async fn recv(&self) -> Option<Frame>;

    /// Close the channel. Idempotent.
    async fn close(&self);

    /// Resolves once the channel is closed
    async fn closed(&self);

    fn is_closed(&self) -> bool;
}

/// Register a receive handler.
///
/// Spawns a task that hands every inbound frame to `handler`, one at a time
/// and in arrival order, until the transport closes.
pub fn on_receive<F>(transport: Arc<dyn Transport>, mut handler: F) -> JoinHandle<()>
where
    F: FnMut(Frame) + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(frame) = transport.recv().await {
            handler(frame);
        }
    })
}
