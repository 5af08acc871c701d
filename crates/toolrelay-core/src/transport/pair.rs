//! In-process duplex channel

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::{CloseSignal, Transport, TransportError, TransportResult};
use crate::protocol::Frame;

/// Which end of a [`TransportPair`] an endpoint belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Server,
    Client,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Server => write!(f, "server"),
            Side::Client => write!(f, "client"),
        }
    }
}

/// A duplex channel with exactly one server side and one client side.
///
/// Lifecycle: unbound, then bound (after [`bind`](Self::bind)), then
/// connected (after [`connect_client`](Self::connect_client)), then closed.
/// Closing either endpoint closes both.
///
/// ```rust,ignore
/// let pair = TransportPair::new();
/// let server = pair.bind()?;
/// let client = pair.connect_client()?;
/// client.send(frame).await?;
/// let received = server.recv().await;
/// ```
pub struct TransportPair {
    slots: Mutex<Slots>,
    signal: CloseSignal,
}

struct Slots {
    server: Option<PairEndpoint>,
    client: Option<PairEndpoint>,
}

impl Default for TransportPair {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportPair {
    pub fn new() -> Self {
        let signal = CloseSignal::new();
        let (to_client_tx, to_client_rx) = mpsc::unbounded_channel();
        let (to_server_tx, to_server_rx) = mpsc::unbounded_channel();

        let server = PairEndpoint::new(Side::Server, to_client_tx, to_server_rx, signal.clone());
        let client = PairEndpoint::new(Side::Client, to_server_tx, to_client_rx, signal.clone());

        Self {
            slots: Mutex::new(Slots {
                server: Some(server),
                client: Some(client),
            }),
            signal,
        }
    }

    /// Take the server side. Allowed once.
    pub fn bind(&self) -> TransportResult<PairEndpoint> {
        if self.signal.is_closed() {
            return Err(TransportError::Closed);
        }
        self.slots
            .lock()
            .server
            .take()
            .ok_or(TransportError::AlreadyBound)
    }

    /// Take the client side. Requires a prior [`bind`](Self::bind); allowed once.
    pub fn connect_client(&self) -> TransportResult<PairEndpoint> {
        if self.signal.is_closed() {
            return Err(TransportError::Closed);
        }
        let mut slots = self.slots.lock();
        if slots.server.is_some() {
            return Err(TransportError::NotReady);
        }
        slots.client.take().ok_or(TransportError::AlreadyConnected)
    }

    /// Close both sides
    pub fn close(&self) {
        self.signal.close();
    }

    pub fn is_closed(&self) -> bool {
        self.signal.is_closed()
    }
}

/// One side of a [`TransportPair`]
pub struct PairEndpoint {
    side: Side,
    outbound: mpsc::UnboundedSender<Frame>,
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<Frame>>,
    signal: CloseSignal,
}

impl PairEndpoint {
    fn new(
        side: Side,
        outbound: mpsc::UnboundedSender<Frame>,
        inbound: mpsc::UnboundedReceiver<Frame>,
        signal: CloseSignal,
    ) -> Self {
        Self {
            side,
            outbound,
            inbound: tokio::sync::Mutex::new(inbound),
            signal,
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }
}

#[async_trait]
impl Transport for PairEndpoint {
    async fn send(&self, frame: Frame) -> TransportResult<()> {
        if self.signal.is_closed() {
            return Err(TransportError::Closed);
        }
        // Fails only when the peer endpoint was dropped
        self.outbound.send(frame).map_err(|_| TransportError::Closed)
    }

    /// Frames accepted before the pair closed are still delivered; `None`
    /// only once the queue is drained.
    async fn recv(&self) -> Option<Frame> {
        let mut inbound = self.inbound.lock().await;
        if let Ok(frame) = inbound.try_recv() {
            return Some(frame);
        }
        tokio::select! {
            biased;
            frame = inbound.recv() => frame,
            _ = self.signal.closed() => inbound.try_recv().ok(),
        }
    }

    async fn close(&self) {
        self.signal.close();
    }

    async fn closed(&self) {
        self.signal.closed().await;
    }

    fn is_closed(&self) -> bool {
        self.signal.is_closed()
    }
}

impl std::fmt::Debug for PairEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PairEndpoint")
            .field("side", &self.side)
            .field("closed", &self.signal.is_closed())
            .finish()
    }
}
