//! Transport of whole messages between the client and the server.
//!
//! The key exchange only deals with message payloads; the binary packet protocol (framing,
//! padding, encryption and MAC) is the business of the transport. The [`KexEngine`] can be driven
//! over a blocking [`Transport`] (using [`run_kex()`][crate::run_kex()]) or over an
//! [`AsyncTransport`] (using [`run_kex_async()`][crate::run_kex_async()]).
//!
//! [`KexEngine`]: crate::kex::KexEngine
use bytes::Bytes;
use std::future::Future;
use std::time::Duration;
use tokio::sync::mpsc;
use crate::error::{Error, Result};

/// Blocking transport of message payloads.
pub trait Transport {
    /// Sends a message to the peer.
    fn send(&mut self, payload: Bytes) -> Result<()>;

    /// Blocks until the next message from the peer is available.
    ///
    /// Fails with [`Error::ChannelClosed`] if the peer closed the channel or with
    /// [`Error::Timeout`] if the message did not arrive in time.
    fn recv(&mut self) -> Result<Bytes>;
}

/// Asynchronous transport of message payloads.
pub trait AsyncTransport {
    /// Sends a message to the peer.
    fn send(&mut self, payload: Bytes) -> impl Future<Output = Result<()>> + Send;

    /// Waits for the next message from the peer.
    ///
    /// Fails with [`Error::ChannelClosed`] if the peer closed the channel or with
    /// [`Error::Timeout`] if the message did not arrive in time.
    fn recv(&mut self) -> impl Future<Output = Result<Bytes>> + Send;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send(&mut self, payload: Bytes) -> Result<()> { (**self).send(payload) }
    fn recv(&mut self) -> Result<Bytes> { (**self).recv() }
}

/// In-memory transport over a pair of tokio channels.
///
/// This is useful to connect the client with a server that runs in the same process (e.g. in
/// tests), or to bridge the key exchange to a task that owns the real connection.
///
/// The receive timeout set by [`with_recv_timeout()`][Self::with_recv_timeout()] is applied by
/// the [`AsyncTransport`] implementation. The blocking [`Transport`] implementation waits
/// indefinitely and must not be used from within an async runtime.
#[derive(Debug)]
pub struct ChannelTransport {
    tx: mpsc::Sender<Bytes>,
    rx: mpsc::Receiver<Bytes>,
    recv_timeout: Option<Duration>,
}

impl ChannelTransport {
    /// Creates a transport that sends messages to `tx` and receives them from `rx`.
    pub fn new(tx: mpsc::Sender<Bytes>, rx: mpsc::Receiver<Bytes>) -> ChannelTransport {
        ChannelTransport { tx, rx, recv_timeout: None }
    }

    /// Creates two transports connected to each other.
    ///
    /// Each direction can buffer up to `buffer` messages.
    pub fn pair(buffer: usize) -> (ChannelTransport, ChannelTransport) {
        let (a_tx, b_rx) = mpsc::channel(buffer);
        let (b_tx, a_rx) = mpsc::channel(buffer);
        (ChannelTransport::new(a_tx, a_rx), ChannelTransport::new(b_tx, b_rx))
    }

    /// Fail with [`Error::Timeout`] when a message does not arrive within `timeout`.
    pub fn with_recv_timeout(mut self, timeout: Duration) -> ChannelTransport {
        self.recv_timeout = Some(timeout);
        self
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, payload: Bytes) -> Result<()> {
        self.tx.blocking_send(payload).map_err(|_| Error::ChannelClosed)
    }

    fn recv(&mut self) -> Result<Bytes> {
        self.rx.blocking_recv().ok_or(Error::ChannelClosed)
    }
}

impl AsyncTransport for ChannelTransport {
    async fn send(&mut self, payload: Bytes) -> Result<()> {
        self.tx.send(payload).await.map_err(|_| Error::ChannelClosed)
    }

    async fn recv(&mut self) -> Result<Bytes> {
        let payload = match self.recv_timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.rx.recv()).await
                .map_err(|_| Error::Timeout)?,
            None => self.rx.recv().await,
        };
        payload.ok_or(Error::ChannelClosed)
    }
}
