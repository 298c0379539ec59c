//! tokio-tungstenite implementation of [`TextTransport`].
//!
//! Socket I/O runs on a spawned task; everything it observes comes back as
//! [`TransportEvent`]s on an unbounded channel, in wire order. The
//! application owns the loop that feeds those events into the client:
//!
//! ```rust,no_run
//! # async fn run() -> gw_domain::Result<()> {
//! use std::time::Duration;
//! use gw_client::{GatewayClient, TungsteniteTransport};
//! use gw_domain::ConnectionState;
//!
//! let (mut client, mut events) = TungsteniteTransport::client();
//! client.connect("127.0.0.1", 1987, None, None, Duration::from_secs(5))?;
//! while let Some(event) = events.recv().await {
//!     client.handle_event(event);
//!     if client.state() == ConnectionState::Disconnected {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gw_domain::Result;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::error::ClientError;
use crate::transport::{TextTransport, TransportEvent};
use crate::ws_client::WebSocketClient;

pub type EventReceiver = mpsc::UnboundedReceiver<TransportEvent<String>>;

/// WebSocket transport backed by a tokio task per connection.
///
/// `open` must be called from within a tokio runtime.
pub struct TungsteniteTransport {
    events: mpsc::UnboundedSender<TransportEvent<String>>,
    outbound: Option<mpsc::UnboundedSender<String>>,
    shutdown: Option<CancellationToken>,
}

impl TungsteniteTransport {
    pub fn new() -> (Self, EventReceiver) {
        let (events, rx) = mpsc::unbounded_channel();
        (
            Self {
                events,
                outbound: None,
                shutdown: None,
            },
            rx,
        )
    }

    /// A [`WebSocketClient`] wired to a fresh transport.
    pub fn client() -> (WebSocketClient<Self>, EventReceiver) {
        let (transport, events) = Self::new();
        (WebSocketClient::new(transport), events)
    }
}

impl TextTransport for TungsteniteTransport {
    fn open(&mut self, url: &str, timeout: Duration) -> Result<()> {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| ClientError::NoRuntime(e.to_string()))?;

        // Drop whatever is left of a previous connection.
        self.close();

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        handle.spawn(run_connection(
            url.to_string(),
            timeout,
            self.events.clone(),
            outbound_rx,
            shutdown.clone(),
        ));

        self.outbound = Some(outbound_tx);
        self.shutdown = Some(shutdown);
        Ok(())
    }

    fn send(&mut self, frame: String) -> Result<()> {
        let outbound = self.outbound.as_ref().ok_or(ClientError::Closed)?;
        outbound.send(frame).map_err(|_| ClientError::Closed)?;
        Ok(())
    }

    fn close(&mut self) {
        self.outbound = None;
        if let Some(shutdown) = self.shutdown.take() {
            shutdown.cancel();
        }
    }
}

impl Drop for TungsteniteTransport {
    fn drop(&mut self) {
        self.close();
    }
}

/// One connection lifecycle. Always ends with `Closed`.
async fn run_connection(
    url: String,
    timeout: Duration,
    events: mpsc::UnboundedSender<TransportEvent<String>>,
    mut outbound: mpsc::UnboundedReceiver<String>,
    shutdown: CancellationToken,
) {
    match drive(&url, timeout, &events, &mut outbound, &shutdown).await {
        Ok(()) => {}
        Err(ClientError::Timeout) => {
            let _ = events.send(TransportEvent::TimedOut);
        }
        Err(e) => {
            tracing::debug!(url = %url, error = %e, "websocket connection failed");
            let _ = events.send(TransportEvent::Error(e.to_string()));
        }
    }
    let _ = events.send(TransportEvent::Closed);
}

async fn drive(
    url: &str,
    timeout: Duration,
    events: &mpsc::UnboundedSender<TransportEvent<String>>,
    outbound: &mut mpsc::UnboundedReceiver<String>,
    shutdown: &CancellationToken,
) -> std::result::Result<(), ClientError> {
    let connected = tokio::select! {
        _ = shutdown.cancelled() => return Ok(()),
        r = tokio::time::timeout(timeout, tokio_tungstenite::connect_async(url)) => r,
    };
    let (ws, _response) = connected.map_err(|_| ClientError::Timeout)??;
    let (mut sink, mut stream) = ws.split();
    let _ = events.send(TransportEvent::Opened);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                let _ = sink.close().await;
                return Ok(());
            }
            frame = outbound.recv() => match frame {
                Some(frame) => sink.send(Message::Text(frame)).await?,
                None => {
                    let _ = sink.close().await;
                    return Ok(());
                }
            },
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(TransportEvent::Message(text));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(()),
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
        }
    }
}
