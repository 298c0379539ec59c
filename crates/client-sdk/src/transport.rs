//! Transport capabilities the clients drive, and the events they consume.
//!
//! Clients never do I/O themselves. They call `open`/`send`/`close` on a
//! transport and the application feeds whatever the transport reports back
//! into `handle_event`, in arrival order.

use std::time::Duration;

use gw_domain::Result;

/// Something that happened on the underlying channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent<M> {
    /// The channel is open and ready for the authorization request.
    Opened,
    /// One inbound message: a text frame, or one BLE notification.
    Message(M),
    /// The channel closed, by either side. Always the last event.
    Closed,
    /// A channel-level failure. A `Closed` event follows if the channel died.
    Error(String),
    /// The connection attempt did not complete in time.
    TimedOut,
}

/// A text-frame channel (WebSocket).
pub trait TextTransport {
    /// Start connecting to `url`. Must report `Opened`, or `TimedOut` once
    /// `timeout` elapses, followed by `Closed` on failure.
    fn open(&mut self, url: &str, timeout: Duration) -> Result<()>;

    fn send(&mut self, frame: String) -> Result<()>;

    fn close(&mut self);
}

/// A GATT channel to the gateway (Bluetooth LE).
///
/// `open` covers platform device selection and subscribing to the RX
/// characteristic; `write` sends one fragment to the TX characteristic.
pub trait BluetoothTransport {
    fn open(&mut self) -> Result<()>;

    fn write(&mut self, fragment: Vec<u8>) -> Result<()>;

    fn close(&mut self);
}
