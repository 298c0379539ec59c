//! `gw-client`: client state machines for talking to a gateway.
//!
//! A gateway is reachable over a WebSocket (text frames) or over Bluetooth LE
//! (fragmented CBOR frames). Both clients share one lifecycle and one
//! callback interface; they differ only in codec and transport.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Application                                                 │
//! │                                                              │
//! │   client.connect(..)?           ──▶  transport.open(..)      │
//! │   client.read_property(..)?     ──▶  transport.send(frame)   │
//! │                                                              │
//! │   transport event ──▶ client.handle_event(ev)                │
//! │                           └──▶ GatewayCallbacks::on_*(..)    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The clients never do I/O on their own and hold no locks. Requests are
//! fire-and-forget; responses arrive through [`GatewayCallbacks`].
//!
//! # Connection flow
//!
//! 1. `connect` opens the transport (`Disconnected → Connecting`)
//! 2. On `Opened`, send the authorization request (`→ Authorizing`)
//! 3. On the authorization response, check the protocol version
//!    (`→ Connected`, or back to `Disconnected` on failure)
//! 4. While connected, every inbound frame is dispatched to one callback
//! 5. On `Closed`, reset and report `on_disconnected`
//!
//! There is no automatic reconnect.

pub mod ble_client;
pub mod callbacks;
pub mod client;
pub mod driver;
pub mod error;
pub mod transport;
pub mod ws_client;

#[cfg(test)]
mod testing;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use ble_client::BluetoothClient;
pub use callbacks::GatewayCallbacks;
pub use client::GatewayClient;
pub use driver::{EventReceiver, TungsteniteTransport};
pub use error::ClientError;
pub use transport::{BluetoothTransport, TextTransport, TransportEvent};
pub use ws_client::WebSocketClient;

// Re-export protocol types so applications rarely need gw-protocol directly.
pub use gw_protocol::{PropertiesFound, PropertyRead, PropertyStatus};
