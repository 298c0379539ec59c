//! Gateway wire protocol: the text (WebSocket) frame codec, the binary
//! (Bluetooth LE) CBOR codec with its fragmentation layer, and the typed
//! responses both codecs decode into.
//!
//! The two encodings deliberately share no frame type: they differ in
//! framing, timestamps, value typing and even operation coverage. What they
//! share is the decoded shape in [`response`].

pub mod bluetooth;
pub mod fragment;
pub mod response;
pub mod text;

pub use gw_domain::{ProtocolError, Result, PROTOCOL_VERSION};
pub use response::*;
