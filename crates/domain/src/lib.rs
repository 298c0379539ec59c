//! `gw-domain`: types shared by both gateway transports.
//!
//! Enums and value objects carried by the text and binary codecs, the
//! single [`ProtocolError`] kind, and client configuration.

pub mod config;
pub mod error;
pub mod flags;
pub mod types;
pub mod value;

pub use error::{ProtocolError, Result};
pub use flags::{DescriptionFlags, DeviceFunctions, WriteFlags};
pub use types::{AccessLevel, ConnectionState, Status};
pub use value::{DatalogEntry, DeviceMessage, PropertyValue};

/// Protocol version this client speaks; any other version in the
/// authorization response is rejected.
pub const PROTOCOL_VERSION: u32 = 1;

/// Default port of the gateway's WebSocket endpoint.
pub const DEFAULT_PORT: u16 = 1987;
