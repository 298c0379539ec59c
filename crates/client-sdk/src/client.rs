//! Operations both transports support.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use gw_domain::{AccessLevel, ConnectionState, DescriptionFlags, PropertyValue, Result, WriteFlags};

use crate::callbacks::GatewayCallbacks;

/// The capability set shared by [`WebSocketClient`](crate::WebSocketClient)
/// and [`BluetoothClient`](crate::BluetoothClient).
///
/// `connect` is not part of it: what it needs (host and port, or nothing but
/// credentials) depends on the transport. Operations that only the text
/// protocol has stay inherent methods of the WebSocket client.
///
/// Every request fails with `invalid client state` unless the client is
/// `Connected`; the response arrives later through [`GatewayCallbacks`].
pub trait GatewayClient {
    fn set_callback(&mut self, callback: Arc<dyn GatewayCallbacks>);

    fn state(&self) -> ConnectionState;

    fn access_level(&self) -> AccessLevel;

    fn gateway_version(&self) -> Option<&str>;

    /// Close the transport; `on_disconnected` follows once it has closed.
    fn disconnect(&mut self) -> Result<()>;

    fn enumerate(&mut self) -> Result<()>;

    /// Describe the whole installation, one device access, one device or one
    /// property, depending on how much of the id is given.
    fn describe(
        &mut self,
        access_id: Option<&str>,
        device_id: Option<&str>,
        property_id: Option<u32>,
        flags: Option<DescriptionFlags>,
    ) -> Result<()>;

    fn read_property(&mut self, property_id: &str) -> Result<()>;

    /// Without a value the gateway performs the property's write action.
    fn write_property(
        &mut self,
        property_id: &str,
        value: Option<&PropertyValue>,
        flags: Option<WriteFlags>,
    ) -> Result<()>;

    fn subscribe_to_property(&mut self, property_id: &str) -> Result<()>;

    fn unsubscribe_from_property(&mut self, property_id: &str) -> Result<()>;

    /// List the properties that have datalog history.
    fn read_datalog_properties(
        &mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<()>;

    fn read_datalog(
        &mut self,
        property_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: Option<u32>,
    ) -> Result<()>;

    fn read_messages(
        &mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: Option<u32>,
    ) -> Result<()>;
}
