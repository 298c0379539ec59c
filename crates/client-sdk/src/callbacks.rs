//! The contract a client calls into when frames arrive.

use gw_domain::{AccessLevel, DatalogEntry, DeviceMessage, PropertyValue, Status};
use gw_protocol::{PropertiesFound, PropertyRead, PropertyStatus};

/// Implement this trait to receive connection events and responses.
///
/// Every method has an empty default, so implementors only override what
/// they care about. Gateway-side failures arrive here as a non-`Success`
/// [`Status`]; always check it.
///
/// Both clients share this trait. The Bluetooth client never calls the
/// property search or batch methods since its protocol has no such
/// operations.
///
/// # Example
///
/// ```rust,no_run
/// use gw_client::GatewayCallbacks;
/// use gw_domain::{PropertyValue, Status};
///
/// struct PrintValues;
///
/// impl GatewayCallbacks for PrintValues {
///     fn on_property_read(&self, status: Status, property_id: &str, value: Option<&PropertyValue>) {
///         println!("{property_id} [{status}] = {value:?}");
///     }
/// }
/// ```
#[allow(unused_variables)]
pub trait GatewayCallbacks: Send + Sync {
    /// Authorization succeeded; the client is now `Connected`.
    fn on_connected(&self, access_level: AccessLevel, gateway_version: &str) {}

    /// The transport closed, for whatever reason. Reported once per connection.
    fn on_disconnected(&self) {}

    fn on_error(&self, reason: &str) {}

    fn on_enumerated(&self, status: Status, device_count: u32) {}

    fn on_description(&self, status: Status, description: &serde_json::Value, id: Option<&str>) {}

    fn on_properties_found(&self, found: &PropertiesFound) {}

    fn on_property_read(&self, status: Status, property_id: &str, value: Option<&PropertyValue>) {}

    fn on_properties_read(&self, status: Status, results: &[PropertyRead]) {}

    fn on_property_written(&self, status: Status, property_id: &str) {}

    fn on_property_subscribed(&self, status: Status, property_id: &str) {}

    fn on_properties_subscribed(&self, status: Status, results: &[PropertyStatus]) {}

    fn on_property_unsubscribed(&self, status: Status, property_id: &str) {}

    fn on_properties_unsubscribed(&self, status: Status, results: &[PropertyStatus]) {}

    /// A subscribed property changed.
    fn on_property_updated(&self, property_id: &str, value: &PropertyValue) {}

    fn on_datalog_properties_read(&self, status: Status, properties: &[String]) {}

    fn on_datalog_read(&self, status: Status, property_id: &str, count: u32, values: &[DatalogEntry]) {}

    /// A device broadcast a message.
    fn on_device_message(&self, message: &DeviceMessage) {}

    fn on_messages_read(&self, status: Status, count: u32, messages: &[DeviceMessage]) {}
}
