//! Mock transports and a recording callback for state-machine tests.

use std::sync::Mutex;
use std::time::Duration;

use gw_domain::{AccessLevel, DatalogEntry, DeviceMessage, PropertyValue, Result, Status};
use gw_protocol::{PropertiesFound, PropertyRead, PropertyStatus};

use crate::callbacks::GatewayCallbacks;
use crate::transport::{BluetoothTransport, TextTransport};

#[derive(Debug, Default)]
pub struct MockTextTransport {
    pub opened_url: Option<String>,
    pub timeout: Option<Duration>,
    pub sent: Vec<String>,
    pub closed: bool,
}

impl TextTransport for MockTextTransport {
    fn open(&mut self, url: &str, timeout: Duration) -> Result<()> {
        self.opened_url = Some(url.to_string());
        self.timeout = Some(timeout);
        self.closed = false;
        Ok(())
    }

    fn send(&mut self, frame: String) -> Result<()> {
        self.sent.push(frame);
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[derive(Debug, Default)]
pub struct MockBluetoothTransport {
    pub opened: bool,
    pub written: Vec<Vec<u8>>,
    pub closed: bool,
}

impl BluetoothTransport for MockBluetoothTransport {
    fn open(&mut self) -> Result<()> {
        self.opened = true;
        self.closed = false;
        Ok(())
    }

    fn write(&mut self, fragment: Vec<u8>) -> Result<()> {
        self.written.push(fragment);
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

/// Records every callback as a short line, in call order.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    fn push(&self, line: String) {
        self.events.lock().unwrap().push(line);
    }
}

fn opt<T: std::fmt::Display>(v: Option<T>) -> String {
    v.map_or_else(|| "-".to_string(), |v| v.to_string())
}

impl GatewayCallbacks for Recorder {
    fn on_connected(&self, access_level: AccessLevel, gateway_version: &str) {
        self.push(format!("connected {access_level} {gateway_version}"));
    }

    fn on_disconnected(&self) {
        self.push("disconnected".into());
    }

    fn on_error(&self, reason: &str) {
        self.push(format!("error {reason}"));
    }

    fn on_enumerated(&self, status: Status, device_count: u32) {
        self.push(format!("enumerated {status} {device_count}"));
    }

    fn on_description(&self, status: Status, _description: &serde_json::Value, id: Option<&str>) {
        self.push(format!("description {status} {}", opt(id)));
    }

    fn on_properties_found(&self, found: &PropertiesFound) {
        self.push(format!("found {} {} {}", found.status, found.id, found.properties.len()));
    }

    fn on_property_read(&self, status: Status, property_id: &str, value: Option<&PropertyValue>) {
        self.push(format!("read {status} {property_id} {}", opt(value)));
    }

    fn on_properties_read(&self, status: Status, results: &[PropertyRead]) {
        self.push(format!("read many {status} {}", results.len()));
    }

    fn on_property_written(&self, status: Status, property_id: &str) {
        self.push(format!("written {status} {property_id}"));
    }

    fn on_property_subscribed(&self, status: Status, property_id: &str) {
        self.push(format!("subscribed {status} {property_id}"));
    }

    fn on_properties_subscribed(&self, status: Status, results: &[PropertyStatus]) {
        self.push(format!("subscribed many {status} {}", results.len()));
    }

    fn on_property_unsubscribed(&self, status: Status, property_id: &str) {
        self.push(format!("unsubscribed {status} {property_id}"));
    }

    fn on_properties_unsubscribed(&self, status: Status, results: &[PropertyStatus]) {
        self.push(format!("unsubscribed many {status} {}", results.len()));
    }

    fn on_property_updated(&self, property_id: &str, value: &PropertyValue) {
        self.push(format!("updated {property_id} {value}"));
    }

    fn on_datalog_properties_read(&self, status: Status, properties: &[String]) {
        self.push(format!("datalog properties {status} {}", properties.len()));
    }

    fn on_datalog_read(&self, status: Status, property_id: &str, count: u32, _values: &[DatalogEntry]) {
        self.push(format!("datalog {status} {property_id} {count}"));
    }

    fn on_device_message(&self, message: &DeviceMessage) {
        self.push(format!(
            "device message {}.{} {} {}",
            message.access_id, message.device_id, message.message_id, message.message
        ));
    }

    fn on_messages_read(&self, status: Status, count: u32, _messages: &[DeviceMessage]) {
        self.push(format!("messages {status} {count}"));
    }
}
