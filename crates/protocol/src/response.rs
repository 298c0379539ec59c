//! Decoded responses and notifications, common to both transports.

use gw_domain::{AccessLevel, DatalogEntry, DeviceFunctions, DeviceMessage, PropertyValue, Status};
use serde::{Deserialize, Serialize};

/// Successful authorization handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authorized {
    pub access_level: AccessLevel,
    pub gateway_version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Enumerated {
    pub status: Status,
    pub device_count: u32,
}

/// Topology description. The payload schema belongs to the gateway; it is
/// handed through untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Description {
    pub status: Status,
    pub id: Option<String>,
    pub description: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertiesFound {
    pub status: Status,
    /// The search pattern echoed back.
    pub id: String,
    pub count: u32,
    pub include_virtual: Option<bool>,
    pub functions: Option<DeviceFunctions>,
    pub properties: Vec<String>,
}

/// Result of reading one property; also the element type of batch reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyRead {
    pub status: Status,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<PropertyValue>,
}

/// Status for a single property id. Used for write, subscribe and
/// unsubscribe responses and the elements of their batch forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyStatus {
    pub status: Status,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertiesRead {
    pub status: Status,
    pub results: Vec<PropertyRead>,
}

/// Batch subscribe/unsubscribe outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertiesStatus {
    pub status: Status,
    pub results: Vec<PropertyStatus>,
}

/// Unsolicited push of a subscribed property's new value.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyUpdate {
    pub id: String,
    pub value: PropertyValue,
}

/// Properties that have datalog history on the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatalogProperties {
    pub status: Status,
    pub properties: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Datalog {
    pub status: Status,
    pub id: String,
    pub count: u32,
    pub values: Vec<DatalogEntry>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessagesRead {
    pub status: Status,
    pub count: u32,
    pub messages: Vec<DeviceMessage>,
}
