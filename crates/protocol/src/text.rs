//! Text frame codec used over WebSocket.
//!
//! ```text
//! <COMMAND>\n
//! [<key>:<value>\n]*
//! \n
//! [<body>]\n
//! ```
//!
//! Header values may themselves contain colons (ISO-8601 timestamps), so a
//! header line is split on its first colon only.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use gw_domain::{
    AccessLevel, DatalogEntry, DescriptionFlags, DeviceFunctions, DeviceMessage, PropertyValue,
    ProtocolError, Result, Status, WriteFlags, PROTOCOL_VERSION,
};

use crate::response::*;

/// Command keywords, requests first then responses and pushes.
pub mod command {
    pub const AUTHORIZE: &str = "AUTHORIZE";
    pub const ENUMERATE: &str = "ENUMERATE";
    pub const DESCRIBE: &str = "DESCRIBE";
    pub const FIND_PROPERTIES: &str = "FIND PROPERTIES";
    pub const READ_PROPERTY: &str = "READ PROPERTY";
    pub const READ_PROPERTIES: &str = "READ PROPERTIES";
    pub const WRITE_PROPERTY: &str = "WRITE PROPERTY";
    pub const SUBSCRIBE_PROPERTY: &str = "SUBSCRIBE PROPERTY";
    pub const SUBSCRIBE_PROPERTIES: &str = "SUBSCRIBE PROPERTIES";
    pub const UNSUBSCRIBE_PROPERTY: &str = "UNSUBSCRIBE PROPERTY";
    pub const UNSUBSCRIBE_PROPERTIES: &str = "UNSUBSCRIBE PROPERTIES";
    pub const READ_DATALOG: &str = "READ DATALOG";
    pub const READ_MESSAGES: &str = "READ MESSAGES";

    pub const AUTHORIZED: &str = "AUTHORIZED";
    pub const ENUMERATED: &str = "ENUMERATED";
    pub const DESCRIPTION: &str = "DESCRIPTION";
    pub const PROPERTIES_FOUND: &str = "PROPERTIES FOUND";
    pub const PROPERTY_READ: &str = "PROPERTY READ";
    pub const PROPERTIES_READ: &str = "PROPERTIES READ";
    pub const PROPERTY_WRITTEN: &str = "PROPERTY WRITTEN";
    pub const PROPERTY_SUBSCRIBED: &str = "PROPERTY SUBSCRIBED";
    pub const PROPERTIES_SUBSCRIBED: &str = "PROPERTIES SUBSCRIBED";
    pub const PROPERTY_UNSUBSCRIBED: &str = "PROPERTY UNSUBSCRIBED";
    pub const PROPERTIES_UNSUBSCRIBED: &str = "PROPERTIES UNSUBSCRIBED";
    pub const PROPERTY_UPDATE: &str = "PROPERTY UPDATE";
    pub const DATALOG_READ: &str = "DATALOG READ";
    pub const MESSAGES_READ: &str = "MESSAGES READ";
    pub const DEVICE_MESSAGE: &str = "DEVICE MESSAGE";
    pub const ERROR: &str = "ERROR";
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Frame
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextFrame {
    pub command: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl TextFrame {
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }
}

/// Render a frame. Headers are written in the given order.
pub fn encode_frame(command: &str, headers: &[(&str, String)], body: &str) -> String {
    let mut frame = String::with_capacity(command.len() + body.len() + 32);
    frame.push_str(command);
    frame.push('\n');
    for (key, value) in headers {
        frame.push_str(key);
        frame.push(':');
        frame.push_str(value);
        frame.push('\n');
    }
    frame.push('\n');
    frame.push_str(body);
    frame.push('\n');
    frame
}

/// Split raw frame text into command, headers and body.
pub fn decode_frame(raw: &str) -> Result<TextFrame> {
    let lines: Vec<&str> = raw.split('\n').collect();
    if lines.len() < 2 {
        return Err(ProtocolError::new("Invalid frame"));
    }

    let mut headers = HashMap::new();
    let mut i = 1;
    while i < lines.len() && !lines[i].is_empty() {
        if let Some((key, value)) = lines[i].split_once(':') {
            headers.insert(key.to_string(), value.to_string());
        }
        i += 1;
    }

    let body = lines[i..]
        .iter()
        .filter(|line| !line.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("\n");

    Ok(TextFrame {
        command: lines[0].to_string(),
        headers,
        body,
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request encoders
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Credentials are only sent when both user and password are given.
pub fn encode_authorize(user: Option<&str>, password: Option<&str>) -> String {
    let mut headers = Vec::with_capacity(3);
    if let (Some(user), Some(password)) = (user, password) {
        headers.push(("user", user.to_string()));
        headers.push(("password", password.to_string()));
    }
    headers.push(("protocol_version", PROTOCOL_VERSION.to_string()));
    encode_frame(command::AUTHORIZE, &headers, "")
}

pub fn encode_enumerate() -> String {
    encode_frame(command::ENUMERATE, &[], "")
}

/// `id` is composed as `access[.device[.property]]`; a device without an
/// access id (or a property without a device) is dropped.
pub fn encode_describe(
    access_id: Option<&str>,
    device_id: Option<&str>,
    property_id: Option<u32>,
    flags: Option<DescriptionFlags>,
) -> String {
    let mut headers = Vec::with_capacity(2);
    if let Some(id) = describe_id(access_id, device_id, property_id) {
        headers.push(("id", id));
    }
    if let Some(flags) = flags.filter(|f| !f.is_empty()) {
        headers.push(("flags", flags.to_wire()));
    }
    encode_frame(command::DESCRIBE, &headers, "")
}

pub(crate) fn describe_id(
    access_id: Option<&str>,
    device_id: Option<&str>,
    property_id: Option<u32>,
) -> Option<String> {
    let mut id = access_id?.to_string();
    if let Some(device_id) = device_id {
        id.push('.');
        id.push_str(device_id);
        if let Some(property_id) = property_id {
            id.push('.');
            id.push_str(&property_id.to_string());
        }
    }
    Some(id)
}

pub fn encode_find_properties(
    pattern: &str,
    include_virtual: Option<bool>,
    functions: Option<DeviceFunctions>,
) -> String {
    let mut headers = vec![("id", pattern.to_string())];
    if let Some(v) = include_virtual {
        headers.push(("virtual", v.to_string()));
    }
    if let Some(functions) = functions {
        headers.push(("functions", functions.to_wire()));
    }
    encode_frame(command::FIND_PROPERTIES, &headers, "")
}

pub fn encode_read_property(id: &str) -> String {
    encode_frame(command::READ_PROPERTY, &[("id", id.to_string())], "")
}

pub fn encode_read_properties(ids: &[String]) -> Result<String> {
    Ok(encode_frame(command::READ_PROPERTIES, &[], &serde_json::to_string(ids)?))
}

pub fn encode_write_property(
    id: &str,
    value: Option<&PropertyValue>,
    flags: Option<WriteFlags>,
) -> String {
    let mut headers = vec![("id", id.to_string())];
    if let Some(flags) = flags {
        headers.push(("flags", flags.to_wire()));
    }
    if let Some(value) = value {
        headers.push(("value", value.to_string()));
    }
    encode_frame(command::WRITE_PROPERTY, &headers, "")
}

pub fn encode_subscribe_property(id: &str) -> String {
    encode_frame(command::SUBSCRIBE_PROPERTY, &[("id", id.to_string())], "")
}

pub fn encode_subscribe_properties(ids: &[String]) -> Result<String> {
    Ok(encode_frame(command::SUBSCRIBE_PROPERTIES, &[], &serde_json::to_string(ids)?))
}

pub fn encode_unsubscribe_property(id: &str) -> String {
    encode_frame(command::UNSUBSCRIBE_PROPERTY, &[("id", id.to_string())], "")
}

pub fn encode_unsubscribe_properties(ids: &[String]) -> Result<String> {
    Ok(encode_frame(command::UNSUBSCRIBE_PROPERTIES, &[], &serde_json::to_string(ids)?))
}

/// Without an `id` the gateway answers with the list of logged properties.
pub fn encode_read_datalog(
    id: Option<&str>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    limit: Option<u32>,
) -> String {
    let mut headers = Vec::with_capacity(4);
    if let Some(id) = id {
        headers.push(("id", id.to_string()));
    }
    push_range(&mut headers, from, to, limit);
    encode_frame(command::READ_DATALOG, &headers, "")
}

pub fn encode_read_messages(
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    limit: Option<u32>,
) -> String {
    let mut headers = Vec::with_capacity(3);
    push_range(&mut headers, from, to, limit);
    encode_frame(command::READ_MESSAGES, &headers, "")
}

fn push_range(
    headers: &mut Vec<(&str, String)>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    limit: Option<u32>,
) {
    if let Some(from) = from {
        headers.push(("from", timestamp(from)));
    }
    if let Some(to) = to {
        headers.push(("to", timestamp(to)));
    }
    if let Some(limit) = limit {
        headers.push(("limit", limit.to_string()));
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response decoders
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Accept `frame` only if it carries `expected` and every required header.
/// An `ERROR` frame surfaces its reason; anything else is a generic failure
/// for `operation`.
fn expect(frame: &TextFrame, expected: &str, required: &[&str], operation: &str) -> Result<()> {
    if frame.command == expected && required.iter().all(|h| frame.headers.contains_key(*h)) {
        return Ok(());
    }
    if frame.command == command::ERROR {
        if let Some(reason) = frame.header("reason") {
            return Err(ProtocolError::new(reason));
        }
    }
    Err(ProtocolError::unknown_during(operation))
}

fn status(frame: &TextFrame) -> Status {
    frame.header("status").map(Status::from_wire_name).unwrap_or(Status::Error)
}

fn required<'a>(frame: &'a TextFrame, key: &str, operation: &str) -> Result<&'a str> {
    frame
        .header(key)
        .ok_or_else(|| ProtocolError::unknown_during(operation))
}

fn required_u32(frame: &TextFrame, key: &str, operation: &str) -> Result<u32> {
    required(frame, key, operation)?
        .trim()
        .parse()
        .map_err(|_| ProtocolError::unknown_during(operation))
}

/// JSON list bodies only carry data on success.
fn json_list<T: serde::de::DeserializeOwned>(frame: &TextFrame, status: Status) -> Result<Vec<T>> {
    if !status.is_success() || frame.body.is_empty() {
        return Ok(Vec::new());
    }
    Ok(serde_json::from_str(&frame.body)?)
}

fn parse_timestamp(raw: &str, operation: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| ProtocolError::unknown_during(operation))
}

pub fn decode_authorized(frame: &TextFrame) -> Result<Authorized> {
    const OP: &str = "authorization";
    expect(
        frame,
        command::AUTHORIZED,
        &["access_level", "protocol_version", "gateway_version"],
        OP,
    )?;
    let version = required(frame, "protocol_version", OP)?;
    if version.trim().parse::<u32>().ok() != Some(PROTOCOL_VERSION) {
        return Err(ProtocolError::new(format!(
            "protocol version {version} not supported"
        )));
    }
    Ok(Authorized {
        access_level: AccessLevel::from_wire_name(required(frame, "access_level", OP)?),
        gateway_version: required(frame, "gateway_version", OP)?.to_string(),
    })
}

pub fn decode_enumerated(frame: &TextFrame) -> Result<Enumerated> {
    const OP: &str = "enumeration";
    expect(frame, command::ENUMERATED, &["status", "device_count"], OP)?;
    Ok(Enumerated {
        status: status(frame),
        device_count: required_u32(frame, "device_count", OP)?,
    })
}

pub fn decode_description(frame: &TextFrame) -> Result<Description> {
    expect(frame, command::DESCRIPTION, &["status"], "description")?;
    let status = status(frame);
    let description = if status.is_success() && !frame.body.is_empty() {
        serde_json::from_str(&frame.body)?
    } else {
        serde_json::Value::Null
    };
    Ok(Description {
        status,
        id: frame.header("id").map(str::to_string),
        description,
    })
}

pub fn decode_properties_found(frame: &TextFrame) -> Result<PropertiesFound> {
    const OP: &str = "find properties";
    expect(frame, command::PROPERTIES_FOUND, &["status", "id", "count"], OP)?;
    let status = status(frame);
    Ok(PropertiesFound {
        status,
        id: required(frame, "id", OP)?.to_string(),
        count: required_u32(frame, "count", OP)?,
        include_virtual: frame.header("virtual").map(|v| v == "true"),
        functions: frame.header("functions").map(DeviceFunctions::from_wire),
        properties: json_list(frame, status)?,
    })
}

pub fn decode_property_read(frame: &TextFrame) -> Result<PropertyRead> {
    const OP: &str = "property read";
    expect(frame, command::PROPERTY_READ, &["status", "id"], OP)?;
    Ok(PropertyRead {
        status: status(frame),
        id: required(frame, "id", OP)?.to_string(),
        value: frame.header("value").map(PropertyValue::from_text),
    })
}

pub fn decode_properties_read(frame: &TextFrame) -> Result<PropertiesRead> {
    expect(frame, command::PROPERTIES_READ, &["status"], "properties read")?;
    let status = status(frame);
    Ok(PropertiesRead {
        status,
        results: json_list(frame, status)?,
    })
}

fn decode_property_status(frame: &TextFrame, expected: &str, operation: &str) -> Result<PropertyStatus> {
    expect(frame, expected, &["status", "id"], operation)?;
    Ok(PropertyStatus {
        status: status(frame),
        id: required(frame, "id", operation)?.to_string(),
    })
}

fn decode_properties_status(frame: &TextFrame, expected: &str, operation: &str) -> Result<PropertiesStatus> {
    expect(frame, expected, &["status"], operation)?;
    let status = status(frame);
    Ok(PropertiesStatus {
        status,
        results: json_list(frame, status)?,
    })
}

pub fn decode_property_written(frame: &TextFrame) -> Result<PropertyStatus> {
    decode_property_status(frame, command::PROPERTY_WRITTEN, "property write")
}

pub fn decode_property_subscribed(frame: &TextFrame) -> Result<PropertyStatus> {
    decode_property_status(frame, command::PROPERTY_SUBSCRIBED, "property subscribe")
}

pub fn decode_properties_subscribed(frame: &TextFrame) -> Result<PropertiesStatus> {
    decode_properties_status(frame, command::PROPERTIES_SUBSCRIBED, "properties subscribe")
}

pub fn decode_property_unsubscribed(frame: &TextFrame) -> Result<PropertyStatus> {
    decode_property_status(frame, command::PROPERTY_UNSUBSCRIBED, "property unsubscribe")
}

pub fn decode_properties_unsubscribed(frame: &TextFrame) -> Result<PropertiesStatus> {
    decode_properties_status(frame, command::PROPERTIES_UNSUBSCRIBED, "properties unsubscribe")
}

pub fn decode_property_update(frame: &TextFrame) -> Result<PropertyUpdate> {
    const OP: &str = "property update";
    expect(frame, command::PROPERTY_UPDATE, &["id", "value"], OP)?;
    Ok(PropertyUpdate {
        id: required(frame, "id", OP)?.to_string(),
        value: PropertyValue::from_text(required(frame, "value", OP)?),
    })
}

/// `DATALOG READ` without an `id` header: one property id per body line.
pub fn decode_datalog_properties_read(frame: &TextFrame) -> Result<DatalogProperties> {
    expect(frame, command::DATALOG_READ, &["status"], "datalog read")?;
    let status = status(frame);
    let properties = if status.is_success() {
        frame.body.lines().map(str::to_string).collect()
    } else {
        Vec::new()
    };
    Ok(DatalogProperties { status, properties })
}

/// `DATALOG READ` for one property: one `timestamp,value` line per entry.
pub fn decode_datalog_read(frame: &TextFrame) -> Result<Datalog> {
    const OP: &str = "datalog read";
    expect(frame, command::DATALOG_READ, &["status", "id", "count"], OP)?;
    let status = status(frame);
    let mut values = Vec::new();
    if status.is_success() {
        for line in frame.body.lines() {
            let (ts, value) = line
                .split_once(',')
                .ok_or_else(|| ProtocolError::unknown_during(OP))?;
            values.push(DatalogEntry {
                timestamp: parse_timestamp(ts, OP)?,
                value: PropertyValue::from_text(value),
            });
        }
    }
    Ok(Datalog {
        status,
        id: required(frame, "id", OP)?.to_string(),
        count: required_u32(frame, "count", OP)?,
        values,
    })
}

pub fn decode_messages_read(frame: &TextFrame) -> Result<MessagesRead> {
    const OP: &str = "messages read";
    expect(frame, command::MESSAGES_READ, &["status", "count"], OP)?;
    let status = status(frame);
    Ok(MessagesRead {
        status,
        count: required_u32(frame, "count", OP)?,
        messages: json_list(frame, status)?,
    })
}

pub fn decode_device_message(frame: &TextFrame) -> Result<DeviceMessage> {
    const OP: &str = "device message";
    expect(
        frame,
        command::DEVICE_MESSAGE,
        &["access_id", "device_id", "message_id", "message", "timestamp"],
        OP,
    )?;
    Ok(DeviceMessage {
        timestamp: parse_timestamp(required(frame, "timestamp", OP)?, OP)?,
        access_id: required(frame, "access_id", OP)?.to_string(),
        device_id: required(frame, "device_id", OP)?.to_string(),
        message_id: required_u32(frame, "message_id", OP)?,
        message: required(frame, "message", OP)?.to_string(),
    })
}

/// Reason carried by a generic `ERROR` frame.
pub fn decode_error(frame: &TextFrame) -> ProtocolError {
    match frame.header("reason") {
        Some(reason) if frame.command == command::ERROR => ProtocolError::new(reason),
        _ => ProtocolError::new("unknown error"),
    }
}
