//! Binary (CBOR sequence) codec used over Bluetooth LE.
//!
//! A frame is a plain concatenation of CBOR items, no length prefixes:
//! item 0 is the opcode, the rest are positional arguments. Responses carry
//! the request opcode with the high bit set.
//!
//! Timestamps on this transport are Unix epoch **seconds**.

use chrono::{DateTime, Utc};
use ciborium::Value;
use gw_domain::{
    AccessLevel, DatalogEntry, DescriptionFlags, DeviceMessage, PropertyValue, ProtocolError,
    Result, Status, WriteFlags, PROTOCOL_VERSION,
};

use crate::response::*;

/// GATT service exposing the gateway protocol.
pub const SERVICE_UUID: &str = "f3c2d800-8421-44b1-9655-0951992f313b";
/// Characteristic the client writes request fragments to.
pub const TX_CHARACTERISTIC_UUID: &str = "f3c2d801-8421-44b1-9655-0951992f313b";
/// Characteristic the gateway notifies response fragments on.
pub const RX_CHARACTERISTIC_UUID: &str = "f3c2d802-8421-44b1-9655-0951992f313b";

pub mod opcode {
    pub const AUTHORIZE: u8 = 0x01;
    pub const ENUMERATE: u8 = 0x02;
    pub const DESCRIBE: u8 = 0x03;
    pub const READ_PROPERTY: u8 = 0x04;
    pub const WRITE_PROPERTY: u8 = 0x05;
    pub const SUBSCRIBE_PROPERTY: u8 = 0x06;
    pub const UNSUBSCRIBE_PROPERTY: u8 = 0x07;
    pub const READ_DATALOG: u8 = 0x08;
    pub const READ_MESSAGES: u8 = 0x09;

    pub const AUTHORIZED: u8 = 0x81;
    pub const ENUMERATED: u8 = 0x82;
    pub const DESCRIPTION: u8 = 0x83;
    pub const PROPERTY_READ: u8 = 0x84;
    pub const PROPERTY_WRITTEN: u8 = 0x85;
    pub const PROPERTY_SUBSCRIBED: u8 = 0x86;
    pub const PROPERTY_UNSUBSCRIBED: u8 = 0x87;
    pub const DATALOG_READ: u8 = 0x88;
    pub const MESSAGES_READ: u8 = 0x89;

    pub const DEVICE_MESSAGE: u8 = 0xFD;
    pub const PROPERTY_UPDATE: u8 = 0xFE;
    pub const ERROR: u8 = 0xFF;
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryFrame {
    pub code: u8,
    pub sequence: Vec<Value>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Framing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub fn encode_frame(code: u8, args: &[Value]) -> Result<Vec<u8>> {
    let code = Value::Integer(code.into());
    let mut buf = Vec::new();
    for item in std::iter::once(&code).chain(args) {
        ciborium::into_writer(item, &mut buf)
            .map_err(|e| ProtocolError::new(format!("CBOR encode: {e:?}")))?;
    }
    Ok(buf)
}

/// Decode every CBOR item in `bytes`; the first must be an opcode.
pub fn decode_frame(bytes: &[u8]) -> Result<BinaryFrame> {
    let mut reader = bytes;
    let mut items = Vec::new();
    while !reader.is_empty() {
        let item: Value = ciborium::from_reader(&mut reader)
            .map_err(|e| ProtocolError::new(format!("CBOR decode: {e:?}")))?;
        items.push(item);
    }

    let mut items = items.into_iter();
    let code = match items.next() {
        Some(Value::Integer(i)) => u8::try_from(i128::from(i)).ok(),
        _ => None,
    }
    .ok_or_else(|| ProtocolError::new("Invalid frame"))?;

    Ok(BinaryFrame {
        code,
        sequence: items.collect(),
    })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Value mapping
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn text_or_null(s: Option<&str>) -> Value {
    s.map_or(Value::Null, |s| Value::Text(s.to_string()))
}

fn int(n: i64) -> Value {
    Value::Integer(n.into())
}

fn int_or_null(n: Option<i64>) -> Value {
    n.map_or(Value::Null, int)
}

fn epoch_seconds(t: Option<DateTime<Utc>>) -> Value {
    int_or_null(t.map(|t| t.timestamp()))
}

/// Whole numbers travel as CBOR integers, everything else as floats.
pub fn value_to_cbor(value: &PropertyValue) -> Value {
    match value {
        PropertyValue::Bool(b) => Value::Bool(*b),
        PropertyValue::Number(n)
            if n.fract() == 0.0 && *n >= i64::MIN as f64 && *n <= i64::MAX as f64 =>
        {
            int(*n as i64)
        }
        PropertyValue::Number(n) => Value::Float(*n),
        PropertyValue::Text(s) => Value::Text(s.clone()),
    }
}

pub fn value_from_cbor(value: &Value) -> Option<PropertyValue> {
    match value {
        Value::Bool(b) => Some(PropertyValue::Bool(*b)),
        Value::Integer(i) => Some(PropertyValue::Number(i128::from(*i) as f64)),
        Value::Float(f) => Some(PropertyValue::Number(*f)),
        Value::Text(s) => Some(PropertyValue::Text(s.clone())),
        _ => None,
    }
}

/// Structural conversion of an opaque CBOR payload to JSON so both transports
/// hand descriptions to the application in the same shape.
pub fn cbor_to_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as Json;
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Integer(i) => {
            let n = i128::from(*i);
            if let Ok(n) = i64::try_from(n) {
                Json::from(n)
            } else if let Ok(n) = u64::try_from(n) {
                Json::from(n)
            } else {
                Json::from(n as f64)
            }
        }
        Value::Float(f) => serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number),
        Value::Text(s) => Json::String(s.clone()),
        Value::Bytes(b) => Json::Array(b.iter().map(|x| Json::from(*x)).collect()),
        Value::Array(items) => Json::Array(items.iter().map(cbor_to_json).collect()),
        Value::Map(entries) => Json::Object(
            entries
                .iter()
                .map(|(k, v)| {
                    let key = match k {
                        Value::Text(s) => s.clone(),
                        other => cbor_to_json(other).to_string(),
                    };
                    (key, cbor_to_json(v))
                })
                .collect(),
        ),
        Value::Tag(_, inner) => cbor_to_json(inner),
        _ => Json::Null,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request encoders
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub fn encode_authorize(user: Option<&str>, password: Option<&str>) -> Result<Vec<u8>> {
    let (user, password) = match (user, password) {
        (Some(u), Some(p)) => (Some(u), Some(p)),
        _ => (None, None),
    };
    encode_frame(
        opcode::AUTHORIZE,
        &[
            text_or_null(user),
            text_or_null(password),
            int(PROTOCOL_VERSION.into()),
        ],
    )
}

pub fn encode_enumerate() -> Result<Vec<u8>> {
    encode_frame(opcode::ENUMERATE, &[])
}

pub fn encode_describe(
    access_id: Option<&str>,
    device_id: Option<&str>,
    property_id: Option<u32>,
    flags: Option<DescriptionFlags>,
) -> Result<Vec<u8>> {
    let id = crate::text::describe_id(access_id, device_id, property_id);
    encode_frame(
        opcode::DESCRIBE,
        &[
            text_or_null(id.as_deref()),
            int(flags.unwrap_or_default().bits().into()),
        ],
    )
}

pub fn encode_read_property(id: &str) -> Result<Vec<u8>> {
    encode_frame(opcode::READ_PROPERTY, &[Value::Text(id.to_string())])
}

pub fn encode_write_property(
    id: &str,
    value: Option<&PropertyValue>,
    flags: Option<WriteFlags>,
) -> Result<Vec<u8>> {
    encode_frame(
        opcode::WRITE_PROPERTY,
        &[
            Value::Text(id.to_string()),
            int(flags.unwrap_or_default().bits().into()),
            value.map_or(Value::Null, value_to_cbor),
        ],
    )
}

pub fn encode_subscribe_property(id: &str) -> Result<Vec<u8>> {
    encode_frame(opcode::SUBSCRIBE_PROPERTY, &[Value::Text(id.to_string())])
}

pub fn encode_unsubscribe_property(id: &str) -> Result<Vec<u8>> {
    encode_frame(opcode::UNSUBSCRIBE_PROPERTY, &[Value::Text(id.to_string())])
}

pub fn encode_read_datalog(
    id: Option<&str>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    limit: Option<u32>,
) -> Result<Vec<u8>> {
    encode_frame(
        opcode::READ_DATALOG,
        &[
            text_or_null(id),
            epoch_seconds(from),
            epoch_seconds(to),
            int_or_null(limit.map(i64::from)),
        ],
    )
}

pub fn encode_read_messages(
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    limit: Option<u32>,
) -> Result<Vec<u8>> {
    encode_frame(
        opcode::READ_MESSAGES,
        &[
            epoch_seconds(from),
            epoch_seconds(to),
            int_or_null(limit.map(i64::from)),
        ],
    )
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Response decoders
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Accept `frame` only with the expected opcode and exact arity. A `0xFF`
/// frame with a single text item surfaces that text.
fn expect<'a>(frame: &'a BinaryFrame, code: u8, arity: usize, operation: &str) -> Result<&'a [Value]> {
    if frame.code == code && frame.sequence.len() == arity {
        return Ok(&frame.sequence);
    }
    if frame.code == opcode::ERROR {
        if let [Value::Text(reason)] = frame.sequence.as_slice() {
            return Err(ProtocolError::new(reason.as_str()));
        }
    }
    Err(ProtocolError::unknown_during(operation))
}

fn as_i64(value: &Value, operation: &str) -> Result<i64> {
    match value {
        Value::Integer(i) => i64::try_from(i128::from(*i)).ok(),
        _ => None,
    }
    .ok_or_else(|| ProtocolError::unknown_during(operation))
}

fn as_u32(value: &Value, operation: &str) -> Result<u32> {
    u32::try_from(as_i64(value, operation)?).map_err(|_| ProtocolError::unknown_during(operation))
}

fn as_status(value: &Value, operation: &str) -> Result<Status> {
    Ok(Status::from_code(as_i64(value, operation)?))
}

fn as_text(value: &Value, operation: &str) -> Result<String> {
    match value {
        Value::Text(s) => Ok(s.clone()),
        _ => Err(ProtocolError::unknown_during(operation)),
    }
}

fn as_opt_text(value: &Value, operation: &str) -> Result<Option<String>> {
    match value {
        Value::Null => Ok(None),
        other => as_text(other, operation).map(Some),
    }
}

fn as_array<'a>(value: &'a Value, operation: &str) -> Result<&'a [Value]> {
    match value {
        Value::Array(items) => Ok(items),
        _ => Err(ProtocolError::unknown_during(operation)),
    }
}

fn as_value(value: &Value, operation: &str) -> Result<PropertyValue> {
    value_from_cbor(value).ok_or_else(|| ProtocolError::unknown_during(operation))
}

/// Epoch seconds → timestamp (scaled to milliseconds first).
fn as_timestamp(value: &Value, operation: &str) -> Result<DateTime<Utc>> {
    as_i64(value, operation)?
        .checked_mul(1000)
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| ProtocolError::unknown_during(operation))
}

pub fn decode_authorized(frame: &BinaryFrame) -> Result<Authorized> {
    const OP: &str = "authorization";
    let seq = expect(frame, opcode::AUTHORIZED, 3, OP)?;
    let version = as_i64(&seq[1], OP)?;
    if version != i64::from(PROTOCOL_VERSION) {
        return Err(ProtocolError::new(format!(
            "protocol version {version} not supported"
        )));
    }
    Ok(Authorized {
        access_level: AccessLevel::from_code(as_i64(&seq[0], OP)?),
        gateway_version: as_text(&seq[2], OP)?,
    })
}

pub fn decode_enumerated(frame: &BinaryFrame) -> Result<Enumerated> {
    const OP: &str = "enumeration";
    let seq = expect(frame, opcode::ENUMERATED, 2, OP)?;
    Ok(Enumerated {
        status: as_status(&seq[0], OP)?,
        device_count: as_u32(&seq[1], OP)?,
    })
}

pub fn decode_description(frame: &BinaryFrame) -> Result<Description> {
    const OP: &str = "description";
    let seq = expect(frame, opcode::DESCRIPTION, 3, OP)?;
    Ok(Description {
        status: as_status(&seq[0], OP)?,
        id: as_opt_text(&seq[1], OP)?,
        description: cbor_to_json(&seq[2]),
    })
}

pub fn decode_property_read(frame: &BinaryFrame) -> Result<PropertyRead> {
    const OP: &str = "property read";
    let seq = expect(frame, opcode::PROPERTY_READ, 3, OP)?;
    let value = match &seq[2] {
        Value::Null => None,
        other => Some(as_value(other, OP)?),
    };
    Ok(PropertyRead {
        status: as_status(&seq[0], OP)?,
        id: as_text(&seq[1], OP)?,
        value,
    })
}

fn decode_property_status(frame: &BinaryFrame, code: u8, operation: &str) -> Result<PropertyStatus> {
    let seq = expect(frame, code, 2, operation)?;
    Ok(PropertyStatus {
        status: as_status(&seq[0], operation)?,
        id: as_text(&seq[1], operation)?,
    })
}

pub fn decode_property_written(frame: &BinaryFrame) -> Result<PropertyStatus> {
    decode_property_status(frame, opcode::PROPERTY_WRITTEN, "property write")
}

pub fn decode_property_subscribed(frame: &BinaryFrame) -> Result<PropertyStatus> {
    decode_property_status(frame, opcode::PROPERTY_SUBSCRIBED, "property subscribe")
}

pub fn decode_property_unsubscribed(frame: &BinaryFrame) -> Result<PropertyStatus> {
    decode_property_status(frame, opcode::PROPERTY_UNSUBSCRIBED, "property unsubscribe")
}

/// Whether a `0x88` frame answers a datalog-properties request (null id).
pub fn is_datalog_properties(frame: &BinaryFrame) -> bool {
    frame.code == opcode::DATALOG_READ && matches!(frame.sequence.get(1), Some(Value::Null))
}

pub fn decode_datalog_properties_read(frame: &BinaryFrame) -> Result<DatalogProperties> {
    const OP: &str = "datalog read";
    let seq = expect(frame, opcode::DATALOG_READ, 4, OP)?;
    if !matches!(seq[1], Value::Null) {
        return Err(ProtocolError::unknown_during(OP));
    }
    let properties = as_array(&seq[3], OP)?
        .iter()
        .map(|v| as_text(v, OP))
        .collect::<Result<Vec<_>>>()?;
    Ok(DatalogProperties {
        status: as_status(&seq[0], OP)?,
        properties,
    })
}

pub fn decode_datalog_read(frame: &BinaryFrame) -> Result<Datalog> {
    const OP: &str = "datalog read";
    let seq = expect(frame, opcode::DATALOG_READ, 4, OP)?;
    let mut values = Vec::new();
    for entry in as_array(&seq[3], OP)? {
        match as_array(entry, OP)? {
            [ts, value] => values.push(DatalogEntry {
                timestamp: as_timestamp(ts, OP)?,
                value: as_value(value, OP)?,
            }),
            _ => return Err(ProtocolError::unknown_during(OP)),
        }
    }
    Ok(Datalog {
        status: as_status(&seq[0], OP)?,
        id: as_text(&seq[1], OP)?,
        count: as_u32(&seq[2], OP)?,
        values,
    })
}

fn device_message_from(items: &[Value], operation: &str) -> Result<DeviceMessage> {
    match items {
        [timestamp, access_id, device_id, message_id, message] => Ok(DeviceMessage {
            timestamp: as_timestamp(timestamp, operation)?,
            access_id: as_text(access_id, operation)?,
            device_id: as_text(device_id, operation)?,
            message_id: as_u32(message_id, operation)?,
            message: as_text(message, operation)?,
        }),
        _ => Err(ProtocolError::unknown_during(operation)),
    }
}

pub fn decode_messages_read(frame: &BinaryFrame) -> Result<MessagesRead> {
    const OP: &str = "messages read";
    let seq = expect(frame, opcode::MESSAGES_READ, 3, OP)?;
    let messages = as_array(&seq[2], OP)?
        .iter()
        .map(|m| device_message_from(as_array(m, OP)?, OP))
        .collect::<Result<Vec<_>>>()?;
    Ok(MessagesRead {
        status: as_status(&seq[0], OP)?,
        count: as_u32(&seq[1], OP)?,
        messages,
    })
}

pub fn decode_property_update(frame: &BinaryFrame) -> Result<PropertyUpdate> {
    const OP: &str = "property update";
    let seq = expect(frame, opcode::PROPERTY_UPDATE, 2, OP)?;
    Ok(PropertyUpdate {
        id: as_text(&seq[0], OP)?,
        value: as_value(&seq[1], OP)?,
    })
}

pub fn decode_device_message(frame: &BinaryFrame) -> Result<DeviceMessage> {
    const OP: &str = "device message";
    let seq = expect(frame, opcode::DEVICE_MESSAGE, 5, OP)?;
    device_message_from(seq, OP)
}

pub fn decode_error(frame: &BinaryFrame) -> ProtocolError {
    match (frame.code, frame.sequence.as_slice()) {
        (opcode::ERROR, [Value::Text(reason)]) => ProtocolError::new(reason.as_str()),
        _ => ProtocolError::new("unknown error"),
    }
}
