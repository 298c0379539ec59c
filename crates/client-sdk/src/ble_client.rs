//! Connection state machine for the binary (Bluetooth LE) transport.
//!
//! Same lifecycle as the WebSocket client; frames are CBOR sequences split
//! into prefixed fragments on the way out and reassembled on the way in.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use gw_domain::config::BluetoothConfig;
use gw_domain::{
    AccessLevel, ConnectionState, DescriptionFlags, PropertyValue, ProtocolError, Result,
    WriteFlags,
};
use gw_protocol::bluetooth::{self, opcode, BinaryFrame};
use gw_protocol::fragment::{self, Reassembler};

use crate::callbacks::GatewayCallbacks;
use crate::client::GatewayClient;
use crate::transport::{BluetoothTransport, TransportEvent};

/// Client for a gateway reachable over Bluetooth LE.
///
/// The binary protocol has no property search and no batch operations;
/// everything else mirrors [`WebSocketClient`](crate::WebSocketClient).
pub struct BluetoothClient<T: BluetoothTransport> {
    transport: T,
    state: ConnectionState,
    access_level: AccessLevel,
    gateway_version: Option<String>,
    credentials: Option<(String, String)>,
    reassembler: Reassembler,
    /// Connections this client already abandoned whose `Closed` is still due.
    stale_closes: u32,
    callback: Option<Arc<dyn GatewayCallbacks>>,
}

impl<T: BluetoothTransport> BluetoothClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: ConnectionState::Disconnected,
            access_level: AccessLevel::None,
            gateway_version: None,
            credentials: None,
            reassembler: Reassembler::new(),
            stale_closes: 0,
            callback: None,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Ask the platform for a gateway and subscribe to its RX notifications.
    pub fn connect(&mut self, user: Option<&str>, password: Option<&str>) -> Result<()> {
        if self.state != ConnectionState::Disconnected {
            return Err(ProtocolError::invalid_state());
        }
        tracing::info!(service = bluetooth::SERVICE_UUID, "connecting to gateway over bluetooth");

        self.transport.open()?;
        self.credentials = match (user, password) {
            (Some(u), Some(p)) => Some((u.to_string(), p.to_string())),
            _ => None,
        };
        self.reassembler.reset();
        self.state = ConnectionState::Connecting;
        Ok(())
    }

    pub fn connect_with_config(&mut self, config: &BluetoothConfig) -> Result<()> {
        self.connect(config.user.as_deref(), config.password.as_deref())
    }

    /// Feed one transport event; `Message` carries one RX notification.
    pub fn handle_event(&mut self, event: TransportEvent<Vec<u8>>) {
        match event {
            TransportEvent::Opened => self.on_open(),
            TransportEvent::Message(fragment) => self.on_notification(&fragment),
            TransportEvent::Closed => self.on_close(),
            TransportEvent::Error(reason) => {
                tracing::warn!(reason = %reason, state = %self.state, "transport error");
                self.notify(|cb| cb.on_error(&reason));
            }
            TransportEvent::TimedOut => {
                if self.state == ConnectionState::Connecting {
                    tracing::warn!("connection attempt timed out");
                    self.abandon();
                    self.notify(|cb| cb.on_error("connection timeout"));
                }
            }
        }
    }

    fn on_open(&mut self) {
        if self.state != ConnectionState::Connecting {
            tracing::debug!(state = %self.state, "ignoring open event");
            return;
        }

        let credentials = self.credentials.take();
        let sent = match &credentials {
            Some((user, password)) => bluetooth::encode_authorize(Some(user), Some(password)),
            None => bluetooth::encode_authorize(None, None),
        }
        .and_then(|frame| self.write_frame(&frame));

        match sent {
            Ok(()) => self.state = ConnectionState::Authorizing,
            Err(e) => self.fail_handshake(&e),
        }
    }

    fn abandon(&mut self) {
        self.transport.close();
        self.stale_closes += 1;
        self.state = ConnectionState::Disconnected;
        self.access_level = AccessLevel::None;
        self.reassembler.reset();
    }

    fn on_close(&mut self) {
        if self.stale_closes > 0 {
            self.stale_closes -= 1;
            if self.state != ConnectionState::Disconnected {
                tracing::debug!(state = %self.state, "ignoring close of an abandoned connection");
                return;
            }
        }
        tracing::info!(state = %self.state, "gateway connection closed");
        self.state = ConnectionState::Disconnected;
        self.access_level = AccessLevel::None;
        self.gateway_version = None;
        self.credentials = None;
        self.reassembler.reset();
        self.notify(|cb| cb.on_disconnected());
    }

    fn on_notification(&mut self, fragment: &[u8]) {
        let payload = match self.reassembler.push(fragment) {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                tracing::debug!(pending = self.reassembler.pending_len(), "buffered fragment");
                return;
            }
            Err(e) if self.state == ConnectionState::Authorizing => {
                self.fail_handshake(&e);
                return;
            }
            Err(e) => {
                tracing::warn!(error = %e, "dropping notification");
                self.notify(|cb| cb.on_error(e.reason()));
                return;
            }
        };

        tracing::debug!(bytes = payload.len(), state = %self.state, "received frame");
        match self.state {
            ConnectionState::Authorizing => self.on_authorization_response(&payload),
            ConnectionState::Connected => {
                if let Err(e) = bluetooth::decode_frame(&payload).and_then(|f| self.dispatch(&f)) {
                    tracing::warn!(error = %e, "failed to handle frame");
                    self.notify(|cb| cb.on_error(e.reason()));
                }
            }
            _ => tracing::debug!(state = %self.state, "dropping frame"),
        }
    }

    fn on_authorization_response(&mut self, payload: &[u8]) {
        match bluetooth::decode_frame(payload).and_then(|f| bluetooth::decode_authorized(&f)) {
            Ok(authorized) => {
                tracing::info!(
                    access_level = %authorized.access_level,
                    gateway_version = %authorized.gateway_version,
                    "authorized"
                );
                self.state = ConnectionState::Connected;
                self.access_level = authorized.access_level;
                self.gateway_version = Some(authorized.gateway_version.clone());
                self.notify(|cb| cb.on_connected(authorized.access_level, &authorized.gateway_version));
            }
            Err(e) => self.fail_handshake(&e),
        }
    }

    fn fail_handshake(&mut self, error: &ProtocolError) {
        tracing::warn!(error = %error, "authorization failed");
        self.notify(|cb| cb.on_error(error.reason()));
        self.abandon();
    }

    fn dispatch(&self, frame: &BinaryFrame) -> Result<()> {
        match frame.code {
            opcode::ENUMERATED => {
                let r = bluetooth::decode_enumerated(frame)?;
                self.notify(|cb| cb.on_enumerated(r.status, r.device_count));
            }
            opcode::DESCRIPTION => {
                let r = bluetooth::decode_description(frame)?;
                self.notify(|cb| cb.on_description(r.status, &r.description, r.id.as_deref()));
            }
            opcode::PROPERTY_READ => {
                let r = bluetooth::decode_property_read(frame)?;
                self.notify(|cb| cb.on_property_read(r.status, &r.id, r.value.as_ref()));
            }
            opcode::PROPERTY_WRITTEN => {
                let r = bluetooth::decode_property_written(frame)?;
                self.notify(|cb| cb.on_property_written(r.status, &r.id));
            }
            opcode::PROPERTY_SUBSCRIBED => {
                let r = bluetooth::decode_property_subscribed(frame)?;
                self.notify(|cb| cb.on_property_subscribed(r.status, &r.id));
            }
            opcode::PROPERTY_UNSUBSCRIBED => {
                let r = bluetooth::decode_property_unsubscribed(frame)?;
                self.notify(|cb| cb.on_property_unsubscribed(r.status, &r.id));
            }
            opcode::DATALOG_READ if bluetooth::is_datalog_properties(frame) => {
                let r = bluetooth::decode_datalog_properties_read(frame)?;
                self.notify(|cb| cb.on_datalog_properties_read(r.status, &r.properties));
            }
            opcode::DATALOG_READ => {
                let r = bluetooth::decode_datalog_read(frame)?;
                self.notify(|cb| cb.on_datalog_read(r.status, &r.id, r.count, &r.values));
            }
            opcode::MESSAGES_READ => {
                let r = bluetooth::decode_messages_read(frame)?;
                self.notify(|cb| cb.on_messages_read(r.status, r.count, &r.messages));
            }
            opcode::PROPERTY_UPDATE => {
                let r = bluetooth::decode_property_update(frame)?;
                self.notify(|cb| cb.on_property_updated(&r.id, &r.value));
            }
            opcode::DEVICE_MESSAGE => {
                let r = bluetooth::decode_device_message(frame)?;
                self.notify(|cb| cb.on_device_message(&r));
            }
            opcode::ERROR => return Err(bluetooth::decode_error(frame)),
            other => {
                tracing::warn!(opcode = other, "unsupported frame command");
                return Err(ProtocolError::new("unsupported frame command"));
            }
        }
        Ok(())
    }

    fn notify(&self, f: impl FnOnce(&dyn GatewayCallbacks)) {
        if let Some(cb) = &self.callback {
            f(cb.as_ref());
        }
    }

    // ── Requests ─────────────────────────────────────────────────────

    fn ensure_connected(&self) -> Result<()> {
        if self.state == ConnectionState::Connected {
            Ok(())
        } else {
            Err(ProtocolError::invalid_state())
        }
    }

    /// Fragment `frame` and write every piece in order.
    fn write_frame(&mut self, frame: &[u8]) -> Result<()> {
        let fragments = fragment::fragment(frame);
        tracing::debug!(
            bytes = frame.len(),
            fragments = fragments.len(),
            "sending frame"
        );
        for fragment in fragments {
            self.transport.write(fragment)?;
        }
        Ok(())
    }

    fn send(&mut self, frame: Result<Vec<u8>>) -> Result<()> {
        self.write_frame(&frame?)
    }
}

impl<T: BluetoothTransport> GatewayClient for BluetoothClient<T> {
    fn set_callback(&mut self, callback: Arc<dyn GatewayCallbacks>) {
        self.callback = Some(callback);
    }

    fn state(&self) -> ConnectionState {
        self.state
    }

    fn access_level(&self) -> AccessLevel {
        self.access_level
    }

    fn gateway_version(&self) -> Option<&str> {
        self.gateway_version.as_deref()
    }

    fn disconnect(&mut self) -> Result<()> {
        self.ensure_connected()?;
        tracing::info!("disconnecting from gateway");
        self.transport.close();
        Ok(())
    }

    fn enumerate(&mut self) -> Result<()> {
        self.ensure_connected()?;
        self.send(bluetooth::encode_enumerate())
    }

    fn describe(
        &mut self,
        access_id: Option<&str>,
        device_id: Option<&str>,
        property_id: Option<u32>,
        flags: Option<DescriptionFlags>,
    ) -> Result<()> {
        self.ensure_connected()?;
        self.send(bluetooth::encode_describe(access_id, device_id, property_id, flags))
    }

    fn read_property(&mut self, property_id: &str) -> Result<()> {
        self.ensure_connected()?;
        self.send(bluetooth::encode_read_property(property_id))
    }

    fn write_property(
        &mut self,
        property_id: &str,
        value: Option<&PropertyValue>,
        flags: Option<WriteFlags>,
    ) -> Result<()> {
        self.ensure_connected()?;
        self.send(bluetooth::encode_write_property(property_id, value, flags))
    }

    fn subscribe_to_property(&mut self, property_id: &str) -> Result<()> {
        self.ensure_connected()?;
        self.send(bluetooth::encode_subscribe_property(property_id))
    }

    fn unsubscribe_from_property(&mut self, property_id: &str) -> Result<()> {
        self.ensure_connected()?;
        self.send(bluetooth::encode_unsubscribe_property(property_id))
    }

    fn read_datalog_properties(
        &mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.ensure_connected()?;
        self.send(bluetooth::encode_read_datalog(None, from, to, None))
    }

    fn read_datalog(
        &mut self,
        property_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: Option<u32>,
    ) -> Result<()> {
        self.ensure_connected()?;
        self.send(bluetooth::encode_read_datalog(Some(property_id), from, to, limit))
    }

    fn read_messages(
        &mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: Option<u32>,
    ) -> Result<()> {
        self.ensure_connected()?;
        self.send(bluetooth::encode_read_messages(from, to, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockBluetoothTransport, Recorder};
    use crate::GatewayClient;
    use ciborium::Value;
    use gw_protocol::fragment::fragment_with_size;

    fn int(n: i64) -> Value {
        Value::Integer(n.into())
    }

    fn text(s: &str) -> Value {
        Value::Text(s.into())
    }

    /// Encode a gateway frame as a single terminal notification.
    fn notification(code: u8, args: &[Value]) -> TransportEvent<Vec<u8>> {
        let mut bytes = vec![0];
        bytes.extend(bluetooth::encode_frame(code, args).unwrap());
        TransportEvent::Message(bytes)
    }

    fn authorized(version: i64) -> TransportEvent<Vec<u8>> {
        notification(opcode::AUTHORIZED, &[int(3), int(version), text("0.6.0")])
    }

    fn client() -> (BluetoothClient<MockBluetoothTransport>, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let mut client = BluetoothClient::new(MockBluetoothTransport::default());
        client.set_callback(recorder.clone());
        (client, recorder)
    }

    fn connected() -> (BluetoothClient<MockBluetoothTransport>, Arc<Recorder>) {
        let (mut client, recorder) = client();
        client.connect(None, None).unwrap();
        client.handle_event(TransportEvent::Opened);
        client.handle_event(authorized(1));
        client.transport_mut().written.clear();
        recorder.clear();
        (client, recorder)
    }

    #[test]
    fn authorize_sequence_reaches_connected() {
        let (mut client, recorder) = client();
        client.connect(Some("expert"), Some("pw")).unwrap();
        assert!(client.transport().opened);
        assert_eq!(client.state(), ConnectionState::Connecting);

        client.handle_event(TransportEvent::Opened);
        assert_eq!(client.state(), ConnectionState::Authorizing);
        let written = &client.transport().written;
        assert_eq!(written.len(), 1);
        assert_eq!(written[0][0], 0);
        let frame = bluetooth::decode_frame(&written[0][1..]).unwrap();
        assert_eq!(frame.code, opcode::AUTHORIZE);
        assert_eq!(frame.sequence, vec![text("expert"), text("pw"), int(1)]);

        client.handle_event(authorized(1));
        assert_eq!(client.state(), ConnectionState::Connected);
        assert_eq!(client.access_level(), AccessLevel::Expert);
        assert_eq!(client.gateway_version(), Some("0.6.0"));
        assert_eq!(recorder.events(), vec!["connected Expert 0.6.0"]);
    }

    #[test]
    fn partial_credentials_from_config_are_not_sent() {
        let (mut client, _) = client();
        let config = BluetoothConfig {
            user: Some("expert".into()),
            password: None,
        };
        client.connect_with_config(&config).unwrap();
        client.handle_event(TransportEvent::Opened);
        let frame = bluetooth::decode_frame(&client.transport().written[0][1..]).unwrap();
        assert_eq!(frame.sequence, vec![Value::Null, Value::Null, int(1)]);
    }

    #[test]
    fn requests_rejected_before_connected() {
        let (mut client, _) = client();
        assert_eq!(
            client.enumerate().unwrap_err().reason(),
            "invalid client state"
        );
        client.connect(None, None).unwrap();
        client.handle_event(TransportEvent::Opened);
        assert!(client.read_property("demo.inv.3136").is_err());
        assert!(client.disconnect().is_err());
        assert_eq!(client.transport().written.len(), 1);
    }

    #[test]
    fn protocol_version_mismatch_disconnects() {
        let (mut client, recorder) = client();
        client.connect(None, None).unwrap();
        client.handle_event(TransportEvent::Opened);
        client.handle_event(authorized(2));
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(client.transport().closed);
        assert_eq!(recorder.events(), vec!["error protocol version 2 not supported"]);
    }

    #[test]
    fn bad_fragment_during_authorization_disconnects() {
        let (mut client, recorder) = client();
        client.connect(None, None).unwrap();
        client.handle_event(TransportEvent::Opened);
        client.handle_event(TransportEvent::Message(vec![]));
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(client.transport().closed);
        assert_eq!(recorder.events(), vec!["error empty fragment"]);
    }

    #[test]
    fn close_of_failed_attempt_does_not_end_the_next_one() {
        let (mut client, recorder) = client();
        client.connect(None, None).unwrap();
        client.handle_event(TransportEvent::TimedOut);
        assert_eq!(client.state(), ConnectionState::Disconnected);

        client.connect(None, None).unwrap();
        client.handle_event(TransportEvent::Closed);
        assert_eq!(client.state(), ConnectionState::Connecting);

        client.handle_event(TransportEvent::Opened);
        client.handle_event(authorized(1));
        assert_eq!(client.state(), ConnectionState::Connected);
        assert_eq!(
            recorder.events(),
            vec!["error connection timeout", "connected Expert 0.6.0"]
        );
    }

    #[test]
    fn enumerated_frame_is_dispatched() {
        let (mut client, recorder) = connected();
        client.enumerate().unwrap();
        let written = &client.transport().written;
        assert_eq!(written.len(), 1);
        assert_eq!(
            bluetooth::decode_frame(&written[0][1..]).unwrap().code,
            opcode::ENUMERATE
        );

        client.handle_event(notification(opcode::ENUMERATED, &[int(0), int(5)]));
        assert_eq!(recorder.events(), vec!["enumerated Success 5"]);
    }

    #[test]
    fn fragmented_response_is_reassembled() {
        let (mut client, recorder) = connected();
        let description = text(&"x".repeat(1200));
        let bytes = bluetooth::encode_frame(
            opcode::DESCRIPTION,
            &[int(0), text("demo"), description],
        )
        .unwrap();

        let fragments = fragment_with_size(&bytes, 508);
        assert_eq!(fragments.len(), 3);
        for f in &fragments[..2] {
            client.handle_event(TransportEvent::Message(f.clone()));
        }
        assert!(recorder.events().is_empty());

        client.handle_event(TransportEvent::Message(fragments[2].clone()));
        assert_eq!(recorder.events(), vec!["description Success demo"]);
    }

    #[test]
    fn large_requests_are_fragmented() {
        let (mut client, _) = connected();
        let value = PropertyValue::from("y".repeat(600));
        client.write_property("demo.inv.1415", Some(&value), None).unwrap();

        let written = client.transport().written.clone();
        assert_eq!(written.len(), 2);
        assert_eq!(written[0][0], 1);
        assert_eq!(written[1][0], 0);

        let mut r = Reassembler::new();
        assert_eq!(r.push(&written[0]).unwrap(), None);
        let frame = bluetooth::decode_frame(&r.push(&written[1]).unwrap().unwrap()).unwrap();
        assert_eq!(frame.code, opcode::WRITE_PROPERTY);
        assert_eq!(frame.sequence[0], text("demo.inv.1415"));
    }

    #[test]
    fn datalog_routes_on_null_id() {
        let (mut client, recorder) = connected();
        client.handle_event(notification(
            opcode::DATALOG_READ,
            &[int(0), Value::Null, int(1), Value::Array(vec![text("demo.inv.3136")])],
        ));
        client.handle_event(notification(
            opcode::DATALOG_READ,
            &[
                int(0),
                text("demo.inv.3136"),
                int(1),
                Value::Array(vec![Value::Array(vec![int(1_672_531_200), int(42)])]),
            ],
        ));
        assert_eq!(
            recorder.events(),
            vec!["datalog properties Success 1", "datalog Success demo.inv.3136 1"]
        );
    }

    #[test]
    fn error_and_unknown_frames_keep_connection() {
        let (mut client, recorder) = connected();
        client.handle_event(notification(opcode::ERROR, &[text("busy")]));
        client.handle_event(notification(0x42, &[]));
        client.handle_event(TransportEvent::Message(vec![0, 0xFF, 0xFF]));
        client.handle_event(TransportEvent::Message(vec![]));
        assert_eq!(client.state(), ConnectionState::Connected);

        let events = recorder.events();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0], "error busy");
        assert_eq!(events[1], "error unsupported frame command");
        assert!(events[2].starts_with("error "));
        assert_eq!(events[3], "error empty fragment");
    }

    #[test]
    fn pushes_are_dispatched() {
        let (mut client, recorder) = connected();
        client.handle_event(notification(
            opcode::PROPERTY_UPDATE,
            &[text("demo.inv.3136"), int(230)],
        ));
        client.handle_event(notification(
            opcode::DEVICE_MESSAGE,
            &[int(1_672_531_200), text("demo"), text("inv"), int(209), text("AC-In synchronized")],
        ));
        assert_eq!(
            recorder.events(),
            vec![
                "updated demo.inv.3136 230",
                "device message demo.inv 209 AC-In synchronized"
            ]
        );
    }

    #[test]
    fn close_discards_partial_frame() {
        let (mut client, recorder) = connected();
        client.handle_event(TransportEvent::Message(vec![1, 0xAA]));
        client.handle_event(TransportEvent::Closed);
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(client.access_level(), AccessLevel::None);
        assert_eq!(recorder.events(), vec!["disconnected"]);

        // A fresh connection must not see the stale fragment.
        client.connect(None, None).unwrap();
        client.handle_event(TransportEvent::Opened);
        client.handle_event(authorized(1));
        assert_eq!(client.state(), ConnectionState::Connected);
    }
}
