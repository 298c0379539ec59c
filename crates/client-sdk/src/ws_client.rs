//! Connection state machine for the text (WebSocket) transport.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use gw_domain::config::ClientConfig;
use gw_domain::{
    AccessLevel, ConnectionState, DescriptionFlags, DeviceFunctions, PropertyValue, ProtocolError,
    Result, WriteFlags,
};
use gw_protocol::text::{self, command};

use crate::callbacks::GatewayCallbacks;
use crate::client::GatewayClient;
use crate::transport::{TextTransport, TransportEvent};

/// Client for a gateway reachable over WebSocket.
///
/// Requests are fire-and-forget; every response arrives later through the
/// registered [`GatewayCallbacks`]. All operations except [`connect`] require
/// the `Connected` state and fail with `invalid client state` otherwise,
/// without touching the transport. The operations both transports share
/// live on [`GatewayClient`]; property search and the batch variants are
/// text-only and inherent here.
///
/// [`connect`]: Self::connect
pub struct WebSocketClient<T: TextTransport> {
    transport: T,
    state: ConnectionState,
    access_level: AccessLevel,
    gateway_version: Option<String>,
    credentials: Option<(String, String)>,
    /// Connections this client already abandoned whose `Closed` is still due.
    stale_closes: u32,
    callback: Option<Arc<dyn GatewayCallbacks>>,
}

impl<T: TextTransport> WebSocketClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: ConnectionState::Disconnected,
            access_level: AccessLevel::None,
            gateway_version: None,
            credentials: None,
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

    /// Open the transport to `ws://{host}:{port}`. Authorization is sent as
    /// soon as the transport reports it is open. Credentials are only used
    /// when both are given.
    pub fn connect(
        &mut self,
        host: &str,
        port: u16,
        user: Option<&str>,
        password: Option<&str>,
        timeout: Duration,
    ) -> Result<()> {
        if self.state != ConnectionState::Disconnected {
            return Err(ProtocolError::invalid_state());
        }

        let url = if host.contains("://") {
            format!("{host}:{port}")
        } else {
            format!("ws://{host}:{port}")
        };
        tracing::info!(url = %url, timeout_ms = timeout.as_millis() as u64, "connecting to gateway");

        self.transport.open(&url, timeout)?;
        self.credentials = match (user, password) {
            (Some(u), Some(p)) => Some((u.to_string(), p.to_string())),
            _ => None,
        };
        self.state = ConnectionState::Connecting;
        Ok(())
    }

    pub fn connect_with_config(&mut self, config: &ClientConfig) -> Result<()> {
        self.connect(
            &config.host,
            config.port,
            config.user.as_deref(),
            config.password.as_deref(),
            config.connect_timeout(),
        )
    }

    /// Feed one transport event into the state machine.
    pub fn handle_event(&mut self, event: TransportEvent<String>) {
        match event {
            TransportEvent::Opened => self.on_open(),
            TransportEvent::Message(raw) => self.on_message(&raw),
            TransportEvent::Closed => self.on_close(),
            TransportEvent::Error(reason) => {
                tracing::warn!(reason = %reason, state = %self.state, "transport error");
                self.notify(|cb| cb.on_error(&reason));
            }
            TransportEvent::TimedOut => self.on_connect_timeout(),
        }
    }

    fn on_open(&mut self) {
        if self.state != ConnectionState::Connecting {
            tracing::debug!(state = %self.state, "ignoring open event");
            return;
        }

        let credentials = self.credentials.take();
        let frame = match &credentials {
            Some((user, password)) => text::encode_authorize(Some(user), Some(password)),
            None => text::encode_authorize(None, None),
        };
        tracing::debug!(authenticated = credentials.is_some(), "sending authorization");

        if let Err(e) = self.transport.send(frame) {
            self.fail_handshake(&e);
            return;
        }
        self.state = ConnectionState::Authorizing;
    }

    fn on_connect_timeout(&mut self) {
        if self.state != ConnectionState::Connecting {
            return;
        }
        tracing::warn!("connection attempt timed out");
        self.abandon();
        self.notify(|cb| cb.on_error("connection timeout"));
    }

    /// Close the current connection and reset right away, leaving its
    /// `Closed` event to be absorbed when it arrives.
    fn abandon(&mut self) {
        self.transport.close();
        self.stale_closes += 1;
        self.state = ConnectionState::Disconnected;
        self.access_level = AccessLevel::None;
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
        self.notify(|cb| cb.on_disconnected());
    }

    fn on_message(&mut self, raw: &str) {
        tracing::debug!(bytes = raw.len(), state = %self.state, "received frame");
        match self.state {
            ConnectionState::Authorizing => self.on_authorization_response(raw),
            ConnectionState::Connected => {
                // One bad frame does not cost the connection.
                if let Err(e) = self.dispatch(raw) {
                    tracing::warn!(error = %e, "failed to handle frame");
                    self.notify(|cb| cb.on_error(e.reason()));
                }
            }
            _ => tracing::debug!(state = %self.state, "dropping frame"),
        }
    }

    fn on_authorization_response(&mut self, raw: &str) {
        match text::decode_frame(raw).and_then(|f| text::decode_authorized(&f)) {
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

    /// Authorization failures are fatal: report, close, and reset.
    fn fail_handshake(&mut self, error: &ProtocolError) {
        tracing::warn!(error = %error, "authorization failed");
        self.notify(|cb| cb.on_error(error.reason()));
        self.abandon();
    }

    fn dispatch(&self, raw: &str) -> Result<()> {
        let frame = text::decode_frame(raw)?;
        match frame.command.as_str() {
            command::ENUMERATED => {
                let r = text::decode_enumerated(&frame)?;
                self.notify(|cb| cb.on_enumerated(r.status, r.device_count));
            }
            command::DESCRIPTION => {
                let r = text::decode_description(&frame)?;
                self.notify(|cb| cb.on_description(r.status, &r.description, r.id.as_deref()));
            }
            command::PROPERTIES_FOUND => {
                let r = text::decode_properties_found(&frame)?;
                self.notify(|cb| cb.on_properties_found(&r));
            }
            command::PROPERTY_READ => {
                let r = text::decode_property_read(&frame)?;
                self.notify(|cb| cb.on_property_read(r.status, &r.id, r.value.as_ref()));
            }
            command::PROPERTIES_READ => {
                let r = text::decode_properties_read(&frame)?;
                self.notify(|cb| cb.on_properties_read(r.status, &r.results));
            }
            command::PROPERTY_WRITTEN => {
                let r = text::decode_property_written(&frame)?;
                self.notify(|cb| cb.on_property_written(r.status, &r.id));
            }
            command::PROPERTY_SUBSCRIBED => {
                let r = text::decode_property_subscribed(&frame)?;
                self.notify(|cb| cb.on_property_subscribed(r.status, &r.id));
            }
            command::PROPERTIES_SUBSCRIBED => {
                let r = text::decode_properties_subscribed(&frame)?;
                self.notify(|cb| cb.on_properties_subscribed(r.status, &r.results));
            }
            command::PROPERTY_UNSUBSCRIBED => {
                let r = text::decode_property_unsubscribed(&frame)?;
                self.notify(|cb| cb.on_property_unsubscribed(r.status, &r.id));
            }
            command::PROPERTIES_UNSUBSCRIBED => {
                let r = text::decode_properties_unsubscribed(&frame)?;
                self.notify(|cb| cb.on_properties_unsubscribed(r.status, &r.results));
            }
            command::PROPERTY_UPDATE => {
                let r = text::decode_property_update(&frame)?;
                self.notify(|cb| cb.on_property_updated(&r.id, &r.value));
            }
            command::DATALOG_READ if frame.headers.contains_key("id") => {
                let r = text::decode_datalog_read(&frame)?;
                self.notify(|cb| cb.on_datalog_read(r.status, &r.id, r.count, &r.values));
            }
            command::DATALOG_READ => {
                let r = text::decode_datalog_properties_read(&frame)?;
                self.notify(|cb| cb.on_datalog_properties_read(r.status, &r.properties));
            }
            command::MESSAGES_READ => {
                let r = text::decode_messages_read(&frame)?;
                self.notify(|cb| cb.on_messages_read(r.status, r.count, &r.messages));
            }
            command::DEVICE_MESSAGE => {
                let r = text::decode_device_message(&frame)?;
                self.notify(|cb| cb.on_device_message(&r));
            }
            command::ERROR => return Err(text::decode_error(&frame)),
            other => {
                tracing::warn!(command = %other, "unsupported frame command");
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

    fn send(&mut self, frame: String) -> Result<()> {
        tracing::debug!(
            command = frame.lines().next().unwrap_or_default(),
            bytes = frame.len(),
            "sending frame"
        );
        self.transport.send(frame)
    }

    /// Search properties by pattern; `*` may stand for the access or device id.
    pub fn find_properties(
        &mut self,
        pattern: &str,
        include_virtual: Option<bool>,
        functions: Option<DeviceFunctions>,
    ) -> Result<()> {
        self.ensure_connected()?;
        self.send(text::encode_find_properties(pattern, include_virtual, functions))
    }

    pub fn read_properties(&mut self, property_ids: &[String]) -> Result<()> {
        self.ensure_connected()?;
        let frame = text::encode_read_properties(property_ids)?;
        self.send(frame)
    }

    pub fn subscribe_to_properties(&mut self, property_ids: &[String]) -> Result<()> {
        self.ensure_connected()?;
        let frame = text::encode_subscribe_properties(property_ids)?;
        self.send(frame)
    }

    pub fn unsubscribe_from_properties(&mut self, property_ids: &[String]) -> Result<()> {
        self.ensure_connected()?;
        let frame = text::encode_unsubscribe_properties(property_ids)?;
        self.send(frame)
    }
}

impl<T: TextTransport> GatewayClient for WebSocketClient<T> {
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
        self.send(text::encode_enumerate())
    }

    fn describe(
        &mut self,
        access_id: Option<&str>,
        device_id: Option<&str>,
        property_id: Option<u32>,
        flags: Option<DescriptionFlags>,
    ) -> Result<()> {
        self.ensure_connected()?;
        self.send(text::encode_describe(access_id, device_id, property_id, flags))
    }

    fn read_property(&mut self, property_id: &str) -> Result<()> {
        self.ensure_connected()?;
        self.send(text::encode_read_property(property_id))
    }

    fn write_property(
        &mut self,
        property_id: &str,
        value: Option<&PropertyValue>,
        flags: Option<WriteFlags>,
    ) -> Result<()> {
        self.ensure_connected()?;
        self.send(text::encode_write_property(property_id, value, flags))
    }

    fn subscribe_to_property(&mut self, property_id: &str) -> Result<()> {
        self.ensure_connected()?;
        self.send(text::encode_subscribe_property(property_id))
    }

    fn unsubscribe_from_property(&mut self, property_id: &str) -> Result<()> {
        self.ensure_connected()?;
        self.send(text::encode_unsubscribe_property(property_id))
    }

    fn read_datalog_properties(
        &mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.ensure_connected()?;
        self.send(text::encode_read_datalog(None, from, to, None))
    }

    fn read_datalog(
        &mut self,
        property_id: &str,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: Option<u32>,
    ) -> Result<()> {
        self.ensure_connected()?;
        self.send(text::encode_read_datalog(Some(property_id), from, to, limit))
    }

    fn read_messages(
        &mut self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
        limit: Option<u32>,
    ) -> Result<()> {
        self.ensure_connected()?;
        self.send(text::encode_read_messages(from, to, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockTextTransport, Recorder};
    use crate::GatewayClient;

    const AUTHORIZED: &str =
        "AUTHORIZED\naccess_level:Installer\nprotocol_version:1\ngateway_version:0.6.0\n\n";

    fn client() -> (WebSocketClient<MockTextTransport>, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let mut client = WebSocketClient::new(MockTextTransport::default());
        client.set_callback(recorder.clone());
        (client, recorder)
    }

    fn connected() -> (WebSocketClient<MockTextTransport>, Arc<Recorder>) {
        let (mut client, recorder) = client();
        client
            .connect("localhost", 1987, None, None, Duration::from_millis(5000))
            .unwrap();
        client.handle_event(TransportEvent::Opened);
        client.handle_event(TransportEvent::Message(AUTHORIZED.into()));
        client.transport_mut().sent.clear();
        recorder.clear();
        (client, recorder)
    }

    #[test]
    fn authorize_sequence_reaches_connected() {
        let (mut client, recorder) = client();
        client
            .connect("gw.local", 1987, Some("installer"), Some("pw"), Duration::from_secs(5))
            .unwrap();
        assert_eq!(client.state(), ConnectionState::Connecting);
        assert_eq!(client.transport().opened_url.as_deref(), Some("ws://gw.local:1987"));

        client.handle_event(TransportEvent::Opened);
        assert_eq!(client.state(), ConnectionState::Authorizing);
        assert_eq!(
            client.transport().sent,
            vec!["AUTHORIZE\nuser:installer\npassword:pw\nprotocol_version:1\n\n\n"]
        );

        client.handle_event(TransportEvent::Message(AUTHORIZED.into()));
        assert_eq!(client.state(), ConnectionState::Connected);
        assert_eq!(client.access_level(), AccessLevel::Installer);
        assert_eq!(client.gateway_version(), Some("0.6.0"));
        assert_eq!(recorder.events(), vec!["connected Installer 0.6.0"]);
    }

    #[test]
    fn requests_rejected_before_connected() {
        let (mut client, _) = client();
        let err = client.read_property("demo.inv.3136").unwrap_err();
        assert_eq!(err.reason(), "invalid client state");

        client
            .connect("localhost", 1987, None, None, Duration::from_secs(5))
            .unwrap();
        assert!(client.read_property("demo.inv.3136").is_err());

        client.handle_event(TransportEvent::Opened);
        assert_eq!(client.state(), ConnectionState::Authorizing);
        assert!(client.read_property("demo.inv.3136").is_err());
        assert!(client.disconnect().is_err());

        // Only the authorization frame ever reached the transport.
        assert_eq!(client.transport().sent.len(), 1);
        assert!(client.transport().sent[0].starts_with("AUTHORIZE\n"));
    }

    #[test]
    fn connect_twice_is_rejected() {
        let (mut client, _) = client();
        client
            .connect("localhost", 1987, None, None, Duration::from_secs(5))
            .unwrap();
        assert!(client
            .connect("localhost", 1987, None, None, Duration::from_secs(5))
            .is_err());
    }

    #[test]
    fn protocol_version_mismatch_disconnects() {
        let (mut client, recorder) = client();
        client
            .connect("localhost", 1987, None, None, Duration::from_secs(5))
            .unwrap();
        client.handle_event(TransportEvent::Opened);
        client.handle_event(TransportEvent::Message(
            "AUTHORIZED\naccess_level:Basic\nprotocol_version:2\ngateway_version:0.6.0\n\n".into(),
        ));
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(client.transport().closed);
        assert!(recorder.events().iter().all(|e| !e.starts_with("connected")));
        assert_eq!(recorder.events(), vec!["error protocol version 2 not supported"]);
    }

    #[test]
    fn error_frame_during_authorization_is_fatal() {
        let (mut client, recorder) = client();
        client
            .connect("localhost", 1987, Some("u"), Some("bad"), Duration::from_secs(5))
            .unwrap();
        client.handle_event(TransportEvent::Opened);
        client.handle_event(TransportEvent::Message("ERROR\nreason:invalid credentials\n\n".into()));
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(recorder.events(), vec!["error invalid credentials"]);

        client.handle_event(TransportEvent::Closed);
        assert_eq!(recorder.events(), vec!["error invalid credentials", "disconnected"]);
    }

    #[test]
    fn close_of_failed_attempt_does_not_end_the_next_one() {
        let (mut client, recorder) = client();
        client
            .connect("localhost", 1987, None, None, Duration::from_secs(5))
            .unwrap();
        client.handle_event(TransportEvent::Opened);
        client.handle_event(TransportEvent::Message("ERROR\nreason:denied\n\n".into()));
        assert_eq!(client.state(), ConnectionState::Disconnected);

        client
            .connect("localhost", 1987, None, None, Duration::from_secs(5))
            .unwrap();
        client.handle_event(TransportEvent::Closed);
        assert_eq!(client.state(), ConnectionState::Connecting);

        client.handle_event(TransportEvent::Opened);
        assert_eq!(client.state(), ConnectionState::Authorizing);
        assert_eq!(client.transport().sent.len(), 2);
        assert_eq!(recorder.events(), vec!["error denied"]);

        // The new connection's own close still counts.
        client.handle_event(TransportEvent::Closed);
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(recorder.events(), vec!["error denied", "disconnected"]);
    }

    #[test]
    fn connect_timeout_closes_without_authorizing() {
        let (mut client, recorder) = client();
        client
            .connect("10.0.0.1", 1987, None, None, Duration::from_millis(100))
            .unwrap();
        client.handle_event(TransportEvent::TimedOut);
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(client.transport().closed);
        assert!(client.transport().sent.is_empty());
        assert_eq!(recorder.events(), vec!["error connection timeout"]);

        // A late open must not start a handshake.
        client.handle_event(TransportEvent::Opened);
        assert_eq!(client.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn write_property_wire_and_response() {
        let (mut client, recorder) = connected();
        client.write_property("demo.inv.1415", None, None).unwrap();
        assert_eq!(client.transport().sent, vec!["WRITE PROPERTY\nid:demo.inv.1415\n\n\n"]);

        client.handle_event(TransportEvent::Message(
            "PROPERTY WRITTEN\nstatus:Success\nid:demo.inv.1415\n\n".into(),
        ));
        assert_eq!(recorder.events(), vec!["written Success demo.inv.1415"]);
    }

    #[test]
    fn bad_frame_keeps_connection() {
        let (mut client, recorder) = connected();
        client.handle_event(TransportEvent::Message("garbage".into()));
        client.handle_event(TransportEvent::Message("NONSENSE\n\n".into()));
        client.handle_event(TransportEvent::Message("ERROR\nreason:busy\n\n".into()));
        assert_eq!(client.state(), ConnectionState::Connected);
        assert_eq!(
            recorder.events(),
            vec![
                "error Invalid frame",
                "error unsupported frame command",
                "error busy"
            ]
        );
    }

    #[test]
    fn pushes_are_dispatched() {
        let (mut client, recorder) = connected();
        client.handle_event(TransportEvent::Message(
            "PROPERTY UPDATE\nid:demo.inv.3136\nvalue:12.5\n\n".into(),
        ));
        client.handle_event(TransportEvent::Message(
            "DEVICE MESSAGE\naccess_id:demo\ndevice_id:inv\nmessage_id:209\nmessage:AC-In synchronized\ntimestamp:2023-01-01T00:00:00Z\n\n".into(),
        ));
        assert_eq!(
            recorder.events(),
            vec![
                "updated demo.inv.3136 12.5",
                "device message demo.inv 209 AC-In synchronized"
            ]
        );
    }

    #[test]
    fn datalog_routes_on_id_header() {
        let (mut client, recorder) = connected();
        client.handle_event(TransportEvent::Message(
            "DATALOG READ\nstatus:Success\ncount:1\n\ndemo.inv.3136\n".into(),
        ));
        client.handle_event(TransportEvent::Message(
            "DATALOG READ\nstatus:Success\nid:demo.inv.3136\ncount:1\n\n2023-01-01T00:00:00Z,1\n".into(),
        ));
        assert_eq!(
            recorder.events(),
            vec!["datalog properties Success 1", "datalog Success demo.inv.3136 1"]
        );
    }

    #[test]
    fn enumerate_and_describe_roundtrip() {
        let (mut client, recorder) = connected();
        client.enumerate().unwrap();
        client
            .describe(Some("demo"), None, None, Some(DescriptionFlags::INCLUDE_DEVICE_INFORMATION))
            .unwrap();
        assert_eq!(client.transport().sent[0], "ENUMERATE\n\n\n");
        assert_eq!(
            client.transport().sent[1],
            "DESCRIBE\nid:demo\nflags:IncludeDeviceInformation\n\n\n"
        );

        client.handle_event(TransportEvent::Message(
            "ENUMERATED\nstatus:Success\ndevice_count:5\n\n".into(),
        ));
        client.handle_event(TransportEvent::Message(
            "DESCRIPTION\nstatus:Success\nid:demo\n\n{\"devices\":[]}\n".into(),
        ));
        assert_eq!(
            recorder.events(),
            vec!["enumerated Success 5", "description Success demo"]
        );
    }

    #[test]
    fn batch_operations_send_json_bodies() {
        let (mut client, _) = connected();
        let ids = vec!["demo.inv.3136".to_string(), "demo.inv.3137".to_string()];
        client.read_properties(&ids).unwrap();
        client.subscribe_to_properties(&ids).unwrap();
        client.unsubscribe_from_properties(&ids).unwrap();
        let sent = &client.transport().sent;
        assert_eq!(sent[0], "READ PROPERTIES\n\n[\"demo.inv.3136\",\"demo.inv.3137\"]\n");
        assert!(sent[1].starts_with("SUBSCRIBE PROPERTIES\n\n["));
        assert!(sent[2].starts_with("UNSUBSCRIBE PROPERTIES\n\n["));
    }

    #[test]
    fn close_resets_and_reports_once() {
        let (mut client, recorder) = connected();
        client.disconnect().unwrap();
        assert!(client.transport().closed);
        assert_eq!(client.state(), ConnectionState::Connected);

        client.handle_event(TransportEvent::Closed);
        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert_eq!(client.access_level(), AccessLevel::None);
        assert!(client.gateway_version().is_none());
        assert_eq!(recorder.events(), vec!["disconnected"]);
    }

    #[test]
    fn host_with_scheme_is_kept() {
        let (mut client, _) = client();
        client
            .connect("wss://gw.example.com", 443, None, None, Duration::from_secs(5))
            .unwrap();
        assert_eq!(
            client.transport().opened_url.as_deref(),
            Some("wss://gw.example.com:443")
        );
    }

    #[test]
    fn connect_with_config_uses_defaults() {
        let (mut client, _) = client();
        client.connect_with_config(&ClientConfig::default()).unwrap();
        assert_eq!(
            client.transport().opened_url.as_deref(),
            Some("ws://127.0.0.1:1987")
        );
        assert_eq!(client.transport().timeout, Some(Duration::from_millis(5000)));
    }
}
