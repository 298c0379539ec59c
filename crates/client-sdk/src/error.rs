use gw_domain::ProtocolError;

/// Failures of the socket driver itself, below the protocol state machine.
///
/// The driver reports these to the client as transport events; only
/// [`ClientError::NoRuntime`] surfaces synchronously, from `open`.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("no tokio runtime: {0}")]
    NoRuntime(String),
    #[error("websocket: {0}")]
    WebSocket(String),
    #[error("connection timeout")]
    Timeout,
    #[error("connection closed")]
    Closed,
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(e.to_string())
    }
}

impl From<ClientError> for ProtocolError {
    fn from(e: ClientError) -> Self {
        ProtocolError::new(e.to_string())
    }
}
