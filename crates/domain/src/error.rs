/// The single error kind raised by codecs, the authorization handshake and
/// state gating. Carries a human-readable reason.
///
/// Gateway-side business failures are never errors; they arrive as a
/// [`Status`](crate::Status) on the regular callback path.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct ProtocolError {
    reason: String,
}

impl ProtocolError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Raised when an operation is called from a state that does not allow it.
    pub fn invalid_state() -> Self {
        Self::new("invalid client state")
    }

    /// Generic failure used when a response does not match the expected shape.
    pub fn unknown_during(operation: &str) -> Self {
        Self::new(format!("unknown error during {operation}"))
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(format!("JSON: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
