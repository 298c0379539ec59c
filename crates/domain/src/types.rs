use std::fmt;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Connection state
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Lifecycle of one client instance.
///
/// Progresses strictly forward `Disconnected → Connecting → Authorizing →
/// Connected`; every failure drops straight back to `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Authorizing,
    Connected,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Authorizing => "authorizing",
            Self::Connected => "connected",
        };
        f.write_str(s)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Access level
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Privilege granted by the gateway on authorization, ordered by privilege.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub enum AccessLevel {
    #[default]
    None,
    Basic,
    Installer,
    Expert,
    QualifiedServicePersonnel,
}

impl AccessLevel {
    /// Parse the text-protocol name. Unknown names degrade to `None`.
    pub fn from_wire_name(name: &str) -> Self {
        match name {
            "Basic" => Self::Basic,
            "Installer" => Self::Installer,
            "Expert" => Self::Expert,
            "QSP" => Self::QualifiedServicePersonnel,
            _ => Self::None,
        }
    }

    /// Map the binary-protocol code. Unknown codes degrade to `None`.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Basic,
            2 => Self::Installer,
            3 => Self::Expert,
            4 => Self::QualifiedServicePersonnel,
            _ => Self::None,
        }
    }

    pub fn wire_name(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Basic => "Basic",
            Self::Installer => "Installer",
            Self::Expert => "Expert",
            Self::QualifiedServicePersonnel => "QSP",
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::None => 0,
            Self::Basic => 1,
            Self::Installer => 2,
            Self::Expert => 3,
            Self::QualifiedServicePersonnel => 4,
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Status
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Outcome the gateway attaches to every response.
///
/// Anything that isn't `Success` is a business failure, delivered through the
/// normal callback rather than as an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Success,
    InProgress,
    Error,
    NoProperty,
    NoDevice,
    NoDeviceAccess,
    Timeout,
    InvalidValue,
}

impl Status {
    /// Parse the text-protocol name. Never fails: unknown names map to `Error`.
    pub fn from_wire_name(name: &str) -> Self {
        match name {
            "Success" => Self::Success,
            "InProgress" => Self::InProgress,
            "NoProperty" => Self::NoProperty,
            "NoDevice" => Self::NoDevice,
            "NoDeviceAccess" => Self::NoDeviceAccess,
            "Timeout" => Self::Timeout,
            "InvalidValue" => Self::InvalidValue,
            _ => Self::Error,
        }
    }

    /// Map the binary-protocol code. Unknown codes map to `Error`.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Success,
            1 => Self::InProgress,
            -2 => Self::NoProperty,
            -3 => Self::NoDevice,
            -4 => Self::NoDeviceAccess,
            -5 => Self::Timeout,
            -6 => Self::InvalidValue,
            _ => Self::Error,
        }
    }

    pub fn wire_name(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::InProgress => "InProgress",
            Self::Error => "Error",
            Self::NoProperty => "NoProperty",
            Self::NoDevice => "NoDevice",
            Self::NoDeviceAccess => "NoDeviceAccess",
            Self::Timeout => "Timeout",
            Self::InvalidValue => "InvalidValue",
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Success => 0,
            Self::InProgress => 1,
            Self::Error => -1,
            Self::NoProperty => -2,
            Self::NoDevice => -3,
            Self::NoDeviceAccess => -4,
            Self::Timeout => -5,
            Self::InvalidValue => -6,
        }
    }

    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl From<String> for Status {
    fn from(s: String) -> Self {
        Self::from_wire_name(&s)
    }
}

impl From<Status> for String {
    fn from(s: Status) -> Self {
        s.wire_name().to_string()
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}
