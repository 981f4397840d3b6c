use std::fmt;

use reqwest::StatusCode;

/// Result of probing the backend health endpoint, keeping the failure kind apart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerStatus {
    Online,
    Unhealthy { status: StatusCode },
    Unreachable { reason: String },
}

impl ServerStatus {
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Online => f.write_str("online"),
            Self::Unhealthy { status } => write!(f, "unhealthy ({status})"),
            Self::Unreachable { reason } => write!(f, "unreachable ({reason})"),
        }
    }
}
