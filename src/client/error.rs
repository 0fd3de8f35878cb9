use std::time::Duration;

/// Everything a round trip to the backend can fail with.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiError {
    /// No base URL configured; only the cache is available.
    Offline,
    Network(String),
    Timeout(Duration),
    Status { status: u16, message: String },
    Decode(String),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }

    /// True when the server never answered, which is what switches the
    /// session to the cached item list.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Offline | Self::Network(_) | Self::Timeout(_))
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Offline => write!(f, "offline"),
            Self::Network(err) => write!(f, "network error: {err}"),
            Self::Timeout(after) => write!(f, "no response after {}s", after.as_secs()),
            Self::Status { status, message } => write!(f, "error {status}: {message}"),
            Self::Decode(err) => write!(f, "malformed response: {err}"),
        }
    }
}

impl std::error::Error for ApiError {}
