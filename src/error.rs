use thiserror::Error;

pub type Result<T> = std::result::Result<T, RoomwatchError>;

/// Rejected user input. Never reaches the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("dates must be YYYY-MM-DD, got {0:?}")]
    InvalidDate(String),
    #[error("check-out {checkout} must be after check-in {checkin}")]
    CheckoutNotAfterCheckin { checkin: String, checkout: String },
    #[error("occupancy must be between 1 and 10, got {0}")]
    OccupancyOutOfRange(i64),
    #[error("occupancy must be a number, got {0:?}")]
    InvalidOccupancy(String),
    #[error("expected: <checkin YYYY-MM-DD> <checkout YYYY-MM-DD> [occupancy]")]
    MissingDates,
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("no hotel url given and no default target configured")]
    MissingTarget,
}

/// Transport-level failure. Transient: the request stays active.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("timed out fetching {url}")]
    Timeout { url: String },
    #[error("network error fetching {url}: {message}")]
    Network { url: String, message: String },
    #[error("status {code} from {url}")]
    Status { url: String, code: u16 },
    #[error("failed to read body from {url}: {message}")]
    Body { url: String, message: String },
}

impl FetchError {
    /// Worth another attempt within the same fetch.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout { .. } | FetchError::Network { .. } | FetchError::Body { .. } => {
                true
            }
            FetchError::Status { code, .. } => *code == 429 || (500..600).contains(code),
            FetchError::InvalidUrl(_) => false,
        }
    }

    pub(crate) fn from_reqwest(url: &str, e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout { url: url.to_string() }
        } else if let Some(status) = e.status() {
            FetchError::Status {
                url: url.to_string(),
                code: status.as_u16(),
            }
        } else {
            FetchError::Network {
                url: url.to_string(),
                message: e.to_string(),
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to send notification: {0}")]
    SendFailed(String),
    #[error("invalid notifier configuration: {0}")]
    InvalidConfiguration(String),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum RoomwatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
    #[error("storage error during {operation}: {message}")]
    Storage { operation: String, message: String },
    #[error("config error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),
    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),
}

impl RoomwatchError {
    pub fn storage_error(operation: &str, message: &str) -> Self {
        RoomwatchError::Storage {
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        RoomwatchError::Config(message.into())
    }
}
