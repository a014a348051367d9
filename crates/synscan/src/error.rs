use thiserror::Error;

pub type Result<T> = std::result::Result<T, SynScanError>;

#[derive(Debug, Error)]
pub enum SynScanError {
    /// Reply does not have the shape the command promises.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Transport fault or missed liveness deadline. Never recovered locally.
    #[error("device not available: {0}")]
    DeviceUnavailable(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("unknown mount model code {0}")]
    UnknownModel(u8),

    #[error("no serial port found")]
    NoPortFound,

    #[error("several serial ports found, pick one of: {}", .0.join(", "))]
    AmbiguousPort(Vec<String>),

    #[error("serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),
}

impl SynScanError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::DeviceUnavailable(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Fatal errors tear the whole session down; the rest are the caller's to retry.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::DeviceUnavailable(_))
    }
}
