//! Shared error type across fastmetrics crates.

use thiserror::Error;

/// Stable error codes (used by tests and HTTP responses).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Out-of-range builder or config argument.
    InvalidArgument,
    /// Metric or label name does not match the exposition grammar.
    InvalidName,
    /// Wrong number of label values.
    LabelCardinality,
    /// A collector with the same sample names is already registered.
    AlreadyRegistered,
    /// Background worker has been shut down.
    WorkerUnavailable,
    /// Config file could not be read or parsed.
    Config,
    /// Internal error.
    Internal,
}

impl ErrorCode {
    /// String representation used in logs and HTTP bodies.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidArgument => "INVALID_ARGUMENT",
            ErrorCode::InvalidName => "INVALID_NAME",
            ErrorCode::LabelCardinality => "LABEL_CARDINALITY",
            ErrorCode::AlreadyRegistered => "ALREADY_REGISTERED",
            ErrorCode::WorkerUnavailable => "WORKER_UNAVAILABLE",
            ErrorCode::Config => "CONFIG",
            ErrorCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Unified error type used by core, client and exporter.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid name: {0}")]
    InvalidName(String),
    #[error("incorrect number of labels: expected {expected}, got {got}")]
    LabelCardinality { expected: usize, got: usize },
    #[error("collector already registered: {0}")]
    AlreadyRegistered(String),
    #[error("metrics worker unavailable")]
    WorkerUnavailable,
    #[error("config: {0}")]
    Config(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl MetricsError {
    /// Map the error to its stable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            MetricsError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            MetricsError::InvalidName(_) => ErrorCode::InvalidName,
            MetricsError::LabelCardinality { .. } => ErrorCode::LabelCardinality,
            MetricsError::AlreadyRegistered(_) => ErrorCode::AlreadyRegistered,
            MetricsError::WorkerUnavailable => ErrorCode::WorkerUnavailable,
            MetricsError::Config(_) => ErrorCode::Config,
            MetricsError::Internal(_) => ErrorCode::Internal,
        }
    }
}
