use thiserror::Error;

/// Validation and contract errors exposed by `candlelens-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("candle high must be >= low")]
    InvalidCandleRange,
    #[error("candle open/close must be within high/low range")]
    InvalidCandleBounds,

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },

    #[error("api endpoint must be an absolute http(s) URL: '{value}'")]
    InvalidEndpoint { value: String },
    #[error("analysis interval {value}s is outside [{min}, {max}]")]
    IntervalOutOfRange { value: u32, min: u32, max: u32 },
    #[error("request timeout must be greater than zero")]
    ZeroTimeout,
    #[error("environment variable '{name}' has invalid value '{value}'")]
    InvalidEnvValue { name: &'static str, value: String },

    #[error("surface pixel buffer has {actual} bytes, expected {expected}")]
    PixelBufferSize { expected: usize, actual: usize },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure delivering an insight to one listener.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    #[error("listener '{listener}' is closed")]
    Closed { listener: String },
    #[error("listener '{listener}' failed: {reason}")]
    Failed { listener: String, reason: String },
}
