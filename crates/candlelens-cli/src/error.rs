use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] candlelens_core::ValidationError),

    #[error(transparent)]
    Core(#[from] candlelens_core::CoreError),

    #[error(transparent)]
    Remote(#[from] candlelens_core::RemoteError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Command(_) => 2,
            Self::Core(candlelens_core::CoreError::Validation(_)) => 2,
            Self::Core(candlelens_core::CoreError::Serialization(_)) => 4,
            Self::Core(candlelens_core::CoreError::Io(_)) => 10,
            Self::Remote(_) => 3,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
