use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] coinmarkets_core::ConfigError),

    #[error(transparent)]
    Query(#[from] coinmarkets_core::QueryError),

    #[error("no currency matches '{0}'")]
    NotFound(String),

    #[error("refresh cycle did not complete")]
    Interrupted,

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) => 2,
            Self::Query(_) => 3,
            Self::NotFound(_) => 3,
            Self::Interrupted => 130,
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
