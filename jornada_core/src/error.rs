use thiserror::Error;

/// Failures while bringing the runtime up.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("failed to find a data directory on this platform")]
    NoDataDir,

    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),

    #[error("config i/o error")]
    Io(#[from] std::io::Error),

    #[error("config is not valid json")]
    Json(#[from] serde_json::Error),

    #[error("data store disconnected")]
    Database(#[from] sea_orm::DbErr),

    #[error("network error: {0}")]
    Network(String),
}

impl StartError {
    pub(crate) fn network(error: impl std::fmt::Display) -> Self {
        StartError::Network(error.to_string())
    }
}
