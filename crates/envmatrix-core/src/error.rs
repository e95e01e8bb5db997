use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvMatrixError {
    #[error("{0} environment variable is not set")]
    MissingCredential(&'static str),

    #[error("unauthorized for app '{app}': {id}: {message}")]
    Unauthorized {
        app: String,
        id: String,
        message: String,
    },

    #[error("unexpected HTTP status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("malformed response body: {0}")]
    MalformedBody(String),

    #[error("config file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl EnvMatrixError {
    /// True when the failure points at the API key rather than the remote
    /// service or the network.
    pub fn is_credential_failure(&self) -> bool {
        matches!(
            self,
            EnvMatrixError::Unauthorized { .. } | EnvMatrixError::MissingCredential(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EnvMatrixError>;
