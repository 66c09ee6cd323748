//! Compute Engine client error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GceError {
    #[error("gcloud not found. Please install the Google Cloud SDK")]
    GcloudNotFound,

    #[error("gcloud has no active account: {0}")]
    AuthenticationFailed(String),

    #[error("gcloud command failed: {0}")]
    CommandFailed(String),

    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GceError>;

impl From<GceError> for reaper_cloud::ClientError {
    fn from(err: GceError) -> Self {
        use reaper_cloud::ClientError;
        match err {
            GceError::GcloudNotFound => ClientError::AuthenticationFailed(err.to_string()),
            GceError::AuthenticationFailed(msg) => ClientError::AuthenticationFailed(msg),
            GceError::CommandFailed(msg) => ClientError::CommandFailed(msg),
            GceError::InstanceNotFound(name) => ClientError::ResourceNotFound(name),
            GceError::JsonError(e) => ClientError::Json(e),
            GceError::IoError(e) => ClientError::Io(e),
        }
    }
}
