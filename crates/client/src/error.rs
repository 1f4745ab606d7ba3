use fleetgate_core::errors::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never produced an HTTP response: connect failure, timeout, broken body.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server answered {status}: {message}")]
    Api { status: u16, message: String, correlation_id: Option<String> },
    #[error("no access token; log in first")]
    NotAuthenticated,
    #[error("invalid base url `{0}`")]
    InvalidBaseUrl(String),
}

impl ClientError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Workflow error class behind an API failure, when the status carries one.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self.status()? {
            403 => Some(ErrorKind::Authorization),
            409 => Some(ErrorKind::InvalidState),
            400 | 422 => Some(ErrorKind::Validation),
            _ => None,
        }
    }

    /// The booking changed under the caller; refetch before trying again.
    pub fn needs_refresh(&self) -> bool {
        self.kind() == Some(ErrorKind::InvalidState)
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}
