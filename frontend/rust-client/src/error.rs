use reqwest::StatusCode;
use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Rejected locally, before any request was sent.
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Http { status: StatusCode, message: String },

    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("not signed in")]
    Unauthenticated,

    #[error("{0}")]
    Auth(String),

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Http { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthenticated)
            || self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

impl From<validator::ValidationErrors> for ClientError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ClientError::Validation(errors.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Decode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_reports_status() {
        let err = ClientError::Http {
            status: StatusCode::NOT_FOUND,
            message: "Quiz not found".to_string(),
        };
        assert!(err.is_not_found());
        assert!(!err.is_unauthorized());
        assert_eq!(err.to_string(), "Quiz not found");
    }

    #[test]
    fn test_unauthenticated_counts_as_unauthorized() {
        assert!(ClientError::Unauthenticated.is_unauthorized());
        assert_eq!(ClientError::Unauthenticated.status(), None);
    }
}
