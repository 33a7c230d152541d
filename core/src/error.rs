/// Error types for the chat client
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    /// Transport failure: no response from the remote service
    #[error("Network error: {0}")]
    Network(String),

    /// Malformed request, e.g. an empty message
    #[error("Validation error: {0}")]
    Validation(String),

    /// Expired or invalid credential, the caller must log in again
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Referenced bot or exchange does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Downstream failure from the model backend
    #[error("Service error: {0}")]
    Service(String),

    /// Response arrived but could not be understood
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ChatError {
    /// Map a non-success HTTP status and its `msg` body to an error kind
    pub fn from_status(status: u16, msg: String) -> Self {
        match status {
            400 | 422 => ChatError::Validation(msg),
            401 | 403 => ChatError::Auth(msg),
            404 => ChatError::NotFound(msg),
            _ => ChatError::Service(msg),
        }
    }

    /// True when the credential was rejected and a new login is needed
    pub fn requires_login(&self) -> bool {
        matches!(self, ChatError::Auth(_))
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(ChatError::from_status(400, "x".into()), ChatError::Validation(_)));
        assert!(matches!(ChatError::from_status(422, "x".into()), ChatError::Validation(_)));
        assert!(matches!(ChatError::from_status(401, "x".into()), ChatError::Auth(_)));
        assert!(matches!(ChatError::from_status(403, "x".into()), ChatError::Auth(_)));
        assert!(matches!(ChatError::from_status(404, "x".into()), ChatError::NotFound(_)));
        assert!(matches!(ChatError::from_status(500, "x".into()), ChatError::Service(_)));
        assert!(matches!(ChatError::from_status(502, "x".into()), ChatError::Service(_)));
        assert!(matches!(ChatError::from_status(409, "x".into()), ChatError::Service(_)));
    }

    #[test]
    fn test_requires_login() {
        assert!(ChatError::Auth("expired".into()).requires_login());
        assert!(!ChatError::Network("down".into()).requires_login());
    }
}
