/// Error taxonomy for the extension
use thiserror::Error;

pub type LinkResult<T> = Result<T, LinkError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("Not authenticated. Please log in from the options page.")]
    Unauthenticated,
    #[error("Session expired. Please log in again from the options page.")]
    SessionExpired,
    #[error("Network error while calling API")]
    Network,
    #[error("{0}")]
    Api(String),
    #[error("Invalid JSON response from API")]
    InvalidResponse,
    #[error("Missing token")]
    MissingToken,
    #[error("Invalid token")]
    InvalidToken,
    #[error("Storage error: {0}")]
    Storage(String),
}
