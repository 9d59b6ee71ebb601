use thiserror::Error;

/// Errors surfaced by the API client, the credential store and the background tasks.
///
/// Every variant renders as a human readable line; the presentation layers show
/// `to_string()` to the user as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// Missing or corrupt settings/credentials. Recoverable by re-entering them.
    #[error("configuration error: {0}")]
    Config(String),

    /// Email or API key was empty when building a client.
    #[error("API key and email must not be empty")]
    InvalidCredentials,

    /// Network failure, non-JSON answer or any other transport level problem.
    #[error("API request failed: {0}")]
    Transport(String),

    /// The provider rejected the request. The message is the provider's own text.
    #[error("API request failed: {message}")]
    Api { status: u16, message: String },

    /// None of the public IP mirrors produced a usable address.
    #[error("{0}")]
    PublicIp(String),

    /// A background task panicked or was cancelled before producing a result.
    #[error("background task failed: {0}")]
    Task(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
