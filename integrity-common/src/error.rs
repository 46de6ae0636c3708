//! Common error types for IntegrityOS

use thiserror::Error;

/// Common result type for IntegrityOS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared by every client component
///
/// Errors are caught at the component boundary and turned into an inline
/// message with [`Error::user_message`]; nothing is escalated to a global handler.
#[derive(Error, Debug)]
pub enum Error {
    /// Request could not be sent or the connection failed
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-success status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// Invalid user input (bad import file type, malformed permit number, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Report rendering or export failed
    #[error("Render error: {0}")]
    Render(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Short text suitable for an inline message next to the failing widget
    pub fn user_message(&self) -> String {
        match self {
            Error::Network(_) => "Backend is unreachable. Showing last known data.".to_string(),
            Error::Api { status, message } if *status >= 500 => {
                format!("Server error ({}): {}", status, message)
            }
            Error::Api { message, .. } => message.clone(),
            Error::Decode(_) => "Unexpected response from the server.".to_string(),
            Error::Validation(msg) => msg.clone(),
            Error::Render(msg) => format!("Export failed: {}", msg),
            Error::Io(err) => format!("File error: {}", err),
            Error::Config(msg) => format!("Configuration problem: {}", msg),
            Error::NotFound(what) => format!("{} not found", what),
            Error::Internal(msg) => format!("Unexpected error: {}", msg),
        }
    }

    /// True for failures where demo data may stand in for live data
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Network(_) | Error::Decode(_))
            || matches!(self, Error::Api { status, .. } if *status >= 500)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Decode(err.to_string())
    }
}
