use thiserror::Error;

#[derive(Error, Debug)]
pub enum SnopError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session storage error: {0}")]
    Session(String),
}

/// Failures of a single relay operation.
///
/// Every variant maps onto the uniform `{error, detail}` envelope at the HTTP
/// boundary: validation failures become 400, everything else 500.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Rejected before any network call.
    #[error("{0}")]
    Validation(String),

    /// The upstream answered with a non-success status.
    #[error("Backend API error: {status} ({message})")]
    Backend { status: u16, message: String },

    /// The upstream could not be reached, timed out, or sent an unreadable body.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

impl RelayError {
    pub fn is_validation(&self) -> bool {
        matches!(self, RelayError::Validation(_))
    }
}
