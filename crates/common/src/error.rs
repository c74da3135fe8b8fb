//! Error types for loginlab

use thiserror::Error;

/// Result type alias using loginlab Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while building or configuring the login service
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Why a login attempt did not succeed.
///
/// Every variant is recovered at the request boundary and reported to the
/// caller; none of them is fatal to the process.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginError {
    /// Username or password missing or empty
    #[error("missing username or password")]
    Validation,

    /// No allow-list record matches. Unknown user and wrong password are
    /// deliberately not distinguished.
    #[error("credentials rejected")]
    Authentication,

    /// Request body could not be interpreted
    #[error("malformed login request")]
    Internal,
}

impl LoginError {
    /// HTTP status code reported for this error
    pub fn status_code(&self) -> u16 {
        match self {
            LoginError::Validation => 400,
            LoginError::Authentication => 401,
            LoginError::Internal => 500,
        }
    }

    /// Short machine-readable label, used for logging
    pub fn kind(&self) -> &'static str {
        match self {
            LoginError::Validation => "validation",
            LoginError::Authentication => "authentication",
            LoginError::Internal => "internal",
        }
    }
}
