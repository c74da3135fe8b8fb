//! loginlab Common Library
//!
//! Shared types and the credential validator used by the web server and the
//! end-to-end suites.

pub mod error;
pub mod types;
pub mod validator;

// Re-export commonly used types
pub use error::{Error, LoginError, Result};
pub use types::{Credential, Locale, LoginRequest, LoginResponse, Messages};
pub use validator::{AllowList, CredentialValidator, LoginOutcome, StaticAllowList};

/// loginlab version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
