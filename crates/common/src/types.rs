//! Core types for loginlab

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A username/password pair on the allow-list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Body of `POST /api/login`.
///
/// Both fields are optional on the wire so that absence and `null` can be
/// reported as a validation error instead of a parse failure. Values are kept
/// exactly as sent: no trimming, no case folding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// Both fields present and non-empty. Whitespace counts as content.
    pub fn is_complete(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().map(|s| !s.is_empty()).unwrap_or(false);
        present(&self.username) && present(&self.password)
    }
}

/// Body of every login response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
}

/// UI and message language
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    #[default]
    En,
    Es,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Es => "es",
        }
    }

    /// Message catalogue for this locale
    pub fn messages(&self) -> &'static Messages {
        match self {
            Locale::En => &EN,
            Locale::Es => &ES,
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Locale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "es" => Ok(Locale::Es),
            other => Err(Error::InvalidConfig(format!("unsupported locale: {}", other))),
        }
    }
}

/// User-visible strings for one locale
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Messages {
    pub required: &'static str,
    pub success: &'static str,
    pub user_not_found: &'static str,
    pub internal: &'static str,
    pub welcome: &'static str,
    pub welcome_detail: &'static str,
    pub submit: &'static str,
    pub username_label: &'static str,
    pub password_label: &'static str,
}

const EN: Messages = Messages {
    required: "username and password are required",
    success: "login successful",
    user_not_found: "user does not exist",
    internal: "server error",
    welcome: "Welcome to the dashboard!",
    welcome_detail: "You have signed in successfully.",
    submit: "Sign in",
    username_label: "Username",
    password_label: "Password",
};

const ES: Messages = Messages {
    required: "Usuario y password son requeridos",
    success: "Login exitoso",
    user_not_found: "usuario no existe",
    internal: "Error en el servidor",
    welcome: "¡Bienvenido al dashboard!",
    welcome_detail: "Has iniciado sesión correctamente.",
    submit: "Ingresar",
    username_label: "Usuario",
    password_label: "Contraseña",
};
