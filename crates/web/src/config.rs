//! Web server configuration
//!
//! Values come from an optional TOML file named by `LOGINLAB_CONFIG`, then
//! from environment variables, which take precedence:
//!
//! - `LOGINLAB_WEB_HOST` (default `127.0.0.1`)
//! - `LOGINLAB_WEB_PORT` (default `3000`)
//! - `LOGINLAB_LOCALE` (`en` or `es`, default `en`)
//!
//! The allow-list can only be replaced from the file, through `[[users]]`
//! tables. Without them the built-in demo accounts are used.

use std::net::SocketAddr;
use std::path::Path;

use loginlab_common::{Credential, Error, Locale, Result, StaticAllowList};
use serde::Deserialize;

pub const ENV_CONFIG: &str = "LOGINLAB_CONFIG";
pub const ENV_HOST: &str = "LOGINLAB_WEB_HOST";
pub const ENV_PORT: &str = "LOGINLAB_WEB_PORT";
pub const ENV_LOCALE: &str = "LOGINLAB_LOCALE";

/// Web server configuration
#[derive(Debug, Clone)]
pub struct WebServerConfig {
    /// Listen host
    pub host: String,

    /// Listen port
    pub port: u16,

    /// Message and view language
    pub locale: Locale,

    /// Accepted credentials, fixed for the process lifetime
    pub allow_list: StaticAllowList,
}

impl Default for WebServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            locale: Locale::default(),
            allow_list: StaticAllowList::builtin(),
        }
    }
}

/// On-disk shape of the TOML config file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    host: Option<String>,
    port: Option<u16>,
    locale: Option<Locale>,
    users: Option<Vec<Credential>>,
}

impl WebServerConfig {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = match lookup(ENV_CONFIG).filter(|v| !v.trim().is_empty()) {
            Some(path) => Self::from_file(Path::new(path.trim()))?,
            None => Self::default(),
        };
        base.with_overrides(lookup)
    }

    /// Load from a TOML file, filling gaps with defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let file: FileConfig = toml::from_str(content)?;
        let defaults = Self::default();

        let allow_list = match file.users {
            Some(users) => StaticAllowList::new(users)?,
            None => defaults.allow_list,
        };

        Ok(Self {
            host: file.host.unwrap_or(defaults.host),
            port: file.port.unwrap_or(defaults.port),
            locale: file.locale.unwrap_or(defaults.locale),
            allow_list,
        })
    }

    fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(host) = non_empty(ENV_HOST) {
            self.host = host.trim().to_string();
        }
        if let Some(port) = non_empty(ENV_PORT) {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| Error::InvalidConfig(format!("{} is not a port: {}", ENV_PORT, port)))?;
        }
        if let Some(locale) = non_empty(ENV_LOCALE) {
            self.locale = locale.parse()?;
        }
        Ok(self)
    }

    /// Socket address to bind. The host may be an IP literal or a name
    /// such as `localhost`; the first resolved address is used.
    pub async fn addr(&self) -> Result<SocketAddr> {
        let unresolved = |detail: String| {
            Error::InvalidConfig(format!("cannot resolve {}:{}: {}", self.host, self.port, detail))
        };
        tokio::net::lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|e| unresolved(e.to_string()))?
            .next()
            .ok_or_else(|| unresolved("no addresses".to_string()))
    }
}
