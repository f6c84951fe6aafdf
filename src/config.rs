//! Relay configuration parsed from environment variables.

use std::net::SocketAddr;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid PORT: {0}")]
    InvalidPort(String),
    #[error("invalid listen address {0}")]
    InvalidAddr(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    pub listen_addr: SocketAddr,
}

impl RelayConfig {
    /// Build typed relay config from environment variables.
    ///
    /// Optional:
    /// - `HOST`: listen IP, default `0.0.0.0`
    /// - `PORT`: listen port, default 8080
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is set but unparseable.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`RelayConfig::from_env`] with an explicit variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable is set but unparseable.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = parse_port(lookup("PORT").as_deref())?;

        let listen_addr = format!("{host}:{port}")
            .parse::<SocketAddr>()
            .or_else(|_| format!("[{host}]:{port}").parse::<SocketAddr>())
            .map_err(|_| ConfigError::InvalidAddr(format!("{host}:{port}")))?;

        Ok(Self { listen_addr })
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { listen_addr: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)) }
    }
}

fn parse_port(raw: Option<&str>) -> Result<u16, ConfigError> {
    match raw {
        None => Ok(DEFAULT_PORT),
        Some(v) => v.trim().parse().map_err(|_| ConfigError::InvalidPort(v.to_string())),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
