//! Process configuration.
//!
//! Parse, validate, default, structured error: the same shape used
//! for configuration elsewhere in this workspace, adapted from
//! environment variables to a pair of positional CLI arguments and
//! parsed with `clap`.

use std::time::Duration;

use clap::Parser;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 6666;
pub const DEFAULT_PASSWORD: &str = "admin";
const MAX_ARG_LEN: usize = 4096;
const MIN_PORT: u16 = 1024;

/// A positional-argument CLI: an optional port and an optional admin
/// password, both defaulted when absent.
#[derive(Parser, Debug)]
#[command(name = "wardd", about = "access-controlled key-value store server")]
struct Cli {
    port: Option<String>,
    admin_password: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid port: {0:?}")]
    InvalidPort(String),
    #[error("port {0} is out of range {MIN_PORT}-65535")]
    PortOutOfRange(u32),
    #[error("admin password contains characters outside the allowed set")]
    InvalidPassword,
    #[error("admin password exceeds {MAX_ARG_LEN} bytes")]
    PasswordTooLong,
}

/// Resolved, validated server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub admin_password: String,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl ServerConfig {
    /// Parses `args` (excluding argv[0]) into a validated config.
    /// Any violation is a [`ConfigError`]; the `main` boundary maps
    /// every variant to exit code 255, never a panic.
    pub fn from_args(args: &[String]) -> Result<Self, ConfigError> {
        let cli = Cli::try_parse_from(std::iter::once(&"wardd".to_string()).chain(args))
            .map_err(|_| ConfigError::InvalidPort("unparseable arguments".to_string()))?;

        let port = match cli.port {
            None => DEFAULT_PORT,
            Some(raw) => parse_port(&raw)?,
        };
        let admin_password = match cli.admin_password {
            None => DEFAULT_PASSWORD.to_string(),
            Some(raw) => validate_password(raw)?,
        };

        Ok(Self {
            port,
            admin_password,
            read_timeout: Duration::from_secs(10),
            write_timeout: Duration::from_secs(10),
        })
    }
}

fn parse_port(raw: &str) -> Result<u16, ConfigError> {
    if raw.is_empty() || raw.len() > MAX_ARG_LEN {
        return Err(ConfigError::InvalidPort(raw.to_string()));
    }
    if raw.len() > 1 && raw.starts_with('0') {
        return Err(ConfigError::InvalidPort(raw.to_string()));
    }
    let value: u32 = raw.parse().map_err(|_| ConfigError::InvalidPort(raw.to_string()))?;
    if !(MIN_PORT as u32..=65535).contains(&value) {
        return Err(ConfigError::PortOutOfRange(value));
    }
    Ok(value as u16)
}

fn validate_password(raw: String) -> Result<String, ConfigError> {
    if raw.len() > MAX_ARG_LEN {
        return Err(ConfigError::PasswordTooLong);
    }
    if !raw.bytes().all(is_allowed_password_byte) {
        return Err(ConfigError::InvalidPassword);
    }
    Ok(raw)
}

fn is_allowed_password_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b' ' | b',' | b';' | b'.' | b'?' | b'!' | b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_no_args_given() {
        let cfg = ServerConfig::from_args(&[]).unwrap();
        assert_eq!(cfg.port, DEFAULT_PORT);
        assert_eq!(cfg.admin_password, DEFAULT_PASSWORD);
    }

    #[test]
    fn rejects_leading_zero_port() {
        assert_eq!(parse_port("01024"), Err(ConfigError::InvalidPort("01024".to_string())));
    }

    #[test]
    fn rejects_out_of_range_port() {
        assert_eq!(parse_port("80"), Err(ConfigError::PortOutOfRange(80)));
        assert_eq!(parse_port("70000"), Err(ConfigError::PortOutOfRange(70000)));
    }

    #[test]
    fn accepts_boundary_ports() {
        assert_eq!(parse_port("1024").unwrap(), 1024);
        assert_eq!(parse_port("65535").unwrap(), 65535);
    }

    #[test]
    fn rejects_password_with_disallowed_characters() {
        assert_eq!(validate_password("hi@there".to_string()), Err(ConfigError::InvalidPassword));
    }

    #[test]
    fn full_config_from_positional_args() {
        let cfg = ServerConfig::from_args(&["7000".to_string(), "s3cret".to_string()]).unwrap();
        assert_eq!(cfg.port, 7000);
        assert_eq!(cfg.admin_password, "s3cret");
    }
}
