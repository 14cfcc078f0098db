//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use std::collections::HashSet;

use encoding_rs::Encoding;
use thiserror::Error;

use super::Config;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("identity.nick is required")]
    MissingNick,
    #[error("server.id is required")]
    MissingServerId,
    #[error("duplicate server id: {0}")]
    DuplicateServerId(String),
    #[error("server {0}: host is required")]
    MissingHost(String),
    #[error("server {0}: port must be non-zero")]
    InvalidPort(String),
    #[error("unknown encoding label: {0}")]
    UnknownEncoding(String),
    #[error("keepalive probe ticks must be non-zero")]
    InvalidKeepalive,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.identity.nick.trim().is_empty() {
        errors.push(ValidationError::MissingNick);
    }

    let mut seen = HashSet::new();
    for server in &config.servers {
        if server.id.is_empty() {
            errors.push(ValidationError::MissingServerId);
        } else if !seen.insert(server.id.as_str()) {
            errors.push(ValidationError::DuplicateServerId(server.id.clone()));
        }
        if server.host.is_empty() {
            errors.push(ValidationError::MissingHost(server.id.clone()));
        }
        if server.port == 0 {
            errors.push(ValidationError::InvalidPort(server.id.clone()));
        }
    }

    let labels = std::iter::once(&config.encoding.default)
        .chain(config.encoding.channels.values())
        .chain(config.encoding.masks.values())
        .chain(config.servers.iter().filter_map(|s| s.encoding.as_ref()));
    for label in labels {
        if Encoding::for_label(label.as_bytes()).is_none() {
            errors.push(ValidationError::UnknownEncoding(label.clone()));
        }
    }

    if config.keepalive.probe_ticks == 0 || config.keepalive.frequent_probe_ticks == 0 {
        errors.push(ValidationError::InvalidKeepalive);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_every_error() {
        let config: Config = toml::from_str(
            r#"
[identity]
nick = ""

[encoding]
default = "klingon"

[[server]]
id = "a"
host = ""

[[server]]
id = "a"
host = "irc.example.net"
port = 0
"#,
        )
        .unwrap();

        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::MissingNick)));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::MissingHost(_))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::DuplicateServerId(_))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::InvalidPort(_))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::UnknownEncoding(_))));
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }
}
