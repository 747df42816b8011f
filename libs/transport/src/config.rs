//! Transport configuration
//!
//! Defaults first, then an optional TOML document, then environment
//! variables; later layers override earlier ones. Environment names are
//! prefixed `MAL_TRANSPORT_`.

use crate::error::{TransportError, TransportResult};
use serde::Deserialize;

/// Tunable behavior of a transport instance
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportConfig {
    /// Encode each body part as a standalone length-delimited unit so that
    /// relays can extract parts without decoding them
    pub wrap_body_parts: bool,
    /// Log every outgoing frame at debug level (hex dump, size)
    pub verbose_packets: bool,
    /// Queue depth at which the pump starts warning about backlog
    pub queue_warn_depth: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            wrap_body_parts: false,
            verbose_packets: false,
            queue_warn_depth: 1024,
        }
    }
}

impl TransportConfig {
    /// Defaults with environment overrides applied
    pub fn from_env() -> TransportResult<Self> {
        Self::default().with_env_overrides()
    }

    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(toml: &str) -> TransportResult<Self> {
        toml::from_str(toml).map_err(|e| TransportError::configuration(e.to_string()))
    }

    /// Apply `MAL_TRANSPORT_*` environment overrides on top of `self`
    pub fn with_env_overrides(mut self) -> TransportResult<Self> {
        if let Some(v) = read_env_bool("MAL_TRANSPORT_WRAP_BODY_PARTS")? {
            self.wrap_body_parts = v;
        }
        if let Some(v) = read_env_bool("MAL_TRANSPORT_VERBOSE_PACKETS")? {
            self.verbose_packets = v;
        }
        if let Ok(raw) = std::env::var("MAL_TRANSPORT_QUEUE_WARN_DEPTH") {
            self.queue_warn_depth = raw.parse().map_err(|_| {
                TransportError::configuration(format!(
                    "MAL_TRANSPORT_QUEUE_WARN_DEPTH must be an integer, got '{raw}'"
                ))
            })?;
        }
        Ok(self)
    }
}

fn read_env_bool(name: &str) -> TransportResult<Option<bool>> {
    match std::env::var(name) {
        Err(_) => Ok(None),
        Ok(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(Some(true)),
            "0" | "false" | "no" => Ok(Some(false)),
            _ => Err(TransportError::configuration(format!(
                "{name} must be a boolean, got '{raw}'"
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TransportConfig::default();
        assert!(!config.wrap_body_parts);
        assert!(!config.verbose_packets);
        assert_eq!(config.queue_warn_depth, 1024);
    }

    #[test]
    fn test_toml_partial_document() {
        let config = TransportConfig::from_toml_str("wrap_body_parts = true\n").unwrap();
        assert!(config.wrap_body_parts);
        // Unset keys keep their defaults
        assert_eq!(config.queue_warn_depth, 1024);
    }

    #[test]
    fn test_toml_unknown_key_rejected() {
        assert!(TransportConfig::from_toml_str("wrap_bodyparts = true\n").is_err());
    }

    #[test]
    fn test_toml_full_document() {
        let config = TransportConfig::from_toml_str(
            r#"
            wrap_body_parts = true
            verbose_packets = true
            queue_warn_depth = 64
            "#,
        )
        .unwrap();
        assert!(config.wrap_body_parts);
        assert!(config.verbose_packets);
        assert_eq!(config.queue_warn_depth, 64);
    }
}
