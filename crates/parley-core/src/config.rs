//! Session configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::ordering::SortCriterion;

// ----------------------------------------------------------------------------
// Session Configuration
// ----------------------------------------------------------------------------

/// Configuration for a single chat session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Local participant name, registered as soon as the session starts
    pub local_name: String,
    /// Command sent once on orderly shutdown
    pub bye_command: String,
    /// Prefix of the per-participant kick command
    pub kick_prefix: String,
    /// Whether the selection filter starts enabled
    pub filter_enabled: bool,
    /// Sort criterion active at session start
    pub initial_order: SortCriterion,
    /// How long the ingestion loop waits for its input stream (milliseconds)
    pub stream_wait_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            local_name: "Anonymous".to_string(),
            bye_command: "bye".to_string(),
            kick_prefix: "Kick".to_string(),
            filter_enabled: false,
            initial_order: SortCriterion::Date,
            stream_wait_timeout_ms: 5000,
        }
    }
}

impl SessionConfig {
    /// Default configuration for the named participant
    pub fn for_participant(local_name: impl Into<String>) -> Self {
        Self {
            local_name: local_name.into(),
            ..Self::default()
        }
    }

    pub fn stream_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.stream_wait_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.local_name.trim().is_empty() {
            return Err(ConfigError::Invalid {
                reason: "local participant name must not be empty".into(),
            });
        }
        if self.bye_command.trim().is_empty() {
            return Err(ConfigError::Invalid {
                reason: "bye command must not be empty".into(),
            });
        }
        if self.kick_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid {
                reason: "kick prefix must not be empty".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SessionConfig::default().validate().is_ok());
    }

    #[test]
    fn test_empty_name_rejected() {
        let config = SessionConfig::for_participant("  ");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"local_name":"alice","initial_order":"author"}"#).unwrap();
        assert_eq!(config.local_name, "alice");
        assert_eq!(config.initial_order, SortCriterion::Author);
        assert_eq!(config.bye_command, "bye");
        assert_eq!(config.stream_wait_timeout(), Duration::from_secs(5));
    }
}
