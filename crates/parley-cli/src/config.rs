//! Parley CLI Configuration Management
//!
//! Configuration is layered with figment, lowest priority first:
//! - built-in defaults
//! - `parley.toml` in the working directory
//! - `<config dir>/parley/config.toml`
//! - the file given with `--config`
//! - `PARLEY_*` environment variables (`__` separates sections, e.g.
//!   `PARLEY_SESSION__LOCAL_NAME`)
//! - command line flags

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use parley_core::SessionConfig;

use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// CLI Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the Parley CLI application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Session core configuration
    pub session: SessionConfig,

    /// Chat server to connect to
    pub server: ServerConfig,

    /// Terminal output options
    pub terminal: TerminalConfig,
}

/// Chat server address
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: u64,
}

/// Terminal output options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    /// Colour author names
    pub colored_output: bool,
    /// Clear the screen before every redraw of the chat view
    pub clear_screen: bool,
}

/// Values supplied as command line flags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub name: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

// ----------------------------------------------------------------------------
// Default Implementations
// ----------------------------------------------------------------------------

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6667,
            connect_timeout_ms: 5000,
        }
    }
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            colored_output: true,
            clear_screen: true,
        }
    }
}

// ----------------------------------------------------------------------------
// Configuration Loading Logic
// ----------------------------------------------------------------------------

impl AppConfig {
    /// Load configuration from every layer, applying `overrides` last
    pub fn load(config_file: Option<&Path>, overrides: &ConfigOverrides) -> Result<Self> {
        if let Some(path) = config_file.filter(|path| !path.is_file()) {
            return Err(CliError::Config(format!(
                "Configuration file not found: {}",
                path.display()
            )));
        }
        Self::extract(Self::figment(config_file, overrides))
    }

    /// The full provider stack, exposed so callers can add layers of their own
    pub fn figment(config_file: Option<&Path>, overrides: &ConfigOverrides) -> Figment {
        let mut figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file("parley.toml"));

        if let Some(path) = Self::default_config_path() {
            figment = figment.merge(Toml::file(path));
        }
        if let Some(path) = config_file {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("PARLEY_").split("__"));
        Self::apply_overrides(figment, overrides)
    }

    /// Extract and validate a configuration from `figment`
    pub fn extract(figment: Figment) -> Result<Self> {
        let config: AppConfig = figment
            .extract()
            .map_err(|e| CliError::Config(format!("Failed to load configuration: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    fn apply_overrides(mut figment: Figment, overrides: &ConfigOverrides) -> Figment {
        if let Some(name) = &overrides.name {
            figment = figment.merge(("session.local_name", name));
        }
        if let Some(host) = &overrides.host {
            figment = figment.merge(("server.host", host));
        }
        if let Some(port) = overrides.port {
            figment = figment.merge(("server.port", port));
        }
        figment
    }

    /// `<config dir>/parley/config.toml`, if the platform has a config directory
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("parley").join("config.toml"))
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<()> {
        self.session
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;

        if self.server.host.trim().is_empty() {
            return Err(CliError::Config("Server host must not be empty".to_string()));
        }
        if self.server.port == 0 {
            return Err(CliError::Config("Server port must be greater than 0".to_string()));
        }
        if self.server.connect_timeout_ms == 0 {
            return Err(CliError::Config(
                "Connect timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.server.connect_timeout_ms)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::SortCriterion;

    fn layered(toml: &str, overrides: &ConfigOverrides) -> Result<AppConfig> {
        let figment = Figment::new()
            .merge(Serialized::defaults(AppConfig::default()))
            .merge(Toml::string(toml));
        AppConfig::extract(AppConfig::apply_overrides(figment, overrides))
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.session.local_name, "Anonymous");
        assert_eq!(config.server.port, 6667);
        assert!(config.terminal.colored_output);
    }

    #[test]
    fn test_file_layer_overrides_defaults() {
        let config = layered(
            r#"
            [session]
            local_name = "alice"
            initial_order = "author"

            [server]
            host = "chat.example.org"
            "#,
            &ConfigOverrides::default(),
        )
        .unwrap();

        assert_eq!(config.session.local_name, "alice");
        assert_eq!(config.session.initial_order, SortCriterion::Author);
        assert_eq!(config.session.bye_command, "bye");
        assert_eq!(config.server.host, "chat.example.org");
        assert_eq!(config.server.port, 6667);
    }

    #[test]
    fn test_flags_override_file() {
        let overrides = ConfigOverrides {
            name: Some("bob".into()),
            host: None,
            port: Some(7000),
        };
        let config = layered("[session]\nlocal_name = \"alice\"\n", &overrides).unwrap();
        assert_eq!(config.session.local_name, "bob");
        assert_eq!(config.server.port, 7000);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let overrides = ConfigOverrides::default();
        assert!(layered("[server]\nport = 0\n", &overrides).is_err());
        assert!(layered("[session]\nlocal_name = \"  \"\n", &overrides).is_err());
        assert!(layered("[session]\ninitial_order = \"mood\"\n", &overrides).is_err());
    }

    #[test]
    fn test_missing_explicit_file_rejected() {
        let missing = Path::new("/nonexistent/parley/custom.toml");
        assert!(AppConfig::load(Some(missing), &ConfigOverrides::default()).is_err());
    }
}
