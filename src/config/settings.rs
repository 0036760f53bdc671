//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.
//! Every section is optional; an empty file (or no file at all) yields the
//! defaults.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::registry::UnknownFieldPolicy;

/// Root configuration structure.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Server identity settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Dispatch behaviour settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Built-in memory tool settings.
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let policy = self.dispatch.unknown_fields.as_str();
        if !["ignore", "reject"].contains(&policy) {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "Invalid unknown_fields policy '{policy}'. Must be one of: ignore, reject"
                ),
            });
        }
        if self.server.name.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "server.name must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Name advertised during capability negotiation.
    #[serde(default = "default_server_name")]
    pub name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
        }
    }
}

fn default_server_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

/// Dispatch behaviour configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Policy for argument fields a tool's schema does not declare:
    /// "ignore" or "reject". Default: "ignore".
    #[serde(default = "default_unknown_fields")]
    pub unknown_fields: String,

    /// Per-call timeout in seconds. 0 disables the limit.
    #[serde(default)]
    pub call_timeout_secs: u64,
}

impl DispatchConfig {
    /// The parsed unknown-field policy.
    ///
    /// Call only after [`Config::validate`] has accepted the value.
    #[must_use]
    pub fn unknown_field_policy(&self) -> UnknownFieldPolicy {
        if self.unknown_fields == "reject" {
            UnknownFieldPolicy::Reject
        } else {
            UnknownFieldPolicy::Ignore
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            unknown_fields: default_unknown_fields(),
            call_timeout_secs: 0,
        }
    }
}

fn default_unknown_fields() -> String {
    "ignore".to_string()
}

/// Built-in memory tool configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Directory for memory records. Default: `~/.toolhost-mcp/memory`.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_config() {
        let json = r"{}";
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.name, "toolhost-mcp");
        assert_eq!(config.dispatch.call_timeout_secs, 0);
    }

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "_comment": "Test config",
            "server": {
                "name": "memory-tools"
            },
            "dispatch": {
                "unknown_fields": "reject",
                "call_timeout_secs": 30
            },
            "memory": {
                "data_dir": "/var/lib/toolhost/memory"
            },
            "logging": {
                "level": "debug"
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.name, "memory-tools");
        assert_eq!(
            config.dispatch.unknown_field_policy(),
            UnknownFieldPolicy::Reject
        );
        assert_eq!(config.dispatch.call_timeout_secs, 30);
        assert_eq!(
            config.memory.data_dir,
            Some(PathBuf::from("/var/lib/toolhost/memory"))
        );
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn dispatch_defaults_to_permissive_policy() {
        let config = DispatchConfig::default();
        assert_eq!(config.unknown_field_policy(), UnknownFieldPolicy::Ignore);
    }

    #[test]
    fn reject_invalid_unknown_fields_policy() {
        let json = r#"{
            "dispatch": {
                "unknown_fields": "explode"
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_empty_server_name() {
        let json = r#"{
            "server": {
                "name": "  "
            }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn reject_unknown_config_fields() {
        let json = r#"{
            "unknown_field": "value"
        }"#;

        let result: Result<Config, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn logging_defaults_to_warn() {
        assert_eq!(LoggingConfig::default().level, "warn");
    }
}
