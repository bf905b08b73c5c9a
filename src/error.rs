//! Error types used across the configuration resolution layer.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::configuration::Tier;


/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;


/// Everything that can go wrong while locating, reading, editing or
/// assembling configuration.
///
/// "Missing" conditions ([`ConfigError::FileNotFound`] and
/// [`ConfigError::KeyNotFound`]) are expected and recoverable,
/// see [`ConfigError::is_missing`]. The rest are hard failures.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("Configuration file does not exist: {}", path.display())]
    #[diagnostic(code(cliconf::file::not_found))]
    FileNotFound { path: PathBuf },

    #[error("Configuration path exists, but is not a file: {}", path.display())]
    #[diagnostic(code(cliconf::file::not_a_file))]
    NotAFile { path: PathBuf },

    #[error("Key \"{key}\" is not present in configuration file {}", path.display())]
    #[diagnostic(code(cliconf::file::key_not_found))]
    KeyNotFound { key: String, path: PathBuf },

    #[error("I/O error at {}", path.display())]
    #[diagnostic(code(cliconf::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode YAML configuration file {}", path.display())]
    #[diagnostic(
        code(cliconf::file::decode),
        help("Fix the syntax of this file or remove it; it is never skipped silently.")
    )]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Top-level document of {} is not a mapping", path.display())]
    #[diagnostic(code(cliconf::file::not_a_mapping))]
    NotAMapping { path: PathBuf },

    #[error("Could not encode configuration for {}: {reason}", path.display())]
    #[diagnostic(code(cliconf::file::encode))]
    Encode { path: PathBuf, reason: String },

    #[error("Invalid value {value} for field \"{field}\" (from {tier}): {reason}")]
    #[diagnostic(code(cliconf::validation))]
    Validation {
        field: String,
        value: String,
        tier: Tier,
        reason: String,
    },

    #[error("Missing value for required field \"{field}\"")]
    #[diagnostic(
        code(cliconf::missing_field),
        help("Set it in a configuration file, the environment or on the command line.")
    )]
    MissingField { field: String },

    #[error("Failed to construct the configuration object")]
    #[diagnostic(code(cliconf::deserialize))]
    Deserialize {
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Bad log specification \"{spec}\": {reason}")]
    #[diagnostic(
        code(cliconf::logging::sink),
        help("Log sinks look like FILE[:LEVEL][@FORMAT], e.g. stderr:debug or +app@json.")
    )]
    InvalidLogSink { spec: String, reason: String },

    #[error("Failed to initialize logging: {reason}")]
    #[diagnostic(code(cliconf::logging::init))]
    Logging { reason: String },

    #[error(transparent)]
    #[diagnostic(code(cliconf::cli))]
    Cli(#[from] clap::Error),
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn decode(path: impl Into<PathBuf>, source: serde_yaml::Error) -> Self {
        Self::Decode {
            path: path.into(),
            source,
        }
    }

    /// Whether this error only reports something being absent
    /// (a missing file or a missing key).
    pub fn is_missing(&self) -> bool {
        matches!(
            self,
            ConfigError::FileNotFound { .. } | ConfigError::KeyNotFound { .. }
        )
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_conditions_are_discriminated() {
        let not_found = ConfigError::FileNotFound {
            path: PathBuf::from("app.yml"),
        };
        let no_key = ConfigError::KeyNotFound {
            key: "foo".to_string(),
            path: PathBuf::from("app.yml"),
        };
        let not_a_file = ConfigError::NotAFile {
            path: PathBuf::from("app"),
        };

        assert!(not_found.is_missing());
        assert!(no_key.is_missing());
        assert!(!not_a_file.is_missing());
    }

    #[test]
    fn key_not_found_names_key_and_file() {
        let error = ConfigError::KeyNotFound {
            key: "bar".to_string(),
            path: PathBuf::from("demo/config.yml"),
        };

        let message = error.to_string();
        assert!(message.contains("\"bar\""));
        assert!(message.contains("demo/config.yml"));
    }
}
