use std::path::{Path, PathBuf};

use clap::Command;
use serde::de::DeserializeOwned;
use serde_yaml::Value;

use super::schema::Field;
use super::settings::Settings;
use crate::error::Result;


/// Represents a configuration that can be validated or resolved,
/// but where that process requires some additional context.
pub trait ResolvableConfigurationWithContext {
    type Context;
    type Resolved;

    /// Resolve the configuration into its `Resolved` type.
    /// If the resolution / validation fails, you may return `Err` to indicate
    /// that the configuration is invalid.
    fn resolve(self, context: Self::Context) -> Result<Self::Resolved>;
}


/// An application's configuration type.
///
/// Implementors describe their fields (with static defaults) and their
/// command-line flags; construction itself goes through `serde`.
/// Flags are matched to fields by argument id, so `Arg::new("bar").long("some-bar")`
/// sets the `bar` field.
///
/// Implementors should not use `#[serde(deny_unknown_fields)]`: the merged
/// mapping also carries the reserved `config_file`, `logs` and `verbose` keys.
pub trait AppConfig: DeserializeOwned {
    /// Fields this application reads from configuration files, the
    /// environment and the command line.
    fn fields() -> Vec<Field>;

    /// Add application-specific arguments to the base command.
    fn arguments(command: Command) -> Command {
        command
    }
}


/// A single structured configuration file on disk.
///
/// Handles are cheap: constructing one performs no I/O and no file handle is
/// kept open between calls.
pub trait ConfigFile: Sized {
    /// Recognized filename extensions, in lookup order.
    const EXTENSIONS: &'static [&'static str];

    /// Create a handle for `path` without touching the filesystem.
    fn from_path<P>(path: P) -> Self
    where
        P: Into<PathBuf>;

    /// Eagerly create the file (and its parent directories) with `fields`
    /// as its initial content.
    fn new<P>(path: P, fields: Settings) -> Result<Self>
    where
        P: Into<PathBuf>;

    fn path(&self) -> &Path;

    /// Read and decode the whole file.
    fn to_settings(&self) -> Result<Settings>;

    /// Look up a single top-level key.
    fn get(&self, key: &str) -> Result<Value>;

    /// Replace the value of an existing key, returning the previous value.
    /// Fails if the file or the key does not exist.
    fn set(&self, key: &str, value: Value) -> Result<Option<Value>>;

    /// Like [`ConfigFile::set`], but creates the file or appends the key
    /// when they do not exist yet.
    fn upsert(&self, key: &str, value: Value) -> Result<Option<Value>>;
}
