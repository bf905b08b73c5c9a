//! XDG base directory helpers.
//!
//! All lookups go through an [`Environment`] snapshot rather than `std::env`,
//! so callers control exactly which `XDG_*` and `HOME` values are seen.

use std::fs;
use std::path::PathBuf;

use crate::configuration::Environment;
use crate::error::{ConfigError, Result};


/// The kinds of XDG user directories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XdgKind {
    Cache,
    Config,
    Data,
    Runtime,
}

impl XdgKind {
    /// The environment variable that overrides this directory.
    pub fn variable(self) -> &'static str {
        match self {
            XdgKind::Cache => "XDG_CACHE_HOME",
            XdgKind::Config => "XDG_CONFIG_HOME",
            XdgKind::Data => "XDG_DATA_HOME",
            XdgKind::Runtime => "XDG_RUNTIME_DIR",
        }
    }

    fn default_dir(self, home: PathBuf) -> PathBuf {
        match self {
            XdgKind::Cache => home.join(".cache"),
            XdgKind::Config => home.join(".config"),
            XdgKind::Data => home.join(".local").join("share"),
            XdgKind::Runtime => PathBuf::from("/tmp"),
        }
    }
}


fn home_dir(environment: &Environment) -> PathBuf {
    environment
        .get("HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_default()
}


/// The base (shared by all applications) XDG directory, e.g. `~/.config`.
pub fn base_dir(kind: XdgKind, environment: &Environment) -> PathBuf {
    match environment
        .get(kind.variable())
        .filter(|directory| !directory.is_empty())
    {
        Some(directory) => PathBuf::from(directory),
        None => kind.default_dir(home_dir(environment)),
    }
}

/// The per-application XDG directory, e.g. `~/.config/<app_name>`.
pub fn full_dir(kind: XdgKind, app_name: &str, environment: &Environment) -> PathBuf {
    base_dir(kind, environment).join(app_name)
}

/// Like [`full_dir`], but also makes sure the directory exists.
pub fn init_full_dir(kind: XdgKind, app_name: &str, environment: &Environment) -> Result<PathBuf> {
    let directory = full_dir(kind, app_name, environment);

    fs::create_dir_all(&directory).map_err(|error| ConfigError::io(&directory, error))?;

    Ok(directory)
}
