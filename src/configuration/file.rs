use std::fmt::{self, Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use tracing::debug;

use super::settings::Settings;
use super::traits::ConfigFile;
use super::utilities::render_inline;
use crate::error::{ConfigError, Result};


/// A YAML configuration file.
///
/// Useful to conveniently get or set values in the file that supplied an
/// application's configuration (see `Config::config_file`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "PathBuf", into = "PathBuf")]
pub struct YamlConfigFile {
    path: PathBuf,
}

impl From<PathBuf> for YamlConfigFile {
    fn from(path: PathBuf) -> Self {
        Self { path }
    }
}

impl From<YamlConfigFile> for PathBuf {
    fn from(file: YamlConfigFile) -> Self {
        file.path
    }
}

impl Display for YamlConfigFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "YamlConfigFile({})", self.path.display())
    }
}

impl YamlConfigFile {
    /// The absolute form of this file's path, if it exists.
    pub fn canonical_path(&self) -> Result<PathBuf> {
        dunce::canonicalize(&self.path).map_err(|error| ConfigError::io(&self.path, error))
    }

    fn ensure_is_file(&self) -> Result<()> {
        if !self.path.exists() {
            return Err(ConfigError::FileNotFound {
                path: self.path.clone(),
            });
        }

        if !self.path.is_file() {
            return Err(ConfigError::NotAFile {
                path: self.path.clone(),
            });
        }

        Ok(())
    }

    fn write_string(&self, contents: &str) -> Result<()> {
        fs::write(&self.path, contents).map_err(|error| ConfigError::io(&self.path, error))
    }

    fn write_settings(&self, settings: Settings) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|error| ConfigError::io(parent, error))?;
        }

        let contents = serde_yaml::to_string(&settings.into_value()).map_err(|error| {
            ConfigError::Encode {
                path: self.path.clone(),
                reason: error.to_string(),
            }
        })?;

        self.write_string(&contents)
    }

    /// Rewrite the line holding `key` (or append one), leaving every other
    /// line of the file untouched.
    fn write_key(&self, key: &str, value: Value, allow_new: bool) -> Result<Option<Value>> {
        if self.path.exists() && !self.path.is_file() {
            return Err(ConfigError::NotAFile {
                path: self.path.clone(),
            });
        }

        if !self.path.exists() {
            if !allow_new {
                return Err(ConfigError::FileNotFound {
                    path: self.path.clone(),
                });
            }

            let mut settings = Settings::new();
            settings.insert(key, value);
            self.write_settings(settings)?;

            debug!(file = %self, key, "Created configuration file.");
            return Ok(None);
        }

        let previous_value = self.to_settings()?.get(key).cloned();

        let rendered_value = render_inline(&value).map_err(|reason| ConfigError::Encode {
            path: self.path.clone(),
            reason: format!("value for key \"{}\": {}", key, reason),
        })?;
        let new_line = format!("{}: {}", key, rendered_value);

        let contents =
            fs::read_to_string(&self.path).map_err(|error| ConfigError::io(&self.path, error))?;
        let mut lines: Vec<&str> = contents.split('\n').collect();

        let key_prefix = format!("{}:", key);
        match lines.iter().position(|line| line.starts_with(&key_prefix)) {
            Some(index) => {
                let block_end = value_block_end(&lines, index, key_prefix.len());
                lines.drain(index + 1..block_end);
                lines[index] = new_line.as_str();
            }
            None if allow_new => {
                // Keep the trailing newline (if any) at the very end.
                if lines.last() == Some(&"") {
                    let last = lines.len() - 1;
                    lines.insert(last, new_line.as_str());
                } else {
                    lines.push(new_line.as_str());
                }
            }
            None => {
                return Err(ConfigError::KeyNotFound {
                    key: key.to_string(),
                    path: self.path.clone(),
                });
            }
        }

        let new_contents = lines.join("\n");
        if new_contents != contents {
            self.write_string(&new_contents)?;
        }

        debug!(file = %self, key, "Updated configuration value.");
        Ok(previous_value)
    }
}


/// Index one past the last line belonging to the value that starts at
/// `key_index`. Only a key with an empty inline value (or a `|` / `>` block
/// scalar indicator) owns the indented continuation lines and block-sequence
/// items that follow it; a scalar key owns just its own line.
fn value_block_end(lines: &[&str], key_index: usize, key_prefix_len: usize) -> usize {
    let mut end = key_index + 1;

    let inline_value = lines[key_index][key_prefix_len..].trim();
    let inline_value = match inline_value.find(" #") {
        Some(comment_start) => inline_value[..comment_start].trim_end(),
        None if inline_value.starts_with('#') => "",
        None => inline_value,
    };

    let owns_block = inline_value.is_empty()
        || inline_value.starts_with('|')
        || inline_value.starts_with('>');
    if !owns_block {
        return end;
    }

    while let Some(line) = lines.get(end) {
        let is_continuation = line.starts_with(' ')
            || line.starts_with('\t')
            || line.starts_with("- ")
            || *line == "-";

        if !is_continuation {
            break;
        }

        end += 1;
    }

    end
}


impl ConfigFile for YamlConfigFile {
    const EXTENSIONS: &'static [&'static str] = &["yml", "yaml"];

    fn from_path<P>(path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self { path: path.into() }
    }

    fn new<P>(path: P, fields: Settings) -> Result<Self>
    where
        P: Into<PathBuf>,
    {
        let file = Self::from_path(path);
        file.write_settings(fields)?;

        debug!(file = %file, "Initialized configuration file.");
        Ok(file)
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn to_settings(&self) -> Result<Settings> {
        self.ensure_is_file()?;

        let contents = fs::read(&self.path).map_err(|error| ConfigError::io(&self.path, error))?;
        let document: Value = serde_yaml::from_slice(&contents)
            .map_err(|error| ConfigError::decode(&self.path, error))?;

        match document {
            Value::Null => Ok(Settings::new()),
            Value::Mapping(mapping) => Ok(Settings::from_mapping(mapping)),
            _ => Err(ConfigError::NotAMapping {
                path: self.path.clone(),
            }),
        }
    }

    fn get(&self, key: &str) -> Result<Value> {
        self.to_settings()?
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::KeyNotFound {
                key: key.to_string(),
                path: self.path.clone(),
            })
    }

    fn set(&self, key: &str, value: Value) -> Result<Option<Value>> {
        self.write_key(key, value, false)
    }

    fn upsert(&self, key: &str, value: Value) -> Result<Option<Value>> {
        self.write_key(key, value, true)
    }
}
