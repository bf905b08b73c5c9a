use std::fmt::{self, Display, Formatter};

use serde_yaml::{Mapping, Value};
use tracing::warn;


/// Where a configuration value came from, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// Static field default declared in the schema.
    Default,

    /// One of the configuration files (or the explicit `--config` file).
    File,

    /// An environment variable.
    Environment,

    /// A flag the user actually typed on the command line.
    CommandLine,
}

impl Display for Tier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Default => write!(f, "default"),
            Tier::File => write!(f, "configuration file"),
            Tier::Environment => write!(f, "environment"),
            Tier::CommandLine => write!(f, "command line"),
        }
    }
}


/// Ordered string-keyed mapping of configuration values.
///
/// Merging is shallow: [`Settings::merge`] overwrites whole values key by key,
/// it never descends into nested mappings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    entries: Mapping,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build settings from a decoded YAML mapping.
    ///
    /// Scalar keys (numbers, booleans) are turned into their string form,
    /// anything else that is not a string key is dropped.
    pub fn from_mapping(mapping: Mapping) -> Self {
        let mut settings = Self::new();

        for (key, value) in mapping {
            let key = match key {
                Value::String(key) => key,
                Value::Number(number) => number.to_string(),
                Value::Bool(flag) => flag.to_string(),
                other => {
                    warn!(key = ?other, "Ignoring configuration entry with a non-scalar key.");
                    continue;
                }
            };

            settings.insert(key, value);
        }

        settings
    }

    /// Insert a value, returning the previous one for this key (if any).
    pub fn insert<K>(&mut self, key: K, value: Value) -> Option<Value>
    where
        K: Into<String>,
    {
        self.entries.insert(Value::String(key.into()), value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Overwrite this mapping's keys with every key of `other`.
    pub fn merge(&mut self, other: Settings) {
        for (key, value) in other.entries {
            self.entries.insert(key, value);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries
            .iter()
            .filter_map(|(key, value)| key.as_str().map(|key| (key, value)))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.iter().map(|(key, _)| key)
    }

    pub fn into_mapping(self) -> Mapping {
        self.entries
    }

    pub fn into_value(self) -> Value {
        Value::Mapping(self.entries)
    }
}

impl FromIterator<(String, Value)> for Settings {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut settings = Settings::new();
        for (key, value) in iter {
            settings.insert(key, value);
        }

        settings
    }
}

impl IntoIterator for Settings {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries
            .into_iter()
            .filter_map(|(key, value)| match key {
                Value::String(key) => Some((key, value)),
                _ => None,
            })
            .collect::<Vec<_>>()
            .into_iter()
    }
}
