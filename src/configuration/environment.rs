//! Snapshot of the process environment and the environment-variable
//! configuration source.

use std::collections::BTreeMap;

use serde_yaml::Value;
use tracing::trace;

use super::schema::Schema;
use super::settings::Settings;


/// An immutable snapshot of environment variables.
///
/// Resolution never reads `std::env` directly; it reads one of these.
/// Tests (and embedding applications) can build their own snapshot instead of
/// mutating the real process environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Environment {
    variables: BTreeMap<String, String>,
}

impl Environment {
    /// Capture the current process environment.
    /// Variables whose name or value is not valid Unicode are skipped.
    pub fn from_process() -> Self {
        std::env::vars_os()
            .filter_map(|(name, value)| Some((name.into_string().ok()?, value.into_string().ok()?)))
            .collect()
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Return a copy of this snapshot with `name` set to `value`.
    pub fn with<N, V>(mut self, name: N, value: V) -> Self
    where
        N: Into<String>,
        V: Into<String>,
    {
        self.variables.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// Look up a variable ignoring ASCII case. An exact match wins over
    /// case-insensitive ones.
    pub fn get_ignore_case(&self, name: &str) -> Option<&str> {
        if let Some(value) = self.get(name) {
            return Some(value);
        }

        self.variables
            .iter()
            .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.variables
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }
}

impl<N, V> FromIterator<(N, V)> for Environment
where
    N: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        Self {
            variables: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}


/// Collect the environment-derived settings for every field in `schema`.
///
/// A field `bar` is read from the variable `<prefix>bar`, matched ignoring case
/// (so `BAR` works with an empty prefix, `APP_BAR` with prefix `app_`).
/// Values are left as strings; the schema coerces them later.
pub fn environment_settings(
    schema: &Schema,
    prefix: Option<&str>,
    environment: &Environment,
) -> Settings {
    let prefix = prefix.unwrap_or_default();
    let mut settings = Settings::new();

    for field in schema.fields() {
        let variable_name = format!("{}{}", prefix, field.name());

        if let Some(value) = environment.get_ignore_case(&variable_name) {
            trace!(
                field = field.name(),
                variable = %variable_name,
                "Found configuration value in environment."
            );
            settings.insert(field.name(), Value::String(value.to_string()));
        }
    }

    settings
}
