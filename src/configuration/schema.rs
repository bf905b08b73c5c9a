//! Field schema: names, kinds and static defaults of the configuration,
//! plus the coercion rules applied to every value before it reaches
//! the final configuration object.

use std::fs;

use serde_yaml::Value;

use super::settings::{Settings, Tier};
use super::utilities::render_inline;
use crate::error::{ConfigError, Result};


/// Reserved field: the configuration file that supplied values.
pub const CONFIG_FILE_FIELD: &str = "config_file";

/// Reserved field: log sink specifications.
pub const LOGS_FIELD: &str = "logs";

/// Reserved field: verbosity level.
pub const VERBOSE_FIELD: &str = "verbose";

/// Name of the selected subcommand, for applications made of subcommands.
/// Only ever set from the command line.
pub const COMMAND_FIELD: &str = "command";


/// The type a field's value is coerced to.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Integer,
    /// A non-negative counter, at most 255 (e.g. a verbosity level).
    Count,
    Float,
    Boolean,
    Path,
    List(Box<FieldKind>),
    /// Like [`FieldKind::List`], but a string naming an existing file of
    /// newline-separated values is replaced by those values.
    ListOrFile(Box<FieldKind>),
    /// No coercion at all; the value is passed through as decoded.
    Any,
}

impl FieldKind {
    pub fn list_of(kind: FieldKind) -> Self {
        FieldKind::List(Box::new(kind))
    }

    pub fn list_or_file_of(kind: FieldKind) -> Self {
        FieldKind::ListOrFile(Box::new(kind))
    }

    fn coerce(&self, value: Value) -> std::result::Result<Value, String> {
        match self {
            FieldKind::Any => Ok(value),
            FieldKind::String => match value {
                Value::String(_) => Ok(value),
                Value::Number(number) => Ok(Value::String(number.to_string())),
                Value::Bool(flag) => Ok(Value::String(flag.to_string())),
                _ => Err("expected a string".to_string()),
            },
            FieldKind::Path => match value {
                Value::String(ref path) if !path.is_empty() => Ok(value),
                Value::String(_) => Err("expected a non-empty path".to_string()),
                _ => Err("expected a path".to_string()),
            },
            FieldKind::Integer => coerce_integer(value),
            FieldKind::Count => coerce_count(value),
            FieldKind::Float => coerce_float(value),
            FieldKind::Boolean => coerce_boolean(value),
            FieldKind::List(inner) => coerce_list(inner, value),
            FieldKind::ListOrFile(inner) => match value {
                Value::String(ref text) => match read_value_lines(text) {
                    Some(items) => coerce_list(inner, Value::Sequence(items)),
                    None => coerce_list(inner, value),
                },
                _ => coerce_list(inner, value),
            },
        }
    }
}


fn coerce_integer(value: Value) -> std::result::Result<Value, String> {
    match value {
        Value::Number(ref number) if number.is_i64() || number.is_u64() => Ok(value),
        Value::Number(number) => match number.as_f64() {
            Some(float) if float.fract() == 0.0 && float.abs() < i64::MAX as f64 => {
                Ok(Value::from(float as i64))
            }
            _ => Err("expected an integer".to_string()),
        },
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| "expected an integer".to_string()),
        _ => Err("expected an integer".to_string()),
    }
}

fn coerce_count(value: Value) -> std::result::Result<Value, String> {
    let value = coerce_integer(value)?;

    match value.as_i64() {
        Some(count) if (0..=i64::from(u8::MAX)).contains(&count) => Ok(value),
        _ => Err(format!("expected a count between 0 and {}", u8::MAX)),
    }
}

fn coerce_float(value: Value) -> std::result::Result<Value, String> {
    match value {
        Value::Number(number) => number
            .as_f64()
            .map(Value::from)
            .ok_or_else(|| "expected a number".to_string()),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .map(Value::from)
            .map_err(|_| "expected a number".to_string()),
        _ => Err("expected a number".to_string()),
    }
}

fn coerce_boolean(value: Value) -> std::result::Result<Value, String> {
    match value {
        Value::Bool(_) => Ok(value),
        Value::Number(ref number) => match number.as_i64() {
            Some(0) => Ok(Value::Bool(false)),
            Some(1) => Ok(Value::Bool(true)),
            _ => Err("expected a boolean".to_string()),
        },
        Value::String(text) => match text.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Value::Bool(true)),
            "false" | "0" | "no" | "off" => Ok(Value::Bool(false)),
            _ => Err("expected a boolean".to_string()),
        },
        _ => Err("expected a boolean".to_string()),
    }
}

/// The lines of the file at `path`, if it exists and looks like a list of
/// values: every line non-empty and free of spaces.
fn read_value_lines(path: &str) -> Option<Vec<Value>> {
    let contents = fs::read_to_string(path).ok()?;

    contents
        .lines()
        .map(|line| {
            if line.is_empty() || line.contains(' ') {
                None
            } else {
                Some(Value::String(line.to_string()))
            }
        })
        .collect()
}

fn coerce_list(inner: &FieldKind, value: Value) -> std::result::Result<Value, String> {
    let items = match value {
        Value::Sequence(items) => items,
        // Flow sequences such as `[a, b]` typically arrive from environment variables.
        Value::String(text) if text.trim_start().starts_with('[') => {
            match serde_yaml::from_str::<Value>(&text) {
                Ok(Value::Sequence(items)) => items,
                _ => return Err("expected a list".to_string()),
            }
        }
        Value::String(text) => text
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| Value::String(item.to_string()))
            .collect(),
        Value::Null | Value::Mapping(_) | Value::Tagged(_) => {
            return Err("expected a list".to_string());
        }
        scalar => vec![scalar],
    };

    items
        .into_iter()
        .map(|item| inner.coerce(item))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(Value::Sequence)
}


/// A single configuration field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    name: String,
    kind: FieldKind,
    default: Option<Value>,
    optional: bool,
}

impl Field {
    pub fn new<S>(name: S, kind: FieldKind) -> Self
    where
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind,
            default: None,
            optional: false,
        }
    }

    /// Set the static default of this field.
    pub fn with_default<V>(mut self, default: V) -> Self
    where
        V: Into<Value>,
    {
        self.default = Some(default.into());
        self
    }

    /// Allow `null` for this field. Without an explicit default,
    /// the field then defaults to `null`.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        if self.default.is_none() {
            self.default = Some(Value::Null);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Coerce `value` into this field's kind.
    pub fn coerce(&self, value: Value, tier: Tier) -> Result<Value> {
        if value.is_null() {
            if self.optional || self.kind == FieldKind::Any {
                return Ok(Value::Null);
            }

            return Err(self.validation_error(&value, tier, "a value is required".to_string()));
        }

        let rendered_value = value.clone();
        self.kind
            .coerce(value)
            .map_err(|reason| self.validation_error(&rendered_value, tier, reason))
    }

    fn validation_error(&self, value: &Value, tier: Tier, reason: String) -> ConfigError {
        ConfigError::Validation {
            field: self.name.clone(),
            value: render_inline(value).unwrap_or_else(|_| format!("{:?}", value)),
            tier,
            reason,
        }
    }
}


/// The complete set of fields an application configuration understands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Build a schema from application fields, adding the reserved
    /// `config_file`, `logs` and `verbose` fields unless the application
    /// declares them itself.
    pub fn with_reserved_fields(fields: Vec<Field>) -> Self {
        let mut schema = Self::new(fields);

        let reserved = [
            Field::new(CONFIG_FILE_FIELD, FieldKind::Path).optional(),
            Field::new(LOGS_FIELD, FieldKind::list_of(FieldKind::String))
                .with_default(Value::Sequence(Vec::new())),
            Field::new(VERBOSE_FIELD, FieldKind::Count).with_default(0),
        ];

        for field in reserved {
            if schema.get(field.name()).is_none() {
                schema.fields.push(field);
            }
        }

        schema
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Every field that declares a static default (including optional
    /// fields, which default to `null`).
    pub fn static_defaults(&self) -> Settings {
        self.fields
            .iter()
            .filter_map(|field| {
                field
                    .default
                    .clone()
                    .map(|default| (field.name.clone(), default))
            })
            .collect()
    }

    /// Coerce every known field in `settings`. Keys the schema does not know
    /// about are passed through unchanged.
    pub fn coerce_settings(&self, settings: Settings, tier: Tier) -> Result<Settings> {
        let mut coerced = Settings::new();

        for (key, value) in settings {
            let value = match self.get(&key) {
                Some(field) => field.coerce(value, tier)?,
                None => value,
            };

            coerced.insert(key, value);
        }

        Ok(coerced)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_are_coerced_from_strings() {
        let field = Field::new("bar", FieldKind::Integer);

        assert_eq!(
            field.coerce(Value::from("456"), Tier::File).unwrap(),
            Value::from(456)
        );
        assert_eq!(
            field.coerce(Value::from(2.0), Tier::File).unwrap(),
            Value::from(2)
        );
    }

    #[test]
    fn invalid_values_name_field_value_and_tier() {
        let field = Field::new("bar", FieldKind::Integer);

        let error = field
            .coerce(Value::from("four"), Tier::Environment)
            .unwrap_err();

        match error {
            ConfigError::Validation {
                field, value, tier, ..
            } => {
                assert_eq!(field, "bar");
                assert_eq!(value, "four");
                assert_eq!(tier, Tier::Environment);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn booleans_accept_common_spellings() {
        let field = Field::new("baz", FieldKind::Boolean);

        for truthy in ["true", "Yes", "on", "1"] {
            assert_eq!(
                field.coerce(Value::from(truthy), Tier::Environment).unwrap(),
                Value::Bool(true)
            );
        }

        for falsy in ["false", "NO", "off", "0"] {
            assert_eq!(
                field.coerce(Value::from(falsy), Tier::Environment).unwrap(),
                Value::Bool(false)
            );
        }

        assert!(field.coerce(Value::from("maybe"), Tier::Environment).is_err());
    }

    #[test]
    fn strings_accept_scalars() {
        let field = Field::new("foo", FieldKind::String);

        assert_eq!(
            field.coerce(Value::from(12), Tier::File).unwrap(),
            Value::from("12")
        );
        assert!(field
            .coerce(Value::Sequence(vec![Value::from("a")]), Tier::File)
            .is_err());
    }

    #[test]
    fn lists_accept_sequences_flow_strings_and_comma_lists() {
        let field = Field::new("tags", FieldKind::list_of(FieldKind::Integer));
        let expected = Value::Sequence(vec![Value::from(1), Value::from(2)]);

        assert_eq!(
            field
                .coerce(
                    Value::Sequence(vec![Value::from("1"), Value::from(2)]),
                    Tier::File
                )
                .unwrap(),
            expected
        );
        assert_eq!(
            field.coerce(Value::from("[1, 2]"), Tier::Environment).unwrap(),
            expected
        );
        assert_eq!(
            field.coerce(Value::from("1, 2"), Tier::Environment).unwrap(),
            expected
        );
    }

    #[test]
    fn counts_reject_values_outside_u8() {
        let field = Field::new(VERBOSE_FIELD, FieldKind::Count);

        assert_eq!(
            field.coerce(Value::from("3"), Tier::Environment).unwrap(),
            Value::from(3)
        );
        assert_eq!(
            field.coerce(Value::from(255), Tier::File).unwrap(),
            Value::from(255)
        );

        for out_of_range in [Value::from(300), Value::from(-1)] {
            match field.coerce(out_of_range, Tier::File).unwrap_err() {
                ConfigError::Validation { field, tier, .. } => {
                    assert_eq!(field, VERBOSE_FIELD);
                    assert_eq!(tier, Tier::File);
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn list_or_file_reads_newline_separated_files() {
        let temp = tempfile::TempDir::new().unwrap();
        let values = temp.path().join("hosts.txt");
        fs::write(&values, "alpha\nbeta\ngamma\n").unwrap();

        let field = Field::new("hosts", FieldKind::list_or_file_of(FieldKind::String));

        assert_eq!(
            field
                .coerce(Value::from(values.to_string_lossy().into_owned()), Tier::CommandLine)
                .unwrap(),
            Value::Sequence(vec![
                Value::from("alpha"),
                Value::from("beta"),
                Value::from("gamma")
            ])
        );
        assert_eq!(
            field.coerce(Value::from("a,b"), Tier::CommandLine).unwrap(),
            Value::Sequence(vec![Value::from("a"), Value::from("b")])
        );
    }

    #[test]
    fn list_or_file_falls_back_to_commas_for_prose_files() {
        let temp = tempfile::TempDir::new().unwrap();
        let prose = temp.path().join("notes.txt");
        fs::write(&prose, "not a list of values\n").unwrap();
        let prose = prose.to_string_lossy().into_owned();

        let field = Field::new("hosts", FieldKind::list_or_file_of(FieldKind::String));

        assert_eq!(
            field.coerce(Value::from(prose.clone()), Tier::CommandLine).unwrap(),
            Value::Sequence(vec![Value::from(prose)])
        );
    }

    #[test]
    fn null_only_allowed_for_optional_fields() {
        let required = Field::new("bar", FieldKind::Integer);
        let optional = Field::new("cheese", FieldKind::String).optional();

        assert!(required.coerce(Value::Null, Tier::File).is_err());
        assert_eq!(
            optional.coerce(Value::Null, Tier::File).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn static_defaults_include_optional_nulls_but_not_required_fields() {
        let schema = Schema::with_reserved_fields(vec![
            Field::new("foo", FieldKind::String).with_default("FOO"),
            Field::new("bar", FieldKind::Integer),
            Field::new("cheese", FieldKind::String).optional(),
        ]);

        let defaults = schema.static_defaults();

        assert_eq!(defaults.get("foo"), Some(&Value::from("FOO")));
        assert_eq!(defaults.get("cheese"), Some(&Value::Null));
        assert_eq!(defaults.get(CONFIG_FILE_FIELD), Some(&Value::Null));
        assert_eq!(defaults.get(VERBOSE_FIELD), Some(&Value::from(0)));
        assert!(!defaults.contains_key("bar"));
    }

    #[test]
    fn reserved_fields_do_not_replace_application_fields() {
        let schema =
            Schema::with_reserved_fields(vec![Field::new(VERBOSE_FIELD, FieldKind::Boolean)]);

        assert_eq!(
            schema.get(VERBOSE_FIELD).map(Field::kind),
            Some(&FieldKind::Boolean)
        );
        assert_eq!(
            schema
                .fields()
                .iter()
                .filter(|field| field.name() == VERBOSE_FIELD)
                .count(),
            1
        );
    }

    #[test]
    fn unknown_keys_pass_through_uncoerced() {
        let schema = Schema::new(vec![Field::new("bar", FieldKind::Integer)]);
        let mut settings = Settings::new();
        settings.insert("bar", Value::from("7"));
        settings.insert("extra", Value::from("7"));

        let coerced = schema.coerce_settings(settings, Tier::File).unwrap();

        assert_eq!(coerced.get("bar"), Some(&Value::from(7)));
        assert_eq!(coerced.get("extra"), Some(&Value::from("7")));
    }
}
