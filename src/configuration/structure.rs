use std::ffi::OsString;
use std::ops::Deref;
use std::path::{Path, PathBuf};

use clap::{ArgMatches, Command};
use serde::Deserialize;
use serde_yaml::Value;
use tracing::debug;

pub use self::log_sink::{LogFormat, LogSink, LogSinkContext, LogTarget, UnresolvedLogSink};
pub use self::subcommand::Subcommands;
use super::environment::{environment_settings, Environment};
use super::file::YamlConfigFile;
use super::schema::{Schema, CONFIG_FILE_FIELD};
use super::settings::{Settings, Tier};
use super::source::{ResolutionContext, SourceResolver};
use super::traits::{AppConfig, ConfigFile, ResolvableConfigurationWithContext};
use crate::cli::{self, CliValue};
use crate::error::{ConfigError, Result};
use crate::xdg::{self, XdgKind};

mod log_sink;
mod subcommand;


/// The reserved part of every configuration, deserialized next to the
/// application's own type.
#[derive(Deserialize, Debug)]
pub(crate) struct UnresolvedConfiguration {
    /// Path of the file that supplied the configuration, if any.
    #[serde(default)]
    config_file: Option<PathBuf>,

    /// Log sink specifications.
    #[serde(default)]
    logs: Vec<String>,

    /// Verbosity level.
    #[serde(default)]
    verbose: u8,
}


/// The final, immutable configuration of an application.
///
/// Dereferences to the application's own configuration type.
#[derive(Debug, Clone)]
pub struct Config<T> {
    /// The configuration file values were loaded from, if any.
    config_file: Option<YamlConfigFile>,

    /// Resolved log sinks.
    logs: Vec<LogSink>,

    /// Verbosity level.
    verbose: u8,

    app: T,
}


impl<T> ResolvableConfigurationWithContext for (UnresolvedConfiguration, T) {
    type Context = LogSinkContext;
    type Resolved = Config<T>;

    fn resolve(self, context: Self::Context) -> Result<Self::Resolved> {
        let (reserved, app) = self;

        let logs = reserved
            .logs
            .iter()
            .map(|spec| spec.parse::<UnresolvedLogSink>()?.resolve(context.clone()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Config {
            config_file: reserved.config_file.map(YamlConfigFile::from_path),
            logs,
            verbose: reserved.verbose,
            app,
        })
    }
}


impl<T> Config<T> {
    pub fn config_file(&self) -> Option<&YamlConfigFile> {
        self.config_file.as_ref()
    }

    pub fn logs(&self) -> &[LogSink] {
        &self.logs
    }

    pub fn verbose(&self) -> u8 {
        self.verbose
    }

    pub fn app(&self) -> &T {
        &self.app
    }

    pub fn into_inner(self) -> T {
        self.app
    }
}

impl<T> Deref for Config<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.app
    }
}


/// Merge the four tiers, lowest precedence first.
///
/// Every tier overwrites the previous ones key by key, so a value missing from
/// a higher tier falls through to the next lower one.
pub fn merge_sources(
    defaults: Settings,
    file: Settings,
    environment: Settings,
    explicit: Settings,
) -> Settings {
    let mut merged = defaults;
    merged.merge(file);
    merged.merge(environment);
    merged.merge(explicit);
    merged
}


/// Combines configuration files, environment variables and command-line
/// flags into a [`Config`].
#[derive(Debug, Clone)]
pub struct ConfigAssembler {
    app_name: String,
    environment: Environment,
    local_root: PathBuf,
    env_prefix: Option<String>,
    xdg_config_home: Option<PathBuf>,
    version: Option<String>,
}

impl ConfigAssembler {
    /// An assembler reading the current process environment.
    pub fn new<S>(app_name: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            app_name: app_name.into(),
            environment: Environment::from_process(),
            local_root: PathBuf::new(),
            env_prefix: None,
            xdg_config_home: None,
            version: None,
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_local_root<P>(mut self, local_root: P) -> Self
    where
        P: Into<PathBuf>,
    {
        self.local_root = local_root.into();
        self
    }

    /// Only read environment variables named `<prefix><field>`.
    pub fn with_env_prefix<S>(mut self, prefix: S) -> Self
    where
        S: Into<String>,
    {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Override the XDG config home that would otherwise be derived
    /// from the environment.
    pub fn with_xdg_config_home<P>(mut self, xdg_config_home: P) -> Self
    where
        P: Into<PathBuf>,
    {
        self.xdg_config_home = Some(xdg_config_home.into());
        self
    }

    /// Enable `--version`.
    pub fn with_version<S>(mut self, version: S) -> Self
    where
        S: Into<String>,
    {
        self.version = Some(version.into());
        self
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    fn context(&self, explicit_config_file: Option<PathBuf>) -> ResolutionContext {
        let context = ResolutionContext::new(&self.app_name, self.environment.clone())
            .with_explicit_config_file(explicit_config_file)
            .with_local_root(&self.local_root)
            .with_env_prefix(self.env_prefix.as_deref());

        match &self.xdg_config_home {
            Some(xdg_config_home) => context.with_xdg_config_home(xdg_config_home),
            None => context,
        }
    }

    fn log_sink_context(&self) -> LogSinkContext {
        LogSinkContext {
            app_name: self.app_name.clone(),
            data_home: xdg::base_dir(XdgKind::Data, &self.environment),
        }
    }

    /// The base command, carrying the version when one is set.
    fn base_command(&self) -> Command {
        let command = cli::base_command(&self.app_name);

        match &self.version {
            Some(version) => command.version(version.clone()),
            None => command,
        }
    }

    fn file_settings(&self, explicit_config_file: Option<PathBuf>) -> Result<Settings> {
        SourceResolver::new(&self.context(explicit_config_file)).resolve()
    }

    /// Everything below the explicit tier: static defaults overlaid with
    /// `file_settings`, overlaid with environment settings. Each is coerced
    /// with its own tier attributed.
    fn defaults_table(&self, schema: &Schema, file_settings: Settings) -> Result<Settings> {
        let static_defaults = schema.coerce_settings(schema.static_defaults(), Tier::Default)?;
        let file_settings = schema.coerce_settings(file_settings, Tier::File)?;

        let env_settings = schema.coerce_settings(
            environment_settings(schema, self.env_prefix.as_deref(), &self.environment),
            Tier::Environment,
        )?;

        Ok(merge_sources(
            static_defaults,
            file_settings,
            env_settings,
            Settings::new(),
        ))
    }

    /// Build the configuration without a command line; `explicit` takes the
    /// place of command-line flags and overrides every other source.
    pub fn build<T>(&self, explicit_config_file: Option<PathBuf>, explicit: Settings) -> Result<Config<T>>
    where
        T: AppConfig,
    {
        let schema = Schema::with_reserved_fields(T::fields());

        let defaults = self.defaults_table(&schema, self.file_settings(explicit_config_file)?)?;
        let explicit = schema.coerce_settings(explicit, Tier::CommandLine)?;

        self.instantiate(&schema, merge_sources(defaults, Settings::new(), Settings::new(), explicit))
    }

    /// Resolve the full precedence chain for `argv` (including the program
    /// name) and construct the configuration.
    pub fn assemble<T, I, S>(&self, argv: I) -> Result<Config<T>>
    where
        T: AppConfig,
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let argv = collect_argv(argv);
        let schema = Schema::with_reserved_fields(T::fields());
        let layout = T::arguments(self.base_command());

        // The defaults table every command-line default is taken from is
        // built into the command itself.
        let (command, matches, defaults) = self.parse_command_line(&argv, &layout, |file_settings| {
            let defaults = self.defaults_table(&schema, file_settings)?;
            let command = cli::inject_defaults(T::arguments(self.base_command()), &defaults);
            Ok((command, defaults))
        })?;

        let explicit = explicit_values(&schema, &command, &matches, &defaults)?;
        debug!(
            keys = ?explicit.keys().collect::<Vec<_>>(),
            "Explicit command-line values."
        );

        self.instantiate(&schema, merge_sources(defaults, Settings::new(), Settings::new(), explicit))
    }

    /// Parse `argv` with the command `build` creates from the file settings
    /// of the explicit configuration file.
    ///
    /// That file is first found by scanning `argv` against `layout`. If clap
    /// then parses a different `config_file`, resolution is repeated once
    /// with clap's value.
    fn parse_command_line<B, D>(
        &self,
        argv: &[String],
        layout: &Command,
        mut build: B,
    ) -> Result<(Command, ArgMatches, D)>
    where
        B: FnMut(Settings) -> Result<(Command, D)>,
    {
        let scanned = cli::detect_config_file(layout, argv.get(1..).unwrap_or_default());
        let (command, matches, data) = self.parse_with_config_file(argv, scanned.clone(), &mut build)?;

        let parsed = cli::parsed_config_file(&matches);
        if parsed == scanned {
            return Ok((command, matches, data));
        }

        debug!(
            scanned = ?scanned,
            parsed = ?parsed,
            "Configuration file differs from the early scan, resolving again."
        );
        self.parse_with_config_file(argv, parsed, &mut build)
    }

    fn parse_with_config_file<B, D>(
        &self,
        argv: &[String],
        explicit_config_file: Option<PathBuf>,
        build: &mut B,
    ) -> Result<(Command, ArgMatches, D)>
    where
        B: FnMut(Settings) -> Result<(Command, D)>,
    {
        let (mut command, data) = build(self.file_settings(explicit_config_file)?)?;
        let matches = command.try_get_matches_from_mut(argv)?;

        Ok((command, matches, data))
    }

    fn instantiate<T>(&self, schema: &Schema, merged: Settings) -> Result<Config<T>>
    where
        T: AppConfig,
    {
        if let Some(field) = schema
            .fields()
            .iter()
            .find(|field| !merged.contains_key(field.name()))
        {
            return Err(ConfigError::MissingField {
                field: field.name().to_string(),
            });
        }

        let document: Value = merged.into_value();

        let reserved: UnresolvedConfiguration = serde_yaml::from_value(document.clone())
            .map_err(|source| ConfigError::Deserialize { source })?;
        let app: T =
            serde_yaml::from_value(document).map_err(|source| ConfigError::Deserialize { source })?;

        (reserved, app).resolve(self.log_sink_context())
    }
}


fn collect_argv<I, S>(argv: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    argv.into_iter()
        .map(|argument| argument.into().to_string_lossy().into_owned())
        .collect()
}


/// The values of `command`'s arguments the user explicitly typed, coerced
/// with `schema`. The `config_file` argument is left to provenance recording.
fn explicit_values(
    schema: &Schema,
    command: &Command,
    matches: &ArgMatches,
    defaults: &Settings,
) -> Result<Settings> {
    let raw = cli::extract_cli_values(command, matches)
        .into_iter()
        .filter(|(key, _)| key != CONFIG_FILE_FIELD)
        .map(|(key, value)| -> Result<(String, CliValue)> {
            match value {
                CliValue::Provided(value) => {
                    let value = match schema.get(&key) {
                        Some(field) => field.coerce(value, Tier::CommandLine)?,
                        None => value,
                    };
                    Ok((key, CliValue::Provided(value)))
                }
                CliValue::NotProvided => Ok((key, CliValue::NotProvided)),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(cli::filter_cli_args(raw, defaults))
}


#[cfg(test)]
mod tests {
    use std::fs;

    use clap::{Arg, ArgAction, Command};
    use serde::Deserialize;
    use tempfile::TempDir;

    use super::*;
    use crate::configuration::schema::{Field, FieldKind, VERBOSE_FIELD};

    #[derive(Debug, Deserialize)]
    struct Demo {
        foo: String,
        bar: i64,
        baz: bool,
    }

    impl AppConfig for Demo {
        fn fields() -> Vec<Field> {
            vec![
                Field::new("foo", FieldKind::String).with_default("FOO"),
                Field::new("bar", FieldKind::Integer),
                Field::new("baz", FieldKind::Boolean).with_default(false),
            ]
        }

        fn arguments(command: Command) -> Command {
            command
                .arg(Arg::new("foo").short('f').long("foo"))
                .arg(Arg::new("bar").short('B').long("some-bar"))
                .arg(Arg::new("baz").long("baz").action(ArgAction::SetTrue))
        }
    }

    fn assembler(temp: &TempDir, environment: Environment) -> ConfigAssembler {
        ConfigAssembler::new("demo")
            .with_environment(environment)
            .with_xdg_config_home(temp.path().join("xdg"))
            .with_local_root(temp.path().join("work"))
    }

    #[test]
    fn merge_sources_respects_precedence() {
        let tier = |value: &str| -> Settings {
            vec![("foo".to_string(), Value::from(value))].into_iter().collect()
        };

        let merged = merge_sources(tier("default"), tier("file"), tier("env"), Settings::new());
        assert_eq!(merged.get("foo"), Some(&Value::from("env")));

        let merged = merge_sources(tier("default"), tier("file"), tier("env"), tier("cli"));
        assert_eq!(merged.get("foo"), Some(&Value::from("cli")));
    }

    #[test]
    fn command_line_beats_environment_per_key() {
        let temp = TempDir::new().unwrap();
        let environment = Environment::empty().with("BAR", "4").with("FOO", "foofoo");

        let config: Config<Demo> = assembler(&temp, environment)
            .assemble(["demo", "-B1", "--baz"])
            .unwrap();

        assert_eq!(config.foo, "foofoo");
        assert_eq!(config.bar, 1);
        assert!(config.baz);
        assert!(config.config_file().is_none());
    }

    #[test]
    fn missing_required_field_is_reported() {
        let temp = TempDir::new().unwrap();

        let error = assembler(&temp, Environment::empty())
            .assemble::<Demo, _, _>(["demo"])
            .unwrap_err();

        assert!(matches!(error, ConfigError::MissingField { field } if field == "bar"));
    }

    #[test]
    fn invalid_environment_value_names_its_tier() {
        let temp = TempDir::new().unwrap();
        let environment = Environment::empty().with("BAR", "lots");

        let error = assembler(&temp, environment)
            .assemble::<Demo, _, _>(["demo"])
            .unwrap_err();

        assert!(matches!(
            error,
            ConfigError::Validation { tier: Tier::Environment, .. }
        ));
    }

    #[test]
    fn out_of_range_verbosity_is_a_validation_error() {
        let temp = TempDir::new().unwrap();
        let local = temp.path().join("work/demo.yml");
        fs::create_dir_all(local.parent().unwrap()).unwrap();
        fs::write(&local, "bar: 1\nverbose: 300\n").unwrap();

        let error = assembler(&temp, Environment::empty())
            .assemble::<Demo, _, _>(["demo"])
            .unwrap_err();

        match error {
            ConfigError::Validation { field, value, tier, .. } => {
                assert_eq!(field, VERBOSE_FIELD);
                assert_eq!(value, "300");
                assert_eq!(tier, Tier::File);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn reserved_fields_are_resolved() {
        let temp = TempDir::new().unwrap();
        let local = temp.path().join("work/demo.yml");
        fs::create_dir_all(local.parent().unwrap()).unwrap();
        fs::write(&local, "bar: 2\nlogs: [\"stdout:debug\"]\n").unwrap();

        let config: Config<Demo> = assembler(&temp, Environment::empty())
            .assemble(["demo", "-vv"])
            .unwrap();

        assert_eq!(config.verbose(), 2);
        assert_eq!(config.logs().len(), 1);
        assert_eq!(config.logs()[0].target(), &LogTarget::Stdout);
        assert_eq!(config.config_file().map(ConfigFile::path), Some(local.as_path()));
    }

    #[test]
    fn config_file_missed_by_the_scan_is_resolved_again() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("work")).unwrap();
        fs::write(temp.path().join("work/demo.yml"), "foo: LocalFoo\n").unwrap();
        let custom = temp.path().join("custom.yml");
        fs::write(&custom, "foo: CustomFoo\n").unwrap();

        let assembler = assembler(&temp, Environment::empty());
        let argv: Vec<String> = vec!["demo".into(), "-vc".into(), custom.to_string_lossy().into()];

        // A layout without any short options makes the early scan miss `-c`.
        let mut resolved_foos = Vec::new();
        let (_, matches, foo) = assembler
            .parse_command_line(&argv, &Command::new("demo"), |file_settings| {
                let foo = file_settings.get("foo").cloned();
                resolved_foos.push(foo.clone());
                Ok((Demo::arguments(cli::base_command("demo")), foo))
            })
            .unwrap();

        assert_eq!(cli::parsed_config_file(&matches), Some(custom));
        assert_eq!(foo, Some(Value::from("CustomFoo")));
        assert_eq!(
            resolved_foos,
            vec![Some(Value::from("LocalFoo")), Some(Value::from("CustomFoo"))]
        );
    }

    #[test]
    fn build_applies_explicit_values_last() {
        let temp = TempDir::new().unwrap();
        let environment = Environment::empty().with("BAR", "4");

        let explicit: Settings = vec![("bar".to_string(), Value::from("9"))].into_iter().collect();
        let config: Config<Demo> = assembler(&temp, environment).build(None, explicit).unwrap();

        assert_eq!(config.bar, 9);
        assert_eq!(config.foo, "FOO");
        assert!(!config.baz);
    }
}
