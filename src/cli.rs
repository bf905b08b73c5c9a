//! Command-line plumbing: the base command every application starts from,
//! the early `-c/--config` scan, and the filtering that separates flags the
//! user actually typed from flags that merely carry their default.

use std::path::PathBuf;

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command};
use serde_yaml::Value;
use tracing::trace;

use crate::configuration::{
    render_command_line_value,
    Settings,
    CONFIG_FILE_FIELD,
    LOGS_FIELD,
    VERBOSE_FIELD,
};


/// The command every application's arguments are added to.
pub fn base_command(app_name: &str) -> Command {
    Command::new(app_name.to_string())
        .arg(
            Arg::new(CONFIG_FILE_FIELD)
                .short('c')
                .long("config")
                .value_name("PATH")
                .action(ArgAction::Set)
                .help(
                    "Read configuration from this file only, \
                     instead of the usual configuration file locations.",
                ),
        )
        .arg(
            Arg::new(LOGS_FIELD)
                .short('L')
                .long("log")
                .value_name("FILE[:LEVEL][@FORMAT]")
                .action(ArgAction::Append)
                .num_args(0..=1)
                .default_missing_value("+")
                .help(
                    "Enable a log sink. FILE is a log file path, 'stderr', 'stdout', \
                     'null' (disable console logging) or '+[NAME]' (default log file). \
                     May be given multiple times.",
                ),
        )
        .arg(
            Arg::new(VERBOSE_FIELD)
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Increase verbosity (-v, -vv, ...)."),
        )
}


fn takes_value(arg: &Arg) -> bool {
    matches!(arg.get_action(), ArgAction::Set | ArgAction::Append)
}


/// Find an explicit configuration file in raw arguments (without the program
/// name), before the full command is built.
///
/// Recognizes `-c PATH`, `-cPATH`, `-c=PATH`, `--config PATH` and
/// `--config=PATH`, including `-c` at the end of a cluster of short flags
/// (`-vc PATH`). Clusters are walked against the short options `command`
/// declares, so `-Bc` is `-B` with the value `c`. The last occurrence wins
/// and scanning stops at `--`.
pub fn detect_config_file<S>(command: &Command, args: &[S]) -> Option<PathBuf>
where
    S: AsRef<str>,
{
    let mut detected = None;
    let mut arguments = args.iter().map(AsRef::as_ref);

    while let Some(argument) = arguments.next() {
        if argument == "--" {
            break;
        }

        if let Some(long) = argument.strip_prefix("--") {
            if long == "config" {
                if let Some(path) = arguments.next() {
                    detected = Some(PathBuf::from(path));
                }
            } else if let Some(path) = long.strip_prefix("config=") {
                detected = Some(PathBuf::from(path));
            }
            continue;
        }

        let Some(cluster) = argument.strip_prefix('-') else {
            continue;
        };

        for (offset, short) in cluster.char_indices() {
            let Some(arg) = command
                .get_arguments()
                .find(|arg| arg.get_short() == Some(short))
            else {
                break;
            };

            if !takes_value(arg) {
                continue;
            }

            if arg.get_id().as_str() == CONFIG_FILE_FIELD {
                let attached = &cluster[offset + short.len_utf8()..];
                let attached = attached.strip_prefix('=').unwrap_or(attached);

                if !attached.is_empty() {
                    detected = Some(PathBuf::from(attached));
                } else if let Some(path) = arguments.next() {
                    detected = Some(PathBuf::from(path));
                }
            }

            // The rest of the cluster is this option's value.
            break;
        }
    }

    detected
}


/// The configuration file clap parsed, if any.
pub fn parsed_config_file(matches: &ArgMatches) -> Option<PathBuf> {
    matches
        .try_get_one::<String>(CONFIG_FILE_FIELD)
        .ok()
        .flatten()
        .map(PathBuf::from)
}


/// A single argument's parsed value.
#[derive(Debug, Clone, PartialEq)]
pub enum CliValue {
    Provided(Value),
    /// The argument has neither a value nor a default.
    NotProvided,
}


fn accepts_default(arg: &Arg) -> bool {
    matches!(
        arg.get_action(),
        ArgAction::Set | ArgAction::SetTrue | ArgAction::SetFalse
    )
}


/// Use `defaults` as the default value of every matching single-value
/// argument, so that `--help` shows the effective defaults and the parsed
/// value of an untyped flag equals its default.
///
/// Arguments are matched to settings by id. The `config_file` argument is
/// never given a default.
pub fn inject_defaults(command: Command, defaults: &Settings) -> Command {
    let injected: Vec<(String, String)> = command
        .get_arguments()
        .filter(|arg| accepts_default(arg) && arg.get_id().as_str() != CONFIG_FILE_FIELD)
        .filter_map(|arg| {
            let id = arg.get_id().as_str();
            let default = defaults.get(id).and_then(render_command_line_value)?;
            Some((id.to_string(), default))
        })
        .collect();

    injected
        .into_iter()
        .fold(command, |command, (id, default)| {
            command.mut_arg(id, |arg| arg.default_value(default))
        })
}


fn raw_strings(matches: &ArgMatches, id: &str) -> Option<Vec<Value>> {
    let values = matches.try_get_raw(id).ok()??;

    Some(
        values
            .map(|value| Value::String(value.to_string_lossy().into_owned()))
            .collect(),
    )
}


/// Read every declared argument back out of `matches`.
///
/// Counters that were not typed on the command line, and arguments without
/// any value or default, yield [`CliValue::NotProvided`].
pub fn extract_cli_values(command: &Command, matches: &ArgMatches) -> Vec<(String, CliValue)> {
    let mut values = Vec::new();

    for arg in command.get_arguments() {
        let id = arg.get_id().as_str();
        let typed = matches.value_source(id) == Some(ValueSource::CommandLine);

        let value = match arg.get_action() {
            ArgAction::Count if typed => match matches.try_get_one::<u8>(id) {
                Ok(Some(count)) => CliValue::Provided(Value::from(*count)),
                _ => CliValue::NotProvided,
            },
            ArgAction::Count => CliValue::NotProvided,
            ArgAction::SetTrue | ArgAction::SetFalse => match matches.try_get_one::<bool>(id) {
                Ok(Some(flag)) => CliValue::Provided(Value::Bool(*flag)),
                _ => CliValue::NotProvided,
            },
            ArgAction::Set => match raw_strings(matches, id) {
                Some(mut items) if items.len() == 1 => CliValue::Provided(items.remove(0)),
                Some(items) if !items.is_empty() => CliValue::Provided(Value::Sequence(items)),
                _ => CliValue::NotProvided,
            },
            ArgAction::Append => match raw_strings(matches, id) {
                Some(items) => CliValue::Provided(Value::Sequence(items)),
                None => CliValue::NotProvided,
            },
            _ => continue,
        };

        values.push((id.to_string(), value));
    }

    values
}


/// Keep only the values the user explicitly provided: sentinels are dropped,
/// and so is every value equal to its entry in `defaults`.
pub fn filter_cli_args<I>(raw: I, defaults: &Settings) -> Settings
where
    I: IntoIterator<Item = (String, CliValue)>,
{
    let mut explicit = Settings::new();

    for (key, value) in raw {
        match value {
            CliValue::NotProvided => {
                trace!(key = %key, "Dropping command-line argument that was not provided.");
            }
            CliValue::Provided(value) if defaults.get(&key) == Some(&value) => {
                trace!(key = %key, "Dropping command-line argument equal to its default.");
            }
            CliValue::Provided(value) => {
                explicit.insert(key, value);
            }
        }
    }

    explicit
}
