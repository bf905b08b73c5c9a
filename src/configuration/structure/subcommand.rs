//! Applications made of subcommands, each with its own configuration type.

use std::ffi::OsString;

use clap::Command;
use serde_yaml::Value;
use tracing::debug;

use super::{collect_argv, explicit_values, merge_sources, Config, ConfigAssembler};
use crate::cli;
use crate::configuration::schema::{Schema, COMMAND_FIELD};
use crate::configuration::settings::Settings;
use crate::configuration::traits::AppConfig;
use crate::error::{ConfigError, Result};


type Finish<R> = Box<dyn FnOnce(&ConfigAssembler, &Schema, Settings) -> Result<R>>;


struct Subcommand<R> {
    name: String,
    about: String,
    schema: Schema,
    arguments: fn(Command) -> Command,
    finish: Finish<R>,
}

impl<R> Subcommand<R> {
    fn command(&self) -> Command {
        (self.arguments)(
            Command::new(self.name.clone())
                .about(self.about.clone())
                .long_about(self.about.clone()),
        )
    }
}


/// The subcommands of an application, each bound to its configuration type
/// and to what should happen with the resolved configuration.
///
/// Every subcommand's configuration goes through the same file, environment
/// and command-line precedence. The selected subcommand's name is available
/// as the `command` key.
pub struct Subcommands<R> {
    entries: Vec<Subcommand<R>>,
}

impl<R> Default for Subcommands<R> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<R> Subcommands<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the subcommand `name`. Its arguments are those of
    /// `T::arguments`, and `finish` receives its resolved configuration.
    pub fn register<T, F>(mut self, name: &str, about: &str, finish: F) -> Self
    where
        T: AppConfig + 'static,
        F: FnOnce(Config<T>) -> R + 'static,
        R: 'static,
    {
        self.entries.push(Subcommand {
            name: name.to_string(),
            about: about.to_string(),
            schema: Schema::with_reserved_fields(T::fields()),
            arguments: T::arguments,
            finish: Box::new(
                move |assembler: &ConfigAssembler, schema: &Schema, merged: Settings| {
                    assembler.instantiate::<T>(schema, merged).map(finish)
                },
            ),
        });
        self
    }
}


impl ConfigAssembler {
    fn subcommand_layout<R>(&self, subcommands: &Subcommands<R>) -> Command {
        subcommands
            .entries
            .iter()
            .fold(self.base_command().subcommand_required(true), |command, entry| {
                command.subcommand(entry.command())
            })
    }

    /// Like [`ConfigAssembler::assemble`], for an application whose first
    /// positional argument selects one of `subcommands`. Returns whatever
    /// that subcommand's `finish` makes of its configuration.
    pub fn assemble_subcommand<R, I, S>(&self, argv: I, mut subcommands: Subcommands<R>) -> Result<R>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let argv = collect_argv(argv);
        let layout = self.subcommand_layout(&subcommands);

        // One defaults table per subcommand, in registration order.
        let (command, matches, mut tables) = self.parse_command_line(&argv, &layout, |file_settings| {
            let mut tables = Vec::with_capacity(subcommands.entries.len());
            let mut command = self.base_command().subcommand_required(true);

            for entry in &subcommands.entries {
                let defaults = self.defaults_table(&entry.schema, file_settings.clone())?;
                command = command.subcommand(cli::inject_defaults(entry.command(), &defaults));
                tables.push(defaults);
            }

            Ok((command, tables))
        })?;

        let (name, sub_matches) = matches.subcommand().ok_or_else(|| ConfigError::MissingField {
            field: COMMAND_FIELD.to_string(),
        })?;
        let index = subcommands
            .entries
            .iter()
            .position(|entry| entry.name == name)
            .ok_or_else(|| ConfigError::MissingField {
                field: COMMAND_FIELD.to_string(),
            })?;
        let sub_command = command
            .find_subcommand(name)
            .ok_or_else(|| ConfigError::MissingField {
                field: COMMAND_FIELD.to_string(),
            })?;

        let entry = subcommands.entries.swap_remove(index);
        let defaults = tables.swap_remove(index);

        let mut explicit = explicit_values(&entry.schema, &command, &matches, &defaults)?;
        explicit.merge(explicit_values(&entry.schema, sub_command, sub_matches, &defaults)?);
        explicit.insert(COMMAND_FIELD, Value::from(name));

        debug!(
            command = name,
            keys = ?explicit.keys().collect::<Vec<_>>(),
            "Explicit command-line values."
        );

        (entry.finish)(
            self,
            &entry.schema,
            merge_sources(defaults, Settings::new(), Settings::new(), explicit),
        )
    }
}
