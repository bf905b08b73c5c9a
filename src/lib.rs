//! Layered configuration for command-line applications.
//!
//! Values are merged from configuration files (shared, per-user and local,
//! or a single explicit `-c/--config` file), environment variables and
//! command-line flags into one immutable [`Config`].
//!
//! ```no_run
//! use cliconf::{App, AppConfig, Config, Field, FieldKind};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct Greeter {
//!     name: String,
//! }
//!
//! impl AppConfig for Greeter {
//!     fn fields() -> Vec<Field> {
//!         vec![Field::new("name", FieldKind::String).with_default("world")]
//!     }
//!
//!     fn arguments(command: clap::Command) -> clap::Command {
//!         command.arg(clap::Arg::new("name").long("name"))
//!     }
//! }
//!
//! fn run(config: Config<Greeter>) -> miette::Result<i32> {
//!     println!("Hello, {}!", config.name);
//!     Ok(0)
//! }
//!
//! std::process::exit(App::new("greeter").run(std::env::args_os(), run));
//! ```

pub mod app;
pub mod cli;
pub mod configuration;
pub mod error;
pub mod logging;
pub mod xdg;

pub use app::{App, Runners};
pub use configuration::{
    AppConfig,
    Config,
    ConfigAssembler,
    ConfigFile,
    Environment,
    Field,
    FieldKind,
    Settings,
    YamlConfigFile,
};
pub use error::{ConfigError, Result};
