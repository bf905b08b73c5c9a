//! Application entry point: configuration, logging, then the runner.

use std::ffi::OsString;
use std::fmt::Debug;
use std::path::PathBuf;

use miette::Report;
use tracing::{debug, error, trace, warn};

use crate::configuration::{AppConfig, Config, ConfigAssembler, Environment, LogSink, Subcommands};
use crate::error::ConfigError;
use crate::logging::initialize_tracing;


/// A resolved configuration bound to the runner that consumes it, with the
/// pieces logging needs pulled out ahead of time.
struct Launch {
    logs: Vec<LogSink>,
    verbose: u8,
    summary: String,
    run: Box<dyn FnOnce() -> miette::Result<i32>>,
}

impl Launch {
    fn new<T, F>(config: Config<T>, runner: F) -> Self
    where
        T: Debug + 'static,
        F: FnOnce(Config<T>) -> miette::Result<i32> + 'static,
    {
        Self {
            logs: config.logs().to_vec(),
            verbose: config.verbose(),
            summary: format!(
                "config_file={:?} config={:?}",
                config.config_file().map(ToString::to_string),
                config.app()
            ),
            run: Box::new(move || runner(config)),
        }
    }
}


/// Runners of an application made of subcommands, one per subcommand.
pub struct Runners {
    subcommands: Subcommands<Launch>,
}

impl Default for Runners {
    fn default() -> Self {
        Self {
            subcommands: Subcommands::new(),
        }
    }
}

impl Runners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `runner` when the subcommand `name` is selected. The subcommand's
    /// flags and fields are those of `T`.
    pub fn register<T, F>(mut self, name: &str, about: &str, runner: F) -> Self
    where
        T: AppConfig + Debug + 'static,
        F: FnOnce(Config<T>) -> miette::Result<i32> + 'static,
    {
        self.subcommands = self
            .subcommands
            .register::<T, _>(name, about, move |config| Launch::new(config, runner));
        self
    }
}


/// Ties configuration resolution, logging setup and the application's
/// runner together, and turns the outcome into a process exit code.
#[derive(Debug, Clone)]
pub struct App {
    assembler: ConfigAssembler,
}

impl App {
    pub fn new<S>(name: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            assembler: ConfigAssembler::new(name),
        }
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.assembler = self.assembler.with_environment(environment);
        self
    }

    pub fn with_env_prefix<S>(mut self, prefix: S) -> Self
    where
        S: Into<String>,
    {
        self.assembler = self.assembler.with_env_prefix(prefix);
        self
    }

    pub fn with_local_root<P>(mut self, local_root: P) -> Self
    where
        P: Into<PathBuf>,
    {
        self.assembler = self.assembler.with_local_root(local_root);
        self
    }

    /// Enable `--version`.
    pub fn with_version<S>(mut self, version: S) -> Self
    where
        S: Into<String>,
    {
        self.assembler = self.assembler.with_version(version);
        self
    }

    pub fn name(&self) -> &str {
        self.assembler.app_name()
    }

    /// Resolve the configuration from `argv`, set up logging and call `runner`.
    ///
    /// Returns the runner's status, `1` if it fails or if configuration
    /// cannot be resolved, and clap's own exit code for usage errors,
    /// `--help` and `--version`.
    pub fn run<T, F, I, S>(&self, argv: I, runner: F) -> i32
    where
        T: AppConfig + Debug + 'static,
        F: FnOnce(Config<T>) -> miette::Result<i32> + 'static,
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        match self.assembler.assemble::<T, _, _>(argv) {
            Ok(config) => self.launch(Launch::new(config, runner)),
            Err(error) => report_configuration_error(error),
        }
    }

    /// Like [`App::run`], for an application whose first positional argument
    /// selects the runner to call.
    pub fn run_subcommands<I, S>(&self, argv: I, runners: Runners) -> i32
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        match self.assembler.assemble_subcommand(argv, runners.subcommands) {
            Ok(launch) => self.launch(launch),
            Err(error) => report_configuration_error(error),
        }
    }

    fn launch(&self, launch: Launch) -> i32 {
        let logging_raii_guard = match initialize_tracing(
            &launch.logs,
            launch.verbose,
            self.assembler.environment().get("RUST_LOG"),
        ) {
            Ok(guard) => guard,
            Err(error) => {
                eprintln!("{:?}", Report::new(error));
                return 1;
            }
        };

        trace!("TRACE level logging enabled.");
        debug!("DEBUG level logging enabled.");
        debug!(app = self.name(), summary = %launch.summary, "Configuration resolved.");

        let status = match (launch.run)() {
            Ok(status) => status,
            Err(report) => {
                error!("An unrecoverable error has been raised. Terminating.");
                eprintln!("{:?}", report);
                1
            }
        };

        drop(logging_raii_guard);
        status
    }
}


fn report_configuration_error(error: ConfigError) -> i32 {
    match error {
        ConfigError::Cli(error) => {
            // Usage errors go to stderr, help and version output to stdout.
            if let Err(print_error) = error.print() {
                warn!(error = %print_error, "Failed to print command-line output.");
            }
            error.exit_code()
        }
        error => {
            eprintln!("{:?}", Report::new(error));
            1
        }
    }
}
