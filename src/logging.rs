//! Process-wide `tracing` setup from resolved log sinks.

use std::fs;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::Filter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use crate::configuration::{LogFormat, LogSink, LogTarget};
use crate::error::{ConfigError, Result};


type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;


/// Keeps file sinks flushing in the background. Drop it at the very end
/// of `main`, after the last log line.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file_guards: Vec<WorkerGuard>,
}


/// Level used by sinks without an explicit level.
pub fn verbosity_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}


/// The sinks actually installed: `sinks` plus an implicit `stderr` sink when
/// none of them writes to the console (a `null` sink counts as one).
pub fn effective_sinks(sinks: &[LogSink]) -> Vec<LogSink> {
    let mut effective = sinks.to_vec();

    if !sinks.iter().any(|sink| sink.target().is_console()) {
        effective.push(LogSink::default_console());
    }

    effective
}


fn fmt_layer<W, F>(writer: W, format: LogFormat, filter: F) -> BoxedLayer
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
    F: Filter<Registry> + Send + Sync + 'static,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
        LogFormat::Color => fmt::layer()
            .with_ansi(true)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
        LogFormat::NoColor => fmt::layer()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
    }
}

/// Sinks with an explicit level always use it. Otherwise `filter_override`
/// (typically `RUST_LOG`) wins over the verbosity.
fn sink_layer<W>(writer: W, sink: &LogSink, verbose: u8, filter_override: Option<&str>) -> Result<BoxedLayer>
where
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    if let Some(level) = sink.level() {
        return Ok(fmt_layer(writer, sink.format(), level));
    }

    match filter_override {
        Some(directives) => {
            let filter = EnvFilter::try_new(directives).map_err(|error| ConfigError::Logging {
                reason: format!("invalid filter directives \"{}\": {}", directives, error),
            })?;
            Ok(fmt_layer(writer, sink.format(), filter))
        }
        None => Ok(fmt_layer(writer, sink.format(), verbosity_level(verbose))),
    }
}


/// Install the global subscriber. Fails if one is already installed.
pub fn initialize_tracing(
    sinks: &[LogSink],
    verbose: u8,
    filter_override: Option<&str>,
) -> Result<LoggingGuard> {
    let mut layers: Vec<BoxedLayer> = Vec::new();
    let mut file_guards = Vec::new();

    for sink in effective_sinks(sinks) {
        let layer = match sink.target() {
            LogTarget::Null => continue,
            LogTarget::Stderr => sink_layer(std::io::stderr, &sink, verbose, filter_override)?,
            LogTarget::Stdout => sink_layer(std::io::stdout, &sink, verbose, filter_override)?,
            LogTarget::File(path) => {
                let directory = path
                    .parent()
                    .filter(|parent| !parent.as_os_str().is_empty())
                    .unwrap_or_else(|| std::path::Path::new("."));
                let file_name = path.file_name().ok_or_else(|| ConfigError::Logging {
                    reason: format!("log file path has no file name: {}", path.display()),
                })?;

                fs::create_dir_all(directory)
                    .map_err(|error| ConfigError::io(directory, error))?;

                let appender = tracing_appender::rolling::never(directory, file_name);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                file_guards.push(guard);

                sink_layer(writer, &sink, verbose, filter_override)?
            }
        };

        layers.push(layer);
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|error| ConfigError::Logging {
            reason: error.to_string(),
        })?;

    Ok(LoggingGuard {
        _file_guards: file_guards,
    })
}


#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn verbosity_maps_to_levels() {
        assert_eq!(verbosity_level(0), LevelFilter::INFO);
        assert_eq!(verbosity_level(1), LevelFilter::DEBUG);
        assert_eq!(verbosity_level(2), LevelFilter::TRACE);
        assert_eq!(verbosity_level(7), LevelFilter::TRACE);
    }

    #[test]
    fn stderr_is_added_without_a_console_sink() {
        let file = LogSink::new(
            LogTarget::File(PathBuf::from("demo.log")),
            None,
            LogFormat::Json,
        );

        let effective = effective_sinks(&[file.clone()]);

        assert_eq!(effective, vec![file, LogSink::default_console()]);
    }

    #[test]
    fn explicit_console_sinks_are_kept_alone() {
        let stdout = LogSink::new(LogTarget::Stdout, None, LogFormat::NoColor);
        let null = LogSink::new(LogTarget::Null, None, LogFormat::NoColor);

        assert_eq!(effective_sinks(&[stdout.clone()]), vec![stdout]);
        assert_eq!(effective_sinks(&[null.clone()]), vec![null]);
    }
}
