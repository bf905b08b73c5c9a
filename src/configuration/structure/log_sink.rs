use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing_subscriber::filter::LevelFilter;

use crate::configuration::traits::ResolvableConfigurationWithContext;
use crate::error::{ConfigError, Result};


/// Where a log sink writes to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    Stdout,
    /// Disables console output entirely.
    Null,
    File(PathBuf),
}

impl LogTarget {
    pub fn is_console(&self) -> bool {
        matches!(self, LogTarget::Stderr | LogTarget::Stdout | LogTarget::Null)
    }
}


/// How log records are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Color,
    NoColor,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "color" => Ok(LogFormat::Color),
            "nocolor" => Ok(LogFormat::NoColor),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!(
                "unknown format \"{}\", expected one of color, nocolor, json",
                value
            )),
        }
    }
}


fn parse_level(value: &str) -> std::result::Result<LevelFilter, String> {
    match value.to_ascii_uppercase().as_str() {
        "TRACE" => Ok(LevelFilter::TRACE),
        "DEBUG" => Ok(LevelFilter::DEBUG),
        "INFO" => Ok(LevelFilter::INFO),
        "WARN" | "WARNING" => Ok(LevelFilter::WARN),
        "ERROR" | "CRITICAL" => Ok(LevelFilter::ERROR),
        _ => Err(format!(
            "unknown level \"{}\", expected one of TRACE, DEBUG, INFO, WARNING, ERROR, CRITICAL",
            value
        )),
    }
}


fn level_name(level: LevelFilter) -> &'static str {
    if level == LevelFilter::TRACE {
        "TRACE"
    } else if level == LevelFilter::DEBUG {
        "DEBUG"
    } else if level == LevelFilter::INFO {
        "INFO"
    } else if level == LevelFilter::WARN {
        "WARNING"
    } else if level == LevelFilter::ERROR {
        "ERROR"
    } else {
        "OFF"
    }
}


/// A syntactically valid `FILE[:LEVEL][@FORMAT]` log sink specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedLogSink {
    file: String,
    level: Option<LevelFilter>,
    format: Option<LogFormat>,
}

impl FromStr for UnresolvedLogSink {
    type Err = ConfigError;

    fn from_str(spec: &str) -> Result<Self> {
        let invalid = |reason: String| ConfigError::InvalidLogSink {
            spec: spec.to_string(),
            reason,
        };

        let (rest, format) = match spec.split_once('@') {
            Some((rest, format)) => (rest, Some(format)),
            None => (spec, None),
        };
        let (file, level) = match rest.split_once(':') {
            Some((file, level)) => (file, Some(level)),
            None => (rest, None),
        };

        if file.is_empty() {
            return Err(invalid("FILE must not be empty".to_string()));
        }

        let parts = [Some(file), level, format];
        if parts
            .iter()
            .flatten()
            .any(|part| part.is_empty() || part.contains([':', '@']))
        {
            return Err(invalid("expected FILE[:LEVEL][@FORMAT]".to_string()));
        }

        Ok(Self {
            file: file.to_string(),
            level: level.map(parse_level).transpose().map_err(invalid)?,
            format: format.map(LogFormat::from_str).transpose().map_err(invalid)?,
        })
    }
}


/// Context needed to turn a log specification into a concrete sink.
#[derive(Debug, Clone)]
pub struct LogSinkContext {
    /// Default log file stem for `+`.
    pub app_name: String,

    /// Base XDG data directory; default log files live below it.
    pub data_home: PathBuf,
}

impl LogSinkContext {
    /// `<data_home>/<name>/<name>.log`
    pub fn default_logfile(&self, name: &str) -> PathBuf {
        self.data_home.join(name).join(format!("{}.log", name))
    }
}


/// A fully resolved log sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSink {
    target: LogTarget,
    level: Option<LevelFilter>,
    format: LogFormat,
}


impl LogSink {
    pub fn new(target: LogTarget, level: Option<LevelFilter>, format: LogFormat) -> Self {
        Self {
            target,
            level,
            format,
        }
    }

    /// The implicit sink used when no console sink was requested.
    pub fn default_console() -> Self {
        Self::new(LogTarget::Stderr, None, LogFormat::Color)
    }

    pub fn target(&self) -> &LogTarget {
        &self.target
    }

    /// Explicit level of this sink. `None` means "follow the verbosity".
    pub fn level(&self) -> Option<LevelFilter> {
        self.level
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    pub fn file_path(&self) -> Option<&Path> {
        match &self.target {
            LogTarget::File(path) => Some(path),
            _ => None,
        }
    }
}

impl Display for LogSink {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.target {
            LogTarget::Stderr => write!(f, "stderr")?,
            LogTarget::Stdout => write!(f, "stdout")?,
            LogTarget::Null => write!(f, "null")?,
            LogTarget::File(path) => write!(f, "{}", path.display())?,
        }

        if let Some(level) = self.level {
            write!(f, ":{}", level_name(level))?;
        }

        let format = match self.format {
            LogFormat::Color => "color",
            LogFormat::NoColor => "nocolor",
            LogFormat::Json => "json",
        };
        write!(f, "@{}", format)
    }
}


impl ResolvableConfigurationWithContext for UnresolvedLogSink {
    type Context = LogSinkContext;
    type Resolved = LogSink;

    fn resolve(self, context: Self::Context) -> Result<Self::Resolved> {
        let target = match self.file.as_str() {
            "stderr" => LogTarget::Stderr,
            "stdout" => LogTarget::Stdout,
            "null" => LogTarget::Null,
            file => match file.strip_prefix('+') {
                Some("") => LogTarget::File(context.default_logfile(&context.app_name)),
                Some(name) => LogTarget::File(context.default_logfile(name)),
                None => LogTarget::File(PathBuf::from(file)),
            },
        };

        let format = match (self.format, &target) {
            (Some(format), _) => format,
            (None, LogTarget::File(_)) => LogFormat::Json,
            (None, _) => LogFormat::Color,
        };

        Ok(LogSink {
            target,
            level: self.level,
            format,
        })
    }
}
