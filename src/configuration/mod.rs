//! This module contains all configuration-relevant code: where configuration
//! files are looked for, how they are read and edited, and how their values
//! are layered with environment variables and command-line flags.
//!
//! Your starting point should probably be [`ConfigAssembler::assemble`].
//!
//! # Precedence
//! From lowest to highest:
//! static field defaults, configuration files, environment variables,
//! explicit command-line flags.
//!
//! Configuration files are themselves layered in three groups
//! (see [`PathResolver`]): files shared by all applications, per-user
//! application files and local (working directory) files. Within each group
//! only the first existing candidate is read (see [`MutexConfigGroup`]).
//! An explicit `-c/--config` file replaces all three groups.
//!
//! # Internals
//! Like the rest of this crate, the final structure is produced in two steps:
//! the merged mapping is first deserialized into unresolved structures, which
//! are then turned into their resolved ("validated") versions by
//! [`resolve`][traits::ResolvableConfigurationWithContext::resolve]. Log sink
//! specifications, for example, are only checked and expanded into concrete
//! targets during that step.

#![allow(rustdoc::private_intra_doc_links)]

mod environment;
mod file;
mod group;
mod paths;
mod schema;
mod settings;
mod source;
mod structure;
mod traits;
mod utilities;

pub use environment::{environment_settings, Environment};
pub use file::YamlConfigFile;
pub use group::MutexConfigGroup;
pub use paths::{CandidatePaths, PathResolver, SHARED_NAMESPACE};
pub use schema::{
    Field,
    FieldKind,
    Schema,
    COMMAND_FIELD,
    CONFIG_FILE_FIELD,
    LOGS_FIELD,
    VERBOSE_FIELD,
};
pub use settings::{Settings, Tier};
pub use source::{ResolutionContext, SourceResolver};
pub use structure::*;
pub use traits::{AppConfig, ConfigFile, ResolvableConfigurationWithContext};
pub use utilities::{render_command_line_value, render_inline};
