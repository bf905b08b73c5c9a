//! The file-backed settings source: which configuration files are read,
//! in which order, and how their values are layered.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::environment::Environment;
use super::group::MutexConfigGroup;
use super::paths::PathResolver;
use super::settings::Settings;
use crate::error::Result;
use crate::xdg::{self, XdgKind};


/// Everything a single configuration resolution depends on.
///
/// Passed explicitly through every resolution step; nothing is read from or
/// written to the process environment behind the caller's back.
#[derive(Debug, Clone)]
pub struct ResolutionContext {
    app_name: String,
    explicit_config_file: Option<PathBuf>,
    xdg_config_home: PathBuf,
    local_root: PathBuf,
    env_prefix: Option<String>,
    environment: Environment,
}

impl ResolutionContext {
    /// The XDG config home is taken from `environment`
    /// (`XDG_CONFIG_HOME`, else `$HOME/.config`).
    pub fn new<S>(app_name: S, environment: Environment) -> Self
    where
        S: Into<String>,
    {
        let xdg_config_home = xdg::base_dir(XdgKind::Config, &environment);

        Self {
            app_name: app_name.into(),
            explicit_config_file: None,
            xdg_config_home,
            local_root: PathBuf::new(),
            env_prefix: None,
            environment,
        }
    }

    /// Read only this file, skipping tiered resolution.
    /// Relative paths are taken relative to the local root.
    pub fn with_explicit_config_file<P>(mut self, path: Option<P>) -> Self
    where
        P: Into<PathBuf>,
    {
        self.explicit_config_file = path.map(Into::into);
        self
    }

    pub fn with_xdg_config_home<P>(mut self, path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        self.xdg_config_home = path.into();
        self
    }

    /// Directory that local candidates are relative to.
    /// Defaults to the empty path, i.e. the working directory.
    pub fn with_local_root<P>(mut self, path: P) -> Self
    where
        P: Into<PathBuf>,
    {
        self.local_root = path.into();
        self
    }

    pub fn with_env_prefix<S>(mut self, prefix: Option<S>) -> Self
    where
        S: Into<String>,
    {
        self.env_prefix = prefix.map(Into::into);
        self
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn explicit_config_file(&self) -> Option<&Path> {
        self.explicit_config_file.as_deref()
    }

    pub fn xdg_config_home(&self) -> &Path {
        &self.xdg_config_home
    }

    pub fn local_root(&self) -> &Path {
        &self.local_root
    }

    pub fn env_prefix(&self) -> Option<&str> {
        self.env_prefix.as_deref()
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }
}


/// Builds the file-backed settings mapping for one [`ResolutionContext`].
#[derive(Debug)]
pub struct SourceResolver<'a> {
    context: &'a ResolutionContext,
}

impl<'a> SourceResolver<'a> {
    pub fn new(context: &'a ResolutionContext) -> Self {
        Self { context }
    }

    /// The groups that [`SourceResolver::resolve`] applies, lowest
    /// precedence first.
    ///
    /// With an explicit configuration file this is a single group holding
    /// only that file. Otherwise it is the shared, user and local groups.
    /// The shared group never records provenance: a file shared by every
    /// application is not "the" configuration file of this one.
    pub fn groups(&self) -> Vec<MutexConfigGroup> {
        if let Some(explicit) = self.context.explicit_config_file() {
            let path = self.context.local_root().join(explicit);
            return vec![MutexConfigGroup::new([path]).recording_provenance()];
        }

        let candidates = PathResolver::new(
            self.context.xdg_config_home(),
            self.context.local_root(),
        )
        .candidates(self.context.app_name());

        vec![
            MutexConfigGroup::new(candidates.shared),
            MutexConfigGroup::new(candidates.user).recording_provenance(),
            MutexConfigGroup::new(candidates.local).recording_provenance(),
        ]
    }

    /// Apply every group to one accumulator, so that later (more specific)
    /// groups overwrite earlier ones key by key.
    pub fn resolve(&self) -> Result<Settings> {
        if let Some(explicit) = self.context.explicit_config_file() {
            info!(
                file = %explicit.display(),
                "Using explicit configuration file, skipping tiered lookup."
            );
        }

        let mut settings = Settings::new();

        for group in self.groups() {
            if let Some(winner) = group.populate(&mut settings)? {
                debug!(
                    file = %winner.display(),
                    provenance = group.records_provenance(),
                    "Applied configuration file."
                );
            }
        }

        Ok(settings)
    }
}
