//! Candidate configuration file locations for an application.
//!
//! Pure path construction, no filesystem I/O. Application names are used
//! verbatim; names containing path separators are the caller's problem.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::file::YamlConfigFile;
use super::traits::ConfigFile;


/// Name of the directory (under the XDG config home) holding files shared
/// by every application built on this crate.
pub const SHARED_NAMESPACE: &str = "cliconf";


/// Candidate paths for each tier, each list in lookup order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePaths {
    /// Files shared by all applications.
    pub shared: Vec<PathBuf>,

    /// Per-application files in the user's XDG config directory.
    pub user: Vec<PathBuf>,

    /// Per-application files relative to the working directory.
    pub local: Vec<PathBuf>,
}


/// Computes candidate configuration file locations.
#[derive(Debug, Clone)]
pub struct PathResolver {
    xdg_config_home: PathBuf,
    local_root: PathBuf,
    extensions: &'static [&'static str],
}

impl PathResolver {
    /// `local_root` is prepended to local candidates; pass an empty path to
    /// get paths relative to the working directory.
    pub fn new<X, L>(xdg_config_home: X, local_root: L) -> Self
    where
        X: Into<PathBuf>,
        L: Into<PathBuf>,
    {
        Self {
            xdg_config_home: xdg_config_home.into(),
            local_root: local_root.into(),
            extensions: YamlConfigFile::EXTENSIONS,
        }
    }

    pub fn with_extensions(mut self, extensions: &'static [&'static str]) -> Self {
        self.extensions = extensions;
        self
    }

    /// Expand `stem` into one path per recognized extension.
    fn with_each_extension(&self, stem: &Path) -> Vec<PathBuf> {
        self.extensions
            .iter()
            .map(|extension| {
                let mut path: OsString = stem.as_os_str().to_owned();
                path.push(".");
                path.push(extension);
                PathBuf::from(path)
            })
            .collect()
    }

    fn expand(&self, stems: &[PathBuf]) -> Vec<PathBuf> {
        stems
            .iter()
            .flat_map(|stem| self.with_each_extension(stem))
            .collect()
    }

    /// e.g. `~/.config/cliconf/global.yml`, `~/.config/cliconf/apps/all.yml`
    pub fn shared_candidates(&self) -> Vec<PathBuf> {
        let namespace_directory = self.xdg_config_home.join(SHARED_NAMESPACE);

        self.expand(&[
            namespace_directory.join("global"),
            namespace_directory.join("apps").join("all"),
        ])
    }

    /// e.g. `~/.config/APP/APP.yml`, `~/.config/APP/config.yml`,
    /// `~/.config/cliconf/apps/APP.yml`
    pub fn user_candidates(&self, app_name: &str) -> Vec<PathBuf> {
        let app_directory = self.xdg_config_home.join(app_name);
        let shared_apps_directory = self.xdg_config_home.join(SHARED_NAMESPACE).join("apps");

        self.expand(&[
            app_directory.join(app_name),
            app_directory.join("config"),
            shared_apps_directory.join(app_name),
        ])
    }

    /// e.g. `./APP.yml`, `./APP/APP.yml`, `./APP/config.yml`,
    /// `./.APP/APP.yml`, `./.APP/config.yml`
    pub fn local_candidates(&self, app_name: &str) -> Vec<PathBuf> {
        let app_directory = self.local_root.join(app_name);
        let hidden_app_directory = self.local_root.join(format!(".{}", app_name));

        self.expand(&[
            self.local_root.join(app_name),
            app_directory.join(app_name),
            app_directory.join("config"),
            hidden_app_directory.join(app_name),
            hidden_app_directory.join("config"),
        ])
    }

    pub fn candidates(&self, app_name: &str) -> CandidatePaths {
        CandidatePaths {
            shared: self.shared_candidates(),
            user: self.user_candidates(app_name),
            local: self.local_candidates(app_name),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn paths(list: &[&str]) -> Vec<PathBuf> {
        list.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn shared_candidates_cover_global_and_all() {
        let resolver = PathResolver::new("/xdg", "");

        assert_eq!(
            resolver.shared_candidates(),
            paths(&[
                "/xdg/cliconf/global.yml",
                "/xdg/cliconf/global.yaml",
                "/xdg/cliconf/apps/all.yml",
                "/xdg/cliconf/apps/all.yaml",
            ])
        );
    }

    #[test]
    fn user_candidates_are_ordered() {
        let resolver = PathResolver::new("/xdg", "");

        assert_eq!(
            resolver.user_candidates("demo"),
            paths(&[
                "/xdg/demo/demo.yml",
                "/xdg/demo/demo.yaml",
                "/xdg/demo/config.yml",
                "/xdg/demo/config.yaml",
                "/xdg/cliconf/apps/demo.yml",
                "/xdg/cliconf/apps/demo.yaml",
            ])
        );
    }

    #[test]
    fn local_candidates_are_relative_by_default() {
        let resolver = PathResolver::new("/xdg", "");

        assert_eq!(
            resolver.local_candidates("demo"),
            paths(&[
                "demo.yml",
                "demo.yaml",
                "demo/demo.yml",
                "demo/demo.yaml",
                "demo/config.yml",
                "demo/config.yaml",
                ".demo/demo.yml",
                ".demo/demo.yaml",
                ".demo/config.yml",
                ".demo/config.yaml",
            ])
        );
    }

    #[test]
    fn local_root_is_prepended() {
        let resolver = PathResolver::new("/xdg", "/work");

        let local = resolver.local_candidates("demo");
        assert_eq!(local.first(), Some(&PathBuf::from("/work/demo.yml")));
        assert_eq!(local.last(), Some(&PathBuf::from("/work/.demo/config.yaml")));
    }

    #[test]
    fn custom_extensions_are_used_in_order() {
        let resolver = PathResolver::new("/xdg", "").with_extensions(&["yaml"]);

        assert_eq!(
            resolver.candidates("demo").local[..2],
            paths(&["demo.yaml", "demo/demo.yaml"])[..]
        );
    }
}
