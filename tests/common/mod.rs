#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use cliconf::Environment;
use tempfile::TempDir;


/// A throwaway XDG config home plus working directory.
pub struct Sandbox {
    _temp: TempDir,
    root: PathBuf,
}

impl Sandbox {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().to_path_buf();

        fs::create_dir_all(root.join("xdg")).unwrap();
        fs::create_dir_all(root.join("home")).unwrap();
        fs::create_dir_all(root.join("work")).unwrap();

        Self { _temp: temp, root }
    }

    pub fn xdg_config_home(&self) -> PathBuf {
        self.root.join("xdg")
    }

    pub fn home(&self) -> PathBuf {
        self.root.join("home")
    }

    pub fn work(&self) -> PathBuf {
        self.root.join("work")
    }

    /// Write a file relative to the XDG config home.
    pub fn user_file(&self, relative: &str, contents: &str) -> PathBuf {
        make_config_file(&self.xdg_config_home(), relative, contents)
    }

    /// Write a file relative to the working directory.
    pub fn local_file(&self, relative: &str, contents: &str) -> PathBuf {
        make_config_file(&self.work(), relative, contents)
    }

    /// An environment that only knows about this sandbox, plus `variables`.
    pub fn environment(&self, variables: &[(&str, &str)]) -> Environment {
        variables.iter().fold(
            Environment::empty()
                .with("HOME", self.home().to_string_lossy())
                .with("XDG_CONFIG_HOME", self.xdg_config_home().to_string_lossy()),
            |environment, (name, value)| environment.with(*name, *value),
        )
    }
}


/// Create `root/relative` (and its parent directories) with `contents`.
pub fn make_config_file(root: &Path, relative: &str, contents: &str) -> PathBuf {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    path
}


/// Run `binary` inside `sandbox`'s working directory with a cleared
/// environment that only points at the sandbox, plus `env`.
pub fn run_binary(binary: &str, sandbox: &Sandbox, args: &[&str], env: &[(&str, &str)]) -> Output {
    Command::new(binary)
        .args(args)
        .env_clear()
        .env("HOME", sandbox.home())
        .env("XDG_CONFIG_HOME", sandbox.xdg_config_home())
        .env("XDG_DATA_HOME", sandbox.home().join(".local/share"))
        .envs(env.iter().copied())
        .current_dir(sandbox.work())
        .output()
        .unwrap()
}


/// A single end-to-end run: arguments, environment and files in, expected
/// standard output out.
pub struct Case<'a> {
    binary: &'a str,
    args: &'a [&'a str],
    env: &'a [(&'a str, &'a str)],
    local_files: &'a [(&'a str, &'a str)],
    user_files: &'a [(&'a str, &'a str)],
    output: &'a str,
}

impl<'a> Case<'a> {
    pub fn new(binary: &'a str, args: &'a [&'a str], output: &'a str) -> Self {
        Self {
            binary,
            args,
            env: &[],
            local_files: &[],
            user_files: &[],
            output,
        }
    }

    pub fn env(mut self, env: &'a [(&'a str, &'a str)]) -> Self {
        self.env = env;
        self
    }

    pub fn local_files(mut self, files: &'a [(&'a str, &'a str)]) -> Self {
        self.local_files = files;
        self
    }

    pub fn user_files(mut self, files: &'a [(&'a str, &'a str)]) -> Self {
        self.user_files = files;
        self
    }

    pub fn check(&self) {
        let sandbox = Sandbox::new();
        for (path, contents) in self.local_files {
            sandbox.local_file(path, contents);
        }
        for (path, contents) in self.user_files {
            sandbox.user_file(path, contents);
        }

        let output = run_binary(self.binary, &sandbox, self.args, self.env);
        let stdout = String::from_utf8_lossy(&output.stdout);

        assert_eq!(
            output.status.code(),
            Some(0),
            "args {:?} failed: {}",
            self.args,
            String::from_utf8_lossy(&output.stderr)
        );
        assert_eq!(stdout.trim(), self.output, "args {:?}", self.args);
    }
}
