//! Demonstration application made of subcommands.
//!
//! ```text
//! cliconf-subcommands bar 5              # bar=5, barbar=BARBAR
//! cliconf-subcommands bar --bar=x 5      # bar=5, barbar=x
//! FOO=KUNGFOO cliconf-subcommands foo    # foo=KUNGFOO foo_txt=foo.txt
//! ```

use std::path::PathBuf;

use clap::{Args, Command};
use cliconf::{App, AppConfig, Config, Field, FieldKind, Runners};
use miette::Result;
use serde::Deserialize;
use tracing::info;


#[derive(Deserialize, Debug)]
struct BarConfig {
    bar: i64,

    barbar: String,
}

#[derive(Args)]
#[allow(dead_code)]
struct BarArgs {
    #[arg(value_name = "BAR", help = "Sets bar.")]
    bar: i64,

    #[arg(long = "bar", value_name = "BARBAR", help = "Sets barbar.")]
    barbar: Option<String>,
}

impl AppConfig for BarConfig {
    fn fields() -> Vec<Field> {
        vec![
            Field::new("bar", FieldKind::Integer),
            Field::new("barbar", FieldKind::String).with_default("BARBAR"),
        ]
    }

    fn arguments(command: Command) -> Command {
        BarArgs::augment_args(command)
    }
}


#[derive(Deserialize, Debug)]
struct BazConfig {
    /// Name of the selected subcommand.
    command: String,

    baz: bool,
}

#[derive(Args)]
#[allow(dead_code)]
struct BazArgs {
    #[arg(long = "baz", help = "Enables baz.")]
    baz: bool,
}

impl AppConfig for BazConfig {
    fn fields() -> Vec<Field> {
        vec![Field::new("baz", FieldKind::Boolean).with_default(false)]
    }

    fn arguments(command: Command) -> Command {
        BazArgs::augment_args(command)
    }
}


#[derive(Deserialize, Debug)]
struct FooConfig {
    foo: String,

    foo_txt: PathBuf,
}

#[derive(Args)]
#[allow(dead_code)]
struct FooArgs {
    #[arg(long = "foo", help = "Sets foo.")]
    foo: Option<String>,

    #[arg(long = "foo-txt", value_name = "PATH", help = "Sets the foo file.")]
    foo_txt: Option<PathBuf>,

    #[arg(long = "ignored", help = "Accepted and ignored.")]
    ignored: bool,
}

impl AppConfig for FooConfig {
    fn fields() -> Vec<Field> {
        vec![
            Field::new("foo", FieldKind::String),
            Field::new("foo_txt", FieldKind::Path).with_default("foo.txt"),
        ]
    }

    fn arguments(command: Command) -> Command {
        FooArgs::augment_args(command)
    }
}


fn run_bar(config: Config<BarConfig>) -> Result<i32> {
    println!("bar={}, barbar={}", config.bar, config.barbar);
    Ok(0)
}

fn run_baz(config: Config<BazConfig>) -> Result<i32> {
    info!(command = %config.command, "Running subcommand.");

    println!("baz={}", config.baz);
    Ok(0)
}

fn run_foo(config: Config<FooConfig>) -> Result<i32> {
    println!("foo={} foo_txt={}", config.foo, config.foo_txt.display());
    Ok(0)
}


fn main() {
    let runners = Runners::new()
        .register::<BarConfig, _>("bar", "The 'bar' subcommand.", run_bar)
        .register::<BazConfig, _>("baz", "The 'baz' subcommand.", run_baz)
        .register::<FooConfig, _>("foo", "The 'foo' subcommand.", run_foo);

    std::process::exit(
        App::new("subcommands")
            .with_version(env!("CARGO_PKG_VERSION"))
            .run_subcommands(std::env::args_os(), runners),
    );
}
