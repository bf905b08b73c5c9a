//! Small demonstration application exercising the whole precedence chain.
//!
//! ```text
//! cliconf-demo --foo=KUNG -B2        # foo=KUNG bar=2 baz=false
//! BAR=4 cliconf-demo --baz           # foo=FOO bar=4 baz=true
//! cliconf-demo -c custom.yml --baz   # only custom.yml is read
//! ```

use clap::{Args, Command};
use cliconf::{App, AppConfig, Config, Field, FieldKind};
use miette::Result;
use serde::Deserialize;
use tracing::info;


/// Configuration of the demo application.
#[derive(Deserialize, Debug)]
struct DemoConfig {
    foo: String,

    bar: i64,

    baz: bool,

    cheese: Option<String>,

    /// Also print which configuration file was used.
    show_config: bool,
}

/// Command-line flags of the demo application. Values are read back by
/// argument id through [`Config`], never from this struct.
#[derive(Args)]
#[allow(dead_code)]
struct DemoArgs {
    #[arg(short = 'f', long = "foo", help = "Sets foo.")]
    foo: Option<String>,

    #[arg(short = 'B', long = "some-bar", value_name = "BAR", help = "Sets bar.")]
    bar: Option<i64>,

    #[arg(long = "baz", help = "Enables baz.")]
    baz: bool,

    #[arg(long = "cheese", help = "Picks a cheese.")]
    cheese: Option<String>,

    #[arg(
        long = "show-config",
        help = "Also print the configuration file in use."
    )]
    show_config: bool,
}


impl AppConfig for DemoConfig {
    fn fields() -> Vec<Field> {
        vec![
            Field::new("foo", FieldKind::String).with_default("FOO"),
            Field::new("bar", FieldKind::Integer),
            Field::new("baz", FieldKind::Boolean).with_default(false),
            Field::new("cheese", FieldKind::String).optional(),
            Field::new("show_config", FieldKind::Boolean).with_default(false),
        ]
    }

    fn arguments(command: Command) -> Command {
        DemoArgs::augment_args(command.about("Prints its resolved configuration."))
    }
}


fn run(config: Config<DemoConfig>) -> Result<i32> {
    info!(foo = %config.foo, bar = config.bar, "Running demo.");

    let mut output = format!("foo={} bar={} baz={}", config.foo, config.bar, config.baz);

    if let Some(cheese) = config.cheese.as_ref() {
        output.push_str(&format!(" cheese={}", cheese));
    }

    if config.show_config {
        match config.config_file() {
            Some(file) => output.push_str(&format!(" config={}", file)),
            None => output.push_str(" config=None"),
        }
    }

    println!("{}", output);
    Ok(0)
}


fn main() {
    std::process::exit(
        App::new("demo")
            .with_version(env!("CARGO_PKG_VERSION"))
            .run(std::env::args_os(), run),
    );
}
