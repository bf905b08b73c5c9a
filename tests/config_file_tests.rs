mod common;

use std::fs;

use cliconf::configuration::ConfigAssembler;
use cliconf::{AppConfig, Config, ConfigFile, Field, FieldKind, Settings, YamlConfigFile};
use common::{make_config_file, Sandbox};
use serde::Deserialize;
use serde_yaml::Value;


#[derive(Debug, Deserialize)]
struct Counter {
    count: i64,
}

impl AppConfig for Counter {
    fn fields() -> Vec<Field> {
        vec![Field::new("count", FieldKind::Integer).with_default(0)]
    }
}


#[test]
fn new_file_reads_back_exactly() {
    let sandbox = Sandbox::new();
    let fields: Settings = vec![
        ("name".to_string(), Value::from("demo")),
        ("retries".to_string(), Value::from(3)),
        ("tags".to_string(), Value::Sequence(vec![Value::from("a"), Value::from("b")])),
    ]
    .into_iter()
    .collect();

    let file = YamlConfigFile::new(sandbox.work().join("a/b/demo.yml"), fields.clone()).unwrap();

    assert_eq!(file.to_settings().unwrap(), fields);
}

#[test]
fn set_keeps_hand_written_formatting() {
    let sandbox = Sandbox::new();
    let contents = "# Demo configuration\n\nfoo: FOO  # the foo\nbar: 1\n\n# trailing\n";
    let path = make_config_file(&sandbox.work(), "demo.yml", contents);

    let file = YamlConfigFile::from_path(&path);
    assert_eq!(file.set("bar", Value::from(2)).unwrap(), Some(Value::from(1)));

    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "# Demo configuration\n\nfoo: FOO  # the foo\nbar: 2\n\n# trailing\n"
    );
}

#[test]
fn missing_conditions_are_recoverable() {
    let sandbox = Sandbox::new();
    let path = make_config_file(&sandbox.work(), "demo.yml", "foo: FOO\n");

    let missing_key = YamlConfigFile::from_path(&path).get("bar").unwrap_err();
    let missing_file = YamlConfigFile::from_path(sandbox.work().join("nope.yml"))
        .to_settings()
        .unwrap_err();

    assert!(missing_key.is_missing());
    assert!(missing_file.is_missing());
}

#[test]
fn config_file_handle_edits_the_file_that_supplied_values() {
    let sandbox = Sandbox::new();
    sandbox.local_file(".counter/config.yml", "# counter state\ncount: 1\n");

    let assembler = ConfigAssembler::new("counter")
        .with_environment(sandbox.environment(&[]))
        .with_local_root(sandbox.work());

    let config: Config<Counter> = assembler.assemble(["counter"]).unwrap();
    assert_eq!(config.count, 1);

    let file = config.config_file().unwrap();
    file.set("count", Value::from(config.count + 1)).unwrap();

    let config: Config<Counter> = assembler.assemble(["counter"]).unwrap();
    assert_eq!(config.count, 2);
    assert_eq!(
        fs::read_to_string(sandbox.work().join(".counter/config.yml")).unwrap(),
        "# counter state\ncount: 2\n"
    );
}

#[test]
fn canonical_path_is_absolute() {
    let sandbox = Sandbox::new();
    let path = make_config_file(&sandbox.work(), "demo.yml", "foo: FOO\n");

    let canonical = YamlConfigFile::from_path(&path).canonical_path().unwrap();

    assert!(canonical.is_absolute());
    assert!(canonical.ends_with("demo.yml"));
}
