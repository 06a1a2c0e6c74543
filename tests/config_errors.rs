// tests/config_errors.rs

use std::io::Write;
use std::path::PathBuf;

use sitepipe::config::{load_and_validate, ConfigFile};
use sitepipe::errors::SitepipeError;
use sitepipe::tasks::registry_from_config;
use sitepipe::types::ActionKind;
use sitepipe_test_utils::builders::{ConfigFileBuilder, TaskConfigBuilder};
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn load(contents: &str) -> Result<ConfigFile, SitepipeError> {
    let file = write_config(contents);
    load_and_validate(file.path())
}

#[test]
fn missing_file_is_io_error() {
    let err = load_and_validate("/definitely/not/here/Sitepipe.toml").unwrap_err();
    assert!(matches!(err, SitepipeError::IoError(_)));
}

#[test]
fn malformed_toml_is_reported() {
    let err = load("[task.html\naction = ").unwrap_err();
    assert!(matches!(err, SitepipeError::TomlError(_)));
    assert!(err.is_configuration());
}

#[test]
fn unknown_action_kind_is_a_toml_error() {
    let err = load(
        r#"
[task.html]
action = "minify-everything"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, SitepipeError::TomlError(_)));
}

#[test]
fn empty_config_is_rejected() {
    let err = load("[config]\ndebounce_ms = 50\n").unwrap_err();
    assert!(matches!(err, SitepipeError::ConfigError(msg) if msg.contains("at least one")));
}

#[test]
fn unknown_predecessor_names_the_owner() {
    let err = load(
        r#"
[task.html]
action = "copy"
src = ["pages/*.html"]
dest = "dist"
after = ["clean"]
"#,
    )
    .unwrap_err();
    match err {
        SitepipeError::UnknownTask(msg) => {
            assert!(msg.starts_with("clean"));
            assert!(msg.contains("'html'"));
        }
        other => panic!("expected unknown task, got {other:?}"),
    }
}

#[test]
fn shell_without_command_is_rejected() {
    let err = load(
        r#"
[task.lint]
action = "shell"
cmd = "   "
"#,
    )
    .unwrap_err();
    assert!(matches!(err, SitepipeError::ConfigError(msg) if msg.contains("`cmd`")));
}

#[test]
fn oversized_debounce_is_rejected() {
    let err = load(
        r#"
[config]
debounce_ms = 600000

[task.clean]
action = "clean"
target = "dist"
"#,
    )
    .unwrap_err();
    assert!(matches!(err, SitepipeError::ConfigError(msg) if msg.contains("debounce_ms")));
}

#[test]
fn cycle_config_is_rejected_when_registering() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("configs/cycle.toml");
    let cfg = load_and_validate(&path).expect("cycle.toml parses");

    match registry_from_config(&cfg) {
        Err(SitepipeError::Cycle { task, path }) => {
            assert!(task == "a" || task == "b");
            assert_eq!(path.first(), path.last());
        }
        other => panic!("expected cycle, got {other:?}"),
    }
}

#[test]
fn task_listing_itself_in_after_is_a_cycle() {
    let cfg = load(
        r#"
[task.lint]
action = "shell"
cmd = "true"
after = ["lint"]
"#,
    )
    .expect("self reference is not a config error");

    match registry_from_config(&cfg) {
        Err(SitepipeError::Cycle { task, path }) => {
            assert_eq!(task, "lint");
            assert_eq!(path, vec!["lint", "lint"]);
        }
        other => panic!("expected cycle, got {other:?}"),
    }
}

#[test]
fn builder_config_round_trips_into_registry() {
    let cfg = ConfigFileBuilder::new()
        .with_task("clean", TaskConfigBuilder::action(ActionKind::Clean).target("dist").build())
        .with_task(
            "html",
            TaskConfigBuilder::action(ActionKind::Copy)
                .src("pages/*.html")
                .dest("dist")
                .after("clean")
                .build(),
        )
        .with_watch(&["pages/*.html"], "html", true)
        .build();

    let registry = registry_from_config(&cfg).unwrap();
    assert_eq!(registry.resolve("html").unwrap().predecessors, vec!["clean"]);
}
