// CLI integration tests for the show/set flows.
use std::path::Path;
use std::process::{Command, Output};

use serde_json::{Value, json};

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_endure");
    let mut command = Command::new(exe);
    command.env_remove("RUST_LOG");
    command
}

fn run(file: &Path, args: &[&str]) -> Output {
    cmd()
        .args(["--file", file.to_str().unwrap()])
        .args(args)
        .output()
        .expect("run endure")
}

fn parse_json_line(output: &[u8]) -> Value {
    let text = String::from_utf8_lossy(output);
    let line = text.lines().next().expect("json line");
    serde_json::from_str(line).expect("valid json")
}

#[test]
fn show_without_saved_state_prints_zero_record() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = temp.path().join("state.json");

    let show = run(&file, &["show"]);
    assert!(show.status.success());
    assert_eq!(parse_json_line(&show.stdout), json!({"foo": "", "bar": 0.0}));
    assert!(!file.exists());
}

#[test]
fn set_prints_previous_then_stores() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = temp.path().join("state.json");

    let first = run(&file, &["set", "--foo", "hello", "--bar", "4.5"]);
    assert!(first.status.success());
    assert_eq!(parse_json_line(&first.stdout), json!({"foo": "", "bar": 0.0}));
    assert_eq!(
        std::fs::read_to_string(&file).expect("read"),
        r#"{"foo":"hello","bar":4.5}"#
    );

    let second = run(&file, &["set", "--foo", "again"]);
    assert!(second.status.success());
    assert_eq!(
        parse_json_line(&second.stdout),
        json!({"foo": "hello", "bar": 4.5})
    );

    let show = run(&file, &["show"]);
    assert!(show.status.success());
    assert_eq!(parse_json_line(&show.stdout), json!({"foo": "again", "bar": 0.0}));
}

#[test]
fn toml_format_writes_toml() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = temp.path().join("state.toml");

    let set = run(&file, &["--format", "toml", "set", "--foo", "hello", "--bar", "1.5"]);
    assert!(set.status.success());
    let text = std::fs::read_to_string(&file).expect("read");
    assert!(text.contains("foo = \"hello\""));
    assert!(text.contains("bar = 1.5"));

    let show = run(&file, &["--format", "toml", "show"]);
    assert_eq!(parse_json_line(&show.stdout), json!({"foo": "hello", "bar": 1.5}));
}

#[test]
fn yaml_format_rebinds_the_default_codec() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = temp.path().join("state.yaml");

    let set = run(&file, &["--format", "yaml", "set", "--foo", "hello", "--bar", "2"]);
    assert!(set.status.success());
    assert_eq!(std::fs::read_to_string(&file).expect("read"), "foo: hello\nbar: 2\n");

    let set = run(&file, &["--format", "yaml", "set", "--foo", "again", "--bar", "0.5"]);
    assert_eq!(parse_json_line(&set.stdout), json!({"foo": "hello", "bar": 2.0}));

    let show = run(&file, &["--format", "yaml", "show"]);
    assert_eq!(parse_json_line(&show.stdout), json!({"foo": "again", "bar": 0.5}));
}

#[test]
fn xml_format_round_trips_through_element_text() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = temp.path().join("state.xml");

    let set = run(&file, &["--format", "xml", "set", "--handle", "--foo", "a&b", "--bar", "1.25"]);
    assert!(set.status.success());
    assert_eq!(
        std::fs::read_to_string(&file).expect("read"),
        "<value><foo>a&amp;b</foo><bar>1.25</bar></value>"
    );

    let show = run(&file, &["--format", "xml", "show"]);
    assert_eq!(parse_json_line(&show.stdout), json!({"foo": "a&b", "bar": 1.25}));
}

#[test]
fn whole_numbers_are_stored_without_a_fraction() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = temp.path().join("state.json");

    let set = run(&file, &["set", "--foo", "x"]);
    assert!(set.status.success());
    assert_eq!(
        std::fs::read_to_string(&file).expect("read"),
        r#"{"foo":"x","bar":0}"#
    );
}

#[test]
fn handle_flag_uses_a_dedicated_storage() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = temp.path().join("state.b64");

    let set = run(
        &file,
        &["--format", "base64-json", "set", "--handle", "--foo", "x", "--bar", "2"],
    );
    assert!(set.status.success());
    let text = std::fs::read_to_string(&file).expect("read");
    assert!(!text.contains('{'));

    let show = run(&file, &["--format", "base64-json", "show"]);
    assert_eq!(parse_json_line(&show.stdout), json!({"foo": "x", "bar": 2.0}));
}

#[test]
fn undecodable_state_reports_decode_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = temp.path().join("state.json");
    std::fs::write(&file, "not json").expect("seed");

    let show = run(&file, &["show"]);
    assert_eq!(show.status.code(), Some(6));
    let err = parse_json_line(&show.stderr);
    assert_eq!(err["error"]["kind"], "Decode");
    assert_eq!(err["error"]["path"], file.to_str().unwrap());
    assert!(err["error"]["hint"].as_str().unwrap().contains("--format"));
}

#[test]
fn unknown_format_is_a_usage_error() {
    let temp = tempfile::tempdir().expect("tempdir");
    let file = temp.path().join("state.ini");

    let show = run(&file, &["--format", "ini", "show"]);
    assert_eq!(show.status.code(), Some(2));
    let err = parse_json_line(&show.stderr);
    assert_eq!(err["error"]["kind"], "Usage");
}
