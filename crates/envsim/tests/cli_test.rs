//! Integration tests for the `envsim` CLI binary.
//!
//! Parsing, completions, and exit codes run without a simulation; the
//! device tests stand one up with wiremock.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use serde_json::json;
use wiremock::matchers::{body_string, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `envsim` binary with env isolation.
///
/// Clears all `ENVSIM_*` env vars and points config directories at a
/// scratch path so tests never touch the user's real configuration.
fn envsim_cmd(home: &std::path::Path) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("envsim");
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("ENVSIM_PROFILE")
        .env_remove("ENVSIM_GATEWAY")
        .env_remove("ENVSIM_API_KEY")
        .env_remove("ENVSIM_OUTPUT")
        .env_remove("ENVSIM_INSECURE")
        .env_remove("ENVSIM_TIMEOUT")
        .env_remove("RUST_LOG");
    cmd
}

fn scratch() -> tempfile::TempDir {
    tempfile::tempdir().unwrap()
}

fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

/// A simulation whose sensors read 18, 20, 19, with fan 2 running and
/// heater 1 at level 3.
async fn simulation() -> MockServer {
    let server = MockServer::start().await;

    for (id, temp) in [(1, "18"), (2, "20"), (3, "19")] {
        Mock::given(method("GET"))
            .and(path(format!("/api/sensor/{id}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(temp))
            .mount(&server)
            .await;
    }
    for (id, on) in [(1, false), (2, true), (3, false)] {
        Mock::given(method("GET"))
            .and(path(format!("/api/fans/{id}/state")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": id, "isOn": on })))
            .mount(&server)
            .await;
    }
    for (id, level) in [(1, "3"), (2, "0"), (3, "0")] {
        Mock::given(method("GET"))
            .and(path(format!("/api/heat/{id}/level")))
            .respond_with(ResponseTemplate::new(200).set_body_string(level))
            .mount(&server)
            .await;
    }
    server
}

/// Run the binary off the async runtime so the mock server keeps serving.
async fn run_blocking(mut cmd: assert_cmd::Command) -> std::process::Output {
    tokio::task::spawn_blocking(move || cmd.output().unwrap())
        .await
        .unwrap()
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let home = scratch();
    let output = envsim_cmd(home.path()).output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    let home = scratch();
    envsim_cmd(home.path()).arg("--help").assert().success().stdout(
        predicate::str::contains("fans")
            .and(predicate::str::contains("heaters"))
            .and(predicate::str::contains("sensors"))
            .and(predicate::str::contains("control")),
    );
}

#[test]
fn test_version_flag() {
    let home = scratch();
    envsim_cmd(home.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("envsim"));
}

#[test]
fn test_invalid_subcommand() {
    let home = scratch();
    envsim_cmd(home.path())
        .arg("thermostat")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions() {
    let home = scratch();
    for shell in ["bash", "zsh", "fish"] {
        envsim_cmd(home.path())
            .args(["completions", shell])
            .assert()
            .success()
            .stdout(predicate::str::contains("envsim"));
    }
}

// ── Argument validation ─────────────────────────────────────────────

#[test]
fn test_fan_state_must_be_on_or_off() {
    let home = scratch();
    envsim_cmd(home.path())
        .args(["fans", "set", "1", "sideways"])
        .assert()
        .code(2);
}

#[test]
fn test_control_tick_must_be_positive() {
    let home = scratch();
    envsim_cmd(home.path())
        .args(["control", "--tick-ms", "0"])
        .assert()
        .code(2);
}

// ── Configuration ───────────────────────────────────────────────────

#[test]
fn test_missing_api_key_exits_with_auth_code() {
    let home = scratch();
    let output = envsim_cmd(home.path())
        .args(["fans", "list"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(3));
    let text = combined_output(&output);
    assert!(text.contains("API key"), "Expected credentials hint:\n{text}");
}

#[test]
fn test_unknown_explicit_profile() {
    let home = scratch();
    envsim_cmd(home.path())
        .args(["--profile", "lab", "status"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("lab"));
}

#[test]
fn test_config_set_then_profiles() {
    let home = scratch();
    envsim_cmd(home.path())
        .args(["config", "set", "fans", "5"])
        .assert()
        .success();
    envsim_cmd(home.path())
        .args(["config", "profiles"])
        .assert()
        .success()
        .stdout(predicate::str::contains("default *"));
}

#[test]
fn test_config_use_unknown_profile() {
    let home = scratch();
    envsim_cmd(home.path())
        .args(["config", "use", "nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nowhere"));
}

// ── Simulation errors ───────────────────────────────────────────────

#[test]
fn test_unreachable_simulation_exits_with_connection_code() {
    let home = scratch();
    envsim_cmd(home.path())
        .args(["--gateway", "http://127.0.0.1:9/", "--api-key", "k", "--timeout", "2"])
        .args(["fans", "set", "1", "on"])
        .assert()
        .code(7);
}

#[test]
fn test_heater_level_out_of_range() {
    let home = scratch();
    envsim_cmd(home.path())
        .args(["--gateway", "http://127.0.0.1:9/", "--api-key", "k", "--timeout", "2", "-q"])
        .args(["heaters", "set", "1", "6"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("0 and 5").or(predicate::str::contains("0..=5")));
}

#[test]
fn test_unknown_fan_is_not_found() {
    let home = scratch();
    envsim_cmd(home.path())
        .args(["--gateway", "http://127.0.0.1:9/", "--api-key", "k", "--timeout", "2", "-q"])
        .args(["fans", "set", "9", "on"])
        .assert()
        .code(4);
}

// ── Against a simulation ────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn test_fans_list_json_reflects_simulation() {
    let server = simulation().await;
    let home = scratch();

    let mut cmd = envsim_cmd(home.path());
    cmd.args(["--gateway", &server.uri(), "--api-key", "k", "-o", "json"])
        .args(["fans", "list"]);
    let output = run_blocking(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let fans: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let states: Vec<_> = fans
        .as_array()
        .unwrap()
        .iter()
        .map(|f| (f["id"].as_u64().unwrap(), f["state"].as_str().unwrap().to_owned()))
        .collect();
    assert_eq!(
        states,
        vec![(1, "Off".into()), (2, "On".into()), (3, "Off".into())]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sensors_average() {
    let server = simulation().await;
    let home = scratch();

    let mut cmd = envsim_cmd(home.path());
    cmd.args(["--gateway", &server.uri(), "--api-key", "k", "-o", "plain"])
        .args(["sensors", "average"]);
    let output = run_blocking(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(String::from_utf8_lossy(&output.stdout).contains("19.0"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_status_shows_synchronized_heater() {
    let server = simulation().await;
    let home = scratch();

    let mut cmd = envsim_cmd(home.path());
    cmd.args(["--gateway", &server.uri(), "--api-key", "k", "--color", "never"])
        .arg("status");
    let output = run_blocking(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("High (Level 3)"), "{stdout}");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_set_fan_posts_to_simulation() {
    let server = simulation().await;
    Mock::given(method("POST"))
        .and(path("/api/fans/1"))
        .and(body_string("true"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    let home = scratch();

    let mut cmd = envsim_cmd(home.path());
    cmd.args(["--gateway", &server.uri(), "--api-key", "k"])
        .args(["fans", "set", "1", "on"]);
    let output = run_blocking(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
    assert!(combined_output(&output).contains("Fan 1 has been turned On."));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_fan_already_in_state_sends_nothing() {
    let server = simulation().await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/api/fans/\d+$"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    let home = scratch();

    let mut cmd = envsim_cmd(home.path());
    cmd.args(["--gateway", &server.uri(), "--api-key", "k"])
        .args(["fans", "set", "2", "on"]);
    let output = run_blocking(cmd).await;

    assert!(output.status.success(), "{}", combined_output(&output));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_reset_requires_confirmation_when_not_interactive() {
    let server = simulation().await;
    let home = scratch();

    let mut cmd = envsim_cmd(home.path());
    cmd.args(["--gateway", &server.uri(), "--api-key", "k"])
        .arg("reset");
    let output = run_blocking(cmd).await;

    assert_eq!(output.status.code(), Some(2), "{}", combined_output(&output));
}
