//! Binary-level tests for `fleet list` and `fleet run`.

use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::process::Command;
use std::thread::{self, JoinHandle};

use assert_cmd::prelude::*;
use predicates::str::contains;
use tempfile::TempDir;

fn fleet_cmd(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("fleet"));
    cmd.current_dir(dir)
        .env_remove("GITHUB_TOKEN")
        .env("RUST_LOG", "warn");
    cmd
}

const EMPTY_ROSTER: &str = r#"{ "Repositories": [] }"#;

const CREATED: &str = r#"{"token":"AABF3JGZDX3P5PMEXLND6TS6FCWO6","expires_at":"2030-01-22T12:13:35Z"}"#;

/// One canned HTTP response per accepted connection.
fn api_stub(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<usize>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("addr");
    let handle = thread::spawn(move || {
        let mut served = 0;
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut buf = Vec::new();
            let mut chunk = [0u8; 1024];
            while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut chunk).expect("read");
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            let reply = format!(
                "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(reply.as_bytes()).expect("write");
            served += 1;
        }
        served
    });
    (format!("http://{addr}"), handle)
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

#[test]
fn list_without_roster_shows_builtin_seed() {
    let dir = TempDir::new().expect("tempdir");
    fleet_cmd(dir.path())
        .arg("list")
        .assert()
        .success()
        .stdout(contains("octo-org/octo-repo"))
        .stdout(contains("2 runners"));
    assert!(
        !dir.path().join("runners-config.json").exists(),
        "list must not write the roster"
    );
}

#[test]
fn list_json_reads_the_given_config() {
    let dir = TempDir::new().expect("tempdir");
    let config = dir.path().join("roster.json");
    fs::write(
        &config,
        r#"{"Repositories":[{"Owner":"acme","Name":"api","Token":"stale","AnchorName":"api-api-env",
            "Runners":[{"ServiceName":"api-runner-1","RunnerName":"api-1","WorkDir":"/tmp/runner/x"}]}]}"#,
    )
    .expect("write config");

    let output = fleet_cmd(dir.path())
        .args(["list", "--json", "--config"])
        .arg(&config)
        .output()
        .expect("run");
    assert!(output.status.success());

    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json");
    assert_eq!(rows[0]["repository"], "acme/api");
    assert_eq!(rows[0]["service"], "api-runner-1");
    assert!(!String::from_utf8_lossy(&output.stdout).contains("stale"));
}

#[test]
fn list_reports_malformed_roster() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("runners-config.json"), "{ nope").expect("write");
    fleet_cmd(dir.path())
        .arg("list")
        .assert()
        .failure()
        .stderr(contains("runners-config.json"));
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

#[test]
fn run_requires_a_token() {
    let dir = TempDir::new().expect("tempdir");
    fleet_cmd(dir.path())
        .args(["run", "--skip-docker"])
        .assert()
        .failure()
        .stderr(contains("--token"));
}

#[test]
fn run_rejects_zero_runners() {
    let dir = TempDir::new().expect("tempdir");
    fleet_cmd(dir.path())
        .args(["run", "--token", "pat", "--runners", "0"])
        .assert()
        .failure()
        .stderr(contains("at least 1"));
}

#[test]
fn rejected_credential_aborts_before_writing_manifest() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("runners-config.json"), EMPTY_ROSTER).expect("write");
    let (url, server) = api_stub(vec![(401, r#"{"message":"Bad credentials"}"#)]);

    fleet_cmd(dir.path())
        .args(["run", "--token", "pat", "--repos", "acme/api", "--skip-docker"])
        .args(["--api-url", &url])
        .assert()
        .failure()
        .stderr(contains("401"));

    assert_eq!(server.join().expect("server"), 1);
    assert!(!dir.path().join("docker-compose.yml").exists());
    // The added repository was saved before the credential pass.
    let saved = fs::read_to_string(dir.path().join("runners-config.json")).expect("read");
    assert!(saved.contains("\"acme/api\""));
}

#[cfg(unix)]
#[test]
fn full_run_with_stub_compose() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("runners-config.json"), EMPTY_ROSTER).expect("write");

    let compose = dir.path().join("fake-compose");
    fs::write(
        &compose,
        "#!/bin/sh\ncase \"$*\" in\n  *\"ps --services\"*) printf 'api-runner-1\\napi-runner-2\\n' ;;\nesac\n",
    )
    .expect("write stub");
    fs::set_permissions(&compose, fs::Permissions::from_mode(0o755)).expect("chmod");

    let (url, server) = api_stub(vec![(201, CREATED)]);

    fleet_cmd(dir.path())
        .env("GITHUB_TOKEN", "pat")
        .args(["run", "--repos", "github.com/acme/api", "--settle-secs", "0"])
        .args(["--api-url", &url])
        .arg("--compose")
        .arg(&compose)
        .assert()
        .success()
        .stdout(contains("2/2 runners running"));

    assert_eq!(server.join().expect("server"), 1);
    let manifest = fs::read_to_string(dir.path().join("docker-compose.yml")).expect("manifest");
    assert!(manifest.contains("AABF3JGZDX3P5PMEXLND6TS6FCWO6"));
    assert!(manifest.contains("api-runner-2"));

    let saved = fs::read_to_string(dir.path().join("runners-config.json")).expect("roster");
    assert!(
        !saved.contains("AABF3JGZDX3P5PMEXLND6TS6FCWO6"),
        "registration tokens are not persisted"
    );
}
