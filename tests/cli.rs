// ==============================================================================
// CLI Integration Tests: Exercise the `protocue` Binary via Subprocess
// ==============================================================================
//
// These tests run the compiled `protocue` binary as a subprocess using
// `assert_cmd`, inside a temporary working directory, verifying exit codes,
// stdout content, and the files written. The well-known cache is pre-seeded
// so no test reaches the network.

mod common;

use assert_cmd::Command;
use common::Workspace;
use predicates::prelude::*;
use protocue::WellKnownRegistry;

/// Helper to construct a `Command` for the `protocue` binary built by this
/// crate, running in `ws`.
#[allow(deprecated)] // cargo_bin() warns about custom build-dir; acceptable here
fn protocue_cmd(ws: &Workspace) -> Command {
    let mut cmd = Command::cargo_bin("protocue").expect("protocue binary should be built by cargo");
    cmd.current_dir(ws.path()).env("RUST_LOG", "warn");
    cmd
}

/// A workspace with the default well-known cache filled in.
fn seeded() -> Workspace {
    let ws = Workspace::new();
    ws.seed_well_knowns(&WellKnownRegistry::new());
    ws
}

// ==============================================================================
// `add` Subcommand Tests
// ==============================================================================

#[test]
fn test_cli_add_without_protofiles() {
    let ws = seeded();
    protocue_cmd(&ws)
        .args(["add", "create user"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "No protofiles. Will not generate schemas.",
        ))
        .stdout(predicate::str::contains("create: ./tests/createUser.cue"));

    let written = ws.read("tests/createUser.cue");
    assert!(written.starts_with("name: \"create user\"\n"), "{written}");
    assert!(written.contains("cases: [...#Test] & ["), "{written}");
}

#[test]
fn test_cli_add_twice_refuses() {
    let ws = seeded();
    protocue_cmd(&ws).args(["add", "login"]).assert().success();
    std::fs::write(ws.join("tests/login.cue"), "// edited\n").expect("edit test case");

    protocue_cmd(&ws)
        .args(["add", "login"])
        .assert()
        .success()
        .stdout(predicate::str::contains("login already exists"));
    assert_eq!(ws.read("tests/login.cue"), "// edited\n");
}

#[test]
fn test_cli_add_with_protofiles() {
    let ws = seeded();
    ws.write(
        "protos/hello.proto",
        "syntax = \"proto3\";\noption go_package = \"pkg.v1;pkgv1\";\nmessage Hello { string name = 1; }\n",
    );

    protocue_cmd(&ws)
        .args([
            "add",
            "my test",
            "--proto_path",
            "protos",
            "--protofiles",
            "protos/*.proto",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("create: ./v1/hello.cue"))
        .stdout(predicate::str::contains("create: ./tests/myTest.cue"));

    assert_eq!(ws.read("cue.mod/module.cue"), "module: \"pkg\"\n");
    assert!(ws.read("v1/hello.cue").contains("#Hello: {"));
}

#[test]
fn test_cli_add_missing_name() {
    let ws = seeded();
    protocue_cmd(&ws)
        .arg("add")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing test case name"));
    assert!(!ws.join("tests").exists());
}

#[test]
fn test_cli_add_invalid_proto_fails() {
    let ws = seeded();
    ws.write("protos/bad.proto", "syntax = \"proto3\";\nmessage {\n");

    protocue_cmd(&ws)
        .args(["add", "x", "--protofiles", "protos/*.proto"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("protocue::parse"));
    assert!(!ws.join("tests/x.cue").exists());
}

// ==============================================================================
// `generate` Subcommand Tests
// ==============================================================================

#[test]
fn test_cli_generate_uses_config_file() {
    let ws = seeded();
    ws.write(
        "api/v2/svc.proto",
        "syntax = \"proto3\";\noption go_package = \"example.com/api/v2\";\nmessage Ping {}\n",
    );
    ws.write(
        "protocue.json",
        "{\n  // imports resolve here\n  \"proto_path\": \"api\"\n}\n",
    );

    protocue_cmd(&ws)
        .args(["generate", "--protofiles", "api/**/*.proto", "--out", "gen"])
        .assert()
        .success()
        .stdout(predicate::str::contains("create: gen/cue.mod/module.cue"))
        .stdout(predicate::str::contains("create: gen/v2/svc.cue"));
    assert_eq!(ws.read("gen/cue.mod/module.cue"), "module: \"example.com/api\"\n");
}

#[test]
fn test_cli_generate_without_protofiles() {
    let ws = seeded();
    protocue_cmd(&ws)
        .arg("generate")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "No protofiles. Will not generate schemas.",
        ));
}

#[test]
fn test_cli_bad_config_fails() {
    let ws = seeded();
    ws.write("protocue.json", "{\"proto_dir\": \"x\"}\n");
    protocue_cmd(&ws)
        .arg("generate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown key `proto_dir`"));
}

// ==============================================================================
// General CLI Tests
// ==============================================================================

#[test]
fn test_cli_help() {
    let ws = Workspace::new();
    protocue_cmd(&ws)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("protocue add <NAME>"));
}

#[test]
fn test_cli_unknown_subcommand() {
    let ws = Workspace::new();
    protocue_cmd(&ws)
        .arg("frobnicate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown subcommand"));
}
