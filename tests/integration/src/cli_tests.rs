//! CLI exit-code and output contract tests

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn mcpadre() -> Command {
    Command::cargo_bin("mcpadre").expect("mcpadre binary built")
}

fn write_config(dir: &TempDir, yaml: &str) {
    fs::write(dir.path().join("mcpadre.yaml"), yaml).unwrap();
}

const SHELL_ONLY: &str = r#"
mcpServers:
  echo:
    shell:
      command: "cat"
"#;

#[test]
fn test_run_unknown_server_exits_2() {
    let temp = TempDir::new().unwrap();
    write_config(&temp, SHELL_ONLY);

    mcpadre()
        .current_dir(temp.path())
        .env("HOME", temp.path())
        .args(["run", "no-such-server"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("no-such-server"));
}

#[test]
fn test_missing_config_exits_2() {
    let temp = TempDir::new().unwrap();

    mcpadre()
        .current_dir(temp.path())
        .env("HOME", temp.path())
        .args(["run", "anything"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_ambiguous_config_exits_2() {
    let temp = TempDir::new().unwrap();
    write_config(&temp, SHELL_ONLY);
    fs::write(temp.path().join("mcpadre.json"), "{}").unwrap();

    mcpadre()
        .current_dir(temp.path())
        .env("HOME", temp.path())
        .args(["run", "echo"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn test_install_shell_only_succeeds_and_updates_gitignore() {
    let temp = TempDir::new().unwrap();
    write_config(&temp, SHELL_ONLY);

    mcpadre()
        .current_dir(temp.path())
        .env("HOME", temp.path())
        .arg("install")
        .assert()
        .success()
        .stdout(predicate::str::contains("echo"));

    let gitignore = fs::read_to_string(temp.path().join(".gitignore")).unwrap();
    assert!(gitignore.contains(".mcpadre/servers/"));
}

#[test]
fn test_install_skip_gitignore() {
    let temp = TempDir::new().unwrap();
    write_config(&temp, SHELL_ONLY);

    mcpadre()
        .current_dir(temp.path())
        .env("HOME", temp.path())
        .args(["install", "--skip-gitignore"])
        .assert()
        .success();

    assert!(!temp.path().join(".gitignore").exists());
}

#[test]
fn test_help_lists_core_commands() {
    mcpadre()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("install"));
}
