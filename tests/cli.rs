use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn ponder(db_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ponder").unwrap();
    cmd.env_remove("GROQ_API_KEY")
        .env_remove("PONDER_API_BASE")
        .env_remove("PONDER_MODEL")
        .env_remove("RUST_LOG")
        .env("PONDER_DATABASE", db_dir.path().join("history.db"));
    cmd
}

#[test]
fn help_lists_flags() {
    let tmp = TempDir::new().unwrap();
    ponder(&tmp)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--prompt"))
        .stdout(predicate::str::contains("--session"))
        .stdout(predicate::str::contains("--show-thinking"));
}

#[test]
fn version_flag() {
    let tmp = TempDir::new().unwrap();
    ponder(&tmp)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn prompt_without_api_key_fails() {
    let tmp = TempDir::new().unwrap();
    ponder(&tmp)
        .args(["--prompt", "hi"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No API key"));
}

#[test]
fn list_sessions_on_empty_database() {
    let tmp = TempDir::new().unwrap();
    ponder(&tmp)
        .arg("--list-sessions")
        .assert()
        .success()
        .stdout(predicate::str::contains("No saved sessions"));

    assert!(tmp.path().join("history.db").exists());
}
