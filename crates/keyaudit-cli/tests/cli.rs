// ABOUTME: Integration tests for the keyaudit binary.
// ABOUTME: Runs the built executable against fake sshd/getent and checks stdout and exit status.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

const KEY: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIOPS ops@example.org";

fn write_script(path: &Path, body: &str) {
    std::fs::write(path, body).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// One account, alice, served by the files backend, with KEY installed.
fn sandbox() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    let home = root.join("home/alice");
    std::fs::create_dir_all(home.join(".ssh")).unwrap();
    std::fs::write(home.join(".ssh/authorized_keys"), format!("{KEY}\n")).unwrap();

    write_script(
        &root.join("getent"),
        &format!(
            "#!/bin/sh\n[ \"$2\" = files ] || exit 2\n[ -z \"$4\" ] || [ \"$4\" = alice ] || exit 2\necho 'alice:x:1000:1000::{}:/bin/sh'\n",
            home.display()
        ),
    );
    write_script(
        &root.join("sshd"),
        "#!/bin/sh\necho 'authorizedkeysfile .ssh/authorized_keys'\necho 'authorizedkeyscommand none'\n",
    );
    std::fs::write(root.join("nsswitch.conf"), "passwd: files\n").unwrap();
    std::fs::write(
        root.join("policy.toml"),
        format!(
            "sshd = \"{root}/sshd\"\ngetent = \"{root}/getent\"\nnsswitch = \"{root}/nsswitch.conf\"\n",
            root = root.display()
        ),
    )
    .unwrap();
    dir
}

fn keyaudit(dir: &TempDir, extra: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_keyaudit"))
        .arg("--config")
        .arg(dir.path().join("policy.toml"))
        .args(extra)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run keyaudit")
}

#[test]
fn test_compliant_run_exits_zero_with_json() {
    let dir = sandbox();
    let output = keyaudit(&dir, &["--required", KEY]);

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["changed"], serde_json::Value::Bool(false));
    assert_eq!(report["authorized_keys"]["alice"][0], KEY);
}

#[test]
fn test_violation_exits_one() {
    let dir = sandbox();
    let output = keyaudit(&dir, &["--forbidden", KEY]);

    assert_eq!(output.status.code(), Some(1));
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["failed"], serde_json::Value::Bool(true));
    assert_eq!(report["diff"][0]["before"], format!("{KEY}\n"));
}

#[test]
fn test_check_mode_exits_zero_but_reports_change() {
    let dir = sandbox();
    let output = keyaudit(&dir, &["--forbidden", KEY, "--check", "--format", "text"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--- authorized_keys (alice)"));
    assert!(stdout.trim_end().ends_with("result: CHANGED"));
}

#[test]
fn test_unknown_user_fails() {
    let dir = sandbox();
    let output = keyaudit(&dir, &["--user", "nobody-here"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("nobody-here"));
}
