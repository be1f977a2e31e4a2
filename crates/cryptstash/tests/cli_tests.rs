// SPDX-FileCopyrightText: 2026 Cryptstash Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end tests driving the `cryptstash` binary.
//!
//! Each test works in its own temp directory with an explicit config file
//! and supplies the passphrase through CRYPTSTASH_PASSPHRASE.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

struct Workspace {
    dir: tempfile::TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("cryptstash.toml");
        std::fs::write(&config, "[pbkdf2]\niterations = 1000\n").unwrap();
        Self { dir, config }
    }

    fn vault(&self) -> PathBuf {
        self.dir.path().join("vault.json")
    }

    fn command(&self, passphrase: &str, args: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_cryptstash"));
        cmd.arg("--config")
            .arg(&self.config)
            .args(args)
            .env("CRYPTSTASH_PASSPHRASE", passphrase)
            .env_remove("RUST_LOG")
            .stdin(Stdio::null());
        cmd
    }

    fn run(&self, passphrase: &str, args: &[&str]) -> Output {
        self.command(passphrase, args).output().unwrap()
    }

    fn run_with_stdin(&self, passphrase: &str, args: &[&str], input: &str) -> Output {
        let mut child = self
            .command(passphrase, args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .unwrap();
        child.stdin.take().unwrap().write_all(input.as_bytes()).unwrap();
        child.wait_with_output().unwrap()
    }
}

fn path_arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn init_set_get_list_remove() {
    let ws = Workspace::new();
    let vault = ws.vault();
    let vault = path_arg(&vault);

    let out = ws.run("hunter2", &["init", vault]);
    assert!(out.status.success(), "init failed: {}", stderr(&out));

    let out = ws.run_with_stdin("hunter2", &["set", vault, "github"], "ghp_token\n");
    assert!(out.status.success(), "set failed: {}", stderr(&out));
    let out = ws.run_with_stdin("hunter2", &["set", vault, "bank"], "1234");
    assert!(out.status.success());

    let out = ws.run("hunter2", &["get", vault, "github"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out), "ghp_token\n");

    let out = ws.run("hunter2", &["ls", vault]);
    assert_eq!(stdout(&out), "bank\ngithub\n");

    let out = ws.run("hunter2", &["rm", vault, "bank"]);
    assert!(out.status.success());
    let out = ws.run("hunter2", &["ls", vault]);
    assert_eq!(stdout(&out), "github\n");
}

#[test]
fn vault_file_is_plain_json_without_secrets() {
    let ws = Workspace::new();
    let vault = ws.vault();

    assert!(ws.run("hunter2", &["init", path_arg(&vault)]).status.success());
    let out = ws.run_with_stdin("hunter2", &["set", path_arg(&vault), "note"], "very secret");
    assert!(out.status.success());

    let text = std::fs::read_to_string(&vault).unwrap();
    assert!(text.contains("\"stages\""));
    assert!(text.contains("\"aes\""));
    assert!(text.contains("\"blowfish\""));
    assert!(!text.contains("very secret"));
    assert!(!text.contains("note"));
}

#[test]
fn wrong_passphrase_is_rejected() {
    let ws = Workspace::new();
    let vault = ws.vault();
    assert!(ws.run("hunter2", &["init", path_arg(&vault)]).status.success());

    let out = ws.run("hunter3", &["ls", path_arg(&vault)]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("bad passphrase or corrupted file"));
    assert!(stdout(&out).is_empty());
}

#[test]
fn missing_label_fails() {
    let ws = Workspace::new();
    let vault = ws.vault();
    assert!(ws.run("pw", &["init", path_arg(&vault)]).status.success());

    let out = ws.run("pw", &["get", path_arg(&vault), "nothing"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("no entry labelled `nothing`"));
}

#[test]
fn init_refuses_existing_file() {
    let ws = Workspace::new();
    let vault = ws.vault();
    assert!(ws.run("pw", &["init", path_arg(&vault)]).status.success());
    let before = std::fs::read(&vault).unwrap();

    let out = ws.run("pw", &["init", path_arg(&vault)]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("refusing to overwrite"));
    assert_eq!(std::fs::read(&vault).unwrap(), before);
}

#[test]
fn init_with_explicit_stages() {
    let ws = Workspace::new();
    let vault = ws.vault();
    let out = ws.run(
        "pw",
        &[
            "init",
            path_arg(&vault),
            "--stage",
            "blowfish:scrypt:time=0,max_log_n=10",
            "--stage",
            "aes:pbkdf2:iterations=500",
        ],
    );
    assert!(out.status.success(), "init failed: {}", stderr(&out));

    let text = std::fs::read_to_string(&vault).unwrap();
    assert!(text.contains("\"scrypt\""));
    assert!(ws.run("pw", &["ls", path_arg(&vault)]).status.success());
}

#[test]
fn unknown_cipher_fails_before_writing() {
    let ws = Workspace::new();
    let vault = ws.vault();
    let out = ws.run("pw", &["init", path_arg(&vault), "--stage", "rot13:pbkdf2"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("unknown cipher `rot13`"));
    assert!(!vault.exists());
}

#[test]
fn passwd_keeps_entries() {
    let ws = Workspace::new();
    let vault = ws.vault();
    let vault_str = path_arg(&vault);
    assert!(ws.run("pw", &["init", vault_str]).status.success());
    assert!(ws.run_with_stdin("pw", &["set", vault_str, "k"], "v").status.success());
    let before = std::fs::read_to_string(&vault).unwrap();

    let out = ws.run("pw", &["passwd", vault_str]);
    assert!(out.status.success(), "passwd failed: {}", stderr(&out));

    // Fresh salts even when the passphrase is unchanged.
    assert_ne!(std::fs::read_to_string(&vault).unwrap(), before);
    assert_eq!(stdout(&ws.run("pw", &["get", vault_str, "k"])), "v\n");
}

#[test]
fn default_path_comes_from_config() {
    let ws = Workspace::new();
    let vault = ws.vault();
    std::fs::write(
        &ws.config,
        format!("[vault]\ndefault_path = {:?}\n\n[pbkdf2]\niterations = 1000\n", path_arg(&vault)),
    )
    .unwrap();

    assert!(ws.run("pw", &["init"]).status.success());
    assert!(vault.exists());
    assert!(ws.run_with_stdin("pw", &["set", "only"], "x").status.success());
    assert_eq!(stdout(&ws.run("pw", &["get", "only"])), "x\n");
}

#[test]
fn config_command_prints_effective_toml() {
    let ws = Workspace::new();
    let out = ws.run("pw", &["config"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("[pbkdf2]"));
    assert!(text.contains("iterations = 1000"));
}

#[test]
fn invalid_config_is_reported() {
    let ws = Workspace::new();
    std::fs::write(&ws.config, "[pbkdf2]\niteratons = 5\n").unwrap();
    let out = ws.run("pw", &["config"]);
    assert!(!out.status.success());
    assert!(stderr(&out).contains("iteratons"));
}
